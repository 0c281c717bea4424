//! Concurrent-map facade over a shared functional map

use crate::common::*;
use cachet::ConcurrentMapAdapter;
use std::thread;

#[test]
fn adapter_and_functional_surfaces_share_state() {
    let map = new_map("cm-shared");
    let adapter = ConcurrentMapAdapter::new(&map);

    adapter.put(key("a"), 1).unwrap();
    let seen = map.read_only().eval(key("a"), |v| v.find().copied()).join().unwrap();
    assert_eq!(seen, Some(1));

    map.write_only().eval(key("b"), |v| v.set(2)).join().unwrap();
    assert_eq!(adapter.get(&key("b")).unwrap(), Some(2));
    assert_eq!(adapter.len().unwrap(), 2);
    map.close();
}

#[test]
fn put_if_absent_has_one_winner() {
    let map = new_map("cm-race");
    let adapter = ConcurrentMapAdapter::new(&map);

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let adapter = adapter.clone();
            thread::spawn(move || adapter.put_if_absent(key("slot"), i).unwrap().is_none())
        })
        .collect();
    let winners = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|won| *won)
        .count();
    assert_eq!(winners, 1);
    map.close();
}

#[test]
fn adapter_respects_persistence() {
    let (map, persistence) = map_with_persistence("cm-persist");
    let adapter = ConcurrentMapAdapter::new(&map);
    persistence.seed(key("p"), cachet::CacheEntry::new(5, cachet::MetaParams::new()));

    assert!(adapter.contains_key(&key("p")).unwrap());
    assert_eq!(adapter.remove(&key("p")).unwrap(), Some(5));
    assert!(persistence.peek(&key("p")).is_none());
    map.close();
}

#[test]
fn adapter_errors_after_close() {
    let map = new_map("cm-closed");
    let adapter = ConcurrentMapAdapter::new(&map);
    map.close();
    assert!(matches!(adapter.get(&key("a")), Err(Error::MapClosed(_))));
    assert!(matches!(adapter.len(), Err(Error::MapClosed(_))));
}
