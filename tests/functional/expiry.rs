//! Lifespan and max-idle expiration

use crate::common::*;
use cachet::{Lookup, MetaLifespan, MetaMaxIdle, WritableMeta};
use std::thread;
use std::time::Duration;

#[test]
fn lifespan_expires_entry() {
    let map = new_map("ex-lifespan");
    map.write_only()
        .eval(key("a"), |v| v.set_with(1, &[WritableMeta::lifespan(50)]))
        .join()
        .unwrap();

    let fresh = map.read_only().eval(key("a"), |v| v.find().copied()).join().unwrap();
    assert_eq!(fresh, Some(1));

    thread::sleep(Duration::from_millis(120));
    let expired = map.read_only().eval(key("a"), |v| v.find().copied()).join().unwrap();
    assert_eq!(expired, None);
    assert_eq!(map.stats().expired, 1);
    map.close();
}

#[test]
fn max_idle_is_refreshed_by_reads() {
    let map = new_map("ex-idle");
    map.write_only()
        .eval(key("a"), |v| v.set_with(1, &[WritableMeta::max_idle(300)]))
        .join()
        .unwrap();

    for _ in 0..3 {
        thread::sleep(Duration::from_millis(100));
        let found = map.read_only().eval(key("a"), |v| v.find().copied()).join().unwrap();
        assert_eq!(found, Some(1));
    }

    thread::sleep(Duration::from_millis(450));
    let idle = map.read_only().eval(key("a"), |v| v.find().copied()).join().unwrap();
    assert_eq!(idle, None);
    map.close();
}

#[test]
fn expired_entries_are_not_listed() {
    let map = new_map("ex-keys");
    map.write_only()
        .eval(key("short"), |v| v.set_with(1, &[WritableMeta::lifespan(30)]))
        .join()
        .unwrap();
    map.write_only().eval(key("long"), |v| v.set(2)).join().unwrap();

    thread::sleep(Duration::from_millis(100));
    let listed: Vec<String> = map.read_only().keys().unwrap().collect();
    assert_eq!(listed, vec!["long"]);
    map.close();
}

#[test]
fn metadata_defaults_are_unlimited() {
    assert_eq!(MetaLifespan::default_value().get(), -1);
    assert_eq!(MetaMaxIdle::default_value().get(), -1);

    let map = new_map("ex-defaults");
    map.write_only().eval(key("a"), |v| v.set(1)).join().unwrap();
    let lifespan = map
        .read_only()
        .eval(key("a"), |v| v.find_meta_param::<MetaLifespan>().map(|m| m.get()))
        .join()
        .unwrap();
    assert!(lifespan.is_none());
    map.close();
}
