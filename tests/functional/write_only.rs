//! Write-only surface: blind writes, bulk writes, truncate

use crate::common::*;
use cachet::{ReadOnlyView, Remove, SetValue, WritableMeta, MetaLifespan, Lookup};

#[test]
fn set_then_find() {
    let map = new_map("wo-set");
    map.write_only().eval(key("a"), |v| v.set(10)).join().unwrap();

    let found = map
        .read_only()
        .eval(key("a"), |v| v.find().copied())
        .join()
        .unwrap();
    assert_eq!(found, Some(10));
    map.close();
}

#[test]
fn eval_with_passes_argument() {
    let map = new_map("wo-arg");
    map.write_only()
        .eval_with(key("a"), 7, |n, v| v.set(n * 2))
        .join()
        .unwrap();
    let found = map.read_only().eval(key("a"), |v| v.find().copied()).join().unwrap();
    assert_eq!(found, Some(14));
    map.close();
}

#[test]
fn write_only_never_loads_from_persistence() {
    let (map, persistence) = map_with_persistence("wo-noload");
    map.write_only().eval(key("a"), |v| v.set(1)).join().unwrap();
    assert_eq!(persistence.load_count(), 0);
    assert_eq!(persistence.write_count(), 1);
    map.close();
}

#[test]
fn eval_many_writes_every_key() {
    let map = new_map("wo-many");
    map.write_only()
        .eval_many(keys(20), |v| v.set(1))
        .join()
        .unwrap();

    let total: i64 = map
        .read_only()
        .eval_many(keys(20), |v| v.find().copied().unwrap_or(0))
        .map(|r| r.unwrap())
        .reduce(0, |a, b| a + b);
    assert_eq!(total, 20);
    map.close();
}

#[test]
fn eval_many_with_uses_each_argument() {
    let map = new_map("wo-many-with");
    let entries: Vec<(String, i64)> = (0..5).map(|i| (format!("k{}", i), i * 10)).collect();
    map.write_only()
        .eval_many_with(entries, |n, v| v.set(n))
        .join()
        .unwrap();

    let found = map.read_only().eval(key("k3"), |v| v.find().copied()).join().unwrap();
    assert_eq!(found, Some(30));
    map.close();
}

#[test]
fn eval_all_touches_existing_entries_only() {
    let map = new_map("wo-all");
    map.write_only().eval_many(keys(3), |v| v.set(1)).join().unwrap();
    map.write_only().eval_all(|v| v.remove()).join().unwrap();
    assert_eq!(map.read_only().keys().unwrap().count(), 0);
    map.close();
}

#[test]
fn bulk_failure_reports_first_error_after_all_keys_ran() {
    let map = new_map("wo-bulk-err");
    let outcome = map
        .write_only()
        .eval_many(keys(4), |v| {
            if v.key() == "k2" {
                panic!("bad key");
            }
            v.set(1)
        })
        .join();
    assert!(matches!(outcome, Err(Error::FunctionPanicked(m)) if m == "bad key"));

    // The other keys were still written
    assert_eq!(map.read_only().keys().unwrap().count(), 3);
    map.close();
}

#[test]
fn truncate_clears_memory_and_persistence() {
    let (map, persistence) = map_with_persistence("wo-truncate");
    map.write_only().eval_many(keys(5), |v| v.set(1)).join().unwrap();
    assert_eq!(persistence.len(), 5);

    map.write_only().truncate().join().unwrap();
    assert_eq!(map.read_only().keys().unwrap().count(), 0);
    assert!(persistence.is_empty());
    map.close();
}

#[test]
fn named_functions_on_write_only() {
    let map = new_map("wo-named");
    let wo = map.write_only();
    wo.eval_named_with(key("a"), 5, SetValue::with_metas(vec![WritableMeta::lifespan(60_000)]))
        .join()
        .unwrap();

    let lifespan = map
        .read_only()
        .eval(key("a"), |v: &ReadOnlyView<String, i64>| {
            v.find_meta_param::<MetaLifespan>().map(|m| m.get())
        })
        .join()
        .unwrap();
    assert_eq!(lifespan, Some(60_000));

    wo.eval_named(key("a"), Remove).join().unwrap();
    let found = map.read_only().eval(key("a"), |v| v.find().copied()).join().unwrap();
    assert_eq!(found, None);
    map.close();
}
