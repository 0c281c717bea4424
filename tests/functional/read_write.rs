//! Read-write surface: combinators, bulk fan-out, named functions

use crate::common::*;
use cachet::{
    CompareResult, Lookup, MetaEntryVersion, NumericEntryVersion, RemoveReturnBoolean,
    ReturnFind, SetValueIfVersion, SetValueReturnPrevious, SetValueReturnView, WritableMeta,
};

#[test]
fn update_on_absent_with_none_stays_absent() {
    let map = new_map("rw-update-none");
    map.read_write().eval(key("a"), |v| v.update(|_| None)).join().unwrap();
    let found = map.read_only().eval(key("a"), |v| v.find().copied()).join().unwrap();
    assert_eq!(found, None);
    map.close();
}

#[test]
fn update_on_absent_with_value_stores_it() {
    let map = new_map("rw-update-some");
    map.read_write().eval(key("a"), |v| v.update(|_| Some(3))).join().unwrap();
    let found = map.read_only().eval(key("a"), |v| v.find().copied()).join().unwrap();
    assert_eq!(found, Some(3));
    map.close();
}

#[test]
fn compute_if_present_on_absent_is_noop() {
    let (map, persistence) = map_with_persistence("rw-cip-absent");
    let out = map
        .read_write()
        .eval(key("a"), |v| v.compute_if_present(|n| Some(n + 1)))
        .join()
        .unwrap();
    assert_eq!(out, None);
    assert_eq!(persistence.write_count(), 0);
    assert_eq!(map.read_only().keys().unwrap().count(), 0);
    map.close();
}

#[test]
fn compute_if_present_stores_or_removes() {
    let map = new_map("rw-cip");
    let rw = map.read_write();
    rw.eval(key("a"), |v| v.set(4)).join().unwrap();

    let out = rw.eval(key("a"), |v| v.compute_if_present(|n| Some(n * 2))).join().unwrap();
    assert_eq!(out, Some(8));

    let out = rw.eval(key("a"), |v| v.compute_if_present(|_| None)).join().unwrap();
    assert_eq!(out, None);
    let found = map.read_only().eval(key("a"), |v| v.find().copied()).join().unwrap();
    assert_eq!(found, None);
    map.close();
}

#[test]
fn get_on_absent_is_no_such_element() {
    let map = new_map("rw-get");
    let out = map
        .read_write()
        .eval(key("a"), |v| v.get().map(|n| *n).map_err(|e| e.to_string()))
        .join()
        .unwrap();
    assert!(out.is_err());
    map.close();
}

#[test]
fn eval_many_yields_results_in_submission_order() {
    let map = new_map("rw-order");
    let rw = map.read_write();
    let entries: Vec<(String, i64)> = (0..50).map(|i| (format!("k{}", i), i)).collect();
    let previous: Vec<i64> = rw
        .eval_many_with(entries, |n, v| {
            v.set(n);
            n
        })
        .map(|r| r.unwrap())
        .collect();
    assert_eq!(previous, (0..50).collect::<Vec<_>>());
    map.close();
}

#[test]
fn bulk_failures_are_per_element() {
    let map = new_map("rw-bulk-err");
    let outcomes: Vec<Result<String>> = map
        .read_write()
        .eval_many(keys(5), |v| {
            if v.key() == "k1" {
                panic!("k1 refused");
            }
            v.set(1);
            v.key().clone()
        })
        .collect();
    assert_eq!(outcomes.len(), 5);
    assert!(matches!(&outcomes[1], Err(Error::FunctionPanicked(_))));
    assert_eq!(outcomes.iter().filter(|o| o.is_ok()).count(), 4);
    assert_eq!(outcomes[4].as_ref().unwrap(), "k4");
    map.close();
}

#[test]
fn eval_all_covers_live_entries() {
    let map = new_map("rw-all");
    let rw = map.read_write();
    rw.eval_many(keys(6), |v| v.set(1)).for_each(|r| r.unwrap());
    let bumped = rw
        .eval_all(|v| v.compute(|n| n.map(|n| n + 1)))
        .filter(|r| matches!(r, Ok(Some(2))))
        .count();
    assert_eq!(bumped, 6);
    map.close();
}

#[test]
fn named_functions_on_read_write() {
    let map = new_map("rw-named");
    let rw = map.read_write();
    assert_eq!(
        rw.eval_named_with(key("a"), 1, SetValueReturnPrevious::new()).join().unwrap(),
        None
    );
    assert_eq!(
        rw.eval_named_with(key("a"), 2, SetValueReturnPrevious::new()).join().unwrap(),
        Some(1)
    );

    let view = rw.eval_named_with(key("a"), 3, SetValueReturnView::new()).join().unwrap();
    assert_eq!(view.find(), Some(&3));

    assert_eq!(rw.eval_named(key("a"), ReturnFind).join().unwrap(), Some(3));
    assert!(rw.eval_named(key("a"), RemoveReturnBoolean).join().unwrap());
    assert!(!rw.eval_named(key("a"), RemoveReturnBoolean).join().unwrap());
    map.close();
}

#[test]
fn engine_stamps_versions_and_conditional_write_checks_them() {
    let map = new_map("rw-version");
    let rw = map.read_write();
    rw.eval(key("a"), |v| v.set(1)).join().unwrap();

    let version = rw
        .eval(key("a"), |v| v.find_meta_param::<MetaEntryVersion>().map(|m| m.get().clone()))
        .join()
        .unwrap()
        .expect("write should be versioned");

    // Stale expectation fails
    let stale = SetValueIfVersion::new(NumericEntryVersion::new(0));
    assert!(!rw.eval_named_with(key("a"), 5, stale).join().unwrap());

    let current = SetValueIfVersion::new(version.clone());
    assert!(rw.eval_named_with(key("a"), 5, current).join().unwrap());

    let after = rw
        .eval(key("a"), |v| v.find_meta_param::<MetaEntryVersion>().map(|m| m.get().clone()))
        .join()
        .unwrap()
        .unwrap();
    assert_eq!(after.compare_to(&version), CompareResult::After);
    map.close();
}

#[test]
fn caller_supplied_version_is_kept() {
    let map = new_map("rw-own-version");
    let rw = map.read_write();
    rw.eval(key("a"), |v| {
        v.set_with(1, &[WritableMeta::version(NumericEntryVersion::new(100))])
    })
    .join()
    .unwrap();
    let version = rw
        .eval(key("a"), |v| {
            v.find_meta_param::<MetaEntryVersion>()
                .and_then(|m| m.get().as_numeric())
                .map(|n| n.as_u64())
        })
        .join()
        .unwrap();
    assert_eq!(version, Some(100));
    map.close();
}

#[test]
fn persisted_entry_is_loaded_on_first_read_write() {
    let (map, persistence) = map_with_persistence("rw-load");
    persistence.seed(key("p"), cachet::CacheEntry::new(41, cachet::MetaParams::new()));

    let out = map
        .read_write()
        .eval(key("p"), |v| v.compute(|n| n.map(|n| n + 1)))
        .join()
        .unwrap();
    assert_eq!(out, Some(42));
    assert_eq!(persistence.load_count(), 1);
    assert_eq!(persistence.peek(&key("p")).map(|e| e.value), Some(42));
    map.close();
}

#[tokio::test]
async fn eval_future_can_be_awaited() {
    let map = new_map("rw-await");
    let rw = map.read_write();
    let out = rw.eval(key("a"), |v| v.compute(|_| Some(9))).await.unwrap();
    assert_eq!(out, Some(9));
    map.close();
}
