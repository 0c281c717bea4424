//! Bulk read traversables: laziness, short-circuit, release hooks

use crate::common::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn seeded(prefix: &str, n: usize) -> cachet::FunctionalMap<String, i64> {
    let map = new_map(prefix);
    let entries: Vec<(String, i64)> = (0..n).map(|i| (format!("k{}", i), i as i64)).collect();
    map.write_only()
        .eval_many_with(entries, |n, v| v.set(n))
        .join()
        .unwrap();
    map
}

#[test]
fn eval_many_count_and_filter() {
    let map = seeded("tv-count", 10);
    let ro = map.read_only();
    assert_eq!(ro.eval_many(keys(10), |v| v.find().copied()).count(), 10);

    // Exclude the three largest values
    let kept = ro
        .eval_many(keys(10), |v| v.find().copied().unwrap_or(-1))
        .filter(|r| matches!(r, Ok(n) if *n < 7))
        .count();
    assert_eq!(kept, 7);
    map.close();
}

#[test]
fn eval_many_is_lazy() {
    let map = seeded("tv-lazy", 5);
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let traversable = map.read_only().eval_many(keys(5), move |v| {
        counter.fetch_add(1, Ordering::SeqCst);
        v.find().copied()
    });
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    assert_eq!(traversable.count(), 5);
    assert_eq!(calls.load(Ordering::SeqCst), 5);
    map.close();
}

#[test]
fn any_match_short_circuits() {
    let map = seeded("tv-any", 8);
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let found = map
        .read_only()
        .eval_many(keys(8), move |v| {
            counter.fetch_add(1, Ordering::SeqCst);
            v.find().copied()
        })
        .any_match(|r| matches!(r, Ok(Some(_))));
    assert!(found);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    map.close();
}

#[test]
fn terminal_operations() {
    let map = seeded("tv-terminal", 6);
    let ro = map.read_only();
    let values = || {
        ro.eval_many(keys(6), |v| v.find().copied().unwrap_or(0))
            .map(|r| r.unwrap())
    };
    assert_eq!(values().reduce(0, |a, b| a + b), 15);
    assert_eq!(values().reduce_opt(|a, b| a.max(b)), Some(5));
    assert_eq!(values().min_by(|a, b| a.cmp(b)), Some(0));
    assert_eq!(values().max_by(|a, b| a.cmp(b)), Some(5));
    assert!(values().all_match(|n| *n < 6));
    assert!(values().none_match(|n| *n > 5));
    assert!(values().find_any().is_some());

    let doubled: Vec<i64> = values().flat_map(|n| vec![n, n]).collect();
    assert_eq!(doubled.len(), 12);
    map.close();
}

#[test]
fn keys_and_entries_reflect_memory() {
    let map = seeded("tv-keys", 4);
    let ro = map.read_only();
    let mut found: Vec<String> = ro.keys().unwrap().collect();
    found.sort();
    assert_eq!(found, keys(4));

    let total: i64 = ro
        .entries()
        .unwrap()
        .map(|view| view.into_value().unwrap_or(0))
        .reduce(0, |a, b| a + b);
    assert_eq!(total, 6);
    map.close();
}

#[test]
fn close_hooks_run_once_on_drop_of_iterator() {
    let map = seeded("tv-hooks", 3);
    let released = Arc::new(AtomicUsize::new(0));
    let hook = Arc::clone(&released);
    let traversable = map
        .read_only()
        .keys()
        .unwrap()
        .on_close(move || {
            hook.fetch_add(1, Ordering::SeqCst);
        });

    let mut iter = traversable.into_iter();
    assert!(iter.next().is_some());
    assert_eq!(released.load(Ordering::SeqCst), 0);
    drop(iter);
    assert_eq!(released.load(Ordering::SeqCst), 1);
    map.close();
}

#[test]
fn read_only_bulk_after_close_yields_errors() {
    let map = seeded("tv-closed", 2);
    let ro = map.read_only();
    let pending = ro.eval_many(keys(2), |v| v.find().copied());
    map.close();

    assert!(pending.all_match(|r| matches!(r, Err(Error::MapClosed(_)))));
    assert!(matches!(ro.keys(), Err(Error::MapClosed(_))));
}
