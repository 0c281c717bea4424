//! Per-key serialization under contention

use crate::common::*;
use std::sync::Arc;
use std::thread;

#[test]
fn read_write_increments_are_not_lost() {
    let map = new_map("cc-incr");
    let rw = map.read_write();

    let futures: Vec<_> = (0..200)
        .map(|_| rw.eval(key("counter"), |v| v.update(|n| Some(n.copied().unwrap_or(0) + 1))))
        .collect();
    for f in futures {
        f.join().unwrap();
    }

    let total = map
        .read_only()
        .eval(key("counter"), |v| v.find().copied())
        .join()
        .unwrap();
    assert_eq!(total, Some(200));
    map.close();
}

#[test]
fn concurrent_callers_on_many_threads() {
    let map = new_map("cc-threads");
    let barrier = Arc::new(std::sync::Barrier::new(8));

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let rw = map.read_write();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for i in 0..25 {
                    let k = format!("k{}", i % 5);
                    rw.eval(k, move |v| v.update(|n| Some(n.copied().unwrap_or(0) + t + 1)))
                        .join()
                        .unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    // Each thread adds (t + 1) 25 times, spread over 5 keys
    let expected: i64 = (0..8).map(|t| (t + 1) * 25).sum();
    let total: i64 = map
        .read_only()
        .eval_many(keys(5), |v| v.find().copied().unwrap_or(0))
        .map(|r| r.unwrap())
        .reduce(0, |a, b| a + b);
    assert_eq!(total, expected);
    map.close();
}

#[test]
fn distinct_keys_proceed_in_parallel() {
    let map = new_map("cc-parallel");
    let barrier = Arc::new(std::sync::Barrier::new(2));

    // Both functions must be inside their lock at the same time to pass the
    // barrier, which only works if different keys do not serialize.
    let first = {
        let barrier = Arc::clone(&barrier);
        map.read_write().eval(key("x"), move |v| {
            barrier.wait();
            v.set(1)
        })
    };
    let second = {
        let barrier = Arc::clone(&barrier);
        map.read_write().eval(key("y"), move |v| {
            barrier.wait();
            v.set(2)
        })
    };
    first.join().unwrap();
    second.join().unwrap();
    map.close();
}

#[test]
fn handles_are_shareable_across_threads() {
    static_assertions::assert_impl_all!(cachet::FunctionalMap<String, i64>: Send, Sync, Clone);
    static_assertions::assert_impl_all!(cachet::ReadOnlyMap<String, i64>: Send, Sync);
    static_assertions::assert_impl_all!(cachet::WriteOnlyMap<String, i64>: Send, Sync);
    static_assertions::assert_impl_all!(cachet::ReadWriteMap<String, i64>: Send, Sync);
    static_assertions::assert_impl_all!(cachet::EvalFuture<i64>: Send);
}
