//! Per-call params: locking, persistence, execution, statistics,
//! replication, plus authorization

use crate::common::*;
use cachet::{CacheEntry, MetaParams, Permission, PermissionSet};
use std::sync::mpsc;
use std::sync::Arc;

// ============================================================================
// Locking
// ============================================================================

/// Start a read-write function on `k` that holds the key lock until the
/// returned sender fires
fn hold_lock(
    map: &FunctionalMap<String, i64>,
    k: &str,
) -> (mpsc::Sender<()>, cachet::EvalFuture<()>) {
    let (entered_tx, entered_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel::<()>();
    let holder = map.read_write().eval(key(k), move |v| {
        entered_tx.send(()).unwrap();
        release_rx.recv().unwrap();
        v.set(1)
    });
    entered_rx.recv().unwrap();
    (release_tx, holder)
}

#[test]
fn try_lock_fails_while_key_is_held() {
    let map = new_map("pm-trylock");
    let (release, holder) = hold_lock(&map, "a");

    let outcome = map
        .read_write()
        .with_params(&[Param::Locking(LockingMode::TryLock)])
        .eval(key("a"), |v| v.set(2))
        .join();
    assert!(matches!(outcome, Err(Error::LockUnavailable(_))));

    // Other keys are unaffected
    map.read_write()
        .with_params(&[Param::Locking(LockingMode::TryLock)])
        .eval(key("b"), |v| v.set(2))
        .join()
        .unwrap();

    release.send(()).unwrap();
    holder.join().unwrap();
    map.close();
}

#[test]
fn lock_wait_times_out() {
    init_tracing();
    let mut cfg = config("pm-timeout");
    cfg.lock_timeout_ms = 50;
    let map: FunctionalMap<String, i64> = FunctionalMap::new(cfg).unwrap();
    let (release, holder) = hold_lock(&map, "a");

    let outcome = map.write_only().eval(key("a"), |v| v.set(2)).join();
    assert!(matches!(outcome, Err(Error::LockTimeout { timeout_ms: 50, .. })));
    assert!(outcome.unwrap_err().is_lock_failure());

    release.send(()).unwrap();
    holder.join().unwrap();
    map.close();
}

#[test]
fn skip_locking_ignores_held_lock() {
    let map = new_map("pm-skiplock");
    let (release, holder) = hold_lock(&map, "a");

    map.write_only()
        .with_params(&[Param::Locking(LockingMode::Skip)])
        .eval(key("a"), |v| v.set(5))
        .join()
        .unwrap();

    release.send(()).unwrap();
    holder.join().unwrap();
    map.close();
}

// ============================================================================
// Persistence
// ============================================================================

#[test]
fn skip_persist_keeps_write_in_memory() {
    let (map, persistence) = map_with_persistence("pm-skippersist");
    map.write_only()
        .with_params(&[Param::Persistence(PersistenceMode::SkipPersist)])
        .eval(key("a"), |v| v.set(1))
        .join()
        .unwrap();
    assert_eq!(persistence.write_count(), 0);

    let found = map.read_only().eval(key("a"), |v| v.find().copied()).join().unwrap();
    assert_eq!(found, Some(1));
    map.close();
}

#[test]
fn skip_load_does_not_consult_persistence() {
    let (map, persistence) = map_with_persistence("pm-skipload");
    persistence.seed(key("p"), CacheEntry::new(7, MetaParams::new()));

    let skipped = map
        .read_only()
        .with_params(&[Param::Persistence(PersistenceMode::SkipLoad)])
        .eval(key("p"), |v| v.find().copied())
        .join()
        .unwrap();
    assert_eq!(skipped, None);
    assert_eq!(persistence.load_count(), 0);

    let loaded = map.read_only().eval(key("p"), |v| v.find().copied()).join().unwrap();
    assert_eq!(loaded, Some(7));
    assert_eq!(persistence.load_count(), 1);
    map.close();
}

#[test]
fn read_only_load_is_not_activated_into_memory() {
    let (map, persistence) = map_with_persistence("pm-noactivate");
    persistence.seed(key("p"), CacheEntry::new(7, MetaParams::new()));

    map.read_only().eval(key("p"), |v| v.find().copied()).join().unwrap();
    assert_eq!(map.read_only().keys().unwrap().count(), 0);
    map.close();
}

#[test]
fn persistence_failure_fails_the_write() {
    let (map, persistence) = map_with_persistence("pm-unavailable");
    persistence.set_unavailable(true);
    let outcome = map.write_only().eval(key("a"), |v| v.set(1)).join();
    assert!(matches!(outcome, Err(Error::Persistence(_))));

    persistence.set_unavailable(false);
    let seen = map.read_only().eval(key("a"), |v| v.find().copied()).join().unwrap();
    assert_eq!(seen, None);
    assert_eq!(map.stats().stores, 0);
    map.close();
}

#[test]
fn persistence_failure_keeps_previous_value() {
    let (map, persistence) = map_with_persistence("pm-unavailable-keep");
    let rw = map.read_write();
    rw.eval(key("a"), |v| v.set(1)).join().unwrap();

    persistence.set_unavailable(true);
    assert!(rw.eval(key("a"), |v| v.set(2)).join().is_err());
    assert!(rw.eval(key("a"), |v| v.remove()).join().is_err());
    persistence.set_unavailable(false);

    let seen = rw.eval(key("a"), |v| v.find().copied()).join().unwrap();
    assert_eq!(seen, Some(1));
    assert_eq!(persistence.peek(&key("a")).map(|e| e.value), Some(1));
    map.close();
}

// ============================================================================
// Execution and replication
// ============================================================================

#[test]
fn local_execution_drops_writes_to_keys_owned_elsewhere() {
    init_tracing();
    let replicator = Arc::new(RecordingReplicator::new());
    let map: FunctionalMap<String, i64> = FunctionalMap::builder(config("pm-local"))
        .ownership(Arc::new(EvenOwnership))
        .replicator(Arc::clone(&replicator) as _)
        .build()
        .unwrap();
    let local = map.write_only().with_params(&[Param::Execution(ExecutionMode::Local)]);

    local.eval(key("k1"), |v| v.set(1)).join().unwrap();
    local.eval(key("k2"), |v| v.set(2)).join().unwrap();

    let mut stored: Vec<String> = map.read_only().keys().unwrap().collect();
    stored.sort();
    assert_eq!(stored, vec!["k2"]);
    assert!(replicator.ops().is_empty());
    map.close();
}

#[test]
fn local_execution_does_not_fetch_keys_owned_elsewhere() {
    init_tracing();
    let persistence = Arc::new(MemoryPersistence::<String, i64>::new());
    persistence.seed(key("k1"), CacheEntry::new(1, MetaParams::new()));
    persistence.seed(key("k2"), CacheEntry::new(2, MetaParams::new()));
    let map: FunctionalMap<String, i64> = FunctionalMap::builder(config("pm-local-read"))
        .ownership(Arc::new(EvenOwnership))
        .persistence(Arc::clone(&persistence) as _)
        .build()
        .unwrap();
    let local = map.read_only().with_params(&[Param::Execution(ExecutionMode::Local)]);

    let remote = local.eval(key("k1"), |v| v.find().copied()).join().unwrap();
    assert_eq!(remote, None);
    assert_eq!(persistence.load_count(), 0);

    let owned = local.eval(key("k2"), |v| v.find().copied()).join().unwrap();
    assert_eq!(owned, Some(2));
    assert_eq!(persistence.load_count(), 1);
    map.close();
}

#[test]
fn replication_scope_follows_execution_mode() {
    init_tracing();
    let replicator = Arc::new(RecordingReplicator::new());
    let map: FunctionalMap<String, i64> = FunctionalMap::builder(config("pm-scope"))
        .replicator(Arc::clone(&replicator) as _)
        .build()
        .unwrap();

    map.write_only().eval(key("a"), |v| v.set(1)).join().unwrap();
    map.write_only()
        .with_params(&[Param::Execution(ExecutionMode::LocalSite)])
        .eval(key("a"), |v| v.remove())
        .join()
        .unwrap();

    let ops = replicator.ops();
    assert_eq!(ops.len(), 2);
    assert!(matches!(&ops[0], (WriteOp::Put { key, .. }, ReplicationScope::CrossSite) if key == "a"));
    assert!(matches!(&ops[1], (WriteOp::Remove { key }, ReplicationScope::Site) if key == "a"));
    map.close();
}

#[test]
fn sync_replication_failure_surfaces_async_does_not() {
    init_tracing();
    let replicator = Arc::new(RecordingReplicator::new());
    let map: FunctionalMap<String, i64> = FunctionalMap::builder(config("pm-repl-fail"))
        .replicator(Arc::clone(&replicator) as _)
        .build()
        .unwrap();
    replicator.fail_next(true);

    let sync = map.write_only().eval(key("a"), |v| v.set(1)).join();
    assert!(matches!(sync, Err(Error::Replication(_))));
    let unchanged = map.read_only().eval(key("a"), |v| v.find().copied()).join().unwrap();
    assert_eq!(unchanged, None);

    let not_waited = map
        .write_only()
        .with_params(&[Param::Replication(ReplicationMode::Async)])
        .eval(key("b"), |v| v.set(1))
        .join();
    assert!(not_waited.is_ok());
    map.close();
}

#[test]
fn sync_replication_failure_rolls_back_persistence() {
    init_tracing();
    let replicator = Arc::new(RecordingReplicator::new());
    let persistence = Arc::new(MemoryPersistence::<String, i64>::new());
    let map: FunctionalMap<String, i64> = FunctionalMap::builder(config("pm-repl-rollback"))
        .replicator(Arc::clone(&replicator) as _)
        .persistence(Arc::clone(&persistence) as _)
        .build()
        .unwrap();
    let rw = map.read_write();
    rw.eval(key("a"), |v| v.set(1)).join().unwrap();

    replicator.fail_next(true);
    assert!(rw.eval(key("a"), |v| v.set(2)).join().is_err());
    assert!(rw.eval(key("b"), |v| v.set(3)).join().is_err());
    replicator.fail_next(false);

    assert_eq!(persistence.peek(&key("a")).map(|e| e.value), Some(1));
    assert!(persistence.peek(&key("b")).is_none());
    let seen = rw.eval(key("a"), |v| v.find().copied()).join().unwrap();
    assert_eq!(seen, Some(1));
    map.close();
}

// ============================================================================
// Statistics
// ============================================================================

#[test]
fn statistics_gathered_unless_skipped() {
    let map = new_map("pm-stats");
    let rw = map.read_write();
    rw.eval(key("a"), |v| v.set(1)).join().unwrap();
    rw.eval(key("a"), |v| v.find().copied()).join().unwrap();
    rw.eval(key("a"), |v| v.remove()).join().unwrap();

    let stats = map.stats();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits, 2);
    assert_eq!(stats.stores, 1);
    assert_eq!(stats.removes, 1);

    rw.with_params(&[Param::Statistics(StatisticsMode::Skip)])
        .eval(key("b"), |v| v.set(1))
        .join()
        .unwrap();
    assert_eq!(map.stats(), stats);
    map.close();
}

#[test]
fn statistics_disabled_in_config() {
    init_tracing();
    let mut cfg = config("pm-nostats");
    cfg.statistics = false;
    let map: FunctionalMap<String, i64> = FunctionalMap::new(cfg).unwrap();
    map.read_write().eval(key("a"), |v| v.set(1)).join().unwrap();
    assert_eq!(map.stats().stores, 0);
    assert_eq!(map.stats().hit_ratio(), 0.0);
    map.close();
}

// ============================================================================
// Authorization
// ============================================================================

#[test]
fn unauthorized_operations_fail_through_the_future() {
    init_tracing();
    let map: FunctionalMap<String, i64> = FunctionalMap::builder(config("pm-auth"))
        .authorizer(Arc::new(PermissionSet::new([Permission::Read])))
        .build()
        .unwrap();

    let write = map.write_only().eval(key("a"), |v| v.set(1)).join();
    assert!(matches!(write, Err(Error::Unauthorized(_))));

    let read = map.read_only().eval(key("a"), |v| v.find().copied()).join();
    assert_eq!(read.unwrap(), None);

    assert!(matches!(map.read_only().keys(), Err(Error::Unauthorized(_))));
    map.close();
}

#[test]
fn with_params_does_not_change_the_original_handle() {
    let map = new_map("pm-handles");
    let skipping = map.with_params(&[Param::Locking(LockingMode::Skip)]);
    assert_eq!(skipping.params().locking(), LockingMode::Skip);
    assert_eq!(map.params().locking(), LockingMode::Lock);
    map.close();
}
