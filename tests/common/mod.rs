//! Shared test utilities for the integration suites.
//!
//! Import via `#[path = "../common/mod.rs"] mod common;` from a suite's
//! main.rs.

#![allow(dead_code)]
#![allow(unused_imports)]

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Once};

pub use cachet::{
    Error, ExecutionMode, FunctionalConfig, FunctionalMap, LockingMode, MemoryPersistence,
    Ownership, Param, PersistenceMode, ReadEntryView, ReadWriteEntryView, ReplicationMode,
    ReplicationScope, Replicator, Result, StatisticsMode, WriteEntryView, WriteOp,
};

// ============================================================================
// Initialization
// ============================================================================

static INIT_TRACING: Once = Once::new();

/// Route `tracing` output through the test harness
pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing::Level::DEBUG)
            .try_init();
    });
}

static COUNTER: AtomicU64 = AtomicU64::new(0);

/// Map name unique within the test binary
pub fn unique_name(prefix: &str) -> String {
    format!("{}-{}", prefix, COUNTER.fetch_add(1, Ordering::Relaxed))
}

/// Small config for tests
pub fn config(prefix: &str) -> FunctionalConfig {
    let mut config = FunctionalConfig::named(unique_name(prefix));
    config.worker_threads = 4;
    config.lock_timeout_ms = 2_000;
    config
}

// ============================================================================
// Map builders
// ============================================================================

/// In-memory map with string keys and integer values
pub fn new_map(prefix: &str) -> FunctionalMap<String, i64> {
    init_tracing();
    FunctionalMap::new(config(prefix)).expect("map should start")
}

/// Map backed by an inspectable persistence tier
pub fn map_with_persistence(
    prefix: &str,
) -> (FunctionalMap<String, i64>, Arc<MemoryPersistence<String, i64>>) {
    init_tracing();
    let persistence = Arc::new(MemoryPersistence::new());
    let map = FunctionalMap::builder(config(prefix))
        .persistence(Arc::clone(&persistence) as _)
        .build()
        .expect("map should start");
    (map, persistence)
}

/// Shorthand for an owned key
pub fn key(s: &str) -> String {
    s.to_string()
}

/// Keys `k0..k{n}`
pub fn keys(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("k{}", i)).collect()
}

// ============================================================================
// Collaborators
// ============================================================================

/// Owns only keys with an even trailing digit
pub struct EvenOwnership;

impl Ownership<String> for EvenOwnership {
    fn is_local(&self, key: &String) -> bool {
        key.chars()
            .last()
            .and_then(|c| c.to_digit(10))
            .map(|d| d % 2 == 0)
            .unwrap_or(false)
    }
}

/// Records every replicated write with its scope
#[derive(Default)]
pub struct RecordingReplicator {
    ops: Mutex<Vec<(WriteOp<String, i64>, ReplicationScope)>>,
    fail: std::sync::atomic::AtomicBool,
}

impl RecordingReplicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ops(&self) -> Vec<(WriteOp<String, i64>, ReplicationScope)> {
        self.ops.lock().clone()
    }

    pub fn fail_next(&self, fail: bool) {
        self.fail.store(fail, Ordering::Release);
    }
}

impl Replicator<String, i64> for RecordingReplicator {
    fn replicate(&self, op: &WriteOp<String, i64>, scope: ReplicationScope) -> Result<()> {
        if self.fail.load(Ordering::Acquire) {
            return Err(Error::Replication("backup unreachable".to_string()));
        }
        self.ops.lock().push((op.clone(), scope));
        Ok(())
    }
}
