//! Per-key locks for read-write functions
//!
//! A read-write function must observe and replace an entry atomically with
//! respect to every other read-write function on the same key. `LockTable`
//! hands out one exclusive lock per key. Lock entries are created on first
//! use and dropped again once the last holder or waiter lets go, so the
//! table only ever contains keys with in-flight work.
//!
//! The acquisition strategy follows `LockingMode`:
//! - `Lock`: wait up to the table timeout, then fail with `LockTimeout`
//! - `TryLock`: fail immediately with `LockUnavailable` when held
//! - `Skip`: take no lock at all

use dashmap::DashMap;
use parking_lot::{Condvar, Mutex};
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::trace;

use cachet_core::{Error, LockingMode, Result};

#[derive(Default)]
struct KeyLock {
    held: Mutex<bool>,
    released: Condvar,
}

/// Table of exclusive per-key locks
pub struct LockTable<K: Eq + Hash> {
    locks: DashMap<K, Arc<KeyLock>>,
    timeout: Duration,
}

impl<K> LockTable<K>
where
    K: Eq + Hash + Clone + Debug,
{
    /// Create a table whose blocking acquisitions give up after `timeout`
    pub fn new(timeout: Duration) -> Self {
        LockTable {
            locks: DashMap::new(),
            timeout,
        }
    }

    /// Timeout applied to `LockingMode::Lock`
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Acquire the lock for `key` according to `mode`
    ///
    /// The lock is held until the returned guard is dropped.
    ///
    /// # Errors
    ///
    /// - [`Error::LockUnavailable`] when `mode` is `TryLock` and the key is held
    /// - [`Error::LockTimeout`] when `mode` is `Lock` and the timeout elapses
    pub fn acquire(&self, key: &K, mode: LockingMode) -> Result<KeyGuard<'_, K>> {
        if mode == LockingMode::Skip {
            return Ok(KeyGuard {
                table: self,
                key: key.clone(),
                lock: None,
            });
        }

        let lock = self
            .locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(KeyLock::default()))
            .value()
            .clone();

        let acquired = {
            let mut held = lock.held.lock();
            match mode {
                LockingMode::TryLock => {
                    if *held {
                        Err(Error::LockUnavailable(format!("{:?}", key)))
                    } else {
                        *held = true;
                        Ok(())
                    }
                }
                _ => {
                    let deadline = Instant::now() + self.timeout;
                    let mut timed_out = false;
                    while *held && !timed_out {
                        timed_out = lock.released.wait_until(&mut held, deadline).timed_out();
                    }
                    if *held {
                        Err(Error::LockTimeout {
                            key: format!("{:?}", key),
                            timeout_ms: self.timeout.as_millis() as u64,
                        })
                    } else {
                        *held = true;
                        Ok(())
                    }
                }
            }
        };

        match acquired {
            Ok(()) => {
                trace!(?key, "Key lock acquired");
                Ok(KeyGuard {
                    table: self,
                    key: key.clone(),
                    lock: Some(lock),
                })
            }
            Err(e) => {
                drop(lock);
                self.forget_if_unused(key);
                Err(e)
            }
        }
    }

    /// Whether some holder currently owns the lock for `key`
    pub fn is_locked(&self, key: &K) -> bool {
        self.locks
            .get(key)
            .map(|l| *l.value().held.lock())
            .unwrap_or(false)
    }

    /// Number of keys with a live lock entry
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    /// Whether no key has a live lock entry
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }

    fn forget_if_unused(&self, key: &K) {
        self.locks.remove_if(key, |_, l| Arc::strong_count(l) == 1);
    }
}

impl<K: Eq + Hash> Debug for LockTable<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockTable")
            .field("keys", &self.locks.len())
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Holds a key lock until dropped
pub struct KeyGuard<'a, K>
where
    K: Eq + Hash + Clone + Debug,
{
    table: &'a LockTable<K>,
    key: K,
    lock: Option<Arc<KeyLock>>,
}

impl<'a, K> KeyGuard<'a, K>
where
    K: Eq + Hash + Clone + Debug,
{
    /// Whether this guard actually holds a lock (false for `Skip`)
    pub fn is_held(&self) -> bool {
        self.lock.is_some()
    }
}

impl<'a, K> Drop for KeyGuard<'a, K>
where
    K: Eq + Hash + Clone + Debug,
{
    fn drop(&mut self) {
        if let Some(lock) = self.lock.take() {
            *lock.held.lock() = false;
            lock.released.notify_all();
            drop(lock);
            self.table.forget_if_unused(&self.key);
            trace!(key = ?self.key, "Key lock released");
        }
    }
}
