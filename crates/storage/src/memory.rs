//! Sharded in-memory entry store
//!
//! `MemoryStore` is the single-node implementation of the `EntryStore`
//! contract.
//!
//! # Design
//!
//! - DashMap: sharded, reads only lock the target shard
//! - FxHash: fast non-crypto hash for the shard maps
//! - Expiration is lazy: an expired entry is evicted by the read that
//!   notices it, or in bulk by `purge_expired`

use dashmap::DashMap;
use rustc_hash::FxHasher;
use std::hash::{BuildHasherDefault, Hash};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

use cachet_core::{CacheEntry, EntryStore, MetaParams, Timestamp};

use crate::stored_entry::StoredEntry;

type FxBuildHasher = BuildHasherDefault<FxHasher>;

/// Sharded in-memory implementation of `EntryStore`
pub struct MemoryStore<K, V> {
    data: DashMap<K, StoredEntry<V>, FxBuildHasher>,
    /// Entries dropped because they expired
    expired: AtomicU64,
}

impl<K, V> MemoryStore<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Create an empty store
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create a store with pre-allocated capacity
    pub fn with_capacity(capacity: usize) -> Self {
        MemoryStore {
            data: DashMap::with_capacity_and_hasher(capacity, FxBuildHasher::default()),
            expired: AtomicU64::new(0),
        }
    }

    /// Evict every expired entry, returning how many were dropped
    pub fn purge_expired(&self) -> usize {
        let now = Timestamp::now();
        let before = self.data.len();
        self.data.retain(|_, e| !e.is_expired(now));
        let purged = before.saturating_sub(self.data.len());
        if purged > 0 {
            self.expired.fetch_add(purged as u64, Ordering::Relaxed);
            debug!(purged, "Purged expired entries");
        }
        purged
    }

    fn read(&self, key: &K, touch: bool) -> Option<CacheEntry<V>> {
        let now = Timestamp::now();
        {
            let mut slot = self.data.get_mut(key)?;
            if !slot.is_expired(now) {
                if touch {
                    slot.touch(now);
                }
                return Some(slot.to_entry());
            }
        }
        // Shard guard dropped above; re-check under the removal lock so a
        // concurrent fresh write is not evicted.
        if self.data.remove_if(key, |_, e| e.is_expired(now)).is_some() {
            self.expired.fetch_add(1, Ordering::Relaxed);
        }
        None
    }
}

impl<K, V> Default for MemoryStore<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash, V> std::fmt::Debug for MemoryStore<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("entries", &self.data.len())
            .field("expired", &self.expired.load(Ordering::Relaxed))
            .finish()
    }
}

impl<K, V> EntryStore<K, V> for MemoryStore<K, V>
where
    K: Eq + Hash + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    fn get(&self, key: &K) -> Option<CacheEntry<V>> {
        self.read(key, true)
    }

    fn peek(&self, key: &K) -> Option<CacheEntry<V>> {
        self.read(key, false)
    }

    fn put(&self, key: K, value: V, metas: MetaParams) -> CacheEntry<V> {
        let stored = StoredEntry::new(value, metas, Timestamp::now());
        let entry = stored.to_entry();
        self.data.insert(key, stored);
        entry
    }

    fn remove(&self, key: &K) -> Option<CacheEntry<V>> {
        let (_, stored) = self.data.remove(key)?;
        if stored.is_expired(Timestamp::now()) {
            self.expired.fetch_add(1, Ordering::Relaxed);
            return None;
        }
        Some(stored.into_entry())
    }

    fn keys(&self) -> Vec<K> {
        let now = Timestamp::now();
        self.data
            .iter()
            .filter(|e| !e.value().is_expired(now))
            .map(|e| e.key().clone())
            .collect()
    }

    fn len(&self) -> usize {
        self.data.len()
    }

    fn clear(&self) {
        self.data.clear();
    }

    fn expired_count(&self) -> u64 {
        self.expired.load(Ordering::Relaxed)
    }
}
