//! In-memory persistence tier
//!
//! `MemoryPersistence` stands in for a real store behind the cache. It keeps
//! entries in a map and counts loads and writes so callers can observe how
//! `PersistenceMode` gates traffic to the tier.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use cachet_core::{CacheEntry, Error, PersistenceStore, Result};

/// Map-backed `PersistenceStore`
pub struct MemoryPersistence<K, V> {
    entries: RwLock<HashMap<K, CacheEntry<V>>>,
    loads: AtomicU64,
    writes: AtomicU64,
    deletes: AtomicU64,
    unavailable: AtomicBool,
}

impl<K: Eq + Hash + Clone, V: Clone> MemoryPersistence<K, V> {
    /// Create an empty store
    pub fn new() -> Self {
        MemoryPersistence {
            entries: RwLock::new(HashMap::new()),
            loads: AtomicU64::new(0),
            writes: AtomicU64::new(0),
            deletes: AtomicU64::new(0),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Seed an entry without counting it as a write
    pub fn seed(&self, key: K, entry: CacheEntry<V>) {
        self.entries.write().insert(key, entry);
    }

    /// Entry currently persisted for `key`
    pub fn peek(&self, key: &K) -> Option<CacheEntry<V>> {
        self.entries.read().get(key).cloned()
    }

    /// Number of persisted entries
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether nothing is persisted
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Number of `load` calls served
    pub fn load_count(&self) -> u64 {
        self.loads.load(Ordering::Relaxed)
    }

    /// Number of `write` calls served
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    /// Number of `delete` calls served
    pub fn delete_count(&self) -> u64 {
        self.deletes.load(Ordering::Relaxed)
    }

    /// Make every subsequent call fail (or succeed again)
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::Release);
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::Acquire) {
            return Err(Error::Persistence("store unavailable".to_string()));
        }
        Ok(())
    }
}

impl<K: Eq + Hash + Clone, V: Clone> Default for MemoryPersistence<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> PersistenceStore<K, V> for MemoryPersistence<K, V>
where
    K: Eq + Hash + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    fn load(&self, key: &K) -> Result<Option<CacheEntry<V>>> {
        self.check_available()?;
        self.loads.fetch_add(1, Ordering::Relaxed);
        Ok(self.entries.read().get(key).cloned())
    }

    fn write(&self, key: &K, entry: &CacheEntry<V>) -> Result<()> {
        self.check_available()?;
        self.writes.fetch_add(1, Ordering::Relaxed);
        self.entries.write().insert(key.clone(), entry.clone());
        Ok(())
    }

    fn delete(&self, key: &K) -> Result<bool> {
        self.check_available()?;
        self.deletes.fetch_add(1, Ordering::Relaxed);
        Ok(self.entries.write().remove(key).is_some())
    }

    fn clear(&self) -> Result<()> {
        self.check_available()?;
        self.entries.write().clear();
        Ok(())
    }
}
