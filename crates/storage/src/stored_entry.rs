//! Storage-layer entry wrapper with expiration support
//!
//! The contract type `CacheEntry<V>` carries a value and a flat metadata
//! set. Inside the store we keep the clock-related metadata as plain
//! timestamps so expiry checks and last-use updates do not have to rebuild
//! the metadata set; `StoredEntry::to_entry` produces the contract view.

use cachet_core::{
    CacheEntry, DerivedMeta, MetaCreated, MetaLastUsed, MetaLifespan, MetaLoadedFromPersistence,
    MetaMaxIdle, MetaParam, MetaParams, Timestamp,
};

/// A stored value with its metadata and clocks
#[derive(Debug, Clone, PartialEq)]
pub struct StoredEntry<V> {
    value: V,
    /// Caller-supplied metadata (lifespan, max idle, version)
    writable: MetaParams,
    created: Timestamp,
    last_used: Timestamp,
    loaded: bool,
}

impl<V: Clone> StoredEntry<V> {
    /// Create an entry written at `now`
    ///
    /// Derived metadata in `metas` is ignored except for the
    /// loaded-from-persistence flag.
    pub fn new(value: V, metas: MetaParams, now: Timestamp) -> Self {
        let loaded = metas
            .find::<MetaLoadedFromPersistence>()
            .map(|m| m.get())
            .unwrap_or(false);
        let writable = metas
            .writable()
            .cloned()
            .map(MetaParam::from)
            .collect::<MetaParams>();
        StoredEntry {
            value,
            writable,
            created: now,
            last_used: now,
            loaded,
        }
    }

    /// The value
    #[inline]
    pub fn value(&self) -> &V {
        &self.value
    }

    /// Creation time
    #[inline]
    pub fn created(&self) -> Timestamp {
        self.created
    }

    /// Last use time
    #[inline]
    pub fn last_used(&self) -> Timestamp {
        self.last_used
    }

    /// Record a use at `now`
    #[inline]
    pub fn touch(&mut self, now: Timestamp) {
        if now > self.last_used {
            self.last_used = now;
        }
    }

    /// Check if this entry has expired at `now`
    ///
    /// Lifespan counts from creation, max idle from the last use.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        if let Some(lifespan) = self.writable.find::<MetaLifespan>().and_then(|l| l.as_duration()) {
            if now.millis_since(self.created) as u128 >= lifespan.as_millis() {
                return true;
            }
        }
        if let Some(idle) = self.writable.find::<MetaMaxIdle>().and_then(|m| m.as_duration()) {
            if now.millis_since(self.last_used) as u128 >= idle.as_millis() {
                return true;
            }
        }
        false
    }

    /// Calculate the lifespan expiry timestamp
    ///
    /// Returns `None` when the entry has no lifespan.
    pub fn expiry_timestamp(&self) -> Option<Timestamp> {
        self.writable
            .find::<MetaLifespan>()
            .and_then(|l| l.as_duration())
            .map(|d| self.created.saturating_add_millis(d.as_millis() as u64))
    }

    /// Contract view: value plus writable and derived metadata
    pub fn to_entry(&self) -> CacheEntry<V> {
        let mut metas = self.writable.clone();
        metas.add(DerivedMeta::Created(MetaCreated::new(self.created)));
        metas.add(DerivedMeta::LastUsed(MetaLastUsed::new(self.last_used)));
        metas.add(DerivedMeta::LoadedFromPersistence(
            MetaLoadedFromPersistence::of(self.loaded),
        ));
        CacheEntry::new(self.value.clone(), metas)
    }

    /// Consume into the contract view
    pub fn into_entry(self) -> CacheEntry<V> {
        self.to_entry()
    }
}
