//! Functional map handles
//!
//! A [`FunctionalMap`] is a named, status-bearing handle on one engine plus
//! a set of per-call [`Params`]. It does not read or write anything itself;
//! it hands out the three capability surfaces:
//!
//! - [`ReadOnlyMap`]: evaluate functions against read-only views, never
//!   locking
//! - [`WriteOnlyMap`]: evaluate functions against write-only views, never
//!   fetching the previous value
//! - [`ReadWriteMap`]: evaluate functions against read-write views under
//!   the key lock
//!
//! Every handle is cheap to clone. `with_params` returns a new handle that
//! shares the engine and overrides some params.
//!
//! # Example
//!
//! ```
//! use cachet_functional::{FunctionalConfig, FunctionalMap, ReadEntryView, WriteEntryView};
//!
//! let map: FunctionalMap<String, u32> = FunctionalMap::new(FunctionalConfig::named("docs")).unwrap();
//! map.write_only().eval("a".to_string(), |v| v.set(1)).join().unwrap();
//! let found = map.read_only().eval("a".to_string(), |v| v.find().copied()).join().unwrap();
//! assert_eq!(found, Some(1));
//! map.close();
//! ```

mod read_only;
mod read_write;
mod write_only;

pub use read_only::ReadOnlyMap;
pub use read_write::ReadWriteMap;
pub use write_only::WriteOnlyMap;

use std::sync::Arc;

use cachet_core::{
    AllowAll, Authorizer, CacheKey, CacheValue, EntryStore, LocalOwnership, NoReplication,
    Ownership, Param, Params, PersistenceStore, Replicator, Result,
};
use cachet_storage::MemoryStore;

use crate::config::FunctionalConfig;
use crate::engine::{Collaborators, Engine, MapStatus};
use crate::stats::MapStats;

/// Handle on one functional map
pub struct FunctionalMap<K: CacheKey, V: CacheValue> {
    engine: Arc<Engine<K, V>>,
    params: Params,
}

impl<K: CacheKey, V: CacheValue> FunctionalMap<K, V> {
    /// Map backed by an in-memory store and no persistence tier
    ///
    /// # Errors
    ///
    /// Returns an error if `config` is invalid or the worker pool cannot
    /// be started.
    pub fn new(config: FunctionalConfig) -> Result<Self> {
        Self::builder(config).build()
    }

    /// Builder for plugging in collaborators
    pub fn builder(config: FunctionalConfig) -> FunctionalMapBuilder<K, V> {
        FunctionalMapBuilder::new(config)
    }

    /// Map name
    pub fn name(&self) -> &str {
        self.engine.name()
    }

    /// Lifecycle state
    pub fn status(&self) -> MapStatus {
        self.engine.status()
    }

    /// Params applied to operations made through this handle
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Handle on the same map with `params` overriding this handle's
    pub fn with_params(&self, params: &[Param]) -> Self {
        FunctionalMap {
            engine: Arc::clone(&self.engine),
            params: self.params.add_all(params),
        }
    }

    /// Statistics gathered so far
    pub fn stats(&self) -> MapStats {
        self.engine.stats()
    }

    /// Stop accepting operations, finish queued ones and stop the workers.
    ///
    /// Closes the map for every handle sharing it. Later operations
    /// complete with `Error::MapClosed`.
    pub fn close(&self) {
        self.engine.close()
    }

    /// Read-only surface
    pub fn read_only(&self) -> ReadOnlyMap<K, V> {
        ReadOnlyMap::new(self.clone())
    }

    /// Write-only surface
    pub fn write_only(&self) -> WriteOnlyMap<K, V> {
        WriteOnlyMap::new(self.clone())
    }

    /// Read-write surface
    pub fn read_write(&self) -> ReadWriteMap<K, V> {
        ReadWriteMap::new(self.clone())
    }

    pub(crate) fn engine(&self) -> &Arc<Engine<K, V>> {
        &self.engine
    }
}

impl<K: CacheKey, V: CacheValue> Clone for FunctionalMap<K, V> {
    fn clone(&self) -> Self {
        FunctionalMap {
            engine: Arc::clone(&self.engine),
            params: self.params,
        }
    }
}

impl<K: CacheKey, V: CacheValue> std::fmt::Debug for FunctionalMap<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionalMap")
            .field("name", &self.name())
            .field("status", &self.status())
            .field("params", &self.params)
            .finish()
    }
}

/// Builder for a [`FunctionalMap`] with custom collaborators
///
/// Anything not supplied falls back to the single-node defaults: an
/// in-memory store, no persistence tier, local ownership of every key, no
/// replication and no authorization checks.
pub struct FunctionalMapBuilder<K, V> {
    config: FunctionalConfig,
    store: Option<Arc<dyn EntryStore<K, V>>>,
    persistence: Option<Arc<dyn PersistenceStore<K, V>>>,
    ownership: Arc<dyn Ownership<K>>,
    replicator: Arc<dyn Replicator<K, V>>,
    authorizer: Arc<dyn Authorizer>,
}

impl<K: CacheKey, V: CacheValue> FunctionalMapBuilder<K, V> {
    fn new(config: FunctionalConfig) -> Self {
        FunctionalMapBuilder {
            config,
            store: None,
            persistence: None,
            ownership: Arc::new(LocalOwnership),
            replicator: Arc::new(NoReplication),
            authorizer: Arc::new(AllowAll),
        }
    }

    /// In-memory entry store
    pub fn store(mut self, store: Arc<dyn EntryStore<K, V>>) -> Self {
        self.store = Some(store);
        self
    }

    /// Persistence tier behind the store
    pub fn persistence(mut self, persistence: Arc<dyn PersistenceStore<K, V>>) -> Self {
        self.persistence = Some(persistence);
        self
    }

    /// Key ownership, consulted under `ExecutionMode::Local`
    pub fn ownership(mut self, ownership: Arc<dyn Ownership<K>>) -> Self {
        self.ownership = ownership;
        self
    }

    /// Replication engine
    pub fn replicator(mut self, replicator: Arc<dyn Replicator<K, V>>) -> Self {
        self.replicator = replicator;
        self
    }

    /// Authorization collaborator
    pub fn authorizer(mut self, authorizer: Arc<dyn Authorizer>) -> Self {
        self.authorizer = authorizer;
        self
    }

    /// Start the map
    ///
    /// # Errors
    ///
    /// Returns an error if the config is invalid or the worker pool cannot
    /// be started.
    pub fn build(self) -> Result<FunctionalMap<K, V>> {
        let store: Arc<dyn EntryStore<K, V>> = match self.store {
            Some(store) => store,
            None => Arc::new(MemoryStore::new()),
        };
        let engine = Engine::start(
            self.config,
            Collaborators {
                store,
                persistence: self.persistence,
                ownership: self.ownership,
                replicator: self.replicator,
                authorizer: self.authorizer,
            },
        )?;
        Ok(FunctionalMap {
            params: engine.default_params(),
            engine,
        })
    }
}
