//! Contracts the functional layer consumes from its collaborators
//!
//! The functional maps never talk to a concrete store, persistence tier,
//! topology or replication engine. They go through these traits so that a
//! clustered deployment can swap in its own implementations without
//! touching the upper layer.
//!
//! Thread safety: every collaborator is shared between worker threads and
//! must be `Send + Sync`.

use std::fmt::Debug;
use std::hash::Hash;

use crate::error::{Error, Result};
use crate::meta::MetaParams;

/// Bounds every cache key satisfies
pub trait CacheKey: Eq + Hash + Clone + Debug + Send + Sync + 'static {}

impl<T: Eq + Hash + Clone + Debug + Send + Sync + 'static> CacheKey for T {}

/// Bounds every cache value satisfies
pub trait CacheValue: Clone + Send + Sync + 'static {}

impl<T: Clone + Send + Sync + 'static> CacheValue for T {}

/// A value together with its metadata, as handed across collaborator
/// boundaries
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry<V> {
    /// The stored value
    pub value: V,
    /// Writable and derived metadata
    pub metas: MetaParams,
}

impl<V> CacheEntry<V> {
    /// Pair a value with metadata
    pub fn new(value: V, metas: MetaParams) -> Self {
        CacheEntry { value, metas }
    }
}

// =============================================================================
// Storage
// =============================================================================

/// In-memory value + metadata store
///
/// Implementations own expiration: an expired entry is reported as absent
/// by `get` and `peek`.
pub trait EntryStore<K, V>: Send + Sync {
    /// Current entry, recording the access as a use (max-idle clock)
    fn get(&self, key: &K) -> Option<CacheEntry<V>>;

    /// Current entry without recording a use
    fn peek(&self, key: &K) -> Option<CacheEntry<V>>;

    /// Store `value` with caller metadata; derived metadata is filled in.
    /// Returns the entry as stored.
    fn put(&self, key: K, value: V, metas: MetaParams) -> CacheEntry<V>;

    /// Remove the entry, returning it if it was present
    fn remove(&self, key: &K) -> Option<CacheEntry<V>>;

    /// Whether a live entry exists
    fn contains_key(&self, key: &K) -> bool {
        self.peek(key).is_some()
    }

    /// Keys of live entries, in no particular order
    fn keys(&self) -> Vec<K>;

    /// Number of stored entries (expired ones may still be counted until
    /// they are purged)
    fn len(&self) -> usize;

    /// Whether the store holds no entries
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry
    fn clear(&self);

    /// Number of entries evicted because they expired
    fn expired_count(&self) -> u64 {
        0
    }
}

/// Persistence tier behind the in-memory store
pub trait PersistenceStore<K, V>: Send + Sync {
    /// Load an entry
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn load(&self, key: &K) -> Result<Option<CacheEntry<V>>>;

    /// Write an entry through
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    fn write(&self, key: &K, entry: &CacheEntry<V>) -> Result<()>;

    /// Delete an entry, returning whether it existed
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    fn delete(&self, key: &K) -> Result<bool>;

    /// Delete every entry
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    fn clear(&self) -> Result<()>;
}

// =============================================================================
// Topology
// =============================================================================

/// Key ownership as seen from the local node
pub trait Ownership<K>: Send + Sync {
    /// Whether this node owns `key`
    fn is_local(&self, key: &K) -> bool;
}

/// Single-node topology: every key is owned locally
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalOwnership;

impl<K> Ownership<K> for LocalOwnership {
    fn is_local(&self, _key: &K) -> bool {
        true
    }
}

// =============================================================================
// Replication
// =============================================================================

/// How far a write is propagated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReplicationScope {
    /// Backups in the local site
    Site,
    /// Local backups and remote sites
    CrossSite,
}

/// A write to propagate to backup owners
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp<K, V> {
    /// Entry stored
    Put {
        /// Key written
        key: K,
        /// Entry as stored
        entry: CacheEntry<V>,
    },
    /// Entry removed
    Remove {
        /// Key removed
        key: K,
    },
    /// Every entry removed
    Clear,
}

/// Replication engine
pub trait Replicator<K, V>: Send + Sync {
    /// Propagate `op` to backup owners within `scope`
    ///
    /// # Errors
    ///
    /// Returns an error if the owners did not acknowledge the write.
    fn replicate(&self, op: &WriteOp<K, V>, scope: ReplicationScope) -> Result<()>;
}

/// No backups configured
#[derive(Debug, Clone, Copy, Default)]
pub struct NoReplication;

impl<K, V> Replicator<K, V> for NoReplication {
    fn replicate(&self, _op: &WriteOp<K, V>, _scope: ReplicationScope) -> Result<()> {
        Ok(())
    }
}

// =============================================================================
// Authorization
// =============================================================================

/// Permission required by an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    /// Single-key reads
    Read,
    /// Single-key writes
    Write,
    /// Multi-key and whole-map reads
    BulkRead,
    /// Multi-key and whole-map writes
    BulkWrite,
}

/// Authorization collaborator
///
/// Failures are returned as [`Error::Unauthorized`] and propagated to the
/// caller unchanged.
pub trait Authorizer: Send + Sync {
    /// Check `permission` on the map named `map`
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unauthorized`] when the permission is not granted.
    fn authorize(&self, map: &str, permission: Permission) -> Result<()>;
}

/// Grants every permission
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl Authorizer for AllowAll {
    fn authorize(&self, _map: &str, _permission: Permission) -> Result<()> {
        Ok(())
    }
}

/// Grants only the listed permissions
#[derive(Debug, Clone, Default)]
pub struct PermissionSet {
    granted: Vec<Permission>,
}

impl PermissionSet {
    /// Grant exactly `granted`
    pub fn new(granted: impl IntoIterator<Item = Permission>) -> Self {
        PermissionSet {
            granted: granted.into_iter().collect(),
        }
    }
}

impl Authorizer for PermissionSet {
    fn authorize(&self, map: &str, permission: Permission) -> Result<()> {
        if self.granted.contains(&permission) {
            Ok(())
        } else {
            Err(Error::Unauthorized(format!(
                "{:?} not granted on '{}'",
                permission, map
            )))
        }
    }
}
