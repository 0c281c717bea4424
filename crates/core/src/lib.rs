//! Core types and traits for cachet
//!
//! This crate defines the foundational types used throughout the workspace:
//! - Error: Error type and `Result` alias
//! - Timestamp: Millisecond wall-clock time
//! - EntryVersion: Comparable version tokens (numeric, vector clock)
//! - MetaParam: Writable and derived per-entry metadata
//! - Param: Per-invocation tunables and their discriminant-indexed table
//! - Traits: Collaborator contracts (store, persistence, ownership,
//!   replication, authorization)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod meta;
pub mod params;
pub mod timestamp;
pub mod traits;
pub mod version;

pub use error::{Error, Result};
pub use meta::{
    DerivedMeta, Lookup, MetaCreated, MetaEntryVersion, MetaKind, MetaLastUsed, MetaLifespan,
    MetaLoadedFromPersistence, MetaMaxIdle, MetaParam, MetaParamKind, MetaParams, WritableMeta,
};
pub use params::{
    ExecutionMode, LockingMode, Param, Params, PersistenceMode, ReplicationMode, StatisticsMode,
};
pub use timestamp::Timestamp;
pub use traits::{
    AllowAll, Authorizer, CacheEntry, CacheKey, CacheValue, EntryStore, LocalOwnership,
    NoReplication, Ownership, Permission, PermissionSet, PersistenceStore, ReplicationScope,
    Replicator, WriteOp,
};
pub use version::{CompareResult, EntryVersion, NumericEntryVersion, VectorClockVersion, Version};
