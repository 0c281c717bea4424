//! Storage layer for cachet
//!
//! This crate implements the single-node collaborators behind the
//! functional maps:
//! - MemoryStore: DashMap-backed value + metadata store with lazy expiry
//! - StoredEntry: Entry wrapper holding lifespan / max-idle clocks
//! - MemoryPersistence: Map-backed persistence tier with traffic counters
//! - VersionGenerator: Monotonic numeric versions for writes

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod memory;
pub mod persistence;
pub mod stored_entry;
pub mod versioning;

pub use memory::MemoryStore;
pub use persistence::MemoryPersistence;
pub use stored_entry::StoredEntry;
pub use versioning::VersionGenerator;
