//! Cachet - functional, capability-scoped access to an in-memory cache
//!
//! Callers submit functions that receive a view of one entry; the view's
//! type decides whether the function may read, write or both.
//!
//! # Quick Start
//!
//! ```
//! use cachet::{FunctionalConfig, FunctionalMap, ReadEntryView, ReadWriteEntryView};
//!
//! let map: FunctionalMap<String, u64> = FunctionalMap::new(FunctionalConfig::named("counters"))?;
//! let rw = map.read_write();
//!
//! // Increment atomically per key
//! let next = rw
//!     .eval("hits".to_string(), |v| v.compute(|n| Some(n.copied().unwrap_or(0) + 1)))
//!     .join()?;
//! assert_eq!(next, Some(1));
//!
//! let hits = map.read_only().eval("hits".to_string(), |v| v.find().copied()).join()?;
//! assert_eq!(hits, Some(1));
//! map.close();
//! # Ok::<(), cachet::Error>(())
//! ```
//!
//! # Architecture
//!
//! - `cachet-core`: errors, params, metadata, versions and collaborator traits
//! - `cachet-storage`: in-memory entry store, persistence stand-in, versions
//! - `cachet-concurrency`: worker pool and per-key lock table
//! - `cachet-functional`: engine, views, map triad, listeners, traversables

pub use cachet_core::*;
pub use cachet_functional::*;
pub use cachet_storage::{MemoryPersistence, MemoryStore, VersionGenerator};
