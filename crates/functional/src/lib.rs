//! Functional data-access layer for cachet
//!
//! Callers never read or write entries directly. They hand a function to
//! one of three capability surfaces and get back an [`EvalFuture`]:
//!
//! - [`ReadOnlyMap`]: the function sees a [`ReadOnlyView`]
//! - [`WriteOnlyMap`]: the function sees a [`WriteOnlyView`]; the previous
//!   value is never fetched
//! - [`ReadWriteMap`]: the function sees a [`ReadWriteView`] and runs under
//!   the key lock
//!
//! Functions run on the map's worker pool. Bulk reads come back as a lazy
//! [`Traversable`], bulk read-writes as a traversable of per-key outcomes.
//! Listeners observe committed writes; [`ConcurrentMapAdapter`] exposes
//! the whole thing as a blocking concurrent map.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod concurrent_map;
pub mod config;
mod engine;
pub mod functions;
pub mod future;
pub mod listeners;
pub mod map;
pub mod stats;
pub mod traversable;
pub mod view;

pub use concurrent_map::ConcurrentMapAdapter;
pub use config::{FunctionalConfig, ParamsConfig, CONFIG_FILE_NAME};
pub use engine::MapStatus;
pub use functions::{
    NamedFunction, ReadOnlyFunction, ReadWriteArgFunction, ReadWriteFunction, Remove,
    RemoveIfValueEquals, RemoveReturnBoolean, RemoveReturnPrevious, ReturnFind, ReturnIsPresent,
    SetValue, SetValueIfAbsent, SetValueIfAbsentReturnBoolean, SetValueIfEquals,
    SetValueIfPresent, SetValueIfPresentReturnBoolean, SetValueIfVersion, SetValueReturnPrevious,
    SetValueReturnView, WriteOnlyArgFunction, WriteOnlyFunction,
};
pub use future::EvalFuture;
pub use listeners::{
    ListenerHandle, ReadWriteListener, ReadWriteListeners, WriteListener, WriteListeners,
};
pub use map::{FunctionalMap, FunctionalMapBuilder, ReadOnlyMap, ReadWriteMap, WriteOnlyMap};
pub use stats::MapStats;
pub use traversable::Traversable;
pub use view::{
    ReadEntryView, ReadOnlyView, ReadWriteEntryView, ReadWriteView, WriteEntryView, WriteOnlyView,
};
