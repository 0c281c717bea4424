//! Concurrency layer for cachet
//!
//! This crate provides the two pieces of machinery every functional map
//! runs on:
//! - Executor: bounded worker pool that runs function bodies asynchronously
//! - LockTable: exclusive per-key locks for read-write functions

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod executor;
pub mod lock;

pub use executor::{Executor, ExecutorStats};
pub use lock::{KeyGuard, LockTable};
