//! Error types for cachet
//!
//! This module defines all error types used throughout the functional layer.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! Every failure produced while executing a user function (or by one of the
//! collaborators the engine consumes) travels through the same channel: the
//! future returned by the map operation completes with one of these variants.

use std::io;
use thiserror::Error;

/// Result type alias for cachet operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the functional data-access layer
#[derive(Debug, Error)]
pub enum Error {
    /// `get()` was called on an entry view whose value is absent
    #[error("No value present for key")]
    NoSuchElement,

    /// `LockingMode::TryLock` found the key already locked
    #[error("Lock unavailable for key {0}")]
    LockUnavailable(String),

    /// Waiting for a per-key lock exceeded the configured timeout
    #[error("Timed out after {timeout_ms}ms acquiring lock for key {key}")]
    LockTimeout {
        /// Debug rendering of the contended key
        key: String,
        /// Configured acquisition timeout
        timeout_ms: u64,
    },

    /// A user function panicked while it was being executed
    #[error("Function panicked: {0}")]
    FunctionPanicked(String),

    /// Authorization collaborator refused the operation
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Replication collaborator failed to apply a write
    #[error("Replication error: {0}")]
    Replication(String),

    /// Persistence store failure
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Executor queue is full or the executor has been shut down
    #[error("Operation rejected by executor")]
    Rejected,

    /// Operation invoked on a map that has been closed
    #[error("Functional map '{0}' is closed")]
    MapClosed(String),

    /// Completion handle was dropped before a result was produced
    #[error("Operation cancelled before completion")]
    Cancelled,

    /// Configuration could not be parsed or validated
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// I/O error (configuration files)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Whether the failure came from key-level lock contention
    pub fn is_lock_failure(&self) -> bool {
        matches!(self, Error::LockUnavailable(_) | Error::LockTimeout { .. })
    }

    /// Build a `FunctionPanicked` from a `catch_unwind` payload
    pub fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Error::FunctionPanicked(message)
    }
}
