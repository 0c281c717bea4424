//! Version generation for writes
//!
//! Every write that does not carry a caller-supplied version is stamped with
//! the next value of a process-wide counter, so a read-write function can
//! always compare the version it observed with the one a later reader sees.

use std::sync::atomic::{AtomicU64, Ordering};

use cachet_core::NumericEntryVersion;

/// Monotonic source of `NumericEntryVersion`s
#[derive(Debug)]
pub struct VersionGenerator {
    /// Highest version handed out so far
    current: AtomicU64,
}

impl VersionGenerator {
    /// Start after `initial` (the first generated version is `initial + 1`)
    pub fn new(initial: u64) -> Self {
        VersionGenerator {
            current: AtomicU64::new(initial),
        }
    }

    /// Highest version handed out so far
    pub fn current(&self) -> NumericEntryVersion {
        NumericEntryVersion::new(self.current.load(Ordering::SeqCst))
    }

    /// Allocate the next version
    pub fn next(&self) -> NumericEntryVersion {
        NumericEntryVersion::new(self.current.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

impl Default for VersionGenerator {
    fn default() -> Self {
        Self::new(0)
    }
}
