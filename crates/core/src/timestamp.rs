//! Millisecond-precision wall-clock timestamp
//!
//! Entry metadata (creation time, last use, lifespan, max idle) is expressed
//! in milliseconds, so this is the canonical time representation of the
//! functional layer.
//!
//! ```
//! use cachet_core::Timestamp;
//!
//! let now = Timestamp::now();
//! let later = now.saturating_add_millis(1_500);
//! assert_eq!(later.millis_since(now), 1_500);
//! ```

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Unix epoch (1970-01-01 00:00:00 UTC)
    pub const EPOCH: Timestamp = Timestamp(0);

    /// Create a timestamp for the current moment
    ///
    /// Returns epoch if the system clock is before the Unix epoch.
    pub fn now() -> Self {
        let duration = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Timestamp(duration.as_millis() as u64)
    }

    /// Create a timestamp from milliseconds since epoch
    #[inline]
    pub const fn from_millis(millis: u64) -> Self {
        Timestamp(millis)
    }

    /// Milliseconds since epoch
    #[inline]
    pub const fn as_millis(&self) -> u64 {
        self.0
    }

    /// Add milliseconds, saturating at `u64::MAX`
    #[inline]
    pub const fn saturating_add_millis(&self, millis: u64) -> Self {
        Timestamp(self.0.saturating_add(millis))
    }

    /// Elapsed milliseconds from `earlier` to `self`, zero if `earlier` is later
    #[inline]
    pub const fn millis_since(&self, earlier: Timestamp) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}ms", self.0)
    }
}
