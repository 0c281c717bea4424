//! Entry version types
//!
//! A version is an opaque token attached to an entry on write and read back
//! unchanged until the entry is overwritten or removed. Versions are
//! compared with [`EntryVersion::compare_to`], which classifies the relation
//! between two versions into a [`CompareResult`].
//!
//! ## Ordering
//!
//! The relation is **not** a total order. `Conflicting` is a legitimate,
//! non-error outcome for partition-aware schemes (two writers on different
//! sides of a partition), so callers must not assume antisymmetry or
//! transitivity.
//!
//! - [`NumericEntryVersion`]: total order over a `u64`, never `Conflicting`
//! - [`VectorClockVersion`]: per-site counters, `Conflicting` when concurrent
//! - [`Version`]: closed sum of the two schemes, stored as entry metadata
//!
//! ## Conflict policy
//!
//! The functional layer never resolves `Conflicting` on its own. Whatever
//! version a writer supplies is stored; a caller that cares about conflicts
//! compares versions inside a read-write function and decides there.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Outcome of comparing two entry versions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompareResult {
    /// `self` happened strictly before `other`
    Before,
    /// `self` happened strictly after `other`
    After,
    /// Both versions denote the same write
    Equal,
    /// Neither version dominates the other
    Conflicting,
}

impl CompareResult {
    /// Swap `Before` and `After`; `Equal` and `Conflicting` are symmetric
    pub const fn reverse(self) -> Self {
        match self {
            CompareResult::Before => CompareResult::After,
            CompareResult::After => CompareResult::Before,
            other => other,
        }
    }
}

/// An opaque, comparable version token
pub trait EntryVersion {
    /// Underlying representation
    type Value;

    /// The wrapped value
    fn get(&self) -> &Self::Value;

    /// Classify the relation between `self` and `other`
    fn compare_to(&self, other: &Self) -> CompareResult;
}

// =============================================================================
// Numeric
// =============================================================================

/// Totally ordered, counter-based version
///
/// `compare_to` maps `<`, `>`, `==` on the counter to `Before`, `After`,
/// `Equal`. It never yields `Conflicting`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NumericEntryVersion(u64);

impl NumericEntryVersion {
    /// Create a numeric version
    pub const fn new(value: u64) -> Self {
        NumericEntryVersion(value)
    }

    /// Raw counter value
    #[inline]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// The version following this one
    pub const fn next(&self) -> Self {
        NumericEntryVersion(self.0.saturating_add(1))
    }
}

impl EntryVersion for NumericEntryVersion {
    type Value = u64;

    fn get(&self) -> &u64 {
        &self.0
    }

    fn compare_to(&self, other: &Self) -> CompareResult {
        match self.0.cmp(&other.0) {
            std::cmp::Ordering::Less => CompareResult::Before,
            std::cmp::Ordering::Greater => CompareResult::After,
            std::cmp::Ordering::Equal => CompareResult::Equal,
        }
    }
}

impl std::fmt::Display for NumericEntryVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "v{}", self.0)
    }
}

// =============================================================================
// Vector clock
// =============================================================================

/// Partition-aware version made of per-site counters
///
/// A site that does not appear in the clock counts as zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VectorClockVersion(BTreeMap<String, u64>);

impl VectorClockVersion {
    /// Empty clock (every site at zero)
    pub fn new() -> Self {
        Self::default()
    }

    /// Counter for `site`
    pub fn counter(&self, site: &str) -> u64 {
        self.0.get(site).copied().unwrap_or(0)
    }

    /// Return a copy with `site`'s counter incremented
    pub fn increment(&self, site: &str) -> Self {
        let mut clock = self.0.clone();
        *clock.entry(site.to_string()).or_insert(0) += 1;
        VectorClockVersion(clock)
    }

    /// Pointwise maximum of both clocks
    pub fn merge(&self, other: &Self) -> Self {
        let mut clock = self.0.clone();
        for (site, &n) in &other.0 {
            let slot = clock.entry(site.clone()).or_insert(0);
            *slot = (*slot).max(n);
        }
        VectorClockVersion(clock)
    }
}

impl EntryVersion for VectorClockVersion {
    type Value = BTreeMap<String, u64>;

    fn get(&self) -> &BTreeMap<String, u64> {
        &self.0
    }

    fn compare_to(&self, other: &Self) -> CompareResult {
        let mut less = false;
        let mut greater = false;
        for site in self.0.keys().chain(other.0.keys()) {
            let (a, b) = (self.counter(site), other.counter(site));
            if a < b {
                less = true;
            } else if a > b {
                greater = true;
            }
        }
        match (less, greater) {
            (false, false) => CompareResult::Equal,
            (true, false) => CompareResult::Before,
            (false, true) => CompareResult::After,
            (true, true) => CompareResult::Conflicting,
        }
    }
}

// =============================================================================
// Version (metadata payload)
// =============================================================================

/// Version attached to an entry through the version meta param
///
/// Versions of different schemes cannot be ordered against each other and
/// compare as `Conflicting`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Version {
    /// Counter-based version, generated by the engine when a writer
    /// supplies none
    Numeric(NumericEntryVersion),
    /// Site-aware version supplied by the writer
    VectorClock(VectorClockVersion),
}

impl Version {
    /// Numeric version shortcut
    pub const fn numeric(value: u64) -> Self {
        Version::Numeric(NumericEntryVersion::new(value))
    }

    /// The numeric version, if this is one
    pub fn as_numeric(&self) -> Option<NumericEntryVersion> {
        match self {
            Version::Numeric(v) => Some(*v),
            Version::VectorClock(_) => None,
        }
    }

    /// Classify the relation between two versions
    pub fn compare_to(&self, other: &Version) -> CompareResult {
        match (self, other) {
            (Version::Numeric(a), Version::Numeric(b)) => a.compare_to(b),
            (Version::VectorClock(a), Version::VectorClock(b)) => a.compare_to(b),
            _ => CompareResult::Conflicting,
        }
    }
}

impl From<NumericEntryVersion> for Version {
    fn from(v: NumericEntryVersion) -> Self {
        Version::Numeric(v)
    }
}

impl From<VectorClockVersion> for Version {
    fn from(v: VectorClockVersion) -> Self {
        Version::VectorClock(v)
    }
}
