//! Per-map access statistics

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters updated by operations running under `StatisticsMode::Gather`
#[derive(Debug, Default)]
pub(crate) struct StatsCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    stores: AtomicU64,
    removes: AtomicU64,
}

impl StatsCounters {
    pub(crate) fn record_read(&self, hit: bool) {
        if hit {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_store(&self) {
        self.stores.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_remove(&self) {
        self.removes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, expired: u64) -> MapStats {
        MapStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            stores: self.stores.load(Ordering::Relaxed),
            removes: self.removes.load(Ordering::Relaxed),
            expired,
        }
    }
}

/// Snapshot of a map's statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MapStats {
    /// Reads that found a value
    pub hits: u64,
    /// Reads that found nothing
    pub misses: u64,
    /// Values stored
    pub stores: u64,
    /// Entries removed
    pub removes: u64,
    /// Entries evicted by the store because they expired
    pub expired: u64,
}

impl MapStats {
    /// Fraction of reads that were hits, `0.0` before any read
    pub fn hit_ratio(&self) -> f64 {
        let reads = self.hits + self.misses;
        if reads == 0 {
            0.0
        } else {
            self.hits as f64 / reads as f64
        }
    }
}
