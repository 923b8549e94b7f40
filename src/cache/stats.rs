//! Cache Statistics Module
//!
//! Point-in-time snapshot of occupancy and activity counters.

use serde::Serialize;

// == Cache Stats ==
/// Snapshot returned by `BoundedCache::stats`, taken under the cache lock.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Current number of entries in the cache
    pub entry_count: usize,
    /// Bytes charged by current entries
    pub used_bytes: u64,
    /// Configured memory budget
    pub budget_bytes: u64,
    /// Entries removed to stay under the budget
    pub eviction_count: u64,
    /// Successful reads
    pub hits: u64,
    /// Reads of absent or expired keys
    pub misses: u64,
    /// Entries removed because their TTL elapsed
    pub expirations: u64,
    /// Entries removed by explicit delete
    pub deletions: u64,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new(budget_bytes: u64) -> Self {
        Self {
            budget_bytes,
            ..Self::default()
        }
    }

    // == Hit Rate ==
    /// Returns hits / (hits + misses), or 0.0 if no reads have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// Fraction of the budget in use.
    pub fn utilization(&self) -> f64 {
        if self.budget_bytes == 0 {
            0.0
        } else {
            self.used_bytes as f64 / self.budget_bytes as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_eviction(&mut self) {
        self.eviction_count += 1;
    }

    pub fn record_expiration(&mut self) {
        self.expirations += 1;
    }

    pub fn record_deletion(&mut self) {
        self.deletions += 1;
    }
}
