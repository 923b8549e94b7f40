//! Eviction Analysis Module
//!
//! Turns recorded eviction history into distributions and log events. Lives
//! outside the cache core; the core itself never logs.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::cache::{EvictionObserver, EvictionReason, EvictionRecord};

/// Parses the numeric suffix of a key such as `loop-42`.
pub fn key_index(key: &str, prefix: &str) -> Option<u64> {
    key.strip_prefix(prefix)?.parse().ok()
}

// == Distribution ==
/// One histogram bucket covering `[start, start + width)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bucket {
    pub start: u64,
    pub count: u64,
}

/// Histogram of evicted key indices in fixed-width buckets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EvictionDistribution {
    pub prefix: String,
    pub bucket_width: u64,
    /// Non-empty buckets in ascending order
    pub buckets: Vec<Bucket>,
    /// Records whose key matched the prefix
    pub total: u64,
}

impl EvictionDistribution {
    /// Builds the distribution of memory-pressure evictions whose keys carry
    /// `prefix` followed by an integer index. Other records are skipped.
    pub fn from_records(records: &[EvictionRecord], prefix: &str, bucket_width: u64) -> Self {
        let bucket_width = bucket_width.max(1);
        let mut counts: BTreeMap<u64, u64> = BTreeMap::new();
        let mut total = 0;

        let indices = records
            .iter()
            .filter(|record| record.reason == EvictionReason::MemoryPressure)
            .filter_map(|record| key_index(&record.key, prefix));

        for index in indices {
            *counts.entry(index / bucket_width * bucket_width).or_default() += 1;
            total += 1;
        }

        Self {
            prefix: prefix.to_string(),
            bucket_width,
            buckets: counts
                .into_iter()
                .map(|(start, count)| Bucket { start, count })
                .collect(),
            total,
        }
    }

    /// Count for the bucket containing `index`.
    pub fn count_for(&self, index: u64) -> u64 {
        let start = index / self.bucket_width * self.bucket_width;
        self.buckets
            .iter()
            .find(|bucket| bucket.start == start)
            .map_or(0, |bucket| bucket.count)
    }

    /// Text histogram, one row per bucket, bars scaled to `max_bar` columns.
    pub fn render(&self, max_bar: usize) -> String {
        let peak = self.buckets.iter().map(|b| b.count).max().unwrap_or(0);
        let mut out = String::new();

        for bucket in &self.buckets {
            let bar = if peak == 0 {
                0
            } else {
                ((bucket.count as f64 / peak as f64) * max_bar as f64).ceil() as usize
            };
            out.push_str(&format!(
                "{:>8}..{:<8} {:>6} {}\n",
                bucket.start,
                bucket.start + self.bucket_width,
                bucket.count,
                "#".repeat(bar)
            ));
        }
        out
    }
}

// == Tracing Observer ==
/// Emits a debug event for every removal.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl EvictionObserver for TracingObserver {
    fn on_evicted(&self, record: &EvictionRecord) {
        debug!(key = %record.key, reason = ?record.reason, at = record.evicted_at, "cache entry removed");
    }
}
