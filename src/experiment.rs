//! Eviction Distribution Experiment
//!
//! Fills a cache past its budget in two phases and reports which key ranges
//! were evicted. Evictions are taken from the recorded history; the count of
//! keys that merely read as absent is reported alongside for comparison.

use std::env;

use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::analysis::EvictionDistribution;
use crate::cache::{BoundedCache, CacheStats, EvictionPolicyKind, EvictionReason};
use crate::error::Result;

// == Experiment Config ==
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperimentConfig {
    /// Keys written in the first fill
    pub initial_range: u64,
    /// Keys read back after each phase
    pub initial_read_range: u64,
    /// Keys written in total once the flood finishes
    pub flood_range: u64,
    pub key_prefix: String,
    pub bucket_width: u64,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            initial_range: 5000,
            initial_read_range: 1000,
            flood_range: 10000,
            key_prefix: "loop-".to_string(),
            bucket_width: 1000,
        }
    }
}

impl ExperimentConfig {
    /// Loads ranges from environment variables.
    ///
    /// # Environment Variables
    /// - `INITIAL_RANGE` (default: 5000)
    /// - `INITIAL_READ_RANGE` (default: 1000)
    /// - `FLOOD_RANGE` (default: 10000)
    /// - `BUCKET_WIDTH` (default: 1000)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let parsed = |name: &str, fallback: u64| -> u64 {
            env::var(name)
                .ok()
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(fallback)
        };

        Self {
            initial_range: parsed("INITIAL_RANGE", defaults.initial_range),
            initial_read_range: parsed("INITIAL_READ_RANGE", defaults.initial_read_range),
            flood_range: parsed("FLOOD_RANGE", defaults.flood_range),
            bucket_width: parsed("BUCKET_WIDTH", defaults.bucket_width),
            key_prefix: defaults.key_prefix,
        }
    }

    fn key(&self, index: u64) -> String {
        format!("{}{}", self.key_prefix, index)
    }
}

// == Report ==
/// Outcome of one read pass over `0..range`.
#[derive(Debug, Clone, Serialize)]
pub struct ReadPass {
    pub range: u64,
    /// Indices that read as absent
    pub missing: Vec<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExperimentReport {
    pub policy: EvictionPolicyKind,
    pub constants_intact: bool,
    pub reads: Vec<ReadPass>,
    /// Keys removed under memory pressure, from the eviction history
    pub recorded_evictions: u64,
    pub distribution: EvictionDistribution,
    pub stats: CacheStats,
}

impl ExperimentReport {
    /// The final full-range read pass.
    pub fn final_read(&self) -> Option<&ReadPass> {
        self.reads.last()
    }
}

// == Runner ==
/// Runs the experiment against `cache`.
///
/// 1. store two constants and read them back
/// 2. fill `0..initial_range`
/// 3. read `0..initial_read_range`
/// 4. flood `initial_range..flood_range`
/// 5. read `0..initial_read_range`, then `0..flood_range`
pub fn run(cache: &BoundedCache, config: &ExperimentConfig) -> Result<ExperimentReport> {
    let constants_intact = store_constants(cache)?;

    store_range(cache, config, 0, config.initial_range)?;
    let mut reads = vec![read_range(cache, config, config.initial_read_range)];

    store_range(cache, config, config.initial_range, config.flood_range)?;
    reads.push(read_range(cache, config, config.initial_read_range));
    reads.push(read_range(cache, config, config.flood_range));

    let history = cache.history();
    let distribution =
        EvictionDistribution::from_records(&history, &config.key_prefix, config.bucket_width);
    let recorded_evictions = history
        .iter()
        .filter(|r| r.reason == EvictionReason::MemoryPressure)
        .count() as u64;

    info!(
        recorded_evictions,
        distributed = distribution.total,
        "experiment finished"
    );

    Ok(ExperimentReport {
        policy: cache.policy_kind(),
        constants_intact,
        reads,
        recorded_evictions,
        distribution,
        stats: cache.stats(),
    })
}

fn store_constants(cache: &BoundedCache) -> Result<bool> {
    cache.set("constant-1", "value-1")?;
    cache.set("constant-2", "value-2")?;

    let intact = cache.get("constant-1").as_deref() == Some(b"value-1".as_slice())
        && cache.get("constant-2").as_deref() == Some(b"value-2".as_slice());
    info!(intact, "stored constants");
    Ok(intact)
}

fn store_range(cache: &BoundedCache, config: &ExperimentConfig, start: u64, end: u64) -> Result<()> {
    for index in start..end {
        cache.set(config.key(index), Uuid::new_v4().to_string())?;
    }

    let stats = cache.stats();
    info!(
        start,
        end,
        entries = stats.entry_count,
        used_bytes = stats.used_bytes,
        "stored key range"
    );
    Ok(())
}

fn read_range(cache: &BoundedCache, config: &ExperimentConfig, range: u64) -> ReadPass {
    let missing: Vec<u64> = (0..range)
        .filter(|&index| cache.get(&config.key(index)).is_none())
        .collect();

    info!(
        range,
        missing = missing.len(),
        first_missing = ?missing.iter().take(5).collect::<Vec<_>>(),
        "read key range"
    );
    ReadPass { range, missing }
}
