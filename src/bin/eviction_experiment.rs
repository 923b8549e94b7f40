//! Eviction distribution experiment
//!
//! Floods a bounded cache past its budget and prints where evictions landed.
//! Cache parameters come from the same environment variables as the server
//! (`MAX_MEMORY_BYTES`, `EVICTION_POLICY`, `RANDOM_SEED`); ranges come from
//! `INITIAL_RANGE`, `INITIAL_READ_RANGE`, `FLOOD_RANGE` and `BUCKET_WIDTH`.

use anyhow::ensure;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use memcap::experiment::{self, ExperimentConfig};
use memcap::{BoundedCache, Config};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "memcap=info,eviction_experiment=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = Config::from_env()?;
    // The distribution is computed from every recorded eviction.
    config.cache.history_limit = None;
    let experiment_config = ExperimentConfig::from_env();
    info!(
        "Running experiment: max_memory_bytes={}, eviction_policy={}, flood_range={}",
        config.cache.max_memory_bytes, config.cache.eviction_policy, experiment_config.flood_range
    );

    let cache = BoundedCache::new(config.cache)?;
    let report = experiment::run(&cache, &experiment_config)?;
    ensure!(report.constants_intact, "constants were not readable right after being stored");

    let missing = report.final_read().map_or(0, |pass| pass.missing.len());
    println!("Policy: {}", report.policy);
    println!(
        "Entries: {}  Used: {} / {} bytes",
        report.stats.entry_count, report.stats.used_bytes, report.stats.budget_bytes
    );
    println!("Recorded evictions: {}", report.recorded_evictions);
    println!("Keys reading as absent: {}", missing);
    println!();
    println!("Distribution of evicted keys over ranges:");
    print!("{}", report.distribution.render(60));

    Ok(())
}
