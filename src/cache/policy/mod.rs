//! Eviction Policy Module
//!
//! Pluggable victim selection. A policy sees entries only through shared
//! references handed to it by the cache and keeps its own ordering state.

mod lru;
mod random;
mod ttl;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::cache::{Entry, EntryStore};
use crate::config::CacheConfig;
use crate::error::CacheError;

pub use lru::LruPolicy;
pub use random::RandomPolicy;
pub use ttl::TtlLruPolicy;

// == Eviction Policy Trait ==
/// Victim selection strategy.
///
/// The cache calls `on_insert`, `on_access` and `on_remove` for every entry
/// lifecycle change, always under its lock.
pub trait EvictionPolicy: Send + fmt::Debug {
    /// Picks the next key to evict, or None if nothing is tracked.
    ///
    /// The returned key stays tracked until the cache calls `on_remove`.
    fn select_victim(&mut self, store: &EntryStore, now: u64) -> Option<String>;

    /// An existing entry was read.
    fn on_access(&mut self, entry: &Entry);

    /// An entry was written.
    fn on_insert(&mut self, entry: &Entry);

    /// An entry left the store or was detached for overwrite.
    fn on_remove(&mut self, key: &str);

    /// Number of tracked keys.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Which strategy this is.
    fn kind(&self) -> EvictionPolicyKind;
}

// == Policy Kind ==
/// Configured eviction strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvictionPolicyKind {
    /// Uniform random victim
    Random,
    /// Least recently used victim
    Lru,
    /// Expired entries first, then least recently used
    TtlLru,
}

impl EvictionPolicyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvictionPolicyKind::Random => "random",
            EvictionPolicyKind::Lru => "lru",
            EvictionPolicyKind::TtlLru => "ttl_lru",
        }
    }
}

impl fmt::Display for EvictionPolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EvictionPolicyKind {
    type Err = CacheError;

    /// Accepts the native names and the matching Redis `maxmemory-policy` names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "random" | "allkeys-random" => Ok(EvictionPolicyKind::Random),
            "lru" | "allkeys-lru" => Ok(EvictionPolicyKind::Lru),
            "ttl_lru" | "ttl-lru" | "volatile-lru" => Ok(EvictionPolicyKind::TtlLru),
            other => Err(CacheError::InvalidConfiguration(format!(
                "unknown eviction policy '{}'",
                other
            ))),
        }
    }
}

// == Factory ==
/// Builds the policy named in `config`.
pub fn build_policy(config: &CacheConfig) -> Box<dyn EvictionPolicy> {
    match config.eviction_policy {
        EvictionPolicyKind::Random => Box::new(RandomPolicy::new(config.random_seed)),
        EvictionPolicyKind::Lru => Box::new(LruPolicy::new()),
        EvictionPolicyKind::TtlLru => Box::new(TtlLruPolicy::new()),
    }
}
