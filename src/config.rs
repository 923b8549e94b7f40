//! Configuration Module
//!
//! Cache construction parameters and server configuration loaded from
//! environment variables.

use std::env;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::cache::EvictionPolicyKind;
use crate::error::{CacheError, Result};

/// Default memory budget: 2.5 MiB.
pub const DEFAULT_MAX_MEMORY_BYTES: u64 = (2 * 1024 * 1024) + 1024 * 512;

/// Eviction records the server retains by default.
pub const DEFAULT_HISTORY_LIMIT: usize = 100_000;

// == Cache Config ==
/// Parameters fixed for the lifetime of a cache instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum aggregate entry size in bytes
    pub max_memory_bytes: u64,
    /// Victim selection strategy
    pub eviction_policy: EvictionPolicyKind,
    /// Seed for the random policy; entropy-seeded when absent
    #[serde(default)]
    pub random_seed: Option<u64>,
    /// Most recent removal records kept in the eviction log; unbounded when absent
    #[serde(default)]
    pub history_limit: Option<usize>,
}

impl CacheConfig {
    /// Creates a config with the given budget and policy and no seed.
    pub fn new(max_memory_bytes: u64, eviction_policy: EvictionPolicyKind) -> Self {
        Self {
            max_memory_bytes,
            eviction_policy,
            random_seed: None,
            history_limit: None,
        }
    }

    /// Sets the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.random_seed = Some(seed);
        self
    }

    /// Caps the eviction log at the `limit` most recent records.
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = Some(limit);
        self
    }

    /// Rejects a zero budget and a zero history limit.
    pub fn validate(&self) -> Result<()> {
        if self.max_memory_bytes == 0 {
            return Err(CacheError::InvalidConfiguration(
                "max_memory_bytes must be greater than zero".to_string(),
            ));
        }
        if self.history_limit == Some(0) {
            return Err(CacheError::InvalidConfiguration(
                "history_limit must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_MEMORY_BYTES, EvictionPolicyKind::Lru)
    }
}

// == Server Config ==
/// Server configuration parameters.
///
/// The budget and the policy name are strict: a value that does not parse
/// is a configuration error. Other numeric values fall back to defaults when
/// missing or unparseable.
#[derive(Debug, Clone)]
pub struct Config {
    /// Cache parameters
    pub cache: CacheConfig,
    /// TTL in seconds applied to entries set without one (0 = no expiry)
    pub default_ttl: u64,
    /// HTTP server port
    pub server_port: u16,
    /// Background sweep interval in seconds
    pub cleanup_interval: u64,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// # Environment Variables
    /// - `MAX_MEMORY_BYTES` - Memory budget (default: 2.5 MiB)
    /// - `EVICTION_POLICY` - `random`, `lru` or `ttl_lru` (default: lru)
    /// - `RANDOM_SEED` - Seed for the random policy (default: unset)
    /// - `DEFAULT_TTL` - Default TTL in seconds, 0 disables (default: 0)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CLEANUP_INTERVAL` - Sweep frequency in seconds (default: 1)
    /// - `EVICTION_HISTORY_LIMIT` - Eviction records retained, 0 keeps all
    ///   (default: 100000)
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Loads configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let parsed = |name: &str| -> Option<u64> { lookup(name).and_then(|v| v.trim().parse().ok()) };

        let eviction_policy = match lookup("EVICTION_POLICY") {
            Some(name) => EvictionPolicyKind::from_str(&name)?,
            None => defaults.cache.eviction_policy,
        };

        let max_memory_bytes = match lookup("MAX_MEMORY_BYTES") {
            Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
                CacheError::InvalidConfiguration(format!(
                    "MAX_MEMORY_BYTES must be a positive integer, got '{}'",
                    raw
                ))
            })?,
            None => defaults.cache.max_memory_bytes,
        };

        let history_limit = match parsed("EVICTION_HISTORY_LIMIT") {
            Some(0) => None,
            Some(limit) => usize::try_from(limit).ok(),
            None => defaults.cache.history_limit,
        };

        let cache = CacheConfig {
            max_memory_bytes,
            eviction_policy,
            random_seed: parsed("RANDOM_SEED"),
            history_limit,
        };
        cache.validate()?;

        Ok(Self {
            cache,
            default_ttl: parsed("DEFAULT_TTL").unwrap_or(defaults.default_ttl),
            server_port: lookup("SERVER_PORT")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.server_port),
            cleanup_interval: parsed("CLEANUP_INTERVAL").unwrap_or(defaults.cleanup_interval),
        })
    }

    /// Default TTL as an option, `None` when disabled.
    pub fn default_ttl(&self) -> Option<u64> {
        (self.default_ttl > 0).then_some(self.default_ttl)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache: CacheConfig {
                history_limit: Some(DEFAULT_HISTORY_LIMIT),
                ..CacheConfig::default()
            },
            default_ttl: 0,
            server_port: 3000,
            cleanup_interval: 1,
        }
    }
}
