//! Response DTOs for the cache server API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

use crate::cache::{CacheStats, EvictionPolicyKind, EvictionRecord};

/// Response body for the GET operation (GET /get/:key)
#[derive(Debug, Clone, Serialize)]
pub struct GetResponse {
    /// The requested key
    pub key: String,
    /// The stored value, lossily decoded as UTF-8
    pub value: String,
    /// Milliseconds until expiry, null when the key never expires
    pub ttl_remaining_ms: Option<u64>,
}

impl GetResponse {
    /// Creates a new GetResponse
    pub fn new(key: impl Into<String>, value: &[u8], ttl_remaining_ms: Option<u64>) -> Self {
        Self {
            key: key.into(),
            value: String::from_utf8_lossy(value).into_owned(),
            ttl_remaining_ms,
        }
    }
}

/// Response body for the SET operation (PUT /set)
#[derive(Debug, Clone, Serialize)]
pub struct SetResponse {
    /// Success message
    pub message: String,
    /// The key that was set
    pub key: String,
    /// Bytes charged against the budget
    pub size: u64,
}

impl SetResponse {
    /// Creates a new SetResponse
    pub fn new(key: impl Into<String>, size: u64) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' set successfully", key),
            key,
            size,
        }
    }
}

/// Response body for the DELETE operation (DELETE /del/:key)
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    pub message: String,
    pub key: String,
    /// Whether an entry was actually removed
    pub deleted: bool,
}

impl DeleteResponse {
    /// Creates a new DeleteResponse
    pub fn new(key: impl Into<String>, deleted: bool) -> Self {
        let key = key.into();
        let message = if deleted {
            format!("Key '{}' deleted successfully", key)
        } else {
            format!("Key '{}' was not present", key)
        };
        Self {
            message,
            key,
            deleted,
        }
    }
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub entry_count: usize,
    pub used_bytes: u64,
    pub budget_bytes: u64,
    pub eviction_count: u64,
    pub hits: u64,
    pub misses: u64,
    pub expirations: u64,
    pub deletions: u64,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
    /// Fraction of the budget in use
    pub utilization: f64,
    pub eviction_policy: String,
}

impl StatsResponse {
    /// Creates a new StatsResponse from a cache statistics snapshot
    pub fn new(stats: CacheStats, policy: EvictionPolicyKind) -> Self {
        Self {
            hit_rate: stats.hit_rate(),
            utilization: stats.utilization(),
            entry_count: stats.entry_count,
            used_bytes: stats.used_bytes,
            budget_bytes: stats.budget_bytes,
            eviction_count: stats.eviction_count,
            hits: stats.hits,
            misses: stats.misses,
            expirations: stats.expirations,
            deletions: stats.deletions,
            eviction_policy: policy.to_string(),
        }
    }
}

/// Response body for GET /evictions
#[derive(Debug, Clone, Serialize)]
pub struct HistoryResponse {
    /// Records in the full history
    pub total: usize,
    pub records: Vec<EvictionRecord>,
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
