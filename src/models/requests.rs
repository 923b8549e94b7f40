//! Request DTOs for the cache server API
//!
//! Defines the structure of incoming HTTP request bodies and query strings.

use serde::Deserialize;

/// Longest accepted key in bytes.
pub const MAX_KEY_LENGTH: usize = 256;

/// Request body for the SET operation (PUT /set)
#[derive(Debug, Clone, Deserialize)]
pub struct SetRequest {
    /// The cache key
    pub key: String,
    /// The value to store
    pub value: String,
    /// Optional TTL in seconds
    #[serde(default)]
    pub ttl: Option<u64>,
}

impl SetRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.key.is_empty() {
            return Some("Key cannot be empty".to_string());
        }
        if self.key.len() > MAX_KEY_LENGTH {
            return Some(format!(
                "Key exceeds maximum length of {} bytes",
                MAX_KEY_LENGTH
            ));
        }
        if self.ttl == Some(0) {
            return Some("TTL must be at least one second".to_string());
        }
        None
    }
}

/// Query string for GET /evictions
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryQuery {
    /// Only return the most recent records
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Query string for GET /evictions/distribution
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DistributionQuery {
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub bucket_width: Option<u64>,
}

impl DistributionQuery {
    pub fn prefix(&self) -> &str {
        self.prefix.as_deref().unwrap_or("loop-")
    }

    pub fn bucket_width(&self) -> u64 {
        self.bucket_width.unwrap_or(1000)
    }
}
