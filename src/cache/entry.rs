//! Cache Entry Module
//!
//! Defines the structure for individual cache entries and their metadata.

use std::time::{SystemTime, UNIX_EPOCH};

// == Cache Entry ==
/// A stored value with the metadata used for accounting and eviction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// The entry key
    pub key: String,
    /// The stored value
    pub value: Vec<u8>,
    /// Bytes charged against the memory budget
    pub size: u64,
    /// Creation timestamp (Unix milliseconds), preserved across overwrites
    pub created_at: u64,
    /// Last read or write (Unix milliseconds)
    pub last_accessed_at: u64,
    /// Store-wide write sequence number
    pub sequence: u64,
    /// Expiration timestamp (Unix milliseconds), None = no expiration
    pub expires_at: Option<u64>,
}

impl Entry {
    // == Constructor ==
    /// Creates a new entry stamped at `now`.
    ///
    /// # Arguments
    /// * `key` - The entry key
    /// * `value` - The value to store
    /// * `ttl_seconds` - Optional TTL in seconds
    /// * `sequence` - Write sequence number assigned by the store
    /// * `now` - Current time in Unix milliseconds
    pub fn new(
        key: String,
        value: Vec<u8>,
        ttl_seconds: Option<u64>,
        sequence: u64,
        now: u64,
    ) -> Self {
        let size = entry_size(&key, &value);
        Self {
            key,
            value,
            size,
            created_at: now,
            last_accessed_at: now,
            sequence,
            expires_at: expiry_from(ttl_seconds, now),
        }
    }

    // == Is Expired ==
    /// Checks whether the entry has expired at `now`.
    ///
    /// An entry is expired once `now >= expires_at`.
    pub fn is_expired_at(&self, now: u64) -> bool {
        match self.expires_at {
            Some(expires) => now >= expires,
            None => false,
        }
    }

    // == Time To Live ==
    /// Returns remaining TTL in milliseconds, or None if no expiration is set.
    pub fn ttl_remaining_ms(&self) -> Option<u64> {
        let now = current_timestamp_ms();
        self.expires_at.map(|expires| expires.saturating_sub(now))
    }
}

// == Utility Functions ==
/// Bytes an entry with this key and value is charged.
pub fn entry_size(key: &str, value: &[u8]) -> u64 {
    (key.len() + value.len()) as u64
}

/// Converts a TTL in seconds into an absolute expiry.
pub(crate) fn expiry_from(ttl_seconds: Option<u64>, now: u64) -> Option<u64> {
    ttl_seconds.map(|ttl| now.saturating_add(ttl.saturating_mul(1000)))
}

/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
