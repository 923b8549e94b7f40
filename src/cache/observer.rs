//! Eviction Observer Module
//!
//! Append-only record of entries removed from the cache and the listener
//! trait used to receive those removals.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;

// == Eviction Reason ==
/// Why an entry left the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EvictionReason {
    /// Chosen by the policy to make room under the memory budget
    MemoryPressure,
    /// Deleted by a caller
    Explicit,
    /// TTL elapsed
    Expired,
}

// == Eviction Record ==
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EvictionRecord {
    pub key: String,
    /// Unix milliseconds
    pub evicted_at: u64,
    pub reason: EvictionReason,
}

impl EvictionRecord {
    pub fn new(key: impl Into<String>, evicted_at: u64, reason: EvictionReason) -> Self {
        Self {
            key: key.into(),
            evicted_at,
            reason,
        }
    }
}

// == Observer Trait ==
/// Receives removal notifications.
///
/// Called synchronously while the cache lock is held, so implementations
/// must not call back into the cache.
pub trait EvictionObserver: Send + Sync {
    fn on_evicted(&self, record: &EvictionRecord);
}

// == Eviction Log ==
/// Built-in observer keeping the removal history in append order.
///
/// Readers take an `Arc` snapshot of the buffer; a writer only copies the
/// buffer when a snapshot taken earlier is still alive, so a snapshot never
/// changes after it is taken.
///
/// Unbounded by default. With a limit, only the most recent `limit` records
/// are retained and older ones are dropped oldest first; `dropped` counts
/// them. A long-running server should set a limit, since the log lives
/// outside the cache's byte budget.
#[derive(Debug, Default)]
pub struct EvictionLog {
    records: Mutex<Arc<Vec<EvictionRecord>>>,
    limit: Option<usize>,
    dropped: AtomicU64,
}

impl EvictionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a log retaining at most `limit` records.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit: Some(limit.max(1)),
            ..Self::default()
        }
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// Appends a record, dropping the oldest ones past the limit.
    pub fn append(&self, record: EvictionRecord) {
        let mut records = self.records.lock();
        let buffer = Arc::make_mut(&mut records);
        buffer.push(record);

        if let Some(limit) = self.limit {
            let excess = buffer.len().saturating_sub(limit);
            if excess > 0 {
                buffer.drain(..excess);
                self.dropped.fetch_add(excess as u64, Ordering::Relaxed);
            }
        }
    }

    /// Records discarded to stay within the limit.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Point-in-time snapshot of the history.
    pub fn history(&self) -> Arc<Vec<EvictionRecord>> {
        let records = self.records.lock();
        Arc::clone(&*records)
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of records with the given reason.
    pub fn count(&self, reason: EvictionReason) -> usize {
        self.history().iter().filter(|r| r.reason == reason).count()
    }

    /// Keys removed for the given reason, in removal order.
    pub fn evicted_keys(&self, reason: EvictionReason) -> Vec<String> {
        self.history()
            .iter()
            .filter(|r| r.reason == reason)
            .map(|r| r.key.clone())
            .collect()
    }
}

impl EvictionObserver for EvictionLog {
    fn on_evicted(&self, record: &EvictionRecord) {
        self.append(record.clone());
    }
}
