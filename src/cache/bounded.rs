//! Bounded Cache Module
//!
//! Public cache API combining the entry store, memory accountant, eviction
//! policy and eviction observers behind a single lock.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::cache::entry::{current_timestamp_ms, entry_size};
use crate::cache::policy::{build_policy, EvictionPolicy, EvictionPolicyKind};
use crate::cache::{
    CacheStats, Entry, EntryStore, EvictionLog, EvictionObserver, EvictionReason, EvictionRecord,
    MemoryAccountant,
};
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};

/// Everything a single operation mutates.
struct CacheState {
    store: EntryStore,
    accountant: MemoryAccountant,
    policy: Box<dyn EvictionPolicy>,
    stats: CacheStats,
}

// == Bounded Cache ==
/// Memory-bounded key-value cache.
///
/// Every operation runs under one mutex, so operations are linearizable and
/// `used_bytes <= budget_bytes` holds whenever the lock is released.
/// Share it between threads or tasks as `Arc<BoundedCache>`.
pub struct BoundedCache {
    config: CacheConfig,
    state: Mutex<CacheState>,
    log: Arc<EvictionLog>,
    observers: Vec<Arc<dyn EvictionObserver>>,
}

impl fmt::Debug for BoundedCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundedCache")
            .field("config", &self.config)
            .field("observers", &self.observers.len())
            .field("stats", &self.stats())
            .finish()
    }
}

impl BoundedCache {
    // == Constructors ==
    /// Creates a cache from a validated configuration.
    pub fn new(config: CacheConfig) -> Result<Self> {
        Self::with_observers(config, Vec::new())
    }

    /// Creates a cache that also notifies `observers` of every removal.
    ///
    /// The built-in eviction log is always attached.
    pub fn with_observers(
        config: CacheConfig,
        observers: Vec<Arc<dyn EvictionObserver>>,
    ) -> Result<Self> {
        config.validate()?;

        let state = CacheState {
            store: EntryStore::new(),
            accountant: MemoryAccountant::new(config.max_memory_bytes),
            policy: build_policy(&config),
            stats: CacheStats::new(config.max_memory_bytes),
        };

        let log = match config.history_limit {
            Some(limit) => EvictionLog::with_limit(limit),
            None => EvictionLog::new(),
        };

        Ok(Self {
            config,
            state: Mutex::new(state),
            log: Arc::new(log),
            observers,
        })
    }

    // == Set ==
    /// Stores a value without expiry.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Vec<u8>>) -> Result<()> {
        self.set_with_ttl(key, value, None)
    }

    /// Stores a value, evicting other entries until it fits.
    ///
    /// Fails with `ValueTooLarge` when the entry alone exceeds the budget; in
    /// that case nothing is evicted and the cache is unchanged.
    pub fn set_with_ttl(
        &self,
        key: impl Into<String>,
        value: impl Into<Vec<u8>>,
        ttl_seconds: Option<u64>,
    ) -> Result<()> {
        self.set_at(key.into(), value.into(), ttl_seconds, current_timestamp_ms())
    }

    fn set_at(&self, key: String, value: Vec<u8>, ttl_seconds: Option<u64>, now: u64) -> Result<()> {
        let size = entry_size(&key, &value);
        let mut guard = self.state.lock();
        let state = &mut *guard;

        let budget = state.accountant.budget_bytes();
        if size > budget {
            return Err(CacheError::ValueTooLarge { size, budget });
        }

        // Detach an entry being overwritten so it cannot be its own victim.
        let previous = match state.store.peek(&key) {
            Some(existing) => {
                let previous = existing.size;
                state.policy.on_remove(&key);
                previous
            }
            None => 0,
        };

        self.evict_until_fits(state, size.saturating_sub(previous), now);

        state.store.put(key.clone(), value, ttl_seconds, now);
        state.accountant.record_remove(previous);
        state.accountant.record_insert(size);
        if let Some(entry) = state.store.peek(&key) {
            state.policy.on_insert(entry);
        }

        debug_assert_eq!(state.accountant.used_bytes(), state.store.total_bytes());
        Ok(())
    }

    // == Get ==
    /// Returns a copy of the value for `key`.
    ///
    /// Absent and expired keys both read as `None`; an expired entry is
    /// removed on the way out.
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.get_at(key, current_timestamp_ms())
    }

    /// Like `get`, but returns a copy of the whole entry with its metadata.
    pub fn get_entry(&self, key: &str) -> Option<Entry> {
        self.get_entry_at(key, current_timestamp_ms())
    }

    fn get_at(&self, key: &str, now: u64) -> Option<Vec<u8>> {
        self.get_entry_at(key, now).map(|entry| entry.value)
    }

    fn get_entry_at(&self, key: &str, now: u64) -> Option<Entry> {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        let expired = match state.store.peek(key) {
            Some(entry) => entry.is_expired_at(now),
            None => {
                state.stats.record_miss();
                return None;
            }
        };

        if expired {
            self.remove_entry(state, key, EvictionReason::Expired, now);
            state.stats.record_miss();
            return None;
        }

        let entry = state.store.get(key, now)?;
        state.policy.on_access(entry);
        state.stats.record_hit();
        Some(entry.clone())
    }

    // == Delete ==
    /// Removes `key`. Returns whether anything was removed; deleting an
    /// absent key is a no-op.
    pub fn delete(&self, key: &str) -> bool {
        let mut guard = self.state.lock();
        self.remove_entry(&mut guard, key, EvictionReason::Explicit, current_timestamp_ms())
            .is_some()
    }

    // == Purge Expired ==
    /// Removes every expired entry. Returns the number removed.
    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(current_timestamp_ms())
    }

    fn purge_expired_at(&self, now: u64) -> usize {
        let mut guard = self.state.lock();
        let expired = guard.store.expired_keys(now);
        for key in &expired {
            self.remove_entry(&mut guard, key, EvictionReason::Expired, now);
        }
        expired.len()
    }

    // == Stats ==
    /// Snapshot of occupancy and counters.
    ///
    /// Expiry is lazy: `entry_count` and `used_bytes` include entries whose
    /// TTL has elapsed until a `get`, `purge_expired` or eviction removes
    /// them, since those entries still hold budget.
    pub fn stats(&self) -> CacheStats {
        let state = self.state.lock();
        let mut stats = state.stats.clone();
        stats.entry_count = state.store.len();
        stats.used_bytes = state.accountant.used_bytes();
        stats.budget_bytes = state.accountant.budget_bytes();
        stats
    }

    /// Checks whether a live (unexpired) entry exists for `key`.
    pub fn contains(&self, key: &str) -> bool {
        let now = current_timestamp_ms();
        self.state
            .lock()
            .store
            .peek(key)
            .is_some_and(|entry| !entry.is_expired_at(now))
    }

    /// Number of stored entries, counting expired ones not yet removed.
    pub fn len(&self) -> usize {
        self.state.lock().store.len()
    }

    /// Whether nothing is stored; expired entries not yet removed count.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // == Eviction History ==
    /// Snapshot of every recorded removal in order.
    pub fn history(&self) -> Arc<Vec<EvictionRecord>> {
        self.log.history()
    }

    /// Handle to the eviction log, readable without touching the cache lock.
    pub fn eviction_log(&self) -> Arc<EvictionLog> {
        Arc::clone(&self.log)
    }

    pub fn policy_kind(&self) -> EvictionPolicyKind {
        self.config.eviction_policy
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    // == Internals ==
    /// Evicts policy victims until `additional` bytes fit. Bounded by the
    /// number of keys the policy tracks.
    fn evict_until_fits(&self, state: &mut CacheState, additional: u64, now: u64) {
        while state.accountant.would_exceed(additional) {
            let Some(victim) = state.policy.select_victim(&state.store, now) else {
                break;
            };
            if self
                .remove_entry(state, &victim, EvictionReason::MemoryPressure, now)
                .is_none()
            {
                // Stale policy key; drop it so the loop still makes progress.
                state.policy.on_remove(&victim);
            }
        }
    }

    fn remove_entry(
        &self,
        state: &mut CacheState,
        key: &str,
        reason: EvictionReason,
        now: u64,
    ) -> Option<Entry> {
        let entry = state.store.remove(key)?;
        state.accountant.record_remove(entry.size);
        state.policy.on_remove(key);

        match reason {
            EvictionReason::MemoryPressure => state.stats.record_eviction(),
            EvictionReason::Explicit => state.stats.record_deletion(),
            EvictionReason::Expired => state.stats.record_expiration(),
        }

        self.notify(EvictionRecord::new(key, now, reason));
        Some(entry)
    }

    fn notify(&self, record: EvictionRecord) {
        for observer in &self.observers {
            observer.on_evicted(&record);
        }
        self.log.append(record);
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn lru_cache(budget: u64) -> BoundedCache {
        BoundedCache::new(CacheConfig::new(budget, EvictionPolicyKind::Lru)).unwrap()
    }

    #[test]
    fn test_new_rejects_zero_budget() {
        let result = BoundedCache::new(CacheConfig::new(0, EvictionPolicyKind::Lru));
        assert!(matches!(result, Err(CacheError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_set_and_get() {
        let cache = lru_cache(100);

        cache.set("key1", "value1").unwrap();
        assert_eq!(cache.get("key1"), Some(b"value1".to_vec()));

        let stats = cache.stats();
        assert_eq!(stats.entry_count, 1);
        assert_eq!(stats.used_bytes, 10);
        assert_eq!(stats.budget_bytes, 100);
        assert_eq!(stats.hits, 1);
    }

    #[test]
    fn test_get_nonexistent() {
        let cache = lru_cache(100);
        assert_eq!(cache.get("nonexistent"), None);
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_value_too_large_leaves_cache_unchanged() {
        let cache = lru_cache(20);
        cache.set("a", "12345").unwrap();

        let result = cache.set("big", vec![0u8; 20]);
        assert_eq!(
            result,
            Err(CacheError::ValueTooLarge {
                size: 23,
                budget: 20
            })
        );
        assert_eq!(cache.stats().used_bytes, 6);
        assert!(cache.contains("a"));
        assert!(cache.history().is_empty());
    }

    #[test]
    fn test_entry_exactly_budget_fits() {
        let cache = lru_cache(10);
        cache.set("a", "123").unwrap();
        cache.set("k", vec![1u8; 9]).unwrap();

        assert_eq!(cache.stats().used_bytes, 10);
        assert!(!cache.contains("a"));
    }

    #[test]
    fn test_lru_evicts_least_recently_used() {
        // each entry is 1 + 9 = 10 bytes
        let cache = lru_cache(30);
        cache.set("a", vec![0u8; 9]).unwrap();
        cache.set("b", vec![0u8; 9]).unwrap();
        cache.set("c", vec![0u8; 9]).unwrap();

        cache.get("a");
        cache.set("d", vec![0u8; 9]).unwrap();

        assert!(cache.contains("a"));
        assert!(!cache.contains("b"));
        assert_eq!(cache.eviction_log().evicted_keys(EvictionReason::MemoryPressure), vec!["b"]);
        assert_eq!(cache.stats().eviction_count, 1);
    }

    #[test]
    fn test_eviction_loop_evicts_several() {
        let cache = lru_cache(30);
        cache.set("a", vec![0u8; 9]).unwrap();
        cache.set("b", vec![0u8; 9]).unwrap();
        cache.set("c", vec![0u8; 9]).unwrap();

        cache.set("d", vec![0u8; 19]).unwrap();

        assert_eq!(cache.eviction_log().evicted_keys(EvictionReason::MemoryPressure), vec!["a", "b"]);
        assert_eq!(cache.stats().used_bytes, 30);
    }

    #[test]
    fn test_overwrite_never_evicts_itself() {
        let cache = lru_cache(30);
        cache.set("a", vec![0u8; 9]).unwrap();
        cache.set("b", vec![0u8; 9]).unwrap();

        // grows from 10 to 29 bytes; only b can go
        cache.set("a", vec![1u8; 28]).unwrap();

        assert_eq!(cache.get("a"), Some(vec![1u8; 28]));
        assert!(!cache.contains("b"));
        assert_eq!(cache.stats().used_bytes, 29);
        assert_eq!(cache.history().len(), 1);
    }

    #[test]
    fn test_overwrite_with_random_policy_keeps_key() {
        let config = CacheConfig::new(20, EvictionPolicyKind::Random).with_seed(9);
        let cache = BoundedCache::new(config).unwrap();
        cache.set("a", vec![0u8; 9]).unwrap();
        cache.set("b", vec![0u8; 9]).unwrap();

        cache.set("a", vec![0u8; 19]).unwrap();

        assert!(cache.contains("a"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_shrinking_overwrite_releases_bytes() {
        let cache = lru_cache(100);
        cache.set("a", vec![0u8; 50]).unwrap();
        cache.set("a", vec![0u8; 5]).unwrap();

        assert_eq!(cache.stats().used_bytes, 6);
        assert!(cache.history().is_empty());
    }

    #[test]
    fn test_delete_is_idempotent() {
        let cache = lru_cache(100);
        cache.set("a", "1").unwrap();

        assert!(cache.delete("a"));
        assert!(!cache.delete("a"));
        assert!(!cache.delete("never"));

        let stats = cache.stats();
        assert_eq!(stats.entry_count, 0);
        assert_eq!(stats.used_bytes, 0);
        assert_eq!(stats.deletions, 1);
        assert_eq!(cache.eviction_log().count(EvictionReason::Explicit), 1);
    }

    #[test]
    fn test_expired_entry_reads_absent() {
        let cache = lru_cache(100);
        cache.set_at("a".to_string(), b"1".to_vec(), Some(1), 1_000).unwrap();

        assert_eq!(cache.get_at("a", 1_500), Some(b"1".to_vec()));
        assert_eq!(cache.get_at("a", 2_000), None);

        let stats = cache.stats();
        assert_eq!(stats.entry_count, 0);
        assert_eq!(stats.expirations, 1);
        assert_eq!(cache.history()[0].reason, EvictionReason::Expired);
    }

    #[test]
    fn test_expired_entries_count_until_removed() {
        let cache = lru_cache(100);
        // stored at the epoch, so long expired by the wall clock
        cache.set_at("a".to_string(), b"1".to_vec(), Some(1), 0).unwrap();

        assert!(!cache.contains("a"));
        assert_eq!(cache.len(), 1);
        assert!(!cache.is_empty());
        assert_eq!(cache.stats().entry_count, 1);
        assert_eq!(cache.stats().used_bytes, 2);

        assert_eq!(cache.purge_expired(), 1);
        assert!(cache.is_empty());
        assert_eq!(cache.stats().used_bytes, 0);
    }

    #[test]
    fn test_get_entry_returns_metadata() {
        let cache = lru_cache(100);
        cache.set_with_ttl("a", "value", Some(60)).unwrap();
        cache.set("b", "value").unwrap();

        let entry = cache.get_entry("a").unwrap();
        assert_eq!(entry.value, b"value");
        assert_eq!(entry.size, 6);
        let remaining = entry.ttl_remaining_ms().unwrap();
        assert!(remaining > 50_000 && remaining <= 60_000);

        assert_eq!(cache.get_entry("b").unwrap().ttl_remaining_ms(), None);
        assert!(cache.get_entry("missing").is_none());
        assert_eq!(cache.stats().hits, 2);
    }

    #[test]
    fn test_history_limit_bounds_log() {
        let config = CacheConfig::new(10, EvictionPolicyKind::Lru).with_history_limit(2);
        let cache = BoundedCache::new(config).unwrap();
        for i in 0..6 {
            cache.set(format!("k{}", i), vec![0u8; 8]).unwrap();
        }

        let log = cache.eviction_log();
        assert_eq!(log.evicted_keys(EvictionReason::MemoryPressure), vec!["k3", "k4"]);
        assert_eq!(log.dropped(), 3);
        assert_eq!(cache.stats().eviction_count, 5);
    }

    #[test]
    fn test_purge_expired() {
        let cache = lru_cache(100);
        cache.set_at("short".to_string(), b"1".to_vec(), Some(1), 0).unwrap();
        cache.set_at("long".to_string(), b"1".to_vec(), Some(60), 0).unwrap();
        cache.set_at("none".to_string(), b"1".to_vec(), None, 0).unwrap();

        assert_eq!(cache.purge_expired_at(5_000), 1);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.stats().used_bytes, 10);
    }

    #[test]
    fn test_ttl_lru_evicts_expired_before_lru() {
        let cache =
            BoundedCache::new(CacheConfig::new(30, EvictionPolicyKind::TtlLru)).unwrap();
        cache.set_at("a".to_string(), vec![0u8; 9], None, 0).unwrap();
        cache.set_at("b".to_string(), vec![0u8; 9], Some(1), 0).unwrap();
        cache.set_at("c".to_string(), vec![0u8; 9], None, 0).unwrap();

        cache.set_at("d".to_string(), vec![0u8; 9], None, 2_000).unwrap();

        assert_eq!(cache.eviction_log().evicted_keys(EvictionReason::MemoryPressure), vec!["b"]);
        assert!(cache.contains("a"));
    }

    struct CountingObserver(AtomicUsize);

    impl EvictionObserver for CountingObserver {
        fn on_evicted(&self, _record: &EvictionRecord) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_extra_observers_are_notified() {
        let counter = Arc::new(CountingObserver(AtomicUsize::new(0)));
        let cache = BoundedCache::with_observers(
            CacheConfig::new(20, EvictionPolicyKind::Lru),
            vec![counter.clone() as Arc<dyn EvictionObserver>],
        )
        .unwrap();

        cache.set("a", vec![0u8; 9]).unwrap();
        cache.set("b", vec![0u8; 9]).unwrap();
        cache.set("c", vec![0u8; 9]).unwrap();
        cache.delete("c");

        assert_eq!(counter.0.load(Ordering::SeqCst), 2);
        assert_eq!(cache.history().len(), 2);
    }

    #[test]
    fn test_policy_kind_is_fixed() {
        let cache = BoundedCache::new(CacheConfig::new(10, EvictionPolicyKind::Random)).unwrap();
        assert_eq!(cache.policy_kind(), EvictionPolicyKind::Random);
        assert_eq!(cache.config().max_memory_bytes, 10);
    }
}
