//! TTL-aware LRU Policy Module
//!
//! Prefers already-expired entries as victims and falls back to LRU.

use std::collections::{BTreeSet, HashMap};

use super::{EvictionPolicy, EvictionPolicyKind, LruPolicy};
use crate::cache::{Entry, EntryStore};

// == TTL LRU Policy ==
/// LRU with an expiry index.
///
/// Entries stored with a TTL are indexed by expiry time. When the earliest
/// expiry has passed, that entry is the victim regardless of recency.
#[derive(Debug, Default)]
pub struct TtlLruPolicy {
    lru: LruPolicy,
    /// (expires_at, key), earliest first
    by_expiry: BTreeSet<(u64, String)>,
    expiries: HashMap<String, u64>,
}

impl TtlLruPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Key with the earliest expiry, if it has expired at `now`.
    pub fn earliest_expired(&self, now: u64) -> Option<&str> {
        self.by_expiry
            .first()
            .filter(|(expires_at, _)| *expires_at <= now)
            .map(|(_, key)| key.as_str())
    }

    fn forget_expiry(&mut self, key: &str) {
        if let Some(expires_at) = self.expiries.remove(key) {
            self.by_expiry.remove(&(expires_at, key.to_string()));
        }
    }
}

impl EvictionPolicy for TtlLruPolicy {
    fn select_victim(&mut self, store: &EntryStore, now: u64) -> Option<String> {
        if let Some(key) = self.earliest_expired(now) {
            return Some(key.to_string());
        }
        self.lru.select_victim(store, now)
    }

    fn on_access(&mut self, entry: &Entry) {
        self.lru.touch(&entry.key);
    }

    fn on_insert(&mut self, entry: &Entry) {
        self.forget_expiry(&entry.key);
        if let Some(expires_at) = entry.expires_at {
            self.by_expiry.insert((expires_at, entry.key.clone()));
            self.expiries.insert(entry.key.clone(), expires_at);
        }
        self.lru.touch(&entry.key);
    }

    fn on_remove(&mut self, key: &str) {
        self.forget_expiry(key);
        self.lru.remove(key);
    }

    fn len(&self) -> usize {
        self.lru.len()
    }

    fn kind(&self) -> EvictionPolicyKind {
        EvictionPolicyKind::TtlLru
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(key: &str, ttl: Option<u64>) -> Entry {
        Entry::new(key.to_string(), vec![0; 4], ttl, 0, 0)
    }

    #[test]
    fn test_ttl_falls_back_to_lru() {
        let mut policy = TtlLruPolicy::new();
        let store = EntryStore::new();

        policy.on_insert(&entry("a", None));
        policy.on_insert(&entry("b", Some(60)));
        policy.on_insert(&entry("c", None));

        assert_eq!(policy.select_victim(&store, 1_000), Some("a".to_string()));
    }

    #[test]
    fn test_ttl_prefers_expired_entry() {
        let mut policy = TtlLruPolicy::new();
        let store = EntryStore::new();

        policy.on_insert(&entry("a", None));
        policy.on_insert(&entry("b", Some(10)));
        policy.on_insert(&entry("c", Some(1)));

        // c expires at 1_000, b at 10_000
        assert_eq!(policy.select_victim(&store, 1_000), Some("c".to_string()));
        policy.on_remove("c");
        assert_eq!(policy.select_victim(&store, 1_000), Some("a".to_string()));
        assert_eq!(policy.select_victim(&store, 10_000), Some("b".to_string()));
    }

    #[test]
    fn test_ttl_overwrite_replaces_expiry() {
        let mut policy = TtlLruPolicy::new();
        let store = EntryStore::new();

        policy.on_insert(&entry("a", Some(1)));
        policy.on_insert(&entry("a", None));

        assert_eq!(policy.earliest_expired(5_000), None);
        assert_eq!(policy.len(), 1);
        assert_eq!(policy.select_victim(&store, 5_000), Some("a".to_string()));
    }

    #[test]
    fn test_ttl_remove_clears_both_indexes() {
        let mut policy = TtlLruPolicy::new();

        policy.on_insert(&entry("a", Some(1)));
        policy.on_remove("a");

        assert!(policy.is_empty());
        assert!(policy.by_expiry.is_empty());
        assert!(policy.expiries.is_empty());
    }
}
