//! Entry Store Module
//!
//! Key to entry mapping with per-entry metadata. The store never chooses
//! victims; that is left to the eviction policy.

use std::collections::HashMap;

use crate::cache::Entry;

// == Entry Store ==
/// HashMap-backed entry storage with a running byte total.
#[derive(Debug, Default)]
pub struct EntryStore {
    /// Key-value storage
    entries: HashMap<String, Entry>,
    /// Sum of all entry sizes
    total_bytes: u64,
    /// Next write sequence number
    next_sequence: u64,
}

impl EntryStore {
    // == Constructor ==
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    // == Put ==
    /// Inserts or overwrites an entry.
    ///
    /// An overwrite replaces value, size, expiry, access time and sequence in
    /// place while keeping the original `created_at`. Returns the displaced
    /// entry when the key was already present.
    pub fn put(
        &mut self,
        key: String,
        value: Vec<u8>,
        ttl_seconds: Option<u64>,
        now: u64,
    ) -> Option<Entry> {
        let sequence = self.next_sequence;
        self.next_sequence += 1;

        match self.entries.get_mut(&key) {
            Some(existing) => {
                let mut replacement = Entry::new(key, value, ttl_seconds, sequence, now);
                replacement.created_at = existing.created_at;
                self.total_bytes = self.total_bytes - existing.size + replacement.size;
                Some(std::mem::replace(existing, replacement))
            }
            None => {
                let entry = Entry::new(key.clone(), value, ttl_seconds, sequence, now);
                self.total_bytes += entry.size;
                self.entries.insert(key, entry);
                None
            }
        }
    }

    // == Get ==
    /// Returns the entry for `key`, marking it accessed at `now`.
    pub fn get(&mut self, key: &str, now: u64) -> Option<&Entry> {
        let entry = self.entries.get_mut(key)?;
        entry.last_accessed_at = now;
        Some(entry)
    }

    /// Returns the entry for `key` without touching it.
    pub fn peek(&self, key: &str) -> Option<&Entry> {
        self.entries.get(key)
    }

    // == Remove ==
    /// Removes and returns the entry for `key`.
    pub fn remove(&mut self, key: &str) -> Option<Entry> {
        let entry = self.entries.remove(key)?;
        self.total_bytes -= entry.size;
        Some(entry)
    }

    /// Checks whether `key` is stored.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Returns the number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the sum of all entry sizes.
    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    // == Expired Keys ==
    /// Collects the keys of every entry expired at `now`.
    pub fn expired_keys(&self, now: u64) -> Vec<String> {
        self.entries
            .values()
            .filter(|entry| entry.is_expired_at(now))
            .map(|entry| entry.key.clone())
            .collect()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_new() {
        let store = EntryStore::new();
        assert_eq!(store.len(), 0);
        assert!(store.is_empty());
        assert_eq!(store.total_bytes(), 0);
    }

    #[test]
    fn test_store_put_and_get() {
        let mut store = EntryStore::new();

        assert!(store.put("key1".to_string(), b"value1".to_vec(), None, 10).is_none());
        let entry = store.get("key1", 20).unwrap();

        assert_eq!(entry.value, b"value1");
        assert_eq!(entry.last_accessed_at, 20);
        assert_eq!(store.len(), 1);
        assert_eq!(store.total_bytes(), 10);
    }

    #[test]
    fn test_store_get_nonexistent() {
        let mut store = EntryStore::new();
        assert!(store.get("nonexistent", 0).is_none());
    }

    #[test]
    fn test_store_overwrite_preserves_created_at() {
        let mut store = EntryStore::new();

        store.put("key1".to_string(), b"v".to_vec(), None, 100);
        let displaced = store
            .put("key1".to_string(), b"longer".to_vec(), Some(5), 200)
            .unwrap();

        assert_eq!(displaced.value, b"v");
        let entry = store.peek("key1").unwrap();
        assert_eq!(entry.value, b"longer");
        assert_eq!(entry.created_at, 100);
        assert_eq!(entry.last_accessed_at, 200);
        assert!(entry.sequence > displaced.sequence);
        assert_eq!(entry.expires_at, Some(5_200));
        assert_eq!(store.len(), 1);
        assert_eq!(store.total_bytes(), 10);
    }

    #[test]
    fn test_store_remove() {
        let mut store = EntryStore::new();

        store.put("key1".to_string(), b"value1".to_vec(), None, 0);
        let removed = store.remove("key1").unwrap();

        assert_eq!(removed.key, "key1");
        assert!(store.is_empty());
        assert_eq!(store.total_bytes(), 0);
        assert!(store.remove("key1").is_none());
    }

    #[test]
    fn test_store_sequence_is_monotonic() {
        let mut store = EntryStore::new();

        store.put("a".to_string(), vec![], None, 0);
        store.put("b".to_string(), vec![], None, 0);
        store.put("a".to_string(), vec![], None, 0);

        let a = store.peek("a").unwrap().sequence;
        let b = store.peek("b").unwrap().sequence;
        assert!(a > b);
    }

    #[test]
    fn test_store_expired_keys() {
        let mut store = EntryStore::new();

        store.put("short".to_string(), b"v".to_vec(), Some(1), 0);
        store.put("long".to_string(), b"v".to_vec(), Some(10), 0);
        store.put("forever".to_string(), b"v".to_vec(), None, 0);

        assert_eq!(store.expired_keys(1_000), vec!["short".to_string()]);
        assert!(store.expired_keys(999).is_empty());
    }
}
