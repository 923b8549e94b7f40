//! LRU Policy Module
//!
//! Least Recently Used ordering kept in an arena-backed doubly-linked list.

use std::collections::HashMap;

use super::{EvictionPolicy, EvictionPolicyKind};
use crate::cache::{Entry, EntryStore};

/// Null link.
const NIL: usize = usize::MAX;

#[derive(Debug)]
struct Node {
    key: String,
    prev: usize,
    next: usize,
}

// == LRU Policy ==
/// Tracks access order for LRU eviction.
///
/// - Head = Most recently used
/// - Tail = Least recently used
///
/// Touch, remove and victim lookup are all O(1); removed slots are recycled
/// through a free list.
#[derive(Debug)]
pub struct LruPolicy {
    /// Key to arena slot
    index: HashMap<String, usize>,
    /// Node arena
    nodes: Vec<Node>,
    head: usize,
    tail: usize,
    /// Recycled slots
    free: Vec<usize>,
}

impl Default for LruPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl LruPolicy {
    // == Constructor ==
    /// Creates a new empty LRU policy.
    pub fn new() -> Self {
        Self {
            index: HashMap::new(),
            nodes: Vec::new(),
            head: NIL,
            tail: NIL,
            free: Vec::new(),
        }
    }

    // == Touch ==
    /// Marks a key as most recently used, tracking it if new.
    pub fn touch(&mut self, key: &str) {
        if let Some(&slot) = self.index.get(key) {
            self.unlink(slot);
            self.push_front(slot);
            return;
        }

        let node = Node {
            key: key.to_string(),
            prev: NIL,
            next: NIL,
        };
        let slot = match self.free.pop() {
            Some(slot) => {
                self.nodes[slot] = node;
                slot
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        };
        self.index.insert(key.to_string(), slot);
        self.push_front(slot);
    }

    // == Remove ==
    /// Stops tracking a key. Unknown keys are ignored.
    pub fn remove(&mut self, key: &str) {
        if let Some(slot) = self.index.remove(key) {
            self.unlink(slot);
            self.nodes[slot].key.clear();
            self.free.push(slot);
        }
    }

    // == Peek Oldest ==
    /// Returns the least recently used key.
    pub fn peek_oldest(&self) -> Option<&str> {
        (self.tail != NIL).then(|| self.nodes[self.tail].key.as_str())
    }

    /// Checks if a key is being tracked.
    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Keys from least to most recently used.
    pub fn oldest_first(&self) -> Vec<String> {
        let mut keys = Vec::with_capacity(self.index.len());
        let mut cursor = self.tail;
        while cursor != NIL {
            keys.push(self.nodes[cursor].key.clone());
            cursor = self.nodes[cursor].prev;
        }
        keys
    }

    fn unlink(&mut self, slot: usize) {
        let (prev, next) = (self.nodes[slot].prev, self.nodes[slot].next);
        if prev != NIL {
            self.nodes[prev].next = next;
        } else {
            self.head = next;
        }
        if next != NIL {
            self.nodes[next].prev = prev;
        } else {
            self.tail = prev;
        }
        self.nodes[slot].prev = NIL;
        self.nodes[slot].next = NIL;
    }

    fn push_front(&mut self, slot: usize) {
        self.nodes[slot].prev = NIL;
        self.nodes[slot].next = self.head;
        if self.head != NIL {
            self.nodes[self.head].prev = slot;
        }
        self.head = slot;
        if self.tail == NIL {
            self.tail = slot;
        }
    }
}

impl EvictionPolicy for LruPolicy {
    fn select_victim(&mut self, _store: &EntryStore, _now: u64) -> Option<String> {
        self.peek_oldest().map(str::to_string)
    }

    fn on_access(&mut self, entry: &Entry) {
        self.touch(&entry.key);
    }

    fn on_insert(&mut self, entry: &Entry) {
        self.touch(&entry.key);
    }

    fn on_remove(&mut self, key: &str) {
        self.remove(key);
    }

    fn len(&self) -> usize {
        self.index.len()
    }

    fn kind(&self) -> EvictionPolicyKind {
        EvictionPolicyKind::Lru
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lru_new() {
        let lru = LruPolicy::new();
        assert!(lru.is_empty());
        assert_eq!(lru.peek_oldest(), None);
    }

    #[test]
    fn test_lru_touch_new_key() {
        let mut lru = LruPolicy::new();

        lru.touch("key1");
        lru.touch("key2");
        lru.touch("key3");

        assert_eq!(lru.len(), 3);
        assert_eq!(lru.peek_oldest(), Some("key1"));
    }

    #[test]
    fn test_lru_touch_existing_key() {
        let mut lru = LruPolicy::new();

        lru.touch("key1");
        lru.touch("key2");
        lru.touch("key3");
        lru.touch("key1");

        assert_eq!(lru.len(), 3);
        assert_eq!(lru.peek_oldest(), Some("key2"));
    }

    #[test]
    fn test_lru_remove() {
        let mut lru = LruPolicy::new();

        lru.touch("key1");
        lru.touch("key2");
        lru.touch("key3");

        lru.remove("key2");

        assert_eq!(lru.len(), 2);
        assert!(!lru.contains("key2"));
        assert_eq!(lru.oldest_first(), vec!["key1", "key3"]);
    }

    #[test]
    fn test_lru_remove_tail_and_head() {
        let mut lru = LruPolicy::new();

        lru.touch("a");
        lru.touch("b");
        lru.touch("c");

        lru.remove("a");
        assert_eq!(lru.peek_oldest(), Some("b"));

        lru.remove("c");
        assert_eq!(lru.oldest_first(), vec!["b"]);

        lru.remove("b");
        assert!(lru.is_empty());
        assert_eq!(lru.peek_oldest(), None);
    }

    #[test]
    fn test_lru_remove_nonexistent_key() {
        let mut lru = LruPolicy::new();

        lru.touch("key1");
        lru.touch("key2");
        lru.remove("nonexistent");

        assert_eq!(lru.len(), 2);
    }

    #[test]
    fn test_lru_order_after_multiple_touches() {
        let mut lru = LruPolicy::new();

        // front=[b, c, a]=back after these touches
        lru.touch("a");
        lru.touch("b");
        lru.touch("c");
        lru.touch("a");
        lru.touch("c");
        lru.touch("b");

        assert_eq!(lru.oldest_first(), vec!["a", "c", "b"]);
    }

    #[test]
    fn test_lru_slots_are_recycled() {
        let mut lru = LruPolicy::new();

        for i in 0..10 {
            lru.touch(&format!("k{}", i));
        }
        for i in 0..10 {
            lru.remove(&format!("k{}", i));
        }
        for i in 10..20 {
            lru.touch(&format!("k{}", i));
        }

        assert_eq!(lru.nodes.len(), 10);
        assert_eq!(lru.len(), 10);
        assert_eq!(lru.peek_oldest(), Some("k10"));
    }

    #[test]
    fn test_lru_select_victim_does_not_untrack() {
        let mut lru = LruPolicy::new();
        let store = EntryStore::new();

        lru.touch("a");
        lru.touch("b");

        assert_eq!(lru.select_victim(&store, 0), Some("a".to_string()));
        assert_eq!(lru.select_victim(&store, 0), Some("a".to_string()));
        assert_eq!(lru.len(), 2);
    }
}
