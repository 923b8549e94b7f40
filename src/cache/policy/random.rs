//! Random Policy Module
//!
//! Uniform victim selection over tracked keys using a seedable generator.

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{EvictionPolicy, EvictionPolicyKind};
use crate::cache::{Entry, EntryStore};

// == Random Policy ==
/// Picks victims uniformly at random.
///
/// Keys live in a dense vector with a key to position map, so insert,
/// remove and selection are O(1). With a fixed seed the victim sequence is
/// a pure function of the operation sequence.
#[derive(Debug)]
pub struct RandomPolicy {
    keys: Vec<String>,
    positions: HashMap<String, usize>,
    rng: StdRng,
}

impl RandomPolicy {
    /// Creates a policy seeded with `seed`, or from OS entropy when None.
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            keys: Vec::new(),
            positions: HashMap::new(),
            rng,
        }
    }

    fn track(&mut self, key: &str) {
        if self.positions.contains_key(key) {
            return;
        }
        self.positions.insert(key.to_string(), self.keys.len());
        self.keys.push(key.to_string());
    }

    fn untrack(&mut self, key: &str) {
        let Some(position) = self.positions.remove(key) else {
            return;
        };
        self.keys.swap_remove(position);
        if let Some(moved) = self.keys.get(position) {
            self.positions.insert(moved.clone(), position);
        }
    }
}

impl EvictionPolicy for RandomPolicy {
    fn select_victim(&mut self, _store: &EntryStore, _now: u64) -> Option<String> {
        if self.keys.is_empty() {
            return None;
        }
        let position = self.rng.gen_range(0..self.keys.len());
        Some(self.keys[position].clone())
    }

    // Access order does not affect random selection.
    fn on_access(&mut self, _entry: &Entry) {}

    fn on_insert(&mut self, entry: &Entry) {
        self.track(&entry.key);
    }

    fn on_remove(&mut self, key: &str) {
        self.untrack(key);
    }

    fn len(&self) -> usize {
        self.keys.len()
    }

    fn kind(&self) -> EvictionPolicyKind {
        EvictionPolicyKind::Random
    }
}
