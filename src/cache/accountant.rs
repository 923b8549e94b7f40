//! Memory Accountant Module
//!
//! Tracks aggregate entry bytes against the configured budget.

// == Memory Accountant ==
/// Byte usage against a fixed budget.
///
/// Updated in the same critical section as every store mutation, so
/// `used_bytes` always equals the sum of stored entry sizes.
#[derive(Debug, Clone)]
pub struct MemoryAccountant {
    budget: u64,
    used: u64,
}

impl MemoryAccountant {
    /// Creates an accountant with nothing in use.
    pub fn new(budget: u64) -> Self {
        Self { budget, used: 0 }
    }

    /// Returns true if adding `additional` bytes would go over budget.
    pub fn would_exceed(&self, additional: u64) -> bool {
        self.used.saturating_add(additional) > self.budget
    }

    /// Records bytes taken by an insert.
    pub fn record_insert(&mut self, bytes: u64) {
        self.used += bytes;
    }

    /// Records bytes released by a removal.
    pub fn record_remove(&mut self, bytes: u64) {
        debug_assert!(bytes <= self.used, "released more bytes than in use");
        self.used = self.used.saturating_sub(bytes);
    }

    pub fn budget_bytes(&self) -> u64 {
        self.budget
    }

    pub fn used_bytes(&self) -> u64 {
        self.used
    }

    /// Bytes still free under the budget.
    pub fn available_bytes(&self) -> u64 {
        self.budget.saturating_sub(self.used)
    }
}
