//! Cache Module
//!
//! Memory-bounded caching with pluggable eviction and a recorded eviction
//! history.

mod accountant;
mod bounded;
mod entry;
mod observer;
pub mod policy;
mod stats;
mod store;


// Re-export public types
pub use accountant::MemoryAccountant;
pub use bounded::BoundedCache;
pub use entry::{current_timestamp_ms, entry_size, Entry};
pub use observer::{EvictionLog, EvictionObserver, EvictionReason, EvictionRecord};
pub use policy::{EvictionPolicy, EvictionPolicyKind};
pub use stats::CacheStats;
pub use store::EntryStore;
