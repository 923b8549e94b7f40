//! memcap - A memory-bounded in-memory cache
//!
//! Provides a byte-budgeted key-value cache with random, LRU and TTL-aware
//! eviction, a recorded eviction history, and a small HTTP server on top.

pub mod analysis;
pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod experiment;
pub mod models;
pub mod tasks;

pub use api::AppState;
pub use cache::{BoundedCache, EvictionPolicyKind};
pub use config::{CacheConfig, Config};
pub use error::CacheError;
pub use tasks::spawn_cleanup_task;
