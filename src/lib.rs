//! Adaptive Cache - a bounded in-process cache
//!
//! Holds computed or fetched values under a memory budget, evicts by least
//! recent use, assigns TTLs per key pattern, optionally compresses payloads,
//! supports pattern invalidation and reports hit/miss/eviction telemetry.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod tasks;

pub use api::AppState;
pub use cache::{Cache, CacheStore};
pub use config::{CacheConfig, Config};
pub use tasks::spawn_cleanup_task;
