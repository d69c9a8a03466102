//! Cache Module
//!
//! Bounded in-process caching with memory budgeting, LRU eviction, per-pattern
//! TTLs, optional compression, invalidation and event telemetry.

mod clock;
mod codec;
mod entry;
mod events;
mod handle;
mod invalidation;
mod lru;
mod report;
mod size;
mod stats;
mod store;
mod ttl;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use codec::{Codec, DeflateCodec};
pub use entry::{CacheEntry, EntryMetadata, Payload};
pub use events::{
    CacheEvent, EventCallback, EventHub, EventKind, EvictionReason, ListenerId, MissReason,
};
pub use handle::Cache;
pub use invalidation::{InvalidateOptions, InvalidationPattern};
pub use lru::RecencyOrder;
pub use report::{DetailedReport, EntryReport, REPORT_TOP_N};
pub use size::{estimate_size, FALLBACK_SIZE_BYTES};
pub use stats::{CacheStats, StatsSnapshot};
pub use store::{CacheStore, SetOptions, MAX_CONCURRENT_PRELOADS, MEMORY_WARNING_THRESHOLD};
pub use ttl::{TtlResolver, TtlStrategy, DEFAULT_STRATEGY};

// == Public Constants ==
/// Maximum allowed key length in bytes, enforced at the HTTP boundary
pub const MAX_KEY_LENGTH: usize = 1024;
