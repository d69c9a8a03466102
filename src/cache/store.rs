//! Cache Store Module
//!
//! Main cache engine combining HashMap storage with recency tracking, memory
//! budgeting, TTL resolution, optional compression and invalidation.
//!
//! `CacheStore` is single-threaded (`&mut self`); `Cache` wraps it in a lock
//! so each operation here is atomic to concurrent callers.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cache::clock::{Clock, MonotonicClock};
use crate::cache::codec::{Codec, DeflateCodec};
use crate::cache::entry::{CacheEntry, EntryMetadata, Payload};
use crate::cache::events::{
    CacheEvent, EventCallback, EventHub, EventKind, EvictionReason, ListenerId, MissReason,
};
use crate::cache::invalidation::{InvalidateOptions, InvalidationPattern};
use crate::cache::lru::RecencyOrder;
use crate::cache::report::{DetailedReport, EntryReport};
use crate::cache::size::{estimate_size, serialized_size};
use crate::cache::stats::{CacheStats, StatsSnapshot};
use crate::cache::ttl::{TtlResolver, TtlStrategy};
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};

/// Concurrent preload cap; further requests are dropped.
pub const MAX_CONCURRENT_PRELOADS: usize = 10;

/// Fraction of the memory budget above which `MemoryWarning` fires.
pub const MEMORY_WARNING_THRESHOLD: f64 = 0.9;

// == Set Options ==
/// Per-call overrides for `set_with`.
#[derive(Debug, Clone, Default)]
pub struct SetOptions {
    /// Overrides the TTL the resolver would pick
    pub ttl_ms: Option<u64>,
    /// Explicit metadata; missing fields are still derived from the key
    pub metadata: Option<EntryMetadata>,
}

impl SetOptions {
    pub fn ttl_ms(mut self, ttl_ms: u64) -> Self {
        self.ttl_ms = Some(ttl_ms);
        self
    }

    pub fn metadata(mut self, metadata: EntryMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

// == Cache Store ==
/// Bounded LRU cache with per-pattern TTLs.
#[derive(Debug)]
pub struct CacheStore<T> {
    /// Key-value storage
    entries: HashMap<String, CacheEntry<T>>,
    /// Recency order, same key set as `entries`
    lru: RecencyOrder,
    stats: CacheStats,
    ttl: TtlResolver,
    codec: Box<dyn Codec>,
    events: EventHub,
    clock: Arc<dyn Clock>,
    config: CacheConfig,
    /// Keys with a preload in flight
    preloading: HashSet<String>,
    /// Bumped by `reset`; preloads claimed before it are discarded
    generation: u64,
}

impl<T> CacheStore<T>
where
    T: Serialize + DeserializeOwned + Clone,
{
    // == Constructors ==
    /// Creates a store on the real monotonic clock.
    pub fn new(config: CacheConfig) -> Result<Self> {
        Self::with_clock(config, Arc::new(MonotonicClock::new()))
    }

    /// Creates a store that reads time from `clock`.
    pub fn with_clock(config: CacheConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            entries: HashMap::new(),
            lru: RecencyOrder::new(),
            stats: CacheStats::new(),
            ttl: TtlResolver::new(&config.strategies, config.default_ttl_ms),
            codec: Box::new(DeflateCodec::new(config.compression_level)),
            events: EventHub::new(),
            clock,
            config,
            preloading: HashSet::new(),
            generation: 0,
        })
    }

    /// Replaces the payload codec.
    pub fn with_codec(mut self, codec: Box<dyn Codec>) -> Self {
        self.codec = codec;
        self
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    // == Get ==
    /// Returns a copy of the value for `key`, or `None` on miss.
    ///
    /// Expired entries are deleted, counted as an eviction and a miss, and
    /// reported through a `Miss` event with reason `Expired`. Entries whose
    /// payload cannot be decoded are dropped the same way with reason
    /// `Corrupted`.
    pub fn get(&mut self, key: &str) -> Option<T> {
        let now = self.clock.now_ms();

        let Some(entry) = self.entries.get(key) else {
            self.record_miss(key, now, None);
            return None;
        };

        if entry.is_expired(now) {
            self.remove_entry(key);
            self.stats.record_evictions(1);
            self.record_miss(key, now, Some(MissReason::Expired));
            return None;
        }

        let decoded = match &entry.payload {
            Payload::Plain(value) => Ok(value.clone()),
            Payload::Compressed(bytes) => decode(self.codec.as_ref(), bytes),
        };

        let value = match decoded {
            Ok(value) => value,
            Err(e) => {
                warn!("Dropping unreadable cache entry '{}': {}", key, e);
                self.remove_entry(key);
                self.record_miss(key, now, Some(MissReason::Corrupted));
                return None;
            }
        };

        let (size, age_ms) = match self.entries.get_mut(key) {
            Some(entry) => {
                entry.access_count += 1;
                (entry.size_bytes, entry.age_ms(now))
            }
            None => (0, 0),
        };
        self.promote(key);
        self.stats.record_hit();
        debug!("Cache hit: {}", key);
        self.events.emit(&CacheEvent::Hit {
            key: key.to_string(),
            size,
            age_ms,
        });

        Some(value)
    }

    // == Set ==
    /// Stores `value` under `key` with an optional TTL override.
    pub fn set(&mut self, key: impl Into<String>, value: T, ttl_ms: Option<u64>) -> bool {
        self.set_with(
            key,
            value,
            SetOptions {
                ttl_ms,
                metadata: None,
            },
        )
    }

    /// Stores `value` under `key`.
    ///
    /// Any existing entry for the key is removed first. LRU entries are
    /// evicted until the new entry fits the memory budget; if it still does
    /// not fit it is stored anyway and a `MemoryWarning` is emitted.
    ///
    /// Returns `false` if the value could not be serialized for compression.
    /// The previous entry for the key is gone in that case too.
    pub fn set_with(&mut self, key: impl Into<String>, value: T, options: SetOptions) -> bool {
        let key = key.into();
        let now = self.clock.now_ms();

        self.remove_entry(&key);

        let (payload, size_bytes) = if self.config.compression_enabled {
            match self.encode(value) {
                Ok(encoded) => encoded,
                Err(e) => {
                    warn!("Failed to cache '{}': {}", key, e);
                    return false;
                }
            }
        } else {
            let size = estimate_size(&value);
            (Payload::Plain(value), size)
        };

        let ttl_ms = options.ttl_ms.unwrap_or_else(|| self.ttl.resolve(&key));
        let metadata = options.metadata.unwrap_or_default().derive_from_key(&key);

        self.make_room(size_bytes);

        let entry = CacheEntry::new(payload, size_bytes, now, ttl_ms, metadata);
        self.entries.insert(key.clone(), entry);
        self.stats.add_memory(size_bytes);
        self.promote(&key);

        debug!("Cached '{}' ({} bytes, ttl {} ms)", key, size_bytes, ttl_ms);
        self.check_memory_pressure();
        true
    }

    // == Delete ==
    /// Removes an entry by key. Returns whether it existed.
    pub fn delete(&mut self, key: &str) -> bool {
        self.remove_entry(key).is_some()
    }

    /// True if `key` is cached and not expired. Does not touch recency or stats.
    pub fn contains(&self, key: &str) -> bool {
        let now = self.clock.now_ms();
        self.entries.get(key).is_some_and(|e| !e.is_expired(now))
    }

    // == Invalidate ==
    /// Removes entries whose key matches `pattern` and that pass `options`.
    ///
    /// Returns the removed keys, sorted.
    pub fn invalidate(
        &mut self,
        pattern: impl Into<InvalidationPattern>,
        options: &InvalidateOptions,
    ) -> Vec<String> {
        let pattern = pattern.into();
        let now = self.clock.now_ms();

        let mut removed: Vec<String> = self
            .entries
            .iter()
            .filter(|(key, entry)| pattern.matches_key(key) && options.admits(entry, now))
            .map(|(key, _)| key.clone())
            .collect();
        removed.sort();

        for key in &removed {
            self.remove_entry(key);
        }

        if !removed.is_empty() {
            info!("Invalidated {} entries matching {:?}", removed.len(), pattern);
        }
        removed
    }

    /// Clears every entry and zeroes memory usage. Lifetime counters survive.
    pub fn invalidate_all(&mut self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        self.lru.clear();
        self.stats.memory_usage = 0;
        info!("Invalidated all {} entries", count);
        count
    }

    // == Cleanup Expired ==
    /// Removes all expired entries, counting each as an eviction.
    ///
    /// Returns the number of entries removed.
    pub fn cleanup_expired(&mut self) -> usize {
        let now = self.clock.now_ms();
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();

        let mut freed = 0;
        for key in &expired {
            if let Some(entry) = self.remove_entry(key) {
                freed += entry.size_bytes;
            }
        }

        if !expired.is_empty() {
            self.stats.record_evictions(expired.len());
            self.events.emit(&CacheEvent::Eviction {
                keys: expired.clone(),
                bytes_freed: freed,
                reason: EvictionReason::Expired,
            });
        }
        expired.len()
    }

    // == Observers ==
    pub fn on(&mut self, kind: EventKind, callback: EventCallback) -> ListenerId {
        self.events.on(kind, callback)
    }

    pub fn off(&mut self, kind: EventKind, id: ListenerId) -> bool {
        self.events.off(kind, id)
    }

    // == Statistics ==
    /// Returns a computed statistics snapshot.
    pub fn statistics(&self) -> StatsSnapshot {
        self.stats
            .snapshot(self.entries.len(), self.config.max_entries, self.config.max_memory_bytes)
    }

    /// Statistics plus per-entry diagnostics.
    pub fn detailed_report(&self) -> DetailedReport {
        let now = self.clock.now_ms();
        let entries = self
            .lru
            .iter_recent_first()
            .filter_map(|key| {
                self.entries.get(key).map(|entry| EntryReport {
                    key: key.clone(),
                    size_bytes: entry.size_bytes,
                    age_ms: entry.age_ms(now),
                    ttl_remaining_ms: entry.ttl_remaining_ms(now),
                    access_count: entry.access_count,
                    compressed: entry.is_compressed(),
                    metadata: entry.metadata.clone(),
                })
            })
            .collect();
        DetailedReport::new(self.statistics(), entries)
    }

    /// Replaces the TTL strategies used for future `set` calls.
    pub fn reconfigure_strategies(&mut self, strategies: Vec<TtlStrategy>) {
        self.ttl = TtlResolver::new(&strategies, self.config.default_ttl_ms);
        self.config.strategies = strategies;
        info!("TTL strategies reconfigured ({} patterns)", self.config.strategies.len());
    }

    /// Resolves the TTL that `set` would assign to `key`.
    pub fn resolve_ttl(&self, key: &str) -> u64 {
        self.ttl.resolve(key)
    }

    // == Preload Bookkeeping ==
    /// Claims a preload slot for `key`, returning the store generation the
    /// claim belongs to.
    ///
    /// Refused when the key is already cached, already being preloaded, or
    /// `MAX_CONCURRENT_PRELOADS` preloads are in flight.
    pub fn begin_preload(&mut self, key: &str) -> Option<u64> {
        if self.contains(key)
            || self.preloading.contains(key)
            || self.preloading.len() >= MAX_CONCURRENT_PRELOADS
        {
            return None;
        }
        self.preloading.insert(key.to_string());
        Some(self.generation)
    }

    /// Releases the preload slot and stores the loaded value, if any.
    ///
    /// Results claimed before the last `reset` are dropped untouched.
    pub fn finish_preload(
        &mut self,
        key: &str,
        generation: u64,
        loaded: anyhow::Result<T>,
        options: SetOptions,
    ) {
        if generation != self.generation {
            debug!("Discarding preload of '{}' from before reset", key);
            return;
        }
        self.preloading.remove(key);

        match loaded {
            Ok(value) => {
                let mut metadata = options.metadata.unwrap_or_default();
                metadata.preloaded = true;
                let options = SetOptions {
                    ttl_ms: options.ttl_ms,
                    metadata: Some(metadata),
                };
                if self.set_with(key, value, options) {
                    self.stats.preload_hits += 1;
                    debug!("Preloaded '{}'", key);
                }
            }
            Err(e) => warn!("Preload of '{}' failed: {:#}", key, e),
        }
    }

    pub fn preloads_in_flight(&self) -> usize {
        self.preloading.len()
    }

    // == Destroy ==
    /// Drops all entries, observers, in-flight preload claims and statistics.
    pub fn reset(&mut self) {
        self.entries.clear();
        self.lru.clear();
        self.events.clear();
        self.preloading.clear();
        self.generation += 1;
        self.stats = CacheStats::new();
    }

    // == Accessors ==
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn memory_usage(&self) -> u64 {
        self.stats.memory_usage
    }

    /// Keys from most to least recently used.
    pub fn keys(&self) -> Vec<String> {
        self.lru.iter_recent_first().cloned().collect()
    }

    // == Internals ==

    /// Serializes once, measures, and deflates when it helps.
    fn encode(&mut self, value: T) -> Result<(Payload<T>, u64)> {
        let serialized = serde_json::to_string(&value)?;
        let size = serialized_size(&serialized);

        match self.codec.compress(serialized.as_bytes()) {
            Some(compressed) if compressed.len() < serialized.len() => {
                // a payload that cannot be read back would only surface as a corrupted miss
                serde_json::from_str::<T>(&serialized)?;
                self.stats.record_compression(serialized.len(), compressed.len());
                Ok((Payload::Compressed(compressed), size))
            }
            _ => Ok((Payload::Plain(value), size)),
        }
    }

    /// Removes an entry and its recency slot, releasing its memory.
    fn remove_entry(&mut self, key: &str) -> Option<CacheEntry<T>> {
        let entry = self.entries.remove(key)?;
        self.lru.remove(key);
        self.stats.release_memory(entry.size_bytes);
        Some(entry)
    }

    /// Moves `key` to the head, then enforces `max_entries`.
    fn promote(&mut self, key: &str) {
        self.lru.touch(key);

        if self.lru.len() > self.config.max_entries {
            if let Some(victim) = self.lru.evict_oldest() {
                let freed = self.entries.remove(&victim).map_or(0, |e| e.size_bytes);
                self.stats.release_memory(freed);
                self.stats.record_evictions(1);
                debug!("Evicted '{}' ({})", victim, EvictionReason::MemoryLimit);
                self.events.emit(&CacheEvent::Eviction {
                    keys: vec![victim],
                    bytes_freed: freed,
                    reason: EvictionReason::MemoryLimit,
                });
            }
        }
    }

    /// Evicts from the LRU tail until `incoming` bytes fit or nothing is left.
    fn make_room(&mut self, incoming: u64) {
        let limit = self.config.max_memory_bytes;
        let mut evicted = Vec::new();
        let mut freed = 0;

        while self.stats.memory_usage + incoming > limit {
            let Some(victim) = self.lru.evict_oldest() else {
                break;
            };
            if let Some(entry) = self.entries.remove(&victim) {
                self.stats.release_memory(entry.size_bytes);
                freed += entry.size_bytes;
            }
            evicted.push(victim);
        }

        if !evicted.is_empty() {
            self.stats.record_evictions(evicted.len());
            debug!(
                "Evicted {} entries ({} bytes, {})",
                evicted.len(),
                freed,
                EvictionReason::SpaceNeeded
            );
            self.events.emit(&CacheEvent::Eviction {
                keys: evicted,
                bytes_freed: freed,
                reason: EvictionReason::SpaceNeeded,
            });
        }
    }

    fn check_memory_pressure(&self) {
        let usage = self.stats.memory_usage;
        let limit = self.config.max_memory_bytes;
        if usage as f64 > limit as f64 * MEMORY_WARNING_THRESHOLD {
            let percentage = usage as f64 / limit as f64 * 100.0;
            warn!("Cache memory at {:.1}% of budget ({} / {} bytes)", percentage, usage, limit);
            self.events.emit(&CacheEvent::MemoryWarning {
                usage_bytes: usage,
                limit_bytes: limit,
                percentage,
            });
        }
    }

    fn record_miss(&mut self, key: &str, now: u64, reason: Option<MissReason>) {
        self.stats.record_miss();
        debug!("Cache miss: {} ({:?})", key, reason);
        self.events.emit(&CacheEvent::Miss {
            key: key.to_string(),
            timestamp: now,
            reason,
        });
    }

    /// Panics if the entry map, recency order and memory gauge disagree.
    #[cfg(test)]
    pub(crate) fn assert_invariants(&self) {
        assert_eq!(self.entries.len(), self.lru.len(), "entry/recency size mismatch");
        for key in self.entries.keys() {
            assert!(self.lru.contains(key), "'{}' missing from recency order", key);
        }
        let total: u64 = self.entries.values().map(|e| e.size_bytes).sum();
        assert_eq!(total, self.stats.memory_usage, "memory accounting drift");
    }
}

fn decode<T: DeserializeOwned>(codec: &dyn Codec, bytes: &[u8]) -> Result<T> {
    let raw = codec.decompress(bytes)?;
    serde_json::from_slice(&raw).map_err(CacheError::from)
}
