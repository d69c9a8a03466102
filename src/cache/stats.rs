//! Cache Statistics Module
//!
//! Tracks cache performance metrics including hits, misses, evictions and
//! memory usage.

use serde::Serialize;

// == Cache Stats ==
/// Lifetime counters plus the memory gauge.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    /// Number of successful cache retrievals
    pub hits: u64,
    /// Number of failed cache retrievals (absent, expired or corrupted)
    pub misses: u64,
    /// Entries removed for space, entry count or expiry
    pub evictions: u64,
    /// Total `get` calls
    pub total_requests: u64,
    /// Bytes saved by compression, summed over every compressed `set`
    pub compression_savings_bytes: u64,
    /// Values stored by `preload`
    pub preload_hits: u64,
    /// Sum of `size_bytes` over live entries
    pub memory_usage: u64,
    /// Highest `memory_usage` observed
    pub peak_memory_usage: u64,
}

impl CacheStats {
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Ratio ==
    /// Returns hits / total_requests, or 0.0 if no requests have been made.
    pub fn hit_ratio(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            self.hits as f64 / self.total_requests as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
        self.total_requests += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
        self.total_requests += 1;
    }

    pub fn record_evictions(&mut self, count: usize) {
        self.evictions += count as u64;
    }

    pub fn record_compression(&mut self, original: usize, compressed: usize) {
        self.compression_savings_bytes += original.saturating_sub(compressed) as u64;
    }

    // == Memory Accounting ==
    pub fn add_memory(&mut self, bytes: u64) {
        self.memory_usage += bytes;
        self.peak_memory_usage = self.peak_memory_usage.max(self.memory_usage);
    }

    pub fn release_memory(&mut self, bytes: u64) {
        self.memory_usage = self.memory_usage.saturating_sub(bytes);
    }

    pub fn snapshot(&self, entries: usize, max_entries: usize, max_memory_bytes: u64) -> StatsSnapshot {
        StatsSnapshot {
            hits: self.hits,
            misses: self.misses,
            evictions: self.evictions,
            total_requests: self.total_requests,
            compression_savings_bytes: self.compression_savings_bytes,
            preload_hits: self.preload_hits,
            hit_ratio: self.hit_ratio(),
            entries,
            max_entries,
            memory_usage: self.memory_usage,
            peak_memory_usage: self.peak_memory_usage,
            max_memory_bytes,
            memory_usage_percent: if max_memory_bytes == 0 {
                0.0
            } else {
                self.memory_usage as f64 / max_memory_bytes as f64 * 100.0
            },
        }
    }
}

// == Stats Snapshot ==
/// Point-in-time view returned by `get_statistics`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub total_requests: u64,
    pub compression_savings_bytes: u64,
    pub preload_hits: u64,
    pub hit_ratio: f64,
    pub entries: usize,
    pub max_entries: usize,
    pub memory_usage: u64,
    pub peak_memory_usage: u64,
    pub max_memory_bytes: u64,
    pub memory_usage_percent: f64,
}
