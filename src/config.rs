//! Configuration Module
//!
//! Typed cache construction parameters plus the server configuration loaded
//! from environment variables.

use std::env;

use crate::cache::TtlStrategy;
use crate::error::{CacheError, Result};

// == Defaults ==
pub const DEFAULT_MAX_ENTRIES: usize = 100;
pub const DEFAULT_MAX_MEMORY_MB: u64 = 10;
pub const DEFAULT_TTL_MS: u64 = 300_000;
pub const DEFAULT_CLEANUP_INTERVAL_MS: u64 = 60_000;
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 6;
pub const DEFAULT_SERVER_PORT: u16 = 3000;

const BYTES_PER_MB: u64 = 1024 * 1024;

// == Cache Config ==
/// Cache construction parameters.
///
/// Every field has a default; use [`CacheConfig::builder`] to override only
/// the ones you care about.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheConfig {
    /// Maximum number of live entries
    pub max_entries: usize,
    /// Memory budget in bytes (soft limit, see `CacheStore::set`)
    pub max_memory_bytes: u64,
    /// TTL used when no strategy matches and no `default` strategy exists
    pub default_ttl_ms: u64,
    /// Interval between expiry sweeps
    pub cleanup_interval_ms: u64,
    /// Whether payloads are deflate-compressed before storage
    pub compression_enabled: bool,
    /// flate2 compression level (0-9)
    pub compression_level: u32,
    /// Ordered key-pattern TTL strategies
    pub strategies: Vec<TtlStrategy>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
            max_memory_bytes: DEFAULT_MAX_MEMORY_MB * BYTES_PER_MB,
            default_ttl_ms: DEFAULT_TTL_MS,
            cleanup_interval_ms: DEFAULT_CLEANUP_INTERVAL_MS,
            compression_enabled: false,
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            strategies: Vec::new(),
        }
    }
}

impl CacheConfig {
    /// Starts a builder seeded with the defaults.
    pub fn builder() -> CacheConfigBuilder {
        CacheConfigBuilder::default()
    }

    /// Rejects budgets and intervals that would make the cache unusable.
    pub fn validate(&self) -> Result<()> {
        if self.max_entries == 0 {
            return Err(CacheError::Config("max_entries must be at least 1".into()));
        }
        if self.max_memory_bytes == 0 {
            return Err(CacheError::Config("max_memory_bytes must be positive".into()));
        }
        if self.default_ttl_ms == 0 {
            return Err(CacheError::Config("default_ttl_ms must be positive".into()));
        }
        if self.cleanup_interval_ms == 0 {
            return Err(CacheError::Config(
                "cleanup_interval_ms must be positive".into(),
            ));
        }
        if self.compression_level > 9 {
            return Err(CacheError::Config(format!(
                "compression_level {} is out of range 0-9",
                self.compression_level
            )));
        }
        Ok(())
    }
}

// == Cache Config Builder ==
/// Field-by-field builder for [`CacheConfig`].
#[derive(Debug, Clone, Default)]
pub struct CacheConfigBuilder {
    config: CacheConfig,
}

impl CacheConfigBuilder {
    pub fn max_entries(mut self, max_entries: usize) -> Self {
        self.config.max_entries = max_entries;
        self
    }

    pub fn max_memory_mb(mut self, mb: u64) -> Self {
        self.config.max_memory_bytes = mb.saturating_mul(BYTES_PER_MB);
        self
    }

    pub fn max_memory_bytes(mut self, bytes: u64) -> Self {
        self.config.max_memory_bytes = bytes;
        self
    }

    pub fn default_ttl_ms(mut self, ttl_ms: u64) -> Self {
        self.config.default_ttl_ms = ttl_ms;
        self
    }

    pub fn cleanup_interval_ms(mut self, interval_ms: u64) -> Self {
        self.config.cleanup_interval_ms = interval_ms;
        self
    }

    pub fn compression_enabled(mut self, enabled: bool) -> Self {
        self.config.compression_enabled = enabled;
        self
    }

    pub fn compression_level(mut self, level: u32) -> Self {
        self.config.compression_level = level;
        self
    }

    /// Appends a strategy; declaration order decides ties.
    pub fn strategy(mut self, pattern: impl Into<String>, ttl_ms: u64) -> Self {
        self.config.strategies.push(TtlStrategy::new(pattern, ttl_ms));
        self
    }

    pub fn strategies(mut self, strategies: Vec<TtlStrategy>) -> Self {
        self.config.strategies = strategies;
        self
    }

    pub fn build(self) -> CacheConfig {
        self.config
    }
}

// == Server Config ==
/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Cache construction parameters
    pub cache: CacheConfig,
    /// HTTP server port
    pub server_port: u16,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `MAX_ENTRIES` - Maximum cache entries (default: 100)
    /// - `MAX_MEMORY_MB` - Memory budget in MiB (default: 10)
    /// - `DEFAULT_TTL_MS` - Default TTL in milliseconds (default: 300000)
    /// - `CLEANUP_INTERVAL_MS` - Sweep interval in milliseconds (default: 60000)
    /// - `COMPRESSION_ENABLED` - `true`/`1` to compress payloads (default: false)
    /// - `CACHE_STRATEGIES` - Ordered `pattern=ttl_ms` list, comma separated
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds a Config from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let parsed = |name: &str| lookup(name).and_then(|v| v.trim().parse::<u64>().ok());

        let mut builder = CacheConfig::builder();
        if let Some(v) = parsed("MAX_ENTRIES") {
            builder = builder.max_entries(v as usize);
        }
        if let Some(v) = parsed("MAX_MEMORY_MB") {
            builder = builder.max_memory_mb(v);
        }
        if let Some(v) = parsed("DEFAULT_TTL_MS") {
            builder = builder.default_ttl_ms(v);
        }
        if let Some(v) = parsed("CLEANUP_INTERVAL_MS") {
            builder = builder.cleanup_interval_ms(v);
        }
        if let Some(v) = lookup("COMPRESSION_ENABLED") {
            let v = v.trim().to_ascii_lowercase();
            builder = builder.compression_enabled(v == "true" || v == "1");
        }
        if let Some(v) = lookup("CACHE_STRATEGIES") {
            builder = builder.strategies(parse_strategies(&v));
        }

        Self {
            cache: builder.build(),
            server_port: lookup("SERVER_PORT")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(DEFAULT_SERVER_PORT),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            server_port: DEFAULT_SERVER_PORT,
        }
    }
}

/// Parses `pattern=ttl_ms,pattern=ttl_ms`, skipping malformed items.
///
/// Splits on the last `=` so patterns may themselves contain query strings.
fn parse_strategies(raw: &str) -> Vec<TtlStrategy> {
    raw.split(',')
        .filter_map(|item| {
            let (pattern, ttl) = item.trim().rsplit_once('=')?;
            let ttl_ms = ttl.trim().parse().ok()?;
            let pattern = pattern.trim();
            (!pattern.is_empty()).then(|| TtlStrategy::new(pattern, ttl_ms))
        })
        .collect()
}
