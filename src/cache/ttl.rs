//! TTL Resolver Module
//!
//! Maps cache keys to time-to-live durations through an ordered list of
//! substring strategies.

use serde::{Deserialize, Serialize};

/// Pattern name reserved for the fallback strategy.
pub const DEFAULT_STRATEGY: &str = "default";

// == TTL Strategy ==
/// A key pattern and the TTL applied to keys containing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TtlStrategy {
    pub pattern: String,
    pub ttl_ms: u64,
}

impl TtlStrategy {
    pub fn new(pattern: impl Into<String>, ttl_ms: u64) -> Self {
        Self {
            pattern: pattern.into(),
            ttl_ms,
        }
    }
}

// == TTL Resolver ==
/// Resolves a key to its TTL.
///
/// Resolution is a linear scan in declaration order; the first pattern the
/// key contains wins. There is no longest-match preference, so more specific
/// patterns must be declared first.
#[derive(Debug, Clone)]
pub struct TtlResolver {
    /// Non-default strategies, declaration order preserved
    patterns: Vec<TtlStrategy>,
    /// `default` strategy if declared, otherwise the global default
    fallback_ms: u64,
}

impl TtlResolver {
    pub fn new(strategies: &[TtlStrategy], default_ttl_ms: u64) -> Self {
        let fallback_ms = strategies
            .iter()
            .find(|s| s.pattern == DEFAULT_STRATEGY)
            .map(|s| s.ttl_ms)
            .unwrap_or(default_ttl_ms);

        let patterns = strategies
            .iter()
            .filter(|s| s.pattern != DEFAULT_STRATEGY)
            .cloned()
            .collect();

        Self {
            patterns,
            fallback_ms,
        }
    }

    // == Resolve ==
    /// Returns the TTL in milliseconds for `key`.
    pub fn resolve(&self, key: &str) -> u64 {
        self.patterns
            .iter()
            .find(|s| key.contains(s.pattern.as_str()))
            .map(|s| s.ttl_ms)
            .unwrap_or(self.fallback_ms)
    }

    pub fn fallback_ms(&self) -> u64 {
        self.fallback_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> TtlResolver {
        TtlResolver::new(
            &[
                TtlStrategy::new("/api/dashboard", 60_000),
                TtlStrategy::new("default", 120_000),
                TtlStrategy::new("/api", 30_000),
            ],
            300_000,
        )
    }

    #[test]
    fn test_first_declared_match_wins() {
        let r = resolver();
        assert_eq!(r.resolve("/api/dashboard-data?x=1"), 60_000);
        assert_eq!(r.resolve("/api/users"), 30_000);
    }

    #[test]
    fn test_unmatched_uses_default_strategy() {
        assert_eq!(resolver().resolve("/static/logo.png"), 120_000);
    }

    #[test]
    fn test_unmatched_without_default_strategy_uses_global() {
        let r = TtlResolver::new(&[TtlStrategy::new("/api", 10)], 300_000);
        assert_eq!(r.resolve("/other"), 300_000);
        assert_eq!(r.fallback_ms(), 300_000);
    }

    #[test]
    fn test_default_pattern_is_not_matched_literally() {
        let r = TtlResolver::new(&[TtlStrategy::new("default", 5)], 300_000);
        assert!(r.patterns.is_empty());
        assert_eq!(r.resolve("my-default-key"), 5);
        assert_eq!(r.resolve("anything"), 5);
    }

    #[test]
    fn test_order_sensitivity() {
        let broad_first = TtlResolver::new(
            &[TtlStrategy::new("/api", 1), TtlStrategy::new("/api/dashboard", 2)],
            100,
        );
        assert_eq!(broad_first.resolve("/api/dashboard"), 1);
    }
}
