//! Invalidation Module
//!
//! Criteria for removing entries by key pattern, age and metadata.

use std::fmt;
use std::sync::Arc;

use serde::Deserialize;

use crate::cache::entry::CacheEntry;

// == Invalidation Pattern ==
/// Selects keys to invalidate.
#[derive(Clone)]
pub enum InvalidationPattern {
    /// Keys containing this substring
    Literal(String),
    /// Keys for which the predicate returns true
    Predicate(Arc<dyn Fn(&str) -> bool + Send + Sync>),
}

impl InvalidationPattern {
    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        InvalidationPattern::Predicate(Arc::new(f))
    }

    pub fn matches_key(&self, key: &str) -> bool {
        match self {
            InvalidationPattern::Literal(needle) => key.contains(needle.as_str()),
            InvalidationPattern::Predicate(f) => f(key),
        }
    }
}

impl fmt::Debug for InvalidationPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidationPattern::Literal(s) => f.debug_tuple("Literal").field(s).finish(),
            InvalidationPattern::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

impl From<&str> for InvalidationPattern {
    fn from(s: &str) -> Self {
        InvalidationPattern::Literal(s.to_string())
    }
}

impl From<String> for InvalidationPattern {
    fn from(s: String) -> Self {
        InvalidationPattern::Literal(s)
    }
}

// == Invalidate Options ==
/// Optional filters applied on top of the key pattern.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct InvalidateOptions {
    /// Only entries at least this old
    #[serde(default)]
    pub older_than_ms: Option<u64>,
    /// Only entries whose metadata level equals this
    #[serde(default)]
    pub level: Option<String>,
}

impl InvalidateOptions {
    pub fn older_than_ms(mut self, ms: u64) -> Self {
        self.older_than_ms = Some(ms);
        self
    }

    pub fn level(mut self, level: impl Into<String>) -> Self {
        self.level = Some(level.into());
        self
    }

    /// True when `entry` passes both the age and level filters.
    pub fn admits<T>(&self, entry: &CacheEntry<T>, now: u64) -> bool {
        let old_enough = self
            .older_than_ms
            .map_or(true, |ms| entry.age_ms(now) >= ms);
        let level_matches = self
            .level
            .as_ref()
            .map_or(true, |level| entry.metadata.level.as_ref() == Some(level));
        old_enough && level_matches
    }
}
