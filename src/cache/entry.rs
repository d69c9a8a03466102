//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use serde::{Deserialize, Serialize};

// == Payload ==
/// Stored form of a value.
#[derive(Debug, Clone)]
pub enum Payload<T> {
    /// The value as given to `set`
    Plain(T),
    /// Deflate-compressed JSON of the value. Only values whose JSON reads
    /// back as `T` are stored this way.
    Compressed(Vec<u8>),
}

impl<T> Payload<T> {
    pub fn is_compressed(&self) -> bool {
        matches!(self, Payload::Compressed(_))
    }
}

// == Entry Metadata ==
/// Classification tags used only to filter invalidation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view_type: Option<String>,
    /// Set when the entry was stored by `preload`
    #[serde(default)]
    pub preloaded: bool,
}

impl EntryMetadata {
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = Some(level.into());
        self
    }

    pub fn with_view_type(mut self, view_type: impl Into<String>) -> Self {
        self.view_type = Some(view_type.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Fills unset fields from a URL-shaped key.
    ///
    /// `url` is the part before `?` (only for keys that look like paths or
    /// URLs); `level` and `view_type` come from the `level` and
    /// `view`/`viewType` query parameters.
    pub fn derive_from_key(mut self, key: &str) -> Self {
        let (path, query) = match key.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (key, None),
        };

        if self.url.is_none() && (path.starts_with('/') || path.contains("://")) {
            self.url = Some(path.to_string());
        }

        for pair in query.into_iter().flat_map(|q| q.split('&')) {
            let Some((name, value)) = pair.split_once('=') else {
                continue;
            };
            if value.is_empty() {
                continue;
            }
            match name {
                "level" if self.level.is_none() => self.level = Some(value.to_string()),
                "view" | "viewType" | "view_type" if self.view_type.is_none() => {
                    self.view_type = Some(value.to_string())
                }
                _ => {}
            }
        }

        self
    }
}

// == Cache Entry ==
/// Represents a single cache entry with value and metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    /// The stored value
    pub payload: Payload<T>,
    /// Creation timestamp (clock milliseconds)
    pub created_at: u64,
    /// Expiration timestamp (clock milliseconds), always after `created_at`
    pub expires_at: u64,
    /// Estimated size charged against the memory budget
    pub size_bytes: u64,
    /// Number of successful reads
    pub access_count: u64,
    pub metadata: EntryMetadata,
}

impl<T> CacheEntry<T> {
    // == Constructor ==
    /// Creates a new cache entry expiring `ttl_ms` after `now`.
    ///
    /// A zero TTL is bumped to one millisecond so that `expires_at > created_at`.
    pub fn new(
        payload: Payload<T>,
        size_bytes: u64,
        now: u64,
        ttl_ms: u64,
        metadata: EntryMetadata,
    ) -> Self {
        Self {
            payload,
            created_at: now,
            expires_at: now.saturating_add(ttl_ms.max(1)),
            size_bytes,
            access_count: 0,
            metadata,
        }
    }

    // == Is Expired ==
    /// An entry is served up to and including `expires_at`.
    pub fn is_expired(&self, now: u64) -> bool {
        now > self.expires_at
    }

    pub fn age_ms(&self, now: u64) -> u64 {
        now.saturating_sub(self.created_at)
    }

    /// Remaining TTL in milliseconds, zero once expired.
    pub fn ttl_remaining_ms(&self, now: u64) -> u64 {
        self.expires_at.saturating_sub(now)
    }

    pub fn is_compressed(&self) -> bool {
        self.payload.is_compressed()
    }
}
