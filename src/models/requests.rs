//! Request DTOs for the cache server API
//!
//! Defines the structure of incoming HTTP request bodies.

use serde::Deserialize;
use serde_json::Value;

use crate::cache::{EntryMetadata, InvalidateOptions, SetOptions, MAX_KEY_LENGTH};

/// Request body for the SET operation (PUT /set)
#[derive(Debug, Clone, Deserialize)]
pub struct SetRequest {
    /// The cache key
    pub key: String,
    /// Any JSON value
    pub value: Value,
    /// Optional TTL override in milliseconds
    #[serde(default)]
    pub ttl_ms: Option<u64>,
    /// Optional classification tags
    #[serde(default)]
    pub metadata: Option<EntryMetadata>,
}

impl SetRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        validate_key(&self.key)
    }

    pub fn options(&self) -> SetOptions {
        SetOptions {
            ttl_ms: self.ttl_ms,
            metadata: self.metadata.clone(),
        }
    }
}

/// Request body for POST /invalidate
#[derive(Debug, Clone, Deserialize)]
pub struct InvalidateRequest {
    /// Substring matched against keys
    pub pattern: String,
    #[serde(flatten)]
    pub options: InvalidateOptions,
}

impl InvalidateRequest {
    /// An empty pattern would match every key; `/invalidate-all` exists for that.
    pub fn validate(&self) -> Option<String> {
        if self.pattern.is_empty() {
            return Some("Pattern cannot be empty".to_string());
        }
        None
    }
}

pub fn validate_key(key: &str) -> Option<String> {
    if key.is_empty() {
        return Some("Key cannot be empty".to_string());
    }
    if key.len() > MAX_KEY_LENGTH {
        return Some(format!(
            "Key exceeds maximum length of {} bytes",
            MAX_KEY_LENGTH
        ));
    }
    None
}
