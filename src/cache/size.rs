//! Size Estimator
//!
//! Approximates the footprint of a value by measuring its JSON form as UTF-16
//! code units, two bytes each.

use serde::Serialize;
use tracing::debug;

/// Estimate used when a value cannot be serialized.
pub const FALLBACK_SIZE_BYTES: u64 = 1024;

/// Estimated byte size of an already serialized payload.
pub fn serialized_size(serialized: &str) -> u64 {
    serialized.encode_utf16().count() as u64 * 2
}

/// Estimates the byte footprint of `value`. Never fails.
pub fn estimate_size<T: Serialize + ?Sized>(value: &T) -> u64 {
    match serde_json::to_string(value) {
        Ok(serialized) => serialized_size(&serialized),
        Err(e) => {
            debug!("Size estimation fell back to {} bytes: {}", FALLBACK_SIZE_BYTES, e);
            FALLBACK_SIZE_BYTES
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_estimate_string() {
        // "\"abc\"" is five characters
        assert_eq!(estimate_size("abc"), 10);
    }

    #[test]
    fn test_estimate_counts_utf16_units() {
        // quotes + one BMP char + one astral char (surrogate pair)
        assert_eq!(estimate_size("é😀"), (2 + 1 + 2) * 2);
    }

    #[test]
    fn test_estimate_unserializable_falls_back() {
        let mut map = HashMap::new();
        map.insert((1, 2), "tuple keys are not valid JSON keys");
        assert_eq!(estimate_size(&map), FALLBACK_SIZE_BYTES);
    }
}
