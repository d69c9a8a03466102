//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check the store's structural invariants and the codec,
//! TTL and LRU guarantees across generated inputs.

use proptest::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;

use crate::cache::{
    CacheStore, Codec, DeflateCodec, InvalidateOptions, ManualClock, TtlResolver, TtlStrategy,
};
use crate::config::CacheConfig;

// == Test Configuration ==
const TEST_MAX_ENTRIES: usize = 100;

fn test_store(config: CacheConfig) -> (CacheStore<String>, ManualClock) {
    let clock = ManualClock::new();
    let store = CacheStore::with_clock(config, Arc::new(clock.clone())).unwrap();
    (store, clock)
}

// == Strategies ==
/// Generates valid cache keys from a small alphabet so operations collide
fn valid_key_strategy() -> impl Strategy<Value = String> {
    "[a-e/]{1,6}".prop_map(|s| s)
}

fn valid_value_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ]{0,64}".prop_map(|s| s)
}

#[derive(Debug, Clone)]
enum CacheOp {
    Set { key: String, value: String, ttl_ms: Option<u64> },
    Get { key: String },
    Delete { key: String },
    Invalidate { pattern: String },
    Advance { ms: u64 },
    Sweep,
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        4 => (valid_key_strategy(), valid_value_strategy(), prop::option::of(1u64..50))
            .prop_map(|(key, value, ttl_ms)| CacheOp::Set { key, value, ttl_ms }),
        4 => valid_key_strategy().prop_map(|key| CacheOp::Get { key }),
        1 => valid_key_strategy().prop_map(|key| CacheOp::Delete { key }),
        1 => "[a-e]{1,2}".prop_map(|pattern| CacheOp::Invalidate { pattern }),
        1 => (1u64..30).prop_map(|ms| CacheOp::Advance { ms }),
        1 => Just(CacheOp::Sweep),
    ]
}

fn apply(store: &mut CacheStore<String>, clock: &ManualClock, op: CacheOp) -> Option<bool> {
    match op {
        CacheOp::Set { key, value, ttl_ms } => {
            store.set(key, value, ttl_ms);
            None
        }
        CacheOp::Get { key } => Some(store.get(&key).is_some()),
        CacheOp::Delete { key } => {
            store.delete(&key);
            None
        }
        CacheOp::Invalidate { pattern } => {
            store.invalidate(pattern.as_str(), &InvalidateOptions::default());
            None
        }
        CacheOp::Advance { ms } => {
            clock.advance(ms);
            None
        }
        CacheOp::Sweep => {
            store.cleanup_expired();
            None
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    // Entry map and recency order hold the same keys, and the memory gauge
    // equals the sum of entry sizes, after every operation.
    #[test]
    fn prop_structural_invariants(
        ops in prop::collection::vec(cache_op_strategy(), 1..80),
        max_entries in 1usize..10,
        max_memory in 20u64..400,
    ) {
        let config = CacheConfig::builder()
            .max_entries(max_entries)
            .max_memory_bytes(max_memory)
            .build();
        let (mut store, clock) = test_store(config);

        for op in ops {
            apply(&mut store, &clock, op);
            store.assert_invariants();
            prop_assert!(store.len() <= max_entries);
        }
    }

    #[test]
    fn prop_statistics_accuracy(ops in prop::collection::vec(cache_op_strategy(), 1..60)) {
        let (mut store, clock) = test_store(
            CacheConfig::builder().max_entries(TEST_MAX_ENTRIES).build(),
        );
        let mut expected_hits: u64 = 0;
        let mut expected_misses: u64 = 0;

        for op in ops {
            match apply(&mut store, &clock, op) {
                Some(true) => expected_hits += 1,
                Some(false) => expected_misses += 1,
                None => {}
            }
        }

        let stats = store.statistics();
        prop_assert_eq!(stats.hits, expected_hits, "Hits mismatch");
        prop_assert_eq!(stats.misses, expected_misses, "Misses mismatch");
        prop_assert_eq!(stats.total_requests, expected_hits + expected_misses);
        prop_assert_eq!(stats.entries, store.len());
    }

    #[test]
    fn prop_roundtrip_storage(
        key in valid_key_strategy(),
        value in valid_value_strategy(),
        compress in any::<bool>(),
    ) {
        let (mut store, _) = test_store(
            CacheConfig::builder().compression_enabled(compress).build(),
        );

        prop_assert!(store.set(key.clone(), value.clone(), None));
        prop_assert_eq!(store.get(&key), Some(value));
    }

    #[test]
    fn prop_overwrite_semantics(
        key in valid_key_strategy(),
        value1 in valid_value_strategy(),
        value2 in valid_value_strategy()
    ) {
        let (mut store, _) = test_store(CacheConfig::default());

        store.set(key.clone(), value1, None);
        store.set(key.clone(), value2.clone(), None);

        prop_assert_eq!(store.get(&key), Some(value2));
        prop_assert_eq!(store.len(), 1);
        store.assert_invariants();
    }

    // With capacity N and N+1 inserts and no reads, the first key goes.
    #[test]
    fn prop_lru_evicts_first_inserted(
        keys in prop::collection::hash_set("[a-z]{1,8}", 2..12),
        new_key in "[0-9]{1,4}",
    ) {
        let keys: Vec<String> = keys.into_iter().collect();
        let capacity = keys.len();
        let (mut store, _) = test_store(CacheConfig::builder().max_entries(capacity).build());

        for key in &keys {
            store.set(key.clone(), format!("value_{}", key), None);
        }
        store.set(new_key.clone(), "new".to_string(), None);

        prop_assert_eq!(store.len(), capacity);
        prop_assert!(!store.contains(&keys[0]), "Oldest key '{}' should be evicted", keys[0]);
        prop_assert!(store.contains(&new_key));
        for key in keys.iter().skip(1) {
            prop_assert!(store.contains(key), "Key '{}' should still exist", key);
        }
        prop_assert_eq!(store.statistics().evictions, 1);
    }

    // A read promotes the key so the next-oldest is evicted instead.
    #[test]
    fn prop_lru_access_tracking(
        keys in prop::collection::hash_set("[a-z]{1,8}", 3..8),
        new_key in "[0-9]{1,4}",
    ) {
        let keys: Vec<String> = keys.into_iter().collect();
        let (mut store, _) = test_store(CacheConfig::builder().max_entries(keys.len()).build());

        for key in &keys {
            store.set(key.clone(), "v".to_string(), None);
        }
        store.get(&keys[0]);
        store.set(new_key, "new".to_string(), None);

        prop_assert!(store.contains(&keys[0]));
        prop_assert!(!store.contains(&keys[1]));
    }

    #[test]
    fn prop_ttl_strategy_resolution(
        prefix in "[a-z]{0,8}",
        suffix in "[a-z]{0,8}",
        ttl_ms in 1u64..1_000_000,
    ) {
        // "#"-delimited patterns never occur in the generated affixes
        let resolver = TtlResolver::new(
            &[
                TtlStrategy::new("#first#", ttl_ms),
                TtlStrategy::new("default", 7),
                TtlStrategy::new("#second#", ttl_ms + 1),
            ],
            300_000,
        );

        prop_assert_eq!(resolver.resolve(&format!("{}#first#{}", prefix, suffix)), ttl_ms);
        prop_assert_eq!(resolver.resolve(&format!("{}#second#{}", prefix, suffix)), ttl_ms + 1);
        prop_assert_eq!(resolver.resolve(&format!("{}{}", prefix, suffix)), 7);
    }

    #[test]
    fn prop_invalidate_removes_exactly_matching(
        keys in prop::collection::hash_set(valid_key_strategy(), 1..20),
        pattern in "[a-e]{1,2}",
    ) {
        let (mut store, _) = test_store(CacheConfig::default());
        for key in &keys {
            store.set(key.clone(), "v".to_string(), None);
        }

        let removed: HashSet<String> = store
            .invalidate(pattern.as_str(), &InvalidateOptions::default())
            .into_iter()
            .collect();

        for key in &keys {
            prop_assert_eq!(removed.contains(key), key.contains(pattern.as_str()));
            prop_assert_eq!(store.contains(key), !key.contains(pattern.as_str()));
        }
    }
}

// Codec round-trip over random byte strings
proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    #[test]
    fn prop_codec_roundtrip(
        input in prop_oneof![
            prop::collection::vec(any::<u8>(), 0..512),
            (prop::collection::vec(any::<u8>(), 0..16), 0usize..64)
                .prop_map(|(chunk, times)| chunk.repeat(times)),
        ]
    ) {
        let codec = DeflateCodec::default();
        let compressed = codec.compress(&input).expect("in-memory deflate cannot fail");
        prop_assert_eq!(codec.decompress(&compressed).unwrap(), input);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    #[test]
    fn prop_ttl_expiration_behavior(
        key in valid_key_strategy(),
        value in valid_value_strategy(),
        ttl_ms in 1u64..1_000,
    ) {
        let (mut store, clock) = test_store(CacheConfig::default());

        store.set(key.clone(), value.clone(), Some(ttl_ms));
        clock.advance(ttl_ms);
        prop_assert_eq!(store.get(&key), Some(value), "Entry should exist until TTL elapses");

        clock.advance(1);
        prop_assert_eq!(store.get(&key), None, "Entry should be gone after TTL");
        prop_assert_eq!(store.statistics().misses, 1);
    }
}
