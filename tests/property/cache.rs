//! Property tests for the keyed cache.
//!
//! Invariants tested:
//! - Each distinct key is produced exactly once
//! - Every caller sees the first committed result
//! - delete_keys removes exactly the present keys

use proptest::prelude::*;
use scoped_fixtures_cache::KeyedCache;
use scoped_fixtures_core::CacheKey;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

proptest! {
    #[test]
    fn produces_each_key_once(keys in prop::collection::vec(0u8..32, 1..200)) {
        let cache: KeyedCache<CacheKey, usize> = KeyedCache::new();
        let calls = AtomicUsize::new(0);
        let mut first_seen = HashMap::new();

        for k in &keys {
            let value = cache
                .fetch_or_populate(&CacheKey::from(k.to_string()), || {
                    Ok(calls.fetch_add(1, Ordering::SeqCst))
                })
                .unwrap();
            let expected = *first_seen.entry(*k).or_insert(value);
            prop_assert_eq!(value, expected);
        }

        let distinct: HashSet<_> = keys.iter().collect();
        prop_assert_eq!(calls.load(Ordering::SeqCst), distinct.len());
        prop_assert_eq!(cache.len(), distinct.len());
    }

    #[test]
    fn concurrent_producers_run_once_per_key(keys in prop::collection::vec(0u8..8, 1..64)) {
        let cache: KeyedCache<CacheKey, u8> = KeyedCache::new();
        let calls = AtomicUsize::new(0);

        thread::scope(|s| {
            for chunk in keys.chunks(8) {
                let (cache, calls) = (&cache, &calls);
                s.spawn(move || {
                    for k in chunk {
                        let value = cache
                            .fetch_or_populate(&CacheKey::from(vec![*k]), || {
                                calls.fetch_add(1, Ordering::SeqCst);
                                Ok(*k)
                            })
                            .unwrap();
                        assert_eq!(value, *k);
                    }
                });
            }
        });

        let distinct: HashSet<_> = keys.iter().collect();
        prop_assert_eq!(calls.load(Ordering::SeqCst), distinct.len());
    }

    #[test]
    fn delete_counts_present_keys(
        present in prop::collection::hash_set(0u16..100, 0..50),
        deleted in prop::collection::vec(0u16..100, 0..50),
    ) {
        let cache: KeyedCache<CacheKey, ()> = KeyedCache::new();
        for k in &present {
            cache.fetch_or_populate(&CacheKey::from(k.to_string()), || Ok(())).unwrap();
        }

        let keys: Vec<CacheKey> = deleted.iter().map(|k| CacheKey::from(k.to_string())).collect();
        let removed = cache.delete_keys(&keys);

        let hit: HashSet<_> = deleted.iter().filter(|k| present.contains(*k)).collect();
        prop_assert_eq!(removed, hit.len());
        prop_assert_eq!(cache.len(), present.len() - hit.len());
    }
}
