// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::{
    collections::{HashMap, hash_map::RandomState},
    hash::{BuildHasher, Hash},
    sync::{Mutex, MutexGuard, PoisonError},
};

/// The number of shards used for per-case state.
pub(crate) const DEFAULT_SHARD_COUNT: usize = 16;

/// A map split into independently locked shards.
///
/// Events for different keys usually land in different shards, so parallel workers reporting on
/// different cases don't contend on a single lock. All operations on a single key are serialized
/// by its shard.
#[derive(Debug)]
pub(crate) struct ShardedMap<K, V> {
    shards: Box<[Mutex<HashMap<K, V>>]>,
    hasher: RandomState,
}

impl<K: Hash + Eq, V> ShardedMap<K, V> {
    pub(crate) fn new(shard_count: usize) -> Self {
        let shard_count = shard_count.max(1);
        Self {
            shards: (0..shard_count).map(|_| Mutex::default()).collect(),
            hasher: RandomState::new(),
        }
    }

    /// Locks the shard owning `key` and runs `f` on it.
    pub(crate) fn with_shard<R>(&self, key: &K, f: impl FnOnce(&mut HashMap<K, V>) -> R) -> R {
        let idx = (self.hasher.hash_one(key) as usize) % self.shards.len();
        let mut shard = lock(&self.shards[idx]);
        f(&mut shard)
    }

    /// Runs `f` on the value for `key`, if present.
    pub(crate) fn with_value<R>(&self, key: &K, f: impl FnOnce(Option<&mut V>) -> R) -> R {
        self.with_shard(key, |shard| f(shard.get_mut(key)))
    }

    /// Visits every entry, one shard at a time.
    pub(crate) fn for_each(&self, mut f: impl FnMut(&K, &V)) {
        for shard in self.shards.iter() {
            let shard = lock(shard);
            for (key, value) in shard.iter() {
                f(key, value);
            }
        }
    }
}

impl<K: Hash + Eq, V> Default for ShardedMap<K, V> {
    fn default() -> Self {
        Self::new(DEFAULT_SHARD_COUNT)
    }
}

/// Locks a mutex, recovering the data if a previous holder panicked.
///
/// Every critical section in this crate leaves its data consistent before anything that can
/// panic, so a poisoned lock carries no torn state.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{sync::Arc, thread};

    #[test]
    fn shards_are_independent_per_key() {
        let map: ShardedMap<String, u32> = ShardedMap::new(4);
        for key in ["a", "b", "c", "d", "e"] {
            map.with_shard(&key.to_owned(), |shard| {
                *shard.entry(key.to_owned()).or_default() += 1;
            });
        }
        map.with_value(&"c".to_owned(), |value| {
            *value.expect("c is present") += 10;
        });

        let mut seen = Vec::new();
        map.for_each(|key, value| seen.push((key.clone(), *value)));
        seen.sort();
        assert_eq!(
            seen,
            vec![
                ("a".to_owned(), 1),
                ("b".to_owned(), 1),
                ("c".to_owned(), 11),
                ("d".to_owned(), 1),
                ("e".to_owned(), 1),
            ]
        );
    }

    #[test]
    fn concurrent_updates() {
        let map: Arc<ShardedMap<usize, usize>> = Arc::new(ShardedMap::default());
        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let map = Arc::clone(&map);
                thread::spawn(move || {
                    for _ in 0..100 {
                        map.with_shard(&worker, |shard| *shard.entry(worker).or_default() += 1);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("worker thread succeeded");
        }

        let mut total = 0;
        map.for_each(|_, count| total += count);
        assert_eq!(total, 800);
    }
}
