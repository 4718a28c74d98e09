//! Storage implementations for admission counters.
//!
//! Provides concurrent, sharded storage for fixed-window counters.

use crate::application::ports::CounterStore;
use ahash::RandomState;
use dashmap::DashMap;
use std::hash::Hash;

/// Thread-safe sharded storage backed by DashMap.
///
/// DashMap locks one shard per write, so read-modify-write through the entry
/// API is atomic per key while unrelated keys proceed in parallel. Keys are
/// hashed with `ahash`.
#[derive(Debug)]
pub struct ShardedStorage<K, V>
where
    K: Eq + Hash + Clone,
{
    map: DashMap<K, V, RandomState>,
}

impl<K, V> ShardedStorage<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Create a new sharded storage instance.
    pub fn new() -> Self {
        Self {
            map: DashMap::with_hasher(RandomState::new()),
        }
    }

    /// Create a storage instance sized for `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            map: DashMap::with_capacity_and_hasher(capacity, RandomState::new()),
        }
    }

    /// Get a reference to a value.
    pub fn get<Q>(&self, key: &Q) -> Option<dashmap::mapref::one::Ref<'_, K, V>>
    where
        K: std::borrow::Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.map.get(key)
    }

    /// Check if a key exists.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: std::borrow::Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.map.contains_key(key)
    }
}

impl<K, V> Default for ShardedStorage<K, V>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

// Implement the CounterStore port
impl<K, V> CounterStore<K, V> for ShardedStorage<K, V>
where
    K: Hash + Eq + Clone + Send + Sync + std::fmt::Debug,
    V: Send + Sync + std::fmt::Debug,
{
    fn with_entry_mut<F, R>(&self, key: K, factory: impl FnOnce() -> V, accessor: F) -> R
    where
        F: FnOnce(&mut V) -> R,
    {
        // The shard write lock is held until `value_ref` drops
        let mut value_ref = self.map.entry(key).or_insert_with(factory);
        accessor(&mut value_ref)
    }

    fn len(&self) -> usize {
        self.map.len()
    }

    fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    fn clear(&self) {
        self.map.clear()
    }

    fn retain<F>(&self, f: F)
    where
        F: FnMut(&K, &mut V) -> bool,
    {
        // DashMap::retain walks shard by shard
        self.map.retain(f);
    }
}

// Implement CounterStore for Arc<ShardedStorage> to allow it to be shared directly
impl<K, V> CounterStore<K, V> for std::sync::Arc<ShardedStorage<K, V>>
where
    K: Hash + Eq + Clone + Send + Sync + std::fmt::Debug,
    V: Send + Sync + std::fmt::Debug,
{
    fn with_entry_mut<F, R>(&self, key: K, factory: impl FnOnce() -> V, accessor: F) -> R
    where
        F: FnOnce(&mut V) -> R,
    {
        (**self).with_entry_mut(key, factory, accessor)
    }

    fn len(&self) -> usize {
        (**self).len()
    }

    fn is_empty(&self) -> bool {
        (**self).is_empty()
    }

    fn clear(&self) {
        (**self).clear()
    }

    fn retain<F>(&self, f: F)
    where
        F: FnMut(&K, &mut V) -> bool,
    {
        (**self).retain(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_with_entry_mut_creates_once() {
        let storage: ShardedStorage<String, u64> = ShardedStorage::new();

        let first = storage.with_entry_mut("a".to_string(), || 10, |v| *v);
        let second = storage.with_entry_mut(
            "a".to_string(),
            || panic!("factory must not run for existing key"),
            |v| {
                *v += 1;
                *v
            },
        );

        assert_eq!(first, 10);
        assert_eq!(second, 11);
        assert_eq!(CounterStore::len(&storage), 1);
        assert!(storage.contains_key("a"));
        assert_eq!(*storage.get("a").unwrap(), 11);
    }

    #[test]
    fn test_retain_and_clear() {
        let storage: ShardedStorage<u32, u32> = ShardedStorage::with_capacity(16);
        for i in 0..10 {
            storage.with_entry_mut(i, || i, |_| ());
        }

        storage.retain(|_, v| *v % 2 == 0);
        assert_eq!(CounterStore::len(&storage), 5);
        assert!(!storage.contains_key(&3));

        CounterStore::clear(&storage);
        assert!(CounterStore::is_empty(&storage));
    }

    #[test]
    fn test_concurrent_increments_are_not_lost() {
        let storage: Arc<ShardedStorage<&'static str, u64>> = Arc::new(ShardedStorage::new());
        let mut handles = vec![];

        for _ in 0..8 {
            let storage_clone = Arc::clone(&storage);
            handles.push(thread::spawn(move || {
                for _ in 0..1000 {
                    storage_clone.with_entry_mut("shared", || 0, |v| *v += 1);
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(*storage.get("shared").unwrap(), 8000);
    }
}
