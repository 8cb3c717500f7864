//! Bounded cache for memory-efficient result memoization
//!
//! Provides a fixed-capacity keyed store that automatically evicts the oldest
//! entry when capacity is reached (FIFO eviction by insertion order).

use ahash::RandomState;
use hashlink::LinkedHashMap;
use std::borrow::Borrow;
use std::hash::Hash;

/// A bounded keyed cache with FIFO eviction policy
///
/// Reads never refresh an entry's position: the entry inserted first is the
/// first evicted, regardless of how often it was hit. Values are expected to
/// be cheap to clone (shared futures, `Arc`s).
#[derive(Debug)]
pub struct BoundedCache<K, V> {
    cap: usize,
    entries: LinkedHashMap<K, V, RandomState>,
}

impl<K, V> BoundedCache<K, V>
where
    K: Hash + Eq,
{
    /// Create a new bounded cache with the specified capacity
    ///
    /// # Arguments
    /// * `cap` - Maximum number of entries to store. If 0, nothing is ever stored.
    pub fn new(cap: usize) -> Self {
        Self {
            cap,
            entries: LinkedHashMap::with_hasher(RandomState::new()),
        }
    }

    /// Return the cached value for `key`, creating it with `factory` on a miss
    ///
    /// On a hit the factory is not invoked. On a miss the factory runs exactly
    /// once, and the oldest entry is evicted first if the cache is full.
    pub fn get_or_create<F>(&mut self, key: K, factory: F) -> V
    where
        V: Clone,
        F: FnOnce() -> V,
    {
        if let Some(value) = self.entries.get(&key) {
            return value.clone();
        }

        let value = factory();
        if self.cap == 0 {
            return value;
        }

        if self.entries.len() >= self.cap {
            self.entries.pop_front(); // FIFO eviction
        }
        self.entries.insert(key, value.clone());
        value
    }

    /// Get a cached value without creating it
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.get(key)
    }

    /// Check whether a key is cached
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.contains_key(key)
    }

    /// Get an iterator over the keys (oldest to newest)
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.keys()
    }

    /// Get the number of entries currently stored
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Clear all entries
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<K, V> Default for BoundedCache<K, V>
where
    K: Hash + Eq,
{
    fn default() -> Self {
        Self::new(crate::constants::MAX_CACHE_SIZE)
    }
}
