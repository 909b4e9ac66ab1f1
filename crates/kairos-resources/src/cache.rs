// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! A bounded cache with least-recently-accessed eviction.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

/// Cumulative cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// `get` calls that found the key.
    pub hits: u64,
    /// `get` calls that missed.
    pub misses: u64,
    /// Entries evicted to make room at capacity.
    pub evictions: u64,
}

struct Entry<V> {
    value: V,
    /// Monotonic access stamp; the smallest stamp is the eviction victim.
    stamp: u64,
    /// Wall-clock touch time, used only by the idle sweep.
    touched: Instant,
}

/// A size-bounded map that evicts the least-recently-accessed entry.
///
/// Recency is tracked with a monotonic stamp rather than wall-clock time, so
/// eviction order is deterministic even when accesses land within the same
/// clock tick. Eviction scans all entries; at the configured cache sizes the
/// O(n) scan is not a concern.
pub struct LruCache<K, V> {
    map: HashMap<K, Entry<V>>,
    max_size: usize,
    next_stamp: u64,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl<K: Eq + Hash + Clone, V> LruCache<K, V> {
    /// Creates a cache holding at most `max_size` entries.
    ///
    /// A zero `max_size` is bumped to one so insertion always succeeds.
    pub fn new(max_size: usize) -> Self {
        Self {
            map: HashMap::new(),
            max_size: max_size.max(1),
            next_stamp: 0,
            hits: 0,
            misses: 0,
            evictions: 0,
        }
    }

    /// Looks up `key`, refreshing its recency on a hit.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        let stamp = self.bump_stamp();
        match self.map.get_mut(key) {
            Some(entry) => {
                entry.stamp = stamp;
                entry.touched = Instant::now();
                self.hits += 1;
                Some(&entry.value)
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Inserts or replaces `key`.
    ///
    /// Inserting a new key at capacity evicts the least-recently-accessed
    /// entry first, so the size bound always holds.
    pub fn insert(&mut self, key: K, value: V) {
        let stamp = self.bump_stamp();
        if !self.map.contains_key(&key) && self.map.len() >= self.max_size {
            self.evict_one();
        }
        self.map.insert(
            key,
            Entry {
                value,
                stamp,
                touched: Instant::now(),
            },
        );
    }

    /// Whether `key` is present. Does not refresh recency or count as a hit.
    pub fn contains(&self, key: &K) -> bool {
        self.map.contains_key(key)
    }

    /// Removes `key`, returning its value.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.map.remove(key).map(|entry| entry.value)
    }

    /// Drops every entry.
    ///
    /// ## Returns
    /// The number of entries removed.
    pub fn clear(&mut self) -> usize {
        let removed = self.map.len();
        self.map.clear();
        removed
    }

    /// Removes entries untouched for longer than `max_age` as of `now`.
    ///
    /// ## Returns
    /// The number of entries removed.
    pub fn sweep_idle(&mut self, now: Instant, max_age: Duration) -> usize {
        let before = self.map.len();
        self.map
            .retain(|_, entry| now.saturating_duration_since(entry.touched) <= max_age);
        before - self.map.len()
    }

    /// The number of entries currently cached.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// The configured size bound.
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Cumulative hit/miss/eviction counters.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            evictions: self.evictions,
        }
    }

    fn bump_stamp(&mut self) -> u64 {
        let stamp = self.next_stamp;
        self.next_stamp += 1;
        stamp
    }

    fn evict_one(&mut self) {
        let victim = self
            .map
            .iter()
            .min_by_key(|(_, entry)| entry.stamp)
            .map(|(key, _)| key.clone());
        if let Some(key) = victim {
            self.map.remove(&key);
            self.evictions += 1;
            log::trace!("Cache evicted least-recently-accessed entry.");
        }
    }
}

impl<K, V> std::fmt::Debug for LruCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LruCache")
            .field("len", &self.map.len())
            .field("max_size", &self.max_size)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_hits_and_misses_are_counted() {
        let mut cache = LruCache::new(4);
        cache.insert("a", 1);

        assert_eq!(cache.get(&"a"), Some(&1));
        assert_eq!(cache.get(&"b"), None);

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn insert_at_capacity_evicts_least_recently_accessed() {
        let mut cache = LruCache::new(2);
        cache.insert("a", 1);
        cache.insert("b", 2);

        // Touch "a" so "b" becomes the eviction victim.
        cache.get(&"a");
        cache.insert("c", 3);

        assert!(cache.contains(&"a"));
        assert!(!cache.contains(&"b"));
        assert!(cache.contains(&"c"));
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn replacing_an_existing_key_does_not_evict() {
        let mut cache = LruCache::new(2);
        cache.insert("a", 1);
        cache.insert("b", 2);
        cache.insert("a", 10);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.stats().evictions, 0);
        assert_eq!(cache.get(&"a"), Some(&10));
    }

    #[test]
    fn contains_does_not_refresh_recency() {
        let mut cache = LruCache::new(2);
        cache.insert("a", 1);
        cache.insert("b", 2);

        // A `contains` probe must not rescue "a" from eviction.
        assert!(cache.contains(&"a"));
        cache.insert("c", 3);

        assert!(!cache.contains(&"a"));
        assert_eq!(cache.stats().hits, 0);
        assert_eq!(cache.stats().misses, 0);
    }

    #[test]
    fn remove_and_clear() {
        let mut cache = LruCache::new(4);
        cache.insert("a", 1);
        cache.insert("b", 2);

        assert_eq!(cache.remove(&"a"), Some(1));
        assert_eq!(cache.remove(&"a"), None);
        assert_eq!(cache.clear(), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn sweep_idle_removes_untouched_entries() {
        let mut cache = LruCache::new(4);
        let max_age = Duration::from_millis(100);

        cache.insert("a", 1);
        cache.insert("b", 2);

        // Sweeping as of a future instant makes both entries idle.
        let horizon = Instant::now() + Duration::from_millis(150);
        assert_eq!(cache.sweep_idle(horizon, max_age), 2);
        assert!(cache.is_empty());

        cache.insert("kept", 3);
        assert_eq!(cache.sweep_idle(Instant::now(), max_age), 0);
        assert!(cache.contains(&"kept"));
    }

    #[test]
    fn zero_capacity_is_bumped_to_one() {
        let mut cache = LruCache::new(0);
        cache.insert("a", 1);
        assert_eq!(cache.len(), 1);

        cache.insert("b", 2);
        assert_eq!(cache.len(), 1, "still bounded");
        assert!(cache.contains(&"b"));
    }
}
