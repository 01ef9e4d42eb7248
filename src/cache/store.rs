//! Cache Store Module
//!
//! TTL-LRU cache engine combining HashMap storage with recency tracking and
//! absolute expiry.

use std::collections::HashMap;
use std::time::Duration;

use tracing::debug;

use crate::cache::entry::current_timestamp_ms;
use crate::cache::{CacheEntry, CacheStats, RecencyIndex};

// == Cache Store ==
/// In-memory cache bounded by entry age and, optionally, by entry count.
///
/// The store is a plain data structure: it never schedules anything itself.
/// Time-dependent operations have an `_at` form taking Unix milliseconds, and
/// the periodic sweep is driven from outside through [`CacheStore::tick`].
#[derive(Debug)]
pub struct CacheStore<V> {
    /// Key-value storage
    entries: HashMap<String, CacheEntry<V>>,
    /// LRU order over `entries`
    recency: RecencyIndex,
    /// Usage statistics
    stats: CacheStats,
    /// Capacity bound, `None` = unbounded
    max_entries: Option<usize>,
    /// Entry lifetime in milliseconds
    ttl_ms: u64,
}

impl<V: Clone> CacheStore<V> {
    // == Constructor ==
    /// Creates a new store.
    ///
    /// # Arguments
    /// * `ttl` - Lifetime of every entry, counted from its last `set`
    /// * `max_entries` - Optional capacity; `Some(0)` is treated as unbounded
    pub fn new(ttl: Duration, max_entries: Option<usize>) -> Self {
        Self {
            entries: HashMap::new(),
            recency: RecencyIndex::new(),
            stats: CacheStats::new(),
            max_entries: max_entries.filter(|&n| n > 0),
            ttl_ms: ttl.as_millis() as u64,
        }
    }

    // == Set ==
    /// Stores a value under `key`, stamping it with the current time.
    pub fn set(&mut self, key: impl Into<String>, value: V) {
        self.set_at(key, value, current_timestamp_ms());
    }

    /// Stores a value under `key` as of `now`.
    ///
    /// Overwrites any existing entry, resets its expiry to `now + ttl` and
    /// makes it the most recently used key. If the store then exceeds its
    /// capacity, least recently used entries are evicted until it fits.
    pub fn set_at(&mut self, key: impl Into<String>, value: V, now: u64) {
        let key = key.into();
        self.recency.touch(&key);
        self.entries
            .insert(key, CacheEntry::new(value, now, self.ttl_ms));
        self.enforce_capacity();
        self.stats.set_size(self.entries.len());
    }

    // == Get ==
    /// Retrieves a live value by key using the current time.
    pub fn get(&mut self, key: &str) -> Option<V> {
        self.get_at(key, current_timestamp_ms())
    }

    /// Retrieves a value by key as of `now`.
    ///
    /// A live entry counts as a hit and is promoted to most recently used.
    /// An expired entry is removed and counts as a miss, exactly like an
    /// absent one.
    pub fn get_at(&mut self, key: &str, now: u64) -> Option<V> {
        match self.entries.get(key).map(|entry| entry.is_expired_at(now)) {
            None => {
                self.stats.record_miss();
                None
            }
            Some(true) => {
                self.entries.remove(key);
                self.recency.remove(key);
                self.stats.record_miss();
                self.stats.record_expirations(1);
                self.stats.set_size(self.entries.len());
                None
            }
            Some(false) => {
                let value = self.entries.get(key).map(|entry| entry.value.clone());
                self.stats.record_hit();
                self.recency.touch(key);
                value
            }
        }
    }

    // == Remove ==
    /// Drops a single key. Returns whether an entry was present.
    pub fn remove(&mut self, key: &str) -> bool {
        let removed = self.entries.remove(key).is_some();
        if removed {
            self.recency.remove(key);
            self.stats.set_size(self.entries.len());
        }
        removed
    }

    // == Clear ==
    /// Empties the store and records the clear time.
    ///
    /// Returns the clear timestamp.
    pub fn clear(&mut self) -> u64 {
        let now = current_timestamp_ms();
        self.clear_at(now);
        now
    }

    /// Empties the store as of `now`. Hit and miss counters are kept.
    pub fn clear_at(&mut self, now: u64) {
        self.entries.clear();
        self.recency.clear();
        self.stats.record_clear(now);
    }

    // == Tick ==
    /// Sweeps out every entry expired at `now`.
    ///
    /// This is the periodic prune: it runs independently of reads so entries
    /// that are never requested again do not linger. Returns the number of
    /// entries removed.
    pub fn tick(&mut self, now: u64) -> usize {
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            self.entries.remove(key);
            self.recency.remove(key);
        }

        self.stats.record_expirations(expired.len());
        self.stats.set_size(self.entries.len());
        expired.len()
    }

    // == Stats ==
    /// Returns an owned snapshot of the statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_size(self.entries.len());
        stats
    }

    /// Returns the current number of entries, expired or not.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_entries(&self) -> Option<usize> {
        self.max_entries
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }

    fn enforce_capacity(&mut self) {
        let Some(max) = self.max_entries else {
            return;
        };

        while self.entries.len() > max {
            let Some(evicted) = self.recency.pop_lru() else {
                break;
            };
            self.entries.remove(&evicted);
            self.stats.record_eviction();
            debug!(key = %evicted, "Evicted least recently used entry");
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(60);

    fn store(max_entries: Option<usize>) -> CacheStore<u32> {
        CacheStore::new(TTL, max_entries)
    }

    #[test]
    fn test_store_new() {
        let store = store(Some(10));
        assert!(store.is_empty());
        assert_eq!(store.max_entries(), Some(10));
        assert_eq!(store.ttl(), TTL);
    }

    #[test]
    fn test_zero_capacity_is_unbounded() {
        let mut store = store(Some(0));
        assert_eq!(store.max_entries(), None);

        for i in 0..50 {
            store.set_at(format!("k{i}"), i, 0);
        }
        assert_eq!(store.len(), 50);
    }

    #[test]
    fn test_set_and_get() {
        let mut store = store(None);

        store.set_at("a", 1, 0);
        assert_eq!(store.get_at("a", 10), Some(1));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_get_nonexistent_counts_miss() {
        let mut store = store(None);

        assert_eq!(store.get_at("nope", 0), None);
        let stats = store.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 0);
    }

    #[test]
    fn test_overwrite_resets_expiry() {
        let mut store = store(None);

        store.set_at("a", 1, 0);
        store.set_at("a", 2, 50_000);

        // Past the first expiry but within the second
        assert_eq!(store.get_at("a", 70_000), Some(2));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_expired_entry_is_a_miss() {
        let mut store = store(None);

        store.set_at("a", 1, 0);
        assert_eq!(store.get_at("a", 60_000), None);

        let stats = store.stats();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.expirations, 1);
        assert_eq!(stats.size, 0);
    }

    #[test]
    fn test_capacity_eviction_scenario() {
        let mut store = store(Some(2));

        store.set_at("a", 1, 0);
        store.set_at("b", 2, 0);
        store.set_at("c", 3, 0);

        assert_eq!(store.get_at("a", 1), None);
        assert_eq!(store.get_at("b", 1), Some(2));
        assert_eq!(store.get_at("c", 1), Some(3));
        assert_eq!(store.stats().evictions, 1);
    }

    #[test]
    fn test_get_protects_from_eviction() {
        let mut store = store(Some(3));

        store.set_at("k1", 1, 0);
        store.set_at("k2", 2, 0);
        store.set_at("k3", 3, 0);

        store.get_at("k1", 1);
        store.set_at("k4", 4, 2);

        assert_eq!(store.get_at("k1", 3), Some(1));
        assert_eq!(store.get_at("k2", 3), None);
    }

    #[test]
    fn test_overwrite_does_not_evict() {
        let mut store = store(Some(2));

        store.set_at("a", 1, 0);
        store.set_at("b", 2, 0);
        store.set_at("a", 10, 1);

        assert_eq!(store.len(), 2);
        assert_eq!(store.stats().evictions, 0);
    }

    #[test]
    fn test_remove() {
        let mut store = store(None);

        store.set_at("a", 1, 0);
        assert!(store.remove("a"));
        assert!(!store.remove("a"));
        assert_eq!(store.get_at("a", 1), None);
    }

    #[test]
    fn test_clear_keeps_counters() {
        let mut store = store(None);

        store.set_at("a", 1, 0);
        store.get_at("a", 1);
        store.get_at("b", 1);
        store.clear_at(5);

        assert_eq!(store.get_at("a", 6), None);

        let stats = store.stats();
        assert_eq!(stats.size, 0);
        assert_eq!(stats.last_cleared_at, Some(5));
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 2);
    }

    #[test]
    fn test_tick_removes_only_expired() {
        let mut store = CacheStore::new(Duration::from_secs(1), None);

        store.set_at("old", 1, 0);
        store.set_at("fresh", 2, 800);

        assert_eq!(store.tick(1_000), 1);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get_at("fresh", 1_000), Some(2));

        // Sweeping does not touch hit/miss counters
        let stats = store.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.expirations, 1);
    }

    #[test]
    fn test_tick_releases_capacity() {
        let mut store = CacheStore::new(Duration::from_secs(1), Some(2));

        store.set_at("a", 1, 0);
        store.set_at("b", 2, 500);
        store.tick(1_000);
        store.set_at("c", 3, 1_000);

        assert_eq!(store.stats().evictions, 0);
        assert_eq!(store.get_at("b", 1_001), Some(2));
    }

    #[test]
    fn test_wall_clock_roundtrip() {
        let mut store: CacheStore<String> = CacheStore::new(TTL, Some(4));
        store.set("user-1", "alice".to_string());
        assert_eq!(store.get("user-1"), Some("alice".to_string()));
        assert!(store.clear() > 0);
        assert_eq!(store.get("user-1"), None);
    }
}
