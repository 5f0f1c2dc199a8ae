//! Cache Store Module
//!
//! Main cache engine combining a HashMap index with an arena-backed recency
//! list and lazy TTL expiration.

use std::collections::HashMap;
use std::time::Duration;

use bytes::Bytes;
use tokio::time::Instant;

use crate::cache::{CacheEntry, CacheStats, RecencyList, SlotId};

// == Cache Store ==
/// Capacity-bounded LRU store. Not synchronized, see [`SharedCache`].
///
/// [`SharedCache`]: crate::cache::SharedCache
#[derive(Debug)]
pub struct CacheStore {
    /// Key to arena slot
    index: HashMap<String, SlotId>,
    /// Entries ordered most to least recently used
    entries: RecencyList<CacheEntry>,
    /// Performance statistics
    stats: CacheStats,
    /// Maximum number of entries allowed
    capacity: usize,
    /// TTL for puts without an explicit override
    default_ttl: Option<Duration>,
}

impl CacheStore {
    // == Constructor ==
    /// Creates a new CacheStore. A capacity of zero is raised to one.
    pub fn new(capacity: usize, default_ttl: Option<Duration>) -> Self {
        let capacity = capacity.max(1);
        Self {
            index: HashMap::with_capacity(capacity),
            entries: RecencyList::with_capacity(capacity),
            stats: CacheStats::new(capacity),
            capacity,
            default_ttl,
        }
    }

    // == Get ==
    /// Retrieves a cached body and marks it most recently used.
    ///
    /// Expired entries are removed, counted as an eviction, and the lookup
    /// counts as a miss.
    pub fn get(&mut self, key: &str) -> Option<Bytes> {
        self.get_at(key, Instant::now())
    }

    pub fn get_at(&mut self, key: &str, now: Instant) -> Option<Bytes> {
        let Some(&slot) = self.index.get(key) else {
            self.stats.record_miss();
            return None;
        };

        let expired = self
            .entries
            .get(slot)
            .map_or(true, |entry| entry.is_expired(now));
        if expired {
            self.index.remove(key);
            self.entries.remove(slot);
            self.stats.record_expiration();
            self.stats.record_miss();
            return None;
        }

        self.entries.move_to_front(slot);
        self.stats.record_hit();
        self.entries.get(slot).map(|entry| entry.value.clone())
    }

    // == Put ==
    /// Stores a body under `key` as most recently used.
    ///
    /// Replacing an existing key never evicts. Inserting a new key at
    /// capacity evicts the least recently used entry first, and the evicted
    /// key is returned.
    pub fn put(&mut self, key: String, value: Bytes, ttl: Option<Duration>) -> Option<String> {
        self.put_at(key, value, ttl, Instant::now())
    }

    pub fn put_at(
        &mut self,
        key: String,
        value: Bytes,
        ttl: Option<Duration>,
        now: Instant,
    ) -> Option<String> {
        let ttl = ttl.or(self.default_ttl);

        if let Some(&slot) = self.index.get(&key) {
            if let Some(entry) = self.entries.get_mut(slot) {
                entry.refresh(value, ttl, now);
            }
            self.entries.move_to_front(slot);
            return None;
        }

        let evicted = if self.entries.len() >= self.capacity {
            self.evict_oldest()
        } else {
            None
        };

        let entry = CacheEntry::new(key.clone(), value, ttl, now);
        let slot = self.entries.push_front(entry);
        self.index.insert(key, slot);
        evicted
    }

    fn evict_oldest(&mut self) -> Option<String> {
        let entry = self.entries.pop_back()?;
        self.index.remove(&entry.key);
        self.stats.record_eviction();
        Some(entry.key)
    }

    // == Remove ==
    /// Drops an entry without touching statistics.
    pub fn remove(&mut self, key: &str) -> bool {
        match self.index.remove(key) {
            Some(slot) => self.entries.remove(slot).is_some(),
            None => false,
        }
    }

    /// Checks presence without affecting recency or statistics.
    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.size = self.entries.len();
        stats
    }

    /// Zeroes hit, miss and eviction counters. Stored entries are kept.
    pub fn reset_stats(&mut self) {
        self.stats.reset();
    }

    // == Cleanup Expired ==
    /// Removes all expired entries from the cache.
    ///
    /// Returns the number of entries removed.
    pub fn cleanup_expired(&mut self) -> usize {
        self.cleanup_expired_at(Instant::now())
    }

    pub fn cleanup_expired_at(&mut self, now: Instant) -> usize {
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|entry| entry.is_expired(now))
            .map(|entry| entry.key.clone())
            .collect();

        for key in &expired {
            if let Some(slot) = self.index.remove(key) {
                self.entries.remove(slot);
                self.stats.record_expiration();
            }
        }
        expired.len()
    }

    // == Default TTL ==
    pub fn set_default_ttl(&mut self, ttl: Option<Duration>) {
        self.default_ttl = ttl;
    }

    pub fn default_ttl(&self) -> Option<Duration> {
        self.default_ttl
    }

    /// Keys from most to least recently used.
    pub fn keys(&self) -> Vec<String> {
        self.entries.iter().map(|entry| entry.key.clone()).collect()
    }

    // == Length ==
    /// Returns the current number of entries in the cache.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    fn body(s: &'static str) -> Bytes {
        Bytes::from_static(s.as_bytes())
    }

    #[test]
    fn test_store_new() {
        let store = CacheStore::new(100, None);
        assert_eq!(store.len(), 0);
        assert!(store.is_empty());
        assert_eq!(store.capacity(), 100);
    }

    #[test]
    fn test_zero_capacity_is_raised() {
        let store = CacheStore::new(0, None);
        assert_eq!(store.capacity(), 1);
    }

    #[test]
    fn test_store_put_and_get() {
        let mut store = CacheStore::new(100, None);

        store.put("a".to_string(), body("value1"), None);
        assert_eq!(store.get("a"), Some(body("value1")));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_get_nonexistent() {
        let mut store = CacheStore::new(100, None);
        assert_eq!(store.get("nonexistent"), None);
        assert_eq!(store.stats().misses, 1);
    }

    #[test]
    fn test_lru_order_with_promotion() {
        let mut store = CacheStore::new(2, None);

        store.put("A".to_string(), body("a"), None);
        store.put("B".to_string(), body("b"), None);
        store.get("A");
        let evicted = store.put("C".to_string(), body("c"), None);

        assert_eq!(evicted.as_deref(), Some("B"));
        assert!(store.contains("A"));
        assert!(store.contains("C"));
        assert!(!store.contains("B"));
        assert_eq!(store.stats().evictions, 1);
    }

    #[test]
    fn test_reinsert_does_not_evict() {
        let mut store = CacheStore::new(2, None);

        store.put("k".to_string(), body("v1"), None);
        store.put("other".to_string(), body("x"), None);
        let evicted = store.put("k".to_string(), body("v2"), None);

        assert!(evicted.is_none());
        assert_eq!(store.len(), 2);
        assert_eq!(store.stats().evictions, 0);
        assert_eq!(store.get("k"), Some(body("v2")));
    }

    #[test]
    fn test_reinsert_promotes_key() {
        let mut store = CacheStore::new(2, None);

        store.put("A".to_string(), body("a"), None);
        store.put("B".to_string(), body("b"), None);
        store.put("A".to_string(), body("a2"), None);
        store.put("C".to_string(), body("c"), None);

        assert_eq!(store.keys(), vec!["C".to_string(), "A".to_string()]);
    }

    #[test]
    fn test_eviction_is_insertion_ordered() {
        let now = Instant::now();
        let mut store = CacheStore::new(3, None);

        // Identical timestamps, list order decides
        store.put_at("1".to_string(), body("1"), None, now);
        store.put_at("2".to_string(), body("2"), None, now);
        store.put_at("3".to_string(), body("3"), None, now);

        assert_eq!(
            store.put_at("4".to_string(), body("4"), None, now).as_deref(),
            Some("1")
        );
        assert_eq!(
            store.put_at("5".to_string(), body("5"), None, now).as_deref(),
            Some("2")
        );
    }

    #[test]
    fn test_ttl_expiration_on_get() {
        let now = Instant::now();
        let mut store = CacheStore::new(10, None);

        store.put_at("k".to_string(), body("v"), Some(Duration::from_secs(5)), now);
        assert!(store.get_at("k", now + Duration::from_secs(5)).is_some());
        assert!(store.get_at("k", now + Duration::from_secs(6)).is_none());

        let stats = store.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.evictions, 1);
        assert_eq!(stats.expirations, 1);
        assert_eq!(stats.size, 0);
    }

    #[test]
    fn test_default_ttl_applies_without_override() {
        let now = Instant::now();
        let mut store = CacheStore::new(10, Some(Duration::from_secs(1)));

        store.put_at("short".to_string(), body("v"), None, now);
        store.put_at("long".to_string(), body("v"), Some(Duration::from_secs(60)), now);

        let later = now + Duration::from_secs(2);
        assert!(store.get_at("short", later).is_none());
        assert!(store.get_at("long", later).is_some());
    }

    #[test]
    fn test_expired_unread_entries_hold_capacity() {
        let now = Instant::now();
        let mut store = CacheStore::new(2, Some(Duration::from_secs(1)));

        store.put_at("a".to_string(), body("a"), None, now);
        store.put_at("b".to_string(), body("b"), None, now);

        // Both expired but never read, inserting still evicts by recency
        let later = now + Duration::from_secs(5);
        let evicted = store.put_at("c".to_string(), body("c"), None, later);

        assert_eq!(evicted.as_deref(), Some("a"));
        assert_eq!(store.len(), 2);
        assert_eq!(store.stats().expirations, 0);
    }

    #[test]
    fn test_cleanup_expired() {
        let now = Instant::now();
        let mut store = CacheStore::new(100, None);

        store.put_at("k1".to_string(), body("v1"), Some(Duration::from_secs(1)), now);
        store.put_at("k2".to_string(), body("v2"), Some(Duration::from_secs(10)), now);

        let removed = store.cleanup_expired_at(now + Duration::from_secs(2));
        assert_eq!(removed, 1);
        assert_eq!(store.len(), 1);
        assert!(store.contains("k2"));
        assert_eq!(store.stats().evictions, 1);
    }

    #[test]
    fn test_store_stats_and_reset() {
        let mut store = CacheStore::new(1, None);

        store.put("k1".to_string(), body("v1"), None);
        store.get("k1");
        store.get("nonexistent");
        store.put("k2".to_string(), body("v2"), None);

        let stats = store.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.evictions, 1);
        assert_eq!(stats.size, 1);
        assert_eq!(stats.capacity, 1);

        store.reset_stats();
        let stats = store.stats();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.evictions, 0);
        assert_eq!(stats.size, 1);
        assert!(store.contains("k2"));
    }

    #[test]
    fn test_remove() {
        let mut store = CacheStore::new(10, None);
        store.put("k".to_string(), body("v"), None);

        assert!(store.remove("k"));
        assert!(!store.remove("k"));
        assert!(store.is_empty());
        assert_eq!(store.stats().evictions, 0);
    }
}
