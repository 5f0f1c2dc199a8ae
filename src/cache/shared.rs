//! Shared Cache Module
//!
//! Thread-safe handle around [`CacheStore`]. Every operation takes the lock
//! exactly once, so eviction and insertion are never observed apart.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::Mutex;

use crate::cache::{CacheStats, CacheStore};

/// Cloneable, lock-owning cache handle shared by all connection tasks.
#[derive(Debug, Clone)]
pub struct SharedCache {
    inner: Arc<Mutex<CacheStore>>,
}

impl SharedCache {
    pub fn new(capacity: usize, default_ttl: Option<Duration>) -> Self {
        Self::from_store(CacheStore::new(capacity, default_ttl))
    }

    pub fn from_store(store: CacheStore) -> Self {
        Self {
            inner: Arc::new(Mutex::new(store)),
        }
    }

    pub async fn get(&self, key: &str) -> Option<Bytes> {
        self.inner.lock().await.get(key)
    }

    /// Stores a body, returning the key evicted to make room, if any.
    pub async fn put(&self, key: String, value: Bytes, ttl: Option<Duration>) -> Option<String> {
        self.inner.lock().await.put(key, value, ttl)
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.inner.lock().await.contains(key)
    }

    pub async fn stats(&self) -> CacheStats {
        self.inner.lock().await.stats()
    }

    pub async fn reset_stats(&self) {
        self.inner.lock().await.reset_stats();
    }

    pub async fn cleanup_expired(&self) -> usize {
        self.inner.lock().await.cleanup_expired()
    }

    pub async fn set_default_ttl(&self, ttl: Option<Duration>) {
        self.inner.lock().await.set_default_ttl(ttl);
    }

    pub async fn default_ttl(&self) -> Option<Duration> {
        self.inner.lock().await.default_ttl()
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }
}
