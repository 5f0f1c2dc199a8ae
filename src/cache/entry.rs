//! Cache Entry Module
//!
//! Defines the structure for individual cached responses with TTL support.

use std::time::Duration;

use bytes::Bytes;
use tokio::time::Instant;

// == Cache Entry ==
/// A cached upstream response body keyed by request URL.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Request URL the body was fetched from
    pub key: String,
    /// Response body
    pub value: Bytes,
    /// When the key was first inserted
    pub created_at: Instant,
    /// When the value was last written, TTL counts from here
    pub refreshed_at: Instant,
    /// Maximum age, None = no expiration
    pub ttl: Option<Duration>,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new cache entry with optional TTL.
    pub fn new(key: String, value: Bytes, ttl: Option<Duration>, now: Instant) -> Self {
        Self {
            key,
            value,
            created_at: now,
            refreshed_at: now,
            ttl,
        }
    }

    // == Refresh ==
    /// Replaces the value and restarts the TTL clock.
    pub fn refresh(&mut self, value: Bytes, ttl: Option<Duration>, now: Instant) {
        self.value = value;
        self.ttl = ttl;
        self.refreshed_at = now;
    }

    // == Is Expired ==
    /// An entry is expired once its age strictly exceeds its TTL.
    pub fn is_expired(&self, now: Instant) -> bool {
        match self.ttl {
            Some(ttl) => self.age(now) > ttl,
            None => false,
        }
    }

    /// Time since the value was last written.
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.refreshed_at)
    }

    // == Time To Live ==
    /// Returns remaining TTL, or None if no expiration is set.
    pub fn ttl_remaining(&self, now: Instant) -> Option<Duration> {
        self.ttl.map(|ttl| ttl.saturating_sub(self.age(now)))
    }
}
