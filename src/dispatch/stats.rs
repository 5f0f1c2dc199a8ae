//! Request-level counters kept alongside the cache statistics.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::cache::CacheStats;

/// Lock-free dispatch counters. All monotonic until [`reset`](Self::reset).
#[derive(Debug, Default)]
pub struct RequestStats {
    total_requests: AtomicU64,
    rate_limited_requests: AtomicU64,
    bad_requests: AtomicU64,
    upstream_fetches: AtomicU64,
    upstream_failures: AtomicU64,
}

impl RequestStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rate_limited(&self) {
        self.rate_limited_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_bad_request(&self) {
        self.bad_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fetch(&self) {
        self.upstream_fetches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fetch_failure(&self) {
        self.upstream_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn reset(&self) {
        self.total_requests.store(0, Ordering::Relaxed);
        self.rate_limited_requests.store(0, Ordering::Relaxed);
        self.bad_requests.store(0, Ordering::Relaxed);
        self.upstream_fetches.store(0, Ordering::Relaxed);
        self.upstream_failures.store(0, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> RequestStatsSnapshot {
        RequestStatsSnapshot {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            rate_limited_requests: self.rate_limited_requests.load(Ordering::Relaxed),
            bad_requests: self.bad_requests.load(Ordering::Relaxed),
            upstream_fetches: self.upstream_fetches.load(Ordering::Relaxed),
            upstream_failures: self.upstream_failures.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RequestStatsSnapshot {
    pub total_requests: u64,
    pub rate_limited_requests: u64,
    pub bad_requests: u64,
    pub upstream_fetches: u64,
    pub upstream_failures: u64,
}

/// Combined view served by the admin endpoints.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProxyStats {
    pub cache: CacheStats,
    pub requests: RequestStatsSnapshot,
    pub tracked_clients: usize,
}
