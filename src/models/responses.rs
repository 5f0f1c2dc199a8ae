//! Response DTOs for the admin API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

use crate::dispatch::ProxyStats;

/// Response body for GET /stats
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatsResponse {
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub cache_evictions: u64,
    pub rate_limited_requests: u64,
    pub total_requests: u64,
}

impl From<&ProxyStats> for StatsResponse {
    fn from(stats: &ProxyStats) -> Self {
        Self {
            cache_hits: stats.cache.hits,
            cache_misses: stats.cache.misses,
            cache_evictions: stats.cache.evictions,
            rate_limited_requests: stats.requests.rate_limited_requests,
            total_requests: stats.requests.total_requests,
        }
    }
}

/// Response body for GET /metrics, a superset of [`StatsResponse`].
#[derive(Debug, Clone, Serialize)]
pub struct MetricsResponse {
    #[serde(flatten)]
    pub stats: StatsResponse,
    pub cache_expirations: u64,
    pub cache_size: usize,
    pub cache_capacity: usize,
    /// hits / (hits + misses)
    pub hit_rate: f64,
    pub bad_requests: u64,
    pub upstream_fetches: u64,
    pub upstream_failures: u64,
    pub tracked_clients: usize,
    pub active_connections: usize,
    pub accepted_connections: u64,
}

impl MetricsResponse {
    pub fn new(stats: &ProxyStats, active_connections: usize, accepted_connections: u64) -> Self {
        Self {
            stats: StatsResponse::from(stats),
            cache_expirations: stats.cache.expirations,
            cache_size: stats.cache.size,
            cache_capacity: stats.cache.capacity,
            hit_rate: stats.cache.hit_rate(),
            bad_requests: stats.requests.bad_requests,
            upstream_fetches: stats.requests.upstream_fetches,
            upstream_failures: stats.requests.upstream_failures,
            tracked_clients: stats.tracked_clients,
            active_connections,
            accepted_connections,
        }
    }
}

/// A preload URL that could not be fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreloadFailure {
    pub url: String,
    pub error: String,
}

/// Response body for POST /configure-cache
#[derive(Debug, Clone, Serialize)]
pub struct ConfigureCacheResponse {
    pub eviction_policy: &'static str,
    /// Default TTL now in effect, None = entries never expire
    pub ttl_seconds: Option<u64>,
    pub preloaded: Vec<String>,
    pub failed: Vec<PreloadFailure>,
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
