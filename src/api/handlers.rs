//! API Handlers
//!
//! HTTP request handlers for each admin endpoint.

use std::sync::Arc;

use axum::{extract::State, Json};
use tracing::info;

use crate::cache::SharedCache;
use crate::config::Config;
use crate::dispatch::{HttpFetcher, RequestDispatcher};
use crate::error::Result;
use crate::limiter::TokenBucketLimiter;
use crate::models::{
    ConfigureCacheRequest, ConfigureCacheResponse, HealthResponse, MetricsResponse,
    PreloadFailure, StatsResponse, LRU_POLICY,
};
use crate::server::ConnectionGauge;

/// Application state shared across all admin handlers.
///
/// Holds the same dispatcher the proxy listener uses, so statistics and
/// configuration changes are visible on both ports.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: RequestDispatcher,
    pub connections: Arc<ConnectionGauge>,
}

impl AppState {
    pub fn new(dispatcher: RequestDispatcher, connections: Arc<ConnectionGauge>) -> Self {
        Self {
            dispatcher,
            connections,
        }
    }

    /// Builds the cache, limiter and upstream client from configuration.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let cache = SharedCache::new(config.cache_capacity, config.default_ttl());
        let limiter = Arc::new(TokenBucketLimiter::new(
            config.rate_limit_max_tokens,
            config.rate_limit_window(),
        ));
        let fetcher = Arc::new(HttpFetcher::new(config.upstream_timeout())?);
        let dispatcher = RequestDispatcher::new(cache, limiter, fetcher);
        Ok(Self::new(dispatcher, Arc::new(ConnectionGauge::new())))
    }
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let stats = state.dispatcher.stats().await;
    Json(StatsResponse::from(&stats))
}

/// Handler for GET /metrics
pub async fn metrics_handler(State(state): State<AppState>) -> Json<MetricsResponse> {
    let stats = state.dispatcher.stats().await;
    Json(MetricsResponse::new(
        &stats,
        state.connections.active(),
        state.connections.accepted(),
    ))
}

/// Handler for POST /reset-stats
///
/// Zeroes every counter and returns the fresh snapshot.
pub async fn reset_stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    state.dispatcher.reset_stats().await;
    info!("statistics reset");
    let stats = state.dispatcher.stats().await;
    Json(StatsResponse::from(&stats))
}

/// Handler for POST /configure-cache
///
/// The whole request is validated before anything changes. Preload
/// failures are reported but do not undo the TTL change.
pub async fn configure_cache_handler(
    State(state): State<AppState>,
    Json(req): Json<ConfigureCacheRequest>,
) -> Result<Json<ConfigureCacheResponse>> {
    let plan = req.validate()?;
    let cache = state.dispatcher.cache();

    if let Some(ttl) = plan.ttl {
        cache.set_default_ttl(Some(ttl)).await;
        info!(ttl_seconds = ttl.as_secs(), "default cache TTL updated");
    }

    let mut preloaded = Vec::new();
    let mut failed = Vec::new();
    for url in plan.preload_urls {
        match state.dispatcher.preload(&url).await {
            Ok(()) => preloaded.push(url),
            Err(err) => failed.push(PreloadFailure {
                url,
                error: err.to_string(),
            }),
        }
    }
    info!(
        preloaded = preloaded.len(),
        failed = failed.len(),
        "cache configured"
    );

    Ok(Json(ConfigureCacheResponse {
        eviction_policy: LRU_POLICY,
        ttl_seconds: cache.default_ttl().await.map(|ttl| ttl.as_secs()),
        preloaded,
        failed,
    }))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
