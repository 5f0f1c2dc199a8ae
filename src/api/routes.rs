//! API Routes
//!
//! Configures the Axum router with all admin endpoints.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    configure_cache_handler, health_handler, metrics_handler, reset_stats_handler, stats_handler,
    AppState,
};

/// Creates the admin router with all endpoints configured.
///
/// # Endpoints
/// - `GET /stats` - Cache and rate-limit counters
/// - `GET /metrics` - Counters plus occupancy and connection gauges
/// - `POST /configure-cache` - Set default TTL and preload URLs
/// - `POST /reset-stats` - Zero all counters
/// - `GET /health` - Health check endpoint
///
/// # Middleware
/// - CORS: Allows any origin (configurable for production)
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/stats", get(stats_handler))
        .route("/metrics", get(metrics_handler))
        .route("/configure-cache", post(configure_cache_handler))
        .route("/reset-stats", post(reset_stats_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
