//! API Module
//!
//! HTTP handlers and routing for the proxy's admin API.
//!
//! # Endpoints
//! - `GET /stats` - Cache and rate-limit counters
//! - `GET /metrics` - Extended counters and gauges
//! - `POST /configure-cache` - Default TTL and preloading
//! - `POST /reset-stats` - Zero all counters
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
