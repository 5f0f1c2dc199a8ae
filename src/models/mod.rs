//! Request and Response models for the admin API
//!
//! This module defines the DTOs (Data Transfer Objects) used for
//! serializing/deserializing admin HTTP request and response bodies.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::{CachePlan, ConfigureCacheRequest, LRU_POLICY};
pub use responses::{
    ConfigureCacheResponse, HealthResponse, MetricsResponse, PreloadFailure, StatsResponse,
};
