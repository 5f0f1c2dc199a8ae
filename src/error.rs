//! Error types for the caching proxy
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Proxy Error Enum ==
/// Errors surfaced to clients of the proxy and of the admin API.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProxyError {
    /// Malformed request line, unsupported method or unusable target URL
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Client exhausted its token bucket
    #[error("Rate limit exceeded for {0}")]
    RateLimited(String),

    /// Upstream fetch failed
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    /// Rejected configuration, nothing was applied
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ProxyError {
    /// Status code written back to the client for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ProxyError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            ProxyError::Upstream(err) => err.status_code(),
            ProxyError::InvalidConfig(_) => StatusCode::BAD_REQUEST,
        }
    }
}

// == Upstream Error Enum ==
/// Failure of a single upstream fetch. Never retried by the proxy.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UpstreamError {
    /// Upstream answered with something other than 200
    #[error("Upstream returned status {0}")]
    Status(u16),

    /// Connection, DNS or body read failure
    #[error("Upstream transport error: {0}")]
    Transport(String),

    /// Upstream did not answer within the configured timeout
    #[error("Upstream timed out")]
    Timeout,
}

impl UpstreamError {
    /// Non-200 upstream answers map to 404, transport-level failures to 502.
    pub fn status_code(&self) -> StatusCode {
        match self {
            UpstreamError::Status(_) => StatusCode::NOT_FOUND,
            UpstreamError::Transport(_) | UpstreamError::Timeout => StatusCode::BAD_GATEWAY,
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the proxy.
pub type Result<T> = std::result::Result<T, ProxyError>;
