//! Response framing for the proxy port.

use axum::http::StatusCode;
use bytes::{BufMut, Bytes, BytesMut};

use crate::error::ProxyError;

/// How a request was answered, for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Hit,
    Miss,
    RateLimited,
    BadRequest,
    UpstreamFailed,
}

impl Outcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Hit => "hit",
            Outcome::Miss => "miss",
            Outcome::RateLimited => "rate_limited",
            Outcome::BadRequest => "bad_request",
            Outcome::UpstreamFailed => "upstream_failed",
        }
    }
}

/// A complete answer to one proxied request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyResponse {
    pub status: StatusCode,
    pub body: Bytes,
    pub outcome: Outcome,
}

impl ProxyResponse {
    pub fn ok(body: Bytes, outcome: Outcome) -> Self {
        Self {
            status: StatusCode::OK,
            body,
            outcome,
        }
    }

    /// Error answers carry an empty body.
    pub fn from_error(err: &ProxyError) -> Self {
        let outcome = match err {
            ProxyError::BadRequest(_) | ProxyError::InvalidConfig(_) => Outcome::BadRequest,
            ProxyError::RateLimited(_) => Outcome::RateLimited,
            ProxyError::Upstream(_) => Outcome::UpstreamFailed,
        };
        Self {
            status: err.status_code(),
            body: Bytes::new(),
            outcome,
        }
    }

    /// Status line, exact `Content-Length`, blank line, body.
    pub fn encode(&self) -> Bytes {
        let head = format!(
            "HTTP/1.1 {} {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            self.status.as_u16(),
            self.status.canonical_reason().unwrap_or(""),
            self.body.len()
        );
        let mut buf = BytesMut::with_capacity(head.len() + self.body.len());
        buf.put_slice(head.as_bytes());
        buf.put_slice(&self.body);
        buf.freeze()
    }
}
