//! Upstream fetch collaborator.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, StatusCode, Url};

use crate::error::UpstreamError;

/// Fetches a URL from its origin server.
///
/// Implementations return the body of a `200` answer and an
/// [`UpstreamError`] for everything else. They must enforce their own timeout.
#[async_trait]
pub trait UpstreamFetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<Bytes, UpstreamError>;
}

// == HTTP Fetcher ==
/// `reqwest`-backed fetcher with a whole-request timeout.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, UpstreamError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("cache_proxy/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| UpstreamError::Transport(err.to_string()))?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl UpstreamFetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<Bytes, UpstreamError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(UpstreamError::Status(status.as_u16()));
        }

        response.bytes().await.map_err(classify)
    }
}

fn classify(err: reqwest::Error) -> UpstreamError {
    if err.is_timeout() {
        UpstreamError::Timeout
    } else {
        UpstreamError::Transport(err.to_string())
    }
}
