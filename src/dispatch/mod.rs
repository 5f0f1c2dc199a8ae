//! Request Dispatch Module
//!
//! Answers one proxied request by consulting, in order, request validation,
//! the rate limiter, the cache and finally the upstream origin.
//!
//! # Order of operations
//! 1. Non-GET or malformed URL: `400`. No token spent, cache untouched.
//! 2. Limiter denies: `429`. Cache untouched.
//! 3. Cache hit: `200` with the cached body.
//! 4. Miss: fetch upstream. `200` bodies are cached and returned, non-200
//!    answers become `404`, transport failures and timeouts `502`. Failures are
//!    never cached or retried.

mod request;
mod response;
mod stats;
mod upstream;

use std::sync::Arc;

use bytes::Bytes;
use reqwest::Url;
use tracing::{debug, warn};

use crate::cache::SharedCache;
use crate::error::{ProxyError, Result};
use crate::limiter::TokenBucketLimiter;

pub use request::{parse_target, validate_method, RequestLine};
pub use response::{Outcome, ProxyResponse};
pub use stats::{ProxyStats, RequestStats, RequestStatsSnapshot};
pub use upstream::{HttpFetcher, UpstreamFetcher};

// == Request Dispatcher ==
/// Shared by every connection task; cheap to clone.
#[derive(Clone)]
pub struct RequestDispatcher {
    cache: SharedCache,
    limiter: Arc<TokenBucketLimiter>,
    fetcher: Arc<dyn UpstreamFetcher>,
    stats: Arc<RequestStats>,
}

impl RequestDispatcher {
    pub fn new(
        cache: SharedCache,
        limiter: Arc<TokenBucketLimiter>,
        fetcher: Arc<dyn UpstreamFetcher>,
    ) -> Self {
        Self {
            cache,
            limiter,
            fetcher,
            stats: Arc::new(RequestStats::new()),
        }
    }

    // == Handle ==
    /// Produces the response for one request. Always returns a response.
    pub async fn handle(&self, client_id: &str, method: &str, target: &str) -> ProxyResponse {
        let response = match self.dispatch(client_id, method, target).await {
            Ok(response) => response,
            Err(err) => ProxyResponse::from_error(&err),
        };
        debug!(
            client = client_id,
            url = target,
            status = response.status.as_u16(),
            outcome = response.outcome.as_str(),
            "request handled"
        );
        response
    }

    async fn dispatch(&self, client_id: &str, method: &str, target: &str) -> Result<ProxyResponse> {
        let url = match validate_method(method).and_then(|_| parse_target(target)) {
            Ok(url) => url,
            Err(err) => {
                self.stats.record_bad_request();
                return Err(err);
            }
        };

        self.stats.record_request();
        if !self.limiter.allow(client_id).await {
            self.stats.record_rate_limited();
            return Err(ProxyError::RateLimited(client_id.to_string()));
        }

        // Keyed by the target as sent, not the normalized URL
        if let Some(body) = self.cache.get(target).await {
            return Ok(ProxyResponse::ok(body, Outcome::Hit));
        }

        let body = self.fetch_and_store(target, &url).await?;
        Ok(ProxyResponse::ok(body, Outcome::Miss))
    }

    /// Answers a request that could not even be parsed. Counted as a bad
    /// request, nothing else is consulted.
    pub fn reject(&self, err: &ProxyError) -> ProxyResponse {
        self.stats.record_bad_request();
        debug!(error = %err, "rejecting malformed request");
        ProxyResponse::from_error(err)
    }

    // == Preload ==
    /// Fetches `target` and stores it exactly as a miss would, without
    /// touching the limiter or the request counters.
    pub async fn preload(&self, target: &str) -> Result<()> {
        let url = parse_target(target)?;
        self.fetch_and_store(target, &url).await.map(|_| ())
    }

    async fn fetch_and_store(&self, key: &str, url: &Url) -> Result<Bytes> {
        self.stats.record_fetch();
        match self.fetcher.fetch(url).await {
            Ok(body) => {
                if let Some(evicted) = self.cache.put(key.to_string(), body.clone(), None).await {
                    debug!(url = key, evicted = %evicted, "cache full, evicted least recently used");
                }
                Ok(body)
            }
            Err(err) => {
                self.stats.record_fetch_failure();
                warn!(url = key, error = %err, "upstream fetch failed");
                Err(err.into())
            }
        }
    }

    // == Stats ==
    pub async fn stats(&self) -> ProxyStats {
        ProxyStats {
            cache: self.cache.stats().await,
            requests: self.stats.snapshot(),
            tracked_clients: self.limiter.tracked_clients().await,
        }
    }

    /// Administrative reset of every counter. Cached entries and buckets stay.
    pub async fn reset_stats(&self) {
        self.cache.reset_stats().await;
        self.stats.reset();
    }

    pub fn cache(&self) -> &SharedCache {
        &self.cache
    }

    pub fn limiter(&self) -> &Arc<TokenBucketLimiter> {
        &self.limiter
    }
}
