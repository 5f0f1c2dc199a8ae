//! Request DTOs for the admin API
//!
//! Defines the structure of incoming HTTP request bodies.

use std::time::Duration;

use serde::Deserialize;

use crate::dispatch::parse_target;
use crate::error::{ProxyError, Result};

/// Only supported eviction policy.
pub const LRU_POLICY: &str = "LRU";

/// Request body for POST /configure-cache
///
/// # Fields
/// - `eviction_policy`: Must be `LRU` when present
/// - `ttl_seconds`: New default TTL for cached responses
/// - `preload_urls`: URLs fetched and cached right away
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigureCacheRequest {
    #[serde(default)]
    pub eviction_policy: Option<String>,
    #[serde(default)]
    pub ttl_seconds: Option<u64>,
    #[serde(default)]
    pub preload_urls: Vec<String>,
}

/// A configuration request that passed validation in full.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachePlan {
    pub ttl: Option<Duration>,
    pub preload_urls: Vec<String>,
}

impl ConfigureCacheRequest {
    /// Checks every field before anything is applied.
    pub fn validate(self) -> Result<CachePlan> {
        if let Some(policy) = &self.eviction_policy {
            if !policy.eq_ignore_ascii_case(LRU_POLICY) {
                return Err(ProxyError::InvalidConfig(format!(
                    "unsupported eviction policy: {policy}"
                )));
            }
        }

        if self.ttl_seconds == Some(0) {
            return Err(ProxyError::InvalidConfig(
                "ttl_seconds must be at least 1".to_string(),
            ));
        }

        for url in &self.preload_urls {
            parse_target(url).map_err(|err| {
                ProxyError::InvalidConfig(format!("invalid preload url {url:?}: {err}"))
            })?;
        }

        Ok(CachePlan {
            ttl: self.ttl_seconds.map(Duration::from_secs),
            preload_urls: self.preload_urls,
        })
    }
}
