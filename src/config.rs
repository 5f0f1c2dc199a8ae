//! Configuration Module
//!
//! Handles loading and managing proxy configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{ProxyError, Result};

/// Proxy configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port the forward proxy listens on
    pub proxy_port: u16,
    /// Port of the admin HTTP API
    pub admin_port: u16,
    /// Maximum number of connections served concurrently
    pub max_clients: usize,
    /// Maximum number of entries the cache can hold
    pub cache_capacity: usize,
    /// Default TTL in seconds for cached responses, 0 = never expire
    pub default_ttl: u64,
    /// Token bucket burst size per client
    pub rate_limit_max_tokens: u32,
    /// Seconds needed to refill an empty bucket
    pub rate_limit_window: u64,
    /// Idle buckets are dropped after this many refill windows
    pub rate_limit_idle_factor: u32,
    /// Upstream fetch timeout in seconds
    pub upstream_timeout: u64,
    /// Timeout in seconds for reading a client's request
    pub client_read_timeout: u64,
    /// Maintenance task interval in seconds, 0 = disabled
    pub cleanup_interval: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `PROXY_PORT` - Proxy listener port (default: 8080)
    /// - `ADMIN_PORT` - Admin API port (default: 3000)
    /// - `MAX_CLIENTS` - Concurrent connections (default: 10)
    /// - `CACHE_CAPACITY` - Maximum cache entries (default: 5)
    /// - `DEFAULT_TTL` - Default TTL in seconds, 0 disables (default: 0)
    /// - `RATE_LIMIT_MAX_TOKENS` - Bucket size (default: 5)
    /// - `RATE_LIMIT_WINDOW_SECS` - Refill window (default: 60)
    /// - `RATE_LIMIT_IDLE_FACTOR` - Bucket retention in windows (default: 3)
    /// - `UPSTREAM_TIMEOUT_SECS` - Upstream timeout (default: 10)
    /// - `CLIENT_READ_TIMEOUT_SECS` - Client read timeout (default: 10)
    /// - `CLEANUP_INTERVAL` - Maintenance frequency in seconds (default: 30)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            proxy_port: env_or("PROXY_PORT", defaults.proxy_port),
            admin_port: env_or("ADMIN_PORT", defaults.admin_port),
            max_clients: env_or("MAX_CLIENTS", defaults.max_clients),
            cache_capacity: env_or("CACHE_CAPACITY", defaults.cache_capacity),
            default_ttl: env_or("DEFAULT_TTL", defaults.default_ttl),
            rate_limit_max_tokens: env_or("RATE_LIMIT_MAX_TOKENS", defaults.rate_limit_max_tokens),
            rate_limit_window: env_or("RATE_LIMIT_WINDOW_SECS", defaults.rate_limit_window),
            rate_limit_idle_factor: env_or(
                "RATE_LIMIT_IDLE_FACTOR",
                defaults.rate_limit_idle_factor,
            ),
            upstream_timeout: env_or("UPSTREAM_TIMEOUT_SECS", defaults.upstream_timeout),
            client_read_timeout: env_or("CLIENT_READ_TIMEOUT_SECS", defaults.client_read_timeout),
            cleanup_interval: env_or("CLEANUP_INTERVAL", defaults.cleanup_interval),
        }
    }

    /// Rejects values the proxy cannot run with.
    pub fn validate(&self) -> Result<()> {
        let checks = [
            (self.max_clients == 0, "MAX_CLIENTS must be at least 1"),
            (self.cache_capacity == 0, "CACHE_CAPACITY must be at least 1"),
            (
                self.rate_limit_max_tokens == 0,
                "RATE_LIMIT_MAX_TOKENS must be at least 1",
            ),
            (
                self.rate_limit_window == 0,
                "RATE_LIMIT_WINDOW_SECS must be at least 1",
            ),
            (
                self.rate_limit_idle_factor == 0,
                "RATE_LIMIT_IDLE_FACTOR must be at least 1",
            ),
            (
                self.upstream_timeout == 0,
                "UPSTREAM_TIMEOUT_SECS must be at least 1",
            ),
            (
                self.client_read_timeout == 0,
                "CLIENT_READ_TIMEOUT_SECS must be at least 1",
            ),
        ];

        match checks.iter().find(|(failed, _)| *failed) {
            Some((_, msg)) => Err(ProxyError::InvalidConfig(msg.to_string())),
            None => Ok(()),
        }
    }

    /// Default TTL as a duration, `None` when entries never expire.
    pub fn default_ttl(&self) -> Option<Duration> {
        (self.default_ttl > 0).then(|| Duration::from_secs(self.default_ttl))
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window)
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout)
    }

    pub fn client_read_timeout(&self) -> Duration {
        Duration::from_secs(self.client_read_timeout)
    }

    /// How long a client may stay silent before its bucket is dropped.
    pub fn bucket_idle_after(&self) -> Duration {
        self.rate_limit_window() * self.rate_limit_idle_factor
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            proxy_port: 8080,
            admin_port: 3000,
            max_clients: 10,
            cache_capacity: 5,
            default_ttl: 0,
            rate_limit_max_tokens: 5,
            rate_limit_window: 60,
            rate_limit_idle_factor: 3,
            upstream_timeout: 10,
            client_read_timeout: 10,
            cleanup_interval: 30,
        }
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
