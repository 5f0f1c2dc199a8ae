//! Cache Proxy - A forward HTTP proxy with an LRU response cache
//!
//! Serves GET requests from a bounded LRU cache, fetching from the origin
//! on a miss, and throttles each client with a token bucket. A separate
//! admin API exposes statistics and cache configuration.

pub mod api;
pub mod cache;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod limiter;
pub mod models;
pub mod server;
pub mod tasks;

pub use api::AppState;
pub use config::Config;
pub use dispatch::RequestDispatcher;
pub use error::{ProxyError, UpstreamError};
pub use server::ProxyServer;
pub use tasks::spawn_cleanup_task;
