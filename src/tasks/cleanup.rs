//! Periodic Sweep Task
//!
//! Background task that removes expired cache entries and forgets rate-limit
//! buckets of clients that have gone quiet.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::SharedCache;
use crate::limiter::TokenBucketLimiter;

/// Spawns a background task that sweeps the cache and the limiter every
/// `cleanup_interval_secs` seconds.
///
/// Reads already treat expired entries as misses, so the sweep only frees
/// capacity earlier. Buckets idle for longer than `idle_after` are dropped.
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during graceful shutdown.
///
/// # Example
/// ```ignore
/// let handle = spawn_cleanup_task(cache, limiter, 30, Duration::from_secs(180));
/// // Later, during shutdown:
/// handle.abort();
/// ```
pub fn spawn_cleanup_task(
    cache: SharedCache,
    limiter: Arc<TokenBucketLimiter>,
    cleanup_interval_secs: u64,
    idle_after: Duration,
) -> JoinHandle<()> {
    let interval = Duration::from_secs(cleanup_interval_secs.max(1));

    tokio::spawn(async move {
        info!(
            interval_secs = interval.as_secs(),
            "starting periodic cache and limiter sweep"
        );

        loop {
            tokio::time::sleep(interval).await;

            let expired = cache.cleanup_expired().await;
            let pruned = limiter.prune_idle(idle_after).await;

            if expired > 0 || pruned > 0 {
                info!(expired, pruned, "sweep removed stale state");
            } else {
                debug!("sweep found nothing to remove");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn limiter() -> Arc<TokenBucketLimiter> {
        Arc::new(TokenBucketLimiter::new(5, Duration::from_secs(60)))
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_task_removes_expired_entries() {
        let cache = SharedCache::new(10, None);
        cache
            .put(
                "expire_soon".to_string(),
                Bytes::from_static(b"v"),
                Some(Duration::from_secs(1)),
            )
            .await;

        let handle = spawn_cleanup_task(cache.clone(), limiter(), 1, Duration::from_secs(60));
        tokio::time::sleep(Duration::from_millis(2500)).await;

        assert!(!cache.contains("expire_soon").await);
        let stats = cache.stats().await;
        assert_eq!(stats.expirations, 1);
        assert_eq!(stats.size, 0);
        // The sweep is not a read.
        assert_eq!(stats.misses, 0);

        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_task_preserves_valid_entries() {
        let cache = SharedCache::new(10, None);
        cache
            .put(
                "long_lived".to_string(),
                Bytes::from_static(b"v"),
                Some(Duration::from_secs(3600)),
            )
            .await;
        cache
            .put("forever".to_string(), Bytes::from_static(b"v"), None)
            .await;

        let handle = spawn_cleanup_task(cache.clone(), limiter(), 1, Duration::from_secs(60));
        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert!(cache.contains("long_lived").await);
        assert!(cache.contains("forever").await);

        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_task_prunes_idle_buckets() {
        let cache = SharedCache::new(10, None);
        let limiter = limiter();
        assert!(limiter.allow("10.0.0.1").await);
        assert_eq!(limiter.tracked_clients().await, 1);

        let handle = spawn_cleanup_task(cache, limiter.clone(), 30, Duration::from_secs(120));

        tokio::time::sleep(Duration::from_secs(100)).await;
        assert_eq!(limiter.tracked_clients().await, 1);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(limiter.tracked_clients().await, 0);

        handle.abort();
    }

    #[tokio::test]
    async fn test_cleanup_task_can_be_aborted() {
        let handle = spawn_cleanup_task(SharedCache::new(1, None), limiter(), 1, Duration::ZERO);

        handle.abort();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished(), "Task should be finished after abort");
    }
}
