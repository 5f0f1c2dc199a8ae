//! Rate Limiter Module
//!
//! Per-client token-bucket admission control with continuous refill.
//!
//! A client may burst up to `max_tokens` requests. Tokens regenerate at
//! `max_tokens / refill_window` per second, so an idle client is capped at a
//! full bucket rather than accruing backlog.

mod bucket;

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

pub use bucket::Bucket;

// == Token Bucket Limiter ==
/// Shared limiter; bucket refill and consumption happen under one lock.
#[derive(Debug)]
pub struct TokenBucketLimiter {
    buckets: Mutex<HashMap<String, Bucket>>,
    max_tokens: f64,
    refill_window: Duration,
    rate_per_sec: f64,
}

impl TokenBucketLimiter {
    /// Creates a limiter allowing `max_tokens` per `refill_window`.
    ///
    /// `max_tokens` below one is raised to one and a zero window is raised
    /// to one millisecond.
    pub fn new(max_tokens: u32, refill_window: Duration) -> Self {
        let max_tokens = f64::from(max_tokens.max(1));
        let refill_window = refill_window.max(Duration::from_millis(1));
        Self {
            buckets: Mutex::new(HashMap::new()),
            max_tokens,
            refill_window,
            rate_per_sec: max_tokens / refill_window.as_secs_f64(),
        }
    }

    // == Allow ==
    /// Admits or denies one request from `client_id`.
    pub async fn allow(&self, client_id: &str) -> bool {
        self.allow_at(client_id, Instant::now()).await
    }

    pub async fn allow_at(&self, client_id: &str, now: Instant) -> bool {
        let mut buckets = self.buckets.lock().await;
        let allowed = match buckets.get_mut(client_id) {
            Some(bucket) => bucket.try_consume(now, self.max_tokens, self.rate_per_sec),
            None => {
                let mut bucket = Bucket::full(self.max_tokens, now);
                let allowed = bucket.try_consume(now, self.max_tokens, self.rate_per_sec);
                buckets.insert(client_id.to_string(), bucket);
                allowed
            }
        };
        if !allowed {
            debug!(client = client_id, "token bucket empty");
        }
        allowed
    }

    /// Tokens `client_id` could spend right now, without consuming any.
    pub async fn available_tokens(&self, client_id: &str) -> f64 {
        let now = Instant::now();
        self.buckets
            .lock()
            .await
            .get(client_id)
            .map_or(self.max_tokens, |bucket| {
                bucket.available(now, self.max_tokens, self.rate_per_sec)
            })
    }

    // == Prune Idle ==
    /// Drops buckets with no admitted request in the last `idle_for`.
    ///
    /// With `idle_for >= refill_window` a dropped bucket would have been full
    /// again, so the client sees no difference. Returns the number removed.
    pub async fn prune_idle(&self, idle_for: Duration) -> usize {
        self.prune_idle_at(idle_for, Instant::now()).await
    }

    pub async fn prune_idle_at(&self, idle_for: Duration, now: Instant) -> usize {
        let idle_for = idle_for.max(self.refill_window);
        let mut buckets = self.buckets.lock().await;
        let before = buckets.len();
        buckets.retain(|_, bucket| !bucket.is_idle(now, idle_for));
        before - buckets.len()
    }

    /// Number of client identities currently holding a bucket.
    pub async fn tracked_clients(&self) -> usize {
        self.buckets.lock().await.len()
    }

    pub fn max_tokens(&self) -> f64 {
        self.max_tokens
    }

    pub fn refill_window(&self) -> Duration {
        self.refill_window
    }
}
