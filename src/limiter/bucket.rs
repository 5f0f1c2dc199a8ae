//! Token Bucket Module
//!
//! Per-client bucket with continuous refill.

use std::time::Duration;

use tokio::time::Instant;

// == Bucket ==
/// Token state for one client identity.
#[derive(Debug, Clone, PartialEq)]
pub struct Bucket {
    /// Available tokens, always within `[0, max_tokens]`
    pub tokens: f64,
    /// Last time a token was consumed
    pub last_refill_at: Instant,
}

impl Bucket {
    /// A fresh bucket starts full.
    pub fn full(max_tokens: f64, now: Instant) -> Self {
        Self {
            tokens: max_tokens,
            last_refill_at: now,
        }
    }

    /// Tokens that would be available at `now`, capped at `max_tokens`.
    pub fn available(&self, now: Instant, max_tokens: f64, rate_per_sec: f64) -> f64 {
        let elapsed = now.saturating_duration_since(self.last_refill_at);
        (self.tokens + elapsed.as_secs_f64() * rate_per_sec).min(max_tokens)
    }

    // == Try Consume ==
    /// Refills and takes one token in a single step.
    ///
    /// A denied call leaves both the token count and the refill clock as
    /// they were.
    pub fn try_consume(&mut self, now: Instant, max_tokens: f64, rate_per_sec: f64) -> bool {
        let available = self.available(now, max_tokens, rate_per_sec);
        if available < 1.0 {
            return false;
        }
        self.tokens = available - 1.0;
        self.last_refill_at = now;
        true
    }

    /// Whether the bucket has seen no admitted request for at least `idle_for`.
    pub fn is_idle(&self, now: Instant, idle_for: Duration) -> bool {
        now.saturating_duration_since(self.last_refill_at) >= idle_for
    }
}
