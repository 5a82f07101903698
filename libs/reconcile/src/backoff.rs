//! Retry delays for records whose reconciliation failed.
//!
//! The queue counts consecutive failures per key. The n-th failure waits
//! `first_retry * 2^(n-1)`, capped at `max_delay`, and the result is then
//! shortened by a random fraction of at most `jitter`. Records that fail
//! together, as during a Langfuse outage, come back spread out instead of
//! in one burst.

use std::time::Duration;

use rand::Rng;

/// Exponential retry schedule keyed on consecutive failures.
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    /// Wait after the first failure.
    pub first_retry: Duration,

    /// No retry waits longer than this.
    pub max_delay: Duration,

    /// Largest fraction (clamped to `0.0..=1.0`) cut from a delay at random.
    pub jitter: f64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            first_retry: Duration::from_millis(100),
            max_delay: Duration::from_secs(30),
            jitter: 0.2,
        }
    }
}

impl BackoffPolicy {
    /// Un-jittered delay after `failures` consecutive failures.
    /// Zero failures is treated as one.
    pub fn ceiling(&self, failures: u32) -> Duration {
        let doublings = failures.saturating_sub(1).min(31);
        self.first_retry
            .checked_mul(1 << doublings)
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }

    /// Delay before the next attempt after `failures` consecutive failures.
    pub fn delay(&self, failures: u32) -> Duration {
        let ceiling = self.ceiling(failures);
        let jitter = self.jitter.clamp(0.0, 1.0);
        if jitter == 0.0 || ceiling.is_zero() {
            return ceiling;
        }

        let cut = rand::rng().random_range(0.0..=jitter);
        ceiling.mul_f64(1.0 - cut)
    }
}
