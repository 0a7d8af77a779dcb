//! Retry budget and randomized delays for download attempts.
//!
//! Delays are drawn uniformly from a closed range on every use, so
//! concurrent workers do not fall into lock-step against the remote host.

use std::time::Duration;

use rand::Rng;
use tracing::debug;

/// A closed range of seconds to draw a delay from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DelayRange {
    pub min_secs: f64,
    pub max_secs: f64,
}

impl DelayRange {
    /// No delay at all.
    pub const ZERO: DelayRange = DelayRange {
        min_secs: 0.0,
        max_secs: 0.0,
    };

    pub fn new(min_secs: f64, max_secs: f64) -> Self {
        Self { min_secs, max_secs }
    }

    /// Draw a delay uniformly from `[min_secs, max_secs]`.
    ///
    /// A degenerate or inverted range yields `min_secs`; negative values
    /// are clamped to zero.
    pub fn sample(&self) -> Duration {
        let min = self.min_secs.max(0.0);
        let max = self.max_secs.max(0.0);
        let secs = if max > min {
            rand::rng().random_range(min..=max)
        } else {
            min
        };
        Duration::from_secs_f64(secs)
    }

    /// Sleep for a freshly drawn delay. Returns the delay slept.
    pub async fn sleep(&self, reason: &str) -> Duration {
        let delay = self.sample();
        if !delay.is_zero() {
            debug!("Sleeping {:.1}s ({})", delay.as_secs_f64(), reason);
            tokio::time::sleep(delay).await;
        }
        delay
    }
}

/// How many times to try each strategy and how long to wait in between.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Attempts per strategy, including the first one. Always at least 1.
    pub attempts_per_strategy: u32,
    /// Throttle applied after every successful download.
    pub success_delay: DelayRange,
    /// Extended backoff applied after a rate-limited attempt.
    pub rate_limit_backoff: DelayRange,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts_per_strategy: 3,
            success_delay: DelayRange::new(2.0, 5.0),
            rate_limit_backoff: DelayRange::new(30.0, 60.0),
        }
    }
}

impl RetryPolicy {
    /// Policy with `retries` extra attempts per strategy.
    pub fn with_retries(retries: u32) -> Self {
        Self::default().retries(retries)
    }

    /// Set the number of extra attempts per strategy.
    pub fn retries(mut self, retries: u32) -> Self {
        self.attempts_per_strategy = retries.saturating_add(1);
        self
    }

    pub fn success_delay(mut self, range: DelayRange) -> Self {
        self.success_delay = range;
        self
    }

    pub fn rate_limit_backoff(mut self, range: DelayRange) -> Self {
        self.rate_limit_backoff = range;
        self
    }

    /// A policy that never sleeps. Used by tests.
    pub fn without_delays(self) -> Self {
        self.success_delay(DelayRange::ZERO)
            .rate_limit_backoff(DelayRange::ZERO)
    }
}
