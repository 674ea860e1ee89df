//! # Retry Policy
//!
//! One parameterized retry policy shared by every upstream call path:
//! maximum attempt count, a backoff that grows with the attempt number up
//! to a small ceiling, and the retryable-error predicate. Keeping the
//! policy separate from the HTTP plumbing makes it unit-testable on its
//! own.

use crate::core::config::RetryConfig;
use crate::core::error::ProxyError;
use std::time::Duration;

/// Bounded retry with growing, capped backoff
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts allowed, first try included
    pub max_attempts: u32,

    /// Base delay; multiplied by the attempt number
    pub base_delay: Duration,

    /// Ceiling on any single backoff delay
    pub max_delay: Duration,
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: config.base_delay,
            max_delay: config.max_delay,
        }
    }
}

impl RetryPolicy {
    /// Whether a failed attempt should be retried.
    ///
    /// `attempt` is the 1-based number of the attempt that just failed.
    /// Only transport-level failures qualify; upstream HTTP statuses are
    /// never retried.
    pub fn should_retry(&self, attempt: u32, error: &ProxyError) -> bool {
        attempt < self.max_attempts && error.is_retryable()
    }

    /// Backoff delay to sleep after the given failed attempt
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let delay = self.base_delay.saturating_mul(attempt.max(1));
        delay.min(self.max_delay)
    }
}
