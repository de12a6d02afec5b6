//! Retry policy.

use crate::config::RetryConfig;
use crate::error::SyncError;
use std::time::Duration;

/// What to do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Wait, then make another attempt.
    RetryAfter(Duration),
    /// End the run as failed.
    GiveUp,
}

/// Stateless retry policy: exponential backoff with a cap.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    /// Creates a policy from its configuration.
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// The configuration in use.
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Delay after failed attempt `attempt` (0-indexed):
    /// `min(base * 2^attempt, max)`.
    pub fn next_delay(&self, attempt: u32) -> Duration {
        2u32.checked_pow(attempt)
            .and_then(|factor| self.config.base_delay.checked_mul(factor))
            .map_or(self.config.max_delay, |delay| delay.min(self.config.max_delay))
    }

    /// Decides whether attempt `attempt` (0-indexed), which failed with
    /// `error`, is followed by another.
    pub fn decide(&self, error: &SyncError, attempt: u32) -> RetryDecision {
        if !error.is_retryable() || attempt.saturating_add(1) >= self.config.max_attempts {
            RetryDecision::GiveUp
        } else {
            RetryDecision::RetryAfter(self.next_delay(attempt))
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(RetryConfig::default())
    }
}
