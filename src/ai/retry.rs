//! Retry policy for provider invocations
//!
//! A [`RetryPolicy`] is a plain value: it performs no I/O and holds no state
//! between invocations. The transport asks it how long to wait before the
//! next attempt and stops when it answers `None`.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Default number of attempts per invocation
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default backoff growth factor
pub const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;

#[derive(Debug, Error, PartialEq)]
pub enum RetryPolicyError {
    #[error("max_attempts must be at least 1")]
    ZeroAttempts,
    #[error("backoff multiplier must be a finite value >= 1.0, got {0}")]
    InvalidMultiplier(f64),
}

/// Attempt count plus geometric backoff between attempts
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_delay: Duration,
    backoff_multiplier: f64,
}

impl RetryPolicy {
    pub fn new(
        max_attempts: u32,
        initial_delay: Duration,
        backoff_multiplier: f64,
    ) -> Result<Self, RetryPolicyError> {
        if max_attempts == 0 {
            return Err(RetryPolicyError::ZeroAttempts);
        }
        if !backoff_multiplier.is_finite() || backoff_multiplier < 1.0 {
            return Err(RetryPolicyError::InvalidMultiplier(backoff_multiplier));
        }

        Ok(Self {
            max_attempts,
            initial_delay,
            backoff_multiplier,
        })
    }

    /// A policy that makes exactly one attempt
    pub fn single_attempt() -> Self {
        Self {
            max_attempts: 1,
            initial_delay: Duration::ZERO,
            backoff_multiplier: 1.0,
        }
    }

    /// Same attempts and multiplier, different first delay
    pub fn with_initial_delay(mut self, initial_delay: Duration) -> Self {
        self.initial_delay = initial_delay;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn initial_delay(&self) -> Duration {
        self.initial_delay
    }

    pub fn backoff_multiplier(&self) -> f64 {
        self.backoff_multiplier
    }

    /// Delay to sleep after a failed `attempt` (1-based) before trying again.
    ///
    /// Returns `None` once `attempt` is the last one allowed: no sleep ever
    /// follows the final attempt.
    pub fn delay_after(&self, attempt: u32) -> Option<Duration> {
        if attempt == 0 || attempt >= self.max_attempts {
            return None;
        }

        let factor = self.backoff_multiplier.powi((attempt - 1) as i32);
        Some(self.initial_delay.mul_f64(factor))
    }

    /// The full sleep schedule, `max_attempts - 1` entries long
    pub fn delays(&self) -> Vec<Duration> {
        (1..self.max_attempts)
            .filter_map(|attempt| self.delay_after(attempt))
            .collect()
    }

    /// Upper bound on wall-clock time for one invocation given a per-attempt timeout
    pub fn worst_case_duration(&self, attempt_timeout: Duration) -> Duration {
        let sleeping: Duration = self.delays().into_iter().sum();
        attempt_timeout * self.max_attempts + sleeping
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_delay: Duration::from_secs(2),
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
        }
    }
}
