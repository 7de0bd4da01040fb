//! Bounded retry on known-transient vendor errors
//!
//! Only errors whose text contains one of the caller's patterns (usually a
//! vendor error code such as `InvalidOperation.Conflict`) are retried.
//! Everything else is returned after the first attempt.

use crate::error::{CloudError, Result};
use std::future::Future;
use std::time::Duration;

/// Retry configuration
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Total attempts including the first; zero behaves as one
    pub max_attempts: u32,

    /// Delay before the first retry; zero retries immediately
    pub initial_delay: Duration,

    /// Maximum delay between retries
    pub max_delay: Duration,

    /// Backoff multiplier
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::ZERO,
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Retry without delay, bounded by attempt count only
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Self::default()
        }
    }

    pub fn with_backoff(mut self, initial_delay: Duration, max_delay: Duration) -> Self {
        self.initial_delay = initial_delay;
        self.max_delay = max_delay;
        self
    }

    /// Delay after the given zero-based failed attempt
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if self.initial_delay.is_zero() {
            return Duration::ZERO;
        }
        let factor = self.backoff_multiplier.max(1.0).powi(attempt as i32);
        let delay = self.initial_delay.as_secs_f64() * factor;
        Duration::from_secs_f64(delay.min(self.max_delay.as_secs_f64()))
    }
}

/// Whether `err` should be retried for the given patterns.
///
/// Capability and policy errors are never retried, whatever their text.
pub fn is_retryable(err: &CloudError, patterns: &[&str]) -> bool {
    if err.kind().is_terminal() {
        return false;
    }
    let text = err.to_string();
    patterns
        .iter()
        .any(|pattern| !pattern.is_empty() && text.contains(pattern))
}

/// Run `operation`, retrying immediately while it fails with an error that
/// matches one of `patterns`, up to `max_attempts` attempts in total.
pub async fn retry_on_error<T, F, Fut>(operation: F, patterns: &[&str], max_attempts: u32) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    retry_with_config(operation, patterns, &RetryConfig::immediate(max_attempts)).await
}

/// [`retry_on_error`] with configurable delays between attempts
pub async fn retry_with_config<T, F, Fut>(
    mut operation: F,
    patterns: &[&str],
    config: &RetryConfig,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        if attempt >= max_attempts || !is_retryable(&err, patterns) {
            return Err(err);
        }

        let delay = config.delay_for_attempt(attempt - 1);
        tracing::warn!(
            "attempt {}/{} failed, retrying in {:?}: {}",
            attempt,
            max_attempts,
            delay,
            err
        );
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}
