//! Exponential backoff for GitHub API calls.
//!
//! Default: 3 retries with 2s, 4s, 8s delays. Only transient errors are
//! retried; permanent errors are returned after the first attempt.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use super::error::GitHubApiError;

/// Configuration for exponential backoff retry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryConfig {
    /// Retries after the initial attempt.
    pub max_retries: u32,

    pub initial_delay: Duration,

    /// Cap for exponential growth.
    pub max_delay: Duration,

    pub backoff_multiplier: f64,
}

impl RetryConfig {
    pub const DEFAULT: Self = Self {
        max_retries: 3,
        initial_delay: Duration::from_secs(2),
        max_delay: Duration::from_secs(16),
        backoff_multiplier: 2.0,
    };

    /// A single attempt, never retried.
    pub const NONE: Self = Self {
        max_retries: 0,
        initial_delay: Duration::ZERO,
        max_delay: Duration::ZERO,
        backoff_multiplier: 1.0,
    };

    pub fn new(
        max_retries: u32,
        initial_delay: Duration,
        max_delay: Duration,
        backoff_multiplier: f64,
    ) -> Self {
        Self {
            max_retries,
            initial_delay,
            max_delay,
            backoff_multiplier,
        }
    }

    /// `initial_delay * backoff_multiplier^attempt`, capped at `max_delay`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let multiplier = self.backoff_multiplier.powi(attempt as i32);
        let delay_secs = self.initial_delay.as_secs_f64() * multiplier;
        Duration::from_secs_f64(delay_secs.min(self.max_delay.as_secs_f64()))
    }

    pub fn delays(&self) -> impl Iterator<Item = Duration> + '_ {
        (0..self.max_retries).map(|attempt| self.delay_for_attempt(attempt))
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Runs `operation` until it succeeds, fails permanently, or runs out of
/// retries. The last error is returned in the latter two cases.
pub async fn retry_with_backoff<T, F, Fut>(
    config: RetryConfig,
    mut operation: F,
) -> Result<T, GitHubApiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, GitHubApiError>>,
{
    let mut delays = config.delays();
    let mut attempt = 1u32;

    loop {
        let e = match operation().await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };
        if !e.kind.is_retriable() {
            return Err(e);
        }
        let Some(delay) = delays.next() else {
            return Err(e);
        };
        debug!(attempt, delay_ms = delay.as_millis() as u64, error = %e, "retrying GitHub call");
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}
