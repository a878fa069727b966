//! Dial Retry Policy
//!
//! Exponential backoff with jitter for retrying a session open whose dial
//! failed. Sessions never reconnect on their own; this is a caller-side
//! policy applied before a session exists.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio_util::sync::CancellationToken;

use super::session::SessionError;
use crate::domain::streaming::StreamTopic;
use crate::infrastructure::metrics;

/// Configuration for retry behavior.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryConfig {
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound on the delay between retries.
    pub max_delay: Duration,
    /// Growth factor applied to the delay after each retry.
    pub multiplier: f64,
    /// Jitter as a fraction of the delay (0.1 = ±10%).
    pub jitter_factor: f64,
    /// Retries allowed after the first failure (0 = unlimited).
    pub max_attempts: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
            jitter_factor: 0.1,
            max_attempts: 5,
        }
    }
}

/// Backoff state for one sequence of retries.
#[derive(Debug)]
pub struct RetryPolicy {
    config: RetryConfig,
    current_delay: Duration,
    attempt_count: u32,
}

impl RetryPolicy {
    /// Create a new retry policy.
    #[must_use]
    pub const fn new(config: RetryConfig) -> Self {
        Self {
            current_delay: config.initial_delay,
            config,
            attempt_count: 0,
        }
    }

    /// Delay before the next retry, or `None` once attempts are exhausted.
    #[must_use]
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.config.max_attempts > 0 && self.attempt_count >= self.config.max_attempts {
            return None;
        }
        self.attempt_count += 1;

        let delay = self.apply_jitter(self.current_delay);

        #[allow(clippy::cast_precision_loss)]
        let scaled = (self.current_delay.as_millis() as f64 * self.config.multiplier).round();
        let next_millis = if scaled.is_finite() && scaled > 0.0 {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            {
                scaled as u128
            }
        } else {
            0
        };
        let capped = next_millis.min(self.config.max_delay.as_millis());
        self.current_delay = Duration::from_millis(u64::try_from(capped).unwrap_or(u64::MAX));

        Some(delay)
    }

    /// Retries handed out so far.
    #[must_use]
    pub const fn attempt_count(&self) -> u32 {
        self.attempt_count
    }

    fn apply_jitter(&self, duration: Duration) -> Duration {
        if self.config.jitter_factor <= 0.0 {
            return duration;
        }

        #[allow(clippy::cast_precision_loss)]
        let base_millis = duration.as_millis() as f64;
        let range = base_millis * self.config.jitter_factor;
        let jitter: f64 = rand::rng().random_range(-range..=range);
        let adjusted = (base_millis + jitter).max(1.0);

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let adjusted_millis = adjusted as u64;
        Duration::from_millis(adjusted_millis)
    }
}

/// Error type for retried opens.
#[derive(Debug, thiserror::Error)]
pub enum RetryError {
    /// The failure cannot be fixed by retrying.
    #[error("session open rejected: {0}")]
    Rejected(#[source] SessionError),

    /// Every allowed attempt failed.
    #[error("session open failed after {attempts} attempts: {last}")]
    Exhausted {
        /// Attempts made, including the first.
        attempts: u32,
        /// Error from the final attempt.
        last: SessionError,
    },

    /// Shutdown was requested while waiting to retry.
    #[error("shutdown requested while retrying")]
    Cancelled,
}

/// Run `open` until it succeeds, backing off between dial failures.
///
/// Invalid targets are returned at once. Cancelling `shutdown` aborts the
/// wait between attempts.
///
/// # Errors
///
/// Returns [`RetryError`] when the target is rejected, the attempts run out,
/// or shutdown is requested.
pub async fn open_with_retry<T, F, Fut>(
    topic: StreamTopic,
    config: RetryConfig,
    shutdown: &CancellationToken,
    mut open: F,
) -> Result<T, RetryError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, SessionError>>,
{
    let mut policy = RetryPolicy::new(config);

    loop {
        let error = match open().await {
            Ok(opened) => return Ok(opened),
            Err(e @ SessionError::InvalidTarget(_)) => return Err(RetryError::Rejected(e)),
            Err(e) => e,
        };

        let Some(delay) = policy.next_delay() else {
            return Err(RetryError::Exhausted {
                attempts: policy.attempt_count() + 1,
                last: error,
            });
        };

        tracing::warn!(
            topic = %topic,
            error = %error,
            attempt = policy.attempt_count(),
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            "Session open failed, retrying"
        );
        metrics::record_dial_retry(topic);

        tokio::select! {
            () = shutdown.cancelled() => return Err(RetryError::Cancelled),
            () = tokio::time::sleep(delay) => {}
        }
    }
}
