//! Bounded retry for forecast fetches.
//!
//! Foreground loads get exactly one retry after a short fixed delay;
//! background prefetch never retries. Every attempt is preceded by the
//! pre-fetch cancellation checkpoint, and the delay itself is cut short when
//! the batch is superseded.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use crate::token::BatchToken;

/// Default retry configuration
pub const DEFAULT_FOREGROUND_RETRIES: u32 = 1;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts after the first one
    pub max_retries: u32,
    /// Fixed pause before each retry
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::foreground(Duration::from_millis(DEFAULT_RETRY_DELAY_MS))
    }
}

impl RetryPolicy {
    /// One retry after `delay`.
    pub fn foreground(delay: Duration) -> Self {
        Self {
            max_retries: DEFAULT_FOREGROUND_RETRIES,
            delay,
        }
    }

    /// Single attempt.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            delay: Duration::ZERO,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.max_retries + 1
    }
}

/// How a retried operation ended.
#[derive(Debug)]
pub enum RetryOutcome<T, E> {
    Succeeded(T),
    /// Every attempt failed; carries the last error.
    Exhausted(E),
    /// The batch went stale before an attempt could start.
    Cancelled,
}

/// Run `operation` under `policy`, checking `token` before every attempt.
pub async fn with_retry<T, E, F, Fut>(
    policy: RetryPolicy,
    token: &BatchToken,
    label: &str,
    mut operation: F,
) -> RetryOutcome<T, E>
where
    E: Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut last_error = None;

    for attempt in 0..=policy.max_retries {
        if attempt > 0 {
            tracing::debug!(
                "Retrying {} (attempt {} of {}) in {:?}",
                label,
                attempt + 1,
                policy.attempts(),
                policy.delay
            );
            if !token.sleep(policy.delay).await {
                return RetryOutcome::Cancelled;
            }
        }

        if token.is_stale() {
            return RetryOutcome::Cancelled;
        }

        match operation().await {
            Ok(value) => {
                if attempt > 0 {
                    tracing::info!("{} succeeded after {} retries", label, attempt);
                }
                return RetryOutcome::Succeeded(value);
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to load {} on attempt {} of {}: {}",
                    label,
                    attempt + 1,
                    policy.attempts(),
                    e
                );
                last_error = Some(e);
            }
        }
    }

    match last_error {
        Some(e) => RetryOutcome::Exhausted(e),
        None => RetryOutcome::Cancelled,
    }
}
