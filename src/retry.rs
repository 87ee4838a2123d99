//! Bounded retry for provider calls.
//!
//! Only [`ProviderError::Transient`] failures are retried. Every other error propagates
//! immediately, and running out of attempts yields [`ProviderError::RetriesExhausted`] so
//! callers can tell "gave up after retrying" apart from "rejected on the first call".
//! Waits between attempts race the caller's cancellation token.

use crate::providers::ProviderError;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Attempt budget and linear backoff schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Delay multiplied by the attempt number before the next try.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Wait applied after the 1-indexed `attempt` fails: `attempt * base_delay`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }
}

/// Run `operation` under `policy`, retrying transient failures with linear backoff.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    operation: F,
) -> Result<T, ProviderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    with_retry_backoff(
        policy.max_attempts,
        |attempt| policy.backoff(attempt),
        cancel,
        operation,
    )
    .await
}

/// Run `operation` up to `max_attempts` times, sleeping `backoff(attempt)` between tries.
///
/// A server-provided `Retry-After` hint lengthens the wait but never shortens it.
/// `max_attempts` of zero behaves like one.
pub async fn with_retry_backoff<T, F, Fut, B>(
    max_attempts: u32,
    backoff: B,
    cancel: &CancellationToken,
    mut operation: F,
) -> Result<T, ProviderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
    B: Fn(u32) -> Duration,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 0;

    loop {
        if cancel.is_cancelled() {
            return Err(ProviderError::Timeout(
                "request cancelled before the provider call".into(),
            ));
        }
        attempt += 1;

        let error = match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::debug!(attempt, "Provider call succeeded after retry");
                }
                return Ok(value);
            }
            Err(error) => error,
        };

        let (reason, retry_after) = match error {
            ProviderError::Transient {
                reason,
                retry_after,
            } => (reason, retry_after),
            other => return Err(other),
        };

        if attempt >= max_attempts {
            tracing::warn!(attempts = attempt, reason = %reason, "Retry budget exhausted");
            return Err(ProviderError::RetriesExhausted {
                attempts: attempt,
                last_reason: reason,
            });
        }

        let delay = backoff(attempt).max(retry_after.unwrap_or_default());
        tracing::debug!(
            attempt,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            reason = %reason,
            "Transient provider failure; backing off"
        );

        if cancel.is_cancelled() {
            return Err(ProviderError::Timeout(
                "request cancelled while waiting to retry".into(),
            ));
        }
        tokio::select! {
            () = cancel.cancelled() => {
                return Err(ProviderError::Timeout(
                    "request cancelled while waiting to retry".into(),
                ));
            }
            () = tokio::time::sleep(delay) => {}
        }
    }
}
