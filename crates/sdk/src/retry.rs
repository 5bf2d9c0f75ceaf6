//! Bounded retry and confirmation polling.
//!
//! Both loops use a fixed interval and a fixed count. Sequence conflicts are
//! the only retried failure; every other error ends the loop at once.

use std::{
    future::Future,
    sync::atomic::{AtomicU32, Ordering},
    time::Duration,
};

use backon::{ConstantBuilder, Retryable};
use tokio_util::sync::CancellationToken;

use crate::{
    config::{PollPolicy, RetryPolicy},
    error::{Result, VaultError},
    metrics::VaultMetrics,
    rpc::TransactionStatus,
};

/// Executes an async operation, retrying retryable errors with a fixed delay.
///
/// A non-retryable error is returned unchanged. Running out of attempts on a
/// retryable error yields [`VaultError::RetryExhausted`].
pub async fn with_retry<F, Fut, T>(
    policy: &RetryPolicy,
    metrics: &dyn VaultMetrics,
    method: &str,
    operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    // backon counts retries, not attempts.
    let max_retries = policy.max_attempts.saturating_sub(1) as usize;
    let backoff = ConstantBuilder::default().with_delay(policy.delay).with_max_times(max_retries);

    let failed_attempts = AtomicU32::new(0);

    operation
        .retry(backoff)
        .sleep(tokio::time::sleep)
        .when(|e: &VaultError| e.is_retryable())
        .notify(|err: &VaultError, dur: Duration| {
            let attempt = failed_attempts.fetch_add(1, Ordering::SeqCst) + 1;
            metrics.record_retry(method, attempt + 1, err.error_type());
            tracing::warn!(
                method,
                attempt,
                delay_ms = dur.as_millis() as u64,
                error = %err,
                "bad sequence, retrying with a fresh account sequence"
            );
        })
        .await
        .map_err(|e| {
            if e.is_retryable() {
                VaultError::RetryExhausted {
                    attempts: failed_attempts.load(Ordering::SeqCst) + 1,
                    last_error: e.to_string(),
                }
            } else {
                e
            }
        })
}

/// Same as [`with_retry`], but gives up with [`VaultError::Cancelled`] as soon
/// as `token` fires, including during a retry delay.
pub async fn with_retry_cancellable<F, Fut, T>(
    policy: &RetryPolicy,
    token: &CancellationToken,
    metrics: &dyn VaultMetrics,
    method: &str,
    operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    if token.is_cancelled() {
        return Err(VaultError::Cancelled);
    }

    tokio::select! {
        biased;
        () = token.cancelled() => Err(VaultError::Cancelled),
        result = with_retry(policy, metrics, method, operation) => result,
    }
}

/// Final state observed by [`poll_confirmation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOutcome {
    /// Last status returned by the node.
    pub status: TransactionStatus,
    /// Number of status lookups performed.
    pub polls: u32,
}

/// Polls a transaction until it leaves `NOT_FOUND` or the poll budget runs out.
///
/// The first lookup happens immediately; each further lookup waits
/// `policy.interval`. At most `1 + policy.max_polls` lookups are made.
///
/// # Errors
///
/// Returns the lookup's error, or [`VaultError::Cancelled`] if `token` fires.
pub async fn poll_confirmation<F, Fut>(
    policy: &PollPolicy,
    token: &CancellationToken,
    mut lookup: F,
) -> Result<PollOutcome>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<TransactionStatus>>,
{
    let mut polls = 0;
    loop {
        let status = tokio::select! {
            biased;
            () = token.cancelled() => return Err(VaultError::Cancelled),
            status = lookup() => status?,
        };
        polls += 1;

        if status != TransactionStatus::NotFound || polls > policy.max_polls {
            return Ok(PollOutcome { status, polls });
        }

        tracing::debug!(polls, "transaction not found yet, polling again");

        tokio::select! {
            biased;
            () = token.cancelled() => return Err(VaultError::Cancelled),
            () = tokio::time::sleep(policy.interval) => {},
        }
    }
}
