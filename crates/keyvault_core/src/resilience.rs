//! Timeout and retry wrappers for calls into the remote document store.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::constants::{DEFAULT_RETRIES, DEFAULT_RETRY_DELAY};
use crate::error::PasteError;

/// Race `operation` against a deadline.
///
/// The timer is dropped as soon as the operation settles. On expiry the
/// operation future is dropped too, which abandons the wait but cannot recall a
/// request the remote side has already accepted.
///
/// # Arguments
/// - `operation`: Future to await.
/// - `duration`: Wait budget.
/// - `message`: Text carried by the timeout error.
///
/// # Returns
/// The operation's own outcome when it settles first.
///
/// # Errors
/// Returns [`PasteError::Timeout`] when the deadline elapses first.
pub async fn with_timeout<T, F>(
    operation: F,
    duration: Duration,
    message: &str,
) -> Result<T, PasteError>
where
    F: Future<Output = Result<T, PasteError>>,
{
    match tokio::time::timeout(duration, operation).await {
        Ok(outcome) => outcome,
        Err(_) => Err(PasteError::Timeout {
            message: message.to_string(),
        }),
    }
}

/// Bounded retry budget with a fixed pause between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts allowed after the first one.
    pub retries: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: DEFAULT_RETRIES,
            delay: DEFAULT_RETRY_DELAY,
        }
    }
}

/// Run `operation`, retrying transient failures within `policy`.
///
/// Before each retry `on_transient` is invoked (the reconnect hint) and the
/// policy delay is awaited. Terminal failures and exhausted budgets return the
/// last error unchanged.
///
/// # Arguments
/// - `policy`: Retry budget and delay.
/// - `on_transient`: Hook fired before every retry.
/// - `operation`: Factory producing one attempt per call.
///
/// # Returns
/// The first successful attempt's value.
///
/// # Errors
/// Returns the failing attempt's [`PasteError`] when it is terminal or no
/// retries remain.
pub async fn retry_operation<T, Op, Fut, Hook>(
    policy: RetryPolicy,
    mut on_transient: Hook,
    mut operation: Op,
) -> Result<T, PasteError>
where
    Op: FnMut() -> Fut,
    Fut: Future<Output = Result<T, PasteError>>,
    Hook: FnMut(),
{
    let mut retries_used = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && retries_used < policy.retries => {
                retries_used += 1;
                warn!(
                    attempt = retries_used,
                    retries = policy.retries,
                    delay_ms = policy.delay.as_millis() as u64,
                    error = %err,
                    "Transient store failure, retrying"
                );
                on_transient();
                tokio::time::sleep(policy.delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{retry_operation, with_timeout, RetryPolicy};
    use crate::error::{PasteError, StoreError};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::Instant;

    fn transient() -> PasteError {
        PasteError::from(StoreError::unavailable("backend offline"))
    }

    #[tokio::test(start_paused = true)]
    async fn retry_recovers_after_two_transient_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let reconnects = AtomicU32::new(0);
        let start = Instant::now();

        let result = retry_operation(
            RetryPolicy::default(),
            || {
                reconnects.fetch_add(1, Ordering::SeqCst);
            },
            || {
                let calls = calls.clone();
                async move {
                    match calls.fetch_add(1, Ordering::SeqCst) {
                        0 | 1 => Err(transient()),
                        _ => Ok("done"),
                    }
                }
            },
        )
        .await;

        assert_eq!(result, Ok("done"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(reconnects.load(Ordering::SeqCst), 2);
        assert_eq!(start.elapsed(), Duration::from_millis(2_000));
    }

    #[tokio::test(start_paused = true)]
    async fn retry_never_repeats_permission_errors() {
        let calls = AtomicU32::new(0);
        let start = Instant::now();

        let result: Result<(), _> = retry_operation(
            RetryPolicy {
                retries: 10,
                delay: Duration::from_secs(1),
            },
            || {},
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(PasteError::from(StoreError::permission_denied("rules"))) }
            },
        )
        .await;

        assert!(matches!(result, Err(PasteError::PermissionDenied(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn retry_returns_last_transient_error_when_budget_is_spent() {
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = retry_operation(
            RetryPolicy::default(),
            || {},
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(transient()) }
            },
        )
        .await;

        assert!(matches!(result, Err(PasteError::Transient(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn retry_with_zero_budget_makes_a_single_attempt() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = retry_operation(
            RetryPolicy {
                retries: 0,
                delay: Duration::from_secs(1),
            },
            || {},
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(transient()) }
            },
        )
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_fires_exactly_at_deadline() {
        let start = Instant::now();
        let result: Result<(), _> = with_timeout(
            std::future::pending(),
            Duration::from_millis(15_000),
            "Timed out fetching paste",
        )
        .await;

        assert_eq!(
            result,
            Err(PasteError::Timeout {
                message: "Timed out fetching paste".to_string()
            })
        );
        assert_eq!(start.elapsed(), Duration::from_millis(15_000));
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_does_not_fire_before_deadline() {
        let handle = tokio::spawn(with_timeout(
            std::future::pending::<Result<(), PasteError>>(),
            Duration::from_millis(500),
            "late",
        ));
        tokio::task::yield_now().await;

        tokio::time::advance(Duration::from_millis(499)).await;
        tokio::task::yield_now().await;
        assert!(!handle.is_finished());

        tokio::time::advance(Duration::from_millis(1)).await;
        let result = handle.await.expect("join");
        assert!(matches!(result, Err(PasteError::Timeout { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_passes_through_operation_outcome() {
        let ok = with_timeout(async { Ok(7) }, Duration::from_secs(1), "late").await;
        assert_eq!(ok, Ok(7));

        let err: Result<(), _> = with_timeout(
            async { Err(PasteError::PermissionDenied("no".to_string())) },
            Duration::from_secs(1),
            "late",
        )
        .await;
        assert_eq!(err, Err(PasteError::PermissionDenied("no".to_string())));
    }
}
