//! Backoff engine: escalating per-attempt timeouts under a total budget.
//!
//! # Attempt loop
//! ```text
//! resolve parameters → deadline = min(now + total_timeout, caller deadline)
//! while now < deadline:
//!     attempt context = min(caller deadline, sequence deadline, now + timeout)
//!     run operation
//!       ok, context live          → return Ok
//!       error, not retryable      → NonRetryable
//!       caller cancelled          → DownstreamOperationCancelled
//!       otherwise                 → record, pace to the full timeout, grow timeout
//! → TotalTimeoutExpired
//! ```
//!
//! Every failure is kept and reported newest first in the terminal error.

use std::error::Error as StdError;
use std::future::Future;

use thiserror::Error;
use tokio::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

use crate::observability::metrics;
use crate::resilience::classifier::{self, Classifier};
use crate::resilience::context::{Context, ContextError};
use crate::resilience::parameters::Parameters;
use crate::resilience::retryable::{BoxError, ErrorLog};

/// Terminal failure of a retry sequence.
#[derive(Debug, Error)]
pub enum BackoffError {
    /// The operation reported a failure that must not be retried.
    #[error("non-retryable error: attempt {attempt}: error log:\n{log}")]
    NonRetryable {
        attempt: u32,
        #[source]
        log: ErrorLog,
    },

    /// The caller cancelled while the sequence was running.
    #[error("downstream canceled the operation: attempt {attempt}: error log:\n{log}")]
    DownstreamOperationCancelled {
        attempt: u32,
        #[source]
        log: ErrorLog,
    },

    /// The total budget ran out.
    #[error("total timeout expired: error log:\n{log}")]
    TotalTimeoutExpired {
        #[source]
        log: ErrorLog,
    },

    /// The supplied context could not host a single attempt.
    #[error("context error: error log:\n{log}")]
    Context {
        #[source]
        log: ErrorLog,
    },
}

impl BackoffError {
    /// Every recorded failure, newest first.
    pub fn log(&self) -> &ErrorLog {
        match self {
            BackoffError::NonRetryable { log, .. }
            | BackoffError::DownstreamOperationCancelled { log, .. }
            | BackoffError::TotalTimeoutExpired { log }
            | BackoffError::Context { log } => log,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, BackoffError::DownstreamOperationCancelled { .. })
    }

    pub fn is_total_timeout(&self) -> bool {
        matches!(self, BackoffError::TotalTimeoutExpired { .. })
    }

    fn outcome_label(&self) -> &'static str {
        match self {
            BackoffError::NonRetryable { .. } => "non_retryable",
            BackoffError::DownstreamOperationCancelled { .. } => "cancelled",
            BackoffError::TotalTimeoutExpired { .. } => "total_timeout",
            BackoffError::Context { .. } => "context_error",
        }
    }
}

/// Run `operation` until it succeeds, fails fatally, the caller cancels, or
/// the total budget is spent. Uses the default [`Classifier`].
pub async fn run<T, E, F, Fut>(
    ctx: &Context,
    params: &Parameters,
    operation: F,
) -> Result<T, BackoffError>
where
    F: FnMut(Context) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Into<BoxError>,
{
    execute(ctx, params, &|err: &(dyn StdError + 'static)| classifier::is_retryable(err), operation).await
}

/// Same as [`run`] with a caller-supplied classifier.
pub async fn run_with_classifier<T, E, F, Fut>(
    ctx: &Context,
    params: &Parameters,
    classifier: &Classifier,
    operation: F,
) -> Result<T, BackoffError>
where
    F: FnMut(Context) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Into<BoxError>,
{
    execute(ctx, params, &|err: &(dyn StdError + 'static)| classifier.is_retryable(err), operation).await
}

async fn execute<T, E, F, Fut>(
    ctx: &Context,
    params: &Parameters,
    is_retryable: &(dyn Fn(&(dyn StdError + 'static)) -> bool + Sync),
    mut operation: F,
) -> Result<T, BackoffError>
where
    F: FnMut(Context) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Into<BoxError>,
{
    let params = params.resolved();
    let budget = Instant::now() + params.total_timeout;
    let deadline = ctx.deadline().map_or(budget, |caller| caller.min(budget));

    let operation_id = Uuid::new_v4();
    let span = tracing::info_span!(parent: ctx.span(), "backoff", operation_id = %operation_id);
    let ctx = ctx.with_span(span.clone());

    let result = async move {
        match ctx.err() {
            Some(ContextError::Cancelled) => {
                return Err(BackoffError::DownstreamOperationCancelled {
                    attempt: 1,
                    log: ErrorLog::from_chronological(vec![Box::new(ContextError::Cancelled) as BoxError]),
                });
            }
            Some(err) => {
                return Err(BackoffError::Context {
                    log: ErrorLog::from_chronological(vec![Box::new(err) as BoxError]),
                });
            }
            None => {}
        }

        let mut failures: Vec<BoxError> = Vec::new();
        let mut timeouts = params.attempt_timeouts();
        let mut attempt: u32 = 1;

        while Instant::now() < deadline {
            let timeout = timeouts.peek();
            let started = Instant::now();
            tracing::debug!(
                attempt,
                timeout_ms = timeout.as_millis() as u64,
                "Running backoff-wrapped operation"
            );
            metrics::record_backoff_attempt();

            let attempt_ctx = ctx.with_deadline(deadline.min(started + timeout));
            let outcome = operation(attempt_ctx.clone()).await;
            let ctx_err = attempt_ctx.err();

            match (outcome, ctx_err) {
                (Ok(value), None) => {
                    if attempt > 1 {
                        tracing::debug!(attempt, "Backoff-wrapped operation succeeded after retries");
                    }
                    return Ok(value);
                }
                (Err(err), ctx_err) => {
                    let err: BoxError = err.into();
                    let cancelled = ctx_err == Some(ContextError::Cancelled);
                    // An attempt that only surfaced its own context's cancellation.
                    if cancelled && is_cancellation(err.as_ref()) {
                        failures.push(err);
                        return Err(BackoffError::DownstreamOperationCancelled {
                            attempt,
                            log: ErrorLog::from_chronological(failures),
                        });
                    }

                    let retryable = is_retryable(err.as_ref());
                    tracing::warn!(attempt, retryable, error = %err, "Backoff-wrapped operation failed");
                    failures.push(err);
                    if !retryable {
                        return Err(BackoffError::NonRetryable {
                            attempt,
                            log: ErrorLog::from_chronological(failures),
                        });
                    }
                    if cancelled {
                        return Err(BackoffError::DownstreamOperationCancelled {
                            attempt,
                            log: ErrorLog::from_chronological(failures),
                        });
                    }
                }
                (Ok(_), Some(ContextError::Cancelled)) => {
                    failures.push(Box::new(ContextError::Cancelled));
                    return Err(BackoffError::DownstreamOperationCancelled {
                        attempt,
                        log: ErrorLog::from_chronological(failures),
                    });
                }
                (Ok(_), Some(err)) => {
                    tracing::warn!(attempt, error = %err, "Backoff-wrapped operation outlived its attempt");
                    failures.push(Box::new(err));
                }
            }

            // Pace to the full attempt window even when the failure was fast.
            let pause = timeout
                .saturating_sub(started.elapsed())
                .min(deadline.saturating_duration_since(Instant::now()));
            if let Err(err) = ctx.sleep_or_cancel(pause).await {
                failures.push(Box::new(err));
                return Err(BackoffError::DownstreamOperationCancelled {
                    attempt,
                    log: ErrorLog::from_chronological(failures),
                });
            }

            timeouts.next();
            attempt += 1;
        }

        Err(BackoffError::TotalTimeoutExpired {
            log: ErrorLog::from_chronological(failures),
        })
    }
    .instrument(span)
    .await;

    match &result {
        Ok(_) => metrics::record_backoff_outcome("success"),
        Err(err) => metrics::record_backoff_outcome(err.outcome_label()),
    }
    result
}

/// True when `err` is, or is caused by, a context cancellation.
fn is_cancellation(err: &(dyn StdError + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(err) = current {
        if matches!(err.downcast_ref::<ContextError>(), Some(ContextError::Cancelled)) {
            return true;
        }
        current = err.source();
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::retryable::Retryable;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    fn fast_params() -> Parameters {
        Parameters {
            base_timeout: Duration::from_millis(100),
            multiplier: 2.0,
            maximum_timeout: Duration::from_millis(300),
            total_timeout: Duration::from_secs(5),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_first_attempt() {
        let calls = AtomicU32::new(0);
        let res = run(&Context::background(), &fast_params(), |_ctx| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, BoxError>(42) }
        })
        .await;
        assert_eq!(res.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_stops_immediately() {
        let calls = AtomicU32::new(0);
        let res = run(&Context::background(), &fast_params(), |_ctx| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>("invalid recipient") }
        })
        .await;

        let err = res.unwrap_err();
        assert!(matches!(err, BackoffError::NonRetryable { attempt: 1, .. }));
        assert_eq!(err.log().len(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            err.to_string(),
            "non-retryable error: attempt 1: error log:\ninvalid recipient"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_until_success() {
        let calls = AtomicU32::new(0);
        let res = run(&Context::background(), &fast_params(), |_ctx| {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if n < 4 {
                    Err(Retryable::msg(format!("flaky {n}")))
                } else {
                    Ok(n)
                }
            }
        })
        .await;
        assert_eq!(res.unwrap(), 4);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempts_are_paced_to_their_timeout() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let start = Instant::now();
        let _ = run(&Context::background(), &fast_params(), |ctx| {
            let seen = seen.clone();
            async move {
                let remaining = ctx.deadline().map(|d| d - Instant::now());
                seen.lock().unwrap().push((start.elapsed(), remaining));
                if seen.lock().unwrap().len() < 4 {
                    Err(Retryable::msg("fast failure"))
                } else {
                    Ok(())
                }
            }
        })
        .await;

        let seen = seen.lock().unwrap();
        let starts: Vec<_> = seen.iter().map(|(at, _)| *at).collect();
        assert_eq!(
            starts,
            vec![
                Duration::ZERO,
                Duration::from_millis(100),
                Duration::from_millis(300),
                Duration::from_millis(600),
            ]
        );
        let budgets: Vec<_> = seen.iter().map(|(_, b)| b.unwrap()).collect();
        assert_eq!(
            budgets,
            vec![
                Duration::from_millis(100),
                Duration::from_millis(200),
                Duration::from_millis(300),
                Duration::from_millis(300),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_total_timeout_with_hanging_operation() {
        let params = Parameters {
            base_timeout: Duration::from_secs(2),
            total_timeout: Duration::from_secs(1),
            ..Parameters::default()
        };
        let start = Instant::now();
        let err = run(&Context::background(), &params, |ctx| async move {
            ctx.done().await;
            Ok::<_, BoxError>(())
        })
        .await
        .unwrap_err();

        assert!(err.is_total_timeout());
        assert_eq!(err.log().len(), 1);
        assert_eq!(err.log().latest().unwrap().to_string(), "context deadline exceeded");
        assert!(start.elapsed() <= Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_total_timeout_reports_newest_first() {
        let params = Parameters {
            base_timeout: Duration::from_millis(100),
            multiplier: 1.0,
            maximum_timeout: Duration::from_millis(100),
            total_timeout: Duration::from_millis(350),
        };
        let calls = AtomicU32::new(0);
        let err = run(&Context::background(), &params, |_ctx| {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move { Err::<(), _>(Retryable::msg(format!("failure {n}"))) }
        })
        .await
        .unwrap_err();

        assert!(err.is_total_timeout());
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(
            err.to_string(),
            "total timeout expired: error log:\nfailure 4\nfailure 3\nfailure 2\nfailure 1"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_caller_cancellation_during_attempt() {
        let root = Context::background();
        let canceller = root.clone();
        let err = run(&root, &fast_params(), |ctx| {
            let canceller = canceller.clone();
            async move {
                canceller.cancel();
                ctx.done().await;
                Ok::<_, BoxError>(())
            }
        })
        .await
        .unwrap_err();

        assert!(err.is_cancelled());
        assert_eq!(err.log().latest().unwrap().to_string(), "context canceled");
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempt_reporting_its_cancellation() {
        let root = Context::background();
        let canceller = root.clone();
        let err = run(&root, &fast_params(), |ctx| {
            let canceller = canceller.clone();
            async move {
                canceller.cancel();
                ctx.try_run(std::future::pending::<Result<(), BoxError>>()).await
            }
        })
        .await
        .unwrap_err();

        assert!(matches!(err, BackoffError::DownstreamOperationCancelled { attempt: 1, .. }));
        assert_eq!(err.log().to_string(), "context canceled");
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_error_after_cancellation_is_non_retryable() {
        let root = Context::background();
        let canceller = root.clone();
        let err = run(&root, &fast_params(), |_ctx| {
            let canceller = canceller.clone();
            async move {
                canceller.cancel();
                Err::<(), _>("invalid recipient")
            }
        })
        .await
        .unwrap_err();

        assert!(matches!(err, BackoffError::NonRetryable { attempt: 1, .. }));
        assert_eq!(err.log().to_string(), "invalid recipient");
    }

    #[tokio::test(start_paused = true)]
    async fn test_retryable_error_after_cancellation_stops() {
        let root = Context::background();
        let canceller = root.clone();
        let calls = AtomicU32::new(0);
        let err = run(&root, &fast_params(), |_ctx| {
            calls.fetch_add(1, Ordering::SeqCst);
            let canceller = canceller.clone();
            async move {
                canceller.cancel();
                Err::<(), _>(Retryable::msg("connection reset"))
            }
        })
        .await
        .unwrap_err();

        assert!(matches!(err, BackoffError::DownstreamOperationCancelled { attempt: 1, .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_caller_deadline_caps_the_budget() {
        let ctx = Context::background().with_timeout(Duration::from_millis(250));
        let started = tokio::time::Instant::now();
        let err = run(&ctx, &fast_params(), |_ctx| async {
            Err::<(), _>(Retryable::msg("unavailable"))
        })
        .await
        .unwrap_err();

        assert!(err.is_total_timeout());
        assert!(started.elapsed() <= Duration::from_millis(250));
        assert_eq!(err.log().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_caller_cancellation_during_pause() {
        let root = Context::background();
        let canceller = root.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            canceller.cancel();
        });

        let calls = AtomicU32::new(0);
        let err = run(&root, &fast_params(), |_ctx| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(Retryable::msg("unavailable")) }
        })
        .await
        .unwrap_err();

        assert!(matches!(err, BackoffError::DownstreamOperationCancelled { attempt: 1, .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(err.log().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_caller_context_is_a_context_error() {
        let ctx = Context::background().with_timeout(Duration::from_millis(1));
        tokio::time::sleep(Duration::from_millis(5)).await;
        let err = run(&ctx, &fast_params(), |_ctx| async { Ok::<_, BoxError>(()) })
            .await
            .unwrap_err();
        assert!(matches!(err, BackoffError::Context { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_classifier() {
        #[derive(Debug, Error)]
        #[error("busy")]
        struct Busy;

        let classifier = Classifier::marker_only().with_recognizer(|e| e.is::<Busy>());
        let calls = AtomicU32::new(0);
        let res = run_with_classifier(&Context::background(), &fast_params(), &classifier, |_ctx| {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move { if n == 0 { Err(Busy) } else { Ok(()) } }
        })
        .await;
        assert!(res.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminates_within_budget() {
        let params = fast_params();
        let start = Instant::now();
        let _ = run(&Context::background(), &params, |_ctx| async {
            Err::<(), _>(Retryable::msg("always"))
        })
        .await;
        assert!(start.elapsed() <= params.total_timeout + params.maximum_timeout);
    }
}
