//! Execution context handed to every backoff-wrapped operation.
//!
//! # Responsibilities
//! - Carry the caller's cancellation signal down to each attempt
//! - Bound each attempt with a firm deadline
//! - Carry the tracing span (and with it the operation correlation id)
//!
//! # Design Decisions
//! - Deadline expiry and caller cancellation are distinct errors; the
//!   backoff engine retries on the former and stops on the latter
//! - Cancellation is cooperative: operations observe the context, nothing
//!   is aborted from the outside
//! - Contexts are cheap to clone and derive (token + instant + span)

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::Span;

use crate::resilience::retryable::BoxError;

/// Why a context is done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ContextError {
    /// Someone upstream withdrew the request.
    #[error("context canceled")]
    Cancelled,

    /// The context's deadline passed.
    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

impl ContextError {
    /// True for the deadline variant.
    pub fn is_deadline(&self) -> bool {
        matches!(self, ContextError::DeadlineExceeded)
    }
}

/// Cancellation + deadline + span, passed explicitly instead of living in
/// task-local or global state.
#[derive(Debug, Clone)]
pub struct Context {
    token: CancellationToken,
    deadline: Option<Instant>,
    span: Span,
}

impl Context {
    /// A root context: never cancelled unless [`Context::cancel`] is called,
    /// no deadline, attached to the current span.
    pub fn background() -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: None,
            span: Span::current(),
        }
    }

    /// Root context driven by an existing token (e.g. the shutdown token).
    pub fn from_token(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
            span: Span::current(),
        }
    }

    /// Derive a child that is cancelled with the parent but can also be
    /// cancelled on its own.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
            span: self.span.clone(),
        }
    }

    /// Derive a child whose deadline is `timeout` from now, or the parent's
    /// deadline if that comes first.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Derive a child with the given deadline, never extending the parent's.
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(parent) => parent.min(deadline),
            None => deadline,
        };
        Self {
            token: self.token.child_token(),
            deadline: Some(deadline),
            span: self.span.clone(),
        }
    }

    /// Same context, different span.
    pub fn with_span(&self, span: Span) -> Self {
        Self {
            token: self.token.clone(),
            deadline: self.deadline,
            span,
        }
    }

    /// Cancel this context and every context derived from it.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// `None` while the context is live.
    ///
    /// Cancellation wins over deadline expiry when both hold.
    pub fn err(&self) -> Option<ContextError> {
        if self.token.is_cancelled() {
            return Some(ContextError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(ContextError::DeadlineExceeded),
            _ => None,
        }
    }

    /// Resolves once the context is cancelled or its deadline passes.
    pub async fn done(&self) -> ContextError {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    biased;
                    _ = self.token.cancelled() => ContextError::Cancelled,
                    _ = tokio::time::sleep_until(deadline) => ContextError::DeadlineExceeded,
                }
            }
            None => {
                self.token.cancelled().await;
                ContextError::Cancelled
            }
        }
    }

    /// Drive `fut` until it completes or the context is done.
    pub async fn run<F>(&self, fut: F) -> Result<F::Output, ContextError>
    where
        F: Future,
    {
        if let Some(err) = self.err() {
            return Err(err);
        }
        tokio::select! {
            biased;
            err = self.done() => Err(err),
            out = fut => Ok(out),
        }
    }

    /// [`run`](Self::run) for fallible futures: the context error and the
    /// future's own error both come back as a [`BoxError`].
    pub async fn try_run<T, E, F>(&self, fut: F) -> Result<T, BoxError>
    where
        F: Future<Output = Result<T, E>>,
        E: Into<BoxError>,
    {
        self.run(fut).await?.map_err(Into::into)
    }

    /// Sleep for `duration` unless cancelled first. Ignores the deadline.
    pub(crate) async fn sleep_or_cancel(&self, duration: Duration) -> Result<(), ContextError> {
        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(ContextError::Cancelled),
            _ = tokio::time::sleep(duration) => Ok(()),
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}
