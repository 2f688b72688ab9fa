//! Retryable-error classification.
//!
//! # Responsibilities
//! - Decide whether a failed attempt is worth repeating
//! - Look through caller wrapping layers (`source()` chains)
//! - Look through aggregated errors ([`ErrorLog`])
//!
//! # Design Decisions
//! - Deny by default: only marked or recognized transient errors retry
//! - Any retryable branch of an aggregate is sufficient
//! - Recognizers are plain predicates over `&dyn Error`; new transient sources
//!   register with [`Classifier::with_recognizer`], the traversal never changes
//! - A finished retry sequence ([`BackoffError`]) is opaque: an outer
//!   sequence never re-runs work an inner one already gave up on

use std::error::Error as StdError;
use std::io;
use std::sync::{Arc, OnceLock};

use crate::resilience::backoff::BackoffError;
use crate::resilience::context::ContextError;
use crate::resilience::retryable::{ErrorLog, Retryable};

/// Recognizes a single node of an error graph as transient.
pub type Recognizer = Arc<dyn Fn(&(dyn StdError + 'static)) -> bool + Send + Sync>;

/// Set of recognizers applied depth-first over an error graph.
#[derive(Clone)]
pub struct Classifier {
    recognizers: Vec<Recognizer>,
}

impl Classifier {
    /// Classifier that only honours the [`Retryable`] marker.
    pub fn marker_only() -> Self {
        Self {
            recognizers: vec![Arc::new(is_marker) as Recognizer],
        }
    }

    /// Register an additional transient-error recognizer.
    pub fn with_recognizer<F>(mut self, recognizer: F) -> Self
    where
        F: Fn(&(dyn StdError + 'static)) -> bool + Send + Sync + 'static,
    {
        self.recognizers.push(Arc::new(recognizer));
        self
    }

    pub fn is_retryable(&self, err: &(dyn StdError + 'static)) -> bool {
        self.visit(err)
    }

    fn visit(&self, err: &(dyn StdError + 'static)) -> bool {
        if self.recognizers.iter().any(|recognizer| recognizer(err)) {
            return true;
        }

        if err.downcast_ref::<BackoffError>().is_some() {
            return false;
        }

        if let Some(log) = err.downcast_ref::<ErrorLog>() {
            return log.causes().any(|cause| self.visit(cause));
        }

        match err.source() {
            Some(cause) => self.visit(cause),
            None => false,
        }
    }
}

impl Default for Classifier {
    /// Marker, transient I/O kinds, reqwest connect/timeout failures and
    /// attempt deadline expiry.
    fn default() -> Self {
        Self::marker_only()
            .with_recognizer(is_transient_io)
            .with_recognizer(is_transient_http)
            .with_recognizer(is_deadline_exceeded)
    }
}

impl std::fmt::Debug for Classifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Classifier")
            .field("recognizers", &self.recognizers.len())
            .finish()
    }
}

/// Classify with the default recognizer set.
pub fn is_retryable(err: &(dyn StdError + 'static)) -> bool {
    static DEFAULT: OnceLock<Classifier> = OnceLock::new();
    DEFAULT.get_or_init(Classifier::default).is_retryable(err)
}

fn is_marker(err: &(dyn StdError + 'static)) -> bool {
    err.is::<Retryable>()
}

fn is_transient_io(err: &(dyn StdError + 'static)) -> bool {
    match err.downcast_ref::<io::Error>() {
        Some(e) => matches!(
            e.kind(),
            io::ErrorKind::ConnectionRefused
                | io::ErrorKind::ConnectionReset
                | io::ErrorKind::ConnectionAborted
                | io::ErrorKind::NotConnected
                | io::ErrorKind::BrokenPipe
                | io::ErrorKind::TimedOut
                | io::ErrorKind::Interrupted
                | io::ErrorKind::UnexpectedEof
                | io::ErrorKind::WouldBlock
        ),
        None => false,
    }
}

fn is_transient_http(err: &(dyn StdError + 'static)) -> bool {
    match err.downcast_ref::<reqwest::Error>() {
        Some(e) => e.is_connect() || e.is_timeout(),
        None => false,
    }
}

fn is_deadline_exceeded(err: &(dyn StdError + 'static)) -> bool {
    matches!(
        err.downcast_ref::<ContextError>(),
        Some(ContextError::DeadlineExceeded)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::retryable::BoxError;
    use thiserror::Error;

    #[derive(Debug, Error)]
    #[error("layer: {0}")]
    struct Layer(#[source] BoxError);

    fn wrap(err: impl Into<BoxError>) -> Layer {
        Layer(err.into())
    }

    #[derive(Debug, Error)]
    #[error("quota exceeded")]
    struct QuotaExceeded;

    #[test]
    fn test_plain_error_not_retryable() {
        let err = io::Error::new(io::ErrorKind::InvalidData, "bad payload");
        assert!(!is_retryable(&err));
    }

    #[test]
    fn test_marker_is_retryable() {
        assert!(is_retryable(&Retryable::msg("try again")));
    }

    #[test]
    fn test_marker_seen_through_two_layers() {
        let err = wrap(wrap(Retryable::msg("flaky")));
        assert_eq!(err.to_string(), "layer: layer: flaky");
        assert!(is_retryable(&err));
    }

    #[test]
    fn test_aggregate_with_one_retryable_branch() {
        let log: ErrorLog = vec![
            BoxError::from("permanent"),
            Box::new(wrap(Retryable::msg("transient"))) as BoxError,
        ]
        .into_iter()
        .collect();
        assert!(is_retryable(&log));
    }

    #[test]
    fn test_aggregate_without_retryable_branch() {
        let log: ErrorLog = vec![BoxError::from("permanent"), BoxError::from("also permanent")]
            .into_iter()
            .collect();
        assert!(!is_retryable(&log));
    }

    #[test]
    fn test_aggregate_nested_in_wrapper() {
        let log: ErrorLog = vec![Box::new(Retryable::msg("x")) as BoxError].into_iter().collect();
        assert!(is_retryable(&wrap(log)));
    }

    #[test]
    fn test_transient_io_kinds() {
        let refused = io::Error::new(io::ErrorKind::ConnectionRefused, "refused");
        assert!(is_retryable(&refused));
        assert!(is_retryable(&wrap(refused)));

        let denied = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        assert!(!is_retryable(&denied));
    }

    #[test]
    fn test_context_errors() {
        assert!(is_retryable(&ContextError::DeadlineExceeded));
        assert!(!is_retryable(&ContextError::Cancelled));
    }

    #[test]
    fn test_finished_sequence_is_opaque() {
        let log = ErrorLog::from_chronological(vec![Box::new(Retryable::msg("flaky")) as BoxError]);
        let err = BackoffError::TotalTimeoutExpired { log };
        assert!(!is_retryable(&err));
        assert!(!is_retryable(&wrap(err)));
    }

    #[test]
    fn test_custom_recognizer() {
        let classifier = Classifier::marker_only().with_recognizer(|e| e.is::<QuotaExceeded>());
        assert!(classifier.is_retryable(&wrap(QuotaExceeded)));
        assert!(!is_retryable(&QuotaExceeded));
    }
}
