//! Retryable marker and the aggregated error log.

use std::error::Error as StdError;
use std::fmt;

/// Type-erased error as recorded by the backoff engine.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Marks the wrapped error as "may succeed if tried again".
///
/// Displays exactly like the wrapped error. `source()` yields the wrapped
/// error, so callers can still downcast to it.
pub struct Retryable {
    inner: BoxError,
}

impl Retryable {
    pub fn new<E>(err: E) -> Self
    where
        E: Into<BoxError>,
    {
        Self { inner: err.into() }
    }

    /// Retryable error from a plain message.
    pub fn msg(message: impl fmt::Display) -> Self {
        Self {
            inner: message.to_string().into(),
        }
    }

    pub fn get_ref(&self) -> &(dyn StdError + Send + Sync + 'static) {
        self.inner.as_ref()
    }

    pub fn into_inner(self) -> BoxError {
        self.inner
    }
}

impl fmt::Debug for Retryable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Retryable").field(&self.inner).finish()
    }
}

impl fmt::Display for Retryable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.inner, f)
    }
}

impl StdError for Retryable {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(self.inner.as_ref())
    }
}

/// Several failures joined into one error, newest first.
///
/// Displays one failure per line. This is the multi-cause node the
/// classifier walks alongside ordinary `source()` chains.
#[derive(Debug, Default)]
pub struct ErrorLog {
    entries: Vec<BoxError>,
}

impl ErrorLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a log from failures recorded oldest first.
    pub fn from_chronological(mut failures: Vec<BoxError>) -> Self {
        failures.reverse();
        Self { entries: failures }
    }

    /// Prepend a newer failure.
    pub fn push_newest(&mut self, err: impl Into<BoxError>) {
        self.entries.insert(0, err.into());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Most recent failure.
    pub fn latest(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.entries.first().map(|e| e.as_ref())
    }

    /// Failures, newest first.
    pub fn causes(&self) -> impl Iterator<Item = &(dyn StdError + 'static)> + '_ {
        self.entries.iter().map(|e| e.as_ref() as &(dyn StdError + 'static))
    }

    /// Failures in the order the attempts happened.
    pub fn chronological(&self) -> impl Iterator<Item = &(dyn StdError + 'static)> + '_ {
        self.entries
            .iter()
            .rev()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

impl FromIterator<BoxError> for ErrorLog {
    /// Items are taken as already newest first.
    fn from_iter<I: IntoIterator<Item = BoxError>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for ErrorLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.entries.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", err)?;
        }
        Ok(())
    }
}

impl StdError for ErrorLog {}
