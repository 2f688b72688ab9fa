//! Backoff parameters and their defaulting rules.

use std::time::Duration;

/// Timing budget for one retry sequence.
///
/// Zero-valued fields mean "unset" and are replaced by [`Parameters::DEFAULT`]
/// when the engine resolves them; the caller's value is never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Parameters {
    /// Timeout of the first attempt.
    pub base_timeout: Duration,

    /// Growth factor applied to the attempt timeout after every failure.
    /// Values below 1.0 fall back to the default.
    pub multiplier: f64,

    /// Ceiling for any single attempt's timeout.
    pub maximum_timeout: Duration,

    /// Budget for the whole sequence, counted from the first attempt.
    pub total_timeout: Duration,
}

impl Parameters {
    pub const DEFAULT: Parameters = Parameters {
        base_timeout: Duration::from_secs(5),
        multiplier: 1.5,
        maximum_timeout: Duration::from_secs(5),
        total_timeout: Duration::from_secs(30),
    };

    /// Unset parameters except for the first attempt's timeout.
    pub fn with_base_timeout(base_timeout: Duration) -> Self {
        Self {
            base_timeout,
            ..Self::default()
        }
    }

    /// Copy with every unset field replaced by its default.
    pub fn resolved(&self) -> Parameters {
        let mut res = *self;
        if res.base_timeout.is_zero() {
            res.base_timeout = Self::DEFAULT.base_timeout;
        }
        if res.maximum_timeout.is_zero() {
            res.maximum_timeout = Self::DEFAULT.maximum_timeout;
        }
        if res.total_timeout.is_zero() {
            res.total_timeout = Self::DEFAULT.total_timeout;
        }
        // NaN fails the comparison too.
        if !(res.multiplier >= 1.0) || res.multiplier.is_infinite() {
            res.multiplier = Self::DEFAULT.multiplier;
        }
        res
    }

    /// Per-attempt timeouts this record produces, first attempt first.
    pub fn attempt_timeouts(&self) -> AttemptTimeouts {
        let params = self.resolved();
        AttemptTimeouts {
            next: params.base_timeout,
            params,
        }
    }
}

/// Endless iterator over attempt timeouts: grows by the multiplier and
/// saturates at the maximum.
#[derive(Debug, Clone)]
pub struct AttemptTimeouts {
    params: Parameters,
    next: Duration,
}

impl AttemptTimeouts {
    /// Timeout the next attempt will get, without advancing.
    pub fn peek(&self) -> Duration {
        self.next.min(self.params.maximum_timeout)
    }
}

impl Iterator for AttemptTimeouts {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        let current = self.peek();
        let ceiling = self.params.maximum_timeout;
        let grown = current.as_nanos() as f64 * self.params.multiplier;
        self.next = if grown >= ceiling.as_nanos() as f64 {
            ceiling
        } else {
            Duration::from_nanos(grown as u64)
        };
        Some(current)
    }
}
