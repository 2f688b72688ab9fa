//! Store-backed rate limiting for fund requests.
//!
//! A key is registered with the time of the payout and expires after its
//! interval. A request is allowed once every one of its keys' intervals has
//! passed; the caller then registers all of them again.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use thiserror::Error;

use crate::observability::metrics;
use crate::resilience::{backoff, BackoffError, Context, Parameters};
use crate::store::KeyValueStore;

#[derive(Debug, Error)]
pub enum RateLimitError {
    #[error("rate-limit store failed: {0}")]
    Store(#[source] BackoffError),

    #[error("invalid timestamp stored under '{key}': {value}")]
    CorruptValue { key: String, value: String },
}

pub struct RateLimiter {
    store: Arc<dyn KeyValueStore>,
    prefix: String,
    params: Parameters,
}

impl RateLimiter {
    /// Ping the store under the backoff engine; fails if it never answers.
    pub async fn connect(
        ctx: &Context,
        store: Arc<dyn KeyValueStore>,
        namespace: &str,
        params: Parameters,
    ) -> Result<Self, RateLimitError> {
        backoff::run(ctx, &params, |attempt: Context| {
            let store = store.clone();
            async move { attempt.try_run(store.ping()).await }
        })
        .await
        .map_err(RateLimitError::Store)?;

        let prefix = if namespace.is_empty() {
            String::new()
        } else {
            format!("{namespace}:")
        };
        Ok(Self { store, prefix, params })
    }

    /// Mark `key` as used now, for `expiration`.
    pub async fn register(&self, ctx: &Context, key: &str, expiration: Duration) -> Result<(), RateLimitError> {
        let key = self.namespaced(key);
        let value = unix_now().as_secs().to_string();
        backoff::run(ctx, &self.params, |attempt: Context| {
            let (key, value) = (&key, &value);
            async move { attempt.try_run(self.store.set(key, value, expiration)).await }
        })
        .await
        .map_err(RateLimitError::Store)
    }

    /// When `key` was last registered, as seconds since the unix epoch.
    pub async fn is_registered(&self, ctx: &Context, key: &str) -> Result<Option<u64>, RateLimitError> {
        let key = self.namespaced(key);
        let stored = backoff::run(ctx, &self.params, |attempt: Context| {
            let key = &key;
            async move { attempt.try_run(self.store.get(key)).await }
        })
        .await
        .map_err(RateLimitError::Store)?;

        match stored {
            None => Ok(None),
            Some(value) => value
                .parse::<u64>()
                .map(Some)
                .map_err(|_| RateLimitError::CorruptValue { key, value }),
        }
    }

    /// Time left until every key's interval has passed. Registers all keys
    /// when nothing is left to wait.
    pub async fn check_and_register(
        &self,
        ctx: &Context,
        keys: &[(String, Duration)],
    ) -> Result<Option<Duration>, RateLimitError> {
        let now = unix_now();
        let mut next_allowed = now;
        for (key, interval) in keys {
            if let Some(registered_at) = self.is_registered(ctx, key).await? {
                let allowed_at = Duration::from_secs(registered_at) + *interval;
                next_allowed = next_allowed.max(allowed_at);
            }
        }

        let wait = next_allowed.saturating_sub(now);
        if !wait.is_zero() {
            metrics::record_rate_limited();
            return Ok(Some(wait));
        }

        for (key, interval) in keys {
            self.register(ctx, key, *interval).await?;
        }
        Ok(None)
    }

    fn namespaced(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }
}

fn unix_now() -> Duration {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default()
}

/// Render a wait like `14m59s`, rounded to whole seconds.
pub fn format_wait(wait: Duration) -> String {
    let total = (wait.as_millis() + 500) / 1000;
    let (hours, minutes, seconds) = (total / 3600, (total / 60) % 60, total % 60);
    if hours > 0 {
        format!("{hours}h{minutes}m{seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m{seconds}s")
    } else {
        format!("{seconds}s")
    }
}
