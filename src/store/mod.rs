//! Key-value storage for rate-limit markers.
//!
//! Values are plain strings with a time to live. Production deployments use
//! [`RedisStore`]; [`MemoryStore`] backs development and tests.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::resilience::{BackoffError, Retryable};

pub mod memory;
pub mod redis;

pub use self::memory::MemoryStore;
pub use self::redis::RedisStore;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Connection refused, dropped, or timed out. Safe to try again.
    #[error("store unavailable: {0}")]
    Unavailable(#[source] Retryable),

    #[error("redis error: {0}")]
    Redis(#[source] ::redis::RedisError),

    #[error("failed to connect to redis: {0}")]
    Connect(#[source] BackoffError),

    #[error("invalid store url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Remote key-value operations the rate limiter depends on.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Store `value` under `key`, expiring after `ttl`.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()>;

    /// `None` when the key is absent or expired.
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    async fn ping(&self) -> StoreResult<()>;
}
