//! Redis-backed key-value store shared across faucet instances.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, RedisError};

use super::{KeyValueStore, StoreError, StoreResult};
use crate::resilience::{backoff, Context, Parameters, Retryable};

/// [`KeyValueStore`] over a multiplexed, auto-reconnecting redis connection.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    /// Open `url` and establish the connection under the backoff engine.
    pub async fn connect(ctx: &Context, url: &str, params: &Parameters) -> StoreResult<Self> {
        let client = redis::Client::open(url).map_err(|err| StoreError::InvalidUrl {
            url: url.to_string(),
            reason: err.to_string(),
        })?;

        tracing::info!(redis_url = %url, "Connecting to redis...");
        let conn = backoff::run(ctx, params, |attempt: Context| {
            let client = client.clone();
            async move {
                attempt
                    .try_run(async { ConnectionManager::new(client).await.map_err(classify) })
                    .await
            }
        })
        .await
        .map_err(|err| {
            tracing::warn!(error = %err, "Failed to connect to redis");
            StoreError::Connect(err)
        })?;

        Ok(Self { conn })
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(key, value, ttl.as_secs().max(1))
            .await
            .map_err(classify)
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let mut conn = self.conn.clone();
        conn.get::<_, Option<String>>(key).await.map_err(classify)
    }

    async fn ping(&self) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        let _pong: String = redis::cmd("PING").query_async(&mut conn).await.map_err(classify)?;
        Ok(())
    }
}

/// Transport-level redis failures are retryable, command errors are not.
fn classify(err: RedisError) -> StoreError {
    if err.is_io_error() || err.is_timeout() || err.is_connection_dropped() || err.is_connection_refusal() {
        StoreError::Unavailable(Retryable::new(err))
    } else {
        StoreError::Redis(err)
    }
}
