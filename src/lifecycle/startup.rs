//! Startup orchestration.
//!
//! # Order
//! 1. Rate-limit store (redis, or in-process when disabled), pinged
//! 2. Ledger client and funding wallet
//! 3. Submitter: chain id and pending nonce read under backoff
//! 4. HTTP state
//!
//! Fail fast: any startup error is fatal. Every remote step runs under the
//! shutdown context, so a signal during startup aborts it.

use std::sync::Arc;

use thiserror::Error;

use crate::blockchain::{AlloyLedger, LedgerClient, SubmitError, Submitter, Wallet, WalletError};
use crate::config::FaucetConfig;
use crate::http::AppState;
use crate::lifecycle::Shutdown;
use crate::security::auth::TokenVerifier;
use crate::security::rate_limit::{RateLimitError, RateLimiter};
use crate::store::{KeyValueStore, MemoryStore, RedisStore, StoreError};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to initialise rate-limiter: {0}")]
    Store(#[from] StoreError),

    #[error("failed to initialise rate-limiter: {0}")]
    RateLimiter(#[from] RateLimitError),

    #[error("failed to load wallet: {0}")]
    Wallet(#[from] WalletError),

    #[error("failed to initialise transactions builder: {0}")]
    Submitter(#[from] SubmitError),
}

/// Connect every subsystem and assemble the HTTP state.
pub async fn build_state(config: FaucetConfig, shutdown: Shutdown) -> Result<AppState, StartupError> {
    let ctx = shutdown.context();

    let store: Arc<dyn KeyValueStore> = if config.redis.enabled {
        Arc::new(RedisStore::connect(&ctx, &config.redis.url, &config.redis.backoff()).await?)
    } else {
        tracing::warn!("Redis disabled; rate limits are kept in memory and lost on restart");
        Arc::new(MemoryStore::new())
    };
    let rate_limiter = RateLimiter::connect(&ctx, store, &config.redis.namespace, config.redis.backoff()).await?;

    let wallet = Wallet::from_config(&config.wallet)?;
    let ledger: Arc<dyn LedgerClient> =
        Arc::new(AlloyLedger::connect(&config.rpc.endpoint).map_err(SubmitError::Connect)?);
    let submitter = Submitter::connect(&ctx, ledger, wallet, config.rpc.backoff()).await?;

    Ok(AppState {
        verifier: Arc::new(TokenVerifier::new(&config.server.auth_secret)),
        config: Arc::new(config),
        submitter: Arc::new(submitter),
        rate_limiter: Arc::new(rate_limiter),
        shutdown,
    })
}
