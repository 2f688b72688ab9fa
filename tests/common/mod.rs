//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy::consensus::{Transaction, TxEnvelope};
use alloy::primitives::{Address, TxHash};
use async_trait::async_trait;

use eth_faucet::blockchain::types::{ChainId, LedgerError, LedgerResult};
use eth_faucet::blockchain::{LedgerClient, Submitter, Wallet};
use eth_faucet::config::FaucetConfig;
use eth_faucet::http::AppState;
use eth_faucet::lifecycle::Shutdown;
use eth_faucet::resilience::{Context, Parameters, Retryable};
use eth_faucet::security::auth::TokenVerifier;
use eth_faucet::security::rate_limit::RateLimiter;
use eth_faucet::store::MemoryStore;

/// Anvil's first account.
pub const TEST_PRIVATE_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

pub const TEST_SECRET: &str = "integration-secret";

pub const CHAIN_ID: u64 = 1337;

/// What the ledger does with the next submitted transaction.
#[derive(Debug, Clone)]
pub enum SubmitOutcome {
    /// Accept into the pool.
    Accept,
    /// Reject the nonce; the node's pending nonce becomes the given value.
    Conflict(u64),
    /// Report the transaction as already pooled.
    AlreadyKnown,
    /// Transport failure.
    Unavailable,
    /// Permanent rejection with the given message.
    Reject(&'static str),
    /// Never answer.
    Hang,
}

/// In-memory ledger that plays back scripted outcomes.
///
/// Submissions without a scripted outcome are accepted.
pub struct ScriptedLedger {
    pending_nonce: AtomicU64,
    gas_price: u128,
    submit_script: Mutex<VecDeque<SubmitOutcome>>,
    nonce_errors: Mutex<VecDeque<LedgerError>>,
    chain_id_errors: Mutex<VecDeque<LedgerError>>,
    submitted: Mutex<Vec<TxEnvelope>>,
    nonce_queries: AtomicU32,
}

impl ScriptedLedger {
    pub fn new(pending_nonce: u64) -> Self {
        Self {
            pending_nonce: AtomicU64::new(pending_nonce),
            gas_price: 1_000_000_000,
            submit_script: Mutex::new(VecDeque::new()),
            nonce_errors: Mutex::new(VecDeque::new()),
            chain_id_errors: Mutex::new(VecDeque::new()),
            submitted: Mutex::new(Vec::new()),
            nonce_queries: AtomicU32::new(0),
        }
    }

    pub fn script_submits(&self, outcomes: impl IntoIterator<Item = SubmitOutcome>) {
        self.submit_script.lock().unwrap().extend(outcomes);
    }

    pub fn fail_nonce_queries(&self, errors: impl IntoIterator<Item = LedgerError>) {
        self.nonce_errors.lock().unwrap().extend(errors);
    }

    pub fn fail_chain_id(&self, errors: impl IntoIterator<Item = LedgerError>) {
        self.chain_id_errors.lock().unwrap().extend(errors);
    }

    /// Every transaction that reached `submit`, in order.
    pub fn submitted(&self) -> Vec<TxEnvelope> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn submitted_nonces(&self) -> Vec<u64> {
        self.submitted().iter().map(|tx| tx.nonce()).collect()
    }

    pub fn nonce_queries(&self) -> u32 {
        self.nonce_queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LedgerClient for ScriptedLedger {
    async fn chain_id(&self) -> LedgerResult<ChainId> {
        if let Some(err) = self.chain_id_errors.lock().unwrap().pop_front() {
            return Err(err);
        }
        Ok(ChainId(CHAIN_ID))
    }

    async fn suggested_fee(&self) -> LedgerResult<u128> {
        Ok(self.gas_price)
    }

    async fn pending_nonce(&self, _account: Address) -> LedgerResult<u64> {
        self.nonce_queries.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.nonce_errors.lock().unwrap().pop_front() {
            return Err(err);
        }
        Ok(self.pending_nonce.load(Ordering::SeqCst))
    }

    async fn submit(&self, tx: &TxEnvelope) -> LedgerResult<TxHash> {
        self.submitted.lock().unwrap().push(tx.clone());
        let outcome = self
            .submit_script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(SubmitOutcome::Accept);

        match outcome {
            SubmitOutcome::Accept => {
                self.pending_nonce.fetch_max(tx.nonce() + 1, Ordering::SeqCst);
                Ok(*tx.tx_hash())
            }
            SubmitOutcome::Conflict(pending) => {
                self.pending_nonce.store(pending, Ordering::SeqCst);
                Err(LedgerError::SequenceConflict("nonce too low".into()))
            }
            SubmitOutcome::AlreadyKnown => Err(LedgerError::AlreadyKnown("already known".into())),
            SubmitOutcome::Unavailable => Err(LedgerError::Unavailable(Retryable::msg("connection reset by peer"))),
            SubmitOutcome::Reject(message) => Err(LedgerError::Rejected(message.into())),
            SubmitOutcome::Hang => std::future::pending().await,
        }
    }
}

/// Backoff parameters small enough for paused-clock tests.
pub fn fast_params() -> Parameters {
    Parameters {
        base_timeout: Duration::from_millis(100),
        multiplier: 2.0,
        maximum_timeout: Duration::from_millis(400),
        total_timeout: Duration::from_secs(2),
    }
}

pub fn test_wallet() -> Wallet {
    Wallet::from_private_key(TEST_PRIVATE_KEY).unwrap()
}

pub async fn connect_submitter(ledger: Arc<ScriptedLedger>) -> Submitter {
    Submitter::connect(&Context::background(), ledger, test_wallet(), fast_params())
        .await
        .unwrap()
}

pub fn test_config() -> FaucetConfig {
    let mut config = FaucetConfig::default();
    config.server.auth_secret = TEST_SECRET.to_string();
    config.redis.enabled = false;
    config.wallet.private_key = Some(TEST_PRIVATE_KEY.to_string());
    config
}

/// HTTP state over a scripted ledger and an in-memory store.
pub async fn test_state(ledger: Arc<ScriptedLedger>) -> AppState {
    test_state_with(ledger, test_config(), fast_params()).await
}

/// Same as [`test_state`] with explicit config and ledger retry budget.
pub async fn test_state_with(ledger: Arc<ScriptedLedger>, config: FaucetConfig, rpc_params: Parameters) -> AppState {
    let shutdown = Shutdown::new();
    let ctx = shutdown.context();

    let rate_limiter = RateLimiter::connect(&ctx, Arc::new(MemoryStore::new()), &config.redis.namespace, fast_params())
        .await
        .unwrap();
    let submitter = Submitter::connect(&ctx, ledger, test_wallet(), rpc_params).await.unwrap();

    AppState {
        verifier: Arc::new(TokenVerifier::new(&config.server.auth_secret)),
        config: Arc::new(config),
        submitter: Arc::new(submitter),
        rate_limiter: Arc::new(rate_limiter),
        shutdown,
    }
}
