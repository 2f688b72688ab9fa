//! Funds submission: fee lookup, nonce issuance, signing and broadcast.
//!
//! # Pipeline
//! ```text
//! submit(to, amount)
//!     → suggested fee            (backoff, retried on transport failure)
//!     → issue nonce, sign        (signing failure is fatal)
//!     → broadcast                (backoff)
//!         nonce conflict → resync nonce, mark record stale, retry
//!                          (next attempt issues a fresh nonce and re-signs)
//!         already known  → success with the record's own hash
//! ```
//!
//! An exhausted budget means the remote state is unknown: the transaction
//! may or may not have been accepted.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use alloy::consensus::TxEnvelope;
use alloy::primitives::{Address, TxHash, U256};

use crate::blockchain::client::LedgerClient;
use crate::blockchain::nonce::NonceSequencer;
use crate::blockchain::types::{ChainId, LedgerError, SubmitError, SubmitResult};
use crate::blockchain::wallet::Wallet;
use crate::observability::metrics;
use crate::resilience::{backoff, BoxError, Context, Parameters, Retryable};

/// Sends funds from the faucet wallet.
pub struct Submitter {
    ledger: Arc<dyn LedgerClient>,
    wallet: Wallet,
    chain_id: ChainId,
    nonces: NonceSequencer,
    params: Parameters,
}

impl fmt::Debug for Submitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Submitter")
            .field("address", &self.address())
            .field("chain_id", &self.chain_id)
            .field("next_nonce", &self.nonces.current())
            .finish()
    }
}

impl Submitter {
    /// Read the chain id and the wallet's pending nonce. Fails if either
    /// cannot be obtained within the `params` budget.
    pub async fn connect(
        ctx: &Context,
        ledger: Arc<dyn LedgerClient>,
        wallet: Wallet,
        params: Parameters,
    ) -> SubmitResult<Self> {
        let chain_id = backoff::run(ctx, &params, |attempt: Context| {
            let ledger = ledger.clone();
            async move { attempt.try_run(ledger.chain_id()).await }
        })
        .await
        .map_err(SubmitError::ReadChainId)?;

        let submitter = Self {
            ledger,
            wallet,
            chain_id,
            nonces: NonceSequencer::default(),
            params,
        };
        let nonce = submitter.refresh_nonce(ctx).await?;

        tracing::info!(
            address = %submitter.address(),
            chain_id = chain_id.0,
            nonce,
            "Submitter ready"
        );
        Ok(submitter)
    }

    pub fn address(&self) -> Address {
        self.wallet.address()
    }

    pub fn chain_id(&self) -> ChainId {
        self.chain_id
    }

    pub fn nonces(&self) -> &NonceSequencer {
        &self.nonces
    }

    /// Transfer `amount` wei to `to` and return the transaction hash.
    pub async fn submit(&self, ctx: &Context, to: Address, amount: U256) -> SubmitResult<TxHash> {
        let result = self.send_funds(ctx, to, amount).await;
        metrics::record_funds_sent(result.is_ok());
        result
    }

    async fn send_funds(&self, ctx: &Context, to: Address, amount: U256) -> SubmitResult<TxHash> {
        let gas_price = backoff::run(ctx, &self.params, |attempt: Context| async move {
            attempt.try_run(self.ledger.suggested_fee()).await
        })
        .await
        .map_err(SubmitError::SuggestFee)?;

        let mut current = self.sign_next(to, amount, gas_price)?;
        let stale = AtomicBool::new(false);

        backoff::run(ctx, &self.params, |attempt: Context| {
            let prepared = if stale.swap(false, Ordering::SeqCst) {
                self.sign_next(to, amount, gas_price).map(|tx| {
                    current = tx.clone();
                    tx
                })
            } else {
                Ok(current.clone())
            };
            let stale = &stale;
            async move { self.broadcast(ctx, &attempt, prepared?, stale).await }
        })
        .await
        .map_err(SubmitError::SendTransaction)
    }

    /// One broadcast attempt.
    async fn broadcast(
        &self,
        ctx: &Context,
        attempt: &Context,
        tx: TxEnvelope,
        stale: &AtomicBool,
    ) -> Result<TxHash, BoxError> {
        let tx_hash = *tx.tx_hash();
        match attempt.run(self.ledger.submit(&tx)).await? {
            Ok(hash) => Ok(hash),
            Err(LedgerError::AlreadyKnown(message)) => {
                tracing::debug!(tx_hash = %tx_hash, node_message = %message, "Transaction already in the pool");
                Ok(tx_hash)
            }
            Err(err @ LedgerError::SequenceConflict(_)) => {
                tracing::warn!(tx_hash = %tx_hash, error = %err, "Failed to send transaction");
                self.refresh_nonce(ctx).await?;
                stale.store(true, Ordering::SeqCst);
                Err(Retryable::new(err).into())
            }
            Err(err) => {
                tracing::warn!(tx_hash = %tx_hash, error = %err, "Failed to send transaction");
                Err(err.into())
            }
        }
    }

    /// Issue a nonce and sign a transfer with it.
    fn sign_next(&self, to: Address, amount: U256, gas_price: u128) -> SubmitResult<TxEnvelope> {
        let nonce = self.nonces.issue();
        self.wallet
            .sign_transfer(self.chain_id, nonce, to, amount, gas_price)
            .map_err(SubmitError::Sign)
    }

    async fn refresh_nonce(&self, ctx: &Context) -> SubmitResult<u64> {
        let address = self.wallet.address();
        self.nonces
            .resynchronize(ctx, &self.params, |attempt: Context| async move {
                attempt.try_run(self.ledger.pending_nonce(address)).await
            })
            .await
            .map_err(SubmitError::RefreshNonce)
    }
}
