//! Ledger RPC client.
//!
//! # Responsibilities
//! - Connect to the JSON-RPC endpoint
//! - Query chain id, gas price and the pending nonce
//! - Broadcast signed transactions
//! - Translate node errors into [`LedgerError`] variants
//!
//! Calls are not bounded here; callers await them through their attempt
//! [`Context`](crate::resilience::Context).

use std::sync::Arc;

use alloy::consensus::TxEnvelope;
use alloy::eips::eip2718::Encodable2718;
use alloy::primitives::{Address, TxHash};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::transports::{RpcError, TransportError};
use async_trait::async_trait;

use crate::blockchain::types::{ChainId, LedgerError, LedgerResult};
use crate::resilience::Retryable;

/// Remote ledger operations the submitter depends on.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    async fn chain_id(&self) -> LedgerResult<ChainId>;

    /// Gas price the node suggests, in wei.
    async fn suggested_fee(&self) -> LedgerResult<u128>;

    /// Transaction count of `account` including pending transactions.
    async fn pending_nonce(&self, account: Address) -> LedgerResult<u64>;

    async fn submit(&self, tx: &TxEnvelope) -> LedgerResult<TxHash>;
}

/// [`LedgerClient`] over alloy's HTTP provider.
#[derive(Clone)]
pub struct AlloyLedger {
    provider: Arc<dyn Provider + Send + Sync>,
    endpoint: String,
}

impl AlloyLedger {
    /// Build a client for `endpoint`. No request is made until first use.
    pub fn connect(endpoint: &str) -> LedgerResult<Self> {
        let url: url::Url = endpoint
            .parse()
            .map_err(|e| LedgerError::Rpc(format!("Invalid RPC URL '{}': {}", endpoint, e)))?;
        let provider = Arc::new(ProviderBuilder::new().connect_http(url)) as Arc<dyn Provider + Send + Sync>;

        tracing::info!(rpc_endpoint = %endpoint, "Ledger client created");
        Ok(Self {
            provider,
            endpoint: endpoint.to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl LedgerClient for AlloyLedger {
    async fn chain_id(&self) -> LedgerResult<ChainId> {
        let id = self.provider.get_chain_id().await.map_err(classify_rpc_error)?;
        Ok(ChainId(id))
    }

    async fn suggested_fee(&self) -> LedgerResult<u128> {
        self.provider.get_gas_price().await.map_err(classify_rpc_error)
    }

    async fn pending_nonce(&self, account: Address) -> LedgerResult<u64> {
        self.provider
            .get_transaction_count(account)
            .pending()
            .await
            .map_err(classify_rpc_error)
    }

    async fn submit(&self, tx: &TxEnvelope) -> LedgerResult<TxHash> {
        let pending = self
            .provider
            .send_raw_transaction(&tx.encoded_2718())
            .await
            .map_err(classify_rpc_error)?;
        Ok(*pending.tx_hash())
    }
}

/// Map an alloy transport error onto [`LedgerError`].
pub fn classify_rpc_error(err: TransportError) -> LedgerError {
    match err {
        RpcError::ErrorResp(payload) => classify_node_message(&payload.message),
        RpcError::Transport(kind) => LedgerError::Unavailable(Retryable::new(kind)),
        other => LedgerError::Rpc(other.to_string()),
    }
}

/// Interpret a JSON-RPC error message returned by the node.
pub fn classify_node_message(message: &str) -> LedgerError {
    let lowered = message.to_ascii_lowercase();
    if lowered.contains("already known") {
        LedgerError::AlreadyKnown(message.to_string())
    } else if lowered.contains("nonce") {
        LedgerError::SequenceConflict(message.to_string())
    } else {
        LedgerError::Rejected(message.to_string())
    }
}
