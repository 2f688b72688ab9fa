//! Chain-specific types and error definitions.

use thiserror::Error;

use crate::resilience::{BackoffError, Retryable};

/// Chain ID type for strong typing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChainId(pub u64);

impl From<u64> for ChainId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<ChainId> for u64 {
    fn from(id: ChainId) -> Self {
        id.0
    }
}

/// Errors reported by a ledger node.
///
/// The ledger client is the only place that interprets node error messages;
/// everything downstream matches on these variants.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The node rejected the transaction's nonce (too low, too high, reused).
    #[error("nonce conflict: {0}")]
    SequenceConflict(String),

    /// The exact transaction is already in the node's pool.
    #[error("already known: {0}")]
    AlreadyKnown(String),

    /// The node could not be reached or timed out. Safe to try again.
    #[error("rpc unavailable: {0}")]
    Unavailable(#[source] Retryable),

    /// The node refused the transaction for any other reason.
    #[error("transaction rejected: {0}")]
    Rejected(String),

    /// Malformed response or client-side failure.
    #[error("rpc error: {0}")]
    Rpc(String),
}

/// Result type for ledger calls.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Fatal failures of the funds submission pipeline, one per stage.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("failed to connect to rpc: {0}")]
    Connect(#[source] LedgerError),

    #[error("failed to read chain id from rpc: {0}")]
    ReadChainId(#[source] BackoffError),

    #[error("failed to refresh nonce: {0}")]
    RefreshNonce(#[source] BackoffError),

    #[error("failed to suggest gas price: {0}")]
    SuggestFee(#[source] BackoffError),

    #[error("failed to sign transaction: {0}")]
    Sign(#[source] alloy::signers::Error),

    #[error("failed to send transaction: {0}")]
    SendTransaction(#[source] BackoffError),
}

/// Result type for submission operations.
pub type SubmitResult<T> = Result<T, SubmitError>;

/// Errors loading the signing key.
#[derive(Debug, Error)]
pub enum WalletError {
    #[error("Invalid private key format: {0}")]
    InvalidKey(String),

    #[error("Failed to decrypt keystore {source_name}: {reason}")]
    Keystore { source_name: String, reason: String },

    #[error("Failed to stage inline keystore: {0}")]
    KeystoreStaging(#[source] std::io::Error),

    #[error("No signing key configured")]
    MissingKey,
}

pub type WalletResult<T> = Result<T, WalletError>;
