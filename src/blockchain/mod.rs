//! Blockchain integration subsystem.
//!
//! # Data Flow
//! ```text
//! Config (RPC endpoint, key source)
//!     → wallet.rs (key loading, transfer signing)
//!     → client.rs (JSON-RPC calls, node error translation)
//!     → nonce.rs (per-account nonce counter)
//!     → transaction.rs (fee, sign, broadcast under backoff)
//! ```
//!
//! # Security Constraints
//! - Never log private keys or sensitive data
//! - Every RPC call runs under an attempt deadline

pub mod client;
pub mod nonce;
pub mod transaction;
pub mod types;
pub mod wallet;

pub use client::{AlloyLedger, LedgerClient};
pub use nonce::NonceSequencer;
pub use transaction::Submitter;
pub use types::{ChainId, LedgerError, SubmitError, WalletError};
pub use wallet::Wallet;
