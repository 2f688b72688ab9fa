//! Token faucet backend library.
//!
//! The core is [`resilience`]: a retry engine with escalating per-attempt
//! timeouts under a total budget. [`blockchain::Submitter`] builds on it to
//! send payouts while keeping the account nonce in sync with the ledger.

pub mod blockchain;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod security;
pub mod store;

pub use blockchain::Submitter;
pub use config::schema::FaucetConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
