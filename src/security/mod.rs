//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! POST /api/fund:
//!     → auth.rs (bearer token, HS256 signature, expiry)
//!     → rate_limit.rs (address, identity and identity+address windows)
//!     → Pass to the submitter
//! ```
//!
//! # Design Decisions
//! - Fail closed: a request that cannot be authenticated is rejected
//! - Rate-limit windows live in the shared key-value store so several
//!   faucet instances enforce the same limits

pub mod auth;
pub mod rate_limit;

pub use auth::{FundClaims, TokenVerifier};
pub use rate_limit::RateLimiter;
