//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Validate → Connect store → Connect ledger → Start listener
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Cancel root context → Stop accepting → Drain → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then remote dependencies, then listener
//! - Cancelling the root context stops in-flight retry sequences

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
