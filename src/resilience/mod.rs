//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Remote call (ledger RPC, key-value store):
//!     → backoff.rs (attempt loop, total budget, pacing)
//!     → context.rs (per-attempt deadline, caller cancellation)
//!     → On failure: classifier.rs (retryable marker / transient transport?)
//!     → Terminal outcome: value, or BackoffError with every attempt's cause
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every attempt has a deadline
//! - Deny by default: unknown failures stop the sequence
//! - Attempts are paced to their full timeout to avoid retry storms
//! - Nothing here is shared between sequences; each call owns its state

pub mod backoff;
pub mod classifier;
pub mod context;
pub mod parameters;
pub mod retryable;

pub use backoff::{run, run_with_classifier, BackoffError};
pub use classifier::{is_retryable, Classifier};
pub use context::{Context, ContextError};
pub use parameters::Parameters;
pub use retryable::{BoxError, ErrorLog, Retryable};
