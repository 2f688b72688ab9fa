//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via `tracing`)
//!     → metrics.rs (counters via the `metrics` facade)
//!
//! Consumers:
//!     → stdout (pretty for development, JSON for production)
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Correlation ids ride on spans passed in the execution context; every
//!   backoff sequence opens its own `operation_id` span
//! - HTTP requests carry `x-request-id`
//! - Metrics are cheap (atomic increments) and recorded unconditionally;
//!   without an installed recorder they are no-ops

pub mod logging;
pub mod metrics;
