//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (request ID, trace span)
//!     → info.rs / fund.rs (handlers)
//!     → response.rs (JSON message bodies, plain status errors)
//!     → Send to client
//! ```

pub mod fund;
pub mod info;
pub mod request;
pub mod response;
pub mod server;

pub use request::X_REQUEST_ID;
pub use server::{AppState, HttpServer};
