//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (request ID, tracing, timeout, body limit)
//! - Bound fund requests through their execution context
//! - Bind server to listener
//! - Stop accepting and drain on shutdown

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::blockchain::Submitter;
use crate::config::FaucetConfig;
use crate::http::fund::fund_handler;
use crate::http::info::info_handler;
use crate::http::request::make_request_span;
use crate::lifecycle::Shutdown;
use crate::security::auth::TokenVerifier;
use crate::security::rate_limit::RateLimiter;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<FaucetConfig>,
    pub submitter: Arc<Submitter>,
    pub rate_limiter: Arc<RateLimiter>,
    pub verifier: Arc<TokenVerifier>,
    pub shutdown: Shutdown,
}

/// HTTP server for the faucet API.
pub struct HttpServer {
    router: Router,
    shutdown: Shutdown,
}

impl HttpServer {
    /// Create a new HTTP server around fully initialized state.
    pub fn new(state: AppState) -> Self {
        let shutdown = state.shutdown.clone();
        let router = build_router(state);
        Self { router, shutdown }
    }

    /// Run the server until shutdown is triggered and in-flight requests
    /// have finished.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let shutdown = self.shutdown.clone();
        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move { shutdown.wait().await })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Build the Axum router with all middleware layers.
///
/// `/api/fund` carries no timeout layer: its retry sequences are bounded by
/// the request context so they stop cooperatively and report every attempt.
pub fn build_router(state: AppState) -> Router {
    let server = &state.config.server;
    let middleware = ServiceBuilder::new()
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(TraceLayer::new_for_http().make_span_with(make_request_span))
        .layer(PropagateRequestIdLayer::x_request_id());
    let info_timeout = TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, server.request_timeout());
    let body_limit = DefaultBodyLimit::max(server.max_request_body_size);

    Router::new()
        .route("/api/info", get(info_handler).layer(info_timeout))
        .route("/api/fund", post(fund_handler))
        .layer(body_limit)
        .layer(middleware)
        .with_state(state)
}
