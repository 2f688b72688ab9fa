//! Metrics collection and exposition.
//!
//! # Metrics
//! - `faucet_backoff_attempts_total` (counter): attempts made by the backoff engine
//! - `faucet_backoff_outcomes_total` (counter): terminal outcomes by `outcome`
//! - `faucet_nonce_resyncs_total` (counter): nonce resynchronizations by `result`
//! - `faucet_funds_sent_total` (counter): fund submissions by `result`
//! - `faucet_rate_limited_total` (counter): fund requests refused by the rate limiter

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_backoff_attempt() {
    ::metrics::counter!("faucet_backoff_attempts_total").increment(1);
}

pub fn record_backoff_outcome(outcome: &'static str) {
    ::metrics::counter!("faucet_backoff_outcomes_total", "outcome" => outcome).increment(1);
}

pub fn record_nonce_resync(success: bool) {
    let result = if success { "ok" } else { "error" };
    ::metrics::counter!("faucet_nonce_resyncs_total", "result" => result).increment(1);
}

pub fn record_funds_sent(success: bool) {
    let result = if success { "ok" } else { "error" };
    ::metrics::counter!("faucet_funds_sent_total", "result" => result).increment(1);
}

pub fn record_rate_limited() {
    ::metrics::counter!("faucet_rate_limited_total").increment(1);
}
