//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (payout > 0, timeouts > 0)
//! - Check that addresses and URLs parse
//! - Check that the wallet has a usable key source
//!
//! Returns all validation errors, not just the first.

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::FaucetConfig;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

pub fn validate_config(config: &FaucetConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.auth_secret.is_empty() {
        errors.push(ValidationError::new("server.auth_secret", "must not be empty"));
    }
    if config.server.listen_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "server.listen_address",
            format!("'{}' is not a host:port address", config.server.listen_address),
        ));
    }
    if config.server.max_request_body_size == 0 {
        errors.push(ValidationError::new("server.max_request_body_size", "must be positive"));
    }
    if config.server.request_timeout_secs == 0 {
        errors.push(ValidationError::new("server.request_timeout_secs", "must be positive"));
    }

    if config.faucet.payout == 0 {
        errors.push(ValidationError::new("faucet.payout", "must be positive"));
    }

    if let Err(e) = config.rpc.endpoint.parse::<url::Url>() {
        errors.push(ValidationError::new(
            "rpc.endpoint",
            format!("'{}' is not a URL: {}", config.rpc.endpoint, e),
        ));
    }

    if config.redis.enabled && config.redis.url.is_empty() {
        errors.push(ValidationError::new("redis.url", "must not be empty when redis is enabled"));
    }

    let wallet = &config.wallet;
    let has_key = wallet.private_key.as_deref().is_some_and(|k| !k.trim().is_empty());
    if !has_key {
        match (&wallet.keystore, &wallet.keystore_password) {
            (None, _) => errors.push(ValidationError::new(
                "wallet",
                "missing wallet keystore or private key",
            )),
            (Some(_), None) => errors.push(ValidationError::new(
                "wallet.keystore_password",
                "missing wallet keystore password",
            )),
            (Some(_), Some(_)) => {}
        }
    }

    let observability = &config.observability;
    if observability.metrics_enabled && observability.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a host:port address", observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
