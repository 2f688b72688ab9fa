//! Configuration loading from disk.
//!
//! Secrets may come from the environment instead of the file; the
//! environment wins.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::FaucetConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable holding the wallet's private key.
pub const PRIVATE_KEY_ENV_VAR: &str = "FAUCET_WALLET_PRIVATE_KEY";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors.iter().map(|e| e.to_string()).collect::<Vec<_>>().join(", ")
}

/// Load, apply environment overrides, and validate a TOML file.
pub fn load_config(path: &Path) -> Result<FaucetConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let mut config: FaucetConfig = toml::from_str(&content)?;

    apply_env_overrides(&mut config, |name| std::env::var(name).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Overlay non-empty environment values onto `config`.
pub fn apply_env_overrides<F>(config: &mut FaucetConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let get = |names: &[&str]| {
        names
            .iter()
            .filter_map(|name| lookup(name))
            .find(|value| !value.is_empty())
    };

    if let Some(secret) = get(&["FAUCET_SERVER_AUTH_SECRET", "AUTH_SECRET"]) {
        config.server.auth_secret = secret;
    }
    if let Some(endpoint) = get(&["FAUCET_RPC_ENDPOINT"]) {
        config.rpc.endpoint = endpoint;
    }
    if let Some(url) = get(&["FAUCET_REDIS_URL"]) {
        config.redis.url = url;
    }
    if let Some(key) = get(&[PRIVATE_KEY_ENV_VAR]) {
        config.wallet.private_key = Some(key);
    }
    if let Some(keystore) = get(&["FAUCET_WALLET_KEYSTORE"]) {
        config.wallet.keystore = Some(keystore.into());
    }
    if let Some(password) = get(&["FAUCET_WALLET_KEYSTORE_PASSWORD"]) {
        config.wallet.keystore_password = Some(password);
    }
}
