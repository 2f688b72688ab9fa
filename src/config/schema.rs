//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.
//! Every section carries `#[serde(default)]` so a minimal file only names
//! what differs from the defaults.

use std::fmt;
use std::time::Duration;

use alloy::primitives::U256;
use serde::{Deserialize, Serialize};

use crate::observability::logging::LogFormat;
use crate::resilience::Parameters;

/// Root configuration for the faucet.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct FaucetConfig {
    /// HTTP listener and authentication.
    pub server: ServerConfig,

    /// Display names for the chain.
    pub chain: ChainConfig,

    /// Payout amount and rate-limit intervals.
    pub faucet: PayoutConfig,

    /// Ledger JSON-RPC endpoint.
    pub rpc: RpcConfig,

    /// Rate-limit store.
    pub redis: RedisConfig,

    /// Funding wallet key source.
    pub wallet: WalletConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub listen_address: String,

    /// HS256 secret shared with the token issuer.
    #[serde(skip_serializing)]
    pub auth_secret: String,

    /// Maximum request body size in bytes.
    pub max_request_body_size: usize,

    /// Upper bound on a whole request, fund submission included.
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_address: "0.0.0.0:8080".to_string(),
            auth_secret: String::new(),
            max_request_body_size: 1024,
            request_timeout_secs: 30,
        }
    }
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ChainConfig {
    pub name: String,
    pub token_symbol: String,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            name: "testnet".to_string(),
            token_symbol: "tEth".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PayoutConfig {
    /// Whole tokens sent per request.
    pub payout: u64,

    /// Minimum wait between payouts for any key.
    pub interval_secs: u64,

    /// Minimum wait between payouts to the same address.
    pub interval_address_secs: u64,

    /// Minimum wait between payouts to the same identity.
    pub interval_identity_secs: u64,

    /// Minimum wait between payouts to the same identity and address pair.
    pub interval_identity_and_address_secs: u64,
}

impl Default for PayoutConfig {
    fn default() -> Self {
        Self {
            payout: 1,
            interval_secs: 900,
            interval_address_secs: 900,
            interval_identity_secs: 900,
            interval_identity_and_address_secs: 900,
        }
    }
}

impl PayoutConfig {
    /// Payout in wei (payout × 10^18).
    pub fn payout_wei(&self) -> U256 {
        U256::from(self.payout) * U256::from(10u64).pow(U256::from(18u64))
    }

    pub fn address_interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(self.interval_address_secs))
    }

    pub fn identity_interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(self.interval_identity_secs))
    }

    pub fn identity_and_address_interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(self.interval_identity_and_address_secs))
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RpcConfig {
    /// JSON-RPC endpoint URL.
    pub endpoint: String,

    /// Timeout of the first attempt of every RPC call, in milliseconds.
    pub timeout_ms: u64,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8545".to_string(),
            timeout_ms: 5000,
        }
    }
}

impl RpcConfig {
    /// Backoff parameters for ledger calls.
    pub fn backoff(&self) -> Parameters {
        Parameters::with_base_timeout(Duration::from_millis(self.timeout_ms))
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RedisConfig {
    /// Use redis; when false an in-process store is used instead.
    pub enabled: bool,

    pub url: String,

    /// Prefix of every rate-limit key.
    pub namespace: String,

    /// Timeout of the first attempt of every store call, in milliseconds.
    pub timeout_ms: u64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url: "redis://localhost:6379".to_string(),
            namespace: "eth-faucet".to_string(),
            timeout_ms: 200,
        }
    }
}

impl RedisConfig {
    /// Backoff parameters for store calls.
    pub fn backoff(&self) -> Parameters {
        Parameters::with_base_timeout(Duration::from_millis(self.timeout_ms))
    }
}

/// Funding wallet key source. A private key wins over a keystore.
#[derive(Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct WalletConfig {
    #[serde(skip_serializing)]
    pub private_key: Option<String>,

    /// Path to an encrypted JSON keystore, or the keystore JSON itself.
    pub keystore: Option<String>,

    #[serde(skip_serializing)]
    pub keystore_password: Option<String>,
}

/// Keystore paths print as-is; inline JSON does not.
fn keystore_label(keystore: &str) -> &str {
    if keystore.trim_start().starts_with('{') {
        "<inline>"
    } else {
        keystore
    }
}

impl fmt::Debug for WalletConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletConfig")
            .field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
            .field("keystore", &self.keystore.as_deref().map(keystore_label))
            .field("keystore_password", &self.keystore_password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = FaucetConfig::default();
        assert_eq!(config.server.listen_address, "0.0.0.0:8080");
        assert_eq!(config.server.max_request_body_size, 1024);
        assert_eq!(config.chain.token_symbol, "tEth");
        assert_eq!(config.redis.namespace, "eth-faucet");
        assert_eq!(config.rpc.backoff().base_timeout, Duration::from_secs(5));
        assert_eq!(config.redis.backoff().base_timeout, Duration::from_millis(200));
    }

    #[test]
    fn test_payout_wei() {
        let faucet = PayoutConfig {
            payout: 3,
            ..PayoutConfig::default()
        };
        assert_eq!(faucet.payout_wei(), U256::from(3_000_000_000_000_000_000u128));
    }

    #[test]
    fn test_interval_takes_the_larger_value() {
        let faucet = PayoutConfig {
            interval_secs: 60,
            interval_address_secs: 3600,
            interval_identity_secs: 10,
            ..PayoutConfig::default()
        };
        assert_eq!(faucet.address_interval(), Duration::from_secs(3600));
        assert_eq!(faucet.identity_interval(), Duration::from_secs(60));
    }

    #[test]
    fn test_minimal_toml() {
        let config: FaucetConfig = toml::from_str(
            r#"
            [server]
            auth_secret = "s3cret"

            [wallet]
            private_key = "0xabc"
            "#,
        )
        .unwrap();
        assert_eq!(config.server.auth_secret, "s3cret");
        assert_eq!(config.server.listen_address, "0.0.0.0:8080");
        assert!(!format!("{:?}", config.wallet).contains("0xabc"));
    }

    #[test]
    fn test_inline_keystore_hidden_from_debug() {
        let wallet = WalletConfig {
            private_key: None,
            keystore: Some(r#" {"crypto":{"ciphertext":"5318b4d5"},"version":3}"#.into()),
            keystore_password: Some("hunter2".into()),
        };
        let debug = format!("{wallet:?}");
        assert!(debug.contains("<inline>"), "{debug}");
        assert!(!debug.contains("5318b4d5"));
        assert!(!debug.contains("hunter2"));

        let wallet = WalletConfig {
            keystore: Some("/etc/faucet/keystore.json".into()),
            ..wallet
        };
        assert!(format!("{wallet:?}").contains("/etc/faucet/keystore.json"));
    }
}
