//! Signing key management.
//!
//! # Security
//! - The key comes from the config (possibly overridden by the environment)
//!   or from an encrypted keystore, given as a path or as inline JSON
//! - Keys are never logged or serialized

use std::io::Write;
use std::path::Path;

use alloy::consensus::{SignableTransaction, TxEnvelope, TxLegacy};
use alloy::network::TxSignerSync;
use alloy::primitives::{Address, Bytes, TxKind, U256};
use alloy::signers::local::PrivateKeySigner;
use tempfile::NamedTempFile;

use crate::blockchain::types::{ChainId, WalletError, WalletResult};
use crate::config::schema::WalletConfig;

/// Gas limit of a plain value transfer.
pub const TRANSFER_GAS_LIMIT: u64 = 21_000;

/// The faucet's signing account.
#[derive(Debug, Clone)]
pub struct Wallet {
    signer: PrivateKeySigner,
}

impl Wallet {
    /// Create a wallet from a hex-encoded private key string (with or
    /// without 0x prefix).
    pub fn from_private_key(private_key_hex: &str) -> WalletResult<Self> {
        let key_hex = private_key_hex.trim();
        let key_hex = key_hex.strip_prefix("0x").unwrap_or(key_hex);

        let signer: PrivateKeySigner = key_hex
            .parse()
            .map_err(|e| WalletError::InvalidKey(format!("{}", e)))?;

        tracing::info!(address = %signer.address(), "Wallet initialized");
        Ok(Self { signer })
    }

    /// Decrypt a JSON keystore given either its path or its contents.
    pub fn from_keystore(keystore: &str, password: &str) -> WalletResult<Self> {
        let path = Path::new(keystore);
        if path.is_file() {
            return Self::from_keystore_file(path, password);
        }

        let mut staged = NamedTempFile::new().map_err(WalletError::KeystoreStaging)?;
        staged
            .write_all(keystore.as_bytes())
            .map_err(WalletError::KeystoreStaging)?;
        let signer = PrivateKeySigner::decrypt_keystore(staged.path(), password).map_err(|e| WalletError::Keystore {
            source_name: "<inline>".to_string(),
            reason: e.to_string(),
        })?;

        tracing::info!(address = %signer.address(), "Wallet initialized from inline keystore");
        Ok(Self { signer })
    }

    /// Decrypt a JSON keystore file.
    pub fn from_keystore_file(path: impl AsRef<Path>, password: &str) -> WalletResult<Self> {
        let path = path.as_ref();
        let signer = PrivateKeySigner::decrypt_keystore(path, password).map_err(|e| WalletError::Keystore {
            source_name: path.display().to_string(),
            reason: e.to_string(),
        })?;

        tracing::info!(address = %signer.address(), keystore = %path.display(), "Wallet initialized");
        Ok(Self { signer })
    }

    /// Use the configured private key, falling back to the keystore.
    pub fn from_config(config: &WalletConfig) -> WalletResult<Self> {
        if let Some(key) = config.private_key.as_deref().filter(|k| !k.trim().is_empty()) {
            return Self::from_private_key(key);
        }
        match (&config.keystore, &config.keystore_password) {
            (Some(keystore), Some(password)) => Self::from_keystore(keystore, password),
            _ => Err(WalletError::MissingKey),
        }
    }

    /// Get the wallet's address.
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// Build and sign a legacy EIP-155 value transfer.
    pub fn sign_transfer(
        &self,
        chain_id: ChainId,
        nonce: u64,
        to: Address,
        value: U256,
        gas_price: u128,
    ) -> alloy::signers::Result<TxEnvelope> {
        let mut tx = TxLegacy {
            chain_id: Some(chain_id.0),
            nonce,
            gas_price,
            gas_limit: TRANSFER_GAS_LIMIT,
            to: TxKind::Call(to),
            value,
            input: Bytes::new(),
        };
        let signature = self.signer.sign_transaction_sync(&mut tx)?;
        Ok(TxEnvelope::Legacy(tx.into_signed(signature)))
    }
}
