//! Secure wallet management
//!
//! This module handles private key storage and transaction signing.
//! Keys arrive either with a trade or from a [`CredentialProvider`], are
//! turned into a [`SecureWallet`] for the duration of one swap, and are never
//! logged or serialized.

mod signer;

pub use signer::{PreparedTransaction, SecureWallet};

use crate::config::WalletSettings;
use crate::error::TradeError;
use alloy::primitives::Address;
use secrecy::{ExposeSecret, SecretString};
use std::str::FromStr;

/// Source of the default wallet used when a trade carries no credentials
pub trait CredentialProvider: Send + Sync {
    fn default_address(&self) -> Option<String>;
    fn default_key(&self) -> Option<&SecretString>;
}

/// Credentials taken from configuration (file or `WALLET_ADDRESS`/`PRIVATE_KEY`)
#[derive(Default)]
pub struct ConfiguredCredentials {
    address: Option<String>,
    key: Option<SecretString>,
}

impl ConfiguredCredentials {
    pub fn new(address: Option<String>, key: Option<String>) -> Self {
        Self {
            address: address.filter(|a| !a.trim().is_empty()),
            key: key.filter(|k| !k.trim().is_empty()).map(SecretString::from),
        }
    }

    pub fn from_settings(settings: &WalletSettings) -> Self {
        Self::new(settings.address.clone(), settings.private_key.clone())
    }
}

impl CredentialProvider for ConfiguredCredentials {
    fn default_address(&self) -> Option<String> {
        self.address.clone()
    }

    fn default_key(&self) -> Option<&SecretString> {
        self.key.as_ref()
    }
}

impl std::fmt::Debug for ConfiguredCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfiguredCredentials")
            .field("address", &self.address)
            .field("key", &self.key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Build the signing wallet for one swap.
///
/// Trade-supplied values win; missing ones come from `provider`. The address
/// must be the one derived from the key.
pub fn resolve_credentials(
    address: Option<&str>,
    key: Option<&str>,
    provider: &dyn CredentialProvider,
) -> Result<SecureWallet, TradeError> {
    let default_address = provider.default_address();
    let address = non_empty(address).or_else(|| non_empty(default_address.as_deref()));

    let wallet = match non_empty(key) {
        Some(key) => SecureWallet::from_hex(key),
        None => match provider.default_key() {
            Some(secret) => SecureWallet::from_hex(secret.expose_secret()),
            None => {
                return Err(TradeError::Configuration(
                    "private key is required but none was provided or configured".to_string(),
                ))
            }
        },
    }
    .map_err(|e| TradeError::Configuration(e.to_string()))?;

    let address = address.ok_or_else(|| {
        TradeError::Configuration(
            "wallet address is required but none was provided or configured".to_string(),
        )
    })?;
    let address = Address::from_str(address)
        .map_err(|e| TradeError::Configuration(format!("invalid wallet address: {}", e)))?;

    if !wallet.is_owner(address) {
        return Err(TradeError::Configuration(format!(
            "wallet address {} does not match private key",
            address.to_checksum(None)
        )));
    }

    Ok(wallet)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const TEST_ADDRESS: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";
    // Anvil's second dev account
    const OTHER_ADDRESS: &str = "0x70997970c51812dc3a010c7d01b50e0d17dc79c8";

    #[test]
    fn test_trade_credentials_win() {
        let provider = ConfiguredCredentials::default();
        let wallet = resolve_credentials(Some(TEST_ADDRESS), Some(TEST_KEY), &provider).unwrap();
        assert_eq!(wallet.address(), Address::from_str(TEST_ADDRESS).unwrap());
    }

    #[test]
    fn test_falls_back_to_provider() {
        let provider =
            ConfiguredCredentials::new(Some(TEST_ADDRESS.to_string()), Some(TEST_KEY.to_string()));
        let wallet = resolve_credentials(None, Some(""), &provider).unwrap();
        assert_eq!(wallet.address(), Address::from_str(TEST_ADDRESS).unwrap());
    }

    #[test]
    fn test_missing_credentials() {
        let provider = ConfiguredCredentials::default();

        let err = resolve_credentials(Some(TEST_ADDRESS), None, &provider).unwrap_err();
        assert!(matches!(err, TradeError::Configuration(ref m) if m.contains("private key")));

        let err = resolve_credentials(None, Some(TEST_KEY), &provider).unwrap_err();
        assert!(matches!(err, TradeError::Configuration(ref m) if m.contains("wallet address")));
    }

    #[test]
    fn test_mismatched_address() {
        let provider = ConfiguredCredentials::default();
        let err = resolve_credentials(Some(OTHER_ADDRESS), Some(TEST_KEY), &provider).unwrap_err();
        assert!(matches!(err, TradeError::Configuration(ref m) if m.contains("does not match")));
    }

    #[test]
    fn test_malformed_key() {
        let provider = ConfiguredCredentials::default();
        let err = resolve_credentials(Some(TEST_ADDRESS), Some("0xnothex"), &provider).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::ConfigurationError);
    }

    #[test]
    fn test_debug_redacts_key() {
        let provider = ConfiguredCredentials::new(None, Some(TEST_KEY.to_string()));
        let debug = format!("{:?}", provider);
        assert!(!debug.contains("ac0974bec"));
    }
}
