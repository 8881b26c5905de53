//! Signing key holder for a single swap.
//!
//! The raw key is parsed straight into a local signer and dropped; only the
//! derived address and an [`EthereumWallet`] survive. Neither type here
//! serializes or prints key material.

use crate::{Error, Result};
use alloy::network::EthereumWallet;
use alloy::primitives::{Address, Bytes, U256};
use alloy::signers::local::PrivateKeySigner;
use serde::Serialize;

/// Contract call awaiting nonce, gas price and signature
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreparedTransaction {
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
    pub gas_limit: u64,
}

impl PreparedTransaction {
    /// Zero-value call to `to`
    pub fn call(to: Address, data: impl Into<Bytes>, gas_limit: u64) -> Self {
        Self {
            to,
            data: data.into(),
            value: U256::ZERO,
            gas_limit,
        }
    }
}

pub struct SecureWallet {
    address: Address,
    wallet: EthereumWallet,
}

impl SecureWallet {
    /// Parse a hex key, with or without `0x`
    pub fn from_hex(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let hex = trimmed.strip_prefix("0x").unwrap_or(trimmed);

        let signer = hex
            .parse::<PrivateKeySigner>()
            .map_err(|e| Error::Wallet(format!("malformed private key: {}", e)))?;

        Ok(Self {
            address: signer.address(),
            wallet: EthereumWallet::from(signer),
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// EIP-55 form, for logs and results
    pub fn address_string(&self) -> String {
        self.address.to_checksum(None)
    }

    /// True when `claimed` is the address this key signs for
    pub fn is_owner(&self, claimed: Address) -> bool {
        self.address == claimed
    }

    /// Signing handle for transaction building
    pub fn wallet(&self) -> &EthereumWallet {
        &self.wallet
    }
}

impl std::fmt::Debug for SecureWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecureWallet")
            .field("address", &self.address)
            .field("signer", &"[REDACTED]")
            .finish()
    }
}
