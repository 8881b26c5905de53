//! Shared token registry
//!
//! Maps trading symbols to token contract addresses. Built-in mainnet
//! addresses are loaded first; the config file's `token_addresses` table
//! overrides or extends them. The registry is read-only after startup.

use crate::{Error, Result};
use alloy::primitives::{address, Address};
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

/// Well-known token addresses
pub mod addresses {
    use super::*;

    // === Ethereum Mainnet ===
    pub const USDC_ETH: Address = address!("a0b86991c6218b36c1d19d4a2e9eb0ce3606eb48");
    pub const USDT_ETH: Address = address!("dac17f958d2ee523a2206206994597c13d831ec7");
    pub const DAI_ETH: Address = address!("6b175474e89094c44da98b954eedeac495271d0f");
    pub const WETH_ETH: Address = address!("c02aaa39b223fe8d0a0e5c4f27ead9083c756cc2");
    pub const WBTC_ETH: Address = address!("2260fac5e5542a773aa44fbcfedf7c193bc2c599");

    // === Native ETH representation ===
    pub const NATIVE_ETH: Address = address!("eeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeee");
}

/// Symbol of the chain's gas currency
pub const NATIVE_SYMBOL: &str = "ETH";

/// Outcome of a token lookup. A miss is not an error at this point; the
/// caller decides whether an unresolved symbol is fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved(Address),
    Unresolved(String),
}

impl Resolution {
    pub fn address(&self) -> Option<Address> {
        match self {
            Resolution::Resolved(addr) => Some(*addr),
            Resolution::Unresolved(_) => None,
        }
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Resolution::Resolved(addr) => write!(f, "{}", addr.to_checksum(None)),
            Resolution::Unresolved(raw) => f.write_str(raw),
        }
    }
}

/// Token registry providing symbol lookups
#[derive(Debug, Clone)]
pub struct TokenRegistry {
    /// Address by uppercase symbol
    symbols: HashMap<String, Address>,
}

impl TokenRegistry {
    /// Create a new token registry with the built-in tokens
    pub fn new() -> Self {
        use addresses::*;

        let mut symbols = HashMap::new();
        symbols.insert("USDC".to_string(), USDC_ETH);
        symbols.insert("USDT".to_string(), USDT_ETH);
        symbols.insert("DAI".to_string(), DAI_ETH);
        symbols.insert("WETH".to_string(), WETH_ETH);
        symbols.insert("WBTC".to_string(), WBTC_ETH);
        symbols.insert(NATIVE_SYMBOL.to_string(), NATIVE_ETH);

        Self { symbols }
    }

    /// Built-ins plus a symbol table from configuration
    pub fn with_overrides(table: &BTreeMap<String, String>) -> Result<Self> {
        let mut registry = Self::new();
        for (symbol, raw) in table {
            let addr = Address::from_str(raw.trim()).map_err(|e| {
                Error::Config(format!("token_addresses.{}: invalid address {}: {}", symbol, raw, e))
            })?;
            registry.symbols.insert(symbol.trim().to_uppercase(), addr);
        }
        Ok(registry)
    }

    /// Resolve a symbol or address string.
    ///
    /// Address-shaped input (`0x` prefix, at least 40 chars) that parses is
    /// returned as-is; anything else is looked up by uppercase symbol.
    pub fn resolve(&self, input: &str) -> Resolution {
        let trimmed = input.trim();

        if trimmed.starts_with("0x") && trimmed.len() >= 40 {
            if let Ok(addr) = Address::from_str(trimmed) {
                return Resolution::Resolved(addr);
            }
        }

        match self.symbols.get(&trimmed.to_uppercase()) {
            Some(addr) => Resolution::Resolved(*addr),
            None => Resolution::Unresolved(input.to_string()),
        }
    }

    /// Check if an address is the native-asset placeholder
    pub fn is_native_address(&self, addr: &Address) -> bool {
        *addr == addresses::NATIVE_ETH
    }

    /// Check if a symbol or address names the native asset
    pub fn is_native(&self, input: &str) -> bool {
        let trimmed = input.trim();
        trimmed.eq_ignore_ascii_case(NATIVE_SYMBOL)
            || matches!(self.resolve(trimmed), Resolution::Resolved(addr) if self.is_native_address(&addr))
    }

    /// Known symbols, sorted
    pub fn symbols(&self) -> Vec<&str> {
        let mut symbols: Vec<&str> = self.symbols.keys().map(String::as_str).collect();
        symbols.sort_unstable();
        symbols
    }
}

impl Default for TokenRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_input_unchanged() {
        let registry = TokenRegistry::new();
        let input = "0x2260FAC5E5542a773Aa44fBCfeDf7C193bc2C599";
        assert_eq!(
            registry.resolve(input),
            Resolution::Resolved(addresses::WBTC_ETH)
        );
    }

    #[test]
    fn test_symbol_lookup_is_case_insensitive() {
        let registry = TokenRegistry::new();
        assert_eq!(
            registry.resolve("usdt"),
            Resolution::Resolved(addresses::USDT_ETH)
        );
        assert_eq!(
            registry.resolve("USDT"),
            Resolution::Resolved(addresses::USDT_ETH)
        );
    }

    #[test]
    fn test_unknown_symbol_returned_unchanged() {
        let registry = TokenRegistry::new();
        assert_eq!(
            registry.resolve("Doge"),
            Resolution::Unresolved("Doge".to_string())
        );
        // Address-shaped but not hex
        let bogus = "0xZZZZZZZZZZZZZZZZZZZZZZZZZZZZZZZZZZZZZZZZ";
        assert_eq!(
            registry.resolve(bogus),
            Resolution::Unresolved(bogus.to_string())
        );
    }

    #[test]
    fn test_overrides_replace_builtins() {
        let mut table = BTreeMap::new();
        table.insert(
            "usdt".to_string(),
            "0x509Ee0d083DdF8AC028f2a56731412edD63223B9".to_string(),
        );
        let registry = TokenRegistry::with_overrides(&table).unwrap();
        assert_eq!(
            registry.resolve("USDT"),
            Resolution::Resolved(address!("509Ee0d083DdF8AC028f2a56731412edD63223B9"))
        );
        // Built-ins still present
        assert!(registry.resolve("WBTC").address().is_some());
    }

    #[test]
    fn test_overrides_reject_bad_address() {
        let mut table = BTreeMap::new();
        table.insert("FOO".to_string(), "0x1234".to_string());
        assert!(matches!(
            TokenRegistry::with_overrides(&table),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_native_detection() {
        let registry = TokenRegistry::new();
        assert!(registry.is_native("eth"));
        assert!(registry.is_native("0xEeeeeEeeeEeEeeEeEeEeeEEEeeeeEeeeeeeeEEeE"));
        assert!(!registry.is_native("WETH"));
    }
}
