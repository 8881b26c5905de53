//! Configuration for the signal executor
//!
//! Loaded once at startup (JSON file plus environment overrides) and passed
//! down explicitly. Nothing below this module reads files or env vars.

pub mod rpc;

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

pub use rpc::{apply_rpc_overrides, rpc_env_var};

/// Network used when a signal names none and the configured mode is unknown
pub const DEFAULT_NETWORK: &str = "testnet";

/// Keys of [`Config`] as they appear in a config file
const CONFIG_KEYS: &[&str] = &[
    "network_mode",
    "networks",
    "token_addresses",
    "auto_approve",
    "wallet",
    "risk",
    "execution",
    "timeouts",
    "ledger_path",
];

/// Environment variable holding the default wallet address
pub const WALLET_ADDRESS_ENV: &str = "WALLET_ADDRESS";

/// Environment variable holding the default private key
pub const PRIVATE_KEY_ENV: &str = "PRIVATE_KEY";

/// Static profile for one network, as written in the config file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkProfile {
    pub chain_id: u64,
    pub rpc_url: String,
    pub router_address: String,
}

/// A selected network profile together with its name
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetworkConfig {
    pub name: String,
    pub chain_id: u64,
    pub rpc_endpoint: String,
    pub router_address: String,
}

fn default_networks() -> BTreeMap<String, NetworkProfile> {
    let mut networks = BTreeMap::new();
    networks.insert(
        "testnet".to_string(),
        NetworkProfile {
            chain_id: 11_155_111, // Sepolia
            rpc_url: "https://rpc.sepolia.org".to_string(),
            router_address: "0x0000000000000000000000000000000000000000".to_string(),
        },
    );
    networks.insert(
        "mainnet".to_string(),
        NetworkProfile {
            chain_id: 1,
            rpc_url: "https://eth.llamarpc.com".to_string(),
            // Uniswap V2 router
            router_address: "0x7a250d5630B4cF539739dF2C5dAcb4c659F2488D".to_string(),
        },
    );
    networks
}

/// Risk admission thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    /// Maximum amount per single trade
    pub max_trade_amount: f64,
    /// Rolling 24h volume ceiling
    pub daily_limit: f64,
    /// Minimum seconds between admitted trades
    pub cooldown_seconds: u64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            max_trade_amount: 1000.0,
            daily_limit: 5000.0,
            cooldown_seconds: 60,
        }
    }
}

/// Swap construction parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionSettings {
    /// Slippage used when a signal omits one (0.01 = 1%)
    pub default_slippage: f64,
    /// Fixed decimals assumed when converting amounts to base units
    pub token_decimals: u8,
    /// Native balance that must remain available for gas
    pub min_gas_reserve: f64,
    pub approve_gas_limit: u64,
    pub swap_gas_limit: u64,
    /// Swap deadline, seconds from submission
    pub deadline_seconds: u64,
    /// How long to wait for an approval receipt
    pub approval_timeout_secs: u64,
    pub receipt_poll_interval_ms: u64,
}

impl Default for ExecutionSettings {
    fn default() -> Self {
        Self {
            default_slippage: 0.01,
            token_decimals: 18,
            min_gas_reserve: 0.001,
            approve_gas_limit: 60_000,
            swap_gas_limit: 250_000,
            deadline_seconds: 300,
            approval_timeout_secs: 120,
            receipt_poll_interval_ms: 1_000,
        }
    }
}

impl ExecutionSettings {
    pub fn approval_timeout(&self) -> Duration {
        Duration::from_secs(self.approval_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.receipt_poll_interval_ms)
    }
}

/// Per-stage timeouts used by the router
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub risk_check_ms: u64,
    pub execution_ms: u64,
    pub monitor_ms: u64,
    pub record_ms: u64,
    /// Ceiling for confirmation waiting inside the monitor
    pub confirmation_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            risk_check_ms: 5_000,
            execution_ms: 180_000,
            monitor_ms: 130_000,
            record_ms: 5_000,
            confirmation_secs: 120,
        }
    }
}

/// Default wallet used when a signal carries no credentials
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletSettings {
    pub address: Option<String>,
    #[serde(skip_serializing)]
    pub private_key: Option<String>,
}

impl std::fmt::Debug for WalletSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletSettings")
            .field("address", &self.address)
            .field(
                "private_key",
                &self.private_key.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Network used when a signal names none
    pub network_mode: String,
    /// Network profiles by name
    pub networks: BTreeMap<String, NetworkProfile>,
    /// Symbol to token address table (symbols are matched uppercase)
    pub token_addresses: BTreeMap<String, String>,
    /// Submit an ERC20 approval when the router allowance is short
    pub auto_approve: bool,
    pub wallet: WalletSettings,
    pub risk: RiskConfig,
    pub execution: ExecutionSettings,
    pub timeouts: TimeoutConfig,
    /// Append settled trades to this JSONL file
    pub ledger_path: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            network_mode: DEFAULT_NETWORK.to_string(),
            networks: default_networks(),
            token_addresses: BTreeMap::new(),
            auto_approve: false,
            wallet: WalletSettings::default(),
            risk: RiskConfig::default(),
            execution: ExecutionSettings::default(),
            timeouts: TimeoutConfig::default(),
            ledger_path: None,
        }
    }
}

impl Config {
    /// Load from a JSON file, then apply environment overrides
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        let mut config = Self::parse(&content)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parse a JSON config document.
    ///
    /// Network profiles may also sit at the top level next to
    /// `network_mode` (`{"network_mode": "testnet", "testnet": {...}}`).
    /// Those are merged into `networks`; an entry under `networks` with the
    /// same name wins. Other unknown keys are ignored with a warning.
    pub fn parse(content: &str) -> Result<Self> {
        let mut raw: serde_json::Value = serde_json::from_str(content)?;

        let mut top_level = BTreeMap::new();
        let mut explicit = Vec::new();
        if let Some(object) = raw.as_object_mut() {
            if let Some(networks) = object.get("networks").and_then(|n| n.as_object()) {
                explicit.extend(networks.keys().cloned());
            }
            let stray: Vec<String> = object
                .keys()
                .filter(|key| !CONFIG_KEYS.contains(&key.as_str()))
                .cloned()
                .collect();
            for key in stray {
                let Some(value) = object.remove(&key) else {
                    continue;
                };
                match serde_json::from_value::<NetworkProfile>(value) {
                    Ok(profile) => {
                        top_level.insert(key, profile);
                    }
                    Err(_) => tracing::warn!(key = %key, "Ignoring unknown config key"),
                }
            }
        }

        let mut config: Config = serde_json::from_value(raw)?;
        for (name, profile) in top_level {
            if explicit.contains(&name) {
                tracing::warn!(network = %name, "Top-level profile shadowed by networks entry");
                continue;
            }
            tracing::debug!(network = %name, "Using top-level network profile");
            config.networks.insert(name, profile);
        }
        Ok(config)
    }

    /// Built-in defaults plus environment overrides
    pub fn from_env() -> Result<Self> {
        let mut config = Config::default();
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply RPC and credential overrides from a variable lookup
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        apply_rpc_overrides(&mut self.networks, &lookup);

        if let Some(address) = lookup(WALLET_ADDRESS_ENV).filter(|v| !v.is_empty()) {
            tracing::debug!("Using {} as default wallet address", WALLET_ADDRESS_ENV);
            self.wallet.address = Some(address);
        }
        if let Some(key) = lookup(PRIVATE_KEY_ENV).filter(|v| !v.is_empty()) {
            tracing::debug!("Using {} as default private key", PRIVATE_KEY_ENV);
            self.wallet.private_key = Some(key);
        }
    }

    /// Reject thresholds that would make admission meaningless
    pub fn validate(&self) -> Result<()> {
        let risk = &self.risk;
        if !(risk.max_trade_amount.is_finite() && risk.max_trade_amount >= 0.0) {
            return Err(Error::Config(
                "risk.max_trade_amount must be a non-negative number".to_string(),
            ));
        }
        if !(risk.daily_limit.is_finite() && risk.daily_limit >= 0.0) {
            return Err(Error::Config(
                "risk.daily_limit must be a non-negative number".to_string(),
            ));
        }
        if crate::risk::gate::cooldown_duration(risk.cooldown_seconds).is_none() {
            return Err(Error::Config(format!(
                "risk.cooldown_seconds out of range: {}",
                risk.cooldown_seconds
            )));
        }
        let slippage = self.execution.default_slippage;
        if !(0.0..1.0).contains(&slippage) {
            return Err(Error::Config(format!(
                "execution.default_slippage must be within [0, 1), got {}",
                slippage
            )));
        }
        if self.networks.is_empty() {
            return Err(Error::Config("no network profiles configured".to_string()));
        }
        Ok(())
    }

    /// Select a network profile by name.
    ///
    /// A missing name selects `network_mode`; an unknown name falls back to
    /// the testnet profile. Returns `None` only when the fallback is absent
    /// too.
    pub fn select_network(&self, name: Option<&str>) -> Option<NetworkConfig> {
        let requested = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(self.network_mode.as_str());

        let (name, profile) = match self.networks.get_key_value(requested) {
            Some(found) => found,
            None => {
                tracing::warn!(
                    requested = requested,
                    fallback = DEFAULT_NETWORK,
                    "Unknown network, falling back"
                );
                self.networks.get_key_value(DEFAULT_NETWORK)?
            }
        };

        Some(NetworkConfig {
            name: name.clone(),
            chain_id: profile.chain_id,
            rpc_endpoint: profile.rpc_url.clone(),
            router_address: profile.router_address.clone(),
        })
    }
}
