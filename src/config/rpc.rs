//! RPC endpoint overrides
//!
//! Endpoints in the config file can be replaced from the environment:
//! 1. Per-network env vars (`TESTNET_RPC_URL`, `MAINNET_RPC_URL`, `<NAME>_RPC_URL`) - highest priority
//! 2. `ALCHEMY_API_KEY` - builds URLs for the chains Alchemy serves
//! 3. The `rpc_url` written in the profile
//!
//! # Examples
//!
//! ```bash
//! # Option 1: Per-network URLs
//! export MAINNET_RPC_URL="https://eth-mainnet.g.alchemy.com/v2/YOUR_KEY"
//!
//! # Option 2: Single provider API key
//! export ALCHEMY_API_KEY="YOUR_KEY"
//! ```

use super::NetworkProfile;
use std::collections::BTreeMap;

/// Chain ID constants
pub mod chains {
    pub const ETHEREUM: u64 = 1;
    pub const SEPOLIA: u64 = 11_155_111;
}

const ALCHEMY_API_KEY: &str = "ALCHEMY_API_KEY";

/// Name of the env var overriding a network's endpoint
pub fn rpc_env_var(network: &str) -> String {
    let name: String = network
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect();
    format!("{}_RPC_URL", name)
}

fn alchemy_url(chain_id: u64, key: &str) -> Option<String> {
    let host = match chain_id {
        chains::ETHEREUM => "eth-mainnet",
        chains::SEPOLIA => "eth-sepolia",
        _ => return None,
    };
    Some(format!("https://{}.g.alchemy.com/v2/{}", host, key))
}

/// Resolve the endpoint overrides for every profile without applying them
pub fn rpc_overrides(
    networks: &BTreeMap<String, NetworkProfile>,
    lookup: &impl Fn(&str) -> Option<String>,
) -> BTreeMap<String, String> {
    let alchemy_key = lookup(ALCHEMY_API_KEY).filter(|k| !k.is_empty());
    let mut overrides = BTreeMap::new();

    for (name, profile) in networks {
        let var = rpc_env_var(name);
        if let Some(url) = lookup(&var).filter(|u| !u.is_empty()) {
            tracing::debug!(network = %name, "Using {} for RPC endpoint", var);
            overrides.insert(name.clone(), url);
            continue;
        }
        if let Some(url) = alchemy_key
            .as_deref()
            .and_then(|key| alchemy_url(profile.chain_id, key))
        {
            tracing::debug!(network = %name, "Building RPC endpoint from ALCHEMY_API_KEY");
            overrides.insert(name.clone(), url);
        }
    }

    overrides
}

/// Replace profile endpoints with any environment overrides
pub fn apply_rpc_overrides(
    networks: &mut BTreeMap<String, NetworkProfile>,
    lookup: &impl Fn(&str) -> Option<String>,
) {
    for (name, url) in rpc_overrides(networks, lookup) {
        if let Some(profile) = networks.get_mut(&name) {
            profile.rpc_url = url;
        }
    }
}
