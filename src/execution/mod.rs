//! Swap execution engine
//!
//! Turns an [`ExecutionRequest`] into a signed, broadcast
//! `swapExactTokensForTokens` call. Preconditions run in a fixed order and
//! each failure maps to its own [`TradeError`] variant; nothing past
//! [`SwapEngine::execute_swap`] ever sees a raw error.

pub mod failure;
pub mod units;

use crate::chain::abi::{ISwapRouter, IERC20};
use crate::chain::{wait_for_receipt, ChainClient, ChainConnections, ChainError};
use crate::config::{Config, NetworkConfig};
use crate::error::{ErrorPayload, TradeError};
use crate::tokens::{Resolution, TokenRegistry, NATIVE_SYMBOL};
use crate::wallet::{resolve_credentials, CredentialProvider, PreparedTransaction, SecureWallet};
use alloy::primitives::{Address, B256, U256};
use alloy::sol_types::SolCall;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;

pub use failure::{classify_query_error, classify_submission_error};
pub use units::{format_units, min_amount_out, to_base_units};

/// Decimals of the native gas currency
const NATIVE_DECIMALS: u8 = 18;

/// Payload accepted by the execution stage
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ExecutionRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wallet_address: Option<String>,
    #[serde(default, skip_serializing)]
    pub private_key: Option<String>,
    #[serde(default)]
    pub token_in: String,
    #[serde(default)]
    pub token_out: String,
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slippage: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
}

impl std::fmt::Debug for ExecutionRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionRequest")
            .field("wallet_address", &self.wallet_address)
            .field("private_key", &self.private_key.as_ref().map(|_| "[REDACTED]"))
            .field("token_in", &self.token_in)
            .field("token_out", &self.token_out)
            .field("amount", &self.amount)
            .field("slippage", &self.slippage)
            .field("network", &self.network)
            .finish()
    }
}

/// Result of the execution stage: `{"tx_hash": ...}` or `{"error": ..., "kind": ...}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SwapReceipt {
    Submitted { tx_hash: String },
    Failed(ErrorPayload),
}

impl SwapReceipt {
    pub fn tx_hash(&self) -> Option<&str> {
        match self {
            SwapReceipt::Submitted { tx_hash } => Some(tx_hash),
            SwapReceipt::Failed(_) => None,
        }
    }
}

/// A selected network together with its connected client
#[derive(Clone)]
pub struct NetworkHandle {
    pub config: NetworkConfig,
    pub client: Arc<dyn ChainClient>,
}

/// A trade with every input resolved, ready for transaction construction
#[derive(Debug, Clone, PartialEq)]
struct ResolvedTrade {
    token_in_address: Address,
    token_out_address: Address,
    amount_base_units: U256,
    slippage: f64,
    token_in_native: bool,
}

/// Swap execution engine
pub struct SwapEngine {
    config: Arc<Config>,
    tokens: Arc<TokenRegistry>,
    connections: Arc<ChainConnections>,
    credentials: Arc<dyn CredentialProvider>,
}

impl SwapEngine {
    pub fn new(
        config: Arc<Config>,
        tokens: Arc<TokenRegistry>,
        connections: Arc<ChainConnections>,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Self {
        Self {
            config,
            tokens,
            connections,
            credentials,
        }
    }

    /// Resolve a symbol or address; never fails
    pub fn resolve_token(&self, input: &str) -> Resolution {
        self.tokens.resolve(input)
    }

    /// Select a network profile and make sure a client is connected to it
    pub async fn get_network_config(&self, name: Option<&str>) -> Result<NetworkHandle, TradeError> {
        let config = self.config.select_network(name).ok_or_else(|| {
            TradeError::Configuration(format!(
                "no profile for network {} and no testnet fallback",
                name.unwrap_or(&self.config.network_mode)
            ))
        })?;

        let client = self
            .connections
            .client_for(&config)
            .await
            .map_err(|e| match e {
                ChainError::InvalidUrl(msg) => TradeError::Configuration(msg),
                other => classify_query_error("connect", other),
            })?;

        Ok(NetworkHandle { config, client })
    }

    /// Execute one swap. Every failure comes back as [`SwapReceipt::Failed`].
    pub async fn execute_swap(&self, request: &ExecutionRequest) -> SwapReceipt {
        match self.try_execute(request).await {
            Ok(hash) => {
                let tx_hash = format!("{:#x}", hash);
                tracing::info!(tx_hash = %tx_hash, "Swap submitted");
                SwapReceipt::Submitted { tx_hash }
            }
            Err(e) => {
                tracing::warn!(kind = ?e.kind(), error = %e, "Swap execution failed");
                SwapReceipt::Failed(ErrorPayload::from(&e))
            }
        }
    }

    async fn try_execute(&self, request: &ExecutionRequest) -> Result<B256, TradeError> {
        let wallet = resolve_credentials(
            request.wallet_address.as_deref(),
            request.private_key.as_deref(),
            self.credentials.as_ref(),
        )?;

        let trade = self.resolve_trade(request)?;

        let network = self.get_network_config(request.network.as_deref()).await?;
        tracing::info!(
            network = %network.config.name,
            chain_id = network.config.chain_id,
            wallet = %wallet.address_string(),
            token_in = %request.token_in,
            token_out = %request.token_out,
            amount = request.amount,
            "Executing swap"
        );

        self.check_balances(&network, &wallet, &trade, &request.token_in)
            .await?;

        let router = parse_router(&network.config)?;

        if self.config.auto_approve && !trade.token_in_native {
            self.ensure_allowance(&network, &wallet, &trade, router)
                .await?;
        }

        let amount_out_min = min_amount_out(trade.amount_base_units, trade.slippage);
        let deadline = chrono::Utc::now().timestamp().max(0) as u64
            + self.config.execution.deadline_seconds;

        let call = ISwapRouter::swapExactTokensForTokensCall {
            amountIn: trade.amount_base_units,
            amountOutMin: amount_out_min,
            path: vec![trade.token_in_address, trade.token_out_address],
            to: wallet.address(),
            deadline: U256::from(deadline),
        };
        let tx = PreparedTransaction::call(
            router,
            call.abi_encode(),
            self.config.execution.swap_gas_limit,
        );

        network
            .client
            .send_transaction(&wallet, tx)
            .await
            .map_err(classify_submission_error)
    }

    /// Token, amount and slippage checks; no network access
    fn resolve_trade(&self, request: &ExecutionRequest) -> Result<ResolvedTrade, TradeError> {
        let token_in = request.token_in.trim();
        let token_out = request.token_out.trim();
        if token_in.is_empty() || token_out.is_empty() {
            return Err(TradeError::Resolution(
                "input and output token addresses are required".to_string(),
            ));
        }

        let token_in_address = self.resolve_required(token_in)?;
        let token_out_address = self.resolve_required(token_out)?;

        let decimals = self.config.execution.token_decimals;
        let amount_base_units = to_base_units(request.amount, decimals)
            .ok_or_else(|| {
                TradeError::Format(format!("invalid trade amount {}", request.amount))
            })?;
        if amount_base_units.is_zero() {
            return Err(TradeError::Format(
                "trade amount must be greater than 0".to_string(),
            ));
        }

        let slippage = request
            .slippage
            .unwrap_or(self.config.execution.default_slippage);
        if !(0.0..1.0).contains(&slippage) {
            return Err(TradeError::Format(format!(
                "slippage must be within [0, 1), got {}",
                slippage
            )));
        }

        Ok(ResolvedTrade {
            token_in_address,
            token_out_address,
            amount_base_units,
            slippage,
            token_in_native: self.tokens.is_native_address(&token_in_address),
        })
    }

    fn resolve_required(&self, input: &str) -> Result<Address, TradeError> {
        match self.resolve_token(input) {
            Resolution::Resolved(addr) => Ok(addr),
            Resolution::Unresolved(raw) => Err(TradeError::Resolution(format!(
                "unknown token symbol or malformed address: {}",
                raw
            ))),
        }
    }

    async fn check_balances(
        &self,
        network: &NetworkHandle,
        wallet: &SecureWallet,
        trade: &ResolvedTrade,
        token_in_label: &str,
    ) -> Result<(), TradeError> {
        let owner = wallet.address();

        let reserve = to_base_units(self.config.execution.min_gas_reserve, NATIVE_DECIMALS)
            .unwrap_or(U256::ZERO);
        let native = network
            .client
            .native_balance(owner)
            .await
            .map_err(|e| classify_query_error("native balance query failed", e))?;
        if native < reserve {
            return Err(TradeError::InsufficientFunds {
                asset: format!("{} (gas)", NATIVE_SYMBOL),
                required: format_units(reserve, NATIVE_DECIMALS as u32),
                available: format_units(native, NATIVE_DECIMALS as u32),
            });
        }
        tracing::debug!(balance = %format_units(native, NATIVE_DECIMALS as u32), "Gas reserve check passed");

        if trade.token_in_native {
            return Ok(());
        }

        let decimals = self.config.execution.token_decimals as u32;
        let balance = network
            .client
            .token_balance(trade.token_in_address, owner)
            .await
            .map_err(|e| classify_query_error("token balance query failed", e))?;
        if balance < trade.amount_base_units {
            return Err(TradeError::InsufficientFunds {
                asset: token_in_label.to_string(),
                required: format_units(trade.amount_base_units, decimals),
                available: format_units(balance, decimals),
            });
        }
        tracing::debug!(balance = %format_units(balance, decimals), "Token balance check passed");

        Ok(())
    }

    /// Approve the router for `amount` when the current allowance is short
    async fn ensure_allowance(
        &self,
        network: &NetworkHandle,
        wallet: &SecureWallet,
        trade: &ResolvedTrade,
        router: Address,
    ) -> Result<(), TradeError> {
        let current = network
            .client
            .allowance(trade.token_in_address, wallet.address(), router)
            .await
            .map_err(|e| TradeError::Approval(format!("allowance query failed: {}", e)))?;

        if current >= trade.amount_base_units {
            tracing::debug!(allowance = %current, "Allowance sufficient");
            return Ok(());
        }

        tracing::info!(
            token = %trade.token_in_address,
            spender = %router,
            current = %current,
            "Allowance short, submitting approval"
        );

        let call = IERC20::approveCall {
            spender: router,
            amount: trade.amount_base_units,
        };
        let tx = PreparedTransaction::call(
            trade.token_in_address,
            call.abi_encode(),
            self.config.execution.approve_gas_limit,
        );

        let hash = network
            .client
            .send_transaction(wallet, tx)
            .await
            .map_err(|e| TradeError::Approval(format!("approval submission failed: {}", e)))?;

        let receipt = wait_for_receipt(
            network.client.as_ref(),
            hash,
            self.config.execution.approval_timeout(),
            self.config.execution.poll_interval(),
        )
        .await
        .map_err(|e| TradeError::Approval(format!("approval {:#x} not confirmed: {}", hash, e)))?;

        if !receipt.success {
            return Err(TradeError::Approval(format!(
                "approval transaction {:#x} reverted",
                hash
            )));
        }

        tracing::info!(tx_hash = %format!("{:#x}", hash), "Approval confirmed");
        Ok(())
    }
}

fn parse_router(network: &NetworkConfig) -> Result<Address, TradeError> {
    let router = Address::from_str(network.router_address.trim()).map_err(|e| {
        TradeError::Configuration(format!(
            "invalid router address {} for network {}: {}",
            network.router_address, network.name, e
        ))
    })?;
    if router.is_zero() {
        return Err(TradeError::Configuration(format!(
            "no router address configured for network {}",
            network.name
        )));
    }
    Ok(router)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::ChainConnector;
    use crate::error::ErrorKind;
    use crate::wallet::ConfiguredCredentials;

    const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const TEST_ADDRESS: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";

    struct Offline;

    impl ChainConnector for Offline {
        fn connect(&self, _network: &NetworkConfig) -> Result<Arc<dyn ChainClient>, ChainError> {
            Err(ChainError::Transport("offline".to_string()))
        }
    }

    fn engine() -> SwapEngine {
        let config = Arc::new(Config::default());
        SwapEngine::new(
            config,
            Arc::new(TokenRegistry::new()),
            Arc::new(ChainConnections::new(Arc::new(Offline))),
            Arc::new(ConfiguredCredentials::new(
                Some(TEST_ADDRESS.to_string()),
                Some(TEST_KEY.to_string()),
            )),
        )
    }

    fn request(token_in: &str, token_out: &str, amount: f64) -> ExecutionRequest {
        ExecutionRequest {
            token_in: token_in.to_string(),
            token_out: token_out.to_string(),
            amount,
            ..ExecutionRequest::default()
        }
    }

    fn failure(receipt: SwapReceipt) -> ErrorPayload {
        match receipt {
            SwapReceipt::Failed(payload) => payload,
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_tokens_mentions_token_addresses() {
        let engine = engine();
        let payload = failure(engine.execute_swap(&request("", "WBTC", 10.0)).await);
        assert_eq!(payload.kind, ErrorKind::ResolutionError);
        assert!(payload.error.contains("token addresses"));

        let payload = failure(engine.execute_swap(&request("USDT", " ", 10.0)).await);
        assert!(payload.error.contains("token addresses"));
    }

    #[tokio::test]
    async fn test_non_positive_amount_mentions_amount() {
        let engine = engine();
        for amount in [0.0, -5.0] {
            let payload = failure(engine.execute_swap(&request("USDT", "WBTC", amount)).await);
            assert_eq!(payload.kind, ErrorKind::FormatError);
            assert!(payload.error.contains("amount"), "{}", payload.error);
        }
    }

    #[tokio::test]
    async fn test_unknown_symbol_is_resolution_error() {
        let engine = engine();
        let payload = failure(engine.execute_swap(&request("USDT", "NOPE", 1.0)).await);
        assert_eq!(payload.kind, ErrorKind::ResolutionError);
        assert!(payload.error.contains("NOPE"));
    }

    #[tokio::test]
    async fn test_slippage_out_of_range() {
        let engine = engine();
        let mut req = request("USDT", "WBTC", 1.0);
        req.slippage = Some(1.0);
        let payload = failure(engine.execute_swap(&req).await);
        assert_eq!(payload.kind, ErrorKind::FormatError);
        assert!(payload.error.contains("slippage"));
    }

    #[tokio::test]
    async fn test_connect_failure_is_network_unavailable() {
        let engine = engine();
        let payload = failure(engine.execute_swap(&request("USDT", "WBTC", 1.0)).await);
        assert_eq!(payload.kind, ErrorKind::NetworkUnavailable);
    }

    #[tokio::test]
    async fn test_missing_credentials_is_configuration_error() {
        let engine = SwapEngine::new(
            Arc::new(Config::default()),
            Arc::new(TokenRegistry::new()),
            Arc::new(ChainConnections::new(Arc::new(Offline))),
            Arc::new(ConfiguredCredentials::default()),
        );
        let payload = failure(engine.execute_swap(&request("USDT", "WBTC", 1.0)).await);
        assert_eq!(payload.kind, ErrorKind::ConfigurationError);
    }

    #[test]
    fn test_receipt_wire_shape() {
        let ok = SwapReceipt::Submitted {
            tx_hash: "0xabc".to_string(),
        };
        assert_eq!(serde_json::to_value(&ok).unwrap()["tx_hash"], "0xabc");

        let parsed: SwapReceipt =
            serde_json::from_str(r#"{"error":"boom","kind":"approval_failure"}"#).unwrap();
        assert_eq!(
            parsed,
            SwapReceipt::Failed(ErrorPayload {
                error: "boom".to_string(),
                kind: ErrorKind::ApprovalFailure,
            })
        );

        let bare: SwapReceipt = serde_json::from_str(r#"{"error":"boom"}"#).unwrap();
        assert_eq!(bare.tx_hash(), None);
        assert!(matches!(
            bare,
            SwapReceipt::Failed(ErrorPayload {
                kind: ErrorKind::TransactionFailure,
                ..
            })
        ));
    }

    #[test]
    fn test_zero_router_rejected() {
        let network = Config::default().select_network(Some("testnet")).unwrap();
        assert!(matches!(
            parse_router(&network),
            Err(TradeError::Configuration(_))
        ));
        let network = Config::default().select_network(Some("mainnet")).unwrap();
        assert!(parse_router(&network).is_ok());
    }

    #[test]
    fn test_request_never_serializes_key() {
        let req = ExecutionRequest {
            private_key: Some(TEST_KEY.to_string()),
            ..request("USDT", "WBTC", 1.0)
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(!json.contains("ac0974bec"));
        assert!(!format!("{:?}", req).contains("ac0974bec"));
    }
}
