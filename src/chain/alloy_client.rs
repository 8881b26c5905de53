//! HTTP chain client built on alloy
//!
//! Read calls use `eth_call` against ERC20 views. Writes are signed locally
//! with the caller's [`SecureWallet`] and broadcast as raw transactions, so
//! the provider itself never holds a key.

use super::abi::IERC20;
use super::{ChainClient, ChainConnector, ChainError, ReceiptSummary};
use crate::config::NetworkConfig;
use crate::wallet::{PreparedTransaction, SecureWallet};
use alloy::eips::eip2718::Encodable2718;
use alloy::network::{ReceiptResponse, TransactionBuilder};
use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use std::sync::Arc;

/// Chain client over an HTTP JSON-RPC endpoint
pub struct AlloyChainClient {
    provider: DynProvider,
    chain_id: u64,
    rpc_endpoint: String,
}

impl AlloyChainClient {
    /// Build a client for `network`. No request is made until first use.
    pub fn connect(network: &NetworkConfig) -> Result<Self, ChainError> {
        let url: url::Url = network
            .rpc_endpoint
            .parse()
            .map_err(|e| ChainError::InvalidUrl(format!("{}: {}", network.rpc_endpoint, e)))?;

        let provider = ProviderBuilder::new().connect_http(url).erased();

        Ok(Self {
            provider,
            chain_id: network.chain_id,
            rpc_endpoint: network.rpc_endpoint.clone(),
        })
    }

    pub fn rpc_endpoint(&self) -> &str {
        &self.rpc_endpoint
    }

    /// `eth_call` a view and decode its return value
    async fn view<C: SolCall + Send>(&self, to: Address, call: C) -> Result<C::Return, ChainError> {
        let tx = TransactionRequest::default()
            .with_to(to)
            .with_input(Bytes::from(call.abi_encode()));
        let result = self.provider.call(tx).await?;
        C::abi_decode_returns(&result).map_err(|e| ChainError::Decode(e.to_string()))
    }
}

#[async_trait]
impl ChainClient for AlloyChainClient {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    async fn native_balance(&self, owner: Address) -> Result<U256, ChainError> {
        Ok(self.provider.get_balance(owner).await?)
    }

    async fn token_balance(&self, token: Address, owner: Address) -> Result<U256, ChainError> {
        self.view(token, IERC20::balanceOfCall { account: owner })
            .await
    }

    async fn allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256, ChainError> {
        self.view(token, IERC20::allowanceCall { owner, spender })
            .await
    }

    async fn block_number(&self) -> Result<u64, ChainError> {
        Ok(self.provider.get_block_number().await?)
    }

    async fn send_transaction(
        &self,
        wallet: &SecureWallet,
        tx: PreparedTransaction,
    ) -> Result<B256, ChainError> {
        let from = wallet.address();
        let nonce = self.provider.get_transaction_count(from).pending().await?;
        let gas_price = self.provider.get_gas_price().await?;

        let request = TransactionRequest::default()
            .with_from(from)
            .with_to(tx.to)
            .with_input(tx.data)
            .with_value(tx.value)
            .with_nonce(nonce)
            .with_chain_id(self.chain_id)
            .with_gas_limit(tx.gas_limit)
            .with_gas_price(gas_price);

        let envelope = request
            .build(wallet.wallet())
            .await
            .map_err(|e| ChainError::Signing(e.to_string()))?;

        let pending = self
            .provider
            .send_raw_transaction(&envelope.encoded_2718())
            .await?;

        tracing::debug!(
            tx_hash = %pending.tx_hash(),
            nonce = nonce,
            gas_price = %gas_price,
            "Broadcast raw transaction"
        );
        Ok(*pending.tx_hash())
    }

    async fn receipt(&self, hash: B256) -> Result<Option<ReceiptSummary>, ChainError> {
        let receipt = self.provider.get_transaction_receipt(hash).await?;
        Ok(receipt.map(|r| ReceiptSummary {
            success: r.status(),
            block_number: r.block_number(),
            gas_used: r.gas_used(),
        }))
    }
}

/// Connector producing [`AlloyChainClient`]s
#[derive(Debug, Default, Clone, Copy)]
pub struct HttpConnector;

impl ChainConnector for HttpConnector {
    fn connect(&self, network: &NetworkConfig) -> Result<Arc<dyn ChainClient>, ChainError> {
        Ok(Arc::new(AlloyChainClient::connect(network)?))
    }
}
