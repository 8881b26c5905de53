//! Chain RPC seam
//!
//! Everything the executor and monitor need from a node goes through
//! [`ChainClient`]. The alloy-backed implementation lives in
//! [`alloy_client`]; tests substitute in-memory fakes.

pub mod abi;
pub mod alloy_client;

use crate::config::NetworkConfig;
use crate::wallet::{PreparedTransaction, SecureWallet};
use alloy::primitives::{Address, B256, U256};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;

pub use alloy_client::{AlloyChainClient, HttpConnector};

/// Errors raised by a chain client
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChainError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("invalid RPC URL: {0}")]
    InvalidUrl(String),

    #[error("signing failed: {0}")]
    Signing(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("could not decode response: {0}")]
    Decode(String),
}

impl From<alloy::transports::TransportError> for ChainError {
    fn from(err: alloy::transports::TransportError) -> Self {
        match err.as_error_resp() {
            Some(payload) => ChainError::Rpc {
                code: payload.code,
                message: payload.message.to_string(),
            },
            None => ChainError::Transport(err.to_string()),
        }
    }
}

/// The parts of a receipt the pipeline cares about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiptSummary {
    pub success: bool,
    pub block_number: Option<u64>,
    pub gas_used: u64,
}

/// Read and submit operations against one chain
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Chain this client is connected to
    fn chain_id(&self) -> u64;

    async fn native_balance(&self, owner: Address) -> Result<U256, ChainError>;

    async fn token_balance(&self, token: Address, owner: Address) -> Result<U256, ChainError>;

    async fn allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256, ChainError>;

    async fn block_number(&self) -> Result<u64, ChainError>;

    /// Fill nonce and gas price, sign with `wallet` and broadcast
    async fn send_transaction(
        &self,
        wallet: &SecureWallet,
        tx: PreparedTransaction,
    ) -> Result<B256, ChainError>;

    /// `None` while the transaction is not yet mined
    async fn receipt(&self, hash: B256) -> Result<Option<ReceiptSummary>, ChainError>;
}

/// Poll for a receipt until it appears or `timeout` elapses.
///
/// RPC errors end the wait immediately; there is no retry.
pub async fn wait_for_receipt(
    client: &dyn ChainClient,
    hash: B256,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<ReceiptSummary, ChainError> {
    let polling = async {
        loop {
            match client.receipt(hash).await {
                Ok(Some(receipt)) => return Ok(receipt),
                Ok(None) => tokio::time::sleep(poll_interval).await,
                Err(e) => return Err(e),
            }
        }
    };

    match tokio::time::timeout(timeout, polling).await {
        Ok(result) => result,
        Err(_) => Err(ChainError::Timeout(timeout)),
    }
}

/// Builds chain clients for a network profile
pub trait ChainConnector: Send + Sync {
    fn connect(&self, network: &NetworkConfig) -> Result<Arc<dyn ChainClient>, ChainError>;
}

struct ActiveClient {
    rpc_endpoint: String,
    client: Arc<dyn ChainClient>,
}

/// Holds the currently connected client and swaps it when the endpoint changes
pub struct ChainConnections {
    connector: Arc<dyn ChainConnector>,
    active: Mutex<Option<ActiveClient>>,
}

impl ChainConnections {
    pub fn new(connector: Arc<dyn ChainConnector>) -> Self {
        Self {
            connector,
            active: Mutex::new(None),
        }
    }

    /// Client for `network`, reconnecting only if its endpoint differs from
    /// the active one
    pub async fn client_for(
        &self,
        network: &NetworkConfig,
    ) -> Result<Arc<dyn ChainClient>, ChainError> {
        let mut active = self.active.lock().await;

        if let Some(current) = active.as_ref() {
            if current.rpc_endpoint == network.rpc_endpoint {
                return Ok(Arc::clone(&current.client));
            }
        }

        tracing::info!(
            network = %network.name,
            chain_id = network.chain_id,
            "Connecting chain client"
        );
        let client = self.connector.connect(network)?;
        *active = Some(ActiveClient {
            rpc_endpoint: network.rpc_endpoint.clone(),
            client: Arc::clone(&client),
        });
        Ok(client)
    }

    /// Endpoint of the active client, if any
    pub async fn active_endpoint(&self) -> Option<String> {
        self.active
            .lock()
            .await
            .as_ref()
            .map(|a| a.rpc_endpoint.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubClient {
        chain_id: u64,
        receipt_after: usize,
        polls: AtomicUsize,
    }

    #[async_trait]
    impl ChainClient for StubClient {
        fn chain_id(&self) -> u64 {
            self.chain_id
        }

        async fn native_balance(&self, _owner: Address) -> Result<U256, ChainError> {
            Ok(U256::ZERO)
        }

        async fn token_balance(&self, _token: Address, _owner: Address) -> Result<U256, ChainError> {
            Ok(U256::ZERO)
        }

        async fn allowance(
            &self,
            _token: Address,
            _owner: Address,
            _spender: Address,
        ) -> Result<U256, ChainError> {
            Ok(U256::ZERO)
        }

        async fn block_number(&self) -> Result<u64, ChainError> {
            Ok(1)
        }

        async fn send_transaction(
            &self,
            _wallet: &SecureWallet,
            _tx: PreparedTransaction,
        ) -> Result<B256, ChainError> {
            Ok(B256::ZERO)
        }

        async fn receipt(&self, _hash: B256) -> Result<Option<ReceiptSummary>, ChainError> {
            let polls = self.polls.fetch_add(1, Ordering::SeqCst) + 1;
            if polls >= self.receipt_after {
                Ok(Some(ReceiptSummary {
                    success: true,
                    block_number: Some(10),
                    gas_used: 21_000,
                }))
            } else {
                Ok(None)
            }
        }
    }

    struct CountingConnector {
        connects: AtomicUsize,
    }

    impl ChainConnector for CountingConnector {
        fn connect(&self, network: &NetworkConfig) -> Result<Arc<dyn ChainClient>, ChainError> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(StubClient {
                chain_id: network.chain_id,
                receipt_after: 1,
                polls: AtomicUsize::new(0),
            }))
        }
    }

    fn network(name: &str, endpoint: &str) -> NetworkConfig {
        NetworkConfig {
            name: name.to_string(),
            chain_id: 1,
            rpc_endpoint: endpoint.to_string(),
            router_address: "0x7a250d5630B4cF539739dF2C5dAcb4c659F2488D".to_string(),
        }
    }

    #[tokio::test]
    async fn test_reconnects_only_on_endpoint_change() {
        let connector = Arc::new(CountingConnector {
            connects: AtomicUsize::new(0),
        });
        let connections = ChainConnections::new(connector.clone());

        connections.client_for(&network("a", "http://one")).await.unwrap();
        connections.client_for(&network("b", "http://one")).await.unwrap();
        assert_eq!(connector.connects.load(Ordering::SeqCst), 1);

        connections.client_for(&network("c", "http://two")).await.unwrap();
        assert_eq!(connector.connects.load(Ordering::SeqCst), 2);
        assert_eq!(
            connections.active_endpoint().await.as_deref(),
            Some("http://two")
        );
    }

    #[tokio::test]
    async fn test_wait_for_receipt_polls_until_mined() {
        let client = StubClient {
            chain_id: 1,
            receipt_after: 3,
            polls: AtomicUsize::new(0),
        };
        let receipt = wait_for_receipt(
            &client,
            B256::ZERO,
            Duration::from_secs(5),
            Duration::from_millis(1),
        )
        .await
        .unwrap();

        assert!(receipt.success);
        assert_eq!(client.polls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_wait_for_receipt_times_out() {
        let client = StubClient {
            chain_id: 1,
            receipt_after: usize::MAX,
            polls: AtomicUsize::new(0),
        };
        let err = wait_for_receipt(
            &client,
            B256::ZERO,
            Duration::from_millis(20),
            Duration::from_millis(5),
        )
        .await
        .unwrap_err();

        assert_eq!(err, ChainError::Timeout(Duration::from_millis(20)));
    }
}
