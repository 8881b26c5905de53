//! Confirmation monitor
//!
//! Waits for a submitted transaction's receipt up to a fixed ceiling and
//! reports `confirmed`, `failed` or `pending`. RPC failures are reported, not
//! retried.

use crate::chain::{wait_for_receipt, ChainConnections, ChainError, ReceiptSummary};
use crate::config::Config;
use crate::error::{ErrorKind, TradeError};
use crate::signal::TradeSignal;
use alloy::primitives::B256;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorStatus {
    Confirmed,
    Pending,
    Failed,
}

/// Payload accepted by the monitor stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorRequest {
    pub tx_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    /// Signal that produced the transaction, for log context only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_signal: Option<TradeSignal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorResult {
    pub status: MonitorStatus,
    #[serde(default)]
    pub confirmations: u64,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_used: Option<u64>,
    /// Why the result is still pending
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

impl MonitorResult {
    pub fn pending(err: &TradeError) -> Self {
        Self {
            status: MonitorStatus::Pending,
            confirmations: 0,
            timestamp: Utc::now(),
            block_number: None,
            gas_used: None,
            detail: Some(err.to_string()),
            error_kind: Some(err.kind()),
        }
    }

    fn from_receipt(receipt: ReceiptSummary, head: Option<u64>) -> Self {
        let confirmations = match (receipt.block_number, head) {
            (Some(block), Some(head)) => head.saturating_sub(block) + 1,
            _ => 1,
        };
        Self {
            status: if receipt.success {
                MonitorStatus::Confirmed
            } else {
                MonitorStatus::Failed
            },
            confirmations,
            timestamp: Utc::now(),
            block_number: receipt.block_number,
            gas_used: Some(receipt.gas_used),
            detail: None,
            error_kind: None,
        }
    }
}

pub struct ConfirmationMonitor {
    config: Arc<Config>,
    connections: Arc<ChainConnections>,
    timeout: Duration,
    poll_interval: Duration,
}

impl ConfirmationMonitor {
    pub fn new(config: Arc<Config>, connections: Arc<ChainConnections>) -> Self {
        let timeout = Duration::from_secs(config.timeouts.confirmation_secs);
        let poll_interval = config.execution.poll_interval();
        Self {
            config,
            connections,
            timeout,
            poll_interval,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration, poll_interval: Duration) -> Self {
        self.timeout = timeout;
        self.poll_interval = poll_interval;
        self
    }

    pub async fn monitor(&self, tx_hash: &str, network: Option<&str>) -> MonitorResult {
        let hash = match B256::from_str(tx_hash.trim()) {
            Ok(hash) => hash,
            Err(e) => {
                let err = TradeError::Format(format!("malformed transaction hash {}: {}", tx_hash, e));
                tracing::warn!(tx_hash = %tx_hash, "Cannot monitor malformed hash");
                return MonitorResult::pending(&err);
            }
        };

        let Some(profile) = self.config.select_network(network) else {
            return MonitorResult::pending(&TradeError::Configuration(
                "no network profile available".to_string(),
            ));
        };

        let client = match self.connections.client_for(&profile).await {
            Ok(client) => client,
            Err(e) => {
                return MonitorResult::pending(&TradeError::NetworkUnavailable(e.to_string()));
            }
        };

        tracing::info!(tx_hash = %tx_hash, network = %profile.name, "Waiting for receipt");

        match wait_for_receipt(client.as_ref(), hash, self.timeout, self.poll_interval).await {
            Ok(receipt) => {
                let head = match client.block_number().await {
                    Ok(head) => Some(head),
                    Err(e) => {
                        tracing::warn!(error = %e, "Block number unavailable, reporting one confirmation");
                        None
                    }
                };
                let result = MonitorResult::from_receipt(receipt, head);
                tracing::info!(
                    tx_hash = %tx_hash,
                    status = ?result.status,
                    confirmations = result.confirmations,
                    block_number = ?result.block_number,
                    "Receipt observed"
                );
                result
            }
            Err(ChainError::Timeout(waited)) => {
                tracing::warn!(tx_hash = %tx_hash, "No receipt within {:?}", waited);
                MonitorResult::pending(&TradeError::MonitorTimeout(waited.as_secs()))
            }
            Err(e) => {
                tracing::warn!(tx_hash = %tx_hash, error = %e, "Receipt lookup failed");
                MonitorResult::pending(&TradeError::NetworkUnavailable(e.to_string()))
            }
        }
    }
}
