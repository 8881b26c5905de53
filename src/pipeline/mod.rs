//! Signal router
//!
//! Drives one signal through intake, risk check, execution, confirmation
//! monitoring and settlement recording, in that order. Every run ends in
//! exactly one [`PipelineStatus`] and names the stage where it stopped.
//!
//! Once a transaction is submitted nothing downstream can turn the run into
//! a `failed` unless the chain itself reports a revert: monitor trouble
//! yields `pending`, ledger trouble yields a warning.

pub mod stages;

use crate::config::TimeoutConfig;
use crate::error::ErrorKind;
use crate::execution::{ExecutionRequest, SwapReceipt};
use crate::monitor::{MonitorRequest, MonitorStatus};
use crate::risk::{LedgerWriter, RiskCheckRequest, TradeRecord};
use crate::signal::{Amount, TradeSignal};
use serde::{Deserialize, Serialize};
use stages::{bounded, ExecutionService, MonitorService, RiskService};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::Instrument;
use uuid::Uuid;

pub use stages::StageError;

const INVALID_FORMAT: &str =
    "Invalid signal format. Must contain token_in, token_out and amount parameters.";

/// Terminal status of a pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    FormatError,
    Rejected,
    Failed,
    Pending,
    Success,
}

/// Stage at which a run stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Intake,
    RiskCheck,
    Executing,
    Monitoring,
    Recording,
}

/// Aggregated result of one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineOutcome {
    pub run_id: Uuid,
    pub status: PipelineStatus,
    pub stage: PipelineStage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monitor_status: Option<MonitorStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmations: Option<u64>,
    pub token_in: Option<String>,
    pub token_out: Option<String>,
    pub amount: Option<Amount>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl PipelineOutcome {
    fn started(run_id: Uuid, signal: &TradeSignal) -> Self {
        Self {
            run_id,
            status: PipelineStatus::Pending,
            stage: PipelineStage::Intake,
            reason: None,
            error_kind: None,
            tx_hash: None,
            monitor_status: None,
            confirmations: None,
            token_in: signal.token_in.clone(),
            token_out: signal.token_out.clone(),
            amount: signal.amount.clone(),
            warnings: Vec::new(),
        }
    }

    fn halt(
        mut self,
        status: PipelineStatus,
        stage: PipelineStage,
        reason: impl Into<String>,
        kind: Option<ErrorKind>,
    ) -> Self {
        self.status = status;
        self.stage = stage;
        self.reason = Some(reason.into());
        self.error_kind = kind;
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == PipelineStatus::Success
    }
}

/// Per-stage deadlines
#[derive(Debug, Clone, Copy)]
struct StageTimeouts {
    risk_check: Duration,
    execution: Duration,
    monitor: Duration,
}

impl From<&TimeoutConfig> for StageTimeouts {
    fn from(config: &TimeoutConfig) -> Self {
        Self {
            risk_check: Duration::from_millis(config.risk_check_ms),
            execution: Duration::from_millis(config.execution_ms),
            monitor: Duration::from_millis(config.monitor_ms),
        }
    }
}

pub struct SignalRouter {
    risk: Arc<dyn RiskService>,
    execution: Arc<dyn ExecutionService>,
    monitor: Arc<dyn MonitorService>,
    ledger: LedgerWriter,
    timeouts: StageTimeouts,
    default_network: String,
    latest: RwLock<Option<TradeSignal>>,
}

impl SignalRouter {
    pub fn new(
        risk: Arc<dyn RiskService>,
        execution: Arc<dyn ExecutionService>,
        monitor: Arc<dyn MonitorService>,
        ledger: LedgerWriter,
        timeouts: &TimeoutConfig,
        default_network: impl Into<String>,
    ) -> Self {
        Self {
            risk,
            execution,
            monitor,
            ledger,
            timeouts: StageTimeouts::from(timeouts),
            default_network: default_network.into(),
            latest: RwLock::new(None),
        }
    }

    /// Most recent signal received, without credentials
    pub async fn latest_signal(&self) -> Option<TradeSignal> {
        self.latest.read().await.clone()
    }

    /// Run one signal through the pipeline
    pub async fn handle_signal(&self, signal: TradeSignal) -> PipelineOutcome {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("signal", run_id = %run_id);
        self.run(run_id, signal).instrument(span).await
    }

    async fn run(&self, run_id: Uuid, mut signal: TradeSignal) -> PipelineOutcome {
        signal.normalize();
        *self.latest.write().await = Some(signal.redacted());

        let outcome = PipelineOutcome::started(run_id, &signal);

        // Intake
        if !signal.validate() {
            tracing::warn!(?signal, "Rejecting malformed signal");
            return outcome.halt(
                PipelineStatus::FormatError,
                PipelineStage::Intake,
                INVALID_FORMAT,
                Some(ErrorKind::FormatError),
            );
        }
        let amount = match signal.trade_amount() {
            Ok(amount) => amount,
            Err(e) => {
                tracing::warn!(error = %e, "Rejecting signal amount");
                return outcome.halt(
                    PipelineStatus::FormatError,
                    PipelineStage::Intake,
                    e.to_string(),
                    Some(e.kind()),
                );
            }
        };
        let (Some(token_in), Some(token_out)) = (signal.token_in.clone(), signal.token_out.clone())
        else {
            return outcome.halt(
                PipelineStatus::FormatError,
                PipelineStage::Intake,
                INVALID_FORMAT,
                Some(ErrorKind::FormatError),
            );
        };
        let network = signal
            .network
            .clone()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| self.default_network.clone());

        tracing::info!(
            token_in = %token_in,
            token_out = %token_out,
            amount = amount,
            network = %network,
            "Signal accepted"
        );

        // Risk check
        let decision = match bounded(
            "risk check",
            self.timeouts.risk_check,
            self.risk.check(RiskCheckRequest { amount }),
        )
        .await
        {
            Ok(decision) => decision,
            Err(e) => {
                tracing::warn!(error = %e, "Risk service unavailable");
                return outcome.halt(
                    PipelineStatus::Failed,
                    PipelineStage::RiskCheck,
                    format!("Risk check failed: {}", e),
                    Some(ErrorKind::NetworkUnavailable),
                );
            }
        };
        if !decision.allowed {
            let reason = decision
                .reason
                .unwrap_or_else(|| "Risk check failed".to_string());
            tracing::info!(reason = %reason, "Signal rejected by risk gate");
            return outcome.halt(
                PipelineStatus::Rejected,
                PipelineStage::RiskCheck,
                reason,
                Some(ErrorKind::RiskDenied),
            );
        }

        // Execution
        let request = ExecutionRequest {
            wallet_address: signal.wallet_address.clone(),
            private_key: signal.private_key.clone(),
            token_in: token_in.clone(),
            token_out: token_out.clone(),
            amount,
            slippage: signal.slippage,
            network: Some(network.clone()),
        };
        let tx_hash = match bounded(
            "execution",
            self.timeouts.execution,
            self.execution.execute(request),
        )
        .await
        {
            Ok(SwapReceipt::Submitted { tx_hash }) => tx_hash,
            Ok(SwapReceipt::Failed(payload)) => {
                tracing::warn!(kind = ?payload.kind, error = %payload.error, "Execution failed");
                return outcome.halt(
                    PipelineStatus::Failed,
                    PipelineStage::Executing,
                    payload.error,
                    Some(payload.kind),
                );
            }
            Err(e) => {
                tracing::warn!(error = %e, "Execution service unavailable");
                return outcome.halt(
                    PipelineStatus::Failed,
                    PipelineStage::Executing,
                    format!("DEX execution failed: {}", e),
                    Some(ErrorKind::NetworkUnavailable),
                );
            }
        };
        tracing::info!(tx_hash = %tx_hash, "Transaction submitted");

        let mut outcome = outcome;
        outcome.tx_hash = Some(tx_hash.clone());

        // Monitoring
        let monitor_request = MonitorRequest {
            tx_hash: tx_hash.clone(),
            network: Some(network.clone()),
            original_signal: Some(signal.redacted()),
        };
        let result = match bounded(
            "monitor",
            self.timeouts.monitor,
            self.monitor.check(monitor_request),
        )
        .await
        {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(tx_hash = %tx_hash, error = %e, "Monitoring failed");
                let warning = format!("Transaction submitted but monitoring failed: {}", e);
                outcome.warnings.push(warning.clone());
                return outcome.halt(
                    PipelineStatus::Pending,
                    PipelineStage::Monitoring,
                    warning,
                    Some(ErrorKind::NetworkUnavailable),
                );
            }
        };
        outcome.monitor_status = Some(result.status);
        outcome.confirmations = Some(result.confirmations);

        match result.status {
            MonitorStatus::Pending => {
                let reason = result
                    .detail
                    .clone()
                    .unwrap_or_else(|| "Transaction not yet confirmed".to_string());
                tracing::info!(tx_hash = %tx_hash, reason = %reason, "Transaction pending");
                return outcome.halt(
                    PipelineStatus::Pending,
                    PipelineStage::Monitoring,
                    reason,
                    result.error_kind,
                );
            }
            MonitorStatus::Failed => {
                tracing::warn!(tx_hash = %tx_hash, "Transaction reverted");
                return outcome.halt(
                    PipelineStatus::Failed,
                    PipelineStage::Monitoring,
                    "Transaction reverted on-chain",
                    Some(ErrorKind::TransactionFailure),
                );
            }
            MonitorStatus::Confirmed => {}
        }

        // Recording
        let record = TradeRecord {
            amount,
            token_in,
            token_out,
            tx_hash: tx_hash.clone(),
            network,
            timestamp: result.timestamp,
        };
        if let Err(e) = self.ledger.record_settlement(&record).await {
            outcome
                .warnings
                .push(format!("Failed to record trade: {}", e));
        }

        tracing::info!(
            tx_hash = %tx_hash,
            confirmations = result.confirmations,
            "Signal settled"
        );
        outcome.status = PipelineStatus::Success;
        outcome.stage = PipelineStage::Recording;
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_wire_names() {
        assert_eq!(
            serde_json::to_value(PipelineStatus::FormatError).unwrap(),
            "format_error"
        );
        assert_eq!(
            serde_json::to_value(PipelineStage::RiskCheck).unwrap(),
            "risk_check"
        );
    }

    #[test]
    fn test_outcome_echoes_signal_fields() {
        let signal = TradeSignal {
            token_in: Some("USDT".to_string()),
            token_out: Some("WBTC".to_string()),
            amount: Some(Amount::from("10")),
            ..TradeSignal::default()
        };
        let outcome = PipelineOutcome::started(Uuid::new_v4(), &signal).halt(
            PipelineStatus::Rejected,
            PipelineStage::RiskCheck,
            "Risk limit exceeded",
            Some(ErrorKind::RiskDenied),
        );
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "rejected");
        assert_eq!(json["amount"], "10");
        assert_eq!(json["token_in"], "USDT");
        assert!(json.get("tx_hash").is_none());
    }
}
