//! Stage contracts
//!
//! The router talks to each stage through one of these traits, so stages can
//! run in-process (the impls below) or behind a remote adapter. Transport
//! failures surface as [`StageError`]; business outcomes travel in the
//! payload types.

use crate::execution::{ExecutionRequest, SwapEngine, SwapReceipt};
use crate::monitor::{ConfirmationMonitor, MonitorRequest, MonitorResult};
use crate::risk::{RecordAck, RiskCheckRequest, RiskDecision, RiskGate, TradeRecord};
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// A stage could not be reached or did not answer in time
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StageError {
    #[error("{0}")]
    Unreachable(String),

    #[error("{stage} timed out after {after:?}")]
    Timeout { stage: &'static str, after: Duration },
}

/// Run a stage call under a deadline
pub async fn bounded<T, F>(stage: &'static str, limit: Duration, call: F) -> Result<T, StageError>
where
    F: Future<Output = Result<T, StageError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(StageError::Timeout {
            stage,
            after: limit,
        }),
    }
}

#[async_trait]
pub trait RiskService: Send + Sync {
    async fn check(&self, request: RiskCheckRequest) -> Result<RiskDecision, StageError>;
    async fn record(&self, record: &TradeRecord) -> Result<RecordAck, StageError>;
}

#[async_trait]
pub trait ExecutionService: Send + Sync {
    async fn execute(&self, request: ExecutionRequest) -> Result<SwapReceipt, StageError>;
}

#[async_trait]
pub trait MonitorService: Send + Sync {
    async fn check(&self, request: MonitorRequest) -> Result<MonitorResult, StageError>;
}

#[async_trait]
impl RiskService for RiskGate {
    async fn check(&self, request: RiskCheckRequest) -> Result<RiskDecision, StageError> {
        Ok(RiskGate::check(self, request.amount).await)
    }

    async fn record(&self, record: &TradeRecord) -> Result<RecordAck, StageError> {
        Ok(RiskGate::record(self, record.amount).await)
    }
}

#[async_trait]
impl ExecutionService for SwapEngine {
    async fn execute(&self, request: ExecutionRequest) -> Result<SwapReceipt, StageError> {
        Ok(self.execute_swap(&request).await)
    }
}

#[async_trait]
impl MonitorService for ConfirmationMonitor {
    async fn check(&self, request: MonitorRequest) -> Result<MonitorResult, StageError> {
        if let Some(signal) = &request.original_signal {
            tracing::debug!(
                tx_hash = %request.tx_hash,
                token_in = ?signal.token_in,
                token_out = ?signal.token_out,
                "Monitoring signal transaction"
            );
        }
        Ok(self
            .monitor(&request.tx_hash, request.network.as_deref())
            .await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bounded_passes_result_through() {
        let result = bounded("risk", Duration::from_secs(1), async { Ok::<_, StageError>(7) }).await;
        assert_eq!(result, Ok(7));
    }

    #[tokio::test]
    async fn test_bounded_times_out() {
        let result: Result<(), StageError> = bounded("monitor", Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert_eq!(
            result,
            Err(StageError::Timeout {
                stage: "monitor",
                after: Duration::from_millis(10)
            })
        );
    }

    #[tokio::test]
    async fn test_gate_as_service() {
        let gate = RiskGate::new(crate::config::RiskConfig::default());
        let service: &dyn RiskService = &gate;
        let decision = service.check(RiskCheckRequest { amount: 2000.0 }).await.unwrap();
        assert!(!decision.allowed);
    }
}
