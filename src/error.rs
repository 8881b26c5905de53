//! Error types for the signal executor

use crate::chain::ChainError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Wallet error: {0}")]
    Wallet(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Chain error: {0}")]
    Chain(#[from] ChainError),

    #[error(transparent)]
    Trade(#[from] TradeError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Why a swap submission was refused by the node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionFailure {
    InsufficientFundsForGas,
    NonceTooLow,
    GasPriceTooLow,
    AlreadyKnown,
    Rejected,
}

impl std::fmt::Display for SubmissionFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            SubmissionFailure::InsufficientFundsForGas => "insufficient native balance to pay for gas",
            SubmissionFailure::NonceTooLow => "nonce too low, wallet may have pending transactions",
            SubmissionFailure::GasPriceTooLow => "gas price too low",
            SubmissionFailure::AlreadyKnown => "transaction already submitted",
            SubmissionFailure::Rejected => "submission rejected",
        };
        f.write_str(text)
    }
}

/// Failure taxonomy for a single pipeline run.
///
/// Every stage reports its failures through this type so the router can map
/// them onto a terminal status without inspecting message text.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TradeError {
    #[error("Invalid signal format: {0}")]
    Format(String),

    #[error("Risk check denied: {0}")]
    RiskDenied(String),

    #[error("Resolution error: {0}")]
    Resolution(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Insufficient {asset} balance: required {required}, available {available}")]
    InsufficientFunds {
        asset: String,
        required: String,
        available: String,
    },

    #[error("Token approval failed: {0}")]
    Approval(String),

    #[error("Transaction failed: {failure}: {reason}")]
    Transaction {
        failure: SubmissionFailure,
        reason: String,
    },

    #[error("Network unavailable: {0}")]
    NetworkUnavailable(String),

    #[error("Confirmation not observed within {0}s")]
    MonitorTimeout(u64),
}

/// Stable, machine-readable error category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    FormatError,
    RiskDenied,
    ResolutionError,
    ConfigurationError,
    InsufficientFunds,
    ApprovalFailure,
    TransactionFailure,
    NetworkUnavailable,
    MonitorTimeout,
}

impl TradeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TradeError::Format(_) => ErrorKind::FormatError,
            TradeError::RiskDenied(_) => ErrorKind::RiskDenied,
            TradeError::Resolution(_) => ErrorKind::ResolutionError,
            TradeError::Configuration(_) => ErrorKind::ConfigurationError,
            TradeError::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            TradeError::Approval(_) => ErrorKind::ApprovalFailure,
            TradeError::Transaction { .. } => ErrorKind::TransactionFailure,
            TradeError::NetworkUnavailable(_) => ErrorKind::NetworkUnavailable,
            TradeError::MonitorTimeout(_) => ErrorKind::MonitorTimeout,
        }
    }
}

/// Wire shape of a failed stage: `{"error": "...", "kind": "..."}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub error: String,
    /// Absent from bare `{"error": "..."}` answers
    #[serde(default = "unclassified")]
    pub kind: ErrorKind,
}

fn unclassified() -> ErrorKind {
    ErrorKind::TransactionFailure
}

impl From<&TradeError> for ErrorPayload {
    fn from(err: &TradeError) -> Self {
        Self {
            error: err.to_string(),
            kind: err.kind(),
        }
    }
}

impl From<TradeError> for ErrorPayload {
    fn from(err: TradeError) -> Self {
        Self::from(&err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_carries_kind_and_message() {
        let err = TradeError::InsufficientFunds {
            asset: "USDT".to_string(),
            required: "10".to_string(),
            available: "2.5".to_string(),
        };
        let payload = ErrorPayload::from(&err);
        assert_eq!(payload.kind, ErrorKind::InsufficientFunds);
        assert!(payload.error.contains("required 10"));
        assert!(payload.error.contains("available 2.5"));

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["kind"], "insufficient_funds");
    }

    #[test]
    fn bare_error_payload_is_unclassified_failure() {
        let payload: ErrorPayload =
            serde_json::from_str(r#"{"error": "execution reverted"}"#).unwrap();
        assert_eq!(payload.error, "execution reverted");
        assert_eq!(payload.kind, ErrorKind::TransactionFailure);
    }

    #[test]
    fn transaction_failure_names_subtype() {
        let err = TradeError::Transaction {
            failure: SubmissionFailure::NonceTooLow,
            reason: "nonce too low: next nonce 7".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::TransactionFailure);
        assert!(err.to_string().contains("pending transactions"));
    }
}
