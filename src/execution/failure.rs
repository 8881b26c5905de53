//! Submission error classification
//!
//! Node errors are mapped by JSON-RPC code first. Codes shared by many
//! distinct failures (geth reports nearly everything as -32000) fall through
//! to an ordered message table.

use crate::chain::ChainError;
use crate::error::{SubmissionFailure, TradeError};

/// EIP-1474 "limit exceeded", returned by rate-limited providers
const LIMIT_EXCEEDED: i64 = -32005;
/// JSON-RPC internal error
const INTERNAL_ERROR: i64 = -32603;

/// First match wins; patterns are matched against the lowercased message
const MESSAGE_PATTERNS: &[(&str, SubmissionFailure)] = &[
    ("insufficient funds", SubmissionFailure::InsufficientFundsForGas),
    ("nonce too low", SubmissionFailure::NonceTooLow),
    ("gas price too low", SubmissionFailure::GasPriceTooLow),
    ("underpriced", SubmissionFailure::GasPriceTooLow),
    ("fee per gas less than block base fee", SubmissionFailure::GasPriceTooLow),
    ("already known", SubmissionFailure::AlreadyKnown),
    ("known transaction", SubmissionFailure::AlreadyKnown),
];

fn match_message(message: &str) -> SubmissionFailure {
    let lower = message.to_lowercase();
    MESSAGE_PATTERNS
        .iter()
        .find(|(pattern, _)| lower.contains(pattern))
        .map(|(_, failure)| *failure)
        .unwrap_or(SubmissionFailure::Rejected)
}

/// Map a failed send into the trade error taxonomy
pub fn classify_submission_error(err: ChainError) -> TradeError {
    match err {
        ChainError::Transport(_) | ChainError::Timeout(_) | ChainError::InvalidUrl(_) => {
            TradeError::NetworkUnavailable(err.to_string())
        }
        ChainError::Rpc { code, message } if code == LIMIT_EXCEEDED || code == INTERNAL_ERROR => {
            TradeError::NetworkUnavailable(format!("rpc error {}: {}", code, message))
        }
        ChainError::Rpc { message, .. } => TradeError::Transaction {
            failure: match_message(&message),
            reason: message,
        },
        ChainError::Signing(reason) | ChainError::Decode(reason) => TradeError::Transaction {
            failure: SubmissionFailure::Rejected,
            reason,
        },
    }
}

/// Map a failed read (balance, allowance, receipt) into the taxonomy
pub fn classify_query_error(context: &str, err: ChainError) -> TradeError {
    TradeError::NetworkUnavailable(format!("{}: {}", context, err))
}
