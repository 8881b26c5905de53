//! Signal Executor
//!
//! Turns externally submitted trade signals into on-chain token swaps:
//! - Normalizes `BASE/QUOTE` symbol signals into explicit token pairs
//! - Gates every trade through a stateful risk check (size, daily volume, cooldown)
//! - Builds, signs and submits `swapExactTokensForTokens` against a router
//! - Tracks confirmation and records settled volume
//!
//! # Security Model
//!
//! - Private keys live only inside `wallet::SecureWallet` for one swap
//! - Keys are never serialized, logged or echoed in results
//! - The chain client signs locally and broadcasts raw transactions

pub mod chain;
pub mod config;
pub mod execution;
pub mod monitor;
pub mod pipeline;
pub mod risk;
pub mod runner;
pub mod signal;
pub mod tokens;
pub mod wallet;

mod error;

// Re-export commonly used types
pub use config::{Config, NetworkConfig};
pub use error::{Error, ErrorKind, ErrorPayload, Result, SubmissionFailure, TradeError};
pub use pipeline::{PipelineOutcome, PipelineStatus, SignalRouter};
pub use runner::ExecutorRuntime;
