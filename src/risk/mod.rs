//! Risk admission and settlement accounting

pub mod gate;
pub mod ledger;

pub use gate::{RecordAck, RiskCheckRequest, RiskDecision, RiskGate, RiskState};
pub use ledger::{LedgerWriter, TradeRecord};
