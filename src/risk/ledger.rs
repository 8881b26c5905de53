//! Risk ledger writer
//!
//! Records settled trade volume with the risk service and, when configured,
//! appends each settlement to a JSONL journal. Neither step can change the
//! outcome of a trade that already settled; failures are logged and returned
//! for the caller to attach as warnings.

use crate::error::TradeError;
use crate::pipeline::stages::{bounded, RiskService};
use crate::risk::gate::RecordAck;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Accounting entry for one settled trade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub amount: f64,
    pub token_in: String,
    pub token_out: String,
    pub tx_hash: String,
    pub network: String,
    pub timestamp: DateTime<Utc>,
}

/// Line in the journal file
#[derive(Debug, Serialize)]
struct JournalEntry<'a> {
    #[serde(flatten)]
    record: &'a TradeRecord,
    recorded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    current_daily_volume: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Append-only JSONL writer
struct JournalWriter {
    path: PathBuf,
}

impl JournalWriter {
    fn write(&self, entry: &JournalEntry<'_>) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let json = serde_json::to_string(entry)?;
        writeln!(file, "{}", json)?;
        Ok(())
    }
}

pub struct LedgerWriter {
    risk: Arc<dyn RiskService>,
    journal: Option<Mutex<JournalWriter>>,
    timeout: Duration,
}

impl LedgerWriter {
    pub fn new(risk: Arc<dyn RiskService>, timeout: Duration) -> Self {
        Self {
            risk,
            journal: None,
            timeout,
        }
    }

    /// Also append every settlement to `path` (JSONL)
    pub fn with_journal(mut self, path: impl Into<PathBuf>) -> Self {
        self.journal = Some(Mutex::new(JournalWriter { path: path.into() }));
        self
    }

    /// Record a settled trade with the risk service and journal it
    pub async fn record_settlement(&self, record: &TradeRecord) -> Result<RecordAck, TradeError> {
        let result = bounded("record", self.timeout, self.risk.record(record))
            .await
            .map_err(|e| TradeError::NetworkUnavailable(format!("risk record failed: {}", e)))
            .and_then(|ack| {
                if ack.recorded {
                    Ok(ack)
                } else {
                    Err(TradeError::NetworkUnavailable(
                        "risk service did not record the trade".to_string(),
                    ))
                }
            });

        match &result {
            Ok(ack) => tracing::info!(
                tx_hash = %record.tx_hash,
                amount = record.amount,
                daily_volume = ack.current_daily_volume,
                "Settlement recorded"
            ),
            Err(e) => tracing::warn!(
                tx_hash = %record.tx_hash,
                error = %e,
                "Failed to record settlement"
            ),
        }

        if let Some(journal) = &self.journal {
            let entry = JournalEntry {
                record,
                recorded: result.is_ok(),
                current_daily_volume: result.as_ref().ok().map(|ack| ack.current_daily_volume),
                error: result.as_ref().err().map(ToString::to_string),
            };
            let writer = journal.lock().await;
            if let Err(e) = writer.write(&entry) {
                tracing::warn!(error = %e, path = %writer.path.display(), "Failed to write journal entry");
            }
        }

        result
    }
}
