//! Risk gate
//!
//! Admission control for trades: a per-trade cap, a rolling 24h volume
//! ceiling and a cooldown between admitted trades. Admission (`check`) and
//! accounting (`record`) are separate calls, so only settled trades count
//! toward daily volume.

use crate::config::RiskConfig;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

pub const AMOUNT_EXCEEDS_LIMIT: &str = "trade amount exceeds limit";
pub const DAILY_LIMIT_EXCEEDED: &str = "daily volume limit exceeded";
pub const COOLDOWN_NOT_ELAPSED: &str = "cooldown period not elapsed";
pub const INVALID_AMOUNT: &str = "trade amount must be a non-negative number";

fn valid_amount(amount: f64) -> bool {
    amount.is_finite() && amount >= 0.0
}

/// Cooldown as a `Duration`; `None` when it does not fit
pub fn cooldown_duration(seconds: u64) -> Option<Duration> {
    i64::try_from(seconds).ok().and_then(Duration::try_seconds)
}

/// Length of the rolling volume window
const DAILY_WINDOW_SECS: i64 = 86_400;

/// Mutable risk accounting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskState {
    /// Last admitted trade
    pub last_trade_time: Option<DateTime<Utc>>,
    /// Settled volume in the current window
    pub daily_volume: f64,
    /// Start of the current window
    pub daily_reset_at: DateTime<Utc>,
}

impl RiskState {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            last_trade_time: None,
            daily_volume: 0.0,
            daily_reset_at: now,
        }
    }

    fn roll_window(&mut self, now: DateTime<Utc>) {
        if now - self.daily_reset_at > Duration::seconds(DAILY_WINDOW_SECS) {
            tracing::info!(
                previous_volume = self.daily_volume,
                "Daily window elapsed, resetting volume"
            );
            self.daily_volume = 0.0;
            self.daily_reset_at = now;
        }
    }
}

/// `risk.check` request
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskCheckRequest {
    pub amount: f64,
}

/// `risk.check` response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskDecision {
    pub allowed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl RiskDecision {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
        }
    }
}

/// `risk.record` response
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecordAck {
    pub recorded: bool,
    pub current_daily_volume: f64,
}

/// Single owner of the risk state; every mutation goes through its mutex
pub struct RiskGate {
    limits: RiskConfig,
    state: Mutex<RiskState>,
}

impl RiskGate {
    pub fn new(limits: RiskConfig) -> Self {
        Self::with_state(limits, RiskState::new(Utc::now()))
    }

    /// Start from a known state
    pub fn with_state(limits: RiskConfig, state: RiskState) -> Self {
        Self {
            limits,
            state: Mutex::new(state),
        }
    }

    pub fn limits(&self) -> &RiskConfig {
        &self.limits
    }

    pub async fn check(&self, amount: f64) -> RiskDecision {
        self.check_at(amount, Utc::now()).await
    }

    /// Admission decision at `now`. An admitted trade starts the cooldown.
    pub async fn check_at(&self, amount: f64, now: DateTime<Utc>) -> RiskDecision {
        if !valid_amount(amount) {
            tracing::warn!(amount = amount, "Refusing malformed trade amount");
            return RiskDecision::deny(INVALID_AMOUNT);
        }

        let mut state = self.state.lock().await;
        state.roll_window(now);

        if amount > self.limits.max_trade_amount {
            tracing::warn!(
                amount = amount,
                max = self.limits.max_trade_amount,
                "Trade amount exceeds limit"
            );
            return RiskDecision::deny(AMOUNT_EXCEEDS_LIMIT);
        }

        if state.daily_volume + amount > self.limits.daily_limit {
            tracing::warn!(
                amount = amount,
                daily_volume = state.daily_volume,
                limit = self.limits.daily_limit,
                "Daily volume limit exceeded"
            );
            return RiskDecision::deny(DAILY_LIMIT_EXCEEDED);
        }

        if let Some(last) = state.last_trade_time {
            let elapsed = now - last;
            // An unrepresentable cooldown never elapses
            let cooling = cooldown_duration(self.limits.cooldown_seconds)
                .map_or(true, |cooldown| elapsed < cooldown);
            if cooling {
                tracing::warn!(
                    elapsed_secs = elapsed.num_seconds(),
                    cooldown_secs = self.limits.cooldown_seconds,
                    "Cooldown period not elapsed"
                );
                return RiskDecision::deny(COOLDOWN_NOT_ELAPSED);
            }
        }

        state.last_trade_time = Some(now);
        tracing::debug!(amount = amount, "Risk check passed");
        RiskDecision::allow()
    }

    /// Add settled volume. Refuses only malformed amounts.
    pub async fn record(&self, amount: f64) -> RecordAck {
        let mut state = self.state.lock().await;
        if !valid_amount(amount) {
            tracing::warn!(amount = amount, "Refusing to record malformed amount");
            return RecordAck {
                recorded: false,
                current_daily_volume: state.daily_volume,
            };
        }
        state.daily_volume += amount;
        tracing::info!(
            amount = amount,
            daily_volume = state.daily_volume,
            "Trade recorded"
        );
        RecordAck {
            recorded: true,
            current_daily_volume: state.daily_volume,
        }
    }

    pub async fn snapshot(&self) -> RiskState {
        self.state.lock().await.clone()
    }
}
