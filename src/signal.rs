//! Trade signal intake
//!
//! A signal names its pair either as a compact `symbol` ("WBTC/USDT") plus a
//! `side`, or with explicit `token_in`/`token_out`. [`TradeSignal::normalize`]
//! turns the first form into the second.

use crate::error::TradeError;
use serde::{Deserialize, Serialize};

/// Trade direction relative to the base asset of a `BASE/QUOTE` symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// "buy" in any case is a buy, any other value is a sell, and an absent
    /// side defaults to buy
    pub fn parse(side: Option<&str>) -> Self {
        match side.map(str::trim) {
            None | Some("") => Side::Buy,
            Some(s) if s.eq_ignore_ascii_case("buy") => Side::Buy,
            Some(_) => Side::Sell,
        }
    }
}

/// Amount as received: JSON number or numeric string
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Amount {
    Number(f64),
    Text(String),
}

impl Amount {
    fn is_empty(&self) -> bool {
        matches!(self, Amount::Text(s) if s.trim().is_empty())
    }

    /// Numeric value; rejects non-numeric, negative and non-finite input
    pub fn value(&self) -> Result<f64, TradeError> {
        let value = match self {
            Amount::Number(n) => *n,
            Amount::Text(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| TradeError::Format(format!("amount is not a number: {:?}", s)))?,
        };
        if !value.is_finite() {
            return Err(TradeError::Format(format!("amount must be finite, got {}", value)));
        }
        if value < 0.0 {
            return Err(TradeError::Format(format!(
                "amount must not be negative, got {}",
                value
            )));
        }
        Ok(value)
    }
}

impl From<f64> for Amount {
    fn from(value: f64) -> Self {
        Amount::Number(value)
    }
}

impl From<&str> for Amount {
    fn from(value: &str) -> Self {
        Amount::Text(value.to_string())
    }
}

/// Raw inbound trade signal
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct TradeSignal {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub side: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_in: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_out: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<Amount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slippage: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wallet_address: Option<String>,
    #[serde(default, skip_serializing)]
    pub private_key: Option<String>,
}

impl std::fmt::Debug for TradeSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TradeSignal")
            .field("symbol", &self.symbol)
            .field("side", &self.side)
            .field("token_in", &self.token_in)
            .field("token_out", &self.token_out)
            .field("amount", &self.amount)
            .field("slippage", &self.slippage)
            .field("network", &self.network)
            .field("wallet_address", &self.wallet_address)
            .field("private_key", &self.private_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

fn present(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

impl TradeSignal {
    /// Fill `token_in`/`token_out` from `symbol` and `side`.
    ///
    /// Only applies when the symbol contains exactly one `/` and the signal
    /// does not already name both tokens.
    pub fn normalize(&mut self) {
        if present(&self.token_in) && present(&self.token_out) {
            return;
        }
        let Some(symbol) = self.symbol.as_deref() else {
            return;
        };
        let parts: Vec<&str> = symbol.split('/').collect();
        let [base, quote] = parts.as_slice() else {
            return;
        };
        let (base, quote) = (base.trim().to_string(), quote.trim().to_string());

        match Side::parse(self.side.as_deref()) {
            Side::Buy => {
                self.token_in = Some(quote);
                self.token_out = Some(base);
            }
            Side::Sell => {
                self.token_in = Some(base);
                self.token_out = Some(quote);
            }
        }
    }

    /// True when `token_in`, `token_out` and `amount` are all present
    pub fn validate(&self) -> bool {
        present(&self.token_in)
            && present(&self.token_out)
            && self.amount.as_ref().is_some_and(|a| !a.is_empty())
    }

    /// Parsed trade amount
    pub fn trade_amount(&self) -> Result<f64, TradeError> {
        match &self.amount {
            Some(amount) => amount.value(),
            None => Err(TradeError::Format("amount is required".to_string())),
        }
    }

    /// Copy with credentials removed
    pub fn redacted(&self) -> Self {
        Self {
            private_key: None,
            ..self.clone()
        }
    }
}
