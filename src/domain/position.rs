//! Open position and trade ledger entries.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    /// Signed; positive is long. The engine is long-only.
    pub quantity: i64,
    /// Reference (bar close) price at entry.
    pub entry_price: f64,
    /// Cash debited on entry, frictions included.
    pub cost_basis: f64,
    pub entry_timestamp: NaiveDateTime,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
}

impl Position {
    /// Mark-to-market gain against the cash paid on entry.
    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        self.quantity as f64 * price - self.cost_basis
    }

    pub fn should_stop_loss(&self, price: f64) -> bool {
        match self.stop_loss {
            Some(stop) => price <= stop,
            None => false,
        }
    }

    pub fn should_take_profit(&self, price: f64) -> bool {
        match self.take_profit {
            Some(target) => price >= target,
            None => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeAction {
    Buy,
    Sell,
}

/// What caused a fill. Everything except `Signal` is a forced exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeReason {
    Signal,
    StopLoss,
    TakeProfit,
    MaxDrawdown,
    EndOfRun,
}

impl fmt::Display for TradeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TradeReason::Signal => "signal",
            TradeReason::StopLoss => "stop_loss",
            TradeReason::TakeProfit => "take_profit",
            TradeReason::MaxDrawdown => "max_drawdown",
            TradeReason::EndOfRun => "end_of_run",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub timestamp: NaiveDateTime,
    pub action: TradeAction,
    /// Reference price the fill was simulated against.
    pub price: f64,
    pub quantity: i64,
    /// Commission paid on this fill, in cash.
    pub commission: f64,
    /// Slippage cost of this fill, in cash.
    pub slippage: f64,
    /// Set on closing trades; 0 on openings.
    pub realized_pnl: f64,
    pub reason: TradeReason,
}

impl Trade {
    pub fn is_closing(&self) -> bool {
        self.action == TradeAction::Sell
    }

    pub fn is_forced(&self) -> bool {
        self.reason != TradeReason::Signal
    }
}
