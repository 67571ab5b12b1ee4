//! Portfolio state and equity tracking for a single-symbol run.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::position::Position;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: NaiveDateTime,
    pub equity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawdownPoint {
    pub timestamp: NaiveDateTime,
    /// (equity - peak) / peak; always <= 0.
    pub drawdown: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioState {
    pub cash: f64,
    pub initial_capital: f64,
    pub position: Option<Position>,
    pub last_price: Option<f64>,
    pub equity: f64,
    pub peak_equity: f64,
    pub current_drawdown: f64,
}

impl PortfolioState {
    pub fn new(initial_capital: f64) -> Self {
        PortfolioState {
            cash: initial_capital,
            initial_capital,
            position: None,
            last_price: None,
            equity: initial_capital,
            peak_equity: initial_capital,
            current_drawdown: 0.0,
        }
    }

    pub fn quantity(&self) -> i64 {
        self.position.as_ref().map_or(0, |p| p.quantity)
    }

    /// Equity at `price` without touching state.
    pub fn equity_at(&self, price: f64) -> f64 {
        self.cash + self.quantity() as f64 * price
    }

    /// Mark to market: equity = cash + quantity × price. The drawdown is
    /// measured against the observed peak; the peak itself is untouched.
    pub fn mark(&mut self, price: f64) {
        self.last_price = Some(price);
        self.equity = self.equity_at(price);
        self.current_drawdown = drawdown_from(self.equity, self.peak_equity.max(self.equity));
    }

    /// Fold the current equity into the peak. Called once per recorded
    /// equity point, after any fill, so the peak only ever holds equity
    /// that appears on the curve.
    pub fn observe(&mut self) {
        if self.equity > self.peak_equity {
            self.peak_equity = self.equity;
        }
        self.current_drawdown = drawdown_from(self.equity, self.peak_equity);
    }

    /// Reset the peak to an earlier observation, for when the last
    /// recorded point is withdrawn.
    pub(crate) fn restore_peak(&mut self, peak: f64) {
        self.peak_equity = peak;
        self.current_drawdown = drawdown_from(self.equity, self.peak_equity.max(self.equity));
    }
}

fn drawdown_from(equity: f64, peak: f64) -> f64 {
    if peak > 0.0 {
        ((equity - peak) / peak).min(0.0)
    } else {
        0.0
    }
}
