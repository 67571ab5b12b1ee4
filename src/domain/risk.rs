//! Risk limits and the per-bar risk gate.
//!
//! The manager is consulted before the strategy's signal is acted on. A
//! forced exit always wins over the signal, and once the drawdown limit is
//! breached the run is halted: no further entries for the rest of the run.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::error::TradesimError;
use super::position::{Position, TradeReason};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskLimits {
    /// Fraction of current equity a single entry may commit, in (0, 1].
    pub max_position_fraction: f64,
    /// Drawdown from peak equity that halts the run, in (0, 1].
    pub max_drawdown_fraction: f64,
    /// Stop-loss distance below entry; 0 disables.
    pub stop_loss_pct: f64,
    /// Take-profit distance above entry; 0 disables.
    pub take_profit_pct: f64,
}

impl Default for RiskLimits {
    fn default() -> Self {
        RiskLimits {
            max_position_fraction: 0.2,
            max_drawdown_fraction: 0.15,
            stop_loss_pct: 0.05,
            take_profit_pct: 0.15,
        }
    }
}

impl RiskLimits {
    pub fn validate(&self) -> Result<(), TradesimError> {
        let f = self.max_position_fraction;
        if !f.is_finite() || f <= 0.0 || f > 1.0 {
            return Err(TradesimError::invalid_config(
                "max_position_fraction",
                format!("must be in (0, 1], got {}", f),
            ));
        }
        let d = self.max_drawdown_fraction;
        if !d.is_finite() || d <= 0.0 || d > 1.0 {
            return Err(TradesimError::invalid_config(
                "max_drawdown_fraction",
                format!("must be in (0, 1], got {}", d),
            ));
        }
        let sl = self.stop_loss_pct;
        if !sl.is_finite() || !(0.0..1.0).contains(&sl) {
            return Err(TradesimError::invalid_config(
                "stop_loss_pct",
                format!("must be in [0, 1), got {}", sl),
            ));
        }
        let tp = self.take_profit_pct;
        if !tp.is_finite() || tp < 0.0 {
            return Err(TradesimError::invalid_config(
                "take_profit_pct",
                format!("must be a non-negative number, got {}", tp),
            ));
        }
        Ok(())
    }

    pub fn stop_loss_price(&self, entry_price: f64) -> Option<f64> {
        (self.stop_loss_pct > 0.0).then(|| entry_price * (1.0 - self.stop_loss_pct))
    }

    pub fn take_profit_price(&self, entry_price: f64) -> Option<f64> {
        (self.take_profit_pct > 0.0).then(|| entry_price * (1.0 + self.take_profit_pct))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RiskState {
    Active,
    Halted { at: NaiveDateTime, drawdown: f64 },
}

impl RiskState {
    pub fn is_halted(&self) -> bool {
        matches!(self, RiskState::Halted { .. })
    }
}

/// Outcome of one risk assessment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskDecision {
    pub forced_exit: Option<TradeReason>,
    pub entries_allowed: bool,
}

#[derive(Debug, Clone)]
pub struct RiskManager {
    limits: RiskLimits,
    state: RiskState,
}

impl RiskManager {
    pub fn new(limits: RiskLimits) -> Result<Self, TradesimError> {
        limits.validate()?;
        Ok(RiskManager {
            limits,
            state: RiskState::Active,
        })
    }

    pub fn limits(&self) -> &RiskLimits {
        &self.limits
    }

    pub fn state(&self) -> &RiskState {
        &self.state
    }

    /// Assess the marked portfolio at `price`.
    ///
    /// Precedence: drawdown halt, then stop-loss, then take-profit. The
    /// transition to `Halted` happens at most once.
    pub fn assess(
        &mut self,
        timestamp: NaiveDateTime,
        position: Option<&Position>,
        price: f64,
        drawdown: f64,
    ) -> RiskDecision {
        if !self.state.is_halted() && drawdown <= -self.limits.max_drawdown_fraction {
            warn!(
                %timestamp,
                drawdown,
                limit = self.limits.max_drawdown_fraction,
                "max drawdown breached, halting new entries"
            );
            self.state = RiskState::Halted {
                at: timestamp,
                drawdown,
            };
            return RiskDecision {
                forced_exit: position.map(|_| TradeReason::MaxDrawdown),
                entries_allowed: false,
            };
        }

        let entries_allowed = !self.state.is_halted();
        let forced_exit = match position {
            Some(pos) if pos.should_stop_loss(price) => {
                info!(%timestamp, price, stop = ?pos.stop_loss, "stop-loss triggered");
                Some(TradeReason::StopLoss)
            }
            Some(pos) if pos.should_take_profit(price) => {
                info!(%timestamp, price, target = ?pos.take_profit, "take-profit triggered");
                Some(TradeReason::TakeProfit)
            }
            _ => None,
        };

        RiskDecision {
            forced_exit,
            entries_allowed,
        }
    }
}
