//! Fill simulation: position sizing, commission and slippage.
//!
//! The simulator is a two-state machine (`Idle -> Holding -> Idle`) over a
//! single long position. Fills happen at the bar's reference close; the
//! frictions are charged as cash, so `equity == cash + quantity × price`
//! holds at every mark.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::TradesimError;
use super::portfolio::PortfolioState;
use super::position::{Position, Trade, TradeAction, TradeReason};
use super::risk::RiskLimits;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionConfig {
    pub commission_rate: f64,
    pub slippage_rate: f64,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        ExecutionConfig {
            commission_rate: 0.001,
            slippage_rate: 0.0005,
        }
    }
}

impl ExecutionConfig {
    /// No commission, no slippage.
    pub fn frictionless() -> Self {
        ExecutionConfig {
            commission_rate: 0.0,
            slippage_rate: 0.0,
        }
    }

    pub fn validate(&self) -> Result<(), TradesimError> {
        for (field, rate) in [
            ("commission_rate", self.commission_rate),
            ("slippage_rate", self.slippage_rate),
        ] {
            if !rate.is_finite() || !(0.0..1.0).contains(&rate) {
                return Err(TradesimError::invalid_config(
                    field,
                    format!("must be in [0, 1), got {}", rate),
                ));
            }
        }
        Ok(())
    }

    /// Cash needed per unit bought at `price`, frictions included.
    pub fn unit_cost(&self, price: f64) -> f64 {
        price * (1.0 + self.commission_rate) * (1.0 + self.slippage_rate)
    }

    /// Cash received per unit sold at `price`, frictions deducted.
    pub fn unit_proceeds(&self, price: f64) -> f64 {
        price * (1.0 - self.commission_rate) * (1.0 - self.slippage_rate)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionState {
    Idle,
    Holding,
}

/// Result of an entry attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum EntryResult {
    Filled(Trade),
    AlreadyHolding,
    /// The sizing budget does not cover a single unit.
    ZeroQuantity,
}

#[derive(Debug, Clone)]
pub struct ExecutionSimulator {
    symbol: String,
    config: ExecutionConfig,
    portfolio: PortfolioState,
    trades: Vec<Trade>,
}

impl ExecutionSimulator {
    pub fn new(
        symbol: &str,
        initial_capital: f64,
        config: ExecutionConfig,
    ) -> Result<Self, TradesimError> {
        if !initial_capital.is_finite() || initial_capital <= 0.0 {
            return Err(TradesimError::invalid_config(
                "initial_capital",
                format!("must be positive, got {}", initial_capital),
            ));
        }
        config.validate()?;
        Ok(ExecutionSimulator {
            symbol: symbol.to_string(),
            config,
            portfolio: PortfolioState::new(initial_capital),
            trades: Vec::new(),
        })
    }

    pub fn state(&self) -> ExecutionState {
        if self.portfolio.position.is_some() {
            ExecutionState::Holding
        } else {
            ExecutionState::Idle
        }
    }

    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    pub fn portfolio(&self) -> &PortfolioState {
        &self.portfolio
    }

    pub fn position(&self) -> Option<&Position> {
        self.portfolio.position.as_ref()
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn mark(&mut self, price: f64) {
        self.portfolio.mark(price);
    }

    pub fn observe(&mut self) {
        self.portfolio.observe();
    }

    pub(crate) fn restore_peak(&mut self, peak: f64) {
        self.portfolio.restore_peak(peak);
    }

    /// Open a long position sized by `limits.max_position_fraction` of
    /// current equity, capped by cash.
    pub fn enter_long(
        &mut self,
        timestamp: NaiveDateTime,
        price: f64,
        limits: &RiskLimits,
    ) -> EntryResult {
        if self.portfolio.position.is_some() {
            return EntryResult::AlreadyHolding;
        }

        let equity = self.portfolio.equity_at(price);
        let budget = (limits.max_position_fraction * equity).min(self.portfolio.cash);
        let unit_cost = self.config.unit_cost(price);
        let mut quantity = (budget / unit_cost).floor() as i64;
        // Guard against the floor landing one unit high through rounding.
        if quantity > 0 && quantity as f64 * unit_cost > self.portfolio.cash {
            quantity -= 1;
        }
        if quantity <= 0 {
            debug!(%timestamp, price, budget, "entry skipped: budget below one unit");
            return EntryResult::ZeroQuantity;
        }

        let gross = quantity as f64 * price;
        let slippage = gross * self.config.slippage_rate;
        let commission = (gross + slippage) * self.config.commission_rate;
        let cost = quantity as f64 * unit_cost;

        self.portfolio.cash -= cost;
        self.portfolio.position = Some(Position {
            symbol: self.symbol.clone(),
            quantity,
            entry_price: price,
            cost_basis: cost,
            entry_timestamp: timestamp,
            stop_loss: limits.stop_loss_price(price),
            take_profit: limits.take_profit_price(price),
        });
        self.portfolio.mark(price);

        let trade = Trade {
            timestamp,
            action: TradeAction::Buy,
            price,
            quantity,
            commission,
            slippage,
            realized_pnl: 0.0,
            reason: TradeReason::Signal,
        };
        debug!(%timestamp, price, quantity, cost, "opened long");
        self.trades.push(trade.clone());
        EntryResult::Filled(trade)
    }

    /// Close the open position at `price`. `None` when idle.
    pub fn exit(
        &mut self,
        timestamp: NaiveDateTime,
        price: f64,
        reason: TradeReason,
    ) -> Option<Trade> {
        let position = self.portfolio.position.take()?;

        let gross = position.quantity as f64 * price;
        let slippage = gross * self.config.slippage_rate;
        let commission = (gross - slippage) * self.config.commission_rate;
        let proceeds = position.quantity as f64 * self.config.unit_proceeds(price);

        self.portfolio.cash += proceeds;
        self.portfolio.mark(price);

        let trade = Trade {
            timestamp,
            action: TradeAction::Sell,
            price,
            quantity: position.quantity,
            commission,
            slippage,
            realized_pnl: proceeds - position.cost_basis,
            reason,
        };
        debug!(
            %timestamp,
            price,
            quantity = position.quantity,
            pnl = trade.realized_pnl,
            %reason,
            "closed long"
        );
        self.trades.push(trade.clone());
        Some(trade)
    }
}
