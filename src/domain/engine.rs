//! Per-bar pipeline shared by backtests and paper-trading sessions.

use chrono::NaiveDateTime;
use tracing::{debug, info};

use super::bar::Bar;
use super::error::TradesimError;
use super::execution::{EntryResult, ExecutionConfig, ExecutionSimulator, ExecutionState};
use super::portfolio::{DrawdownPoint, EquityPoint, PortfolioState};
use super::position::{Trade, TradeReason};
use super::risk::{RiskLimits, RiskManager, RiskState};
use super::signal::{Signal, SignalKind};
use super::strategy::{SignalGenerator, Strategy};

/// Owns all mutable state of one run: bar history, simulator, risk state
/// and the recorded curves.
#[derive(Debug, Clone)]
pub struct Engine {
    symbol: String,
    strategy: Strategy,
    risk: RiskManager,
    simulator: ExecutionSimulator,
    history: Vec<Bar>,
    signals: Vec<Signal>,
    equity_curve: Vec<EquityPoint>,
    drawdown_curve: Vec<DrawdownPoint>,
}

impl Engine {
    pub fn new(
        symbol: &str,
        strategy: Strategy,
        limits: RiskLimits,
        initial_capital: f64,
        execution: ExecutionConfig,
    ) -> Result<Self, TradesimError> {
        Ok(Engine {
            symbol: symbol.to_string(),
            strategy,
            risk: RiskManager::new(limits)?,
            simulator: ExecutionSimulator::new(symbol, initial_capital, execution)?,
            history: Vec::new(),
            signals: Vec::new(),
            equity_curve: Vec::new(),
            drawdown_curve: Vec::new(),
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn strategy(&self) -> &Strategy {
        &self.strategy
    }

    pub fn portfolio(&self) -> &PortfolioState {
        self.simulator.portfolio()
    }

    pub fn execution_state(&self) -> ExecutionState {
        self.simulator.state()
    }

    pub fn risk_state(&self) -> &RiskState {
        self.risk.state()
    }

    pub fn trades(&self) -> &[Trade] {
        self.simulator.trades()
    }

    pub fn signals(&self) -> &[Signal] {
        &self.signals
    }

    pub fn equity_curve(&self) -> &[EquityPoint] {
        &self.equity_curve
    }

    pub fn drawdown_curve(&self) -> &[DrawdownPoint] {
        &self.drawdown_curve
    }

    pub fn bars_seen(&self) -> usize {
        self.history.len()
    }

    pub fn last_timestamp(&self) -> Option<NaiveDateTime> {
        self.history.last().map(|b| b.timestamp)
    }

    /// Feed one bar through the pipeline. At most one trade results.
    ///
    /// A rejected bar (out of order or unusable price) leaves the engine
    /// untouched.
    pub fn on_bar(&mut self, bar: Bar) -> Result<Option<Trade>, TradesimError> {
        if let Some(last) = self.last_timestamp() {
            if bar.timestamp <= last {
                return Err(TradesimError::OutOfOrderTick {
                    last,
                    received: bar.timestamp,
                });
            }
        }
        if !bar.close.is_finite() || bar.close <= 0.0 {
            return Err(TradesimError::InvalidBars {
                reason: format!("bar at {} has invalid close {}", bar.timestamp, bar.close),
            });
        }

        let timestamp = bar.timestamp;
        let price = bar.close;
        self.history.push(bar);

        let signal = match self.strategy.evaluate(&self.history) {
            Ok(signal) => signal,
            Err(err) => {
                self.history.pop();
                return Err(err);
            }
        };

        self.simulator.mark(price);
        let decision = self.risk.assess(
            timestamp,
            self.simulator.position(),
            price,
            self.simulator.portfolio().current_drawdown,
        );

        let trade = if let Some(reason) = decision.forced_exit {
            if !signal.is_hold() {
                debug!(%timestamp, kind = %signal.kind, %reason, "signal discarded by forced exit");
            }
            self.simulator.exit(timestamp, price, reason)
        } else {
            self.apply_signal(&signal, timestamp, price, decision.entries_allowed)
        };

        if let Some(trade) = &trade {
            info!(
                %timestamp,
                action = ?trade.action,
                price = trade.price,
                quantity = trade.quantity,
                reason = %trade.reason,
                "fill"
            );
        }

        self.signals.push(signal);
        self.record_point(timestamp);
        Ok(trade)
    }

    fn apply_signal(
        &mut self,
        signal: &Signal,
        timestamp: NaiveDateTime,
        price: f64,
        entries_allowed: bool,
    ) -> Option<Trade> {
        match signal.kind {
            SignalKind::Buy if entries_allowed => {
                match self.simulator.enter_long(timestamp, price, self.risk.limits()) {
                    EntryResult::Filled(trade) => Some(trade),
                    EntryResult::AlreadyHolding | EntryResult::ZeroQuantity => None,
                }
            }
            SignalKind::Buy => {
                debug!(%timestamp, "entry suppressed: risk halted");
                None
            }
            SignalKind::Sell => self.simulator.exit(timestamp, price, TradeReason::Signal),
            SignalKind::Hold => None,
        }
    }

    /// Close any open position at the last seen close, replacing that
    /// bar's equity and drawdown points with the post-fill values.
    pub fn liquidate(&mut self, reason: TradeReason) -> Option<Trade> {
        let last = self.history.last()?;
        let (timestamp, price) = (last.timestamp, last.close);
        let trade = self.simulator.exit(timestamp, price, reason)?;
        info!(%timestamp, price, quantity = trade.quantity, %reason, "position liquidated");
        self.equity_curve.pop();
        self.drawdown_curve.pop();
        let peak = self
            .equity_curve
            .iter()
            .map(|point| point.equity)
            .fold(self.simulator.portfolio().initial_capital, f64::max);
        self.simulator.restore_peak(peak);
        self.record_point(timestamp);
        Some(trade)
    }

    /// The peak folds in only equity that lands on the curve, so the
    /// drawdown curve always matches one rebuilt from the equity curve.
    fn record_point(&mut self, timestamp: NaiveDateTime) {
        self.simulator.observe();
        let portfolio = self.simulator.portfolio();
        self.equity_curve.push(EquityPoint {
            timestamp,
            equity: portfolio.equity,
        });
        self.drawdown_curve.push(DrawdownPoint {
            timestamp,
            drawdown: portfolio.current_drawdown,
        });
    }
}
