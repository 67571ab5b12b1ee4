//! Backtest runs: configuration, the sequential fold over a bar series,
//! and parallel comparison of independent runs.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::bar::{Bar, validate_series};
use super::engine::Engine;
use super::error::TradesimError;
use super::execution::ExecutionConfig;
use super::metrics::{AnalysisConfig, Metrics};
use super::portfolio::{DrawdownPoint, EquityPoint, PortfolioState};
use super::position::{Trade, TradeReason};
use super::risk::{RiskLimits, RiskState};
use super::strategy::{SignalGenerator, StrategyConfig};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    pub symbol: String,
    pub initial_capital: f64,
    pub execution: ExecutionConfig,
    pub risk_limits: RiskLimits,
    pub periods_per_year: f64,
    pub risk_free_rate: f64,
    /// Force-close an open position at the final bar so final equity is
    /// all cash.
    pub close_open_position: bool,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            symbol: "DEMO".to_string(),
            initial_capital: 10_000.0,
            execution: ExecutionConfig::default(),
            risk_limits: RiskLimits::default(),
            periods_per_year: 252.0,
            risk_free_rate: 0.0,
            close_open_position: true,
        }
    }
}

impl BacktestConfig {
    pub fn validate(&self) -> Result<(), TradesimError> {
        if self.symbol.trim().is_empty() {
            return Err(TradesimError::invalid_config("symbol", "must not be empty"));
        }
        if !self.initial_capital.is_finite() || self.initial_capital <= 0.0 {
            return Err(TradesimError::invalid_config(
                "initial_capital",
                format!("must be positive, got {}", self.initial_capital),
            ));
        }
        self.execution.validate()?;
        self.risk_limits.validate()?;
        self.analysis().validate()
    }

    pub fn analysis(&self) -> AnalysisConfig {
        AnalysisConfig {
            periods_per_year: self.periods_per_year,
            risk_free_rate: self.risk_free_rate,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    pub symbol: String,
    pub strategy: StrategyConfig,
    pub strategy_id: String,
    pub bars_processed: usize,
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<EquityPoint>,
    pub drawdown_curve: Vec<DrawdownPoint>,
    pub metrics: Metrics,
    pub final_state: PortfolioState,
    pub risk_state: RiskState,
}

impl BacktestResult {
    /// Snapshot the engine's current state; the engine is left untouched.
    pub fn from_engine(engine: &Engine, analysis: &AnalysisConfig) -> Self {
        BacktestResult {
            symbol: engine.symbol().to_string(),
            strategy: engine.strategy().config(),
            strategy_id: engine.strategy().id(),
            bars_processed: engine.bars_seen(),
            trades: engine.trades().to_vec(),
            equity_curve: engine.equity_curve().to_vec(),
            drawdown_curve: engine.drawdown_curve().to_vec(),
            metrics: Metrics::compute(engine.equity_curve(), engine.trades(), analysis),
            final_state: engine.portfolio().clone(),
            risk_state: engine.risk_state().clone(),
        }
    }

    pub fn final_equity(&self) -> f64 {
        self.final_state.equity
    }
}

/// Run one strategy over `bars`. Fails fast: a bad configuration or series
/// yields an error, never a partial result.
pub fn run_backtest(
    bars: &[Bar],
    strategy: &StrategyConfig,
    config: &BacktestConfig,
) -> Result<BacktestResult, TradesimError> {
    config.validate()?;
    let strategy = strategy.build()?;
    validate_series(bars)?;

    let required = strategy.min_bars();
    if bars.len() < required {
        return Err(TradesimError::InsufficientData {
            required,
            available: bars.len(),
        });
    }

    info!(
        symbol = %config.symbol,
        strategy = %strategy.id(),
        bars = bars.len(),
        "starting backtest"
    );

    let mut engine = Engine::new(
        &config.symbol,
        strategy,
        config.risk_limits.clone(),
        config.initial_capital,
        config.execution.clone(),
    )?;

    for bar in bars {
        engine.on_bar(bar.clone())?;
    }

    if config.close_open_position {
        engine.liquidate(TradeReason::EndOfRun);
    }

    let result = BacktestResult::from_engine(&engine, &config.analysis());
    info!(
        symbol = %result.symbol,
        strategy = %result.strategy_id,
        trades = result.trades.len(),
        total_return = result.metrics.total_return,
        "backtest complete"
    );
    Ok(result)
}

/// One independent run for [`run_many`].
#[derive(Debug, Clone)]
pub struct BacktestJob<'a> {
    pub bars: &'a [Bar],
    pub strategy: StrategyConfig,
    pub config: BacktestConfig,
}

/// Run independent backtests in parallel. Results come back in input order,
/// each with its own success or failure.
pub fn run_many(jobs: &[BacktestJob<'_>]) -> Vec<Result<BacktestResult, TradesimError>> {
    jobs.par_iter()
        .map(|job| run_backtest(job.bars, &job.strategy, &job.config))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRow {
    pub strategy_id: String,
    pub symbol: String,
    pub total_return: f64,
    pub max_drawdown: f64,
    pub sharpe_ratio: Option<f64>,
    pub win_rate: Option<f64>,
    pub volatility: Option<f64>,
    pub total_trades: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricLeader {
    pub strategy_id: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub rows: Vec<ComparisonRow>,
    pub best_total_return: Option<MetricLeader>,
    pub best_sharpe_ratio: Option<MetricLeader>,
    /// Least severe max drawdown (closest to zero).
    pub best_max_drawdown: Option<MetricLeader>,
    pub best_win_rate: Option<MetricLeader>,
}

/// Rank finished runs. Undefined metrics (None) never lead; ties go to the
/// earlier run.
pub fn compare(results: &[BacktestResult]) -> Comparison {
    let rows: Vec<ComparisonRow> = results
        .iter()
        .map(|r| ComparisonRow {
            strategy_id: r.strategy_id.clone(),
            symbol: r.symbol.clone(),
            total_return: r.metrics.total_return,
            max_drawdown: r.metrics.max_drawdown,
            sharpe_ratio: r.metrics.sharpe_ratio,
            win_rate: r.metrics.win_rate,
            volatility: r.metrics.volatility,
            total_trades: r.metrics.total_trades,
        })
        .collect();

    Comparison {
        best_total_return: leader(&rows, |r| Some(r.total_return)),
        best_sharpe_ratio: leader(&rows, |r| r.sharpe_ratio),
        best_max_drawdown: leader(&rows, |r| Some(r.max_drawdown)),
        best_win_rate: leader(&rows, |r| r.win_rate),
        rows,
    }
}

fn leader(rows: &[ComparisonRow], metric: impl Fn(&ComparisonRow) -> Option<f64>) -> Option<MetricLeader> {
    let mut best: Option<MetricLeader> = None;
    for row in rows {
        let Some(value) = metric(row) else { continue };
        if value.is_nan() {
            continue;
        }
        if best.as_ref().is_none_or(|b| value > b.value) {
            best = Some(MetricLeader {
                strategy_id: row.strategy_id.clone(),
                value,
            });
        }
    }
    best
}
