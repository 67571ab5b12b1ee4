#![allow(dead_code)]

use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::collections::HashMap;
use tradesim::domain::backtest::BacktestConfig;
use tradesim::domain::bar::Bar;
use tradesim::domain::error::TradesimError;
use tradesim::domain::execution::ExecutionConfig;
use tradesim::domain::risk::RiskLimits;
use tradesim::domain::strategy::StrategyConfig;
use tradesim::ports::data_port::DataPort;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<Bar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<Bar>) -> Self {
        self.data.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_bars(&self, symbol: &str) -> Result<Vec<Bar>, TradesimError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(TradesimError::DataSource {
                reason: reason.clone(),
            });
        }
        Ok(self.data.get(symbol).cloned().unwrap_or_default())
    }

    fn list_symbols(&self) -> Result<Vec<String>, TradesimError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }
}

pub fn start() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

pub fn day(i: usize) -> NaiveDateTime {
    start() + Duration::days(i as i64)
}

/// Daily bars with open = high = low = close.
pub fn bars_from_closes(closes: &[f64]) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| Bar {
            timestamp: day(i),
            open: close,
            high: close,
            low: close,
            close,
            volume: 1000.0,
        })
        .collect()
}

pub fn flat_bars(count: usize, price: f64) -> Vec<Bar> {
    bars_from_closes(&vec![price; count])
}

/// `flat` bars at 100, then `rising` bars climbing by 1 each.
pub fn flat_then_rising(flat: usize, rising: usize) -> Vec<Bar> {
    let closes: Vec<f64> = (0..flat)
        .map(|_| 100.0)
        .chain((1..=rising).map(|i| 100.0 + i as f64))
        .collect();
    bars_from_closes(&closes)
}

pub fn sma(fast_period: usize, slow_period: usize) -> StrategyConfig {
    StrategyConfig::SmaCrossover {
        fast_period,
        slow_period,
    }
}

pub fn no_exit_limits() -> RiskLimits {
    RiskLimits {
        max_position_fraction: 0.5,
        max_drawdown_fraction: 0.99,
        stop_loss_pct: 0.0,
        take_profit_pct: 0.0,
    }
}

pub fn frictionless_config(symbol: &str) -> BacktestConfig {
    BacktestConfig {
        symbol: symbol.to_string(),
        initial_capital: 10_000.0,
        execution: ExecutionConfig::frictionless(),
        risk_limits: no_exit_limits(),
        ..BacktestConfig::default()
    }
}
