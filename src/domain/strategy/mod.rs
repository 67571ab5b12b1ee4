//! Strategy evaluators.
//!
//! Every strategy implements [`SignalGenerator`]: given the bars up to and
//! including the current one it returns exactly one [`Signal`]. Strategies
//! are pure; the same window always yields the same signal and nothing past
//! the window's last bar is ever read.
//!
//! [`Strategy`] is the closed set of built-in variants. Adding a strategy
//! means adding a variant here, never touching the execution side.

pub mod bollinger_bands;
pub mod rsi_momentum;
pub mod sma_crossover;

pub use bollinger_bands::BollingerBands;
pub use rsi_momentum::RsiMomentum;
pub use sma_crossover::SmaCrossover;

use serde::{Deserialize, Serialize};

use super::bar::Bar;
use super::error::TradesimError;
use super::indicator::IndicatorType;
use super::signal::Signal;

pub trait SignalGenerator {
    /// Stable identifier, also used as the signal source.
    fn id(&self) -> String;

    /// Bars required before the strategy can emit anything but HOLD.
    fn min_bars(&self) -> usize;

    fn indicators(&self) -> Vec<IndicatorType>;

    fn evaluate(&self, window: &[Bar]) -> Result<Signal, TradesimError>;
}

/// Plain-value strategy selection, as supplied by callers and config files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StrategyConfig {
    SmaCrossover {
        fast_period: usize,
        slow_period: usize,
    },
    RsiMomentum {
        period: usize,
        oversold: f64,
        overbought: f64,
    },
    BollingerBands {
        period: usize,
        num_std_dev: f64,
    },
}

impl StrategyConfig {
    /// One of each strategy with its conventional parameters.
    pub fn all_defaults() -> Vec<StrategyConfig> {
        vec![
            StrategyConfig::SmaCrossover {
                fast_period: 20,
                slow_period: 50,
            },
            StrategyConfig::RsiMomentum {
                period: 14,
                oversold: 30.0,
                overbought: 70.0,
            },
            StrategyConfig::BollingerBands {
                period: 20,
                num_std_dev: 2.0,
            },
        ]
    }

    pub fn build(&self) -> Result<Strategy, TradesimError> {
        Ok(match *self {
            StrategyConfig::SmaCrossover {
                fast_period,
                slow_period,
            } => Strategy::SmaCrossover(SmaCrossover::new(fast_period, slow_period)?),
            StrategyConfig::RsiMomentum {
                period,
                oversold,
                overbought,
            } => Strategy::RsiMomentum(RsiMomentum::new(period, oversold, overbought)?),
            StrategyConfig::BollingerBands {
                period,
                num_std_dev,
            } => Strategy::BollingerBands(BollingerBands::new(period, num_std_dev)?),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Strategy {
    SmaCrossover(SmaCrossover),
    RsiMomentum(RsiMomentum),
    BollingerBands(BollingerBands),
}

impl Strategy {
    pub fn config(&self) -> StrategyConfig {
        match self {
            Strategy::SmaCrossover(s) => StrategyConfig::SmaCrossover {
                fast_period: s.fast_period(),
                slow_period: s.slow_period(),
            },
            Strategy::RsiMomentum(s) => StrategyConfig::RsiMomentum {
                period: s.period(),
                oversold: s.oversold(),
                overbought: s.overbought(),
            },
            Strategy::BollingerBands(s) => StrategyConfig::BollingerBands {
                period: s.period(),
                num_std_dev: s.num_std_dev(),
            },
        }
    }

    fn inner(&self) -> &dyn SignalGenerator {
        match self {
            Strategy::SmaCrossover(s) => s,
            Strategy::RsiMomentum(s) => s,
            Strategy::BollingerBands(s) => s,
        }
    }
}

impl SignalGenerator for Strategy {
    fn id(&self) -> String {
        self.inner().id()
    }

    fn min_bars(&self) -> usize {
        self.inner().min_bars()
    }

    fn indicators(&self) -> Vec<IndicatorType> {
        self.inner().indicators()
    }

    fn evaluate(&self, window: &[Bar]) -> Result<Signal, TradesimError> {
        self.inner().evaluate(window)
    }
}

/// Common prologue: the current bar, and whether the window is long enough
/// to evaluate. A short window means HOLD.
pub(crate) fn current_bar<'a>(
    window: &'a [Bar],
    min_bars: usize,
) -> Result<(&'a Bar, bool), TradesimError> {
    let current = window.last().ok_or(TradesimError::InsufficientData {
        required: min_bars,
        available: 0,
    })?;
    Ok((current, window.len() >= min_bars))
}
