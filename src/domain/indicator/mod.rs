//! Technical indicator implementations.
//!
//! Every indicator is a pure function over a price slice producing a parallel
//! `Vec` of equal length. Entries without enough trailing history are `None`.
//! Inputs are never mutated.

pub mod bollinger;
pub mod rsi;
pub mod sma;
pub mod stddev;

pub use bollinger::{bollinger, BollingerBand};
pub use rsi::{rsi, WilderRsi};
pub use sma::sma;
pub use stddev::stddev;

use std::fmt;

use super::error::TradesimError;

/// Indicator identity plus parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndicatorType {
    Sma(usize),
    Rsi(usize),
    Bollinger {
        period: usize,
        stddev_mult_x100: u32,
    },
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Sma(period) => write!(f, "SMA({})", period),
            IndicatorType::Rsi(period) => write!(f, "RSI({})", period),
            IndicatorType::Bollinger {
                period,
                stddev_mult_x100,
            } => {
                let mult = *stddev_mult_x100 as f64 / 100.0;
                write!(f, "BOLLINGER({},{})", period, mult)
            }
        }
    }
}

/// Shared guard: `period` must be positive and the series at least that long.
pub(crate) fn check_period(series: &[f64], period: usize) -> Result<(), TradesimError> {
    if period == 0 {
        return Err(TradesimError::invalid_config("period", "must be positive"));
    }
    if series.len() < period {
        return Err(TradesimError::InsufficientData {
            required: period,
            available: series.len(),
        });
    }
    Ok(())
}
