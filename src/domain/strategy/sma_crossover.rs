//! SMA crossover: BUY when the fast average crosses above the slow one,
//! SELL on the downward cross.

use super::{current_bar, SignalGenerator};
use crate::domain::bar::{closes, Bar};
use crate::domain::error::TradesimError;
use crate::domain::indicator::{sma, IndicatorType};
use crate::domain::signal::{Signal, SignalKind};

#[derive(Debug, Clone, PartialEq)]
pub struct SmaCrossover {
    fast_period: usize,
    slow_period: usize,
}

impl SmaCrossover {
    pub fn new(fast_period: usize, slow_period: usize) -> Result<Self, TradesimError> {
        if fast_period == 0 {
            return Err(TradesimError::invalid_config("fast_period", "must be positive"));
        }
        if slow_period <= fast_period {
            return Err(TradesimError::invalid_config(
                "slow_period",
                "must be greater than fast_period",
            ));
        }
        Ok(SmaCrossover {
            fast_period,
            slow_period,
        })
    }

    pub fn fast_period(&self) -> usize {
        self.fast_period
    }

    pub fn slow_period(&self) -> usize {
        self.slow_period
    }
}

impl SignalGenerator for SmaCrossover {
    fn id(&self) -> String {
        format!("sma_crossover({},{})", self.fast_period, self.slow_period)
    }

    fn min_bars(&self) -> usize {
        self.slow_period + 1
    }

    fn indicators(&self) -> Vec<IndicatorType> {
        vec![
            IndicatorType::Sma(self.fast_period),
            IndicatorType::Sma(self.slow_period),
        ]
    }

    fn evaluate(&self, window: &[Bar]) -> Result<Signal, TradesimError> {
        let (bar, ready) = current_bar(window, self.min_bars())?;
        let id = self.id();
        if !ready {
            return Ok(Signal::hold(bar.timestamp, &id));
        }

        // Only the trailing slow+1 closes matter: both averages at the
        // current and the prior bar.
        let tail = closes(&window[window.len() - self.min_bars()..]);
        let fast = sma(&tail, self.fast_period)?;
        let slow = sma(&tail, self.slow_period)?;
        let last = tail.len() - 1;

        let (Some(fast_prev), Some(slow_prev), Some(fast_now), Some(slow_now)) =
            (fast[last - 1], slow[last - 1], fast[last], slow[last])
        else {
            return Ok(Signal::hold(bar.timestamp, &id));
        };

        let kind = if fast_prev <= slow_prev && fast_now > slow_now {
            SignalKind::Buy
        } else if fast_prev >= slow_prev && fast_now < slow_now {
            SignalKind::Sell
        } else {
            return Ok(Signal::hold(bar.timestamp, &id));
        };

        let strength = (fast_now - slow_now).abs() / bar.close * 100.0;
        Ok(Signal::directional(bar.timestamp, kind, strength, &id))
    }
}
