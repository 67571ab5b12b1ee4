//! Bollinger Bands mean reversion: BUY when the close climbs back above the
//! lower band, SELL when it drops back below the upper band.

use super::{current_bar, SignalGenerator};
use crate::domain::bar::{closes, Bar};
use crate::domain::error::TradesimError;
use crate::domain::indicator::{bollinger, IndicatorType};
use crate::domain::signal::{Signal, SignalKind};

#[derive(Debug, Clone, PartialEq)]
pub struct BollingerBands {
    period: usize,
    num_std_dev: f64,
}

impl BollingerBands {
    pub fn new(period: usize, num_std_dev: f64) -> Result<Self, TradesimError> {
        if period < 2 {
            return Err(TradesimError::invalid_config("period", "must be at least 2"));
        }
        if !num_std_dev.is_finite() || num_std_dev <= 0.0 {
            return Err(TradesimError::invalid_config(
                "num_std_dev",
                "must be positive",
            ));
        }
        Ok(BollingerBands {
            period,
            num_std_dev,
        })
    }

    pub fn period(&self) -> usize {
        self.period
    }

    pub fn num_std_dev(&self) -> f64 {
        self.num_std_dev
    }
}

impl SignalGenerator for BollingerBands {
    fn id(&self) -> String {
        format!("bollinger_bands({},{})", self.period, self.num_std_dev)
    }

    fn min_bars(&self) -> usize {
        self.period + 1
    }

    fn indicators(&self) -> Vec<IndicatorType> {
        vec![IndicatorType::Bollinger {
            period: self.period,
            stddev_mult_x100: (self.num_std_dev * 100.0).round() as u32,
        }]
    }

    fn evaluate(&self, window: &[Bar]) -> Result<Signal, TradesimError> {
        let (bar, ready) = current_bar(window, self.min_bars())?;
        let id = self.id();
        if !ready {
            return Ok(Signal::hold(bar.timestamp, &id));
        }

        let tail = closes(&window[window.len() - self.min_bars()..]);
        let bands = bollinger(&tail, self.period, self.num_std_dev)?;
        let last = tail.len() - 1;
        let (Some(prev_band), Some(band)) = (bands[last - 1], bands[last]) else {
            return Ok(Signal::hold(bar.timestamp, &id));
        };
        let prev_close = tail[last - 1];
        let close = tail[last];

        let kind = if prev_close < prev_band.lower && close > band.lower {
            SignalKind::Buy
        } else if prev_close > prev_band.upper && close < band.upper {
            SignalKind::Sell
        } else {
            return Ok(Signal::hold(bar.timestamp, &id));
        };

        let half_width = band.half_width();
        let strength = if half_width > 0.0 {
            (close - band.middle).abs() / half_width
        } else {
            0.0
        };
        Ok(Signal::directional(bar.timestamp, kind, strength, &id))
    }
}
