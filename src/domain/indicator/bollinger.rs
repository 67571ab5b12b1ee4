//! Bollinger Bands indicator.
//!
//! Bollinger Bands consist of:
//! - Middle: Simple Moving Average (SMA) over n periods
//! - Upper: Middle + (multiplier × StdDev)
//! - Lower: Middle - (multiplier × StdDev)
//!
//! Where StdDev is population standard deviation (divides by N, not N-1).
//!
//! Default parameters: period=20, multiplier=2.0
//! Warmup: first (period-1) entries are `None`.

use serde::{Deserialize, Serialize};

use super::check_period;
use super::stddev::window_mean_stddev;
use crate::domain::error::TradesimError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BollingerBand {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

impl BollingerBand {
    /// Distance from the middle band to either outer band.
    pub fn half_width(&self) -> f64 {
        (self.upper - self.lower) / 2.0
    }
}

pub fn bollinger(
    series: &[f64],
    period: usize,
    num_std_dev: f64,
) -> Result<Vec<Option<BollingerBand>>, TradesimError> {
    if !num_std_dev.is_finite() || num_std_dev < 0.0 {
        return Err(TradesimError::invalid_config(
            "num_std_dev",
            "must be a non-negative number",
        ));
    }
    check_period(series, period)?;

    let warmup = period - 1;
    let values = (0..series.len())
        .map(|i| {
            if i < warmup {
                return None;
            }
            let (middle, sd) = window_mean_stddev(&series[i + 1 - period..=i]);
            Some(BollingerBand {
                upper: middle + num_std_dev * sd,
                middle,
                lower: middle - num_std_dev * sd,
            })
        })
        .collect();

    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bollinger_warmup() {
        let values = bollinger(&[10.0, 20.0, 30.0, 40.0, 50.0], 3, 2.0).unwrap();

        assert!(values[0].is_none());
        assert!(values[1].is_none());
        assert!(values[2].is_some());
        assert!(values[3].is_some());
        assert!(values[4].is_some());
    }

    #[test]
    fn bollinger_constant_values() {
        let values = bollinger(&[100.0, 100.0, 100.0, 100.0, 100.0], 3, 2.0).unwrap();
        let band = values[2].unwrap();

        assert!((band.middle - 100.0).abs() < f64::EPSILON);
        assert!((band.upper - 100.0).abs() < f64::EPSILON);
        assert!((band.lower - 100.0).abs() < f64::EPSILON);
        assert!(band.half_width().abs() < f64::EPSILON);
    }

    #[test]
    fn bollinger_basic_calculation() {
        let values = bollinger(&[10.0, 20.0, 30.0], 3, 2.0).unwrap();
        let band = values[2].unwrap();

        let expected_middle: f64 = (10.0 + 20.0 + 30.0) / 3.0;
        let variance: f64 = ((10.0 - expected_middle).powi(2)
            + (20.0 - expected_middle).powi(2)
            + (30.0 - expected_middle).powi(2))
            / 3.0;
        let stddev = variance.sqrt();

        assert!((band.middle - expected_middle).abs() < 1e-10);
        assert!((band.upper - (expected_middle + 2.0 * stddev)).abs() < 1e-10);
        assert!((band.lower - (expected_middle - 2.0 * stddev)).abs() < 1e-10);
    }

    #[test]
    fn bollinger_multiplier_variations() {
        let one = bollinger(&[10.0, 20.0, 30.0], 3, 1.0).unwrap()[2].unwrap();
        let two = bollinger(&[10.0, 20.0, 30.0], 3, 2.0).unwrap()[2].unwrap();

        assert!((one.middle - two.middle).abs() < 1e-10);
        assert!((two.half_width() - 2.0 * one.half_width()).abs() < 1e-10);
    }

    #[test]
    fn bollinger_symmetry() {
        let band = bollinger(&[10.0, 20.0, 30.0], 3, 2.0).unwrap()[2].unwrap();
        let upper_dist = band.upper - band.middle;
        let lower_dist = band.middle - band.lower;
        assert!((upper_dist - lower_dist).abs() < 1e-10);
    }

    #[test]
    fn bollinger_rejects_negative_multiplier() {
        assert!(matches!(
            bollinger(&[10.0, 20.0, 30.0], 3, -1.0),
            Err(TradesimError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn bollinger_insufficient_data() {
        assert!(matches!(
            bollinger(&[10.0, 20.0], 3, 2.0),
            Err(TradesimError::InsufficientData { .. })
        ));
    }
}
