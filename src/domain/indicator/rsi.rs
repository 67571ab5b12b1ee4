//! RSI (Relative Strength Index) indicator.
//!
//! Uses Wilder's smoothing for average gain/loss calculation:
//! - First average: simple mean of gains/losses over the first n changes
//! - Subsequent: avg = (prev_avg * (n-1) + current) / n
//!
//! Formula: RSI = 100 - (100 / (1 + avg_gain / avg_loss))
//! If avg_loss == 0: RSI = 100, unless avg_gain is also 0 (flat prices),
//! in which case RSI = 50.
//!
//! Warmup: first n entries are `None` (need n price changes).

use super::check_period;
use crate::domain::error::TradesimError;

pub fn rsi(series: &[f64], period: usize) -> Result<Vec<Option<f64>>, TradesimError> {
    check_period(series, period)?;
    let mut state = WilderRsi::new(period);
    Ok(series.iter().map(|&price| state.update(price)).collect())
}

/// Running Wilder averages, advanced one price at a time. Feeding a series
/// through `update` yields exactly the values of [`rsi`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WilderRsi {
    period: usize,
    changes: usize,
    avg_gain: f64,
    avg_loss: f64,
    last_price: Option<f64>,
}

impl WilderRsi {
    pub fn new(period: usize) -> Self {
        WilderRsi {
            period,
            changes: 0,
            avg_gain: 0.0,
            avg_loss: 0.0,
            last_price: None,
        }
    }

    /// Push the next price. `None` until `period` changes have been seen.
    pub fn update(&mut self, price: f64) -> Option<f64> {
        let prev = self.last_price.replace(price)?;
        let change = price - prev;
        let gain = change.max(0.0);
        let loss = (-change).max(0.0);
        let n = self.period as f64;

        self.changes += 1;
        if self.changes < self.period {
            self.avg_gain += gain;
            self.avg_loss += loss;
            return None;
        }
        if self.changes == self.period {
            self.avg_gain = (self.avg_gain + gain) / n;
            self.avg_loss = (self.avg_loss + loss) / n;
        } else {
            self.avg_gain = (self.avg_gain * (n - 1.0) + gain) / n;
            self.avg_loss = (self.avg_loss * (n - 1.0) + loss) / n;
        }
        Some(rsi_from_averages(self.avg_gain, self.avg_loss))
    }
}

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        if avg_gain == 0.0 { 50.0 } else { 100.0 }
    } else {
        100.0 - (100.0 / (1.0 + avg_gain / avg_loss))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rsi_warmup_period() {
        let prices: Vec<f64> = (1..=15).map(|i| 100.0 + (i as f64 % 5.0) * 2.0).collect();
        let values = rsi(&prices, 14).unwrap();

        assert_eq!(values.len(), 15);
        for (i, v) in values.iter().enumerate().take(14) {
            assert!(v.is_none(), "entry {} should be undefined", i);
        }
        assert!(values[14].is_some(), "entry 14 should be defined");
    }

    #[test]
    fn rsi_exact_period_length_all_undefined() {
        let values = rsi(&[1.0, 2.0, 3.0], 3).unwrap();
        assert_eq!(values, vec![None, None, None]);
    }

    #[test]
    fn rsi_all_gains_no_losses() {
        let prices: Vec<f64> = (0..15).map(|i| 100.0 + i as f64).collect();
        let values = rsi(&prices, 14).unwrap();
        assert!((values[14].unwrap() - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn rsi_all_losses_no_gains() {
        let prices: Vec<f64> = (0..15).map(|i| 100.0 - i as f64).collect();
        let values = rsi(&prices, 14).unwrap();
        assert!((values[14].unwrap() - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn rsi_flat_series_is_neutral() {
        let prices = vec![50.0; 30];
        let values = rsi(&prices, 14).unwrap();
        for v in values.iter().skip(14) {
            assert!((v.unwrap() - 50.0).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn rsi_in_range() {
        let prices: Vec<f64> = (1..=40)
            .map(|i| 100.0 + (i as f64 % 7.0 - 3.0) * 2.0)
            .collect();
        let values = rsi(&prices, 14).unwrap();

        for v in values.into_iter().flatten() {
            assert!((0.0..=100.0).contains(&v), "RSI {} out of range", v);
        }
    }

    #[test]
    fn rsi_wilder_smoothing_step() {
        // period 2: changes +2, -1 → avg_gain 1.0, avg_loss 0.5 → RSI 66.67
        // next change +3 → avg_gain 2.0, avg_loss 0.25 → RSI 88.89
        let values = rsi(&[10.0, 12.0, 11.0, 14.0], 2).unwrap();
        assert!((values[2].unwrap() - (100.0 - 100.0 / 3.0)).abs() < 1e-10);
        assert!((values[3].unwrap() - (100.0 - 100.0 / 9.0)).abs() < 1e-10);
    }

    #[test]
    fn rsi_known_calculation() {
        let prices = [
            44.0, 44.25, 44.50, 43.75, 44.50, 44.25, 44.75, 45.25, 45.50, 45.25, 45.50, 46.0,
            46.25, 46.0, 46.50,
        ];
        let values = rsi(&prices, 14).unwrap();
        let v = values[14].unwrap();
        assert!(v > 50.0 && v < 100.0, "RSI should be in bullish territory");
    }

    #[test]
    fn running_state_matches_batch() {
        let prices: Vec<f64> = (0..60)
            .map(|i| 100.0 + 8.0 * (i as f64 / 5.0).sin() + (i % 3) as f64)
            .collect();
        let batch = rsi(&prices, 14).unwrap();

        let mut state = WilderRsi::new(14);
        for (i, &price) in prices.iter().enumerate() {
            assert_eq!(state.update(price), batch[i], "entry {}", i);
        }
    }

    #[test]
    fn rsi_insufficient_data() {
        assert!(matches!(
            rsi(&[1.0, 2.0], 14),
            Err(TradesimError::InsufficientData { .. })
        ));
    }
}
