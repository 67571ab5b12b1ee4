//! Simple Moving Average.
//!
//! SMA(n)[i] = mean(C[i-n+1..=i]).
//! Each window is summed directly; a running sum drifts on flat series and
//! would make equal averages compare unequal.
//! Warmup: first (n-1) entries are `None`.

use super::check_period;
use crate::domain::error::TradesimError;

pub fn sma(series: &[f64], period: usize) -> Result<Vec<Option<f64>>, TradesimError> {
    check_period(series, period)?;

    let warmup = period - 1;
    let values = (0..series.len())
        .map(|i| {
            if i < warmup {
                return None;
            }
            let window = &series[i + 1 - period..=i];
            Some(window.iter().sum::<f64>() / period as f64)
        })
        .collect();

    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn sma_warmup() {
        let values = sma(&[10.0, 20.0, 30.0, 40.0, 50.0], 3).unwrap();

        assert_eq!(values.len(), 5);
        assert!(values[0].is_none());
        assert!(values[1].is_none());
        assert!(values[2].is_some());
    }

    #[test]
    fn sma_basic_calculation() {
        let values = sma(&[10.0, 20.0, 30.0, 40.0, 50.0], 3).unwrap();

        assert_relative_eq!(values[2].unwrap(), 20.0);
        assert_relative_eq!(values[3].unwrap(), 30.0);
        assert_relative_eq!(values[4].unwrap(), 40.0);
    }

    #[test]
    fn sma_period_1_is_identity() {
        let prices = [3.0, 1.5, 7.25];
        let values = sma(&prices, 1).unwrap();
        for (v, p) in values.iter().zip(prices.iter()) {
            assert_relative_eq!(v.unwrap(), *p);
        }
    }

    #[test]
    fn sma_exact_length() {
        let values = sma(&[2.0, 4.0, 6.0], 3).unwrap();
        assert_eq!(values, vec![None, None, Some(4.0)]);
    }

    #[test]
    fn sma_insufficient_data() {
        let result = sma(&[1.0, 2.0], 3);
        assert!(matches!(
            result,
            Err(TradesimError::InsufficientData {
                required: 3,
                available: 2
            })
        ));
    }

    #[test]
    fn sma_zero_period() {
        assert!(matches!(
            sma(&[1.0, 2.0], 0),
            Err(TradesimError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn sma_does_not_mutate_input() {
        let prices = vec![1.0, 2.0, 3.0, 4.0];
        let copy = prices.clone();
        let _ = sma(&prices, 2).unwrap();
        assert_eq!(prices, copy);
    }
}
