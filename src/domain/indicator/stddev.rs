//! Standard Deviation indicator.
//!
//! Population standard deviation over n closing prices.
//! STDDEV(n)[i] = sqrt(sum((C[i-j] - SMA(n)[i])^2 for j in 0..n-1) / n)
//! Warmup: first (n-1) entries are `None`.

use super::check_period;
use crate::domain::error::TradesimError;

/// Population standard deviation of a non-empty window, with its mean.
pub(crate) fn window_mean_stddev(window: &[f64]) -> (f64, f64) {
    let n = window.len() as f64;
    let mean = window.iter().sum::<f64>() / n;
    let variance = window
        .iter()
        .map(|v| {
            let diff = v - mean;
            diff * diff
        })
        .sum::<f64>()
        / n;
    (mean, variance.sqrt())
}

pub fn stddev(series: &[f64], period: usize) -> Result<Vec<Option<f64>>, TradesimError> {
    check_period(series, period)?;

    let warmup = period - 1;
    let values = (0..series.len())
        .map(|i| {
            if i < warmup {
                None
            } else {
                let (_, sd) = window_mean_stddev(&series[i + 1 - period..=i]);
                Some(sd)
            }
        })
        .collect();

    Ok(values)
}
