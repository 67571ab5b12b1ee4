//! OHLCV bar representation.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::error::TradesimError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Closing prices of a bar slice, in order.
pub fn closes(bars: &[Bar]) -> Vec<f64> {
    bars.iter().map(|b| b.close).collect()
}

/// Reject series that cannot be fed to the engine: empty input, timestamps
/// that are not strictly increasing, or non-finite / non-positive closes.
pub fn validate_series(bars: &[Bar]) -> Result<(), TradesimError> {
    if bars.is_empty() {
        return Err(TradesimError::InvalidBars {
            reason: "bar series is empty".into(),
        });
    }

    for (i, bar) in bars.iter().enumerate() {
        if !bar.close.is_finite() || bar.close <= 0.0 {
            return Err(TradesimError::InvalidBars {
                reason: format!("bar {} at {} has invalid close {}", i, bar.timestamp, bar.close),
            });
        }
        if i > 0 && bar.timestamp <= bars[i - 1].timestamp {
            return Err(TradesimError::InvalidBars {
                reason: format!(
                    "timestamps must be strictly increasing: {} follows {}",
                    bar.timestamp,
                    bars[i - 1].timestamp
                ),
            });
        }
    }

    Ok(())
}
