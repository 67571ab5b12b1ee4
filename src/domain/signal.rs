//! Strategy output: one directional recommendation per bar.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalKind {
    Buy,
    Sell,
    Hold,
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalKind::Buy => write!(f, "BUY"),
            SignalKind::Sell => write!(f, "SELL"),
            SignalKind::Hold => write!(f, "HOLD"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub timestamp: NaiveDateTime,
    pub kind: SignalKind,
    /// Conviction in [0, 1]. Always 0 for HOLD.
    pub strength: f64,
    /// Id of the strategy that produced the signal.
    pub source: String,
}

impl Signal {
    pub fn hold(timestamp: NaiveDateTime, source: &str) -> Self {
        Signal {
            timestamp,
            kind: SignalKind::Hold,
            strength: 0.0,
            source: source.to_string(),
        }
    }

    /// Directional signal with strength clamped into [0, 1]. NaN maps to 0.
    pub fn directional(
        timestamp: NaiveDateTime,
        kind: SignalKind,
        strength: f64,
        source: &str,
    ) -> Self {
        let strength = if strength.is_nan() {
            0.0
        } else {
            strength.clamp(0.0, 1.0)
        };
        Signal {
            timestamp,
            kind,
            strength,
            source: source.to_string(),
        }
    }

    pub fn is_hold(&self) -> bool {
        self.kind == SignalKind::Hold
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap()
    }

    #[test]
    fn hold_has_zero_strength() {
        let s = Signal::hold(ts(), "sma_crossover(3,10)");
        assert!(s.is_hold());
        assert_eq!(s.strength, 0.0);
        assert_eq!(s.source, "sma_crossover(3,10)");
    }

    #[test]
    fn directional_clamps_strength() {
        assert_eq!(Signal::directional(ts(), SignalKind::Buy, 3.5, "x").strength, 1.0);
        assert_eq!(Signal::directional(ts(), SignalKind::Sell, -0.2, "x").strength, 0.0);
        assert_eq!(
            Signal::directional(ts(), SignalKind::Sell, f64::NAN, "x").strength,
            0.0
        );
    }

    #[test]
    fn signal_kind_display() {
        assert_eq!(SignalKind::Buy.to_string(), "BUY");
        assert_eq!(SignalKind::Sell.to_string(), "SELL");
        assert_eq!(SignalKind::Hold.to_string(), "HOLD");
    }
}
