//! RSI momentum: BUY when RSI recovers up through the oversold level, SELL
//! when it falls back through the overbought level.
//!
//! Wilder smoothing depends on the whole history, so the strategy keeps a
//! cursor over the last window it saw. A window that extends that one by
//! appended bars costs one step per new bar; any other window is rescanned.

use std::sync::Mutex;

use chrono::NaiveDateTime;

use super::{current_bar, SignalGenerator};
use crate::domain::bar::Bar;
use crate::domain::error::TradesimError;
use crate::domain::indicator::{IndicatorType, WilderRsi};
use crate::domain::signal::{Signal, SignalKind};

const NEUTRAL: f64 = 50.0;

#[derive(Debug)]
pub struct RsiMomentum {
    period: usize,
    oversold: f64,
    overbought: f64,
    cursor: Mutex<Option<RsiCursor>>,
}

impl Clone for RsiMomentum {
    fn clone(&self) -> Self {
        RsiMomentum {
            period: self.period,
            oversold: self.oversold,
            overbought: self.overbought,
            cursor: Mutex::new(None),
        }
    }
}

impl PartialEq for RsiMomentum {
    fn eq(&self, other: &Self) -> bool {
        self.period == other.period
            && self.oversold == other.oversold
            && self.overbought == other.overbought
    }
}

/// RSI state after the first `len` bars of some window.
#[derive(Debug, Clone, Copy)]
struct RsiCursor {
    len: usize,
    first: NaiveDateTime,
    last: NaiveDateTime,
    last_close: f64,
    state: WilderRsi,
    prev: Option<f64>,
    now: Option<f64>,
}

impl RsiCursor {
    fn scan(window: &[Bar], period: usize) -> Option<Self> {
        let (head, rest) = window.split_first()?;
        let mut state = WilderRsi::new(period);
        let mut cursor = RsiCursor {
            len: 1,
            first: head.timestamp,
            last: head.timestamp,
            last_close: head.close,
            now: state.update(head.close),
            state,
            prev: None,
        };
        rest.iter().for_each(|bar| cursor.push(bar));
        Some(cursor)
    }

    fn push(&mut self, bar: &Bar) {
        self.prev = self.now;
        self.now = self.state.update(bar.close);
        self.len += 1;
        self.last = bar.timestamp;
        self.last_close = bar.close;
    }

    /// Whether `window` continues the history this cursor has consumed,
    /// judged by its first bar and the bar at the cursor's end.
    fn is_prefix_of(&self, window: &[Bar]) -> bool {
        let end = self.len.checked_sub(1).and_then(|i| window.get(i));
        match (window.first(), end) {
            (Some(first), Some(last)) => {
                first.timestamp == self.first
                    && last.timestamp == self.last
                    && last.close == self.last_close
            }
            _ => false,
        }
    }
}

impl RsiMomentum {
    pub fn new(period: usize, oversold: f64, overbought: f64) -> Result<Self, TradesimError> {
        if period == 0 {
            return Err(TradesimError::invalid_config("period", "must be positive"));
        }
        if !(0.0..=100.0).contains(&oversold) {
            return Err(TradesimError::invalid_config(
                "oversold",
                "must be between 0 and 100",
            ));
        }
        if !(0.0..=100.0).contains(&overbought) {
            return Err(TradesimError::invalid_config(
                "overbought",
                "must be between 0 and 100",
            ));
        }
        if oversold >= overbought {
            return Err(TradesimError::invalid_config(
                "oversold",
                "must be below overbought",
            ));
        }
        Ok(RsiMomentum {
            period,
            oversold,
            overbought,
            cursor: Mutex::new(None),
        })
    }

    pub fn period(&self) -> usize {
        self.period
    }

    pub fn oversold(&self) -> f64 {
        self.oversold
    }

    pub fn overbought(&self) -> f64 {
        self.overbought
    }

    /// RSI at the window's second-to-last and last bars.
    fn readings(&self, window: &[Bar]) -> (Option<f64>, Option<f64>) {
        let mut slot = self.cursor.lock().ok();
        let cached = slot.as_deref_mut().and_then(Option::take);
        let cursor = match cached {
            Some(mut cursor) if cursor.is_prefix_of(window) => {
                window[cursor.len..].iter().for_each(|bar| cursor.push(bar));
                Some(cursor)
            }
            _ => RsiCursor::scan(window, self.period),
        };
        let readings = cursor.map_or((None, None), |c| (c.prev, c.now));
        if let Some(slot) = slot.as_deref_mut() {
            *slot = cursor;
        }
        readings
    }
}

impl SignalGenerator for RsiMomentum {
    fn id(&self) -> String {
        format!(
            "rsi_momentum({},{},{})",
            self.period, self.oversold, self.overbought
        )
    }

    /// RSI needs `period` changes for its first value, plus one more bar to
    /// have a prior reading to cross from.
    fn min_bars(&self) -> usize {
        self.period + 2
    }

    fn indicators(&self) -> Vec<IndicatorType> {
        vec![IndicatorType::Rsi(self.period)]
    }

    fn evaluate(&self, window: &[Bar]) -> Result<Signal, TradesimError> {
        let (bar, ready) = current_bar(window, self.min_bars())?;
        let id = self.id();
        if !ready {
            return Ok(Signal::hold(bar.timestamp, &id));
        }

        let (Some(prev), Some(now)) = self.readings(window) else {
            return Ok(Signal::hold(bar.timestamp, &id));
        };

        let kind = if prev < self.oversold && now >= self.oversold {
            SignalKind::Buy
        } else if prev > self.overbought && now <= self.overbought {
            SignalKind::Sell
        } else {
            return Ok(Signal::hold(bar.timestamp, &id));
        };

        let strength = (now - NEUTRAL).abs() / NEUTRAL;
        Ok(Signal::directional(bar.timestamp, kind, strength, &id))
    }
}
