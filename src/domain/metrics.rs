//! Performance analytics over an equity curve and trade ledger.
//!
//! Everything here is a read-only view: `Metrics::compute` borrows its
//! inputs and never mutates them.

use serde::{Deserialize, Serialize};

use super::error::TradesimError;
use super::portfolio::{DrawdownPoint, EquityPoint};
use super::position::Trade;

/// Standard deviations at or below this are treated as zero.
const ZERO_DISPERSION: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub periods_per_year: f64,
    /// Annual rate; converted to a per-period rate for Sharpe and Sortino.
    pub risk_free_rate: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            periods_per_year: 252.0,
            risk_free_rate: 0.0,
        }
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> Result<(), TradesimError> {
        if !self.periods_per_year.is_finite() || self.periods_per_year <= 0.0 {
            return Err(TradesimError::invalid_config(
                "periods_per_year",
                format!("must be positive, got {}", self.periods_per_year),
            ));
        }
        if !self.risk_free_rate.is_finite() {
            return Err(TradesimError::invalid_config(
                "risk_free_rate",
                "must be a finite number",
            ));
        }
        Ok(())
    }

    fn period_risk_free(&self) -> f64 {
        self.risk_free_rate / self.periods_per_year
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub total_return: f64,
    /// Overflows to infinity when a short run is scaled to a long year.
    #[serde(with = "non_finite::required")]
    pub annualized_return: f64,
    /// Annualized sample standard deviation of period returns.
    pub volatility: Option<f64>,
    /// Most negative drawdown; 0 when equity never fell below its peak.
    pub max_drawdown: f64,
    /// Longest run of consecutive periods spent below the running peak.
    pub max_drawdown_duration: usize,
    pub sharpe_ratio: Option<f64>,
    pub sortino_ratio: Option<f64>,
    #[serde(with = "non_finite", default)]
    pub calmar_ratio: Option<f64>,
    /// Historical 95% VaR: the 5th percentile period return.
    pub value_at_risk_95: Option<f64>,
    pub max_consecutive_losses: usize,
    pub total_trades: usize,
    pub closing_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub win_rate: Option<f64>,
    #[serde(with = "non_finite", default)]
    pub profit_factor: Option<f64>,
    pub avg_win: f64,
    /// Magnitude; always >= 0.
    pub avg_loss: f64,
    pub largest_win: f64,
    /// Magnitude; always >= 0.
    pub largest_loss: f64,
    pub total_commission: f64,
    pub total_slippage: f64,
}

impl Metrics {
    pub fn compute(equity_curve: &[EquityPoint], trades: &[Trade], config: &AnalysisConfig) -> Self {
        let initial_equity = equity_curve.first().map_or(0.0, |p| p.equity);
        let final_equity = equity_curve.last().map_or(initial_equity, |p| p.equity);

        let total_return = if initial_equity > 0.0 {
            (final_equity - initial_equity) / initial_equity
        } else {
            0.0
        };

        let returns = period_returns(equity_curve);
        let annualized_return = annualize(total_return, returns.len(), config.periods_per_year);

        let drawdowns = drawdown_curve(equity_curve);
        let max_drawdown = drawdowns
            .iter()
            .map(|d| d.drawdown)
            .fold(0.0_f64, f64::min);
        let max_drawdown_duration = longest_run(drawdowns.iter().map(|d| d.drawdown < 0.0));

        let stdev = sample_stddev(&returns);
        let annual_scale = config.periods_per_year.sqrt();
        let volatility = stdev.map(|s| s * annual_scale);

        let rf = config.period_risk_free();
        let excess_mean = mean(&returns).map(|m| m - rf);

        let sharpe_ratio = match (excess_mean, stdev) {
            (Some(m), Some(s)) if s > ZERO_DISPERSION => Some(m / s * annual_scale),
            _ => None,
        };

        let sortino_ratio = match (excess_mean, downside_deviation(&returns, rf)) {
            (Some(m), Some(d)) if d > ZERO_DISPERSION => Some(m / d * annual_scale),
            _ => None,
        };

        let calmar_ratio = (max_drawdown < 0.0).then(|| annualized_return / max_drawdown.abs());

        let value_at_risk_95 = {
            let mut sorted = returns.clone();
            sorted.sort_by(f64::total_cmp);
            percentile(&sorted, 5.0)
        };

        let max_consecutive_losses = longest_run(returns.iter().map(|&r| r < 0.0));

        let trade_stats = TradeStats::from_ledger(trades);

        Metrics {
            total_return,
            annualized_return,
            volatility,
            max_drawdown,
            max_drawdown_duration,
            sharpe_ratio,
            sortino_ratio,
            calmar_ratio,
            value_at_risk_95,
            max_consecutive_losses,
            total_trades: trades.len(),
            closing_trades: trade_stats.closing,
            winning_trades: trade_stats.won,
            losing_trades: trade_stats.lost,
            win_rate: trade_stats.win_rate(),
            profit_factor: trade_stats.profit_factor(),
            avg_win: average(trade_stats.gross_wins, trade_stats.won),
            avg_loss: average(trade_stats.gross_losses, trade_stats.lost),
            largest_win: trade_stats.largest_win,
            largest_loss: trade_stats.largest_loss,
            total_commission: trades.iter().map(|t| t.commission).sum(),
            total_slippage: trades.iter().map(|t| t.slippage).sum(),
        }
    }
}

#[derive(Default)]
struct TradeStats {
    closing: usize,
    won: usize,
    lost: usize,
    gross_wins: f64,
    gross_losses: f64,
    largest_win: f64,
    largest_loss: f64,
}

impl TradeStats {
    fn from_ledger(trades: &[Trade]) -> Self {
        let mut stats = TradeStats::default();
        for trade in trades.iter().filter(|t| t.is_closing()) {
            stats.closing += 1;
            let pnl = trade.realized_pnl;
            if pnl > 0.0 {
                stats.won += 1;
                stats.gross_wins += pnl;
                stats.largest_win = stats.largest_win.max(pnl);
            } else if pnl < 0.0 {
                stats.lost += 1;
                stats.gross_losses += pnl.abs();
                stats.largest_loss = stats.largest_loss.max(pnl.abs());
            }
        }
        stats
    }

    fn win_rate(&self) -> Option<f64> {
        (self.closing > 0).then(|| self.won as f64 / self.closing as f64)
    }

    fn profit_factor(&self) -> Option<f64> {
        if self.closing == 0 {
            None
        } else if self.gross_losses > 0.0 {
            Some(self.gross_wins / self.gross_losses)
        } else {
            Some(f64::INFINITY)
        }
    }
}

/// Drawdown from the running peak at every point of `equity_curve`.
pub fn drawdown_curve(equity_curve: &[EquityPoint]) -> Vec<DrawdownPoint> {
    let mut peak = f64::NEG_INFINITY;
    equity_curve
        .iter()
        .map(|point| {
            peak = peak.max(point.equity);
            let drawdown = if peak > 0.0 {
                ((point.equity - peak) / peak).min(0.0)
            } else {
                0.0
            };
            DrawdownPoint {
                timestamp: point.timestamp,
                drawdown,
            }
        })
        .collect()
}

fn period_returns(equity_curve: &[EquityPoint]) -> Vec<f64> {
    equity_curve
        .windows(2)
        .map(|w| {
            let prev = w[0].equity;
            if prev > 0.0 {
                (w[1].equity - prev) / prev
            } else {
                0.0
            }
        })
        .collect()
}

fn annualize(total_return: f64, periods: usize, periods_per_year: f64) -> f64 {
    if periods == 0 {
        return 0.0;
    }
    let growth = 1.0 + total_return;
    if growth <= 0.0 {
        return -1.0;
    }
    growth.powf(periods_per_year / periods as f64) - 1.0
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

fn sample_stddev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let variance =
        values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(variance.sqrt())
}

/// Root mean square of shortfalls below `target`, over all periods.
fn downside_deviation(returns: &[f64], target: f64) -> Option<f64> {
    if returns.is_empty() {
        return None;
    }
    let sum_sq: f64 = returns
        .iter()
        .filter(|&&r| r < target)
        .map(|&r| (r - target).powi(2))
        .sum();
    Some((sum_sq / returns.len() as f64).sqrt())
}

/// Linear-interpolated percentile of an ascending slice.
fn percentile(sorted: &[f64], pct: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let rank = pct / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let weight = rank - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * weight)
}

fn longest_run(flags: impl Iterator<Item = bool>) -> usize {
    let mut longest = 0;
    let mut current = 0;
    for flag in flags {
        if flag {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}

fn average(total: f64, count: usize) -> f64 {
    if count > 0 { total / count as f64 } else { 0.0 }
}

/// JSON has no infinity; encode it as the string `"inf"`.
mod non_finite {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Text(String),
    }

    pub fn serialize<S: Serializer>(value: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            None => serializer.serialize_none(),
            Some(v) if *v == f64::INFINITY => serializer.serialize_some("inf"),
            Some(v) if *v == f64::NEG_INFINITY => serializer.serialize_some("-inf"),
            Some(v) => serializer.serialize_some(v),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
        match Option::<Repr>::deserialize(deserializer)? {
            None => Ok(None),
            Some(Repr::Number(v)) => Ok(Some(v)),
            Some(Repr::Text(text)) => match text.as_str() {
                "inf" => Ok(Some(f64::INFINITY)),
                "-inf" => Ok(Some(f64::NEG_INFINITY)),
                other => Err(D::Error::custom(format!("invalid metric value {:?}", other))),
            },
        }
    }

    /// Same encoding for a metric that is always present.
    pub mod required {
        use serde::de::Error as _;
        use serde::{Deserializer, Serializer};

        pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
            super::serialize(&Some(*value), serializer)
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
            super::deserialize(deserializer)?.ok_or_else(|| D::Error::custom("missing metric value"))
        }
    }
}
