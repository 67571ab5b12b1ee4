//! Build validated run configuration from a [`ConfigPort`].
//!
//! Missing optional keys fall back to defaults; present but malformed or
//! out-of-range values are rejected before any computation starts.

use crate::domain::backtest::BacktestConfig;
use crate::domain::error::TradesimError;
use crate::domain::execution::ExecutionConfig;
use crate::domain::risk::RiskLimits;
use crate::domain::strategy::StrategyConfig;
use crate::ports::config_port::ConfigPort;

const BACKTEST: &str = "backtest";
const RISK: &str = "risk";
const STRATEGY: &str = "strategy";

/// Read `[backtest]` and `[risk]`. `symbol_override` replaces (and makes
/// optional) the configured symbol.
pub fn load_backtest_config(
    config: &dyn ConfigPort,
    symbol_override: Option<&str>,
) -> Result<BacktestConfig, TradesimError> {
    let defaults = BacktestConfig::default();

    let symbol = match symbol_override {
        Some(s) => s.to_string(),
        None => config
            .get_string(BACKTEST, "symbol")
            .ok_or_else(|| TradesimError::ConfigMissing {
                section: BACKTEST.to_string(),
                key: "symbol".to_string(),
            })?,
    };

    let backtest = BacktestConfig {
        symbol: symbol.trim().to_string(),
        initial_capital: config.get_double(BACKTEST, "initial_capital", defaults.initial_capital)?,
        execution: ExecutionConfig {
            commission_rate: config.get_double(
                BACKTEST,
                "commission_rate",
                defaults.execution.commission_rate,
            )?,
            slippage_rate: config.get_double(
                BACKTEST,
                "slippage_rate",
                defaults.execution.slippage_rate,
            )?,
        },
        risk_limits: load_risk_limits(config)?,
        periods_per_year: config.get_double(BACKTEST, "periods_per_year", defaults.periods_per_year)?,
        risk_free_rate: config.get_double(BACKTEST, "risk_free_rate", defaults.risk_free_rate)?,
        close_open_position: config.get_bool(
            BACKTEST,
            "close_open_position",
            defaults.close_open_position,
        )?,
    };
    backtest.validate().map_err(in_section(BACKTEST))?;
    Ok(backtest)
}

pub fn load_risk_limits(config: &dyn ConfigPort) -> Result<RiskLimits, TradesimError> {
    let defaults = RiskLimits::default();
    let limits = RiskLimits {
        max_position_fraction: config.get_double(
            RISK,
            "max_position_fraction",
            defaults.max_position_fraction,
        )?,
        max_drawdown_fraction: config.get_double(
            RISK,
            "max_drawdown_fraction",
            defaults.max_drawdown_fraction,
        )?,
        stop_loss_pct: config.get_double(RISK, "stop_loss_pct", defaults.stop_loss_pct)?,
        take_profit_pct: config.get_double(RISK, "take_profit_pct", defaults.take_profit_pct)?,
    };
    limits.validate().map_err(in_section(RISK))?;
    Ok(limits)
}

/// Read `[strategy]` and check it builds.
pub fn load_strategy_config(config: &dyn ConfigPort) -> Result<StrategyConfig, TradesimError> {
    let kind = config
        .get_string(STRATEGY, "kind")
        .ok_or_else(|| TradesimError::ConfigMissing {
            section: STRATEGY.to_string(),
            key: "kind".to_string(),
        })?;

    let strategy = match kind.trim() {
        "sma_crossover" => StrategyConfig::SmaCrossover {
            fast_period: get_period(config, "fast_period", 20)?,
            slow_period: get_period(config, "slow_period", 50)?,
        },
        "rsi_momentum" => StrategyConfig::RsiMomentum {
            period: get_period(config, "period", 14)?,
            oversold: config.get_double(STRATEGY, "oversold", 30.0)?,
            overbought: config.get_double(STRATEGY, "overbought", 70.0)?,
        },
        "bollinger_bands" => StrategyConfig::BollingerBands {
            period: get_period(config, "period", 20)?,
            num_std_dev: config.get_double(STRATEGY, "num_std_dev", 2.0)?,
        },
        other => {
            return Err(TradesimError::invalid_config(
                "strategy.kind",
                format!(
                    "unknown strategy {:?} (expected sma_crossover, rsi_momentum or bollinger_bands)",
                    other
                ),
            ));
        }
    };

    strategy.build().map_err(in_section(STRATEGY))?;
    Ok(strategy)
}

fn get_period(config: &dyn ConfigPort, key: &str, default: usize) -> Result<usize, TradesimError> {
    let value = config.get_int(STRATEGY, key, default as i64)?;
    usize::try_from(value)
        .ok()
        .filter(|&p| p > 0)
        .ok_or_else(|| {
            TradesimError::invalid_config(
                &format!("{}.{}", STRATEGY, key),
                format!("must be a positive integer, got {}", value),
            )
        })
}

/// Qualify a bare field name with the section it was read from, so every
/// configuration error names a `section.key`.
fn in_section(section: &'static str) -> impl Fn(TradesimError) -> TradesimError {
    move |err| match err {
        TradesimError::InvalidConfiguration { field, reason } if !field.contains('.') => {
            TradesimError::InvalidConfiguration {
                field: format!("{}.{}", section, field),
                reason,
            }
        }
        other => other,
    }
}
