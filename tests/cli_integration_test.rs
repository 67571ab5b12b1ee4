//! CLI integration tests: config loading from INI files, dry-run, and the
//! backtest / paper / compare pipelines driven through mock and CSV data.

mod common;

use clap::Parser;
use common::*;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tradesim::adapters::file_config_adapter::FileConfigAdapter;
use tradesim::adapters::json_report_adapter::JsonReportAdapter;
use tradesim::cli::{self, Cli};
use tradesim::domain::backtest::{BacktestResult, Comparison};
use tradesim::domain::config_validation::{load_backtest_config, load_strategy_config};
use tradesim::domain::error::TradesimError;
use tradesim::domain::strategy::StrategyConfig;

fn write_temp_ini(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

// ExitCode has no PartialEq; compare the debug rendering instead.
fn same_code(actual: ExitCode, expected: u8) -> bool {
    format!("{actual:?}") == format!("{:?}", ExitCode::from(expected))
}

const VALID_INI: &str = r#"
[backtest]
symbol = UP
initial_capital = 25000
commission_rate = 0.0
slippage_rate = 0.0
periods_per_year = 252
risk_free_rate = 0.02
close_open_position = true

[risk]
max_position_fraction = 0.5
max_drawdown_fraction = 0.5
stop_loss_pct = 0
take_profit_pct = 0

[strategy]
kind = sma_crossover
fast_period = 3
slow_period = 10
"#;

fn write_csv(dir: &Path, symbol: &str, closes: &[f64]) {
    let mut content = String::from("date,open,high,low,close,volume\n");
    for bar in bars_from_closes(closes) {
        content.push_str(&format!(
            "{},{},{},{},{},{}\n",
            bar.timestamp.format("%Y-%m-%d"),
            bar.open,
            bar.high,
            bar.low,
            bar.close,
            bar.volume
        ));
    }
    fs::write(dir.join(format!("{symbol}.csv")), content).unwrap();
}

fn rising_closes() -> Vec<f64> {
    flat_then_rising(11, 20).iter().map(|b| b.close).collect()
}

mod config_loading {
    use super::*;

    #[test]
    fn full_config_is_read() {
        let adapter = FileConfigAdapter::from_string(VALID_INI).unwrap();
        let config = load_backtest_config(&adapter, None).unwrap();

        assert_eq!(config.symbol, "UP");
        assert!((config.initial_capital - 25_000.0).abs() < f64::EPSILON);
        assert!((config.risk_free_rate - 0.02).abs() < f64::EPSILON);
        assert!((config.risk_limits.max_position_fraction - 0.5).abs() < f64::EPSILON);
        assert!(config.close_open_position);

        let strategy = load_strategy_config(&adapter).unwrap();
        assert_eq!(strategy, sma(3, 10));
    }

    #[test]
    fn symbol_override_wins() {
        let adapter = FileConfigAdapter::from_string(VALID_INI).unwrap();
        let config = load_backtest_config(&adapter, Some("OTHER")).unwrap();
        assert_eq!(config.symbol, "OTHER");
    }

    #[test]
    fn missing_symbol_is_reported() {
        let ini = "[strategy]\nkind = rsi_momentum\n";
        let adapter = FileConfigAdapter::from_string(ini).unwrap();
        let err = load_backtest_config(&adapter, None).unwrap_err();
        assert!(matches!(err, TradesimError::ConfigMissing { key, .. } if key == "symbol"));
    }

    #[test]
    fn malformed_number_is_rejected() {
        let ini = "[backtest]\nsymbol = X\ninitial_capital = lots\n";
        let adapter = FileConfigAdapter::from_string(ini).unwrap();
        let err = load_backtest_config(&adapter, None).unwrap_err();
        assert!(matches!(err, TradesimError::InvalidConfiguration { .. }));
    }

    #[test]
    fn defaults_fill_unset_strategy_parameters() {
        let adapter = FileConfigAdapter::from_string("[strategy]\nkind = bollinger_bands\n").unwrap();
        assert_eq!(
            load_strategy_config(&adapter).unwrap(),
            StrategyConfig::BollingerBands {
                period: 20,
                num_std_dev: 2.0
            }
        );
    }

    #[test]
    fn load_run_config_reads_file() {
        let file = write_temp_ini(VALID_INI);
        let (config, strategy) = cli::load_run_config(file.path(), None).unwrap();
        assert_eq!(config.symbol, "UP");
        assert_eq!(strategy, sma(3, 10));
    }
}

mod dry_run {
    use super::*;

    #[test]
    fn valid_config_succeeds() {
        let file = write_temp_ini(VALID_INI);
        assert!(same_code(cli::run_dry_run(file.path(), None), 0));
    }

    #[test]
    fn missing_file_is_config_error() {
        let path = PathBuf::from("/nonexistent/path/config.ini");
        assert!(same_code(cli::run_dry_run(&path, None), 2));
    }

    #[test]
    fn inverted_sma_periods_fail() {
        let ini = "[backtest]\nsymbol = X\n[strategy]\nkind = sma_crossover\nfast_period = 50\nslow_period = 20\n";
        let file = write_temp_ini(ini);
        assert!(same_code(cli::run_dry_run(file.path(), None), 2));
    }

    #[test]
    fn out_of_range_risk_limit_fails() {
        let ini = "[backtest]\nsymbol = X\n[risk]\nstop_loss_pct = 1.5\n[strategy]\nkind = rsi_momentum\n";
        let file = write_temp_ini(ini);
        assert!(same_code(cli::run_dry_run(file.path(), None), 2));
    }

    #[test]
    fn validate_accepts_strategy_section_alone() {
        let file = write_temp_ini("[strategy]\nkind = rsi_momentum\nperiod = 10\n");
        assert!(same_code(cli::run_validate(file.path()), 0));
    }
}

mod pipelines {
    use super::*;

    fn config() -> tradesim::domain::backtest::BacktestConfig {
        frictionless_config("UP")
    }

    #[test]
    fn backtest_writes_json_result() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("reports/result.json");
        let port = MockDataPort::new().with_bars("UP", flat_then_rising(11, 20));

        let code = cli::run_backtest_pipeline(
            &port,
            &JsonReportAdapter::new(),
            &sma(3, 10),
            &config(),
            Some(&output),
        );
        assert!(same_code(code, 0));

        let result: BacktestResult =
            serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(result.symbol, "UP");
        assert_eq!(result.strategy_id, "sma_crossover(3,10)");
        assert_eq!(result.trades.len(), 2);
    }

    #[test]
    fn data_source_failure_maps_to_exit_code() {
        let port = MockDataPort::new().with_error("UP", "connection refused");
        let code = cli::run_backtest_pipeline(
            &port,
            &JsonReportAdapter::new(),
            &sma(3, 10),
            &config(),
            None,
        );
        assert!(same_code(code, 3));
    }

    #[test]
    fn unknown_symbol_is_input_error() {
        let port = MockDataPort::new();
        let code = cli::run_backtest_pipeline(
            &port,
            &JsonReportAdapter::new(),
            &sma(3, 10),
            &config(),
            None,
        );
        assert!(same_code(code, 4));
    }

    #[test]
    fn paper_pipeline_leaves_position_open() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("paper.json");
        let port = MockDataPort::new().with_bars("UP", flat_then_rising(11, 20));

        let code = cli::run_paper_pipeline(
            &port,
            &JsonReportAdapter::new(),
            &sma(3, 10),
            &config(),
            Some(&output),
        );
        assert!(same_code(code, 0));

        let result: BacktestResult =
            serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(result.trades.len(), 1);
        assert!(result.final_state.position.is_some());
    }

    #[test]
    fn compare_pipeline_ranks_every_strategy() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("compare.json");
        let closes: Vec<f64> = (0..200)
            .map(|i| 100.0 + 12.0 * (i as f64 / 8.0).sin())
            .collect();
        let port = MockDataPort::new().with_bars("UP", bars_from_closes(&closes));

        let code = cli::run_compare_pipeline(
            &port,
            &JsonReportAdapter::new(),
            &StrategyConfig::all_defaults(),
            &config(),
            Some(&output),
        );
        assert!(same_code(code, 0));

        let comparison: Comparison =
            serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(comparison.rows.len(), 3);
        assert!(comparison.best_total_return.is_some());
    }

    #[test]
    fn compare_skips_strategies_that_cannot_run() {
        // 30 bars: enough for RSI(14) and Bollinger(20), not SMA(20/50)
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + (i % 5) as f64).collect();
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("compare.json");
        let port = MockDataPort::new().with_bars("UP", bars_from_closes(&closes));

        let code = cli::run_compare_pipeline(
            &port,
            &JsonReportAdapter::new(),
            &StrategyConfig::all_defaults(),
            &config(),
            Some(&output),
        );
        assert!(same_code(code, 0));

        let comparison: Comparison =
            serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(comparison.rows.len(), 2);
    }
}

mod end_to_end {
    use super::*;

    #[test]
    fn backtest_command_over_csv_directory() {
        let dir = tempfile::tempdir().unwrap();
        write_csv(dir.path(), "UP", &rising_closes());
        let ini = write_temp_ini(VALID_INI);
        let output = dir.path().join("out.json");

        let cli = Cli::try_parse_from([
            "tradesim",
            "backtest",
            "--config",
            ini.path().to_str().unwrap(),
            "--data-dir",
            dir.path().to_str().unwrap(),
            "--output",
            output.to_str().unwrap(),
        ])
        .unwrap();
        assert!(same_code(cli::run(cli), 0));

        let result: BacktestResult =
            serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(result.bars_processed, 31);
        assert!((result.final_equity() - (25_000.0 + 123.0 * 19.0)).abs() < 1e-6);
    }

    #[test]
    fn paper_command_with_synthetic_feed() {
        let dir = tempfile::tempdir().unwrap();
        let ini = write_temp_ini(VALID_INI);
        let output = dir.path().join("paper.json");

        let cli = Cli::try_parse_from([
            "tradesim",
            "paper",
            "--config",
            ini.path().to_str().unwrap(),
            "--bars",
            "120",
            "--seed",
            "7",
            "--output",
            output.to_str().unwrap(),
        ])
        .unwrap();
        assert!(same_code(cli::run(cli), 0));

        let result: BacktestResult =
            serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(result.bars_processed, 120);
    }

    #[test]
    fn missing_csv_fails_with_data_source_code() {
        let dir = tempfile::tempdir().unwrap();
        let ini = write_temp_ini(VALID_INI);
        let cli = Cli::try_parse_from([
            "tradesim",
            "backtest",
            "--config",
            ini.path().to_str().unwrap(),
            "--data-dir",
            dir.path().to_str().unwrap(),
        ])
        .unwrap();
        assert!(same_code(cli::run(cli), 3));
    }

    #[test]
    fn list_symbols_and_info_succeed() {
        let dir = tempfile::tempdir().unwrap();
        write_csv(dir.path(), "UP", &rising_closes());

        let list = Cli::try_parse_from([
            "tradesim",
            "list-symbols",
            "--data-dir",
            dir.path().to_str().unwrap(),
        ])
        .unwrap();
        assert!(same_code(cli::run(list), 0));

        let info = Cli::try_parse_from([
            "tradesim",
            "info",
            "--data-dir",
            dir.path().to_str().unwrap(),
            "--symbol",
            "UP",
        ])
        .unwrap();
        assert!(same_code(cli::run(info), 0));
    }
}
