//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::warn;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_report_adapter::JsonReportAdapter;
use crate::adapters::synthetic_feed::SyntheticFeed;
use crate::domain::backtest::{
    self as backtest_engine, BacktestConfig, BacktestJob, BacktestResult, Comparison,
};
use crate::domain::config_validation::{load_backtest_config, load_risk_limits, load_strategy_config};
use crate::domain::error::TradesimError;
use crate::domain::paper::PaperTradingDesk;
use crate::domain::strategy::{SignalGenerator, StrategyConfig};
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "tradesim", about = "Strategy backtesting and paper-trading engine")]
pub struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest over a CSV bar file
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Directory holding <SYMBOL>.csv files
        #[arg(short, long)]
        data_dir: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        symbol: Option<String>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Replay bars one at a time through a paper-trading session
    Paper {
        #[arg(short, long)]
        config: PathBuf,
        /// Directory holding <SYMBOL>.csv files; omit to use a synthetic feed
        #[arg(short, long)]
        data_dir: Option<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        symbol: Option<String>,
        /// Number of synthetic bars to generate
        #[arg(long, default_value_t = 250)]
        bars: usize,
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
    /// Run every strategy kind over the same bars and rank them
    Compare {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        data_dir: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        symbol: Option<String>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List symbols available in a data directory
    ListSymbols {
        #[arg(short, long)]
        data_dir: PathBuf,
    },
    /// Show data range for a symbol
    Info {
        #[arg(short, long)]
        data_dir: PathBuf,
        #[arg(long)]
        symbol: String,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            config,
            data_dir,
            output,
            symbol,
            dry_run,
        } => {
            if dry_run {
                run_dry_run(&config, symbol.as_deref())
            } else {
                run_backtest(&config, &data_dir, output.as_deref(), symbol.as_deref())
            }
        }
        Command::Paper {
            config,
            data_dir,
            output,
            symbol,
            bars,
            seed,
        } => run_paper(
            &config,
            data_dir.as_deref(),
            output.as_deref(),
            symbol.as_deref(),
            bars,
            seed,
        ),
        Command::Compare {
            config,
            data_dir,
            output,
            symbol,
        } => run_compare(&config, &data_dir, output.as_deref(), symbol.as_deref()),
        Command::Validate { config } => run_validate(&config),
        Command::ListSymbols { data_dir } => run_list_symbols(&data_dir),
        Command::Info { data_dir, symbol } => run_info(&data_dir, &symbol),
    }
}

fn fail(err: TradesimError) -> ExitCode {
    eprintln!("error: {err}");
    (&err).into()
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(fail)
}

/// Load and validate `[backtest]`, `[risk]` and `[strategy]`.
pub fn load_run_config(
    path: &Path,
    symbol_override: Option<&str>,
) -> Result<(BacktestConfig, StrategyConfig), ExitCode> {
    eprintln!("Loading config from {}", path.display());
    let adapter = load_config(path)?;
    let backtest = load_backtest_config(&adapter, symbol_override).map_err(fail)?;
    let strategy = load_strategy_config(&adapter).map_err(fail)?;
    Ok((backtest, strategy))
}

fn run_backtest(
    config_path: &Path,
    data_dir: &Path,
    output: Option<&Path>,
    symbol_override: Option<&str>,
) -> ExitCode {
    let (config, strategy) = match load_run_config(config_path, symbol_override) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let data_port = CsvAdapter::new(data_dir.to_path_buf());
    run_backtest_pipeline(&data_port, &JsonReportAdapter::new(), &strategy, &config, output)
}

pub fn run_backtest_pipeline(
    data_port: &dyn DataPort,
    report_port: &dyn ReportPort,
    strategy: &StrategyConfig,
    config: &BacktestConfig,
    output: Option<&Path>,
) -> ExitCode {
    let bars = match data_port.fetch_bars(&config.symbol) {
        Ok(bars) => bars,
        Err(e) => return fail(e),
    };
    eprintln!("Running backtest: {} bars of {}", bars.len(), config.symbol);

    let result = match backtest_engine::run_backtest(&bars, strategy, config) {
        Ok(r) => r,
        Err(e) => return fail(e),
    };
    print_summary(&result);

    if let Some(path) = output {
        if let Err(e) = report_port.write(&result, path) {
            return fail(e);
        }
        eprintln!("\nResult written to: {}", path.display());
    }
    ExitCode::SUCCESS
}

fn run_paper(
    config_path: &Path,
    data_dir: Option<&Path>,
    output: Option<&Path>,
    symbol_override: Option<&str>,
    bars: usize,
    seed: u64,
) -> ExitCode {
    let (config, strategy) = match load_run_config(config_path, symbol_override) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let report_port = JsonReportAdapter::new();
    match data_dir {
        Some(dir) => run_paper_pipeline(
            &CsvAdapter::new(dir.to_path_buf()),
            &report_port,
            &strategy,
            &config,
            output,
        ),
        None => {
            let start = NaiveDate::from_ymd_opt(2024, 1, 1)
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .unwrap_or_default();
            eprintln!("Using synthetic feed (seed {seed}, {bars} bars)");
            let feed = SyntheticFeed::new(vec![config.symbol.clone()], seed, bars, start);
            run_paper_pipeline(&feed, &report_port, &strategy, &config, output)
        }
    }
}

/// Feed every bar from `data_port` to a fresh session as a live tick.
/// Rejected ticks are reported and skipped; the session carries on.
pub fn run_paper_pipeline(
    data_port: &dyn DataPort,
    report_port: &dyn ReportPort,
    strategy: &StrategyConfig,
    config: &BacktestConfig,
    output: Option<&Path>,
) -> ExitCode {
    let bars = match data_port.fetch_bars(&config.symbol) {
        Ok(bars) => bars,
        Err(e) => return fail(e),
    };

    let desk = PaperTradingDesk::new();
    let session = match desk.start(strategy, config) {
        Ok(s) => s,
        Err(e) => return fail(e),
    };
    eprintln!(
        "Paper session {} / {}: {} ticks",
        session.symbol(),
        session.strategy_id(),
        bars.len()
    );

    let mut rejected = 0usize;
    for bar in bars {
        match session.on_tick(bar) {
            Ok(Some(trade)) => eprintln!(
                "  {} {:?} {} @ {:.2} ({})",
                trade.timestamp, trade.action, trade.quantity, trade.price, trade.reason
            ),
            Ok(None) => {}
            Err(e) => {
                warn!(error = %e, "tick skipped");
                rejected += 1;
            }
        }
    }

    let status = session.status();
    let result = session.stop();
    if rejected > 0 {
        eprintln!("{} ticks rejected", rejected);
    }
    if let Some(pnl) = status.unrealized_pnl {
        eprintln!("Open position unrealized P&L: ${:.2}", pnl);
    }
    if status.risk_state.is_halted() {
        eprintln!("Session halted by drawdown limit");
    }
    print_summary(&result);

    if let Some(path) = output {
        if let Err(e) = report_port.write(&result, path) {
            return fail(e);
        }
        eprintln!("\nResult written to: {}", path.display());
    }
    ExitCode::SUCCESS
}

fn run_compare(
    config_path: &Path,
    data_dir: &Path,
    output: Option<&Path>,
    symbol_override: Option<&str>,
) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let config = match load_backtest_config(&adapter, symbol_override) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };
    run_compare_pipeline(
        &CsvAdapter::new(data_dir.to_path_buf()),
        &JsonReportAdapter::new(),
        &StrategyConfig::all_defaults(),
        &config,
        output,
    )
}

/// Backtest each strategy in parallel over the same bars. Failed runs are
/// reported and left out of the ranking.
pub fn run_compare_pipeline(
    data_port: &dyn DataPort,
    report_port: &dyn ReportPort,
    strategies: &[StrategyConfig],
    config: &BacktestConfig,
    output: Option<&Path>,
) -> ExitCode {
    let bars = match data_port.fetch_bars(&config.symbol) {
        Ok(bars) => bars,
        Err(e) => return fail(e),
    };

    let jobs: Vec<BacktestJob> = strategies
        .iter()
        .map(|strategy| BacktestJob {
            bars: &bars,
            strategy: strategy.clone(),
            config: config.clone(),
        })
        .collect();

    eprintln!(
        "Comparing {} strategies over {} bars of {}",
        jobs.len(),
        bars.len(),
        config.symbol
    );

    let mut results = Vec::new();
    for (job, outcome) in jobs.iter().zip(backtest_engine::run_many(&jobs)) {
        match outcome {
            Ok(result) => results.push(result),
            Err(e) => eprintln!("warning: skipping {:?} ({})", job.strategy, e),
        }
    }

    if results.is_empty() {
        eprintln!("error: no strategy produced a result");
        return ExitCode::from(4);
    }

    let comparison = backtest_engine::compare(&results);
    print_comparison(&comparison);

    if let Some(path) = output {
        if let Err(e) = report_port.write_comparison(&comparison, path) {
            return fail(e);
        }
        eprintln!("\nComparison written to: {}", path.display());
    }
    ExitCode::SUCCESS
}

pub fn run_dry_run(config_path: &Path, symbol_override: Option<&str>) -> ExitCode {
    let (config, strategy) = match load_run_config(config_path, symbol_override) {
        Ok(c) => c,
        Err(code) => return code,
    };
    eprintln!("Config validated successfully");
    describe_config(&config, &strategy);
    ExitCode::SUCCESS
}

pub fn run_validate(config_path: &Path) -> ExitCode {
    eprintln!("Validating {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let strategy = match load_strategy_config(&adapter) {
        Ok(s) => s,
        Err(e) => return fail(e),
    };
    let limits = match load_risk_limits(&adapter) {
        Ok(l) => l,
        Err(e) => return fail(e),
    };

    let built = match strategy.build() {
        Ok(s) => s,
        Err(e) => return fail(e),
    };
    eprintln!("\nStrategy: {}", built.id());
    eprintln!("  warm-up bars: {}", built.min_bars());
    eprintln!("\nIndicators:");
    for indicator in built.indicators() {
        eprintln!("  {}", indicator);
    }
    eprintln!("\nRisk limits:");
    eprintln!("  max position:  {:.1}%", limits.max_position_fraction * 100.0);
    eprintln!("  max drawdown:  {:.1}%", limits.max_drawdown_fraction * 100.0);
    eprintln!("  stop-loss:     {}", pct_or_off(limits.stop_loss_pct));
    eprintln!("  take-profit:   {}", pct_or_off(limits.take_profit_pct));
    eprintln!("\nStrategy is valid.");
    ExitCode::SUCCESS
}

fn run_list_symbols(data_dir: &Path) -> ExitCode {
    match CsvAdapter::new(data_dir.to_path_buf()).list_symbols() {
        Ok(symbols) => {
            for symbol in symbols {
                println!("{}", symbol);
            }
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}

fn run_info(data_dir: &Path, symbol: &str) -> ExitCode {
    match CsvAdapter::new(data_dir.to_path_buf()).data_range(symbol) {
        Ok(Some((first, last, count))) => {
            println!("{}: {} bars, {} to {}", symbol, count, first, last);
            ExitCode::SUCCESS
        }
        Ok(None) => {
            println!("{}: no data", symbol);
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}

fn describe_config(config: &BacktestConfig, strategy: &StrategyConfig) {
    eprintln!("\nRun:");
    eprintln!("  symbol:          {}", config.symbol);
    eprintln!("  initial capital: {:.2}", config.initial_capital);
    eprintln!(
        "  commission:      {:.4}%",
        config.execution.commission_rate * 100.0
    );
    eprintln!(
        "  slippage:        {:.4}%",
        config.execution.slippage_rate * 100.0
    );
    eprintln!("  close at end:    {}", config.close_open_position);
    eprintln!("\nStrategy: {:?}", strategy);
}

fn pct_or_off(value: f64) -> String {
    if value > 0.0 {
        format!("{:.1}%", value * 100.0)
    } else {
        "off".to_string()
    }
}

/// Render an optional ratio; infinity prints as `inf`.
pub fn format_ratio(value: Option<f64>) -> String {
    match value {
        None => "n/a".to_string(),
        Some(v) if v.is_infinite() => "inf".to_string(),
        Some(v) => format!("{:.2}", v),
    }
}

fn format_pct(value: Option<f64>) -> String {
    match value {
        None => "n/a".to_string(),
        Some(v) => format!("{:.1}%", v * 100.0),
    }
}

fn print_summary(result: &BacktestResult) {
    let m = &result.metrics;
    eprintln!("\n=== {} / {} ===", result.symbol, result.strategy_id);
    eprintln!("Bars:             {}", result.bars_processed);
    eprintln!("Final Equity:     {:.2}", result.final_equity());
    eprintln!("Total Return:     {:.2}%", m.total_return * 100.0);
    eprintln!("Annualized:       {:.2}%", m.annualized_return * 100.0);
    eprintln!("Volatility:       {}", format_pct(m.volatility));
    eprintln!("Sharpe Ratio:     {}", format_ratio(m.sharpe_ratio));
    eprintln!("Sortino Ratio:    {}", format_ratio(m.sortino_ratio));
    eprintln!("Calmar Ratio:     {}", format_ratio(m.calmar_ratio));
    eprintln!("Max Drawdown:     {:.1}%", m.max_drawdown * 100.0);
    eprintln!("VaR (95%):        {}", format_pct(m.value_at_risk_95));
    eprintln!("Total Trades:     {}", m.total_trades);
    eprintln!("Win Rate:         {}", format_pct(m.win_rate));
    eprintln!("Profit Factor:    {}", format_ratio(m.profit_factor));
    eprintln!("Commission Paid:  {:.2}", m.total_commission);
    eprintln!("Slippage Cost:    {:.2}", m.total_slippage);
    if result.risk_state.is_halted() {
        eprintln!("Risk State:       halted");
    }
}

fn print_comparison(comparison: &Comparison) {
    eprintln!("\n=== Strategy Comparison ===");
    for row in &comparison.rows {
        eprintln!(
            "  {:<32} return {:>8.2}%  sharpe {:>6}  max dd {:>6.1}%  trades {}",
            row.strategy_id,
            row.total_return * 100.0,
            format_ratio(row.sharpe_ratio),
            row.max_drawdown * 100.0,
            row.total_trades,
        );
    }
    let leaders = [
        ("total return", &comparison.best_total_return),
        ("sharpe ratio", &comparison.best_sharpe_ratio),
        ("max drawdown", &comparison.best_max_drawdown),
        ("win rate", &comparison.best_win_rate),
    ];
    eprintln!("\nBest by metric:");
    for (label, leader) in leaders {
        match leader {
            Some(l) => eprintln!("  {:<13} {} ({:.4})", label, l.strategy_id, l.value),
            None => eprintln!("  {:<13} n/a", label),
        }
    }
}
