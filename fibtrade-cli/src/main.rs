//! fibtrade CLI: run backtests, inspect the latest signal, write a config.
//!
//! Commands:
//! - `run`: replay a CSV of bars and write the trade ledger and summary
//! - `signal`: evaluate the signal on the last bar of a CSV
//! - `report`: print the summary of a previously written JSON result
//! - `init-config`: write the default TOML configuration

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use fibtrade_core::engine::{FinalClose, SlippageBasis};
use fibtrade_core::signal::FibonacciCrossover;
use fibtrade_runner::{
    latest_signal, load_bars, load_result, run_single_backtest, write_artifacts,
    BacktestConfig, BacktestResult,
};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(
    name = "fibtrade",
    about = "Fibonacci retracement crossover backtester"
)]
struct Cli {
    /// Log level (trace, debug, info, warn, error). RUST_LOG takes precedence.
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Also append plain log lines to this file.
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a bar file and report performance.
    Run {
        /// Path to a TOML config file.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Bar CSV (overrides `[data] path`).
        #[arg(long)]
        data: Option<PathBuf>,

        #[command(flatten)]
        overrides: Overrides,
    },
    /// Evaluate the signal on the most recent bar of a file.
    Signal {
        /// Bar CSV.
        #[arg(long)]
        data: PathBuf,

        /// Path to a TOML config file for signal parameters.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Bars in the high/low window. Defaults to the config value.
        #[arg(long)]
        lookback: Option<usize>,
    },
    /// Print the summary of a JSON result written by `run`.
    Report {
        /// Path to the summary JSON.
        summary: PathBuf,
    },
    /// Write the default configuration as TOML.
    InitConfig {
        #[arg(long, default_value = "fibtrade.toml")]
        path: PathBuf,

        /// Overwrite an existing file.
        #[arg(long, default_value_t = false)]
        force: bool,
    },
}

/// Command-line overrides of config file values.
#[derive(Args)]
struct Overrides {
    #[arg(long)]
    initial_balance: Option<f64>,
    /// Commission rate per fill, as a fraction of notional.
    #[arg(long)]
    commission: Option<f64>,
    /// Slippage rate, as a fraction of the close.
    #[arg(long)]
    slippage: Option<f64>,
    /// Fraction of the balance committed per position.
    #[arg(long)]
    stake_fraction: Option<f64>,
    #[arg(long)]
    lookback: Option<usize>,
    /// Bars per year for the Sharpe ratio.
    #[arg(long)]
    annualization: Option<f64>,
    #[arg(long, value_enum)]
    slippage_basis: Option<BasisArg>,
    #[arg(long, value_enum)]
    final_close: Option<FinalCloseArg>,
    #[arg(long)]
    trades_out: Option<PathBuf>,
    #[arg(long)]
    equity_out: Option<PathBuf>,
    #[arg(long)]
    summary_json: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum BasisArg {
    HeldPosition,
    TradeDirection,
}

#[derive(Clone, Copy, ValueEnum)]
enum FinalCloseArg {
    RawClose,
    Slipped,
}

impl From<BasisArg> for SlippageBasis {
    fn from(arg: BasisArg) -> Self {
        match arg {
            BasisArg::HeldPosition => SlippageBasis::HeldPosition,
            BasisArg::TradeDirection => SlippageBasis::TradeDirection,
        }
    }
}

impl From<FinalCloseArg> for FinalClose {
    fn from(arg: FinalCloseArg) -> Self {
        match arg {
            FinalCloseArg::RawClose => FinalClose::RawClose,
            FinalCloseArg::Slipped => FinalClose::Slipped,
        }
    }
}

impl Overrides {
    fn apply(self, config: &mut BacktestConfig) {
        let engine = &mut config.engine;
        if let Some(v) = self.initial_balance {
            engine.initial_balance = v;
        }
        if let Some(v) = self.commission {
            engine.commission_rate = v;
        }
        if let Some(v) = self.slippage {
            engine.slippage_rate = v;
        }
        if let Some(v) = self.stake_fraction {
            engine.stake_fraction = v;
        }
        if let Some(v) = self.lookback {
            engine.lookback_window = v;
        }
        if let Some(v) = self.slippage_basis {
            engine.slippage_basis = v.into();
        }
        if let Some(v) = self.final_close {
            engine.final_close = v.into();
        }
        if let Some(v) = self.annualization {
            config.analysis.annualization_factor = Some(v);
        }
        if let Some(p) = self.trades_out {
            config.output.trades = Some(p);
        }
        if let Some(p) = self.equity_out {
            config.output.equity = Some(p);
        }
        if let Some(p) = self.summary_json {
            config.output.summary_json = Some(p);
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level, cli.log_file.as_deref())?;

    match cli.command {
        Commands::Run {
            config,
            data,
            overrides,
        } => run_backtest_cmd(config, data, overrides),
        Commands::Signal {
            data,
            config,
            lookback,
        } => run_signal_cmd(&data, config, lookback),
        Commands::Report { summary } => run_report_cmd(&summary),
        Commands::InitConfig { path, force } => run_init_config(&path, force),
    }
}

fn init_logging(level: &str, log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .with_context(|| format!("invalid log level '{level}'"))?;

    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(file_layer)
        .try_init()
        .context("failed to install log subscriber")
}

fn load_config(path: Option<PathBuf>) -> Result<BacktestConfig> {
    match path {
        Some(path) => Ok(BacktestConfig::from_file(&path)?),
        None => Ok(BacktestConfig::default()),
    }
}

fn run_backtest_cmd(
    config_path: Option<PathBuf>,
    data: Option<PathBuf>,
    overrides: Overrides,
) -> Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(data) = data {
        config.data.path = Some(data);
    }
    overrides.apply(&mut config);
    tracing::info!(data = ?config.data.path, engine = ?config.engine, "starting backtest");

    let result = run_single_backtest(&config)?;
    print_summary(&result);

    for path in write_artifacts(&result, &config.output)? {
        println!("Wrote {}", path.display());
    }
    Ok(())
}

fn run_signal_cmd(data: &Path, config_path: Option<PathBuf>, lookback: Option<usize>) -> Result<()> {
    let config = load_config(config_path)?;
    let lookback = lookback.unwrap_or(config.engine.lookback_window);
    let generator = FibonacciCrossover::new(config.signal.clone())?;
    let loaded = load_bars(data)?;

    let Some(snapshot) = latest_signal(&loaded.bars, lookback, &generator) else {
        bail!(
            "need more than {lookback} bars to evaluate a signal, found {}",
            loaded.bars.len()
        );
    };

    println!("Bar:    {}", snapshot.timestamp);
    println!("Close:  {:.6}", snapshot.close);
    println!("Range:  {:.6} - {:.6}", snapshot.levels.low, snapshot.levels.high);
    for (label, price) in snapshot.levels.labelled() {
        println!("  {label:>6}  {price:.6}");
    }
    println!("Signal: {}", snapshot.signal);
    Ok(())
}

fn run_report_cmd(summary: &Path) -> Result<()> {
    let result = load_result(summary)?;
    tracing::info!(path = %summary.display(), signal = %result.signal_name, "loaded result");
    print_summary(&result);
    Ok(())
}

fn run_init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    let toml = BacktestConfig::default().to_toml_string()?;
    std::fs::write(path, toml).with_context(|| format!("failed to write {}", path.display()))?;
    println!("Wrote {}", path.display());
    Ok(())
}

fn print_summary(result: &BacktestResult) {
    let m = &result.metrics;
    println!();
    println!("=== Backtest Result ===");
    println!("{m}");
    println!();
    println!(
        "Bars:           {} ({} warmup, {} processed)",
        result.bar_count, result.warmup_bars, result.bars_processed
    );
    println!("Period:         {} to {}", result.first_bar, result.last_bar);
    println!("Total Return:   {:.2}%", m.total_return * 100.0);
    println!("Commission:     {:.2}", m.total_commission);
    println!("Win Rate:       {:.1}%", m.win_rate * 100.0);
    println!("Profit Factor:  {:.2}", m.profit_factor);
    println!("Bars/Year:      {}", m.annualization_factor);
    println!("Dataset Hash:   {}", result.dataset_hash);
}
