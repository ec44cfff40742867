//! Backtest runner: orchestrates data loading, signal construction, engine
//! replay, and metric computation for a single run.

use chrono::{DateTime, Utc};
use fibtrade_core::domain::{Bar, EquityPoint, TradeRecord};
use fibtrade_core::engine::{
    run_backtest, window_range, EngineError, EngineObserver, TracingObserver,
};
use fibtrade_core::indicators::RetracementLevels;
use fibtrade_core::signal::{FibonacciCrossover, Signal, SignalGenerator};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{BacktestConfig, ConfigFileError};
use crate::data_loader::{infer_annualization_factor, load_bars, LoadError};
use crate::metrics::{PerformanceMetrics, DEFAULT_ANNUALIZATION};

/// Current schema version for persisted results.
pub const SCHEMA_VERSION: u32 = 1;

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigFileError),

    #[error("data error: {0}")]
    Data(#[from] LoadError),

    #[error("engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("no data file configured (set [data] path or pass --data)")]
    MissingDataPath,
}

/// Complete result of a single backtest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestResult {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub metrics: PerformanceMetrics,
    pub trades: Vec<TradeRecord>,
    pub equity: Vec<EquityPoint>,
    pub config: BacktestConfig,
    pub signal_name: String,
    pub dataset_hash: String,
    pub first_bar: DateTime<Utc>,
    pub last_bar: DateTime<Utc>,
    pub bar_count: usize,
    pub bars_processed: usize,
    pub warmup_bars: usize,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Run a single backtest from a `BacktestConfig`, loading bars from
/// `[data] path` and logging engine events through `tracing`.
pub fn run_single_backtest(config: &BacktestConfig) -> Result<BacktestResult, RunError> {
    config.validate()?;
    let path = config
        .data
        .path
        .as_deref()
        .ok_or(RunError::MissingDataPath)?;
    let loaded = load_bars(path)?;
    let mut observer = TracingObserver;
    run_backtest_from_bars(&loaded.bars, config, &loaded.dataset_hash, &mut observer)
}

/// Run a backtest on pre-loaded bars.
///
/// The annualization factor comes from `[analysis]` when set, otherwise from
/// the bar spacing, otherwise `DEFAULT_ANNUALIZATION`.
pub fn run_backtest_from_bars(
    bars: &[Bar],
    config: &BacktestConfig,
    dataset_hash: &str,
    observer: &mut dyn EngineObserver,
) -> Result<BacktestResult, RunError> {
    config.validate()?;
    let generator = FibonacciCrossover::new(config.signal.clone()).map_err(ConfigFileError::from)?;

    let run = run_backtest(bars, &generator, &config.engine, observer)?;

    let annualization_factor = config
        .analysis
        .annualization_factor
        .or_else(|| infer_annualization_factor(bars))
        .unwrap_or(DEFAULT_ANNUALIZATION);
    let metrics = PerformanceMetrics::compute(&run, annualization_factor);

    tracing::info!(
        bars = bars.len(),
        trades = metrics.trade_count,
        end_balance = metrics.end_balance,
        sharpe = metrics.sharpe,
        max_drawdown = metrics.max_drawdown,
        "backtest complete"
    );

    // run_backtest rejects empty input, so both ends exist here.
    let (first_bar, last_bar) = match (bars.first(), bars.last()) {
        (Some(first), Some(last)) => (first.timestamp, last.timestamp),
        _ => return Err(EngineError::EmptyInput.into()),
    };

    Ok(BacktestResult {
        schema_version: SCHEMA_VERSION,
        metrics,
        trades: run.trades,
        equity: run.equity,
        config: config.clone(),
        signal_name: generator.name().to_string(),
        dataset_hash: dataset_hash.to_string(),
        first_bar,
        last_bar,
        bar_count: bars.len(),
        bars_processed: run.bars_processed,
        warmup_bars: run.warmup_bars,
    })
}

/// Signal state at the most recent bar.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalSnapshot {
    pub timestamp: DateTime<Utc>,
    pub close: f64,
    pub levels: RetracementLevels,
    pub signal: Signal,
}

/// Evaluate the generator on the last bar exactly as the replay loop would.
///
/// Returns `None` when there are not more than `lookback` bars.
pub fn latest_signal(
    bars: &[Bar],
    lookback: usize,
    generator: &dyn SignalGenerator,
) -> Option<SignalSnapshot> {
    if lookback == 0 || bars.len() <= lookback {
        return None;
    }
    let i = bars.len() - 1;
    let (high, low) = window_range(&bars[i - lookback..i]);
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    Some(SignalSnapshot {
        timestamp: bars[i].timestamp,
        close: bars[i].close,
        levels: RetracementLevels::from_range(high, low),
        signal: generator.evaluate(&closes, high, low),
    })
}
