//! Integration tests for the runner: CSV in, ledger and summary out.

use std::path::{Path, PathBuf};

use chrono::{Duration, TimeZone, Utc};
use fibtrade_core::domain::PositionSide;
use fibtrade_runner::config::BacktestConfig;
use fibtrade_runner::data_loader::LoadError;
use fibtrade_runner::export::{
    export_json, export_trades_csv, import_json, load_result, write_artifacts,
};
use fibtrade_runner::metrics::{drawdown_series, max_drawdown};
use fibtrade_runner::runner::{run_single_backtest, RunError};
use proptest::prelude::*;
use tempfile::TempDir;

fn write_bars(dir: &Path, closes: &[f64]) -> PathBuf {
    let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let mut csv = String::from("timestamp,open,high,low,close,volume\n");
    for (i, close) in closes.iter().enumerate() {
        let ts = t0 + Duration::hours(i as i64);
        csv.push_str(&format!(
            "{},{close},{},{},{close},1000\n",
            ts.format("%Y-%m-%d %H:%M:%S"),
            close + 1.0,
            close - 1.0,
        ));
    }
    let path = dir.join("bars.csv");
    std::fs::write(&path, csv).unwrap();
    path
}

/// Oscillating closes that trigger BUY at bar 40, SELL at 62, BUY at 84 and
/// SELL at 106 with the default signal parameters.
fn wave_closes() -> Vec<f64> {
    (0..120)
        .map(|i| 100.0 + 30.0 * (i as f64 / 7.0).sin())
        .collect()
}

fn config_for(data: PathBuf, out: &Path) -> BacktestConfig {
    let mut config = BacktestConfig::default();
    config.data.path = Some(data);
    config.output.trades = Some(out.join("trades.csv"));
    config.output.equity = Some(out.join("equity.csv"));
    config.output.summary_json = Some(out.join("summary.json"));
    config
}

#[test]
fn missing_columns_fail_before_replay() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bars.csv");
    std::fs::write(&path, "timestamp,open,close\n2024-01-01,1,1\n").unwrap();
    let mut config = BacktestConfig::default();
    config.data.path = Some(path);

    match run_single_backtest(&config) {
        Err(RunError::Data(LoadError::MissingColumns(cols))) => {
            assert_eq!(cols, vec!["high", "low", "volume"]);
        }
        other => panic!("expected missing columns, got {other:?}"),
    }
}

#[test]
fn flat_market_holds_throughout() {
    let dir = TempDir::new().unwrap();
    let data = write_bars(dir.path(), &[100.0; 30]);
    let config = config_for(data, dir.path());

    let result = run_single_backtest(&config).unwrap();
    assert_eq!(result.metrics.trade_count, 0);
    assert_eq!(result.metrics.end_balance, 10_000.0);
    assert!(result.metrics.sharpe.is_nan());
    assert_eq!(result.metrics.max_drawdown, 0.0);
    assert_eq!(result.equity.len(), 11);
    assert!(result.equity.iter().all(|p| p.balance == 10_000.0));

    write_artifacts(&result, &config.output).unwrap();
    let trades = std::fs::read_to_string(dir.path().join("trades.csv")).unwrap();
    assert_eq!(trades, "timestamp,position,entry,exit,pnl\n");

    let summary = std::fs::read_to_string(dir.path().join("summary.json")).unwrap();
    assert!(summary.contains("\"sharpe\": null"));
    assert!(summary.contains("\"schema_version\": 1"));
}

#[test]
fn wave_trades_alternate_and_reconcile() {
    let dir = TempDir::new().unwrap();
    let data = write_bars(dir.path(), &wave_closes());
    let result = run_single_backtest(&config_for(data, dir.path())).unwrap();

    let sides: Vec<PositionSide> = result.trades.iter().map(|t| t.side).collect();
    assert_eq!(
        sides,
        vec![
            PositionSide::Long,
            PositionSide::Short,
            PositionSide::Long,
            PositionSide::Short
        ]
    );
    assert_eq!(result.equity.len(), 101);
    assert_eq!(result.bars_processed, 100);
    assert!(result.metrics.sharpe.is_finite());
    assert!(result.metrics.max_drawdown <= 0.0);
    assert!(result.metrics.total_commission > 0.0);

    // The final trade is the forced close at the last bar's raw close.
    let last = result.trades.last().unwrap();
    assert_eq!(last.timestamp, result.last_bar);
    assert_eq!(last.exit_price, *wave_closes().last().unwrap());

    // Trades come out in close order.
    assert!(result
        .trades
        .windows(2)
        .all(|w| w[0].timestamp < w[1].timestamp));
}

#[test]
fn identical_runs_write_identical_files() {
    let dir_a = TempDir::new().unwrap();
    let dir_b = TempDir::new().unwrap();
    let closes = wave_closes();

    let mut summaries = Vec::new();
    for dir in [&dir_a, &dir_b] {
        let data = write_bars(dir.path(), &closes);
        let config = config_for(data, dir.path());
        let result = run_single_backtest(&config).unwrap();
        write_artifacts(&result, &config.output).unwrap();
        summaries.push((result.metrics.to_string(), result.dataset_hash));
    }
    assert_eq!(summaries[0], summaries[1]);

    for name in ["trades.csv", "equity.csv"] {
        let a = std::fs::read(dir_a.path().join(name)).unwrap();
        let b = std::fs::read(dir_b.path().join(name)).unwrap();
        assert_eq!(a, b, "{name} differs between identical runs");
    }
}

#[test]
fn trades_csv_has_one_row_per_trade() {
    let dir = TempDir::new().unwrap();
    let data = write_bars(dir.path(), &wave_closes());
    let result = run_single_backtest(&config_for(data, dir.path())).unwrap();
    let csv = export_trades_csv(&result.trades).unwrap();
    assert_eq!(csv.lines().count(), result.trades.len() + 1);
    assert!(csv.lines().nth(1).unwrap().contains(",long,"));
}

#[test]
fn result_json_round_trips_and_rejects_newer_schema() {
    let dir = TempDir::new().unwrap();
    let data = write_bars(dir.path(), &[100.0; 30]);
    let result = run_single_backtest(&config_for(data, dir.path())).unwrap();

    let json = export_json(&result).unwrap();
    let back = import_json(&json).unwrap();
    assert_eq!(back.trades, result.trades);
    assert_eq!(back.equity, result.equity);
    assert_eq!(back.dataset_hash, result.dataset_hash);
    assert!(back.metrics.sharpe.is_nan());

    let mut value: serde_json::Value = serde_json::from_str(&json).unwrap();
    value["schema_version"] = serde_json::json!(99);
    let err = import_json(&value.to_string()).unwrap_err();
    assert!(err.to_string().contains("unsupported schema version 99"));
}

#[test]
fn written_summary_loads_back_for_reporting() {
    let dir = TempDir::new().unwrap();
    let data = write_bars(dir.path(), &wave_closes());
    let config = config_for(data, dir.path());
    let result = run_single_backtest(&config).unwrap();
    write_artifacts(&result, &config.output).unwrap();

    let loaded = load_result(&dir.path().join("summary.json")).unwrap();
    assert_eq!(loaded.trades.len(), result.trades.len());
    assert_eq!(loaded.trades[0].side, PositionSide::Long);
    assert_eq!(loaded.metrics.to_string(), result.metrics.to_string());
    assert_eq!(loaded.bar_count, result.bar_count);

    let err = load_result(&dir.path().join("missing.json")).unwrap_err();
    assert!(err.to_string().contains("failed to read"));
}

#[test]
fn config_file_drives_the_run() {
    let dir = TempDir::new().unwrap();
    let data = write_bars(dir.path(), &[100.0; 30]);
    let toml = format!(
        "[data]\npath = {:?}\n\n[engine]\ninitial_balance = 5000.0\nlookback_window = 10\n\n[analysis]\nannualization_factor = 252.0\n",
        data.display().to_string()
    );
    let config_path = dir.path().join("fibtrade.toml");
    std::fs::write(&config_path, toml).unwrap();

    let config = BacktestConfig::from_file(&config_path).unwrap();
    let result = run_single_backtest(&config).unwrap();
    assert_eq!(result.metrics.start_balance, 5_000.0);
    assert_eq!(result.warmup_bars, 10);
    assert_eq!(result.equity.len(), 21);
    assert_eq!(result.metrics.annualization_factor, 252.0);
}

proptest! {
    #[test]
    fn max_drawdown_is_never_positive(
        balances in prop::collection::vec(1.0f64..1e6, 0..200)
    ) {
        let dd = max_drawdown(&balances);
        prop_assert!(dd <= 0.0);
        prop_assert!(dd > -1.0);
        let series = drawdown_series(&balances);
        prop_assert_eq!(series.len(), balances.len());
        prop_assert!(series.iter().all(|&d| d <= 0.0 && d >= dd));
    }
}
