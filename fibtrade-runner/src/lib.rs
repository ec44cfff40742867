//! fibtrade runner: backtest orchestration, data loading, metrics, export.
//!
//! This crate builds on `fibtrade-core` to provide:
//! - TOML run configuration with defaults for every key
//! - CSV bar loading with row-level validation and a dataset hash
//! - Single-backtest runner with performance metrics
//! - Trade ledger, equity curve, and JSON result export

pub mod config;
pub mod data_loader;
pub mod export;
pub mod metrics;
pub mod runner;

pub use config::{AnalysisConfig, BacktestConfig, ConfigFileError, DataConfig, OutputConfig};
pub use data_loader::{
    compute_dataset_hash, infer_annualization_factor, load_bars, read_bars, LoadError, LoadedData,
};
pub use export::{
    export_equity_csv, export_json, export_trades_csv, import_json, load_result, write_artifacts,
};
pub use metrics::PerformanceMetrics;
pub use runner::{
    latest_signal, run_backtest_from_bars, run_single_backtest, BacktestResult, RunError,
    SignalSnapshot, SCHEMA_VERSION,
};
