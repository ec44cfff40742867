//! Backtesting engine: single-instrument, single-position replay.
//!
//! The engine consumes ordered bars and a signal generator, and produces the
//! closed-trade ledger and the equity curve. One fill per bar, at the bar close
//! adjusted for slippage.

pub mod accounting;
pub mod cost_model;
pub mod executor;
pub mod ledger;
pub mod loop_runner;
pub mod observer;
pub mod state;

pub use accounting::EquityRecorder;
pub use cost_model::{CostModel, FinalClose, SlippageBasis};
pub use executor::TradeExecutor;
pub use ledger::{LedgerError, PositionLedger};
pub use loop_runner::{run_backtest, window_range, EngineError};
pub use observer::{EngineEvent, EngineObserver, EventLog, NullObserver, TracingObserver};
pub use state::{ConfigError, EngineConfig, RunResult};
