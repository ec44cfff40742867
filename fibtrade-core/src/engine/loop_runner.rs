//! Bar-by-bar replay: the heart of the backtesting engine.
//!
//! Per processed bar:
//! 1. Range high/low over the trailing `lookback_window` bars (current bar excluded)
//! 2. Signal over every close up to and including the current bar
//! 3. Slippage-adjusted fill price from the bar close
//! 4. Trade executor decision
//! 5. Equity sample
//!
//! After the last bar a still-open position is force-closed.

use thiserror::Error;

use super::accounting::EquityRecorder;
use super::cost_model::{CostModel, FinalClose};
use super::executor::TradeExecutor;
use super::ledger::LedgerError;
use super::observer::{EngineEvent, EngineObserver};
use super::state::{ConfigError, EngineConfig, RunResult};
use crate::domain::Bar;
use crate::signal::SignalGenerator;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid engine config: {0}")]
    Config(#[from] ConfigError),
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
    #[error("no bars to replay")]
    EmptyInput,
}

/// Replay `bars` against `signal_generator`.
///
/// `bars` must be in ascending timestamp order. Bars before index
/// `lookback_window` only feed the lookback; with no more bars than that, no
/// decisions are made and the equity curve holds only its seed point.
pub fn run_backtest(
    bars: &[Bar],
    signal_generator: &dyn SignalGenerator,
    config: &EngineConfig,
    observer: &mut dyn EngineObserver,
) -> Result<RunResult, EngineError> {
    config.validate()?;
    let first = bars.first().ok_or(EngineError::EmptyInput)?;

    let cost = CostModel::new(
        config.commission_rate,
        config.slippage_rate,
        config.slippage_basis,
    );
    let mut executor = TradeExecutor::new(config.initial_balance, config.stake_fraction, cost);
    let mut recorder = EquityRecorder::seed(config.initial_balance, first.timestamp);
    observer.on_event(&EngineEvent::Sampled(recorder.points()[0]));

    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let window = config.lookback_window;
    let mut bars_processed = 0;

    for i in window..bars.len() {
        let bar = &bars[i];
        let (high, low) = window_range(&bars[i - window..i]);

        let signal = signal_generator.evaluate(&closes[..=i], high, low);
        let fill_price = cost.fill_price(bar.close, executor.side(), signal);
        observer.on_event(&EngineEvent::SignalEvaluated {
            timestamp: bar.timestamp,
            signal,
            close: bar.close,
            fill_price,
        });

        executor.decide(signal, fill_price, bar.timestamp, observer)?;

        let point = recorder.sample(bar.timestamp, executor.balance());
        observer.on_event(&EngineEvent::Sampled(point));
        bars_processed += 1;
    }

    if let (Some(held), Some(last)) = (executor.side(), bars.last()) {
        let price = match config.final_close {
            FinalClose::RawClose => last.close,
            FinalClose::Slipped => cost.exit_price(last.close, held),
        };
        observer.on_event(&EngineEvent::ForcedClose {
            timestamp: last.timestamp,
            price,
        });
        executor.close(price, last.timestamp, observer);
    }

    Ok(RunResult {
        equity: recorder.into_points(),
        start_balance: config.initial_balance,
        end_balance: executor.balance(),
        bars_processed,
        warmup_bars: window.min(bars.len()),
        open_commissions: executor.open_commissions(),
        close_commissions: executor.close_commissions(),
        trades: executor.into_trades(),
    })
}

/// Highest high and lowest low of `window`.
pub fn window_range(window: &[Bar]) -> (f64, f64) {
    window.iter().fold((f64::MIN, f64::MAX), |(high, low), bar| {
        (high.max(bar.high), low.min(bar.low))
    })
}
