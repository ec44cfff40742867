//! Performance metrics: pure functions that compute strategy statistics.
//!
//! Every metric is a pure function: balance series and/or trade list in,
//! scalar out. No dependencies on the runner, data pipeline, or engine loop.

use std::fmt;

use fibtrade_core::domain::TradeRecord;
use fibtrade_core::engine::RunResult;
use serde::{Deserialize, Deserializer, Serialize};

/// Bars per year assumed when the bar spacing cannot be inferred.
pub const DEFAULT_ANNUALIZATION: f64 = 252.0;

/// Aggregate performance metrics for a single backtest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub start_balance: f64,
    pub end_balance: f64,
    pub trade_count: usize,
    /// NaN when the step returns have zero variance; serialized as null.
    #[serde(deserialize_with = "nan_from_null")]
    pub sharpe: f64,
    /// Non-positive fraction, e.g. -0.15 for a 15% drawdown.
    pub max_drawdown: f64,
    pub total_return: f64,
    pub total_commission: f64,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub annualization_factor: f64,
}

impl PerformanceMetrics {
    /// Compute all metrics from a finished run.
    pub fn compute(run: &RunResult, annualization_factor: f64) -> Self {
        let balances: Vec<f64> = run.equity.iter().map(|p| p.balance).collect();
        let returns = step_returns(&balances);
        Self {
            start_balance: run.start_balance,
            end_balance: run.end_balance,
            trade_count: run.trades.len(),
            sharpe: sharpe_ratio(&returns, annualization_factor),
            max_drawdown: max_drawdown(&balances),
            total_return: total_return(run.start_balance, run.end_balance),
            total_commission: run.total_commission(),
            win_rate: win_rate(&run.trades),
            profit_factor: profit_factor(&run.trades),
            annualization_factor,
        }
    }
}

impl fmt::Display for PerformanceMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Start: {:.2}", self.start_balance)?;
        writeln!(f, "End: {:.2}", self.end_balance)?;
        writeln!(f, "Trades: {}", self.trade_count)?;
        writeln!(f, "Sharpe Ratio: {:.2}", self.sharpe)?;
        write!(f, "Max Drawdown: {:.2}%", self.max_drawdown * 100.0)
    }
}

fn nan_from_null<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
}

// ─── Individual metric functions ────────────────────────────────────

/// Fractional change between consecutive balances.
///
/// Same length as the input; the first step has no predecessor and counts as
/// 0. A step from a non-positive balance also counts as 0.
pub fn step_returns(balances: &[f64]) -> Vec<f64> {
    if balances.is_empty() {
        return Vec::new();
    }
    let mut returns = Vec::with_capacity(balances.len());
    returns.push(0.0);
    returns.extend(balances.windows(2).map(|w| {
        if w[0] > 0.0 {
            (w[1] - w[0]) / w[0]
        } else {
            0.0
        }
    }));
    returns
}

/// Annualized Sharpe ratio: mean / sample std * sqrt(annualization_factor).
///
/// Returns NaN for fewer than two returns or zero variance.
pub fn sharpe_ratio(returns: &[f64], annualization_factor: f64) -> f64 {
    if returns.len() < 2 {
        return f64::NAN;
    }
    let std = std_dev(returns);
    if std < 1e-15 {
        return f64::NAN;
    }
    mean_f64(returns) / std * annualization_factor.sqrt()
}

/// Drawdown at every point: balance / running peak - 1, never positive.
pub fn drawdown_series(balances: &[f64]) -> Vec<f64> {
    let mut peak = f64::NEG_INFINITY;
    balances
        .iter()
        .map(|&b| {
            peak = peak.max(b);
            if peak > 0.0 {
                (b - peak) / peak
            } else {
                0.0
            }
        })
        .collect()
}

/// Maximum drawdown as a negative fraction (e.g., -0.15 = 15% drawdown).
///
/// Returns 0.0 if equity is constant or monotonically increasing.
pub fn max_drawdown(balances: &[f64]) -> f64 {
    drawdown_series(balances).into_iter().fold(0.0, f64::min)
}

/// Total return as a fraction: (end - start) / start.
pub fn total_return(start_balance: f64, end_balance: f64) -> f64 {
    if start_balance <= 0.0 {
        return 0.0;
    }
    (end_balance - start_balance) / start_balance
}

/// Win rate: fraction of trades that were winners.
pub fn win_rate(trades: &[TradeRecord]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let winners = trades.iter().filter(|t| t.is_winner()).count();
    winners as f64 / trades.len() as f64
}

/// Profit factor: gross profits / gross losses.
///
/// Capped at 100.0 for edge cases (all winners, zero losses).
pub fn profit_factor(trades: &[TradeRecord]) -> f64 {
    let gross_profit: f64 = trades
        .iter()
        .filter(|t| t.net_pnl > 0.0)
        .map(|t| t.net_pnl)
        .sum();
    let gross_loss: f64 = trades
        .iter()
        .filter(|t| t.net_pnl < 0.0)
        .map(|t| t.net_pnl.abs())
        .sum();

    if gross_loss < 1e-10 {
        return if gross_profit > 0.0 { 100.0 } else { 0.0 };
    }
    (gross_profit / gross_loss).min(100.0)
}

pub(crate) fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub(crate) fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(values);
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}
