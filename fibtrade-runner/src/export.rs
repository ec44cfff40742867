//! Artifact export: trade ledger CSV, equity CSV, and the JSON result.
//!
//! Timestamps are written as RFC 3339 UTC (`2024-01-01T00:00:00Z`), prices and
//! PnL with six decimals. The JSON result carries a `schema_version`; unknown
//! versions are rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use fibtrade_core::domain::{EquityPoint, TradeRecord};

use crate::config::OutputConfig;
use crate::runner::{BacktestResult, SCHEMA_VERSION};

/// Trade ledger columns, in file order.
pub const TRADE_COLUMNS: [&str; 5] = ["timestamp", "position", "entry", "exit", "pnl"];

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a `BacktestResult` to pretty JSON. A NaN Sharpe becomes `null`.
pub fn export_json(result: &BacktestResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize BacktestResult to JSON")
}

/// Deserialize a `BacktestResult` from JSON, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<BacktestResult> {
    let result: BacktestResult =
        serde_json::from_str(json).context("failed to deserialize BacktestResult from JSON")?;
    if result.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            result.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(result)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Export the trade ledger, one row per closed trade in close order.
///
/// An empty ledger still produces the header row.
pub fn export_trades_csv(trades: &[TradeRecord]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(TRADE_COLUMNS)?;
    for t in trades {
        wtr.write_record([
            format_timestamp(&t.timestamp),
            t.side.to_string(),
            format!("{:.6}", t.entry_price),
            format!("{:.6}", t.exit_price),
            format!("{:.6}", t.net_pnl),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Export the equity curve with timestamp and balance columns.
pub fn export_equity_csv(equity: &[EquityPoint]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["timestamp", "balance"])?;
    for p in equity {
        wtr.write_record([format_timestamp(&p.timestamp), format!("{:.6}", p.balance)])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact files ─────────────────────────────────────────────────

fn write_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }
    std::fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}

/// Write every artifact named in `output`, returning the paths written.
pub fn write_artifacts(result: &BacktestResult, output: &OutputConfig) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    if let Some(path) = &output.trades {
        write_file(path, &export_trades_csv(&result.trades)?)?;
        written.push(path.clone());
    }
    if let Some(path) = &output.equity {
        write_file(path, &export_equity_csv(&result.equity)?)?;
        written.push(path.clone());
    }
    if let Some(path) = &output.summary_json {
        write_file(path, &export_json(result)?)?;
        written.push(path.clone());
    }
    for path in &written {
        tracing::info!(path = %path.display(), "wrote artifact");
    }
    Ok(written)
}

/// Load a `BacktestResult` from a JSON file written by `write_artifacts`.
pub fn load_result(path: &Path) -> Result<BacktestResult> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_json(&json)
}
