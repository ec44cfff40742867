//! Bar loading from CSV files.
//!
//! The file must carry a header row with `timestamp, open, high, low, close,
//! volume` (any order, extra columns ignored). Timestamps may be RFC 3339,
//! naive `YYYY-MM-DD HH:MM:SS` / `YYYY-MM-DDTHH:MM:SS` (read as UTC), a bare
//! date, or integer epoch milliseconds. Rows must be strictly ascending in
//! time, every price and volume must be finite, and prices must be positive.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use fibtrade_core::domain::Bar;
use thiserror::Error;

/// Columns every bar file must provide.
pub const REQUIRED_COLUMNS: [&str; 6] = ["timestamp", "open", "high", "low", "close", "volume"];

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
];

/// Errors from the data loading layer. Row numbers count data rows from 1.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("row {row}: column '{column}' is not a number: '{value}'")]
    InvalidNumber {
        row: usize,
        column: &'static str,
        value: String,
    },

    #[error("row {row}: unrecognized timestamp '{value}'")]
    InvalidTimestamp { row: usize, value: String },

    #[error("row {row}: column '{column}' is not finite")]
    NonFinite { row: usize, column: &'static str },

    #[error("row {row}: column '{column}' must be positive")]
    NonPositivePrice { row: usize, column: &'static str },

    #[error("row {row}: timestamp is earlier than the previous row")]
    OutOfOrder { row: usize },

    #[error("row {row}: duplicate timestamp")]
    DuplicateTimestamp { row: usize },

    #[error("no bars in input")]
    Empty,
}

/// Result of loading bars, with provenance.
#[derive(Debug, Clone)]
pub struct LoadedData {
    pub bars: Vec<Bar>,
    /// Dataset hash for fingerprinting (BLAKE3 over all bar data).
    pub dataset_hash: String,
}

/// Load and validate bars from a CSV file.
pub fn load_bars(path: &Path) -> Result<LoadedData, LoadError> {
    let file = File::open(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let bars = read_bars(file)?;
    let dataset_hash = compute_dataset_hash(&bars);
    tracing::info!(
        path = %path.display(),
        bars = bars.len(),
        first = %bars[0].timestamp,
        last = %bars[bars.len() - 1].timestamp,
        "loaded bars"
    );
    Ok(LoadedData { bars, dataset_hash })
}

/// Parse bars from any CSV reader.
pub fn read_bars<R: Read>(reader: R) -> Result<Vec<Bar>, LoadError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
    };
    let missing: Vec<String> = REQUIRED_COLUMNS
        .into_iter()
        .filter(|&name| column(name).is_none())
        .map(String::from)
        .collect();
    if !missing.is_empty() {
        return Err(LoadError::MissingColumns(missing));
    }
    let mut idx = [0usize; 6];
    for (slot, name) in idx.iter_mut().zip(REQUIRED_COLUMNS) {
        *slot = column(name).unwrap_or_default();
    }

    let mut bars: Vec<Bar> = Vec::new();
    for (i, record) in rdr.records().enumerate() {
        let record = record?;
        let row = i + 1;
        let field = |k: usize| record.get(idx[k]).unwrap_or("");

        let raw_ts = field(0);
        let timestamp = parse_timestamp(raw_ts).ok_or_else(|| LoadError::InvalidTimestamp {
            row,
            value: raw_ts.to_string(),
        })?;

        let mut values = [0.0_f64; 5];
        for (k, value) in values.iter_mut().enumerate() {
            let name = REQUIRED_COLUMNS[k + 1];
            let raw = field(k + 1);
            let parsed: f64 = raw.parse().map_err(|_| LoadError::InvalidNumber {
                row,
                column: name,
                value: raw.to_string(),
            })?;
            if !parsed.is_finite() {
                return Err(LoadError::NonFinite { row, column: name });
            }
            if name != "volume" && parsed <= 0.0 {
                return Err(LoadError::NonPositivePrice { row, column: name });
            }
            *value = parsed;
        }

        if let Some(prev) = bars.last() {
            if timestamp == prev.timestamp {
                return Err(LoadError::DuplicateTimestamp { row });
            }
            if timestamp < prev.timestamp {
                return Err(LoadError::OutOfOrder { row });
            }
        }

        let [open, high, low, close, volume] = values;
        let bar = Bar {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        };
        if !bar.is_sane() {
            tracing::warn!(row, timestamp = %timestamp, "bar fails OHLC sanity check");
        }
        bars.push(bar);
    }

    if bars.is_empty() {
        return Err(LoadError::Empty);
    }
    Ok(bars)
}

/// Parse one timestamp cell. Naive values are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
    }
    if let Ok(millis) = raw.parse::<i64>() {
        return DateTime::from_timestamp_millis(millis);
    }
    None
}

/// Compute a deterministic BLAKE3 hash over all bar data.
pub fn compute_dataset_hash(bars: &[Bar]) -> String {
    let mut hasher = blake3::Hasher::new();
    for bar in bars {
        hasher.update(&bar.timestamp.timestamp_millis().to_le_bytes());
        hasher.update(&bar.open.to_le_bytes());
        hasher.update(&bar.high.to_le_bytes());
        hasher.update(&bar.low.to_le_bytes());
        hasher.update(&bar.close.to_le_bytes());
        hasher.update(&bar.volume.to_le_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

/// Bars per year implied by the median spacing between bars.
///
/// Uses a 252-day year so daily bars give 252 and 5-minute bars give
/// 252 * 288. Returns `None` with fewer than two bars.
pub fn infer_annualization_factor(bars: &[Bar]) -> Option<f64> {
    let mut gaps: Vec<i64> = bars
        .windows(2)
        .map(|w| (w[1].timestamp - w[0].timestamp).num_seconds())
        .filter(|&secs| secs > 0)
        .collect();
    if gaps.is_empty() {
        return None;
    }
    gaps.sort_unstable();
    let mid = gaps.len() / 2;
    let median = if gaps.len() % 2 == 0 {
        (gaps[mid - 1] + gaps[mid]) as f64 / 2.0
    } else {
        gaps[mid] as f64
    };
    Some(252.0 * 86_400.0 / median)
}
