//! Serializable backtest configuration, loaded from TOML.
//!
//! Every table and key is optional; missing values take the defaults below.
//!
//! ```toml
//! [data]
//! path = "data/BTC_USDT_1h.csv"
//!
//! [engine]
//! initial_balance = 10000.0
//! commission_rate = 0.0005
//! slippage_rate = 0.0002
//! stake_fraction = 0.1
//! lookback_window = 20
//! slippage_basis = "held_position"   # or "trade_direction"
//! final_close = "raw_close"          # or "slipped"
//!
//! [signal]
//! short_period = 5
//! long_period = 10
//! tolerance = 0.01
//! buy_level = "61.8%"
//! sell_level = "38.2%"
//!
//! [analysis]
//! annualization_factor = 6048.0      # inferred from bar spacing when absent
//!
//! [output]
//! trades = "trades.csv"
//! equity = "equity.csv"
//! summary_json = "summary.json"
//! ```

use std::path::{Path, PathBuf};

use fibtrade_core::engine::{ConfigError, EngineConfig};
use fibtrade_core::signal::fibonacci::SignalConfigError;
use fibtrade_core::signal::SignalConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from reading or validating a config file.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("failed to render TOML: {0}")]
    Render(#[from] toml::ser::Error),
    #[error("[engine] {0}")]
    Engine(#[from] ConfigError),
    #[error("[signal] {0}")]
    Signal(#[from] SignalConfigError),
    #[error("[analysis] annualization_factor must be > 0, got {0}")]
    Annualization(f64),
}

/// Full configuration of one backtest run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    pub data: DataConfig,
    pub engine: EngineConfig,
    pub signal: SignalConfig,
    pub analysis: AnalysisConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// CSV file with timestamp, open, high, low, close, volume columns.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Bars per year. Inferred from the median bar spacing when absent.
    pub annualization_factor: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub trades: Option<PathBuf>,
    pub equity: Option<PathBuf>,
    pub summary_json: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            trades: Some(PathBuf::from("trades.csv")),
            equity: None,
            summary_json: None,
        }
    }
}

impl BacktestConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigFileError> {
        let config: BacktestConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigFileError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigFileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigFileError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigFileError> {
        self.engine.validate()?;
        self.signal.validate()?;
        if let Some(factor) = self.analysis.annualization_factor {
            if !(factor > 0.0 && factor.is_finite()) {
                return Err(ConfigFileError::Annualization(factor));
            }
        }
        Ok(())
    }
}
