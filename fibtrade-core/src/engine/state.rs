//! Engine configuration and run result types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::cost_model::{FinalClose, SlippageBasis};
use crate::domain::{EquityPoint, TradeRecord};

/// Configuration for a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub initial_balance: f64,
    /// Fraction of notional charged on every fill.
    pub commission_rate: f64,
    /// Fractional price adjustment applied to every fill.
    pub slippage_rate: f64,
    /// Fraction of the current balance committed to a new position.
    pub stake_fraction: f64,
    /// Trailing window for the range high/low. Also the number of warm-up bars
    /// skipped before the first decision.
    pub lookback_window: usize,
    pub slippage_basis: SlippageBasis,
    pub final_close: FinalClose,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            initial_balance: 10_000.0,
            commission_rate: 0.0005,
            slippage_rate: 0.0002,
            stake_fraction: 0.10,
            lookback_window: 20,
            slippage_basis: SlippageBasis::HeldPosition,
            final_close: FinalClose::RawClose,
        }
    }
}

/// A configuration value outside its allowed range.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("initial_balance must be > 0, got {0}")]
    InitialBalance(f64),
    #[error("commission_rate must be >= 0, got {0}")]
    CommissionRate(f64),
    #[error("slippage_rate must be >= 0 and < 1, got {0}")]
    SlippageRate(f64),
    #[error("stake_fraction must be in (0, 1], got {0}")]
    StakeFraction(f64),
    #[error("lookback_window must be >= 1")]
    LookbackWindow,
}

impl EngineConfig {
    pub fn new(initial_balance: f64, commission_rate: f64, slippage_rate: f64) -> Self {
        Self {
            initial_balance,
            commission_rate,
            slippage_rate,
            ..Self::default()
        }
    }

    /// Check every field against its allowed range. NaN fails every check.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.initial_balance > 0.0 && self.initial_balance.is_finite()) {
            return Err(ConfigError::InitialBalance(self.initial_balance));
        }
        if !(self.commission_rate >= 0.0 && self.commission_rate.is_finite()) {
            return Err(ConfigError::CommissionRate(self.commission_rate));
        }
        if !(self.slippage_rate >= 0.0 && self.slippage_rate < 1.0) {
            return Err(ConfigError::SlippageRate(self.slippage_rate));
        }
        if !(self.stake_fraction > 0.0 && self.stake_fraction <= 1.0) {
            return Err(ConfigError::StakeFraction(self.stake_fraction));
        }
        if self.lookback_window == 0 {
            return Err(ConfigError::LookbackWindow);
        }
        Ok(())
    }
}

/// Result of a complete backtest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    /// Seed point plus one point per processed bar.
    pub equity: Vec<EquityPoint>,
    /// Closed trades in close order, including the forced end-of-run close.
    pub trades: Vec<TradeRecord>,
    pub start_balance: f64,
    /// Balance after the forced close; may differ from the last equity point.
    pub end_balance: f64,
    pub bars_processed: usize,
    /// Bars skipped before the first decision.
    pub warmup_bars: usize,
    pub open_commissions: f64,
    pub close_commissions: f64,
}

impl RunResult {
    pub fn total_commission(&self) -> f64 {
        self.open_commissions + self.close_commissions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_config_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.initial_balance, 10_000.0);
        assert_eq!(config.commission_rate, 0.0005);
        assert_eq!(config.slippage_rate, 0.0002);
        assert_eq!(config.stake_fraction, 0.10);
        assert_eq!(config.lookback_window, 20);
        assert_eq!(config.slippage_basis, SlippageBasis::HeldPosition);
        assert_eq!(config.final_close, FinalClose::RawClose);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_out_of_range_values() {
        let base = EngineConfig::default();

        let c = EngineConfig { initial_balance: 0.0, ..base.clone() };
        assert_eq!(c.validate(), Err(ConfigError::InitialBalance(0.0)));

        let c = EngineConfig { commission_rate: -0.1, ..base.clone() };
        assert_eq!(c.validate(), Err(ConfigError::CommissionRate(-0.1)));

        let c = EngineConfig { slippage_rate: 1.0, ..base.clone() };
        assert_eq!(c.validate(), Err(ConfigError::SlippageRate(1.0)));

        let c = EngineConfig { stake_fraction: 1.5, ..base.clone() };
        assert_eq!(c.validate(), Err(ConfigError::StakeFraction(1.5)));

        let c = EngineConfig { stake_fraction: 0.0, ..base.clone() };
        assert_eq!(c.validate(), Err(ConfigError::StakeFraction(0.0)));

        let c = EngineConfig { lookback_window: 0, ..base };
        assert_eq!(c.validate(), Err(ConfigError::LookbackWindow));
    }

    #[test]
    fn validate_rejects_nan() {
        let c = EngineConfig {
            initial_balance: f64::NAN,
            ..EngineConfig::default()
        };
        assert!(matches!(c.validate(), Err(ConfigError::InitialBalance(_))));
    }

    #[test]
    fn full_stake_is_allowed() {
        let c = EngineConfig {
            stake_fraction: 1.0,
            ..EngineConfig::default()
        };
        assert!(c.validate().is_ok());
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let json = r#"{"initial_balance": 5000.0, "slippage_basis": "trade_direction"}"#;
        let c: EngineConfig = serde_json::from_str(json).unwrap();
        assert_eq!(c.initial_balance, 5000.0);
        assert_eq!(c.slippage_basis, SlippageBasis::TradeDirection);
        assert_eq!(c.lookback_window, 20);
    }
}
