//! Moving-average crossover confirmed by proximity to a retracement level.
//!
//! BUY when the short SMA is above the long SMA and the last close sits near the
//! buy level (61.8% by default). SELL when the short SMA is below the long SMA
//! and the last close sits near the sell level (38.2% by default). HOLD otherwise,
//! including whenever either SMA is still undefined.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::trace;

use super::{Signal, SignalGenerator};
use crate::indicators::{near_level, sma, RetracementLevels, RetracementRatio};

/// Parameters of the retracement crossover signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalConfig {
    pub short_period: usize,
    pub long_period: usize,
    /// Maximum relative distance from a level to count as "near".
    pub tolerance: f64,
    pub buy_level: RetracementRatio,
    pub sell_level: RetracementRatio,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            short_period: 5,
            long_period: 10,
            tolerance: 0.01,
            buy_level: RetracementRatio::R618,
            sell_level: RetracementRatio::R382,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SignalConfigError {
    #[error("short_period must be >= 1")]
    ZeroShortPeriod,
    #[error("short_period ({short}) must be less than long_period ({long})")]
    PeriodOrder { short: usize, long: usize },
    #[error("tolerance must be a non-negative number, got {0}")]
    InvalidTolerance(f64),
}

impl SignalConfig {
    pub fn validate(&self) -> Result<(), SignalConfigError> {
        if self.short_period == 0 {
            return Err(SignalConfigError::ZeroShortPeriod);
        }
        if self.short_period >= self.long_period {
            return Err(SignalConfigError::PeriodOrder {
                short: self.short_period,
                long: self.long_period,
            });
        }
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(SignalConfigError::InvalidTolerance(self.tolerance));
        }
        Ok(())
    }
}

/// The default signal generator.
#[derive(Debug, Clone)]
pub struct FibonacciCrossover {
    config: SignalConfig,
}

impl FibonacciCrossover {
    pub fn new(config: SignalConfig) -> Result<Self, SignalConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn default_params() -> Self {
        Self {
            config: SignalConfig::default(),
        }
    }

    pub fn config(&self) -> &SignalConfig {
        &self.config
    }
}

impl SignalGenerator for FibonacciCrossover {
    fn name(&self) -> &str {
        "fibonacci_crossover"
    }

    fn evaluate(&self, closes: &[f64], high: f64, low: f64) -> Signal {
        let (Some(short_ma), Some(long_ma)) = (
            sma(closes, self.config.short_period),
            sma(closes, self.config.long_period),
        ) else {
            return Signal::Hold;
        };
        // sma() guarantees at least one close here.
        let Some(&price) = closes.last() else {
            return Signal::Hold;
        };

        let levels = RetracementLevels::from_range(high, low);
        let buy_level = levels.level(self.config.buy_level);
        let sell_level = levels.level(self.config.sell_level);
        trace!(short_ma, long_ma, price, buy_level, sell_level, "signal inputs");

        if short_ma > long_ma && near_level(buy_level, price, self.config.tolerance) {
            Signal::Buy
        } else if short_ma < long_ma && near_level(sell_level, price, self.config.tolerance) {
            Signal::Sell
        } else {
            Signal::Hold
        }
    }
}
