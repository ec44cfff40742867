//! Signal generation: turns price history into a directional decision.
//!
//! Signals are position-agnostic: they receive the close history and the two
//! range levels of the lookback window, never the ledger or the balance.

pub mod fibonacci;

pub use fibonacci::{FibonacciCrossover, SignalConfig};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Decision emitted for one bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Signal {
    Buy,
    Sell,
    Hold,
}

impl Signal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Signal::Buy => "BUY",
            Signal::Sell => "SELL",
            Signal::Hold => "HOLD",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Trait for signal generators.
///
/// # Contract
/// `closes` holds every close up to and including the bar being decided.
/// `high` and `low` are the extremes of the lookback window that ends just
/// before that bar. Implementations must be pure: the same inputs always
/// yield the same signal.
pub trait SignalGenerator: Send + Sync {
    /// Human-readable name (e.g., "fibonacci_crossover").
    fn name(&self) -> &str;

    fn evaluate(&self, closes: &[f64], high: f64, low: f64) -> Signal;
}

/// Any pure closure can stand in as a signal generator.
impl<F> SignalGenerator for F
where
    F: Fn(&[f64], f64, f64) -> Signal + Send + Sync,
{
    fn name(&self) -> &str {
        "custom"
    }

    fn evaluate(&self, closes: &[f64], high: f64, low: f64) -> Signal {
        self(closes, high, low)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signal_display_pads() {
        assert_eq!(format!("{:<4}", Signal::Buy), "BUY ");
        assert_eq!(Signal::Sell.to_string(), "SELL");
    }

    #[test]
    fn closure_is_a_generator() {
        let always_sell = |_: &[f64], _: f64, _: f64| Signal::Sell;
        assert_eq!(always_sell.evaluate(&[1.0], 2.0, 0.5), Signal::Sell);
        assert_eq!(SignalGenerator::name(&always_sell), "custom");
    }

    #[test]
    fn signal_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&Signal::Hold).unwrap(), "\"HOLD\"");
    }
}
