//! Cost model: slippage and commission calculation.
//!
//! One fill happens per bar at a single synthetic price: the bar close adjusted
//! by the slippage rate. Which way the adjustment goes depends on the
//! [`SlippageBasis`]. Commission is a fraction of fill notional, charged on
//! both the opening and the closing fill.

use serde::{Deserialize, Serialize};

use crate::domain::PositionSide;
use crate::signal::Signal;

/// Which side decides the direction of the slippage adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlippageBasis {
    /// Adjust by the position held before the bar: up while long, down while
    /// short, unchanged while flat. Entry fills from flat carry no slippage.
    #[default]
    HeldPosition,
    /// Adjust by the direction of the fill the signal implies: BUY fills pay
    /// up, SELL fills receive less, HOLD is unchanged.
    TradeDirection,
}

/// Price used for the forced close at the end of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalClose {
    /// The last bar's close, without slippage.
    #[default]
    RawClose,
    /// The last bar's close with the exit slippage of the configured basis.
    Slipped,
}

/// Execution friction for the replay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostModel {
    pub commission_rate: f64,
    pub slippage_rate: f64,
    pub basis: SlippageBasis,
}

impl CostModel {
    pub fn new(commission_rate: f64, slippage_rate: f64, basis: SlippageBasis) -> Self {
        Self {
            commission_rate,
            slippage_rate,
            basis,
        }
    }

    #[cfg(test)]
    pub(crate) fn frictionless() -> Self {
        Self::new(0.0, 0.0, SlippageBasis::HeldPosition)
    }

    /// Fill price for a bar that closed at `close`, given the position held
    /// before the bar and the signal being acted on.
    pub fn fill_price(&self, close: f64, held: Option<PositionSide>, signal: Signal) -> f64 {
        let s = self.slippage_rate;
        match self.basis {
            SlippageBasis::HeldPosition => match held {
                Some(PositionSide::Long) => close * (1.0 + s),
                Some(PositionSide::Short) => close * (1.0 - s),
                None => close,
            },
            SlippageBasis::TradeDirection => match signal {
                Signal::Buy => close * (1.0 + s),
                Signal::Sell => close * (1.0 - s),
                Signal::Hold => close,
            },
        }
    }

    /// Price for exiting `held` at `close` outside the signal path (forced close).
    pub fn exit_price(&self, close: f64, held: PositionSide) -> f64 {
        match self.basis {
            SlippageBasis::HeldPosition => self.fill_price(close, Some(held), Signal::Hold),
            SlippageBasis::TradeDirection => {
                let exit_signal = match held {
                    PositionSide::Long => Signal::Sell,
                    PositionSide::Short => Signal::Buy,
                };
                self.fill_price(close, Some(held), exit_signal)
            }
        }
    }

    /// `commission = fill_price * size * commission_rate`
    pub fn compute_commission(&self, fill_price: f64, size: f64) -> f64 {
        fill_price * size * self.commission_rate
    }
}
