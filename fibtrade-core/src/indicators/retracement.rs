//! Fibonacci retracement levels over a high/low range.
//!
//! Each level is `high - ratio * (high - low)`, so 0% is the high and 100% the low.

use serde::{Deserialize, Serialize};

/// A retracement ratio used to pick a support/resistance reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RetracementRatio {
    #[serde(rename = "0.0%")]
    Zero,
    #[serde(rename = "23.6%")]
    R236,
    #[serde(rename = "38.2%")]
    R382,
    #[serde(rename = "50.0%")]
    R500,
    #[serde(rename = "61.8%")]
    R618,
    #[serde(rename = "100.0%")]
    Full,
}

impl RetracementRatio {
    pub const ALL: [RetracementRatio; 6] = [
        RetracementRatio::Zero,
        RetracementRatio::R236,
        RetracementRatio::R382,
        RetracementRatio::R500,
        RetracementRatio::R618,
        RetracementRatio::Full,
    ];

    pub fn fraction(&self) -> f64 {
        match self {
            RetracementRatio::Zero => 0.0,
            RetracementRatio::R236 => 0.236,
            RetracementRatio::R382 => 0.382,
            RetracementRatio::R500 => 0.5,
            RetracementRatio::R618 => 0.618,
            RetracementRatio::Full => 1.0,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RetracementRatio::Zero => "0.0%",
            RetracementRatio::R236 => "23.6%",
            RetracementRatio::R382 => "38.2%",
            RetracementRatio::R500 => "50.0%",
            RetracementRatio::R618 => "61.8%",
            RetracementRatio::Full => "100.0%",
        }
    }
}

/// Retracement levels computed from one high/low range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetracementLevels {
    pub high: f64,
    pub low: f64,
}

impl RetracementLevels {
    pub fn from_range(high: f64, low: f64) -> Self {
        Self { high, low }
    }

    /// Price at the given ratio. The endpoints are returned exactly.
    pub fn level(&self, ratio: RetracementRatio) -> f64 {
        match ratio {
            RetracementRatio::Zero => self.high,
            RetracementRatio::Full => self.low,
            other => self.high - other.fraction() * (self.high - self.low),
        }
    }

    /// All levels in ascending ratio order, labelled.
    pub fn labelled(&self) -> Vec<(&'static str, f64)> {
        RetracementRatio::ALL
            .iter()
            .map(|r| (r.label(), self.level(*r)))
            .collect()
    }
}

/// Whether `price` lies within `tolerance` (as a fraction of `target`) of `target`.
///
/// A zero target is never "near": the relative distance is undefined.
pub fn near_level(target: f64, price: f64, tolerance: f64) -> bool {
    if target == 0.0 {
        return false;
    }
    (price - target).abs() / target <= tolerance
}
