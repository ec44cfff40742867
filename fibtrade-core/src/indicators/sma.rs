//! Simple Moving Average (SMA).
//!
//! Mean of the trailing `period` prices. Undefined until `period` prices exist.

/// SMA of the last `period` values of `prices`.
///
/// Returns `None` if fewer than `period` values are available or `period` is zero.
pub fn sma(prices: &[f64], period: usize) -> Option<f64> {
    if period == 0 || prices.len() < period {
        return None;
    }
    let window = &prices[prices.len() - period..];
    Some(window.iter().sum::<f64>() / period as f64)
}
