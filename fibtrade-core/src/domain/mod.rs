//! Domain types for the backtest engine.

pub mod bar;
pub mod equity;
pub mod position;
pub mod trade;

pub use bar::Bar;
pub use equity::EquityPoint;
pub use position::{Position, PositionSide};
pub use trade::TradeRecord;
