//! Position ledger: holds the single current position.

use thiserror::Error;

use crate::domain::{Position, PositionSide};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    #[error("cannot open {requested} position: {held} position already open")]
    PositionAlreadyOpen {
        held: PositionSide,
        requested: PositionSide,
    },
    #[error("cannot open a position with non-positive or non-finite size {0}")]
    NonPositiveSize(f64),
    #[error("cannot open a position at entry price {0}: must be positive and finite")]
    InvalidEntryPrice(f64),
}

/// At most one position exists at any time. Transitions replace the whole value.
#[derive(Debug, Clone, Default)]
pub struct PositionLedger {
    position: Position,
}

impl PositionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    pub fn side(&self) -> Option<PositionSide> {
        self.position.side()
    }

    pub fn is_flat(&self) -> bool {
        self.position.is_flat()
    }

    /// Flat → Open. Fails if a position is already open, or if `entry_price`
    /// or `size` is not a positive finite number.
    pub fn open(&mut self, side: PositionSide, entry_price: f64, size: f64) -> Result<(), LedgerError> {
        if !(entry_price > 0.0 && entry_price.is_finite()) {
            return Err(LedgerError::InvalidEntryPrice(entry_price));
        }
        if !(size > 0.0 && size.is_finite()) {
            return Err(LedgerError::NonPositiveSize(size));
        }
        if let Position::Open { side: held, .. } = self.position {
            return Err(LedgerError::PositionAlreadyOpen {
                held,
                requested: side,
            });
        }
        self.position = Position::Open {
            side,
            entry_price,
            size,
        };
        Ok(())
    }

    /// Open → Flat, returning the position that was held. `None` when already flat.
    pub fn take(&mut self) -> Option<(PositionSide, f64, f64)> {
        match std::mem::take(&mut self.position) {
            Position::Flat => None,
            Position::Open {
                side,
                entry_price,
                size,
            } => Some((side, entry_price, size)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_then_take() {
        let mut ledger = PositionLedger::new();
        assert!(ledger.is_flat());

        ledger.open(PositionSide::Short, 50.0, 4.0).unwrap();
        assert_eq!(ledger.side(), Some(PositionSide::Short));

        assert_eq!(ledger.take(), Some((PositionSide::Short, 50.0, 4.0)));
        assert!(ledger.is_flat());
        assert_eq!(ledger.take(), None);
    }

    #[test]
    fn zero_size_is_rejected() {
        let mut ledger = PositionLedger::new();
        assert_eq!(
            ledger.open(PositionSide::Long, 100.0, 0.0),
            Err(LedgerError::NonPositiveSize(0.0))
        );
        assert!(ledger.is_flat());
    }

    #[test]
    fn zero_or_infinite_entry_price_is_rejected() {
        let mut ledger = PositionLedger::new();
        assert_eq!(
            ledger.open(PositionSide::Long, 0.0, f64::INFINITY),
            Err(LedgerError::InvalidEntryPrice(0.0))
        );
        assert_eq!(
            ledger.open(PositionSide::Short, f64::INFINITY, 1.0),
            Err(LedgerError::InvalidEntryPrice(f64::INFINITY))
        );
        assert!(matches!(
            ledger.open(PositionSide::Long, f64::NAN, 1.0),
            Err(LedgerError::InvalidEntryPrice(_))
        ));
        assert!(ledger.is_flat());
    }

    #[test]
    fn infinite_size_is_rejected() {
        let mut ledger = PositionLedger::new();
        assert_eq!(
            ledger.open(PositionSide::Long, 100.0, f64::INFINITY),
            Err(LedgerError::NonPositiveSize(f64::INFINITY))
        );
        assert!(ledger.is_flat());
    }

    #[test]
    fn double_open_is_rejected() {
        let mut ledger = PositionLedger::new();
        ledger.open(PositionSide::Long, 100.0, 1.0).unwrap();
        let err = ledger.open(PositionSide::Short, 90.0, 1.0).unwrap_err();
        assert_eq!(
            err,
            LedgerError::PositionAlreadyOpen {
                held: PositionSide::Long,
                requested: PositionSide::Short,
            }
        );
        // the original position is untouched
        assert_eq!(
            *ledger.position(),
            Position::Open {
                side: PositionSide::Long,
                entry_price: 100.0,
                size: 1.0,
            }
        );
    }
}
