//! Trade executor: applies signals to the position ledger and the account.
//!
//! The executor owns the balance. It changes at exactly two moments: the
//! opening commission is debited when a position opens, and the net PnL
//! (gross PnL less the closing commission) is credited when it closes.

use chrono::{DateTime, Utc};

use super::cost_model::CostModel;
use super::ledger::{LedgerError, PositionLedger};
use super::observer::{EngineEvent, EngineObserver};
use crate::domain::{Position, PositionSide, TradeRecord};
use crate::signal::Signal;

#[derive(Debug, Clone)]
pub struct TradeExecutor {
    balance: f64,
    stake_fraction: f64,
    cost: CostModel,
    ledger: PositionLedger,
    trades: Vec<TradeRecord>,
    open_commissions: f64,
    close_commissions: f64,
}

impl TradeExecutor {
    pub fn new(initial_balance: f64, stake_fraction: f64, cost: CostModel) -> Self {
        Self {
            balance: initial_balance,
            stake_fraction,
            cost,
            ledger: PositionLedger::new(),
            trades: Vec::new(),
            open_commissions: 0.0,
            close_commissions: 0.0,
        }
    }

    pub fn balance(&self) -> f64 {
        self.balance
    }

    pub fn position(&self) -> &Position {
        self.ledger.position()
    }

    pub fn side(&self) -> Option<PositionSide> {
        self.ledger.side()
    }

    #[cfg(test)]
    pub(crate) fn trades(&self) -> &[TradeRecord] {
        &self.trades
    }

    pub fn open_commissions(&self) -> f64 {
        self.open_commissions
    }

    pub fn close_commissions(&self) -> f64 {
        self.close_commissions
    }

    pub fn into_trades(self) -> Vec<TradeRecord> {
        self.trades
    }

    /// Open a position sized at `stake_fraction` of the current balance.
    ///
    /// Requires a flat ledger; the caller closes first.
    pub fn open(
        &mut self,
        side: PositionSide,
        fill_price: f64,
        timestamp: DateTime<Utc>,
        observer: &mut dyn EngineObserver,
    ) -> Result<(), LedgerError> {
        let stake = self.balance * self.stake_fraction;
        let size = stake / fill_price;
        self.ledger.open(side, fill_price, size)?;

        let commission = self.cost.compute_commission(fill_price, size);
        self.balance -= commission;
        self.open_commissions += commission;

        observer.on_event(&EngineEvent::Opened {
            timestamp,
            side,
            price: fill_price,
            size,
            commission,
            balance: self.balance,
        });
        Ok(())
    }

    /// Close the open position at `fill_price`. No-op when flat.
    pub fn close(
        &mut self,
        fill_price: f64,
        timestamp: DateTime<Utc>,
        observer: &mut dyn EngineObserver,
    ) -> Option<TradeRecord> {
        let (side, entry_price, size) = self.ledger.take()?;

        let gross_pnl = (fill_price - entry_price) * size * side.direction();
        let commission = self.cost.compute_commission(fill_price, size);
        let net_pnl = gross_pnl - commission;
        self.balance += net_pnl;
        self.close_commissions += commission;

        let trade = TradeRecord {
            timestamp,
            side,
            entry_price,
            exit_price: fill_price,
            net_pnl,
        };
        self.trades.push(trade.clone());

        observer.on_event(&EngineEvent::Closed {
            trade: trade.clone(),
            commission,
            balance: self.balance,
        });
        Some(trade)
    }

    /// Per-bar policy: a BUY moves the ledger to Long and a SELL to Short,
    /// closing any opposing position first. HOLD, or a signal matching the
    /// held side, does nothing. A ruined account (balance <= 0) still closes
    /// but no longer opens.
    pub fn decide(
        &mut self,
        signal: Signal,
        fill_price: f64,
        timestamp: DateTime<Utc>,
        observer: &mut dyn EngineObserver,
    ) -> Result<(), LedgerError> {
        let target = match signal {
            Signal::Buy => PositionSide::Long,
            Signal::Sell => PositionSide::Short,
            Signal::Hold => return Ok(()),
        };
        if self.side() == Some(target) {
            return Ok(());
        }
        self.close(fill_price, timestamp, observer);
        if self.balance <= 0.0 {
            return Ok(());
        }
        self.open(target, fill_price, timestamp, observer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::cost_model::SlippageBasis;
    use crate::engine::observer::{EventLog, NullObserver};
    use chrono::TimeZone;

    fn ts(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap()
    }

    fn executor(commission_rate: f64) -> TradeExecutor {
        TradeExecutor::new(
            10_000.0,
            0.1,
            CostModel::new(commission_rate, 0.0, SlippageBasis::HeldPosition),
        )
    }

    #[test]
    fn open_long_charges_commission() {
        let mut ex = executor(0.0005);
        ex.open(PositionSide::Long, 100.0, ts(1), &mut NullObserver).unwrap();

        // stake 1000 / 100 = 10 units, fee 100 * 10 * 0.0005 = 0.5
        assert_eq!(
            *ex.position(),
            Position::Open {
                side: PositionSide::Long,
                entry_price: 100.0,
                size: 10.0,
            }
        );
        assert!((ex.balance() - 9999.5).abs() < 1e-9);
        assert!((ex.open_commissions() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn close_long_credits_net_pnl() {
        let mut ex = executor(0.0005);
        ex.open(PositionSide::Long, 100.0, ts(1), &mut NullObserver).unwrap();
        let trade = ex.close(110.0, ts(2), &mut NullObserver).unwrap();

        // gross 100, fee 110 * 10 * 0.0005 = 0.55
        assert_eq!(trade.side, PositionSide::Long);
        assert_eq!(trade.entry_price, 100.0);
        assert_eq!(trade.exit_price, 110.0);
        assert!((trade.net_pnl - 99.45).abs() < 1e-9);
        assert!((ex.balance() - 10_098.95).abs() < 1e-9);
        assert!(ex.position().is_flat());
        assert_eq!(ex.trades().len(), 1);
    }

    #[test]
    fn close_short_profits_from_decline() {
        let mut ex = executor(0.0);
        ex.open(PositionSide::Short, 100.0, ts(1), &mut NullObserver).unwrap();
        let trade = ex.close(90.0, ts(2), &mut NullObserver).unwrap();
        assert!((trade.net_pnl - 100.0).abs() < 1e-9);
        assert!((ex.balance() - 10_100.0).abs() < 1e-9);
    }

    #[test]
    fn close_when_flat_is_noop() {
        let mut ex = executor(0.0005);
        let mut log = EventLog::new();
        assert!(ex.close(100.0, ts(1), &mut log).is_none());
        assert_eq!(ex.balance(), 10_000.0);
        assert!(log.events.is_empty());
    }

    #[test]
    fn open_while_open_is_rejected() {
        let mut ex = executor(0.0005);
        ex.open(PositionSide::Long, 100.0, ts(1), &mut NullObserver).unwrap();
        let before = ex.balance();
        assert!(ex.open(PositionSide::Short, 100.0, ts(2), &mut NullObserver).is_err());
        assert_eq!(ex.balance(), before);
    }

    #[test]
    fn reversal_closes_then_opens() {
        let mut ex = executor(0.0);
        let mut log = EventLog::new();
        ex.decide(Signal::Buy, 100.0, ts(1), &mut log).unwrap();
        ex.decide(Signal::Sell, 110.0, ts(2), &mut log).unwrap();

        assert_eq!(ex.side(), Some(PositionSide::Short));
        assert_eq!(ex.trades().len(), 1);
        assert!(matches!(log.events[0], EngineEvent::Opened { side: PositionSide::Long, .. }));
        assert!(matches!(log.events[1], EngineEvent::Closed { .. }));
        assert!(matches!(log.events[2], EngineEvent::Opened { side: PositionSide::Short, .. }));

        // the new stake is sized off the balance after the close
        if let Position::Open { size, .. } = *ex.position() {
            assert!((size - 10_100.0 * 0.1 / 110.0).abs() < 1e-9);
        } else {
            panic!("expected an open short");
        }
    }

    #[test]
    fn ruined_account_stops_opening() {
        let mut ex = TradeExecutor::new(
            100.0,
            1.0,
            CostModel::new(0.0, 0.0, SlippageBasis::HeldPosition),
        );
        let mut log = EventLog::new();
        ex.decide(Signal::Sell, 10.0, ts(1), &mut log).unwrap();
        // short 10 units, price triples: loss of 200 on a balance of 100
        ex.decide(Signal::Buy, 30.0, ts(2), &mut log).unwrap();
        assert!(ex.balance() < 0.0);
        assert!(ex.position().is_flat());
        assert_eq!(log.opens(), 1);
        assert_eq!(log.closes(), 1);
    }

    #[test]
    fn repeated_signal_is_ignored() {
        let mut ex = executor(0.0005);
        let mut log = EventLog::new();
        ex.decide(Signal::Buy, 100.0, ts(1), &mut log).unwrap();
        ex.decide(Signal::Buy, 105.0, ts(2), &mut log).unwrap();
        ex.decide(Signal::Hold, 107.0, ts(3), &mut log).unwrap();
        assert_eq!(log.opens(), 1);
        assert_eq!(log.closes(), 0);
        assert!(ex.trades().is_empty());
    }
}
