//! Engine events and the observers that receive them.
//!
//! The engine never formats log output. It reports what happened through an
//! injected [`EngineObserver`]; where those events end up is the caller's choice.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use crate::domain::{EquityPoint, PositionSide, TradeRecord};
use crate::signal::Signal;

/// Something the engine did, in the order it did it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    SignalEvaluated {
        timestamp: DateTime<Utc>,
        signal: Signal,
        close: f64,
        fill_price: f64,
    },
    Opened {
        timestamp: DateTime<Utc>,
        side: PositionSide,
        price: f64,
        size: f64,
        commission: f64,
        balance: f64,
    },
    Closed {
        trade: TradeRecord,
        commission: f64,
        balance: f64,
    },
    /// Emitted just before the end-of-run close of a still-open position.
    ForcedClose {
        timestamp: DateTime<Utc>,
        price: f64,
    },
    Sampled(EquityPoint),
}

/// Receives engine events synchronously, in emission order.
pub trait EngineObserver {
    fn on_event(&mut self, event: &EngineEvent);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl EngineObserver for NullObserver {
    fn on_event(&mut self, _event: &EngineEvent) {}
}

/// Keeps every event in memory, for audits and tests.
#[derive(Debug, Default, Clone)]
pub struct EventLog {
    pub events: Vec<EngineEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sum of commissions charged at open.
    pub fn open_commissions(&self) -> f64 {
        self.events
            .iter()
            .filter_map(|e| match e {
                EngineEvent::Opened { commission, .. } => Some(*commission),
                _ => None,
            })
            .sum()
    }

    pub fn opens(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, EngineEvent::Opened { .. }))
            .count()
    }

    pub fn closes(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, EngineEvent::Closed { .. }))
            .count()
    }

    #[cfg(test)]
    pub(crate) fn samples(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, EngineEvent::Sampled(_)))
            .count()
    }
}

impl EngineObserver for EventLog {
    fn on_event(&mut self, event: &EngineEvent) {
        self.events.push(event.clone());
    }
}

/// Forwards events to `tracing` with structured fields.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl EngineObserver for TracingObserver {
    fn on_event(&mut self, event: &EngineEvent) {
        match event {
            EngineEvent::SignalEvaluated {
                timestamp,
                signal,
                close,
                fill_price,
            } => debug!(
                %timestamp,
                %signal,
                close = *close,
                fill_price = *fill_price,
                "signal"
            ),
            EngineEvent::Opened {
                timestamp,
                side,
                price,
                size,
                commission,
                balance,
            } => info!(
                %timestamp,
                %side,
                price = *price,
                size = *size,
                fee = *commission,
                balance = *balance,
                "open"
            ),
            EngineEvent::Closed {
                trade,
                commission,
                balance,
            } => info!(
                timestamp = %trade.timestamp,
                side = %trade.side,
                price = trade.exit_price,
                pnl = trade.net_pnl,
                fee = *commission,
                balance = *balance,
                "close"
            ),
            EngineEvent::ForcedClose { timestamp, price } => info!(
                %timestamp,
                price = *price,
                "forcing end-of-run close"
            ),
            EngineEvent::Sampled(point) => trace!(
                timestamp = %point.timestamp,
                balance = point.balance,
                "equity"
            ),
        }
    }
}
