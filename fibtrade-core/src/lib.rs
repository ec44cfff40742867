//! fibtrade core: domain types, retracement signal, and the replay engine.
//!
//! This crate contains the heart of the backtester:
//! - Domain types (bars, positions, trade records, equity points)
//! - Moving-average crossover signal confirmed by Fibonacci retracement levels
//! - Position ledger and trade executor with commission and slippage accounting
//! - Equity recorder and the bar-by-bar replay loop
//! - Engine events delivered to an injected observer

pub mod domain;
pub mod engine;
pub mod indicators;
pub mod signal;
