//! Mutable engine state and the run result.

use crate::domain::{EquityPoint, PairKey, Position, Trade, TradeIdGen};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Counters collected while the loop runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    /// Pair-date combinations that reached the signal step.
    pub evaluations: usize,
    pub skipped_insufficient_history: usize,
    pub skipped_not_cointegrated: usize,
    pub skipped_untestable: usize,
    pub skipped_zero_variance: usize,
    pub skipped_no_capital: usize,
    pub buy_signals: usize,
    pub sell_signals: usize,
    pub close_signals: usize,
    pub zero_entry_spreads: usize,
}

/// State that evolves date by date. Only the engine mutates it.
pub struct EngineState {
    pub capital: f64,
    pub positions: HashMap<PairKey, Position>,
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<EquityPoint>,
    pub id_gen: TradeIdGen,
    pub stats: RunStats,
}

impl EngineState {
    pub fn new(starting_capital: f64, expected_dates: usize) -> Self {
        Self {
            capital: starting_capital,
            positions: HashMap::new(),
            trades: Vec::new(),
            equity_curve: Vec::with_capacity(expected_dates),
            id_gen: TradeIdGen::default(),
            stats: RunStats::default(),
        }
    }

    pub fn has_position(&self, pair: &PairKey) -> bool {
        self.positions.contains_key(pair)
    }

    /// Append the end-of-day sample.
    pub fn record_equity(&mut self, date: NaiveDate) {
        debug_assert!(
            self.equity_curve.last().map_or(true, |p| p.date < date),
            "equity curve must be strictly increasing in date"
        );
        self.equity_curve.push(EquityPoint {
            date,
            capital: self.capital,
        });
    }
}

/// Everything a simulation produces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationResult {
    pub pairs: Vec<PairKey>,
    pub starting_capital: f64,
    pub final_capital: f64,
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<EquityPoint>,
    /// Positions still open after the last date, in pair enumeration order.
    pub open_positions: Vec<Position>,
    pub stats: RunStats,
}

impl SimulationResult {
    pub fn dates_simulated(&self) -> usize {
        self.equity_curve.len()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.equity_curve.first().map(|p| p.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.equity_curve.last().map(|p| p.date)
    }
}
