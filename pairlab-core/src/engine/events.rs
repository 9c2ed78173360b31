//! Typed engine events and the observers that receive them.
//!
//! The engine never logs directly. Callers pass an [`EngineObserver`] and
//! route events wherever they like: drop them, keep them for assertions, or
//! forward them to `tracing`.

use crate::domain::{PairKey, Position, Trade, TradeId};
use crate::relationship::RelationshipFailure;
use crate::signal::SignalDecision;
use chrono::NaiveDate;
use tracing::{debug, info, warn};

/// Why a pair was not traded on a date.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// Fewer trailing observations than the lookback.
    InsufficientHistory { available: usize, required: usize },
    /// The test ran and did not reject a unit root.
    NotCointegrated { p_value: f64 },
    /// The test could not be computed on this window.
    Untestable(RelationshipFailure),
    /// The window spread has no width; no deviation can be scored.
    ZeroVarianceSpread,
    /// Sizing produced no notional for an actionable entry.
    NoCapital,
}

impl SkipReason {
    pub fn label(&self) -> &'static str {
        match self {
            SkipReason::InsufficientHistory { .. } => "insufficient_history",
            SkipReason::NotCointegrated { .. } => "not_cointegrated",
            SkipReason::Untestable(_) => "untestable",
            SkipReason::ZeroVarianceSpread => "zero_variance_spread",
            SkipReason::NoCapital => "no_capital",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    RunStarted {
        dates: usize,
        pairs: usize,
        starting_capital: f64,
    },
    PairSkipped {
        date: NaiveDate,
        pair: PairKey,
        reason: SkipReason,
    },
    SignalEvaluated {
        date: NaiveDate,
        pair: PairKey,
        decision: SignalDecision,
        hedge_ratio: f64,
        spread: f64,
        p_value: f64,
    },
    PositionOpened {
        position: Position,
        capital_base: f64,
    },
    /// Entry spread was exactly zero; the spread change was taken as 0.
    ZeroEntrySpread {
        date: NaiveDate,
        pair: PairKey,
        trade_id: TradeId,
    },
    TradeClosed {
        trade: Trade,
        capital_after: f64,
    },
    DayCompleted {
        date: NaiveDate,
        capital: f64,
        open_positions: usize,
    },
    RunFinished {
        trades: usize,
        open_positions: usize,
        final_capital: f64,
    },
}

/// Receiver for engine events.
pub trait EngineObserver {
    fn on_event(&mut self, event: &EngineEvent);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl EngineObserver for NullObserver {
    fn on_event(&mut self, _event: &EngineEvent) {}
}

/// Keeps every event in order.
#[derive(Debug, Default, Clone)]
pub struct RecordingObserver {
    pub events: Vec<EngineEvent>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Skip reasons recorded for one pair, in date order.
    pub fn skips_for<'a>(&'a self, pair: &'a PairKey) -> impl Iterator<Item = &'a SkipReason> + 'a {
        self.events.iter().filter_map(move |e| match e {
            EngineEvent::PairSkipped { pair: p, reason, .. } if p == pair => Some(reason),
            _ => None,
        })
    }

    pub fn count<F: Fn(&EngineEvent) -> bool>(&self, pred: F) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl EngineObserver for RecordingObserver {
    fn on_event(&mut self, event: &EngineEvent) {
        self.events.push(event.clone());
    }
}

/// Forwards events to `tracing` under the `pairlab::engine` target.
///
/// Skips and per-day samples go out at `debug`, position changes at `info`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl EngineObserver for TracingObserver {
    fn on_event(&mut self, event: &EngineEvent) {
        match event {
            EngineEvent::RunStarted {
                dates,
                pairs,
                starting_capital,
            } => info!(
                target: "pairlab::engine",
                dates,
                pairs,
                starting_capital,
                "simulation started"
            ),
            EngineEvent::PairSkipped { date, pair, reason } => debug!(
                target: "pairlab::engine",
                %date,
                %pair,
                reason = reason.label(),
                detail = ?reason,
                "pair skipped"
            ),
            EngineEvent::SignalEvaluated {
                date,
                pair,
                decision,
                hedge_ratio,
                spread,
                p_value,
            } => debug!(
                target: "pairlab::engine",
                %date,
                %pair,
                signal = %decision.signal,
                deviation = decision.deviation,
                confidence = decision.confidence,
                hedge_ratio,
                spread,
                p_value,
                "signal evaluated"
            ),
            EngineEvent::PositionOpened {
                position,
                capital_base,
            } => info!(
                target: "pairlab::engine",
                trade_id = %position.id,
                date = %position.entry_date,
                pair = %position.pair,
                side = %position.side,
                entry_spread = position.entry_spread,
                notional = position.notional,
                hedge_ratio = position.hedge_ratio,
                capital_base,
                "position opened"
            ),
            EngineEvent::ZeroEntrySpread {
                date,
                pair,
                trade_id,
            } => warn!(
                target: "pairlab::engine",
                %date,
                %pair,
                %trade_id,
                "entry spread was zero, spread change taken as 0"
            ),
            EngineEvent::TradeClosed {
                trade,
                capital_after,
            } => info!(
                target: "pairlab::engine",
                trade_id = %trade.id,
                date = %trade.exit_date,
                pair = %trade.pair,
                side = %trade.side,
                net_pnl = trade.net_pnl,
                return_pct = trade.return_pct,
                days_held = trade.days_held,
                capital_after,
                "trade closed"
            ),
            EngineEvent::DayCompleted {
                date,
                capital,
                open_positions,
            } => debug!(
                target: "pairlab::engine",
                %date,
                capital,
                open_positions,
                "day completed"
            ),
            EngineEvent::RunFinished {
                trades,
                open_positions,
                final_capital,
            } => info!(
                target: "pairlab::engine",
                trades,
                open_positions,
                final_capital,
                "simulation finished"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn skip(pair: &PairKey, reason: SkipReason) -> EngineEvent {
        EngineEvent::PairSkipped {
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            pair: pair.clone(),
            reason,
        }
    }

    #[test]
    fn recording_observer_keeps_order() {
        let ab = PairKey::new("A", "B");
        let ac = PairKey::new("A", "C");
        let mut obs = RecordingObserver::new();
        obs.on_event(&skip(&ab, SkipReason::ZeroVarianceSpread));
        obs.on_event(&skip(&ac, SkipReason::NoCapital));
        obs.on_event(&skip(
            &ab,
            SkipReason::NotCointegrated { p_value: 0.4 },
        ));
        let reasons: Vec<&str> = obs.skips_for(&ab).map(|r| r.label()).collect();
        assert_eq!(reasons, vec!["zero_variance_spread", "not_cointegrated"]);
        assert_eq!(
            obs.count(|e| matches!(e, EngineEvent::PairSkipped { .. })),
            3
        );
    }

    #[test]
    fn tracing_observer_accepts_every_event_without_subscriber() {
        let mut obs = TracingObserver;
        obs.on_event(&skip(
            &PairKey::new("A", "B"),
            SkipReason::InsufficientHistory {
                available: 10,
                required: 252,
            },
        ));
        obs.on_event(&EngineEvent::RunFinished {
            trades: 0,
            open_positions: 0,
            final_capital: 1.0,
        });
    }
}
