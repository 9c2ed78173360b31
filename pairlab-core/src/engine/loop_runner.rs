//! Date-by-date simulation loop.
//!
//! Per date, per pair (enumeration order):
//! 1. History check against the lookback
//! 2. Relationship test on the trailing window ending at the date
//! 3. Deviation of today's spread from the window baseline
//! 4. Signal and state transition
//!
//! Then one equity sample for the date.

use crate::data::align::AlignedCloses;
use crate::domain::{all_pairs, PairKey, Position, PositionSide};
use crate::relationship::{compute_spread, zscore, RelationshipFailure, RelationshipTester};
use crate::signal::{Signal, SignalGenerator};
use chrono::NaiveDate;
use std::collections::HashSet;

use super::accounting::close_position;
use super::config::{CapitalAllocation, EngineConfig, EngineError};
use super::events::{EngineEvent, EngineObserver, SkipReason};
use super::state::{EngineState, SimulationResult};

/// Outcome of evaluating one pair on one date, before any state change.
enum Evaluation {
    Skip(SkipReason),
    Ready {
        hedge_ratio: f64,
        spread: f64,
        deviation: f64,
        p_value: f64,
    },
}

/// A validated, ready-to-run simulation.
///
/// Owns its tester and signal generator by value, so neither can change
/// while a run is in progress.
#[derive(Debug, Clone)]
pub struct SimulationEngine {
    config: EngineConfig,
    tester: RelationshipTester,
    signals: SignalGenerator,
}

impl SimulationEngine {
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let signals = SignalGenerator::new(config.entry_threshold, config.exit_threshold)?;
        let tester = RelationshipTester::new(config.significance, config.max_lag);
        Ok(Self {
            config,
            tester,
            signals,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run over every date in `data`, for every pair of `data.symbols`.
    pub fn run(
        &self,
        data: &AlignedCloses,
        observer: &mut dyn EngineObserver,
    ) -> Result<SimulationResult, EngineError> {
        if data.symbols.len() < 2 {
            return Err(EngineError::TooFewAssets {
                count: data.symbols.len(),
            });
        }
        let mut seen: HashSet<&String> = HashSet::new();
        for s in &data.symbols {
            if !seen.insert(s) {
                return Err(EngineError::DuplicateAsset(s.clone()));
            }
        }
        if data.is_empty() {
            return Err(EngineError::NoCommonDates);
        }
        let pairs = all_pairs(&data.symbols);
        let mut legs: Vec<(&[f64], &[f64])> = Vec::with_capacity(pairs.len());
        for pair in &pairs {
            let column = |symbol: &String| {
                data.closes_for(symbol)
                    .ok_or_else(|| EngineError::MissingSeries {
                        symbol: symbol.clone(),
                    })
            };
            legs.push((column(&pair.asset1)?, column(&pair.asset2)?));
        }

        let mut state = EngineState::new(self.config.starting_capital, data.len());
        observer.on_event(&EngineEvent::RunStarted {
            dates: data.len(),
            pairs: pairs.len(),
            starting_capital: self.config.starting_capital,
        });

        for (t, &date) in data.dates.iter().enumerate() {
            let day_open_capital = state.capital;

            for (pair, &(c1, c2)) in pairs.iter().zip(&legs) {
                match self.evaluate(&c1[..=t], &c2[..=t])? {
                    Evaluation::Skip(reason) => {
                        self.skip(&mut state, observer, date, pair, reason);
                    }
                    Evaluation::Ready {
                        hedge_ratio,
                        spread,
                        deviation,
                        p_value,
                    } => {
                        let has_position = state.has_position(pair);
                        let decision = self.signals.generate(deviation, has_position);
                        state.stats.evaluations += 1;
                        observer.on_event(&EngineEvent::SignalEvaluated {
                            date,
                            pair: pair.clone(),
                            decision,
                            hedge_ratio,
                            spread,
                            p_value,
                        });

                        match decision.signal {
                            Signal::Buy | Signal::Sell if !has_position => {
                                let side = if decision.signal == Signal::Buy {
                                    PositionSide::Long
                                } else {
                                    PositionSide::Short
                                };
                                if side == PositionSide::Long {
                                    state.stats.buy_signals += 1;
                                } else {
                                    state.stats.sell_signals += 1;
                                }
                                let capital_base = match self.config.capital_allocation {
                                    CapitalAllocation::Sequential => state.capital,
                                    CapitalAllocation::DateSnapshot => day_open_capital,
                                };
                                self.open(
                                    &mut state,
                                    observer,
                                    OpenRequest {
                                        date,
                                        pair,
                                        side,
                                        spread,
                                        hedge_ratio,
                                        deviation,
                                        capital_base,
                                    },
                                );
                            }
                            Signal::Close if has_position => {
                                state.stats.close_signals += 1;
                                self.close(&mut state, observer, date, pair, spread, deviation);
                            }
                            _ => {}
                        }
                    }
                }
            }

            state.record_equity(date);
            observer.on_event(&EngineEvent::DayCompleted {
                date,
                capital: state.capital,
                open_positions: state.positions.len(),
            });
        }

        let open_positions: Vec<Position> = pairs
            .iter()
            .filter_map(|p| state.positions.remove(p))
            .collect();
        observer.on_event(&EngineEvent::RunFinished {
            trades: state.trades.len(),
            open_positions: open_positions.len(),
            final_capital: state.capital,
        });

        Ok(SimulationResult {
            pairs,
            starting_capital: self.config.starting_capital,
            final_capital: state.capital,
            trades: state.trades,
            equity_curve: state.equity_curve,
            open_positions,
            stats: state.stats,
        })
    }

    /// Relationship test and deviation score on trailing closes ending today.
    fn evaluate(&self, c1: &[f64], c2: &[f64]) -> Result<Evaluation, EngineError> {
        let lookback = self.config.lookback;
        let available = c1.len().min(c2.len());
        if available < lookback {
            return Ok(Evaluation::Skip(SkipReason::InsufficientHistory {
                available,
                required: lookback,
            }));
        }

        let rel = self.tester.test_relationship(c1, c2, lookback)?;
        let p_value = match &rel.stationarity {
            Err(RelationshipFailure::ZeroVarianceSpread) => {
                return Ok(Evaluation::Skip(SkipReason::ZeroVarianceSpread))
            }
            Err(failure) => return Ok(Evaluation::Skip(SkipReason::Untestable(failure.clone()))),
            Ok(s) if !rel.cointegrated => {
                return Ok(Evaluation::Skip(SkipReason::NotCointegrated {
                    p_value: s.p_value,
                }))
            }
            Ok(s) => s.p_value,
        };

        let today = available - 1;
        let hedge_ratio = rel.hedge.hedge_ratio;
        let spread = compute_spread(c1[today], c2[today], hedge_ratio);
        let z = zscore(spread, rel.spread_mean, rel.spread_std);
        if z.degenerate {
            return Ok(Evaluation::Skip(SkipReason::ZeroVarianceSpread));
        }

        Ok(Evaluation::Ready {
            hedge_ratio,
            spread,
            deviation: z.value,
            p_value,
        })
    }

    fn skip(
        &self,
        state: &mut EngineState,
        observer: &mut dyn EngineObserver,
        date: NaiveDate,
        pair: &PairKey,
        reason: SkipReason,
    ) {
        let stats = &mut state.stats;
        match reason {
            SkipReason::InsufficientHistory { .. } => stats.skipped_insufficient_history += 1,
            SkipReason::NotCointegrated { .. } => stats.skipped_not_cointegrated += 1,
            SkipReason::Untestable(_) => stats.skipped_untestable += 1,
            SkipReason::ZeroVarianceSpread => stats.skipped_zero_variance += 1,
            SkipReason::NoCapital => stats.skipped_no_capital += 1,
        }
        observer.on_event(&EngineEvent::PairSkipped {
            date,
            pair: pair.clone(),
            reason,
        });
    }

    fn open(&self, state: &mut EngineState, observer: &mut dyn EngineObserver, req: OpenRequest<'_>) {
        let notional = self.config.sizing.position_size(req.capital_base);
        if notional.is_nan() || notional <= 0.0 {
            self.skip(state, observer, req.date, req.pair, SkipReason::NoCapital);
            return;
        }
        let position = Position {
            id: state.id_gen.next_id(),
            pair: req.pair.clone(),
            side: req.side,
            entry_date: req.date,
            entry_spread: req.spread,
            notional,
            hedge_ratio: req.hedge_ratio,
            entry_deviation: req.deviation,
        };
        observer.on_event(&EngineEvent::PositionOpened {
            position: position.clone(),
            capital_base: req.capital_base,
        });
        state.positions.insert(req.pair.clone(), position);
    }

    fn close(
        &self,
        state: &mut EngineState,
        observer: &mut dyn EngineObserver,
        date: NaiveDate,
        pair: &PairKey,
        spread: f64,
        deviation: f64,
    ) {
        let Some(position) = state.positions.remove(pair) else {
            return;
        };
        let (trade, settlement) =
            close_position(position, date, spread, deviation, self.config.commission_pct);
        if settlement.zero_entry {
            state.stats.zero_entry_spreads += 1;
            observer.on_event(&EngineEvent::ZeroEntrySpread {
                date,
                pair: pair.clone(),
                trade_id: trade.id,
            });
        }
        state.capital += trade.net_pnl;
        observer.on_event(&EngineEvent::TradeClosed {
            trade: trade.clone(),
            capital_after: state.capital,
        });
        state.trades.push(trade);
    }
}

struct OpenRequest<'a> {
    date: NaiveDate,
    pair: &'a PairKey,
    side: PositionSide,
    spread: f64,
    hedge_ratio: f64,
    deviation: f64,
    capital_base: f64,
}

/// Validate `config` and run it over `data` in one call.
pub fn run_simulation(
    data: &AlignedCloses,
    config: &EngineConfig,
    observer: &mut dyn EngineObserver,
) -> Result<SimulationResult, EngineError> {
    SimulationEngine::new(config.clone())?.run(data, observer)
}
