//! PairLab Core: domain types, statistics, relationship testing, signals,
//! risk sizing, data acquisition and the day-by-day simulation engine.
//!
//! - Domain types (price series, pairs, positions, trades, equity samples)
//! - Engle-Granger relationship test (OLS hedge ratio + ADF on the spread)
//! - Threshold signal generator over standardized spread deviations
//! - Simulation engine over the common date axis of several assets
//! - CSV cache and deterministic synthetic data

pub mod data;
pub mod domain;
pub mod engine;
pub mod relationship;
pub mod risk;
pub mod signal;
pub mod stats;
