//! Engine configuration and setup-time validation.

use crate::relationship::{RelationshipError, DEFAULT_LOOKBACK, DEFAULT_SIGNIFICANCE};
use crate::risk::SizingPolicy;
use crate::signal::{ThresholdError, DEFAULT_ENTRY_THRESHOLD, DEFAULT_EXIT_THRESHOLD};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_STARTING_CAPITAL: f64 = 10_000.0;
pub const DEFAULT_COMMISSION_PCT: f64 = 0.001;

/// Smallest lookback the unit-root test can run on.
pub const MIN_LOOKBACK: usize = 4;

/// Errors that stop a simulation before its first date.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("starting capital must be positive and finite, got {0}")]
    InvalidCapital(f64),

    #[error("lookback must be at least 4, got {0}")]
    InvalidLookback(usize),

    #[error("significance must lie in (0, 1), got {0}")]
    InvalidSignificance(f64),

    #[error("commission must be non-negative and finite, got {0}")]
    InvalidCommission(f64),

    #[error("invalid sizing: {0}")]
    InvalidSizing(String),

    #[error("invalid signal thresholds: {0}")]
    Thresholds(#[from] ThresholdError),

    #[error("need at least two assets to form a pair, got {count}")]
    TooFewAssets { count: usize },

    #[error("asset {0} listed more than once")]
    DuplicateAsset(String),

    #[error("no aligned closes for asset {symbol}")]
    MissingSeries { symbol: String },

    #[error("price series share no common dates")]
    NoCommonDates,

    #[error("relationship input error: {0}")]
    Relationship(#[from] RelationshipError),
}

/// How positions opened on the same date draw on capital.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapitalAllocation {
    /// Each open sizes against capital as already updated by earlier closes
    /// on the same date.
    #[default]
    Sequential,
    /// Every open on a date sizes against capital at the start of that date.
    DateSnapshot,
}

/// Configuration for a single simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub starting_capital: f64,
    /// Trailing observations required before a pair is evaluated.
    pub lookback: usize,
    pub significance: f64,
    /// Fixed upper bound on the unit-root lag search (`None` = automatic).
    pub max_lag: Option<usize>,
    pub entry_threshold: f64,
    pub exit_threshold: f64,
    /// Fraction of notional charged once per round trip (0.001 = 0.1%).
    pub commission_pct: f64,
    pub sizing: SizingPolicy,
    pub capital_allocation: CapitalAllocation,
}

impl EngineConfig {
    pub fn new(starting_capital: f64) -> Self {
        Self {
            starting_capital,
            lookback: DEFAULT_LOOKBACK,
            significance: DEFAULT_SIGNIFICANCE,
            max_lag: None,
            entry_threshold: DEFAULT_ENTRY_THRESHOLD,
            exit_threshold: DEFAULT_EXIT_THRESHOLD,
            commission_pct: DEFAULT_COMMISSION_PCT,
            sizing: SizingPolicy::default(),
            capital_allocation: CapitalAllocation::default(),
        }
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if !(self.starting_capital.is_finite() && self.starting_capital > 0.0) {
            return Err(EngineError::InvalidCapital(self.starting_capital));
        }
        if self.lookback < MIN_LOOKBACK {
            return Err(EngineError::InvalidLookback(self.lookback));
        }
        if !(self.significance > 0.0 && self.significance < 1.0) {
            return Err(EngineError::InvalidSignificance(self.significance));
        }
        if !(self.commission_pct.is_finite() && self.commission_pct >= 0.0) {
            return Err(EngineError::InvalidCommission(self.commission_pct));
        }
        let limits = self.sizing.limits();
        if !(limits.risk_per_trade > 0.0 && limits.risk_per_trade <= 1.0) {
            return Err(EngineError::InvalidSizing(format!(
                "risk_per_trade must lie in (0, 1], got {}",
                limits.risk_per_trade
            )));
        }
        if !(limits.max_position_pct > 0.0 && limits.max_position_pct <= 100.0) {
            return Err(EngineError::InvalidSizing(format!(
                "max_position_pct must lie in (0, 100], got {}",
                limits.max_position_pct
            )));
        }
        crate::signal::SignalGenerator::new(self.entry_threshold, self.exit_threshold)?;
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new(DEFAULT_STARTING_CAPITAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::risk::RiskParams;

    #[test]
    fn defaults_are_valid() {
        let c = EngineConfig::default();
        assert!(c.validate().is_ok());
        assert_eq!(c.lookback, 252);
        assert_eq!(c.entry_threshold, 2.0);
        assert_eq!(c.exit_threshold, 0.5);
        assert_eq!(c.capital_allocation, CapitalAllocation::Sequential);
    }

    #[test]
    fn rejects_bad_capital() {
        assert!(matches!(
            EngineConfig::new(0.0).validate(),
            Err(EngineError::InvalidCapital(_))
        ));
        assert!(EngineConfig::new(f64::NAN).validate().is_err());
    }

    #[test]
    fn rejects_bad_significance_and_lookback() {
        let mut c = EngineConfig::default();
        c.significance = 1.0;
        assert!(matches!(c.validate(), Err(EngineError::InvalidSignificance(_))));
        let mut c = EngineConfig::default();
        c.lookback = 2;
        assert!(matches!(c.validate(), Err(EngineError::InvalidLookback(2))));
    }

    #[test]
    fn rejects_inverted_thresholds() {
        let mut c = EngineConfig::default();
        c.exit_threshold = 3.0;
        assert!(matches!(c.validate(), Err(EngineError::Thresholds(_))));
    }

    #[test]
    fn rejects_bad_sizing() {
        let mut c = EngineConfig::default();
        c.sizing = SizingPolicy::RiskPerTrade(RiskParams {
            risk_per_trade: 0.0,
            max_position_pct: 10.0,
        });
        assert!(matches!(c.validate(), Err(EngineError::InvalidSizing(_))));
    }

    #[test]
    fn allocation_serializes_snake_case() {
        let json = serde_json::to_string(&CapitalAllocation::DateSnapshot).unwrap();
        assert_eq!(json, "\"date_snapshot\"");
    }
}
