//! Relationship testing: hedge-ratio regression plus a stationarity test on the spread.
//!
//! Every call is a pure function of its inputs. A fresh hedge ratio and test
//! outcome is computed for each evaluation window; nothing is cached between
//! calls.

use crate::stats::{adf_test, fit_line, mean, population_std, AdfOutcome, CriticalValues};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use crate::stats::StationarityError;

/// Default p-value threshold below which a spread counts as stationary.
pub const DEFAULT_SIGNIFICANCE: f64 = 0.05;

/// Default trailing window length, in observations.
pub const DEFAULT_LOOKBACK: usize = 252;

/// Spread standard deviation at or below this fraction of the price level
/// is treated as zero.
const ZERO_SPREAD_TOLERANCE: f64 = 1e-9;

/// Invalid inputs to the relationship functions.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RelationshipError {
    #[error("price series are empty")]
    Empty,

    #[error("price series lengths differ: {len1} vs {len2}")]
    LengthMismatch { len1: usize, len2: usize },

    #[error("lookback must be at least 1")]
    ZeroLookback,
}

/// Why a window produced no usable relationship.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RelationshipFailure {
    #[error("hedge ratio is zero (regressor has no variance)")]
    DegenerateHedgeRatio,

    #[error("spread has zero variance")]
    ZeroVarianceSpread,

    #[error("stationarity test not computable: {0}")]
    Stationarity(#[from] StationarityError),
}

/// Result of the hedge regression `price1 = intercept + hedge_ratio * price2`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HedgeFit {
    pub hedge_ratio: f64,
    pub intercept: f64,
}

/// Hedge regression over a window together with the spread it implies.
#[derive(Debug, Clone, PartialEq)]
pub struct HedgeRelationship {
    pub hedge_ratio: f64,
    pub intercept: f64,
    pub spread: Vec<f64>,
}

/// Unit-root test outcome with the significance decision applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationarityResult {
    pub statistic: f64,
    pub p_value: f64,
    pub used_lag: usize,
    pub nobs: usize,
    pub critical_values: CriticalValues,
    pub ic_best: f64,
    pub significance: f64,
    pub is_stationary: bool,
}

impl StationarityResult {
    fn from_outcome(outcome: AdfOutcome, significance: f64) -> Self {
        Self {
            statistic: outcome.statistic,
            p_value: outcome.p_value,
            used_lag: outcome.used_lag,
            nobs: outcome.nobs,
            critical_values: outcome.critical_values,
            ic_best: outcome.ic_best,
            significance,
            is_stationary: outcome.p_value < significance,
        }
    }
}

/// Full outcome of testing one window of a pair.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationshipResult {
    pub hedge: HedgeRelationship,
    /// Observations actually used (at most the requested lookback).
    pub window_len: usize,
    /// Normalization baseline for the deviation score.
    pub spread_mean: f64,
    /// Population standard deviation of the window spread.
    pub spread_std: f64,
    /// AR(1) mean-reversion half-life of the spread, in observations.
    pub half_life: Option<f64>,
    pub stationarity: Result<StationarityResult, RelationshipFailure>,
    pub cointegrated: bool,
}

impl RelationshipResult {
    pub fn p_value(&self) -> Option<f64> {
        self.stationarity.as_ref().ok().map(|s| s.p_value)
    }

    pub fn failure(&self) -> Option<&RelationshipFailure> {
        self.stationarity.as_ref().err()
    }
}

/// Standardized distance of a spread from its baseline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZScore {
    pub value: f64,
    /// Set when the baseline standard deviation was zero; `value` is then 0.
    pub degenerate: bool,
}

// ─── Free functions ─────────────────────────────────────────────────

fn check_lengths(price1: &[f64], price2: &[f64]) -> Result<(), RelationshipError> {
    if price1.len() != price2.len() {
        return Err(RelationshipError::LengthMismatch {
            len1: price1.len(),
            len2: price2.len(),
        });
    }
    if price1.is_empty() {
        return Err(RelationshipError::Empty);
    }
    Ok(())
}

/// OLS of `price1` on `[1, price2]`.
///
/// A constant `price2` makes the design singular; the fit then reports a hedge
/// ratio of 0 and the intercept is the mean of `price1`.
pub fn estimate_hedge_ratio(price1: &[f64], price2: &[f64]) -> Result<HedgeFit, RelationshipError> {
    check_lengths(price1, price2)?;
    Ok(match fit_line(price1, price2) {
        Some(line) => HedgeFit {
            hedge_ratio: line.slope,
            intercept: line.intercept,
        },
        None => HedgeFit {
            hedge_ratio: 0.0,
            intercept: mean(price1),
        },
    })
}

/// `price1 - hedge_ratio * price2`
pub fn compute_spread(price1: f64, price2: f64, hedge_ratio: f64) -> f64 {
    price1 - hedge_ratio * price2
}

/// Element-wise [`compute_spread`] over aligned slices (truncates to the shorter).
pub fn compute_spread_series(price1: &[f64], price2: &[f64], hedge_ratio: f64) -> Vec<f64> {
    price1
        .iter()
        .zip(price2)
        .map(|(&a, &b)| compute_spread(a, b, hedge_ratio))
        .collect()
}

/// `(current - mean) / std`, or 0 flagged as degenerate when `std == 0`.
pub fn zscore(current: f64, mean: f64, std: f64) -> ZScore {
    if std == 0.0 {
        return ZScore {
            value: 0.0,
            degenerate: true,
        };
    }
    ZScore {
        value: (current - mean) / std,
        degenerate: false,
    }
}

/// Half-life of mean reversion from the AR(1) fit `Δs_t = φ (s_{t-1} - μ) + ε`.
///
/// `None` unless `-1 < φ < 0`.
pub fn half_life(spread: &[f64]) -> Option<f64> {
    if spread.len() < 10 {
        return None;
    }
    let mu = mean(spread);
    let dy: Vec<f64> = spread.windows(2).map(|w| w[1] - w[0]).collect();
    let lagged: Vec<f64> = spread[..spread.len() - 1].iter().map(|s| s - mu).collect();
    let phi = fit_line(&dy, &lagged)?.slope;
    if phi >= 0.0 || phi <= -1.0 {
        return None;
    }
    let hl = -(2.0_f64.ln()) / (1.0 + phi).ln();
    hl.is_finite().then_some(hl)
}

// ─── Tester ─────────────────────────────────────────────────────────

/// Engle–Granger style relationship tester.
///
/// Holds only configuration: the significance threshold and an optional
/// fixed upper bound on the unit-root test's lag search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RelationshipTester {
    pub significance: f64,
    pub max_lag: Option<usize>,
}

impl Default for RelationshipTester {
    fn default() -> Self {
        Self {
            significance: DEFAULT_SIGNIFICANCE,
            max_lag: None,
        }
    }
}

impl RelationshipTester {
    pub fn new(significance: f64, max_lag: Option<usize>) -> Self {
        Self {
            significance,
            max_lag,
        }
    }

    /// Unit-root test on a spread, deciding stationarity at `self.significance`.
    pub fn test_stationarity(
        &self,
        spread: &[f64],
        max_lag: Option<usize>,
    ) -> Result<StationarityResult, StationarityError> {
        let outcome = adf_test(spread, max_lag.or(self.max_lag))?;
        Ok(StationarityResult::from_outcome(outcome, self.significance))
    }

    /// Test the most recent `lookback` observations of a pair.
    ///
    /// Shorter inputs are used whole, never padded. Failures of the
    /// stationarity step land in `stationarity` with `cointegrated = false`.
    pub fn test_relationship(
        &self,
        price1: &[f64],
        price2: &[f64],
        lookback: usize,
    ) -> Result<RelationshipResult, RelationshipError> {
        check_lengths(price1, price2)?;
        if lookback == 0 {
            return Err(RelationshipError::ZeroLookback);
        }
        let start = price1.len().saturating_sub(lookback);
        let w1 = &price1[start..];
        let w2 = &price2[start..];

        let fit = estimate_hedge_ratio(w1, w2)?;
        let spread = compute_spread_series(w1, w2, fit.hedge_ratio);
        let spread_mean = mean(&spread);
        let spread_std = population_std(&spread);

        let stationarity = if fit.hedge_ratio == 0.0 {
            Err(RelationshipFailure::DegenerateHedgeRatio)
        } else if is_zero_width(spread_std, w1) {
            Err(RelationshipFailure::ZeroVarianceSpread)
        } else {
            self.test_stationarity(&spread, None)
                .map_err(RelationshipFailure::from)
        };
        let cointegrated = matches!(&stationarity, Ok(s) if s.is_stationary);

        Ok(RelationshipResult {
            half_life: half_life(&spread),
            hedge: HedgeRelationship {
                hedge_ratio: fit.hedge_ratio,
                intercept: fit.intercept,
                spread,
            },
            window_len: w1.len(),
            spread_mean,
            spread_std,
            stationarity,
            cointegrated,
        })
    }
}

/// Spread noise below floating-point resolution of the price level.
fn is_zero_width(spread_std: f64, reference: &[f64]) -> bool {
    let level = reference.iter().map(|p| p.abs()).sum::<f64>() / reference.len().max(1) as f64;
    spread_std <= ZERO_SPREAD_TOLERANCE * level.max(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wave(n: usize) -> Vec<f64> {
        (0..n).map(|i| 100.0 + i as f64 * 0.3 + (i as f64 * 0.9).sin() * 4.0).collect()
    }

    #[test]
    fn hedge_ratio_exact_line() {
        let p2 = wave(100);
        let p1: Vec<f64> = p2.iter().map(|v| 1.5 * v + 7.0).collect();
        let fit = estimate_hedge_ratio(&p1, &p2).unwrap();
        assert!((fit.hedge_ratio - 1.5).abs() < 1e-9);
        assert!((fit.intercept - 7.0).abs() < 1e-6);
    }

    #[test]
    fn hedge_ratio_constant_regressor_is_zero() {
        let p1 = wave(50);
        let p2 = vec![10.0; 50];
        let fit = estimate_hedge_ratio(&p1, &p2).unwrap();
        assert_eq!(fit.hedge_ratio, 0.0);
    }

    #[test]
    fn hedge_ratio_rejects_bad_input() {
        assert_eq!(
            estimate_hedge_ratio(&[], &[]),
            Err(RelationshipError::Empty)
        );
        assert_eq!(
            estimate_hedge_ratio(&[1.0, 2.0], &[1.0]),
            Err(RelationshipError::LengthMismatch { len1: 2, len2: 1 })
        );
    }

    #[test]
    fn spread_scalar_and_series_agree() {
        let s = compute_spread_series(&[10.0, 12.0], &[4.0, 5.0], 2.0);
        assert_eq!(s, vec![2.0, 2.0]);
        assert_eq!(compute_spread(10.0, 4.0, 2.0), 2.0);
    }

    #[test]
    fn zscore_at_mean_is_zero() {
        let z = zscore(5.0, 5.0, 2.0);
        assert_eq!(z.value, 0.0);
        assert!(!z.degenerate);
    }

    #[test]
    fn zscore_zero_std_is_flagged() {
        let z = zscore(123.0, -4.0, 0.0);
        assert_eq!(z.value, 0.0);
        assert!(z.degenerate);
    }

    #[test]
    fn zscore_scales_by_std() {
        assert!((zscore(9.0, 5.0, 2.0).value - 2.0).abs() < 1e-12);
    }

    #[test]
    fn window_is_trailing_and_not_padded() {
        let p2 = wave(300);
        let p1: Vec<f64> = p2.iter().enumerate().map(|(i, v)| 2.0 * v + (i % 3) as f64).collect();
        let tester = RelationshipTester::default();
        let full = tester.test_relationship(&p1, &p2, 252).unwrap();
        assert_eq!(full.window_len, 252);
        assert_eq!(full.hedge.spread.len(), 252);
        let short = tester.test_relationship(&p1[..100], &p2[..100], 252).unwrap();
        assert_eq!(short.window_len, 100);
    }

    #[test]
    fn constant_regressor_is_not_cointegrated() {
        let p1 = wave(260);
        let p2 = vec![50.0; 260];
        let r = RelationshipTester::default()
            .test_relationship(&p1, &p2, 252)
            .unwrap();
        assert!(!r.cointegrated);
        assert_eq!(r.failure(), Some(&RelationshipFailure::DegenerateHedgeRatio));
    }

    #[test]
    fn exact_linear_relation_reports_zero_variance() {
        let p2 = wave(260);
        let p1: Vec<f64> = p2.iter().map(|v| 2.0 * v + 25.0).collect();
        let r = RelationshipTester::default()
            .test_relationship(&p1, &p2, 252)
            .unwrap();
        assert!((r.hedge.hedge_ratio - 2.0).abs() < 1e-9);
        assert!(!r.cointegrated);
        assert_eq!(r.failure(), Some(&RelationshipFailure::ZeroVarianceSpread));
        assert!(r.p_value().is_none());
    }

    #[test]
    fn zero_lookback_is_an_error() {
        let p = wave(10);
        assert_eq!(
            RelationshipTester::default().test_relationship(&p, &p, 0),
            Err(RelationshipError::ZeroLookback)
        );
    }

    #[test]
    fn half_life_of_alternating_spread() {
        let s: Vec<f64> = (0..100).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        // φ = -2 here, outside (-1, 0)
        assert!(half_life(&s).is_none());
        let decay: Vec<f64> = (0..60).map(|i| 0.8_f64.powi(i % 20)).collect();
        assert!(half_life(&decay).is_some());
    }
}
