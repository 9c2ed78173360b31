//! Augmented Dickey–Fuller unit-root test with a constant term.
//!
//! Lag length is chosen by AIC over `0..=max_lag` on a common sample, then the
//! regression is refit on the longest sample the chosen lag allows. The test
//! statistic is the t-value of the lagged-level coefficient.
//!
//! P-values use the MacKinnon (1994) response surface and critical values the
//! MacKinnon (2010) finite-sample polynomials, both for one variable with a
//! constant.

use super::ols::{ols, OlsFit};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use statrs::function::erf::erfc;
use thiserror::Error;

// ─── Response surface constants ─────────────────────────────────────

const TAU_MAX: f64 = 2.74;
const TAU_MIN: f64 = -18.83;
const TAU_STAR: f64 = -1.61;
const TAU_SMALL_P: [f64; 3] = [2.1659, 1.4412, 0.038269];
const TAU_LARGE_P: [f64; 4] = [1.7339, 0.93227, -0.12745, -0.010368];

const CRIT_1PCT: [f64; 4] = [-3.43035, -6.5393, -16.786, -79.433];
const CRIT_5PCT: [f64; 4] = [-2.86154, -2.8903, -4.234, -40.040];
const CRIT_10PCT: [f64; 4] = [-2.56677, -1.5384, -2.809, 0.0];

/// Reasons the test cannot be computed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StationarityError {
    #[error("series too short for the test: {len} observations, need at least {required}")]
    TooShort { len: usize, required: usize },

    #[error("series is constant")]
    Constant,

    #[error("series contains non-finite values")]
    NonFinite,

    #[error("regression is singular at lag {lag}")]
    Singular { lag: usize },
}

/// Critical values of the test statistic at the usual levels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CriticalValues {
    pub one_pct: f64,
    pub five_pct: f64,
    pub ten_pct: f64,
}

/// Raw test output, before any significance decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdfOutcome {
    pub statistic: f64,
    pub p_value: f64,
    /// Number of lagged differences in the final regression.
    pub used_lag: usize,
    /// Observations in the final regression.
    pub nobs: usize,
    pub critical_values: CriticalValues,
    /// AIC of the selected lag on the common sample.
    pub ic_best: f64,
}

/// `ceil(12 * (n / 100)^(1/4))`, capped so the regression keeps enough rows.
///
/// Returns `None` when `n` is too small for even a zero-lag regression.
pub fn default_max_lag(n: usize) -> Option<usize> {
    let cap = lag_cap(n)?;
    let schwert = (12.0 * (n as f64 / 100.0).powf(0.25)).ceil() as usize;
    Some(schwert.min(cap))
}

fn lag_cap(n: usize) -> Option<usize> {
    (n / 2).checked_sub(2)
}

/// Run the test on `series`.
///
/// `max_lag = None` uses [`default_max_lag`]. An explicit `max_lag` larger
/// than the sample allows is rejected as [`StationarityError::TooShort`].
pub fn adf_test(series: &[f64], max_lag: Option<usize>) -> Result<AdfOutcome, StationarityError> {
    let n = series.len();
    if series.iter().any(|v| !v.is_finite()) {
        return Err(StationarityError::NonFinite);
    }
    let max_lag = match max_lag {
        Some(m) => match lag_cap(n) {
            Some(cap) if m <= cap => m,
            _ => {
                return Err(StationarityError::TooShort {
                    len: n,
                    required: 2 * (m + 2),
                })
            }
        },
        None => default_max_lag(n).ok_or(StationarityError::TooShort { len: n, required: 4 })?,
    };

    let (lo, hi) = series
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    if lo == hi {
        return Err(StationarityError::Constant);
    }

    let diffs: Vec<f64> = series.windows(2).map(|w| w[1] - w[0]).collect();

    // Lag selection on the common sample that the largest lag permits.
    let mut best: Option<(f64, usize)> = None;
    for lag in 0..=max_lag {
        let Some(fit) = regress(series, &diffs, max_lag, lag) else {
            continue;
        };
        let aic = fit.aic();
        if aic.is_nan() {
            continue;
        }
        match best {
            Some((best_aic, _)) if aic >= best_aic => {}
            _ => best = Some((aic, lag)),
        }
    }
    let (ic_best, used_lag) = best.ok_or(StationarityError::Singular { lag: 0 })?;

    let fit = regress(series, &diffs, used_lag, used_lag)
        .ok_or(StationarityError::Singular { lag: used_lag })?;
    let statistic = fit.t_value(1);
    if !statistic.is_finite() {
        return Err(StationarityError::Singular { lag: used_lag });
    }

    Ok(AdfOutcome {
        statistic,
        p_value: mackinnon_p_value(statistic),
        used_lag,
        nobs: fit.nobs,
        critical_values: mackinnon_critical_values(fit.nobs),
        ic_best,
    })
}

/// Regress `Δx_t` on `[1, x_{t-1}, Δx_{t-1}, .., Δx_{t-lag}]` over the rows
/// left after dropping the first `start` differences.
fn regress(levels: &[f64], diffs: &[f64], start: usize, lag: usize) -> Option<OlsFit> {
    let nobs = diffs.len().checked_sub(start)?;
    let design = DMatrix::from_fn(nobs, lag + 2, |r, c| {
        let t = start + r;
        match c {
            0 => 1.0,
            1 => levels[t],
            j => diffs[t - (j - 1)],
        }
    });
    let y = DVector::from_fn(nobs, |r, _| diffs[start + r]);
    ols(&design, &y)
}

/// Approximate p-value of the test statistic (one variable, constant term).
pub fn mackinnon_p_value(statistic: f64) -> f64 {
    if statistic > TAU_MAX {
        return 1.0;
    }
    if statistic < TAU_MIN {
        return 0.0;
    }
    let z = if statistic <= TAU_STAR {
        polyval(&TAU_SMALL_P, statistic)
    } else {
        polyval(&TAU_LARGE_P, statistic)
    };
    normal_cdf(z)
}

/// Finite-sample critical values for `nobs` observations.
pub fn mackinnon_critical_values(nobs: usize) -> CriticalValues {
    let inv = 1.0 / nobs.max(1) as f64;
    CriticalValues {
        one_pct: polyval(&CRIT_1PCT, inv),
        five_pct: polyval(&CRIT_5PCT, inv),
        ten_pct: polyval(&CRIT_10PCT, inv),
    }
}

/// `c[0] + c[1] x + c[2] x^2 + ...`
fn polyval(coefs: &[f64], x: f64) -> f64 {
    coefs.iter().rev().fold(0.0, |acc, c| acc * x + c)
}

fn normal_cdf(z: f64) -> f64 {
    0.5 * erfc(-z / std::f64::consts::SQRT_2)
}
