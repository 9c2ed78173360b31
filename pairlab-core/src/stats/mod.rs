//! Numerical building blocks: descriptive statistics, least squares, unit-root testing.

pub mod adf;
pub mod descriptive;
pub mod ols;

pub use adf::{
    adf_test, default_max_lag, mackinnon_critical_values, mackinnon_p_value, AdfOutcome,
    CriticalValues, StationarityError,
};
pub use descriptive::{mean, population_std};
pub use ols::{fit_line, ols, LineFit, OlsFit};
