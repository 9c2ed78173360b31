use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One end-of-day capital sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub capital: f64,
}

/// Capital values of an equity curve, in date order.
pub fn capital_values(curve: &[EquityPoint]) -> Vec<f64> {
    curve.iter().map(|p| p.capital).collect()
}
