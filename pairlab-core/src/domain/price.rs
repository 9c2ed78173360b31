//! One daily OHLCV observation.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Daily OHLCV observation for a single asset.
///
/// Immutable once loaded. Volume is a float because crypto venues report
/// fractional base-asset volume.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl PricePoint {
    /// Returns true if every field is a finite number.
    pub fn is_finite(&self) -> bool {
        self.open.is_finite()
            && self.high.is_finite()
            && self.low.is_finite()
            && self.close.is_finite()
            && self.volume.is_finite()
    }

    /// Returns true if no field is negative.
    pub fn is_non_negative(&self) -> bool {
        self.open >= 0.0
            && self.high >= 0.0
            && self.low >= 0.0
            && self.close >= 0.0
            && self.volume >= 0.0
    }

    /// `high >= max(open, close)` and `low <= min(open, close)`.
    pub fn is_consistent(&self) -> bool {
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
    }

    /// All three checks at once.
    pub fn is_sane(&self) -> bool {
        self.is_finite() && self.is_non_negative() && self.is_consistent()
    }

    /// A flat bar where OHLC all equal `close`. Handy for close-only inputs.
    pub fn flat(date: NaiveDate, close: f64) -> Self {
        Self {
            date,
            open: close,
            high: close,
            low: close,
            close,
            volume: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_point() -> PricePoint {
        PricePoint {
            date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            open: 100.0,
            high: 105.0,
            low: 98.0,
            close: 103.0,
            volume: 1_250.5,
        }
    }

    #[test]
    fn point_is_sane() {
        assert!(sample_point().is_sane());
    }

    #[test]
    fn detects_nan() {
        let mut p = sample_point();
        p.close = f64::NAN;
        assert!(!p.is_finite());
        assert!(!p.is_sane());
    }

    #[test]
    fn detects_high_below_close() {
        let mut p = sample_point();
        p.high = 102.0;
        assert!(!p.is_consistent());
    }

    #[test]
    fn detects_negative_volume() {
        let mut p = sample_point();
        p.volume = -1.0;
        assert!(!p.is_non_negative());
    }

    #[test]
    fn flat_point_is_sane() {
        let p = PricePoint::flat(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(), 42.0);
        assert!(p.is_sane());
        assert_eq!(p.high, 42.0);
    }
}
