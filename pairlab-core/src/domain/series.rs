//! Validated, date-ordered observations for one asset.

use super::price::PricePoint;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reasons a sequence of observations is rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SeriesError {
    #[error("series is empty")]
    Empty,

    #[error("non-finite value on {date}")]
    NonFinite { date: NaiveDate },

    #[error("negative value on {date}")]
    Negative { date: NaiveDate },

    #[error("inconsistent OHLC on {date} (high must bound open/close from above, low from below)")]
    InconsistentOhlc { date: NaiveDate },

    #[error("duplicate timestamp {date}")]
    Duplicate { date: NaiveDate },

    #[error("timestamps out of order: {next} follows {prev}")]
    Unordered { prev: NaiveDate, next: NaiveDate },
}

/// Check a slice of observations against the acquisition-layer rules.
///
/// Returns the first violation found, scanning in order.
pub fn validate_points(points: &[PricePoint]) -> Result<(), SeriesError> {
    if points.is_empty() {
        return Err(SeriesError::Empty);
    }
    let mut prev: Option<NaiveDate> = None;
    for p in points {
        if !p.is_finite() {
            return Err(SeriesError::NonFinite { date: p.date });
        }
        if !p.is_non_negative() {
            return Err(SeriesError::Negative { date: p.date });
        }
        if !p.is_consistent() {
            return Err(SeriesError::InconsistentOhlc { date: p.date });
        }
        if let Some(prev) = prev {
            if p.date == prev {
                return Err(SeriesError::Duplicate { date: p.date });
            }
            if p.date < prev {
                return Err(SeriesError::Unordered { prev, next: p.date });
            }
        }
        prev = Some(p.date);
    }
    Ok(())
}

/// Ordered observations for one asset. Strictly increasing dates.
///
/// The only way to build one is through [`PriceSeries::new`], so every
/// instance has passed [`validate_points`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceSeries {
    symbol: String,
    points: Vec<PricePoint>,
}

impl PriceSeries {
    pub fn new(symbol: impl Into<String>, points: Vec<PricePoint>) -> Result<Self, SeriesError> {
        validate_points(&points)?;
        Ok(Self {
            symbol: symbol.into(),
            points,
        })
    }

    /// Build from `(date, close)` pairs, filling OHLC with the close.
    pub fn from_closes(
        symbol: impl Into<String>,
        closes: &[(NaiveDate, f64)],
    ) -> Result<Self, SeriesError> {
        let points = closes
            .iter()
            .map(|&(date, close)| PricePoint::flat(date, close))
            .collect();
        Self::new(symbol, points)
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|p| p.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.date)
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.points.iter().map(|p| p.date)
    }

    pub fn closes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.close).collect()
    }

    /// Close on an exact date, if present.
    pub fn close_on(&self, date: NaiveDate) -> Option<f64> {
        self.points
            .binary_search_by(|p| p.date.cmp(&date))
            .ok()
            .map(|i| self.points[i].close)
    }

    /// Restrict to `[start, end]` inclusive.
    pub fn between(&self, start: NaiveDate, end: NaiveDate) -> Result<Self, SeriesError> {
        let points: Vec<PricePoint> = self
            .points
            .iter()
            .filter(|p| p.date >= start && p.date <= end)
            .copied()
            .collect();
        Self::new(self.symbol.clone(), points)
    }
}
