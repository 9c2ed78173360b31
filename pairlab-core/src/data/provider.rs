//! Data provider trait and structured error types.
//!
//! A provider turns a symbol and a date range into a validated
//! [`PriceSeries`]. The runner decides which provider to ask and what to do
//! when one fails.

use crate::domain::{PriceSeries, SeriesError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DataError {
    #[error("no cached data for '{symbol}' at {}", path.display())]
    NotFound { symbol: String, path: PathBuf },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("missing column '{column}' in {}", path.display())]
    MissingColumn { column: String, path: PathBuf },

    #[error("unparseable {field} '{value}' on row {row}")]
    Parse {
        row: usize,
        field: &'static str,
        value: String,
    },

    #[error("invalid series for '{symbol}': {source}")]
    Validation {
        symbol: String,
        #[source]
        source: SeriesError,
    },

    #[error("no data for '{symbol}' between {start} and {end}")]
    NoDataInRange {
        symbol: String,
        start: NaiveDate,
        end: NaiveDate,
    },

    #[error("data error: {0}")]
    Other(String),
}

/// Where a series came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    CsvCache,
    Synthetic,
}

impl std::fmt::Display for DataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataSource::CsvCache => write!(f, "csv"),
            DataSource::Synthetic => write!(f, "synthetic"),
        }
    }
}

/// Result of a successful fetch for one symbol.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub series: PriceSeries,
    pub source: DataSource,
}

/// Source of daily observations.
pub trait DataProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Observations for `symbol` in `[start, end]`, validated and ordered.
    fn fetch(&self, symbol: &str, start: NaiveDate, end: NaiveDate)
        -> Result<FetchResult, DataError>;
}

/// Clip a series to a range, mapping an empty result to [`DataError::NoDataInRange`].
pub(crate) fn clip(
    series: &PriceSeries,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<PriceSeries, DataError> {
    series.between(start, end).map_err(|e| match e {
        SeriesError::Empty => DataError::NoDataInRange {
            symbol: series.symbol().to_string(),
            start,
            end,
        },
        other => DataError::Validation {
            symbol: series.symbol().to_string(),
            source: other,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn clip_outside_range_is_no_data() {
        let s = PriceSeries::from_closes("ETH/USDT", &[(d(1), 1.0), (d(2), 2.0)]).unwrap();
        let err = clip(&s, d(10), d(20)).unwrap_err();
        assert!(matches!(err, DataError::NoDataInRange { .. }));
        assert_eq!(clip(&s, d(2), d(20)).unwrap().len(), 1);
    }

    #[test]
    fn error_messages_name_the_symbol() {
        let err = DataError::NotFound {
            symbol: "SOL/USDT".into(),
            path: PathBuf::from("cache/SOL_USDT_1d.csv"),
        };
        let msg = err.to_string();
        assert!(msg.contains("SOL/USDT"));
        assert!(msg.contains("SOL_USDT_1d.csv"));
    }
}
