//! Multi-asset date alignment.
//!
//! The simulation runs only on dates present in every series. A date missing
//! from any one asset is dropped for all of them; nothing is forward-filled.

use crate::domain::PriceSeries;
use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap};

/// Closes for several assets on their common date axis.
#[derive(Debug, Clone)]
pub struct AlignedCloses {
    /// Dates present in every input series, ascending.
    pub dates: Vec<NaiveDate>,
    /// Symbols in input order.
    pub symbols: Vec<String>,
    /// Closes per symbol; each has the same length as `dates`.
    pub closes: HashMap<String, Vec<f64>>,
}

impl AlignedCloses {
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn closes_for(&self, symbol: &str) -> Option<&[f64]> {
        self.closes.get(symbol).map(|v| v.as_slice())
    }
}

/// Align series to the intersection of their dates.
pub fn align_common_dates(series: &[PriceSeries]) -> AlignedCloses {
    let symbols: Vec<String> = series.iter().map(|s| s.symbol().to_string()).collect();

    let mut common: Option<BTreeSet<NaiveDate>> = None;
    for s in series {
        let dates: BTreeSet<NaiveDate> = s.dates().collect();
        common = Some(match common {
            None => dates,
            Some(acc) => acc.intersection(&dates).copied().collect(),
        });
    }
    let dates: Vec<NaiveDate> = common.unwrap_or_default().into_iter().collect();

    let mut closes = HashMap::with_capacity(series.len());
    for s in series {
        let by_date: HashMap<NaiveDate, f64> = s.points().iter().map(|p| (p.date, p.close)).collect();
        let aligned: Vec<f64> = dates.iter().map(|d| by_date[d]).collect();
        closes.insert(s.symbol().to_string(), aligned);
    }

    AlignedCloses {
        dates,
        symbols,
        closes,
    }
}
