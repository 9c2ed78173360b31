//! Series loading and data resolution for the runner.
//!
//! Given a list of symbols, loads one series per symbol and aligns them to
//! their common dates. Resolution per symbol:
//! 1. `source = "synthetic"` → generate (tagged)
//! 2. `source = "csv"` and the cache file loads → use it
//! 3. cache failed and `synthetic_fallback` is set → generate (tagged)
//! 4. otherwise the symbol is excluded with a warning
//!
//! Fewer than two surviving symbols is fatal.

use chrono::NaiveDate;
use pairlab_core::data::{
    align_common_dates, AlignedCloses, CsvStore, DataProvider, DataSource, FetchResult,
    SyntheticProvider,
};
use pairlab_core::domain::{DatasetHash, PriceSeries};
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{BacktestConfig, DataSourceKind};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("need at least two usable series, got {loaded} (excluded: {})", excluded.join(", "))]
    TooFewSeries { loaded: usize, excluded: Vec<String> },

    #[error("loaded series share no common dates")]
    NoCommonDates,
}

/// Options controlling how series are loaded.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub source: DataSourceKind,
    pub cache_dir: PathBuf,
    pub timeframe: String,
    /// Generate synthetic data for symbols the cache cannot serve.
    pub synthetic_fallback: bool,
}

impl LoadOptions {
    pub fn from_config(config: &BacktestConfig) -> Self {
        Self {
            start: config.backtest.start_date,
            end: config.backtest.end_date,
            source: config.data.source,
            cache_dir: config.data.cache_dir.clone(),
            timeframe: config.backtest.timeframe.clone(),
            synthetic_fallback: config.data.synthetic_fallback,
        }
    }
}

/// A symbol dropped during loading.
#[derive(Debug, Clone, PartialEq)]
pub struct ExcludedAsset {
    pub symbol: String,
    pub reason: String,
}

/// Aligned closes plus provenance.
#[derive(Debug, Clone)]
pub struct LoadedData {
    pub aligned: AlignedCloses,
    /// Validated series as loaded, before alignment.
    pub series: Vec<PriceSeries>,
    pub sources: BTreeMap<String, DataSource>,
    pub excluded: Vec<ExcludedAsset>,
    pub dataset_hash: DatasetHash,
    pub has_synthetic: bool,
}

impl LoadedData {
    /// Align already-loaded series. Needs at least two.
    pub fn from_series(
        loaded: Vec<(PriceSeries, DataSource)>,
        excluded: Vec<ExcludedAsset>,
    ) -> Result<Self, LoadError> {
        if loaded.len() < 2 {
            return Err(LoadError::TooFewSeries {
                loaded: loaded.len(),
                excluded: excluded.iter().map(|e| e.symbol.clone()).collect(),
            });
        }
        let sources: BTreeMap<String, DataSource> = loaded
            .iter()
            .map(|(s, src)| (s.symbol().to_string(), *src))
            .collect();
        let has_synthetic = sources.values().any(|s| *s == DataSource::Synthetic);
        let series: Vec<PriceSeries> = loaded.into_iter().map(|(s, _)| s).collect();

        let aligned = align_common_dates(&series);
        if aligned.is_empty() {
            return Err(LoadError::NoCommonDates);
        }
        let dataset_hash = compute_dataset_hash(&aligned);

        Ok(Self {
            aligned,
            series,
            sources,
            excluded,
            dataset_hash,
            has_synthetic,
        })
    }

    pub fn symbols(&self) -> &[String] {
        &self.aligned.symbols
    }

    /// Re-align only the requested symbols that were loaded, in request order.
    ///
    /// The axis is their own intersection, which can be longer than
    /// `self.aligned` when some other loaded series is shorter.
    pub fn align_symbols(&self, symbols: &[String]) -> AlignedCloses {
        let subset: Vec<PriceSeries> = symbols
            .iter()
            .filter_map(|sym| self.series.iter().find(|s| s.symbol() == sym.as_str()).cloned())
            .collect();
        align_common_dates(&subset)
    }
}

/// Load and align every symbol, excluding the ones that fail.
pub fn load_series(symbols: &[String], opts: &LoadOptions) -> Result<LoadedData, LoadError> {
    let store = CsvStore::with_timeframe(&opts.cache_dir, &opts.timeframe);
    let synthetic = SyntheticProvider::default();

    let mut loaded = Vec::with_capacity(symbols.len());
    let mut excluded = Vec::new();

    for symbol in symbols {
        let attempt = match opts.source {
            DataSourceKind::Synthetic => synthetic.fetch(symbol, opts.start, opts.end),
            DataSourceKind::Csv => match store.fetch(symbol, opts.start, opts.end) {
                Ok(r) => Ok(r),
                Err(e) if opts.synthetic_fallback => {
                    warn!(symbol = %symbol, error = %e, "cache unusable, generating synthetic data");
                    synthetic.fetch(symbol, opts.start, opts.end)
                }
                Err(e) => Err(e),
            },
        };

        match attempt {
            Ok(FetchResult { series, source }) => {
                if source == DataSource::Synthetic {
                    warn!(symbol = %symbol, "using synthetic data; results are not real");
                }
                info!(
                    symbol = %symbol,
                    source = %source,
                    rows = series.len(),
                    "series loaded"
                );
                loaded.push((series, source));
            }
            Err(e) => {
                warn!(symbol = %symbol, error = %e, "excluding asset");
                excluded.push(ExcludedAsset {
                    symbol: symbol.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    let data = LoadedData::from_series(loaded, excluded)?;
    info!(
        assets = data.aligned.symbols.len(),
        dates = data.aligned.len(),
        dataset_hash = %data.dataset_hash,
        "series aligned"
    );
    Ok(data)
}

/// Deterministic BLAKE3 hash over the aligned closes.
///
/// Symbols are hashed in sorted order so the result does not depend on
/// map iteration order.
pub fn compute_dataset_hash(aligned: &AlignedCloses) -> DatasetHash {
    let mut hasher = blake3::Hasher::new();
    for d in &aligned.dates {
        hasher.update(d.to_string().as_bytes());
    }

    let mut symbols: Vec<&String> = aligned.closes.keys().collect();
    symbols.sort();
    for symbol in symbols {
        hasher.update(symbol.as_bytes());
        if let Some(closes) = aligned.closes.get(symbol) {
            for c in closes {
                hasher.update(&c.to_le_bytes());
            }
        }
    }
    DatasetHash(hasher.finalize().to_hex().to_string())
}
