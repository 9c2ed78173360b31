//! Backtest runner: wires together config, data, engine and metrics.
//!
//! Two entry points:
//! - `run_backtest()`: takes pre-loaded data. Used by the optimizer and tests.
//! - `run_from_config()`: loads data per the config, then runs. Used by the CLI.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use pairlab_core::data::DataSource;
use pairlab_core::domain::{DatasetHash, EquityPoint, PairKey, Position, Trade};
use pairlab_core::engine::{run_simulation, EngineError, EngineObserver, RunStats};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::config::{BacktestConfig, ConfigError};
use crate::data_loader::{compute_dataset_hash, load_series, LoadError, LoadOptions, LoadedData};
use crate::metrics::PerformanceMetrics;
use crate::risk_review::{review_risk, RiskReview};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete result of one backtest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestResult {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub config: BacktestConfig,
    pub config_hash: String,
    pub dataset_hash: DatasetHash,
    pub has_synthetic: bool,
    pub sources: BTreeMap<String, DataSource>,
    /// Configured assets that had no usable data.
    #[serde(default)]
    pub excluded_assets: Vec<String>,
    pub pairs: Vec<PairKey>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub metrics: PerformanceMetrics,
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<EquityPoint>,
    /// Positions still open after the last date. Not force-closed.
    pub open_positions: Vec<Position>,
    pub stats: RunStats,
    pub risk: RiskReview,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl BacktestResult {
    pub fn dates_simulated(&self) -> usize {
        self.equity_curve.len()
    }
}

/// Run one backtest over pre-loaded data.
///
/// Configured assets missing from `loaded` are left out; the engine needs at
/// least two of the rest. Dates are re-aligned over the remaining assets, so
/// an unrelated loaded series never shortens the run.
pub fn run_backtest(
    config: &BacktestConfig,
    loaded: &LoadedData,
    observer: &mut dyn EngineObserver,
) -> Result<BacktestResult, RunError> {
    config.validate()?;

    // Axis is the intersection of the assets in this run only.
    let data = loaded.align_symbols(&config.backtest.assets);
    let assets = data.symbols.clone();
    let excluded_assets: Vec<String> = config
        .backtest
        .assets
        .iter()
        .filter(|a| !assets.contains(a))
        .cloned()
        .collect();

    if data.is_empty() && assets.len() >= 2 {
        return Err(LoadError::NoCommonDates.into());
    }

    let engine_config = config.to_engine_config();
    let sim = run_simulation(&data, &engine_config, observer)?;

    let metrics = PerformanceMetrics::compute(
        &sim.trades,
        &sim.equity_curve,
        sim.starting_capital,
        config.analysis.risk_free_rate,
    );
    let risk = review_risk(
        &sim.trades,
        &sim.equity_curve,
        config.risk.max_drawdown_pct,
        config.risk.stop_loss_pct,
    );

    let sources: BTreeMap<String, DataSource> = assets
        .iter()
        .filter_map(|a| loaded.sources.get(a).map(|s| (a.clone(), *s)))
        .collect();
    let has_synthetic = sources.values().any(|s| *s == DataSource::Synthetic);

    info!(
        pairs = sim.pairs.len(),
        dates = sim.dates_simulated(),
        trades = sim.trades.len(),
        open_positions = sim.open_positions.len(),
        final_capital = sim.final_capital,
        sharpe = metrics.sharpe_ratio,
        "backtest complete"
    );

    Ok(BacktestResult {
        schema_version: SCHEMA_VERSION,
        config: config.clone(),
        config_hash: config.config_hash(),
        dataset_hash: compute_dataset_hash(&data),
        has_synthetic,
        sources,
        excluded_assets,
        start_date: sim.first_date(),
        end_date: sim.last_date(),
        pairs: sim.pairs,
        metrics,
        trades: sim.trades,
        equity_curve: sim.equity_curve,
        open_positions: sim.open_positions,
        stats: sim.stats,
        risk,
    })
}

/// Load data as the config describes, then run.
pub fn run_from_config(
    config: &BacktestConfig,
    observer: &mut dyn EngineObserver,
) -> Result<BacktestResult, RunError> {
    config.validate()?;
    let loaded = load_series(&config.backtest.assets, &LoadOptions::from_config(config))?;
    run_backtest(config, &loaded, observer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DataSourceKind;
    use pairlab_core::data::{cointegrated_pair, SyntheticProvider};
    use pairlab_core::engine::{NullObserver, RecordingObserver};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn synthetic_config(assets: &[&str]) -> BacktestConfig {
        let mut c = BacktestConfig::new(
            assets.iter().map(|s| s.to_string()).collect(),
            d(2023, 1, 1),
            d(2023, 12, 31),
        );
        c.data.source = DataSourceKind::Synthetic;
        c.cointegration.lookback = 60;
        c
    }

    fn linked_data() -> LoadedData {
        let (a, b) = cointegrated_pair("A", "B", d(2023, 1, 1), 365, 1.5, 2.0).unwrap();
        LoadedData::from_series(
            vec![(a, DataSource::Synthetic), (b, DataSource::Synthetic)],
            Vec::new(),
        )
        .unwrap()
    }

    #[test]
    fn run_populates_provenance() {
        let config = synthetic_config(&["A", "B"]);
        let result = run_backtest(&config, &linked_data(), &mut NullObserver).unwrap();
        assert_eq!(result.schema_version, SCHEMA_VERSION);
        assert_eq!(result.config_hash, config.config_hash());
        assert!(result.has_synthetic);
        assert_eq!(result.pairs, vec![PairKey::new("A", "B")]);
        assert_eq!(result.dates_simulated(), 365);
        assert_eq!(result.start_date, Some(d(2023, 1, 1)));
        assert_eq!(result.metrics.total_trades, result.trades.len());
        assert_eq!(result.metrics.starting_capital, 10_000.0);
    }

    #[test]
    fn late_asset_does_not_shorten_other_pairs() {
        let (a, b) = cointegrated_pair("A", "B", d(2023, 1, 1), 300, 1.5, 2.0).unwrap();
        let c = SyntheticProvider::default()
            .generate("C", d(2023, 1, 1) + chrono::Duration::days(200), 100)
            .unwrap();
        let loaded = LoadedData::from_series(
            vec![
                (a, DataSource::Synthetic),
                (b, DataSource::Synthetic),
                (c, DataSource::Synthetic),
            ],
            Vec::new(),
        )
        .unwrap();
        assert_eq!(loaded.aligned.len(), 100);

        let config = synthetic_config(&["A", "B", "C"]);
        let pair = run_backtest(&config.for_pair("A", "B"), &loaded, &mut NullObserver).unwrap();
        assert_eq!(pair.dates_simulated(), 300);
        assert_eq!(pair.start_date, Some(d(2023, 1, 1)));

        let all = run_backtest(&config, &loaded, &mut NullObserver).unwrap();
        assert_eq!(all.dates_simulated(), 100);
        assert_ne!(pair.dataset_hash, all.dataset_hash);
    }

    #[test]
    fn assets_without_data_are_reported() {
        let config = synthetic_config(&["A", "B", "Z"]);
        let result = run_backtest(&config, &linked_data(), &mut NullObserver).unwrap();
        assert_eq!(result.excluded_assets, vec!["Z"]);
        assert_eq!(result.pairs.len(), 1);
    }

    #[test]
    fn single_usable_asset_is_an_engine_error() {
        let config = synthetic_config(&["A", "Z"]);
        let err = run_backtest(&config, &linked_data(), &mut NullObserver).unwrap_err();
        assert!(matches!(err, RunError::Engine(EngineError::TooFewAssets { count: 1 })));
    }

    #[test]
    fn invalid_config_fails_before_running() {
        let mut config = synthetic_config(&["A", "B"]);
        config.signals.exit_threshold = 5.0;
        let mut obs = RecordingObserver::new();
        let err = run_backtest(&config, &linked_data(), &mut obs).unwrap_err();
        assert!(matches!(err, RunError::Config(_)));
        assert!(obs.events.is_empty());
    }

    #[test]
    fn run_from_config_loads_synthetic_data() {
        let config = synthetic_config(&["BTC/USDT", "ETH/USDT"]);
        let result = run_from_config(&config, &mut NullObserver).unwrap();
        assert_eq!(result.dates_simulated(), 365);
        assert!(result.has_synthetic);
        assert_eq!(result.sources["BTC/USDT"], DataSource::Synthetic);
    }
}
