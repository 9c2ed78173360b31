//! PairLab Runner: backtest orchestration, metrics, pair optimizer, export.
//!
//! This crate builds on `pairlab-core` to provide:
//! - TOML configuration with validation and a content hash
//! - Data loading with cache and synthetic fallback
//! - Single-backtest runner with metrics and a risk-limit review
//! - Pair optimizer and cointegration screen (rayon)
//! - Text reports, CSV tables and JSON artifacts

pub mod config;
pub mod data_loader;
pub mod export;
pub mod metrics;
pub mod optimizer;
pub mod risk_review;
pub mod runner;

pub use config::{BacktestConfig, ConfigError, DataSourceKind, SizingConfig};
pub use data_loader::{load_series, ExcludedAsset, LoadError, LoadOptions, LoadedData};
pub use export::{
    export_equity_csv, export_json, export_optimizer_csv, export_trades_csv, import_json,
    load_artifacts, render_optimizer_table, render_report, save_artifacts,
};
pub use metrics::PerformanceMetrics;
pub use optimizer::{optimize_pairs, screen_pairs, OptimizerReport, PairRanking, PairScreen};
pub use risk_review::{review_risk, RiskReview};
pub use runner::{run_backtest, run_from_config, BacktestResult, RunError, SCHEMA_VERSION};
