//! Serializable backtest configuration, loaded from TOML.
//!
//! ```toml
//! [backtest]
//! assets = ["BTC/USDT", "ETH/USDT", "SOL/USDT"]
//! start_date = "2023-01-01"
//! end_date = "2024-12-31"
//!
//! [signals]
//! entry_threshold = 2.0
//! ```
//!
//! Every field outside `[backtest]` has a default, so the three keys above are
//! a complete configuration.

use chrono::NaiveDate;
use pairlab_core::data::DEFAULT_TIMEFRAME;
use pairlab_core::engine::config::{DEFAULT_COMMISSION_PCT, DEFAULT_STARTING_CAPITAL};
use pairlab_core::engine::{CapitalAllocation, EngineConfig};
use pairlab_core::relationship::{DEFAULT_LOOKBACK, DEFAULT_SIGNIFICANCE};
use pairlab_core::risk::{
    RiskParams, SizingPolicy, DEFAULT_KELLY_FRACTION, DEFAULT_MAX_POSITION_PCT,
    DEFAULT_RISK_PER_TRADE,
};
use pairlab_core::signal::{SignalGenerator, DEFAULT_ENTRY_THRESHOLD, DEFAULT_EXIT_THRESHOLD};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::metrics::DEFAULT_RISK_FREE_RATE;

/// Shortest lookback accepted from a config file.
pub const MIN_CONFIG_LOOKBACK: usize = 20;
pub const DEFAULT_MAX_DRAWDOWN_PCT: f64 = 20.0;
pub const DEFAULT_STOP_LOSS_PCT: f64 = 0.05;
pub const DEFAULT_CACHE_DIR: &str = "data/historical";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("config serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("at least two distinct assets are required, got {count}")]
    TooFewAssets { count: usize },

    #[error("asset '{0}' is listed more than once")]
    DuplicateAsset(String),

    #[error("start_date {start} must be before end_date {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error("invalid {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Complete configuration for one backtest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    pub backtest: BacktestSection,
    #[serde(default)]
    pub cointegration: CointegrationSection,
    #[serde(default)]
    pub signals: SignalSection,
    #[serde(default)]
    pub risk: RiskSection,
    #[serde(default)]
    pub costs: CostSection,
    #[serde(default)]
    pub data: DataSection,
    #[serde(default)]
    pub analysis: AnalysisSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestSection {
    /// Assets to pair, in enumeration order.
    pub assets: Vec<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default = "default_starting_capital")]
    pub starting_capital: f64,
    #[serde(default = "default_timeframe")]
    pub timeframe: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CointegrationSection {
    pub significance: f64,
    pub lookback: usize,
    /// Fixed upper bound on the ADF lag search. Omit for automatic.
    pub max_lag: Option<usize>,
}

impl Default for CointegrationSection {
    fn default() -> Self {
        Self {
            significance: DEFAULT_SIGNIFICANCE,
            lookback: DEFAULT_LOOKBACK,
            max_lag: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalSection {
    pub entry_threshold: f64,
    pub exit_threshold: f64,
}

impl Default for SignalSection {
    fn default() -> Self {
        Self {
            entry_threshold: DEFAULT_ENTRY_THRESHOLD,
            exit_threshold: DEFAULT_EXIT_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskSection {
    /// Fraction of capital per trade (0.02 = 2%).
    pub risk_per_trade: f64,
    /// Cap on one position, percent of capital.
    pub max_position_pct: f64,
    pub capital_allocation: CapitalAllocation,
    /// Drawdown limit, percent. Breaches are reported, not enforced.
    pub max_drawdown_pct: f64,
    /// Per-trade loss limit as a fraction of notional. Reported, not enforced.
    pub stop_loss_pct: f64,
    pub sizing: SizingConfig,
}

impl Default for RiskSection {
    fn default() -> Self {
        Self {
            risk_per_trade: DEFAULT_RISK_PER_TRADE,
            max_position_pct: DEFAULT_MAX_POSITION_PCT,
            capital_allocation: CapitalAllocation::default(),
            max_drawdown_pct: DEFAULT_MAX_DRAWDOWN_PCT,
            stop_loss_pct: DEFAULT_STOP_LOSS_PCT,
            sizing: SizingConfig::default(),
        }
    }
}

/// Sizing rule as written in the config file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SizingConfig {
    #[default]
    RiskPerTrade,
    FractionalKelly {
        win_rate: f64,
        avg_win: f64,
        avg_loss: f64,
        #[serde(default = "default_kelly_fraction")]
        fraction: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostSection {
    /// Fraction of notional per round trip (0.001 = 0.1%).
    pub commission_pct: f64,
}

impl Default for CostSection {
    fn default() -> Self {
        Self {
            commission_pct: DEFAULT_COMMISSION_PCT,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSourceKind {
    #[default]
    Csv,
    Synthetic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSection {
    pub source: DataSourceKind,
    pub cache_dir: PathBuf,
    /// Generate synthetic data for assets missing from the cache.
    pub synthetic_fallback: bool,
}

impl Default for DataSection {
    fn default() -> Self {
        Self {
            source: DataSourceKind::default(),
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            synthetic_fallback: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSection {
    pub risk_free_rate: f64,
}

impl Default for AnalysisSection {
    fn default() -> Self {
        Self {
            risk_free_rate: DEFAULT_RISK_FREE_RATE,
        }
    }
}

fn default_starting_capital() -> f64 {
    DEFAULT_STARTING_CAPITAL
}

fn default_timeframe() -> String {
    DEFAULT_TIMEFRAME.to_string()
}

fn default_kelly_fraction() -> f64 {
    DEFAULT_KELLY_FRACTION
}

impl BacktestConfig {
    /// Defaults everywhere except the asset list and date range.
    pub fn new(assets: Vec<String>, start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            backtest: BacktestSection {
                assets,
                start_date,
                end_date,
                starting_capital: DEFAULT_STARTING_CAPITAL,
                timeframe: default_timeframe(),
            },
            cointegration: CointegrationSection::default(),
            signals: SignalSection::default(),
            risk: RiskSection::default(),
            costs: CostSection::default(),
            data: DataSection::default(),
            analysis: AnalysisSection::default(),
        }
    }

    /// Read, parse and validate a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let assets = &self.backtest.assets;
        let mut seen = HashSet::new();
        for a in assets {
            if !seen.insert(a.as_str()) {
                return Err(ConfigError::DuplicateAsset(a.clone()));
            }
        }
        if assets.len() < 2 {
            return Err(ConfigError::TooFewAssets {
                count: assets.len(),
            });
        }

        let (start, end) = (self.backtest.start_date, self.backtest.end_date);
        if start >= end {
            return Err(ConfigError::InvalidDateRange { start, end });
        }

        let capital = self.backtest.starting_capital;
        if !(capital.is_finite() && capital > 0.0) {
            return invalid("starting_capital", format!("must be positive, got {capital}"));
        }

        let c = &self.cointegration;
        if !(c.significance > 0.0 && c.significance < 1.0) {
            return invalid(
                "significance",
                format!("must lie strictly between 0 and 1, got {}", c.significance),
            );
        }
        if c.lookback < MIN_CONFIG_LOOKBACK {
            return invalid(
                "lookback",
                format!("must be at least {MIN_CONFIG_LOOKBACK}, got {}", c.lookback),
            );
        }

        SignalGenerator::new(self.signals.entry_threshold, self.signals.exit_threshold)
            .map_err(|e| ConfigError::InvalidValue {
                field: "signals",
                reason: e.to_string(),
            })?;

        let r = &self.risk;
        if !(r.risk_per_trade > 0.0 && r.risk_per_trade <= 1.0) {
            return invalid("risk_per_trade", format!("must lie in (0, 1], got {}", r.risk_per_trade));
        }
        if !(r.max_position_pct > 0.0 && r.max_position_pct <= 100.0) {
            return invalid(
                "max_position_pct",
                format!("must lie in (0, 100], got {}", r.max_position_pct),
            );
        }
        if !(r.max_drawdown_pct > 0.0 && r.max_drawdown_pct <= 100.0) {
            return invalid(
                "max_drawdown_pct",
                format!("must lie in (0, 100], got {}", r.max_drawdown_pct),
            );
        }
        if !(r.stop_loss_pct > 0.0 && r.stop_loss_pct < 1.0) {
            return invalid("stop_loss_pct", format!("must lie in (0, 1), got {}", r.stop_loss_pct));
        }
        if let SizingConfig::FractionalKelly {
            win_rate, fraction, ..
        } = r.sizing
        {
            if !(0.0..=1.0).contains(&win_rate) {
                return invalid("sizing.win_rate", format!("must lie in [0, 1], got {win_rate}"));
            }
            if !(fraction > 0.0 && fraction <= 1.0) {
                return invalid("sizing.fraction", format!("must lie in (0, 1], got {fraction}"));
            }
        }

        let commission = self.costs.commission_pct;
        if !(commission.is_finite() && commission >= 0.0) {
            return invalid("commission_pct", format!("must be non-negative, got {commission}"));
        }
        Ok(())
    }

    /// Engine parameters for this configuration.
    pub fn to_engine_config(&self) -> EngineConfig {
        let limits = RiskParams {
            risk_per_trade: self.risk.risk_per_trade,
            max_position_pct: self.risk.max_position_pct,
        };
        let sizing = match self.risk.sizing {
            SizingConfig::RiskPerTrade => SizingPolicy::RiskPerTrade(limits),
            SizingConfig::FractionalKelly {
                win_rate,
                avg_win,
                avg_loss,
                fraction,
            } => SizingPolicy::FractionalKelly {
                limits,
                win_rate,
                avg_win,
                avg_loss,
                fraction,
            },
        };
        EngineConfig {
            starting_capital: self.backtest.starting_capital,
            lookback: self.cointegration.lookback,
            significance: self.cointegration.significance,
            max_lag: self.cointegration.max_lag,
            entry_threshold: self.signals.entry_threshold,
            exit_threshold: self.signals.exit_threshold,
            commission_pct: self.costs.commission_pct,
            sizing,
            capital_allocation: self.risk.capital_allocation,
        }
    }

    /// Deterministic content hash (BLAKE3 of the JSON form).
    ///
    /// Identical configurations share a hash, so results can be matched to
    /// the settings that produced them.
    pub fn config_hash(&self) -> String {
        // Plain data with string keys: JSON serialization cannot fail.
        let json = serde_json::to_vec(self).unwrap_or_default();
        blake3::hash(&json).to_hex().to_string()
    }

    /// Same configuration restricted to two assets.
    pub fn for_pair(&self, asset1: &str, asset2: &str) -> Self {
        let mut c = self.clone();
        c.backtest.assets = vec![asset1.to_string(), asset2.to_string()];
        c
    }
}

fn invalid<T>(field: &'static str, reason: String) -> Result<T, ConfigError> {
    Err(ConfigError::InvalidValue { field, reason })
}
