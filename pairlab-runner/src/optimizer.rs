//! Pair optimizer and cointegration screen.
//!
//! Both fan out over independent pairs on the rayon pool. Each backtest owns
//! its capital; nothing is shared between pairs.

use pairlab_core::domain::{all_pairs, PairKey};
use pairlab_core::engine::NullObserver;
use pairlab_core::relationship::RelationshipTester;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::BacktestConfig;
use crate::data_loader::LoadedData;
use crate::runner::run_backtest;

/// Headline metrics for one pair traded in isolation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairRanking {
    pub pair: PairKey,
    pub total_trades: usize,
    pub win_rate: f64,
    pub total_return_pct: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown_pct: f64,
    pub profit_factor: f64,
    pub annualized_return_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairFailure {
    pub pair: PairKey,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptimizerReport {
    /// Best Sharpe first.
    pub rankings: Vec<PairRanking>,
    pub failures: Vec<PairFailure>,
}

impl OptimizerReport {
    pub fn best(&self) -> Option<&PairRanking> {
        self.rankings.first()
    }

    pub fn top(&self, n: usize) -> &[PairRanking] {
        &self.rankings[..n.min(self.rankings.len())]
    }
}

/// Backtest every candidate pair on its own and rank by Sharpe ratio.
///
/// `None` means every pair of the loaded symbols. Pairs whose backtest fails
/// are logged and listed in `failures`.
pub fn optimize_pairs(
    config: &BacktestConfig,
    loaded: &LoadedData,
    candidates: Option<&[PairKey]>,
) -> OptimizerReport {
    let pairs = match candidates {
        Some(c) => c.to_vec(),
        None => all_pairs(loaded.symbols()),
    };
    info!(pairs = pairs.len(), "optimizing pairs");

    let outcomes: Vec<Result<PairRanking, PairFailure>> = pairs
        .par_iter()
        .map(|pair| {
            let pair_config = config.for_pair(&pair.asset1, &pair.asset2);
            match run_backtest(&pair_config, loaded, &mut NullObserver) {
                Ok(result) => {
                    let m = &result.metrics;
                    info!(
                        pair = %pair,
                        trades = m.total_trades,
                        sharpe = m.sharpe_ratio,
                        return_pct = m.total_return_pct,
                        "pair evaluated"
                    );
                    Ok(PairRanking {
                        pair: pair.clone(),
                        total_trades: m.total_trades,
                        win_rate: m.win_rate,
                        total_return_pct: m.total_return_pct,
                        sharpe_ratio: m.sharpe_ratio,
                        max_drawdown_pct: m.max_drawdown_pct,
                        profit_factor: m.profit_factor,
                        annualized_return_pct: m.annualized_return_pct,
                    })
                }
                Err(e) => {
                    warn!(pair = %pair, error = %e, "pair backtest failed");
                    Err(PairFailure {
                        pair: pair.clone(),
                        error: e.to_string(),
                    })
                }
            }
        })
        .collect();

    let mut report = OptimizerReport::default();
    for outcome in outcomes {
        match outcome {
            Ok(r) => report.rankings.push(r),
            Err(f) => report.failures.push(f),
        }
    }
    // Stable: ties keep enumeration order.
    report
        .rankings
        .sort_by(|a, b| b.sharpe_ratio.total_cmp(&a.sharpe_ratio));
    report
}

/// Full-window relationship test for one pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairScreen {
    pub pair: PairKey,
    pub hedge_ratio: f64,
    pub p_value: Option<f64>,
    pub cointegrated: bool,
    pub half_life: Option<f64>,
    /// Why the test could not run, if it could not.
    pub failure: Option<String>,
}

/// Test every pair of the loaded symbols over all the dates the two share.
///
/// Sorted by p-value ascending; untestable pairs last.
pub fn screen_pairs(
    loaded: &LoadedData,
    significance: f64,
    max_lag: Option<usize>,
) -> Vec<PairScreen> {
    let tester = RelationshipTester::new(significance, max_lag);

    let mut screens: Vec<PairScreen> = all_pairs(loaded.symbols())
        .par_iter()
        .filter_map(|pair| {
            let aligned = loaded.align_symbols(&[pair.asset1.clone(), pair.asset2.clone()]);
            let p1 = aligned.closes_for(&pair.asset1)?;
            let p2 = aligned.closes_for(&pair.asset2)?;
            if aligned.is_empty() {
                warn!(pair = %pair, "pair shares no dates");
                return None;
            }
            match tester.test_relationship(p1, p2, aligned.len()) {
                Ok(r) => Some(PairScreen {
                    pair: pair.clone(),
                    hedge_ratio: r.hedge.hedge_ratio,
                    p_value: r.p_value(),
                    cointegrated: r.cointegrated,
                    half_life: r.half_life,
                    failure: r.failure().map(|f| f.to_string()),
                }),
                Err(e) => {
                    warn!(pair = %pair, error = %e, "pair cannot be screened");
                    None
                }
            }
        })
        .collect();

    screens.sort_by(|a, b| match (a.p_value, b.p_value) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
    screens
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pairlab_core::data::{cointegrated_pair, DataSource, SyntheticProvider};

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 1, 1).unwrap()
    }

    /// A and B are linked; C is an unrelated walk.
    fn three_assets() -> LoadedData {
        let (a, b) = cointegrated_pair("A", "B", start(), 300, 2.0, 1.0).unwrap();
        let c = SyntheticProvider::default().generate("C", start(), 300).unwrap();
        LoadedData::from_series(
            vec![
                (a, DataSource::Synthetic),
                (b, DataSource::Synthetic),
                (c, DataSource::Synthetic),
            ],
            Vec::new(),
        )
        .unwrap()
    }

    fn config() -> BacktestConfig {
        let mut c = BacktestConfig::new(
            vec!["A".into(), "B".into(), "C".into()],
            start(),
            NaiveDate::from_ymd_opt(2023, 10, 27).unwrap(),
        );
        c.cointegration.lookback = 60;
        c
    }

    #[test]
    fn every_pair_is_ranked_by_sharpe() {
        let report = optimize_pairs(&config(), &three_assets(), None);
        assert_eq!(report.rankings.len() + report.failures.len(), 3);
        assert!(report.failures.is_empty());
        for w in report.rankings.windows(2) {
            assert!(w[0].sharpe_ratio >= w[1].sharpe_ratio);
        }
        assert!(report.best().is_some());
        assert_eq!(report.top(10).len(), 3);
    }

    #[test]
    fn explicit_candidates_restrict_the_search() {
        let only = [PairKey::new("A", "B")];
        let report = optimize_pairs(&config(), &three_assets(), Some(&only));
        assert_eq!(report.rankings.len(), 1);
        assert_eq!(report.rankings[0].pair, only[0]);
    }

    #[test]
    fn unknown_asset_becomes_a_failure() {
        let only = [PairKey::new("A", "Q")];
        let report = optimize_pairs(&config(), &three_assets(), Some(&only));
        assert!(report.rankings.is_empty());
        assert_eq!(report.failures.len(), 1);
    }

    #[test]
    fn screen_puts_the_linked_pair_first() {
        let screens = screen_pairs(&three_assets(), 0.05, None);
        assert_eq!(screens.len(), 3);
        assert_eq!(screens[0].pair, PairKey::new("A", "B"));
        assert!(screens[0].cointegrated);
        assert!((screens[0].hedge_ratio - 2.0).abs() < 0.1);
    }

    #[test]
    fn late_starting_asset_leaves_other_pairs_whole() {
        let (a, b) = cointegrated_pair("A", "B", start(), 300, 2.0, 1.0).unwrap();
        let c = SyntheticProvider::default()
            .generate("C", start() + chrono::Duration::days(200), 100)
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

        let only = [PairKey::new("A", "B")];
        let report = optimize_pairs(&config(), &loaded, Some(&only));
        assert_eq!(report.rankings.len(), 1);
        let alone = config().for_pair("A", "B");
        let full = run_backtest(&alone, &loaded, &mut NullObserver).unwrap();
        assert_eq!(full.dates_simulated(), 300);
        assert_eq!(report.rankings[0].total_trades, full.metrics.total_trades);

        let screens = screen_pairs(&loaded, 0.05, None);
        let ab = screens.iter().find(|s| s.pair == PairKey::new("A", "B")).unwrap();
        assert!(ab.cointegrated);
        assert!((ab.hedge_ratio - 2.0).abs() < 0.1);
    }
}
