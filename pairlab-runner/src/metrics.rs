//! Performance metrics: pure functions over a trade log and an equity curve.
//!
//! Every metric is a pure function: trades and/or capital samples in, scalar
//! out. No dependency on the engine, the loader or the runner.

use pairlab_core::domain::{capital_values, EquityPoint, Trade};
use pairlab_core::stats::{mean, population_std};
use serde::{Deserialize, Serialize};

pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;
pub const DEFAULT_RISK_FREE_RATE: f64 = 0.02;

/// Stand-in denominator for the profit factor when nothing was lost.
const ZERO_LOSS_DENOMINATOR: f64 = 0.01;

/// Aggregate statistics for one backtest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    // ── Trades ──
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub win_rate: f64,
    pub loss_rate: f64,
    pub total_pnl: f64,
    pub avg_pnl_per_trade: f64,
    pub largest_win: f64,
    /// Most negative trade P&L (0 without losers).
    pub largest_loss: f64,
    pub avg_win: f64,
    /// Positive magnitude.
    pub avg_loss: f64,
    pub max_consecutive_wins: usize,
    pub max_consecutive_losses: usize,
    pub gross_profit: f64,
    pub gross_loss: f64,

    // ── Capital and returns ──
    pub starting_capital: f64,
    pub final_capital: f64,
    pub total_return: f64,
    pub total_return_pct: f64,
    pub annualized_return: f64,
    pub annualized_return_pct: f64,
    pub daily_avg_return: f64,

    // ── Risk ──
    /// Negative fraction, e.g. -0.15 for a 15% drawdown.
    pub max_drawdown: f64,
    /// Positive percentage magnitude of `max_drawdown`.
    pub max_drawdown_pct: f64,
    pub daily_volatility: f64,
    pub annual_volatility: f64,

    // ── Ratios ──
    pub sharpe_ratio: f64,
    pub calmar_ratio: f64,
    pub profit_factor: f64,
}

impl PerformanceMetrics {
    /// Compute everything from one run's output.
    ///
    /// An empty trade log yields zeros everywhere except the two capital
    /// fields.
    pub fn compute(
        trades: &[Trade],
        equity_curve: &[EquityPoint],
        starting_capital: f64,
        risk_free_rate: f64,
    ) -> Self {
        let final_capital = equity_curve
            .last()
            .map(|p| p.capital)
            .unwrap_or(starting_capital);
        if trades.is_empty() {
            return Self {
                starting_capital,
                final_capital,
                ..Self::default()
            };
        }

        let capital = capital_values(equity_curve);
        let pnl: Vec<f64> = trades.iter().map(|t| t.net_pnl).collect();
        let winners: Vec<f64> = pnl.iter().copied().filter(|p| *p > 0.0).collect();
        let losers: Vec<f64> = pnl.iter().copied().filter(|p| *p < 0.0).collect();
        let n = pnl.len() as f64;

        let total = total_return(starting_capital, final_capital);
        let annualized = annualized_return(total, capital.len());
        let daily_vol = daily_volatility(&capital);
        let annual_vol = daily_vol * TRADING_DAYS_PER_YEAR.sqrt();
        let dd = max_drawdown(&capital);
        let dd_pct = dd.abs() * 100.0;

        Self {
            total_trades: pnl.len(),
            winning_trades: winners.len(),
            losing_trades: losers.len(),
            win_rate: winners.len() as f64 / n,
            loss_rate: losers.len() as f64 / n,
            total_pnl: pnl.iter().sum(),
            avg_pnl_per_trade: mean(&pnl),
            largest_win: if winners.is_empty() { 0.0 } else { max_of(&pnl) },
            largest_loss: if losers.is_empty() { 0.0 } else { min_of(&pnl) },
            avg_win: mean(&winners),
            avg_loss: mean(&losers).abs(),
            max_consecutive_wins: longest_streak(&pnl, |p| p > 0.0),
            max_consecutive_losses: longest_streak(&pnl, |p| p < 0.0),
            gross_profit: winners.iter().sum(),
            gross_loss: losers.iter().sum::<f64>().abs(),

            starting_capital,
            final_capital,
            total_return: total,
            total_return_pct: total * 100.0,
            annualized_return: annualized,
            annualized_return_pct: annualized * 100.0,
            daily_avg_return: mean(&daily_returns(&capital)),

            max_drawdown: dd,
            max_drawdown_pct: dd_pct,
            daily_volatility: daily_vol,
            annual_volatility: annual_vol,

            sharpe_ratio: sharpe_ratio(&capital, risk_free_rate),
            calmar_ratio: calmar_ratio(annualized, dd_pct),
            profit_factor: profit_factor(&pnl),
        }
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// `(final - start) / start`, 0 for a non-positive start.
pub fn total_return(starting_capital: f64, final_capital: f64) -> f64 {
    if starting_capital <= 0.0 {
        return 0.0;
    }
    (final_capital - starting_capital) / starting_capital
}

/// `(1 + total)^(252 / days) - 1`.
///
/// Returns 0 without samples and -1 once capital is wiped out.
pub fn annualized_return(total_return: f64, days: usize) -> f64 {
    if days == 0 {
        return 0.0;
    }
    let growth = 1.0 + total_return;
    if growth <= 0.0 {
        return -1.0;
    }
    growth.powf(TRADING_DAYS_PER_YEAR / days as f64) - 1.0
}

/// Simple returns between consecutive samples.
pub fn daily_returns(capital: &[f64]) -> Vec<f64> {
    capital
        .windows(2)
        .map(|w| if w[0] > 0.0 { (w[1] - w[0]) / w[0] } else { 0.0 })
        .collect()
}

/// Population standard deviation of daily returns.
pub fn daily_volatility(capital: &[f64]) -> f64 {
    population_std(&daily_returns(capital))
}

/// Most negative `(capital - running_peak) / running_peak`, as a fraction.
pub fn max_drawdown(capital: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut worst = 0.0_f64;
    for &c in capital {
        peak = peak.max(c);
        if peak > 0.0 {
            worst = worst.min((c - peak) / peak);
        }
    }
    worst
}

/// `(mean_daily * 252 - rf) / (daily_std * sqrt(252))`, 0 without volatility.
pub fn sharpe_ratio(capital: &[f64], risk_free_rate: f64) -> f64 {
    let returns = daily_returns(capital);
    let annual_vol = population_std(&returns) * TRADING_DAYS_PER_YEAR.sqrt();
    if annual_vol == 0.0 {
        return 0.0;
    }
    (mean(&returns) * TRADING_DAYS_PER_YEAR - risk_free_rate) / annual_vol
}

/// Annualized return over the drawdown magnitude, 0 without drawdown.
pub fn calmar_ratio(annualized_return: f64, max_drawdown_pct: f64) -> f64 {
    if max_drawdown_pct == 0.0 {
        return 0.0;
    }
    annualized_return / (max_drawdown_pct / 100.0)
}

/// Gross profit over gross loss.
///
/// With no losses the loss is taken as 0.01, so a profitable loss-free log
/// scores `gross_profit * 100`. Nothing won and nothing lost scores 0.
pub fn profit_factor(pnl: &[f64]) -> f64 {
    let gross_profit: f64 = pnl.iter().filter(|p| **p > 0.0).sum();
    let gross_loss: f64 = pnl.iter().filter(|p| **p < 0.0).sum::<f64>().abs();
    if gross_loss == 0.0 {
        return if gross_profit > 0.0 {
            gross_profit / ZERO_LOSS_DENOMINATOR
        } else {
            0.0
        };
    }
    gross_profit / gross_loss
}

/// Longest run of consecutive values satisfying `pred`. Anything else,
/// including exactly zero for both win and loss predicates, resets the run.
pub fn longest_streak(pnl: &[f64], pred: impl Fn(f64) -> bool) -> usize {
    let mut best = 0;
    let mut current = 0;
    for &p in pnl {
        if pred(p) {
            current += 1;
            best = best.max(current);
        } else {
            current = 0;
        }
    }
    best
}

// ─── Helpers ────────────────────────────────────────────────────────

fn max_of(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

fn min_of(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::INFINITY, f64::min)
}
