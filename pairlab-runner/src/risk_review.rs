//! Post-run review of the configured risk limits.
//!
//! The engine does not enforce drawdown or stop-loss limits. This module
//! replays the equity curve and trade log and reports where they were crossed.

use chrono::NaiveDate;
use pairlab_core::domain::{EquityPoint, PairKey, Trade, TradeId};
use pairlab_core::risk::DrawdownMonitor;
use serde::{Deserialize, Serialize};

/// First date the drawdown limit was exceeded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawdownBreach {
    pub date: NaiveDate,
    pub drawdown_pct: f64,
    pub peak_capital: f64,
}

/// A closed trade that lost more than the stop-loss fraction of its notional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopLossBreach {
    pub trade_id: TradeId,
    pub pair: PairKey,
    pub exit_date: NaiveDate,
    pub return_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskReview {
    pub max_drawdown_limit_pct: f64,
    pub worst_drawdown_pct: f64,
    pub drawdown_breach: Option<DrawdownBreach>,
    pub stop_loss_limit_pct: f64,
    pub stop_loss_breaches: Vec<StopLossBreach>,
}

impl RiskReview {
    pub fn is_clean(&self) -> bool {
        self.drawdown_breach.is_none() && self.stop_loss_breaches.is_empty()
    }
}

/// Check a finished run against a drawdown limit (percent) and a per-trade
/// stop loss (fraction of notional).
pub fn review_risk(
    trades: &[Trade],
    equity_curve: &[EquityPoint],
    max_drawdown_pct: f64,
    stop_loss_pct: f64,
) -> RiskReview {
    let mut monitor = DrawdownMonitor::new(max_drawdown_pct);
    let mut worst = 0.0_f64;
    let mut breach = None;
    for point in equity_curve {
        let status = monitor.observe(point.capital);
        worst = worst.max(status.drawdown_pct);
        if status.exceeded && breach.is_none() {
            breach = Some(DrawdownBreach {
                date: point.date,
                drawdown_pct: status.drawdown_pct,
                peak_capital: status.peak_capital,
            });
        }
    }

    let stop_loss_limit_pct = stop_loss_pct * 100.0;
    let stop_loss_breaches = trades
        .iter()
        .filter(|t| t.return_pct < -stop_loss_limit_pct)
        .map(|t| StopLossBreach {
            trade_id: t.id,
            pair: t.pair.clone(),
            exit_date: t.exit_date,
            return_pct: t.return_pct,
        })
        .collect();

    RiskReview {
        max_drawdown_limit_pct: max_drawdown_pct,
        worst_drawdown_pct: worst,
        drawdown_breach: breach,
        stop_loss_limit_pct,
        stop_loss_breaches,
    }
}
