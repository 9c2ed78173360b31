//! Risk sizing and trade-level risk checks.
//!
//! The engine only consumes [`SizingPolicy`]. The remaining helpers (stop
//! levels, Kelly fraction, drawdown monitor, trade validation) are
//! standalone tools for research and reporting.

use crate::domain::PositionSide;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_RISK_PER_TRADE: f64 = 0.02;
pub const DEFAULT_MAX_POSITION_PCT: f64 = 10.0;

/// Share of the full Kelly fraction used by the fractional-Kelly policy.
pub const DEFAULT_KELLY_FRACTION: f64 = 0.25;

/// Core sizing limits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskParams {
    /// Fraction of capital committed per trade (0.02 = 2%).
    pub risk_per_trade: f64,
    /// Hard cap on a single position, in percent of capital.
    pub max_position_pct: f64,
}

impl Default for RiskParams {
    fn default() -> Self {
        Self {
            risk_per_trade: DEFAULT_RISK_PER_TRADE,
            max_position_pct: DEFAULT_MAX_POSITION_PCT,
        }
    }
}

impl RiskParams {
    /// Largest notional allowed at `capital`.
    pub fn max_position(&self, capital: f64) -> f64 {
        capital * self.max_position_pct / 100.0
    }

    /// `min(capital * risk_per_trade, capital * max_position_pct / 100)`.
    pub fn position_size(&self, capital: f64) -> f64 {
        if capital <= 0.0 {
            return 0.0;
        }
        (capital * self.risk_per_trade).min(self.max_position(capital))
    }
}

/// How the engine turns capital into a position notional.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SizingPolicy {
    /// Fixed fraction of capital, capped by `max_position_pct`.
    RiskPerTrade(RiskParams),
    /// Fraction of the Kelly bet implied by historical trade statistics,
    /// capped by `max_position_pct`.
    FractionalKelly {
        limits: RiskParams,
        win_rate: f64,
        avg_win: f64,
        avg_loss: f64,
        fraction: f64,
    },
}

impl Default for SizingPolicy {
    fn default() -> Self {
        SizingPolicy::RiskPerTrade(RiskParams::default())
    }
}

impl SizingPolicy {
    pub fn position_size(&self, capital: f64) -> f64 {
        match *self {
            SizingPolicy::RiskPerTrade(params) => params.position_size(capital),
            SizingPolicy::FractionalKelly {
                limits,
                win_rate,
                avg_win,
                avg_loss,
                fraction,
            } => {
                if capital <= 0.0 {
                    return 0.0;
                }
                let kelly = kelly_fraction(win_rate, avg_win, avg_loss);
                (capital * kelly * fraction).min(limits.max_position(capital))
            }
        }
    }

    pub fn limits(&self) -> RiskParams {
        match *self {
            SizingPolicy::RiskPerTrade(params) => params,
            SizingPolicy::FractionalKelly { limits, .. } => limits,
        }
    }
}

/// Full Kelly fraction `(p * W - (1 - p) * L) / W`, floored at zero.
///
/// `avg_loss` is a positive magnitude. Zero when `avg_win` is zero.
pub fn kelly_fraction(win_rate: f64, avg_win: f64, avg_loss: f64) -> f64 {
    if avg_win == 0.0 {
        return 0.0;
    }
    let kelly = (win_rate * avg_win - (1.0 - win_rate) * avg_loss) / avg_win;
    kelly.max(0.0)
}

/// Stop level `stop_pct` away from `entry`, on the losing side.
pub fn stop_loss_price(entry: f64, side: PositionSide, stop_pct: f64) -> f64 {
    match side {
        PositionSide::Long => entry * (1.0 - stop_pct),
        PositionSide::Short => entry * (1.0 + stop_pct),
    }
}

pub fn stop_loss_hit(current: f64, entry: f64, side: PositionSide, stop_pct: f64) -> bool {
    let stop = stop_loss_price(entry, side, stop_pct);
    match side {
        PositionSide::Long => current <= stop,
        PositionSide::Short => current >= stop,
    }
}

/// `|take_profit - entry| / |entry - stop|`, or 0 when the stop sits at entry.
pub fn risk_reward_ratio(entry: f64, stop: f64, take_profit: f64) -> f64 {
    let risk = (entry - stop).abs();
    if risk == 0.0 {
        return 0.0;
    }
    (take_profit - entry).abs() / risk
}

// ─── Drawdown monitor ───────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DrawdownStatus {
    /// Fractional decline from the peak.
    pub drawdown: f64,
    pub drawdown_pct: f64,
    pub peak_capital: f64,
    pub exceeded: bool,
}

/// Tracks peak capital and reports drawdown against a percent limit.
#[derive(Debug, Clone)]
pub struct DrawdownMonitor {
    max_drawdown_pct: f64,
    peak: Option<f64>,
}

impl DrawdownMonitor {
    pub fn new(max_drawdown_pct: f64) -> Self {
        Self {
            max_drawdown_pct,
            peak: None,
        }
    }

    pub fn peak(&self) -> Option<f64> {
        self.peak
    }

    pub fn observe(&mut self, capital: f64) -> DrawdownStatus {
        let peak = match self.peak {
            Some(p) if p >= capital => p,
            _ => capital,
        };
        self.peak = Some(peak);
        let drawdown = if peak > 0.0 { (peak - capital) / peak } else { 0.0 };
        let drawdown_pct = drawdown * 100.0;
        DrawdownStatus {
            drawdown,
            drawdown_pct,
            peak_capital: peak,
            exceeded: drawdown_pct > self.max_drawdown_pct,
        }
    }
}

// ─── Trade validation ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum TradeIssue {
    PositionTooLarge { size: f64, max: f64 },
    PoorRiskReward { ratio: f64 },
    StopTooWide { stop_pct: f64 },
}

impl fmt::Display for TradeIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeIssue::PositionTooLarge { size, max } => {
                write!(f, "position size {size:.2} exceeds max {max:.2}")
            }
            TradeIssue::PoorRiskReward { ratio } => {
                write!(f, "risk-reward ratio {ratio:.2} is less than 1.0")
            }
            TradeIssue::StopTooWide { stop_pct } => {
                write!(f, "stop loss {stop_pct:.2}% is too wide")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TradeValidation {
    pub risk_reward_ratio: f64,
    pub issues: Vec<TradeIssue>,
}

impl TradeValidation {
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Pre-trade sanity checks.
///
/// A stop is "too wide" when its distance exceeds twice `stop_loss_pct`
/// (expressed in percent of entry).
pub fn validate_trade(
    params: &RiskParams,
    stop_loss_pct: f64,
    entry: f64,
    stop: f64,
    take_profit: f64,
    position_size: f64,
    capital: f64,
) -> TradeValidation {
    let mut issues = Vec::new();

    let max = params.max_position(capital);
    if position_size > max {
        issues.push(TradeIssue::PositionTooLarge {
            size: position_size,
            max,
        });
    }

    let ratio = risk_reward_ratio(entry, stop, take_profit);
    if ratio < 1.0 {
        issues.push(TradeIssue::PoorRiskReward { ratio });
    }

    if entry != 0.0 {
        let stop_pct = (entry - stop).abs() / entry.abs() * 100.0;
        if stop_pct > stop_loss_pct * 200.0 {
            issues.push(TradeIssue::StopTooWide { stop_pct });
        }
    }

    TradeValidation {
        risk_reward_ratio: ratio,
        issues,
    }
}
