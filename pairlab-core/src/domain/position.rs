use super::ids::TradeId;
use super::pair::{PairKey, PositionSide};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Open spread position for one pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub id: TradeId,
    pub pair: PairKey,
    pub side: PositionSide,
    pub entry_date: NaiveDate,
    /// Spread value (`price1 - hedge_ratio * price2`) at entry.
    pub entry_spread: f64,
    /// Currency committed at entry.
    pub notional: f64,
    pub hedge_ratio: f64,
    /// Z-score that triggered the entry.
    pub entry_deviation: f64,
}

impl Position {
    pub fn days_open(&self, as_of: NaiveDate) -> i64 {
        (as_of - self.entry_date).num_days()
    }

    pub fn is_long(&self) -> bool {
        self.side == PositionSide::Long
    }
}
