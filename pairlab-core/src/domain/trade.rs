//! A closed spread position with realized P&L.

use super::ids::TradeId;
use super::pair::{PairKey, PositionSide};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A complete round trip: entry → exit. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    // ── Identification ──
    pub id: TradeId,
    pub pair: PairKey,
    pub side: PositionSide,

    // ── Entry ──
    pub entry_date: NaiveDate,
    pub entry_spread: f64,
    pub entry_deviation: f64,

    // ── Exit ──
    pub exit_date: NaiveDate,
    pub exit_spread: f64,
    pub exit_deviation: f64,

    // ── Size ──
    pub notional: f64,
    pub hedge_ratio: f64,

    // ── PnL ──
    pub gross_pnl: f64,
    pub fees: f64,
    pub net_pnl: f64,
    /// Net P&L as a percentage of notional.
    pub return_pct: f64,

    // ── Duration ──
    pub days_held: i64,
}

impl Trade {
    pub fn is_winner(&self) -> bool {
        self.net_pnl > 0.0
    }

    pub fn is_loser(&self) -> bool {
        self.net_pnl < 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_trade() -> Trade {
        Trade {
            id: TradeId(1),
            pair: PairKey::new("BTC/USDT", "ETH/USDT"),
            side: PositionSide::Long,
            entry_date: NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
            entry_spread: 120.0,
            entry_deviation: -2.4,
            exit_date: NaiveDate::from_ymd_opt(2024, 1, 11).unwrap(),
            exit_spread: 132.0,
            exit_deviation: -0.2,
            notional: 200.0,
            hedge_ratio: 19.5,
            gross_pnl: 20.0,
            fees: 0.2,
            net_pnl: 19.8,
            return_pct: 9.9,
            days_held: 6,
        }
    }

    #[test]
    fn winner_and_loser() {
        let mut t = sample_trade();
        assert!(t.is_winner());
        assert!(!t.is_loser());
        t.net_pnl = 0.0;
        assert!(!t.is_winner());
        assert!(!t.is_loser());
    }

    #[test]
    fn trade_serialization_roundtrip() {
        let trade = sample_trade();
        let json = serde_json::to_string(&trade).unwrap();
        let deser: Trade = serde_json::from_str(&json).unwrap();
        assert_eq!(trade, deser);
    }
}
