//! Trade settlement: turns a closed position into realized P&L.

use crate::domain::{Position, Trade};
use chrono::NaiveDate;

/// P&L breakdown for one round trip.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Settlement {
    /// `(exit - entry) / |entry|`, or 0 when the entry spread is 0.
    pub spread_change: f64,
    pub gross_pnl: f64,
    pub fees: f64,
    pub net_pnl: f64,
    /// Net P&L as a percentage of notional.
    pub return_pct: f64,
    /// Set when the entry spread was exactly zero.
    pub zero_entry: bool,
}

/// Settle a position at `exit_spread`.
///
/// Long profits when the spread rises, Short when it falls. Commission is
/// `notional * commission_pct`, charged once per round trip.
pub fn settle(position: &Position, exit_spread: f64, commission_pct: f64) -> Settlement {
    let zero_entry = position.entry_spread == 0.0;
    let spread_change = if zero_entry {
        0.0
    } else {
        (exit_spread - position.entry_spread) / position.entry_spread.abs()
    };
    let gross_pnl = position.side.sign() * position.notional * spread_change;
    let fees = position.notional * commission_pct;
    let net_pnl = gross_pnl - fees;
    let return_pct = if position.notional > 0.0 {
        net_pnl / position.notional * 100.0
    } else {
        0.0
    };
    Settlement {
        spread_change,
        gross_pnl,
        fees,
        net_pnl,
        return_pct,
        zero_entry,
    }
}

/// Convert an open position into an immutable trade record.
pub fn close_position(
    position: Position,
    exit_date: NaiveDate,
    exit_spread: f64,
    exit_deviation: f64,
    commission_pct: f64,
) -> (Trade, Settlement) {
    let s = settle(&position, exit_spread, commission_pct);
    let days_held = position.days_open(exit_date);
    let trade = Trade {
        id: position.id,
        pair: position.pair,
        side: position.side,
        entry_date: position.entry_date,
        entry_spread: position.entry_spread,
        entry_deviation: position.entry_deviation,
        exit_date,
        exit_spread,
        exit_deviation,
        notional: position.notional,
        hedge_ratio: position.hedge_ratio,
        gross_pnl: s.gross_pnl,
        fees: s.fees,
        net_pnl: s.net_pnl,
        return_pct: s.return_pct,
        days_held,
    };
    (trade, s)
}
