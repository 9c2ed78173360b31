//! Domain types for PairLab

pub mod equity;
pub mod ids;
pub mod pair;
pub mod position;
pub mod price;
pub mod series;
pub mod trade;

pub use equity::{capital_values, EquityPoint};
pub use ids::{DatasetHash, TradeId, TradeIdGen};
pub use pair::{all_pairs, PairKey, PositionSide};
pub use position::Position;
pub use price::PricePoint;
pub use series::{validate_points, PriceSeries, SeriesError};
pub use trade::Trade;

/// Symbol type alias
pub type Symbol = String;
