use serde::{Deserialize, Serialize};
use std::fmt;

/// Sequential trade identifier, assigned when a position opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TradeId(pub u64);

impl fmt::Display for TradeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{:06}", self.0)
    }
}

/// Monotonic trade ID generator owned by the engine.
#[derive(Debug, Default)]
pub struct TradeIdGen {
    next: u64,
}

impl TradeIdGen {
    pub fn next_id(&mut self) -> TradeId {
        self.next += 1;
        TradeId(self.next)
    }
}

/// Deterministic dataset hash (BLAKE3 over the price data a run consumed)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatasetHash(pub String);

impl DatasetHash {
    pub fn from_hash(hash: &str) -> Self {
        Self(hash.to_string())
    }
}

impl fmt::Display for DatasetHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_sequential_from_one() {
        let mut gen = TradeIdGen::default();
        assert_eq!(gen.next_id(), TradeId(1));
        assert_eq!(gen.next_id(), TradeId(2));
    }

    #[test]
    fn trade_id_display_is_padded() {
        assert_eq!(TradeId(42).to_string(), "T000042");
    }
}
