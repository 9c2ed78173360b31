//! Pair identity and spread position side.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordered pair of asset identifiers.
///
/// `asset1` is the reference leg; `asset2` is scaled by the hedge ratio.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PairKey {
    pub asset1: String,
    pub asset2: String,
}

impl PairKey {
    pub fn new(asset1: impl Into<String>, asset2: impl Into<String>) -> Self {
        Self {
            asset1: asset1.into(),
            asset2: asset2.into(),
        }
    }
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.asset1, self.asset2)
    }
}

/// Every unordered pair `(assets[i], assets[j])` with `i < j`, in enumeration order.
pub fn all_pairs(assets: &[String]) -> Vec<PairKey> {
    let mut pairs = Vec::with_capacity(assets.len() * assets.len().saturating_sub(1) / 2);
    for i in 0..assets.len() {
        for j in (i + 1)..assets.len() {
            pairs.push(PairKey::new(assets[i].clone(), assets[j].clone()));
        }
    }
    pairs
}

/// Direction of a spread position.
///
/// Long spread = long asset1, short `hedge_ratio` units of asset2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PositionSide {
    Long,
    Short,
}

impl PositionSide {
    /// +1 for Long, -1 for Short.
    pub fn sign(self) -> f64 {
        match self {
            PositionSide::Long => 1.0,
            PositionSide::Short => -1.0,
        }
    }
}

impl fmt::Display for PositionSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PositionSide::Long => write!(f, "LONG"),
            PositionSide::Short => write!(f, "SHORT"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assets(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn pair_display() {
        assert_eq!(PairKey::new("BTC", "ETH").to_string(), "BTC/ETH");
    }

    #[test]
    fn all_pairs_enumeration_order() {
        let pairs = all_pairs(&assets(&["A", "B", "C"]));
        let names: Vec<String> = pairs.iter().map(|p| p.to_string()).collect();
        assert_eq!(names, vec!["A/B", "A/C", "B/C"]);
    }

    #[test]
    fn all_pairs_count() {
        assert_eq!(all_pairs(&assets(&["A", "B", "C", "D", "E"])).len(), 10);
        assert!(all_pairs(&assets(&["A"])).is_empty());
        assert!(all_pairs(&[]).is_empty());
    }

    #[test]
    fn side_sign() {
        assert_eq!(PositionSide::Long.sign(), 1.0);
        assert_eq!(PositionSide::Short.sign(), -1.0);
        assert_eq!(PositionSide::Short.to_string(), "SHORT");
    }
}
