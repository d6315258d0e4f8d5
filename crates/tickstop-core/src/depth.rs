//! Depth snapshot types.
//!
//! A depth snapshot is a ranked list of price levels per side as the
//! venue publishes it: bids descending, asks ascending. Snapshots are
//! full images of the top of the book, not diffs.

use crate::{Price, Size};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of levels per side kept from each snapshot.
pub const DEFAULT_DEPTH: usize = 5;

/// Book side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookSide {
    Bid,
    Ask,
}

impl fmt::Display for BookSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bid => write!(f, "bid"),
            Self::Ask => write!(f, "ask"),
        }
    }
}

/// One (price, aggregate size) pair at a depth position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceLevel {
    pub price: Price,
    pub size: Size,
}

impl PriceLevel {
    pub fn new(price: Price, size: Size) -> Self {
        Self { price, size }
    }
}

/// Depth snapshot for one instrument.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepthTick {
    /// Bids, best (highest) first.
    pub bids: Vec<PriceLevel>,
    /// Asks, best (lowest) first.
    pub asks: Vec<PriceLevel>,
    /// Venue sequence/version marker.
    pub version: u64,
    /// Server timestamp (ms).
    pub ts: i64,
}

impl DepthTick {
    /// Keep only the top `depth` levels of each side.
    pub fn truncate(&mut self, depth: usize) {
        self.bids.truncate(depth);
        self.asks.truncate(depth);
    }

    /// Levels for one side.
    pub fn side(&self, side: BookSide) -> &[PriceLevel] {
        match side {
            BookSide::Bid => &self.bids,
            BookSide::Ask => &self.asks,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn level(px: rust_decimal::Decimal, sz: rust_decimal::Decimal) -> PriceLevel {
        PriceLevel::new(Price::new(px), Size::new(sz))
    }

    #[test]
    fn test_truncate_keeps_best_levels() {
        let mut tick = DepthTick {
            bids: (0..8)
                .map(|i| level(dec!(100) - rust_decimal::Decimal::from(i), dec!(1)))
                .collect(),
            asks: vec![level(dec!(101), dec!(1)), level(dec!(102), dec!(2))],
            version: 7,
            ts: 0,
        };

        tick.truncate(DEFAULT_DEPTH);

        assert_eq!(tick.bids.len(), 5);
        assert_eq!(tick.bids[0].price.inner(), dec!(100));
        assert_eq!(tick.bids[4].price.inner(), dec!(96));
        // Shorter side is untouched
        assert_eq!(tick.asks.len(), 2);
    }

    #[test]
    fn test_default_is_empty() {
        assert!(DepthTick::default().is_empty());
    }
}
