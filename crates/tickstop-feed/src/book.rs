//! Order-book projection.
//!
//! Rebuilds a top-of-book view from book-order events. Each side is an
//! ordered map keyed by price and capped at a fixed number of levels; the
//! worst level is evicted when the cap is exceeded.

use std::collections::BTreeMap;
use tickstop_core::{BookOrder, BookSide, Price, PriceLevel, Size};

/// Levels kept per side.
pub const DEFAULT_BOOK_CAPACITY: usize = 10;

/// Which best prices an event moved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BestChange {
    pub bid: bool,
    pub ask: bool,
}

#[derive(Debug, Clone)]
pub struct OrderBook {
    capacity: usize,
    bids: BTreeMap<Price, Size>,
    asks: BTreeMap<Price, Size>,
}

impl Default for OrderBook {
    fn default() -> Self {
        Self::new(DEFAULT_BOOK_CAPACITY)
    }
}

impl OrderBook {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
        }
    }

    /// Apply one event and report whether the best bid or best ask price
    /// changed.
    ///
    /// An addition with zero size is treated as a removal.
    pub fn apply(&mut self, order: &BookOrder) -> BestChange {
        let bid_before = self.best_bid().map(|l| l.price);
        let ask_before = self.best_ask().map(|l| l.price);

        let levels = match order.side {
            BookSide::Bid => &mut self.bids,
            BookSide::Ask => &mut self.asks,
        };
        if order.is_removal || order.size.is_zero() {
            levels.remove(&order.price);
        } else {
            levels.insert(order.price, order.size);
            self.evict(order.side);
        }

        BestChange {
            bid: bid_before != self.best_bid().map(|l| l.price),
            ask: ask_before != self.best_ask().map(|l| l.price),
        }
    }

    fn evict(&mut self, side: BookSide) {
        match side {
            BookSide::Bid => {
                while self.bids.len() > self.capacity {
                    self.bids.pop_first();
                }
            }
            BookSide::Ask => {
                while self.asks.len() > self.capacity {
                    self.asks.pop_last();
                }
            }
        }
    }

    /// Highest bid.
    pub fn best_bid(&self) -> Option<PriceLevel> {
        self.bids
            .last_key_value()
            .map(|(price, size)| PriceLevel::new(*price, *size))
    }

    /// Lowest ask.
    pub fn best_ask(&self) -> Option<PriceLevel> {
        self.asks
            .first_key_value()
            .map(|(price, size)| PriceLevel::new(*price, *size))
    }

    /// Levels on one side, best first.
    pub fn levels(&self, side: BookSide) -> Vec<PriceLevel> {
        let to_level = |(price, size): (&Price, &Size)| PriceLevel::new(*price, *size);
        match side {
            BookSide::Bid => self.bids.iter().rev().map(to_level).collect(),
            BookSide::Ask => self.asks.iter().map(to_level).collect(),
        }
    }

    /// Both sides have at least one level.
    pub fn is_ready(&self) -> bool {
        !self.bids.is_empty() && !self.asks.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
