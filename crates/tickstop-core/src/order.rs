//! Order side and book-order events.

use crate::error::CoreError;
use crate::{BookSide, Instrument, Price, Size};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Order side: buy or sell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn is_buy(&self) -> bool {
        matches!(self, Self::Buy)
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "buy"),
            Self::Sell => write!(f, "sell"),
        }
    }
}

impl FromStr for OrderSide {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "buy" => Ok(Self::Buy),
            "sell" => Ok(Self::Sell),
            other => Err(CoreError::InvalidSide(format!(
                "{other} (pick one of 'buy', 'sell')"
            ))),
        }
    }
}

/// Classification of a book-order event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BookOrderKind {
    BidAdd,
    BidRemove,
    AskAdd,
    AskRemove,
}

impl BookOrderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BidAdd => "bid_add",
            Self::BidRemove => "bid_remove",
            Self::AskAdd => "ask_add",
            Self::AskRemove => "ask_remove",
        }
    }
}

/// One level's addition or removal.
///
/// A size change at an existing price is an addition carrying the new size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookOrder {
    pub instrument: Instrument,
    pub side: BookSide,
    pub is_removal: bool,
    pub price: Price,
    pub size: Size,
}

impl BookOrder {
    pub fn new(
        instrument: Instrument,
        side: BookSide,
        is_removal: bool,
        price: Price,
        size: Size,
    ) -> Self {
        Self {
            instrument,
            side,
            is_removal,
            price,
            size,
        }
    }

    pub fn kind(&self) -> BookOrderKind {
        match (self.side, self.is_removal) {
            (BookSide::Bid, false) => BookOrderKind::BidAdd,
            (BookSide::Bid, true) => BookOrderKind::BidRemove,
            (BookSide::Ask, false) => BookOrderKind::AskAdd,
            (BookSide::Ask, true) => BookOrderKind::AskRemove,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_order_side_parse() {
        assert_eq!("BUY".parse::<OrderSide>().unwrap(), OrderSide::Buy);
        assert_eq!(" sell ".parse::<OrderSide>().unwrap(), OrderSide::Sell);
        assert!("hold".parse::<OrderSide>().is_err());
    }

    #[test]
    fn test_book_order_kind() {
        let cp: Instrument = "eth_usdt".parse().unwrap();
        let px = Price::new(dec!(10));
        let sz = Size::new(dec!(1));

        let cases = [
            (BookSide::Bid, false, BookOrderKind::BidAdd),
            (BookSide::Bid, true, BookOrderKind::BidRemove),
            (BookSide::Ask, false, BookOrderKind::AskAdd),
            (BookSide::Ask, true, BookOrderKind::AskRemove),
        ];
        for (side, is_removal, expected) in cases {
            let o = BookOrder::new(cp.clone(), side, is_removal, px, sz);
            assert_eq!(o.kind(), expected);
        }
    }
}
