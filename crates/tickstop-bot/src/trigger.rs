//! Decision loop.
//!
//! Applies book-order events to the projection and fires exactly one limit
//! order the first time the watched best price reaches the stop.

use crate::config::TriggerParams;
use crate::error::{AppError, AppResult};
use std::time::Instant;
use tickstop_core::{BookOrder, OrderSide, Price};
use tickstop_feed::{BestChange, OrderBook};
use tickstop_rest::OrderPlacer;
use tickstop_telemetry::Metrics;
use tokio::sync::mpsc;
use tracing::{debug, error, info, trace};

/// Stop condition for one side.
///
/// Sell watches the lowest ask, buy watches the highest bid; either fires
/// once the watched price is at or below the stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StopRule {
    pub side: OrderSide,
    pub stop_price: Price,
}

impl StopRule {
    pub fn new(side: OrderSide, stop_price: Price) -> Self {
        Self { side, stop_price }
    }

    /// Evaluated only when the watched best price moved.
    pub fn is_met(&self, book: &OrderBook, change: BestChange) -> bool {
        match self.side {
            OrderSide::Sell => {
                change.ask
                    && book
                        .best_ask()
                        .is_some_and(|level| level.price <= self.stop_price)
            }
            OrderSide::Buy => {
                change.bid
                    && book
                        .best_bid()
                        .is_some_and(|level| level.price <= self.stop_price)
            }
        }
    }
}

/// Result of a fired trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerOutcome {
    /// Venue order id.
    pub order_id: String,
    /// Events applied, including the one that fired.
    pub events_seen: u64,
}

pub struct StopTrigger {
    params: TriggerParams,
    rule: StopRule,
    book: OrderBook,
    events_seen: u64,
    ready_logged: bool,
}

impl StopTrigger {
    pub fn new(params: TriggerParams, book_capacity: usize) -> Self {
        let rule = StopRule::new(params.side, params.stop_price);
        Self {
            params,
            rule,
            book: OrderBook::new(book_capacity),
            events_seen: 0,
            ready_logged: false,
        }
    }

    pub fn book(&self) -> &OrderBook {
        &self.book
    }

    /// Apply one event. Returns true when the stop is reached.
    pub fn on_event(&mut self, event: &BookOrder) -> bool {
        if event.instrument != self.params.instrument {
            trace!(instrument = %event.instrument, "Ignoring event for other instrument");
            return false;
        }

        self.events_seen += 1;
        let change = self.book.apply(event);

        if !self.ready_logged && self.book.is_ready() {
            self.ready_logged = true;
            info!(
                instrument = %self.params.instrument,
                best_bid = ?self.book.best_bid().map(|l| l.price.to_string()),
                best_ask = ?self.book.best_ask().map(|l| l.price.to_string()),
                "Order book ready"
            );
        }

        if change.bid || change.ask {
            debug!(
                instrument = %self.params.instrument,
                best_bid = ?self.book.best_bid().map(|l| l.price.to_string()),
                best_ask = ?self.book.best_ask().map(|l| l.price.to_string()),
                "Best price moved"
            );
        }

        self.rule.is_met(&self.book, change)
    }

    /// Consume events until the stop is reached, then place the order.
    ///
    /// Returns after the single placement; events still queued stay in
    /// `events`.
    pub async fn run(
        mut self,
        events: &mut mpsc::Receiver<BookOrder>,
        placer: &dyn OrderPlacer,
    ) -> AppResult<TriggerOutcome> {
        info!(
            instrument = %self.params.instrument,
            side = %self.params.side,
            stop_price = %self.params.stop_price,
            limit_price = %self.params.limit_price,
            amount = %self.params.amount,
            "Watching for stop"
        );

        loop {
            let event = events.recv().await.ok_or(AppError::StreamEnded)?;
            if self.on_event(&event) {
                break;
            }
        }

        let instrument = self.params.instrument.to_string();
        let side = self.params.side.to_string();
        Metrics::trigger_fired(&instrument, &side);
        info!(
            instrument = %instrument,
            side = %side,
            best_bid = ?self.book.best_bid().map(|l| l.price.to_string()),
            best_ask = ?self.book.best_ask().map(|l| l.price.to_string()),
            events_seen = self.events_seen,
            "Stop reached, placing order"
        );

        let order = self.params.limit_order();
        let started = Instant::now();
        let placed = placer.place(&order).await;
        let latency_ms = started.elapsed().as_secs_f64() * 1000.0;

        match placed {
            Ok(order_id) => {
                Metrics::order_latency("ok", latency_ms);
                info!(order_id = %order_id, latency_ms, "Order placed");
                Ok(TriggerOutcome {
                    order_id,
                    events_seen: self.events_seen,
                })
            }
            Err(e) => {
                Metrics::order_latency("error", latency_ms);
                error!(error = %e, latency_ms, "Order placement failed");
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use tickstop_core::{BookSide, Instrument, Size};
    use tickstop_rest::MockOrderPlacer;

    fn instrument() -> Instrument {
        "zrx_btc".parse().unwrap()
    }

    fn params(side: OrderSide, stop: Decimal) -> TriggerParams {
        TriggerParams {
            instrument: instrument(),
            side,
            stop_price: Price::new(stop),
            limit_price: Price::new(stop - dec!(1)),
            amount: Size::new(dec!(2)),
        }
    }

    fn event(side: BookSide, is_removal: bool, price: Decimal) -> BookOrder {
        BookOrder::new(
            instrument(),
            side,
            is_removal,
            Price::new(price),
            Size::new(dec!(1)),
        )
    }

    #[test]
    fn test_sell_rule_watches_best_ask() {
        let rule = StopRule::new(OrderSide::Sell, Price::new(dec!(50)));
        let mut book = OrderBook::default();

        let change = book.apply(&event(BookSide::Ask, false, dec!(55)));
        assert!(!rule.is_met(&book, change));

        let change = book.apply(&event(BookSide::Ask, false, dec!(50)));
        assert!(rule.is_met(&book, change));

        // A bid move alone never fires a sell.
        let change = book.apply(&event(BookSide::Bid, false, dec!(40)));
        assert!(!rule.is_met(&book, change));
    }

    #[test]
    fn test_buy_rule_watches_best_bid() {
        let rule = StopRule::new(OrderSide::Buy, Price::new(dec!(50)));
        let mut book = OrderBook::default();

        let change = book.apply(&event(BookSide::Bid, false, dec!(51)));
        assert!(!rule.is_met(&book, change));

        // Worse bid does not move the best price.
        let change = book.apply(&event(BookSide::Bid, false, dec!(45)));
        assert!(!rule.is_met(&book, change));

        let change = book.apply(&event(BookSide::Bid, true, dec!(51)));
        assert!(rule.is_met(&book, change));
    }

    #[test]
    fn test_other_instrument_ignored() {
        let mut trigger = StopTrigger::new(params(OrderSide::Sell, dec!(50)), 10);
        let other = BookOrder::new(
            "eth_btc".parse().unwrap(),
            BookSide::Ask,
            false,
            Price::new(dec!(1)),
            Size::new(dec!(1)),
        );
        assert!(!trigger.on_event(&other));
        assert!(trigger.book().best_ask().is_none());
    }

    #[tokio::test]
    async fn test_sell_fires_once_and_stops_consuming() {
        let (tx, mut rx) = mpsc::channel(16);
        // asks 55 -> 49: removal first, then the addition that crosses.
        tx.send(event(BookSide::Bid, false, dec!(40))).await.unwrap();
        tx.send(event(BookSide::Ask, false, dec!(55))).await.unwrap();
        tx.send(event(BookSide::Ask, true, dec!(55))).await.unwrap();
        tx.send(event(BookSide::Ask, false, dec!(49))).await.unwrap();
        tx.send(event(BookSide::Ask, false, dec!(48))).await.unwrap();

        let placer = MockOrderPlacer::new();
        let trigger = StopTrigger::new(params(OrderSide::Sell, dec!(50)), 10);
        let outcome = trigger.run(&mut rx, &placer).await.unwrap();

        assert_eq!(outcome.order_id, "mock-1");
        assert_eq!(outcome.events_seen, 4);
        let orders = placer.orders();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].side, OrderSide::Sell);
        assert_eq!(orders[0].price, Price::new(dec!(49)));

        // The event after the crossing was never consumed.
        assert_eq!(
            rx.try_recv().unwrap(),
            event(BookSide::Ask, false, dec!(48))
        );
    }

    #[tokio::test]
    async fn test_stream_end_without_trigger() {
        let (tx, mut rx) = mpsc::channel(4);
        tx.send(event(BookSide::Ask, false, dec!(55))).await.unwrap();
        drop(tx);

        let placer = MockOrderPlacer::new();
        let trigger = StopTrigger::new(params(OrderSide::Sell, dec!(50)), 10);
        let result = trigger.run(&mut rx, &placer).await;

        assert!(matches!(result, Err(AppError::StreamEnded)));
        assert!(placer.orders().is_empty());
    }

    #[tokio::test]
    async fn test_placement_failure_is_surfaced() {
        let (tx, mut rx) = mpsc::channel(4);
        tx.send(event(BookSide::Bid, false, dec!(50))).await.unwrap();

        let placer = MockOrderPlacer::new();
        placer.set_fail(true);
        let trigger = StopTrigger::new(params(OrderSide::Buy, dec!(50)), 10);
        let result = trigger.run(&mut rx, &placer).await;

        assert!(matches!(result, Err(AppError::Rest(_))));
        assert_eq!(placer.orders().len(), 1);
    }
}
