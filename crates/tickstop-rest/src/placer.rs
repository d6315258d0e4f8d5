//! Order placement seam.
//!
//! The trigger depends on [`OrderPlacer`] rather than on the HTTP client,
//! so tests can count placements without a venue.

use crate::client::RestClient;
use crate::error::{RestError, RestResult};
use crate::types::LimitOrder;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

pub trait OrderPlacer: Send + Sync {
    /// Place one limit order. Resolves to the venue order id.
    fn place<'a>(&'a self, order: &'a LimitOrder) -> BoxFuture<'a, RestResult<String>>;
}

/// Places orders through the REST client from a resolved account.
pub struct VenueOrderPlacer {
    client: RestClient,
    account_id: u64,
}

impl VenueOrderPlacer {
    pub fn new(client: RestClient, account_id: u64) -> Self {
        Self { client, account_id }
    }

    pub fn account_id(&self) -> u64 {
        self.account_id
    }
}

impl OrderPlacer for VenueOrderPlacer {
    fn place<'a>(&'a self, order: &'a LimitOrder) -> BoxFuture<'a, RestResult<String>> {
        Box::pin(self.client.place_limit_order(self.account_id, order))
    }
}

/// Mock placer for testing.
#[derive(Debug, Default)]
pub struct MockOrderPlacer {
    /// Recorded placements for verification.
    orders: parking_lot::Mutex<Vec<LimitOrder>>,
    /// Reject every placement when set.
    fail: AtomicBool,
}

impl MockOrderPlacer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn orders(&self) -> Vec<LimitOrder> {
        self.orders.lock().clone()
    }
}

impl OrderPlacer for MockOrderPlacer {
    fn place<'a>(&'a self, order: &'a LimitOrder) -> BoxFuture<'a, RestResult<String>> {
        Box::pin(async move {
            let mut orders = self.orders.lock();
            orders.push(order.clone());
            if self.fail.load(Ordering::SeqCst) {
                return Err(RestError::Api {
                    code: "order-rejected".to_string(),
                    message: "mock rejection".to_string(),
                });
            }
            Ok(format!("mock-{}", orders.len()))
        })
    }
}
