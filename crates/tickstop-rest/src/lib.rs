//! Signed REST client for tickstop.
//!
//! - `RequestSigner`: HMAC-SHA256 query signing (signature version 2)
//! - `RestClient`: account lookup and limit order placement
//! - `OrderPlacer`: the seam the trigger places its single order through

pub mod client;
pub mod error;
pub mod placer;
pub mod signer;
pub mod types;

pub use client::{RestClient, DEFAULT_REST_URL};
pub use error::{RestError, RestResult};
pub use placer::{BoxFuture, MockOrderPlacer, OrderPlacer, VenueOrderPlacer};
pub use signer::RequestSigner;
pub use types::{Account, ApiResponse, LimitOrder, OrderType, PlaceOrderRequest};
