//! Depth feed processing for tickstop.
//!
//! Turns successive full-depth snapshots into incremental book-order
//! events and projects those events back into a top-of-book view:
//! - `diff`: price-level diff between two snapshots of one side
//! - `UpdateHandler`: one task per instrument, snapshot in, events out
//! - `OrderBook`: capped bid/ask projection answering best-level queries

pub mod book;
pub mod diff;
pub mod error;
pub mod handler;

pub use book::{BestChange, OrderBook, DEFAULT_BOOK_CAPACITY};
pub use diff::diff;
pub use error::{FeedError, FeedResult};
pub use handler::{spawn_update_handler, UpdateHandle, UpdateHandler, UpdateHandlerConfig};
