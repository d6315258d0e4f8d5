//! Core domain types for tickstop.
//!
//! This crate provides fundamental types used throughout the trigger:
//! - `Instrument`: Normalized base/quote pair with venue symbol aliasing
//! - `Price`, `Size`: Precision-safe numeric types
//! - `PriceLevel`, `DepthTick`: Ranked depth snapshots per side
//! - `BookOrder`: The add/remove event emitted per changed level
//! - `OrderSide`: Trading side

pub mod decimal;
pub mod depth;
pub mod error;
pub mod instrument;
pub mod order;

pub use decimal::{Price, Size};
pub use depth::{BookSide, DepthTick, PriceLevel, DEFAULT_DEPTH};
pub use error::{CoreError, Result};
pub use instrument::Instrument;
pub use order::{BookOrder, BookOrderKind, OrderSide};
