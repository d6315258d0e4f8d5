//! Precision-safe decimal types for prices and sizes.
//!
//! Uses `rust_decimal` for exact decimal arithmetic. The venue sends
//! depth levels as JSON floats; they are converted here once, at the
//! edge, and never compared as binary floating point afterwards.

use crate::error::{CoreError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Scale applied to values arriving as wire floats.
pub const WIRE_SCALE: u32 = 8;

/// Scale of the string key used for price equality lookups.
pub const KEY_SCALE: usize = 10;

fn decimal_from_wire(value: f64) -> Option<Decimal> {
    if !value.is_finite() {
        return None;
    }
    Decimal::try_from(value)
        .ok()
        .map(|d| d.round_dp(WIRE_SCALE).normalize())
}

/// Price with exact decimal precision.
///
/// Wraps `Decimal` to provide type safety and prevent mixing
/// prices with sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(pub Decimal);

impl Price {
    #[inline]
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    #[inline]
    pub fn inner(&self) -> Decimal {
        self.0
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0.is_sign_positive() && !self.0.is_zero()
    }

    /// Convert a wire float into a price.
    pub fn from_wire(value: f64) -> Result<Self> {
        decimal_from_wire(value)
            .map(Self)
            .ok_or_else(|| CoreError::InvalidPrice(value.to_string()))
    }

    /// Fixed-precision string key used for price equality lookups.
    ///
    /// Two prices map to the same key iff they agree to `KEY_SCALE` places.
    pub fn key(&self) -> String {
        format!("{:.prec$}", self.0, prec = KEY_SCALE)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Price {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(s.trim().parse()?))
    }
}

impl From<Decimal> for Price {
    fn from(d: Decimal) -> Self {
        Self(d)
    }
}

/// Size/quantity with exact decimal precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Size(pub Decimal);

impl Size {
    #[inline]
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    #[inline]
    pub fn inner(&self) -> Decimal {
        self.0
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0.is_sign_positive() && !self.0.is_zero()
    }

    /// Convert a wire float into a size.
    pub fn from_wire(value: f64) -> Result<Self> {
        decimal_from_wire(value)
            .map(Self)
            .ok_or_else(|| CoreError::InvalidSize(value.to_string()))
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Size {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(s.trim().parse()?))
    }
}

impl From<Decimal> for Size {
    fn from(d: Decimal) -> Self {
        Self(d)
    }
}
