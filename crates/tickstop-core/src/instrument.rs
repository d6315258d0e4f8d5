//! Instrument identification.
//!
//! An instrument is a base/quote currency pair. It is case-folded on
//! construction so it can be used directly as the key for subscription
//! bookkeeping. The venue knows some currencies under another ticker;
//! those aliases are applied only when the symbol is rendered for the
//! wire, never to the key itself.

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Venue ticker aliases: (alternate, canonical).
const SYMBOL_ALIASES: &[(&str, &str)] = &[("bcc", "bch")];

/// Depth aggregation step used for every subscription.
pub const DEPTH_STEP: &str = "step0";

fn venue_currency(currency: &str) -> &str {
    SYMBOL_ALIASES
        .iter()
        .find(|(alt, _)| *alt == currency)
        .map(|(_, canonical)| *canonical)
        .unwrap_or(currency)
}

/// Normalized trading pair.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Instrument {
    base: String,
    quote: String,
}

impl Instrument {
    /// Create from base and quote currencies.
    pub fn new(base: &str, quote: &str) -> Result<Self> {
        let base = base.trim().to_lowercase();
        let quote = quote.trim().to_lowercase();
        if base.is_empty() || quote.is_empty() {
            return Err(CoreError::InvalidInstrument(format!("{base}_{quote}")));
        }
        if !base.chars().chain(quote.chars()).all(|c| c.is_ascii_alphanumeric()) {
            return Err(CoreError::InvalidInstrument(format!("{base}_{quote}")));
        }
        Ok(Self { base, quote })
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn quote(&self) -> &str {
        &self.quote
    }

    /// Symbol as the venue expects it (aliases applied), e.g. `bchbtc`.
    pub fn venue_symbol(&self) -> String {
        format!(
            "{}{}",
            venue_currency(&self.base),
            venue_currency(&self.quote)
        )
    }

    /// Depth channel this instrument subscribes to.
    pub fn depth_channel(&self) -> String {
        format!("market.{}.depth.{}", self.venue_symbol(), DEPTH_STEP)
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.base, self.quote)
    }
}

/// Parses the `base_quote` form, e.g. `zrx_btc`.
impl FromStr for Instrument {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.split('_');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(base), Some(quote), None) => Self::new(base, quote),
            _ => Err(CoreError::InvalidInstrument(format!(
                "{s} (expected base_quote, e.g. zrx_btc)"
            ))),
        }
    }
}
