//! Trading context: the universal lookup key.
//!
//! Every order, balance query and price query is scoped by a
//! `TradingContext` (venue + trading pair). Contexts are plain values,
//! cheap enough to clone into the tracking maps.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// A base/quote asset pair, e.g. `ETH-USDT`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TradingPair {
    /// Base asset symbol (the asset being bought/sold).
    pub base: String,
    /// Quote asset symbol (the asset prices are denominated in).
    pub quote: String,
}

impl TradingPair {
    pub fn new(base: impl Into<String>, quote: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            quote: quote.into(),
        }
    }
}

impl fmt::Display for TradingPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.base, self.quote)
    }
}

impl FromStr for TradingPair {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('-') {
            Some((base, quote)) if !base.is_empty() && !quote.is_empty() => {
                Ok(Self::new(base, quote))
            }
            _ => Err(CoreError::InvalidTradingPair(s.to_string())),
        }
    }
}

/// Venue + trading pair identity.
///
/// Orders are keyed by context first, order id second, so one strategy
/// instance can track several markets without id collisions across venues.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TradingContext {
    /// Venue name, e.g. `binance`.
    pub venue: String,
    /// Traded pair on that venue.
    pub pair: TradingPair,
}

impl TradingContext {
    pub fn new(venue: impl Into<String>, pair: TradingPair) -> Self {
        Self {
            venue: venue.into(),
            pair,
        }
    }

    /// Base asset symbol.
    pub fn base_asset(&self) -> &str {
        &self.pair.base
    }

    /// Quote asset symbol.
    pub fn quote_asset(&self) -> &str {
        &self.pair.quote
    }
}

impl fmt::Display for TradingContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.venue, self.pair)
    }
}
