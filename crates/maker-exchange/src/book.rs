//! Order book snapshot with volume-weighted price queries.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use maker_core::{Price, Size};

/// One price level of an order book side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookLevel {
    pub price: Price,
    pub size: Size,
}

impl BookLevel {
    pub fn new(price: Price, size: Size) -> Self {
        Self { price, size }
    }
}

/// Point-in-time order book: bids sorted descending, asks ascending.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBookSnapshot {
    pub bids: Vec<BookLevel>,
    pub asks: Vec<BookLevel>,
}

impl OrderBookSnapshot {
    pub fn new(bids: Vec<BookLevel>, asks: Vec<BookLevel>) -> Self {
        Self { bids, asks }
    }

    pub fn best_bid(&self) -> Option<Price> {
        self.bids.first().map(|l| l.price)
    }

    pub fn best_ask(&self) -> Option<Price> {
        self.asks.first().map(|l| l.price)
    }

    /// Mid price, `None` unless both sides are present and uncrossed.
    pub fn mid_price(&self) -> Option<Price> {
        let bid = self.best_bid()?;
        let ask = self.best_ask()?;
        if !bid.is_positive() || !ask.is_positive() || bid >= ask {
            return None;
        }
        Some(Price::new((bid.inner() + ask.inner()) / Decimal::TWO))
    }

    /// Volume-weighted price for trading `volume` against the book.
    ///
    /// `is_buy = true` walks the asks (the price a buyer pays); `false`
    /// walks the bids. Returns `None` when the side cannot absorb the
    /// requested volume.
    pub fn price_for_volume(&self, is_buy: bool, volume: Size) -> Option<Price> {
        if !volume.is_positive() {
            return if is_buy { self.best_ask() } else { self.best_bid() };
        }
        let levels = if is_buy { &self.asks } else { &self.bids };
        let mut remaining = volume.inner();
        let mut notional = Decimal::ZERO;
        for level in levels {
            let take = remaining.min(level.size.inner());
            notional += take * level.price.inner();
            remaining -= take;
            if remaining.is_zero() {
                return Some(Price::new(notional / volume.inner()));
            }
        }
        None
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn book() -> OrderBookSnapshot {
        OrderBookSnapshot::new(
            vec![
                BookLevel::new(Price::new(dec!(99)), Size::new(dec!(2))),
                BookLevel::new(Price::new(dec!(98)), Size::new(dec!(5))),
            ],
            vec![
                BookLevel::new(Price::new(dec!(101)), Size::new(dec!(1))),
                BookLevel::new(Price::new(dec!(102)), Size::new(dec!(4))),
            ],
        )
    }

    #[test]
    fn mid_price_requires_uncrossed_sides() {
        assert_eq!(book().mid_price().unwrap().inner(), dec!(100));

        let crossed = OrderBookSnapshot::new(
            vec![BookLevel::new(Price::new(dec!(101)), Size::new(dec!(1)))],
            vec![BookLevel::new(Price::new(dec!(100)), Size::new(dec!(1)))],
        );
        assert!(crossed.mid_price().is_none());
        assert!(OrderBookSnapshot::default().mid_price().is_none());
    }

    #[test]
    fn price_for_volume_walks_levels() {
        let b = book();
        // Buying 3: 1 @ 101 + 2 @ 102 = 305 / 3
        let vwap = b.price_for_volume(true, Size::new(dec!(3))).unwrap();
        assert_eq!(vwap.inner().round_dp(4), dec!(101.6667));

        // Selling 2 fits entirely in the top bid level.
        let vwap = b.price_for_volume(false, Size::new(dec!(2))).unwrap();
        assert_eq!(vwap.inner(), dec!(99));
    }

    #[test]
    fn price_for_volume_exhausted_side() {
        let b = book();
        assert!(b.price_for_volume(true, Size::new(dec!(100))).is_none());
    }

    #[test]
    fn zero_volume_degenerates_to_top_of_book() {
        let b = book();
        assert_eq!(b.price_for_volume(true, Size::ZERO).unwrap().inner(), dec!(101));
        assert_eq!(b.price_for_volume(false, Size::ZERO).unwrap().inner(), dec!(99));
    }
}
