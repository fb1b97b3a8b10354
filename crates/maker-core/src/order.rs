//! Order types and identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::context::TradingContext;
use crate::decimal::{Price, Size};

/// Order side: buy or sell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// Returns the opposite side.
    pub fn opposite(&self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }

    /// Returns 1 for buy, -1 for sell.
    pub fn sign(&self) -> i8 {
        match self {
            Self::Buy => 1,
            Self::Sell => -1,
        }
    }

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

/// Order type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    /// Resting limit order; the maker path.
    Limit,
    /// Immediate-execution order; tracked without shadow semantics.
    Market,
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Limit => write!(f, "limit"),
            Self::Market => write!(f, "market"),
        }
    }
}

/// Client order ID.
///
/// Format: `{side}_{timestamp_ms}_{uuid_short}`. Uniqueness is carried by
/// the uuid segment alone; the timestamp is diagnostic. The tracking
/// service never overwrites an existing id, so a collision is a caller bug.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientOrderId(String);

impl ClientOrderId {
    /// Generate a fresh id for the given side.
    pub fn generate(side: OrderSide, now_ms: u64) -> Self {
        let uuid_short = &Uuid::new_v4().simple().to_string()[..8];
        Self(format!("{side}_{now_ms}_{uuid_short}"))
    }

    /// Wrap an existing id string (e.g. parsed from an event).
    pub fn from_string(s: String) -> Self {
        Self(s)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientOrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ClientOrderId {
    fn from(s: String) -> Self {
        Self::from_string(s)
    }
}

impl AsRef<str> for ClientOrderId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A resting limit order, owned by the tracking service from placement to
/// removal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitOrder {
    /// Client order id.
    pub cloid: ClientOrderId,
    /// Market this order rests on.
    pub context: TradingContext,
    /// Buy or sell.
    pub side: OrderSide,
    /// Limit price.
    pub price: Price,
    /// Order quantity in base units.
    pub quantity: Size,
    /// Creation timestamp (unix milliseconds).
    pub created_at_ms: u64,
}

impl LimitOrder {
    pub fn new(
        cloid: ClientOrderId,
        context: TradingContext,
        side: OrderSide,
        price: Price,
        quantity: Size,
        created_at_ms: u64,
    ) -> Self {
        Self {
            cloid,
            context,
            side,
            price,
            quantity,
            created_at_ms,
        }
    }

    /// Age of the order at `now_ms`.
    pub fn age_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.created_at_ms)
    }

    pub fn is_buy(&self) -> bool {
        self.side.is_buy()
    }
}

/// An immediate-execution order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketOrder {
    pub cloid: ClientOrderId,
    pub context: TradingContext,
    pub side: OrderSide,
    pub quantity: Size,
    pub created_at_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::TradingPair;
    use rust_decimal_macros::dec;

    fn ctx() -> TradingContext {
        TradingContext::new("binance", TradingPair::new("ETH", "USDT"))
    }

    #[test]
    fn side_opposite_and_sign() {
        assert_eq!(OrderSide::Buy.opposite(), OrderSide::Sell);
        assert_eq!(OrderSide::Sell.opposite(), OrderSide::Buy);
        assert_eq!(OrderSide::Buy.sign(), 1);
        assert_eq!(OrderSide::Sell.sign(), -1);
    }

    #[test]
    fn cloid_unique_and_prefixed() {
        let a = ClientOrderId::generate(OrderSide::Buy, 1_700_000_000_000);
        let b = ClientOrderId::generate(OrderSide::Buy, 1_700_000_000_000);
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("buy_1700000000000_"));

        let s = ClientOrderId::generate(OrderSide::Sell, 42);
        assert!(s.as_str().starts_with("sell_42_"));
    }

    #[test]
    fn limit_order_age() {
        let order = LimitOrder::new(
            ClientOrderId::generate(OrderSide::Buy, 1_000),
            ctx(),
            OrderSide::Buy,
            Price::new(dec!(2000)),
            Size::new(dec!(0.5)),
            1_000,
        );
        assert_eq!(order.age_ms(4_500), 3_500);
        assert_eq!(order.age_ms(500), 0);
    }
}
