//! The exchange contract consumed by the decision core.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use maker_core::{ClientOrderId, OrderSide, OrderType, Price, Size, TradingContext};

use crate::book::OrderBookSnapshot;
use crate::error::Result;

/// A fee charged as a flat amount of some asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatFee {
    pub asset: String,
    pub amount: Size,
}

/// Fee estimate for an order: a fraction of notional plus flat components.
///
/// `percent` is a fraction, e.g. `0.001` for 0.1%.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSchedule {
    pub percent: Decimal,
    pub flat_fees: Vec<FlatFee>,
}

impl FeeSchedule {
    pub fn percent_only(percent: Decimal) -> Self {
        Self {
            percent,
            flat_fees: Vec::new(),
        }
    }
}

/// Venue contract.
///
/// All order I/O is fire-and-forget: `place_order` returns the client order
/// id synchronously and the acknowledgment (`Created`), fills, cancels and
/// failures arrive later on the order-event stream. Nothing here blocks.
pub trait Exchange {
    /// True once market data for all registered markets is usable.
    fn is_ready(&self) -> bool;

    /// Best price a taker would hit: the ask for `is_buy`, the bid otherwise.
    fn query_price(&self, ctx: &TradingContext, is_buy: bool) -> Result<Price>;

    /// Volume-weighted price for trading `volume` against the book.
    fn get_price_for_volume(&self, ctx: &TradingContext, is_buy: bool, volume: Size)
        -> Result<Price>;

    /// Total balance of `asset`, including amounts reserved by open orders.
    fn get_balance(&self, asset: &str) -> Size;

    /// Balance of `asset` not reserved by open orders.
    fn get_available_balance(&self, asset: &str) -> Size;

    /// Round a price onto the venue's tick grid.
    fn quantize_price(&self, ctx: &TradingContext, price: Price) -> Price;

    /// Round an amount onto the venue's lot grid.
    fn quantize_amount(&self, ctx: &TradingContext, amount: Size) -> Size;

    /// Smallest representable price increment on this market.
    fn price_quantum(&self, ctx: &TradingContext) -> Price;

    /// Expected fee for an order of the given shape.
    fn get_fee(
        &self,
        ctx: &TradingContext,
        order_type: OrderType,
        side: OrderSide,
        amount: Size,
        price: Price,
    ) -> FeeSchedule;

    /// Submit an order. The returned id is assigned immediately; venue-side
    /// failures surface as `OrderEvent::Failed` for that id.
    #[allow(clippy::too_many_arguments)]
    fn place_order(
        &mut self,
        ctx: &TradingContext,
        side: OrderSide,
        amount: Size,
        order_type: OrderType,
        price: Price,
        expiration_s: Option<u64>,
        now_ms: u64,
    ) -> Result<ClientOrderId>;

    /// Request cancellation. Confirmation arrives as `OrderEvent::Canceled`;
    /// cancels for unknown or already-gone ids are silently dropped.
    fn cancel_order(&mut self, ctx: &TradingContext, cloid: &ClientOrderId);

    /// Depth snapshot for the liquidity-intensity calibration mode.
    fn order_book_snapshot(&self, ctx: &TradingContext) -> Result<OrderBookSnapshot>;
}
