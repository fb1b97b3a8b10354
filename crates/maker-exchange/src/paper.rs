//! Paper-trading exchange with simulated fills.
//!
//! `PaperExchange` implements the full `Exchange` contract in memory:
//! balances with per-order reservations, resting limit orders, crossing
//! fills against the posted book, passive expiry and the asynchronous
//! lifecycle event stream. It backs the binary and the integration suites.
//!
//! Limitations: fills are all-or-nothing against the top of book, and no
//! market impact is simulated.

use std::collections::HashMap;

use rust_decimal::Decimal;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};

use maker_core::{
    ClientOrderId, LimitOrder, OrderEvent, OrderSide, OrderType, Price, Size, TradingContext,
};

use crate::api::{Exchange, FeeSchedule};
use crate::book::OrderBookSnapshot;
use crate::error::{ExchangeError, Result};

/// Quantization rules for one market.
#[derive(Debug, Clone)]
pub struct MarketRules {
    /// Price tick size.
    pub tick_size: Price,
    /// Amount lot size.
    pub lot_size: Size,
}

impl Default for MarketRules {
    fn default() -> Self {
        Self {
            tick_size: Price::new(Decimal::new(1, 2)),
            lot_size: Size::new(Decimal::new(1, 4)),
        }
    }
}

/// Paper exchange configuration.
#[derive(Debug, Clone)]
pub struct PaperExchangeConfig {
    /// Maker fee as a fraction (0.001 = 0.1%).
    pub maker_fee_pct: Decimal,
    /// Taker fee as a fraction.
    pub taker_fee_pct: Decimal,
    /// Reject orders that exceed the available balance.
    pub enforce_balance: bool,
}

impl Default for PaperExchangeConfig {
    fn default() -> Self {
        Self {
            maker_fee_pct: Decimal::new(1, 3),
            taker_fee_pct: Decimal::new(2, 3),
            enforce_balance: true,
        }
    }
}

/// A resting simulated order plus its balance reservation.
#[derive(Debug, Clone)]
struct RestingOrder {
    order: LimitOrder,
    expires_at_ms: Option<u64>,
    reserved_asset: String,
    reserved_amount: Decimal,
}

/// In-memory exchange implementation.
pub struct PaperExchange {
    config: PaperExchangeConfig,
    rules: HashMap<TradingContext, MarketRules>,
    books: HashMap<TradingContext, OrderBookSnapshot>,
    balances: HashMap<String, Decimal>,
    reserved: HashMap<String, Decimal>,
    resting: HashMap<ClientOrderId, RestingOrder>,
    events: UnboundedSender<OrderEvent>,
    ready: bool,
}

impl PaperExchange {
    pub fn new(config: PaperExchangeConfig, events: UnboundedSender<OrderEvent>) -> Self {
        Self {
            config,
            rules: HashMap::new(),
            books: HashMap::new(),
            balances: HashMap::new(),
            reserved: HashMap::new(),
            resting: HashMap::new(),
            events,
            ready: true,
        }
    }

    /// Register a market and its quantization rules.
    pub fn register_market(&mut self, ctx: TradingContext, rules: MarketRules) {
        self.rules.insert(ctx, rules);
    }

    /// Credit `asset` with `amount` (initial funding).
    pub fn deposit(&mut self, asset: &str, amount: Size) {
        *self.balances.entry(asset.to_string()).or_default() += amount.inner();
    }

    /// Replace the book for a market.
    pub fn set_book(&mut self, ctx: &TradingContext, book: OrderBookSnapshot) {
        self.books.insert(ctx.clone(), book);
    }

    /// Force the readiness flag (e.g. to simulate a feed outage).
    pub fn set_ready(&mut self, ready: bool) {
        self.ready = ready;
    }

    /// Number of orders currently resting.
    pub fn resting_count(&self) -> usize {
        self.resting.len()
    }

    /// Ids of all resting orders.
    pub fn resting_ids(&self) -> Vec<ClientOrderId> {
        self.resting.keys().cloned().collect()
    }

    /// Advance the simulation: expire due orders, then fill any resting
    /// order the current book crosses. Call once per clock tick.
    pub fn poll(&mut self, now_ms: u64) {
        let expired: Vec<ClientOrderId> = self
            .resting
            .iter()
            .filter(|(_, r)| r.expires_at_ms.is_some_and(|t| t <= now_ms))
            .map(|(id, _)| id.clone())
            .collect();
        for cloid in expired {
            if let Some(r) = self.resting.remove(&cloid) {
                self.release(&r.reserved_asset, r.reserved_amount);
                debug!(oid = %cloid, "paper order expired");
                self.emit(OrderEvent::Expired { cloid });
            }
        }

        let crossed: Vec<ClientOrderId> = self
            .resting
            .iter()
            .filter(|(_, r)| self.crossing_price(&r.order).is_some())
            .map(|(id, _)| id.clone())
            .collect();
        for cloid in crossed {
            if let Some(r) = self.resting.remove(&cloid) {
                // Re-check under the current book; the price is the taker side
                // the order crossed into, never worse than the limit.
                if let Some(exec_px) = self.crossing_price(&r.order) {
                    let fee = self.config.maker_fee_pct;
                    self.settle_fill(&r, exec_px, fee);
                } else {
                    self.resting.insert(cloid, r);
                }
            }
        }
    }

    fn crossing_price(&self, order: &LimitOrder) -> Option<Price> {
        let book = self.books.get(&order.context)?;
        match order.side {
            OrderSide::Buy => {
                let ask = book.best_ask()?;
                (ask <= order.price).then_some(ask)
            }
            OrderSide::Sell => {
                let bid = book.best_bid()?;
                (bid >= order.price).then_some(bid)
            }
        }
    }

    fn settle_fill(&mut self, resting: &RestingOrder, exec_px: Price, fee: Decimal) {
        let order = &resting.order;
        let qty = order.quantity.inner();
        let notional = qty * exec_px.inner();

        self.release(&resting.reserved_asset, resting.reserved_amount);
        match order.side {
            OrderSide::Buy => {
                self.debit(order.context.quote_asset(), notional * (Decimal::ONE + fee));
                self.credit(order.context.base_asset(), qty);
            }
            OrderSide::Sell => {
                self.debit(order.context.base_asset(), qty);
                self.credit(order.context.quote_asset(), notional * (Decimal::ONE - fee));
            }
        }

        debug!(oid = %order.cloid, px = %exec_px, qty = %order.quantity, "paper fill");
        self.emit(OrderEvent::Filled {
            cloid: order.cloid.clone(),
            amount: order.quantity,
            price: exec_px,
        });
        self.emit(OrderEvent::Completed {
            cloid: order.cloid.clone(),
        });
    }

    fn available(&self, asset: &str) -> Decimal {
        self.balances.get(asset).copied().unwrap_or_default()
            - self.reserved.get(asset).copied().unwrap_or_default()
    }

    fn reserve(&mut self, asset: &str, amount: Decimal) {
        *self.reserved.entry(asset.to_string()).or_default() += amount;
    }

    fn release(&mut self, asset: &str, amount: Decimal) {
        let entry = self.reserved.entry(asset.to_string()).or_default();
        *entry = (*entry - amount).max(Decimal::ZERO);
    }

    fn credit(&mut self, asset: &str, amount: Decimal) {
        *self.balances.entry(asset.to_string()).or_default() += amount;
    }

    fn debit(&mut self, asset: &str, amount: Decimal) {
        let entry = self.balances.entry(asset.to_string()).or_default();
        *entry = (*entry - amount).max(Decimal::ZERO);
    }

    fn emit(&self, event: OrderEvent) {
        // A dropped receiver only matters in unit tests.
        let _ = self.events.send(event);
    }

    fn fail(&self, cloid: &ClientOrderId, reason: &str) {
        warn!(oid = %cloid, reason, "paper order rejected");
        self.emit(OrderEvent::Failed {
            cloid: cloid.clone(),
            reason: reason.to_string(),
        });
    }
}

impl Exchange for PaperExchange {
    fn is_ready(&self) -> bool {
        self.ready
            && !self.rules.is_empty()
            && self.rules.keys().all(|ctx| {
                self.books
                    .get(ctx)
                    .is_some_and(|b| b.best_bid().is_some() && b.best_ask().is_some())
            })
    }

    fn query_price(&self, ctx: &TradingContext, is_buy: bool) -> Result<Price> {
        let book = self
            .books
            .get(ctx)
            .ok_or_else(|| ExchangeError::MarketNotReady(ctx.clone()))?;
        let price = if is_buy { book.best_ask() } else { book.best_bid() };
        price.ok_or_else(|| ExchangeError::EmptyBook(ctx.clone()))
    }

    fn get_price_for_volume(
        &self,
        ctx: &TradingContext,
        is_buy: bool,
        volume: Size,
    ) -> Result<Price> {
        let book = self
            .books
            .get(ctx)
            .ok_or_else(|| ExchangeError::MarketNotReady(ctx.clone()))?;
        book.price_for_volume(is_buy, volume)
            .ok_or_else(|| ExchangeError::EmptyBook(ctx.clone()))
    }

    fn get_balance(&self, asset: &str) -> Size {
        Size::new(self.balances.get(asset).copied().unwrap_or_default())
    }

    fn get_available_balance(&self, asset: &str) -> Size {
        Size::new(self.available(asset).max(Decimal::ZERO))
    }

    fn quantize_price(&self, ctx: &TradingContext, price: Price) -> Price {
        match self.rules.get(ctx) {
            Some(rules) => price.round_to_tick(rules.tick_size),
            None => price,
        }
    }

    fn quantize_amount(&self, ctx: &TradingContext, amount: Size) -> Size {
        match self.rules.get(ctx) {
            Some(rules) => amount.round_to_lot(rules.lot_size),
            None => amount,
        }
    }

    fn price_quantum(&self, ctx: &TradingContext) -> Price {
        self.rules
            .get(ctx)
            .map(|r| r.tick_size)
            .unwrap_or(Price::ZERO)
    }

    fn get_fee(
        &self,
        _ctx: &TradingContext,
        order_type: OrderType,
        _side: OrderSide,
        _amount: Size,
        _price: Price,
    ) -> FeeSchedule {
        let pct = match order_type {
            OrderType::Limit => self.config.maker_fee_pct,
            OrderType::Market => self.config.taker_fee_pct,
        };
        FeeSchedule::percent_only(pct)
    }

    fn place_order(
        &mut self,
        ctx: &TradingContext,
        side: OrderSide,
        amount: Size,
        order_type: OrderType,
        price: Price,
        expiration_s: Option<u64>,
        now_ms: u64,
    ) -> Result<ClientOrderId> {
        if !self.rules.contains_key(ctx) {
            return Err(ExchangeError::UnknownMarket(ctx.clone()));
        }
        let price = self.quantize_price(ctx, price);
        let amount = self.quantize_amount(ctx, amount);
        let cloid = ClientOrderId::generate(side, now_ms);

        if !amount.is_positive() {
            self.fail(&cloid, "zero quantity after quantization");
            return Ok(cloid);
        }
        if order_type == OrderType::Limit && !price.is_positive() {
            self.fail(&cloid, "non-positive limit price");
            return Ok(cloid);
        }

        if order_type == OrderType::Market {
            let exec = self.get_price_for_volume(ctx, side.is_buy(), amount);
            match exec {
                Ok(exec_px) => {
                    let resting = RestingOrder {
                        order: LimitOrder::new(
                            cloid.clone(),
                            ctx.clone(),
                            side,
                            exec_px,
                            amount,
                            now_ms,
                        ),
                        expires_at_ms: None,
                        reserved_asset: ctx.quote_asset().to_string(),
                        reserved_amount: Decimal::ZERO,
                    };
                    self.emit(OrderEvent::Created {
                        cloid: cloid.clone(),
                    });
                    self.settle_fill(&resting, exec_px, self.config.taker_fee_pct);
                }
                Err(_) => self.fail(&cloid, "insufficient book depth for market order"),
            }
            return Ok(cloid);
        }

        let fee = self.config.maker_fee_pct;
        let (reserved_asset, reserved_amount) = match side {
            OrderSide::Buy => (
                ctx.quote_asset().to_string(),
                amount.inner() * price.inner() * (Decimal::ONE + fee),
            ),
            OrderSide::Sell => (ctx.base_asset().to_string(), amount.inner()),
        };

        if self.config.enforce_balance && self.available(&reserved_asset) < reserved_amount {
            self.fail(&cloid, "insufficient available balance");
            return Ok(cloid);
        }

        self.reserve(&reserved_asset, reserved_amount);
        let order = LimitOrder::new(cloid.clone(), ctx.clone(), side, price, amount, now_ms);
        self.resting.insert(
            cloid.clone(),
            RestingOrder {
                order,
                expires_at_ms: expiration_s.map(|s| now_ms + s * 1000),
                reserved_asset,
                reserved_amount,
            },
        );
        self.emit(OrderEvent::Created {
            cloid: cloid.clone(),
        });
        Ok(cloid)
    }

    fn cancel_order(&mut self, _ctx: &TradingContext, cloid: &ClientOrderId) {
        match self.resting.remove(cloid) {
            Some(r) => {
                self.release(&r.reserved_asset, r.reserved_amount);
                self.emit(OrderEvent::Canceled {
                    cloid: cloid.clone(),
                });
            }
            // Late or duplicate cancel; the venue just ignores it.
            None => debug!(oid = %cloid, "cancel for unknown order dropped"),
        }
    }

    fn order_book_snapshot(&self, ctx: &TradingContext) -> Result<OrderBookSnapshot> {
        self.books
            .get(ctx)
            .cloned()
            .ok_or_else(|| ExchangeError::MarketNotReady(ctx.clone()))
    }
}
