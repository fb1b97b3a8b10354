//! Core domain types for the market-making decision core.
//!
//! This crate provides the fundamental types shared by every other crate:
//! - `TradingContext`: venue + trading pair, the universal lookup key
//! - `Price`, `Size`: precision-safe decimal newtypes
//! - `LimitOrder`, `MarketOrder`: orders owned by the tracking service
//! - `OrderEvent`: the asynchronous order-lifecycle stream

pub mod context;
pub mod decimal;
pub mod error;
pub mod events;
pub mod order;

pub use context::{TradingContext, TradingPair};
pub use decimal::{Price, Size};
pub use error::{CoreError, Result};
pub use events::OrderEvent;
pub use order::{ClientOrderId, LimitOrder, MarketOrder, OrderSide, OrderType};
