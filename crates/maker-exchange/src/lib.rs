//! Exchange abstraction consumed by the decision core.
//!
//! The `Exchange` trait is the full contract the strategy needs from a
//! venue: price/balance/book queries, quantization, fees, and
//! fire-and-forget order placement/cancellation. Results of placements and
//! cancels are observed later through the order-event stream, never awaited
//! inline.
//!
//! `PaperExchange` is the in-memory implementation used by the binary and
//! by the integration test suites; real connectors live outside this
//! repository and implement the same trait.

pub mod api;
pub mod book;
pub mod error;
pub mod paper;

pub use api::{Exchange, FeeSchedule, FlatFee};
pub use book::{BookLevel, OrderBookSnapshot};
pub use error::{ExchangeError, Result};
pub use paper::{MarketRules, PaperExchange, PaperExchangeConfig};
