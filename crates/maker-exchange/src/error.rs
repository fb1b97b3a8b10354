use maker_core::TradingContext;
use thiserror::Error;

/// Errors surfaced synchronously by an exchange implementation.
///
/// Placement and cancel failures that happen on the venue itself are not
/// here: those arrive asynchronously as `OrderEvent::Failed`.
#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("market not ready: {0}")]
    MarketNotReady(TradingContext),

    #[error("unknown market: {0}")]
    UnknownMarket(TradingContext),

    #[error("order book for {0} is empty on the required side")]
    EmptyBook(TradingContext),
}

pub type Result<T> = std::result::Result<T, ExchangeError>;
