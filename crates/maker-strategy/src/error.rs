use maker_exchange::ExchangeError;
use maker_pricing::PricingConfigError;
use thiserror::Error;

/// Strategy-level errors.
///
/// Only configuration problems are fatal. Exchange placement/cancel
/// failures never surface here: they arrive as lifecycle events and are
/// recovered locally.
#[derive(Debug, Error)]
pub enum StrategyError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("configuration error: {0}")]
    PricingConfig(#[from] PricingConfigError),

    #[error(transparent)]
    Exchange(#[from] ExchangeError),
}
