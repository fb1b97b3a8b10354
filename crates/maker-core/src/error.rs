use thiserror::Error;

/// Core domain errors.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid trading pair: {0} (expected BASE-QUOTE)")]
    InvalidTradingPair(String),

    #[error("invalid decimal: {0}")]
    InvalidDecimal(#[from] rust_decimal::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
