//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("core error: {0}")]
    Core(#[from] maker_core::CoreError),

    #[error("strategy error: {0}")]
    Strategy(#[from] maker_strategy::StrategyError),
}

pub type AppResult<T> = Result<T, AppError>;
