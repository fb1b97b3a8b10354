//! Stochastic-control pricing model.
//!
//! Maintains rolling volatility and (optionally) order-book liquidity
//! estimators, calibrates the risk coefficients, and derives a reservation
//! price and optimal spread each tick:
//!
//! ```text
//! reservation = mid − q·γ·σ²·T
//! spread      = γ·σ²·T + (2/γ)·ln(1 + γ/κ)
//! ```
//!
//! with per-side clamping to the configured spread band around mid. An
//! infinite-horizon variant substitutes asymptotic per-side offsets and is
//! selected only by configuration; the two modes are numerically
//! independent.

pub mod config;
pub mod intensity;
pub mod model;
pub mod volatility;

pub use config::{CalibrationMode, ExecutionTimeframe, PricingConfig, PricingConfigError};
pub use intensity::{IntensityFit, TradingIntensityEstimator};
pub use model::{ModelState, QuoteModel, QuoteSet};
pub use volatility::VolatilitySampler;
