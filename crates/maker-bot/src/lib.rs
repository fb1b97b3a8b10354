//! Market-making bot application.
//!
//! Wires the strategy to a paper exchange behind one `tokio::select!` loop:
//! a fixed-cadence clock drives ticks, the order-event channel delivers
//! lifecycle notifications strictly between them, and ctrl-c triggers a
//! cancel-all shutdown. Real venue connectors implement the same
//! `maker_exchange::Exchange` trait and slot into the same loop.

pub mod app;
pub mod config;
pub mod error;

pub use app::Application;
pub use config::AppConfig;
pub use error::{AppError, AppResult};
