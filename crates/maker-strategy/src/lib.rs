//! Market-making strategy built around the stochastic-control pricing model.
//!
//! The decision loop runs once per clock tick: sample market variables,
//! recalibrate when due, derive reservation price and optimal spread, build
//! and transform a proposal, advance the hanging-order manager, cancel or
//! refresh resting orders and finally submit new ones. Exchange lifecycle
//! events are applied between ticks through [`AvellanedaStrategy::on_order_event`];
//! nothing inside the tick blocks on exchange I/O.

pub mod config;
pub mod error;
pub mod hanging;
pub mod proposal;
pub mod strategy;
pub mod transformers;

pub use config::{OrderOverride, StrategyConfig};
pub use error::StrategyError;
pub use hanging::HangingOrderManager;
pub use proposal::{create_base_proposal, PriceSize, Proposal};
pub use strategy::{AvellanedaStrategy, StrategyState};
