//! Main application loop.
//!
//! One task owns the exchange and the strategy. A fixed-cadence interval
//! drives ticks; order-lifecycle events are applied strictly between
//! ticks; ctrl-c cancels every resting order and exits.

use chrono::Utc;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tokio::sync::mpsc;
use tracing::{debug, info};

use maker_core::{Price, Size, TradingContext, TradingPair};
use maker_exchange::{
    BookLevel, Exchange, MarketRules, OrderBookSnapshot, PaperExchange, PaperExchangeConfig,
};
use maker_strategy::AvellanedaStrategy;

use crate::config::AppConfig;
use crate::error::AppResult;

/// Main application.
pub struct Application {
    config: AppConfig,
    context: TradingContext,
}

impl Application {
    pub fn new(config: AppConfig) -> AppResult<Self> {
        config.validate()?;
        let pair: TradingPair = config.pair.parse()?;
        let context = TradingContext::new(config.venue.clone(), pair);
        Ok(Self { config, context })
    }

    /// Run the tick/event loop until ctrl-c.
    pub async fn run(self) -> AppResult<()> {
        let (event_tx, mut event_rx) = mpsc::unbounded_channel();

        let mut exchange = PaperExchange::new(
            PaperExchangeConfig {
                maker_fee_pct: self.config.paper.maker_fee_pct,
                taker_fee_pct: self.config.paper.taker_fee_pct,
                enforce_balance: true,
            },
            event_tx,
        );
        exchange.register_market(
            self.context.clone(),
            MarketRules {
                tick_size: Price::new(self.config.paper.tick_size),
                lot_size: Size::new(self.config.paper.lot_size),
            },
        );
        exchange.deposit(
            self.context.quote_asset(),
            Size::new(self.config.paper.initial_quote_balance),
        );
        exchange.deposit(
            self.context.base_asset(),
            Size::new(self.config.paper.initial_base_balance),
        );
        exchange.set_book(&self.context, self.simulated_book(0));

        let mut strategy =
            AvellanedaStrategy::new(self.context.clone(), self.config.strategy.clone())?;

        info!(
            market = %self.context,
            tick_interval_ms = self.config.tick_interval_ms,
            "entering main loop"
        );
        let mut interval =
            tokio::time::interval(std::time::Duration::from_millis(self.config.tick_interval_ms));
        let mut tick_index: u64 = 0;

        loop {
            tokio::select! {
                Some(event) = event_rx.recv() => {
                    strategy.on_order_event(&event, now_ms());
                }

                _ = interval.tick() => {
                    tick_index += 1;
                    let now = now_ms();
                    exchange.set_book(&self.context, self.simulated_book(tick_index));
                    exchange.poll(now);
                    // Deliver anything the venue produced before this tick.
                    while let Ok(event) = event_rx.try_recv() {
                        strategy.on_order_event(&event, now);
                    }
                    strategy.tick(&mut exchange, now);
                }

                _ = tokio::signal::ctrl_c() => {
                    info!("shutdown signal received");
                    break;
                }
            }
        }

        // Cancel-all on the way out; confirmations drain synchronously.
        let now = now_ms();
        for cloid in exchange.resting_ids() {
            debug!(oid = %cloid, "cancelling on shutdown");
            exchange.cancel_order(&self.context, &cloid);
        }
        while let Ok(event) = event_rx.try_recv() {
            strategy.on_order_event(&event, now);
        }
        info!("shutdown complete");
        Ok(())
    }

    /// Deterministic simulated feed: a sine wave around the starting mid.
    fn simulated_book(&self, tick_index: u64) -> OrderBookSnapshot {
        let initial = self.config.paper.initial_mid.to_f64().unwrap_or(0.0);
        let amplitude = self
            .config
            .paper
            .feed_wave_amplitude_bps
            .to_f64()
            .unwrap_or(0.0)
            / 10_000.0;
        let period = self.config.paper.feed_wave_period_ticks.max(1) as f64;
        let phase = (tick_index as f64) / period * std::f64::consts::TAU;
        let mid = initial * (1.0 + amplitude * phase.sin());

        let half_spread = self
            .config
            .paper
            .feed_half_spread_bps
            .to_f64()
            .unwrap_or(0.0)
            / 10_000.0;
        let bid = Price::from_f64(mid * (1.0 - half_spread));
        let ask = Price::from_f64(mid * (1.0 + half_spread));
        let depth = Size::new(Decimal::new(1_000, 0));
        OrderBookSnapshot::new(
            vec![BookLevel::new(bid, depth)],
            vec![BookLevel::new(ask, depth)],
        )
    }
}

fn now_ms() -> u64 {
    Utc::now().timestamp_millis().max(0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simulated_book_oscillates_around_initial_mid() {
        let app = Application::new(AppConfig::default()).unwrap();
        let flat = app.simulated_book(0).mid_price().unwrap().to_f64();
        let up = app.simulated_book(150).mid_price().unwrap().to_f64(); // quarter period
        let down = app.simulated_book(450).mid_price().unwrap().to_f64();

        let initial = 2000.0;
        assert!((flat - initial).abs() < 1.0);
        assert!(up > initial);
        assert!(down < initial);
    }

    #[test]
    fn application_rejects_invalid_config() {
        let config = AppConfig {
            tick_interval_ms: 0,
            ..Default::default()
        };
        assert!(Application::new(config).is_err());
    }
}
