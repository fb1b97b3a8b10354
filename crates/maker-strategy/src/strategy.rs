//! The per-tick decision loop.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use maker_core::{
    ClientOrderId, LimitOrder, OrderEvent, OrderSide, OrderType, Price, Size, TradingContext,
};
use maker_exchange::Exchange;
use maker_pricing::{CalibrationMode, QuoteModel, QuoteSet};
use maker_tracking::OrderTracker;

use crate::config::StrategyConfig;
use crate::error::StrategyError;
use crate::hanging::HangingOrderManager;
use crate::proposal::{create_base_proposal, Proposal};
use crate::transformers::{
    apply_add_transaction_costs, apply_budget_constraint, apply_order_amount_eta_transformation,
    apply_order_optimization, apply_taker_filter, quantize_proposal,
};

/// Throttle for market-not-ready warnings.
const NOT_READY_WARN_INTERVAL_MS: u64 = 30_000;

/// Tick-level lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyState {
    /// Waiting on market data for all markets.
    NotReady,
    /// Market data flowing, estimator buffers still filling.
    Sampling,
    /// Quoting.
    Active,
}

/// Snapshot of an active non-hanging order used by the sweep logic.
#[derive(Debug, Clone)]
struct ActiveOrderView {
    cloid: ClientOrderId,
    side: OrderSide,
    price: Price,
    created_at_ms: u64,
    cancel_pending: bool,
}

/// The market-making decision loop for one trading context.
///
/// Driven by an external clock through [`tick`](Self::tick); exchange
/// lifecycle events are applied between ticks through
/// [`on_order_event`](Self::on_order_event). Both run on one logical
/// thread.
pub struct AvellanedaStrategy {
    config: StrategyConfig,
    context: TradingContext,
    tracker: OrderTracker,
    hanging: HangingOrderManager,
    model: QuoteModel,
    state: StrategyState,
    create_timestamp_ms: u64,
    cancel_timestamp_ms: u64,
    last_not_ready_warn_ms: u64,
    tick_count: u64,
}

impl AvellanedaStrategy {
    pub fn new(context: TradingContext, config: StrategyConfig) -> Result<Self, StrategyError> {
        config.validate()?;
        let model = QuoteModel::new(config.pricing.clone());
        let hanging = HangingOrderManager::new(config.hanging_orders_cancel_pct);
        Ok(Self {
            config,
            context,
            tracker: OrderTracker::new(),
            hanging,
            model,
            state: StrategyState::NotReady,
            create_timestamp_ms: 0,
            cancel_timestamp_ms: 0,
            last_not_ready_warn_ms: 0,
            tick_count: 0,
        })
    }

    pub fn state(&self) -> StrategyState {
        self.state
    }

    pub fn context(&self) -> &TradingContext {
        &self.context
    }

    pub fn tracker(&self) -> &OrderTracker {
        &self.tracker
    }

    pub fn hanging_orders(&self) -> &HangingOrderManager {
        &self.hanging
    }

    /// One pass of the decision loop. Returns early on missing
    /// prerequisites; placement/cancel failures surface as lifecycle
    /// events, never out of the tick.
    pub fn tick(&mut self, ex: &mut dyn Exchange, now_ms: u64) {
        self.tick_count += 1;
        self.tracker.check_and_cleanup_shadow_records(now_ms);

        if !ex.is_ready() {
            self.state = StrategyState::NotReady;
            self.warn_not_ready(now_ms, "exchange not ready");
            return;
        }
        let (best_bid, best_ask) = match (
            ex.query_price(&self.context, false),
            ex.query_price(&self.context, true),
        ) {
            (Ok(bid), Ok(ask)) if bid.is_positive() && bid < ask => (bid, ask),
            _ => {
                self.state = StrategyState::NotReady;
                self.warn_not_ready(now_ms, "top of book unavailable");
                return;
            }
        };
        let mid = Price::new((best_bid.inner() + best_ask.inner()) / Decimal::TWO);

        // 1. Sample market variables.
        self.model.sample(best_bid, best_ask);
        if self.config.pricing.calibration == CalibrationMode::OrderBookIntensity {
            if let Ok(book) = ex.order_book_snapshot(&self.context) {
                self.model.observe_book(&book);
            }
        }
        if !self.model.is_ready() {
            self.state = StrategyState::Sampling;
            debug!(
                market = %self.context,
                remaining = self.model.samples_remaining(),
                "estimator buffers filling"
            );
            return;
        }

        // 2. Recalibrate when due.
        if self.state != StrategyState::Active {
            info!(market = %self.context, "strategy active");
            self.model.recalculate_parameters(mid, now_ms);
            self.state = StrategyState::Active;
        } else if self.model.should_recalibrate(now_ms) {
            self.model.recalculate_parameters(mid, now_ms);
        }

        // 3. Reservation price and optimal spread.
        let q = self.inventory_skew(ex, mid);
        let quotes = self.model.compute_quotes(mid, q, now_ms);
        self.model.settle_state();

        // 4. Build and transform the proposal.
        let proposal = self.build_proposal(ex, &quotes, mid, q);

        // 5. Advance the hanging order manager.
        self.hanging.update_strategy_orders_with_equivalent_orders();
        let hanging_view: Vec<(ClientOrderId, Price)> = self
            .hanging
            .hanging_ids()
            .filter_map(|cloid| {
                self.tracker
                    .get_order(cloid)
                    .map(|rec| (cloid.clone(), rec.order.price))
            })
            .collect();
        for cloid in self.hanging.process_tick(mid, &hanging_view) {
            info!(oid = %cloid, "hanging order drifted beyond threshold, cancelling");
            self.try_cancel(ex, &cloid, now_ms);
        }

        let active = self.active_non_hanging();

        // 6. Age limit applies unconditionally.
        let max_age_ms = self.config.max_order_age_s * 1000;
        for view in &active {
            if now_ms.saturating_sub(view.created_at_ms) > max_age_ms && !view.cancel_pending {
                info!(oid = %view.cloid, "order exceeded max age, cancelling");
                self.try_cancel(ex, &view.cloid, now_ms);
            }
        }

        // 7. Tolerance check on the survivors.
        let active = self.active_non_hanging();
        if !active.is_empty() {
            if self.within_tolerance(&proposal, &active) {
                // Prices barely moved: keep the orders, only reschedule.
                self.cancel_timestamp_ms = now_ms + self.config.order_refresh_time_s * 1000;
            } else if now_ms >= self.cancel_timestamp_ms {
                for view in &active {
                    if view.cancel_pending || self.hanging.is_potential_hanging_order(&view.cloid)
                    {
                        continue;
                    }
                    self.try_cancel(ex, &view.cloid, now_ms);
                }
            }
        }

        // 8. Submit once the deck is clear and the creation timer elapsed.
        if self.active_non_hanging().is_empty()
            && now_ms >= self.create_timestamp_ms
            && !proposal.is_empty()
        {
            let mut proposal = proposal;
            apply_budget_constraint(&mut proposal, ex, &self.context);
            if self.config.avoid_book_crossing {
                apply_taker_filter(&mut proposal, ex, &self.context);
            }
            if !proposal.is_empty() {
                self.execute_proposal(ex, proposal, now_ms);
                let refresh_ms = self.config.order_refresh_time_s * 1000;
                self.create_timestamp_ms = now_ms + refresh_ms;
                self.cancel_timestamp_ms = now_ms + refresh_ms;
            }
        }

        if self.config.status_report_interval_ticks > 0
            && self.tick_count % self.config.status_report_interval_ticks == 0
        {
            info!(
                market = %self.context,
                mid = %mid,
                reservation = %quotes.reservation_price,
                spread = %quotes.optimal_spread,
                inventory_skew = q,
                active_orders = self.tracker.active_count(),
                "status"
            );
        }
    }

    /// Apply one lifecycle event; called strictly between ticks.
    pub fn on_order_event(&mut self, event: &OrderEvent, now_ms: u64) {
        match event {
            OrderEvent::Created { cloid } => {
                self.tracker.confirm_created(cloid);
            }
            OrderEvent::Filled {
                cloid,
                amount,
                price,
            } => {
                info!(oid = %cloid, amount = %amount, price = %price, "fill");
                self.hanging.on_fill(cloid);
                // Back off re-quoting right after a fill.
                self.create_timestamp_ms = self
                    .create_timestamp_ms
                    .max(now_ms + self.config.filled_order_delay_s * 1000);
            }
            OrderEvent::Completed { cloid } => {
                self.hanging.on_completed(cloid);
                self.stop_tracking_any(cloid, now_ms);
            }
            OrderEvent::Canceled { cloid } | OrderEvent::Expired { cloid } => {
                self.hanging.on_canceled(cloid);
                self.stop_tracking_any(cloid, now_ms);
            }
            OrderEvent::Failed { cloid, reason } => {
                // Recovered locally; the order is re-quoted on the next
                // normal cycle, never immediately.
                warn!(oid = %cloid, reason = %reason, "order failed");
                self.hanging.on_canceled(cloid);
                self.stop_tracking_any(cloid, now_ms);
            }
        }
    }

    fn stop_tracking_any(&mut self, cloid: &ClientOrderId, now_ms: u64) {
        if let Some(ctx) = self.tracker.get_context(cloid).cloned() {
            if self.tracker.get_market_order(cloid).is_some() {
                self.tracker.stop_tracking_market_order(&ctx, cloid);
            } else {
                self.tracker.stop_tracking(&ctx, cloid, now_ms);
            }
        }
    }

    fn build_proposal(
        &self,
        ex: &dyn Exchange,
        quotes: &QuoteSet,
        mid: Price,
        q: f64,
    ) -> Proposal {
        let mut proposal = create_base_proposal(quotes, mid, &self.config);
        let manual = !self.config.order_overrides.is_empty();
        if !manual {
            apply_order_amount_eta_transformation(&mut proposal, self.model.eta(), q);
        }
        if self.config.order_optimization_enabled {
            apply_order_optimization(
                &mut proposal,
                ex,
                &self.context,
                Size::new(self.config.order_optimization_depth),
            );
        }
        if self.config.add_transaction_costs {
            apply_add_transaction_costs(&mut proposal, ex, &self.context);
        }
        quantize_proposal(&mut proposal, ex, &self.context);
        proposal
    }

    /// Active orders that are not hanging; the set every sweep operates on.
    fn active_non_hanging(&self) -> Vec<ActiveOrderView> {
        self.tracker
            .active_orders(&self.context)
            .into_iter()
            .filter(|rec| !self.hanging.is_order_id_in_hanging_orders(&rec.order.cloid))
            .map(|rec| ActiveOrderView {
                cloid: rec.order.cloid.clone(),
                side: rec.order.side,
                price: rec.order.price,
                created_at_ms: rec.order.created_at_ms,
                cancel_pending: rec.cancel_pending,
            })
            .collect()
    }

    /// True when the resting non-hanging orders match the new proposal
    /// side-for-side within the refresh tolerance.
    fn within_tolerance(&self, proposal: &Proposal, active: &[ActiveOrderView]) -> bool {
        let tolerance = self.config.order_refresh_tolerance_pct;

        let mut active_buys: Vec<Price> = active
            .iter()
            .filter(|v| v.side == OrderSide::Buy)
            .map(|v| v.price)
            .collect();
        let mut active_sells: Vec<Price> = active
            .iter()
            .filter(|v| v.side == OrderSide::Sell)
            .map(|v| v.price)
            .collect();
        active_buys.sort_by(|a, b| b.cmp(a));
        active_sells.sort();

        let proposed_buys: Vec<Price> = proposal.buys.iter().map(|e| e.price).collect();
        let proposed_sells: Vec<Price> = proposal.sells.iter().map(|e| e.price).collect();

        if active_buys.len() != proposed_buys.len() || active_sells.len() != proposed_sells.len() {
            return false;
        }
        let within = |old: &Price, new: &Price| {
            new.bps_from(*old)
                .map(|bps| bps.abs() / Decimal::from(100) <= tolerance)
                .unwrap_or(false)
        };
        active_buys
            .iter()
            .zip(&proposed_buys)
            .chain(active_sells.iter().zip(&proposed_sells))
            .all(|(old, new)| within(old, new))
    }

    /// Gate and fire one cancel. The in-flight table suppresses duplicates
    /// and cancels before acknowledgment.
    fn try_cancel(&mut self, ex: &mut dyn Exchange, cloid: &ClientOrderId, now_ms: u64) {
        if self.tracker.check_and_track_cancel(cloid, now_ms) {
            ex.cancel_order(&self.context, cloid);
        }
    }

    /// Place every proposal entry, track it, and register hanging
    /// candidates. Each placement failure is isolated to its own order.
    fn execute_proposal(&mut self, ex: &mut dyn Exchange, proposal: Proposal, now_ms: u64) {
        let expiration = self.config.order_expiration_s;
        let mut buy_ids = Vec::with_capacity(proposal.buys.len());
        let mut sell_ids = Vec::with_capacity(proposal.sells.len());

        for (side, entries, ids) in [
            (OrderSide::Buy, &proposal.buys, &mut buy_ids),
            (OrderSide::Sell, &proposal.sells, &mut sell_ids),
        ] {
            for entry in entries {
                match ex.place_order(
                    &self.context,
                    side,
                    entry.size,
                    OrderType::Limit,
                    entry.price,
                    expiration,
                    now_ms,
                ) {
                    Ok(cloid) => {
                        info!(
                            oid = %cloid,
                            side = %side,
                            price = %entry.price,
                            size = %entry.size,
                            "order submitted"
                        );
                        self.tracker.start_tracking(LimitOrder::new(
                            cloid.clone(),
                            self.context.clone(),
                            side,
                            entry.price,
                            entry.size,
                            now_ms,
                        ));
                        ids.push(cloid);
                    }
                    Err(e) => warn!(side = %side, error = %e, "order placement failed"),
                }
            }
        }

        if self.config.hanging_orders_enabled {
            let pairs = buy_ids.len().max(sell_ids.len());
            for i in 0..pairs {
                self.hanging
                    .register_pair(buy_ids.get(i).cloned(), sell_ids.get(i).cloned());
            }
        }
    }

    /// Normalized inventory deviation from target, in [-1, 1]. Positive
    /// means long relative to target. Independent of portfolio size.
    fn inventory_skew(&self, ex: &dyn Exchange, mid: Price) -> f64 {
        let base = ex.get_balance(self.context.base_asset()).to_f64();
        let quote = ex.get_balance(self.context.quote_asset()).to_f64();
        let mid = mid.to_f64();
        if mid <= 0.0 {
            return 0.0;
        }
        let total_in_base = base + quote / mid;
        if total_in_base <= 0.0 {
            return 0.0;
        }
        let target_frac = self
            .config
            .inventory_target_base_pct
            .to_f64()
            .unwrap_or(50.0)
            / 100.0;
        ((base - total_in_base * target_frac) / total_in_base).clamp(-1.0, 1.0)
    }

    fn warn_not_ready(&mut self, now_ms: u64, reason: &str) {
        if now_ms.saturating_sub(self.last_not_ready_warn_ms) >= NOT_READY_WARN_INTERVAL_MS
            || self.last_not_ready_warn_ms == 0
        {
            warn!(market = %self.context, reason, "market not ready, skipping tick");
            self.last_not_ready_warn_ms = now_ms;
        }
    }
}
