//! Active/shadow order maps and the in-flight-cancel table.

use std::collections::{HashMap, HashSet, VecDeque};

use tracing::{debug, warn};

use maker_core::{ClientOrderId, LimitOrder, MarketOrder, TradingContext};

/// How long an unconfirmed cancel blocks duplicates before it is considered
/// stale and a repeat cancel is permitted.
pub const IN_FLIGHT_CANCEL_EXPIRY_MS: u64 = 60_000;

/// Grace window a removed order's shadow copy stays resolvable, so late
/// fill events still map to a trading context.
pub const SHADOW_KEEP_ALIVE_MS: u64 = 180_000;

/// A tracked limit order plus its bookkeeping flags.
#[derive(Debug, Clone)]
pub struct TrackedOrderRecord {
    pub order: LimitOrder,
    /// A cancel has been submitted and not yet confirmed or expired.
    pub cancel_pending: bool,
}

/// Scheduled deletion of one shadow entry. `SHADOW_KEEP_ALIVE_MS` is
/// constant, so insertions arrive in due-time order and a FIFO suffices.
#[derive(Debug)]
struct ShadowRemoval {
    due_at_ms: u64,
    context: TradingContext,
    cloid: ClientOrderId,
}

/// Bookkeeping for every order the strategy has placed.
#[derive(Debug, Default)]
pub struct OrderTracker {
    /// Active limit orders, keyed by context then order id.
    active: HashMap<TradingContext, HashMap<ClientOrderId, TrackedOrderRecord>>,
    /// Delayed-GC copies of every tracked order, same keying.
    shadow: HashMap<TradingContext, HashMap<ClientOrderId, LimitOrder>>,
    /// Reverse indexes: order id to owning context.
    active_index: HashMap<ClientOrderId, TradingContext>,
    shadow_index: HashMap<ClientOrderId, TradingContext>,
    /// Market orders; no shadow semantics.
    market_orders: HashMap<TradingContext, HashMap<ClientOrderId, MarketOrder>>,
    market_index: HashMap<ClientOrderId, TradingContext>,
    /// Order id to cancel-request timestamp.
    in_flight_cancels: HashMap<ClientOrderId, u64>,
    /// Ids placed but not yet creation-acknowledged; not cancellable.
    pending_created: HashSet<ClientOrderId>,
    /// Time-ordered shadow deletion queue.
    shadow_gc: VecDeque<ShadowRemoval>,
}

impl OrderTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin tracking a freshly placed limit order.
    ///
    /// Inserts into the active and shadow maps and marks the id as awaiting
    /// creation acknowledgment. Insert-only: an existing id is a caller bug
    /// and is left untouched.
    pub fn start_tracking(&mut self, order: LimitOrder) {
        let cloid = order.cloid.clone();
        if self.active_index.contains_key(&cloid) {
            warn!(oid = %cloid, "refusing to re-track an already tracked order id");
            return;
        }
        let ctx = order.context.clone();
        self.shadow
            .entry(ctx.clone())
            .or_default()
            .insert(cloid.clone(), order.clone());
        self.shadow_index.insert(cloid.clone(), ctx.clone());
        self.active.entry(ctx.clone()).or_default().insert(
            cloid.clone(),
            TrackedOrderRecord {
                order,
                cancel_pending: false,
            },
        );
        self.active_index.insert(cloid.clone(), ctx);
        self.pending_created.insert(cloid);
    }

    /// Record that the venue acknowledged creation; the order becomes
    /// cancellable.
    pub fn confirm_created(&mut self, cloid: &ClientOrderId) {
        self.pending_created.remove(cloid);
    }

    /// True while the id is placed but not yet creation-acknowledged.
    pub fn is_pending_create(&self, cloid: &ClientOrderId) -> bool {
        self.pending_created.contains(cloid)
    }

    /// Stop tracking an order: the active entry and any in-flight-cancel
    /// entry are removed and the shadow copy is scheduled for deletion at
    /// `now_ms + SHADOW_KEEP_ALIVE_MS`. Idempotent: a second call for the
    /// same id is a no-op.
    pub fn stop_tracking(&mut self, context: &TradingContext, cloid: &ClientOrderId, now_ms: u64) {
        let removed = self
            .active
            .get_mut(context)
            .and_then(|orders| orders.remove(cloid));
        if removed.is_none() {
            return;
        }
        self.active_index.remove(cloid);
        self.in_flight_cancels.remove(cloid);
        self.pending_created.remove(cloid);
        self.shadow_gc.push_back(ShadowRemoval {
            due_at_ms: now_ms + SHADOW_KEEP_ALIVE_MS,
            context: context.clone(),
            cloid: cloid.clone(),
        });
        debug!(oid = %cloid, market = %context, "stopped tracking order");
    }

    /// Delete shadow entries whose scheduled removal time has elapsed.
    /// Run once per tick.
    pub fn check_and_cleanup_shadow_records(&mut self, now_ms: u64) {
        while self
            .shadow_gc
            .front()
            .is_some_and(|r| r.due_at_ms <= now_ms)
        {
            if let Some(removal) = self.shadow_gc.pop_front() {
                if let Some(orders) = self.shadow.get_mut(&removal.context) {
                    orders.remove(&removal.cloid);
                }
                self.shadow_index.remove(&removal.cloid);
            }
        }
    }

    /// True if a cancel for this id is recorded and still inside the expiry
    /// window.
    pub fn has_in_flight_cancel(&self, cloid: &ClientOrderId, now_ms: u64) -> bool {
        self.in_flight_cancels
            .get(cloid)
            .is_some_and(|&at| now_ms.saturating_sub(at) < IN_FLIGHT_CANCEL_EXPIRY_MS)
    }

    /// The sole gate before submitting a cancel.
    ///
    /// Returns false if the order is still awaiting creation acknowledgment
    /// or already has an unexpired cancel in flight. Otherwise prunes stale
    /// entries, records the request at `now_ms` and returns true.
    pub fn check_and_track_cancel(&mut self, cloid: &ClientOrderId, now_ms: u64) -> bool {
        if self.pending_created.contains(cloid) {
            debug!(oid = %cloid, "cancel suppressed: awaiting creation ack");
            return false;
        }
        self.in_flight_cancels
            .retain(|_, &mut at| now_ms.saturating_sub(at) < IN_FLIGHT_CANCEL_EXPIRY_MS);
        if self.in_flight_cancels.contains_key(cloid) {
            debug!(oid = %cloid, "cancel suppressed: already in flight");
            return false;
        }
        self.in_flight_cancels.insert(cloid.clone(), now_ms);
        if let Some(record) = self
            .active_index
            .get(cloid)
            .cloned()
            .and_then(|ctx| self.active.get_mut(&ctx))
            .and_then(|orders| orders.get_mut(cloid))
        {
            record.cancel_pending = true;
        }
        true
    }

    /// Look up an active order.
    pub fn get_order(&self, cloid: &ClientOrderId) -> Option<&TrackedOrderRecord> {
        let ctx = self.active_index.get(cloid)?;
        self.active.get(ctx)?.get(cloid)
    }

    /// Look up the shadow copy of an order (possibly already stopped).
    pub fn get_shadow_order(&self, cloid: &ClientOrderId) -> Option<&LimitOrder> {
        let ctx = self.shadow_index.get(cloid)?;
        self.shadow.get(ctx)?.get(cloid)
    }

    /// Resolve an order id to its context via the active, shadow or market
    /// indexes; this is what late lifecycle events go through.
    pub fn get_context(&self, cloid: &ClientOrderId) -> Option<&TradingContext> {
        self.active_index
            .get(cloid)
            .or_else(|| self.shadow_index.get(cloid))
            .or_else(|| self.market_index.get(cloid))
    }

    /// Active limit orders for one context.
    pub fn active_orders(&self, context: &TradingContext) -> Vec<&TrackedOrderRecord> {
        self.active
            .get(context)
            .map(|orders| orders.values().collect())
            .unwrap_or_default()
    }

    /// Number of active limit orders across all contexts.
    pub fn active_count(&self) -> usize {
        self.active.values().map(HashMap::len).sum()
    }

    /// Begin tracking an immediate-execution order.
    pub fn start_tracking_market_order(&mut self, order: MarketOrder) {
        let cloid = order.cloid.clone();
        if self.market_index.contains_key(&cloid) {
            warn!(oid = %cloid, "refusing to re-track an already tracked market order id");
            return;
        }
        let ctx = order.context.clone();
        self.market_orders
            .entry(ctx.clone())
            .or_default()
            .insert(cloid.clone(), order);
        self.market_index.insert(cloid, ctx);
    }

    /// Remove a market order. No shadow copy is kept.
    pub fn stop_tracking_market_order(&mut self, context: &TradingContext, cloid: &ClientOrderId) {
        if let Some(orders) = self.market_orders.get_mut(context) {
            orders.remove(cloid);
        }
        self.market_index.remove(cloid);
    }

    /// Look up a tracked market order.
    pub fn get_market_order(&self, cloid: &ClientOrderId) -> Option<&MarketOrder> {
        let ctx = self.market_index.get(cloid)?;
        self.market_orders.get(ctx)?.get(cloid)
    }
}
