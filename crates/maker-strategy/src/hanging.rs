//! Hanging-order bookkeeping.
//!
//! When one side of a quoted pair fills, the surviving sibling becomes a
//! *hanging* order: exempt from the normal cancel/refresh sweeps and kept
//! alive until its price drifts too far from the reference price or it
//! completes. Candidate pairs are registered at proposal submission and
//! promoted once a sibling fill is confirmed.

use std::collections::HashSet;

use rust_decimal::Decimal;
use tracing::{debug, info};

use maker_core::{ClientOrderId, Price};

/// A submitted buy/sell pair whose fills have not yet resolved.
#[derive(Debug, Clone)]
struct CandidatePair {
    buy: Option<ClientOrderId>,
    sell: Option<ClientOrderId>,
    buy_filled: bool,
    sell_filled: bool,
}

impl CandidatePair {
    fn contains(&self, cloid: &ClientOrderId) -> bool {
        self.buy.as_ref() == Some(cloid) || self.sell.as_ref() == Some(cloid)
    }

    /// The sibling left resting after exactly one side filled.
    fn orphan(&self) -> Option<&ClientOrderId> {
        match (self.buy_filled, self.sell_filled) {
            (true, false) => self.sell.as_ref(),
            (false, true) => self.buy.as_ref(),
            _ => None,
        }
    }

    fn resolved(&self) -> bool {
        (self.buy.is_none() || self.buy_filled) && (self.sell.is_none() || self.sell_filled)
    }
}

/// Tracks hanging orders and the candidate pairs that feed them.
#[derive(Debug)]
pub struct HangingOrderManager {
    /// Maximum relative deviation (percent) from the reference price
    /// before a hanging order is cancelled.
    cancel_pct: Decimal,
    hanging: HashSet<ClientOrderId>,
    completed: HashSet<ClientOrderId>,
    pairs: Vec<CandidatePair>,
}

impl HangingOrderManager {
    pub fn new(cancel_pct: Decimal) -> Self {
        Self {
            cancel_pct,
            hanging: HashSet::new(),
            completed: HashSet::new(),
            pairs: Vec::new(),
        }
    }

    /// Register a freshly submitted buy/sell pair as a hanging-order
    /// candidate. Singles (one side missing) are not candidates.
    pub fn register_pair(&mut self, buy: Option<ClientOrderId>, sell: Option<ClientOrderId>) {
        if buy.is_none() || sell.is_none() {
            return;
        }
        self.pairs.push(CandidatePair {
            buy,
            sell,
            buy_filled: false,
            sell_filled: false,
        });
    }

    /// Register an order directly as hanging.
    pub fn add_order(&mut self, cloid: ClientOrderId) {
        debug!(oid = %cloid, "order registered as hanging");
        self.hanging.insert(cloid);
    }

    /// Record a fill on a candidate pair side.
    pub fn on_fill(&mut self, cloid: &ClientOrderId) {
        for pair in &mut self.pairs {
            if pair.buy.as_ref() == Some(cloid) {
                pair.buy_filled = true;
            } else if pair.sell.as_ref() == Some(cloid) {
                pair.sell_filled = true;
            }
        }
    }

    /// A candidate order whose sibling already filled but which has not yet
    /// been promoted; exempt from the next cancel sweep.
    pub fn is_potential_hanging_order(&self, cloid: &ClientOrderId) -> bool {
        self.pairs.iter().any(|p| p.orphan() == Some(cloid))
    }

    pub fn is_order_id_in_hanging_orders(&self, cloid: &ClientOrderId) -> bool {
        self.hanging.contains(cloid)
    }

    pub fn is_id_in_completed_hanging_orders(&self, cloid: &ClientOrderId) -> bool {
        self.completed.contains(cloid)
    }

    /// Promote orphaned candidates into the hanging set once their sibling
    /// fill is confirmed; drop pairs that fully resolved.
    pub fn update_strategy_orders_with_equivalent_orders(&mut self) {
        let mut promoted = Vec::new();
        self.pairs.retain(|pair| {
            if let Some(orphan) = pair.orphan() {
                promoted.push(orphan.clone());
                false
            } else {
                !pair.resolved()
            }
        });
        for cloid in promoted {
            info!(oid = %cloid, "sibling filled, order is now hanging");
            self.hanging.insert(cloid);
        }
    }

    /// Hanging orders whose price deviates beyond the configured percentage
    /// from `ref_price`. The caller issues the cancels; ids stay tracked
    /// here until the cancellation (or completion) is confirmed, so a
    /// failed cancel is retried next tick.
    pub fn process_tick(
        &self,
        ref_price: Price,
        orders: &[(ClientOrderId, Price)],
    ) -> Vec<ClientOrderId> {
        if !ref_price.is_positive() {
            return Vec::new();
        }
        orders
            .iter()
            .filter(|(cloid, price)| {
                self.hanging.contains(cloid)
                    && price
                        .bps_from(ref_price)
                        .map(|bps| bps.abs() / Decimal::from(100) > self.cancel_pct)
                        .unwrap_or(false)
            })
            .map(|(cloid, _)| cloid.clone())
            .collect()
    }

    /// Confirmed completion (full fill). For a hanging order this retires
    /// it; for a candidate-pair side it only marks the fill, leaving the
    /// pair alive so the sibling can still be promoted.
    pub fn on_completed(&mut self, cloid: &ClientOrderId) {
        if self.hanging.remove(cloid) {
            self.completed.insert(cloid.clone());
            self.forget_candidate(cloid);
        } else {
            self.on_fill(cloid);
        }
    }

    /// Confirmed cancellation/expiry/failure removes the order everywhere.
    pub fn on_canceled(&mut self, cloid: &ClientOrderId) {
        if self.hanging.remove(cloid) {
            self.completed.insert(cloid.clone());
        }
        self.forget_candidate(cloid);
    }

    /// Ids currently in the hanging set.
    pub fn hanging_ids(&self) -> impl Iterator<Item = &ClientOrderId> {
        self.hanging.iter()
    }

    fn forget_candidate(&mut self, cloid: &ClientOrderId) {
        self.pairs.retain(|p| !p.contains(cloid));
    }
}
