//! Candidate-order proposals.
//!
//! A proposal is the ephemeral list of buy/sell (price, size) candidates
//! for one tick. It is built from exactly one source (manual overrides, a
//! multi-level ladder, or a single pair at the optimal quotes), then
//! mutated by each transformer stage and discarded after submission.

use rust_decimal::Decimal;

use maker_core::{OrderSide, Price, Size};
use maker_pricing::QuoteSet;

use crate::config::StrategyConfig;

/// One candidate order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceSize {
    pub price: Price,
    pub size: Size,
}

impl PriceSize {
    pub fn new(price: Price, size: Size) -> Self {
        Self { price, size }
    }
}

/// Candidate buys and sells for one tick. Buys are ordered best (highest)
/// first, sells best (lowest) first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Proposal {
    pub buys: Vec<PriceSize>,
    pub sells: Vec<PriceSize>,
}

impl Proposal {
    pub fn is_empty(&self) -> bool {
        self.buys.is_empty() && self.sells.is_empty()
    }

    /// Drop entries whose size fell to zero (e.g. after budget clipping or
    /// quantization).
    pub fn prune_zero_sizes(&mut self) {
        self.buys.retain(|e| e.size.is_positive());
        self.sells.retain(|e| e.size.is_positive());
    }
}

/// Build the tick's base proposal. Exactly one mode applies:
/// manual overrides when configured, otherwise a ladder for multi-level
/// setups, otherwise a single pair at the optimal bid/ask. The configured
/// price band then suppresses buys above the ceiling and sells below the
/// floor.
pub fn create_base_proposal(quotes: &QuoteSet, mid: Price, config: &StrategyConfig) -> Proposal {
    let mut proposal = if !config.order_overrides.is_empty() {
        manual_proposal(config)
    } else if config.order_levels > 1 {
        ladder_proposal(quotes, config)
    } else {
        single_proposal(quotes, config)
    };

    if let Some(ceiling) = config.price_ceiling {
        if mid.inner() >= ceiling {
            proposal.buys.clear();
        }
    }
    if let Some(floor) = config.price_floor {
        if mid.inner() <= floor {
            proposal.sells.clear();
        }
    }
    proposal
}

fn manual_proposal(config: &StrategyConfig) -> Proposal {
    let mut proposal = Proposal::default();
    for o in &config.order_overrides {
        let entry = PriceSize::new(Price::new(o.price), Size::new(o.size));
        match o.side {
            OrderSide::Buy => proposal.buys.push(entry),
            OrderSide::Sell => proposal.sells.push(entry),
        }
    }
    proposal.buys.sort_by(|a, b| b.price.cmp(&a.price));
    proposal.sells.sort_by(|a, b| a.price.cmp(&b.price));
    proposal
}

fn single_proposal(quotes: &QuoteSet, config: &StrategyConfig) -> Proposal {
    let size = Size::new(config.order_amount);
    Proposal {
        buys: vec![PriceSize::new(quotes.optimal_bid, size)],
        sells: vec![PriceSize::new(quotes.optimal_ask, size)],
    }
}

fn ladder_proposal(quotes: &QuoteSet, config: &StrategyConfig) -> Proposal {
    let size = Size::new(config.order_amount);
    let spacing = quotes.optimal_spread.inner() * config.order_level_spacing_pct
        / Decimal::from(100);
    let mut proposal = Proposal::default();
    for level in 0..config.order_levels {
        let offset = spacing * Decimal::from(level);
        let bid = Price::new(quotes.optimal_bid.inner() - offset);
        let ask = Price::new(quotes.optimal_ask.inner() + offset);
        if bid.is_positive() {
            proposal.buys.push(PriceSize::new(bid, size));
        }
        proposal.sells.push(PriceSize::new(ask, size));
    }
    proposal
}
