//! Proposal transformer pipeline.
//!
//! Fixed stage order: build, amount-shape, price-optimize, fee-adjust,
//! budget-clip, then the optional taker filter. Every stage mutates the
//! proposal in place; prices and sizes are re-quantized after the stages
//! that move them.

use rust_decimal::Decimal;
use tracing::debug;

use maker_core::{OrderType, Size, TradingContext};
use maker_exchange::Exchange;

use crate::proposal::Proposal;

/// Shrink sizes exponentially (factor `exp(-eta * |q|)`) on the side that
/// would worsen the inventory imbalance. Skipped entirely under manual
/// overrides.
pub fn apply_order_amount_eta_transformation(proposal: &mut Proposal, eta: f64, q: f64) {
    if q == 0.0 || eta <= 0.0 {
        return;
    }
    let factor = (-eta * q.abs()).exp();
    let Some(factor) = Decimal::from_f64_retain(factor) else {
        return;
    };
    let entries = if q > 0.0 {
        // Long: buying more worsens the skew.
        &mut proposal.buys
    } else {
        &mut proposal.sells
    };
    for entry in entries {
        entry.size = entry.size * factor;
    }
}

/// Nudge single-level orders to sit just inside the competing side of the
/// book: one price quantum past the price-for-volume at the configured
/// optimization depth, never beyond the model's own price. Skipped for a
/// side quoting multiple levels.
pub fn apply_order_optimization(
    proposal: &mut Proposal,
    ex: &dyn Exchange,
    ctx: &TradingContext,
    depth: Size,
) {
    let quantum = ex.price_quantum(ctx);

    if proposal.buys.len() == 1 {
        if let Ok(top_bid) = ex.get_price_for_volume(ctx, false, depth) {
            let joined = ex.quantize_price(ctx, top_bid) + quantum;
            let entry = &mut proposal.buys[0];
            entry.price = entry.price.min(joined);
        }
    }
    if proposal.sells.len() == 1 {
        if let Ok(top_ask) = ex.get_price_for_volume(ctx, true, depth) {
            let joined = ex.quantize_price(ctx, top_ask) - quantum;
            let entry = &mut proposal.sells[0];
            entry.price = entry.price.max(joined);
        }
    }
}

/// Shift prices by the expected maker fee: buys down, sells up, so the
/// quoted edge survives the fee.
pub fn apply_add_transaction_costs(proposal: &mut Proposal, ex: &dyn Exchange, ctx: &TradingContext) {
    for entry in &mut proposal.buys {
        let fee = ex
            .get_fee(ctx, OrderType::Limit, maker_core::OrderSide::Buy, entry.size, entry.price)
            .percent;
        entry.price = entry.price * (Decimal::ONE - fee);
    }
    for entry in &mut proposal.sells {
        let fee = ex
            .get_fee(ctx, OrderType::Limit, maker_core::OrderSide::Sell, entry.size, entry.price)
            .percent;
        entry.price = entry.price * (Decimal::ONE + fee);
    }
}

/// Clip sizes to the available balances: buys consume quote (including the
/// expected fee), sells consume base. Walks best-priced entries first,
/// trims the first entry that does not fit and zeroes the rest; zero-size
/// entries are dropped.
pub fn apply_budget_constraint(proposal: &mut Proposal, ex: &dyn Exchange, ctx: &TradingContext) {
    let mut quote_left = ex.get_available_balance(ctx.quote_asset()).inner();
    for entry in &mut proposal.buys {
        let fee = ex
            .get_fee(ctx, OrderType::Limit, maker_core::OrderSide::Buy, entry.size, entry.price)
            .percent;
        let unit_cost = entry.price.inner() * (Decimal::ONE + fee);
        let required = entry.size.inner() * unit_cost;
        if required <= quote_left {
            quote_left -= required;
            continue;
        }
        let affordable = if unit_cost > Decimal::ZERO {
            ex.quantize_amount(ctx, Size::new(quote_left / unit_cost))
        } else {
            Size::ZERO
        };
        debug!(
            wanted = %entry.size,
            clipped = %affordable,
            "buy size clipped to quote budget"
        );
        entry.size = affordable;
        quote_left -= affordable.inner() * unit_cost;
    }

    let mut base_left = ex.get_available_balance(ctx.base_asset()).inner();
    for entry in &mut proposal.sells {
        if entry.size.inner() <= base_left {
            base_left -= entry.size.inner();
            continue;
        }
        let affordable = ex.quantize_amount(ctx, Size::new(base_left.max(Decimal::ZERO)));
        debug!(
            wanted = %entry.size,
            clipped = %affordable,
            "sell size clipped to base budget"
        );
        entry.size = affordable;
        base_left -= affordable.inner();
    }

    proposal.prune_zero_sizes();
}

/// Drop any order that would cross the book and execute as a taker.
pub fn apply_taker_filter(proposal: &mut Proposal, ex: &dyn Exchange, ctx: &TradingContext) {
    if let Ok(best_ask) = ex.query_price(ctx, true) {
        proposal.buys.retain(|e| e.price < best_ask);
    }
    if let Ok(best_bid) = ex.query_price(ctx, false) {
        proposal.sells.retain(|e| e.price > best_bid);
    }
}

/// Quantize every price and size onto the venue grid and drop entries that
/// quantize to nothing.
pub fn quantize_proposal(proposal: &mut Proposal, ex: &dyn Exchange, ctx: &TradingContext) {
    for entry in proposal.buys.iter_mut().chain(proposal.sells.iter_mut()) {
        entry.price = ex.quantize_price(ctx, entry.price);
        entry.size = ex.quantize_amount(ctx, entry.size);
    }
    proposal.buys.retain(|e| e.price.is_positive());
    proposal.sells.retain(|e| e.price.is_positive());
    proposal.prune_zero_sizes();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proposal::PriceSize;
    use maker_core::{Price, TradingPair};
    use maker_exchange::{
        BookLevel, MarketRules, OrderBookSnapshot, PaperExchange, PaperExchangeConfig,
    };
    use rust_decimal_macros::dec;
    use tokio::sync::mpsc;

    fn ctx() -> TradingContext {
        TradingContext::new("paper", TradingPair::new("ETH", "USDT"))
    }

    fn exchange() -> PaperExchange {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut ex = PaperExchange::new(PaperExchangeConfig::default(), tx);
        ex.register_market(ctx(), MarketRules::default());
        ex.set_book(
            &ctx(),
            OrderBookSnapshot::new(
                vec![
                    BookLevel::new(Price::new(dec!(99)), Size::new(dec!(5))),
                    BookLevel::new(Price::new(dec!(98)), Size::new(dec!(10))),
                ],
                vec![
                    BookLevel::new(Price::new(dec!(101)), Size::new(dec!(5))),
                    BookLevel::new(Price::new(dec!(102)), Size::new(dec!(10))),
                ],
            ),
        );
        ex
    }

    fn proposal() -> Proposal {
        Proposal {
            buys: vec![PriceSize::new(Price::new(dec!(99.5)), Size::new(dec!(2)))],
            sells: vec![PriceSize::new(Price::new(dec!(100.5)), Size::new(dec!(2)))],
        }
    }

    #[test]
    fn eta_is_identity_at_flat_inventory() {
        let mut p = proposal();
        let before = p.clone();
        apply_order_amount_eta_transformation(&mut p, 1.0, 0.0);
        assert_eq!(p, before);
    }

    #[test]
    fn eta_shrinks_only_the_worsening_side() {
        let mut p = proposal();
        apply_order_amount_eta_transformation(&mut p, 1.0, 0.5);
        // Long: buys shrink by exp(-0.5), sells untouched.
        let expected = dec!(2) * Decimal::from_f64_retain((-0.5f64).exp()).unwrap();
        assert_eq!(p.buys[0].size.inner(), expected);
        assert_eq!(p.sells[0].size.inner(), dec!(2));

        let mut p = proposal();
        apply_order_amount_eta_transformation(&mut p, 1.0, -0.5);
        assert_eq!(p.buys[0].size.inner(), dec!(2));
        assert_eq!(p.sells[0].size.inner(), expected);
    }

    #[test]
    fn optimization_joins_the_competing_queue() {
        let ex = exchange();
        let mut p = Proposal {
            buys: vec![PriceSize::new(Price::new(dec!(100.5)), Size::new(dec!(1)))],
            sells: vec![PriceSize::new(Price::new(dec!(99.5)), Size::new(dec!(1)))],
        };
        apply_order_optimization(&mut p, &ex, &ctx(), Size::new(dec!(1)));
        // Top bid is 99: join at one tick above instead of overbidding.
        assert_eq!(p.buys[0].price.inner(), dec!(99.01));
        // Top ask is 101: join at one tick below.
        assert_eq!(p.sells[0].price.inner(), dec!(100.99));
    }

    #[test]
    fn optimization_never_loosens_model_prices() {
        let ex = exchange();
        let mut p = Proposal {
            buys: vec![PriceSize::new(Price::new(dec!(95)), Size::new(dec!(1)))],
            sells: vec![PriceSize::new(Price::new(dec!(105)), Size::new(dec!(1)))],
        };
        apply_order_optimization(&mut p, &ex, &ctx(), Size::new(dec!(1)));
        assert_eq!(p.buys[0].price.inner(), dec!(95));
        assert_eq!(p.sells[0].price.inner(), dec!(105));
    }

    #[test]
    fn optimization_skips_multi_level_sides() {
        let ex = exchange();
        let mut p = Proposal {
            buys: vec![
                PriceSize::new(Price::new(dec!(100.5)), Size::new(dec!(1))),
                PriceSize::new(Price::new(dec!(100.0)), Size::new(dec!(1))),
            ],
            sells: vec![],
        };
        let before = p.clone();
        apply_order_optimization(&mut p, &ex, &ctx(), Size::new(dec!(1)));
        assert_eq!(p, before);
    }

    #[test]
    fn transaction_costs_shift_prices_apart() {
        let ex = exchange();
        let mut p = proposal();
        apply_add_transaction_costs(&mut p, &ex, &ctx());
        // Maker fee 0.1%: buys down, sells up.
        assert_eq!(p.buys[0].price.inner(), dec!(99.5) * dec!(0.999));
        assert_eq!(p.sells[0].price.inner(), dec!(100.5) * dec!(1.001));
    }

    #[test]
    fn budget_clips_buys_to_quote_balance() {
        let mut ex = exchange();
        ex.deposit("USDT", Size::new(dec!(100)));
        ex.deposit("ETH", Size::new(dec!(10)));

        let mut p = Proposal {
            buys: vec![
                PriceSize::new(Price::new(dec!(99)), Size::new(dec!(0.5))),
                PriceSize::new(Price::new(dec!(98)), Size::new(dec!(5))),
            ],
            sells: vec![PriceSize::new(Price::new(dec!(101)), Size::new(dec!(2)))],
        };
        apply_budget_constraint(&mut p, &ex, &ctx());

        let buy_notional: Decimal = p.buys.iter().map(|e| e.size.notional(e.price)).sum();
        let fee = dec!(0.001);
        assert!(buy_notional * (Decimal::ONE + fee) <= dec!(100));
        // First entry fits whole, second is trimmed, none dropped to zero.
        assert_eq!(p.buys[0].size.inner(), dec!(0.5));
        assert!(p.buys[1].size.inner() < dec!(5));
        assert!(p.buys[1].size.is_positive());
        // Sells fit inside the 10 ETH balance untouched.
        assert_eq!(p.sells[0].size.inner(), dec!(2));
    }

    #[test]
    fn budget_zeroes_exhausted_entries() {
        let mut ex = exchange();
        ex.deposit("ETH", Size::new(dec!(1)));

        let mut p = Proposal {
            buys: vec![],
            sells: vec![
                PriceSize::new(Price::new(dec!(101)), Size::new(dec!(1))),
                PriceSize::new(Price::new(dec!(102)), Size::new(dec!(3))),
            ],
        };
        apply_budget_constraint(&mut p, &ex, &ctx());

        let sell_total: Decimal = p.sells.iter().map(|e| e.size.inner()).sum();
        assert!(sell_total <= dec!(1));
        // Second entry had no budget left and was dropped.
        assert_eq!(p.sells.len(), 1);
    }

    #[test]
    fn taker_filter_drops_crossing_orders() {
        let ex = exchange();
        let mut p = Proposal {
            buys: vec![
                PriceSize::new(Price::new(dec!(101.5)), Size::new(dec!(1))), // crosses ask 101
                PriceSize::new(Price::new(dec!(99.5)), Size::new(dec!(1))),
            ],
            sells: vec![
                PriceSize::new(Price::new(dec!(98.5)), Size::new(dec!(1))), // crosses bid 99
                PriceSize::new(Price::new(dec!(101.5)), Size::new(dec!(1))),
            ],
        };
        apply_taker_filter(&mut p, &ex, &ctx());
        assert_eq!(p.buys.len(), 1);
        assert_eq!(p.buys[0].price.inner(), dec!(99.5));
        assert_eq!(p.sells.len(), 1);
        assert_eq!(p.sells[0].price.inner(), dec!(101.5));
    }

    #[test]
    fn quantization_snaps_to_venue_grid() {
        let ex = exchange();
        let mut p = Proposal {
            buys: vec![PriceSize::new(
                Price::new(dec!(99.12345)),
                Size::new(dec!(1.23456)),
            )],
            sells: vec![PriceSize::new(
                Price::new(dec!(100.5)),
                Size::new(dec!(0.00001)),
            )],
        };
        quantize_proposal(&mut p, &ex, &ctx());
        assert_eq!(p.buys[0].price.inner(), dec!(99.12));
        assert_eq!(p.buys[0].size.inner(), dec!(1.2345));
        // The dust-sized sell quantizes to zero and is dropped.
        assert!(p.sells.is_empty());
    }
}
