//! Strategy configuration.

use maker_core::OrderSide;
use maker_pricing::PricingConfig;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::StrategyError;

/// A manual price/size override; when any are present the proposal builder
/// uses them verbatim instead of the pricing model output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderOverride {
    pub side: OrderSide,
    pub price: Decimal,
    pub size: Decimal,
}

/// Strategy configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyConfig {
    /// Order size per level, in base units.
    #[serde(default = "default_order_amount")]
    pub order_amount: Decimal,

    /// Number of quote levels per side.
    #[serde(default = "default_order_levels")]
    pub order_levels: u32,

    /// Distance between ladder levels, as a percentage of the optimal
    /// spread.
    #[serde(default = "default_order_level_spacing_pct")]
    pub order_level_spacing_pct: Decimal,

    /// Create/cancel timer interval in seconds.
    #[serde(default = "default_order_refresh_time_s")]
    pub order_refresh_time_s: u64,

    /// Orders older than this are cancelled unconditionally.
    #[serde(default = "default_max_order_age_s")]
    pub max_order_age_s: u64,

    /// If the new proposal prices are within this percentage of the resting
    /// orders, cancellation is deferred and only the timers reschedule.
    #[serde(default = "default_order_refresh_tolerance_pct")]
    pub order_refresh_tolerance_pct: Decimal,

    /// Delay before re-quoting after a fill, in seconds.
    #[serde(default = "default_filled_order_delay_s")]
    pub filled_order_delay_s: u64,

    /// Target share of inventory held in the base asset, in percent.
    #[serde(default = "default_inventory_target_base_pct")]
    pub inventory_target_base_pct: Decimal,

    /// Keep the sibling of a filled order alive as a hanging order.
    #[serde(default)]
    pub hanging_orders_enabled: bool,

    /// Cancel a hanging order once its price deviates this percentage from
    /// the reference price.
    #[serde(default = "default_hanging_orders_cancel_pct")]
    pub hanging_orders_cancel_pct: Decimal,

    /// Nudge single-level orders against the opposing top of book.
    #[serde(default = "default_true")]
    pub order_optimization_enabled: bool,

    /// Depth (base units) used for the top-of-book price-for-volume query
    /// in order optimization.
    #[serde(default)]
    pub order_optimization_depth: Decimal,

    /// Shift proposal prices by the expected maker fee.
    #[serde(default)]
    pub add_transaction_costs: bool,

    /// Drop any order that would cross the book (maker-only filter).
    #[serde(default)]
    pub avoid_book_crossing: bool,

    /// Suppress buys when mid is at or above this price.
    #[serde(default)]
    pub price_ceiling: Option<Decimal>,

    /// Suppress sells when mid is at or below this price.
    #[serde(default)]
    pub price_floor: Option<Decimal>,

    /// Manual proposal entries; non-empty switches the builder to manual
    /// mode and disables eta shaping.
    #[serde(default)]
    pub order_overrides: Vec<OrderOverride>,

    /// Passive expiry attached to placed orders, for venues without active
    /// cancellation support.
    #[serde(default)]
    pub order_expiration_s: Option<u64>,

    /// Emit a status summary every N ticks.
    #[serde(default = "default_status_report_interval_ticks")]
    pub status_report_interval_ticks: u64,

    /// Pricing model section.
    #[serde(default)]
    pub pricing: PricingConfig,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            order_amount: default_order_amount(),
            order_levels: default_order_levels(),
            order_level_spacing_pct: default_order_level_spacing_pct(),
            order_refresh_time_s: default_order_refresh_time_s(),
            max_order_age_s: default_max_order_age_s(),
            order_refresh_tolerance_pct: default_order_refresh_tolerance_pct(),
            filled_order_delay_s: default_filled_order_delay_s(),
            inventory_target_base_pct: default_inventory_target_base_pct(),
            hanging_orders_enabled: false,
            hanging_orders_cancel_pct: default_hanging_orders_cancel_pct(),
            order_optimization_enabled: true,
            order_optimization_depth: Decimal::ZERO,
            add_transaction_costs: false,
            avoid_book_crossing: false,
            price_ceiling: None,
            price_floor: None,
            order_overrides: Vec::new(),
            order_expiration_s: None,
            status_report_interval_ticks: default_status_report_interval_ticks(),
            pricing: PricingConfig::default(),
        }
    }
}

impl StrategyConfig {
    /// Cross-field validation; failures here are fatal at startup.
    pub fn validate(&self) -> Result<(), StrategyError> {
        if self.order_amount <= Decimal::ZERO {
            return Err(StrategyError::Config(format!(
                "order_amount must be positive, got {}",
                self.order_amount
            )));
        }
        if self.order_levels == 0 {
            return Err(StrategyError::Config("order_levels must be at least 1".into()));
        }
        if let (Some(ceiling), Some(floor)) = (self.price_ceiling, self.price_floor) {
            if ceiling <= floor {
                return Err(StrategyError::Config(format!(
                    "price_ceiling ({ceiling}) must be above price_floor ({floor})"
                )));
            }
        }
        if self.order_refresh_tolerance_pct < Decimal::ZERO {
            return Err(StrategyError::Config(
                "order_refresh_tolerance_pct must not be negative".into(),
            ));
        }
        if self.hanging_orders_enabled && self.hanging_orders_cancel_pct <= Decimal::ZERO {
            return Err(StrategyError::Config(
                "hanging_orders_cancel_pct must be positive".into(),
            ));
        }
        for o in &self.order_overrides {
            if o.price <= Decimal::ZERO || o.size <= Decimal::ZERO {
                return Err(StrategyError::Config(
                    "order_overrides entries need positive price and size".into(),
                ));
            }
        }
        self.pricing.validate()?;
        Ok(())
    }
}

fn default_true() -> bool {
    true
}
fn default_order_amount() -> Decimal {
    Decimal::ONE
}
fn default_order_levels() -> u32 {
    1
}
fn default_order_level_spacing_pct() -> Decimal {
    Decimal::new(50, 0)
}
fn default_order_refresh_time_s() -> u64 {
    30
}
fn default_max_order_age_s() -> u64 {
    1800
}
fn default_order_refresh_tolerance_pct() -> Decimal {
    Decimal::new(2, 1) // 0.2%
}
fn default_filled_order_delay_s() -> u64 {
    60
}
fn default_inventory_target_base_pct() -> Decimal {
    Decimal::new(50, 0)
}
fn default_hanging_orders_cancel_pct() -> Decimal {
    Decimal::new(10, 0)
}
fn default_status_report_interval_ticks() -> u64 {
    60
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn defaults_validate() {
        let config = StrategyConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.order_levels, 1);
        assert_eq!(config.order_refresh_tolerance_pct, dec!(0.2));
        assert!(!config.hanging_orders_enabled);
    }

    #[test]
    fn ceiling_below_floor_is_fatal() {
        let config = StrategyConfig {
            price_ceiling: Some(dec!(90)),
            price_floor: Some(dec!(100)),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(StrategyError::Config(_))
        ));
    }

    #[test]
    fn zero_amount_rejected() {
        let config = StrategyConfig {
            order_amount: Decimal::ZERO,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn toml_round_trip_with_defaults() {
        let config: StrategyConfig = toml::from_str(
            r#"
order_amount = "0.5"
hanging_orders_enabled = true
hanging_orders_cancel_pct = "5"

[pricing]
min_spread_bps = 20
"#,
        )
        .unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.order_amount, dec!(0.5));
        assert!(config.hanging_orders_enabled);
        assert_eq!(config.pricing.min_spread_bps, dec!(20));
        assert_eq!(config.order_refresh_time_s, 30);
    }
}
