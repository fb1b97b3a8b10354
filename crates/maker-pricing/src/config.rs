//! Pricing model configuration.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How the risk coefficients are derived.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationMode {
    /// Closed form from the configured spread band and observed volatility:
    /// gamma and kappa are chosen so the optimal spread stays inside the
    /// band at maximal inventory skew.
    #[default]
    SpreadBounds,
    /// (alpha, kappa) fitted from order-book snapshots; gamma comes from
    /// `risk_factor`.
    OrderBookIntensity,
}

/// Trading-cycle horizon.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum ExecutionTimeframe {
    /// No cycle end: the asymptotic per-side quote formulas apply.
    #[default]
    Infinite,
    /// Fixed cycle; the time-left fraction decays from 1 to 0 and the model
    /// recalibrates at each rollover.
    Cycle { duration_s: u64 },
}

/// Pricing model configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingConfig {
    /// Risk-coefficient derivation mode.
    #[serde(default)]
    pub calibration: CalibrationMode,

    /// Risk aversion (gamma) used by the intensity calibration mode.
    #[serde(default = "default_risk_factor")]
    pub risk_factor: f64,

    /// Order-size shape factor (eta) for the inventory-skew amount
    /// transformer.
    #[serde(default = "default_order_amount_shape_factor")]
    pub order_amount_shape_factor: f64,

    /// Lower bound for the total quoted spread, in basis points of mid.
    #[serde(default = "default_min_spread_bps")]
    pub min_spread_bps: Decimal,

    /// Upper bound for the total quoted spread, in basis points of mid.
    #[serde(default = "default_max_spread_bps")]
    pub max_spread_bps: Decimal,

    /// Mid-price samples required before the volatility estimate is used.
    #[serde(default = "default_volatility_buffer_samples")]
    pub volatility_buffer_samples: usize,

    /// Order-book snapshots required before the intensity fit is used.
    #[serde(default = "default_intensity_buffer_samples")]
    pub intensity_buffer_samples: usize,

    /// Scheduled recalibration interval in seconds.
    #[serde(default = "default_calibration_interval_s")]
    pub calibration_interval_s: u64,

    /// Relative volatility deviation from the last calibration that forces
    /// an early recalibration (0.2 = 20%).
    #[serde(default = "default_volatility_sensibility")]
    pub volatility_sensibility: f64,

    /// Trading-cycle horizon.
    #[serde(default)]
    pub execution_timeframe: ExecutionTimeframe,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            calibration: CalibrationMode::default(),
            risk_factor: default_risk_factor(),
            order_amount_shape_factor: default_order_amount_shape_factor(),
            min_spread_bps: default_min_spread_bps(),
            max_spread_bps: default_max_spread_bps(),
            volatility_buffer_samples: default_volatility_buffer_samples(),
            intensity_buffer_samples: default_intensity_buffer_samples(),
            calibration_interval_s: default_calibration_interval_s(),
            volatility_sensibility: default_volatility_sensibility(),
            execution_timeframe: ExecutionTimeframe::default(),
        }
    }
}

/// Pricing configuration rejected at startup.
#[derive(Debug, Error)]
pub enum PricingConfigError {
    #[error("min_spread_bps ({min}) must be positive and below max_spread_bps ({max})")]
    SpreadBand { min: Decimal, max: Decimal },

    #[error("risk_factor must be positive, got {0}")]
    RiskFactor(f64),

    #[error("volatility_buffer_samples must be at least 2, got {0}")]
    VolatilityBuffer(usize),
}

impl PricingConfig {
    pub fn validate(&self) -> Result<(), PricingConfigError> {
        if self.min_spread_bps <= Decimal::ZERO || self.min_spread_bps >= self.max_spread_bps {
            return Err(PricingConfigError::SpreadBand {
                min: self.min_spread_bps,
                max: self.max_spread_bps,
            });
        }
        if !self.risk_factor.is_finite() || self.risk_factor <= 0.0 {
            return Err(PricingConfigError::RiskFactor(self.risk_factor));
        }
        if self.volatility_buffer_samples < 2 {
            return Err(PricingConfigError::VolatilityBuffer(
                self.volatility_buffer_samples,
            ));
        }
        Ok(())
    }
}

fn default_risk_factor() -> f64 {
    1.0
}
fn default_order_amount_shape_factor() -> f64 {
    1.0
}
fn default_min_spread_bps() -> Decimal {
    Decimal::new(10, 0)
}
fn default_max_spread_bps() -> Decimal {
    Decimal::new(200, 0)
}
fn default_volatility_buffer_samples() -> usize {
    200
}
fn default_intensity_buffer_samples() -> usize {
    200
}
fn default_calibration_interval_s() -> u64 {
    3600
}
fn default_volatility_sensibility() -> f64 {
    0.2
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn defaults_validate() {
        let config = PricingConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.calibration, CalibrationMode::SpreadBounds);
        assert_eq!(config.execution_timeframe, ExecutionTimeframe::Infinite);
        assert_eq!(config.min_spread_bps, dec!(10));
    }

    #[test]
    fn inverted_spread_band_rejected() {
        let config = PricingConfig {
            min_spread_bps: dec!(300),
            max_spread_bps: dec!(200),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(PricingConfigError::SpreadBand { .. })
        ));
    }

    #[test]
    fn toml_defaults_fill_in() {
        let config: PricingConfig = toml::from_str(
            r#"
calibration = "order_book_intensity"
min_spread_bps = 25

[execution_timeframe]
mode = "cycle"
duration_s = 1800
"#,
        )
        .unwrap();
        assert_eq!(config.calibration, CalibrationMode::OrderBookIntensity);
        assert_eq!(config.min_spread_bps, dec!(25));
        assert_eq!(
            config.execution_timeframe,
            ExecutionTimeframe::Cycle { duration_s: 1800 }
        );
        assert_eq!(config.volatility_buffer_samples, 200);
    }
}
