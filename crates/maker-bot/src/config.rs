//! Application configuration.

use std::path::Path;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use maker_strategy::StrategyConfig;

use crate::error::{AppError, AppResult};

/// Paper-exchange simulation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperConfig {
    /// Initial quote-asset funding.
    #[serde(default = "default_quote_balance")]
    pub initial_quote_balance: Decimal,

    /// Initial base-asset funding.
    #[serde(default = "default_base_balance")]
    pub initial_base_balance: Decimal,

    /// Price tick size.
    #[serde(default = "default_tick_size")]
    pub tick_size: Decimal,

    /// Amount lot size.
    #[serde(default = "default_lot_size")]
    pub lot_size: Decimal,

    /// Maker fee as a fraction (0.001 = 0.1%).
    #[serde(default = "default_maker_fee_pct")]
    pub maker_fee_pct: Decimal,

    /// Taker fee as a fraction.
    #[serde(default = "default_taker_fee_pct")]
    pub taker_fee_pct: Decimal,

    /// Starting mid price for the simulated feed.
    #[serde(default = "default_initial_mid")]
    pub initial_mid: Decimal,

    /// Half-spread of the simulated book, in basis points of mid.
    #[serde(default = "default_feed_half_spread_bps")]
    pub feed_half_spread_bps: Decimal,

    /// Amplitude of the deterministic price wave, in basis points of the
    /// starting mid.
    #[serde(default = "default_feed_wave_amplitude_bps")]
    pub feed_wave_amplitude_bps: Decimal,

    /// Period of the price wave, in ticks.
    #[serde(default = "default_feed_wave_period_ticks")]
    pub feed_wave_period_ticks: u64,
}

impl Default for PaperConfig {
    fn default() -> Self {
        Self {
            initial_quote_balance: default_quote_balance(),
            initial_base_balance: default_base_balance(),
            tick_size: default_tick_size(),
            lot_size: default_lot_size(),
            maker_fee_pct: default_maker_fee_pct(),
            taker_fee_pct: default_taker_fee_pct(),
            initial_mid: default_initial_mid(),
            feed_half_spread_bps: default_feed_half_spread_bps(),
            feed_wave_amplitude_bps: default_feed_wave_amplitude_bps(),
            feed_wave_period_ticks: default_feed_wave_period_ticks(),
        }
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Venue name used in the trading context.
    #[serde(default = "default_venue")]
    pub venue: String,

    /// Trading pair, `BASE-QUOTE`.
    #[serde(default = "default_pair")]
    pub pair: String,

    /// Clock cadence driving the decision loop.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Paper exchange section.
    #[serde(default)]
    pub paper: PaperConfig,

    /// Strategy section.
    #[serde(default)]
    pub strategy: StrategyConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            venue: default_venue(),
            pair: default_pair(),
            tick_interval_ms: default_tick_interval_ms(),
            paper: PaperConfig::default(),
            strategy: StrategyConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load from `path` if it exists, otherwise fall back to defaults.
    pub fn load(path: &str) -> AppResult<Self> {
        if Path::new(path).exists() {
            Self::from_file(path)
        } else {
            tracing::warn!(path = %path, "config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load from a specific file.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("failed to read config: {e}")))?;
        toml::from_str(&content)
            .map_err(|e| AppError::Config(format!("failed to parse config: {e}")))
    }

    /// Cross-field validation; fatal at startup.
    pub fn validate(&self) -> AppResult<()> {
        if self.tick_interval_ms == 0 {
            return Err(AppError::Config("tick_interval_ms must be positive".into()));
        }
        if self.paper.initial_mid <= Decimal::ZERO {
            return Err(AppError::Config("paper.initial_mid must be positive".into()));
        }
        self.pair
            .parse::<maker_core::TradingPair>()
            .map_err(AppError::Core)?;
        self.strategy.validate().map_err(AppError::Strategy)?;
        Ok(())
    }
}

fn default_venue() -> String {
    "paper".to_string()
}
fn default_pair() -> String {
    "ETH-USDT".to_string()
}
fn default_tick_interval_ms() -> u64 {
    1000
}
fn default_quote_balance() -> Decimal {
    Decimal::new(10_000, 0)
}
fn default_base_balance() -> Decimal {
    Decimal::new(5, 0)
}
fn default_tick_size() -> Decimal {
    Decimal::new(1, 2)
}
fn default_lot_size() -> Decimal {
    Decimal::new(1, 4)
}
fn default_maker_fee_pct() -> Decimal {
    Decimal::new(1, 3)
}
fn default_taker_fee_pct() -> Decimal {
    Decimal::new(2, 3)
}
fn default_initial_mid() -> Decimal {
    Decimal::new(2000, 0)
}
fn default_feed_half_spread_bps() -> Decimal {
    Decimal::new(5, 0)
}
fn default_feed_wave_amplitude_bps() -> Decimal {
    Decimal::new(30, 0)
}
fn default_feed_wave_period_ticks() -> u64 {
    600
}
