//! Reservation price and optimal spread derivation.

use rust_decimal::prelude::ToPrimitive;
use tracing::{debug, warn};

use maker_core::Price;
use maker_exchange::OrderBookSnapshot;

use crate::config::{CalibrationMode, ExecutionTimeframe, PricingConfig};
use crate::intensity::TradingIntensityEstimator;
use crate::volatility::VolatilitySampler;

const GAMMA_FLOOR: f64 = 1e-9;
const KAPPA_FLOOR: f64 = 1e-9;
const EXP_ARG_CEIL: f64 = 60.0;

/// Model lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelState {
    /// Estimator buffers still filling; no quotes can be computed.
    Uninitialized,
    /// Calibrated and computable.
    Ready,
    /// A recalibration ran this tick (volatility drift or cycle rollover).
    Recalibrating,
}

/// One tick's pricing output, already clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuoteSet {
    pub reservation_price: Price,
    pub optimal_spread: Price,
    pub optimal_bid: Price,
    pub optimal_ask: Price,
}

/// The pricing model: estimators, risk coefficients and quote formulas.
#[derive(Debug)]
pub struct QuoteModel {
    config: PricingConfig,
    vol: VolatilitySampler,
    intensity: Option<TradingIntensityEstimator>,
    gamma: f64,
    kappa: f64,
    alpha: f64,
    /// Volatility snapshot taken at the last calibration.
    last_calibration_vol: f64,
    next_calibration_ms: u64,
    cycle_end_ms: Option<u64>,
    cycle_rolled: bool,
    /// Half the latest observed bid/ask spread; volatility fallback while
    /// the sample buffer fills.
    half_spread: f64,
    state: ModelState,
}

impl QuoteModel {
    pub fn new(config: PricingConfig) -> Self {
        let vol = VolatilitySampler::new(config.volatility_buffer_samples);
        let intensity = match config.calibration {
            CalibrationMode::OrderBookIntensity => Some(TradingIntensityEstimator::new(
                config.intensity_buffer_samples,
            )),
            CalibrationMode::SpreadBounds => None,
        };
        Self {
            gamma: config.risk_factor,
            kappa: 1.0,
            alpha: 1.0,
            config,
            vol,
            intensity,
            last_calibration_vol: 0.0,
            next_calibration_ms: 0,
            cycle_end_ms: None,
            cycle_rolled: false,
            half_spread: 0.0,
            state: ModelState::Uninitialized,
        }
    }

    /// Feed one top-of-book observation.
    pub fn sample(&mut self, best_bid: Price, best_ask: Price) {
        let bid = best_bid.to_f64();
        let ask = best_ask.to_f64();
        if bid <= 0.0 || ask <= 0.0 || bid >= ask {
            return;
        }
        self.half_spread = (ask - bid) / 2.0;
        self.vol.record(Price::from_f64((bid + ask) / 2.0));
    }

    /// Feed one depth snapshot (intensity calibration mode only).
    pub fn observe_book(&mut self, book: &OrderBookSnapshot) {
        if let Some(intensity) = self.intensity.as_mut() {
            intensity.record(book);
        }
    }

    /// True once every required estimator buffer is full.
    pub fn is_ready(&self) -> bool {
        self.vol.is_ready() && self.intensity.as_ref().map_or(true, |i| i.is_ready())
    }

    /// Samples still needed before quoting can start.
    pub fn samples_remaining(&self) -> usize {
        let intensity = self
            .intensity
            .as_ref()
            .map(|i| i.samples_remaining())
            .unwrap_or(0);
        self.vol.samples_remaining().max(intensity)
    }

    /// Current volatility estimate, falling back to half the observed
    /// spread while the buffer is warming.
    pub fn volatility(&self) -> f64 {
        self.vol.volatility().unwrap_or(self.half_spread)
    }

    pub fn state(&self) -> ModelState {
        self.state
    }

    pub fn gamma(&self) -> f64 {
        self.gamma
    }

    pub fn kappa(&self) -> f64 {
        self.kappa
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Eta for the order-amount shape transformer.
    pub fn eta(&self) -> f64 {
        self.config.order_amount_shape_factor
    }

    /// Fraction of the trading cycle remaining, in (0, 1]. Detects cycle
    /// rollover and flags a recalibration. Always 1 for the infinite
    /// timeframe (its formulas do not use it).
    fn time_left_fraction(&mut self, now_ms: u64) -> f64 {
        match self.config.execution_timeframe {
            ExecutionTimeframe::Infinite => 1.0,
            ExecutionTimeframe::Cycle { duration_s } => {
                let duration_ms = duration_s.max(1) * 1000;
                let end = *self.cycle_end_ms.get_or_insert(now_ms + duration_ms);
                if now_ms >= end {
                    self.cycle_end_ms = Some(now_ms + duration_ms);
                    self.cycle_rolled = true;
                    return 1.0;
                }
                let left = (end - now_ms) as f64 / duration_ms as f64;
                left.clamp(f64::EPSILON, 1.0)
            }
        }
    }

    /// Whether a recalibration is due: scheduled interval elapsed, observed
    /// volatility drifted beyond the sensibility threshold, or the trading
    /// cycle rolled over.
    pub fn should_recalibrate(&self, now_ms: u64) -> bool {
        if self.state == ModelState::Uninitialized {
            return false;
        }
        if self.cycle_rolled || now_ms >= self.next_calibration_ms {
            return true;
        }
        if self.last_calibration_vol > 0.0 {
            let drift =
                (self.volatility() - self.last_calibration_vol).abs() / self.last_calibration_vol;
            return drift > self.config.volatility_sensibility;
        }
        false
    }

    /// Derive the risk coefficients from the current estimators.
    pub fn recalculate_parameters(&mut self, mid: Price, now_ms: u64) {
        let vol = self.volatility();
        let mid_f = mid.to_f64();
        let t = self.time_left_fraction(now_ms);

        match self.config.calibration {
            CalibrationMode::SpreadBounds => {
                let min_s = mid_f * self.min_spread_fraction();
                let max_s = mid_f * self.max_spread_fraction();
                // Gamma is fixed so the reservation-price offset at maximal
                // skew (|q| = 1) spans half the allowed band.
                let denom = 2.0 * vol * vol * t;
                self.gamma = if denom > f64::EPSILON {
                    ((max_s - min_s) / denom).max(GAMMA_FLOOR)
                } else {
                    self.config.risk_factor.max(GAMMA_FLOOR)
                };
                // Kappa follows so the optimal spread equals max_spread at
                // the calibration volatility.
                let exp_arg =
                    (self.gamma * (max_s - self.gamma * vol * vol * t) / 2.0).min(EXP_ARG_CEIL);
                self.kappa = if exp_arg > f64::EPSILON {
                    (self.gamma / (exp_arg.exp() - 1.0)).max(KAPPA_FLOOR)
                } else {
                    KAPPA_FLOOR
                };
            }
            CalibrationMode::OrderBookIntensity => {
                self.gamma = self.config.risk_factor.max(GAMMA_FLOOR);
                match self.intensity.as_ref().and_then(|i| i.fit()) {
                    Some(fit) => {
                        self.alpha = fit.alpha;
                        self.kappa = fit.kappa.max(KAPPA_FLOOR);
                    }
                    // Keep the previous coefficients; the fit will identify
                    // once the book shows decay again.
                    None => warn!("intensity fit unavailable, keeping previous coefficients"),
                }
            }
        }

        self.last_calibration_vol = vol;
        self.next_calibration_ms = now_ms + self.config.calibration_interval_s * 1000;
        self.cycle_rolled = false;
        self.state = if self.state == ModelState::Uninitialized {
            ModelState::Ready
        } else {
            ModelState::Recalibrating
        };
        debug!(
            gamma = self.gamma,
            kappa = self.kappa,
            alpha = self.alpha,
            volatility = vol,
            "pricing parameters recalibrated"
        );
    }

    /// Mark the recalibration transition observed; back to `Ready`.
    pub fn settle_state(&mut self) {
        if self.state == ModelState::Recalibrating {
            self.state = ModelState::Ready;
        }
    }

    /// Reservation price and optimal bid/ask for inventory skew `q`.
    ///
    /// `q` is the normalized inventory deviation from target (positive =
    /// long). Output is clamped so `bid <= reservation <= ask` and the
    /// total spread sits inside the configured band around mid.
    pub fn compute_quotes(&mut self, mid: Price, q: f64, now_ms: u64) -> QuoteSet {
        if self.state == ModelState::Uninitialized {
            self.recalculate_parameters(mid, now_ms);
        }

        let mid_f = mid.to_f64();
        let vol = self.volatility();
        let var = vol * vol;

        let (reservation, bid, ask) = match self.config.execution_timeframe {
            ExecutionTimeframe::Cycle { .. } => {
                let t = self.time_left_fraction(now_ms);
                let r = mid_f - q * self.gamma * var * t;
                let spread = self.gamma * var * t
                    + (2.0 / self.gamma) * (1.0 + self.gamma / self.kappa).ln();
                (r, r - spread / 2.0, r + spread / 2.0)
            }
            ExecutionTimeframe::Infinite => {
                // Asymptotic closed form; per-side offsets with their own
                // inventory scaling, not a limit of the finite formula.
                let half_term = (1.0 / self.gamma) * (1.0 + self.gamma / self.kappa).ln();
                let shape = (1.0 + self.gamma / self.kappa).powf(1.0 + self.kappa / self.gamma);
                let vol_term =
                    ((var * self.gamma) / (2.0 * self.kappa * self.alpha) * shape).sqrt();
                let bid_offset = half_term + (2.0 * q + 1.0) / 2.0 * vol_term;
                let ask_offset = half_term - (2.0 * q - 1.0) / 2.0 * vol_term;
                let bid = mid_f - bid_offset;
                let ask = mid_f + ask_offset;
                ((bid + ask) / 2.0, bid, ask)
            }
        };

        self.clamp_quotes(mid_f, reservation, bid, ask)
    }

    fn min_spread_fraction(&self) -> f64 {
        self.config.min_spread_bps.to_f64().unwrap_or(0.0) / 10_000.0
    }

    fn max_spread_fraction(&self) -> f64 {
        self.config.max_spread_bps.to_f64().unwrap_or(0.0) / 10_000.0
    }

    /// Clamp each side into its band around mid, floor everything at zero,
    /// then pull the reservation price inside [bid, ask].
    fn clamp_quotes(&self, mid: f64, reservation: f64, bid: f64, ask: f64) -> QuoteSet {
        let min_half = self.min_spread_fraction() / 2.0;
        let max_half = self.max_spread_fraction() / 2.0;

        let bid = bid
            .clamp(mid * (1.0 - max_half), mid * (1.0 - min_half))
            .max(0.0);
        let ask = ask
            .clamp(mid * (1.0 + min_half), mid * (1.0 + max_half))
            .max(0.0);
        let reservation = reservation.clamp(bid, ask);
        let spread = (ask - bid).max(0.0);

        QuoteSet {
            reservation_price: Price::from_f64(reservation),
            optimal_spread: Price::from_f64(spread),
            optimal_bid: Price::from_f64(bid),
            optimal_ask: Price::from_f64(ask),
        }
    }
}
