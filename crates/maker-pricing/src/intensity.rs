//! Order-book liquidity-intensity estimator.
//!
//! Models the arrival intensity of executions at distance `delta` from mid
//! as `lambda(delta) = alpha * exp(-kappa * delta)` and fits (alpha, kappa)
//! by log-linear least squares over a rolling window of book snapshots.
//! Depth resting at a level is the observable proxy for intensity at that
//! distance, the same way the spread-band mode proxies volatility with
//! sample dispersion.

use std::collections::VecDeque;

use maker_exchange::OrderBookSnapshot;

/// Fitted intensity-curve coefficients.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntensityFit {
    pub alpha: f64,
    pub kappa: f64,
}

/// One observation: distance from mid (absolute price units) and the depth
/// resting there.
#[derive(Debug, Clone, Copy)]
struct DepthPoint {
    delta: f64,
    volume: f64,
}

/// Rolling window of per-snapshot depth observations.
#[derive(Debug)]
pub struct TradingIntensityEstimator {
    snapshots: VecDeque<Vec<DepthPoint>>,
    capacity: usize,
}

impl TradingIntensityEstimator {
    pub fn new(capacity: usize) -> Self {
        Self {
            snapshots: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    /// Record one snapshot. Snapshots without a valid mid are skipped.
    pub fn record(&mut self, book: &OrderBookSnapshot) {
        let Some(mid) = book.mid_price() else {
            return;
        };
        let mid = mid.to_f64();
        let mut points = Vec::with_capacity(book.bids.len() + book.asks.len());
        for level in book.bids.iter().chain(book.asks.iter()) {
            let delta = (level.price.to_f64() - mid).abs();
            let volume = level.size.to_f64();
            if delta > 0.0 && volume > 0.0 {
                points.push(DepthPoint { delta, volume });
            }
        }
        if points.is_empty() {
            return;
        }
        if self.snapshots.len() == self.capacity {
            self.snapshots.pop_front();
        }
        self.snapshots.push_back(points);
    }

    /// True once the window holds `capacity` snapshots.
    pub fn is_ready(&self) -> bool {
        self.snapshots.len() >= self.capacity
    }

    /// Snapshots still needed before the fit is usable.
    pub fn samples_remaining(&self) -> usize {
        self.capacity.saturating_sub(self.snapshots.len())
    }

    /// Least-squares fit of `ln(volume) = ln(alpha) - kappa * delta` over
    /// every recorded point. `None` when the observations cannot identify
    /// the curve (fewer than two distinct deltas, or a non-decaying book).
    pub fn fit(&self) -> Option<IntensityFit> {
        let points: Vec<DepthPoint> = self.snapshots.iter().flatten().copied().collect();
        if points.len() < 2 {
            return None;
        }

        let n = points.len() as f64;
        let sum_x: f64 = points.iter().map(|p| p.delta).sum();
        let sum_y: f64 = points.iter().map(|p| p.volume.ln()).sum();
        let sum_xx: f64 = points.iter().map(|p| p.delta * p.delta).sum();
        let sum_xy: f64 = points.iter().map(|p| p.delta * p.volume.ln()).sum();

        let denom = n * sum_xx - sum_x * sum_x;
        if denom.abs() < f64::EPSILON {
            return None;
        }
        let slope = (n * sum_xy - sum_x * sum_y) / denom;
        let intercept = (sum_y - slope * sum_x) / n;

        let kappa = -slope;
        let alpha = intercept.exp();
        if !kappa.is_finite() || kappa <= 0.0 || !alpha.is_finite() || alpha <= 0.0 {
            return None;
        }
        Some(IntensityFit { alpha, kappa })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maker_core::{Price, Size};
    use maker_exchange::BookLevel;
    use rust_decimal::Decimal;

    fn decaying_book(mid: f64, kappa: f64) -> OrderBookSnapshot {
        let level = |price: f64, size: f64| {
            BookLevel::new(
                Price::new(Decimal::from_f64_retain(price).unwrap()),
                Size::new(Decimal::from_f64_retain(size).unwrap()),
            )
        };
        let mut bids = Vec::new();
        let mut asks = Vec::new();
        for i in 1..=5 {
            let delta = i as f64;
            let size = 10.0 * (-kappa * delta).exp();
            bids.push(level(mid - delta, size));
            asks.push(level(mid + delta, size));
        }
        OrderBookSnapshot::new(bids, asks)
    }

    #[test]
    fn recovers_decay_coefficient() {
        let mut est = TradingIntensityEstimator::new(3);
        for _ in 0..3 {
            est.record(&decaying_book(100.0, 0.5));
        }
        assert!(est.is_ready());

        let fit = est.fit().unwrap();
        assert!((fit.kappa - 0.5).abs() < 1e-6, "kappa = {}", fit.kappa);
        assert!((fit.alpha - 10.0).abs() < 1e-6, "alpha = {}", fit.alpha);
    }

    #[test]
    fn flat_book_has_no_fit() {
        let level = |price: i64| {
            BookLevel::new(
                Price::new(Decimal::from(price)),
                Size::new(Decimal::from(7)),
            )
        };
        let book = OrderBookSnapshot::new(
            vec![level(99), level(98)],
            vec![level(101), level(102)],
        );
        let mut est = TradingIntensityEstimator::new(1);
        est.record(&book);
        // Uniform depth: slope 0 -> kappa 0 -> unidentifiable.
        assert!(est.fit().is_none());
    }

    #[test]
    fn skips_one_sided_snapshots() {
        let mut est = TradingIntensityEstimator::new(1);
        est.record(&OrderBookSnapshot::default());
        assert!(!est.is_ready());
        assert_eq!(est.samples_remaining(), 1);
    }

    #[test]
    fn window_evicts_oldest_snapshot() {
        let mut est = TradingIntensityEstimator::new(2);
        est.record(&decaying_book(100.0, 0.3));
        est.record(&decaying_book(100.0, 0.3));
        est.record(&decaying_book(100.0, 0.8));
        // Window holds one 0.3 and one 0.8 snapshot; the fit sits between.
        let fit = est.fit().unwrap();
        assert!(fit.kappa > 0.3 && fit.kappa < 0.8);
    }
}
