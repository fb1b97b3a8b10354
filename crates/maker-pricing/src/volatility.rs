//! Rolling mid-price volatility estimator.
//!
//! A fixed-length window of mid-price samples; the estimate is the
//! population standard deviation of the window. Until the window is full
//! the model falls back to half the current bid/ask spread.

use std::collections::VecDeque;

use maker_core::Price;

/// Fixed-length rolling buffer of mid-price samples.
#[derive(Debug)]
pub struct VolatilitySampler {
    samples: VecDeque<f64>,
    capacity: usize,
}

impl VolatilitySampler {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity: capacity.max(2),
        }
    }

    /// Push one mid-price sample, evicting the oldest when full.
    pub fn record(&mut self, mid: Price) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(mid.to_f64());
    }

    /// True once the buffer holds `capacity` samples.
    pub fn is_ready(&self) -> bool {
        self.samples.len() >= self.capacity
    }

    /// Samples still needed before the estimate is usable.
    pub fn samples_remaining(&self) -> usize {
        self.capacity.saturating_sub(self.samples.len())
    }

    /// Dispersion of the sample window; `None` until the buffer is full.
    pub fn volatility(&self) -> Option<f64> {
        if !self.is_ready() {
            return None;
        }
        let n = self.samples.len() as f64;
        let mean = self.samples.iter().sum::<f64>() / n;
        let var = self
            .samples
            .iter()
            .map(|s| {
                let d = s - mean;
                d * d
            })
            .sum::<f64>()
            / n;
        Some(var.sqrt())
    }

    /// Most recent sample.
    pub fn latest(&self) -> Option<f64> {
        self.samples.back().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn px(v: i64) -> Price {
        Price::new(Decimal::from(v))
    }

    #[test]
    fn not_ready_until_capacity() {
        let mut vol = VolatilitySampler::new(3);
        assert_eq!(vol.samples_remaining(), 3);
        vol.record(px(100));
        vol.record(px(101));
        assert!(!vol.is_ready());
        assert_eq!(vol.samples_remaining(), 1);
        assert!(vol.volatility().is_none());

        vol.record(px(102));
        assert!(vol.is_ready());
        assert_eq!(vol.samples_remaining(), 0);
    }

    #[test]
    fn constant_prices_have_zero_volatility() {
        let mut vol = VolatilitySampler::new(4);
        for _ in 0..4 {
            vol.record(px(100));
        }
        assert_eq!(vol.volatility().unwrap(), 0.0);
    }

    #[test]
    fn dispersion_matches_population_std() {
        let mut vol = VolatilitySampler::new(4);
        for v in [98, 100, 100, 102] {
            vol.record(px(v));
        }
        // mean 100, var = (4 + 0 + 0 + 4)/4 = 2
        let sigma = vol.volatility().unwrap();
        assert!((sigma - 2f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn window_slides() {
        let mut vol = VolatilitySampler::new(2);
        vol.record(px(1));
        vol.record(px(1));
        vol.record(px(5));
        // Window is now [1, 5]: mean 3, var 4, std 2.
        assert!((vol.volatility().unwrap() - 2.0).abs() < 1e-12);
        assert_eq!(vol.latest().unwrap(), 5.0);
    }
}
