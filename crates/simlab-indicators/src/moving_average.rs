//! Moving average indicators.

use simlab_core::traits::Indicator;

use crate::smoothing::ema_series;

/// Simple Moving Average (SMA).
#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
}

impl Sma {
    /// Create a new SMA with the specified period.
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "Period must be greater than 0");
        Self { period }
    }
}

impl Indicator for Sma {
    type Output = f64;

    fn calculate(&self, data: &[f64]) -> Vec<f64> {
        if data.len() < self.period {
            return vec![];
        }

        let n = self.period as f64;
        let mut sum: f64 = data[..self.period].iter().sum();
        let mut result = Vec::with_capacity(data.len() - self.period + 1);
        result.push(sum / n);

        // Sliding window
        for i in self.period..data.len() {
            sum += data[i] - data[i - self.period];
            result.push(sum / n);
        }

        result
    }

    fn period(&self) -> usize {
        self.period
    }

    fn name(&self) -> &str {
        "SMA"
    }
}

/// Exponential Moving Average (EMA), seeded with the SMA of the first window.
#[derive(Debug, Clone)]
pub struct Ema {
    period: usize,
}

impl Ema {
    /// Create a new EMA with the specified period.
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "Period must be greater than 0");
        Self { period }
    }
}

impl Indicator for Ema {
    type Output = f64;

    fn calculate(&self, data: &[f64]) -> Vec<f64> {
        ema_series(data, self.period)
    }

    fn period(&self) -> usize {
        self.period
    }

    fn name(&self) -> &str {
        "EMA"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sma() {
        let result = Sma::new(3).calculate(&[1.0, 2.0, 3.0, 4.0, 5.0]);

        assert_eq!(result.len(), 3);
        assert!((result[0] - 2.0).abs() < 1e-10);
        assert!((result[2] - 4.0).abs() < 1e-10);
    }

    #[test]
    fn test_sma_insufficient_data() {
        assert!(Sma::new(5).calculate(&[1.0, 2.0, 3.0]).is_empty());
        assert_eq!(Sma::new(5).latest(&[1.0, 2.0, 3.0]), None);
    }

    #[test]
    fn test_ema_reacts_faster_than_sma() {
        let mut data = vec![100.0; 20];
        data.push(110.0);

        let ema = Ema::new(10).latest(&data).unwrap();
        let sma = Sma::new(10).latest(&data).unwrap();

        assert!((sma - 101.0).abs() < 1e-10);
        // alpha = 2 / 11
        assert!((ema - (100.0 + 20.0 / 11.0)).abs() < 1e-10);
        assert!(ema > sma);
    }

    #[test]
    fn test_ema_seed_is_sma() {
        let result = Ema::new(3).calculate(&[1.0, 2.0, 3.0, 4.0]);
        assert!((result[0] - 2.0).abs() < 1e-10);
        assert!((result[1] - 3.0).abs() < 1e-10);
    }
}
