//! Momentum indicators.

use serde::{Deserialize, Serialize};
use simlab_core::traits::{Indicator, MultiOutputIndicator};

use crate::smoothing::{ema_series, wilder_series};

/// Relative Strength Index (RSI) with Wilder's smoothing.
#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
}

impl Rsi {
    /// Create a new RSI indicator. 14 is the common period.
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "Period must be greater than 0");
        Self { period }
    }
}

impl Indicator for Rsi {
    type Output = f64;

    fn calculate(&self, data: &[f64]) -> Vec<f64> {
        if data.len() <= self.period {
            return vec![];
        }

        let (gains, losses): (Vec<f64>, Vec<f64>) = data
            .windows(2)
            .map(|w| {
                let change = w[1] - w[0];
                (change.max(0.0), (-change).max(0.0))
            })
            .unzip();

        let avg_gains = wilder_series(&gains, self.period);
        let avg_losses = wilder_series(&losses, self.period);

        avg_gains
            .iter()
            .zip(avg_losses.iter())
            .map(|(&gain, &loss)| match (gain == 0.0, loss == 0.0) {
                // Flat series: neither side dominates
                (true, true) => 50.0,
                (_, true) => 100.0,
                _ => 100.0 - 100.0 / (1.0 + gain / loss),
            })
            .collect()
    }

    fn period(&self) -> usize {
        self.period + 1
    }

    fn name(&self) -> &str {
        "RSI"
    }
}

/// MACD output for one bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacdOutput {
    /// Fast EMA minus slow EMA
    pub macd: f64,
    /// EMA of the MACD line
    pub signal: f64,
    /// MACD minus signal
    pub histogram: f64,
}

/// Moving Average Convergence Divergence.
#[derive(Debug, Clone)]
pub struct Macd {
    fast: usize,
    slow: usize,
    signal: usize,
}

impl Macd {
    /// Create a MACD with custom periods.
    pub fn new(fast: usize, slow: usize, signal: usize) -> Self {
        assert!(fast > 0 && signal > 0, "Periods must be greater than 0");
        assert!(fast < slow, "Fast period must be less than slow period");
        Self { fast, slow, signal }
    }
}

impl Default for Macd {
    fn default() -> Self {
        Self::new(12, 26, 9)
    }
}

impl MultiOutputIndicator for Macd {
    type Outputs = MacdOutput;

    fn calculate(&self, data: &[f64]) -> Vec<MacdOutput> {
        let slow = ema_series(data, self.slow);
        if slow.is_empty() {
            return vec![];
        }
        // The fast EMA starts earlier; drop its head so both align on the same bars
        let fast = ema_series(data, self.fast);
        let fast = &fast[self.slow - self.fast..];

        let line: Vec<f64> = fast.iter().zip(&slow).map(|(f, s)| f - s).collect();
        if line.len() < self.signal {
            return vec![];
        }
        let signal = ema_series(&line, self.signal);

        line[self.signal - 1..]
            .iter()
            .zip(signal)
            .map(|(&macd, signal)| MacdOutput {
                macd,
                signal,
                histogram: macd - signal,
            })
            .collect()
    }

    fn period(&self) -> usize {
        self.slow + self.signal - 1
    }

    fn name(&self) -> &str {
        "MACD"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rsi_bounds() {
        let up: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let down: Vec<f64> = (0..30).map(|i| 100.0 - i as f64).collect();
        let flat = vec![100.0; 30];

        assert_eq!(Rsi::new(14).latest(&up), Some(100.0));
        assert!(Rsi::new(14).latest(&down).unwrap() < 1e-9);
        assert_eq!(Rsi::new(14).latest(&flat), Some(50.0));
    }

    #[test]
    fn test_rsi_output_length() {
        let data: Vec<f64> = (0..20).map(|i| (i as f64 * 0.7).sin() * 5.0 + 50.0).collect();
        let rsi = Rsi::new(14);

        assert_eq!(rsi.calculate(&data).len(), data.len() - 14);
        assert!(rsi.calculate(&data[..14]).is_empty());
    }

    #[test]
    fn test_macd_alignment() {
        let data: Vec<f64> = (0..60).map(|i| 100.0 + (i as f64 * 0.2).sin() * 3.0).collect();
        let macd = Macd::new(3, 6, 4);
        let out = macd.calculate(&data);

        assert_eq!(out.len(), data.len() - macd.period() + 1);
        let last = out.last().unwrap();
        assert!((last.histogram - (last.macd - last.signal)).abs() < 1e-12);
    }

    #[test]
    fn test_macd_insufficient_data() {
        let macd = Macd::default();
        assert!(macd.latest(&vec![1.0; 33]).is_none());
        assert!(macd.latest(&vec![1.0; 34]).is_some());
    }
}
