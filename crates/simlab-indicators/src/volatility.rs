//! Volatility indicators.

use serde::{Deserialize, Serialize};
use simlab_core::traits::{Indicator, MultiOutputIndicator};
use simlab_core::types::Bar;

use crate::smoothing::{mean_std, wilder_series};

/// Rolling population standard deviation.
#[derive(Debug, Clone)]
pub struct StdDev {
    period: usize,
}

impl StdDev {
    /// Create a new standard deviation indicator.
    pub fn new(period: usize) -> Self {
        assert!(period > 1, "Period must be greater than 1");
        Self { period }
    }
}

impl Indicator for StdDev {
    type Output = f64;

    fn calculate(&self, data: &[f64]) -> Vec<f64> {
        data.windows(self.period).map(|w| mean_std(w).1).collect()
    }

    fn period(&self) -> usize {
        self.period
    }

    fn name(&self) -> &str {
        "StdDev"
    }
}

/// Average True Range (ATR) with Wilder's smoothing.
#[derive(Debug, Clone)]
pub struct Atr {
    period: usize,
}

impl Atr {
    /// Create a new ATR indicator. 14 is the common period.
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "Period must be greater than 0");
        Self { period }
    }

    /// ATR from full bars, using the true range against the previous close.
    pub fn calculate_bars(&self, bars: &[Bar]) -> Vec<f64> {
        let tr: Vec<f64> = bars
            .windows(2)
            .map(|w| w[1].true_range(Some(w[0].close)))
            .collect();
        wilder_series(&tr, self.period)
    }

    pub fn latest_bars(&self, bars: &[Bar]) -> Option<f64> {
        self.calculate_bars(bars).pop()
    }
}

impl Indicator for Atr {
    type Output = f64;

    /// Close-only approximation: absolute close-to-close changes stand in for true range.
    fn calculate(&self, data: &[f64]) -> Vec<f64> {
        let tr: Vec<f64> = data.windows(2).map(|w| (w[1] - w[0]).abs()).collect();
        wilder_series(&tr, self.period)
    }

    fn period(&self) -> usize {
        self.period + 1
    }

    fn name(&self) -> &str {
        "ATR"
    }
}

/// Bollinger Bands output for one bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BollingerOutput {
    pub upper: f64,
    /// SMA of the window
    pub middle: f64,
    pub lower: f64,
    /// (upper - lower) / middle
    pub bandwidth: f64,
    /// (price - lower) / (upper - lower)
    pub percent_b: f64,
}

/// Bollinger Bands: SMA plus/minus a multiple of the rolling standard deviation.
#[derive(Debug, Clone)]
pub struct BollingerBands {
    period: usize,
    multiplier: f64,
}

impl BollingerBands {
    pub fn new(period: usize, multiplier: f64) -> Self {
        assert!(period > 1, "Period must be greater than 1");
        assert!(multiplier > 0.0, "Multiplier must be positive");
        Self { period, multiplier }
    }
}

impl Default for BollingerBands {
    fn default() -> Self {
        Self::new(20, 2.0)
    }
}

impl MultiOutputIndicator for BollingerBands {
    type Outputs = BollingerOutput;

    fn calculate(&self, data: &[f64]) -> Vec<BollingerOutput> {
        data.windows(self.period)
            .map(|window| {
                let (mean, std) = mean_std(window);
                let upper = mean + self.multiplier * std;
                let lower = mean - self.multiplier * std;
                let price = window[window.len() - 1];

                BollingerOutput {
                    upper,
                    middle: mean,
                    lower,
                    bandwidth: if mean != 0.0 { (upper - lower) / mean } else { 0.0 },
                    percent_b: if upper > lower {
                        (price - lower) / (upper - lower)
                    } else {
                        0.5
                    },
                }
            })
            .collect()
    }

    fn period(&self) -> usize {
        self.period
    }

    fn name(&self) -> &str {
        "Bollinger Bands"
    }
}
