//! Indicator trait definitions.

/// Batch indicator over a price slice.
///
/// `calculate` returns one value per bar once the warmup is satisfied, so the
/// last element corresponds to the last input.
pub trait Indicator: Send + Sync {
    type Output;

    fn calculate(&self, data: &[f64]) -> Vec<Self::Output>;

    /// Minimum data points required for the first output.
    fn period(&self) -> usize;

    fn name(&self) -> &str;

    /// Latest value, if there is enough data.
    fn latest(&self, data: &[f64]) -> Option<Self::Output> {
        if data.len() < self.period() {
            return None;
        }
        self.calculate(data).pop()
    }
}

/// Indicator producing several related values per bar (MACD, Bollinger Bands).
pub trait MultiOutputIndicator: Send + Sync {
    type Outputs;

    fn calculate(&self, data: &[f64]) -> Vec<Self::Outputs>;

    fn period(&self) -> usize;

    fn name(&self) -> &str;

    fn latest(&self, data: &[f64]) -> Option<Self::Outputs> {
        if data.len() < self.period() {
            return None;
        }
        self.calculate(data).pop()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct WindowSum {
        period: usize,
    }

    impl Indicator for WindowSum {
        type Output = f64;

        fn calculate(&self, data: &[f64]) -> Vec<f64> {
            data.windows(self.period).map(|w| w.iter().sum()).collect()
        }

        fn period(&self) -> usize {
            self.period
        }

        fn name(&self) -> &str {
            "window_sum"
        }
    }

    #[test]
    fn test_latest() {
        let ind = WindowSum { period: 3 };

        assert_eq!(ind.latest(&[1.0, 2.0]), None);
        assert_eq!(ind.latest(&[1.0, 2.0, 3.0, 4.0]), Some(9.0));
    }
}
