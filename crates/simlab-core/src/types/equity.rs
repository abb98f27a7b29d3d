//! Equity curve.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::convert::decimal_to_f64;
use crate::error::CurveError;

/// A single (timestamp, equity) sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    /// Unix timestamp in milliseconds
    pub timestamp: i64,
    pub equity: Decimal,
}

/// Append-only equity samples with strictly increasing timestamps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EquityCurve {
    points: Vec<EquityPoint>,
}

impl EquityCurve {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a sample. Rejects timestamps that do not move forward.
    pub fn push(&mut self, timestamp: i64, equity: Decimal) -> Result<(), CurveError> {
        if let Some(last) = self.points.last() {
            if timestamp <= last.timestamp {
                return Err(CurveError::NonIncreasing {
                    last: last.timestamp,
                    timestamp,
                });
            }
        }
        self.points.push(EquityPoint { timestamp, equity });
        Ok(())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[EquityPoint] {
        &self.points
    }

    pub fn first(&self) -> Option<&EquityPoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&EquityPoint> {
        self.points.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EquityPoint> {
        self.points.iter()
    }

    pub fn timestamps(&self) -> Vec<i64> {
        self.points.iter().map(|p| p.timestamp).collect()
    }

    /// Equity values as floats.
    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| decimal_to_f64(p.equity)).collect()
    }

    /// Simple per-sample returns. A sample following a non-positive equity yields 0.
    pub fn returns(&self) -> Vec<f64> {
        self.values()
            .windows(2)
            .map(|w| if w[0] > 0.0 { w[1] / w[0] - 1.0 } else { 0.0 })
            .collect()
    }

    /// Copy of the curve with every equity value multiplied by `factor`.
    pub fn scaled(&self, factor: Decimal) -> Self {
        Self {
            points: self
                .points
                .iter()
                .map(|p| EquityPoint {
                    timestamp: p.timestamp,
                    equity: p.equity * factor,
                })
                .collect(),
        }
    }

    /// Append every sample of `other`, keeping timestamps strictly increasing.
    pub fn extend_from(&mut self, other: &EquityCurve) -> Result<(), CurveError> {
        for p in other.iter() {
            self.push(p.timestamp, p.equity)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_push_rejects_non_increasing() {
        let mut curve = EquityCurve::new();
        curve.push(1, dec!(100)).unwrap();
        curve.push(2, dec!(101)).unwrap();

        assert_eq!(
            curve.push(2, dec!(102)),
            Err(CurveError::NonIncreasing { last: 2, timestamp: 2 })
        );
        assert!(curve.push(1, dec!(102)).is_err());
        assert_eq!(curve.len(), 2);
    }

    #[test]
    fn test_returns() {
        let mut curve = EquityCurve::new();
        curve.push(1, dec!(100)).unwrap();
        curve.push(2, dec!(110)).unwrap();
        curve.push(3, dec!(99)).unwrap();

        let returns = curve.returns();
        assert_eq!(returns.len(), 2);
        assert!((returns[0] - 0.10).abs() < 1e-12);
        assert!((returns[1] + 0.10).abs() < 1e-12);
    }

    #[test]
    fn test_scaled_and_extend() {
        let mut first = EquityCurve::new();
        first.push(1, dec!(100)).unwrap();
        first.push(2, dec!(120)).unwrap();

        let mut second = EquityCurve::new();
        second.push(3, dec!(50)).unwrap();
        second.push(4, dec!(55)).unwrap();

        first.extend_from(&second.scaled(dec!(2.4))).unwrap();
        assert_eq!(first.len(), 4);
        assert_eq!(first.points()[2].equity, dec!(120.0));
        assert_eq!(first.last().unwrap().equity, dec!(132.0));
    }
}
