use simlab_core::error::IndicatorError;
use simlab_core::traits::{Indicator, MultiOutputIndicator};
use simlab_core::types::{Bar, IndicatorSpec, IndicatorValue};

use crate::{Atr, BollingerBands, Ema, Macd, Rsi, Sma};

/// Evaluate `spec` at the last bar of `bars`.
///
/// Only the trailing [`IndicatorSpec::lookback`] bars are read, so the cost
/// per call is bounded by the indicator's parameters rather than the length
/// of the history. Returns `Ok(None)` while the history is shorter than the
/// warmup.
pub fn evaluate(spec: &IndicatorSpec, bars: &[Bar]) -> Result<Option<IndicatorValue>, IndicatorError> {
    spec.validate()?;
    if bars.len() < spec.warmup() {
        return Ok(None);
    }
    let bars = &bars[bars.len().saturating_sub(spec.lookback())..];

    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let single = |v: Option<f64>| v.map(|value| IndicatorValue::Single { value });

    let value = match *spec {
        IndicatorSpec::Sma { period } => single(Sma::new(period).latest(&closes)),
        IndicatorSpec::Ema { period } => single(Ema::new(period).latest(&closes)),
        IndicatorSpec::Rsi { period } => single(Rsi::new(period).latest(&closes)),
        IndicatorSpec::Atr { period } => single(Atr::new(period).latest_bars(bars)),
        IndicatorSpec::Macd { fast, slow, signal } => Macd::new(fast, slow, signal)
            .latest(&closes)
            .map(|m| IndicatorValue::Macd {
                macd: m.macd,
                signal: m.signal,
                histogram: m.histogram,
            }),
        IndicatorSpec::Bollinger { period, multiplier } => BollingerBands::new(period, multiplier)
            .latest(&closes)
            .map(|b| IndicatorValue::Bands {
                upper: b.upper,
                middle: b.middle,
                lower: b.lower,
            }),
    };

    Ok(value)
}
