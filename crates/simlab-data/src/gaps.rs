//! Gap detection in bar series.

use serde::Serialize;
use simlab_core::types::{Bar, Timeframe};

/// Missing bars between two consecutive samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Gap {
    /// Timestamp of the bar before the gap
    pub after: i64,
    /// Timestamp of the bar after the gap
    pub before: i64,
    /// Whole intervals missing
    pub missing: i64,
}

/// Report every place where consecutive bars are more than one interval apart.
///
/// Bars must be in ascending order.
pub fn detect_gaps(bars: &[Bar], timeframe: Timeframe) -> Vec<Gap> {
    bars.windows(2)
        .filter_map(|pair| {
            let intervals = timeframe.intervals_between(pair[0].timestamp, pair[1].timestamp);
            (intervals > 1).then(|| Gap {
                after: pair[0].timestamp,
                before: pair[1].timestamp,
                missing: intervals - 1,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAY: i64 = 86_400_000;

    #[test]
    fn test_detect_gaps() {
        let bars: Vec<Bar> = [0, 1, 2, 5, 6, 8]
            .iter()
            .map(|d| Bar::flat(d * DAY, 1.0))
            .collect();

        let gaps = detect_gaps(&bars, Timeframe::Daily);
        assert_eq!(
            gaps,
            vec![
                Gap { after: 2 * DAY, before: 5 * DAY, missing: 2 },
                Gap { after: 6 * DAY, before: 8 * DAY, missing: 1 },
            ]
        );
    }

    #[test]
    fn test_contiguous_series_has_no_gaps() {
        let bars: Vec<Bar> = (0..10).map(|h| Bar::flat(h * 3_600_000, 1.0)).collect();
        assert!(detect_gaps(&bars, Timeframe::Hour1).is_empty());
        assert!(detect_gaps(&[], Timeframe::Hour1).is_empty());
    }
}
