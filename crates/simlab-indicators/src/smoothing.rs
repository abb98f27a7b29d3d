//! Shared smoothing kernels.

/// Exponential smoothing seeded with the SMA of the first `period` values.
///
/// Output has `values.len() - period + 1` elements, or none when the input
/// is shorter than `period`.
pub(crate) fn ema_series(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || values.len() < period {
        return Vec::new();
    }

    let alpha = 2.0 / (period as f64 + 1.0);
    let seed = values[..period].iter().sum::<f64>() / period as f64;

    let mut out = Vec::with_capacity(values.len() - period + 1);
    out.push(seed);
    let mut ema = seed;
    for &v in &values[period..] {
        ema += alpha * (v - ema);
        out.push(ema);
    }
    out
}

/// Wilder's smoothing: `avg = (prev * (period - 1) + value) / period`.
pub(crate) fn wilder_series(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || values.len() < period {
        return Vec::new();
    }

    let n = period as f64;
    let mut avg = values[..period].iter().sum::<f64>() / n;

    let mut out = Vec::with_capacity(values.len() - period + 1);
    out.push(avg);
    for &v in &values[period..] {
        avg = (avg * (n - 1.0) + v) / n;
        out.push(avg);
    }
    out
}

/// Population mean and standard deviation of a window.
pub(crate) fn mean_std(window: &[f64]) -> (f64, f64) {
    let n = window.len() as f64;
    let mean = window.iter().sum::<f64>() / n;
    let var = window.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ema_series() {
        let out = ema_series(&[1.0, 2.0, 3.0, 4.0, 5.0], 3);
        // alpha = 0.5, seed = 2
        assert_eq!(out, vec![2.0, 3.0, 4.0]);
        assert!(ema_series(&[1.0], 3).is_empty());
    }

    #[test]
    fn test_wilder_series() {
        let out = wilder_series(&[2.0, 4.0, 6.0, 8.0], 2);
        // seed 3, then (3 + 6) / 2, then (4.5 + 8) / 2
        assert_eq!(out, vec![3.0, 4.5, 6.25]);
    }

    #[test]
    fn test_mean_std() {
        let (mean, std) = mean_std(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert!((mean - 5.0).abs() < 1e-12);
        assert!((std - 2.0).abs() < 1e-12);
    }
}
