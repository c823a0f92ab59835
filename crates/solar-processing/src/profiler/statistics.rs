//! Statistical functions over plain `f64` samples.
//!
//! Sample moments use unbiased estimators: `n - 1` for variance,
//! the adjusted Fisher-Pearson coefficient for skewness and the bias-adjusted
//! excess kurtosis. Z-scores use the population standard deviation.

use std::cmp::Ordering;

/// Arithmetic mean, `None` for an empty sample.
pub(crate) fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample variance (`ddof = 1`), `None` below two values.
pub(crate) fn sample_variance(values: &[f64]) -> Option<f64> {
    let n = values.len();
    if n < 2 {
        return None;
    }
    let m = mean(values)?;
    let sum_sq: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    Some(sum_sq / (n - 1) as f64)
}

/// Sample standard deviation (`ddof = 1`).
pub(crate) fn sample_std(values: &[f64]) -> Option<f64> {
    sample_variance(values).map(f64::sqrt)
}

/// Population standard deviation (`ddof = 0`).
pub(crate) fn population_std(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    let sum_sq: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    Some((sum_sq / values.len() as f64).sqrt())
}

/// Bias-adjusted skewness, `None` below three values.
pub(crate) fn skewness(values: &[f64]) -> Option<f64> {
    let n = values.len();
    if n < 3 {
        return None;
    }
    let m = mean(values)?;
    let nf = n as f64;
    let m2 = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / nf;
    if m2 == 0.0 {
        return Some(0.0);
    }
    let m3 = values.iter().map(|v| (v - m).powi(3)).sum::<f64>() / nf;
    let g1 = m3 / m2.powf(1.5);
    Some(g1 * (nf * (nf - 1.0)).sqrt() / (nf - 2.0))
}

/// Bias-adjusted excess kurtosis, `None` below four values.
pub(crate) fn kurtosis(values: &[f64]) -> Option<f64> {
    let n = values.len();
    if n < 4 {
        return None;
    }
    let m = mean(values)?;
    let nf = n as f64;
    let sum2: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    if sum2 == 0.0 {
        return Some(0.0);
    }
    let sum4: f64 = values.iter().map(|v| (v - m).powi(4)).sum();
    let adj = (nf - 2.0) * (nf - 3.0);
    let numerator = (nf + 1.0) * nf * (nf - 1.0) * sum4;
    Some(numerator / (adj * sum2 * sum2) - 3.0 * (nf - 1.0).powi(2) / adj)
}

/// Sort a sample ascending.
pub(crate) fn sorted(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    sorted
}

/// Quantile of an ascending sample with linear interpolation between ranks.
pub(crate) fn quantile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    if sorted.len() == 1 {
        return Some(sorted[0]);
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    if lower == upper {
        return Some(sorted[lower]);
    }
    let weight = pos - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * weight)
}

/// Most frequent value of an ascending sample; ties resolve to the smallest.
pub(crate) fn mode_sorted(sorted: &[f64]) -> Option<f64> {
    let mut best: Option<(f64, usize)> = None;
    let mut i = 0;
    while i < sorted.len() {
        let value = sorted[i];
        let run = sorted[i..].iter().take_while(|v| **v == value).count();
        if best.is_none_or(|(_, count)| run > count) {
            best = Some((value, run));
        }
        i += run;
    }
    best.map(|(value, _)| value)
}

/// Tukey fences `(Q1 - 1.5 IQR, Q3 + 1.5 IQR)` of a sample.
pub(crate) fn iqr_bounds(values: &[f64]) -> Option<(f64, f64)> {
    let sorted = sorted(values);
    let q1 = quantile_sorted(&sorted, 0.25)?;
    let q3 = quantile_sorted(&sorted, 0.75)?;
    let iqr = q3 - q1;
    Some((q1 - 1.5 * iqr, q3 + 1.5 * iqr))
}

/// Absolute Z-scores of the non-missing entries, aligned with the input.
///
/// A constant column has no spread, so every score is zero.
pub(crate) fn abs_zscores(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    let (Some(m), Some(std)) = (mean(&present), population_std(&present)) else {
        return vec![None; values.len()];
    };
    values
        .iter()
        .map(|v| {
            v.map(|x| {
                if std > 0.0 {
                    ((x - m) / std).abs()
                } else {
                    0.0
                }
            })
        })
        .collect()
}

/// Pearson correlation over pairwise-complete observations.
pub(crate) fn pearson(x: &[Option<f64>], y: &[Option<f64>]) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = x
        .iter()
        .zip(y)
        .filter_map(|(a, b)| Some(((*a)?, (*b)?)))
        .collect();
    if pairs.len() < 2 {
        return None;
    }
    let n = pairs.len() as f64;
    let mx = pairs.iter().map(|(a, _)| a).sum::<f64>() / n;
    let my = pairs.iter().map(|(_, b)| b).sum::<f64>() / n;
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (a, b) in &pairs {
        sxy += (a - mx) * (b - my);
        sxx += (a - mx).powi(2);
        syy += (b - my).powi(2);
    }
    if sxx == 0.0 || syy == 0.0 {
        return None;
    }
    Some(sxy / (sxx.sqrt() * syy.sqrt()))
}

/// Round to two decimals, the precision used by comparison tables.
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_sample_std_and_variance() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!(approx(sample_variance(&values).unwrap(), 32.0 / 7.0));
        assert!(approx(population_std(&values).unwrap(), 2.0));
        assert!(sample_std(&[1.0]).is_none());
    }

    #[test]
    fn test_quantile_interpolates_linearly() {
        let s = sorted(&[4.0, 1.0, 3.0, 2.0]);
        assert!(approx(quantile_sorted(&s, 0.25).unwrap(), 1.75));
        assert!(approx(quantile_sorted(&s, 0.5).unwrap(), 2.5));
        assert!(approx(quantile_sorted(&s, 0.75).unwrap(), 3.25));
        assert!(quantile_sorted(&[], 0.5).is_none());
    }

    #[test]
    fn test_skewness_adjusted() {
        // pd.Series([1, 2, 3, 10]).skew() == 1.763633...
        let skew = skewness(&[1.0, 2.0, 3.0, 10.0]).unwrap();
        assert!((skew - 1.763_633).abs() < 1e-5);
        assert!(skewness(&[1.0, 2.0]).is_none());
        assert_eq!(skewness(&[5.0, 5.0, 5.0]), Some(0.0));
    }

    #[test]
    fn test_kurtosis_adjusted() {
        // pd.Series([1, 2, 3, 10]).kurt() == 3.228
        let kurt = kurtosis(&[1.0, 2.0, 3.0, 10.0]).unwrap();
        assert!((kurt - 3.228).abs() < 1e-9);
        assert!(kurtosis(&[1.0, 2.0, 3.0]).is_none());
    }

    #[test]
    fn test_mode_prefers_smallest_tie() {
        assert_eq!(mode_sorted(&sorted(&[3.0, 1.0, 3.0, 1.0, 2.0])), Some(1.0));
        assert_eq!(mode_sorted(&sorted(&[2.0, 7.0, 7.0])), Some(7.0));
        assert_eq!(mode_sorted(&[]), None);
    }

    #[test]
    fn test_iqr_bounds() {
        let (lower, upper) = iqr_bounds(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert!(approx(lower, 1.75 - 1.5 * 1.5));
        assert!(approx(upper, 3.25 + 1.5 * 1.5));
    }

    #[test]
    fn test_abs_zscores_skip_missing() {
        let scores = abs_zscores(&[Some(1.0), None, Some(3.0)]);
        assert_eq!(scores, vec![Some(1.0), None, Some(1.0)]);
    }

    #[test]
    fn test_abs_zscores_constant_column() {
        let scores = abs_zscores(&[Some(4.0), Some(4.0)]);
        assert_eq!(scores, vec![Some(0.0), Some(0.0)]);
    }

    #[test]
    fn test_pearson() {
        let x = [Some(1.0), Some(2.0), Some(3.0), None];
        let y = [Some(2.0), Some(4.0), Some(6.0), Some(1.0)];
        assert!(approx(pearson(&x, &y).unwrap(), 1.0));
        let flat = [Some(1.0), Some(1.0), Some(1.0), Some(1.0)];
        assert!(pearson(&flat, &y).is_none());
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(3.14159), 3.14);
    }
}
