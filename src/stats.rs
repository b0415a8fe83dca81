//! Numeric summary primitives
//!
//! Pure functions over numeric slices used by the binner, the bio outlier
//! filter and the post-processor.

/// Arithmetic mean, `None` for an empty slice
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population standard deviation (divides by `n`), `None` for an empty slice
pub fn std_dev(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    Some(variance.sqrt())
}

/// Smallest and largest value, `None` for an empty slice
pub fn min_max(values: &[f64]) -> Option<(f64, f64)> {
    values.iter().fold(None, |acc, &v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}

/// Min-max scale every value to `[0, 1]`.
///
/// Returns `None` when the slice has zero range, since the result would not
/// be finite. An empty slice scales to an empty vector.
pub fn min_max_scale(values: &[f64]) -> Option<Vec<f64>> {
    let Some((lo, hi)) = min_max(values) else {
        return Some(Vec::new());
    };
    let range = hi - lo;
    if range == 0.0 {
        return None;
    }
    Some(values.iter().map(|v| (v - lo) / range).collect())
}
