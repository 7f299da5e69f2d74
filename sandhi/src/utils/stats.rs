//! Statistical utility functions.

/// Mean and sample standard deviation (n - 1 denominator).
///
/// Returns `(0.0, 0.0)` for an empty slice and `(v, 0.0)` for one value.
pub fn mean_std_dev(values: &[f32]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let sum: f64 = values.iter().map(|&v| v as f64).sum();
    let mean = sum / values.len() as f64;
    if values.len() < 2 {
        return (mean, 0.0);
    }
    let variance: f64 = values
        .iter()
        .map(|&v| (v as f64 - mean).powi(2))
        .sum::<f64>()
        / (values.len() - 1) as f64;
    (mean, variance.sqrt())
}
