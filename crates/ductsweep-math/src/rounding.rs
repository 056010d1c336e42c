//! Decimal rounding used to keep axial positions on a fixed grid.

fn scale(digits: i32) -> f64 {
    10f64.powi(digits)
}

/// Round to `digits` decimal places.
pub fn round_to(x: f64, digits: i32) -> f64 {
    let s = scale(digits);
    (x * s).round() / s
}

/// Round down to `digits` decimal places.
pub fn floor_to(x: f64, digits: i32) -> f64 {
    let s = scale(digits);
    (x * s).floor() / s
}

/// Sorted, de-duplicated copy of `values` after rounding to `digits`.
pub fn unique_rounded(values: impl IntoIterator<Item = f64>, digits: i32) -> Vec<f64> {
    let mut out: Vec<f64> = values.into_iter().map(|v| round_to(v, digits)).collect();
    out.sort_by(|a, b| a.total_cmp(b));
    out.dedup();
    out
}
