//! One-dimensional interpolation on tabulated data.

/// Piecewise-linear interpolation of `(xp, fp)` at `x`.
///
/// `xp` must be increasing. Values outside the table clamp to the end
/// samples.
pub fn interp1d(xp: &[f64], fp: &[f64], x: f64) -> f64 {
    let n = xp.len().min(fp.len());
    if n == 0 {
        return f64::NAN;
    }
    if n == 1 || x <= xp[0] {
        return fp[0];
    }
    if x >= xp[n - 1] {
        return fp[n - 1];
    }
    // First index with xp[i] > x; the bracketing interval is (i-1, i).
    let i = xp[..n].partition_point(|&v| v <= x);
    let (x0, x1) = (xp[i - 1], xp[i]);
    let (f0, f1) = (fp[i - 1], fp[i]);
    if x1 == x0 {
        return f1;
    }
    let t = (x - x0) / (x1 - x0);
    f0 + t * (f1 - f0)
}
