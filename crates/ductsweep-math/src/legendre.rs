// ─────────────────────────────────────────────────────────────────────
// DuctSweep — Legendre Least Squares
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Legendre polynomial basis, fitting and fixed-mesh projection.
//!
//! Columns of the Vandermonde matrix are scaled to unit norm before the
//! least-squares solve; the default `rcond` is `x.len() · ε`.

use crate::lstsq::pinv;
use ductsweep_types::error::{SweepError, SweepResult};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

/// Pseudo-Vandermonde matrix: `V[i, k] = P_k(x[i])` for `k ≤ deg`.
pub fn legvander(x: &[f64], deg: usize) -> Array2<f64> {
    let mut v = Array2::zeros((x.len(), deg + 1));
    for (i, &xi) in x.iter().enumerate() {
        v[[i, 0]] = 1.0;
        if deg > 0 {
            v[[i, 1]] = xi;
        }
        for k in 2..=deg {
            let kf = k as f64;
            v[[i, k]] = ((2.0 * kf - 1.0) * xi * v[[i, k - 1]] - (kf - 1.0) * v[[i, k - 2]]) / kf;
        }
    }
    v
}

/// Evaluate `Σ c_k P_k(x)` by Clenshaw recurrence.
pub fn legval(x: f64, coeffs: ArrayView1<f64>) -> f64 {
    let n = coeffs.len();
    match n {
        0 => 0.0,
        1 => coeffs[0],
        _ => {
            let mut b1 = 0.0;
            let mut b2 = 0.0;
            for k in (1..n).rev() {
                let kf = k as f64;
                let alpha = (2.0 * kf + 1.0) / (kf + 1.0) * x;
                let beta = -(kf + 1.0) / (kf + 2.0);
                let b0 = coeffs[k] + alpha * b1 + beta * b2;
                b2 = b1;
                b1 = b0;
            }
            coeffs[0] + x * b1 - 0.5 * b2
        }
    }
}

fn default_rcond(n: usize) -> f64 {
    n as f64 * f64::EPSILON
}

/// Column-normalized least-squares operator.
///
/// Returns `(P, scl)` such that the Legendre coefficients of samples `y`
/// are `(P · y) / scl`.
fn fit_operator(x: &[f64], deg: usize) -> SweepResult<(Array2<f64>, Array1<f64>)> {
    if x.is_empty() {
        return Err(SweepError::LinAlg("Legendre fit needs samples".to_string()));
    }
    if x.iter().any(|v| !v.is_finite()) {
        return Err(SweepError::LinAlg(
            "Legendre fit positions must be finite".to_string(),
        ));
    }
    let mut lhs = legvander(x, deg);
    let scl = lhs.map_axis(Axis(0), |col| {
        let norm = col.iter().map(|c| c * c).sum::<f64>().sqrt();
        if norm == 0.0 {
            1.0
        } else {
            norm
        }
    });
    for mut row in lhs.rows_mut() {
        row /= &scl;
    }
    let op = pinv(&lhs, default_rcond(x.len()))?;
    Ok((op, scl))
}

/// Least-squares Legendre coefficients for each row of `y`.
///
/// `y` has one sample set per row, one column per position in `x`; the
/// result has one coefficient row per sample set.
pub fn legfit(x: &[f64], y: ArrayView2<f64>, deg: usize) -> SweepResult<Array2<f64>> {
    if y.ncols() != x.len() {
        return Err(SweepError::LinAlg(format!(
            "legfit shape mismatch: {} positions, {} samples per row",
            x.len(),
            y.ncols()
        )));
    }
    let (op, scl) = fit_operator(x, deg)?;
    let mut coeffs = y.dot(&op.t());
    for mut row in coeffs.rows_mut() {
        row /= &scl;
    }
    Ok(coeffs)
}

/// Linear map from samples at `x_src` to the fitted polynomial at `x_dst`.
///
/// Depends only on the two position sets, so callers build it once per
/// mesh pair and reuse it for every temperature profile.
#[derive(Debug, Clone)]
pub struct LegendreProjector {
    degree: usize,
    matrix: Array2<f64>,
}

impl LegendreProjector {
    /// Degree is lowered to `len(x_src) − 1` when there are too few samples.
    pub fn new(x_src: &[f64], x_dst: &[f64], degree: usize) -> SweepResult<Self> {
        let degree = degree.min(x_src.len().saturating_sub(1));
        let (op, scl) = fit_operator(x_src, degree)?;
        let mut vdst = legvander(x_dst, degree);
        for mut row in vdst.rows_mut() {
            row /= &scl;
        }
        Ok(LegendreProjector {
            degree,
            matrix: vdst.dot(&op),
        })
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    /// (target points, source points)
    pub fn shape(&self) -> (usize, usize) {
        self.matrix.dim()
    }

    pub fn apply(&self, y: ArrayView1<f64>) -> Array1<f64> {
        self.matrix.dot(&y)
    }

    /// Project every row of `y` (one sample set per row).
    pub fn apply_rows(&self, y: ArrayView2<f64>) -> Array2<f64> {
        y.dot(&self.matrix.t())
    }
}
