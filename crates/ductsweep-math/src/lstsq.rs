//! Small dense least squares.
//!
//! The systems here are tall and thin (a few dozen perimeter samples by
//! three Legendre columns), so the pseudo-inverse is formed from the
//! eigen-decomposition of AᵀA by cyclic Jacobi rotations.

use ductsweep_types::error::{SweepError, SweepResult};
use ndarray::{Array1, Array2};

const MAX_SWEEPS: usize = 100;

/// Eigen-decomposition of a symmetric matrix.
///
/// Returns `(eigenvalues, V)` with eigenvectors as the columns of `V`,
/// sorted by decreasing eigenvalue.
pub fn symmetric_eigen(s: &Array2<f64>) -> SweepResult<(Array1<f64>, Array2<f64>)> {
    let (n, m) = s.dim();
    if n != m {
        return Err(SweepError::LinAlg(format!(
            "symmetric_eigen needs a square matrix, got {n}x{m}"
        )));
    }
    if s.iter().any(|v| !v.is_finite()) {
        return Err(SweepError::LinAlg(
            "symmetric_eigen input contains non-finite entries".to_string(),
        ));
    }

    let mut a = s.clone();
    let mut v = Array2::eye(n);
    let scale = a.iter().map(|x| x * x).sum::<f64>().sqrt().max(f64::MIN_POSITIVE);

    for _ in 0..MAX_SWEEPS {
        let mut off_diag = 0.0;
        for i in 0..n {
            for j in (i + 1)..n {
                off_diag += a[[i, j]] * a[[i, j]];
            }
        }
        if off_diag.sqrt() <= 1e-15 * scale {
            break;
        }

        for i in 0..n {
            for j in (i + 1)..n {
                let aij = a[[i, j]];
                if aij.abs() <= 1e-300 {
                    continue;
                }
                let tau = (a[[j, j]] - a[[i, i]]) / (2.0 * aij);
                let t = if tau >= 0.0 {
                    1.0 / (tau + (1.0 + tau * tau).sqrt())
                } else {
                    -1.0 / (-tau + (1.0 + tau * tau).sqrt())
                };
                let cos = 1.0 / (1.0 + t * t).sqrt();
                let sin = t * cos;

                let aii = a[[i, i]];
                let ajj = a[[j, j]];
                a[[i, i]] = aii - t * aij;
                a[[j, j]] = ajj + t * aij;
                a[[i, j]] = 0.0;
                a[[j, i]] = 0.0;

                for r in 0..n {
                    if r == i || r == j {
                        continue;
                    }
                    let ri = a[[r, i]];
                    let rj = a[[r, j]];
                    a[[r, i]] = cos * ri - sin * rj;
                    a[[i, r]] = a[[r, i]];
                    a[[r, j]] = sin * ri + cos * rj;
                    a[[j, r]] = a[[r, j]];
                }

                for r in 0..n {
                    let vi = v[[r, i]];
                    let vj = v[[r, j]];
                    v[[r, i]] = cos * vi - sin * vj;
                    v[[r, j]] = sin * vi + cos * vj;
                }
            }
        }
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&i, &j| a[[j, j]].total_cmp(&a[[i, i]]));

    let values = Array1::from_iter(order.iter().map(|&k| a[[k, k]]));
    let mut vectors = Array2::zeros((n, n));
    for (dst, &src) in order.iter().enumerate() {
        vectors.column_mut(dst).assign(&v.column(src));
    }
    Ok((values, vectors))
}

/// Moore-Penrose pseudo-inverse of `a` (m×n, m ≥ n expected).
///
/// Singular values below `rcond · σ_max` are treated as zero.
pub fn pinv(a: &Array2<f64>, rcond: f64) -> SweepResult<Array2<f64>> {
    let (m, n) = a.dim();
    if m == 0 || n == 0 {
        return Err(SweepError::LinAlg(format!(
            "pinv of an empty {m}x{n} matrix"
        )));
    }
    let ata = a.t().dot(a);
    let (eig, v) = symmetric_eigen(&ata)?;

    let sigma_max = eig[0].max(0.0).sqrt();
    if sigma_max == 0.0 {
        return Err(SweepError::LinAlg("pinv of a zero matrix".to_string()));
    }
    let cutoff = rcond * sigma_max;

    // pinv(A) = V Σ⁻² Vᵀ Aᵀ over the retained singular values.
    let mut inner = Array2::<f64>::zeros((n, n));
    for k in 0..n {
        let sigma = eig[k].max(0.0).sqrt();
        if sigma <= cutoff {
            continue;
        }
        let w = 1.0 / (sigma * sigma);
        let col = v.column(k);
        for i in 0..n {
            for j in 0..n {
                inner[[i, j]] += w * col[i] * col[j];
            }
        }
    }
    Ok(inner.dot(&a.t()))
}
