// ─────────────────────────────────────────────────────────────────────
// DuctSweep — Mesh Reconciliation
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Projection of perimeter profiles between non-matching discretizations.
//!
//! Each hex side is fitted independently with a second-order Legendre
//! least-squares polynomial, evaluated at the target positions, and its
//! end corner is then overwritten with the exact source value so corners
//! stay continuous between neighbouring units.

use crate::geometry::{MeshKey, PerimeterMesh};
use ductsweep_math::interp::interp1d;
use ductsweep_math::legendre::LegendreProjector;
use ductsweep_types::constants::{HEX_SIDES, LEGENDRE_ORDER};
use ductsweep_types::error::{SweepError, SweepResult};
use ndarray::{Array1, Array2, ArrayView1};
use std::collections::HashMap;

/// Precomputed projectors keyed by (source, target) mesh identity.
///
/// Filled once while the core is assembled and read-only afterwards, so
/// it can be shared across worker threads without locking.
#[derive(Debug, Clone, Default)]
pub struct BasisCache {
    entries: HashMap<(MeshKey, MeshKey), LegendreProjector>,
}

impl BasisCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build and store the projector for `src → dst` if a fit is needed.
    pub fn prime(&mut self, src: &PerimeterMesh, dst: &PerimeterMesh) -> SweepResult<()> {
        if !needs_fit(src, dst) {
            return Ok(());
        }
        let key = (src.key(), dst.key());
        if !self.entries.contains_key(&key) {
            let projector = LegendreProjector::new(src.positions(), dst.positions(), LEGENDRE_ORDER)?;
            self.entries.insert(key, projector);
        }
        Ok(())
    }

    pub fn get(&self, src: &PerimeterMesh, dst: &PerimeterMesh) -> Option<&LegendreProjector> {
        self.entries.get(&(src.key(), dst.key()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn needs_fit(src: &PerimeterMesh, dst: &PerimeterMesh) -> bool {
    src != dst && !src.is_corners_only() && !dst.is_corners_only()
}

/// Per-side samples including the leading corner: shape (6, n).
fn side_matrix(mesh: &PerimeterMesh, values: ArrayView1<f64>) -> Array2<f64> {
    let n = mesh.points_per_side();
    let per = n - 1;
    Array2::from_shape_fn((HEX_SIDES, n), |(s, k)| {
        if k == 0 {
            let prev = (s + HEX_SIDES - 1) % HEX_SIDES;
            values[prev * per + per - 1]
        } else {
            values[s * per + k - 1]
        }
    })
}

/// Project `values` sampled on `src` onto `dst`.
///
/// Uses `projector` when given (cached geometry); otherwise the fit basis
/// is built on the spot.
pub fn reconcile(
    src: &PerimeterMesh,
    values: ArrayView1<f64>,
    dst: &PerimeterMesh,
    projector: Option<&LegendreProjector>,
) -> SweepResult<Array1<f64>> {
    if values.len() != src.len() {
        return Err(SweepError::InvalidState(format!(
            "perimeter profile has {} values but its mesh holds {}",
            values.len(),
            src.len()
        )));
    }
    if src == dst {
        return Ok(values.to_owned());
    }

    let ym = side_matrix(src, values);
    let n_src = src.points_per_side();
    let x_dst = dst.positions();

    let fitted: Array2<f64> = if src.is_corners_only() {
        let xs = src.positions();
        Array2::from_shape_fn((HEX_SIDES, x_dst.len()), |(s, j)| {
            interp1d(xs, &[ym[[s, 0]], ym[[s, 1]]], x_dst[j])
        })
    } else if dst.is_corners_only() {
        Array2::from_shape_fn((HEX_SIDES, 2), |(s, j)| {
            if j == 0 {
                ym[[s, 0]]
            } else {
                ym[[s, n_src - 1]]
            }
        })
    } else {
        let fresh;
        let proj = match projector {
            Some(p) => p,
            None => {
                fresh = LegendreProjector::new(src.positions(), x_dst, LEGENDRE_ORDER)?;
                &fresh
            }
        };
        if proj.shape() != (x_dst.len(), n_src) {
            return Err(SweepError::InvalidState(format!(
                "projector shape {:?} does not match meshes ({}, {})",
                proj.shape(),
                x_dst.len(),
                n_src
            )));
        }
        let mut out = proj.apply_rows(ym.view());
        let last = x_dst.len() - 1;
        for s in 0..HEX_SIDES {
            out[[s, last]] = ym[[s, n_src - 1]];
        }
        out
    };

    let per = x_dst.len() - 1;
    let mut result = Array1::zeros(HEX_SIDES * per);
    for s in 0..HEX_SIDES {
        for k in 0..per {
            result[s * per + k] = fitted[[s, k + 1]];
        }
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(mesh: &PerimeterMesh, f: impl Fn(usize, f64) -> f64) -> Array1<f64> {
        let x = mesh.positions();
        let per = x.len() - 1;
        Array1::from_shape_fn(mesh.len(), |i| f(i / per, x[i % per + 1]))
    }

    #[test]
    fn test_identity_fast_path() {
        let m = PerimeterMesh::uniform(7).unwrap();
        let y = profile(&m, |s, x| 600.0 + s as f64 + 0.3 * x);
        let out = reconcile(&m, y.view(), &m, None).unwrap();
        assert_eq!(out, y);
    }

    #[test]
    fn test_corners_preserved_fine_to_coarse() {
        let src = PerimeterMesh::uniform(9).unwrap();
        let dst = PerimeterMesh::uniform(4).unwrap();
        let y = profile(&src, |s, x| 650.0 + 10.0 * (s as f64) + (3.0 * x).sin());
        let out = reconcile(&src, y.view(), &dst, None).unwrap();
        for s in 0..HEX_SIDES {
            // Last value of each side is the corner.
            assert_eq!(out[s * 3 + 2], y[s * 8 + 7], "side {s}");
        }
    }

    #[test]
    fn test_quadratic_side_profile_reproduced() {
        let src = PerimeterMesh::uniform(6).unwrap();
        let dst = PerimeterMesh::uniform(11).unwrap();
        // Continuous around the ring: same quadratic on every side, with
        // equal values at x = ±1.
        let f = |x: f64| 700.0 - 5.0 * x * x;
        let y = profile(&src, |_, x| f(x));
        let out = reconcile(&src, y.view(), &dst, None).unwrap();
        let expected = profile(&dst, |_, x| f(x));
        for (a, b) in out.iter().zip(expected.iter()) {
            assert!((a - b).abs() < 1e-9, "{a} vs {b}");
        }
    }

    #[test]
    fn test_two_point_source_interpolates_linearly() {
        let src = PerimeterMesh::corners_only();
        let dst = PerimeterMesh::uniform(3).unwrap();
        let y = Array1::from_iter((0..6).map(|s| 600.0 + 10.0 * s as f64));
        let out = reconcile(&src, y.view(), &dst, None).unwrap();
        // Side 1 runs from corner 0 (600) to corner 1 (610).
        assert!((out[2] - 605.0).abs() < 1e-12);
        assert_eq!(out[3], 610.0);
        // Side 0 starts at the corner closing side 5.
        assert!((out[0] - 625.0).abs() < 1e-12);
    }

    #[test]
    fn test_two_point_target_takes_corners() {
        let src = PerimeterMesh::uniform(5).unwrap();
        let dst = PerimeterMesh::corners_only();
        let y = profile(&src, |s, x| 600.0 + s as f64 * 3.0 + x);
        let out = reconcile(&src, y.view(), &dst, None).unwrap();
        for s in 0..HEX_SIDES {
            assert_eq!(out[s], y[s * 4 + 3]);
        }
    }

    #[test]
    fn test_cached_projector_matches_fresh() {
        let src = PerimeterMesh::uniform(8).unwrap();
        let dst = PerimeterMesh::uniform(5).unwrap();
        let mut cache = BasisCache::new();
        cache.prime(&src, &dst).unwrap();
        cache.prime(&src, &src).unwrap();
        assert_eq!(cache.len(), 1);
        let y = profile(&src, |s, x| 610.0 + (s as f64) * x);
        let cached = reconcile(&src, y.view(), &dst, cache.get(&src, &dst)).unwrap();
        let fresh = reconcile(&src, y.view(), &dst, None).unwrap();
        for (a, b) in cached.iter().zip(fresh.iter()) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let src = PerimeterMesh::uniform(4).unwrap();
        let dst = PerimeterMesh::uniform(5).unwrap();
        let y = Array1::zeros(5);
        assert!(matches!(
            reconcile(&src, y.view(), &dst, None),
            Err(SweepError::InvalidState(_))
        ));
    }
}
