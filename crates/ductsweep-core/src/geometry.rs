// ─────────────────────────────────────────────────────────────────────
// DuctSweep — Geometry
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Hexagonal perimeter discretizations.
//!
//! One side is described by normalized positions in `[-1, 1]`, both
//! corners included; the same positions are replicated on all six sides.
//! A perimeter profile stores `6·(n − 1)` values side-major: side `s`
//! holds the samples at `x[1..]`, so its last value is the corner shared
//! with side `s + 1`, and the corner at `x[0]` is the previous side's last.

use ductsweep_types::constants::HEX_SIDES;
use ductsweep_types::error::{SweepError, SweepResult};

/// Bit-exact identity of a perimeter discretization.
pub type MeshKey = Vec<u64>;

#[derive(Debug, Clone, PartialEq)]
pub struct PerimeterMesh {
    x: Vec<f64>,
}

impl PerimeterMesh {
    /// `points_per_side` equally spaced points, corners included.
    pub fn uniform(points_per_side: usize) -> SweepResult<Self> {
        if points_per_side < 2 {
            return Err(SweepError::ConfigError(format!(
                "a hex side needs at least its two corners, got {points_per_side} points"
            )));
        }
        let step = 2.0 / (points_per_side - 1) as f64;
        let mut x: Vec<f64> = (0..points_per_side).map(|i| -1.0 + step * i as f64).collect();
        // Pin the corners exactly.
        x[0] = -1.0;
        x[points_per_side - 1] = 1.0;
        Ok(PerimeterMesh { x })
    }

    pub fn corners_only() -> Self {
        PerimeterMesh { x: vec![-1.0, 1.0] }
    }

    pub fn from_positions(x: Vec<f64>) -> SweepResult<Self> {
        if x.len() < 2 || x[0] != -1.0 || x[x.len() - 1] != 1.0 {
            return Err(SweepError::ConfigError(
                "perimeter positions must start at -1 and end at 1".to_string(),
            ));
        }
        if x.windows(2).any(|w| !(w[1] > w[0])) {
            return Err(SweepError::ConfigError(
                "perimeter positions must be strictly increasing".to_string(),
            ));
        }
        Ok(PerimeterMesh { x })
    }

    pub fn positions(&self) -> &[f64] {
        &self.x
    }

    pub fn points_per_side(&self) -> usize {
        self.x.len()
    }

    /// Length of a perimeter profile on this mesh.
    pub fn len(&self) -> usize {
        HEX_SIDES * (self.x.len() - 1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_corners_only(&self) -> bool {
        self.x.len() == 2
    }

    pub fn key(&self) -> MeshKey {
        self.x.iter().map(|v| v.to_bits()).collect()
    }

    /// Side that owns profile index `idx`.
    pub fn side_of(&self, idx: usize) -> usize {
        idx / (self.x.len() - 1)
    }

    /// Whether profile index `idx` is a hex corner.
    pub fn is_corner(&self, idx: usize) -> bool {
        idx % (self.x.len() - 1) == self.x.len() - 2
    }

    /// Share of one side length represented by each profile point.
    ///
    /// Each point owns half of the adjacent intervals; corners collect a
    /// half interval from both sides they join. Sums to six.
    pub fn side_fractions(&self) -> Vec<f64> {
        let n = self.x.len();
        let mut per_side = Vec::with_capacity(n - 1);
        for k in 1..n {
            let frac = if k == n - 1 {
                0.25 * ((self.x[n - 1] - self.x[n - 2]) + (self.x[1] - self.x[0]))
            } else {
                0.25 * (self.x[k + 1] - self.x[k - 1])
            };
            per_side.push(frac);
        }
        (0..HEX_SIDES).flat_map(|_| per_side.iter().copied()).collect()
    }

    /// Distance to the next point around the ring, as a fraction of a side.
    pub fn spacing_to_next(&self, idx: usize) -> f64 {
        let n = self.x.len();
        let k = idx % (n - 1);
        if k == n - 2 {
            0.5 * (self.x[1] - self.x[0])
        } else {
            0.5 * (self.x[k + 2] - self.x[k + 1])
        }
    }

    /// Index of the point facing `idx` across its side on a neighbouring
    /// unit with the same mesh. Corners have no unique partner.
    ///
    /// Valid for meshes symmetric about the side midpoint.
    pub fn facing_index(&self, idx: usize) -> Option<usize> {
        let n = self.x.len();
        if self.is_corner(idx) {
            return None;
        }
        let side = self.side_of(idx);
        let k = idx % (n - 1);
        let facing_side = (side + HEX_SIDES / 2) % HEX_SIDES;
        Some(facing_side * (n - 1) + (n - 3 - k))
    }
}

/// Physical hexagonal duct dimensions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HexDuct {
    /// Inner flat-to-flat [m].
    pub flat_to_flat: f64,
    pub thickness: f64,
}

impl HexDuct {
    pub fn inner_side(&self) -> f64 {
        self.flat_to_flat / 3f64.sqrt()
    }

    pub fn outer_side(&self) -> f64 {
        (self.flat_to_flat + 2.0 * self.thickness) / 3f64.sqrt()
    }

    pub fn inner_perimeter(&self) -> f64 {
        HEX_SIDES as f64 * self.inner_side()
    }

    pub fn outer_perimeter(&self) -> f64 {
        HEX_SIDES as f64 * self.outer_side()
    }

    /// Area enclosed by the inner duct surface.
    pub fn inner_area(&self) -> f64 {
        0.5 * 3f64.sqrt() * self.flat_to_flat * self.flat_to_flat
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_mesh_layout() {
        let m = PerimeterMesh::uniform(5).unwrap();
        assert_eq!(m.positions(), &[-1.0, -0.5, 0.0, 0.5, 1.0]);
        assert_eq!(m.len(), 24);
        assert!(m.is_corner(3));
        assert!(m.is_corner(23));
        assert!(!m.is_corner(0));
        assert_eq!(m.side_of(7), 1);
    }

    #[test]
    fn test_side_fractions_sum_to_six() {
        for n in 2..12 {
            let m = PerimeterMesh::uniform(n).unwrap();
            let total: f64 = m.side_fractions().iter().sum();
            assert!((total - 6.0).abs() < 1e-12, "n={n}: {total}");
        }
    }

    #[test]
    fn test_facing_index_is_involution() {
        let m = PerimeterMesh::uniform(6).unwrap();
        for idx in 0..m.len() {
            match m.facing_index(idx) {
                Some(j) => {
                    assert_eq!(m.facing_index(j), Some(idx));
                    assert_eq!(m.side_of(j), (m.side_of(idx) + 3) % 6);
                }
                None => assert!(m.is_corner(idx)),
            }
        }
    }

    #[test]
    fn test_mesh_validation() {
        assert!(PerimeterMesh::uniform(1).is_err());
        assert!(PerimeterMesh::from_positions(vec![-1.0, 0.2, 0.1, 1.0]).is_err());
        assert!(PerimeterMesh::from_positions(vec![-0.9, 1.0]).is_err());
        assert!(PerimeterMesh::corners_only().is_corners_only());
    }

    #[test]
    fn test_hex_duct_dimensions() {
        let d = HexDuct {
            flat_to_flat: 0.1,
            thickness: 0.003,
        };
        // Area of a hexagon = perimeter · apothem / 2.
        let area = 0.5 * d.inner_perimeter() * 0.05;
        assert!((d.inner_area() - area).abs() < 1e-12);
        assert!(d.outer_perimeter() > d.inner_perimeter());
    }
}
