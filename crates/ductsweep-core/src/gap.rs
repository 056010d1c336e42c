// ─────────────────────────────────────────────────────────────────────
// DuctSweep — Gap Coolant
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Inter-assembly gap coolant.
//!
//! Every unit is wrapped in a ring of half-gap channels laid out on the
//! canonical gap mesh; row `u` of the field is the ring around unit `u`.
//! Across a shared side, half-gap channels of the two neighbours exchange
//! heat by conduction. Corner channels couple only around their own ring.

use crate::convection::film_coefficient;
use crate::geometry::{HexDuct, PerimeterMesh};
use crate::materials::MaterialProperties;
use crate::stability::{LimitingChannel, StableStep};
use ductsweep_types::config::{GapConfig, GapModel};
use ductsweep_types::constants::HEX_SIDES;
use ductsweep_types::error::{SweepError, SweepResult};
use ndarray::{Array1, Array2};
use std::sync::Arc;

/// Gap coolant temperatures, one half-gap ring per unit.
///
/// A gap channel shared by two neighbouring units is split into two coupled
/// halves, one in each unit's row, rather than stored once on a single
/// core-wide array.
#[derive(Debug, Clone)]
pub struct GapField {
    model: Option<GapModel>,
    mesh: PerimeterMesh,
    temps: Array2<f64>,
    neighbors: Vec<[Option<usize>; HEX_SIDES]>,
    film: f64,
    width: f64,
    /// Duct outer-surface width owned by each point [m].
    seg_width: Array2<f64>,
    /// Distance to the next point around the ring [m].
    spacing: Array2<f64>,
    /// Mass flow per half-gap channel [kg/s].
    flows: Array2<f64>,
    coolant: Arc<dyn MaterialProperties>,
    inlet_temp: f64,
}

impl GapField {
    /// Gap-side film coefficient [W/(m²·K)]; zero when adiabatic.
    pub fn film_coefficient(
        config: &GapConfig,
        coolant: &dyn MaterialProperties,
        ducts: &[HexDuct],
        gap_flow: f64,
        t: f64,
    ) -> f64 {
        let Some(model) = config.model else {
            return 0.0;
        };
        if let Some(h) = config.htc {
            return h;
        }
        match model {
            GapModel::Flow => {
                let area: f64 = ducts
                    .iter()
                    .map(|d| d.outer_perimeter() * 0.5 * config.width)
                    .sum();
                film_coefficient(coolant, t, gap_flow, area, 2.0 * config.width)
            }
            GapModel::NoFlow => 2.0 * coolant.thermal_conductivity(t) / config.width,
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: &GapConfig,
        mesh: PerimeterMesh,
        ducts: &[HexDuct],
        neighbors: Vec<[Option<usize>; HEX_SIDES]>,
        film: f64,
        gap_flow: f64,
        coolant: Arc<dyn MaterialProperties>,
        inlet_temp: f64,
    ) -> SweepResult<Self> {
        if ducts.len() != neighbors.len() {
            return Err(SweepError::ConfigError(format!(
                "gap field has {} ducts but {} neighbour maps",
                ducts.len(),
                neighbors.len()
            )));
        }
        let n_units = ducts.len();
        let n = mesh.len();
        let fractions = mesh.side_fractions();
        let seg_width = Array2::from_shape_fn((n_units, n), |(u, j)| {
            fractions[j] * ducts[u].outer_side()
        });
        let spacing = Array2::from_shape_fn((n_units, n), |(u, j)| {
            mesh.spacing_to_next(j) * ducts[u].outer_side()
        });
        let total_width: f64 = seg_width.sum();
        let flows = seg_width.mapv(|w| gap_flow * w / total_width);
        Ok(GapField {
            model: config.model,
            temps: Array2::from_elem((n_units, n), inlet_temp),
            mesh,
            neighbors,
            film,
            width: config.width,
            seg_width,
            spacing,
            flows,
            coolant,
            inlet_temp,
        })
    }

    pub fn model(&self) -> Option<GapModel> {
        self.model
    }

    pub fn is_adiabatic(&self) -> bool {
        self.model.is_none()
    }

    pub fn mesh(&self) -> &PerimeterMesh {
        &self.mesh
    }

    pub fn film(&self) -> f64 {
        self.film
    }

    pub fn temperatures(&self) -> &Array2<f64> {
        &self.temps
    }

    pub fn mean(&self) -> f64 {
        self.temps.mean().unwrap_or(self.inlet_temp)
    }

    /// Partner `(unit, index)` across the side that owns `j` on unit `u`.
    fn partner(&self, u: usize, j: usize) -> Option<(usize, usize)> {
        let jj = self.mesh.facing_index(j)?;
        let v = self.neighbors[u][self.mesh.side_of(j)]?;
        Some((v, jj))
    }

    fn k_avg(&self, a: f64, b: f64) -> f64 {
        0.5 * (self.coolant.thermal_conductivity(a) + self.coolant.thermal_conductivity(b))
    }

    /// Gap temperatures after one step, given each unit's duct outer
    /// surface on the gap mesh. Does not modify the field.
    pub fn advanced(&self, duct_outer: &[Array1<f64>], dz: f64) -> SweepResult<Array2<f64>> {
        let Some(model) = self.model else {
            return Ok(self.temps.clone());
        };
        let (n_units, n) = self.temps.dim();
        if duct_outer.len() != n_units || duct_outer.iter().any(|d| d.len() != n) {
            return Err(SweepError::InvalidState(format!(
                "gap update needs {n_units} duct profiles of {n} points"
            )));
        }
        let t = &self.temps;
        let mut out = t.clone();
        match model {
            GapModel::Flow => {
                for u in 0..n_units {
                    for j in 0..n {
                        let tj = t[[u, j]];
                        let w = self.seg_width[[u, j]];
                        let mut q = self.film * w * (duct_outer[u][j] - tj);
                        if let Some((v, jj)) = self.partner(u, j) {
                            let tv = t[[v, jj]];
                            let w_avg = 0.5 * (w + self.seg_width[[v, jj]]);
                            q += self.k_avg(tj, tv) * w_avg * 2.0 / self.width * (tv - tj);
                        }
                        let next = (j + 1) % n;
                        let prev = (j + n - 1) % n;
                        for (other, gap_len) in
                            [(next, self.spacing[[u, j]]), (prev, self.spacing[[u, prev]])]
                        {
                            let to = t[[u, other]];
                            q += self.k_avg(tj, to) * 0.5 * self.width / gap_len * (to - tj);
                        }
                        let capacity = self.flows[[u, j]] * self.coolant.heat_capacity(tj);
                        out[[u, j]] = tj + dz * q / capacity;
                    }
                }
            }
            GapModel::NoFlow => {
                for u in 0..n_units {
                    for j in 0..n {
                        let own = duct_outer[u][j];
                        out[[u, j]] = match self.partner(u, j) {
                            Some((v, jj)) => own + 0.5 * (duct_outer[v][jj] - own),
                            None => own,
                        };
                    }
                }
            }
        }
        if out.iter().any(|v| !v.is_finite()) {
            return Err(SweepError::PhysicsViolation(
                "non-finite gap coolant temperature".to_string(),
            ));
        }
        Ok(out)
    }

    pub fn commit(&mut self, temps: Array2<f64>) {
        self.temps = temps;
    }

    /// Step limit of the explicit flowing-gap update.
    pub fn min_stable_step(&self) -> StableStep {
        if self.model != Some(GapModel::Flow) {
            return StableStep::unconstrained();
        }
        let t = self.inlet_temp;
        let cp = self.coolant.heat_capacity(t);
        let k = self.coolant.thermal_conductivity(t);
        let (n_units, n) = self.temps.dim();
        let mut best = StableStep::unconstrained();
        for u in 0..n_units {
            for j in 0..n {
                let w = self.seg_width[[u, j]];
                let prev = (j + n - 1) % n;
                let mut g = self.film * w
                    + k * 0.5 * self.width / self.spacing[[u, j]]
                    + k * 0.5 * self.width / self.spacing[[u, prev]];
                if let Some((v, jj)) = self.partner(u, j) {
                    g += k * 0.5 * (w + self.seg_width[[v, jj]]) * 2.0 / self.width;
                }
                let step = StableStep::for_channel(self.flows[[u, j]] * cp, g, LimitingChannel::Gap);
                best = best.min(step);
            }
        }
        best
    }

    pub fn reset(&mut self) {
        self.temps.fill(self.inlet_temp);
    }

    pub fn rows(&self) -> Vec<Vec<f64>> {
        self.temps.rows().into_iter().map(|r| r.to_vec()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::materials::MaterialLibrary;

    fn duct() -> HexDuct {
        HexDuct {
            flat_to_flat: 0.11,
            thickness: 0.004,
        }
    }

    fn pair(model: Option<GapModel>) -> GapField {
        let lib = MaterialLibrary::with_builtins().unwrap();
        let na = lib.get("sodium").unwrap();
        let cfg = GapConfig {
            model,
            width: 0.004,
            htc: None,
            perimeter_points: None,
        };
        let ducts = [duct(), duct()];
        let film = GapField::film_coefficient(&cfg, na.as_ref(), &ducts, 1.0, 600.0);
        let mut n0 = [None; HEX_SIDES];
        let mut n1 = [None; HEX_SIDES];
        n0[0] = Some(1);
        n1[3] = Some(0);
        GapField::new(
            &cfg,
            PerimeterMesh::uniform(4).unwrap(),
            &ducts,
            vec![n0, n1],
            film,
            1.0,
            na,
            600.0,
        )
        .unwrap()
    }

    #[test]
    fn test_adiabatic_gap_is_unchanged() {
        let g = pair(None);
        assert_eq!(g.film(), 0.0);
        let hot = vec![Array1::from_elem(18, 900.0); 2];
        let out = g.advanced(&hot, 0.01).unwrap();
        assert_eq!(&out, g.temperatures());
        assert!(g.min_stable_step().dz.is_infinite());
    }

    #[test]
    fn test_flow_gap_heats_toward_duct() {
        let g = pair(Some(GapModel::Flow));
        assert!(g.film() > 0.0);
        let ducts = vec![Array1::from_elem(18, 650.0), Array1::from_elem(18, 600.0)];
        let mut g = g;
        let out = g.advanced(&ducts, 0.001).unwrap();
        assert!(out.row(0).iter().all(|&t| t > 600.0 && t < 650.0));
        assert!(out.row(1).iter().all(|&t| t == 600.0));
        g.commit(out);
        // Unit 1 only warms through the side it shares with unit 0.
        let out = g.advanced(&ducts, 0.001).unwrap();
        assert_eq!(out[[1, 0]], 600.0);
        assert!(out[[1, 10]] > 600.0);
        assert!(g.min_stable_step().dz > 0.0);
        assert_eq!(g.min_stable_step().channel, LimitingChannel::Gap);
    }

    #[test]
    fn test_no_flow_gap_averages_facing_ducts() {
        let g = pair(Some(GapModel::NoFlow));
        let ducts = vec![Array1::from_elem(18, 700.0), Array1::from_elem(18, 600.0)];
        let out = g.advanced(&ducts, 0.01).unwrap();
        // Interior point of side 0 of unit 0 faces side 3 of unit 1.
        assert!((out[[0, 0]] - 650.0).abs() < 1e-12);
        assert!((out[[1, 9]] - 650.0).abs() < 1e-12);
        // Corner and unshared sides follow their own duct.
        assert_eq!(out[[0, 2]], 700.0);
        assert_eq!(out[[0, 3]], 700.0);
    }

    #[test]
    fn test_uniform_isothermal_flow_is_exact() {
        let g = pair(Some(GapModel::Flow));
        let ducts = vec![Array1::from_elem(18, 600.0); 2];
        let out = g.advanced(&ducts, 0.01).unwrap();
        assert!(out.iter().all(|&t| t == 600.0));
    }

    #[test]
    fn test_reset() {
        let mut g = pair(Some(GapModel::NoFlow));
        g.commit(Array2::from_elem((2, 18), 800.0));
        g.reset();
        assert!(g.temperatures().iter().all(|&t| t == 600.0));
    }
}
