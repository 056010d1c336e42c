// ─────────────────────────────────────────────────────────────────────
// DuctSweep — Rodded Region
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Pin bundle region.
//!
//! Coolant is resolved into one channel per interior pin ring (lumped
//! around the ring) plus one channel per duct perimeter point, which are
//! the edge and corner channels along the wall. Channels exchange heat by
//! conduction scaled with the bundle mixing factor; perimeter channels
//! also exchange heat with the gap through the duct wall.
//!
//! Channel layout: `[ring 0 .. ring n−2, perimeter 0 .. perimeter 6n−1]`
//! for a bundle of `n` pin rings, whose perimeter mesh has `n + 1` points
//! per side. The outermost pin ring faces the perimeter channels.

use crate::convection::film_coefficient;
use crate::duct::WallCoupling;
use crate::geometry::{HexDuct, PerimeterMesh};
use crate::materials::MaterialProperties;
use crate::region::{weighted_mean, DuctCoupling, RegionHeader, StepInput, StepOutcome, UnitState};
use crate::stability::{LimitingChannel, StableStep};
use ductsweep_types::config::BundleConfig;
use ductsweep_types::constants::HEX_SIDES;
use ductsweep_types::error::{SweepError, SweepResult};
use ductsweep_types::state::EnergyTally;
use ndarray::{s, Array1};
use std::f64::consts::PI;
use std::sync::Arc;

const SQRT3: f64 = 1.732_050_807_568_877_2;

/// Materials a rodded region needs.
#[derive(Debug, Clone)]
pub struct BundleMaterials {
    pub coolant: Arc<dyn MaterialProperties>,
    pub clad: Arc<dyn MaterialProperties>,
    pub fuel: Arc<dyn MaterialProperties>,
    pub duct: Arc<dyn MaterialProperties>,
}

/// Conduction link between two channels; conductance = factor · mix · k.
#[derive(Debug, Clone, Copy)]
struct Link {
    a: usize,
    b: usize,
    factor: f64,
}

#[derive(Debug, Clone)]
pub struct RoddedRegion {
    pub(crate) header: RegionHeader,
    n_rings: usize,
    n_interior: usize,
    pins_per_ring: Vec<usize>,
    n_pins: usize,
    pin_diameter: f64,
    clad_thickness: f64,
    mixing: f64,
    flows: Vec<f64>,
    area_fraction: Vec<f64>,
    class: Vec<LimitingChannel>,
    links: Vec<Link>,
    wall: WallCoupling,
    film_interior: f64,
    film_edge: f64,
    materials: BundleMaterials,
    t_ref: f64,
}

impl RoddedRegion {
    /// Build the channel topology for `bundle` inside `duct`.
    ///
    /// `flow_rate` is the unit mass flow [kg/s]; film coefficients are
    /// evaluated once at `t_ref`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        unit: usize,
        header: RegionHeader,
        bundle: &BundleConfig,
        duct: &HexDuct,
        mesh: &PerimeterMesh,
        materials: BundleMaterials,
        flow_rate: f64,
        t_ref: f64,
        gap_film: f64,
    ) -> SweepResult<Self> {
        let geometry_error = |reason: String| SweepError::Geometry {
            unit,
            region: header.name.clone(),
            reason,
        };

        let n = bundle.n_rings;
        let (p, d) = (bundle.pin_pitch, bundle.pin_diameter);
        if n < 2 {
            return Err(geometry_error(format!(
                "rodded regions need at least 2 pin rings, got {n}"
            )));
        }
        if !(d > 0.0 && p >= d && bundle.clad_thickness > 0.0 && 2.0 * bundle.clad_thickness < d) {
            return Err(geometry_error(format!(
                "invalid pin geometry: diameter {d}, pitch {p}, clad {}",
                bundle.clad_thickness
            )));
        }
        if mesh.points_per_side() != n + 1 {
            return Err(geometry_error(format!(
                "perimeter mesh has {} points per side, bundle needs {}",
                mesh.points_per_side(),
                n + 1
            )));
        }

        let n_interior = n - 1;
        let n_perimeter = mesh.len();
        let n_outer = HEX_SIDES * (n - 1);
        let n_pins = 3 * n * (n - 1) + 1;
        let pins_per_ring: Vec<usize> = (0..n).map(|r| if r == 0 { 1 } else { HEX_SIDES * r }).collect();

        let wall_gap = 0.5 * duct.flat_to_flat - (n - 1) as f64 * p * SQRT3 / 2.0 - 0.5 * d;
        if wall_gap <= 0.0 {
            return Err(geometry_error(format!(
                "pin bundle does not fit inside the duct (wall gap {wall_gap:.3e} m)"
            )));
        }
        let strip_depth = wall_gap + 0.5 * d;
        let pin_area = PI * d * d / 4.0;
        let flow_area = duct.inner_area() - n_pins as f64 * pin_area;
        let strip_area = duct.inner_perimeter() * strip_depth - n_outer as f64 * pin_area / 2.0;
        let interior_area = flow_area - strip_area;
        if flow_area <= 0.0 || strip_area <= 0.0 || interior_area <= 0.0 {
            return Err(geometry_error(format!(
                "non-positive flow area (total {flow_area:.3e}, edge {strip_area:.3e}, interior {interior_area:.3e} m²)"
            )));
        }
        let strip_wetted = duct.inner_perimeter() + n_outer as f64 * PI * d / 2.0;
        let interior_wetted = (n_pins - n_outer) as f64 * PI * d + n_outer as f64 * PI * d / 2.0;
        let dh_edge = 4.0 * strip_area / strip_wetted;
        let dh_interior = 4.0 * interior_area / interior_wetted;

        let mass_flux = flow_rate / flow_area;
        let fractions = mesh.side_fractions();
        let interior_pins: usize = pins_per_ring[..n_interior].iter().sum();

        let mut areas = Vec::with_capacity(n_interior + n_perimeter);
        let mut class = Vec::with_capacity(n_interior + n_perimeter);
        for &c in &pins_per_ring[..n_interior] {
            areas.push(interior_area * c as f64 / interior_pins as f64);
            class.push(LimitingChannel::Interior);
        }
        for (k, f) in fractions.iter().enumerate() {
            areas.push(strip_area * f / HEX_SIDES as f64);
            class.push(if mesh.is_corner(k) {
                LimitingChannel::Corner
            } else {
                LimitingChannel::Edge
            });
        }
        let flows: Vec<f64> = areas.iter().map(|a| a * mass_flux).collect();
        let area_fraction: Vec<f64> = areas.iter().map(|a| a / flow_area).collect();

        let ring_gap = (p - d) / (p * SQRT3 / 2.0);
        let mut links = Vec::new();
        for r in 0..n_interior.saturating_sub(1) {
            links.push(Link {
                a: r,
                b: r + 1,
                factor: HEX_SIDES as f64 * (r as f64 + 0.5) * ring_gap,
            });
        }
        let last = n_interior - 1;
        let outer_factor = HEX_SIDES as f64 * (last as f64 + 0.5) * ring_gap;
        let side = duct.inner_side();
        for (k, f) in fractions.iter().enumerate() {
            links.push(Link {
                a: last,
                b: n_interior + k,
                factor: outer_factor * f / HEX_SIDES as f64,
            });
            let next = (k + 1) % n_perimeter;
            links.push(Link {
                a: n_interior + k,
                b: n_interior + next,
                factor: strip_depth / (mesh.spacing_to_next(k) * side),
            });
        }

        let coolant = materials.coolant.as_ref();
        let film_interior = film_coefficient(coolant, t_ref, flow_rate, flow_area, dh_interior);
        let film_edge = film_coefficient(coolant, t_ref, flow_rate, flow_area, dh_edge);
        let k_duct = materials.duct.thermal_conductivity(t_ref);
        let wall = WallCoupling::new(mesh, duct, k_duct, |_| film_edge, gap_film);

        Ok(RoddedRegion {
            header,
            n_rings: n,
            n_interior,
            pins_per_ring,
            n_pins,
            pin_diameter: d,
            clad_thickness: bundle.clad_thickness,
            mixing: bundle.mixing_factor,
            flows,
            area_fraction,
            class,
            links,
            wall,
            film_interior,
            film_edge,
            materials,
            t_ref,
        })
    }

    pub fn channel_count(&self) -> usize {
        self.flows.len()
    }

    pub fn pin_rings(&self) -> usize {
        self.n_rings
    }

    pub fn channel_flows(&self) -> &[f64] {
        &self.flows
    }

    pub fn min_stable_step(&self) -> StableStep {
        let coolant = self.materials.coolant.as_ref();
        let cp = coolant.heat_capacity(self.t_ref);
        let k = coolant.thermal_conductivity(self.t_ref);
        let mut conductance = vec![0.0; self.flows.len()];
        for link in &self.links {
            let g = link.factor * self.mixing * k;
            conductance[link.a] += g;
            conductance[link.b] += g;
        }
        if self.header.coupling == DuctCoupling::Explicit {
            for seg in 0..self.wall.len() {
                conductance[self.n_interior + seg] += self.wall.through_conductance(seg);
            }
        }
        self.flows
            .iter()
            .zip(&conductance)
            .zip(&self.class)
            .map(|((m, g), c)| StableStep::for_channel(m * cp, *g, *c))
            .fold(StableStep::unconstrained(), StableStep::min)
    }

    /// (clad mid-wall, fuel centerline) for a pin at linear power `q`.
    fn pin_temperatures(&self, t_coolant: f64, q: f64, film: f64) -> [f64; 2] {
        let d = self.pin_diameter;
        let r_out = 0.5 * d;
        let r_in = r_out - self.clad_thickness;
        let r_mid = r_out - 0.5 * self.clad_thickness;
        let t_surface = t_coolant + q / (PI * d * film);
        let k_clad = self.materials.clad.thermal_conductivity(t_surface);
        let t_mid = t_surface + q * (r_out / r_mid).ln() / (2.0 * PI * k_clad);
        let t_inner = t_surface + q * (r_out / r_in).ln() / (2.0 * PI * k_clad);
        let k_fuel = self.materials.fuel.thermal_conductivity(t_inner);
        [t_mid, t_inner + q / (4.0 * PI * k_fuel)]
    }

    pub fn step(&self, state: &UnitState, input: &StepInput<'_>) -> SweepResult<StepOutcome> {
        let n = self.flows.len();
        let n_int = self.n_interior;
        let t = &state.coolant;
        if t.len() != n || input.gap.len() != self.wall.len() {
            return Err(SweepError::InvalidState(format!(
                "region '{}' expects {n} channels and {} gap points, got {} and {}",
                self.header.name,
                self.wall.len(),
                t.len(),
                input.gap.len()
            )));
        }
        let coolant = self.materials.coolant.as_ref();
        let cp: Vec<f64> = t.iter().map(|&v| coolant.heat_capacity(v)).collect();
        let k: Vec<f64> = t.iter().map(|&v| coolant.thermal_conductivity(v)).collect();
        let dz = input.dz;
        let power = input.power;

        let mut dq = vec![0.0; n];
        let per_pin = power.pins / self.n_pins as f64;
        for r in 0..n_int {
            dq[r] += per_pin * self.pins_per_ring[r] as f64;
        }
        let outer_ring = per_pin * self.pins_per_ring[self.n_rings - 1] as f64;
        for seg in 0..self.wall.len() {
            dq[n_int + seg] += self.wall.segment_power(seg, outer_ring);
        }
        for (q, f) in dq.iter_mut().zip(&self.area_fraction) {
            *q += power.coolant * f;
        }
        for link in &self.links {
            let g = link.factor * self.mixing * 0.5 * (k[link.a] + k[link.b]);
            let flux = g * (t[link.b] - t[link.a]);
            dq[link.a] += flux;
            dq[link.b] -= flux;
        }

        let explicit = self.header.coupling == DuctCoupling::Explicit;
        let mut heat_to_gap = 0.0;
        let mut duct_mw = Array1::zeros(self.wall.len());
        let mut duct_outer = Array1::zeros(self.wall.len());
        for seg in 0..self.wall.len() {
            let i = n_int + seg;
            let q_seg = self.wall.segment_power(seg, power.duct);
            if explicit {
                let ex = self.wall.exchange(seg, t[i], input.gap[seg], q_seg);
                dq[i] += ex.into_coolant;
                heat_to_gap += ex.to_gap * dz;
                duct_mw[seg] = ex.mid_wall;
                duct_outer[seg] = ex.outer_surface;
            } else {
                let share = self.wall.coolant_share(seg);
                dq[i] += q_seg * share;
                heat_to_gap += q_seg * (1.0 - share) * dz;
            }
        }

        let mut next = Array1::zeros(n);
        let mut enthalpy = 0.0;
        for i in 0..n {
            let capacity = self.flows[i] * cp[i];
            let mut dt = dz * dq[i] / capacity;
            if !explicit && i >= n_int {
                let seg = i - n_int;
                let c = self.wall.through_conductance(seg);
                if c > 0.0 {
                    let relax = (input.gap[seg] - t[i]) * (1.0 - (-dz * c / capacity).exp());
                    dt += relax;
                    heat_to_gap -= capacity * relax;
                }
            }
            next[i] = t[i] + dt;
            enthalpy += capacity * dt;
        }

        if !explicit {
            for seg in 0..self.wall.len() {
                let q_seg = self.wall.segment_power(seg, power.duct);
                let ex = self.wall.exchange(seg, next[n_int + seg], input.gap[seg], q_seg);
                duct_mw[seg] = ex.mid_wall;
                duct_outer[seg] = ex.outer_surface;
            }
        }

        let edge_mean = weighted_mean(next.slice(s![n_int..]), &self.flows[n_int..]);
        let pins = (0..self.n_rings)
            .map(|r| {
                if r < n_int {
                    self.pin_temperatures(next[r], per_pin, self.film_interior)
                } else {
                    self.pin_temperatures(edge_mean, per_pin, self.film_edge)
                }
            })
            .collect();

        Ok(StepOutcome {
            state: UnitState {
                coolant: next,
                duct_mw,
                duct_outer,
                pins,
            },
            energy: EnergyTally {
                power_added: power.total() * dz,
                heat_to_gap,
                enthalpy_rise: enthalpy,
            },
        })
    }
}
