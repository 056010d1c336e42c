//! Lumped porous-medium region.
//!
//! All coolant in the region is one channel. Pin and coolant power go
//! straight into it; the duct wall couples it to the gap segment by
//! segment.

use crate::convection::film_coefficient;
use crate::duct::WallCoupling;
use crate::geometry::{HexDuct, PerimeterMesh};
use crate::materials::MaterialProperties;
use crate::region::{DuctCoupling, RegionHeader, StepInput, StepOutcome, UnitState};
use crate::stability::{LimitingChannel, StableStep};
use ductsweep_types::error::{SweepError, SweepResult};
use ductsweep_types::state::EnergyTally;
use ndarray::Array1;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct PorousRegion {
    pub(crate) header: RegionHeader,
    flow: [f64; 1],
    wall: WallCoupling,
    coolant: Arc<dyn MaterialProperties>,
    t_ref: f64,
}

impl PorousRegion {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        unit: usize,
        header: RegionHeader,
        porosity: f64,
        hydraulic_diameter: f64,
        duct: &HexDuct,
        mesh: &PerimeterMesh,
        coolant: Arc<dyn MaterialProperties>,
        duct_material: &dyn MaterialProperties,
        flow_rate: f64,
        t_ref: f64,
        gap_film: f64,
    ) -> SweepResult<Self> {
        if !(porosity > 0.0 && porosity <= 1.0) || !(hydraulic_diameter > 0.0) {
            return Err(SweepError::Geometry {
                unit,
                region: header.name.clone(),
                reason: format!(
                    "porosity must be in (0, 1] and hydraulic diameter > 0, got {porosity} and {hydraulic_diameter}"
                ),
            });
        }
        let flow_area = porosity * duct.inner_area();
        let film = film_coefficient(coolant.as_ref(), t_ref, flow_rate, flow_area, hydraulic_diameter);
        let k_duct = duct_material.thermal_conductivity(t_ref);
        let wall = WallCoupling::new(mesh, duct, k_duct, |_| film, gap_film);
        Ok(PorousRegion {
            header,
            flow: [flow_rate],
            wall,
            coolant,
            t_ref,
        })
    }

    pub fn channel_flows(&self) -> &[f64] {
        &self.flow
    }

    pub fn min_stable_step(&self) -> StableStep {
        if self.header.coupling == DuctCoupling::Relaxed {
            return StableStep::unconstrained();
        }
        let capacity = self.flow[0] * self.coolant.heat_capacity(self.t_ref);
        let conductance: f64 = (0..self.wall.len())
            .map(|seg| self.wall.through_conductance(seg))
            .sum();
        StableStep::for_channel(capacity, conductance, LimitingChannel::Lumped)
    }

    pub fn step(&self, state: &UnitState, input: &StepInput<'_>) -> SweepResult<StepOutcome> {
        if state.coolant.len() != 1 || input.gap.len() != self.wall.len() {
            return Err(SweepError::InvalidState(format!(
                "region '{}' expects 1 channel and {} gap points, got {} and {}",
                self.header.name,
                self.wall.len(),
                state.coolant.len(),
                input.gap.len()
            )));
        }
        let t = state.coolant[0];
        let capacity = self.flow[0] * self.coolant.heat_capacity(t);
        let dz = input.dz;
        let power = input.power;
        let n_seg = self.wall.len();

        let mut dq = power.pins + power.coolant;
        let mut heat_to_gap = 0.0;
        let mut duct_mw = Array1::zeros(n_seg);
        let mut duct_outer = Array1::zeros(n_seg);

        let dt = match self.header.coupling {
            DuctCoupling::Explicit => {
                for seg in 0..n_seg {
                    let q_seg = self.wall.segment_power(seg, power.duct);
                    let ex = self.wall.exchange(seg, t, input.gap[seg], q_seg);
                    dq += ex.into_coolant;
                    heat_to_gap += ex.to_gap * dz;
                    duct_mw[seg] = ex.mid_wall;
                    duct_outer[seg] = ex.outer_surface;
                }
                dz * dq / capacity
            }
            DuctCoupling::Relaxed => {
                let mut c_total = 0.0;
                let mut drive = 0.0;
                for seg in 0..n_seg {
                    let q_seg = self.wall.segment_power(seg, power.duct);
                    let share = self.wall.coolant_share(seg);
                    dq += q_seg * share;
                    heat_to_gap += q_seg * (1.0 - share) * dz;
                    let c = self.wall.through_conductance(seg);
                    c_total += c;
                    drive += c * (input.gap[seg] - t);
                }
                let mut dt = dz * dq / capacity;
                if c_total > 0.0 {
                    let relax = drive / c_total * (1.0 - (-dz * c_total / capacity).exp());
                    heat_to_gap -= capacity * relax;
                    dt += relax;
                }
                let t_new = t + dt;
                for seg in 0..n_seg {
                    let q_seg = self.wall.segment_power(seg, power.duct);
                    let ex = self.wall.exchange(seg, t_new, input.gap[seg], q_seg);
                    duct_mw[seg] = ex.mid_wall;
                    duct_outer[seg] = ex.outer_surface;
                }
                dt
            }
        };

        Ok(StepOutcome {
            state: UnitState {
                coolant: Array1::from_elem(1, t + dt),
                duct_mw,
                duct_outer,
                pins: Vec::new(),
            },
            energy: EnergyTally {
                power_added: power.total() * dz,
                heat_to_gap,
                enthalpy_rise: capacity * dt,
            },
        })
    }
}
