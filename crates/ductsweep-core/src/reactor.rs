// ─────────────────────────────────────────────────────────────────────
// DuctSweep — Core Assembly
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Core-level state: units, gap coolant, axial mesh and projection cache.
//!
//! `Core::build` does all static work once: flow estimates, unit and gap
//! construction, stability analysis, step sizing and plane placement.
//! `Core::advance` then moves every unit and the gap by one plane.

use crate::axial_mesh::{choose_step_size, AxialMesh, StepSizeDecision};
use crate::gap::GapField;
use crate::geometry::{HexDuct, PerimeterMesh};
use crate::materials::{MaterialLibrary, MaterialProperties};
use crate::power::{NormalizedPower, PowerProvider};
use crate::reconcile::{reconcile, BasisCache};
use crate::region::StepInput;
use crate::stability::StableStep;
use crate::unit::Unit;
use ductsweep_math::rounding::unique_rounded;
use ductsweep_types::config::{CoreConfig, DumpCadence, FlowSpec};
use ductsweep_types::constants::{AXIAL_ROUND_DIGITS, BC_ESTIMATE_ITERS};
use ductsweep_types::error::{SweepError, SweepResult};
use ductsweep_types::state::{CoreSnapshot, EnergyTally};
use ndarray::Array1;
use rayon::prelude::*;
use std::sync::Arc;

/// Tolerance when comparing axial lengths [m].
const LENGTH_TOL: f64 = 1e-9;

/// Flow and outlet estimates from Q = ṁ·cp·ΔT.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowEstimate {
    /// Mass flow per unit [kg/s].
    pub unit_flow: Vec<f64>,
    /// Estimated outlet temperature per unit [K].
    pub unit_outlet: Vec<f64>,
    /// Total core flow including bypass [kg/s].
    pub core_flow: f64,
    pub gap_flow: f64,
    /// Flow-weighted mixed outlet temperature [K].
    pub core_outlet: f64,
}

/// Size unit flows and outlet temperatures from their integrated power.
///
/// Logs a melt-risk warning for every unit whose outlet estimate exceeds
/// the configured limit.
pub fn estimate_boundary_conditions(
    config: &CoreConfig,
    coolant: &dyn MaterialProperties,
    power: &dyn PowerProvider,
) -> SweepResult<FlowEstimate> {
    let t_in = config.inlet_temp;
    let mut unit_flow = Vec::with_capacity(config.units.len());
    let mut unit_outlet = Vec::with_capacity(config.units.len());
    for (i, unit) in config.units.iter().enumerate() {
        let q = power.unit_power(i);
        if !q.is_finite() {
            return Err(SweepError::PhysicsViolation(format!(
                "unit {i} ({}) has non-finite power {q}",
                unit.name
            )));
        }
        let (flow, outlet) = match unit.flow {
            FlowSpec::FlowRate(m) => {
                let mut t_out = t_in;
                for _ in 0..BC_ESTIMATE_ITERS {
                    let cp = coolant.heat_capacity(0.5 * (t_in + t_out));
                    t_out = t_in + q / (m * cp);
                }
                (m, t_out)
            }
            FlowSpec::OutletTemp(t_out) => {
                if !(q > 0.0) {
                    return Err(SweepError::ConfigError(format!(
                        "unit {i} ({}) has no power; cannot size its flow from an outlet temperature",
                        unit.name
                    )));
                }
                let cp = coolant.heat_capacity(0.5 * (t_in + t_out));
                (q / (cp * (t_out - t_in)), t_out)
            }
        };
        if outlet > config.options.melt_limit {
            log::warn!(
                "Unit {i} ({}): estimated outlet temperature {outlet:.1} K exceeds {:.1} K; \
                 check flow and power inputs",
                unit.name,
                config.options.melt_limit
            );
        }
        unit_flow.push(flow);
        unit_outlet.push(outlet);
    }

    let assembly_flow: f64 = unit_flow.iter().sum();
    let core_flow = assembly_flow / (1.0 - config.bypass_fraction);
    let gap_flow = config.bypass_fraction * core_flow;
    let core_outlet = if assembly_flow > 0.0 {
        t_in + unit_flow
            .iter()
            .zip(&unit_outlet)
            .map(|(m, t)| m * (t - t_in))
            .sum::<f64>()
            / assembly_flow
    } else {
        t_in
    };
    log::info!(
        "Core flow {core_flow:.4} kg/s (gap {gap_flow:.4} kg/s), estimated outlet {core_outlet:.1} K"
    );
    Ok(FlowEstimate {
        unit_flow,
        unit_outlet,
        core_flow,
        gap_flow,
        core_outlet,
    })
}

/// Run `f` over every unit, in parallel when asked, keeping unit order.
///
/// Stops at the first error in sequential mode; in parallel mode any
/// failing worker aborts the collection.
fn map_units<T, F>(units: &[Unit], parallel: bool, f: F) -> SweepResult<Vec<T>>
where
    T: Send,
    F: Fn(usize, &Unit) -> SweepResult<T> + Sync + Send,
{
    if parallel {
        units.par_iter().enumerate().map(|(i, u)| f(i, u)).collect()
    } else {
        units.iter().enumerate().map(|(i, u)| f(i, u)).collect()
    }
}

pub struct Core {
    config: CoreConfig,
    power: Arc<dyn PowerProvider>,
    units: Vec<Unit>,
    gap: GapField,
    basis: BasisCache,
    mesh: AxialMesh,
    step_size: StepSizeDecision,
    required: StableStep,
    flows: FlowEstimate,
    dump_planes: Vec<f64>,
}

impl Core {
    /// Load custom materials from `config` and build.
    pub fn from_config(config: CoreConfig, power: Arc<dyn PowerProvider>) -> SweepResult<Self> {
        let materials = MaterialLibrary::from_config(&config)?;
        Self::build(config, &materials, power)
    }

    pub fn build(
        config: CoreConfig,
        materials: &MaterialLibrary,
        power: Arc<dyn PowerProvider>,
    ) -> SweepResult<Self> {
        config.validate()?;
        if power.unit_count() != config.units.len() {
            return Err(SweepError::ConfigError(format!(
                "power provider describes {} units but the core has {}",
                power.unit_count(),
                config.units.len()
            )));
        }
        let power = NormalizedPower::apply(power, &config.power)?;
        let coolant = materials.get(&config.coolant_material)?;
        let flows = estimate_boundary_conditions(&config, coolant.as_ref(), power.as_ref())?;

        let ducts: Vec<HexDuct> = config
            .units
            .iter()
            .map(|u| HexDuct {
                flat_to_flat: u.duct.flat_to_flat,
                thickness: u.duct.thickness,
            })
            .collect();
        let gap_film = GapField::film_coefficient(
            &config.gap,
            coolant.as_ref(),
            &ducts,
            flows.gap_flow,
            config.inlet_temp,
        );

        let mut units = config
            .units
            .iter()
            .enumerate()
            .map(|(i, u)| {
                Unit::new(
                    i,
                    u,
                    materials,
                    coolant.clone(),
                    flows.unit_flow[i],
                    config.inlet_temp,
                    gap_film,
                )
            })
            .collect::<SweepResult<Vec<_>>>()?;

        let length = units[0].length();
        if let Some(u) = units.iter().find(|u| (u.length() - length).abs() > LENGTH_TOL) {
            return Err(SweepError::ConfigError(format!(
                "unit {} ({}) is {} m long but unit 0 is {} m",
                u.id(),
                u.name(),
                u.length(),
                length
            )));
        }

        let gap_mesh = match config.gap.perimeter_points {
            Some(n) => PerimeterMesh::uniform(n)?,
            None => units
                .iter()
                .map(Unit::mesh)
                .max_by_key(|m| m.points_per_side())
                .cloned()
                .unwrap_or_else(PerimeterMesh::corners_only),
        };
        let gap = GapField::new(
            &config.gap,
            gap_mesh,
            &ducts,
            config.units.iter().map(|u| u.neighbors).collect(),
            gap_film,
            flows.gap_flow,
            coolant.clone(),
            config.inlet_temp,
        )?;

        let mut basis = BasisCache::new();
        for unit in &units {
            basis.prime(unit.mesh(), gap.mesh())?;
            basis.prime(gap.mesh(), unit.mesh())?;
        }

        let opts = &config.options;
        let mut required = gap.min_stable_step();
        for unit in &mut units {
            let before = unit.min_stable_step();
            let governed = if unit.has_rodded() {
                before.channel.touches_duct()
            } else {
                true
            };
            if opts.stabilization && before.dz < opts.stabilization_cutoff && governed {
                unit.stabilize();
                let after = unit.min_stable_step();
                log::info!(
                    "Unit {} ({}): {} channel limits the step to {:.3e} m; \
                     relaxed duct coupling gives {:.3e} m",
                    unit.id(),
                    unit.name(),
                    before.channel,
                    before.dz,
                    after.dz
                );
                required = required.min(after);
            } else {
                required = required.min(before);
            }
        }
        log::info!(
            "Required axial step {:.3e} m ({} channel)",
            required.dz,
            required.channel
        );
        let step_size = choose_step_size(required.dz, opts.axial_mesh_size, opts.max_step)?;

        let mut boundaries: Vec<f64> = Vec::new();
        for (i, unit) in units.iter().enumerate() {
            boundaries.extend(unit.region_bounds());
            boundaries.extend(power.axial_bounds(i));
        }
        boundaries.extend(opts.axial_planes.iter().copied());
        if let Some(b) = boundaries.iter().find(|&&b| b > length + LENGTH_TOL || b < 0.0) {
            return Err(SweepError::ConfigError(format!(
                "axial plane {b} m lies outside the core [0, {length}] m"
            )));
        }
        boundaries.push(length);
        let mesh = AxialMesh::plan(step_size.chosen, &boundaries)?;

        let dump_planes = match config.dump.cadence {
            DumpCadence::Interval(_) => {
                let region_planes = units.iter().flat_map(Unit::region_bounds);
                unique_rounded(
                    region_planes.chain(opts.axial_planes.iter().copied()),
                    AXIAL_ROUND_DIGITS,
                )
            }
            DumpCadence::ObservationPlanes => {
                unique_rounded(opts.axial_planes.iter().copied(), AXIAL_ROUND_DIGITS)
            }
            DumpCadence::Never | DumpCadence::EveryStep => Vec::new(),
        };

        log::info!(
            "Core '{}': {} units, {} gap points, {} cached projections",
            config.name,
            units.len(),
            gap.mesh().len(),
            basis.len()
        );
        Ok(Core {
            config,
            power,
            units,
            gap,
            basis,
            mesh,
            step_size,
            required,
            flows,
            dump_planes,
        })
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    pub fn gap(&self) -> &GapField {
        &self.gap
    }

    pub fn basis(&self) -> &BasisCache {
        &self.basis
    }

    pub fn axial_mesh(&self) -> &AxialMesh {
        &self.mesh
    }

    pub fn step_size(&self) -> &StepSizeDecision {
        &self.step_size
    }

    pub fn required_step(&self) -> StableStep {
        self.required
    }

    pub fn flows(&self) -> &FlowEstimate {
        &self.flows
    }

    /// Planes that always trigger a dump under the configured cadence.
    pub fn dump_planes(&self) -> &[f64] {
        &self.dump_planes
    }

    /// Advance the gap and every unit from `z - dz` to `z`.
    ///
    /// Either the whole plane is applied or, on error, nothing is: all
    /// per-unit updates are computed first and committed together.
    /// Returns the energy exchanged by each unit in this step.
    pub fn advance(&mut self, z: f64, dz: f64) -> SweepResult<Vec<EnergyTally>> {
        let parallel = self.config.options.parallel;
        let gap = &self.gap;
        let basis = &self.basis;

        let gap_next = if gap.is_adiabatic() {
            None
        } else {
            let on_gap = map_units(&self.units, parallel, |i, unit| {
                reconcile(
                    unit.mesh(),
                    unit.state().duct_outer.view(),
                    gap.mesh(),
                    basis.get(unit.mesh(), gap.mesh()),
                )
                .map_err(|e| e.in_unit(i))
            })?;
            Some(gap.advanced(&on_gap, dz)?)
        };

        let gap_temps = gap_next.as_ref().unwrap_or_else(|| gap.temperatures());
        let power = self.power.as_ref();
        let z_mid = z - 0.5 * dz;
        let updates = map_units(&self.units, parallel, |i, unit| {
            let local: Array1<f64> = reconcile(
                gap.mesh(),
                gap_temps.row(i),
                unit.mesh(),
                basis.get(gap.mesh(), unit.mesh()),
            )
            .map_err(|e| e.in_unit(i))?;
            let input = StepInput {
                dz,
                power: power.linear_power(i, z_mid),
                gap: local.view(),
            };
            unit.advance(z, &input).map_err(|e| e.in_unit(i))
        })?;

        if let Some(t) = gap_next {
            self.gap.commit(t);
        }
        let track = self.config.options.energy_balance;
        let energies = updates.iter().map(|u| *u.energy()).collect();
        for (unit, update) in self.units.iter_mut().zip(updates) {
            unit.commit(update, z, track);
        }
        Ok(energies)
    }

    /// Restore every unit and the gap to the inlet temperature.
    pub fn reset(&mut self) {
        for unit in &mut self.units {
            unit.reset();
        }
        self.gap.reset();
    }

    pub fn snapshot(&self, step: usize, z: f64) -> CoreSnapshot {
        CoreSnapshot {
            step,
            z,
            units: self.units.iter().map(Unit::snapshot).collect(),
            gap: if self.gap.is_adiabatic() {
                Vec::new()
            } else {
                self.gap.rows()
            },
        }
    }
}
