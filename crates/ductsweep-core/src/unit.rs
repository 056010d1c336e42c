// ─────────────────────────────────────────────────────────────────────
// DuctSweep — Unit
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! One assembly: its axial regions, perimeter mesh and temperatures.
//!
//! Static geometry is validated once in `Unit::new`. Stepping computes a
//! `UnitUpdate` from `&self` and the caller commits it, so a failed plane
//! never leaves a unit half advanced.

use crate::geometry::{HexDuct, PerimeterMesh};
use crate::materials::{MaterialLibrary, MaterialProperties};
use crate::porous::PorousRegion;
use crate::region::{weighted_mean, Region, RegionHeader, StepInput, UnitState};
use crate::rodded::{BundleMaterials, RoddedRegion};
use crate::stability::StableStep;
use ductsweep_types::config::{RegionConfig, RegionModel, UnitConfig};
use ductsweep_types::error::{SweepError, SweepResult};
use ductsweep_types::state::{EnergyTally, UnitSnapshot};
use std::sync::Arc;

/// Tolerance on region bound contiguity [m].
const BOUND_TOL: f64 = 1e-12;

/// Result of advancing a unit by one step, not yet applied.
#[derive(Debug, Clone)]
pub struct UnitUpdate {
    active: usize,
    state: UnitState,
    energy: EnergyTally,
}

impl UnitUpdate {
    pub fn energy(&self) -> &EnergyTally {
        &self.energy
    }

    pub fn state(&self) -> &UnitState {
        &self.state
    }
}

#[derive(Debug, Clone)]
pub struct Unit {
    id: usize,
    name: String,
    mesh: PerimeterMesh,
    regions: Vec<Region>,
    active: usize,
    state: UnitState,
    inlet_temp: f64,
    tally: EnergyTally,
}

impl Unit {
    /// Build unit `id` from its configuration.
    ///
    /// Fails with `SweepError::Geometry` when the regions do not tile the
    /// unit length or a rodded region has no bundle description.
    pub fn new(
        id: usize,
        cfg: &UnitConfig,
        materials: &MaterialLibrary,
        coolant: Arc<dyn MaterialProperties>,
        flow_rate: f64,
        inlet_temp: f64,
        gap_film: f64,
    ) -> SweepResult<Self> {
        let mut specs: Vec<_> = cfg.regions.iter().collect();
        specs.sort_by(|a, b| a.z_lo.total_cmp(&b.z_lo));
        validate_bounds(id, &specs)?;

        let any_rodded = specs.iter().any(|r| r.model == RegionModel::Rodded);
        let bundle = match (&cfg.bundle, any_rodded) {
            (Some(b), true) => Some(b),
            (None, true) => {
                let name = specs
                    .iter()
                    .find(|r| r.model == RegionModel::Rodded)
                    .map_or_else(String::new, |r| r.name.clone());
                return Err(SweepError::Geometry {
                    unit: id,
                    region: name,
                    reason: "rodded region declared without bundle geometry".to_string(),
                });
            }
            (_, false) => None,
        };
        let mesh = match bundle {
            Some(b) => PerimeterMesh::uniform(b.n_rings + 1)?,
            None => PerimeterMesh::corners_only(),
        };
        let duct = HexDuct {
            flat_to_flat: cfg.duct.flat_to_flat,
            thickness: cfg.duct.thickness,
        };
        let duct_material = materials.get(&cfg.duct_material)?;

        let mut regions = Vec::with_capacity(specs.len());
        for spec in &specs {
            let header = RegionHeader::new(spec.name.clone(), spec.z_lo, spec.z_hi);
            let region = match (&spec.model, bundle) {
                (RegionModel::Rodded, Some(b)) => {
                    let mats = BundleMaterials {
                        coolant: coolant.clone(),
                        clad: materials.get(&b.clad_material)?,
                        fuel: materials.get(&b.fuel_material)?,
                        duct: duct_material.clone(),
                    };
                    Region::Rodded(RoddedRegion::new(
                        id, header, b, &duct, &mesh, mats, flow_rate, inlet_temp, gap_film,
                    )?)
                }
                (RegionModel::Rodded, None) => {
                    return Err(SweepError::InvalidState(
                        "rodded region without bundle passed validation".to_string(),
                    ))
                }
                (
                    RegionModel::Porous {
                        porosity,
                        hydraulic_diameter,
                    },
                    _,
                ) => Region::Porous(PorousRegion::new(
                    id,
                    header,
                    *porosity,
                    *hydraulic_diameter,
                    &duct,
                    &mesh,
                    coolant.clone(),
                    duct_material.as_ref(),
                    flow_rate,
                    inlet_temp,
                    gap_film,
                )?),
            };
            regions.push(region);
        }

        let state = initial_state(&regions[0], &mesh, inlet_temp);
        Ok(Unit {
            id,
            name: cfg.name.clone(),
            mesh,
            regions,
            active: 0,
            state,
            inlet_temp,
            tally: EnergyTally::default(),
        })
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mesh(&self) -> &PerimeterMesh {
        &self.mesh
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn active_region(&self) -> &Region {
        &self.regions[self.active]
    }

    pub fn state(&self) -> &UnitState {
        &self.state
    }

    pub fn tally(&self) -> &EnergyTally {
        &self.tally
    }

    /// Axial length covered by the regions [m].
    pub fn length(&self) -> f64 {
        self.regions.last().map_or(0.0, |r| r.bounds().z_hi)
    }

    /// Every region bound, inlet included.
    pub fn region_bounds(&self) -> Vec<f64> {
        let mut bounds = vec![self.regions[0].bounds().z_lo];
        bounds.extend(self.regions.iter().map(|r| r.bounds().z_hi));
        bounds
    }

    pub fn has_rodded(&self) -> bool {
        self.regions.iter().any(Region::is_rodded)
    }

    pub fn is_stabilized(&self) -> bool {
        self.regions.iter().any(Region::is_stabilized)
    }

    /// Mass-flow weighted coolant temperature [K].
    pub fn bulk_coolant(&self) -> f64 {
        weighted_mean(self.state.coolant.view(), self.active_region().channel_flows())
    }

    /// Index of the region active at `z`: the one with `z_lo < z ≤ z_hi`;
    /// the first region at the inlet.
    pub fn region_index_at(&self, z: f64) -> usize {
        self.regions
            .iter()
            .position(|r| r.bounds().contains(z))
            .unwrap_or(if z <= self.regions[0].bounds().z_lo {
                0
            } else {
                self.regions.len() - 1
            })
    }

    pub fn min_stable_step(&self) -> StableStep {
        self.regions
            .iter()
            .map(Region::min_stable_step)
            .fold(StableStep::unconstrained(), StableStep::min)
    }

    /// Switch every region to the relaxed duct coupling, permanently.
    pub fn stabilize(&mut self) {
        for region in &mut self.regions {
            region.stabilize();
        }
    }

    /// Advance to `z` using the gap temperatures in `input`.
    pub fn advance(&self, z: f64, input: &StepInput<'_>) -> SweepResult<UnitUpdate> {
        let target = self.region_index_at(z);
        let adopted;
        let start = if target != self.active {
            adopted = self.regions[target].adopt(&self.regions[self.active], &self.state);
            &adopted
        } else {
            &self.state
        };
        let region = &self.regions[target];
        let outcome = region.step(start, input)?;
        if !outcome.state.is_finite() {
            return Err(SweepError::PhysicsViolation(format!(
                "non-finite temperature in unit {} ({}) region '{}' at z = {z:.6} m",
                self.id,
                self.name,
                region.name()
            )));
        }
        Ok(UnitUpdate {
            active: target,
            state: outcome.state,
            energy: outcome.energy,
        })
    }

    pub fn commit(&mut self, update: UnitUpdate, z: f64, track_energy: bool) {
        if update.active != self.active {
            log::debug!(
                "Unit {} ({}): region '{}' -> '{}' at z = {:.4} m",
                self.id,
                self.name,
                self.regions[self.active].name(),
                self.regions[update.active].name(),
                z
            );
            self.active = update.active;
        }
        self.state = update.state;
        if track_energy {
            self.tally.accumulate(&update.energy);
        }
    }

    /// Return to the inlet condition: first region, uniform inlet
    /// temperature, cleared tally.
    pub fn reset(&mut self) {
        self.active = 0;
        self.state = initial_state(&self.regions[0], &self.mesh, self.inlet_temp);
        self.tally = EnergyTally::default();
    }

    pub fn snapshot(&self) -> UnitSnapshot {
        UnitSnapshot {
            id: self.id,
            name: self.name.clone(),
            active_region: self.active_region().name().to_string(),
            stabilized: self.active_region().is_stabilized(),
            coolant: self.state.coolant.to_vec(),
            duct_mw: self.state.duct_mw.to_vec(),
            duct_outer: self.state.duct_outer.to_vec(),
            pins: self.state.pins.clone(),
        }
    }
}

fn initial_state(region: &Region, mesh: &PerimeterMesh, t: f64) -> UnitState {
    UnitState::uniform(region.coolant_channels(), mesh.len(), region.pin_rings(), t)
}

fn validate_bounds(unit: usize, specs: &[&RegionConfig]) -> SweepResult<()> {
    let err = |region: &str, reason: String| SweepError::Geometry {
        unit,
        region: region.to_string(),
        reason,
    };
    let Some(first) = specs.first() else {
        return Err(err("", "unit has no axial regions".to_string()));
    };
    if first.z_lo.abs() > BOUND_TOL {
        return Err(err(
            &first.name,
            format!("first region starts at {} m instead of the inlet", first.z_lo),
        ));
    }
    for spec in specs {
        if !(spec.z_hi > spec.z_lo) || !spec.z_hi.is_finite() {
            return Err(err(
                &spec.name,
                format!("empty axial bounds ({}, {}]", spec.z_lo, spec.z_hi),
            ));
        }
    }
    for pair in specs.windows(2) {
        if (pair[1].z_lo - pair[0].z_hi).abs() > BOUND_TOL {
            return Err(err(
                &pair[1].name,
                format!(
                    "regions '{}' and '{}' are not contiguous ({} m vs {} m)",
                    pair[0].name, pair[1].name, pair[0].z_hi, pair[1].z_lo
                ),
            ));
        }
    }
    Ok(())
}
