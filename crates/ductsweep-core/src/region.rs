// ─────────────────────────────────────────────────────────────────────
// DuctSweep — Regions
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Axial regions of a unit and the state they advance.
//!
//! A region is either a rodded bundle or a lumped porous medium. Both
//! march the same `UnitState` one step at a time through `Region::step`;
//! the variant decides which equations run.

use crate::porous::PorousRegion;
use crate::power::ComponentPower;
use crate::rodded::RoddedRegion;
use crate::stability::StableStep;
use ductsweep_types::error::SweepResult;
use ductsweep_types::state::EnergyTally;
use ndarray::{Array1, ArrayView1};

/// Axial extent `(z_lo, z_hi]` of a region [m].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxialBounds {
    pub z_lo: f64,
    pub z_hi: f64,
}

impl AxialBounds {
    pub fn contains(&self, z: f64) -> bool {
        self.z_lo < z && z <= self.z_hi
    }

    pub fn length(&self) -> f64 {
        self.z_hi - self.z_lo
    }
}

/// Formulation of the coolant-to-duct coupling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuctCoupling {
    /// Explicit exchange through the quasi-steady wall.
    Explicit,
    /// Exponential relaxation toward the gap; unconditionally stable.
    Relaxed,
}

/// Fields shared by every region variant.
#[derive(Debug, Clone)]
pub struct RegionHeader {
    pub name: String,
    pub bounds: AxialBounds,
    pub coupling: DuctCoupling,
}

impl RegionHeader {
    pub fn new(name: impl Into<String>, z_lo: f64, z_hi: f64) -> Self {
        RegionHeader {
            name: name.into(),
            bounds: AxialBounds { z_lo, z_hi },
            coupling: DuctCoupling::Explicit,
        }
    }
}

/// Temperatures of one unit [K].
#[derive(Debug, Clone, PartialEq)]
pub struct UnitState {
    /// One value per coolant channel of the active region.
    pub coolant: Array1<f64>,
    /// Per perimeter point.
    pub duct_mw: Array1<f64>,
    pub duct_outer: Array1<f64>,
    /// (clad mid-wall, fuel centerline) per pin ring.
    pub pins: Vec<[f64; 2]>,
}

impl UnitState {
    pub fn uniform(n_coolant: usize, n_perimeter: usize, n_pin_rings: usize, t: f64) -> Self {
        UnitState {
            coolant: Array1::from_elem(n_coolant, t),
            duct_mw: Array1::from_elem(n_perimeter, t),
            duct_outer: Array1::from_elem(n_perimeter, t),
            pins: vec![[t, t]; n_pin_rings],
        }
    }

    pub fn is_finite(&self) -> bool {
        self.coolant.iter().all(|v| v.is_finite())
            && self.duct_mw.iter().all(|v| v.is_finite())
            && self.duct_outer.iter().all(|v| v.is_finite())
            && self.pins.iter().flatten().all(|v| v.is_finite())
    }
}

/// Weighted mean taken as an offset from the first value, so a uniform
/// field returns that value exactly.
pub fn weighted_mean(values: ArrayView1<f64>, weights: &[f64]) -> f64 {
    let Some(&t0) = values.first() else {
        return f64::NAN;
    };
    let (mut num, mut den) = (0.0, 0.0);
    for (v, w) in values.iter().zip(weights) {
        num += w * (v - t0);
        den += w;
    }
    if den > 0.0 {
        t0 + num / den
    } else {
        t0
    }
}

/// Inputs of one axial step.
#[derive(Debug, Clone)]
pub struct StepInput<'a> {
    pub dz: f64,
    pub power: ComponentPower,
    /// Gap coolant on this unit's perimeter mesh.
    pub gap: ArrayView1<'a, f64>,
}

/// New state after one step plus the energy moved during it [W].
#[derive(Debug, Clone)]
pub struct StepOutcome {
    pub state: UnitState,
    pub energy: EnergyTally,
}

#[derive(Debug, Clone)]
pub enum Region {
    Rodded(RoddedRegion),
    Porous(PorousRegion),
}

impl Region {
    fn header(&self) -> &RegionHeader {
        match self {
            Region::Rodded(r) => &r.header,
            Region::Porous(p) => &p.header,
        }
    }

    fn header_mut(&mut self) -> &mut RegionHeader {
        match self {
            Region::Rodded(r) => &mut r.header,
            Region::Porous(p) => &mut p.header,
        }
    }

    pub fn name(&self) -> &str {
        &self.header().name
    }

    pub fn bounds(&self) -> AxialBounds {
        self.header().bounds
    }

    pub fn is_rodded(&self) -> bool {
        matches!(self, Region::Rodded(_))
    }

    pub fn is_stabilized(&self) -> bool {
        self.header().coupling == DuctCoupling::Relaxed
    }

    /// Switch to the relaxed duct coupling. There is no way back.
    pub fn stabilize(&mut self) {
        self.header_mut().coupling = DuctCoupling::Relaxed;
    }

    pub fn coolant_channels(&self) -> usize {
        match self {
            Region::Rodded(r) => r.channel_count(),
            Region::Porous(_) => 1,
        }
    }

    pub fn pin_rings(&self) -> usize {
        match self {
            Region::Rodded(r) => r.pin_rings(),
            Region::Porous(_) => 0,
        }
    }

    /// Mass flow per coolant channel [kg/s].
    pub fn channel_flows(&self) -> &[f64] {
        match self {
            Region::Rodded(r) => r.channel_flows(),
            Region::Porous(p) => p.channel_flows(),
        }
    }

    pub fn min_stable_step(&self) -> StableStep {
        match self {
            Region::Rodded(r) => r.min_stable_step(),
            Region::Porous(p) => p.min_stable_step(),
        }
    }

    pub fn step(&self, state: &UnitState, input: &StepInput<'_>) -> SweepResult<StepOutcome> {
        match self {
            Region::Rodded(r) => r.step(state, input),
            Region::Porous(p) => p.step(state, input),
        }
    }

    /// Carry `state` from `previous` into this region without a jump in
    /// bulk temperature.
    pub fn adopt(&self, previous: &Region, state: &UnitState) -> UnitState {
        let n = self.coolant_channels();
        let coolant = if self.is_rodded() && previous.is_rodded() && state.coolant.len() == n {
            state.coolant.clone()
        } else {
            Array1::from_elem(n, weighted_mean(state.coolant.view(), previous.channel_flows()))
        };
        let bulk = weighted_mean(coolant.view(), self.channel_flows());
        let pins = if state.pins.len() == self.pin_rings() {
            state.pins.clone()
        } else {
            vec![[bulk, bulk]; self.pin_rings()]
        };
        UnitState {
            coolant,
            duct_mw: state.duct_mw.clone(),
            duct_outer: state.duct_outer.clone(),
            pins,
        }
    }
}
