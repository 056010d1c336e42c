// ─────────────────────────────────────────────────────────────────────
// DuctSweep — State
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use crate::error::SweepResult;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Temperatures of one unit at one axial plane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitSnapshot {
    pub id: usize,
    pub name: String,
    pub active_region: String,
    pub stabilized: bool,
    /// Coolant temperature per channel [K].
    pub coolant: Vec<f64>,
    /// Duct mid-wall temperature per perimeter point [K].
    pub duct_mw: Vec<f64>,
    /// Duct outer-surface temperature per perimeter point [K].
    pub duct_outer: Vec<f64>,
    /// (clad mid-wall, fuel centerline) per pin ring [K]; empty if not rodded.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pins: Vec<[f64; 2]>,
}

impl UnitSnapshot {
    pub fn mean_coolant(&self) -> f64 {
        mean(&self.coolant)
    }

    pub fn max_coolant(&self) -> f64 {
        self.coolant.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }
}

/// Full core state handed to the output sink at a dump plane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoreSnapshot {
    pub step: usize,
    /// Axial position [m].
    pub z: f64,
    pub units: Vec<UnitSnapshot>,
    /// Gap coolant per unit, one row per unit; empty when adiabatic.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub gap: Vec<Vec<f64>>,
}

impl CoreSnapshot {
    pub fn to_json(&self) -> SweepResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json_str(contents: &str) -> SweepResult<Self> {
        Ok(serde_json::from_str(contents)?)
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> SweepResult<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Hottest coolant channel in the core.
    pub fn max_coolant(&self) -> f64 {
        self.units
            .iter()
            .map(UnitSnapshot::max_coolant)
            .fold(f64::NEG_INFINITY, f64::max)
    }
}

/// Running energy tally for one unit [W].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EnergyTally {
    /// Heat deposited by the power source.
    pub power_added: f64,
    /// Heat passed from the duct outer surface to the gap.
    pub heat_to_gap: f64,
    /// Coolant enthalpy rise, m·cp·ΔT integrated over steps.
    pub enthalpy_rise: f64,
}

impl EnergyTally {
    /// Unaccounted heat; near zero for a conservative march.
    pub fn residual(&self) -> f64 {
        self.power_added - self.heat_to_gap - self.enthalpy_rise
    }

    pub fn relative_residual(&self) -> f64 {
        if self.power_added.abs() > 0.0 {
            self.residual() / self.power_added
        } else {
            self.residual()
        }
    }

    pub fn accumulate(&mut self, other: &EnergyTally) {
        self.power_added += other.power_added;
        self.heat_to_gap += other.heat_to_gap;
        self.enthalpy_rise += other.enthalpy_rise;
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}
