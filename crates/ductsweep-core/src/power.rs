// ─────────────────────────────────────────────────────────────────────
// DuctSweep — Power
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Axial power distributions.
//!
//! The sweep only needs linear power [W/m] per unit and component at an
//! axial position, plus the mesh planes of each unit's power table.

use ductsweep_types::config::PowerNormalization;
use ductsweep_types::error::{SweepError, SweepResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// Linear power by component [W/m].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentPower {
    pub pins: f64,
    pub coolant: f64,
    pub duct: f64,
}

impl ComponentPower {
    pub fn total(&self) -> f64 {
        self.pins + self.coolant + self.duct
    }

    pub fn scaled(&self, factor: f64) -> Self {
        ComponentPower {
            pins: self.pins * factor,
            coolant: self.coolant * factor,
            duct: self.duct * factor,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.pins.is_finite() && self.coolant.is_finite() && self.duct.is_finite()
    }
}

/// Source of per-unit power for the sweep.
pub trait PowerProvider: Send + Sync {
    fn unit_count(&self) -> usize;

    /// Linear power of `unit` at axial position `z`.
    fn linear_power(&self, unit: usize, z: f64) -> ComponentPower;

    /// Axial planes where the unit's power description changes.
    fn axial_bounds(&self, unit: usize) -> Vec<f64>;

    /// Integrated power of `unit` [W].
    fn unit_power(&self, unit: usize) -> f64;

    fn total_power(&self) -> f64 {
        (0..self.unit_count()).map(|u| self.unit_power(u)).sum()
    }
}

/// Piecewise-constant linear power over axial intervals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxialPowerTable {
    /// Interval bounds, `n + 1` increasing values.
    pub z: Vec<f64>,
    pub pins: Vec<f64>,
    pub coolant: Vec<f64>,
    pub duct: Vec<f64>,
}

impl AxialPowerTable {
    pub fn new(z: Vec<f64>, pins: Vec<f64>, coolant: Vec<f64>, duct: Vec<f64>) -> SweepResult<Self> {
        let table = AxialPowerTable {
            z,
            pins,
            coolant,
            duct,
        };
        table.validate()?;
        Ok(table)
    }

    /// Same linear power everywhere on `[0, length]`.
    pub fn uniform(length: f64, power: ComponentPower) -> SweepResult<Self> {
        Self::new(
            vec![0.0, length],
            vec![power.pins],
            vec![power.coolant],
            vec![power.duct],
        )
    }

    pub fn zero(length: f64) -> SweepResult<Self> {
        Self::uniform(length, ComponentPower::default())
    }

    pub fn validate(&self) -> SweepResult<()> {
        let n = self.z.len().saturating_sub(1);
        if n == 0 {
            return Err(SweepError::ConfigError(
                "power table needs at least one interval".to_string(),
            ));
        }
        if self.pins.len() != n || self.coolant.len() != n || self.duct.len() != n {
            return Err(SweepError::ConfigError(format!(
                "power table has {n} intervals but {}/{}/{} pin/coolant/duct values",
                self.pins.len(),
                self.coolant.len(),
                self.duct.len()
            )));
        }
        if self.z.windows(2).any(|w| !(w[1] > w[0])) || self.z[0] < 0.0 {
            return Err(SweepError::ConfigError(
                "power table bounds must be non-negative and strictly increasing".to_string(),
            ));
        }
        let all = self.pins.iter().chain(&self.coolant).chain(&self.duct);
        if let Some(v) = all.into_iter().find(|v| !v.is_finite()) {
            return Err(SweepError::PhysicsViolation(format!(
                "power table contains non-finite value {v}"
            )));
        }
        Ok(())
    }

    /// Linear power at `z`; zero outside the table.
    pub fn at(&self, z: f64) -> ComponentPower {
        let n = self.pins.len();
        if n == 0 || z < self.z[0] || z > self.z[n] {
            return ComponentPower::default();
        }
        let i = self.z.partition_point(|&b| b <= z).saturating_sub(1).min(n - 1);
        ComponentPower {
            pins: self.pins[i],
            coolant: self.coolant[i],
            duct: self.duct[i],
        }
    }

    /// Integrated power [W].
    pub fn integral(&self) -> f64 {
        self.z
            .windows(2)
            .enumerate()
            .map(|(i, w)| (w[1] - w[0]) * (self.pins[i] + self.coolant[i] + self.duct[i]))
            .sum()
    }
}

/// One power table per unit, in unit order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabulatedPower {
    tables: Vec<AxialPowerTable>,
}

impl TabulatedPower {
    pub fn new(tables: Vec<AxialPowerTable>) -> SweepResult<Self> {
        for table in &tables {
            table.validate()?;
        }
        Ok(TabulatedPower { tables })
    }

    /// Unpowered core of `n_units` units over `[0, length]`.
    pub fn zero(n_units: usize, length: f64) -> SweepResult<Self> {
        let tables = (0..n_units)
            .map(|_| AxialPowerTable::zero(length))
            .collect::<SweepResult<Vec<_>>>()?;
        Ok(TabulatedPower { tables })
    }

    pub fn from_json_str(contents: &str) -> SweepResult<Self> {
        let parsed: Self = serde_json::from_str(contents)?;
        Self::new(parsed.tables)
    }

    pub fn from_file(path: impl AsRef<Path>) -> SweepResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn tables(&self) -> &[AxialPowerTable] {
        &self.tables
    }
}

impl PowerProvider for TabulatedPower {
    fn unit_count(&self) -> usize {
        self.tables.len()
    }

    fn linear_power(&self, unit: usize, z: f64) -> ComponentPower {
        self.tables
            .get(unit)
            .map_or_else(ComponentPower::default, |t| t.at(z))
    }

    fn axial_bounds(&self, unit: usize) -> Vec<f64> {
        self.tables.get(unit).map_or_else(Vec::new, |t| t.z.clone())
    }

    fn unit_power(&self, unit: usize) -> f64 {
        self.tables.get(unit).map_or(0.0, AxialPowerTable::integral)
    }
}

/// Any provider rescaled by a single factor.
///
/// The factor normalizes to the requested core total first, then applies
/// the extra scaling factor on top.
pub struct NormalizedPower {
    inner: Arc<dyn PowerProvider>,
    factor: f64,
}

impl NormalizedPower {
    pub fn new(inner: Arc<dyn PowerProvider>, norm: &PowerNormalization) -> SweepResult<Self> {
        let mut factor = 1.0;
        if let Some(target) = norm.total_power {
            let calculated = inner.total_power();
            if !(calculated > 0.0) {
                return Err(SweepError::PhysicsViolation(format!(
                    "cannot normalize power to {target:.6e} W: tabulated total is {calculated:.6e} W"
                )));
            }
            factor = target / calculated;
            log::info!(
                "Normalizing core power from {calculated:.6e} W to {target:.6e} W (factor {factor:.6})"
            );
        }
        if norm.scaling_factor != 1.0 {
            log::info!("Scaling core power by {:.6}", norm.scaling_factor);
            factor *= norm.scaling_factor;
        }
        Ok(NormalizedPower { inner, factor })
    }

    /// Wrap `inner` only when `norm` changes anything.
    pub fn apply(
        inner: Arc<dyn PowerProvider>,
        norm: &PowerNormalization,
    ) -> SweepResult<Arc<dyn PowerProvider>> {
        if norm.total_power.is_none() && norm.scaling_factor == 1.0 {
            return Ok(inner);
        }
        Ok(Arc::new(Self::new(inner, norm)?))
    }

    pub fn factor(&self) -> f64 {
        self.factor
    }
}

impl PowerProvider for NormalizedPower {
    fn unit_count(&self) -> usize {
        self.inner.unit_count()
    }

    fn linear_power(&self, unit: usize, z: f64) -> ComponentPower {
        self.inner.linear_power(unit, z).scaled(self.factor)
    }

    fn axial_bounds(&self, unit: usize) -> Vec<f64> {
        self.inner.axial_bounds(unit)
    }

    fn unit_power(&self, unit: usize) -> f64 {
        self.inner.unit_power(unit) * self.factor
    }
}
