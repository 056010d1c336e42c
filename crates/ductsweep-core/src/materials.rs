// ─────────────────────────────────────────────────────────────────────
// DuctSweep — Materials
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Temperature-dependent material properties.
//!
//! Correlations are polynomials in T [K] evaluated in SI units. The
//! built-in sets are engineering approximations over the usual fast
//! reactor operating window; projects with qualified data register their
//! own through `CoreConfig::materials`.

use ductsweep_types::config::{CoreConfig, MaterialConfig};
use ductsweep_types::error::{SweepError, SweepResult};
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

/// Property lookup for one material.
pub trait MaterialProperties: Send + Sync + Debug {
    fn name(&self) -> &str;
    /// kg/m³
    fn density(&self, t: f64) -> f64;
    /// J/(kg·K)
    fn heat_capacity(&self, t: f64) -> f64;
    /// W/(m·K)
    fn thermal_conductivity(&self, t: f64) -> f64;
    /// Pa·s; zero for solids.
    fn viscosity(&self, t: f64) -> f64;
}

/// Material defined by polynomial correlations.
#[derive(Debug, Clone, PartialEq)]
pub struct PolynomialMaterial {
    name: String,
    coeffs: MaterialConfig,
}

fn horner(coeffs: &[f64], t: f64) -> f64 {
    coeffs.iter().rev().fold(0.0, |acc, &c| acc * t + c)
}

impl PolynomialMaterial {
    pub fn new(name: impl Into<String>, coeffs: MaterialConfig) -> SweepResult<Self> {
        let name = name.into();
        if coeffs.density.is_empty()
            || coeffs.heat_capacity.is_empty()
            || coeffs.thermal_conductivity.is_empty()
        {
            return Err(SweepError::ConfigError(format!(
                "material '{name}' needs density, heat capacity and conductivity correlations"
            )));
        }
        if let (Some(lo), Some(hi)) = (coeffs.t_min, coeffs.t_max) {
            if lo >= hi {
                return Err(SweepError::ConfigError(format!(
                    "material '{name}' validity range [{lo}, {hi}] is empty"
                )));
            }
        }
        Ok(PolynomialMaterial { name, coeffs })
    }

    fn clamp(&self, t: f64) -> f64 {
        let t = self.coeffs.t_min.map_or(t, |lo| t.max(lo));
        self.coeffs.t_max.map_or(t, |hi| t.min(hi))
    }

    /// Check that the correlations stay physical over `[t_lo, t_hi]`.
    pub fn check_range(&self, t_lo: f64, t_hi: f64) -> SweepResult<()> {
        let samples = 16;
        for i in 0..=samples {
            let t = t_lo + (t_hi - t_lo) * i as f64 / samples as f64;
            let (rho, cp, k) = (
                self.density(t),
                self.heat_capacity(t),
                self.thermal_conductivity(t),
            );
            if !(rho > 0.0 && cp > 0.0 && k > 0.0) {
                return Err(SweepError::PhysicsViolation(format!(
                    "material '{}' is non-physical at {t:.1} K: rho={rho}, cp={cp}, k={k}",
                    self.name
                )));
            }
        }
        Ok(())
    }
}

impl MaterialProperties for PolynomialMaterial {
    fn name(&self) -> &str {
        &self.name
    }

    fn density(&self, t: f64) -> f64 {
        horner(&self.coeffs.density, self.clamp(t))
    }

    fn heat_capacity(&self, t: f64) -> f64 {
        horner(&self.coeffs.heat_capacity, self.clamp(t))
    }

    fn thermal_conductivity(&self, t: f64) -> f64 {
        horner(&self.coeffs.thermal_conductivity, self.clamp(t))
    }

    fn viscosity(&self, t: f64) -> f64 {
        horner(&self.coeffs.viscosity, self.clamp(t))
    }
}

fn sodium() -> MaterialConfig {
    MaterialConfig {
        density: vec![1011.8, -0.22054, -1.9226e-5, 5.6371e-9],
        heat_capacity: vec![1658.2, -0.84790, 4.4541e-4],
        thermal_conductivity: vec![124.67, -0.11381, 5.5226e-5, -1.1842e-8],
        viscosity: vec![1.0e-3, -1.2e-6, 4.0e-10],
        t_min: Some(371.0),
        t_max: Some(1155.0),
    }
}

fn ht9() -> MaterialConfig {
    MaterialConfig {
        density: vec![7874.0, -0.3],
        heat_capacity: vec![431.0, 0.18],
        thermal_conductivity: vec![17.622, 2.42e-2, -1.696e-5],
        viscosity: Vec::new(),
        t_min: Some(293.0),
        t_max: Some(1300.0),
    }
}

fn uzr() -> MaterialConfig {
    MaterialConfig {
        density: vec![15800.0],
        heat_capacity: vec![120.0, 0.06],
        thermal_conductivity: vec![17.5, 1.54e-2],
        viscosity: Vec::new(),
        t_min: Some(293.0),
        t_max: Some(1400.0),
    }
}

/// Materials keyed by lowercase name.
#[derive(Debug, Clone, Default)]
pub struct MaterialLibrary {
    entries: HashMap<String, Arc<dyn MaterialProperties>>,
}

impl MaterialLibrary {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Library with `sodium`, `ht9` and `uzr`.
    pub fn with_builtins() -> SweepResult<Self> {
        let mut lib = Self::empty();
        lib.insert(Arc::new(PolynomialMaterial::new("sodium", sodium())?));
        lib.insert(Arc::new(PolynomialMaterial::new("ht9", ht9())?));
        lib.insert(Arc::new(PolynomialMaterial::new("uzr", uzr())?));
        Ok(lib)
    }

    /// Built-ins plus every custom material in `config`; custom entries
    /// replace built-ins of the same name.
    pub fn from_config(config: &CoreConfig) -> SweepResult<Self> {
        let mut lib = Self::with_builtins()?;
        for (name, coeffs) in &config.materials {
            let material = PolynomialMaterial::new(name.to_lowercase(), coeffs.clone())?;
            lib.insert(Arc::new(material));
        }
        Ok(lib)
    }

    pub fn insert(&mut self, material: Arc<dyn MaterialProperties>) {
        self.entries.insert(material.name().to_lowercase(), material);
    }

    pub fn get(&self, name: &str) -> SweepResult<Arc<dyn MaterialProperties>> {
        self.entries
            .get(&name.to_lowercase())
            .cloned()
            .ok_or_else(|| SweepError::ConfigError(format!("unknown material '{name}'")))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&name.to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sodium_properties_plausible() {
        let lib = MaterialLibrary::with_builtins().unwrap();
        let na = lib.get("Sodium").unwrap();
        let t = 700.0;
        let rho = na.density(t);
        let cp = na.heat_capacity(t);
        let k = na.thermal_conductivity(t);
        assert!((800.0..900.0).contains(&rho), "rho={rho}");
        assert!((1250.0..1300.0).contains(&cp), "cp={cp}");
        assert!((60.0..75.0).contains(&k), "k={k}");
        assert!(na.viscosity(t) > 0.0);
    }

    #[test]
    fn test_clamping_outside_validity_range() {
        let lib = MaterialLibrary::with_builtins().unwrap();
        let na = lib.get("sodium").unwrap();
        assert_eq!(na.heat_capacity(2000.0), na.heat_capacity(1155.0));
        assert_eq!(na.heat_capacity(100.0), na.heat_capacity(371.0));
    }

    #[test]
    fn test_solid_has_zero_viscosity() {
        let lib = MaterialLibrary::with_builtins().unwrap();
        assert_eq!(lib.get("ht9").unwrap().viscosity(700.0), 0.0);
    }

    #[test]
    fn test_unknown_material() {
        let lib = MaterialLibrary::with_builtins().unwrap();
        let err = lib.get("lead").expect_err("lead is not built in");
        match err {
            SweepError::ConfigError(msg) => assert!(msg.contains("lead")),
            other => panic!("Unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_builtins_physical_over_window() {
        let lib = MaterialLibrary::with_builtins().unwrap();
        for name in ["sodium", "ht9", "uzr"] {
            let m = lib.get(name).unwrap();
            for t in [400.0, 600.0, 800.0, 1000.0] {
                assert!(m.density(t) > 0.0 && m.heat_capacity(t) > 0.0);
                assert!(m.thermal_conductivity(t) > 0.0, "{name} at {t}");
            }
        }
    }

    #[test]
    fn test_check_range_flags_negative_cp() {
        let bad = PolynomialMaterial::new(
            "bad",
            MaterialConfig {
                density: vec![1000.0],
                heat_capacity: vec![500.0, -0.5],
                thermal_conductivity: vec![10.0],
                viscosity: Vec::new(),
                t_min: None,
                t_max: None,
            },
        )
        .unwrap();
        assert!(bad.check_range(300.0, 400.0).is_ok());
        assert!(bad.check_range(300.0, 1200.0).is_err());
    }
}
