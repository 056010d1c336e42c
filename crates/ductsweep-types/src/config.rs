// ─────────────────────────────────────────────────────────────────────
// DuctSweep — Config
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use crate::constants::{
    DEFAULT_MAX_STEP, DEFAULT_MELT_LIMIT, DEFAULT_STABILIZATION_CUTOFF, HEX_SIDES,
    MIN_AXIAL_STEP,
};
use crate::error::{SweepError, SweepResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Top-level core configuration.
///
/// Built once, validated, then handed by reference to every stage of the
/// sweep. Nothing downstream mutates it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    #[serde(default = "default_core_name")]
    pub name: String,
    /// Core-wide coolant inlet temperature [K].
    pub inlet_temp: f64,
    pub coolant_material: String,
    /// Fraction of the core flow routed through the inter-assembly gap.
    #[serde(default)]
    pub bypass_fraction: f64,
    #[serde(default)]
    pub gap: GapConfig,
    pub units: Vec<UnitConfig>,
    #[serde(default)]
    pub options: SweepOptions,
    #[serde(default)]
    pub dump: DumpConfig,
    #[serde(default)]
    pub power: PowerNormalization,
    /// Extra material correlations, keyed by name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub materials: BTreeMap<String, MaterialConfig>,
}

/// Inter-assembly gap coolant settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GapConfig {
    /// Coupling model; `None` makes the core adiabatic.
    #[serde(default)]
    pub model: Option<GapModel>,
    /// Duct-to-duct gap width [m].
    #[serde(default = "default_gap_width")]
    pub width: f64,
    /// Fixed gap heat transfer coefficient [W/(m²·K)]; computed when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub htc: Option<f64>,
    /// Points per hex side of the shared gap mesh; finest unit mesh when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub perimeter_points: Option<usize>,
}

impl Default for GapConfig {
    fn default() -> Self {
        GapConfig {
            model: None,
            width: default_gap_width(),
            htc: None,
            perimeter_points: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapModel {
    /// Gap coolant flows axially and exchanges heat with both ducts.
    Flow,
    /// Stagnant gap; temperature follows the adjacent duct surfaces.
    NoFlow,
}

/// One assembly position in the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitConfig {
    pub name: String,
    pub flow: FlowSpec,
    pub duct_material: String,
    pub duct: DuctConfig,
    /// Pin bundle geometry; required by every rodded region.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bundle: Option<BundleConfig>,
    pub regions: Vec<RegionConfig>,
    /// Unit index across each hex side, side 0 first.
    #[serde(default)]
    pub neighbors: [Option<usize>; HEX_SIDES],
}

/// Boundary condition used to size the unit flow.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowSpec {
    /// Mass flow rate [kg/s]; outlet temperature is estimated.
    FlowRate(f64),
    /// Target outlet temperature [K]; mass flow rate is estimated.
    OutletTemp(f64),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuctConfig {
    /// Inner flat-to-flat distance [m].
    pub flat_to_flat: f64,
    /// Wall thickness [m].
    pub thickness: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleConfig {
    /// Pin rings including the central pin.
    pub n_rings: usize,
    pub pin_diameter: f64,
    pub pin_pitch: f64,
    pub clad_thickness: f64,
    pub clad_material: String,
    pub fuel_material: String,
    /// Multiplier on conduction between neighbouring coolant channels.
    #[serde(default = "default_mixing_factor")]
    pub mixing_factor: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionConfig {
    pub name: String,
    pub z_lo: f64,
    pub z_hi: f64,
    pub model: RegionModel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RegionModel {
    /// Explicit pin bundle with per-channel coolant.
    Rodded,
    /// Lumped porous medium.
    Porous {
        porosity: f64,
        hydraulic_diameter: f64,
    },
}

/// Global sweep options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepOptions {
    /// Fan out per-unit work within each plane.
    #[serde(default)]
    pub parallel: bool,
    /// User-requested step [m]; honoured only if not above the stable step.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub axial_mesh_size: Option<f64>,
    /// Accuracy ceiling on the step [m].
    #[serde(default = "default_max_step")]
    pub max_step: f64,
    /// Observation planes that must appear exactly in the mesh [m].
    #[serde(default)]
    pub axial_planes: Vec<f64>,
    /// Log progress every N steps; 0 disables.
    #[serde(default)]
    pub log_progress: usize,
    /// Allow the relaxed duct coupling for low-flow units.
    #[serde(default)]
    pub stabilization: bool,
    #[serde(default = "default_stabilization_cutoff")]
    pub stabilization_cutoff: f64,
    #[serde(default)]
    pub energy_balance: bool,
    /// Coolant outlet estimate above which a melt-risk warning is logged [K].
    #[serde(default = "default_melt_limit")]
    pub melt_limit: f64,
    /// Log a one-line summary for every plane.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for SweepOptions {
    fn default() -> Self {
        SweepOptions {
            parallel: false,
            axial_mesh_size: None,
            max_step: default_max_step(),
            axial_planes: Vec::new(),
            log_progress: 0,
            stabilization: false,
            stabilization_cutoff: default_stabilization_cutoff(),
            energy_balance: false,
            melt_limit: default_melt_limit(),
            verbose: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DumpConfig {
    #[serde(default)]
    pub cadence: DumpCadence,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DumpCadence {
    #[default]
    Never,
    EveryStep,
    /// Every `x` metres of axial travel, plus declared planes.
    Interval(f64),
    ObservationPlanes,
}

/// Normalization applied to tabulated power before the sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PowerNormalization {
    /// Requested core total power [W]; keep calculated power when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_power: Option<f64>,
    #[serde(default = "default_scaling_factor")]
    pub scaling_factor: f64,
}

impl Default for PowerNormalization {
    fn default() -> Self {
        PowerNormalization {
            total_power: None,
            scaling_factor: default_scaling_factor(),
        }
    }
}

/// Polynomial property correlations in T [K]: Σ cᵢ·Tⁱ.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialConfig {
    pub density: Vec<f64>,
    pub heat_capacity: Vec<f64>,
    pub thermal_conductivity: Vec<f64>,
    #[serde(default)]
    pub viscosity: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t_min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t_max: Option<f64>,
}

fn default_core_name() -> String {
    "core".to_string()
}
fn default_gap_width() -> f64 {
    0.003
}
fn default_mixing_factor() -> f64 {
    1.0
}
fn default_max_step() -> f64 {
    DEFAULT_MAX_STEP
}
fn default_stabilization_cutoff() -> f64 {
    DEFAULT_STABILIZATION_CUTOFF
}
fn default_melt_limit() -> f64 {
    DEFAULT_MELT_LIMIT
}
fn default_scaling_factor() -> f64 {
    1.0
}

fn positive(value: f64, what: &str) -> SweepResult<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(SweepError::ConfigError(format!(
            "{what} must be finite and > 0, got {value}"
        )));
    }
    Ok(())
}

impl CoreConfig {
    /// Load from a JSON file and validate.
    pub fn from_file(path: impl AsRef<Path>) -> SweepResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn from_json_str(contents: &str) -> SweepResult<Self> {
        let config: Self = serde_json::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn is_adiabatic(&self) -> bool {
        self.gap.model.is_none()
    }

    /// Shape and range checks that need neither materials nor power.
    pub fn validate(&self) -> SweepResult<()> {
        positive(self.inlet_temp, "inlet_temp")?;
        if !(0.0..1.0).contains(&self.bypass_fraction) {
            return Err(SweepError::ConfigError(format!(
                "bypass_fraction must be in [0, 1), got {}",
                self.bypass_fraction
            )));
        }
        if self.gap.model == Some(GapModel::Flow) && self.bypass_fraction <= 0.0 {
            return Err(SweepError::ConfigError(
                "gap model 'flow' requires bypass_fraction > 0".to_string(),
            ));
        }
        positive(self.gap.width, "gap.width")?;
        if let Some(htc) = self.gap.htc {
            positive(htc, "gap.htc")?;
        }
        if let Some(n) = self.gap.perimeter_points {
            if n < 2 {
                return Err(SweepError::ConfigError(format!(
                    "gap.perimeter_points must be >= 2, got {n}"
                )));
            }
        }
        if self.units.is_empty() {
            return Err(SweepError::ConfigError(
                "at least one unit is required".to_string(),
            ));
        }
        for (idx, unit) in self.units.iter().enumerate() {
            self.validate_unit(idx, unit)?;
        }
        self.validate_options()
    }

    fn validate_unit(&self, idx: usize, unit: &UnitConfig) -> SweepResult<()> {
        match unit.flow {
            FlowSpec::FlowRate(m) => positive(m, &format!("unit {idx} flow rate"))?,
            FlowSpec::OutletTemp(t) => {
                positive(t, &format!("unit {idx} outlet temperature"))?;
                if t <= self.inlet_temp {
                    return Err(SweepError::ConfigError(format!(
                        "unit {idx} outlet temperature {t} must exceed inlet {}",
                        self.inlet_temp
                    )));
                }
            }
        }
        positive(unit.duct.flat_to_flat, &format!("unit {idx} duct flat_to_flat"))?;
        positive(unit.duct.thickness, &format!("unit {idx} duct thickness"))?;
        if unit.regions.is_empty() {
            return Err(SweepError::ConfigError(format!(
                "unit {idx} ({}) declares no axial regions",
                unit.name
            )));
        }
        for (side, neighbor) in unit.neighbors.iter().enumerate() {
            let Some(j) = *neighbor else { continue };
            if j >= self.units.len() || j == idx {
                return Err(SweepError::ConfigError(format!(
                    "unit {idx} side {side} names invalid neighbor {j}"
                )));
            }
            let facing = (side + HEX_SIDES / 2) % HEX_SIDES;
            if self.units[j].neighbors[facing] != Some(idx) {
                return Err(SweepError::ConfigError(format!(
                    "neighbor map is not symmetric: unit {idx} side {side} -> {j}, \
                     but unit {j} side {facing} -> {:?}",
                    self.units[j].neighbors[facing]
                )));
            }
        }
        Ok(())
    }

    fn validate_options(&self) -> SweepResult<()> {
        let opt = &self.options;
        positive(opt.max_step, "options.max_step")?;
        positive(opt.stabilization_cutoff, "options.stabilization_cutoff")?;
        positive(opt.melt_limit, "options.melt_limit")?;
        if let Some(dz) = opt.axial_mesh_size {
            positive(dz, "options.axial_mesh_size")?;
            if dz < MIN_AXIAL_STEP {
                return Err(SweepError::ConfigError(format!(
                    "options.axial_mesh_size {dz:e} m is below the {MIN_AXIAL_STEP:e} m minimum"
                )));
            }
        }
        if let Some(z) = opt.axial_planes.iter().find(|z| !z.is_finite() || **z < 0.0) {
            return Err(SweepError::ConfigError(format!(
                "axial plane {z} must be finite and >= 0"
            )));
        }
        if let DumpCadence::Interval(dx) = self.dump.cadence {
            positive(dx, "dump interval")?;
        }
        if let Some(total) = self.power.total_power {
            positive(total, "power.total_power")?;
        }
        positive(self.power.scaling_factor, "power.scaling_factor")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"{
        "inlet_temp": 623.15,
        "coolant_material": "sodium",
        "units": [
            {
                "name": "fuel",
                "flow": {"flow_rate": 25.0},
                "duct_material": "ht9",
                "duct": {"flat_to_flat": 0.111, "thickness": 0.0039},
                "bundle": {
                    "n_rings": 9,
                    "pin_diameter": 0.008,
                    "pin_pitch": 0.0091,
                    "clad_thickness": 0.0005,
                    "clad_material": "ht9",
                    "fuel_material": "uzr"
                },
                "regions": [
                    {"name": "lower", "z_lo": 0.0, "z_hi": 1.0,
                     "model": {"type": "porous", "porosity": 0.3, "hydraulic_diameter": 0.002}},
                    {"name": "rods", "z_lo": 1.0, "z_hi": 2.5, "model": {"type": "rodded"}},
                    {"name": "upper", "z_lo": 2.5, "z_hi": 3.5,
                     "model": {"type": "porous", "porosity": 0.3, "hydraulic_diameter": 0.002}}
                ]
            }
        ]
    }"#;

    #[test]
    fn test_minimal_config_defaults() {
        let cfg = CoreConfig::from_json_str(MINIMAL).unwrap();
        assert_eq!(cfg.name, "core");
        assert!(cfg.is_adiabatic());
        assert!(!cfg.options.parallel);
        assert!((cfg.options.max_step - 0.01).abs() < 1e-15);
        assert!((cfg.options.stabilization_cutoff - 0.001).abs() < 1e-15);
        assert!((cfg.options.melt_limit - 1500.0).abs() < 1e-12);
        assert_eq!(cfg.dump.cadence, DumpCadence::Never);
        assert_eq!(cfg.units[0].regions.len(), 3);
        assert_eq!(cfg.units[0].regions[1].model, RegionModel::Rodded);
        assert_eq!(cfg.units[0].neighbors, [None; HEX_SIDES]);
        assert_eq!(cfg.units[0].bundle.as_ref().unwrap().mixing_factor, 1.0);
    }

    #[test]
    fn test_roundtrip_serialization() {
        let cfg = CoreConfig::from_json_str(MINIMAL).unwrap();
        let json = serde_json::to_string_pretty(&cfg).unwrap();
        let cfg2 = CoreConfig::from_json_str(&json).unwrap();
        assert_eq!(cfg.units.len(), cfg2.units.len());
        assert_eq!(cfg.units[0].flow, cfg2.units[0].flow);
        assert_eq!(cfg.units[0].regions[0].model, cfg2.units[0].regions[0].model);
    }

    #[test]
    fn test_flow_gap_requires_bypass() {
        let mut cfg = CoreConfig::from_json_str(MINIMAL).unwrap();
        cfg.gap.model = Some(GapModel::Flow);
        assert!(cfg.validate().is_err());
        cfg.bypass_fraction = 0.05;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_outlet_below_inlet_rejected() {
        let mut cfg = CoreConfig::from_json_str(MINIMAL).unwrap();
        cfg.units[0].flow = FlowSpec::OutletTemp(600.0);
        let err = cfg.validate().expect_err("outlet below inlet must fail");
        assert!(err.to_string().contains("must exceed inlet"));
    }

    #[test]
    fn test_asymmetric_neighbors_rejected() {
        let mut cfg = CoreConfig::from_json_str(MINIMAL).unwrap();
        let mut second = cfg.units[0].clone();
        second.name = "second".into();
        cfg.units.push(second);
        cfg.units[0].neighbors[1] = Some(1);
        assert!(cfg.validate().is_err());
        cfg.units[1].neighbors[4] = Some(0);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_negative_plane_and_bad_interval_rejected() {
        let mut cfg = CoreConfig::from_json_str(MINIMAL).unwrap();
        cfg.options.axial_planes = vec![0.5, -0.1];
        assert!(cfg.validate().is_err());
        cfg.options.axial_planes = vec![0.5];
        cfg.dump.cadence = DumpCadence::Interval(0.0);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_sub_micrometre_mesh_size_rejected() {
        let mut cfg = CoreConfig::from_json_str(MINIMAL).unwrap();
        cfg.options.axial_mesh_size = Some(1e-13);
        let err = cfg.validate().expect_err("1e-13 m step must be rejected");
        assert!(err.to_string().contains("axial_mesh_size"));
        cfg.options.axial_mesh_size = Some(MIN_AXIAL_STEP);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = CoreConfig::from_file("/nonexistent/ductsweep.json").unwrap_err();
        assert!(matches!(err, SweepError::Io(_)));
    }
}
