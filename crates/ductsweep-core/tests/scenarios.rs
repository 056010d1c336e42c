// ─────────────────────────────────────────────────────────────────────
// DuctSweep — Sweep Scenarios
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! End-to-end sweeps over small cores.
//!
//! Covers: isothermal march, adiabatic gap invariance, serial/parallel
//! determinism, step-size overrides, observation planes, fail-fast unit
//! errors, sink errors, reset and rerun, final-state persistence, power
//! normalization, energy balance.

use ductsweep_core::axial_mesh::choose_step_size;
use ductsweep_core::geometry::PerimeterMesh;
use ductsweep_core::power::{AxialPowerTable, ComponentPower, PowerProvider, TabulatedPower};
use ductsweep_core::reactor::Core;
use ductsweep_core::reconcile::reconcile;
use ductsweep_core::sink::{MemoryRecorder, NullSink, OutputSink};
use ductsweep_core::sweep::{SweepDriver, SweepState};
use ductsweep_types::config::CoreConfig;
use ductsweep_types::error::{SweepError, SweepResult};
use ductsweep_types::state::CoreSnapshot;
use ndarray::Array1;
use std::sync::Arc;

const FUEL: &str = r#"{
    "name": "fuel",
    "flow": { "flow_rate": 5.0 },
    "duct_material": "ht9",
    "duct": { "flat_to_flat": 0.06, "thickness": 0.003 },
    "bundle": {
        "n_rings": 4, "pin_diameter": 0.008, "pin_pitch": 0.0095,
        "clad_thickness": 0.0005, "clad_material": "ht9", "fuel_material": "uzr"
    },
    "regions": [
        { "name": "inlet", "z_lo": 0.0, "z_hi": 0.4,
          "model": { "type": "porous", "porosity": 0.3, "hydraulic_diameter": 0.002 } },
        { "name": "rods", "z_lo": 0.4, "z_hi": 1.6, "model": { "type": "rodded" } },
        { "name": "outlet", "z_lo": 1.6, "z_hi": 2.0,
          "model": { "type": "porous", "porosity": 0.3, "hydraulic_diameter": 0.002 } }
    ],
    "neighbors": [NB0]
}"#;

const REFLECTOR: &str = r#"{
    "name": "reflector",
    "flow": { "flow_rate": 1.0 },
    "duct_material": "ht9",
    "duct": { "flat_to_flat": 0.06, "thickness": 0.003 },
    "regions": [
        { "name": "body", "z_lo": 0.0, "z_hi": 2.0,
          "model": { "type": "porous", "porosity": 0.5, "hydraulic_diameter": 0.004 } }
    ],
    "neighbors": [null, null, null, 0, null, null]
}"#;

/// Fuel unit alone, or fuel plus a reflector across its side 0.
fn core_config(two_units: bool, gap: &str, options: &str, dump: &str) -> CoreConfig {
    let units = if two_units {
        format!(
            "{}, {}",
            FUEL.replace("NB0", "1, null, null, null, null, null"),
            REFLECTOR
        )
    } else {
        FUEL.replace("NB0", "null, null, null, null, null, null")
    };
    let json = format!(
        r#"{{
            "name": "test-core",
            "inlet_temp": 600.0,
            "coolant_material": "sodium",
            "bypass_fraction": 0.1,
            "gap": {gap},
            "units": [{units}],
            "options": {options},
            "dump": {{ "cadence": {dump} }}
        }}"#
    );
    CoreConfig::from_json_str(&json).unwrap()
}

fn heated_power(n_units: usize) -> Arc<dyn PowerProvider> {
    let fuel = AxialPowerTable::new(
        vec![0.0, 0.4, 1.6, 2.0],
        vec![0.0, 1.5e5, 0.0],
        vec![0.0, 2.0e3, 0.0],
        vec![200.0, 1.0e3, 200.0],
    )
    .unwrap();
    let mut tables = vec![fuel];
    if n_units > 1 {
        tables.push(
            AxialPowerTable::uniform(
                2.0,
                ComponentPower {
                    pins: 0.0,
                    coolant: 500.0,
                    duct: 300.0,
                },
            )
            .unwrap(),
        );
    }
    Arc::new(TabulatedPower::new(tables).unwrap())
}

fn run(config: CoreConfig, power: Arc<dyn PowerProvider>) -> (SweepDriver, MemoryRecorder) {
    let core = Core::from_config(config, power).unwrap();
    let mut driver = SweepDriver::new(core);
    let mut recorder = MemoryRecorder::new();
    driver.run(&mut recorder).unwrap();
    (driver, recorder)
}

fn all_temperatures(s: &CoreSnapshot) -> Vec<f64> {
    let mut out = Vec::new();
    for u in &s.units {
        out.extend(&u.coolant);
        out.extend(&u.duct_mw);
        out.extend(&u.duct_outer);
        out.extend(u.pins.iter().flatten());
    }
    out.extend(s.gap.iter().flatten());
    out
}

/// Unit 1 returns NaN linear power above `z_bad`.
struct PoisonedPower {
    inner: Arc<dyn PowerProvider>,
    z_bad: f64,
}

impl PowerProvider for PoisonedPower {
    fn unit_count(&self) -> usize {
        self.inner.unit_count()
    }

    fn linear_power(&self, unit: usize, z: f64) -> ComponentPower {
        if unit == 1 && z > self.z_bad {
            ComponentPower {
                pins: 0.0,
                coolant: f64::NAN,
                duct: 0.0,
            }
        } else {
            self.inner.linear_power(unit, z)
        }
    }

    fn axial_bounds(&self, unit: usize) -> Vec<f64> {
        self.inner.axial_bounds(unit)
    }

    fn unit_power(&self, unit: usize) -> f64 {
        self.inner.unit_power(unit)
    }
}

// ── Core Behaviour ───────────────────────────────────────────────────

#[test]
fn test_unpowered_core_stays_isothermal() {
    let cfg = core_config(
        false,
        r#"{ "model": "flow" }"#,
        r#"{ "max_step": 0.05 }"#,
        r#""every_step""#,
    );
    let power: Arc<dyn PowerProvider> = Arc::new(TabulatedPower::zero(1, 2.0).unwrap());
    let (driver, recorder) = run(cfg, power);
    assert_eq!(driver.state(), &SweepState::Completed);
    assert_eq!(recorder.snapshots.len(), driver.core().axial_mesh().len());
    for snap in &recorder.snapshots {
        assert!(!snap.gap.is_empty());
        for t in all_temperatures(snap) {
            assert!((t - 600.0).abs() < 1e-9, "plane {}: T = {t}", snap.step);
        }
    }
}

#[test]
fn test_adiabatic_gap_is_bit_invariant() {
    let cfg = core_config(true, "{}", r#"{ "max_step": 0.05 }"#, r#""every_step""#);
    let (driver, recorder) = run(cfg, heated_power(2));
    assert!(driver
        .core()
        .gap()
        .temperatures()
        .iter()
        .all(|&t| t.to_bits() == 600f64.to_bits()));
    assert!(recorder.snapshots.iter().all(|s| s.gap.is_empty()));
    // The units still heat up on their own.
    let report = driver.report();
    assert!(report.unit_outlet[0] > 600.0);
    assert!(report.max_coolant > 600.0);
}

#[test]
fn test_serial_and_parallel_agree() {
    let serial = core_config(
        true,
        r#"{ "model": "flow" }"#,
        r#"{ "max_step": 0.05, "parallel": false }"#,
        r#""never""#,
    );
    let parallel = core_config(
        true,
        r#"{ "model": "flow" }"#,
        r#"{ "max_step": 0.05, "parallel": true }"#,
        r#""never""#,
    );
    let (_, a) = run(serial, heated_power(2));
    let (_, b) = run(parallel, heated_power(2));
    let a = a.final_state.unwrap();
    let b = b.final_state.unwrap();
    assert_eq!(a, b);
    assert_eq!(a.gap.len(), 2);
}

// ── Step Size and Planes ─────────────────────────────────────────────

#[test]
fn test_step_override_accepted_when_smaller() {
    let d = choose_step_size(0.02, Some(0.01), 0.01).unwrap();
    assert!(d.override_accepted);
    assert_eq!(d.chosen, 0.01);
}

#[test]
fn test_step_override_ignored_when_larger() {
    let d = choose_step_size(0.005, Some(0.01), 0.01).unwrap();
    assert!(!d.override_accepted);
    assert_eq!(d.chosen, 0.005);
}

#[test]
fn test_observation_plane_is_exact_mesh_point() {
    let cfg = core_config(
        false,
        "{}",
        r#"{ "max_step": 0.01, "axial_planes": [1.2345] }"#,
        r#""observation_planes""#,
    );
    let (driver, recorder) = run(cfg, heated_power(1));
    let z = driver.core().axial_mesh().positions();
    assert!(z.contains(&1.2345));
    assert!(z.windows(2).all(|w| w[1] > w[0]));
    assert_eq!(recorder.planes(), vec![1.2345]);
    let final_state = recorder.final_state.as_ref().unwrap();
    assert_eq!(final_state.z, 2.0);
    assert_eq!(final_state.step, driver.core().axial_mesh().len());
}

#[test]
fn test_interval_dumps_include_region_planes() {
    let cfg = core_config(false, "{}", r#"{ "max_step": 0.05 }"#, r#"{ "interval": 0.5 }"#);
    let (driver, recorder) = run(cfg, heated_power(1));
    let planes = recorder.planes();
    for z in [0.4, 1.6, 2.0] {
        assert!(planes.contains(&z), "missing dump at {z}: {planes:?}");
    }
    let dz = driver.core().step_size().chosen;
    assert!(planes[0] <= 0.5 + dz);
    assert!(planes.windows(2).all(|w| w[1] > w[0] && w[1] - w[0] <= 0.5 + dz + 1e-9));
}

#[test]
fn test_corner_only_meshes_pass_corners_through() {
    let corners = PerimeterMesh::corners_only();
    let values = Array1::from_iter((0..6).map(|i| 600.0 + 10.0 * i as f64));
    let same = reconcile(&corners, values.view(), &corners, None).unwrap();
    assert_eq!(same, values);

    let fine = PerimeterMesh::uniform(4).unwrap();
    let up = reconcile(&corners, values.view(), &fine, None).unwrap();
    let back = reconcile(&fine, up.view(), &corners, None).unwrap();
    assert_eq!(back, values);
}

// ── Driver and Output ────────────────────────────────────────────────

#[test]
fn test_unit_failure_aborts_sweep() {
    for parallel in [false, true] {
        let cfg = core_config(
            true,
            r#"{ "model": "flow" }"#,
            &format!(r#"{{ "max_step": 0.05, "parallel": {parallel} }}"#),
            r#""every_step""#,
        );
        let power = Arc::new(PoisonedPower {
            inner: heated_power(2),
            z_bad: 1.0,
        });
        let core = Core::from_config(cfg, power).unwrap();
        let mut driver = SweepDriver::new(core);
        let mut recorder = MemoryRecorder::new();
        let err = driver
            .run(&mut recorder)
            .expect_err("NaN power must abort the sweep");
        assert_eq!(err.unit(), Some(1), "parallel={parallel}: {err}");
        assert!(matches!(err, SweepError::WorkerFailed { .. }));

        let failed_plane = match driver.state() {
            SweepState::Failed {
                plane,
                reason,
                applied,
            } => {
                assert!(reason.contains("unit 1"));
                assert!(!applied);
                *plane
            }
            other => panic!("Unexpected state: {other:?}"),
        };
        // The core still holds the last completed plane.
        let last = recorder.snapshots.last().unwrap();
        assert_eq!(last.step, failed_plane - 1);
        assert_eq!(driver.core().snapshot(last.step, last.z), *last);
        assert!(recorder.final_state.is_none());
        assert_eq!(driver.report().steps, failed_plane - 1);

        match driver.step(&mut NullSink) {
            Err(SweepError::InvalidState(_)) => {}
            other => panic!("Unexpected result: {other:?}"),
        }
    }
}

/// Accepts snapshots until `fail_at`, then reports a write error.
struct FailingSink {
    inner: MemoryRecorder,
    fail_at: usize,
}

impl OutputSink for FailingSink {
    fn record(&mut self, snapshot: &CoreSnapshot) -> SweepResult<()> {
        if snapshot.step == self.fail_at {
            return Err(SweepError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "disk full",
            )));
        }
        self.inner.record(snapshot)
    }
}

#[test]
fn test_sink_failure_keeps_applied_plane() {
    let cfg = || {
        core_config(
            true,
            r#"{ "model": "flow" }"#,
            r#"{ "max_step": 0.05 }"#,
            r#""every_step""#,
        )
    };
    let (_, reference) = run(cfg(), heated_power(2));

    let core = Core::from_config(cfg(), heated_power(2)).unwrap();
    let mut driver = SweepDriver::new(core);
    let mut sink = FailingSink {
        inner: MemoryRecorder::new(),
        fail_at: 3,
    };
    let err = driver.run(&mut sink).expect_err("sink error must stop the sweep");
    assert!(matches!(err, SweepError::Io(_)));
    match driver.state() {
        SweepState::Failed { plane, applied, .. } => {
            assert_eq!(*plane, 3);
            assert!(*applied);
        }
        other => panic!("Unexpected state: {other:?}"),
    }
    assert_eq!(sink.inner.snapshots.len(), 2);
    assert_eq!(driver.report().steps, 3);

    // The core holds plane 3 even though it was never recorded.
    let expected = &reference.snapshots[2];
    assert_eq!(expected.step, 3);
    assert_eq!(driver.core().snapshot(3, expected.z), *expected);
}

#[test]
fn test_reset_reruns_identically() {
    let cfg = core_config(true, r#"{ "model": "no_flow" }"#, r#"{ "max_step": 0.05 }"#, r#""never""#);
    let (mut driver, first) = run(cfg, heated_power(2));
    assert!(matches!(
        driver.step(&mut NullSink),
        Err(SweepError::InvalidState(_))
    ));
    driver.reset();
    assert_eq!(driver.state(), &SweepState::NotStarted);
    let mut second = MemoryRecorder::new();
    driver.run(&mut second).unwrap();
    assert_eq!(first.final_state, second.final_state);
}

#[test]
fn test_final_state_written_as_json() {
    let cfg = core_config(true, r#"{ "model": "flow" }"#, r#"{ "max_step": 0.05 }"#, r#""never""#);
    let (_, recorder) = run(cfg, heated_power(2));
    let final_state = recorder.final_state.unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("final_state.json");
    final_state.write_json(&path).unwrap();
    let contents = std::fs::read_to_string(&path).unwrap();
    let restored = CoreSnapshot::from_json_str(&contents).unwrap();
    assert_eq!(restored.units.len(), 2);
    assert_eq!(restored.units[0].name, "fuel");
    assert_eq!(restored.gap.len(), 2);
    assert_eq!(restored, final_state);
}

#[test]
fn test_energy_balance_closes() {
    let cfg = core_config(
        false,
        "{}",
        r#"{ "max_step": 0.05, "energy_balance": true }"#,
        r#""never""#,
    );
    let (driver, _) = run(cfg, heated_power(1));
    let report = driver.report();
    assert_eq!(report.energy.len(), 1);
    let tally = report.energy[0].tally;
    assert!((tally.power_added - 1.8376e5).abs() < 1.0, "Q = {}", tally.power_added);
    assert!(
        tally.relative_residual().abs() < 1e-6,
        "residual {}",
        tally.relative_residual()
    );
}
