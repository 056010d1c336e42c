// ─────────────────────────────────────────────────────────────────────
// DuctSweep — Axial Mesh
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Axial step sizing and plane placement.
//!
//! The step is the smaller of the stability requirement and the accuracy
//! ceiling, or a user override when that override does not exceed the
//! requirement. Planes are then laid out from the inlet, truncating any
//! step that would cross a mandatory boundary so the boundary itself
//! becomes a plane.

use ductsweep_math::rounding::{floor_to, round_to, unique_rounded};
use ductsweep_types::constants::{
    AXIAL_ROUND_DIGITS, MAX_PLANES_WARNING, MIN_AXIAL_STEP, SMALL_STEP_WARNING,
    STEP_FLOOR_DIGITS,
};
use ductsweep_types::error::{SweepError, SweepResult};

/// Outcome of the step-size policy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepSizeDecision {
    /// Stability requirement rounded down to a micrometre [m].
    pub required: f64,
    /// Step used to lay out the planes [m].
    pub chosen: f64,
    pub user: Option<f64>,
    pub override_accepted: bool,
}

/// Pick the axial step from the raw stability requirement.
pub fn choose_step_size(
    raw_required: f64,
    user: Option<f64>,
    ceiling: f64,
) -> SweepResult<StepSizeDecision> {
    if !(ceiling > 0.0) {
        return Err(SweepError::ConfigError(format!(
            "maximum axial step must be positive, got {ceiling}"
        )));
    }
    // An unconstrained core is limited by accuracy alone.
    let required = if raw_required.is_finite() {
        floor_to(raw_required, STEP_FLOOR_DIGITS)
    } else {
        ceiling
    };
    if !(required > 0.0) {
        return Err(SweepError::PhysicsViolation(format!(
            "required axial step {raw_required:e} m rounds to zero"
        )));
    }

    if let Some(u) = user {
        if !u.is_finite() || u < MIN_AXIAL_STEP {
            return Err(SweepError::ConfigError(format!(
                "requested axial step {u:e} m is below the {MIN_AXIAL_STEP:e} m minimum"
            )));
        }
    }

    let decision = match user {
        Some(u) if u <= required => {
            log::info!("Using user-requested axial step {u} m (required: {required} m)");
            StepSizeDecision {
                required,
                chosen: u,
                user,
                override_accepted: true,
            }
        }
        _ => {
            let chosen = required.min(ceiling);
            if let Some(u) = user {
                log::warn!(
                    "Ignoring user-requested axial step {u} m; \
                     stability requires {required} m or less. Using {chosen} m"
                );
            }
            StepSizeDecision {
                required,
                chosen,
                user,
                override_accepted: false,
            }
        }
    };
    log::info!(
        "Axial step: required {} m, chosen {} m",
        decision.required,
        decision.chosen
    );
    if decision.chosen < SMALL_STEP_WARNING {
        log::warn!(
            "Axial step {} m is below {} m; the sweep may take a long time",
            decision.chosen,
            SMALL_STEP_WARNING
        );
    }
    Ok(decision)
}

/// Ordered axial planes from the inlet to the core outlet.
#[derive(Debug, Clone, PartialEq)]
pub struct AxialMesh {
    positions: Vec<f64>,
}

impl AxialMesh {
    /// Lay out planes `step` apart, landing exactly on every boundary.
    ///
    /// `boundaries` must contain the core outlet; its largest value is the
    /// core length. Non-positive boundaries are ignored.
    pub fn plan(step: f64, boundaries: &[f64]) -> SweepResult<Self> {
        if !(step >= MIN_AXIAL_STEP) || !step.is_finite() {
            return Err(SweepError::ConfigError(format!(
                "axial step must be finite and at least {MIN_AXIAL_STEP:e} m, got {step:e}"
            )));
        }
        if boundaries.iter().any(|b| !b.is_finite()) {
            return Err(SweepError::ConfigError(
                "axial boundaries must be finite".to_string(),
            ));
        }
        let bounds: Vec<f64> = unique_rounded(boundaries.iter().copied(), AXIAL_ROUND_DIGITS)
            .into_iter()
            .filter(|&b| b > 0.0)
            .collect();
        let Some(&length) = bounds.last() else {
            return Err(SweepError::ConfigError(
                "core length must be positive".to_string(),
            ));
        };

        let mut positions = vec![0.0];
        let mut z = 0.0;
        let mut next_bound = 0;
        while z < length {
            while bounds[next_bound] <= z {
                next_bound += 1;
            }
            let proposed = round_to(z + step, AXIAL_ROUND_DIGITS);
            if proposed <= z {
                return Err(SweepError::ConfigError(format!(
                    "axial step {step:e} m does not advance past z = {z} m"
                )));
            }
            z = proposed.min(bounds[next_bound]);
            positions.push(z);
        }

        let n_steps = positions.len() - 1;
        if n_steps > MAX_PLANES_WARNING {
            log::warn!(
                "Axial mesh has {n_steps} steps (more than {MAX_PLANES_WARNING}); \
                 the sweep may take a long time"
            );
        }
        log::info!("Axial mesh: {n_steps} steps over {length} m");
        Ok(AxialMesh { positions })
    }

    /// Plane positions, inlet first.
    pub fn positions(&self) -> &[f64] {
        &self.positions
    }

    /// Number of steps (planes after the inlet).
    pub fn len(&self) -> usize {
        self.positions.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn core_length(&self) -> f64 {
        self.positions[self.positions.len() - 1]
    }

    /// `(step index, z, dz)` for every step, 1-based.
    pub fn steps(&self) -> impl Iterator<Item = (usize, f64, f64)> + '_ {
        self.positions
            .windows(2)
            .enumerate()
            .map(|(i, w)| (i + 1, w[1], w[1] - w[0]))
    }

    /// `(z, dz)` of step `index` (1-based).
    pub fn step(&self, index: usize) -> Option<(f64, f64)> {
        if index == 0 || index >= self.positions.len() {
            return None;
        }
        let z = self.positions[index];
        Some((z, z - self.positions[index - 1]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_override_smaller_than_required_is_used() {
        let d = choose_step_size(0.02, Some(0.01), 0.01).unwrap();
        assert!(d.override_accepted);
        assert_eq!(d.chosen, 0.01);
        // An accepted override replaces the ceiling policy.
        let d = choose_step_size(0.02, Some(0.015), 0.01).unwrap();
        assert_eq!(d.chosen, 0.015);
    }

    #[test]
    fn test_override_larger_than_required_is_ignored() {
        let d = choose_step_size(0.005, Some(0.01), 0.01).unwrap();
        assert!(!d.override_accepted);
        assert_eq!(d.chosen, 0.005);
        let d = choose_step_size(0.05, Some(0.1), 0.01).unwrap();
        assert_eq!(d.chosen, 0.01);
    }

    #[test]
    fn test_required_rounded_down_to_micrometre() {
        let d = choose_step_size(0.012_345_678, None, 0.1).unwrap();
        assert_eq!(d.required, 0.012345);
        assert_eq!(d.chosen, 0.012345);
    }

    #[test]
    fn test_unconstrained_uses_ceiling() {
        let d = choose_step_size(f64::INFINITY, None, 0.01).unwrap();
        assert_eq!(d.chosen, 0.01);
    }

    #[test]
    fn test_vanishing_requirement_fails() {
        let err = choose_step_size(1e-9, None, 0.01).expect_err("sub-micrometre step must fail");
        match err {
            SweepError::PhysicsViolation(msg) => assert!(msg.contains("rounds to zero")),
            other => panic!("Unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_sub_micrometre_override_rejected() {
        let err = choose_step_size(0.02, Some(1e-13), 0.01)
            .expect_err("override below the rounding grain must fail");
        assert!(matches!(err, SweepError::ConfigError(_)));
        assert!(choose_step_size(0.02, Some(0.0), 0.01).is_err());
        let d = choose_step_size(0.02, Some(MIN_AXIAL_STEP), 0.01).unwrap();
        assert!(d.override_accepted);
    }

    #[test]
    fn test_plan_rejects_step_below_rounding_grain() {
        // 1e-13 vanishes on the 12-digit grid; planning must not spin.
        assert!(AxialMesh::plan(1e-13, &[1.0]).is_err());
        assert!(AxialMesh::plan(5e-7, &[1.0]).is_err());
        let mesh = AxialMesh::plan(MIN_AXIAL_STEP, &[1e-5]).unwrap();
        assert_eq!(mesh.len(), 10);
    }

    #[test]
    fn test_plan_lands_on_boundaries() {
        let mesh = AxialMesh::plan(0.3, &[0.5, 1.0]).unwrap();
        assert_eq!(mesh.positions(), &[0.0, 0.3, 0.5, 0.8, 1.0]);
        assert_eq!(mesh.len(), 4);
        assert_eq!(mesh.core_length(), 1.0);
        let (z, dz) = mesh.step(2).unwrap();
        assert_eq!(z, 0.5);
        assert!((dz - 0.2).abs() < 1e-12);
        assert!(mesh.step(0).is_none());
        assert!(mesh.step(5).is_none());
    }

    #[test]
    fn test_plan_without_drift() {
        let mesh = AxialMesh::plan(0.1, &[1.0]).unwrap();
        assert_eq!(mesh.len(), 10);
        assert_eq!(mesh.positions()[3], 0.3);
        assert_eq!(mesh.core_length(), 1.0);
    }

    #[test]
    fn test_plan_rejects_bad_input() {
        assert!(AxialMesh::plan(0.0, &[1.0]).is_err());
        assert!(AxialMesh::plan(0.1, &[]).is_err());
        assert!(AxialMesh::plan(0.1, &[0.0]).is_err());
        assert!(AxialMesh::plan(0.1, &[f64::NAN, 1.0]).is_err());
    }

    #[test]
    fn test_steps_iterator() {
        let mesh = AxialMesh::plan(0.25, &[1.0]).unwrap();
        let steps: Vec<_> = mesh.steps().collect();
        assert_eq!(steps.len(), 4);
        assert_eq!(steps[0], (1, 0.25, 0.25));
        assert_eq!(steps[3].1, 1.0);
    }
}
