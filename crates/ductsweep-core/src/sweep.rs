// ─────────────────────────────────────────────────────────────────────
// DuctSweep — Sweep Driver
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Axial march over the planned mesh.
//!
//! ```text
//! NotStarted ──step──▶ Stepping{plane} ──last plane──▶ Completed
//!                            │
//!                            └──error──▶ Failed{plane, reason, applied}
//! ```
//!
//! Planes are strictly sequential. A plane whose update fails is never
//! applied, so the core keeps the state of the last completed plane. A sink
//! that fails after the update leaves the plane applied; `applied` tells
//! the two apart.

use crate::reactor::Core;
use crate::sink::{DumpSchedule, OutputSink};
use crate::unit::Unit;
use ductsweep_types::error::{SweepError, SweepResult};
use ductsweep_types::state::EnergyTally;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq)]
pub enum SweepState {
    NotStarted,
    /// `plane` is the last completed plane (0 = inlet).
    Stepping { plane: usize },
    Completed,
    /// `plane` is the plane being processed when the sweep stopped.
    /// `applied` is true when the core had already committed it.
    Failed {
        plane: usize,
        reason: String,
        applied: bool,
    },
}

impl SweepState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SweepState::Completed | SweepState::Failed { .. })
    }
}

/// Energy accounting of one unit over the whole sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitBalance {
    pub id: usize,
    pub name: String,
    pub tally: EnergyTally,
}

#[derive(Debug, Clone)]
pub struct SweepReport {
    pub steps: usize,
    pub core_length: f64,
    pub elapsed: Duration,
    /// Mass-flow weighted outlet temperature per unit [K].
    pub unit_outlet: Vec<f64>,
    pub max_coolant: f64,
    /// Units running the relaxed duct coupling.
    pub stabilized: Vec<usize>,
    /// Empty unless energy-balance tracking is on.
    pub energy: Vec<UnitBalance>,
}

/// `HH:MM:SS.ss`
pub fn format_elapsed(elapsed: Duration) -> String {
    let total = elapsed.as_secs_f64();
    let hours = (total / 3600.0).floor();
    let minutes = ((total - 3600.0 * hours) / 60.0).floor();
    let seconds = total - 3600.0 * hours - 60.0 * minutes;
    format!("{:02}:{:02}:{:05.2}", hours as u64, minutes as u64, seconds)
}

pub struct SweepDriver {
    core: Core,
    state: SweepState,
    schedule: DumpSchedule,
    started: Option<Instant>,
    elapsed: Duration,
}

impl SweepDriver {
    pub fn new(core: Core) -> Self {
        let schedule = DumpSchedule::new(core.config().dump.cadence, core.dump_planes());
        SweepDriver {
            core,
            state: SweepState::NotStarted,
            schedule,
            started: None,
            elapsed: Duration::ZERO,
        }
    }

    pub fn state(&self) -> &SweepState {
        &self.state
    }

    pub fn core(&self) -> &Core {
        &self.core
    }

    pub fn into_core(self) -> Core {
        self.core
    }

    /// Wall time spent stepping so far.
    pub fn elapsed(&self) -> Duration {
        self.started.map_or(self.elapsed, |t| t.elapsed())
    }

    /// Advance one plane. Returns `Ok(true)` while planes remain.
    pub fn step(&mut self, sink: &mut dyn OutputSink) -> SweepResult<bool> {
        let last = match &self.state {
            SweepState::NotStarted => {
                log::info!(
                    "Starting sweep of '{}': {} planes over {} m",
                    self.core.config().name,
                    self.core.axial_mesh().len(),
                    self.core.axial_mesh().core_length()
                );
                self.started = Some(Instant::now());
                0
            }
            SweepState::Stepping { plane } => *plane,
            SweepState::Completed | SweepState::Failed { .. } => {
                return Err(SweepError::InvalidState(format!(
                    "cannot step a finished sweep ({:?})",
                    self.state
                )))
            }
        };
        let plane = last + 1;
        let n_planes = self.core.axial_mesh().len();
        let Some((z, dz)) = self.core.axial_mesh().step(plane) else {
            return Err(SweepError::InvalidState(format!(
                "plane {plane} is outside the axial mesh of {n_planes} planes"
            )));
        };

        let energies = match self.core.advance(z, dz) {
            Ok(e) => e,
            Err(e) => return Err(self.fail(plane, z, false, e)),
        };
        self.state = SweepState::Stepping { plane };
        self.log_plane(plane, n_planes, z, dz, &energies);

        if self.schedule.should_dump(z, dz) {
            let snapshot = self.core.snapshot(plane, z);
            if let Err(e) = sink.record(&snapshot) {
                return Err(self.fail(plane, z, true, e));
            }
        }

        if plane == n_planes {
            self.elapsed = self.elapsed();
            self.started = None;
            let snapshot = self.core.snapshot(plane, z);
            if let Err(e) = sink.finish(&snapshot) {
                return Err(self.fail(plane, z, true, e));
            }
            self.state = SweepState::Completed;
            log::info!(
                "Sweep completed: {n_planes} planes in {}",
                format_elapsed(self.elapsed)
            );
            return Ok(false);
        }
        Ok(true)
    }

    /// March every remaining plane.
    pub fn run(&mut self, sink: &mut dyn OutputSink) -> SweepResult<SweepReport> {
        while self.step(sink)? {}
        Ok(self.report())
    }

    /// Return the core to the inlet condition so the sweep can run again.
    pub fn reset(&mut self) {
        self.core.reset();
        self.schedule.reset();
        self.state = SweepState::NotStarted;
        self.started = None;
        self.elapsed = Duration::ZERO;
    }

    pub fn report(&self) -> SweepReport {
        let units = self.core.units();
        let track = self.core.config().options.energy_balance;
        let energy: Vec<UnitBalance> = if track {
            units
                .iter()
                .map(|u| UnitBalance {
                    id: u.id(),
                    name: u.name().to_string(),
                    tally: *u.tally(),
                })
                .collect()
        } else {
            Vec::new()
        };
        for b in &energy {
            log::info!(
                "Unit {} ({}): energy residual {:.3e} W ({:.3e} of power added)",
                b.id,
                b.name,
                b.tally.residual(),
                b.tally.relative_residual()
            );
        }
        let steps = match self.state {
            SweepState::Completed => self.core.axial_mesh().len(),
            SweepState::Stepping { plane } => plane,
            SweepState::Failed { plane, applied, .. } => {
                if applied {
                    plane
                } else {
                    plane - 1
                }
            }
            SweepState::NotStarted => 0,
        };
        SweepReport {
            steps,
            core_length: self.core.axial_mesh().core_length(),
            elapsed: self.elapsed(),
            unit_outlet: units.iter().map(Unit::bulk_coolant).collect(),
            max_coolant: units
                .iter()
                .flat_map(|u| u.state().coolant.iter().copied())
                .fold(f64::NEG_INFINITY, f64::max),
            stabilized: units
                .iter()
                .filter(|u| u.is_stabilized())
                .map(Unit::id)
                .collect(),
            energy,
        }
    }

    fn fail(&mut self, plane: usize, z: f64, applied: bool, err: SweepError) -> SweepError {
        log::error!("Sweep failed at plane {plane} (z = {z:.4} m): {err}");
        self.elapsed = self.elapsed();
        self.started = None;
        self.state = SweepState::Failed {
            plane,
            reason: err.to_string(),
            applied,
        };
        err
    }

    fn log_plane(&self, plane: usize, n_planes: usize, z: f64, dz: f64, energies: &[EnergyTally]) {
        let every = self.core.config().options.log_progress;
        if every > 0 && plane % every == 0 {
            log::info!(
                "Progress: plane {plane} of {n_planes}; z = {z:.2} m; cumulative sweep time = {}",
                format_elapsed(self.elapsed())
            );
        }
        if self.core.config().options.verbose {
            let per_unit: Vec<String> = self
                .core
                .units()
                .iter()
                .zip(energies)
                .map(|(u, e)| format!("{}: {:.3e} W, {:.2} K", u.name(), e.power_added, u.bulk_coolant()))
                .collect();
            log::debug!(
                "z = {z:.4} m, dz = {dz:.3e} m | {} | gap {:.2} K",
                per_unit.join("; "),
                self.core.gap().mean()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(Duration::from_millis(3_723_450)), "01:02:03.45");
        assert_eq!(format_elapsed(Duration::ZERO), "00:00:00.00");
    }

    #[test]
    fn test_terminal_states() {
        assert!(SweepState::Completed.is_terminal());
        assert!(SweepState::Failed {
            plane: 3,
            reason: "x".into(),
            applied: false,
        }
        .is_terminal());
        assert!(!SweepState::Stepping { plane: 1 }.is_terminal());
        assert!(!SweepState::NotStarted.is_terminal());
    }
}
