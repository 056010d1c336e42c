//! Output collaborators: where snapshots go, and when.

use ductsweep_math::rounding::round_to;
use ductsweep_types::config::DumpCadence;
use ductsweep_types::constants::{AXIAL_ROUND_DIGITS, DUMP_ROUND_DIGITS};
use ductsweep_types::error::SweepResult;
use ductsweep_types::state::CoreSnapshot;

/// Receiver of core snapshots during and after a sweep.
pub trait OutputSink {
    /// Called at every dump plane.
    fn record(&mut self, snapshot: &CoreSnapshot) -> SweepResult<()>;

    /// Called once with the final state after the last plane.
    fn finish(&mut self, _final_state: &CoreSnapshot) -> SweepResult<()> {
        Ok(())
    }
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl OutputSink for NullSink {
    fn record(&mut self, _snapshot: &CoreSnapshot) -> SweepResult<()> {
        Ok(())
    }
}

/// Keeps every snapshot in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryRecorder {
    pub snapshots: Vec<CoreSnapshot>,
    pub final_state: Option<CoreSnapshot>,
}

impl MemoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Axial positions of the recorded snapshots.
    pub fn planes(&self) -> Vec<f64> {
        self.snapshots.iter().map(|s| s.z).collect()
    }
}

impl OutputSink for MemoryRecorder {
    fn record(&mut self, snapshot: &CoreSnapshot) -> SweepResult<()> {
        self.snapshots.push(snapshot.clone());
        Ok(())
    }

    fn finish(&mut self, final_state: &CoreSnapshot) -> SweepResult<()> {
        self.final_state = Some(final_state.clone());
        Ok(())
    }
}

/// Decides at which planes a snapshot is taken.
#[derive(Debug, Clone)]
pub struct DumpSchedule {
    cadence: DumpCadence,
    planes: Vec<f64>,
    accumulated: f64,
}

impl DumpSchedule {
    /// `planes` are the positions that always dump (already rounded).
    pub fn new(cadence: DumpCadence, planes: &[f64]) -> Self {
        DumpSchedule {
            cadence,
            planes: planes.to_vec(),
            accumulated: 0.0,
        }
    }

    pub fn cadence(&self) -> DumpCadence {
        self.cadence
    }

    fn on_plane(&self, z: f64) -> bool {
        let z = round_to(z, AXIAL_ROUND_DIGITS);
        self.planes.iter().any(|&p| p == z)
    }

    /// Whether the plane reached at `z` after a step of `dz` is dumped.
    ///
    /// In interval mode a declared plane dumps without restarting the
    /// interval count.
    pub fn should_dump(&mut self, z: f64, dz: f64) -> bool {
        match self.cadence {
            DumpCadence::Never => false,
            DumpCadence::EveryStep => true,
            DumpCadence::ObservationPlanes => self.on_plane(z),
            DumpCadence::Interval(interval) => {
                self.accumulated += dz;
                if round_to(self.accumulated, DUMP_ROUND_DIGITS) >= interval {
                    self.accumulated = 0.0;
                    true
                } else {
                    self.on_plane(z)
                }
            }
        }
    }

    pub fn reset(&mut self) {
        self.accumulated = 0.0;
    }
}
