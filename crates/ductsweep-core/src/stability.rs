//! Explicit-march step limits.

use std::fmt;

/// Channel class that sets a step limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LimitingChannel {
    Interior,
    Edge,
    Corner,
    /// Single lumped channel of a porous region.
    Lumped,
    Gap,
    /// No coupling limits the step.
    Unconstrained,
}

impl LimitingChannel {
    /// Channels adjacent to the duct wall.
    pub fn touches_duct(self) -> bool {
        matches!(self, LimitingChannel::Edge | LimitingChannel::Corner)
    }
}

impl fmt::Display for LimitingChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LimitingChannel::Interior => "interior",
            LimitingChannel::Edge => "edge",
            LimitingChannel::Corner => "corner",
            LimitingChannel::Lumped => "lumped",
            LimitingChannel::Gap => "gap",
            LimitingChannel::Unconstrained => "unconstrained",
        };
        f.write_str(s)
    }
}

/// Largest stable explicit step and the channel that sets it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StableStep {
    pub dz: f64,
    pub channel: LimitingChannel,
}

impl StableStep {
    pub fn unconstrained() -> Self {
        StableStep {
            dz: f64::INFINITY,
            channel: LimitingChannel::Unconstrained,
        }
    }

    /// Step limit of one channel: heat capacity rate over total conductance.
    ///
    /// The explicit update stays bounded while `dz · ΣG / (ṁ·cp) ≤ 1`.
    pub fn for_channel(capacity_rate: f64, conductance: f64, channel: LimitingChannel) -> Self {
        if conductance <= 0.0 {
            return Self::unconstrained();
        }
        StableStep {
            dz: capacity_rate / conductance,
            channel,
        }
    }

    pub fn min(self, other: StableStep) -> StableStep {
        if other.dz < self.dz {
            other
        } else {
            self
        }
    }
}

impl Default for StableStep {
    fn default() -> Self {
        Self::unconstrained()
    }
}
