// ─────────────────────────────────────────────────────────────────────
// DuctSweep — Constants
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
/// Number of hexagon sides sharing one perimeter discretization.
pub const HEX_SIDES: usize = 6;

/// Decimal digits kept on axial positions to stop accumulation drift.
pub const AXIAL_ROUND_DIGITS: i32 = 12;

/// Digits used when comparing the dump-interval accumulator.
pub const DUMP_ROUND_DIGITS: i32 = 9;

/// Decimal digits kept when rounding the required step size down [m].
pub const STEP_FLOOR_DIGITS: i32 = 6;

/// Smallest axial step accepted from any source [m]; one grain of
/// `STEP_FLOOR_DIGITS`.
pub const MIN_AXIAL_STEP: f64 = 1.0e-6;

/// Default accuracy ceiling on the axial step [m].
pub const DEFAULT_MAX_STEP: f64 = 0.01;

/// Below this step size [m] a long-runtime warning is logged.
pub const SMALL_STEP_WARNING: f64 = 0.0005;

/// Above this number of axial steps a long-runtime warning is logged.
pub const MAX_PLANES_WARNING: usize = 2500;

/// Default step size [m] under which stabilization is considered.
pub const DEFAULT_STABILIZATION_CUTOFF: f64 = 0.001;

/// Default coolant outlet temperature limit [K] for the melt-risk warning.
pub const DEFAULT_MELT_LIMIT: f64 = 1500.0;

/// Order of the Legendre basis used for perimeter reconciliation.
pub const LEGENDRE_ORDER: usize = 2;

/// Fixed-point iterations for the Q = m·cp·ΔT estimate.
pub const BC_ESTIMATE_ITERS: usize = 8;
