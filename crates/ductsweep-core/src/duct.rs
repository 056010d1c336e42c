//! Duct wall heat balance.
//!
//! The wall is quasi-steady at each plane: its mid-wall temperature
//! balances conduction to the coolant inside, conduction to the gap
//! outside, and heat generated in the wall. Each film is in series with
//! half the wall thickness.

use crate::convection::wall_conductance;
use crate::geometry::{HexDuct, PerimeterMesh};
use ductsweep_types::constants::HEX_SIDES;

/// Heat flow through one wall segment [W/m] and its temperatures [K].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WallExchange {
    pub mid_wall: f64,
    pub outer_surface: f64,
    pub into_coolant: f64,
    pub to_gap: f64,
}

/// Conductances of every wall segment around one unit.
#[derive(Debug, Clone)]
pub struct WallCoupling {
    /// Segment width [m].
    width: Vec<f64>,
    /// Share of duct power owned by each segment.
    share: Vec<f64>,
    /// Coolant side, film plus half wall [W/(m²·K)].
    u_in: Vec<f64>,
    /// Gap side, film plus half wall; zero when adiabatic.
    u_out: f64,
    gap_film: f64,
}

impl WallCoupling {
    /// `film_in` gives the coolant film coefficient per segment.
    pub fn new(
        mesh: &PerimeterMesh,
        duct: &HexDuct,
        k_wall: f64,
        film_in: impl Fn(usize) -> f64,
        gap_film: f64,
    ) -> Self {
        let fractions = mesh.side_fractions();
        let half = 0.5 * duct.thickness;
        let width: Vec<f64> = fractions.iter().map(|f| f * duct.inner_side()).collect();
        let share: Vec<f64> = fractions.iter().map(|f| f / HEX_SIDES as f64).collect();
        let u_in = (0..width.len())
            .map(|k| wall_conductance(film_in(k), half, k_wall))
            .collect();
        WallCoupling {
            width,
            share,
            u_in,
            u_out: wall_conductance(gap_film, half, k_wall),
            gap_film,
        }
    }

    pub fn len(&self) -> usize {
        self.width.len()
    }

    pub fn is_empty(&self) -> bool {
        self.width.is_empty()
    }

    pub fn width(&self, k: usize) -> f64 {
        self.width[k]
    }

    /// Duct power [W/m] deposited in segment `k`.
    pub fn segment_power(&self, k: usize, duct_power: f64) -> f64 {
        duct_power * self.share[k]
    }

    /// Coolant-to-gap conductance of segment `k` through the wall [W/(m·K)].
    pub fn through_conductance(&self, k: usize) -> f64 {
        let (ui, uo) = (self.u_in[k], self.u_out);
        if ui + uo <= 0.0 {
            return 0.0;
        }
        self.width[k] * ui * uo / (ui + uo)
    }

    /// Fraction of wall-generated heat that flows to the coolant.
    pub fn coolant_share(&self, k: usize) -> f64 {
        let (ui, uo) = (self.u_in[k], self.u_out);
        if ui + uo <= 0.0 {
            return 1.0;
        }
        ui / (ui + uo)
    }

    /// Solve segment `k` given coolant and gap temperatures.
    pub fn exchange(&self, k: usize, t_coolant: f64, t_gap: f64, q_segment: f64) -> WallExchange {
        let w = self.width[k];
        let (ui, uo) = (self.u_in[k], self.u_out);
        let flux = q_segment / w;
        // Written as an offset from the coolant so equal temperatures and
        // no power return the coolant temperature exactly.
        let mid_wall = if ui + uo > 0.0 {
            t_coolant + (uo * (t_gap - t_coolant) + flux) / (ui + uo)
        } else {
            t_coolant
        };
        let into_coolant = ui * w * (mid_wall - t_coolant);
        let to_gap = uo * w * (mid_wall - t_gap);
        let outer_surface = if self.gap_film > 0.0 {
            t_gap + uo * (mid_wall - t_gap) / self.gap_film
        } else {
            mid_wall
        };
        WallExchange {
            mid_wall,
            outer_surface,
            into_coolant,
            to_gap,
        }
    }
}
