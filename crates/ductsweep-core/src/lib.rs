//! Axial marching engine for steady-state ducted-assembly core temperatures.
//!
//! Leaves first: geometry and reconciliation, the axial mesh planner,
//! region and unit thermal updates, the gap coolant field, and the sweep
//! driver that marches them plane by plane.

pub mod axial_mesh;
pub mod convection;
pub mod duct;
pub mod gap;
pub mod geometry;
pub mod materials;
pub mod porous;
pub mod power;
pub mod reactor;
pub mod reconcile;
pub mod region;
pub mod rodded;
pub mod sink;
pub mod stability;
pub mod sweep;
pub mod unit;
