//! Numerical primitives for DuctSweep.

pub mod interp;
pub mod legendre;
pub mod lstsq;
pub mod rounding;
