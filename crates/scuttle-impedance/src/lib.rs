//! Per-leg compliant vertical contact control.
//!
//! A virtual mass–spring–damper per leg turns measured contact force into
//! a vertical tip deflection (`delta_z`), integrated with fixed-step RK4
//! each control tick. A per-cycle pass modulates the virtual stiffness of
//! swinging legs and their ring neighbours so the supporting tripod
//! stiffens while a foot is in the air.

pub mod controller;
pub mod ode;

pub use controller::{ImpedanceController, SwingSample};
