//! Hexapod leg model.
//!
//! Each leg is a yaw–lift–bend chain: a coxa joint rotating the leg plane
//! about vertical, a femur joint lifting within that plane, and a knee
//! joint bending the tibia. The model owns per-leg geometry, joint state,
//! the compliance coefficients mutated by the impedance layer, and latched
//! force/effort sensor samples.

pub mod kinematics;
pub mod leg;
pub mod model;

pub use kinematics::JointAngles;
pub use leg::Leg;
pub use model::HexapodModel;
