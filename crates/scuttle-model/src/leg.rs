//! Per-leg geometry and mutable state.

use nalgebra::Vector3;
use scuttle_core::config::LegGeometryConfig;
use scuttle_core::types::{LegId, LegMode};

use crate::kinematics::JointAngles;

/// One leg of the hexapod.
///
/// Geometry is fixed at construction; joint angles and tip positions are
/// mutated only through inverse kinematics, compliance coefficients and
/// `delta_z` only by the impedance layer.
#[derive(Debug, Clone)]
pub struct Leg {
    id: LegId,

    // -- geometry --
    /// Hip mounting point in the body frame, already mirrored for the side.
    pub root_offset: Vector3<f64>,
    pub hip_length: f64,
    pub femur_length: f64,
    pub tibia_length: f64,
    pub min_hip_lift: f64,
    pub max_hip_lift: f64,
    pub min_knee_bend: f64,
    pub max_knee_bend: f64,
    pub min_leg_length: f64,
    pub max_leg_length: f64,
    /// Nominal outward yaw of the stance, in the leg's mirrored frame.
    pub stance_leg_yaw: f64,
    pub yaw_limit_around_stance: f64,

    // -- walk state --
    pub mode: LegMode,
    pub(crate) joint_angles: JointAngles,
    pub(crate) tip_position: Vector3<f64>,
    /// Nominal mid-stance tip position dictated by body posture. The walk
    /// layer rebases its default tip positions from here each tick.
    pub stance_tip_position: Vector3<f64>,

    // -- compliance state --
    delta_z: f64,
    virtual_mass: f64,
    virtual_stiffness: f64,
    virtual_damping_ratio: f64,
    /// Vertical deflection and its derivative, integrated by the impedance
    /// layer.
    pub admittance_state: [f64; 2],

    // -- latched sensor samples --
    tip_force: f64,
    femur_effort: f64,
}

impl Leg {
    /// Build a leg from shared geometry. Root offset and stance yaw come
    /// from the leg's row; the lateral offset is mirrored for left legs.
    #[must_use]
    pub fn from_config(id: LegId, config: &LegGeometryConfig) -> Self {
        let row_offset = config.root_offset[id.row];
        let root_offset = Vector3::new(
            id.mirror_dir() * row_offset[0],
            row_offset[1],
            row_offset[2],
        );
        let mut leg = Self {
            id,
            root_offset,
            hip_length: config.hip_length,
            femur_length: config.femur_length,
            tibia_length: config.tibia_length,
            min_hip_lift: config.min_hip_lift,
            max_hip_lift: config.max_hip_lift,
            min_knee_bend: config.min_knee_bend,
            max_knee_bend: config.max_knee_bend,
            min_leg_length: config.resolved_min_leg_length(),
            max_leg_length: config.resolved_max_leg_length(),
            stance_leg_yaw: config.stance_leg_yaw[id.row],
            yaw_limit_around_stance: config.yaw_limit_around_stance[id.row],
            mode: LegMode::Walking,
            joint_angles: JointAngles::default(),
            tip_position: Vector3::zeros(),
            stance_tip_position: Vector3::zeros(),
            delta_z: 0.0,
            virtual_mass: 1.0,
            virtual_stiffness: 1.0,
            virtual_damping_ratio: 1.0,
            admittance_state: [0.0, 0.0],
            tip_force: 0.0,
            femur_effort: 0.0,
        };
        // Park at the nominal stance yaw with a level femur until the walk
        // layer seeds real tip positions.
        leg.joint_angles.coxa_yaw = leg.stance_leg_yaw;
        leg.joint_angles.knee_bend = leg.min_knee_bend.max(0.0);
        let parked_tip = leg.forward_kinematics(&leg.joint_angles);
        leg.tip_position = parked_tip;
        leg.stance_tip_position = parked_tip;
        leg
    }

    #[must_use]
    pub const fn id(&self) -> LegId {
        self.id
    }

    #[must_use]
    pub const fn mirror_dir(&self) -> f64 {
        self.id.mirror_dir()
    }

    /// Current tip position in the body frame.
    #[must_use]
    pub const fn tip_position(&self) -> Vector3<f64> {
        self.tip_position
    }

    #[must_use]
    pub const fn joint_angles(&self) -> JointAngles {
        self.joint_angles
    }

    // -- compliance accessors --

    #[must_use]
    pub const fn delta_z(&self) -> f64 {
        self.delta_z
    }

    pub fn set_delta_z(&mut self, delta_z: f64) {
        self.delta_z = delta_z;
    }

    #[must_use]
    pub const fn virtual_mass(&self) -> f64 {
        self.virtual_mass
    }

    pub fn set_virtual_mass(&mut self, mass: f64) {
        self.virtual_mass = mass;
    }

    #[must_use]
    pub const fn virtual_stiffness(&self) -> f64 {
        self.virtual_stiffness
    }

    pub fn set_virtual_stiffness(&mut self, stiffness: f64) {
        self.virtual_stiffness = stiffness;
    }

    #[must_use]
    pub const fn virtual_damping_ratio(&self) -> f64 {
        self.virtual_damping_ratio
    }

    pub fn set_virtual_damping_ratio(&mut self, ratio: f64) {
        self.virtual_damping_ratio = ratio;
    }

    // -- sensor latches --

    /// Record a tip force sample. `None` keeps the previous sample so a
    /// sensor gap never feeds a discontinuity into the integrator.
    pub fn record_tip_force(&mut self, sample: Option<f64>) {
        if let Some(force) = sample {
            self.tip_force = force;
        }
    }

    #[must_use]
    pub const fn tip_force(&self) -> f64 {
        self.tip_force
    }

    /// Record a femur joint effort sample; `None` keeps the previous one.
    pub fn record_femur_effort(&mut self, sample: Option<f64>) {
        if let Some(effort) = sample {
            self.femur_effort = effort;
        }
    }

    #[must_use]
    pub const fn femur_effort(&self) -> f64 {
        self.femur_effort
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use scuttle_core::types::Side;

    fn front_pair() -> (Leg, Leg) {
        let config = LegGeometryConfig::default();
        (
            Leg::from_config(LegId { row: 0, side: Side::Left }, &config),
            Leg::from_config(LegId { row: 0, side: Side::Right }, &config),
        )
    }

    #[test]
    fn root_offset_mirrors_lateral_axis() {
        let (left, right) = front_pair();
        assert_relative_eq!(left.root_offset.x, -right.root_offset.x);
        assert_relative_eq!(left.root_offset.y, right.root_offset.y);
    }

    #[test]
    fn initial_tip_mirrors_too() {
        let (left, right) = front_pair();
        assert_relative_eq!(left.tip_position().x, -right.tip_position().x, epsilon = 1e-12);
        assert_relative_eq!(left.tip_position().y, right.tip_position().y, epsilon = 1e-12);
    }

    #[test]
    fn force_latch_survives_sensor_gap() {
        let (mut leg, _) = front_pair();
        leg.record_tip_force(Some(3.5));
        leg.record_tip_force(None);
        assert_relative_eq!(leg.tip_force(), 3.5);
    }

    #[test]
    fn leg_lengths_resolved_from_knee_limits() {
        let (leg, _) = front_pair();
        assert!(leg.min_leg_length < leg.max_leg_length);
        assert!(leg.max_leg_length < leg.femur_length + leg.tibia_length + 1e-9);
    }
}
