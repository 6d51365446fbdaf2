//! Closed-form kinematics for the yaw–lift–bend leg chain.
//!
//! The coxa joint yaws the leg plane about vertical, measured from the
//! outward lateral axis so both sides share one convention. Within the
//! plane the femur lifts from horizontal and the knee bends the tibia back
//! from the femur line (zero bend = straight leg). The inverse solution is
//! the law-of-cosines two-link form, taking the knee-up branch.

use nalgebra::Vector3;
use scuttle_core::error::KinematicsError;

use crate::leg::Leg;

/// Slack on the reachable band so targets sitting exactly on a joint limit
/// do not flicker in and out of reach.
const LENGTH_TOLERANCE: f64 = 1e-9;

/// Joint angles of one leg, radians.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct JointAngles {
    /// Yaw of the leg plane, from the outward lateral axis, positive
    /// toward the front.
    pub coxa_yaw: f64,
    /// Femur angle from horizontal, positive up.
    pub femur_lift: f64,
    /// Knee bend back from the femur line, zero when straight.
    pub knee_bend: f64,
}

impl Leg {
    /// Tip position in the body frame for the given joint angles.
    #[must_use]
    pub fn forward_kinematics(&self, angles: &JointAngles) -> Vector3<f64> {
        let tibia_angle = angles.femur_lift - angles.knee_bend;
        let planar_reach = self.hip_length
            + self.femur_length * angles.femur_lift.cos()
            + self.tibia_length * tibia_angle.cos();
        let height = self.femur_length * angles.femur_lift.sin()
            + self.tibia_length * tibia_angle.sin();
        let lateral = planar_reach * angles.coxa_yaw.cos();
        let forward = planar_reach * angles.coxa_yaw.sin();
        self.root_offset + Vector3::new(self.mirror_dir() * lateral, forward, height)
    }

    /// Solve for the joint angles placing the tip at `target` (body frame).
    pub fn inverse_kinematics(
        &self,
        target: Vector3<f64>,
    ) -> Result<JointAngles, KinematicsError> {
        let rel = target - self.root_offset;
        let lateral = self.mirror_dir() * rel.x;
        let coxa_yaw = rel.y.atan2(lateral);

        let radial = lateral.hypot(rel.y);
        let reach = radial - self.hip_length;
        let length = reach.hypot(rel.z);
        if length < self.min_leg_length - LENGTH_TOLERANCE
            || length > self.max_leg_length + LENGTH_TOLERANCE
        {
            return Err(KinematicsError::TargetUnreachable {
                leg: self.id(),
                distance: length,
                min_length: self.min_leg_length,
                max_length: self.max_leg_length,
            });
        }

        let f = self.femur_length;
        let t = self.tibia_length;
        let cos_interior = ((f * f + t * t - length * length) / (2.0 * f * t)).clamp(-1.0, 1.0);
        let knee_bend = std::f64::consts::PI - cos_interior.acos();
        let cos_femur = ((f * f + length * length - t * t) / (2.0 * f * length)).clamp(-1.0, 1.0);
        let femur_lift = rel.z.atan2(reach) + cos_femur.acos();

        Ok(JointAngles {
            coxa_yaw,
            femur_lift,
            knee_bend,
        })
    }

    /// Solve IK for `target` and commit the result to the leg.
    ///
    /// On failure the leg keeps its previous joint targets; the caller
    /// reports and continues.
    pub fn apply_ik(&mut self, target: Vector3<f64>) -> Result<(), KinematicsError> {
        let angles = self.inverse_kinematics(target)?;
        self.joint_angles = angles;
        self.tip_position = target;
        Ok(())
    }

    /// Clamp the joint targets to their limits, refreshing the tip position
    /// when anything moved.
    pub fn clamp_to_limits(&mut self) {
        let clamped = JointAngles {
            coxa_yaw: self.joint_angles.coxa_yaw.clamp(
                self.stance_leg_yaw - self.yaw_limit_around_stance,
                self.stance_leg_yaw + self.yaw_limit_around_stance,
            ),
            femur_lift: self
                .joint_angles
                .femur_lift
                .clamp(self.min_hip_lift, self.max_hip_lift),
            knee_bend: self
                .joint_angles
                .knee_bend
                .clamp(self.min_knee_bend, self.max_knee_bend),
        };
        if clamped != self.joint_angles {
            self.joint_angles = clamped;
            self.tip_position = self.forward_kinematics(&clamped);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use scuttle_core::config::LegGeometryConfig;
    use scuttle_core::types::{LegId, Side};

    fn leg(side: Side) -> Leg {
        Leg::from_config(LegId { row: 1, side }, &LegGeometryConfig::default())
    }

    #[test]
    fn fk_ik_roundtrip_right() {
        let leg = leg(Side::Right);
        let angles = JointAngles {
            coxa_yaw: 0.2,
            femur_lift: 0.1,
            knee_bend: 1.2,
        };
        let tip = leg.forward_kinematics(&angles);
        let solved = leg.inverse_kinematics(tip).unwrap();
        assert_relative_eq!(solved.coxa_yaw, angles.coxa_yaw, epsilon = 1e-9);
        assert_relative_eq!(solved.femur_lift, angles.femur_lift, epsilon = 1e-9);
        assert_relative_eq!(solved.knee_bend, angles.knee_bend, epsilon = 1e-9);
    }

    #[test]
    fn fk_ik_roundtrip_left() {
        let leg = leg(Side::Left);
        let angles = JointAngles {
            coxa_yaw: -0.15,
            femur_lift: -0.3,
            knee_bend: 1.5,
        };
        let tip = leg.forward_kinematics(&angles);
        let solved = leg.inverse_kinematics(tip).unwrap();
        assert_relative_eq!(solved.coxa_yaw, angles.coxa_yaw, epsilon = 1e-9);
        assert_relative_eq!(solved.femur_lift, angles.femur_lift, epsilon = 1e-9);
        assert_relative_eq!(solved.knee_bend, angles.knee_bend, epsilon = 1e-9);
    }

    #[test]
    fn mirrored_targets_give_equal_joint_angles() {
        let right = leg(Side::Right);
        let left = leg(Side::Left);
        let target = Vector3::new(0.45, 0.05, -0.15);
        let mirrored = Vector3::new(-target.x, target.y, target.z);
        let a = right.inverse_kinematics(target).unwrap();
        let b = left.inverse_kinematics(mirrored).unwrap();
        assert_relative_eq!(a.coxa_yaw, b.coxa_yaw, epsilon = 1e-12);
        assert_relative_eq!(a.femur_lift, b.femur_lift, epsilon = 1e-12);
        assert_relative_eq!(a.knee_bend, b.knee_bend, epsilon = 1e-12);
    }

    #[test]
    fn unreachable_target_is_an_error() {
        let leg = leg(Side::Right);
        let too_far = Vector3::new(2.0, 0.0, -0.1);
        let err = leg.inverse_kinematics(too_far).unwrap_err();
        assert!(matches!(err, KinematicsError::TargetUnreachable { .. }));
    }

    #[test]
    fn ik_picks_knee_up_branch() {
        let leg = leg(Side::Right);
        let target = Vector3::new(0.45, 0.0, -0.15);
        let angles = leg.inverse_kinematics(target).unwrap();
        // Knee above the hip-to-tip line: femur lift exceeds the direct
        // bearing to the target.
        let rel = target - leg.root_offset;
        let bearing = rel.z.atan2(rel.x.hypot(rel.y) - leg.hip_length);
        assert!(angles.femur_lift > bearing);
    }

    #[test]
    fn apply_ik_commits_angles_and_tip() {
        let mut leg = leg(Side::Right);
        let target = Vector3::new(0.45, 0.02, -0.16);
        leg.apply_ik(target).unwrap();
        assert_relative_eq!(leg.tip_position(), target, epsilon = 1e-12);
        let fk = leg.forward_kinematics(&leg.joint_angles());
        assert_relative_eq!(fk, target, epsilon = 1e-9);
    }

    #[test]
    fn apply_ik_failure_keeps_previous_state() {
        let mut leg = leg(Side::Right);
        let good = Vector3::new(0.45, 0.02, -0.16);
        leg.apply_ik(good).unwrap();
        let before = leg.joint_angles();
        assert!(leg.apply_ik(Vector3::new(3.0, 0.0, 0.0)).is_err());
        assert_eq!(leg.joint_angles(), before);
        assert_relative_eq!(leg.tip_position(), good, epsilon = 1e-12);
    }

    #[test]
    fn clamp_pulls_yaw_back_into_sector() {
        let mut leg = leg(Side::Right);
        // A target far forward of the yaw sector.
        let target = Vector3::new(0.25, 0.35, -0.16);
        leg.apply_ik(target).unwrap();
        leg.clamp_to_limits();
        let angles = leg.joint_angles();
        assert!(angles.coxa_yaw <= leg.stance_leg_yaw + leg.yaw_limit_around_stance + 1e-12);
        // Tip was refreshed to match the clamped pose.
        let fk = leg.forward_kinematics(&angles);
        assert_relative_eq!(fk, leg.tip_position(), epsilon = 1e-9);
    }
}
