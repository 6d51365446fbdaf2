//! Per-leg step cycle state and tip trajectory generation.
//!
//! Stance drags the tip backward under the body at the commanded velocity.
//! Swing follows a pair of quartic Bézier curves joined C¹ to each other
//! and to the stance motion at both ends, so the foot decelerates into the
//! ground for a soft landing. The curves are advanced in derivative form:
//! each tick integrates one parameter step of the current curve.

use nalgebra::{Vector2, Vector3};
use scuttle_core::math::{quartic_bezier, quartic_bezier_derivative};
use scuttle_core::types::{LegId, StepState};

use crate::gait::GaitTiming;

// ---------------------------------------------------------------------------
// StepContext
// ---------------------------------------------------------------------------

/// Per-tick view of the walk controller scalars a stepper needs.
#[derive(Debug, Clone, Copy)]
pub struct StepContext<'a> {
    pub timing: &'a GaitTiming,
    pub time_delta: f64,
    /// Swing apex height above the default tip.
    pub swing_height: f64,
    /// Body-frame linear velocity of the body centre.
    pub centre_velocity: Vector2<f64>,
    pub angular_velocity: f64,
}

// ---------------------------------------------------------------------------
// SwingProfile
// ---------------------------------------------------------------------------

/// Control polygons of one swing: the stance curve it leaves and rejoins,
/// and the two swing halves.
#[derive(Debug, Clone)]
pub struct SwingProfile {
    pub stance: [Vector3<f64>; 5],
    pub primary: [Vector3<f64>; 5],
    pub secondary: [Vector3<f64>; 5],
}

impl SwingProfile {
    /// Build the three polygons for a swing that lifts off at `origin`,
    /// peaks `swing_height` above the default tip and touches down half a
    /// stride ahead of it.
    #[must_use]
    pub fn new(
        default_tip: Vector3<f64>,
        origin_tip: Vector3<f64>,
        stride: Vector2<f64>,
        swing_height: f64,
        stance_depth: f64,
    ) -> Self {
        let stride = Vector3::new(stride.x, stride.y, 0.0);

        // Horizontal plane: stance runs from touchdown (half a stride ahead
        // of default) back to the lift-off origin at constant velocity.
        let mut stance = [Vector3::zeros(); 5];
        stance[0] = default_tip + stride * 0.5;
        stance[4] = origin_tip;
        stance[1] = stance[4] + (stance[0] - stance[4]) * 0.75;
        stance[2] = stance[4] + (stance[0] - stance[4]) * 0.5;
        stance[3] = stance[4] + (stance[0] - stance[4]) * 0.25;
        stance[0].z = default_tip.z;
        stance[4].z = origin_tip.z;
        stance[2].z = stance[0].z + stance_depth;
        stance[1].z = (stance[0].z + stance[2].z) / 2.0;
        stance[3].z = (stance[4].z + stance[2].z) / 2.0;

        // First swing half: C¹ out of stance, horizontal velocity killed at
        // the apex over the default tip.
        let mut primary = [Vector3::zeros(); 5];
        primary[0] = stance[4];
        primary[1] = stance[4] * 2.0 - stance[3];
        primary[2] = primary[1];
        primary[3] = primary[1];
        primary[4] = default_tip;
        primary[0].z = stance[4].z;
        primary[1].z = 2.0 * stance[4].z - stance[3].z;
        primary[4].z = primary[0].z + swing_height;
        primary[2].z = primary[4].z;
        primary[3].z = primary[4].z;

        // Second swing half: C¹ with the first at the apex, C¹ into the
        // stance curve at touchdown.
        let mut secondary = [Vector3::zeros(); 5];
        secondary[0] = primary[4];
        secondary[1] = secondary[0] * 2.0 - primary[3];
        secondary[2] = secondary[1];
        secondary[3] = stance[0] * 2.0 - stance[1];
        secondary[4] = default_tip + stride * 0.5;
        secondary[0].z = primary[4].z;
        secondary[1].z = 2.0 * secondary[0].z - primary[3].z;
        secondary[2].z = secondary[1].z;
        secondary[3].z = 2.0 * stance[0].z - stance[1].z;
        secondary[4].z = stance[0].z;

        Self {
            stance,
            primary,
            secondary,
        }
    }

    #[must_use]
    pub fn primary_position(&self, t: f64) -> Vector3<f64> {
        quartic_bezier(&self.primary, t)
    }

    #[must_use]
    pub fn primary_velocity(&self, t: f64) -> Vector3<f64> {
        quartic_bezier_derivative(&self.primary, t)
    }

    #[must_use]
    pub fn secondary_position(&self, t: f64) -> Vector3<f64> {
        quartic_bezier(&self.secondary, t)
    }

    #[must_use]
    pub fn secondary_velocity(&self, t: f64) -> Vector3<f64> {
        quartic_bezier_derivative(&self.secondary, t)
    }
}

// ---------------------------------------------------------------------------
// LegStepper
// ---------------------------------------------------------------------------

/// Step cycle state of one leg.
#[derive(Debug, Clone)]
pub struct LegStepper {
    pub leg: LegId,
    /// Position in the gait cycle, `[0, phase_length)`.
    pub phase: i32,
    /// This leg's offset into the cycle, set by the gait pattern.
    pub phase_offset: i32,
    pub step_state: StepState,
    /// Nominal mid-stance tip position in the body frame.
    pub default_tip_position: Vector3<f64>,
    /// Live tip target handed to inverse kinematics each tick.
    pub current_tip_position: Vector3<f64>,
    /// Tip position captured at swing entry; frozen for the whole swing.
    pub origin_tip_position: Vector3<f64>,
    /// Horizontal displacement the foot covers during one stance.
    pub stride_vector: Vector2<f64>,
    pub in_correct_phase: bool,
    pub completed_first_step: bool,
}

impl LegStepper {
    #[must_use]
    pub fn new(leg: LegId, identity_tip: Vector3<f64>, phase_offset: i32) -> Self {
        Self {
            leg,
            phase: 0,
            phase_offset,
            step_state: StepState::Stance,
            default_tip_position: identity_tip,
            current_tip_position: identity_tip,
            origin_tip_position: identity_tip,
            stride_vector: Vector2::zeros(),
            in_correct_phase: false,
            completed_first_step: false,
        }
    }

    /// Move the default tip to the leg's stance position while preserving
    /// the tip's current offset from it, so posture changes shift the whole
    /// trajectory instead of snapping the foot.
    pub fn rebase_default(&mut self, stance_tip: Vector3<f64>) {
        let tip_offset = self.default_tip_position - self.current_tip_position;
        self.default_tip_position = stance_tip;
        self.current_tip_position = self.default_tip_position - tip_offset;
    }

    /// Advance the tip one tick along the current step state's trajectory.
    pub fn update_position(&mut self, ctx: &StepContext<'_>) {
        match self.step_state {
            StepState::Swing => self.update_swing_position(ctx),
            StepState::Stance | StepState::StanceTransition | StepState::SwingTransition => {
                let tip = self.current_tip_position;
                let delta = -(ctx.centre_velocity
                    + ctx.angular_velocity * Vector2::new(tip.y, -tip.x))
                    * ctx.time_delta;
                self.current_tip_position.x += delta.x;
                self.current_tip_position.y += delta.y;
                // Vertical motion is held at the default tip height.
            }
            StepState::ForceStance | StepState::ForceStop => {}
        }
    }

    fn update_swing_position(&mut self, ctx: &StepContext<'_>) {
        let iteration = self.phase - ctx.timing.swing_start + 1;
        if iteration == 1 {
            self.origin_tip_position = self.current_tip_position;
        }

        let num_iterations = ctx.timing.swing_iterations(ctx.time_delta);
        if num_iterations <= 0 {
            return;
        }
        let delta_t = 1.0 / f64::from(num_iterations);

        let profile = SwingProfile::new(
            self.default_tip_position,
            self.origin_tip_position,
            self.stride_vector,
            ctx.swing_height,
            ctx.swing_height * 0.5,
        );

        let half = num_iterations / 2;
        let velocity = if iteration <= half {
            profile.primary_velocity(f64::from(iteration) * delta_t * 2.0)
        } else {
            profile.secondary_velocity(f64::from(iteration - half) * delta_t * 2.0)
        };
        self.current_tip_position += velocity * (2.0 * delta_t);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
