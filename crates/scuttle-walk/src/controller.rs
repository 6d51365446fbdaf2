//! The walk controller.
//!
//! Owns the six leg steppers and the global walk state machine. Each tick
//! it turns a normalised velocity command plus curvature into rate-limited
//! body velocities, advances every leg's phase and step state, generates
//! tip positions, composes the impedance deflection and dispatches inverse
//! kinematics.

use nalgebra::Vector2;
use tracing::{debug, warn};

use scuttle_core::config::ControllerConfig;
use scuttle_core::error::{KinematicsError, ScuttleError};
use scuttle_core::types::{LegId, LegMode, Pose, StepState, WalkState, LEG_COUNT};
use scuttle_model::HexapodModel;

use crate::gait::GaitTiming;
use crate::stepper::{LegStepper, StepContext};
use crate::workspace::StanceWorkspace;

/// Input norms beyond this are an input error rather than accumulated
/// rounding; both are clamped, only the former is logged.
const SPEED_OVERFLOW_TOLERANCE: f64 = 1.01;

pub struct WalkController {
    timing: GaitTiming,
    workspace: StanceWorkspace,
    state: WalkState,
    steppers: [LegStepper; LEG_COUNT],

    time_delta: f64,
    max_acceleration: f64,
    max_curvature_speed: f64,

    centre_velocity: Vector2<f64>,
    angular_velocity: f64,
    centre_acceleration: Vector2<f64>,

    legs_in_correct_phase: usize,
    legs_completed_first_step: usize,

    pose: Pose,
}

impl WalkController {
    /// Validate the configuration, quantise the gait and derive the stance
    /// workspace. Any infeasibility refuses bring-up.
    pub fn new(config: &ControllerConfig) -> Result<Self, ScuttleError> {
        config.validate()?;
        let timing = GaitTiming::derive(
            &config.gait,
            config.walk.step_frequency,
            config.timing.time_delta,
        )?;
        let workspace = StanceWorkspace::derive(&config.legs, &config.walk)?;
        let steppers = LegId::ALL.map(|id| {
            LegStepper::new(
                id,
                workspace.identity_tip_positions[id.index()],
                timing.phase_offsets[id.index()],
            )
        });
        debug!(
            phase_length = timing.phase_length,
            step_frequency = timing.step_frequency,
            min_footprint_radius = workspace.min_footprint_radius,
            "walk controller initialised"
        );
        let pose = Pose::at_height(workspace.stance_height());
        Ok(Self {
            timing,
            workspace,
            state: WalkState::Stopped,
            steppers,
            time_delta: config.timing.time_delta,
            max_acceleration: config.walk.max_acceleration,
            max_curvature_speed: config.walk.max_curvature_speed,
            centre_velocity: Vector2::zeros(),
            angular_velocity: 0.0,
            centre_acceleration: Vector2::zeros(),
            legs_in_correct_phase: 0,
            legs_completed_first_step: 0,
            pose,
        })
    }

    /// Put the model's legs at their identity tip positions. Unreachable
    /// identity positions abort bring-up.
    pub fn seed_model(&self, model: &mut HexapodModel) -> Result<(), KinematicsError> {
        for id in LegId::ALL {
            let tip = self.workspace.identity_tip_positions[id.index()];
            let leg = model.leg_mut(id);
            leg.stance_tip_position = tip;
            leg.apply_ik(tip)?;
        }
        Ok(())
    }

    /// One control tick.
    ///
    /// `velocity` is the normalised body velocity command (`‖v‖ ≤ 1`),
    /// `curvature` in `[-1, 1]`. Impedance deflections are read from each
    /// leg's `delta_z` as published this tick.
    pub fn update(&mut self, model: &mut HexapodModel, velocity: Vector2<f64>, curvature: f64) {
        let on_ground_ratio = self.timing.on_ground_ratio();

        let mut commanded = velocity;
        let input_norm = commanded.norm();
        if input_norm > 1.0 {
            if input_norm > SPEED_OVERFLOW_TOLERANCE {
                warn!(norm = input_norm, "normalised velocity exceeds 1; clamping");
            }
            commanded /= input_norm;
        }
        let curvature = curvature.clamp(-1.0, 1.0);

        // The speed argument refers to the outer legs, so turning on the
        // spot still has a meaningful speed.
        let local_velocity = if self.state == WalkState::Stopping {
            Vector2::zeros()
        } else {
            commanded
                * (2.0 * self.workspace.min_footprint_radius * self.timing.step_frequency
                    / on_ground_ratio)
        };
        let speed = local_velocity.norm();
        let previous_centre = self.centre_velocity;

        let target_angular = curvature * speed / self.workspace.stance_radius;
        let angular_diff = target_angular - self.angular_velocity;
        if angular_diff.abs() > 0.0 {
            self.angular_velocity += angular_diff
                * 1.0_f64.min(self.max_curvature_speed * self.time_delta / angular_diff.abs());
        }

        let target_centre = local_velocity * (1.0 - curvature.abs());
        let centre_diff = target_centre - self.centre_velocity;
        let diff_norm = centre_diff.norm();
        if diff_norm > 0.0 {
            self.centre_velocity +=
                centre_diff * 1.0_f64.min(self.max_acceleration * self.time_delta / diff_norm);
        }

        self.advance_state_machine(commanded.norm() > 0.0);
        self.advance_leg_phases(model);
        self.derive_step_states();
        self.update_tip_positions(model);
        model.clamp_all_to_limits();

        self.centre_acceleration = (self.centre_velocity - previous_centre) / self.time_delta;
        self.pose.integrate(
            self.centre_velocity * self.time_delta,
            -self.angular_velocity * self.time_delta,
        );
    }

    // -- state machine --

    fn advance_state_machine(&mut self, moving_commanded: bool) {
        match self.state {
            WalkState::Stopped if moving_commanded => {
                self.state = WalkState::Starting;
                for stepper in &mut self.steppers {
                    stepper.phase = stepper.phase_offset;
                }
                debug!("walk state: stopped -> starting");
            }
            WalkState::Starting
                if self.legs_in_correct_phase == LEG_COUNT
                    && self.legs_completed_first_step == LEG_COUNT =>
            {
                self.legs_in_correct_phase = 0;
                self.legs_completed_first_step = 0;
                self.state = WalkState::Moving;
                debug!("walk state: starting -> moving");
            }
            WalkState::Moving if !moving_commanded => {
                self.state = WalkState::Stopping;
                debug!("walk state: moving -> stopping");
            }
            WalkState::Stopping if self.legs_in_correct_phase == LEG_COUNT => {
                self.legs_in_correct_phase = 0;
                self.state = WalkState::Stopped;
                debug!("walk state: stopping -> stopped");
            }
            _ => {}
        }
    }

    fn advance_leg_phases(&mut self, model: &HexapodModel) {
        let timing = self.timing.clone();
        let stride_scale = timing.on_ground_ratio() / timing.step_frequency;
        let mut in_correct = self.legs_in_correct_phase;
        let mut completed = self.legs_completed_first_step;

        for stepper in &mut self.steppers {
            let tip = model.leg(stepper.leg).tip_position();
            stepper.stride_vector = (self.centre_velocity
                + self.angular_velocity * Vector2::new(tip.y, -tip.x))
                * stride_scale;

            match self.state {
                WalkState::Starting => {
                    // First-step accounting runs before admission so a leg
                    // is credited on a later pass through swing end.
                    if stepper.in_correct_phase
                        && !stepper.completed_first_step
                        && stepper.phase == timing.swing_end
                    {
                        stepper.completed_first_step = true;
                        completed += 1;
                    }
                    if !stepper.in_correct_phase {
                        let offset_in_swing = stepper.phase_offset >= timing.swing_start
                            && stepper.phase_offset < timing.swing_end;
                        if offset_in_swing {
                            if stepper.phase == timing.swing_end {
                                // The forced stance walked this leg through
                                // a whole cycle; admit it with its first
                                // step already behind it.
                                stepper.in_correct_phase = true;
                                in_correct += 1;
                                stepper.completed_first_step = true;
                                completed += 1;
                            } else {
                                stepper.step_state = StepState::ForceStance;
                            }
                        } else {
                            stepper.in_correct_phase = true;
                            in_correct += 1;
                        }
                    }
                    stepper.phase = (stepper.phase + 1) % timing.phase_length;
                }
                WalkState::Stopping => {
                    if stepper.stride_vector.norm() == 0.0 && stepper.phase == timing.swing_end {
                        stepper.step_state = StepState::ForceStop;
                        if stepper.leg != LegId::FRONT_LEFT && !stepper.in_correct_phase {
                            stepper.in_correct_phase = true;
                            in_correct += 1;
                        }
                    }
                    if !stepper.in_correct_phase {
                        stepper.phase = (stepper.phase + 1) % timing.phase_length;
                        // The front-left leg takes one extra step and is
                        // only admitted once it returns to phase zero.
                        if stepper.leg == LegId::FRONT_LEFT
                            && stepper.step_state == StepState::ForceStop
                            && stepper.phase == 0
                        {
                            stepper.in_correct_phase = true;
                            in_correct += 1;
                            stepper.step_state = StepState::Stance;
                        }
                    }
                }
                WalkState::Moving => {
                    stepper.phase = (stepper.phase + 1) % timing.phase_length;
                    stepper.in_correct_phase = false;
                }
                WalkState::Stopped => {
                    stepper.in_correct_phase = false;
                    stepper.completed_first_step = false;
                    stepper.phase = 0;
                    stepper.step_state = StepState::Stance;
                }
            }
        }

        self.legs_in_correct_phase = in_correct;
        self.legs_completed_first_step = completed;
    }

    fn derive_step_states(&mut self) {
        for stepper in &mut self.steppers {
            stepper.step_state = match stepper.step_state {
                StepState::ForceStance => StepState::Stance,
                StepState::ForceStop => StepState::ForceStop,
                _ => self.timing.step_state_for_phase(stepper.phase),
            };
        }
    }

    fn update_tip_positions(&mut self, model: &mut HexapodModel) {
        let ctx = StepContext {
            timing: &self.timing,
            time_delta: self.time_delta,
            swing_height: self.workspace.swing_height,
            centre_velocity: self.centre_velocity,
            angular_velocity: self.angular_velocity,
        };
        for stepper in &mut self.steppers {
            let leg = model.leg_mut(stepper.leg);
            if leg.mode != LegMode::Walking {
                continue;
            }
            stepper.rebase_default(leg.stance_tip_position);
            stepper.update_position(&ctx);

            let mut adjusted = stepper.current_tip_position;
            adjusted.z -= leg.delta_z();
            if let Err(err) = leg.apply_ik(adjusted) {
                warn!(leg = %stepper.leg, error = %err, "tip target unreachable; keeping previous joint targets");
            }
        }
    }

    // -- accessors --

    #[must_use]
    pub const fn state(&self) -> WalkState {
        self.state
    }

    #[must_use]
    pub const fn timing(&self) -> &GaitTiming {
        &self.timing
    }

    #[must_use]
    pub const fn workspace(&self) -> &StanceWorkspace {
        &self.workspace
    }

    #[must_use]
    pub fn steppers(&self) -> &[LegStepper; LEG_COUNT] {
        &self.steppers
    }

    #[must_use]
    pub fn stepper(&self, id: LegId) -> &LegStepper {
        &self.steppers[id.index()]
    }

    #[must_use]
    pub const fn centre_velocity(&self) -> Vector2<f64> {
        self.centre_velocity
    }

    #[must_use]
    pub const fn angular_velocity(&self) -> f64 {
        self.angular_velocity
    }

    #[must_use]
    pub const fn centre_acceleration(&self) -> Vector2<f64> {
        self.centre_acceleration
    }

    #[must_use]
    pub const fn pose(&self) -> &Pose {
        &self.pose
    }

    /// Swing apex height above the default tip.
    #[must_use]
    pub const fn swing_height(&self) -> f64 {
        self.workspace.swing_height
    }

    #[must_use]
    pub const fn legs_in_correct_phase(&self) -> usize {
        self.legs_in_correct_phase
    }

    #[must_use]
    pub const fn legs_completed_first_step(&self) -> usize {
        self.legs_completed_first_step
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
