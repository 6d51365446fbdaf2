//! Single-threaded control loop orchestration.
//!
//! One tick runs, in order: latch sensor samples, recompute per-cycle
//! stiffness, integrate the admittance models (publishing `delta_z`), then
//! run the walk controller which consumes the fresh deflections and
//! dispatches inverse kinematics. There are no tasks and no locks; every
//! component is mutated only by the tick that drives it.
//!
//! The stiffness pass reads the step states left by the previous tick's
//! walk update, so a swing observed at tick `t` softens its leg from tick
//! `t + 1`. The admittance deflection used at tick `t` reflects the force
//! sample latched at tick `t`.

use std::time::Duration;

use nalgebra::{Vector2, Vector3};
use tracing::warn;

use scuttle_core::config::ControllerConfig;
use scuttle_core::error::ScuttleError;
use scuttle_core::time::TickClock;
use scuttle_core::types::{LegId, Pose, WalkState, LEG_COUNT};
use scuttle_impedance::{ImpedanceController, SwingSample};
use scuttle_model::{HexapodModel, JointAngles};
use scuttle_walk::WalkController;

// ---------------------------------------------------------------------------
// TickInput / TickOutput
// ---------------------------------------------------------------------------

/// External inputs consumed by one control tick.
#[derive(Debug, Clone)]
pub struct TickInput {
    /// Normalised body velocity command, `‖v‖ ≤ 1`.
    pub velocity: Vector2<f64>,
    /// Path curvature in `[-1, 1]`.
    pub curvature: f64,
    /// Per-leg tip force samples; `None` reuses the previous sample.
    pub tip_forces: [Option<f64>; LEG_COUNT],
    /// Per-leg femur joint effort samples; `None` reuses the previous one.
    pub femur_efforts: [Option<f64>; LEG_COUNT],
}

impl Default for TickInput {
    fn default() -> Self {
        Self {
            velocity: Vector2::zeros(),
            curvature: 0.0,
            tip_forces: [None; LEG_COUNT],
            femur_efforts: [None; LEG_COUNT],
        }
    }
}

impl TickInput {
    /// A pure velocity command with no sensor samples.
    #[must_use]
    pub fn with_velocity(velocity: Vector2<f64>, curvature: f64) -> Self {
        Self {
            velocity,
            curvature,
            ..Self::default()
        }
    }
}

/// Joint and tip targets produced by one control tick.
#[derive(Debug, Clone)]
pub struct TickOutput {
    pub walk_state: WalkState,
    /// Joint targets per leg, in leg storage order.
    pub joint_targets: [JointAngles; LEG_COUNT],
    /// Impedance-adjusted tip positions actually dispatched to IK.
    pub tip_targets: [Vector3<f64>; LEG_COUNT],
    /// Odometric pose for visualisation consumers.
    pub pose: Pose,
}

// ---------------------------------------------------------------------------
// LocomotionController
// ---------------------------------------------------------------------------

/// The assembled control core: model, walk controller and impedance
/// controller, advanced together one tick at a time.
pub struct LocomotionController {
    model: HexapodModel,
    walk: WalkController,
    impedance: ImpedanceController,
}

impl LocomotionController {
    /// Build and cross-wire all components. Configuration infeasibilities
    /// and unreachable identity positions abort bring-up.
    pub fn new(config: &ControllerConfig) -> Result<Self, ScuttleError> {
        let walk = WalkController::new(config)?;
        let mut model = HexapodModel::from_config(&config.legs);
        walk.seed_model(&mut model)?;
        let impedance = ImpedanceController::new(
            &config.impedance,
            config.timing.integrator_step_time,
            walk.swing_height(),
        );
        impedance.init_legs(&mut model);
        Ok(Self {
            model,
            walk,
            impedance,
        })
    }

    /// Run one control tick.
    pub fn tick(&mut self, input: &TickInput) -> TickOutput {
        for id in LegId::ALL {
            let leg = self.model.leg_mut(id);
            leg.record_tip_force(input.tip_forces[id.index()]);
            leg.record_femur_effort(input.femur_efforts[id.index()]);
        }

        let samples = LegId::ALL.map(|id| {
            let stepper = self.walk.stepper(id);
            SwingSample {
                step_state: stepper.step_state,
                tip_z: stepper.current_tip_position.z,
                default_tip_z: stepper.default_tip_position.z,
            }
        });
        self.impedance.update_stiffness(&mut self.model, &samples);
        self.impedance.update(&mut self.model);

        self.walk
            .update(&mut self.model, input.velocity, input.curvature);

        TickOutput {
            walk_state: self.walk.state(),
            joint_targets: LegId::ALL.map(|id| self.model.leg(id).joint_angles()),
            tip_targets: LegId::ALL.map(|id| self.model.leg(id).tip_position()),
            pose: self.walk.pose().clone(),
        }
    }

    #[must_use]
    pub const fn model(&self) -> &HexapodModel {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut HexapodModel {
        &mut self.model
    }

    #[must_use]
    pub const fn walk(&self) -> &WalkController {
        &self.walk
    }

    #[must_use]
    pub const fn impedance(&self) -> &ImpedanceController {
        &self.impedance
    }
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

/// Fixed-timestep driver wrapping the controller and a [`TickClock`].
///
/// Feed it irregular wall-clock deltas; it dispenses whole control ticks
/// and reports (but survives) missed deadlines.
pub struct Driver {
    controller: LocomotionController,
    clock: TickClock,
}

impl Driver {
    pub fn new(config: &ControllerConfig) -> Result<Self, ScuttleError> {
        Ok(Self {
            controller: LocomotionController::new(config)?,
            clock: TickClock::new(config.timing.time_delta),
        })
    }

    /// Advance by `elapsed` wall-clock time, running every whole control
    /// tick that fits. Backlog beyond the per-frame cap is dropped and
    /// logged rather than allowed to snowball.
    pub fn advance(&mut self, elapsed: Duration, input: &TickInput) -> Vec<TickOutput> {
        self.clock.accumulate(elapsed);
        let mut outputs = Vec::new();
        while self.clock.should_step() {
            outputs.push(self.controller.tick(input));
        }
        let dropped = self.clock.drain_backlog();
        if dropped > 0 {
            warn!(dropped, "control loop missed deadlines; backlog dropped");
        }
        outputs
    }

    #[must_use]
    pub const fn controller(&self) -> &LocomotionController {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut LocomotionController {
        &mut self.controller
    }

    #[must_use]
    pub const fn clock(&self) -> &TickClock {
        &self.clock
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
