//! Per-leg vertical admittance and dynamic stiffness.
//!
//! Each leg carries a virtual mass–spring–damper excited by its measured
//! tip force (or a femur-effort surrogate). The model is integrated with
//! fixed-step RK4 every control tick and its deflection is published to the
//! leg as `delta_z`, which the walk layer subtracts from the tip target.
//!
//! Once per cycle the virtual stiffness of every leg is recomputed from
//! swing progress: a swinging leg softens, its two ring neighbours stiffen
//! to carry the shifted load. The neighbour terms accumulate, so a leg
//! flanked by two simultaneous swings is stiffened twice.

use scuttle_core::config::ImpedanceConfig;
use scuttle_core::types::{LegId, StepState, LEG_COUNT};
use scuttle_model::{HexapodModel, Leg};

use crate::ode::integrate_fixed;

/// RK4 substeps per integration interval.
const INTEGRATOR_SUBSTEPS: u32 = 30;

// ---------------------------------------------------------------------------
// SwingSample
// ---------------------------------------------------------------------------

/// Per-leg observation of the walk layer used by the stiffness update.
#[derive(Debug, Clone, Copy)]
pub struct SwingSample {
    pub step_state: StepState,
    /// Current tip height in the body frame.
    pub tip_z: f64,
    /// Default (mid-stance) tip height.
    pub default_tip_z: f64,
}

// ---------------------------------------------------------------------------
// ImpedanceController
// ---------------------------------------------------------------------------

pub struct ImpedanceController {
    integrator_step_time: f64,
    force_gain: f64,
    base_mass: f64,
    base_stiffness: f64,
    base_damping_ratio: f64,
    swing_stiffness_scaler: f64,
    load_stiffness_scaler: f64,
    use_joint_effort: bool,
    mirror_effort_sign: bool,
    load_stiffness_includes_base: bool,
    /// Full swing amplitude, `step_clearance × max_body_height`.
    step_amplitude: f64,
}

impl ImpedanceController {
    /// `step_amplitude` is the walk layer's swing apex height, used to
    /// normalise swing progress.
    #[must_use]
    pub fn new(config: &ImpedanceConfig, integrator_step_time: f64, step_amplitude: f64) -> Self {
        Self {
            integrator_step_time,
            force_gain: config.force_gain,
            base_mass: config.virtual_mass,
            base_stiffness: config.virtual_stiffness,
            base_damping_ratio: config.virtual_damping_ratio,
            swing_stiffness_scaler: config.swing_stiffness_scaler,
            load_stiffness_scaler: config.load_stiffness_scaler,
            use_joint_effort: config.use_joint_effort,
            mirror_effort_sign: config.mirror_effort_sign,
            load_stiffness_includes_base: config.load_stiffness_includes_base,
            step_amplitude,
        }
    }

    /// Seed every leg's virtual coefficients from the configured base.
    pub fn init_legs(&self, model: &mut HexapodModel) {
        for leg in model.legs_mut() {
            leg.set_virtual_mass(self.base_mass);
            leg.set_virtual_stiffness(self.base_stiffness);
            leg.set_virtual_damping_ratio(self.base_damping_ratio);
        }
    }

    /// Integrate every leg's admittance model one tick and publish
    /// `delta_z`.
    pub fn update(&self, model: &mut HexapodModel) {
        for leg in model.legs_mut() {
            self.update_leg(leg);
        }
    }

    /// Integrate one leg's admittance model and publish its `delta_z`.
    pub fn update_leg(&self, leg: &mut Leg) {
        let force_input = if self.use_joint_effort {
            let sign = if self.mirror_effort_sign {
                leg.mirror_dir()
            } else {
                1.0
            };
            sign * leg.femur_effort()
        } else {
            leg.tip_force()
        };

        let mass = leg.virtual_mass();
        let stiffness = leg.virtual_stiffness();
        let damping = 2.0 * leg.virtual_damping_ratio() * (mass * stiffness).sqrt();
        let force_gain = self.force_gain;

        let dynamics = |x: [f64; 2]| {
            [
                x[1],
                -force_input * force_gain / mass - damping * x[1] / mass - stiffness * x[0] / mass,
            ]
        };
        leg.admittance_state = integrate_fixed(
            &dynamics,
            leg.admittance_state,
            self.integrator_step_time,
            INTEGRATOR_SUBSTEPS,
        );
        leg.set_delta_z(leg.admittance_state[0]);
    }

    /// Recompute every leg's virtual stiffness from swing progress.
    ///
    /// Stiffness is reset to the base first; each swinging leg then takes
    /// its softened value absolutely while both ring neighbours receive an
    /// additive load term, so overlapping swings compound on a leg that is
    /// adjacent to two of them.
    pub fn update_stiffness(&self, model: &mut HexapodModel, samples: &[SwingSample; LEG_COUNT]) {
        for leg in model.legs_mut() {
            leg.set_virtual_stiffness(self.base_stiffness);
        }

        for id in LegId::ALL {
            let sample = &samples[id.index()];
            if sample.step_state != StepState::Swing {
                continue;
            }
            let step_reference = if self.step_amplitude > 0.0 {
                ((sample.tip_z - sample.default_tip_z) / self.step_amplitude).abs()
            } else {
                0.0
            };

            let swing_stiffness = self.base_stiffness
                * (step_reference * (self.swing_stiffness_scaler - 1.0) + 1.0);
            let load_offset = if self.load_stiffness_includes_base {
                1.0
            } else {
                0.0
            };
            let load_stiffness = self.base_stiffness
                * (step_reference * (self.load_stiffness_scaler - 1.0) + load_offset);

            let (previous, next) = id.adjacent();
            model.leg_mut(id).set_virtual_stiffness(swing_stiffness);
            for neighbour in [previous, next] {
                let current = model.leg(neighbour).virtual_stiffness();
                model
                    .leg_mut(neighbour)
                    .set_virtual_stiffness(current + load_stiffness);
            }
        }
    }

    /// Manually scale one leg and its neighbours from a caller-provided
    /// step reference. Unlike the cyclic update this sets all three legs
    /// absolutely, base offset included.
    pub fn update_stiffness_for_leg(
        &self,
        model: &mut HexapodModel,
        id: LegId,
        step_reference: f64,
    ) {
        let swing_stiffness = self.base_stiffness
            * (step_reference * (self.swing_stiffness_scaler - 1.0) + 1.0);
        let load_stiffness = self.base_stiffness
            * (step_reference * (self.load_stiffness_scaler - 1.0) + 1.0);

        let (previous, next) = id.adjacent();
        model.leg_mut(id).set_virtual_stiffness(swing_stiffness);
        model.leg_mut(previous).set_virtual_stiffness(load_stiffness);
        model.leg_mut(next).set_virtual_stiffness(load_stiffness);
    }

    #[must_use]
    pub const fn base_stiffness(&self) -> f64 {
        self.base_stiffness
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
