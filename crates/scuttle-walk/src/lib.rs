//! Gait generation and the walk controller.
//!
//! The pipeline per control tick:
//!
//! 1. **Gait timing** — the gait pattern quantised to whole control ticks
//! 2. **Walk state machine** — stopped / starting / moving / stopping
//! 3. **Leg steppers** — per-leg phase, step state and tip trajectory
//! 4. **IK dispatch** — impedance-adjusted tips handed to the leg model
//!
//! Stance tips drag backward under the body at the commanded velocity;
//! swing tips follow a pair of C¹-joined quartic Bézier curves whose apex
//! sits `step_clearance × max_body_height` above the default tip. The
//! nominal footprint each foot sweeps is derived once at init from joint
//! limits in [`workspace`].

pub mod controller;
pub mod gait;
pub mod stepper;
pub mod workspace;

pub use controller::WalkController;
pub use gait::GaitTiming;
pub use stepper::{LegStepper, StepContext, SwingProfile};
pub use workspace::StanceWorkspace;
