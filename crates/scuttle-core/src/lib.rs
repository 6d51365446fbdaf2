//! Shared leaves of the scuttle hexapod controller: leg identity, walk and
//! step cycle states, curve math, the fixed-step control clock, the
//! validated configuration value and the error taxonomy.

pub mod config;
pub mod error;
pub mod math;
pub mod time;
pub mod types;

pub mod prelude {
    pub use crate::config::{
        ControllerConfig, GaitConfig, ImpedanceConfig, LegGeometryConfig, TimingConfig,
        WalkConfig, BODY_CLEARANCE_AUTO,
    };
    pub use crate::error::{
        ConfigError, GaitError, KinematicsError, ScuttleError, WorkspaceError,
    };
    pub use crate::time::TickClock;
    pub use crate::types::{
        LegId, LegMode, Pose, Side, StepState, WalkState, LEG_COUNT, ROW_COUNT,
    };
}
