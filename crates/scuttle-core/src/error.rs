use thiserror::Error;

use crate::types::LegId;

/// Top-level error type for the scuttle controller.
#[derive(Debug, Error)]
pub enum ScuttleError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Workspace error: {0}")]
    Workspace(#[from] WorkspaceError),

    #[error("Gait error: {0}")]
    Gait(#[from] GaitError),

    #[error("Kinematics error: {0}")]
    Kinematics(#[from] KinematicsError),
}

/// Configuration parsing and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl ConfigError {
    /// Shorthand for an [`ConfigError::InvalidValue`].
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Failures while deriving the nominal stance footprint at initialisation.
/// All of these mean the configured geometry cannot stand or step as
/// requested; the controller refuses to start.
#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("step clearance requires lifting {required:.4} m but the leg can lift at most {limit:.4} m")]
    SwingHeightUnreachable { required: f64, limit: f64 },

    #[error("body clearance {0:.4} outside [0, 1)")]
    BodyClearanceOutOfRange(f64),

    #[error("row {row}: stance height leaves {extra_height:.4} m below the hip pivot, more than the tibia length {tibia_length:.4} m")]
    StanceHeightUnreachable {
        row: usize,
        extra_height: f64,
        tibia_length: f64,
    },

    #[error("row {row}: no disc fits inside the yaw sector")]
    SectorUnsolvable { row: usize },

    #[error("row {row}: footprint radius {radius:.4} m is not positive; step clearance is too high for the leg to reach")]
    FootprintRadiusNonPositive { row: usize, radius: f64 },
}

/// Failures while quantising gait timing.
#[derive(Debug, Error)]
pub enum GaitError {
    #[error("quantised phase length {0} is not positive; step frequency too high for the tick rate")]
    NonPositivePhaseLength(i32),

    #[error("phase length {phase_length} is not a multiple of the base cycle {base}")]
    PhaseLengthNotDivisible { phase_length: i32, base: i32 },
}

/// Leg kinematics failures. Reported per tick; the control loop continues
/// with the previous joint targets.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum KinematicsError {
    #[error("{leg}: tip target at {distance:.4} m outside reachable band [{min_length:.4}, {max_length:.4}] m")]
    TargetUnreachable {
        leg: LegId,
        distance: f64,
        min_length: f64,
        max_length: f64,
    },
}
