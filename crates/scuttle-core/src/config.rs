//! Controller configuration.
//!
//! A single validated value constructed once and passed to every component.
//! Unknown keys are rejected at parse time, all preconditions are checked by
//! [`ControllerConfig::validate`] before the controller will start.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::{LEG_COUNT, ROW_COUNT};

/// Sentinel requesting automatic body clearance selection.
pub const BODY_CLEARANCE_AUTO: f64 = -1.0;

// ---------------------------------------------------------------------------
// Serde default functions
// ---------------------------------------------------------------------------

const fn default_time_delta() -> f64 {
    0.02
}
const fn default_integrator_step_time() -> f64 {
    0.02
}
const fn default_step_frequency() -> f64 {
    1.0
}
const fn default_step_clearance() -> f64 {
    0.1
}
const fn default_body_clearance() -> f64 {
    BODY_CLEARANCE_AUTO
}
const fn default_step_curvature_allowance() -> f64 {
    1.0
}
const fn default_leg_span_scale() -> f64 {
    1.0
}
const fn default_max_acceleration() -> f64 {
    0.1
}
const fn default_max_curvature_speed() -> f64 {
    0.4
}
const fn default_stance_phase() -> i32 {
    4
}
const fn default_swing_phase() -> i32 {
    2
}
const fn default_transition_period() -> i32 {
    1
}
const fn default_phase_offset() -> i32 {
    4
}
const fn default_offset_multiplier() -> [i32; LEG_COUNT] {
    // Tripod: front-left, middle-right and rear-left step together.
    [0, 1, 1, 0, 0, 1]
}
const fn default_virtual_mass() -> f64 {
    1.0
}
const fn default_virtual_stiffness() -> f64 {
    100.0
}
const fn default_virtual_damping_ratio() -> f64 {
    0.7
}
const fn default_load_stiffness_scaler() -> f64 {
    2.0
}
const fn default_swing_stiffness_scaler() -> f64 {
    0.1
}
const fn default_force_gain() -> f64 {
    1.0
}
const fn default_true() -> bool {
    true
}
const fn default_hip_length() -> f64 {
    0.05
}
const fn default_femur_length() -> f64 {
    0.2
}
const fn default_tibia_length() -> f64 {
    0.2
}
const fn default_min_hip_lift() -> f64 {
    -std::f64::consts::FRAC_PI_4
}
const fn default_max_hip_lift() -> f64 {
    std::f64::consts::FRAC_PI_2
}
const fn default_min_knee_bend() -> f64 {
    0.0873
}
const fn default_max_knee_bend() -> f64 {
    2.4435
}
const fn default_stance_leg_yaw() -> [f64; ROW_COUNT] {
    [0.5236, 0.0, -0.5236]
}
const fn default_yaw_limit() -> [f64; ROW_COUNT] {
    [0.3491, 0.3491, 0.3491]
}
const fn default_root_offset() -> [[f64; 3]; ROW_COUNT] {
    [[0.12, 0.25, 0.0], [0.15, 0.0, 0.0], [0.12, -0.25, 0.0]]
}

// ---------------------------------------------------------------------------
// TimingConfig
// ---------------------------------------------------------------------------

/// Control loop timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimingConfig {
    /// Seconds per control tick.
    #[serde(default = "default_time_delta")]
    pub time_delta: f64,

    /// Interval integrated by the admittance model each tick.
    #[serde(default = "default_integrator_step_time")]
    pub integrator_step_time: f64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            time_delta: default_time_delta(),
            integrator_step_time: default_integrator_step_time(),
        }
    }
}

// ---------------------------------------------------------------------------
// WalkConfig
// ---------------------------------------------------------------------------

/// Walk controller scalars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WalkConfig {
    /// Requested complete step cycles per second. Adjusted at init to the
    /// quantised phase length.
    #[serde(default = "default_step_frequency")]
    pub step_frequency: f64,

    /// Swing apex height as a fraction of the maximum body height.
    #[serde(default = "default_step_clearance")]
    pub step_clearance: f64,

    /// Body height as a fraction of the maximum body height, or
    /// [`BODY_CLEARANCE_AUTO`] to derive one from the leg geometry.
    #[serde(default = "default_body_clearance")]
    pub body_clearance: f64,

    /// Extra clearance budgeted for the curved step trajectory when the
    /// body clearance is derived automatically.
    #[serde(default = "default_step_curvature_allowance")]
    pub step_curvature_allowance: f64,

    /// Scale on the horizontal reach used for the stance footprint.
    #[serde(default = "default_leg_span_scale")]
    pub leg_span_scale: f64,

    /// Limit on linear velocity change, m/s².
    #[serde(default = "default_max_acceleration")]
    pub max_acceleration: f64,

    /// Limit on angular velocity change, rad/s².
    #[serde(default = "default_max_curvature_speed")]
    pub max_curvature_speed: f64,
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self {
            step_frequency: default_step_frequency(),
            step_clearance: default_step_clearance(),
            body_clearance: default_body_clearance(),
            step_curvature_allowance: default_step_curvature_allowance(),
            leg_span_scale: default_leg_span_scale(),
            max_acceleration: default_max_acceleration(),
            max_curvature_speed: default_max_curvature_speed(),
        }
    }
}

// ---------------------------------------------------------------------------
// GaitConfig
// ---------------------------------------------------------------------------

/// Gait pattern in base phase units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GaitConfig {
    /// Base phase units spent on the ground.
    #[serde(default = "default_stance_phase")]
    pub stance_phase: i32,

    /// Base phase units spent in the air.
    #[serde(default = "default_swing_phase")]
    pub swing_phase: i32,

    /// Base phase units of each stance/swing transition band.
    #[serde(default = "default_transition_period")]
    pub transition_period: i32,

    /// Base offset between the step cycles of successive legs.
    #[serde(default = "default_phase_offset")]
    pub phase_offset: i32,

    /// Per-leg multiplier on the base phase offset, in leg storage order.
    #[serde(default = "default_offset_multiplier")]
    pub offset_multiplier: [i32; LEG_COUNT],
}

impl GaitConfig {
    /// Length of one full cycle in base phase units.
    #[must_use]
    pub const fn base_phase_length(&self) -> i32 {
        self.stance_phase + self.swing_phase + 2 * self.transition_period
    }
}

impl Default for GaitConfig {
    fn default() -> Self {
        Self {
            stance_phase: default_stance_phase(),
            swing_phase: default_swing_phase(),
            transition_period: default_transition_period(),
            phase_offset: default_phase_offset(),
            offset_multiplier: default_offset_multiplier(),
        }
    }
}

// ---------------------------------------------------------------------------
// ImpedanceConfig
// ---------------------------------------------------------------------------

/// Per-leg vertical admittance model coefficients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImpedanceConfig {
    #[serde(default = "default_virtual_mass")]
    pub virtual_mass: f64,

    #[serde(default = "default_virtual_stiffness")]
    pub virtual_stiffness: f64,

    #[serde(default = "default_virtual_damping_ratio")]
    pub virtual_damping_ratio: f64,

    /// Stiffness multiplier reached by legs adjacent to a full-height swing.
    #[serde(default = "default_load_stiffness_scaler")]
    pub load_stiffness_scaler: f64,

    /// Stiffness multiplier reached by a leg at full swing height.
    #[serde(default = "default_swing_stiffness_scaler")]
    pub swing_stiffness_scaler: f64,

    /// Gain on the measured tip force before integration.
    #[serde(default = "default_force_gain")]
    pub force_gain: f64,

    /// Derive the force input from the femur joint effort instead of the
    /// measured tip force.
    #[serde(default)]
    pub use_joint_effort: bool,

    /// Sign the joint-effort surrogate by the leg's mirror direction.
    #[serde(default = "default_true")]
    pub mirror_effort_sign: bool,

    /// Carry the base-stiffness offset inside the additive neighbour term
    /// of the per-cycle stiffness update.
    #[serde(default)]
    pub load_stiffness_includes_base: bool,
}

impl Default for ImpedanceConfig {
    fn default() -> Self {
        Self {
            virtual_mass: default_virtual_mass(),
            virtual_stiffness: default_virtual_stiffness(),
            virtual_damping_ratio: default_virtual_damping_ratio(),
            load_stiffness_scaler: default_load_stiffness_scaler(),
            swing_stiffness_scaler: default_swing_stiffness_scaler(),
            force_gain: default_force_gain(),
            use_joint_effort: false,
            mirror_effort_sign: true,
            load_stiffness_includes_base: false,
        }
    }
}

// ---------------------------------------------------------------------------
// LegGeometryConfig
// ---------------------------------------------------------------------------

/// Leg segment lengths, joint limits and mounting geometry.
///
/// Lengths and joint limits are shared by all six legs; mounting yaw and
/// root offsets are given per row for the right side and mirrored onto the
/// left.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LegGeometryConfig {
    #[serde(default = "default_hip_length")]
    pub hip_length: f64,

    #[serde(default = "default_femur_length")]
    pub femur_length: f64,

    #[serde(default = "default_tibia_length")]
    pub tibia_length: f64,

    /// Lowest femur angle relative to horizontal; negative values drop the
    /// knee below the hip.
    #[serde(default = "default_min_hip_lift")]
    pub min_hip_lift: f64,

    #[serde(default = "default_max_hip_lift")]
    pub max_hip_lift: f64,

    /// Knee bend limits; zero is a straight leg.
    #[serde(default = "default_min_knee_bend")]
    pub min_knee_bend: f64,

    #[serde(default = "default_max_knee_bend")]
    pub max_knee_bend: f64,

    /// Shortest hip-to-tip distance. Derived from the knee limits when
    /// omitted.
    #[serde(default)]
    pub min_leg_length: Option<f64>,

    /// Longest hip-to-tip distance. Derived from the knee limits when
    /// omitted.
    #[serde(default)]
    pub max_leg_length: Option<f64>,

    /// Nominal outward yaw of each row's stance, radians from lateral.
    #[serde(default = "default_stance_leg_yaw")]
    pub stance_leg_yaw: [f64; ROW_COUNT],

    /// Permitted yaw excursion either side of the stance yaw.
    #[serde(default = "default_yaw_limit")]
    pub yaw_limit_around_stance: [f64; ROW_COUNT],

    /// Hip mounting points per row, right-side convention (x lateral,
    /// y forward, z up).
    #[serde(default = "default_root_offset")]
    pub root_offset: [[f64; 3]; ROW_COUNT],
}

impl LegGeometryConfig {
    /// Hip-to-tip distance at a given knee bend, by the law of cosines.
    #[must_use]
    pub fn leg_length_at_bend(&self, bend: f64) -> f64 {
        let f = self.femur_length;
        let t = self.tibia_length;
        (f * f + t * t + 2.0 * f * t * bend.cos()).sqrt()
    }

    /// Resolved minimum leg length.
    #[must_use]
    pub fn resolved_min_leg_length(&self) -> f64 {
        self.min_leg_length
            .unwrap_or_else(|| self.leg_length_at_bend(self.max_knee_bend))
    }

    /// Resolved maximum leg length.
    #[must_use]
    pub fn resolved_max_leg_length(&self) -> f64 {
        self.max_leg_length
            .unwrap_or_else(|| self.leg_length_at_bend(self.min_knee_bend.max(0.0)))
    }
}

impl Default for LegGeometryConfig {
    fn default() -> Self {
        Self {
            hip_length: default_hip_length(),
            femur_length: default_femur_length(),
            tibia_length: default_tibia_length(),
            min_hip_lift: default_min_hip_lift(),
            max_hip_lift: default_max_hip_lift(),
            min_knee_bend: default_min_knee_bend(),
            max_knee_bend: default_max_knee_bend(),
            min_leg_length: None,
            max_leg_length: None,
            stance_leg_yaw: default_stance_leg_yaw(),
            yaw_limit_around_stance: default_yaw_limit(),
            root_offset: default_root_offset(),
        }
    }
}

// ---------------------------------------------------------------------------
// ControllerConfig
// ---------------------------------------------------------------------------

/// Complete controller configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ControllerConfig {
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub walk: WalkConfig,
    #[serde(default)]
    pub gait: GaitConfig,
    #[serde(default)]
    pub impedance: ImpedanceConfig,
    #[serde(default)]
    pub legs: LegGeometryConfig,
}

impl ControllerConfig {
    /// Parse from a TOML string and validate.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file and validate.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Check every init-time precondition. Returns the first violation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.timing;
        if t.time_delta <= 0.0 {
            return Err(ConfigError::invalid("time_delta", "must be > 0"));
        }
        if t.integrator_step_time <= 0.0 {
            return Err(ConfigError::invalid("integrator_step_time", "must be > 0"));
        }

        let w = &self.walk;
        if w.step_frequency <= 0.0 {
            return Err(ConfigError::invalid("step_frequency", "must be > 0"));
        }
        if !(0.0..1.0).contains(&w.step_clearance) {
            return Err(ConfigError::invalid("step_clearance", "must be in [0, 1)"));
        }
        if w.body_clearance != BODY_CLEARANCE_AUTO && !(0.0..1.0).contains(&w.body_clearance) {
            return Err(ConfigError::invalid(
                "body_clearance",
                "must be in [0, 1) or -1 for automatic",
            ));
        }
        if w.step_curvature_allowance < 0.0 {
            return Err(ConfigError::invalid(
                "step_curvature_allowance",
                "must be >= 0",
            ));
        }
        if w.leg_span_scale <= 0.0 || w.leg_span_scale > 1.0 {
            return Err(ConfigError::invalid("leg_span_scale", "must be in (0, 1]"));
        }
        if w.max_acceleration <= 0.0 {
            return Err(ConfigError::invalid("max_acceleration", "must be > 0"));
        }
        if w.max_curvature_speed <= 0.0 {
            return Err(ConfigError::invalid("max_curvature_speed", "must be > 0"));
        }

        let g = &self.gait;
        if g.stance_phase <= 0 || g.stance_phase % 2 != 0 {
            return Err(ConfigError::invalid(
                "stance_phase",
                "must be a positive even integer",
            ));
        }
        if g.swing_phase <= 0 {
            return Err(ConfigError::invalid("swing_phase", "must be > 0"));
        }
        if g.transition_period < 0 {
            return Err(ConfigError::invalid("transition_period", "must be >= 0"));
        }
        if g.phase_offset < 0 {
            return Err(ConfigError::invalid("phase_offset", "must be >= 0"));
        }
        if g.offset_multiplier.iter().any(|&m| m < 0) {
            return Err(ConfigError::invalid("offset_multiplier", "must be >= 0"));
        }

        let i = &self.impedance;
        if i.virtual_mass <= 0.0 {
            return Err(ConfigError::invalid("virtual_mass", "must be > 0"));
        }
        if i.virtual_stiffness <= 0.0 {
            return Err(ConfigError::invalid("virtual_stiffness", "must be > 0"));
        }
        if i.virtual_damping_ratio <= 0.0 {
            return Err(ConfigError::invalid("virtual_damping_ratio", "must be > 0"));
        }
        if i.force_gain < 0.0 {
            return Err(ConfigError::invalid("force_gain", "must be >= 0"));
        }

        let l = &self.legs;
        if l.hip_length < 0.0 {
            return Err(ConfigError::invalid("hip_length", "must be >= 0"));
        }
        if l.femur_length <= 0.0 {
            return Err(ConfigError::invalid("femur_length", "must be > 0"));
        }
        if l.tibia_length <= 0.0 {
            return Err(ConfigError::invalid("tibia_length", "must be > 0"));
        }
        if l.min_hip_lift >= l.max_hip_lift {
            return Err(ConfigError::invalid(
                "min_hip_lift",
                "must be below max_hip_lift",
            ));
        }
        if l.min_knee_bend >= l.max_knee_bend {
            return Err(ConfigError::invalid(
                "min_knee_bend",
                "must be below max_knee_bend",
            ));
        }
        if l.resolved_min_leg_length() >= l.resolved_max_leg_length() {
            return Err(ConfigError::invalid(
                "min_leg_length",
                "must be below max_leg_length",
            ));
        }
        if l.yaw_limit_around_stance.iter().any(|&y| y <= 0.0) {
            return Err(ConfigError::invalid(
                "yaw_limit_around_stance",
                "must be > 0",
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn defaults_validate() {
        assert!(ControllerConfig::default().validate().is_ok());
    }

    #[test]
    fn default_gait_base_length() {
        let gait = GaitConfig::default();
        assert_eq!(gait.base_phase_length(), 8);
    }

    #[test]
    fn empty_toml_gives_defaults() {
        let config = ControllerConfig::from_toml_str("").unwrap();
        assert_eq!(config, ControllerConfig::default());
    }

    #[test]
    fn toml_overrides_fields() {
        let config = ControllerConfig::from_toml_str(
            r"
            [timing]
            time_delta = 0.01

            [walk]
            step_frequency = 2.0
            body_clearance = 0.6

            [gait]
            stance_phase = 6
            ",
        )
        .unwrap();
        assert_relative_eq!(config.timing.time_delta, 0.01);
        assert_relative_eq!(config.walk.step_frequency, 2.0);
        assert_relative_eq!(config.walk.body_clearance, 0.6);
        assert_eq!(config.gait.stance_phase, 6);
        // Untouched sections keep defaults.
        assert_eq!(config.gait.swing_phase, 2);
    }

    #[test]
    fn unknown_keys_rejected() {
        let result = ControllerConfig::from_toml_str(
            r"
            [walk]
            step_frequenzy = 2.0
            ",
        );
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn invalid_time_delta_rejected() {
        let result = ControllerConfig::from_toml_str(
            r"
            [timing]
            time_delta = 0.0
            ",
        );
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn odd_stance_phase_rejected() {
        let result = ControllerConfig::from_toml_str(
            r"
            [gait]
            stance_phase = 5
            ",
        );
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn body_clearance_sentinel_accepted() {
        let config = ControllerConfig::from_toml_str(
            r"
            [walk]
            body_clearance = -1.0
            ",
        )
        .unwrap();
        assert_relative_eq!(config.walk.body_clearance, BODY_CLEARANCE_AUTO);
    }

    #[test]
    fn body_clearance_out_of_range_rejected() {
        let result = ControllerConfig::from_toml_str(
            r"
            [walk]
            body_clearance = 1.2
            ",
        );
        assert!(result.is_err());
    }

    #[test]
    fn leg_length_limits_derived_from_knee_bend() {
        let legs = LegGeometryConfig::default();
        // Nearly straight leg: close to femur + tibia.
        assert!(legs.resolved_max_leg_length() > 0.39);
        assert!(legs.resolved_max_leg_length() <= 0.4);
        // Fully bent leg is much shorter.
        assert!(legs.resolved_min_leg_length() < 0.2);
        assert!(legs.resolved_min_leg_length() > 0.0);
    }

    #[test]
    fn explicit_leg_lengths_take_precedence() {
        let config = ControllerConfig::from_toml_str(
            r"
            [legs]
            min_leg_length = 0.11
            max_leg_length = 0.38
            ",
        )
        .unwrap();
        assert_relative_eq!(config.legs.resolved_min_leg_length(), 0.11);
        assert_relative_eq!(config.legs.resolved_max_leg_length(), 0.38);
    }
}
