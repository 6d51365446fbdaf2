//! Nominal stance footprint derivation.
//!
//! At init the controller works out, from joint limits alone, how high the
//! body can sit, where each foot should rest, and the largest disc each
//! foot can sweep without leaving its reachable pie segment. The smallest
//! disc across the rows bounds the stride of every leg.

use nalgebra::Vector3;
use scuttle_core::config::{LegGeometryConfig, WalkConfig, BODY_CLEARANCE_AUTO};
use scuttle_core::error::WorkspaceError;
use scuttle_core::math::solve_quadratic;
use scuttle_core::types::{LegId, Side, LEG_COUNT, ROW_COUNT};
use std::f64::consts::FRAC_PI_2;

/// The step cycle overshoots the ground footprint to hold velocity through
/// the transitions, so the usable disc is smaller than the geometric one.
const FOOTPRINT_DOWNSCALE: f64 = 0.8;

/// Stance geometry derived once at initialisation.
#[derive(Debug, Clone)]
pub struct StanceWorkspace {
    /// Highest body height the legs can reach, metres.
    pub max_body_height: f64,
    /// Resolved body clearance as a fraction of `max_body_height`.
    pub body_clearance: f64,
    /// Swing apex height above the default tip, metres.
    pub swing_height: f64,
    /// Radius of the largest disc every foot can sweep in stance.
    pub min_footprint_radius: f64,
    /// Lateral distance of the middle-row feet, used to relate curvature
    /// to angular velocity.
    pub stance_radius: f64,
    /// Hip-to-foot spread per row.
    pub foot_spread: [f64; ROW_COUNT],
    /// Nominal foot positions in the body frame, by leg storage index.
    pub identity_tip_positions: [Vector3<f64>; LEG_COUNT],
}

impl StanceWorkspace {
    /// Derive the footprint from leg geometry and walk parameters.
    ///
    /// Every infeasibility here is fatal: a configuration that cannot
    /// stand or step as requested must not enter the control loop.
    pub fn derive(legs: &LegGeometryConfig, walk: &WalkConfig) -> Result<Self, WorkspaceError> {
        let femur = legs.femur_length;
        let tibia = legs.tibia_length;
        let min_knee = legs.min_knee_bend.max(0.0);
        let min_leg_length = legs.resolved_min_leg_length();
        let max_leg_length = legs.resolved_max_leg_length();

        // Steepest usable femur angle: the hip limit, or the drop at which
        // the straightened knee already points the tibia at the ground.
        let max_hip_drop = (-legs.min_hip_lift)
            .min(FRAC_PI_2 - (tibia * min_knee.sin()).atan2(femur + tibia * min_knee.cos()));

        let max_body_height = femur * max_hip_drop.sin()
            + tibia
                * (max_hip_drop + (FRAC_PI_2 - max_hip_drop).clamp(min_knee, legs.max_knee_bend))
                    .sin();

        let swing_height = walk.step_clearance * max_body_height;
        if swing_height > 2.0 * femur {
            return Err(WorkspaceError::SwingHeightUnreachable {
                required: swing_height,
                limit: 2.0 * femur,
            });
        }

        let body_clearance = if walk.body_clearance == BODY_CLEARANCE_AUTO {
            // Best circular footprint for the requested step clearance,
            // assuming all legs share the same geometry.
            min_leg_length / max_body_height
                + walk.step_curvature_allowance * walk.step_clearance
        } else {
            walk.body_clearance
        };
        if !(0.0..1.0).contains(&body_clearance) {
            return Err(WorkspaceError::BodyClearanceOutOfRange(body_clearance));
        }
        let stance_height = body_clearance * max_body_height;

        let mut min_footprint_radius = f64::INFINITY;
        let mut foot_spread = [0.0; ROW_COUNT];
        let mut identity_tip_positions = [Vector3::zeros(); LEG_COUNT];

        for row in 0..ROW_COUNT {
            // Downward angle of a straight leg touching the ground.
            let drop_ratio = stance_height / max_leg_length;
            let leg_drop = if drop_ratio >= 1.0 {
                FRAC_PI_2
            } else {
                drop_ratio.asin()
            };

            let mut radius = f64::INFINITY;
            let mut horizontal_range;
            if leg_drop > -legs.min_hip_lift {
                // The leg cannot be straight at this height; the tibia alone
                // must make up the difference below the lowest femur angle.
                let extra_height = stance_height - femur * (-legs.min_hip_lift).sin();
                if extra_height > tibia {
                    return Err(WorkspaceError::StanceHeightUnreachable {
                        row,
                        extra_height,
                        tibia_length: tibia,
                    });
                }
                radius = (tibia * tibia - extra_height * extra_height).sqrt();
                horizontal_range = femur * (-legs.min_hip_lift).cos() + radius;
            } else {
                horizontal_range =
                    (max_leg_length * max_leg_length - stance_height * stance_height).sqrt();
            }
            horizontal_range *= walk.leg_span_scale;

            // Largest disc inscribed in the yaw pie segment.
            let theta = legs.yaw_limit_around_stance[row];
            let cotan_theta = (FRAC_PI_2 - theta).tan();
            let sector_radius = solve_quadratic(
                cotan_theta * cotan_theta,
                2.0 * horizontal_range,
                -horizontal_range * horizontal_range,
            )
            .ok_or(WorkspaceError::SectorUnsolvable { row })?;
            radius = radius.min(sector_radius);
            if radius <= 0.0 {
                return Err(WorkspaceError::FootprintRadiusNonPositive { row, radius });
            }

            // Shrink further if the shortest leg cannot reach the lifted
            // position over the near edge of the disc.
            let lifted_clearance = (body_clearance
                - walk.step_curvature_allowance * walk.step_clearance)
                .max(0.0)
                * max_body_height;
            if lifted_clearance < min_leg_length {
                let near_reach =
                    (min_leg_length * min_leg_length - lifted_clearance * lifted_clearance).sqrt();
                radius = radius.min((horizontal_range - near_reach) / 2.0);
            }
            if radius <= 0.0 {
                return Err(WorkspaceError::FootprintRadiusNonPositive { row, radius });
            }

            foot_spread[row] = legs.hip_length + horizontal_range - radius;
            min_footprint_radius = min_footprint_radius.min(radius * FOOTPRINT_DOWNSCALE);

            let yaw = legs.stance_leg_yaw[row];
            let offset = legs.root_offset[row];
            for side in [Side::Left, Side::Right] {
                let id = LegId { row, side };
                let mut tip = Vector3::new(offset[0], offset[1], offset[2])
                    + foot_spread[row] * Vector3::new(yaw.cos(), yaw.sin(), 0.0)
                    + Vector3::new(0.0, 0.0, -stance_height);
                tip.x *= id.mirror_dir();
                identity_tip_positions[id.index()] = tip;
            }
        }

        // Adjacent discs must not overlap; split any overlap between them.
        let mut min_gap = f64::INFINITY;
        for side in [Side::Left, Side::Right] {
            for rows in [(0, 1), (1, 2)] {
                let a = identity_tip_positions[LegId { row: rows.0, side }.index()];
                let b = identity_tip_positions[LegId { row: rows.1, side }.index()];
                let mut diff = b - a;
                diff.z = 0.0;
                min_gap = min_gap.min(diff.norm() - 2.0 * min_footprint_radius);
            }
        }
        if min_gap < 0.0 {
            min_footprint_radius += min_gap * 0.5;
        }

        let stance_radius =
            identity_tip_positions[LegId { row: 1, side: Side::Right }.index()].x.abs();

        Ok(Self {
            max_body_height,
            body_clearance,
            swing_height,
            min_footprint_radius,
            stance_radius,
            foot_spread,
            identity_tip_positions,
        })
    }

    /// Resolved body height above the ground.
    #[must_use]
    pub fn stance_height(&self) -> f64 {
        self.body_clearance * self.max_body_height
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn derive_default() -> StanceWorkspace {
        StanceWorkspace::derive(&LegGeometryConfig::default(), &WalkConfig::default()).unwrap()
    }

    #[test]
    fn default_geometry_is_feasible() {
        let ws = derive_default();
        assert!(ws.max_body_height > 0.0);
        assert!((0.0..1.0).contains(&ws.body_clearance));
        assert!(ws.min_footprint_radius > 0.0);
        assert!(ws.stance_radius > 0.0);
        for spread in ws.foot_spread {
            assert!(spread > 0.0);
        }
    }

    #[test]
    fn auto_body_clearance_keeps_lifted_feet_reachable() {
        // The automatic clearance is chosen so the shortest leg exactly
        // reaches the lifted tip position.
        let legs = LegGeometryConfig::default();
        let ws = derive_default();
        let walk = WalkConfig::default();
        let lifted =
            (ws.body_clearance - walk.step_curvature_allowance * walk.step_clearance)
                * ws.max_body_height;
        assert!((lifted - legs.resolved_min_leg_length()).abs() < 1e-9);
    }

    #[test]
    fn identity_feet_mirror_across_the_body() {
        let ws = derive_default();
        for row in 0..ROW_COUNT {
            let left = ws.identity_tip_positions[LegId { row, side: Side::Left }.index()];
            let right = ws.identity_tip_positions[LegId { row, side: Side::Right }.index()];
            assert!((left.x + right.x).abs() < 1e-12);
            assert!((left.y - right.y).abs() < 1e-12);
            assert!((left.z - right.z).abs() < 1e-12);
        }
    }

    #[test]
    fn identity_feet_sit_at_stance_height() {
        let ws = derive_default();
        for tip in ws.identity_tip_positions {
            assert!((tip.z + ws.stance_height()).abs() < 1e-12);
        }
    }

    #[test]
    fn footprints_are_disjoint() {
        let ws = derive_default();
        for (i, a) in ws.identity_tip_positions.iter().enumerate() {
            for b in ws.identity_tip_positions.iter().skip(i + 1) {
                let mut diff = b - a;
                diff.z = 0.0;
                assert!(diff.norm() >= 2.0 * ws.min_footprint_radius - 1e-9);
            }
        }
    }

    #[test]
    fn overlapping_rows_shrink_the_footprint() {
        // Pull the rows together so the geometric discs overlap.
        let legs = LegGeometryConfig {
            root_offset: [[0.12, 0.05, 0.0], [0.15, 0.0, 0.0], [0.12, -0.05, 0.0]],
            stance_leg_yaw: [0.1, 0.0, -0.1],
            ..LegGeometryConfig::default()
        };
        let ws = StanceWorkspace::derive(&legs, &WalkConfig::default()).unwrap();
        let unshrunk =
            StanceWorkspace::derive(&LegGeometryConfig::default(), &WalkConfig::default())
                .unwrap();
        assert!(ws.min_footprint_radius < unshrunk.min_footprint_radius);
        // The disjointness guarantee still holds for row neighbours.
        for side in [Side::Left, Side::Right] {
            for rows in [(0, 1), (1, 2)] {
                let a = ws.identity_tip_positions[LegId { row: rows.0, side }.index()];
                let b = ws.identity_tip_positions[LegId { row: rows.1, side }.index()];
                let mut diff = b - a;
                diff.z = 0.0;
                assert!(diff.norm() >= 2.0 * ws.min_footprint_radius - 1e-9);
            }
        }
    }

    #[test]
    fn excessive_step_clearance_is_fatal() {
        // A stubby femur cannot lift the swing apex this high.
        let legs = LegGeometryConfig {
            femur_length: 0.05,
            tibia_length: 0.35,
            ..LegGeometryConfig::default()
        };
        let walk = WalkConfig {
            step_clearance: 0.3,
            ..WalkConfig::default()
        };
        let err = StanceWorkspace::derive(&legs, &walk).unwrap_err();
        assert!(matches!(err, WorkspaceError::SwingHeightUnreachable { .. }));
    }

    #[test]
    fn runaway_auto_clearance_is_fatal() {
        let walk = WalkConfig {
            step_curvature_allowance: 10.0,
            ..WalkConfig::default()
        };
        let err = StanceWorkspace::derive(&LegGeometryConfig::default(), &walk).unwrap_err();
        assert!(matches!(err, WorkspaceError::BodyClearanceOutOfRange(_)));
    }
}
