//! Leg identity, walk/step cycle states and the body pose accumulator.

use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of legs on the robot. Three rows, two sides.
pub const LEG_COUNT: usize = 6;

/// Number of leg rows (front, middle, rear).
pub const ROW_COUNT: usize = 3;

// ---------------------------------------------------------------------------
// Side / LegId
// ---------------------------------------------------------------------------

/// Body side of a leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    /// Mirror factor applied to lateral (x) coordinates. Right is the
    /// reference side (+1), left mirrors (−1).
    #[must_use]
    pub const fn mirror_dir(self) -> f64 {
        match self {
            Self::Right => 1.0,
            Self::Left => -1.0,
        }
    }
}

/// Identifies one of the six legs by row (0 = front, 2 = rear) and side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LegId {
    pub row: usize,
    pub side: Side,
}

impl LegId {
    /// All legs in storage order: per row, left before right.
    pub const ALL: [Self; LEG_COUNT] = [
        Self { row: 0, side: Side::Left },
        Self { row: 0, side: Side::Right },
        Self { row: 1, side: Side::Left },
        Self { row: 1, side: Side::Right },
        Self { row: 2, side: Side::Left },
        Self { row: 2, side: Side::Right },
    ];

    /// The front-left leg, which has special duties during shutdown.
    pub const FRONT_LEFT: Self = Self { row: 0, side: Side::Left };

    /// Flat storage index in `[0, LEG_COUNT)`.
    #[must_use]
    pub const fn index(self) -> usize {
        self.row * 2
            + match self.side {
                Side::Left => 0,
                Side::Right => 1,
            }
    }

    /// Position on the body-perimeter ring, clockwise from the front-right
    /// leg: right side front to rear, then left side rear to front.
    #[must_use]
    pub const fn ring(self) -> usize {
        match self.side {
            Side::Right => self.row,
            Side::Left => LEG_COUNT - 1 - self.row,
        }
    }

    /// Leg at the given ring position.
    #[must_use]
    pub const fn from_ring(ring: usize) -> Self {
        if ring < ROW_COUNT {
            Self { row: ring, side: Side::Right }
        } else {
            Self { row: LEG_COUNT - 1 - ring, side: Side::Left }
        }
    }

    /// The two cyclically adjacent legs on the perimeter ring.
    ///
    /// Uses a non-negative modulus so the predecessor of ring position 0 is
    /// position 5 rather than an out-of-range negative index.
    #[must_use]
    pub fn adjacent(self) -> (Self, Self) {
        let ring = self.ring() as i64;
        let count = LEG_COUNT as i64;
        let prev = (ring - 1).rem_euclid(count) as usize;
        let next = (ring + 1).rem_euclid(count) as usize;
        (Self::from_ring(prev), Self::from_ring(next))
    }

    /// Mirror factor of this leg's side.
    #[must_use]
    pub const fn mirror_dir(self) -> f64 {
        self.side.mirror_dir()
    }
}

impl fmt::Display for LegId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let row = match self.row {
            0 => "front",
            1 => "middle",
            _ => "rear",
        };
        let side = match self.side {
            Side::Left => "left",
            Side::Right => "right",
        };
        write!(f, "{row}_{side}")
    }
}

// ---------------------------------------------------------------------------
// WalkState / StepState / LegMode
// ---------------------------------------------------------------------------

/// Global walk cycle state of the whole robot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WalkState {
    /// Velocity input is zero and all legs are parked.
    #[default]
    Stopped,
    /// Transitioning from stopped to moving; legs are being admitted into
    /// their phase offsets and completing a first step.
    Starting,
    /// The primary walking state.
    Moving,
    /// Transitioning from moving to stopped; legs finish their final step.
    Stopping,
}

/// Step cycle state of an individual leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StepState {
    /// Foot in the air, progressing forward.
    Swing,
    /// Foot on the ground, regressing under the body.
    #[default]
    Stance,
    /// Phase band between stance end and swing start.
    SwingTransition,
    /// Phase band between swing end and stance start.
    StanceTransition,
    /// Stance forced on a leg whose phase offset begins mid-swing.
    ForceStance,
    /// Step cycle halted while the robot stops.
    ForceStop,
}

/// Whether a leg participates in the walk cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LegMode {
    /// Leg is driven by the walk controller.
    #[default]
    Walking,
    /// Leg is withdrawn from the cycle for external manipulation.
    Manual,
}

// ---------------------------------------------------------------------------
// Pose
// ---------------------------------------------------------------------------

/// Body pose accumulated from commanded velocities. Consumed only by
/// visualisation; the control loop never reads it back.
#[derive(Debug, Clone, PartialEq)]
pub struct Pose {
    pub position: Vector3<f64>,
    pub rotation: UnitQuaternion<f64>,
}

impl Pose {
    /// Pose at the given height above the ground, unrotated.
    #[must_use]
    pub fn at_height(height: f64) -> Self {
        Self {
            position: Vector3::new(0.0, 0.0, height),
            rotation: UnitQuaternion::identity(),
        }
    }

    /// Integrate one tick of planar body motion: `push` is the body-frame
    /// displacement, `yaw_delta` the change in heading.
    pub fn integrate(&mut self, push: nalgebra::Vector2<f64>, yaw_delta: f64) {
        self.position += self.rotation * Vector3::new(push.x, push.y, 0.0);
        self.rotation *= UnitQuaternion::from_axis_angle(&Vector3::z_axis(), yaw_delta);
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::at_height(0.0)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
