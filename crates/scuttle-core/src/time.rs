//! Fixed-step control clock.
//!
//! The control loop runs at a fixed `time_delta`. [`TickClock`] tracks
//! elapsed loop time as integer nanoseconds to avoid floating-point drift
//! over long runs, and an internal accumulator dispenses fixed steps from
//! irregular wall-clock deltas. Steps beyond the per-frame cap are dropped
//! and reported so a missed deadline never snowballs.

use std::time::Duration;

// ---------------------------------------------------------------------------
// TickClock
// ---------------------------------------------------------------------------

/// Fixed-timestep accumulator clock for the control loop.
#[derive(Debug, Clone)]
pub struct TickClock {
    elapsed_nanos: u64,
    accumulated: u64,
    timestep_nanos: u64,
    timestep_secs: f64,
    max_steps: u32,
    steps_this_frame: u32,
    tick_count: u64,
}

impl TickClock {
    /// Create a clock with the given fixed timestep in seconds.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn new(timestep_secs: f64) -> Self {
        Self {
            elapsed_nanos: 0,
            accumulated: 0,
            timestep_nanos: (timestep_secs * 1e9) as u64,
            timestep_secs,
            max_steps: 4,
            steps_this_frame: 0,
            tick_count: 0,
        }
    }

    /// Set the maximum number of control steps dispensed per frame.
    #[must_use]
    pub const fn with_max_steps(mut self, max_steps: u32) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Feed a wall-clock delta and reset the per-frame step counter.
    #[allow(clippy::cast_possible_truncation)]
    pub fn accumulate(&mut self, delta: Duration) {
        self.accumulated = self.accumulated.saturating_add(delta.as_nanos() as u64);
        self.steps_this_frame = 0;
    }

    /// Consume one timestep if available and under the per-frame cap.
    pub fn should_step(&mut self) -> bool {
        if self.steps_this_frame >= self.max_steps {
            return false;
        }
        if self.accumulated >= self.timestep_nanos {
            self.accumulated -= self.timestep_nanos;
            self.steps_this_frame += 1;
            self.elapsed_nanos += self.timestep_nanos;
            self.tick_count += 1;
            return true;
        }
        false
    }

    /// Drop any backlog that survived the per-frame cap, returning the
    /// number of ticks discarded. Non-zero means deadlines were missed.
    pub fn drain_backlog(&mut self) -> u64 {
        if self.timestep_nanos == 0 {
            return 0;
        }
        let dropped = self.accumulated / self.timestep_nanos;
        self.accumulated %= self.timestep_nanos;
        dropped
    }

    /// Ticks completed since construction.
    #[must_use]
    pub const fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Elapsed control-loop time in seconds.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed_nanos as f64 / 1e9
    }

    /// The fixed timestep in seconds.
    #[must_use]
    pub const fn timestep(&self) -> f64 {
        self.timestep_secs
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
