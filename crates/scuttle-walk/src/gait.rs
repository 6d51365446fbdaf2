//! Gait timing quantisation.
//!
//! Gait patterns are written in small integer base units (stance, swing and
//! transition lengths). At init they are scaled to a whole number of control
//! ticks such that the swing spans an integer, even number of ticks, and the
//! step frequency is adjusted to match the quantised cycle exactly.

use scuttle_core::config::GaitConfig;
use scuttle_core::error::GaitError;
use scuttle_core::math::round_to_even;
use scuttle_core::types::{StepState, LEG_COUNT};

/// Quantised gait timing shared by all legs.
#[derive(Debug, Clone)]
pub struct GaitTiming {
    /// Ticks per full step cycle.
    pub phase_length: i32,
    /// End of the leading stance half, exclusive.
    pub stance_end: i32,
    /// First tick of the swing band.
    pub swing_start: i32,
    /// One past the last tick of the swing band.
    pub swing_end: i32,
    /// First tick of the trailing stance.
    pub stance_start: i32,
    /// Cycle length in base phase units.
    pub base_phase_length: i32,
    /// Step frequency after quantisation, Hz.
    pub step_frequency: f64,
    /// Fraction of the cycle spent in swing plus one transition.
    pub swing_ratio: f64,
    /// Per-leg phase offsets into the cycle, in leg storage order.
    pub phase_offsets: [i32; LEG_COUNT],
}

impl GaitTiming {
    /// Quantise a gait pattern to the control tick.
    pub fn derive(
        gait: &GaitConfig,
        requested_frequency: f64,
        time_delta: f64,
    ) -> Result<Self, GaitError> {
        let base = gait.base_phase_length();
        let swing_ratio = f64::from(gait.swing_phase + gait.transition_period) / f64::from(base);

        // Scale the cycle so the swing covers an integer number of ticks at
        // the requested frequency, then take the frequency the quantised
        // cycle actually delivers.
        let half_cycle_ticks = 1.0 / (2.0 * requested_frequency * time_delta);
        let quantum = f64::from(base) * swing_ratio;
        #[allow(clippy::cast_possible_truncation)]
        let phase_length = ((half_cycle_ticks / quantum).round() as i32) * base;
        if phase_length <= 0 {
            return Err(GaitError::NonPositivePhaseLength(phase_length));
        }
        if phase_length % base != 0 {
            return Err(GaitError::PhaseLengthNotDivisible { phase_length, base });
        }
        let step_frequency = 1.0 / (f64::from(phase_length) * time_delta);

        let normaliser = phase_length / base;
        let stance_end = gait.stance_phase / 2 * normaliser;
        let swing_start = stance_end + gait.transition_period * normaliser;
        let swing_end = swing_start + gait.swing_phase * normaliser;
        let stance_start = swing_end + gait.transition_period * normaliser;

        let mut phase_offsets = [0; LEG_COUNT];
        for (offset, &multiplier) in phase_offsets.iter_mut().zip(&gait.offset_multiplier) {
            *offset = (gait.phase_offset * normaliser * multiplier).rem_euclid(phase_length);
        }

        Ok(Self {
            phase_length,
            stance_end,
            swing_start,
            swing_end,
            stance_start,
            base_phase_length: base,
            step_frequency,
            swing_ratio,
            phase_offsets,
        })
    }

    /// Ticks spent in the swing band.
    #[must_use]
    pub const fn swing_ticks(&self) -> i32 {
        self.swing_end - self.swing_start
    }

    /// Fraction of the cycle the foot is on the ground.
    #[must_use]
    pub fn on_ground_ratio(&self) -> f64 {
        f64::from(self.phase_length - self.swing_ticks()) / f64::from(self.phase_length)
    }

    /// Number of iterations a swing is divided into, forced even so the
    /// halfway handover between the two swing curves lands on a tick.
    #[must_use]
    pub fn swing_iterations(&self, time_delta: f64) -> i32 {
        let per_cycle = f64::from(self.swing_ticks()) / f64::from(self.phase_length);
        round_to_even(per_cycle / (self.step_frequency * time_delta))
    }

    /// Step state implied by a phase value, ignoring forced states.
    #[must_use]
    pub const fn step_state_for_phase(&self, phase: i32) -> StepState {
        if phase >= self.stance_end && phase < self.swing_start {
            StepState::SwingTransition
        } else if phase >= self.swing_start && phase < self.swing_end {
            StepState::Swing
        } else if phase >= self.swing_end && phase < self.stance_start {
            StepState::StanceTransition
        } else {
            StepState::Stance
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn tripod() -> GaitConfig {
        GaitConfig::default()
    }

    // ---- quantisation ----

    #[test]
    fn tripod_quantisation_at_50hz_tick() {
        // stance 4, swing 2, transition 1 → base 8, swing ratio 3/8.
        let timing = GaitTiming::derive(&tripod(), 1.0, 0.02).unwrap();
        assert_eq!(timing.base_phase_length, 8);
        assert_relative_eq!(timing.swing_ratio, 0.375);
        assert_eq!(timing.phase_length, 64);
        assert_eq!(timing.phase_length % timing.base_phase_length, 0);
        // Frequency adjusted to the quantised cycle.
        assert_relative_eq!(
            timing.step_frequency,
            1.0 / (64.0 * 0.02),
            epsilon = 1e-12
        );
        // The swing-plus-transition band lands within one tick of the
        // requested half cycle.
        let band_secs = f64::from(timing.phase_length) * timing.swing_ratio * 0.02;
        assert!((band_secs - 0.5).abs() <= 0.02 + 1e-12);
    }

    #[test]
    fn boundaries_scale_with_normaliser() {
        let timing = GaitTiming::derive(&tripod(), 1.0, 0.02).unwrap();
        // normaliser = 64 / 8 = 8.
        assert_eq!(timing.stance_end, 16);
        assert_eq!(timing.swing_start, 24);
        assert_eq!(timing.swing_end, 40);
        assert_eq!(timing.stance_start, 48);
    }

    #[test]
    fn phase_length_divisible_across_configs() {
        for (stance, swing, transition) in [(4, 2, 1), (6, 2, 0), (2, 2, 2), (10, 4, 1)] {
            for frequency in [0.5, 1.0, 2.0] {
                let gait = GaitConfig {
                    stance_phase: stance,
                    swing_phase: swing,
                    transition_period: transition,
                    ..GaitConfig::default()
                };
                let timing = GaitTiming::derive(&gait, frequency, 0.02).unwrap();
                assert_eq!(
                    timing.phase_length % gait.base_phase_length(),
                    0,
                    "stance {stance} swing {swing} transition {transition} at {frequency} Hz"
                );
            }
        }
    }

    #[test]
    fn too_fast_frequency_is_an_error() {
        // At 1 kHz steps and a 20 ms tick the cycle quantises to zero ticks.
        let result = GaitTiming::derive(&tripod(), 1000.0, 0.02);
        assert!(matches!(result, Err(GaitError::NonPositivePhaseLength(_))));
    }

    // ---- offsets ----

    #[test]
    fn tripod_offsets_split_half_cycle() {
        let timing = GaitTiming::derive(&tripod(), 1.0, 0.02).unwrap();
        // phase_offset 4 × normaliser 8 = 32 for multiplier-one legs.
        assert_eq!(timing.phase_offsets, [0, 32, 32, 0, 0, 32]);
    }

    #[test]
    fn offsets_wrap_into_cycle() {
        let gait = GaitConfig {
            phase_offset: 20,
            offset_multiplier: [0, 1, 2, 3, 4, 5],
            ..GaitConfig::default()
        };
        let timing = GaitTiming::derive(&gait, 1.0, 0.02).unwrap();
        for offset in timing.phase_offsets {
            assert!(offset >= 0 && offset < timing.phase_length);
        }
    }

    // ---- phase bands ----

    #[test]
    fn step_state_bands() {
        let timing = GaitTiming::derive(&tripod(), 1.0, 0.02).unwrap();
        assert_eq!(timing.step_state_for_phase(0), StepState::Stance);
        assert_eq!(timing.step_state_for_phase(16), StepState::SwingTransition);
        assert_eq!(timing.step_state_for_phase(24), StepState::Swing);
        assert_eq!(timing.step_state_for_phase(39), StepState::Swing);
        assert_eq!(timing.step_state_for_phase(40), StepState::StanceTransition);
        assert_eq!(timing.step_state_for_phase(48), StepState::Stance);
        assert_eq!(timing.step_state_for_phase(63), StepState::Stance);
    }

    // ---- derived quantities ----

    #[test]
    fn on_ground_ratio_complements_swing() {
        let timing = GaitTiming::derive(&tripod(), 1.0, 0.02).unwrap();
        assert_relative_eq!(timing.on_ground_ratio(), (64.0 - 16.0) / 64.0);
    }

    #[test]
    fn swing_iterations_even_and_match_band() {
        let timing = GaitTiming::derive(&tripod(), 1.0, 0.02).unwrap();
        let iterations = timing.swing_iterations(0.02);
        assert_eq!(iterations % 2, 0);
        // With the adjusted frequency the iteration count equals the band
        // width in ticks.
        assert_eq!(iterations, timing.swing_ticks());
    }
}
