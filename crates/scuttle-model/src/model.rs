//! The six-legged model container.

use scuttle_core::config::LegGeometryConfig;
use scuttle_core::types::{LegId, LEG_COUNT};

use crate::leg::Leg;

/// All six legs, indexed by [`LegId::index`].
#[derive(Debug, Clone)]
pub struct HexapodModel {
    legs: [Leg; LEG_COUNT],
}

impl HexapodModel {
    /// Build the model from shared leg geometry.
    #[must_use]
    pub fn from_config(config: &LegGeometryConfig) -> Self {
        Self {
            legs: LegId::ALL.map(|id| Leg::from_config(id, config)),
        }
    }

    #[must_use]
    pub fn leg(&self, id: LegId) -> &Leg {
        &self.legs[id.index()]
    }

    pub fn leg_mut(&mut self, id: LegId) -> &mut Leg {
        &mut self.legs[id.index()]
    }

    pub fn legs(&self) -> impl Iterator<Item = &Leg> {
        self.legs.iter()
    }

    pub fn legs_mut(&mut self) -> impl Iterator<Item = &mut Leg> {
        self.legs.iter_mut()
    }

    /// Clamp every leg's joint targets to their limits.
    pub fn clamp_all_to_limits(&mut self) {
        for leg in &mut self.legs {
            leg.clamp_to_limits();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scuttle_core::types::Side;

    #[test]
    fn model_has_six_legs_in_index_order() {
        let model = HexapodModel::from_config(&LegGeometryConfig::default());
        assert_eq!(model.legs().count(), LEG_COUNT);
        for id in LegId::ALL {
            assert_eq!(model.leg(id).id(), id);
        }
    }

    #[test]
    fn leg_mut_reaches_the_same_leg() {
        let mut model = HexapodModel::from_config(&LegGeometryConfig::default());
        let id = LegId { row: 2, side: Side::Right };
        model.leg_mut(id).set_delta_z(0.01);
        assert!((model.leg(id).delta_z() - 0.01).abs() < f64::EPSILON);
    }
}
