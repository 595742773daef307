//! Cross-view coordinate synchronization.
//!
//! The top-down handle and the front-view highlight volume live in two
//! independently framed scenes. Because both models are normalized to the
//! same horizontal extent, a per-axis linear map is all that separates their
//! ground coordinates.

use glam::Vec3;

use crate::highlight::HighlightVolume;

/// Height above the front-view ground at which the synchronized volume sits.
pub const SYNC_LIFT_Y: f32 = 0.3;

/// Per-axis linear map between the two ground planes. With unit scales and
/// no inversion the map is exact, bit for bit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateMapping {
    pub scale_x: f32,
    pub scale_z: f32,
    pub invert_x: bool,
    pub invert_z: bool,
}

impl Default for CoordinateMapping {
    fn default() -> Self {
        CoordinateMapping {
            scale_x: 1.0,
            scale_z: 1.0,
            invert_x: false,
            invert_z: false,
        }
    }
}

impl CoordinateMapping {
    pub fn apply(&self, x: f32, z: f32) -> (f32, f32) {
        let sign_x = if self.invert_x { -1.0 } else { 1.0 };
        let sign_z = if self.invert_z { -1.0 } else { 1.0 };
        (x * self.scale_x * sign_x, z * self.scale_z * sign_z)
    }
}

#[derive(Debug, Clone)]
pub struct Synchronizer {
    mapping: CoordinateMapping,
    lift_y: f32,
}

impl Synchronizer {
    pub fn new(mapping: CoordinateMapping) -> Self {
        Synchronizer {
            mapping,
            lift_y: SYNC_LIFT_Y,
        }
    }

    pub fn mapping(&self) -> CoordinateMapping {
        self.mapping
    }

    pub fn target_position(&self, x: f32, z: f32) -> Vec3 {
        let (mapped_x, mapped_z) = self.mapping.apply(x, z);
        Vec3::new(mapped_x, self.lift_y, mapped_z)
    }

    /// Pushes one handle position into the highlight volume. Called once per
    /// position event and once at startup with the handle's initial spot.
    pub fn push(&self, x: f32, z: f32, volume: &mut HighlightVolume) {
        volume.set_position(self.target_position(x, z));
    }
}

#[cfg(test)]
mod sync_tests {
    use super::*;

    #[test]
    fn identity_mapping_is_bit_exact() {
        let mapping = CoordinateMapping::default();
        let (x, z) = mapping.apply(2.5, -1.0);
        assert_eq!(x, 2.5);
        assert_eq!(z, -1.0);
    }

    #[test]
    fn inversion_negates_only_the_flagged_axis() {
        let mapping = CoordinateMapping {
            invert_x: true,
            ..CoordinateMapping::default()
        };
        let (x, z) = mapping.apply(2.5, -1.0);
        assert_eq!(x, -2.5);
        assert_eq!(z, -1.0);
    }

    #[test]
    fn scales_apply_per_axis() {
        let mapping = CoordinateMapping {
            scale_x: 2.0,
            scale_z: 0.5,
            invert_x: false,
            invert_z: true,
        };
        let (x, z) = mapping.apply(3.0, 4.0);
        assert!((x - 6.0).abs() < 1e-6);
        assert!((z - (-2.0)).abs() < 1e-6);
    }

    #[test]
    fn push_lands_at_the_fixed_lift_height() {
        let synchronizer = Synchronizer::new(CoordinateMapping::default());
        let mut volume = HighlightVolume::default();
        synchronizer.push(2.5, -1.0, &mut volume);
        assert_eq!(volume.position(), Vec3::new(2.5, SYNC_LIFT_Y, -1.0));
    }

    #[test]
    fn mapping_is_stateless_across_pushes() {
        let synchronizer = Synchronizer::new(CoordinateMapping::default());
        let mut volume = HighlightVolume::default();
        synchronizer.push(1.0, 1.0, &mut volume);
        synchronizer.push(1.0, 1.0, &mut volume);
        assert_eq!(volume.position(), Vec3::new(1.0, SYNC_LIFT_Y, 1.0));
    }
}
