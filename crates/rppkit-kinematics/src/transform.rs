//! Coordinate transforms
//!
//! Pure functions, no state. Angles are degrees at every public boundary.

use rppkit_core::{CartesianPosition, JointState, MachineGeometry};
use serde::{Deserialize, Serialize};

/// Radial extension below which the rotation is undefined and the prior
/// rotation is kept.
pub const ROTATION_EPSILON: f64 = 1e-3;

/// Offset between slicer coordinates and device coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WorkOffset {
    /// Subtracted from slicer X
    pub x: f64,
    /// Subtracted from slicer Y
    pub y: f64,
    /// Added to slicer Z
    pub z: f64,
}

impl WorkOffset {
    /// Create an offset
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Translate a slicer position into the device frame
    pub fn apply(&self, position: CartesianPosition) -> CartesianPosition {
        CartesianPosition::new(position.x - self.x, position.y - self.y, position.z + self.z)
    }
}

/// Translate a slicer position into the device frame and check it against
/// the travel limits
///
/// Returns the translated position and whether it can be reached. Never fails.
pub fn offset_and_clamp(
    position: CartesianPosition,
    offset: &WorkOffset,
    geometry: &MachineGeometry,
) -> (CartesianPosition, bool) {
    let translated = offset.apply(position);
    let extension1 = translated.z - geometry.base_height;
    let extension2 = translated.x.hypot(translated.y);
    (translated, geometry.contains(extension1, extension2))
}

/// Map joint coordinates to the Cartesian frame
pub fn forward_kinematics(joints: &JointState, geometry: &MachineGeometry) -> CartesianPosition {
    let theta = joints.rotation.to_radians();
    CartesianPosition::new(
        joints.extension2 * theta.cos(),
        joints.extension2 * theta.sin(),
        geometry.base_height + joints.extension1,
    )
}

/// Map a Cartesian position to joint coordinates
///
/// Rotation is normalised to `[0, 360)`. On the rotation axis
/// (`extension2 < ROTATION_EPSILON`) the rotation is `prior_rotation`.
pub fn inverse_from_cartesian(
    position: CartesianPosition,
    prior_rotation: f64,
    geometry: &MachineGeometry,
) -> JointState {
    let extension2 = position.x.hypot(position.y);
    let rotation = if extension2 < ROTATION_EPSILON {
        prior_rotation
    } else {
        normalize_degrees(position.y.atan2(position.x).to_degrees())
    };
    JointState::new(rotation, position.z - geometry.base_height, extension2)
}

fn normalize_degrees(degrees: f64) -> f64 {
    let wrapped = degrees.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{} != {}", a, b);
    }

    #[test]
    fn test_forward_kinematics_axes() {
        let geometry = MachineGeometry::new(10.0, 1000.0, 1000.0);
        let p = forward_kinematics(&JointState::new(90.0, 5.0, 100.0), &geometry);
        assert_close(p.x, 0.0);
        assert_close(p.y, 100.0);
        assert_close(p.z, 15.0);
    }

    #[test]
    fn test_inverse_rotation_range() {
        let geometry = MachineGeometry::default();
        let j = inverse_from_cartesian(CartesianPosition::new(0.0, -50.0, 0.0), 0.0, &geometry);
        assert_close(j.rotation, 270.0);
        assert_close(j.extension2, 50.0);

        let j = inverse_from_cartesian(CartesianPosition::new(-1.0, -1e-18, 0.0), 0.0, &geometry);
        assert!(j.rotation >= 0.0 && j.rotation < 360.0);
    }

    #[test]
    fn test_inverse_keeps_rotation_on_axis() {
        let geometry = MachineGeometry::default();
        let j = inverse_from_cartesian(CartesianPosition::new(0.0, 0.0, 40.0), 123.0, &geometry);
        assert_close(j.rotation, 123.0);
        assert_close(j.extension1, 40.0);
    }

    #[test]
    fn test_offset_and_clamp() {
        let geometry = MachineGeometry::new(0.0, 100.0, 100.0);
        let offset = WorkOffset::new(10.0, 10.0, 5.0);

        let (p, ok) = offset_and_clamp(CartesianPosition::new(20.0, 10.0, 0.0), &offset, &geometry);
        assert!(ok);
        assert_eq!(p, CartesianPosition::new(10.0, 0.0, 5.0));

        let (_, ok) = offset_and_clamp(CartesianPosition::new(0.0, 0.0, -10.0), &offset, &geometry);
        assert!(!ok);

        let (_, ok) = offset_and_clamp(CartesianPosition::new(200.0, 10.0, 0.0), &offset, &geometry);
        assert!(!ok);
    }
}
