//! Object transform snapshot

use nalgebra::{Matrix4, Point3, Rotation3, Vector3};
use serde::{Deserialize, Serialize};

/// Translation, rotation and scale of a scene object, captured before a
/// destructive mutation and reapplied verbatim afterwards.
///
/// Rotation is an XYZ Euler triple in radians: X is applied first, then Y,
/// then Z, matching the host's default rotation mode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransformState {
    pub translation: Vector3<f32>,
    pub rotation: Vector3<f32>,
    pub scale: Vector3<f32>,
}

impl TransformState {
    /// Create an identity transform
    pub fn identity() -> Self {
        Self {
            translation: Vector3::zeros(),
            rotation: Vector3::zeros(),
            scale: Vector3::new(1.0, 1.0, 1.0),
        }
    }

    pub fn new(translation: Vector3<f32>, rotation: Vector3<f32>, scale: Vector3<f32>) -> Self {
        Self {
            translation,
            rotation,
            scale,
        }
    }

    pub fn rotation_matrix(&self) -> Rotation3<f32> {
        Rotation3::from_euler_angles(self.rotation.x, self.rotation.y, self.rotation.z)
    }

    /// Object-to-world matrix: translate * rotate * scale
    pub fn to_matrix(&self) -> Matrix4<f32> {
        Matrix4::new_translation(&self.translation)
            * self.rotation_matrix().to_homogeneous()
            * Matrix4::new_nonuniform_scaling(&self.scale)
    }

    /// Apply the transform to a point
    pub fn transform_point(&self, point: &Point3<f32>) -> Point3<f32> {
        let scaled = Point3::from(point.coords.component_mul(&self.scale));
        self.rotation_matrix() * scaled + self.translation
    }

    /// Check if this is approximately the identity transform
    pub fn is_identity(&self, epsilon: f32) -> bool {
        (self.to_matrix() - Matrix4::identity()).norm() < epsilon
    }
}

impl Default for TransformState {
    fn default() -> Self {
        Self::identity()
    }
}
