//! Math utilities and types
//!
//! Provides fundamental math types for 3D rendering. All matrices follow the
//! column-vector convention used by nalgebra and GLSL.

pub use nalgebra::{
    Vector2, Vector3, Vector4,
    Matrix3, Matrix4,
    Quaternion,
    Unit,
};

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 3x3 matrix type
pub type Mat3 = Matrix3<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// Quaternion type for rotations
pub type Quat = Unit<Quaternion<f32>>;

/// Transform representing location, orientation, and scale
///
/// This is the value pulled from the simulation for bound drawables every
/// frame, so it stays a plain `Copy` value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    /// Position in 3D space
    pub position: Vec3,

    /// Rotation quaternion
    pub rotation: Quat,

    /// Scale factors
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            rotation: Quat::identity(),
            scale: Vec3::new(1.0, 1.0, 1.0),
        }
    }
}

impl Transform {
    /// Create a new identity transform
    pub fn identity() -> Self {
        Self::default()
    }

    /// Create a transform with only position
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Create a transform with position and rotation
    pub fn from_position_rotation(position: Vec3, rotation: Quat) -> Self {
        Self {
            position,
            rotation,
            ..Default::default()
        }
    }

    /// Replace the scale, keeping position and rotation
    #[must_use]
    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    /// Convert to a transformation matrix (translation * rotation * scale)
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::new_translation(&self.position)
            * self.rotation.to_homogeneous()
            * Mat4::new_nonuniform_scaling(&self.scale)
    }

    /// Matrix that transforms normals into world space.
    ///
    /// Inverse-transpose of the upper 3x3 of the model matrix. A degenerate
    /// (zero) scale falls back to the rotation alone.
    pub fn normal_matrix(&self) -> Mat3 {
        let rotation = self.rotation.to_rotation_matrix().into_inner();
        let inverse_scale = Vec3::new(
            safe_recip(self.scale.x),
            safe_recip(self.scale.y),
            safe_recip(self.scale.z),
        );
        // (R S)^-T = R S^-1 for a rotation R and diagonal S
        rotation * Mat3::from_diagonal(&inverse_scale)
    }

    /// Apply this transform to a point
    pub fn transform_point(&self, point: Point3) -> Point3 {
        self.to_matrix().transform_point(&point)
    }
}

fn safe_recip(value: f32) -> f32 {
    if value.abs() > f32::EPSILON {
        1.0 / value
    } else {
        1.0
    }
}

/// Math constants
pub mod constants {
    /// Pi constant
    pub const PI: f32 = std::f32::consts::PI;

    /// Pi / 2
    pub const HALF_PI: f32 = PI * 0.5;

    /// Degrees to radians conversion factor
    pub const DEG_TO_RAD: f32 = PI / 180.0;
}

/// Math utility functions
pub mod utils {
    use super::constants;

    /// Convert degrees to radians
    pub fn deg_to_rad(degrees: f32) -> f32 {
        degrees * constants::DEG_TO_RAD
    }

    /// Replace negative zero with positive zero.
    ///
    /// Used wherever float bit patterns act as keys.
    pub fn canonical_zero(value: f32) -> f32 {
        value + 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_identity_matrix() {
        assert_relative_eq!(Transform::identity().to_matrix(), Mat4::identity(), epsilon = 1e-6);
    }

    #[test]
    fn test_trs_order() {
        let transform = Transform::from_position(Vec3::new(1.0, 0.0, 0.0))
            .with_scale(Vec3::new(2.0, 2.0, 2.0));
        let moved = transform.transform_point(Point3::new(1.0, 0.0, 0.0));
        // scaled first, then translated
        assert_relative_eq!(moved, Point3::new(3.0, 0.0, 0.0), epsilon = 1e-6);
    }

    #[test]
    fn test_normal_matrix_non_uniform_scale() {
        let transform = Transform::identity().with_scale(Vec3::new(2.0, 1.0, 1.0));
        let normal = transform.normal_matrix() * Vec3::new(1.0, 1.0, 0.0);
        // a stretched surface leans its normal away from the stretch axis
        assert_relative_eq!(normal, Vec3::new(0.5, 1.0, 0.0), epsilon = 1e-6);
    }

    #[test]
    fn test_canonical_zero() {
        assert_eq!(utils::canonical_zero(-0.0).to_bits(), 0.0f32.to_bits());
        assert_eq!(utils::canonical_zero(1.5), 1.5);
    }
}
