//! Affine placement of a canonical mesh instance.

use glam::{Mat3, Mat4, Vec3};

/// A 3x3 linear part (rotation, possibly with non-uniform scale) plus a
/// translation. Local points map to `linear * p + translation`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub linear: Mat3,
    pub translation: Vec3,
}

/// Determinants below this fraction of the column-length product count as singular.
const SINGULAR_TOLERANCE: f32 = 1e-6;

impl Placement {
    pub const IDENTITY: Placement = Placement {
        linear: Mat3::IDENTITY,
        translation: Vec3::ZERO,
    };

    pub fn new(linear: Mat3, translation: Vec3) -> Self {
        Self { linear, translation }
    }

    /// Uniform scale about the origin, then translate.
    pub fn uniform(center: Vec3, scale: f32) -> Self {
        Self::new(Mat3::from_diagonal(Vec3::splat(scale)), center)
    }

    pub fn with_translation(mut self, translation: Vec3) -> Self {
        self.translation = translation;
        self
    }

    /// Map a local point into the scene.
    pub fn apply(&self, point: Vec3) -> Vec3 {
        self.linear * point + self.translation
    }

    /// Map a local normal into the scene (inverse transpose, renormalized).
    /// Falls back to the linear part when it is singular relative to its
    /// own column lengths.
    pub fn apply_normal(&self, normal: Vec3) -> Vec3 {
        let det = self.linear.determinant();
        let volume = self.scale().x * self.scale().y * self.scale().z;
        let n = if volume > 0.0 && det.abs() > volume * SINGULAR_TOLERANCE {
            self.linear.inverse().transpose() * normal
        } else {
            self.linear * normal
        };
        n.normalize_or_zero()
    }

    /// Column lengths of the linear part.
    pub fn scale(&self) -> Vec3 {
        Vec3::new(
            self.linear.x_axis.length(),
            self.linear.y_axis.length(),
            self.linear.z_axis.length(),
        )
    }

    /// Linear part with the scale divided out of each column.
    pub fn rotation(&self) -> Mat3 {
        Mat3::from_cols(
            self.linear.x_axis.normalize_or_zero(),
            self.linear.y_axis.normalize_or_zero(),
            self.linear.z_axis.normalize_or_zero(),
        )
    }

    pub fn to_mat4(&self) -> Mat4 {
        let mut m = Mat4::from_mat3(self.linear);
        m.w_axis = self.translation.extend(1.0);
        m
    }
}

impl Default for Placement {
    fn default() -> Self {
        Self::IDENTITY
    }
}
