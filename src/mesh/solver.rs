//! Placement of canonical meshes.
//!
//! Both solvers return a [`Placement`] whose local frame maps the canonical
//! shape onto the points a primitive was given: the local z axis runs along
//! the primitive's axis, x and y span its cross-section.

use crate::types::Placement;
use glam::{Mat3, Quat, Vec3};

/// Relative xy extent below which an axis counts as parallel to z.
const AXIS_EPSILON: f32 = 1e-6;

/// Orthonormal frame from two directions: x along `a`, z along `a x b`,
/// y completing a right-handed basis in the plane of `a` and `b`.
pub fn quaternion_frame(a: Vec3, b: Vec3) -> Mat3 {
    let x = a.normalize_or_zero();
    let z = a.cross(b).normalize_or_zero();
    let y = z.cross(x).normalize_or_zero();
    Mat3::from_cols(x, y, z)
}

/// Placement for an axial shape (cylinder, cone, disk) running from `p1` to
/// `p2` with the given radius.
///
/// The local z axis is carried onto `p2 - p1` and scaled by its length; x and
/// y are scaled by `radius`. Local (0,0,0) lands on `p1` and (0,0,1) on `p2`.
/// An axis parallel to z (p1 and p2 share x and y) gets the identity, or a
/// half turn about x when it points down.
pub fn axis_transform(p1: Vec3, p2: Vec3, radius: f32) -> Placement {
    let d = p2 - p1;
    let length = d.length();
    let rotation = if d.x.hypot(d.y) <= AXIS_EPSILON * length || length == 0.0 {
        if d.z < 0.0 {
            Mat3::from_diagonal(Vec3::new(1.0, -1.0, -1.0))
        } else {
            Mat3::IDENTITY
        }
    } else {
        let v2 = Vec3::Z.cross(d);
        let v1 = d.cross(v2);
        quaternion_frame(v2, v1)
    };
    let scale = Mat3::from_diagonal(Vec3::new(radius, radius, length));
    Placement::new(rotation * scale, p1)
}

/// Placement for a shape whose cross-section is given by points: local x is
/// carried onto `x_point - origin`, local y onto the part of
/// `y_point - origin` orthogonal to it, local z onto their normal.
///
/// x and y are scaled by their distances from `origin` times `radius_scale`;
/// z by the distance to `z_point`, or 1 when there is none.
pub fn frame_transform(
    origin: Vec3,
    x_point: Vec3,
    y_point: Vec3,
    z_point: Option<Vec3>,
    radius_scale: f32,
) -> Placement {
    let a = x_point - origin;
    let b = y_point - origin;
    let rotation = quaternion_frame(a, b);
    let sz = z_point.map_or(1.0, |z| z.distance(origin));
    let scale = Mat3::from_diagonal(Vec3::new(
        a.length() * radius_scale,
        b.length() * radius_scale,
        sz,
    ));
    Placement::new(rotation * scale, origin)
}

/// Placement for an elliptical cylinder whose axis runs from `start` to
/// `end` and whose cross-section is spanned by `x_point` and `y_point`
/// around `center`.
pub fn elliptical_axis_transform(
    center: Vec3,
    start: Vec3,
    end: Vec3,
    x_point: Vec3,
    y_point: Vec3,
    radius_scale: f32,
) -> Placement {
    let mut placement = frame_transform(center, x_point, y_point, None, radius_scale);
    let axis = end - start;
    // Keep x and y, swap the z column for the real axis.
    placement.linear.z_axis = axis;
    placement.with_translation(start)
}

/// Axis-angle rotation carrying `local` onto the direction of `target`, for
/// formats that place primitives along a fixed built-in axis.
pub fn axis_angle_to(local: Vec3, target: Vec3) -> (Vec3, f32) {
    let rotation = Quat::from_rotation_arc(local.normalize(), target.normalize_or_zero());
    let (axis, angle) = rotation.to_axis_angle();
    if angle.abs() < f32::EPSILON || !axis.is_finite() {
        (Vec3::Z, 0.0)
    } else {
        (axis, angle)
    }
}

/// Axis-angle form of the rotation part of a placement.
pub fn rotation_axis_angle(placement: &Placement) -> (Vec3, f32) {
    let rotation = Quat::from_mat3(&placement.rotation()).normalize();
    let (axis, angle) = rotation.to_axis_angle();
    if angle.abs() < f32::EPSILON || !axis.is_finite() {
        (Vec3::Z, 0.0)
    } else {
        (axis, angle)
    }
}
