//! Math types and glam re-exports.
//!
//! We re-export [glam](https://docs.rs/glam) types so users don't need to
//! depend on it directly. [`Transform`] is the translation/rotation/scale
//! triple used both for local transforms and, wrapped, for world transforms.
//!
//! The free functions here are pure: the propagator composes with
//! [`compose`], and the tween engine interpolates orientations with
//! [`slerp`].

pub use glam::{EulerRot, Mat4, Quat, Vec3, Vec4};

/// A 3D transform: position, rotation, and scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Transform {
    /// Identity transform (origin, no rotation, uniform scale of 1).
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    /// Create a transform at the given position.
    pub fn from_xyz(x: f32, y: f32, z: f32) -> Self {
        Self {
            translation: Vec3::new(x, y, z),
            ..Self::IDENTITY
        }
    }

    /// Return a copy with the given rotation.
    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    /// Return a copy with uniform scale applied.
    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = Vec3::splat(scale);
        self
    }

    /// Compute the 4x4 model matrix.
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }

    /// Transform a point from this transform's local space into its parent's.
    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.translation + self.rotation * (self.scale * point)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// `parent ∘ local`: express `local` (given relative to `parent`) in the
/// parent's own reference frame.
///
/// Scale composes component-wise, which is exact for uniform scales and the
/// usual approximation for non-uniform ones under rotation.
pub fn compose(parent: &Transform, local: &Transform) -> Transform {
    Transform {
        translation: parent.transform_point(local.translation),
        rotation: mul_quat(parent.rotation, local.rotation),
        scale: parent.scale * local.scale,
    }
}

/// Hamilton product `a * b`, renormalized to keep long chains unit-length.
pub fn mul_quat(a: Quat, b: Quat) -> Quat {
    (a * b).normalize()
}

/// Spherical interpolation along the shortest arc.
///
/// Inputs are normalized first. `t` is not clamped: eased progress may
/// overshoot and the result simply continues along the same great circle.
pub fn slerp(from: Quat, to: Quat, t: f32) -> Quat {
    from.normalize().slerp(to.normalize(), t)
}

/// Linearly interpolate between `a` and `b` at factor `t`.
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Rotation from Euler angles in degrees, applied Y, then X, then Z.
pub fn quat_from_euler_degrees(euler: Vec3) -> Quat {
    Quat::from_euler(
        EulerRot::YXZ,
        euler.y.to_radians(),
        euler.x.to_radians(),
        euler.z.to_radians(),
    )
}

/// Inverse of [`quat_from_euler_degrees`].
pub fn euler_degrees_from_quat(rotation: Quat) -> Vec3 {
    let (y, x, z) = rotation.to_euler(EulerRot::YXZ);
    Vec3::new(x.to_degrees(), y.to_degrees(), z.to_degrees())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-4
    }

    #[test]
    fn compose_with_identity_parent_is_local() {
        let local = Transform::from_xyz(2.0, 0.0, 0.0).with_scale(3.0);
        let world = compose(&Transform::IDENTITY, &local);
        assert!(approx(world.translation, local.translation));
        assert!(approx(world.scale, local.scale));
    }

    #[test]
    fn compose_rotates_and_scales_child_offset() {
        let parent = Transform::from_xyz(1.0, 0.0, 0.0)
            .with_rotation(Quat::from_rotation_y(PI))
            .with_scale(2.0);
        let child = Transform::from_xyz(2.0, 0.0, 0.0);
        let world = compose(&parent, &child);
        // 180° about Y flips X; scale doubles the offset.
        assert!(approx(world.translation, Vec3::new(-3.0, 0.0, 0.0)));
        assert!(approx(world.scale, Vec3::splat(2.0)));
    }

    #[test]
    fn compose_matches_matrix_product() {
        let parent = Transform::from_xyz(0.0, 5.0, 1.0)
            .with_rotation(Quat::from_rotation_z(0.7));
        let child = Transform::from_xyz(3.0, -1.0, 0.5)
            .with_rotation(Quat::from_rotation_x(0.3));
        let composed = compose(&parent, &child).matrix();
        let expected = parent.matrix() * child.matrix();
        assert!(composed.abs_diff_eq(expected, 1e-4));
    }

    #[test]
    fn slerp_endpoints_and_midpoint() {
        let a = Quat::IDENTITY;
        let b = Quat::from_rotation_y(PI / 2.0);
        assert!(slerp(a, b, 0.0).abs_diff_eq(a, 1e-5));
        assert!(slerp(a, b, 1.0).abs_diff_eq(b, 1e-5));
        let mid = slerp(a, b, 0.5);
        assert!(mid.abs_diff_eq(Quat::from_rotation_y(PI / 4.0), 1e-4));
    }

    #[test]
    fn slerp_takes_shortest_arc() {
        let a = Quat::from_rotation_y(0.1);
        let b = -Quat::from_rotation_y(0.3); // same orientation, flipped sign
        let mid = slerp(a, b, 0.5);
        let angle = mid.angle_between(Quat::from_rotation_y(0.2));
        assert!(angle < 1e-3);
    }

    #[test]
    fn euler_round_trip() {
        let euler = Vec3::new(10.0, 45.0, -20.0);
        let back = euler_degrees_from_quat(quat_from_euler_degrees(euler));
        assert!((back - euler).length() < 1e-2);
    }
}
