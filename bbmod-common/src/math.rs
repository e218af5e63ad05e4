//! Math primitives shared by the model and animation formats
//!
//! Vectors, quaternions and matrices come from `glam`. This module adds the
//! dual quaternion used for every rigid transform stored on disk, plus the
//! interpolation helpers the animation sampler relies on.

use std::ops::Mul;

pub use glam::{Mat4, Quat, Vec2, Vec3, Vec4};

/// Dot product above which [`slerp`] falls back to a normalized linear blend.
pub const SLERP_LINEAR_THRESHOLD: f32 = 0.9995;

/// Component-wise linear interpolation, `(1 - f) * a + f * b`.
///
/// Written out instead of `a + (b - a) * f` so that `f == 0` returns `a` and
/// `f == 1` returns `b` bit-for-bit.
#[inline]
pub fn lerp_vec3(a: Vec3, b: Vec3, f: f32) -> Vec3 {
    a * (1.0 - f) + b * f
}

/// Normalize a quaternion, leaving a zero-length quaternion untouched.
#[inline]
pub fn normalize_quat(q: Quat) -> Quat {
    let length_sqr = q.length_squared();
    if length_sqr <= 0.0 {
        return q;
    }
    q * (1.0 / length_sqr.sqrt())
}

/// Spherical linear interpolation between two rotations.
///
/// Both inputs are normalized first. When the dot product is negative the
/// second quaternion is negated so the blend takes the shortest arc, and
/// nearly parallel inputs use a renormalized linear blend.
pub fn slerp(a: Quat, b: Quat, f: f32) -> Quat {
    let a = normalize_quat(a);
    let mut b = normalize_quat(b);

    let mut dot = a.dot(b);
    if dot < 0.0 {
        dot = -dot;
        b = -b;
    }

    if dot > SLERP_LINEAR_THRESHOLD {
        let blended = a * (1.0 - f) + b * f;
        return normalize_quat(blended);
    }

    let theta_0 = dot.acos();
    let theta = theta_0 * f;
    let sin_theta = theta.sin();
    let sin_theta_0 = theta_0.sin();
    let s1 = sin_theta / sin_theta_0;
    let s0 = theta.cos() - dot * s1;

    a * s0 + b * s1
}

/// Rigid transform (rotation + translation) stored as a dual quaternion.
///
/// `real` holds the unit rotation, `dual` holds `0.5 * t * real` where `t`
/// is the translation as a pure quaternion. On disk this is 8 floats:
/// `real.xyzw` followed by `dual.xyzw`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DualQuat {
    pub real: Quat,
    pub dual: Quat,
}

impl Default for DualQuat {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl DualQuat {
    pub const IDENTITY: Self = Self {
        real: Quat::IDENTITY,
        dual: Quat::from_xyzw(0.0, 0.0, 0.0, 0.0),
    };

    /// Number of floats in the serialized form.
    pub const FLOAT_COUNT: usize = 8;

    /// Build from a translation and a (not necessarily normalized) rotation.
    pub fn from_translation_rotation(translation: Vec3, rotation: Quat) -> Self {
        let real = normalize_quat(rotation);
        let t = Quat::from_xyzw(translation.x, translation.y, translation.z, 0.0);
        let dual = (t * real) * 0.5;
        Self { real, dual }
    }

    /// Decompose an affine matrix into rotation and translation.
    ///
    /// Scale is discarded: only the rigid part survives.
    pub fn from_mat4(matrix: &Mat4) -> Self {
        let (_scale, rotation, translation) = matrix.to_scale_rotation_translation();
        Self::from_translation_rotation(translation, rotation)
    }

    pub fn from_array(values: [f32; 8]) -> Self {
        Self {
            real: Quat::from_xyzw(values[0], values[1], values[2], values[3]),
            dual: Quat::from_xyzw(values[4], values[5], values[6], values[7]),
        }
    }

    pub fn to_array(&self) -> [f32; 8] {
        let r = self.real;
        let d = self.dual;
        [r.x, r.y, r.z, r.w, d.x, d.y, d.z, d.w]
    }

    pub fn rotation(&self) -> Quat {
        self.real
    }

    /// Recover the translation, `2 * dual * conjugate(real)`.
    pub fn translation(&self) -> Vec3 {
        let t = (self.dual * 2.0) * self.real.conjugate();
        Vec3::new(t.x, t.y, t.z)
    }

    /// Transform a point by this rigid transform.
    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.real.mul_vec3(point) + self.translation()
    }

    /// Compare every component against `other` within `epsilon`.
    pub fn abs_diff_eq(&self, other: &Self, epsilon: f32) -> bool {
        self.to_array()
            .iter()
            .zip(other.to_array().iter())
            .all(|(a, b)| (a - b).abs() <= epsilon)
    }
}

/// Hamilton product: `a * b` applies `b` first, then `a`.
impl Mul for DualQuat {
    type Output = DualQuat;

    fn mul(self, rhs: DualQuat) -> DualQuat {
        DualQuat {
            real: self.real * rhs.real,
            dual: self.real * rhs.dual + self.dual * rhs.real,
        }
    }
}
