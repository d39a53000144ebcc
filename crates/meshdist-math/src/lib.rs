#![warn(missing_docs)]

//! Math types for meshdist.
//!
//! Thin wrappers around nalgebra providing the points, vectors, rigid
//! transforms and axis-aligned boxes used by the spatial index and the
//! signed distance evaluator.

mod bbox;

pub use bbox::Aabb3;

use nalgebra::{Matrix3, Matrix4, Unit, Vector2, Vector3, Vector4};

/// A point in 3D space.
pub type Point3 = nalgebra::Point3<f64>;

/// A vector in 3D space.
pub type Vec3 = Vector3<f64>;

/// A unit (normalized) direction vector in 3D space.
pub type Dir3 = Unit<Vector3<f64>>;

/// A point in a 2D local frame.
pub type Point2 = nalgebra::Point2<f64>;

/// A vector in 2D space.
pub type Vec2 = Vector2<f64>;

/// A 4x4 affine transformation matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    /// The underlying 4x4 matrix.
    pub matrix: Matrix4<f64>,
}

impl Transform {
    /// Identity transform.
    pub fn identity() -> Self {
        Self {
            matrix: Matrix4::identity(),
        }
    }

    /// Translation by `(dx, dy, dz)`.
    pub fn translation(dx: f64, dy: f64, dz: f64) -> Self {
        let mut m = Matrix4::identity();
        m[(0, 3)] = dx;
        m[(1, 3)] = dy;
        m[(2, 3)] = dz;
        Self { matrix: m }
    }

    /// Rotation about an arbitrary axis through the origin by `angle` radians.
    ///
    /// Uses Rodrigues' rotation formula.
    pub fn rotation_about_axis(axis: &Dir3, angle: f64) -> Self {
        let (s, c) = angle.sin_cos();
        let t = 1.0 - c;
        let (x, y, z) = (axis.as_ref().x, axis.as_ref().y, axis.as_ref().z);
        let mut m = Matrix4::identity();
        m[(0, 0)] = t * x * x + c;
        m[(0, 1)] = t * x * y - s * z;
        m[(0, 2)] = t * x * z + s * y;
        m[(1, 0)] = t * x * y + s * z;
        m[(1, 1)] = t * y * y + c;
        m[(1, 2)] = t * y * z - s * x;
        m[(2, 0)] = t * x * z - s * y;
        m[(2, 1)] = t * y * z + s * x;
        m[(2, 2)] = t * z * z + c;
        Self { matrix: m }
    }

    /// Rigid frame mapping local coordinates to world coordinates.
    ///
    /// The columns of the rotation part are `x`, `y` and `z`, and the local
    /// origin lands on `origin`. The axes must be orthonormal for the result
    /// to be rigid; this is not checked.
    pub fn from_frame(origin: &Point3, x: &Vec3, y: &Vec3, z: &Vec3) -> Self {
        let mut m = Matrix4::identity();
        for (col, axis) in [x, y, z].into_iter().enumerate() {
            m[(0, col)] = axis.x;
            m[(1, col)] = axis.y;
            m[(2, col)] = axis.z;
        }
        m[(0, 3)] = origin.x;
        m[(1, 3)] = origin.y;
        m[(2, 3)] = origin.z;
        Self { matrix: m }
    }

    /// Compose: `self` then `other` (self * other).
    pub fn then(&self, other: &Transform) -> Self {
        Self {
            matrix: self.matrix * other.matrix,
        }
    }

    /// Transform a point.
    pub fn apply_point(&self, p: &Point3) -> Point3 {
        let v = self.matrix * Vector4::new(p.x, p.y, p.z, 1.0);
        Point3::new(v.x, v.y, v.z)
    }

    /// Inverse of a rigid transform (rotation plus translation).
    ///
    /// Transposes the rotation instead of running a general inversion, so
    /// the result is exact up to rounding and always exists. Only valid
    /// when the upper-left 3x3 block is orthonormal.
    pub fn rigid_inverse(&self) -> Self {
        let r: Matrix3<f64> = self.matrix.fixed_view::<3, 3>(0, 0).transpose();
        let t = Vec3::new(self.matrix[(0, 3)], self.matrix[(1, 3)], self.matrix[(2, 3)]);
        let t_inv = -(r * t);
        let mut m = Matrix4::identity();
        m.fixed_view_mut::<3, 3>(0, 0).copy_from(&r);
        m[(0, 3)] = t_inv.x;
        m[(1, 3)] = t_inv.y;
        m[(2, 3)] = t_inv.z;
        Self { matrix: m }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}
