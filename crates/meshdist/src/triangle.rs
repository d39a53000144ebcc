//! Triangle soup input.

use meshdist_math::{Aabb3, Dir3, Point3, Vec3};
use nalgebra::Unit;

use crate::error::{MeshError, Result};
use crate::projection::{LocalFrame, Projection};

/// A triangle given by three vertex positions.
///
/// Vertex order sets the facing: the normal follows the right-hand rule on
/// `v[1] - v[0]` and `v[2] - v[0]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    /// Vertex positions.
    pub v: [Point3; 3],
}

impl Triangle {
    /// Create a triangle from its vertices.
    pub fn new(v0: Point3, v1: Point3, v2: Point3) -> Self {
        Self { v: [v0, v1, v2] }
    }

    /// Unnormalized normal. Its length is twice the area.
    pub fn normal(&self) -> Vec3 {
        (self.v[1] - self.v[0]).cross(&(self.v[2] - self.v[0]))
    }

    /// Unit normal, or `None` when the normal vanishes.
    pub fn unit_normal(&self) -> Option<Dir3> {
        Unit::try_new(self.normal(), 0.0)
    }

    /// Area, by Kahan's formula on the sorted side lengths.
    ///
    /// Stays accurate for needle-shaped triangles where the cross product
    /// loses precision.
    pub fn area(&self) -> f64 {
        let mut s = self.side_lengths();
        s.sort_by(|a, b| b.total_cmp(a));
        let [a, b, c] = s;
        let product = (a + (b + c)) * (c - (a - b)) * (c + (a - b)) * (a + (b - c));
        0.25 * product.max(0.0).sqrt()
    }

    /// Mean of the three vertices.
    pub fn centroid(&self) -> Point3 {
        Point3::from((self.v[0].coords + self.v[1].coords + self.v[2].coords) / 3.0)
    }

    /// Edges as vertex pairs, in winding order. Edge `i` runs from vertex
    /// `i` to vertex `(i + 1) % 3`.
    pub fn edges(&self) -> [[Point3; 2]; 3] {
        [
            [self.v[0], self.v[1]],
            [self.v[1], self.v[2]],
            [self.v[2], self.v[0]],
        ]
    }

    fn side_lengths(&self) -> [f64; 3] {
        self.edges().map(|[a, b]| (b - a).norm())
    }

    /// Whether the triangle is too thin to define a frame.
    ///
    /// `tol` is relative to the longest edge: an edge shorter than
    /// `tol * longest` or an area below `tol * longest²` counts as
    /// degenerate. Non-finite coordinates are always degenerate.
    pub fn is_degenerate(&self, tol: f64) -> bool {
        if self.v.iter().any(|p| !p.coords.iter().all(|c| c.is_finite())) {
            return true;
        }
        let sides = self.side_lengths();
        let longest = sides.iter().copied().fold(0.0, f64::max);
        let shortest = sides.iter().copied().fold(f64::INFINITY, f64::min);
        longest == 0.0 || shortest <= tol * longest || self.normal().norm() <= tol * longest * longest
    }

    /// Axis-aligned bounding box of the vertices.
    pub fn bounds(&self) -> Aabb3 {
        Aabb3::from_points(&self.v)
    }

    /// Closest point on the triangle to `p`, with the feature realizing it.
    ///
    /// Builds a fresh frame on every call; indexed meshes cache theirs.
    pub fn closest_point(&self, p: &Point3) -> Projection {
        LocalFrame::new(self).project(p)
    }
}

/// Build a triangle soup from a flat `[x, y, z, ...]` buffer and a flat
/// index buffer with three indices per triangle.
pub fn triangles_from_flat(vertices: &[f64], indices: &[u32]) -> Result<Vec<Triangle>> {
    if vertices.len() % 3 != 0 {
        return Err(MeshError::Shape {
            buffer: "vertex",
            reason: format!("length {} is not a multiple of 3", vertices.len()),
        });
    }
    if indices.len() % 3 != 0 {
        return Err(MeshError::Shape {
            buffer: "index",
            reason: format!("length {} is not a multiple of 3", indices.len()),
        });
    }
    let points: Vec<Point3> = vertices
        .chunks_exact(3)
        .map(|c| Point3::new(c[0], c[1], c[2]))
        .collect();
    let vertex = |i: u32| {
        points.get(i as usize).copied().ok_or_else(|| MeshError::Shape {
            buffer: "index",
            reason: format!("index {i} out of range for {} vertices", points.len()),
        })
    };
    indices
        .chunks_exact(3)
        .map(|t| Ok(Triangle::new(vertex(t[0])?, vertex(t[1])?, vertex(t[2])?)))
        .collect()
}
