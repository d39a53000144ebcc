//! Vertex merging and pseudo-normal accumulation.
//!
//! Every vertex carries the angle-weighted sum of the unit normals of the
//! triangles meeting at it, and every edge the π-weighted sum of the unit
//! normals of the triangles sharing it. On a closed, consistently wound
//! mesh these give the correct inside/outside sign for any point whose
//! closest surface feature is that vertex or edge.

use std::collections::HashMap;
use std::f64::consts::PI;

use meshdist_kdtree::{Bounding, Comparable, Extender};
use meshdist_math::{Point3, Vec3};

use crate::error::{MeshError, Result};
use crate::projection::{Feature, LocalFrame, Projection};
use crate::triangle::Triangle;

/// Relative tolerance below which a triangle is rejected as degenerate.
pub const DEGENERATE_TOLERANCE: f64 = 1e-12;

/// Largest scaled coordinate that still rounds to a distinct integer key.
const KEY_LIMIT: f64 = 9.0e15;

/// A merged vertex.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshVertex {
    /// Position of the first input vertex merged into this one.
    pub position: Point3,
    /// Sum of incident unit face normals, each weighted by the triangle's
    /// opening angle at this vertex.
    pub pseudo_normal: Vec3,
}

/// A triangle of a [`Mesh`], with the data needed for distance queries.
///
/// Refers to its vertices and edges by index into the owning mesh.
#[derive(Debug, Clone)]
pub struct MeshTriangle {
    index: usize,
    vertices: [usize; 3],
    corners: [Point3; 3],
    centroid: Point3,
    normal: Vec3,
    frame: LocalFrame,
}

impl MeshTriangle {
    /// Position of this triangle in the mesh.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Indices of the merged vertices.
    pub fn vertices(&self) -> [usize; 3] {
        self.vertices
    }

    /// The triangle with merged vertex positions.
    pub fn triangle(&self) -> Triangle {
        Triangle { v: self.corners }
    }

    /// Mean of the merged vertex positions.
    pub fn centroid(&self) -> Point3 {
        self.centroid
    }

    /// Unit face normal.
    pub fn normal(&self) -> Vec3 {
        self.normal
    }

    /// Rigid frame used for projection.
    pub fn frame(&self) -> &LocalFrame {
        &self.frame
    }

    /// Closest point on this triangle to `p`.
    pub fn project(&self, p: &Point3) -> Projection {
        self.frame.project(p)
    }
}

impl Comparable<Point3> for MeshTriangle {
    fn point(&self) -> Point3 {
        self.centroid
    }

    fn compare_point(&self, point: &Point3, dim: usize) -> f64 {
        self.centroid[dim] - point[dim]
    }

    fn distance(&self, point: &Point3) -> f64 {
        self.project(point).dist2
    }
}

impl Extender<Point3> for MeshTriangle {
    fn extend(&self, bounds: Option<Bounding<Point3>>) -> Bounding<Point3> {
        let [a, b, c] = &self.corners;
        c.extend(Some(b.extend(Some(a.extend(bounds)))))
    }
}

/// Edge counts from [`Mesh::winding_report`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindingReport {
    /// Distinct undirected edges.
    pub edges: usize,
    /// Edges not shared by exactly two triangles.
    pub open_edges: usize,
    /// Edges whose two triangles traverse them in the same direction.
    pub inconsistent_edges: usize,
}

impl WindingReport {
    /// Whether the mesh is closed and consistently oriented.
    pub fn is_consistent(&self) -> bool {
        self.open_edges == 0 && self.inconsistent_edges == 0
    }
}

/// A triangle mesh with merged vertices and pseudo-normals.
#[derive(Debug, Clone)]
pub struct Mesh {
    vertices: Vec<MeshVertex>,
    triangles: Vec<MeshTriangle>,
    edge_normals: HashMap<(usize, usize), Vec3>,
    cache: HashMap<[i64; 3], usize>,
    tolerance: f64,
}

fn edge_key(a: usize, b: usize) -> (usize, usize) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

impl Mesh {
    /// Build a mesh from a triangle soup.
    ///
    /// Input vertices that round to the same point of a grid with spacing
    /// `merge_tolerance` become one vertex. Triangles must be wound
    /// counter-clockwise seen from outside; this is not enforced, see
    /// [`Mesh::winding_report`].
    pub fn build(triangles: &[Triangle], merge_tolerance: f64) -> Result<Self> {
        if !merge_tolerance.is_finite() || merge_tolerance <= 0.0 {
            return Err(MeshError::InvalidTolerance(merge_tolerance));
        }
        if triangles.is_empty() {
            return Err(MeshError::EmptyMesh);
        }
        let mut mesh = Self {
            vertices: Vec::new(),
            triangles: Vec::with_capacity(triangles.len()),
            edge_normals: HashMap::new(),
            cache: HashMap::new(),
            tolerance: merge_tolerance,
        };
        for tri in triangles {
            mesh.push_triangle(tri)?;
        }
        Ok(mesh)
    }

    /// Merged vertices.
    pub fn vertices(&self) -> &[MeshVertex] {
        &self.vertices
    }

    /// Triangles in input order.
    pub fn triangles(&self) -> &[MeshTriangle] {
        &self.triangles
    }

    /// Number of distinct edges.
    pub fn edge_count(&self) -> usize {
        self.edge_normals.len()
    }

    /// Vertex merge tolerance.
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Pseudo-normal of the edge between vertices `a` and `b`, in either
    /// order.
    pub fn edge_normal(&self, a: usize, b: usize) -> Option<&Vec3> {
        self.edge_normals.get(&edge_key(a, b))
    }

    fn grid_key(&self, p: &Point3) -> Result<[i64; 3]> {
        let mut key = [0; 3];
        for (k, c) in key.iter_mut().zip(p.coords.iter()) {
            let scaled = (c / self.tolerance).round();
            if !(scaled.abs() < KEY_LIMIT) {
                return Err(MeshError::InvalidTolerance(self.tolerance));
            }
            *k = scaled as i64;
        }
        Ok(key)
    }

    /// Merge the triangle's vertices, accumulate its normals, and append
    /// it. Returns its index. The mesh is unchanged on error.
    pub(crate) fn push_triangle(&mut self, tri: &Triangle) -> Result<usize> {
        let index = self.triangles.len();
        let degenerate = MeshError::DegenerateTriangle { index };
        if tri.is_degenerate(DEGENERATE_TOLERANCE) {
            return Err(degenerate);
        }

        let mut keys = [[0; 3]; 3];
        let mut corners = tri.v;
        for k in 0..3 {
            keys[k] = self.grid_key(&tri.v[k])?;
            if let Some(&existing) = self.cache.get(&keys[k]) {
                corners[k] = self.vertices[existing].position;
            }
        }
        if keys[0] == keys[1] || keys[1] == keys[2] || keys[2] == keys[0] {
            return Err(degenerate);
        }
        let merged = Triangle { v: corners };
        let Some(normal) = merged.unit_normal().filter(|_| !merged.is_degenerate(DEGENERATE_TOLERANCE))
        else {
            return Err(degenerate);
        };
        let normal = normal.into_inner();

        let mut ids = [0; 3];
        for k in 0..3 {
            let next = self.vertices.len();
            let id = *self.cache.entry(keys[k]).or_insert(next);
            if id == next {
                self.vertices.push(MeshVertex {
                    position: corners[k],
                    pseudo_normal: Vec3::zeros(),
                });
            }
            ids[k] = id;

            let out = corners[(k + 1) % 3] - corners[k];
            let back = corners[(k + 2) % 3] - corners[k];
            self.vertices[id].pseudo_normal += normal * out.angle(&back);
        }
        for k in 0..3 {
            *self
                .edge_normals
                .entry(edge_key(ids[k], ids[(k + 1) % 3]))
                .or_insert_with(Vec3::zeros) += normal * PI;
        }

        self.triangles.push(MeshTriangle {
            index,
            vertices: ids,
            corners,
            centroid: merged.centroid(),
            normal,
            frame: LocalFrame::new(&merged),
        });
        Ok(index)
    }

    /// Signed distance from `p` given its projection onto `tri`.
    ///
    /// The sign comes from the pseudo-normal of the feature the closest
    /// point lies on: negative inside, positive outside.
    pub fn signed_distance(&self, tri: &MeshTriangle, p: &Point3, hit: &Projection) -> f64 {
        let side = match hit.feature {
            Feature::Vertex(k) => {
                let v = &self.vertices[tri.vertices[k]];
                v.pseudo_normal.dot(&(p - v.position))
            }
            Feature::Edge(k) => {
                let n = self
                    .edge_normal(tri.vertices[k], tri.vertices[(k + 1) % 3])
                    .unwrap_or(&tri.normal);
                n.dot(&(p - hit.closest))
            }
            Feature::Face => tri.normal.dot(&(p - hit.closest)),
        };
        hit.dist2.sqrt().copysign(side)
    }

    /// Count open and inconsistently oriented edges.
    ///
    /// Diagnostic only: nothing is repaired.
    pub fn winding_report(&self) -> WindingReport {
        // (traversals low -> high, traversals high -> low)
        let mut directed: HashMap<(usize, usize), (usize, usize)> = HashMap::new();
        for tri in &self.triangles {
            for k in 0..3 {
                let (a, b) = (tri.vertices[k], tri.vertices[(k + 1) % 3]);
                let entry = directed.entry(edge_key(a, b)).or_default();
                if a < b {
                    entry.0 += 1;
                } else {
                    entry.1 += 1;
                }
            }
        }

        let mut report = WindingReport {
            edges: directed.len(),
            ..WindingReport::default()
        };
        for &(forward, backward) in directed.values() {
            if forward + backward != 2 {
                report.open_edges += 1;
            } else if forward != 1 {
                report.inconsistent_edges += 1;
            }
        }
        report
    }
}
