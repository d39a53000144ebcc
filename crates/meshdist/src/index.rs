//! Signed distance queries over an indexed mesh.

use std::ops::ControlFlow;

use meshdist_kdtree::{Bounding, DistKeeper, NKeeper, Tree, TreeSettings};
use meshdist_math::{Aabb3, Point3, Vec3};
use rayon::prelude::*;
use tracing::{info, warn};

use crate::error::Result;
use crate::mesh::{Mesh, MeshTriangle};
use crate::projection::Feature;
use crate::settings::{validate_tree, MeshSettings};
use crate::triangle::Triangle;

/// The closest point of one triangle to a query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClosestHit {
    /// Index of the triangle in the mesh.
    pub triangle: usize,
    /// Closest point on the triangle.
    pub closest: Point3,
    /// Feature of the triangle the closest point lies on.
    pub feature: Feature,
    /// Squared distance from the query to `closest`.
    pub dist2: f64,
}

impl ClosestHit {
    fn new(tri: &MeshTriangle, p: &Point3) -> Self {
        let projection = tri.project(p);
        Self {
            triangle: tri.index(),
            closest: projection.closest,
            feature: projection.feature,
            dist2: projection.dist2,
        }
    }

    /// Euclidean distance from the query to `closest`.
    pub fn distance(&self) -> f64 {
        self.dist2.sqrt()
    }
}

/// Signed distance field of a closed triangle mesh.
///
/// Built once; every query takes `&self`, so an index can be shared across
/// threads.
///
/// ```
/// use meshdist::{MeshIndex, Point3, Triangle};
///
/// let a = Point3::new(0.0, 0.0, 0.0);
/// let b = Point3::new(1.0, 0.0, 0.0);
/// let c = Point3::new(0.0, 1.0, 0.0);
/// let d = Point3::new(0.0, 0.0, 1.0);
/// let tetra = [
///     Triangle::new(a, c, b),
///     Triangle::new(a, b, d),
///     Triangle::new(a, d, c),
///     Triangle::new(b, c, d),
/// ];
///
/// let index = MeshIndex::build(&tetra, 1e-6)?;
/// assert!(index.evaluate(&Point3::new(0.1, 0.1, 0.1)) < 0.0);
/// assert!((index.evaluate(&Point3::new(0.0, 0.0, -2.0)) - 2.0).abs() < 1e-12);
/// # Ok::<(), meshdist::MeshError>(())
/// ```
#[derive(Debug)]
pub struct MeshIndex {
    mesh: Mesh,
    tree: Tree<Point3, MeshTriangle>,
    bounds: Aabb3,
}

impl MeshIndex {
    /// Build an index with the given merge tolerance and default settings.
    pub fn build(triangles: &[Triangle], merge_tolerance: f64) -> Result<Self> {
        Self::build_with(triangles, &MeshSettings::with_tolerance(merge_tolerance))
    }

    /// Build an index as configured by `settings`.
    pub fn build_with(triangles: &[Triangle], settings: &MeshSettings) -> Result<Self> {
        settings.validate()?;
        let mesh = Mesh::build(triangles, settings.merge_tolerance)?;
        if settings.check_winding {
            let report = mesh.winding_report();
            if !report.is_consistent() {
                warn!(
                    open_edges = report.open_edges,
                    inconsistent_edges = report.inconsistent_edges,
                    "Mesh is not closed and consistently wound; distance signs may be wrong"
                );
            }
        }
        Self::from_mesh(mesh, &settings.tree)
    }

    /// Index an already built mesh.
    pub fn from_mesh(mesh: Mesh, settings: &TreeSettings) -> Result<Self> {
        validate_tree(settings)?;
        let tree = Tree::build_with(mesh.triangles().to_vec(), settings);
        let bounds = Aabb3::from_points(mesh.vertices().iter().map(|v| &v.position));
        info!(
            triangles = mesh.triangles().len(),
            vertices = mesh.vertices().len(),
            edges = mesh.edge_count(),
            "Built mesh distance index"
        );
        Ok(Self { mesh, tree, bounds })
    }

    /// The indexed mesh.
    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    /// The triangle tree.
    pub fn tree(&self) -> &Tree<Point3, MeshTriangle> {
        &self.tree
    }

    /// Bounding box of the merged vertices.
    pub fn bounds(&self) -> Aabb3 {
        self.bounds
    }

    /// Signed distance from `p` to the surface: negative inside, positive
    /// outside.
    pub fn evaluate(&self, p: &Point3) -> f64 {
        let Some(nearest) = self.tree.nearest(p) else {
            return f64::INFINITY;
        };
        let tri = nearest.item;
        self.mesh.signed_distance(tri, p, &tri.project(p))
    }

    /// [`MeshIndex::evaluate`] over many points, in parallel.
    pub fn evaluate_batch(&self, points: &[Point3]) -> Vec<f64> {
        points.par_iter().map(|p| self.evaluate(p)).collect()
    }

    /// The closest point on the surface to `p`.
    pub fn closest(&self, p: &Point3) -> Option<ClosestHit> {
        self.tree.nearest(p).map(|c| ClosestHit::new(c.item, p))
    }

    /// Distance from `p` to the surface, without sign.
    pub fn unsigned_distance(&self, p: &Point3) -> f64 {
        self.closest(p).map_or(f64::INFINITY, |hit| hit.distance())
    }

    /// Whether `p` lies strictly inside the surface.
    pub fn is_inside(&self, p: &Point3) -> bool {
        self.bounds.contains(p) && self.evaluate(p) < 0.0
    }

    /// Central-difference gradient of the signed distance with step `h`.
    ///
    /// Close to the outward unit normal away from the medial axis.
    pub fn gradient(&self, p: &Point3, h: f64) -> Vec3 {
        let diff = |axis: Vec3| {
            let offset = axis * h;
            (self.evaluate(&(p + offset)) - self.evaluate(&(p - offset))) / (2.0 * h)
        };
        Vec3::new(diff(Vec3::x()), diff(Vec3::y()), diff(Vec3::z()))
    }

    /// The `k` triangles closest to `p`, nearest first.
    pub fn nearest_triangles(&self, p: &Point3, k: usize) -> Vec<ClosestHit> {
        self.tree
            .nearest_set(NKeeper::new(k), p)
            .into_iter()
            .map(|c| ClosestHit::new(c.item, p))
            .collect()
    }

    /// Every triangle with a point within `radius` of `p`, nearest first.
    pub fn triangles_within(&self, p: &Point3, radius: f64) -> Vec<ClosestHit> {
        self.tree
            .nearest_set(DistKeeper::new(radius), p)
            .into_iter()
            .map(|c| ClosestHit::new(c.item, p))
            .collect()
    }

    /// Indices of the triangles whose centroid lies in `aabb`, ascending.
    pub fn triangles_in_box(&self, aabb: &Aabb3) -> Vec<usize> {
        // centroids never leave the vertex bounds
        if !self.bounds.overlaps(aabb) {
            return Vec::new();
        }
        let b = Bounding::new(aabb.min, aabb.max);
        let mut found = Vec::new();
        let _ = self.tree.do_bounded(&b, |tri, _, _| {
            found.push(tri.index());
            ControlFlow::Continue(())
        });
        found.sort_unstable();
        found
    }

    /// Add a triangle to the index and return its index.
    ///
    /// Its vertices merge with existing ones and its normals accumulate
    /// into the shared pseudo-normals, but the tree is not rebalanced.
    /// Signs are only reliable once the mesh is closed again.
    pub fn insert_triangle(&mut self, tri: &Triangle) -> Result<usize> {
        let index = self.mesh.push_triangle(tri)?;
        let added = self.mesh.triangles()[index].clone();
        for corner in &added.triangle().v {
            self.bounds.include_point(corner);
        }
        self.tree.insert_bounded(added);
        Ok(index)
    }
}
