#![warn(missing_docs)]

//! Signed distance to closed triangle meshes.
//!
//! A triangle soup is merged into a [`Mesh`] that carries angle-weighted
//! vertex pseudo-normals and π-weighted edge pseudo-normals. A
//! [`MeshIndex`] stores the mesh's triangles in a bounded k-d tree keyed by
//! centroid, finds the closest triangle to a query point, and signs the
//! distance with the pseudo-normal of the vertex, edge or face the closest
//! point lies on.
//!
//! Meshes must be closed, free of self-intersections and wound
//! counter-clockwise seen from outside. Winding is not repaired; building
//! with [`MeshSettings::check_winding`] logs a warning when it is off.
//!
//! # Example
//!
//! ```
//! use meshdist::{triangles_from_flat, MeshIndex, Point3};
//!
//! let vertices = [
//!     0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0,
//! ];
//! let indices = [0, 2, 1, 0, 1, 3, 0, 3, 2, 1, 2, 3];
//! let triangles = triangles_from_flat(&vertices, &indices)?;
//!
//! let index = MeshIndex::build(&triangles, 1e-6)?;
//! let d = index.evaluate(&Point3::new(2.0, 0.0, 0.0));
//! assert!((d - 1.0).abs() < 1e-12);
//! # Ok::<(), meshdist::MeshError>(())
//! ```

pub mod error;
pub mod index;
pub mod mesh;
pub mod projection;
pub mod settings;
pub mod triangle;

pub use error::{MeshError, Result};
pub use index::{ClosestHit, MeshIndex};
pub use mesh::{Mesh, MeshTriangle, MeshVertex, WindingReport, DEGENERATE_TOLERANCE};
pub use meshdist_kdtree::TreeSettings;
pub use meshdist_math::{Aabb3, Point3, Vec3};
pub use projection::{closest_on_triangle_2d, Feature, LocalFrame, Projection};
pub use settings::MeshSettings;
pub use triangle::{triangles_from_flat, Triangle};
