//! Error types for mesh indexing.

use thiserror::Error;

/// Errors that can occur while building a mesh index.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MeshError {
    /// No triangles were supplied.
    #[error("mesh is empty")]
    EmptyMesh,

    /// A flat input buffer has the wrong shape.
    #[error("malformed {buffer} buffer: {reason}")]
    Shape {
        /// Which buffer was malformed.
        buffer: &'static str,
        /// What is wrong with it.
        reason: String,
    },

    /// A triangle has a zero-length edge, zero area, or non-finite
    /// coordinates, possibly after vertex merging.
    #[error("triangle {index} is degenerate")]
    DegenerateTriangle {
        /// Position of the triangle in the input.
        index: usize,
    },

    /// The vertex merge tolerance is unusable for this mesh.
    #[error("invalid merge tolerance: {0}")]
    InvalidTolerance(f64),

    /// Settings failed validation.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),
}

/// Result type for mesh operations.
pub type Result<T> = std::result::Result<T, MeshError>;
