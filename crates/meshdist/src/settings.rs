//! Mesh index parameters.

use meshdist_kdtree::TreeSettings;
use serde::{Deserialize, Serialize};

use crate::error::{MeshError, Result};

/// Parameters for [`MeshIndex::build_with`](crate::MeshIndex::build_with).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshSettings {
    /// Input vertices closer than this (per axis, on a grid) are merged.
    pub merge_tolerance: f64,
    /// Triangle tree construction.
    pub tree: TreeSettings,
    /// Log a warning when the mesh has open or inconsistently wound edges.
    pub check_winding: bool,
}

impl Default for MeshSettings {
    fn default() -> Self {
        Self {
            merge_tolerance: 1e-4,
            tree: TreeSettings::default(),
            check_winding: true,
        }
    }
}

impl MeshSettings {
    /// Settings with the given merge tolerance and defaults elsewhere.
    pub fn with_tolerance(merge_tolerance: f64) -> Self {
        Self {
            merge_tolerance,
            ..Self::default()
        }
    }

    /// Validate settings.
    pub fn validate(&self) -> Result<()> {
        if !self.merge_tolerance.is_finite() || self.merge_tolerance <= 0.0 {
            return Err(MeshError::InvalidTolerance(self.merge_tolerance));
        }
        validate_tree(&self.tree)
    }
}

/// Triangles have extent, so their tree needs node bounds for its pruning
/// to be exact.
pub(crate) fn validate_tree(tree: &TreeSettings) -> Result<()> {
    if !tree.bounding {
        return Err(MeshError::InvalidSettings(
            "tree.bounding must be enabled to index triangles".into(),
        ));
    }
    if tree.sample_size == 0 {
        return Err(MeshError::InvalidSettings(
            "tree.sample_size must be positive".into(),
        ));
    }
    Ok(())
}
