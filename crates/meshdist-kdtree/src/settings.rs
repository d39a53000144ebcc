//! Construction parameters.

use serde::{Deserialize, Serialize};

/// Parameters for [`Tree::build_with`](crate::Tree::build_with).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeSettings {
    /// Store a tight bounding volume on every node.
    pub bounding: bool,
    /// Items sampled per level to estimate the median pivot.
    pub sample_size: usize,
    /// Seed for pivot sampling. Equal seeds give identical trees.
    pub seed: u64,
    /// Build the two halves of a split on separate rayon tasks while a
    /// partition holds more items than this. `None` builds sequentially.
    pub parallel_threshold: Option<usize>,
}

impl Default for TreeSettings {
    fn default() -> Self {
        Self {
            bounding: true,
            sample_size: 100,
            seed: 1,
            parallel_threshold: None,
        }
    }
}
