#![warn(missing_docs)]

//! Generic k-d tree for meshdist.
//!
//! Indexes any item that can report a representative point, a signed
//! coordinate difference against a query point, and a squared distance to
//! a query point. Supports balanced bulk construction (median-of-randoms
//! pivots), nearest and k-nearest search, radius search, bounded range
//! traversal, and unbalanced incremental insertion.
//!
//! # Example
//!
//! ```
//! use meshdist_kdtree::{NKeeper, Tree};
//!
//! let tree = Tree::build_bounded(vec![
//!     [2.0, 3.0], [5.0, 4.0], [9.0, 6.0], [4.0, 7.0], [8.0, 1.0], [7.0, 2.0],
//! ]);
//!
//! let nearest = tree.nearest(&[9.0, 5.0]).unwrap();
//! assert_eq!(*nearest.item, [9.0, 6.0]);
//! assert_eq!(nearest.dist, 1.0);
//!
//! let two = tree.nearest_set(NKeeper::new(2), &[9.0, 5.0]);
//! assert_eq!(two.len(), 2);
//! assert!(two[0].dist <= two[1].dist);
//! ```

mod keeper;
mod medians;
mod point;
mod settings;
mod tree;

pub use keeper::{ComparableDist, DistKeeper, Keeper, NKeeper};
pub use medians::{median_of_randoms, partition};
pub use point::{Bounding, Comparable, Extender, Point};
pub use settings::TreeSettings;
pub use tree::{Iter, Node, Tree};
