//! The k-d tree itself: construction, search, traversal and insertion.

use std::fmt;
use std::ops::ControlFlow;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::keeper::{ComparableDist, Keeper};
use crate::medians;
use crate::point::{Bounding, Comparable, Extender, Point};
use crate::settings::TreeSettings;

/// A tree node. Owns its two subtrees.
#[derive(Debug)]
pub struct Node<P, T> {
    item: T,
    plane: usize,
    left: Option<Box<Node<P, T>>>,
    right: Option<Box<Node<P, T>>>,
    bounds: Option<Bounding<P>>,
}

impl<P, T> Node<P, T> {
    fn leaf(item: T, plane: usize, bounds: Option<Bounding<P>>) -> Self {
        Self {
            item,
            plane,
            left: None,
            right: None,
            bounds,
        }
    }

    /// The item stored at this node.
    pub fn item(&self) -> &T {
        &self.item
    }

    /// Splitting dimension of this node.
    pub fn plane(&self) -> usize {
        self.plane
    }

    /// Subtree of items at or below this node's coordinate.
    pub fn left(&self) -> Option<&Node<P, T>> {
        self.left.as_deref()
    }

    /// Subtree of items at or above this node's coordinate.
    pub fn right(&self) -> Option<&Node<P, T>> {
        self.right.as_deref()
    }

    /// Tight bounding volume of the subtree, if maintained.
    pub fn bounds(&self) -> Option<&Bounding<P>> {
        self.bounds.as_ref()
    }

    /// Preorder iterator over the items of this subtree.
    pub fn iter(&self) -> Iter<'_, P, T> {
        Iter { stack: vec![self] }
    }
}

/// Preorder iterator over tree items.
pub struct Iter<'a, P, T> {
    stack: Vec<&'a Node<P, T>>,
}

impl<'a, P, T> Iterator for Iter<'a, P, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        let node = self.stack.pop()?;
        self.stack.extend(node.right.as_deref());
        self.stack.extend(node.left.as_deref());
        Some(&node.item)
    }
}

/// A k-d tree over items of type `T` keyed by points of type `P`.
///
/// Bulk construction via [`Tree::build`] or [`Tree::build_bounded`] yields
/// a balanced tree; [`Tree::insert`] adds items without rebalancing.
/// Query methods take `&self` and may run concurrently.
pub struct Tree<P, T> {
    root: Option<Box<Node<P, T>>>,
    len: usize,
}

type BoundFn<P, T> = fn(&T, Option<&Bounding<P>>, Option<&Bounding<P>>) -> Option<Bounding<P>>;

fn unbounded<P, T>(
    _item: &T,
    _left: Option<&Bounding<P>>,
    _right: Option<&Bounding<P>>,
) -> Option<Bounding<P>> {
    None
}

fn bounded<P, T>(
    item: &T,
    left: Option<&Bounding<P>>,
    right: Option<&Bounding<P>>,
) -> Option<Bounding<P>>
where
    P: Point + Extender<P>,
    T: Extender<P>,
{
    let mut b = item.extend(None);
    if let Some(l) = left {
        b = b.union(l);
    }
    if let Some(r) = right {
        b = b.union(r);
    }
    Some(b)
}

struct Build<P, T> {
    dims: usize,
    samples: usize,
    bound: BoundFn<P, T>,
}

impl<P: Point, T: Comparable<P>> Build<P, T> {
    fn assemble(
        &self,
        item: T,
        plane: usize,
        left: Option<Box<Node<P, T>>>,
        right: Option<Box<Node<P, T>>>,
    ) -> Box<Node<P, T>> {
        let bounds = (self.bound)(
            &item,
            left.as_ref().and_then(|n| n.bounds.as_ref()),
            right.as_ref().and_then(|n| n.bounds.as_ref()),
        );
        Box::new(Node {
            item,
            plane,
            left,
            right,
            bounds,
        })
    }

    /// Split `items` around a pivot along `plane`.
    ///
    /// Returns the pivot and the items that sort before and after it.
    fn split(&self, mut items: Vec<T>, plane: usize, rng: &mut SmallRng) -> Option<(T, Vec<T>, Vec<T>)> {
        if items.is_empty() {
            return None;
        }
        let mid = medians::pivot(&mut items, plane, self.samples, rng);
        let after = items.split_off(mid + 1);
        let pivot = items.pop()?;
        Some((pivot, items, after))
    }

    /// Build the subtree for `items` with an explicit work stack, so the
    /// depth of the result never touches the call stack.
    fn node(&self, items: Vec<T>, depth: usize, rng: &mut SmallRng) -> Option<Box<Node<P, T>>> {
        let mut steps = vec![Step::Split(items, depth)];
        let mut built: Vec<Option<Box<Node<P, T>>>> = Vec::new();
        while let Some(step) = steps.pop() {
            match step {
                Step::Split(items, depth) => {
                    let plane = depth % self.dims;
                    let Some((pivot, before, after)) = self.split(items, plane, rng) else {
                        built.push(None);
                        continue;
                    };
                    steps.push(Step::Join(pivot, plane));
                    steps.push(Step::Split(after, depth + 1));
                    steps.push(Step::Split(before, depth + 1));
                }
                Step::Join(item, plane) => {
                    let right = built.pop().flatten();
                    let left = built.pop().flatten();
                    built.push(Some(self.assemble(item, plane, left, right)));
                }
            }
        }
        built.pop().flatten()
    }
}

/// Pending work for [`Build::node`].
enum Step<T> {
    /// Partition these items at this depth.
    Split(Vec<T>, usize),
    /// Both subtrees are built; join them under this pivot.
    Join(T, usize),
}

/// Parallel splits stop here and the rest is built on the current task.
const MAX_PARALLEL_DEPTH: usize = 48;

impl<P, T> Build<P, T>
where
    P: Point + Send,
    T: Comparable<P> + Send,
{
    fn node_par(
        &self,
        items: Vec<T>,
        depth: usize,
        threshold: usize,
        rng: &mut SmallRng,
    ) -> Option<Box<Node<P, T>>> {
        if items.len() <= threshold || depth >= MAX_PARALLEL_DEPTH {
            return self.node(items, depth, rng);
        }
        let plane = depth % self.dims;
        let (pivot, before, after) = self.split(items, plane, rng)?;
        let mut left_rng = SmallRng::seed_from_u64(rng.gen());
        let mut right_rng = SmallRng::seed_from_u64(rng.gen());
        let (left, right) = rayon::join(
            || self.node_par(before, depth + 1, threshold, &mut left_rng),
            || self.node_par(after, depth + 1, threshold, &mut right_rng),
        );
        Some(self.assemble(pivot, plane, left, right))
    }
}

impl<P, T> Default for Tree<P, T> {
    fn default() -> Self {
        Self { root: None, len: 0 }
    }
}

impl<P, T> Tree<P, T> {
    /// An empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of items in the tree.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the tree holds no items.
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Root node, if any.
    pub fn root(&self) -> Option<&Node<P, T>> {
        self.root.as_deref()
    }

    /// Bounding volume of the whole tree, if maintained.
    pub fn bounds(&self) -> Option<&Bounding<P>> {
        self.root.as_ref().and_then(|r| r.bounds.as_ref())
    }

    /// Preorder iterator over all items.
    pub fn iter(&self) -> Iter<'_, P, T> {
        Iter {
            stack: self.root.as_deref().into_iter().collect(),
        }
    }
}

impl<P: Point, T: Comparable<P>> Tree<P, T> {
    /// Build a balanced tree without bounding volumes.
    ///
    /// Suitable for point items only: items with spatial extent need
    /// [`Tree::build_bounded`].
    pub fn build(items: Vec<T>) -> Self {
        let settings = TreeSettings {
            bounding: false,
            ..TreeSettings::default()
        };
        Self::build_sequential(items, &settings, unbounded::<P, T>)
    }

    fn build_sequential(items: Vec<T>, settings: &TreeSettings, bound: BoundFn<P, T>) -> Self {
        let len = items.len();
        let Some(first) = items.first() else {
            return Self::new();
        };
        let build = Build {
            dims: first.point().dims(),
            samples: settings.sample_size.max(1),
            bound,
        };
        let mut rng = SmallRng::seed_from_u64(settings.seed);
        let root = build.node(items, 0, &mut rng);
        debug!(items = len, bounding = settings.bounding, parallel = false, "Built k-d tree");
        Self { root, len }
    }

    /// Whether a point lies within the tree's bounding volume.
    ///
    /// Always true for a non-empty tree without bounds; false when empty.
    pub fn contains(&self, p: &P) -> bool {
        match &self.root {
            None => false,
            Some(root) => root.bounds.as_ref().map_or(true, |b| b.contains(p)),
        }
    }

    /// The item nearest to `query` and its squared distance, or `None` for
    /// an empty tree.
    pub fn nearest(&self, query: &P) -> Option<ComparableDist<&T>> {
        let root = self.root.as_deref()?;
        let mut best: Option<ComparableDist<&T>> = None;
        let mut best_dist = f64::INFINITY;
        let mut stack = vec![(root, root_bound(root, query))];

        while let Some((node, bound)) = stack.pop() {
            if bound >= best_dist {
                continue;
            }
            let dist = node.item.distance(query);
            if dist < best_dist {
                best_dist = dist;
                best = Some(ComparableDist::new(&node.item, dist));
            }
            push_children(&mut stack, node, bound, query);
        }
        best
    }

    /// Offer every item that could qualify to `keeper` and return what it
    /// retained, ascending by squared distance.
    pub fn nearest_set<'a, K>(&'a self, mut keeper: K, query: &P) -> Vec<ComparableDist<&'a T>>
    where
        K: Keeper<&'a T>,
    {
        let Some(root) = self.root.as_deref() else {
            return keeper.into_sorted_vec();
        };
        let mut stack = vec![(root, root_bound(root, query))];

        while let Some((node, bound)) = stack.pop() {
            if bound > keeper.max_dist() {
                continue;
            }
            keeper.keep(ComparableDist::new(&node.item, node.item.distance(query)));
            push_children(&mut stack, node, bound, query);
        }
        keeper.into_sorted_vec()
    }

    /// Insert an item without rebalancing.
    ///
    /// Bounding volumes along the insertion path are discarded; use
    /// [`Tree::insert_bounded`] to keep them.
    pub fn insert(&mut self, item: T) {
        self.insert_with(item, |node, _| node.bounds = None);
    }

    fn insert_with<F>(&mut self, item: T, mut on_path: F) -> &mut Node<P, T>
    where
        F: FnMut(&mut Node<P, T>, &T),
    {
        let dims = item.point().dims();
        let mut plane = 0;
        let mut slot = &mut self.root;
        while let Some(node) = slot {
            on_path(&mut **node, &item);
            plane = (node.plane + 1) % dims;
            slot = if item.compare_point(&node.item.point(), node.plane) <= 0.0 {
                &mut node.left
            } else {
                &mut node.right
            };
        }
        self.len += 1;
        slot.insert(Box::new(Node::leaf(item, plane, None)))
    }

    /// Visit every item in order. Stops early when `visit` breaks.
    ///
    /// `visit` receives the item, its node's bounds and its depth.
    pub fn do_all<F>(&self, visit: F) -> ControlFlow<()>
    where
        F: FnMut(&T, Option<&Bounding<P>>, usize) -> ControlFlow<()>,
    {
        self.walk(|_| (true, true, true), visit)
    }

    /// Visit, in order, every item whose point lies in `b`. Stops early
    /// when `visit` breaks.
    pub fn do_bounded<F>(&self, b: &Bounding<P>, visit: F) -> ControlFlow<()>
    where
        F: FnMut(&T, Option<&Bounding<P>>, usize) -> ControlFlow<()>,
    {
        self.walk(
            |node| {
                if node.bounds.as_ref().is_some_and(|nb| !nb.overlaps(b)) {
                    return (false, false, false);
                }
                let plane = node.plane;
                (
                    node.item.compare_point(&b.min, plane) >= 0.0,
                    b.contains(&node.item.point()),
                    node.item.compare_point(&b.max, plane) <= 0.0,
                )
            },
            visit,
        )
    }

    /// In-order traversal. `select` decides per node whether to descend
    /// left, visit the node, and descend right.
    fn walk<S, F>(&self, mut select: S, mut visit: F) -> ControlFlow<()>
    where
        S: FnMut(&Node<P, T>) -> (bool, bool, bool),
        F: FnMut(&T, Option<&Bounding<P>>, usize) -> ControlFlow<()>,
    {
        let mut stack: Vec<(&Node<P, T>, usize, bool)> = Vec::new();
        if let Some(root) = self.root.as_deref() {
            stack.push((root, 0, false));
        }
        while let Some((node, depth, expanded)) = stack.pop() {
            if expanded {
                visit(&node.item, node.bounds.as_ref(), depth)?;
                continue;
            }
            let (left, here, right) = select(node);
            if right {
                if let Some(r) = node.right.as_deref() {
                    stack.push((r, depth + 1, false));
                }
            }
            if here {
                stack.push((node, depth, true));
            }
            if left {
                if let Some(l) = node.left.as_deref() {
                    stack.push((l, depth + 1, false));
                }
            }
        }
        ControlFlow::Continue(())
    }

    /// Whether every node separates its subtrees: left items are at or
    /// below the node along its plane, right items at or above.
    ///
    /// One pass over the tree, carrying the per-axis range of each subtree.
    pub fn is_partitioned(&self) -> bool {
        self.check_subtrees(|node, left: Option<(Vec<f64>, Vec<f64>)>, right| {
            let p = node.item.point();
            let split = p.component(node.plane);
            if left.as_ref().is_some_and(|(_, hi)| hi[node.plane] > split)
                || right.as_ref().is_some_and(|(lo, _)| lo[node.plane] < split)
            {
                return None;
            }
            let mut lo: Vec<f64> = (0..p.dims()).map(|d| p.component(d)).collect();
            let mut hi = lo.clone();
            for (clo, chi) in left.iter().chain(right.iter()) {
                for d in 0..lo.len() {
                    lo[d] = lo[d].min(clo[d]);
                    hi[d] = hi[d].max(chi[d]);
                }
            }
            Some((lo, hi))
        })
    }
}

impl<P, T> Tree<P, T> {
    /// Postorder fold over every subtree. `combine` receives a node and
    /// the results for its children; returning `None` fails the check.
    fn check_subtrees<S, F>(&self, mut combine: F) -> bool
    where
        F: FnMut(&Node<P, T>, Option<S>, Option<S>) -> Option<S>,
    {
        let mut pending: Vec<(&Node<P, T>, bool)> =
            self.root.as_deref().map(|r| (r, false)).into_iter().collect();
        let mut done: Vec<S> = Vec::new();
        while let Some((node, expanded)) = pending.pop() {
            if !expanded {
                pending.push((node, true));
                pending.extend(node.right.as_deref().map(|r| (r, false)));
                pending.extend(node.left.as_deref().map(|l| (l, false)));
                continue;
            }
            let right = if node.right.is_some() { done.pop() } else { None };
            let left = if node.left.is_some() { done.pop() } else { None };
            match combine(node, left, right) {
                Some(summary) => done.push(summary),
                None => return false,
            }
        }
        true
    }
}

impl<P, T> Tree<P, T>
where
    P: Point + Extender<P>,
    T: Comparable<P> + Extender<P>,
{
    /// Build a balanced tree with a tight bounding volume on every node.
    pub fn build_bounded(items: Vec<T>) -> Self {
        Self::build_sequential(items, &TreeSettings::default(), bounded::<P, T>)
    }

    /// Build a balanced tree as configured by `settings`.
    pub fn build_with(items: Vec<T>, settings: &TreeSettings) -> Self
    where
        P: Send,
        T: Send,
    {
        let bound: BoundFn<P, T> = if settings.bounding {
            bounded::<P, T>
        } else {
            unbounded::<P, T>
        };
        let Some(threshold) = settings.parallel_threshold else {
            return Self::build_sequential(items, settings, bound);
        };
        let len = items.len();
        let Some(first) = items.first() else {
            return Self::new();
        };
        let build = Build {
            dims: first.point().dims(),
            samples: settings.sample_size.max(1),
            bound,
        };
        let mut rng = SmallRng::seed_from_u64(settings.seed);
        let root = build.node_par(items, 0, threshold.max(1), &mut rng);
        debug!(items = len, bounding = settings.bounding, parallel = true, threshold, "Built k-d tree");
        Self { root, len }
    }

    /// Insert an item without rebalancing, growing the bounding volumes
    /// along the insertion path to include it.
    ///
    /// The new leaf gets bounds when the tree is empty or its root is
    /// bounded.
    pub fn insert_bounded(&mut self, item: T) {
        let leaf_bounds = self.root.as_ref().map_or(true, |r| r.bounds.is_some());
        let leaf = self.insert_with(
            item,
            |node, item| {
                if let Some(b) = node.bounds.take() {
                    node.bounds = Some(item.extend(Some(b)));
                }
            },
        );
        if leaf_bounds {
            leaf.bounds = Some(leaf.item.extend(None));
        }
    }

    /// Full structural check: the partition invariant holds and every
    /// stored bounding volume is exactly the extent of its subtree.
    pub fn is_kd_tree(&self) -> bool
    where
        P: PartialEq,
    {
        self.is_partitioned()
            && self.check_subtrees(|node, left: Option<Bounding<P>>, right| {
                let mut extent = node.item.extend(None);
                for child in left.iter().chain(right.iter()) {
                    extent = extent.union(child);
                }
                match &node.bounds {
                    Some(b) if *b != extent => None,
                    _ => Some(extent),
                }
            })
    }
}

impl<P, T> Drop for Tree<P, T> {
    fn drop(&mut self) {
        // unlink iteratively so a degenerate chain cannot exhaust the stack
        let mut stack: Vec<Box<Node<P, T>>> = self.root.take().into_iter().collect();
        while let Some(mut node) = stack.pop() {
            stack.extend(node.left.take());
            stack.extend(node.right.take());
        }
    }
}

impl<P: fmt::Debug, T> fmt::Debug for Tree<P, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tree")
            .field("len", &self.len)
            .field("bounds", &self.bounds())
            .finish()
    }
}

fn root_bound<P: Point, T>(root: &Node<P, T>, query: &P) -> f64 {
    root.bounds.as_ref().map_or(0.0, |b| b.distance_squared(query))
}

/// Push the children of `node` so the one on the query's side of the
/// splitting plane is popped first.
///
/// A child's lower bound is its box distance when it has bounds, otherwise
/// the parent's bound, raised to the squared plane distance for the far
/// side.
fn push_children<'a, P, T>(
    stack: &mut Vec<(&'a Node<P, T>, f64)>,
    node: &'a Node<P, T>,
    bound: f64,
    query: &P,
) where
    P: Point,
    T: Comparable<P>,
{
    let c = -node.item.compare_point(query, node.plane);
    let (near, far) = if c <= 0.0 {
        (node.left.as_deref(), node.right.as_deref())
    } else {
        (node.right.as_deref(), node.left.as_deref())
    };
    let child_bound = |child: &Node<P, T>, inherited: f64| {
        child
            .bounds
            .as_ref()
            .map_or(inherited, |b| b.distance_squared(query))
    };
    if let Some(far) = far {
        stack.push((far, child_bound(far, bound.max(c * c))));
    }
    if let Some(near) = near {
        stack.push((near, child_bound(near, bound)));
    }
}
