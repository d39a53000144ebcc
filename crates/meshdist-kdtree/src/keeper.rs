//! Bounded result collectors for multi-item searches.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// An item paired with its squared distance to a query.
///
/// Ordered by distance only.
#[derive(Debug, Clone, Copy)]
pub struct ComparableDist<T> {
    /// The item.
    pub item: T,
    /// Squared distance from the item to the query.
    pub dist: f64,
}

impl<T> ComparableDist<T> {
    /// Pair an item with its squared distance.
    pub fn new(item: T, dist: f64) -> Self {
        Self { item, dist }
    }
}

impl<T> PartialEq for ComparableDist<T> {
    fn eq(&self, other: &Self) -> bool {
        self.dist.total_cmp(&other.dist) == Ordering::Equal
    }
}

impl<T> Eq for ComparableDist<T> {}

impl<T> PartialOrd for ComparableDist<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for ComparableDist<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.dist.total_cmp(&other.dist)
    }
}

/// A conditional max-heap guiding [`Tree::nearest_set`](crate::Tree::nearest_set).
///
/// The search only descends into a subtree whose lower distance bound does
/// not exceed [`Keeper::max_dist`].
pub trait Keeper<T> {
    /// Offer a candidate; the keeper decides whether to retain it.
    fn keep(&mut self, candidate: ComparableDist<T>);

    /// Largest squared distance still worth exploring.
    fn max_dist(&self) -> f64;

    /// Retained candidates in ascending distance order.
    fn into_sorted_vec(self) -> Vec<ComparableDist<T>>;
}

/// Retains the `n` closest candidates offered.
#[derive(Debug, Clone)]
pub struct NKeeper<T> {
    heap: BinaryHeap<ComparableDist<T>>,
    capacity: usize,
}

impl<T> NKeeper<T> {
    /// A keeper retaining at most `n` candidates.
    pub fn new(n: usize) -> Self {
        Self {
            heap: BinaryHeap::with_capacity(n),
            capacity: n,
        }
    }

    /// Number of candidates currently retained.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// True if nothing has been retained.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

impl<T> Keeper<T> for NKeeper<T> {
    fn keep(&mut self, candidate: ComparableDist<T>) {
        if self.heap.len() < self.capacity {
            self.heap.push(candidate);
            return;
        }
        // Later finds at equal distance displace the current maximum.
        let worst = self.heap.peek().map_or(f64::NEG_INFINITY, |max| max.dist);
        if candidate.dist <= worst {
            self.heap.pop();
            self.heap.push(candidate);
        }
    }

    fn max_dist(&self) -> f64 {
        if self.capacity == 0 {
            return f64::NEG_INFINITY;
        }
        if self.heap.len() < self.capacity {
            return f64::INFINITY;
        }
        self.heap.peek().map_or(f64::INFINITY, |max| max.dist)
    }

    fn into_sorted_vec(self) -> Vec<ComparableDist<T>> {
        self.heap.into_sorted_vec()
    }
}

/// Retains every candidate within a fixed radius.
#[derive(Debug, Clone)]
pub struct DistKeeper<T> {
    kept: Vec<ComparableDist<T>>,
    max_dist: f64,
}

impl<T> DistKeeper<T> {
    /// A keeper retaining candidates at Euclidean distance `radius` or less.
    pub fn new(radius: f64) -> Self {
        Self {
            kept: Vec::new(),
            max_dist: radius * radius,
        }
    }

    /// Number of candidates currently retained.
    pub fn len(&self) -> usize {
        self.kept.len()
    }

    /// True if nothing has been retained.
    pub fn is_empty(&self) -> bool {
        self.kept.is_empty()
    }
}

impl<T> Keeper<T> for DistKeeper<T> {
    fn keep(&mut self, candidate: ComparableDist<T>) {
        if candidate.dist <= self.max_dist {
            self.kept.push(candidate);
        }
    }

    fn max_dist(&self) -> f64 {
        self.max_dist
    }

    fn into_sorted_vec(mut self) -> Vec<ComparableDist<T>> {
        self.kept.sort();
        self.kept
    }
}
