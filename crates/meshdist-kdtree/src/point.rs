//! Point and item capabilities required by the tree.

/// A point in k-dimensional space.
pub trait Point: Clone {
    /// Number of coordinates.
    fn dims(&self) -> usize;

    /// Coordinate along `dim`. Panics if `dim >= self.dims()`.
    fn component(&self, dim: usize) -> f64;
}

/// An item stored in a [`Tree`](crate::Tree).
///
/// The pruning in every search depends on these contracts holding exactly.
pub trait Comparable<P: Point> {
    /// Representative point used to partition the tree.
    fn point(&self) -> P;

    /// Signed distance of the item's point from the plane through `point`
    /// perpendicular to `dim`: `self[dim] - point[dim]`.
    fn compare_point(&self, point: &P, dim: usize) -> f64;

    /// Squared Euclidean distance from the item to `point`.
    ///
    /// Items with spatial extent (e.g. triangles keyed by centroid) return
    /// the distance to the nearest part of the item, which may be smaller
    /// than the distance to the representative point. Such items must be
    /// indexed with bounding enabled.
    fn distance(&self, point: &P) -> f64;
}

/// Something that can grow a bounding volume to include itself.
///
/// Points grow the box by their own position; items with extent grow it
/// by their whole extent.
pub trait Extender<P: Point> {
    /// Returns `bounds` grown to include the receiver, or the receiver's
    /// own box when `bounds` is `None`.
    fn extend(&self, bounds: Option<Bounding<P>>) -> Bounding<P>;
}

/// Axis-aligned bounding volume. Containment is inclusive.
#[derive(Debug, Clone, PartialEq)]
pub struct Bounding<P> {
    /// Minimum corner.
    pub min: P,
    /// Maximum corner.
    pub max: P,
}

impl<P: Point> Bounding<P> {
    /// Create a bounding volume from its corners.
    pub fn new(min: P, max: P) -> Self {
        Self { min, max }
    }

    /// Whether `p` lies within the volume, faces included.
    pub fn contains(&self, p: &P) -> bool {
        (0..p.dims()).all(|d| {
            let c = p.component(d);
            self.min.component(d) <= c && c <= self.max.component(d)
        })
    }

    /// Whether two volumes share at least one point.
    pub fn overlaps(&self, other: &Bounding<P>) -> bool {
        (0..self.min.dims()).all(|d| {
            self.min.component(d) <= other.max.component(d)
                && other.min.component(d) <= self.max.component(d)
        })
    }

    /// Squared distance from `p` to the nearest point of the volume.
    pub fn distance_squared(&self, p: &P) -> f64 {
        let mut sum = 0.0;
        for d in 0..p.dims() {
            let c = p.component(d);
            let lo = self.min.component(d);
            let hi = self.max.component(d);
            let excess = if c < lo {
                lo - c
            } else if c > hi {
                c - hi
            } else {
                0.0
            };
            sum += excess * excess;
        }
        sum
    }
}

impl<P: Point + Extender<P>> Bounding<P> {
    /// Smallest volume enclosing both volumes.
    pub fn union(&self, other: &Bounding<P>) -> Bounding<P> {
        let grown = other.min.extend(Some(self.clone()));
        other.max.extend(Some(grown))
    }
}

impl<const N: usize> Point for [f64; N] {
    fn dims(&self) -> usize {
        N
    }

    fn component(&self, dim: usize) -> f64 {
        self[dim]
    }
}

impl<const N: usize> Comparable<[f64; N]> for [f64; N] {
    fn point(&self) -> [f64; N] {
        *self
    }

    fn compare_point(&self, point: &[f64; N], dim: usize) -> f64 {
        self[dim] - point[dim]
    }

    fn distance(&self, point: &[f64; N]) -> f64 {
        self.iter()
            .zip(point.iter())
            .map(|(a, b)| (a - b) * (a - b))
            .sum()
    }
}

impl<const N: usize> Extender<[f64; N]> for [f64; N] {
    fn extend(&self, bounds: Option<Bounding<[f64; N]>>) -> Bounding<[f64; N]> {
        let Some(mut b) = bounds else {
            return Bounding::new(*self, *self);
        };
        for d in 0..N {
            b.min[d] = b.min[d].min(self[d]);
            b.max[d] = b.max[d].max(self[d]);
        }
        b
    }
}

impl<const D: usize> Point for nalgebra::Point<f64, D> {
    fn dims(&self) -> usize {
        D
    }

    fn component(&self, dim: usize) -> f64 {
        self[dim]
    }
}

impl<const D: usize> Comparable<nalgebra::Point<f64, D>> for nalgebra::Point<f64, D> {
    fn point(&self) -> nalgebra::Point<f64, D> {
        *self
    }

    fn compare_point(&self, point: &nalgebra::Point<f64, D>, dim: usize) -> f64 {
        self[dim] - point[dim]
    }

    fn distance(&self, point: &nalgebra::Point<f64, D>) -> f64 {
        (self - point).norm_squared()
    }
}

impl<const D: usize> Extender<nalgebra::Point<f64, D>> for nalgebra::Point<f64, D> {
    fn extend(
        &self,
        bounds: Option<Bounding<nalgebra::Point<f64, D>>>,
    ) -> Bounding<nalgebra::Point<f64, D>> {
        match bounds {
            None => Bounding::new(*self, *self),
            Some(b) => Bounding::new(
                nalgebra::Point::from(b.min.coords.inf(&self.coords)),
                nalgebra::Point::from(b.max.coords.sup(&self.coords)),
            ),
        }
    }
}
