//! Closest point on a triangle through a rigid local frame.
//!
//! The triangle is moved into a frame where `v0` is the origin, `v1` lies
//! on the +x axis and `v2` in the upper half of the xy plane. A query point
//! is moved into the same frame, its z coordinate dropped, and the closest
//! point is found in 2D. The answer is mapped back with the inverse frame.

use meshdist_math::{Point2, Point3, Transform};

use crate::triangle::Triangle;

/// The part of a triangle that realizes the closest point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    /// Vertex `i`.
    Vertex(usize),
    /// Interior of edge `i`, from vertex `i` to vertex `(i + 1) % 3`.
    Edge(usize),
    /// Interior of the face.
    Face,
}

/// Result of projecting a point onto a triangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    /// Closest point on the triangle.
    pub closest: Point3,
    /// Feature the closest point lies on.
    pub feature: Feature,
    /// Squared distance from the query to `closest`.
    pub dist2: f64,
}

/// Rigid frame of one triangle and the triangle's 2D image in it.
#[derive(Debug, Clone)]
pub struct LocalFrame {
    to_local: Transform,
    to_world: Transform,
    local: [Point2; 3],
}

impl LocalFrame {
    /// Build the frame by Gram-Schmidt on the triangle's two edges from
    /// `v0`. The triangle must not be degenerate.
    pub fn new(tri: &Triangle) -> Self {
        let [v0, v1, v2] = tri.v;
        let e1 = v1 - v0;
        let e2 = v2 - v0;
        let x = e1.normalize();
        let y = (e2 - x * e2.dot(&x)).normalize();
        let z = x.cross(&y);
        let to_world = Transform::from_frame(&v0, &x, &y, &z);
        Self {
            to_local: to_world.rigid_inverse(),
            to_world,
            local: [
                Point2::origin(),
                Point2::new(e1.norm(), 0.0),
                Point2::new(e2.dot(&x), e2.dot(&y)),
            ],
        }
    }

    /// World to local transform.
    pub fn to_local(&self) -> &Transform {
        &self.to_local
    }

    /// Local to world transform.
    pub fn to_world(&self) -> &Transform {
        &self.to_world
    }

    /// The triangle's vertices in the local xy plane, counter-clockwise.
    pub fn local_vertices(&self) -> &[Point2; 3] {
        &self.local
    }

    /// Closest point on the triangle to `p`.
    pub fn project(&self, p: &Point3) -> Projection {
        let q = self.to_local.apply_point(p);
        let (flat, feature) = closest_on_triangle_2d(&Point2::new(q.x, q.y), &self.local);
        let closest = self.to_world.apply_point(&Point3::new(flat.x, flat.y, 0.0));
        Projection {
            closest,
            feature,
            dist2: (p - closest).norm_squared(),
        }
    }
}

fn cross2(a: &Point2, b: &Point2, p: &Point2) -> f64 {
    let ab = b - a;
    let ap = p - a;
    ab.x * ap.y - ab.y * ap.x
}

/// Closest point on a 2D triangle to `p` and the feature realizing it.
///
/// Works for either orientation. A point inside or on the boundary returns
/// itself with [`Feature::Face`].
pub fn closest_on_triangle_2d(p: &Point2, tri: &[Point2; 3]) -> (Point2, Feature) {
    let orientation = cross2(&tri[0], &tri[1], &tri[2]);
    let inside = orientation != 0.0
        && (0..3).all(|i| cross2(&tri[i], &tri[(i + 1) % 3], p) * orientation.signum() >= 0.0);
    if inside {
        return (*p, Feature::Face);
    }

    let mut best = (tri[0], Feature::Vertex(0));
    let mut best_dist = f64::INFINITY;
    for i in 0..3 {
        let j = (i + 1) % 3;
        let (a, b) = (tri[i], tri[j]);
        let ab = b - a;
        let t = (p - a).dot(&ab) / ab.norm_squared();
        let candidate = if t <= 0.0 {
            (a, Feature::Vertex(i))
        } else if t >= 1.0 {
            (b, Feature::Vertex(j))
        } else {
            (a + ab * t, Feature::Edge(i))
        };
        let dist = (p - candidate.0).norm_squared();
        if dist < best_dist {
            best_dist = dist;
            best = candidate;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn random_point(rng: &mut StdRng) -> Point3 {
        Point3::new(
            rng.gen_range(-3.0..3.0),
            rng.gen_range(-3.0..3.0),
            rng.gen_range(-3.0..3.0),
        )
    }

    fn random_triangle(rng: &mut StdRng) -> Triangle {
        loop {
            let t = Triangle::new(random_point(rng), random_point(rng), random_point(rng));
            if !t.is_degenerate(1e-3) {
                return t;
            }
        }
    }

    /// Densely sample the triangle's surface for a lower bound on the error.
    fn sampled_min_dist2(tri: &Triangle, p: &Point3, steps: usize) -> f64 {
        let mut best = f64::INFINITY;
        for i in 0..=steps {
            for j in 0..=(steps - i) {
                let u = i as f64 / steps as f64;
                let v = j as f64 / steps as f64;
                let q = tri.v[0] + (tri.v[1] - tri.v[0]) * u + (tri.v[2] - tri.v[0]) * v;
                best = best.min((p - q).norm_squared());
            }
        }
        best
    }

    #[test]
    fn test_2d_features() {
        let tri = [Point2::new(0.0, 0.0), Point2::new(4.0, 0.0), Point2::new(0.0, 4.0)];
        let cases = [
            (Point2::new(1.0, 1.0), Point2::new(1.0, 1.0), Feature::Face),
            (Point2::new(-1.0, -1.0), Point2::new(0.0, 0.0), Feature::Vertex(0)),
            (Point2::new(6.0, -1.0), Point2::new(4.0, 0.0), Feature::Vertex(1)),
            (Point2::new(-1.0, 5.0), Point2::new(0.0, 4.0), Feature::Vertex(2)),
            (Point2::new(2.0, -3.0), Point2::new(2.0, 0.0), Feature::Edge(0)),
            (Point2::new(3.0, 3.0), Point2::new(2.0, 2.0), Feature::Edge(1)),
            (Point2::new(-2.0, 1.0), Point2::new(0.0, 1.0), Feature::Edge(2)),
        ];
        for (p, want, feature) in cases {
            let (got, f) = closest_on_triangle_2d(&p, &tri);
            assert_relative_eq!(got, want, epsilon = 1e-12);
            assert_eq!(f, feature, "query {p}");
        }
    }

    #[test]
    fn test_2d_clockwise_triangle() {
        let tri = [Point2::new(0.0, 0.0), Point2::new(0.0, 4.0), Point2::new(4.0, 0.0)];
        let (got, f) = closest_on_triangle_2d(&Point2::new(1.0, 1.0), &tri);
        assert_eq!(f, Feature::Face);
        assert_eq!(got, Point2::new(1.0, 1.0));
    }

    #[test]
    fn test_frame_round_trip_and_isometry() {
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..200 {
            let tri = random_triangle(&mut rng);
            let frame = LocalFrame::new(&tri);
            let local: Vec<Point3> = tri.v.iter().map(|v| frame.to_local().apply_point(v)).collect();
            for (v, l) in tri.v.iter().zip(&local) {
                let back = frame.to_world().apply_point(l);
                assert!((back - v).norm() < 1e-9);
                assert!(l.z.abs() < 1e-9);
            }
            for (l, flat) in local.iter().zip(frame.local_vertices()) {
                assert!((l.xy() - flat).norm() < 1e-9);
            }

            let flat = Triangle::new(local[0], local[1], local[2]);
            assert_relative_eq!(flat.area(), tri.area(), max_relative = 1e-9);
            for i in 0..3 {
                let angle = |t: &Triangle| {
                    let a = t.v[(i + 1) % 3] - t.v[i];
                    let b = t.v[(i + 2) % 3] - t.v[i];
                    a.angle(&b)
                };
                assert_relative_eq!(angle(&flat), angle(&tri), epsilon = 1e-9);
            }
            // counter-clockwise in the local plane
            assert!(frame.local_vertices()[2].y > 0.0);
        }
    }

    #[test]
    fn test_projection_matches_sampling() {
        let mut rng = StdRng::seed_from_u64(17);
        for _ in 0..100 {
            let tri = random_triangle(&mut rng);
            let p = random_point(&mut rng);
            let hit = LocalFrame::new(&tri).project(&p);
            let sampled = sampled_min_dist2(&tri, &p, 60);
            assert!(hit.dist2 <= sampled + 1e-9, "{} > {}", hit.dist2, sampled);
            // the closest point lies on the triangle, so no sample beats it by much
            assert!(sampled.sqrt() - hit.dist2.sqrt() < 0.25);
            assert_relative_eq!(hit.dist2, (p - hit.closest).norm_squared(), epsilon = 1e-12);
        }
    }

    #[test]
    fn test_feature_points_are_exact() {
        let tri = Triangle::new(
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, 0.0, 1.0),
        );
        let frame = LocalFrame::new(&tri);

        let hit = frame.project(&Point3::new(3.0, -1.0, -1.0));
        assert_eq!(hit.feature, Feature::Vertex(0));
        assert_relative_eq!(hit.closest, tri.v[0], epsilon = 1e-12);

        let hit = frame.project(&Point3::new(1.0, 1.0, 1.0));
        assert_eq!(hit.feature, Feature::Face);
        assert_relative_eq!(hit.closest, Point3::new(1.0, 1.0, 1.0) / 3.0, epsilon = 1e-12);

        let hit = frame.project(&Point3::new(1.0, 1.0, -1.0));
        assert_eq!(hit.feature, Feature::Edge(0));
        assert_relative_eq!(hit.closest, Point3::new(0.5, 0.5, 0.0), epsilon = 1e-12);
    }
}
