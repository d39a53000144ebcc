//! Shared mesh generators for integration tests.

use std::collections::{HashMap, HashSet};

use meshdist::{Point3, Triangle, Vec3};

const X: f64 = 0.525_731_112_119_133_6;
const Z: f64 = 0.850_650_808_352_039_9;

fn icosahedron() -> (Vec<Point3>, Vec<[usize; 3]>) {
    let vertices = vec![
        Point3::new(-X, 0.0, Z),
        Point3::new(X, 0.0, Z),
        Point3::new(-X, 0.0, -Z),
        Point3::new(X, 0.0, -Z),
        Point3::new(0.0, Z, X),
        Point3::new(0.0, Z, -X),
        Point3::new(0.0, -Z, X),
        Point3::new(0.0, -Z, -X),
        Point3::new(Z, X, 0.0),
        Point3::new(-Z, X, 0.0),
        Point3::new(Z, -X, 0.0),
        Point3::new(-Z, -X, 0.0),
    ];
    let faces = vec![
        [0, 1, 4], [0, 4, 9], [9, 4, 5], [4, 8, 5], [4, 1, 8],
        [8, 1, 10], [8, 10, 3], [5, 8, 3], [5, 3, 2], [2, 3, 7],
        [7, 3, 10], [7, 10, 6], [7, 6, 11], [11, 6, 0], [0, 6, 1],
        [6, 10, 1], [9, 11, 0], [9, 2, 11], [9, 5, 2], [7, 11, 2],
    ];
    (vertices, faces)
}

/// Split every face into four, pushing new vertices onto the unit sphere.
fn subdivide(vertices: &mut Vec<Point3>, faces: &[[usize; 3]]) -> Vec<[usize; 3]> {
    let mut midpoints: HashMap<(usize, usize), usize> = HashMap::new();
    let mut midpoint = |a: usize, b: usize, vertices: &mut Vec<Point3>| {
        let key = if a < b { (a, b) } else { (b, a) };
        *midpoints.entry(key).or_insert_with(|| {
            let m = (vertices[a].coords + vertices[b].coords).normalize();
            vertices.push(Point3::from(m));
            vertices.len() - 1
        })
    };
    let mut out = Vec::with_capacity(faces.len() * 4);
    for f in faces {
        let m = [
            midpoint(f[0], f[1], vertices),
            midpoint(f[1], f[2], vertices),
            midpoint(f[2], f[0], vertices),
        ];
        out.push([f[0], m[0], m[2]]);
        out.push([f[1], m[1], m[0]]);
        out.push([f[2], m[2], m[1]]);
        out.push(m);
    }
    out
}

/// Unit icosphere as indexed vertices and outward-wound faces.
pub fn icosphere_indexed(subdivisions: usize) -> (Vec<Point3>, Vec<[usize; 3]>) {
    let (mut vertices, mut faces) = icosahedron();
    for _ in 0..subdivisions {
        faces = subdivide(&mut vertices, &faces);
    }
    (vertices, faces)
}

/// Unit icosphere as a triangle soup.
pub fn icosphere(subdivisions: usize) -> Vec<Triangle> {
    let (vertices, faces) = icosphere_indexed(subdivisions);
    faces
        .iter()
        .map(|f| Triangle::new(vertices[f[0]], vertices[f[1]], vertices[f[2]]))
        .collect()
}

/// Minimum distance from `p` to any triangle, by exhaustive search.
pub fn brute_force_distance(triangles: &[Triangle], p: &Point3) -> f64 {
    triangles
        .iter()
        .map(|t| t.closest_point(p).dist2)
        .fold(f64::INFINITY, f64::min)
        .sqrt()
}

/// Closed surface of a union of unit voxels, two outward-wound triangles
/// per exposed cell face. Cells must meet face to face so the surface
/// stays manifold.
pub fn voxel_union(cells: &[[i32; 3]]) -> Vec<Triangle> {
    let filled: HashSet<[i32; 3]> = cells.iter().copied().collect();
    let mut out = Vec::new();
    for cell in cells {
        for axis in 0..3 {
            for step in [1, -1] {
                let mut neighbour = *cell;
                neighbour[axis] += step;
                if filled.contains(&neighbour) {
                    continue;
                }
                let mut base = cell.map(f64::from);
                if step > 0 {
                    base[axis] += 1.0;
                }
                let base = Point3::from(base);
                let u = Vec3::ith((axis + 1) % 3, 1.0);
                let v = Vec3::ith((axis + 2) % 3, 1.0);
                let quad = [base, base + u, base + u + v, base + v];
                if step > 0 {
                    out.push(Triangle::new(quad[0], quad[1], quad[2]));
                    out.push(Triangle::new(quad[0], quad[2], quad[3]));
                } else {
                    out.push(Triangle::new(quad[0], quad[2], quad[1]));
                    out.push(Triangle::new(quad[0], quad[3], quad[2]));
                }
            }
        }
    }
    out
}

/// Whether `p` lies strictly inside one of the unit voxels.
pub fn in_voxels(cells: &[[i32; 3]], p: &Point3) -> bool {
    cells.iter().any(|c| {
        (0..3).all(|axis| {
            let lo = f64::from(c[axis]);
            p[axis] > lo && p[axis] < lo + 1.0
        })
    })
}
