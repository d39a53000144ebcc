//! Signs around the concave edges and vertices of a voxel union.

mod common;

use meshdist::{MeshIndex, Point3, Triangle, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use common::{brute_force_distance, in_voxels, voxel_union};

/// An arm of three cells along x with one cell stacked on the first along
/// y and one along z. The inner corners are concave edges and (1, 1, 1)
/// is a saddle vertex.
const CELLS: [[i32; 3]; 5] = [[0, 0, 0], [1, 0, 0], [2, 0, 0], [0, 1, 0], [0, 0, 1]];

fn voxel_index() -> (Vec<Triangle>, MeshIndex) {
    let triangles = voxel_union(&CELLS);
    let index = MeshIndex::build(&triangles, 1e-6).unwrap();
    (triangles, index)
}

/// Check sign against containment and magnitude against brute force for
/// `count` points within `spread` of `centre`. Returns how many points
/// were far enough from the surface to have a sign.
fn check_near(
    index: &MeshIndex,
    triangles: &[Triangle],
    centre: Point3,
    spread: Vec3,
    count: usize,
    rng: &mut StdRng,
) -> usize {
    let mut signed = 0;
    for _ in 0..count {
        let offset = Vec3::new(
            rng.gen_range(-spread.x..spread.x),
            rng.gen_range(-spread.y..spread.y),
            rng.gen_range(-spread.z..spread.z),
        );
        let p = centre + offset;
        let d = index.evaluate(&p);
        let want = brute_force_distance(triangles, &p);
        assert!((d.abs() - want).abs() < 1e-9, "|{d}| vs {want} at {p}");
        if want > 1e-6 {
            assert_eq!(d < 0.0, in_voxels(&CELLS, &p), "sign of {d} at {p}");
            signed += 1;
        }
    }
    signed
}

#[test]
fn test_voxel_union_is_closed() {
    let (triangles, index) = voxel_index();
    // 30 cell faces, 8 of them shared between two cells
    assert_eq!(triangles.len(), 44);
    let mesh = index.mesh();
    assert_eq!(mesh.edge_count(), 66);
    let report = mesh.winding_report();
    assert_eq!(report.open_edges, 0);
    assert!(report.is_consistent());
}

#[test]
fn test_points_at_concave_edge() {
    let (_, index) = voxel_index();
    // inside the corner cell, closest to the inner edge x = y = 1
    let d = index.evaluate(&Point3::new(0.9, 0.9, 0.5));
    assert!((d + 0.02_f64.sqrt()).abs() < 1e-12, "distance {d}");
    // in the empty notch, equally close to the two faces meeting there
    let d = index.evaluate(&Point3::new(1.1, 1.1, 0.5));
    assert!((d - 0.1).abs() < 1e-12, "distance {d}");
    // in the notch between the two stacked cells
    let d = index.evaluate(&Point3::new(0.5, 1.2, 1.2));
    assert!((d - 0.2).abs() < 1e-12, "distance {d}");
}

#[test]
fn test_signs_match_containment_everywhere() {
    let (triangles, index) = voxel_index();
    let mut rng = StdRng::seed_from_u64(2024);
    let signed = check_near(
        &index,
        &triangles,
        Point3::new(1.5, 1.0, 1.0),
        Vec3::new(2.0, 1.5, 1.5),
        20_000,
        &mut rng,
    );
    assert!(signed > 19_000);
}

#[test]
fn test_signs_around_concave_features() {
    let (triangles, index) = voxel_index();
    let mut rng = StdRng::seed_from_u64(99);
    let spread = Vec3::repeat(0.3);
    let features = [
        // concave edges
        Point3::new(1.0, 1.0, 0.5),
        Point3::new(1.0, 0.5, 1.0),
        Point3::new(0.5, 1.0, 1.0),
        // saddle vertex and the concave ends of the edges
        Point3::new(1.0, 1.0, 1.0),
        Point3::new(1.0, 1.0, 0.0),
        Point3::new(0.0, 1.0, 1.0),
    ];
    for centre in features {
        let signed = check_near(&index, &triangles, centre, spread, 3_000, &mut rng);
        assert!(signed > 2_900, "only {signed} signed points near {centre}");
    }
}
