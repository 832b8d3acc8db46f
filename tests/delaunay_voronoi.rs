//! Integration tests for Delaunay triangulations and Voronoi diagrams.

#![forbid(unsafe_code)]

use approx::assert_relative_eq;
use proptest::prelude::*;
use quickhull_nd::prelude::*;

fn init_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

fn grid(n: usize) -> Vec<[f64; 2]> {
    let mut rows = Vec::new();
    for i in 0..n {
        for j in 0..n {
            rows.push([i as f64, j as f64]);
        }
    }
    rows
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

// =============================================================================
// DELAUNAY
// =============================================================================

#[test]
fn test_square_with_center_gives_four_triangles() {
    init_tracing();
    let triangulation = DelaunayTriangulation::from_rows(
        &[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0], [0.5, 0.5]],
        HullOptions::default(),
    )
    .unwrap();
    let simplices = triangulation.simplices();
    assert_eq!(simplices.len(), 4);
    for simplex in &simplices {
        assert_eq!(simplex.len(), 3);
        assert!(simplex.contains(&4));
    }
    assert_eq!(triangulation.hull().validate(), Ok(()));
}

#[test]
fn test_delaunay_in_3d() {
    init_tracing();
    let rows = [
        [0.0, 0.0, 0.0],
        [1.0, 0.0, 0.0],
        [0.0, 1.0, 0.0],
        [0.0, 0.0, 1.0],
        [0.3, 0.3, 0.3],
    ];
    let triangulation = DelaunayTriangulation::from_rows(&rows, HullOptions::default()).unwrap();
    assert_eq!(triangulation.dim(), 3);
    assert_eq!(triangulation.regions().len(), 4);
    assert!(triangulation.regions().iter().all(|r| r.simplicial && r.points.contains(&4)));
}

#[test]
fn test_joggled_grid_is_fully_triangulated() {
    init_tracing();
    let options = HullOptions {
        merge_mode: MergeMode::None,
        joggle: Some(JoggleOptions::default()),
        ..HullOptions::default()
    };
    let triangulation = DelaunayTriangulation::from_rows(&grid(3), options).unwrap();
    // At least 8 triangles cover the 2x2 square; joggle never merges
    assert!(triangulation.regions().len() >= 8);
    assert!(triangulation.regions().iter().all(|r| r.simplicial));
}

// =============================================================================
// VORONOI
// =============================================================================

#[test]
fn test_grid_center_cell_is_bounded() {
    init_tracing();
    let diagram = VoronoiDiagram::from_rows(&grid(3), HullOptions::default()).unwrap();
    // One Voronoi vertex per merged unit square
    assert_eq!(diagram.vertices().len(), 4);

    let center = diagram.region(4).unwrap();
    assert!(!center.unbounded);
    assert_eq!(center.vertices.len(), 4);
    for &index in &center.vertices {
        let vertex = &diagram.vertices()[index];
        assert_relative_eq!((vertex[0] - 1.0).abs(), 0.5, epsilon = 1e-9);
        assert_relative_eq!((vertex[1] - 1.0).abs(), 0.5, epsilon = 1e-9);
    }
    for site in [0, 1, 2, 3, 5, 6, 7, 8] {
        assert!(diagram.region(site).unwrap().unbounded, "site {site}");
    }
}

#[test]
fn test_furthest_site_voronoi_of_a_triangle() {
    init_tracing();
    let options = HullOptions {
        upper_delaunay: true,
        ..HullOptions::default()
    };
    let diagram =
        VoronoiDiagram::from_rows(&[[0.0, 0.0], [4.0, 0.0], [0.0, 2.0], [1.0, 0.5]], options)
            .unwrap();
    // The furthest-site diagram only has the circumcenter of the outer triangle
    assert_eq!(diagram.vertices().len(), 1);
    assert_relative_eq!(diagram.vertices()[0][0], 2.0, epsilon = 1e-9);
    assert_relative_eq!(diagram.vertices()[0][1], 1.0, epsilon = 1e-9);
    assert!(diagram.regions().all(|r| r.unbounded));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Property: no input point is inside the circumcircle of a Delaunay region
    #[test]
    fn prop_voronoi_vertices_have_empty_circles_2d(
        rows in prop::collection::vec(
            prop::array::uniform2((-50.0..50.0).prop_filter("finite", |x: &f64| x.is_finite())),
            4..=14
        )
    ) {
        let Ok(diagram) = VoronoiDiagram::from_rows(&rows, HullOptions::default()) else {
            return Ok(());
        };
        for region in diagram.delaunay().regions() {
            let Some(index) = diagram.vertex_of_facet(region.facet) else {
                continue;
            };
            let center = &diagram.vertices()[index];
            let radius = squared_distance(center, &rows[region.points[0]]);
            let tolerance = 1e-6 * radius.max(1.0);
            for row in &rows {
                prop_assert!(squared_distance(center, row) >= radius - tolerance);
            }
            for &corner in &region.points {
                let distance = squared_distance(center, &rows[corner]);
                prop_assert!((distance - radius).abs() <= tolerance);
            }
        }
    }
}
