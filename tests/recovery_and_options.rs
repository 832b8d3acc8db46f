//! Integration tests for option validation, failure recovery and context reuse.

#![forbid(unsafe_code)]

use quickhull_nd::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

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

const TRIANGLE: [[f64; 2]; 4] = [[0.0, 0.0], [2.0, 0.0], [0.0, 2.0], [0.5, 0.5]];
const COLLINEAR: [[f64; 2]; 3] = [[0.0, 0.0], [1.0, 1.0], [2.0, 2.0]];

fn joggle_options() -> HullOptions {
    HullOptions {
        merge_mode: MergeMode::None,
        joggle: Some(JoggleOptions::default()),
        ..HullOptions::default()
    }
}

// =============================================================================
// INPUT ERRORS
// =============================================================================

#[test]
fn test_input_errors() {
    init_tracing();
    let too_few = ConvexHull::from_rows(&[[0.0, 0.0], [1.0, 0.0]], HullOptions::default());
    assert_eq!(too_few.unwrap_err().kind(), HullErrorKind::Input);

    let one_dimensional = ConvexHull::from_rows(&[[0.0], [1.0], [2.0]], HullOptions::default());
    assert_eq!(one_dimensional.unwrap_err().kind(), HullErrorKind::Input);

    let ragged: Vec<Vec<f64>> = vec![vec![0.0, 0.0], vec![1.0], vec![0.0, 1.0]];
    assert_eq!(
        PointSet::from_rows(&ragged).unwrap_err().kind(),
        HullErrorKind::Input
    );

    let joggle_with_merging = HullOptions {
        joggle: Some(JoggleOptions::default()),
        ..HullOptions::default()
    };
    let err = ConvexHull::from_rows(&TRIANGLE, joggle_with_merging).unwrap_err();
    assert_eq!(err.kind(), HullErrorKind::Input);
    assert_eq!(err.exit_code(), 1);

    let upper_without_delaunay = HullOptions {
        upper_delaunay: true,
        ..HullOptions::default()
    };
    assert_eq!(
        ConvexHull::from_rows(&TRIANGLE, upper_without_delaunay)
            .unwrap_err()
            .kind(),
        HullErrorKind::Input
    );

    let good_point_out_of_range = HullOptions {
        selection: FacetSelection {
            good_point: Some(GoodPointRule::VisibleFrom(9)),
            ..FacetSelection::default()
        },
        ..HullOptions::default()
    };
    assert_eq!(
        ConvexHull::from_rows(&TRIANGLE, good_point_out_of_range)
            .unwrap_err()
            .kind(),
        HullErrorKind::Input
    );

    let threshold_out_of_range = HullOptions {
        selection: FacetSelection {
            thresholds: vec![NormalThreshold::AtMost {
                coordinate: 2,
                bound: 0.0,
            }],
            ..FacetSelection::default()
        },
        ..HullOptions::default()
    };
    assert_eq!(
        ConvexHull::from_rows(&TRIANGLE, threshold_out_of_range)
            .unwrap_err()
            .kind(),
        HullErrorKind::Input
    );
}

#[test]
fn test_exit_codes() {
    let codes: Vec<i32> = [
        HullErrorKind::Input,
        HullErrorKind::SingularInput,
        HullErrorKind::Precision,
        HullErrorKind::OutOfMemory,
        HullErrorKind::Topology,
    ]
    .into_iter()
    .map(HullErrorKind::exit_code)
    .collect();
    assert_eq!(codes, vec![1, 2, 3, 4, 7]);
}

// =============================================================================
// RECOVERY
// =============================================================================

#[test]
fn test_failed_context_is_unwound() {
    init_tracing();
    let points = PointSet::from_rows(&COLLINEAR).unwrap();
    let mut context = HullContext::new(points, HullOptions::default()).unwrap();
    let err = context.run().unwrap_err();
    assert_eq!(err.kind(), HullErrorKind::SingularInput);
    assert_eq!(
        context.state(),
        ContextState::Failed(HullErrorKind::SingularInput)
    );
    assert_eq!(context.graph().facet_count(), 0);
    assert_eq!(context.graph().vertex_count(), 0);

    // Running again without a reset is refused
    assert_eq!(context.run().unwrap_err().kind(), HullErrorKind::Input);
    context.reset().unwrap();
    assert_eq!(context.state(), ContextState::Uninitialized);
    assert_eq!(context.run().unwrap_err().kind(), HullErrorKind::SingularInput);
}

#[test]
fn test_joggle_recovers_collinear_input() {
    init_tracing();
    let hull = ConvexHull::from_rows(&COLLINEAR, joggle_options()).unwrap();
    assert!(hull.counters().joggle_attempts >= 1);
    assert_eq!(hull.facet_count(), 3);
    assert_eq!(hull.vertex_count(), 3);
    assert!(hull.facets().all(|f| f.is_simplicial()));
    // The joggled coordinates stay close to the input
    for (joggled, original) in hull.points().iter().zip(COLLINEAR.iter()) {
        for (a, b) in joggled.iter().zip(original) {
            assert!((a - b).abs() <= 0.05);
        }
    }
}

#[test]
fn test_joggle_is_not_used_when_the_first_run_succeeds() {
    init_tracing();
    let hull = ConvexHull::from_rows(&TRIANGLE, joggle_options()).unwrap();
    assert_eq!(hull.counters().joggle_attempts, 0);
    assert_eq!(hull.points().point(1), &[2.0, 0.0]);
}

#[test]
fn test_joggle_is_reproducible_for_a_seed() {
    init_tracing();
    let first = ConvexHull::from_rows(&COLLINEAR, joggle_options()).unwrap();
    let second = ConvexHull::from_rows(&COLLINEAR, joggle_options()).unwrap();
    assert_eq!(first.counters().joggle_attempts, second.counters().joggle_attempts);
    for (a, b) in first.points().iter().zip(second.points().iter()) {
        assert_eq!(a, b);
    }
}

#[test]
fn test_reset_restores_the_input_after_joggle() {
    init_tracing();
    let points = PointSet::from_rows(&COLLINEAR).unwrap();
    let mut context = HullContext::new(points, joggle_options()).unwrap();
    context.run().unwrap();
    assert_eq!(context.state(), ContextState::Finished);
    context.reset().unwrap();
    assert_eq!(context.state(), ContextState::Uninitialized);
    assert_eq!(context.counters().joggle_attempts, 0);
    assert_eq!(context.points().point(1), &[1.0, 1.0]);
}

/// The `{0, 1, 2}^4` lattice with every coordinate moved by up to `noise`.
fn noisy_lattice_4d(noise: f64, seed: u64) -> Vec<[f64; 4]> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..81_u32)
        .map(|mut index| {
            let mut row = [0.0; 4];
            for c in &mut row {
                *c = f64::from(index % 3) + rng.random_range(-noise..=noise);
                index /= 3;
            }
            row
        })
        .collect()
}

#[test]
fn test_joggle_recovers_from_roundoff_on_a_lattice() {
    init_tracing();
    let rows = noisy_lattice_4d(1e-14, 63);

    let unmerged = HullOptions {
        merge_mode: MergeMode::None,
        ..HullOptions::default()
    };
    if let Err(err) = ConvexHull::from_rows(&rows, unmerged) {
        assert_ne!(err.kind(), HullErrorKind::Topology, "{err}");
        assert!(err.is_joggle_recoverable(), "{err}");
    }

    let hull = ConvexHull::from_rows(&rows, joggle_options()).unwrap();
    assert!(hull.facets().all(|f| f.is_simplicial()));
    assert_eq!(hull.counters().facet_merges, 0);
    assert_eq!(hull.validate(), Ok(()));
}

#[test]
fn test_check_output_validates_the_hull() {
    init_tracing();
    let options = HullOptions {
        check_output: true,
        ..HullOptions::default()
    };
    let hull = ConvexHull::from_rows(&TRIANGLE, options).unwrap();
    assert_eq!(hull.facet_count(), 3);
    assert_eq!(hull.validate(), Ok(()));
}

// =============================================================================
// OPTIONS
// =============================================================================

#[test]
fn test_builder_fills_defaults_and_validates() {
    let options = HullOptionsBuilder::default()
        .merge_mode(MergeMode::Both)
        .point_selection(PointSelection::Furthest)
        .merge_order(MergeOrdering::Angle)
        .build()
        .unwrap();
    assert_eq!(options.merge_mode, MergeMode::Both);
    assert_eq!(options.simplex_search, SimplexSearch::Heuristic);
    assert!(options.joggle.is_none());

    let err = HullOptionsBuilder::default()
        .postmerge_centrum(-1.0)
        .build()
        .unwrap_err();
    assert_eq!(err.kind(), HullErrorKind::Input);

    let joggled = HullOptionsBuilder::default()
        .merge_mode(MergeMode::None)
        .joggle(JoggleOptions {
            seed: 7,
            ..JoggleOptions::default()
        })
        .build()
        .unwrap();
    assert_eq!(joggled.joggle.map(|j| j.seed), Some(7));
}

#[test]
fn test_every_option_combination_builds_a_square() {
    init_tracing();
    let rows = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0], [0.3, 0.6]];
    for simplex_search in [SimplexSearch::Heuristic, SimplexSearch::Exhaustive] {
        for point_selection in [PointSelection::FirstAvailable, PointSelection::Furthest] {
            for merge_order in [MergeOrdering::Distance, MergeOrdering::Angle] {
                let options = HullOptions {
                    simplex_search,
                    point_selection,
                    merge_order,
                    merge_mode: MergeMode::Both,
                    ..HullOptions::default()
                };
                let hull = ConvexHull::from_rows(&rows, options).unwrap();
                assert_eq!(hull.facet_count(), 4);
                assert_eq!(hull.validate(), Ok(()));
            }
        }
    }
}

#[test]
fn test_options_serde_roundtrip() {
    let options = HullOptions {
        merge_mode: MergeMode::Post,
        postmerge_centrum: 1e-3,
        keep_coplanar: true,
        selection: FacetSelection {
            only_good: true,
            good_vertex: Some(GoodVertexRule::Excludes(3)),
            thresholds: vec![NormalThreshold::AtLeast {
                coordinate: 0,
                bound: -0.25,
            }],
            ..FacetSelection::default()
        },
        ..HullOptions::default()
    };
    let json = serde_json::to_string(&options).unwrap();
    let restored: HullOptions = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, options);
}
