//! # quickhull-nd
//!
//! Convex hulls, Delaunay triangulations, Voronoi diagrams and half-space
//! intersections of point sets in any dimension `d >= 2`, built by an
//! incremental Quickhull that merges facets to repair floating point roundoff.
//!
//! # Features
//!
//! - d-dimensional convex hulls with simplicial and merged (non-simplicial) facets
//! - Pre-merging during construction and a final post-merge pass, driven by the
//!   centrum convexity test
//! - Joggle: reruns on randomly perturbed input instead of merging
//! - Delaunay triangulations and Voronoi diagrams by paraboloid lifting
//! - Half-space intersection by duality
//! - Serialization of options with [serde](https://serde.rs)
//!
//! # Basic Usage
//!
//! ```rust
//! use quickhull_nd::prelude::*;
//! use approx::assert_relative_eq;
//!
//! // Unit cube plus its center
//! let mut rows = Vec::new();
//! for x in [0.0, 1.0] {
//!     for y in [0.0, 1.0] {
//!         for z in [0.0, 1.0] {
//!             rows.push([x, y, z]);
//!         }
//!     }
//! }
//! rows.push([0.5, 0.5, 0.5]);
//!
//! let hull = ConvexHull::from_rows(&rows, HullOptions::default()).unwrap();
//!
//! assert_eq!(hull.facet_count(), 6);          // coplanar triangles merged into squares
//! assert_eq!(hull.vertex_count(), 8);
//! assert!(hull.vertex_of_point(8).is_none()); // the center is inside
//! assert_relative_eq!(hull.area().unwrap(), 6.0, epsilon = 1e-9);
//! assert_relative_eq!(hull.volume().unwrap(), 1.0, epsilon = 1e-9);
//! ```
//!
//! # Precision
//!
//! Every distance test is made against a roundoff bound derived from the
//! coordinate magnitudes (see [`geometry::roundoff::Precision`]). Two ways of
//! handling the resulting near-degeneracies are offered:
//!
//! - **Merging** ([`MergeMode`](core::options::MergeMode)): a new facet that is
//!   coplanar with or concave to a neighbor is merged into it. The output may
//!   contain non-simplicial facets and is convex within `max_outside`.
//! - **Joggle** ([`JoggleOptions`](core::options::JoggleOptions)): merging is
//!   off, and a singular or precision failure triggers a rerun on a randomly
//!   perturbed copy of the input. The output is simplicial.
//!
//! # Lifecycle
//!
//! [`HullContext`](core::context::HullContext) runs once. A failed run leaves
//! no partial hull behind: the context is `Failed` until
//! [`reset`](core::context::HullContext::reset) restores the input checkpoint.
//!
//! ```rust
//! use quickhull_nd::prelude::*;
//!
//! let collinear = PointSet::from_rows(&[[0.0, 0.0], [1.0, 1.0], [2.0, 2.0]]).unwrap();
//! let mut context = HullContext::new(collinear, HullOptions::default()).unwrap();
//!
//! let err = context.run().unwrap_err();
//! assert_eq!(err.kind(), HullErrorKind::SingularInput);
//! assert_eq!(err.exit_code(), 2);
//! assert_eq!(context.state(), ContextState::Failed(HullErrorKind::SingularInput));
//! ```

// Forbid unsafe code throughout the entire crate
#![forbid(unsafe_code)]

#[macro_use]
extern crate derive_builder;

/// Hull construction: points, the facet graph, the incremental builder, the
/// merge engine and the result types.
pub mod core {
    /// The construction steps, each an `impl HullContext` block.
    pub mod algorithms {
        pub mod build;
        pub mod cone;
        pub mod horizon;
        pub mod initial_simplex;
        pub mod merge;
        pub mod partition;
    }
    pub mod collections;
    pub mod context;
    pub mod error;
    pub mod facet;
    pub mod graph;
    pub mod hull;
    pub mod options;
    pub mod points;
    pub mod recovery;
    pub mod ridge;
    pub mod validation;
    pub mod vertex;
}

/// Floating point geometry: roundoff bounds, hyperplanes and simplex measures.
pub mod geometry {
    pub mod hyperplane;
    pub mod measures;
    pub mod roundoff;
}

/// Structures derived from a hull of transformed points.
pub mod triangulation {
    pub mod delaunay;
    pub mod halfspace;
    pub mod voronoi;
}

/// A prelude module that re-exports commonly used types.
pub mod prelude {
    pub use crate::core::{
        context::{BuildPhase, ContextState, HullContext, HullCounters},
        error::{HullError, HullErrorKind},
        facet::{FacetKey, FacetStatus},
        hull::{ConvexHull, FacetView, HullMeasures, VertexView},
        options::{
            FacetSelection, GoodPointRule, GoodVertexRule, HullOptions, HullOptionsBuilder,
            JoggleOptions, MergeMode, MergeOrdering, NormalThreshold, PointSelection,
            SimplexSearch,
        },
        points::PointSet,
        validation::HullValidationError,
        vertex::VertexKey,
    };

    pub use crate::core::collections::{
        FastHashMap, FastHashSet, SmallBuffer, fast_hash_map_with_capacity,
        fast_hash_set_with_capacity,
    };

    pub use crate::geometry::{hyperplane::Hyperplane, roundoff::Precision};

    pub use crate::triangulation::{
        delaunay::{DelaunayRegion, DelaunayTriangulation},
        halfspace::{HalfspaceIntersection, IntersectionVertex},
        voronoi::{VoronoiDiagram, VoronoiRegion},
    };
}

/// The function `is_normal` checks that structs implement `auto` traits.
/// Traits are checked at compile time, so this function is only used for
/// testing.
#[must_use]
pub const fn is_normal<T: Sized + Send + Sync + Unpin>() -> bool {
    true
}

// =============================================================================
// TESTS
// =============================================================================
