//! The hull context: everything one computation owns.
//!
//! A [`HullContext`] holds the options, the (possibly lifted or joggled)
//! points, the derived [`Precision`], the facet graph, the per-step working
//! sets and the counters. There is no global state; the construction
//! algorithms are `impl HullContext` blocks in `core::algorithms`, and the
//! lifecycle (`run`, unwind, `reset`) lives in `core::recovery`.

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use super::error::{HullError, HullErrorKind};
use super::facet::FacetKey;
use super::graph::HullGraph;
use super::options::HullOptions;
use super::points::PointSet;
use super::vertex::VertexKey;
use crate::geometry::roundoff::Precision;

/// Times a point may become a vertex in one build. A vertex removed by a merge
/// leaves its point coplanar, so a further addition means merging cycles.
pub(crate) const MAX_POINT_ADDITIONS: u32 = 2;

// =============================================================================
// LIFECYCLE
// =============================================================================

/// Phase of a running construction, reported in logs and in
/// [`ContextState::Running`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuildPhase {
    /// Searching the `D+1` starting points.
    InitialSimplex,
    /// Picking the next outside point.
    SelectFurthest,
    /// Walking the facets visible from the point.
    FindHorizon,
    /// Connecting the point to the horizon.
    BuildCone,
    /// Merging non-convex facets of the new cone.
    MergeIfNeeded,
    /// Repartitioning points and deleting visible facets.
    Attach,
    /// Final merge pass.
    PostMerge,
    /// Outer planes, point lookup and good facets.
    Finalize,
}

/// Lifecycle of a [`HullContext`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContextState {
    /// Created or reset; `run` may be called.
    #[default]
    Uninitialized,
    /// A construction is in progress.
    Running(BuildPhase),
    /// The hull is complete.
    Finished,
    /// The last construction failed and was unwound.
    Failed(HullErrorKind),
}

// =============================================================================
// COUNTERS
// =============================================================================

/// Event counts of one computation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HullCounters {
    /// Points incorporated after the initial simplex.
    pub points_added: usize,
    /// Facet merges of every kind.
    pub facet_merges: usize,
    /// Vertex merges resolving pinched horizons.
    pub vertex_merges: usize,
    /// Merges removing a degenerate facet.
    pub degenerate_merges: usize,
    /// Merges removing a redundant facet.
    pub redundant_merges: usize,
    /// Merges of flipped facets and duplicate ridges.
    pub forced_merges: usize,
    /// Horizon searches repeated because of a pinch.
    pub pinch_retries: usize,
    /// Joggled reruns.
    pub joggle_attempts: usize,
}

// =============================================================================
// MERGE REQUESTS
// =============================================================================

/// Kind of a queued merge, ordered by processing priority.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) enum MergeKind {
    /// A facet whose orientation could not be trusted.
    Flipped,
    /// Two facets joined by a duplicated ridge.
    Dupridge,
    /// Both centrums within the merge radius of the other plane.
    Coplanar,
    /// A centrum clearly above the other plane.
    Concave,
    /// One centrum coplanar, the other concave.
    ConcaveCoplanar,
    /// Too few vertices or neighbors.
    Degenerate,
    /// Vertices contained in a neighbor.
    Redundant,
}

impl MergeKind {
    /// Merges that happen regardless of the convexity test.
    pub(crate) const fn is_forced(self) -> bool {
        matches!(self, Self::Flipped | Self::Dupridge)
    }
}

/// A pending merge of `facet1` into `facet2` (or into its best neighbor).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct MergeRequest {
    pub(crate) kind: MergeKind,
    pub(crate) facet1: FacetKey,
    pub(crate) facet2: Option<FacetKey>,
    pub(crate) severity: OrderedFloat<f64>,
}

impl MergeRequest {
    pub(crate) fn new(kind: MergeKind, facet1: FacetKey, facet2: Option<FacetKey>, severity: f64) -> Self {
        Self {
            kind,
            facet1,
            facet2,
            severity: OrderedFloat(severity),
        }
    }

    pub(crate) const fn sort_key(&self) -> (MergeKind, OrderedFloat<f64>) {
        (self.kind, self.severity)
    }
}

// =============================================================================
// HULL CONTEXT
// =============================================================================

/// State of one hull computation.
#[derive(Clone, Debug)]
pub struct HullContext {
    pub(crate) options: HullOptions,
    /// Coordinates the graph is built on (joggled during a retry).
    pub(crate) points: PointSet,
    /// The input as given, before lifting or joggling.
    pub(crate) checkpoint: PointSet,
    pub(crate) precision: Precision,
    pub(crate) graph: HullGraph,
    pub(crate) state: ContextState,
    pub(crate) counters: HullCounters,
    /// Centroid of the initial simplex; below every facet.
    pub(crate) interior: Vec<f64>,
    /// Point left out of the construction by a good point rule.
    pub(crate) excluded_point: Option<usize>,
    /// Largest distance of a vertex or coplanar point above its facet.
    pub(crate) max_outside: f64,
    /// Most negative distance of a vertex below an incident facet.
    pub(crate) min_vertex: f64,
    pub(crate) point_facet: Vec<Option<FacetKey>>,
    pub(crate) point_vertex: Vec<Option<VertexKey>>,
    /// Times each point became a vertex during the current build.
    pub(crate) point_additions: Vec<u32>,
    // Working sets of the current step.
    pub(crate) visible: Vec<FacetKey>,
    pub(crate) new_facets: Vec<FacetKey>,
    pub(crate) deleted_vertices: Vec<VertexKey>,
    pub(crate) merge_queue: Vec<MergeRequest>,
    pub(crate) degen_queue: Vec<MergeRequest>,
}

impl HullContext {
    /// Creates a context for `points`.
    ///
    /// # Errors
    ///
    /// Returns [`HullError::Input`] for inconsistent options, options that do
    /// not fit the input, or fewer than `D+1` points.
    ///
    /// # Examples
    ///
    /// ```
    /// use quickhull_nd::core::context::{ContextState, HullContext};
    /// use quickhull_nd::core::options::HullOptions;
    /// use quickhull_nd::core::points::PointSet;
    ///
    /// let points = PointSet::from_rows(&[[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]]).unwrap();
    /// let mut context = HullContext::new(points, HullOptions::default()).unwrap();
    /// context.run().unwrap();
    /// assert_eq!(context.state(), ContextState::Finished);
    /// assert_eq!(context.graph().facet_count(), 3);
    /// ```
    pub fn new(input: PointSet, options: HullOptions) -> Result<Self, HullError> {
        let points = Self::prepare_points(&input, &options)?;
        let dim = points.dim();
        options.validate_for_input(dim, points.len())?;
        if dim < 2 {
            return Err(HullError::input(format!(
                "hulls need dimension 2 or more, got {dim}"
            )));
        }
        let excluded_point = options.selection.good_point.map(|rule| rule.point());
        let usable = points.len() - usize::from(excluded_point.is_some());
        if usable < dim + 1 {
            return Err(HullError::input(format!(
                "not enough points ({usable}) to construct an initial simplex in {dim}D (need {})",
                dim + 1
            )));
        }

        let precision = Self::derive_precision(&points, &options);
        Ok(Self {
            graph: HullGraph::new(dim),
            checkpoint: input,
            points,
            precision,
            options,
            state: ContextState::Uninitialized,
            counters: HullCounters::default(),
            interior: Vec::new(),
            excluded_point,
            max_outside: 0.0,
            min_vertex: 0.0,
            point_facet: Vec::new(),
            point_vertex: Vec::new(),
            point_additions: Vec::new(),
            visible: Vec::new(),
            new_facets: Vec::new(),
            deleted_vertices: Vec::new(),
            merge_queue: Vec::new(),
            degen_queue: Vec::new(),
        })
    }

    /// The coordinates the hull is built from: the input itself, or its
    /// paraboloid lifting in Delaunay mode.
    pub(crate) fn prepare_points(
        input: &PointSet,
        options: &HullOptions,
    ) -> Result<PointSet, HullError> {
        if options.delaunay {
            input.lifted(options.point_at_infinity)
        } else {
            Ok(input.clone())
        }
    }

    pub(crate) fn derive_precision(points: &PointSet, options: &HullOptions) -> Precision {
        Precision::new(
            points.dim(),
            points.bounds(),
            options.merge_mode.merges(),
            options.premerge_centrum,
            options.postmerge_centrum,
        )
    }

    /// Hull dimension.
    #[must_use]
    pub fn dim(&self) -> usize {
        self.points.dim()
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> ContextState {
        self.state
    }

    /// Options of the computation.
    #[must_use]
    pub const fn options(&self) -> &HullOptions {
        &self.options
    }

    /// Points the hull was built on; joggled if a retry succeeded.
    #[must_use]
    pub const fn points(&self) -> &PointSet {
        &self.points
    }

    /// Numeric tolerances in effect.
    #[must_use]
    pub const fn precision(&self) -> &Precision {
        &self.precision
    }

    /// The facet graph.
    #[must_use]
    pub const fn graph(&self) -> &HullGraph {
        &self.graph
    }

    /// Event counts.
    #[must_use]
    pub const fn counters(&self) -> &HullCounters {
        &self.counters
    }

    /// Interior point every facet is oriented against.
    #[must_use]
    pub fn interior_point(&self) -> &[f64] {
        &self.interior
    }

    /// Largest distance of a vertex or point above its facet.
    #[must_use]
    pub const fn max_outside(&self) -> f64 {
        self.max_outside
    }

    /// Most negative distance of a vertex below one of its facets.
    #[must_use]
    pub const fn min_vertex(&self) -> f64 {
        self.min_vertex
    }

    pub(crate) const fn set_phase(&mut self, phase: BuildPhase) {
        self.state = ContextState::Running(phase);
    }

    /// Whether merges run at all (forced merges included).
    pub(crate) const fn merging(&self) -> bool {
        self.options.merge_mode.merges()
    }

    /// Signed distance of input point `point` above facet `facet`.
    pub(crate) fn point_distance(&self, point: usize, facet: FacetKey) -> Result<f64, HullError> {
        Ok(self
            .graph
            .facet(facet)?
            .hyperplane()
            .distance(self.points.point(point)))
    }

    /// Creates the vertex of `point` and counts the addition.
    ///
    /// # Errors
    ///
    /// Returns [`HullError::Precision`] once the point has become a vertex
    /// more than [`MAX_POINT_ADDITIONS`] times.
    pub(crate) fn add_point_vertex(&mut self, point: usize) -> Result<VertexKey, HullError> {
        if self.point_additions.len() < self.points.len() {
            self.point_additions.resize(self.points.len(), 0);
        }
        let additions = self
            .point_additions
            .get_mut(point)
            .ok_or_else(|| HullError::input(format!("point {point} is out of range")))?;
        *additions += 1;
        if *additions > MAX_POINT_ADDITIONS {
            return Err(HullError::precision(format!(
                "point {point} joined the hull {additions} times; merging does not converge"
            )));
        }
        Ok(self.graph.add_vertex(point))
    }

    /// Whether `point` was a vertex earlier in this build.
    pub(crate) fn was_vertex(&self, point: usize) -> bool {
        self.point_additions.get(point).is_some_and(|&n| n > 0)
    }

    /// Drops the graph and every working set.
    pub(crate) fn clear_working_state(&mut self) {
        self.graph.clear();
        self.interior.clear();
        self.max_outside = 0.0;
        self.min_vertex = 0.0;
        self.point_facet.clear();
        self.point_vertex.clear();
        self.point_additions.clear();
        self.visible.clear();
        self.new_facets.clear();
        self.deleted_vertices.clear();
        self.merge_queue.clear();
        self.degen_queue.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::options::{FacetSelection, GoodPointRule};

    fn triangle() -> PointSet {
        PointSet::from_rows(&[[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]]).unwrap()
    }

    #[test]
    fn test_new_context_is_uninitialized() {
        let context = HullContext::new(triangle(), HullOptions::default()).unwrap();
        assert_eq!(context.state(), ContextState::Uninitialized);
        assert_eq!(context.dim(), 2);
        assert_eq!(context.counters(), &HullCounters::default());
        assert!(context.precision().dist_round > 0.0);
    }

    #[test]
    fn test_new_rejects_too_few_points() {
        let points = PointSet::from_rows(&[[0.0, 0.0], [1.0, 0.0]]).unwrap();
        let err = HullContext::new(points, HullOptions::default()).unwrap_err();
        assert_eq!(err.kind(), HullErrorKind::Input);
    }

    #[test]
    fn test_excluded_good_point_counts_against_simplex() {
        let options = HullOptions {
            selection: FacetSelection {
                good_point: Some(GoodPointRule::VisibleFrom(0)),
                ..FacetSelection::default()
            },
            ..HullOptions::default()
        };
        let err = HullContext::new(triangle(), options).unwrap_err();
        assert!(err.message().contains("not enough points"));
    }

    #[test]
    fn test_one_dimensional_input_is_rejected() {
        let points = PointSet::from_rows(&[[0.0], [1.0], [2.0]]).unwrap();
        assert!(HullContext::new(points, HullOptions::default()).is_err());
    }

    #[test]
    fn test_point_additions_are_bounded() {
        let mut context = HullContext::new(triangle(), HullOptions::default()).unwrap();
        for _ in 0..MAX_POINT_ADDITIONS {
            context.add_point_vertex(1).unwrap();
        }
        assert!(context.was_vertex(1));
        assert!(!context.was_vertex(2));

        let err = context.add_point_vertex(1).unwrap_err();
        assert_eq!(err.kind(), HullErrorKind::Precision);
        assert!(err.message().contains("point 1"));

        context.clear_working_state();
        assert!(!context.was_vertex(1));
    }

    #[test]
    fn test_merge_kind_priority() {
        assert!(MergeKind::Flipped < MergeKind::Dupridge);
        assert!(MergeKind::Coplanar < MergeKind::Concave);
        assert!(MergeKind::ConcaveCoplanar < MergeKind::Degenerate);
        assert!(MergeKind::Flipped.is_forced());
        assert!(!MergeKind::Coplanar.is_forced());
    }
}
