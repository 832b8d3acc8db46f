//! The result of a finished hull computation.
//!
//! [`ConvexHull`] owns a finished [`HullContext`] and exposes read-only views
//! of its facets and vertices. Surface area and enclosed volume are computed
//! on first request and cached behind an [`ArcSwapOption`], so a shared hull
//! can be measured from several threads without locking.

use std::sync::Arc;

use arc_swap::ArcSwapOption;

use super::context::{ContextState, HullContext, HullCounters};
use super::error::HullError;
use super::facet::{Facet, FacetKey};
use super::options::HullOptions;
use super::points::PointSet;
use super::validation::HullValidationError;
use super::vertex::{Vertex, VertexKey};
use crate::geometry::hyperplane::Hyperplane;
use crate::geometry::measures::{count_as_f64, simplex_measure};

/// Surface area and enclosed volume of a hull.
///
/// In 2D the "area" is the perimeter and the "volume" the enclosed area.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct HullMeasures {
    /// Sum of the facet areas.
    pub area: f64,
    /// Volume enclosed by the facets.
    pub volume: f64,
}

/// A finished convex hull.
///
/// # Examples
///
/// ```
/// use quickhull_nd::prelude::*;
/// use approx::assert_relative_eq;
///
/// let points = PointSet::from_rows(&[[0.0, 0.0], [2.0, 0.0], [2.0, 1.0], [0.0, 1.0], [1.0, 0.5]]).unwrap();
/// let hull = ConvexHull::new(points, HullOptions::default()).unwrap();
/// assert_eq!(hull.facet_count(), 4);
/// assert_relative_eq!(hull.area().unwrap(), 6.0, epsilon = 1e-12);
/// assert_relative_eq!(hull.volume().unwrap(), 2.0, epsilon = 1e-12);
/// assert!(hull.vertex_of_point(4).is_none());
/// ```
#[derive(Debug)]
pub struct ConvexHull {
    context: HullContext,
    measures: ArcSwapOption<HullMeasures>,
}

impl ConvexHull {
    /// Computes the hull of `points`.
    ///
    /// # Errors
    ///
    /// Returns the [`HullError`] of context creation or of the failed build.
    pub fn new(points: PointSet, options: HullOptions) -> Result<Self, HullError> {
        let mut context = HullContext::new(points, options)?;
        context.run()?;
        Self::from_context(context)
    }

    /// Computes the hull of equally long coordinate rows.
    ///
    /// # Errors
    ///
    /// Returns [`HullError::Input`] for malformed rows, otherwise as
    /// [`ConvexHull::new`].
    pub fn from_rows<R: AsRef<[f64]>>(rows: &[R], options: HullOptions) -> Result<Self, HullError> {
        Self::new(PointSet::from_rows(rows)?, options)
    }

    /// Wraps a context that has already run.
    ///
    /// # Errors
    ///
    /// Returns [`HullError::Input`] unless the context is `Finished`.
    pub fn from_context(context: HullContext) -> Result<Self, HullError> {
        if context.state() != ContextState::Finished {
            return Err(HullError::input(format!(
                "a hull needs a finished context, not {:?}",
                context.state()
            )));
        }
        Ok(Self {
            context,
            measures: ArcSwapOption::empty(),
        })
    }

    /// The finished context.
    #[must_use]
    pub const fn context(&self) -> &HullContext {
        &self.context
    }

    /// Gives the context back, e.g. to [`reset`](HullContext::reset) and rerun it.
    #[must_use]
    pub fn into_context(self) -> HullContext {
        self.context
    }

    /// Dimension of the hull (one more than the input for Delaunay).
    #[must_use]
    pub fn dim(&self) -> usize {
        self.context.dim()
    }

    /// Points the hull was built from, lifted or joggled if applicable.
    #[must_use]
    pub const fn points(&self) -> &PointSet {
        self.context.points()
    }

    /// Facets reported to the caller: the good facets with `only_good`, all
    /// facets otherwise.
    pub fn facets(&self) -> impl Iterator<Item = FacetView<'_>> + '_ {
        let only_good = self.context.options().selection.only_good;
        self.all_facets().filter(move |f| !only_good || f.is_good())
    }

    /// Every facet, regardless of `only_good`.
    pub fn all_facets(&self) -> impl Iterator<Item = FacetView<'_>> + '_ {
        self.context
            .graph()
            .live_facets()
            .map(move |(key, facet)| FacetView {
                hull: self,
                key,
                facet,
            })
    }

    /// Facets accepted by every good-facet rule.
    pub fn good_facets(&self) -> impl Iterator<Item = FacetView<'_>> + '_ {
        self.all_facets().filter(FacetView::is_good)
    }

    /// Number of facets reported by [`facets`](Self::facets).
    #[must_use]
    pub fn facet_count(&self) -> usize {
        self.facets().count()
    }

    /// A facet by key.
    #[must_use]
    pub fn facet(&self, key: FacetKey) -> Option<FacetView<'_>> {
        let graph = self.context.graph();
        if !graph.is_live_facet(key) {
            return None;
        }
        graph.facet(key).ok().map(|facet| FacetView {
            hull: self,
            key,
            facet,
        })
    }

    /// Every hull vertex in insertion order.
    pub fn vertices(&self) -> impl Iterator<Item = VertexView<'_>> + '_ {
        self.context
            .graph()
            .live_vertices()
            .map(move |(key, vertex)| VertexView {
                hull: self,
                key,
                vertex,
            })
    }

    /// Number of hull vertices.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.context.graph().vertex_count()
    }

    /// A vertex by key.
    #[must_use]
    pub fn vertex(&self, key: VertexKey) -> Option<VertexView<'_>> {
        self.context
            .graph()
            .vertex(key)
            .ok()
            .filter(|v| !v.is_deleted())
            .map(|vertex| VertexView {
                hull: self,
                key,
                vertex,
            })
    }

    /// Facet that keeps input point `point` as coplanar, if any.
    ///
    /// Only points retained by `keep_coplanar` or `keep_inside` have a facet.
    #[must_use]
    pub fn facet_of_point(&self, point: usize) -> Option<FacetKey> {
        self.context.point_facet.get(point).copied().flatten()
    }

    /// Vertex that stands for input point `point`, if it is on the hull.
    #[must_use]
    pub fn vertex_of_point(&self, point: usize) -> Option<VertexKey> {
        self.context.point_vertex.get(point).copied().flatten()
    }

    /// Largest distance of a point or vertex above its facet.
    #[must_use]
    pub const fn max_outside(&self) -> f64 {
        self.context.max_outside()
    }

    /// Smallest (most negative) distance of a vertex below a neighboring facet.
    #[must_use]
    pub const fn min_vertex(&self) -> f64 {
        self.context.min_vertex()
    }

    /// Work counters of the build.
    #[must_use]
    pub const fn counters(&self) -> &HullCounters {
        self.context.counters()
    }

    /// Whether `point` is above some facet by more than the roundoff.
    #[must_use]
    pub fn is_point_outside(&self, point: &[f64]) -> bool {
        let limit = self.context.max_outside() + self.context.precision().dist_round;
        point.len() == self.dim()
            && self
                .context
                .graph()
                .live_facets()
                .any(|(_, f)| f.hyperplane().distance(point) > limit)
    }

    /// Checks the closure, orientation, convexity and containment of the hull.
    ///
    /// # Errors
    ///
    /// Returns the first violated property.
    pub fn validate(&self) -> Result<(), HullValidationError> {
        self.context.validate()
    }

    /// Total facet area.
    ///
    /// # Errors
    ///
    /// Returns [`HullError::Precision`] if a facet measure cannot be computed.
    pub fn area(&self) -> Result<f64, HullError> {
        Ok(self.measures()?.area)
    }

    /// Enclosed volume.
    ///
    /// # Errors
    ///
    /// Returns [`HullError::Precision`] if a facet measure cannot be computed.
    pub fn volume(&self) -> Result<f64, HullError> {
        Ok(self.measures()?.volume)
    }

    /// Area and volume, computed on first use and cached.
    ///
    /// # Errors
    ///
    /// Returns [`HullError::Precision`] if a facet measure cannot be computed.
    pub fn measures(&self) -> Result<Arc<HullMeasures>, HullError> {
        if let Some(cached) = self.measures.load_full() {
            return Ok(cached);
        }
        // Computed at most once, even if the RCU loop retries.
        let mut built: Option<Result<Arc<HullMeasures>, HullError>> = None;
        self.measures.rcu(|old| {
            if let Some(existing) = old {
                return Some(Arc::clone(existing));
            }
            match built.get_or_insert_with(|| self.compute_measures().map(Arc::new)) {
                Ok(measures) => Some(Arc::clone(measures)),
                Err(_) => None,
            }
        });
        match (self.measures.load_full(), built) {
            (Some(cached), _) => Ok(cached),
            (None, Some(Err(error))) => Err(error),
            (None, _) => Err(HullError::precision("hull measures are unavailable")),
        }
    }

    fn compute_measures(&self) -> Result<HullMeasures, HullError> {
        let dim = count_as_f64(self.dim());
        let interior = self.context.interior_point();
        let mut measures = HullMeasures::default();
        for view in self.all_facets() {
            let area = view.area()?;
            let height = -view.hyperplane().distance(interior);
            measures.area += area;
            measures.volume += area * height / dim;
        }
        tracing::debug!(
            "hull area {:e}, volume {:e}",
            measures.area,
            measures.volume
        );
        Ok(measures)
    }
}

/// Read-only view of a hull facet.
#[derive(Clone, Copy, Debug)]
pub struct FacetView<'a> {
    hull: &'a ConvexHull,
    key: FacetKey,
    facet: &'a Facet,
}

impl<'a> FacetView<'a> {
    /// Arena key.
    #[must_use]
    pub const fn key(&self) -> FacetKey {
        self.key
    }

    /// Creation-order id.
    #[must_use]
    pub const fn id(&self) -> u32 {
        self.facet.id()
    }

    /// Oriented hyperplane; the hull lies below it.
    #[must_use]
    pub const fn hyperplane(&self) -> &'a Hyperplane {
        self.facet.hyperplane()
    }

    /// Unit outer normal.
    #[must_use]
    pub fn normal(&self) -> &'a [f64] {
        self.facet.hyperplane().normal()
    }

    /// Plane offset.
    #[must_use]
    pub const fn offset(&self) -> f64 {
        self.facet.hyperplane().offset()
    }

    /// Vertex keys, by decreasing vertex id.
    #[must_use]
    pub fn vertices(&self) -> &'a [VertexKey] {
        self.facet.vertices()
    }

    /// Indices of the input points at the facet's vertices.
    #[must_use]
    pub fn point_indices(&self) -> Vec<usize> {
        let graph = self.hull.context.graph();
        self.facet
            .vertices()
            .iter()
            .filter_map(|&v| graph.vertex_point(v).ok())
            .collect()
    }

    /// Neighboring facets.
    #[must_use]
    pub fn neighbors(&self) -> &'a [FacetKey] {
        self.facet.neighbors()
    }

    /// Points kept as coplanar with (or inside) this facet.
    #[must_use]
    pub fn coplanar_points(&self) -> &'a [usize] {
        self.facet.coplanar_points()
    }

    /// Whether every good-facet rule accepts this facet.
    #[must_use]
    pub fn is_good(&self) -> bool {
        self.facet.is_good()
    }

    /// Whether the facet has exactly `D` vertices and neighbors.
    #[must_use]
    pub const fn is_simplicial(&self) -> bool {
        self.facet.is_simplicial()
    }

    /// Whether the facet belongs to the upper Delaunay hull.
    #[must_use]
    pub const fn is_upper_delaunay(&self) -> bool {
        self.facet.is_upper_delaunay()
    }

    /// Largest distance of a point above the facet.
    #[must_use]
    pub const fn max_outside(&self) -> f64 {
        self.facet.max_outside()
    }

    /// The underlying facet.
    #[must_use]
    pub const fn facet(&self) -> &'a Facet {
        self.facet
    }

    /// `(D-1)`-dimensional measure of the facet.
    ///
    /// Non-simplicial facets are measured as the cone from their centrum over
    /// their ridges.
    ///
    /// # Errors
    ///
    /// Returns [`HullError::Precision`] if a simplex measure fails.
    pub fn area(&self) -> Result<f64, HullError> {
        let context = &self.hull.context;
        let graph = context.graph();
        let points = context.points();
        if self.facet.is_simplicial() {
            let mut corners = Vec::with_capacity(self.facet.vertices().len());
            for &v in self.facet.vertices() {
                corners.push(points.point(graph.vertex_point(v)?));
            }
            return Ok(simplex_measure(&corners)?);
        }

        let mut coords = Vec::with_capacity(self.facet.vertices().len());
        for &v in self.facet.vertices() {
            coords.push(points.point(graph.vertex_point(v)?));
        }
        let centrum = self.facet.hyperplane().centrum(coords);
        let mut total = 0.0;
        for &r in self.facet.ridges() {
            let ridge = graph.ridge(r)?;
            let mut corners: Vec<&[f64]> = Vec::with_capacity(ridge.vertices().len() + 1);
            corners.push(&centrum);
            for &v in ridge.vertices() {
                corners.push(points.point(graph.vertex_point(v)?));
            }
            total += simplex_measure(&corners)?;
        }
        Ok(total)
    }
}

/// Read-only view of a hull vertex.
#[derive(Clone, Copy, Debug)]
pub struct VertexView<'a> {
    hull: &'a ConvexHull,
    key: VertexKey,
    vertex: &'a Vertex,
}

impl<'a> VertexView<'a> {
    /// Arena key.
    #[must_use]
    pub const fn key(&self) -> VertexKey {
        self.key
    }

    /// Creation-order id.
    #[must_use]
    pub const fn id(&self) -> u32 {
        self.vertex.id()
    }

    /// Index of the input point.
    #[must_use]
    pub const fn point_index(&self) -> usize {
        self.vertex.point_index()
    }

    /// Coordinates of the vertex.
    #[must_use]
    pub fn coords(&self) -> &'a [f64] {
        self.hull.context.points().point(self.vertex.point_index())
    }

    /// Incident facets.
    #[must_use]
    pub fn neighbors(&self) -> &'a [FacetKey] {
        self.vertex.neighbors()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::options::MergeMode;
    use approx::assert_relative_eq;

    fn cube(options: HullOptions) -> ConvexHull {
        let mut rows = Vec::new();
        for x in [0.0, 1.0] {
            for y in [0.0, 1.0] {
                for z in [0.0, 1.0] {
                    rows.push([x, y, z]);
                }
            }
        }
        rows.push([0.5, 0.5, 0.5]);
        ConvexHull::from_rows(&rows, options).unwrap()
    }

    #[test]
    fn test_cube_area_and_volume_are_cached() {
        let hull = cube(HullOptions::default());
        assert_eq!(hull.facet_count(), 6);
        assert_eq!(hull.vertex_count(), 8);
        assert_relative_eq!(hull.area().unwrap(), 6.0, epsilon = 1e-9);
        assert_relative_eq!(hull.volume().unwrap(), 1.0, epsilon = 1e-9);
        let first = hull.measures().unwrap();
        let second = hull.measures().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_simplicial_measures_match_merged_measures() {
        let options = HullOptions {
            merge_mode: MergeMode::None,
            joggle: None,
            ..HullOptions::default()
        };
        let tetra = ConvexHull::from_rows(
            &[
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [0.0, 1.0, 0.0],
                [0.0, 0.0, 1.0],
            ],
            options,
        )
        .unwrap();
        assert!(tetra.all_facets().all(|f| f.is_simplicial()));
        assert_relative_eq!(tetra.volume().unwrap(), 1.0 / 6.0, epsilon = 1e-12);
        let expected = 1.5 + 3.0_f64.sqrt() / 2.0;
        assert_relative_eq!(tetra.area().unwrap(), expected, epsilon = 1e-12);
    }

    #[test]
    fn test_views_and_lookups() {
        let hull = cube(HullOptions::default());
        assert!(hull.vertex_of_point(8).is_none());
        let key = hull.vertex_of_point(7).unwrap();
        let vertex = hull.vertex(key).unwrap();
        assert_eq!(vertex.point_index(), 7);
        assert_eq!(vertex.coords(), &[1.0, 1.0, 1.0]);
        assert_eq!(vertex.neighbors().len(), 3);

        for facet in hull.facets() {
            assert_eq!(facet.vertices().len(), 4);
            assert_eq!(facet.neighbors().len(), 4);
            assert_eq!(facet.point_indices().len(), 4);
            assert_relative_eq!(facet.area().unwrap(), 1.0, epsilon = 1e-9);
            assert!(hull.facet(facet.key()).is_some());
        }
        assert!(hull.is_point_outside(&[2.0, 0.5, 0.5]));
        assert!(!hull.is_point_outside(&[0.5, 0.5, 0.5]));
        assert_eq!(hull.validate(), Ok(()));
    }

    #[test]
    fn test_from_context_requires_a_finished_run() {
        let points = PointSet::from_rows(&[[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]]).unwrap();
        let context = HullContext::new(points, HullOptions::default()).unwrap();
        let err = ConvexHull::from_context(context).unwrap_err();
        assert_eq!(err.kind(), crate::core::error::HullErrorKind::Input);
    }
}
