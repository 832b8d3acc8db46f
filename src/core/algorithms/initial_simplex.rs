//! Initial simplex: the first `D+1` vertices and facets.
//!
//! The search starts from the two extreme points of the widest coordinate axis
//! and repeatedly adds the point furthest from the affine span of the points
//! chosen so far. In heuristic mode only points extreme in some coordinate are
//! tried first; if none of them leaves the span by a reasonable margin, every
//! point is searched.

use crate::core::collections::{FastHashSet, VertexBuffer, fast_hash_set_with_capacity};
use crate::core::context::HullContext;
use crate::core::error::HullError;
use crate::core::facet::{FacetKey, FacetStatus};
use crate::core::options::SimplexSearch;
use crate::core::vertex::VertexKey;
use crate::geometry::hyperplane::{Hyperplane, centroid, dot};

/// Fraction of the input width below which the heuristic candidates are
/// considered nearly flat and the search widens to all points.
const HEURISTIC_FLAT_RATIO: f64 = 1e-3;

/// A point with its component orthogonal to the current span.
struct SpanCandidate {
    point: usize,
    residual: Vec<f64>,
    norm: f64,
}

impl HullContext {
    /// Chooses `D+1` affinely independent points.
    ///
    /// # Errors
    ///
    /// Returns [`HullError::SingularInput`] if the points span fewer than `D`
    /// dimensions within the flat simplex tolerance.
    pub(crate) fn select_simplex_points(&self) -> Result<Vec<usize>, HullError> {
        let dim = self.dim();
        let flat = self.precision.flat_simplex_tolerance();
        let usable: Vec<usize> = (0..self.points.len())
            .filter(|&p| Some(p) != self.excluded_point)
            .collect();

        let (low, high, width) = self.widest_axis_extremes(&usable)?;
        if width <= flat {
            return Err(HullError::singular(format!(
                "all {} points coincide within {flat:e}",
                usable.len()
            )));
        }

        let candidates = match self.options.simplex_search {
            SimplexSearch::Heuristic => self.coordinate_extremes(&usable),
            SimplexSearch::Exhaustive => usable.clone(),
        };

        let origin = self.points.point(low);
        let first: Vec<f64> = self
            .points
            .point(high)
            .iter()
            .zip(origin)
            .map(|(h, o)| (h - o) / width.max(f64::MIN_POSITIVE))
            .collect();
        let first_norm = dot(&first, &first).sqrt();
        let mut basis = vec![first.iter().map(|c| c / first_norm).collect::<Vec<f64>>()];
        let mut chosen = vec![low, high];

        while chosen.len() <= dim {
            let mut best = self.furthest_from_span(&candidates, &chosen, &basis);
            if self.options.simplex_search == SimplexSearch::Heuristic
                && best
                    .as_ref()
                    .is_none_or(|c| c.norm < HEURISTIC_FLAT_RATIO * width)
            {
                let widened = self.furthest_from_span(&usable, &chosen, &basis);
                if widened.as_ref().map(|c| c.norm) > best.as_ref().map(|c| c.norm) {
                    tracing::debug!(
                        "initial simplex: widening search to all {} points at vertex {}",
                        usable.len(),
                        chosen.len()
                    );
                    best = widened;
                }
            }

            let Some(candidate) = best.filter(|c| c.norm > flat) else {
                return Err(HullError::singular(format!(
                    "input is flat: the points span only {} of {dim} dimensions (tolerance {flat:e})",
                    chosen.len() - 1
                )));
            };
            basis.push(
                candidate
                    .residual
                    .iter()
                    .map(|c| c / candidate.norm)
                    .collect(),
            );
            chosen.push(candidate.point);
        }
        Ok(chosen)
    }

    /// The two extreme points of the coordinate axis with the largest range.
    fn widest_axis_extremes(&self, usable: &[usize]) -> Result<(usize, usize, f64), HullError> {
        let mut best: Option<(usize, usize, f64)> = None;
        for axis in 0..self.dim() {
            let mut low = None::<(usize, f64)>;
            let mut high = None::<(usize, f64)>;
            for &p in usable {
                let c = self.points.point(p)[axis];
                if low.is_none_or(|(_, v)| c < v) {
                    low = Some((p, c));
                }
                if high.is_none_or(|(_, v)| c > v) {
                    high = Some((p, c));
                }
            }
            if let (Some((lo, lo_val)), Some((hi, hi_val))) = (low, high) {
                let width = hi_val - lo_val;
                if best.is_none_or(|(_, _, w)| width > w) {
                    best = Some((lo, hi, width));
                }
            }
        }
        best.ok_or_else(|| HullError::input("no usable points for the initial simplex"))
    }

    /// Points with the minimum or maximum of some coordinate.
    fn coordinate_extremes(&self, usable: &[usize]) -> Vec<usize> {
        let mut seen: FastHashSet<usize> = fast_hash_set_with_capacity(2 * self.dim());
        let mut extremes = Vec::with_capacity(2 * self.dim());
        for axis in 0..self.dim() {
            let coordinate = |p: &usize| self.points.point(*p)[axis];
            let low = usable
                .iter()
                .min_by(|a, b| coordinate(a).total_cmp(&coordinate(b)));
            let high = usable
                .iter()
                .max_by(|a, b| coordinate(a).total_cmp(&coordinate(b)));
            for &p in low.into_iter().chain(high) {
                if seen.insert(p) {
                    extremes.push(p);
                }
            }
        }
        extremes
    }

    /// Candidate with the largest distance from the affine span of `chosen`.
    fn furthest_from_span(
        &self,
        candidates: &[usize],
        chosen: &[usize],
        basis: &[Vec<f64>],
    ) -> Option<SpanCandidate> {
        let origin = self.points.point(chosen[0]);
        let mut best: Option<SpanCandidate> = None;
        for &p in candidates {
            if chosen.contains(&p) {
                continue;
            }
            let mut residual: Vec<f64> = self
                .points
                .point(p)
                .iter()
                .zip(origin)
                .map(|(x, o)| x - o)
                .collect();
            // Two Gram-Schmidt passes keep the residual orthogonal to the span.
            for _ in 0..2 {
                for direction in basis {
                    let along = dot(&residual, direction);
                    for (r, d) in residual.iter_mut().zip(direction) {
                        *r = along.mul_add(-d, *r);
                    }
                }
            }
            let norm = dot(&residual, &residual).sqrt();
            if best.as_ref().is_none_or(|b| norm > b.norm) {
                best = Some(SpanCandidate {
                    point: p,
                    residual,
                    norm,
                });
            }
        }
        best
    }

    /// Builds the simplex facets, their ridges and neighbors, and partitions
    /// every other point.
    ///
    /// Facet `i` omits vertex `i`; the neighbor opposite vertex `j` of facet
    /// `i` is facet `j`.
    ///
    /// # Errors
    ///
    /// Returns [`HullError::SingularInput`] if no simplex exists or one of its
    /// facets is coplanar with the interior point.
    pub(crate) fn build_initial_simplex(&mut self) -> Result<(), HullError> {
        let dim = self.dim();
        let simplex = self.select_simplex_points()?;
        self.interior = centroid(simplex.iter().map(|&p| self.points.point(p)), dim);

        let vertices = simplex
            .iter()
            .map(|&p| self.add_point_vertex(p))
            .collect::<Result<Vec<VertexKey>, _>>()?;
        let dist_round = self.precision.dist_round;

        let mut facets: Vec<FacetKey> = Vec::with_capacity(dim + 1);
        for omitted in 0..=dim {
            let facet_vertices: VertexBuffer<VertexKey> = (0..=dim)
                .rev()
                .filter(|&j| j != omitted)
                .map(|j| vertices[j])
                .collect();
            let coords: Vec<&[f64]> = (0..=dim)
                .rev()
                .filter(|&j| j != omitted)
                .map(|j| self.points.point(simplex[j]))
                .collect();
            let fitted = Hyperplane::fit(&coords, &self.interior, dist_round)
                .map_err(|e| HullError::singular(format!("initial simplex is flat: {e}")))?;
            if fitted.flipped {
                return Err(HullError::singular(format!(
                    "initial simplex is flat: facet {omitted} is coplanar with the interior point (distance {:e})",
                    fitted.interior_distance
                )));
            }
            facets.push(
                self.graph
                    .add_facet(facet_vertices, fitted.plane, FacetStatus::Active),
            );
        }

        for (i, &facet) in facets.iter().enumerate() {
            let neighbors = (0..=dim).rev().filter(|&j| j != i).map(|j| facets[j]);
            self.graph.facet_mut(facet)?.neighbors.extend(neighbors);
        }
        for i in 0..=dim {
            for j in (i + 1)..=dim {
                let ridge_vertices: VertexBuffer<VertexKey> = (0..=dim)
                    .rev()
                    .filter(|&k| k != i && k != j)
                    .map(|k| vertices[k])
                    .collect();
                self.graph.add_ridge(ridge_vertices, facets[i], facets[j])?;
            }
        }

        tracing::debug!(
            "initial simplex: points {simplex:?}, {} facets in {dim}D",
            facets.len()
        );

        let mut remaining = Vec::new();
        remaining.try_reserve_exact(self.points.len().saturating_sub(simplex.len()))?;
        remaining.extend(
            (0..self.points.len())
                .filter(|p| !simplex.contains(p) && Some(*p) != self.excluded_point),
        );
        self.partition_points(&remaining, &facets)
    }
}
