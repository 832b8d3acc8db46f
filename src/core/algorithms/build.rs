//! The incremental construction loop.
//!
//! ```text
//! InitialSimplex -> { SelectFurthest -> FindHorizon -> BuildCone
//!                     -> MergeIfNeeded -> Attach }* -> PostMerge -> Finalize
//! ```
//!
//! Every transition is recorded in the context state so a failure reports the
//! phase it happened in. With merging, vertices left in fewer than `D` facets
//! are renamed away after the last merge. The final pass checks convexity of a
//! non-merged hull, widens `max_outside` until every input point is provably
//! inside the outer planes, rebuilds the coplanar sets, indexes vertices by
//! point and marks the good facets.

use crate::core::collections::{FastHashSet, fast_hash_set_with_capacity};
use crate::core::context::{BuildPhase, ContextState, HullContext};
use crate::core::error::HullError;
use crate::core::facet::{FacetKey, FacetStatus};
use crate::core::options::{GoodPointRule, GoodVertexRule};
use crate::core::vertex::VertexKey;

use super::horizon::{Horizon, Pinch};

/// Vertices at a pinch closer than this multiple of the outer plane width are
/// merged into one.
const PINCH_VERTEX_RATIO: f64 = 10.0;

impl HullContext {
    /// Runs the whole construction on the current points.
    pub(crate) fn build(&mut self) -> Result<(), HullError> {
        self.set_phase(BuildPhase::InitialSimplex);
        self.point_additions.clear();
        self.point_additions.resize(self.points.len(), 0);
        self.build_initial_simplex()?;

        loop {
            self.set_phase(BuildPhase::SelectFurthest);
            let Some((point, start)) = self.next_furthest()? else {
                break;
            };
            self.add_point(point, start)?;
        }

        if self.options.merge_mode.postmerges() {
            self.set_phase(BuildPhase::PostMerge);
            self.post_merge()?;
        }
        if self.merging() {
            self.reduce_vertices()?;
        }

        self.set_phase(BuildPhase::Finalize);
        self.finalize()?;
        self.state = ContextState::Finished;
        tracing::debug!(
            "hull finished: {} facets, {} vertices, {} merges",
            self.graph.facet_count(),
            self.graph.vertex_count(),
            self.counters.facet_merges
        );
        Ok(())
    }

    // =========================================================================
    // ONE STEP
    // =========================================================================

    /// Adds `point`, which is outside `start`, to the hull.
    pub(crate) fn add_point(&mut self, point: usize, start: FacetKey) -> Result<(), HullError> {
        self.set_phase(BuildPhase::FindHorizon);
        let Some(horizon) = self.horizon_with_retries(point, start)? else {
            return Ok(());
        };

        self.set_phase(BuildPhase::BuildCone);
        self.build_cone(point, &horizon)?;

        self.set_phase(BuildPhase::MergeIfNeeded);
        self.merge_all(self.premerge_radius())?;

        self.set_phase(BuildPhase::Attach);
        self.attach_new_facets()
    }

    fn premerge_radius(&self) -> Option<f64> {
        self.options
            .merge_mode
            .premerges()
            .then_some(self.precision.premerge_centrum)
    }

    /// Finds the horizon of `point`, resolving pinches while the retry budget
    /// lasts. Returns `None` if the point no longer sees any facet.
    fn horizon_with_retries(
        &mut self,
        point: usize,
        mut start: FacetKey,
    ) -> Result<Option<Horizon>, HullError> {
        let mut forced: FastHashSet<FacetKey> = fast_hash_set_with_capacity(4);
        let mut attempt = 0_usize;
        loop {
            let horizon = self.find_horizon(point, start, &forced)?;
            let Some(pinch) = &horizon.pinch else {
                return Ok(Some(horizon));
            };
            if !self.merging() || attempt >= self.options.max_pinch_retries {
                return Ok(Some(horizon));
            }
            attempt += 1;
            self.counters.pinch_retries += 1;
            tracing::warn!(
                "pinched horizon at point {point}: {} ridges share a subridge (retry {attempt})",
                pinch.ridges.len()
            );

            if let Some((old, new)) = self.pinch_vertex_pair(pinch)? {
                self.merge_vertices(old, new)?;
                self.merge_all(self.premerge_radius())?;
                self.attach_new_facets()?;
                forced.clear();
                if !self.graph.is_live_facet(start) {
                    let candidates: Vec<FacetKey> =
                        self.graph.live_facets().map(|(key, _)| key).collect();
                    let Some((facet, dist)) = self.best_facet(point, &candidates)? else {
                        return Ok(None);
                    };
                    if dist <= self.precision.min_visible {
                        tracing::debug!("point {point} became coplanar after a vertex merge");
                        self.place_point(point, facet, dist)?;
                        return Ok(None);
                    }
                    start = facet;
                }
                continue;
            }

            let Some(facet) = self.pinch_facet_to_force(point, pinch, attempt)? else {
                return Ok(Some(horizon));
            };
            forced.insert(facet);
        }
    }

    /// Two extra vertices of the pinched horizon ridges that are close enough
    /// to merge, newer first.
    fn pinch_vertex_pair(
        &self,
        pinch: &Pinch,
    ) -> Result<Option<(VertexKey, VertexKey)>, HullError> {
        let mut extra: Vec<VertexKey> = Vec::with_capacity(pinch.ridges.len());
        for hr in &pinch.ridges {
            for &v in self.graph.ridge(hr.ridge)?.vertices() {
                if !pinch.subridge.contains(&v) && !extra.contains(&v) {
                    extra.push(v);
                }
            }
        }

        let limit = PINCH_VERTEX_RATIO * self.max_outside.max(self.precision.premerge_centrum);
        let mut best: Option<(VertexKey, VertexKey, f64)> = None;
        for (i, &a) in extra.iter().enumerate() {
            let pa = self.points.point(self.graph.vertex_point(a)?);
            for &b in &extra[i + 1..] {
                let pb = self.points.point(self.graph.vertex_point(b)?);
                let dist = pa
                    .iter()
                    .zip(pb)
                    .map(|(x, y)| (x - y) * (x - y))
                    .sum::<f64>()
                    .sqrt();
                if dist <= limit && best.is_none_or(|(_, _, d)| dist < d) {
                    best = Some((a, b, dist));
                }
            }
        }
        let Some((a, b, _)) = best else {
            return Ok(None);
        };
        if self.graph.vertex(a)?.id() > self.graph.vertex(b)?.id() {
            Ok(Some((a, b)))
        } else {
            Ok(Some((b, a)))
        }
    }

    /// The horizon facet at the pinch nearest to `point`, if it is within the
    /// coplanar tolerance widened for this attempt.
    fn pinch_facet_to_force(
        &self,
        point: usize,
        pinch: &Pinch,
        attempt: usize,
    ) -> Result<Option<FacetKey>, HullError> {
        let mut best: Option<(FacetKey, f64)> = None;
        for hr in &pinch.ridges {
            let dist = self.point_distance(point, hr.horizon)?;
            if best.is_none_or(|(_, d)| dist > d) {
                best = Some((hr.horizon, dist));
            }
        }
        let widening = f64::from(u32::try_from(attempt).unwrap_or(u32::MAX).min(60)).exp2();
        Ok(best
            .filter(|&(_, dist)| dist >= -self.precision.max_coplanar * widening)
            .map(|(key, _)| key))
    }

    // =========================================================================
    // POST-MERGE
    // =========================================================================

    /// Retests every ridge with the postmerge radius and merges.
    pub(crate) fn post_merge(&mut self) -> Result<(), HullError> {
        let keys: Vec<FacetKey> = self.graph.live_facets().map(|(key, _)| key).collect();
        tracing::debug!("post-merge over {} facets", keys.len());
        for &key in &keys {
            let facet = self.graph.facet_mut(key)?;
            facet.status = FacetStatus::NewThisStep;
            facet.tested = false;
            let ridges = facet.ridges.clone();
            for r in ridges {
                self.graph.ridge_mut(r)?.tested = false;
            }
        }
        self.new_facets = keys;
        self.merge_all(Some(self.precision.postmerge_centrum))?;
        self.attach_new_facets()
    }

    // =========================================================================
    // FINAL PASS
    // =========================================================================

    pub(crate) fn finalize(&mut self) -> Result<(), HullError> {
        if let Some((_, facet)) = self.graph.live_facets().find(|(_, f)| f.flipped) {
            return Err(HullError::precision(format!(
                "facet f{} is flipped after merging",
                facet.id
            )));
        }
        if !self.merging() {
            self.validate_convexity().map_err(|e| {
                HullError::precision(format!("hull is not convex without merging: {e}"))
            })?;
        }
        self.graph.define_vertex_neighbors();
        self.index_vertices()?;
        self.check_maxout()?;
        self.find_good()?;
        if self.options.check_output {
            self.validate()
                .map_err(|e| HullError::precision(format!("output check failed: {e}")))?;
        }
        Ok(())
    }

    fn index_vertices(&mut self) -> Result<(), HullError> {
        self.point_vertex.clear();
        self.point_vertex.try_reserve_exact(self.points.len())?;
        self.point_vertex.resize(self.points.len(), None);
        for (key, vertex) in self.graph.live_vertices() {
            self.point_vertex[vertex.point] = Some(key);
        }
        Ok(())
    }

    /// Widens `max_outside` until every point, vertices included, is below
    /// the outer plane of every facet, and rebuilds the coplanar sets from
    /// scratch.
    fn check_maxout(&mut self) -> Result<(), HullError> {
        let mut min_vertex = 0.0_f64;
        for (_, vertex) in self.graph.live_vertices() {
            let coords = self.points.point(vertex.point);
            for &facet in &vertex.neighbors {
                if let Ok(facet) = self.graph.facet(facet)
                    && !facet.is_visible()
                {
                    min_vertex = min_vertex.min(facet.hyperplane().distance(coords));
                }
            }
        }
        self.min_vertex = self.min_vertex.min(min_vertex);

        let candidates: Vec<FacetKey> = self.graph.live_facets().map(|(key, _)| key).collect();
        for &key in &candidates {
            self.graph.facet_mut(key)?.coplanar.clear();
        }
        self.point_facet.clear();
        self.point_facet.try_reserve_exact(self.points.len())?;
        self.point_facet.resize(self.points.len(), None);

        let keep_coplanar = self.options.keep_coplanar;
        let keep_inside = self.options.keep_inside;
        let max_coplanar = self.precision.max_coplanar;
        for point in 0..self.points.len() {
            if Some(point) == self.excluded_point {
                continue;
            }
            let coords = self.points.point(point);
            let mut best: Option<(FacetKey, f64)> = None;
            for &key in &candidates {
                let facet = self.graph.facet_mut(key)?;
                let dist = facet.plane.distance(coords);
                if dist > facet.max_outside {
                    facet.max_outside = dist;
                }
                if best.is_none_or(|(_, d)| dist > d) {
                    best = Some((key, dist));
                }
            }
            let Some((facet, dist)) = best else {
                continue;
            };
            self.max_outside = self.max_outside.max(dist);
            if self.point_vertex[point].is_some() {
                continue;
            }
            if (keep_coplanar && dist >= -max_coplanar) || keep_inside {
                self.graph.facet_mut(facet)?.coplanar.push(point);
                self.point_facet[point] = Some(facet);
            }
        }
        Ok(())
    }

    /// Marks the facets accepted by every selection rule, and the upper
    /// Delaunay facets.
    fn find_good(&mut self) -> Result<(), HullError> {
        let dim = self.dim();
        let dist_round = self.precision.dist_round;
        let upper_bound = -2.0 * self.precision.angle_round;
        let delaunay = self.options.delaunay;
        let want_upper = self.options.upper_delaunay;
        let selection = self.options.selection.clone();
        let good_point = selection
            .good_point
            .map(|rule| (rule, self.points.point(rule.point()).to_vec()));
        let good_vertex = selection
            .good_vertex
            .map(|rule| (rule, self.point_vertex.get(rule.point()).copied().flatten()));

        let keys: Vec<FacetKey> = self.graph.live_facets().map(|(key, _)| key).collect();
        let mut good_count = 0_usize;
        for key in keys {
            let facet = self.graph.facet_mut(key)?;
            let normal = facet.plane.normal();
            let upper = delaunay && normal[dim - 1] >= upper_bound;
            let mut good = !delaunay || upper == want_upper;

            if let Some((rule, coords)) = &good_point {
                let visible = facet.plane.distance(coords) > dist_round;
                good &= match rule {
                    GoodPointRule::VisibleFrom(_) => visible,
                    GoodPointRule::HiddenFrom(_) => !visible,
                };
            }
            if let Some((rule, vertex)) = &good_vertex {
                let contains = vertex.is_some_and(|v| facet.vertices.contains(&v));
                good &= match rule {
                    GoodVertexRule::Includes(_) => contains,
                    GoodVertexRule::Excludes(_) => !contains,
                };
            }
            good &= selection.thresholds.iter().all(|t| t.accepts(normal));

            facet.upper_delaunay = upper;
            facet.good = good;
            good_count += usize::from(good);
        }
        tracing::debug!("{good_count} good facets");
        Ok(())
    }
}
