//! Outside and coplanar sets.
//!
//! Every point not yet on the hull is kept by at most one facet: in its
//! outside set if it is further than `min_outside` above the facet, in its
//! coplanar set if it is within `max_coplanar` and coplanar points are kept,
//! or dropped. After a cone is built, the points of the visible facets and of
//! the vertices that fell inside are placed again on the new facets and their
//! neighbors, and the visible facets are deleted. Points of deleted vertices
//! only ever return as coplanar points.

use crate::core::collections::{FastHashSet, fast_hash_set_with_capacity};
use crate::core::context::HullContext;
use crate::core::error::HullError;
use crate::core::facet::FacetKey;
use crate::core::options::PointSelection;
use crate::core::vertex::VertexStatus;

impl HullContext {
    /// Facet among `candidates` that `point` is furthest above.
    pub(crate) fn best_facet(
        &self,
        point: usize,
        candidates: &[FacetKey],
    ) -> Result<Option<(FacetKey, f64)>, HullError> {
        let coords = self.points.point(point);
        let mut best: Option<(FacetKey, f64)> = None;
        for &key in candidates {
            let Ok(facet) = self.graph.facet(key) else {
                continue;
            };
            if facet.is_visible() {
                continue;
            }
            let dist = facet.hyperplane().distance(coords);
            if best.is_none_or(|(_, d)| dist > d) {
                best = Some((key, dist));
            }
        }
        Ok(best)
    }

    /// Files `point` with `facet` as outside, coplanar or inside.
    ///
    /// A point that already was a vertex is never outside again: above the
    /// facet it counts as coplanar and widens the outer plane.
    pub(crate) fn place_point(
        &mut self,
        point: usize,
        facet: FacetKey,
        dist: f64,
    ) -> Result<(), HullError> {
        let precision = self.precision;
        let keep_coplanar = self.options.keep_coplanar;
        let keep_inside = self.options.keep_inside;
        let was_vertex = self.was_vertex(point);
        let target = self.graph.facet_mut(facet)?;
        if dist > precision.min_outside && !was_vertex {
            target.push_outside(point, dist);
        } else if dist >= -precision.max_coplanar {
            if dist > target.max_outside {
                target.max_outside = dist;
            }
            self.max_outside = self.max_outside.max(dist);
            if keep_coplanar || keep_inside {
                target.coplanar.push(point);
            }
        } else if keep_inside {
            target.coplanar.push(point);
        }
        Ok(())
    }

    /// Places each of `points` on its best facet among `candidates`.
    pub(crate) fn partition_points(
        &mut self,
        points: &[usize],
        candidates: &[FacetKey],
    ) -> Result<(), HullError> {
        for &point in points {
            if let Some((facet, dist)) = self.best_facet(point, candidates)? {
                self.place_point(point, facet, dist)?;
            }
        }
        Ok(())
    }

    /// Removes the next point to add from its outside set.
    pub(crate) fn next_furthest(&mut self) -> Result<Option<(usize, FacetKey)>, HullError> {
        let chosen = match self.options.point_selection {
            PointSelection::FirstAvailable => self
                .graph
                .live_facets()
                .find(|(_, f)| !f.outside.is_empty())
                .map(|(key, _)| key),
            PointSelection::Furthest => self
                .graph
                .live_facets()
                .filter(|(_, f)| !f.outside.is_empty())
                .max_by(|(_, a), (_, b)| a.furthest_dist.total_cmp(&b.furthest_dist))
                .map(|(key, _)| key),
        };
        let Some(key) = chosen else {
            return Ok(None);
        };

        let facet = self.graph.facet(key)?;
        let plane = facet.hyperplane();
        let mut best: Option<(usize, f64)> = None;
        let mut runner_up = f64::NEG_INFINITY;
        for (slot, &point) in facet.outside.iter().enumerate() {
            let dist = plane.distance(self.points.point(point));
            match best {
                Some((_, d)) if dist <= d => runner_up = runner_up.max(dist),
                Some((_, d)) => {
                    runner_up = d;
                    best = Some((slot, dist));
                }
                None => best = Some((slot, dist)),
            }
        }
        let Some((slot, _)) = best else {
            return Ok(None);
        };

        let facet = self.graph.facet_mut(key)?;
        let point = facet.outside.swap_remove(slot);
        facet.furthest_dist = if facet.outside.is_empty() {
            0.0
        } else {
            runner_up
        };
        Ok(Some((point, key)))
    }

    /// Finishes a step: places the points of visible facets and deleted
    /// vertices on the new facets or their neighbors, then deletes the visible
    /// facets and the deleted vertices.
    pub(crate) fn attach_new_facets(&mut self) -> Result<(), HullError> {
        let mut points = Vec::new();
        for &key in &self.visible {
            if let Ok(facet) = self.graph.facet_mut(key) {
                points.append(&mut facet.outside);
                points.append(&mut facet.coplanar);
            }
        }
        for &key in &self.deleted_vertices {
            if let Ok(vertex) = self.graph.vertex_mut(key)
                && !vertex.partitioned
            {
                vertex.partitioned = true;
                points.push(vertex.point);
            }
        }

        let candidates = self.attach_candidates()?;
        self.partition_points(&points, &candidates)?;
        self.delete_visible()?;
        self.graph.settle_step();
        self.new_facets.clear();
        Ok(())
    }

    /// Live new facets and their live neighbors; all facets if no new facet
    /// survived the merges.
    fn attach_candidates(&self) -> Result<Vec<FacetKey>, HullError> {
        let mut seen: FastHashSet<FacetKey> = fast_hash_set_with_capacity(self.new_facets.len() * 2);
        let mut candidates = Vec::new();
        for &key in &self.new_facets {
            if !self.graph.is_live_facet(key) {
                continue;
            }
            if seen.insert(key) {
                candidates.push(key);
            }
            for &neighbor in self.graph.facet(key)?.neighbors() {
                if self.graph.is_live_facet(neighbor) && seen.insert(neighbor) {
                    candidates.push(neighbor);
                }
            }
        }
        if candidates.is_empty() {
            candidates.extend(self.graph.live_facets().map(|(key, _)| key));
        }
        Ok(candidates)
    }

    /// Removes visible facets, their leftover ridges and the deleted
    /// vertices, then compacts the lists.
    pub(crate) fn delete_visible(&mut self) -> Result<(), HullError> {
        for key in std::mem::take(&mut self.visible) {
            let Some(facet) = self.graph.remove_facet(key) else {
                continue;
            };
            for neighbor in facet.neighbors {
                if let Ok(other) = self.graph.facet_mut(neighbor) {
                    other.neighbors.retain(|n| *n != key);
                }
            }
        }
        for key in std::mem::take(&mut self.deleted_vertices) {
            if self
                .graph
                .vertex(key)
                .is_ok_and(|v| v.status == VertexStatus::Deleted)
            {
                self.graph.remove_vertex(key);
            }
        }
        self.graph.compact_lists();
        Ok(())
    }
}
