//! Cone construction: connecting a new point to its horizon.
//!
//! Each horizon ridge yields one simplicial facet with the apex as its first
//! vertex. The horizon ridge moves from the visible facet to the new facet,
//! and the new facets are joined to each other by matching their subridges:
//! a subridge shared by exactly two new facets becomes a ridge between them.
//! An even number above two means a pinched horizon; with merging the facets
//! are paired by normal alignment and queued for forced merges.

use slotmap::Key;

use super::horizon::{Horizon, subridges};
use crate::core::collections::{FastHashMap, VertexBuffer, fast_hash_map_with_capacity};
use crate::core::context::{HullContext, MergeKind, MergeRequest};
use crate::core::error::HullError;
use crate::core::facet::{FacetKey, FacetStatus};
use crate::core::vertex::{VertexKey, VertexStatus};
use crate::geometry::hyperplane::Hyperplane;

/// A new facet and the neighbor slot a subridge fills.
type SlotRef = (FacetKey, usize);

impl HullContext {
    /// Replaces the visible region of `horizon` by a cone from `point`.
    ///
    /// Returns the apex vertex. The visible facets are only marked; they are
    /// deleted when the step is attached.
    ///
    /// # Errors
    ///
    /// Returns [`HullError::Precision`] for a flipped facet or a pinched
    /// horizon without merging, or when `point` has become a vertex too often,
    /// and [`HullError::Topology`] for unmatched subridges.
    pub(crate) fn build_cone(
        &mut self,
        point: usize,
        horizon: &Horizon,
    ) -> Result<VertexKey, HullError> {
        let dim = self.dim();
        for &key in &horizon.visible {
            self.graph.facet_mut(key)?.status = FacetStatus::Visible;
            self.visible.push(key);
        }
        for &key in &horizon.interior_vertices {
            self.graph.vertex_mut(key)?.status = VertexStatus::Deleted;
            self.deleted_vertices.push(key);
        }
        for &key in &horizon.coplanar {
            self.graph.facet_mut(key)?.coplanar_horizon = true;
        }

        let apex = self.add_point_vertex(point)?;
        self.graph.vertex_mut(apex)?.new_this_step = true;

        let mut slots: FastHashMap<VertexBuffer<VertexKey>, Vec<SlotRef>> =
            fast_hash_map_with_capacity(horizon.ridges.len() * dim);
        let mut created = Vec::with_capacity(horizon.ridges.len());

        for hr in &horizon.ridges {
            let ridge_vertices = self.graph.ridge(hr.ridge)?.vertices.clone();
            let mut vertices: VertexBuffer<VertexKey> = VertexBuffer::with_capacity(dim);
            vertices.push(apex);
            vertices.extend(ridge_vertices.iter().copied());

            let (plane, flipped) = self.cone_plane(&vertices, hr.visible, hr.horizon)?;
            let key = self.graph.add_facet(vertices, plane, FacetStatus::NewThisStep);
            {
                let facet = self.graph.facet_mut(key)?;
                facet.flipped = flipped;
                facet.neighbors.push(hr.horizon);
                facet
                    .neighbors
                    .extend(std::iter::repeat_n(FacetKey::null(), dim - 1));
                facet.ridges.push(hr.ridge);
            }
            self.graph
                .ridge_mut(hr.ridge)?
                .replace_facet(hr.visible, key);
            self.graph
                .facet_mut(hr.visible)?
                .ridges
                .retain(|r| *r != hr.ridge);

            let horizon_facet = self.graph.facet_mut(hr.horizon)?;
            if !(horizon_facet.simplicial && horizon_facet.replace_neighbor(hr.visible, key)) {
                horizon_facet.neighbors.retain(|n| *n != hr.visible);
                horizon_facet.add_neighbor(key);
            }

            for (skip, sub) in subridges(&ridge_vertices) {
                slots.entry(sub).or_default().push((key, skip + 1));
            }
            created.push(key);
        }

        for (sub, entries) in slots {
            match entries.len() {
                2 => self.link_cone_facets(apex, &sub, entries[0], entries[1], false)?,
                n if n % 2 == 0 => {
                    if !self.merging() {
                        return Err(HullError::precision(format!(
                            "pinched horizon at point {point}: {n} new facets share a ridge; \
                             enable merging or joggle"
                        )));
                    }
                    self.pair_duplicate_ridges(apex, &sub, entries)?;
                }
                n => {
                    return Err(HullError::topology(format!(
                        "cone of point {point} has a ridge shared by {n} new facets"
                    )));
                }
            }
        }

        for &key in &created {
            if !self.graph.facet(key)?.flipped {
                continue;
            }
            if !self.merging() {
                return Err(HullError::precision(format!(
                    "new facet f{} of point {point} is flipped by roundoff; enable merging or joggle",
                    self.graph.facet(key)?.id
                )));
            }
            self.merge_queue
                .push(MergeRequest::new(MergeKind::Flipped, key, None, 0.0));
        }

        self.counters.points_added += 1;
        tracing::debug!(
            "point {point}: {} visible facets replaced by {} new facets",
            horizon.visible.len(),
            created.len()
        );
        self.new_facets = created;
        Ok(apex)
    }

    /// Plane through the cone facet `vertices`, or the horizon facet's plane
    /// flagged as flipped when the vertices are degenerate.
    ///
    /// The plane is oriented away from the interior point. The vertices of the
    /// replaced facet `visible` end up inside the new hull, so the facet is
    /// also flipped when they are above it.
    fn cone_plane(
        &self,
        vertices: &[VertexKey],
        visible: FacetKey,
        horizon: FacetKey,
    ) -> Result<(Hyperplane, bool), HullError> {
        let mut coords = Vec::with_capacity(vertices.len());
        for &v in vertices {
            coords.push(self.points.point(self.graph.vertex_point(v)?));
        }
        let fitted = match Hyperplane::fit(&coords, &self.interior, self.precision.dist_round) {
            Ok(fitted) => fitted,
            Err(error) => {
                tracing::debug!("degenerate cone facet, using the horizon plane: {error}");
                return Ok((self.graph.facet(horizon)?.hyperplane().clone(), true));
            }
        };

        // Signed distance of the replaced vertex furthest from the plane
        let mut beyond = 0.0_f64;
        for &v in self.graph.facet(visible)?.vertices() {
            if vertices.contains(&v) {
                continue;
            }
            let dist = fitted
                .plane
                .distance(self.points.point(self.graph.vertex_point(v)?));
            if dist.abs() > beyond.abs() {
                beyond = dist;
            }
        }
        let limit = self.precision.max_coplanar + self.max_outside;
        let reversed = beyond > limit;
        if reversed {
            tracing::debug!(
                "cone facet is reversed: a replaced vertex is {beyond:e} above it (limit {limit:e})"
            );
        }
        Ok((fitted.plane, fitted.flipped || reversed))
    }

    /// Joins two cone facets across the ridge `[apex] + sub`.
    fn link_cone_facets(
        &mut self,
        apex: VertexKey,
        sub: &[VertexKey],
        (first, first_slot): SlotRef,
        (second, second_slot): SlotRef,
        dupridge: bool,
    ) -> Result<(), HullError> {
        let mut vertices: VertexBuffer<VertexKey> = VertexBuffer::with_capacity(sub.len() + 1);
        vertices.push(apex);
        vertices.extend(sub.iter().copied());

        self.graph.facet_mut(first)?.neighbors[first_slot] = second;
        self.graph.facet_mut(second)?.neighbors[second_slot] = first;
        let ridge = self.graph.add_ridge(vertices, first, second)?;
        if dupridge {
            self.graph.ridge_mut(ridge)?.dupridge = true;
            self.graph.facet_mut(first)?.dupridge = true;
            self.graph.facet_mut(second)?.dupridge = true;
            let cos = self
                .graph
                .facet(first)?
                .hyperplane()
                .cos_angle(self.graph.facet(second)?.hyperplane());
            self.merge_queue.push(MergeRequest::new(
                MergeKind::Dupridge,
                first,
                Some(second),
                1.0 - cos,
            ));
        }
        Ok(())
    }

    /// Pairs the cone facets through a duplicated subridge, best aligned
    /// normals first.
    fn pair_duplicate_ridges(
        &mut self,
        apex: VertexKey,
        sub: &[VertexKey],
        mut entries: Vec<SlotRef>,
    ) -> Result<(), HullError> {
        tracing::warn!(
            "duplicate ridge: {} new facets share one ridge, pairing them for merging",
            entries.len()
        );
        while entries.len() >= 2 {
            let mut best: Option<(usize, usize, f64)> = None;
            for i in 0..entries.len() {
                for j in (i + 1)..entries.len() {
                    let cos = self
                        .graph
                        .facet(entries[i].0)?
                        .hyperplane()
                        .cos_angle(self.graph.facet(entries[j].0)?.hyperplane());
                    if best.is_none_or(|(_, _, c)| cos > c) {
                        best = Some((i, j, cos));
                    }
                }
            }
            let Some((i, j, _)) = best else {
                break;
            };
            let second = entries.swap_remove(j);
            let first = entries.swap_remove(i);
            self.link_cone_facets(apex, sub, first, second, true)?;
        }
        Ok(())
    }
}
