//! Facet merging.
//!
//! Roundoff makes a freshly built cone slightly non-convex or coplanar with
//! its neighbors. The merge engine tests every untested ridge of a new facet
//! with the centrum test, queues the non-convex pairs and merges them least
//! severe first. Merging two facets unions their vertices, rewires their
//! ridges and refits the plane; afterwards facets with too few vertices or
//! neighbors (degenerate) or whose vertices a neighbor already has
//! (redundant) are merged away as well.
//!
//! Vertex merges rename a vertex to a nearby one. They resolve pinched
//! horizons by collapsing the ridges that made the horizon pinch.

use crate::core::collections::{
    FastHashMap, FastHashSet, VertexBuffer, fast_hash_map_with_capacity,
    fast_hash_set_with_capacity,
};
use crate::core::context::{HullContext, MergeKind, MergeRequest};
use crate::core::error::HullError;
use crate::core::facet::{FacetKey, FacetStatus, RemovalReason};
use crate::core::options::MergeOrdering;
use crate::core::ridge::RidgeKey;
use crate::core::vertex::{VertexKey, VertexStatus};
use crate::geometry::hyperplane::Hyperplane;

/// Outcome of the centrum test on one side of a ridge.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Side {
    Convex,
    Coplanar,
    Concave,
}

impl Side {
    fn classify(dist: f64, radius: f64) -> Self {
        if dist > radius {
            Self::Concave
        } else if dist >= -radius {
            Self::Coplanar
        } else {
            Self::Convex
        }
    }
}

impl HullContext {
    // -------------------------------------------------------------------------
    // Convexity tests
    // -------------------------------------------------------------------------

    /// Centrum of a facet, computed on first use.
    pub(crate) fn facet_centrum(&mut self, key: FacetKey) -> Result<Vec<f64>, HullError> {
        let facet = self.graph.facet(key)?;
        if let Some(centrum) = &facet.centrum {
            return Ok(centrum.clone());
        }
        let mut coords = Vec::with_capacity(facet.vertices.len());
        for &v in &facet.vertices {
            coords.push(self.points.point(self.graph.vertex_point(v)?));
        }
        let centrum = facet.hyperplane().centrum(coords);
        self.graph.facet_mut(key)?.centrum = Some(centrum.clone());
        Ok(centrum)
    }

    /// Centrum test of two neighbors; `None` if they are clearly convex.
    pub(crate) fn convexity_test(
        &mut self,
        first: FacetKey,
        second: FacetKey,
        radius: f64,
    ) -> Result<Option<(MergeKind, f64)>, HullError> {
        let first_centrum = self.facet_centrum(first)?;
        let second_centrum = self.facet_centrum(second)?;
        let first_plane = self.graph.facet(first)?.hyperplane();
        let second_plane = self.graph.facet(second)?.hyperplane();
        let d1 = second_plane.distance(&first_centrum);
        let d2 = first_plane.distance(&second_centrum);

        let kind = match (Side::classify(d1, radius), Side::classify(d2, radius)) {
            (Side::Convex, Side::Convex) => return Ok(None),
            (Side::Concave, Side::Concave | Side::Convex) | (Side::Convex, Side::Concave) => {
                MergeKind::Concave
            }
            (Side::Concave, Side::Coplanar) | (Side::Coplanar, Side::Concave) => {
                MergeKind::ConcaveCoplanar
            }
            (Side::Coplanar, _) | (_, Side::Coplanar) => MergeKind::Coplanar,
        };
        let severity = match self.options.merge_order {
            MergeOrdering::Distance => match kind {
                MergeKind::Coplanar => d1.abs().min(d2.abs()),
                _ => d1.max(d2),
            },
            MergeOrdering::Angle => 1.0 - first_plane.cos_angle(second_plane),
        };
        Ok(Some((kind, severity)))
    }

    /// Tests the untested ridges of every new facet and queues the
    /// non-convex ones.
    pub(crate) fn queue_new_merges(&mut self, radius: f64) -> Result<(), HullError> {
        for key in self.new_facets.clone() {
            if !self.graph.is_live_facet(key) || self.graph.facet(key)?.tested {
                continue;
            }
            for ridge_key in self.graph.facet(key)?.ridges.clone() {
                let ridge = self.graph.ridge(ridge_key)?;
                if ridge.tested {
                    continue;
                }
                let Some(other) = ridge.other(key) else {
                    continue;
                };
                if !self.graph.is_live_facet(other) {
                    continue;
                }
                let verdict = self.convexity_test(key, other, radius)?;
                let ridge = self.graph.ridge_mut(ridge_key)?;
                ridge.tested = true;
                ridge.nonconvex = verdict.is_some();
                if let Some((kind, severity)) = verdict {
                    self.merge_queue
                        .push(MergeRequest::new(kind, key, Some(other), severity));
                }
            }
            self.graph.facet_mut(key)?.tested = true;
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Merge loop
    // -------------------------------------------------------------------------

    /// Processes queued merges until no new facet is non-convex.
    ///
    /// With `radius == None` only forced, degenerate and redundant merges run.
    pub(crate) fn merge_all(&mut self, radius: Option<f64>) -> Result<(), HullError> {
        if !self.merging() {
            return Ok(());
        }
        self.graph.define_vertex_neighbors();
        loop {
            self.process_degenerate()?;
            if let Some(radius) = radius {
                self.queue_new_merges(radius)?;
            }
            if self.merge_queue.is_empty() {
                break;
            }
            let mut queue = std::mem::take(&mut self.merge_queue);
            queue.sort_by_key(MergeRequest::sort_key);
            for request in queue {
                self.execute_merge(request, radius)?;
                self.process_degenerate()?;
            }
        }
        Ok(())
    }

    /// The live facet that absorbed `key`, following merge replacements.
    fn resolve_facet(&self, mut key: FacetKey) -> Option<FacetKey> {
        loop {
            let facet = self.graph.facet(key).ok()?;
            if !facet.is_visible() {
                return Some(key);
            }
            key = facet.replace?;
        }
    }

    fn are_neighbors(&self, first: FacetKey, second: FacetKey) -> Result<bool, HullError> {
        Ok(self.graph.facet(first)?.neighbors.contains(&second))
    }

    fn execute_merge(&mut self, request: MergeRequest, radius: Option<f64>) -> Result<(), HullError> {
        match request.kind {
            MergeKind::Flipped => {
                if !self.graph.is_live_facet(request.facet1) || !self.graph.facet(request.facet1)?.flipped {
                    return Ok(());
                }
                let target = self.best_neighbor(request.facet1)?;
                self.merge_facets(request.facet1, target, request.kind)
            }
            MergeKind::Dupridge => {
                let (Some(first), Some(second)) = (
                    self.resolve_facet(request.facet1),
                    request.facet2.and_then(|f| self.resolve_facet(f)),
                ) else {
                    return Ok(());
                };
                if first == second {
                    return Ok(());
                }
                self.merge_pair(first, second, request.kind)
            }
            MergeKind::Coplanar | MergeKind::Concave | MergeKind::ConcaveCoplanar => {
                let Some(second) = request.facet2 else {
                    return Ok(());
                };
                let first = request.facet1;
                if !self.graph.is_live_facet(first)
                    || !self.graph.is_live_facet(second)
                    || !self.are_neighbors(first, second)?
                {
                    return Ok(());
                }
                // Either facet may have changed since it was queued.
                if let Some(radius) = radius
                    && self.convexity_test(first, second, radius)?.is_none()
                {
                    return Ok(());
                }
                self.merge_pair(first, second, request.kind)
            }
            MergeKind::Degenerate | MergeKind::Redundant => {
                self.degen_queue.push(request);
                Ok(())
            }
        }
    }

    /// Merges two neighbors, absorbing the new one into the old one, else the
    /// one with fewer vertices, else the newer one.
    fn merge_pair(&mut self, first: FacetKey, second: FacetKey, kind: MergeKind) -> Result<(), HullError> {
        let a = self.graph.facet(first)?;
        let b = self.graph.facet(second)?;
        let absorb_first = match (a.is_new(), b.is_new()) {
            (true, false) => true,
            (false, true) => false,
            _ => match a.vertices.len().cmp(&b.vertices.len()) {
                std::cmp::Ordering::Less => true,
                std::cmp::Ordering::Greater => false,
                std::cmp::Ordering::Equal => a.id > b.id,
            },
        };
        if absorb_first {
            self.merge_facets(first, second, kind)
        } else {
            self.merge_facets(second, first, kind)
        }
    }

    /// Neighbor whose plane is closest to all vertices of `key`.
    pub(crate) fn best_neighbor(&self, key: FacetKey) -> Result<FacetKey, HullError> {
        let facet = self.graph.facet(key)?;
        let mut best: Option<(FacetKey, f64)> = None;
        for &neighbor in &facet.neighbors {
            if !self.graph.is_live_facet(neighbor) {
                continue;
            }
            let plane = self.graph.facet(neighbor)?.hyperplane();
            let mut spread: f64 = 0.0;
            for &v in &facet.vertices {
                let dist = plane.distance(self.points.point(self.graph.vertex_point(v)?));
                spread = spread.max(dist.abs());
            }
            if best.is_none_or(|(_, s)| spread < s) {
                best = Some((neighbor, spread));
            }
        }
        best.map(|(k, _)| k).ok_or_else(|| {
            HullError::topology(format!("facet f{} has no neighbor to merge into", facet.id))
        })
    }

    // -------------------------------------------------------------------------
    // Degenerate and redundant facets
    // -------------------------------------------------------------------------

    /// Queues `key` if it has too few vertices or neighbors, or if a neighbor
    /// contains all of its vertices.
    pub(crate) fn check_degen_redundant(&mut self, key: FacetKey) -> Result<(), HullError> {
        if !self.graph.is_live_facet(key) {
            return Ok(());
        }
        let dim = self.dim();
        let facet = self.graph.facet(key)?;
        if facet.removal.is_some() {
            return Ok(());
        }
        let reason = if facet.neighbors.len() < dim || facet.vertices.len() < dim {
            Some((RemovalReason::Degenerate, None))
        } else {
            facet
                .neighbors
                .iter()
                .copied()
                .find(|&n| {
                    self.graph.facet(n).is_ok_and(|other| {
                        !other.is_visible()
                            && facet.vertices.iter().all(|v| other.vertices.contains(v))
                    })
                })
                .map(|n| (RemovalReason::Redundant, Some(n)))
        };
        if let Some((reason, target)) = reason {
            self.graph.facet_mut(key)?.removal = Some(reason);
            let kind = match reason {
                RemovalReason::Degenerate => MergeKind::Degenerate,
                RemovalReason::Redundant => MergeKind::Redundant,
            };
            self.degen_queue
                .push(MergeRequest::new(kind, key, target, 0.0));
        }
        Ok(())
    }

    /// Too few vertices or neighbors, or vertices that no longer span a
    /// hyperplane.
    fn is_degenerate(&self, key: FacetKey) -> Result<bool, HullError> {
        let dim = self.dim();
        let facet = self.graph.facet(key)?;
        if facet.neighbors.len() < dim || facet.vertices.len() < dim {
            return Ok(true);
        }
        let mut coords = Vec::with_capacity(facet.vertices.len());
        for &v in &facet.vertices {
            coords.push(self.points.point(self.graph.vertex_point(v)?));
        }
        Ok(Hyperplane::fit(&coords, &self.interior, self.precision.dist_round).is_err())
    }

    /// Merges every queued degenerate or redundant facet into a neighbor.
    pub(crate) fn process_degenerate(&mut self) -> Result<(), HullError> {
        while !self.degen_queue.is_empty() {
            let request = self.degen_queue.remove(0);
            let key = request.facet1;
            if !self.graph.is_live_facet(key) {
                continue;
            }
            self.graph.facet_mut(key)?.removal = None;
            let target = match request.kind {
                MergeKind::Redundant => {
                    let Some(target) = request.facet2.and_then(|f| self.resolve_facet(f)) else {
                        self.check_degen_redundant(key)?;
                        continue;
                    };
                    let facet = self.graph.facet(key)?;
                    let contained = target != key
                        && facet
                            .vertices
                            .iter()
                            .all(|v| self.graph.facet(target).is_ok_and(|t| t.vertices.contains(v)));
                    if !contained || !self.are_neighbors(key, target)? {
                        self.check_degen_redundant(key)?;
                        continue;
                    }
                    self.counters.redundant_merges += 1;
                    target
                }
                _ => {
                    if !self.is_degenerate(key)? {
                        continue;
                    }
                    self.counters.degenerate_merges += 1;
                    self.best_neighbor(key)?
                }
            };
            self.merge_facets(key, target, request.kind)?;
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Facet merge
    // -------------------------------------------------------------------------

    /// Merges `absorbed` into its neighbor `survivor`.
    pub(crate) fn merge_facets(
        &mut self,
        absorbed: FacetKey,
        survivor: FacetKey,
        kind: MergeKind,
    ) -> Result<(), HullError> {
        if absorbed == survivor {
            return Err(HullError::topology("cannot merge a facet into itself"));
        }
        self.graph.define_vertex_neighbors();
        let (absorbed_id, survivor_id) = (
            self.graph.facet(absorbed)?.id,
            self.graph.facet(survivor)?.id,
        );
        tracing::trace!("merge {kind:?}: f{absorbed_id} into f{survivor_id}");

        // Ridges: shared ones disappear, the others move to the survivor.
        for ridge_key in self.graph.facet(absorbed)?.ridges.clone() {
            let other = self.graph.ridge(ridge_key)?.other(absorbed);
            if other == Some(survivor) {
                self.graph.remove_ridge(ridge_key);
                continue;
            }
            self.graph
                .ridge_mut(ridge_key)?
                .replace_facet(absorbed, survivor);
            self.graph.facet_mut(survivor)?.ridges.push(ridge_key);
            if let Some(other) = other {
                let neighbor = self.graph.facet_mut(other)?;
                if !neighbor.replace_neighbor(absorbed, survivor) {
                    neighbor.add_neighbor(survivor);
                }
            }
        }

        let (absorbed_vertices, mut points, absorbed_max_outside) = {
            let facet = self.graph.facet_mut(absorbed)?;
            facet.ridges.clear();
            facet.neighbors.clear();
            facet.status = FacetStatus::Visible;
            facet.replace = Some(survivor);
            let mut points = std::mem::take(&mut facet.outside);
            points.append(&mut facet.coplanar);
            (facet.vertices.clone(), points, facet.max_outside)
        };
        self.visible.push(absorbed);

        // Vertices and the vertex neighbor index.
        let mut vertices: Vec<VertexKey> = self.graph.facet(survivor)?.vertices.to_vec();
        for &v in &absorbed_vertices {
            if !vertices.contains(&v) {
                vertices.push(v);
            }
            let vertex = self.graph.vertex_mut(v)?;
            vertex.neighbors.retain(|f| *f != absorbed);
            if !vertex.neighbors.contains(&survivor) {
                vertex.neighbors.push(survivor);
            }
        }
        self.graph.sort_vertices_desc(&mut vertices);
        {
            let facet = self.graph.facet_mut(survivor)?;
            facet.vertices = vertices.into_iter().collect();
            facet.simplicial = false;
            facet.max_outside = facet.max_outside.max(absorbed_max_outside);
            points.append(&mut facet.outside);
            points.append(&mut facet.coplanar);
            facet.furthest_dist = 0.0;
        }
        self.graph.rebuild_neighbors(survivor)?;
        self.remove_extra_vertices(survivor)?;
        self.refit_facet(survivor)?;
        self.mark_changed(survivor)?;

        let mut candidates = vec![survivor];
        candidates.extend(self.graph.facet(survivor)?.neighbors.iter().copied());
        self.partition_points(&points, &candidates)?;

        self.counters.facet_merges += 1;
        if kind.is_forced() {
            self.counters.forced_merges += 1;
        }

        self.check_degen_redundant(survivor)?;
        for neighbor in self.graph.facet(survivor)?.neighbors.clone() {
            self.check_degen_redundant(neighbor)?;
        }

        let remaining = self.graph.facet_count();
        if remaining <= self.dim() {
            return Err(HullError::precision(format!(
                "merging left only {remaining} facets; the input is nearly flat"
            )));
        }
        Ok(())
    }

    /// Drops vertices of `key` that lie on none of its ridges.
    fn remove_extra_vertices(&mut self, key: FacetKey) -> Result<(), HullError> {
        let facet = self.graph.facet(key)?;
        let mut on_ridges: FastHashSet<VertexKey> =
            fast_hash_set_with_capacity(facet.vertices.len());
        for &r in &facet.ridges {
            on_ridges.extend(self.graph.ridge(r)?.vertices.iter().copied());
        }
        let extra: Vec<VertexKey> = facet
            .vertices
            .iter()
            .copied()
            .filter(|v| !on_ridges.contains(v))
            .collect();

        for v in extra {
            self.graph.facet_mut(key)?.vertices.retain(|x| *x != v);
            self.graph.vertex_mut(v)?.neighbors.retain(|f| *f != key);
            let orphaned = !self
                .graph
                .vertex(v)?
                .neighbors
                .iter()
                .any(|&f| self.graph.is_live_facet(f));
            if orphaned {
                let vertex = self.graph.vertex_mut(v)?;
                vertex.status = VertexStatus::Deleted;
                vertex.neighbors.clear();
                self.deleted_vertices.push(v);
                tracing::trace!("vertex v{} left the hull during a merge", vertex.id);
            }
        }
        Ok(())
    }

    /// Refits the plane of `key` through its vertices and widens the outer
    /// plane bookkeeping; queues flipped or degenerate results.
    pub(crate) fn refit_facet(&mut self, key: FacetKey) -> Result<(), HullError> {
        let facet = self.graph.facet(key)?;
        let mut coords = Vec::with_capacity(facet.vertices.len());
        for &v in &facet.vertices {
            coords.push(self.points.point(self.graph.vertex_point(v)?));
        }
        let fitted = Hyperplane::fit(&coords, &self.interior, self.precision.dist_round);
        let Ok(fitted) = fitted else {
            self.graph.facet_mut(key)?.removal = Some(RemovalReason::Degenerate);
            self.degen_queue
                .push(MergeRequest::new(MergeKind::Degenerate, key, None, 0.0));
            return Ok(());
        };

        let (mut max_dist, mut min_dist) = (0.0_f64, 0.0_f64);
        for point in &coords {
            let dist = fitted.plane.distance(point);
            max_dist = max_dist.max(dist);
            min_dist = min_dist.min(dist);
        }
        let facet = self.graph.facet_mut(key)?;
        facet.plane = fitted.plane;
        facet.flipped = fitted.flipped;
        facet.max_outside = facet.max_outside.max(max_dist);
        self.max_outside = self.max_outside.max(max_dist);
        self.min_vertex = self.min_vertex.min(min_dist);
        if fitted.flipped {
            self.merge_queue
                .push(MergeRequest::new(MergeKind::Flipped, key, None, 0.0));
        }
        Ok(())
    }

    /// Marks a facet as changed in this step so its ridges are retested.
    fn mark_changed(&mut self, key: FacetKey) -> Result<(), HullError> {
        let facet = self.graph.facet_mut(key)?;
        facet.status = FacetStatus::NewThisStep;
        facet.invalidate_geometry();
        let ridges = facet.ridges.clone();
        for r in ridges {
            let ridge = self.graph.ridge_mut(r)?;
            ridge.tested = false;
            ridge.nonconvex = false;
        }
        if !self.new_facets.contains(&key) {
            self.new_facets.push(key);
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Vertex merge
    // -------------------------------------------------------------------------

    /// Renames vertex `old` to `new` everywhere and repairs the facets
    /// around it.
    pub(crate) fn merge_vertices(&mut self, old: VertexKey, new: VertexKey) -> Result<(), HullError> {
        self.graph.define_vertex_neighbors();
        let facets: Vec<FacetKey> = self
            .graph
            .vertex(old)?
            .neighbors
            .iter()
            .copied()
            .filter(|&f| self.graph.is_live_facet(f))
            .collect();
        let (old_id, new_id) = (self.graph.vertex(old)?.id, self.graph.vertex(new)?.id);
        tracing::debug!(
            "merging vertex v{old_id} into v{new_id} ({} facets)",
            facets.len()
        );

        let mut touched: FastHashSet<FacetKey> = fast_hash_set_with_capacity(facets.len() * 2);
        let mut ridges: Vec<RidgeKey> = Vec::new();
        for &f in &facets {
            touched.insert(f);
            for &r in &self.graph.facet(f)?.ridges {
                if !ridges.contains(&r) && self.graph.ridge(r)?.vertices.contains(&old) {
                    ridges.push(r);
                }
            }
        }

        for &f in &facets {
            let mut vertices: Vec<VertexKey> = self.graph.facet(f)?.vertices.to_vec();
            if vertices.contains(&new) {
                vertices.retain(|v| *v != old);
            } else {
                for v in &mut vertices {
                    if *v == old {
                        *v = new;
                    }
                }
            }
            self.graph.sort_vertices_desc(&mut vertices);
            let facet = self.graph.facet_mut(f)?;
            facet.vertices = vertices.into_iter().collect();
            facet.simplicial = false;
            let neighbors = &mut self.graph.vertex_mut(new)?.neighbors;
            if !neighbors.contains(&f) {
                neighbors.push(f);
            }
        }

        for r in ridges {
            let ridge = self.graph.ridge(r)?;
            if ridge.vertices.contains(&new) {
                touched.insert(ridge.top);
                touched.insert(ridge.bottom);
                self.graph.remove_ridge(r);
                continue;
            }
            let mut vertices: Vec<VertexKey> = ridge
                .vertices
                .iter()
                .map(|&v| if v == old { new } else { v })
                .collect();
            self.graph.sort_vertices_desc(&mut vertices);
            let ridge = self.graph.ridge_mut(r)?;
            ridge.vertices = vertices.into_iter().collect();
            ridge.tested = false;
        }

        self.remove_duplicate_ridges(new, &touched)?;

        let touched: Vec<FacetKey> = touched
            .into_iter()
            .filter(|&f| self.graph.is_live_facet(f))
            .collect();
        for &f in &touched {
            self.graph.rebuild_neighbors(f)?;
        }
        for &f in &touched {
            self.refit_facet(f)?;
            self.mark_changed(f)?;
            self.check_degen_redundant(f)?;
        }

        let vertex = self.graph.vertex_mut(old)?;
        vertex.status = VertexStatus::Deleted;
        vertex.neighbors.clear();
        self.deleted_vertices.push(old);
        self.counters.vertex_merges += 1;
        Ok(())
    }

    /// Renames away every vertex that lies in fewer than `D` facets.
    ///
    /// Such a vertex sits inside an edge or face shared by its facets. It is
    /// renamed to the nearest vertex of that face it shares a ridge with,
    /// which collapses the split ridges into one. Its point is then placed
    /// again as a coplanar point.
    pub(crate) fn reduce_vertices(&mut self) -> Result<(), HullError> {
        self.graph.define_vertex_neighbors();
        let dim = self.dim();
        loop {
            let redundant: Vec<VertexKey> = self
                .graph
                .live_vertices()
                .filter(|(_, v)| self.live_facet_count(&v.neighbors) < dim)
                .map(|(key, _)| key)
                .collect();
            let mut reduced = 0_usize;
            for old in redundant {
                let vertex = self.graph.vertex(old)?;
                if vertex.is_deleted() || self.live_facet_count(&vertex.neighbors) >= dim {
                    continue;
                }
                if self.live_facet_count(&vertex.neighbors) == 0 {
                    let vertex = self.graph.vertex_mut(old)?;
                    vertex.status = VertexStatus::Deleted;
                    vertex.neighbors.clear();
                    self.deleted_vertices.push(old);
                    reduced += 1;
                    continue;
                }
                let Some(new) = self.shared_vertex(old)? else {
                    tracing::debug!(
                        "vertex v{} lies in fewer than {dim} facets but shares no face vertex",
                        self.graph.vertex(old)?.id
                    );
                    continue;
                };
                self.merge_vertices(old, new)?;
                reduced += 1;
            }
            if reduced == 0 {
                return Ok(());
            }
            tracing::debug!("{reduced} redundant vertices renamed");
            self.merge_all(None)?;
            self.attach_new_facets()?;
        }
    }

    fn live_facet_count(&self, facets: &[FacetKey]) -> usize {
        facets
            .iter()
            .filter(|&&f| self.graph.is_live_facet(f))
            .count()
    }

    /// Nearest vertex that shares a ridge with `vertex` and lies in every
    /// facet of `vertex`.
    fn shared_vertex(&self, vertex: VertexKey) -> Result<Option<VertexKey>, HullError> {
        let facets: Vec<FacetKey> = self
            .graph
            .vertex(vertex)?
            .neighbors
            .iter()
            .copied()
            .filter(|&f| self.graph.is_live_facet(f))
            .collect();
        let Some((&first, rest)) = facets.split_first() else {
            return Ok(None);
        };
        let coords = self.points.point(self.graph.vertex_point(vertex)?);
        let mut best: Option<(VertexKey, f64)> = None;
        for &r in &self.graph.facet(first)?.ridges {
            let ridge = self.graph.ridge(r)?;
            if !ridge.vertices.contains(&vertex) {
                continue;
            }
            for &candidate in &ridge.vertices {
                if candidate == vertex {
                    continue;
                }
                let mut shared = true;
                for &f in rest {
                    shared &= self.graph.facet(f)?.vertices.contains(&candidate);
                }
                if !shared {
                    continue;
                }
                let dist: f64 = coords
                    .iter()
                    .zip(self.points.point(self.graph.vertex_point(candidate)?))
                    .map(|(x, y)| (x - y) * (x - y))
                    .sum();
                if best.is_none_or(|(_, d)| dist < d) {
                    best = Some((candidate, dist));
                }
            }
        }
        Ok(best.map(|(key, _)| key))
    }

    /// After a vertex rename, drops ridges repeated between the same two
    /// facets and queues merges for ridges repeated between different pairs.
    fn remove_duplicate_ridges(
        &mut self,
        renamed: VertexKey,
        facets: &FastHashSet<FacetKey>,
    ) -> Result<(), HullError> {
        let mut seen: FastHashMap<VertexBuffer<VertexKey>, RidgeKey> =
            fast_hash_map_with_capacity(facets.len() * 4);
        let mut ridges: Vec<RidgeKey> = Vec::new();
        for &f in facets {
            if let Ok(facet) = self.graph.facet(f) {
                for &r in &facet.ridges {
                    if !ridges.contains(&r) {
                        ridges.push(r);
                    }
                }
            }
        }
        for r in ridges {
            let Ok(ridge) = self.graph.ridge(r) else {
                continue;
            };
            if !ridge.vertices.contains(&renamed) {
                continue;
            }
            let Some(&first) = seen.get(&ridge.vertices) else {
                seen.insert(ridge.vertices.clone(), r);
                continue;
            };
            let (top, bottom) = (ridge.top, ridge.bottom);
            let existing = self.graph.ridge(first)?;
            if existing.is_incident(top) && existing.is_incident(bottom) {
                self.graph.remove_ridge(r);
            } else {
                self.graph.ridge_mut(r)?.dupridge = true;
                self.graph.ridge_mut(first)?.dupridge = true;
                self.merge_queue.push(MergeRequest::new(
                    MergeKind::Dupridge,
                    top,
                    Some(bottom),
                    0.0,
                ));
            }
        }
        Ok(())
    }
}
