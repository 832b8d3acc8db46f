//! Visible region and horizon of a new point.
//!
//! Starting from a facet the point is outside of, a depth-first walk over
//! ridges collects every connected facet the point is above by more than
//! `min_visible`. Ridges between a visible and a non-visible facet form the
//! horizon. A horizon is pinched when one of its `(D-3)`-faces (a subridge) is
//! shared by more than two horizon ridges; the cone over such a horizon would
//! have duplicate ridges.

use crate::core::collections::{
    FastHashMap, FastHashSet, VertexBuffer, fast_hash_map_with_capacity,
    fast_hash_set_with_capacity,
};
use crate::core::context::HullContext;
use crate::core::error::HullError;
use crate::core::facet::FacetKey;
use crate::core::ridge::RidgeKey;
use crate::core::vertex::VertexKey;

/// A ridge between a visible facet and a facet of the remaining hull.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct HorizonRidge {
    pub(crate) ridge: RidgeKey,
    pub(crate) visible: FacetKey,
    pub(crate) horizon: FacetKey,
}

/// A subridge shared by more than two horizon ridges.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Pinch {
    pub(crate) subridge: VertexBuffer<VertexKey>,
    /// Horizon ridges through the subridge.
    pub(crate) ridges: Vec<HorizonRidge>,
}

/// Result of a horizon search.
#[derive(Clone, Debug, Default)]
pub(crate) struct Horizon {
    pub(crate) visible: Vec<FacetKey>,
    pub(crate) ridges: Vec<HorizonRidge>,
    /// Horizon facets within `max_coplanar` of the point.
    pub(crate) coplanar: Vec<FacetKey>,
    /// Vertices of visible facets that are not on the horizon.
    pub(crate) interior_vertices: Vec<VertexKey>,
    pub(crate) pinch: Option<Pinch>,
}

/// Subridges of a ridge: its vertex list with one vertex left out.
pub(crate) fn subridges(
    vertices: &[VertexKey],
) -> impl Iterator<Item = (usize, VertexBuffer<VertexKey>)> + '_ {
    (0..vertices.len()).map(move |skip| {
        let sub = vertices
            .iter()
            .enumerate()
            .filter(|&(i, _)| i != skip)
            .map(|(_, &v)| v)
            .collect();
        (skip, sub)
    })
}

impl HullContext {
    /// Collects the facets visible from `point`, starting at `start`.
    ///
    /// Facets in `forced` count as visible regardless of distance. Nothing in
    /// the graph changes except visit ids.
    pub(crate) fn find_horizon(
        &mut self,
        point: usize,
        start: FacetKey,
        forced: &FastHashSet<FacetKey>,
    ) -> Result<Horizon, HullError> {
        let visit = self.graph.next_visit();
        let coords = self.points.point(point);
        let min_visible = self.precision.min_visible;
        let max_coplanar = self.precision.max_coplanar;

        let mut horizon = Horizon::default();
        let mut visible: FastHashSet<FacetKey> = fast_hash_set_with_capacity(16);
        let mut hidden: FastHashSet<FacetKey> = fast_hash_set_with_capacity(16);
        let mut stack = vec![start];
        visible.insert(start);
        self.graph.facet_mut(start)?.visit_id = visit;

        while let Some(current) = stack.pop() {
            horizon.visible.push(current);
            let ridges = self.graph.facet(current)?.ridges.clone();
            for ridge_key in ridges {
                let Some(other) = self.graph.ridge(ridge_key)?.other(current) else {
                    continue;
                };
                if visible.contains(&other) {
                    continue;
                }
                if !hidden.contains(&other) {
                    let neighbor = self.graph.facet_mut(other)?;
                    neighbor.visit_id = visit;
                    let dist = neighbor.hyperplane().distance(coords);
                    if dist > min_visible || forced.contains(&other) {
                        visible.insert(other);
                        stack.push(other);
                        continue;
                    }
                    hidden.insert(other);
                    if dist >= -max_coplanar {
                        horizon.coplanar.push(other);
                    }
                }
                horizon.ridges.push(HorizonRidge {
                    ridge: ridge_key,
                    visible: current,
                    horizon: other,
                });
            }
        }

        let mut on_horizon: FastHashSet<VertexKey> =
            fast_hash_set_with_capacity(horizon.ridges.len() * self.dim());
        for hr in &horizon.ridges {
            on_horizon.extend(self.graph.ridge(hr.ridge)?.vertices.iter().copied());
        }
        let mut interior: FastHashSet<VertexKey> = fast_hash_set_with_capacity(8);
        for &facet in &horizon.visible {
            for &v in self.graph.facet(facet)?.vertices() {
                if !on_horizon.contains(&v) && interior.insert(v) {
                    horizon.interior_vertices.push(v);
                }
            }
        }

        horizon.pinch = self.find_pinch(&horizon.ridges)?;
        tracing::trace!(
            "horizon of point {point}: {} visible, {} ridges, {} interior vertices",
            horizon.visible.len(),
            horizon.ridges.len(),
            horizon.interior_vertices.len()
        );
        Ok(horizon)
    }

    /// First subridge shared by more than two horizon ridges.
    fn find_pinch(&self, ridges: &[HorizonRidge]) -> Result<Option<Pinch>, HullError> {
        let mut counts: FastHashMap<VertexBuffer<VertexKey>, Vec<HorizonRidge>> =
            fast_hash_map_with_capacity(ridges.len() * self.dim());
        for hr in ridges {
            let vertices = &self.graph.ridge(hr.ridge)?.vertices;
            for (_, sub) in subridges(vertices) {
                counts.entry(sub).or_default().push(*hr);
            }
        }
        Ok(counts
            .into_iter()
            .filter(|(_, through)| through.len() > 2)
            .min_by_key(|(_, through)| through.len())
            .map(|(subridge, ridges)| Pinch { subridge, ridges }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::options::HullOptions;
    use crate::core::points::PointSet;

    #[test]
    fn test_subridges_leave_out_each_vertex() {
        let mut keys = slotmap::SlotMap::<VertexKey, ()>::with_key();
        let (a, b, c) = (keys.insert(()), keys.insert(()), keys.insert(()));
        let subs: Vec<_> = subridges(&[a, b, c]).collect();
        assert_eq!(subs.len(), 3);
        assert_eq!(subs[0].1.as_slice(), &[b, c]);
        assert_eq!(subs[2].1.as_slice(), &[a, b]);
    }

    #[test]
    fn test_horizon_of_point_beyond_one_facet() {
        let points = PointSet::from_rows(&[
            [0.0, 0.0, 0.0],
            [2.0, 0.0, 0.0],
            [0.0, 2.0, 0.0],
            [0.0, 0.0, 2.0],
            [2.0, 2.0, 2.0],
        ])
        .unwrap();
        let mut ctx = HullContext::new(points, HullOptions::default()).unwrap();
        ctx.build_initial_simplex().unwrap();
        let (point, start) = ctx.next_furthest().unwrap().unwrap();
        let horizon = ctx
            .find_horizon(point, start, &FastHashSet::default())
            .unwrap();

        assert!(horizon.visible.contains(&start));
        assert!(horizon.pinch.is_none());
        // Every horizon ridge borders a visible and a hidden facet
        for hr in &horizon.ridges {
            assert!(horizon.visible.contains(&hr.visible));
            assert!(!horizon.visible.contains(&hr.horizon));
        }
        // Triangulated disk without interior vertices
        assert!(horizon.interior_vertices.is_empty());
        assert_eq!(horizon.ridges.len(), horizon.visible.len() + 2);
    }
}
