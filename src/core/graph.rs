//! The facet / ridge / vertex arena.
//!
//! [`HullGraph`] owns every facet, ridge and vertex of one computation in
//! slotmap arenas. Entities refer to each other by key only. Deletion is
//! two-phase: facets are first marked [`FacetStatus::Visible`] and vertices
//! [`VertexStatus::Deleted`], then removed together by the builder once the
//! replacement structure is in place. The facet and vertex lists keep creation
//! order and are compacted after each batch.

use thiserror::Error;

use super::collections::{StorageMap, VertexBuffer};
use super::facet::{Facet, FacetKey, FacetStatus};
use super::ridge::{Ridge, RidgeKey};
use super::vertex::{Vertex, VertexKey, VertexStatus};
use crate::geometry::hyperplane::Hyperplane;

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Lookups and consistency failures in the arena.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    /// A facet key does not resolve.
    #[error("Facet {key:?} is not in the hull graph")]
    MissingFacet {
        /// The stale key.
        key: FacetKey,
    },
    /// A ridge key does not resolve.
    #[error("Ridge {key:?} is not in the hull graph")]
    MissingRidge {
        /// The stale key.
        key: RidgeKey,
    },
    /// A vertex key does not resolve.
    #[error("Vertex {key:?} is not in the hull graph")]
    MissingVertex {
        /// The stale key.
        key: VertexKey,
    },
}

impl From<GraphError> for super::error::HullError {
    fn from(source: GraphError) -> Self {
        Self::topology(source.to_string())
    }
}

// =============================================================================
// HULL GRAPH
// =============================================================================

/// Arena of facets, ridges and vertices for a `dim`-dimensional hull.
#[derive(Clone, Debug)]
pub struct HullGraph {
    dim: usize,
    pub(crate) facets: StorageMap<FacetKey, Facet>,
    pub(crate) ridges: StorageMap<RidgeKey, Ridge>,
    pub(crate) vertices: StorageMap<VertexKey, Vertex>,
    /// Facets in creation order; may hold removed keys until compaction.
    pub(crate) facet_list: Vec<FacetKey>,
    /// Vertices in creation order; may hold removed keys until compaction.
    pub(crate) vertex_list: Vec<VertexKey>,
    next_facet_id: u32,
    next_ridge_id: u32,
    next_vertex_id: u32,
    visit_id: u64,
    vertex_neighbors_defined: bool,
}

impl HullGraph {
    /// Creates an empty graph for hulls of dimension `dim`.
    #[must_use]
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            facets: StorageMap::with_key(),
            ridges: StorageMap::with_key(),
            vertices: StorageMap::with_key(),
            facet_list: Vec::new(),
            vertex_list: Vec::new(),
            next_facet_id: 0,
            next_ridge_id: 0,
            next_vertex_id: 0,
            visit_id: 0,
            vertex_neighbors_defined: false,
        }
    }

    /// Hull dimension.
    #[must_use]
    pub const fn dim(&self) -> usize {
        self.dim
    }

    /// Releases every entity and resets the id counters.
    pub fn clear(&mut self) {
        *self = Self::new(self.dim);
    }

    // -------------------------------------------------------------------------
    // Lookups
    // -------------------------------------------------------------------------

    /// Facet behind `key`.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::MissingFacet`] for a removed key.
    pub fn facet(&self, key: FacetKey) -> Result<&Facet, GraphError> {
        self.facets.get(key).ok_or(GraphError::MissingFacet { key })
    }

    pub(crate) fn facet_mut(&mut self, key: FacetKey) -> Result<&mut Facet, GraphError> {
        self.facets
            .get_mut(key)
            .ok_or(GraphError::MissingFacet { key })
    }

    /// Ridge behind `key`.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::MissingRidge`] for a removed key.
    pub fn ridge(&self, key: RidgeKey) -> Result<&Ridge, GraphError> {
        self.ridges.get(key).ok_or(GraphError::MissingRidge { key })
    }

    pub(crate) fn ridge_mut(&mut self, key: RidgeKey) -> Result<&mut Ridge, GraphError> {
        self.ridges
            .get_mut(key)
            .ok_or(GraphError::MissingRidge { key })
    }

    /// Vertex behind `key`.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::MissingVertex`] for a removed key.
    pub fn vertex(&self, key: VertexKey) -> Result<&Vertex, GraphError> {
        self.vertices
            .get(key)
            .ok_or(GraphError::MissingVertex { key })
    }

    pub(crate) fn vertex_mut(&mut self, key: VertexKey) -> Result<&mut Vertex, GraphError> {
        self.vertices
            .get_mut(key)
            .ok_or(GraphError::MissingVertex { key })
    }

    /// Whether `key` is a facet that is not scheduled for deletion.
    #[must_use]
    pub fn is_live_facet(&self, key: FacetKey) -> bool {
        self.facets.get(key).is_some_and(|f| !f.is_visible())
    }

    /// Live facets in creation order.
    pub fn live_facets(&self) -> impl Iterator<Item = (FacetKey, &Facet)> + '_ {
        self.facet_list
            .iter()
            .filter_map(|&key| self.facets.get(key).map(|facet| (key, facet)))
            .filter(|(_, facet)| !facet.is_visible())
    }

    /// Active vertices in creation order.
    pub fn live_vertices(&self) -> impl Iterator<Item = (VertexKey, &Vertex)> + '_ {
        self.vertex_list
            .iter()
            .filter_map(|&key| self.vertices.get(key).map(|vertex| (key, vertex)))
            .filter(|(_, vertex)| !vertex.is_deleted())
    }

    /// Number of live facets.
    #[must_use]
    pub fn facet_count(&self) -> usize {
        self.live_facets().count()
    }

    /// Number of active vertices.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.live_vertices().count()
    }

    /// Number of ridges.
    #[must_use]
    pub fn ridge_count(&self) -> usize {
        self.ridges.len()
    }

    /// Point index of a vertex.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::MissingVertex`] for a removed key.
    pub fn vertex_point(&self, key: VertexKey) -> Result<usize, GraphError> {
        self.vertex(key).map(|v| v.point)
    }

    /// Whether vertex neighbor lists are defined and maintained.
    #[must_use]
    pub const fn has_vertex_neighbors(&self) -> bool {
        self.vertex_neighbors_defined
    }

    /// Starts a new traversal and returns its visit id.
    pub(crate) const fn next_visit(&mut self) -> u64 {
        self.visit_id += 1;
        self.visit_id
    }

    // -------------------------------------------------------------------------
    // Creation
    // -------------------------------------------------------------------------

    /// Adds a vertex for `point`.
    pub(crate) fn add_vertex(&mut self, point: usize) -> VertexKey {
        let id = self.next_vertex_id;
        self.next_vertex_id += 1;
        let key = self.vertices.insert(Vertex::new(point, id));
        self.vertex_list.push(key);
        key
    }

    /// Adds a facet with `vertices` (sorted by decreasing id) and records it
    /// in the vertex neighbor lists when those are maintained.
    pub(crate) fn add_facet(
        &mut self,
        vertices: VertexBuffer<VertexKey>,
        plane: Hyperplane,
        status: FacetStatus,
    ) -> FacetKey {
        let id = self.next_facet_id;
        self.next_facet_id += 1;
        let mut facet = Facet::new(id, vertices, plane);
        facet.status = status;
        let key = self.facets.insert(facet);
        self.facet_list.push(key);
        if self.vertex_neighbors_defined {
            let vertices = self.facets[key].vertices.clone();
            for v in vertices {
                if let Some(vertex) = self.vertices.get_mut(v) {
                    vertex.neighbors.push(key);
                }
            }
        }
        key
    }

    /// Adds a ridge between `top` and `bottom` and appends it to both.
    pub(crate) fn add_ridge(
        &mut self,
        vertices: VertexBuffer<VertexKey>,
        top: FacetKey,
        bottom: FacetKey,
    ) -> Result<RidgeKey, GraphError> {
        let id = self.next_ridge_id;
        self.next_ridge_id += 1;
        let key = self.ridges.insert(Ridge::new(id, vertices, top, bottom));
        self.facet_mut(top)?.ridges.push(key);
        self.facet_mut(bottom)?.ridges.push(key);
        Ok(key)
    }

    // -------------------------------------------------------------------------
    // Removal
    // -------------------------------------------------------------------------

    /// Removes a ridge and detaches it from whichever incident facets remain.
    pub(crate) fn remove_ridge(&mut self, key: RidgeKey) -> Option<Ridge> {
        let ridge = self.ridges.remove(key)?;
        for facet in [ridge.top, ridge.bottom] {
            if let Some(f) = self.facets.get_mut(facet) {
                f.ridges.retain(|r| *r != key);
            }
        }
        Some(ridge)
    }

    /// Physically removes a facet and its entries in vertex neighbor lists.
    /// Ridges still referencing it are removed as well.
    pub(crate) fn remove_facet(&mut self, key: FacetKey) -> Option<Facet> {
        let ridges = self.facets.get(key)?.ridges.clone();
        for ridge in ridges {
            self.remove_ridge(ridge);
        }
        let facet = self.facets.remove(key)?;
        if self.vertex_neighbors_defined {
            for &v in &facet.vertices {
                if let Some(vertex) = self.vertices.get_mut(v) {
                    vertex.neighbors.retain(|f| *f != key);
                }
            }
        }
        Some(facet)
    }

    /// Physically removes a vertex.
    pub(crate) fn remove_vertex(&mut self, key: VertexKey) -> Option<Vertex> {
        self.vertices.remove(key)
    }

    /// Drops removed keys from the facet and vertex lists.
    pub(crate) fn compact_lists(&mut self) {
        let facets = &self.facets;
        self.facet_list.retain(|&key| facets.contains_key(key));
        let vertices = &self.vertices;
        self.vertex_list.retain(|&key| vertices.contains_key(key));
    }

    // -------------------------------------------------------------------------
    // Vertex ordering and neighbors
    // -------------------------------------------------------------------------

    /// Sorts vertex keys by decreasing id; removed keys sort last.
    pub(crate) fn sort_vertices_desc(&self, vertices: &mut [VertexKey]) {
        vertices.sort_by_key(|&v| {
            std::cmp::Reverse(self.vertices.get(v).map_or(0, |vertex| u64::from(vertex.id) + 1))
        });
    }

    /// Builds vertex neighbor lists from the live facets; afterwards every
    /// facet creation, removal and merge keeps them current.
    pub(crate) fn define_vertex_neighbors(&mut self) {
        if self.vertex_neighbors_defined {
            return;
        }
        for vertex in self.vertices.values_mut() {
            vertex.neighbors.clear();
        }
        for &key in &self.facet_list {
            let Some(facet) = self.facets.get(key) else {
                continue;
            };
            for &v in &facet.vertices {
                if let Some(vertex) = self.vertices.get_mut(v) {
                    vertex.neighbors.push(key);
                }
            }
        }
        self.vertex_neighbors_defined = true;
    }

    /// Recomputes a facet's neighbor set from its ridges, keeping the existing
    /// order of surviving neighbors.
    pub(crate) fn rebuild_neighbors(&mut self, key: FacetKey) -> Result<(), GraphError> {
        let ridges = self.facet(key)?.ridges.clone();
        let mut across = Vec::with_capacity(ridges.len());
        for r in ridges {
            if let Some(other) = self.ridge(r)?.other(key)
                && !across.contains(&other)
            {
                across.push(other);
            }
        }
        let facet = self.facet_mut(key)?;
        let mut neighbors: Vec<FacetKey> = facet
            .neighbors
            .iter()
            .copied()
            .filter(|n| across.contains(n))
            .collect();
        for n in across {
            if !neighbors.contains(&n) {
                neighbors.push(n);
            }
        }
        if neighbors.len() != facet.neighbors.len() || neighbors.len() != facet.ridges.len() {
            facet.simplicial = false;
        }
        facet.neighbors = neighbors.into_iter().collect();
        Ok(())
    }

    /// Marks every live facet and vertex as part of the current structure:
    /// statuses return to `Active` and step flags are cleared.
    pub(crate) fn settle_step(&mut self) {
        for facet in self.facets.values_mut() {
            if facet.status == FacetStatus::NewThisStep {
                facet.status = FacetStatus::Active;
            }
        }
        for vertex in self.vertices.values_mut() {
            vertex.new_this_step = false;
        }
    }

    /// Whether some vertex is marked deleted but not yet removed.
    #[must_use]
    pub fn has_pending_vertex_deletions(&self) -> bool {
        self.vertices
            .values()
            .any(|v| v.status == VertexStatus::Deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plane() -> Hyperplane {
        Hyperplane::new(vec![0.0, 1.0], 0.0).unwrap()
    }

    fn buffer(keys: &[VertexKey]) -> VertexBuffer<VertexKey> {
        keys.iter().copied().collect()
    }

    #[test]
    fn test_add_and_remove_entities() {
        let mut graph = HullGraph::new(2);
        let a = graph.add_vertex(0);
        let b = graph.add_vertex(1);
        let c = graph.add_vertex(2);

        let f = graph.add_facet(buffer(&[b, a]), plane(), FacetStatus::Active);
        let g = graph.add_facet(buffer(&[c, b]), plane(), FacetStatus::Active);
        let r = graph.add_ridge(buffer(&[b]), f, g).unwrap();

        assert_eq!(graph.facet_count(), 2);
        assert_eq!(graph.vertex_count(), 3);
        assert_eq!(graph.ridge(r).unwrap().other(f), Some(g));
        assert_eq!(graph.facet(f).unwrap().ridges(), &[r]);

        graph.remove_facet(f);
        assert!(graph.ridge(r).is_err());
        assert!(graph.facet(g).unwrap().ridges().is_empty());
        assert_eq!(graph.facet_list.len(), 2);
        graph.compact_lists();
        assert_eq!(graph.facet_list, vec![g]);
    }

    #[test]
    fn test_sort_vertices_desc_by_id() {
        let mut graph = HullGraph::new(3);
        let keys: Vec<VertexKey> = (0..4).map(|p| graph.add_vertex(p)).collect();
        let mut shuffled = vec![keys[1], keys[3], keys[0], keys[2]];
        graph.sort_vertices_desc(&mut shuffled);
        assert_eq!(shuffled, vec![keys[3], keys[2], keys[1], keys[0]]);
    }

    #[test]
    fn test_vertex_neighbors_follow_facets_once_defined() {
        let mut graph = HullGraph::new(2);
        let a = graph.add_vertex(0);
        let b = graph.add_vertex(1);
        let f = graph.add_facet(buffer(&[b, a]), plane(), FacetStatus::Active);
        assert!(graph.vertex(a).unwrap().neighbors().is_empty());

        graph.define_vertex_neighbors();
        assert_eq!(graph.vertex(a).unwrap().neighbors(), &[f]);

        let g = graph.add_facet(buffer(&[b]), plane(), FacetStatus::Active);
        assert_eq!(graph.vertex(b).unwrap().neighbors(), &[f, g]);

        graph.remove_facet(f);
        assert!(graph.vertex(a).unwrap().neighbors().is_empty());
        assert_eq!(graph.vertex(b).unwrap().neighbors(), &[g]);
    }

    #[test]
    fn test_rebuild_neighbors_from_ridges() {
        let mut graph = HullGraph::new(2);
        let v: Vec<VertexKey> = (0..3).map(|p| graph.add_vertex(p)).collect();
        let f = graph.add_facet(buffer(&[v[1], v[0]]), plane(), FacetStatus::Active);
        let g = graph.add_facet(buffer(&[v[2], v[1]]), plane(), FacetStatus::Active);
        let h = graph.add_facet(buffer(&[v[2], v[0]]), plane(), FacetStatus::Active);
        graph.add_ridge(buffer(&[v[1]]), f, g).unwrap();
        graph.facet_mut(f).unwrap().neighbors.extend([h, g]);

        graph.rebuild_neighbors(f).unwrap();
        assert_eq!(graph.facet(f).unwrap().neighbors(), &[g]);
        assert!(!graph.facet(f).unwrap().is_simplicial());
    }

    #[test]
    fn test_missing_keys_report_errors() {
        let mut graph = HullGraph::new(2);
        let a = graph.add_vertex(0);
        graph.remove_vertex(a);
        assert!(matches!(
            graph.vertex(a),
            Err(GraphError::MissingVertex { .. })
        ));
        assert!(graph.vertex_point(a).is_err());
    }

    #[test]
    fn test_pending_vertex_deletions_until_removed() {
        let mut graph = HullGraph::new(2);
        let a = graph.add_vertex(0);
        assert!(!graph.has_pending_vertex_deletions());
        graph.vertex_mut(a).unwrap().status = VertexStatus::Deleted;
        assert!(graph.has_pending_vertex_deletions());
        graph.remove_vertex(a);
        assert!(!graph.has_pending_vertex_deletions());
    }

    #[test]
    fn test_visit_ids_increase() {
        let mut graph = HullGraph::new(3);
        let first = graph.next_visit();
        let second = graph.next_visit();
        assert!(second > first);
        graph.clear();
        assert_eq!(graph.facet_count(), 0);
    }
}
