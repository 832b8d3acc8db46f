//! Hull vertices.
//!
//! A vertex references an input point by index and carries a monotonically
//! increasing id. Facet and ridge vertex lists are kept sorted by decreasing
//! id, so the apex of a cone (the newest vertex) always comes first.

use slotmap::new_key_type;

use super::collections::SmallBuffer;
use super::facet::FacetKey;

new_key_type! {
    /// Key of a vertex in the hull graph arena.
    pub struct VertexKey;
}

/// Lifecycle of a vertex.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum VertexStatus {
    /// Part of the current hull boundary.
    #[default]
    Active,
    /// Absorbed by a merge or left inside the hull; removed in the next batch.
    Deleted,
}

/// A corner of the hull.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Vertex {
    pub(crate) point: usize,
    pub(crate) id: u32,
    pub(crate) status: VertexStatus,
    pub(crate) new_this_step: bool,
    pub(crate) partitioned: bool,
    /// Incident facets; only meaningful once the graph has defined vertex
    /// neighbors.
    pub(crate) neighbors: SmallBuffer<FacetKey, 8>,
}

impl Vertex {
    pub(crate) fn new(point: usize, id: u32) -> Self {
        Self {
            point,
            id,
            status: VertexStatus::Active,
            new_this_step: false,
            partitioned: false,
            neighbors: SmallBuffer::new(),
        }
    }

    /// Index of the point this vertex stands for.
    #[must_use]
    pub const fn point_index(&self) -> usize {
        self.point
    }

    /// Creation-order id.
    #[must_use]
    pub const fn id(&self) -> u32 {
        self.id
    }

    /// Current lifecycle status.
    #[must_use]
    pub const fn status(&self) -> VertexStatus {
        self.status
    }

    /// Whether the vertex has been absorbed or left inside the hull.
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.status == VertexStatus::Deleted
    }

    /// Facets incident to this vertex, if vertex neighbors are defined.
    #[must_use]
    pub fn neighbors(&self) -> &[FacetKey] {
        &self.neighbors
    }
}
