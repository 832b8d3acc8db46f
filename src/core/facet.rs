//! Facets: the `(D-1)`-dimensional faces of the hull.
//!
//! A simplicial facet has exactly `D` vertices and `D` neighbors with
//! `neighbors[k]` opposite `vertices[k]`. Merging makes a facet
//! non-simplicial; its neighbor list is then an unordered set and it may share
//! several ridges with one neighbor.

use slotmap::new_key_type;

use super::collections::{SmallBuffer, VertexBuffer};
use super::ridge::RidgeKey;
use super::vertex::VertexKey;
use crate::geometry::hyperplane::Hyperplane;

new_key_type! {
    /// Key of a facet in the hull graph arena.
    pub struct FacetKey;
}

/// Lifecycle of a facet.
///
/// `NewThisStep -> Active` at the end of an incorporation step;
/// `Active | NewThisStep -> Visible` when a point sees the facet or a merge
/// absorbs it. Visible facets are deleted in a batch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FacetStatus {
    /// Part of the hull.
    #[default]
    Active,
    /// Built (or grown by a merge) during the current step.
    NewThisStep,
    /// Scheduled for deletion.
    Visible,
}

/// Why a facet is queued for removal by merging into a neighbor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RemovalReason {
    /// Fewer than `D` vertices or neighbors.
    Degenerate,
    /// Its vertices are a subset of a neighbor's.
    Redundant,
}

/// A face of the hull.
#[derive(Clone, Debug, PartialEq)]
pub struct Facet {
    pub(crate) id: u32,
    pub(crate) plane: Hyperplane,
    pub(crate) centrum: Option<Vec<f64>>,
    /// Largest distance of a vertex or coplanar point above the plane.
    pub(crate) max_outside: f64,
    /// Distance of the furthest outside point.
    pub(crate) furthest_dist: f64,
    pub(crate) vertices: VertexBuffer<VertexKey>,
    pub(crate) neighbors: SmallBuffer<FacetKey, 8>,
    pub(crate) ridges: SmallBuffer<RidgeKey, 8>,
    pub(crate) outside: Vec<usize>,
    pub(crate) coplanar: Vec<usize>,
    pub(crate) status: FacetStatus,
    pub(crate) removal: Option<RemovalReason>,
    pub(crate) simplicial: bool,
    pub(crate) flipped: bool,
    /// All ridges have been tested for convexity since the last change.
    pub(crate) tested: bool,
    pub(crate) good: bool,
    pub(crate) upper_delaunay: bool,
    /// Horizon facet within `max_coplanar` of the apex of the last cone.
    pub(crate) coplanar_horizon: bool,
    pub(crate) dupridge: bool,
    pub(crate) visit_id: u64,
    /// Facet that absorbed this one, while it waits for deletion.
    pub(crate) replace: Option<FacetKey>,
}

impl Facet {
    pub(crate) fn new(id: u32, vertices: VertexBuffer<VertexKey>, plane: Hyperplane) -> Self {
        Self {
            id,
            plane,
            centrum: None,
            max_outside: 0.0,
            furthest_dist: 0.0,
            vertices,
            neighbors: SmallBuffer::new(),
            ridges: SmallBuffer::new(),
            outside: Vec::new(),
            coplanar: Vec::new(),
            status: FacetStatus::Active,
            removal: None,
            simplicial: true,
            flipped: false,
            tested: false,
            good: true,
            upper_delaunay: false,
            coplanar_horizon: false,
            dupridge: false,
            visit_id: 0,
            replace: None,
        }
    }

    /// Creation-order id.
    #[must_use]
    pub const fn id(&self) -> u32 {
        self.id
    }

    /// Oriented hyperplane; the hull interior lies below it.
    #[must_use]
    pub const fn hyperplane(&self) -> &Hyperplane {
        &self.plane
    }

    /// Vertices, sorted by decreasing id.
    #[must_use]
    pub fn vertices(&self) -> &[VertexKey] {
        &self.vertices
    }

    /// Neighboring facets. For a simplicial facet, `neighbors()[k]` is
    /// opposite `vertices()[k]`.
    #[must_use]
    pub fn neighbors(&self) -> &[FacetKey] {
        &self.neighbors
    }

    /// Ridges bounding the facet.
    #[must_use]
    pub fn ridges(&self) -> &[RidgeKey] {
        &self.ridges
    }

    /// Points currently outside this facet.
    #[must_use]
    pub fn outside_points(&self) -> &[usize] {
        &self.outside
    }

    /// Kept coplanar (and, with `keep_inside`, interior) points.
    #[must_use]
    pub fn coplanar_points(&self) -> &[usize] {
        &self.coplanar
    }

    /// Lifecycle status.
    #[must_use]
    pub const fn status(&self) -> FacetStatus {
        self.status
    }

    /// Whether the facet is scheduled for deletion.
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.status == FacetStatus::Visible
    }

    /// Whether the facet was built or grown during the current step.
    #[must_use]
    pub fn is_new(&self) -> bool {
        self.status == FacetStatus::NewThisStep
    }

    /// Whether the facet is a simplex with ordered neighbors.
    #[must_use]
    pub const fn is_simplicial(&self) -> bool {
        self.simplicial
    }

    /// Whether the interior point is not clearly below the facet.
    #[must_use]
    pub const fn is_flipped(&self) -> bool {
        self.flipped
    }

    /// Whether the facet passed the output selection rules.
    #[must_use]
    pub const fn is_good(&self) -> bool {
        self.good
    }

    /// Whether the facet belongs to the upper hull of a lifted point set.
    #[must_use]
    pub const fn is_upper_delaunay(&self) -> bool {
        self.upper_delaunay
    }

    /// Largest distance of a vertex or coplanar point above the plane.
    #[must_use]
    pub const fn max_outside(&self) -> f64 {
        self.max_outside
    }

    /// Pending removal, if any.
    #[must_use]
    pub const fn removal(&self) -> Option<RemovalReason> {
        self.removal
    }

    /// Replaces a neighbor in place, keeping the simplicial order; returns
    /// false if `old` is not a neighbor.
    pub(crate) fn replace_neighbor(&mut self, old: FacetKey, new: FacetKey) -> bool {
        let Some(position) = self.neighbors.iter().position(|&n| n == old) else {
            return false;
        };
        if self.neighbors.contains(&new) {
            self.neighbors.remove(position);
            self.simplicial = false;
        } else {
            self.neighbors[position] = new;
        }
        true
    }

    /// Adds a neighbor unless already present.
    pub(crate) fn add_neighbor(&mut self, neighbor: FacetKey) {
        if !self.neighbors.contains(&neighbor) {
            self.neighbors.push(neighbor);
        }
    }

    /// Adds a point to the outside set, keeping the furthest point last.
    pub(crate) fn push_outside(&mut self, point: usize, dist: f64) {
        self.outside.push(point);
        if dist > self.furthest_dist || self.outside.len() == 1 {
            self.furthest_dist = dist;
        } else {
            let len = self.outside.len();
            self.outside.swap(len - 1, len - 2);
        }
    }

    /// Forgets cached geometry after the vertex set changed.
    pub(crate) fn invalidate_geometry(&mut self) {
        self.centrum = None;
        self.tested = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    fn unit_plane() -> Hyperplane {
        Hyperplane::new(vec![0.0, 1.0], -1.0).unwrap()
    }

    #[test]
    fn test_push_outside_keeps_furthest_last() {
        let mut facet = Facet::new(0, VertexBuffer::new(), unit_plane());
        facet.push_outside(10, 0.5);
        facet.push_outside(11, 2.0);
        facet.push_outside(12, 1.0);
        assert_eq!(facet.outside_points().last(), Some(&11));
        assert!((facet.furthest_dist - 2.0).abs() < f64::EPSILON);
        assert_eq!(facet.outside_points().len(), 3);
    }

    #[test]
    fn test_replace_neighbor_keeps_position_or_dedups() {
        let mut keys: SlotMap<FacetKey, ()> = SlotMap::with_key();
        let (a, b, c, d) = (
            keys.insert(()),
            keys.insert(()),
            keys.insert(()),
            keys.insert(()),
        );
        let mut facet = Facet::new(0, VertexBuffer::new(), unit_plane());
        facet.neighbors.extend([a, b, c]);

        assert!(facet.replace_neighbor(b, d));
        assert_eq!(facet.neighbors(), &[a, d, c]);
        assert!(facet.is_simplicial());

        // Replacing by an existing neighbor collapses the two entries
        assert!(facet.replace_neighbor(a, c));
        assert_eq!(facet.neighbors(), &[d, c]);
        assert!(!facet.is_simplicial());

        assert!(!facet.replace_neighbor(a, b));
    }

    #[test]
    fn test_status_helpers() {
        let mut facet = Facet::new(0, VertexBuffer::new(), unit_plane());
        assert_eq!(facet.status(), FacetStatus::Active);
        facet.status = FacetStatus::NewThisStep;
        assert!(facet.is_new());
        facet.status = FacetStatus::Visible;
        assert!(facet.is_visible());
        assert!(!facet.is_new());
    }
}
