//! Ridges: the `(D-2)`-faces shared by two facets.
//!
//! A ridge always has exactly `D-1` vertices. Two non-simplicial facets may
//! share several ridges, one per simplex of their common boundary.

use slotmap::new_key_type;

use super::collections::VertexBuffer;
use super::facet::FacetKey;
use super::vertex::VertexKey;

new_key_type! {
    /// Key of a ridge in the hull graph arena.
    pub struct RidgeKey;
}

/// A ridge between its `top` and `bottom` facets.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ridge {
    pub(crate) id: u32,
    pub(crate) vertices: VertexBuffer<VertexKey>,
    pub(crate) top: FacetKey,
    pub(crate) bottom: FacetKey,
    /// Convexity of the two facets has been tested since the last change.
    pub(crate) tested: bool,
    /// The last convexity test failed.
    pub(crate) nonconvex: bool,
    /// Created by pairing duplicate subridges; its facets must be merged.
    pub(crate) dupridge: bool,
}

impl Ridge {
    pub(crate) fn new(
        id: u32,
        vertices: VertexBuffer<VertexKey>,
        top: FacetKey,
        bottom: FacetKey,
    ) -> Self {
        Self {
            id,
            vertices,
            top,
            bottom,
            tested: false,
            nonconvex: false,
            dupridge: false,
        }
    }

    /// Creation-order id.
    #[must_use]
    pub const fn id(&self) -> u32 {
        self.id
    }

    /// Vertices, sorted by decreasing id.
    #[must_use]
    pub fn vertices(&self) -> &[VertexKey] {
        &self.vertices
    }

    /// First incident facet.
    #[must_use]
    pub const fn top(&self) -> FacetKey {
        self.top
    }

    /// Second incident facet.
    #[must_use]
    pub const fn bottom(&self) -> FacetKey {
        self.bottom
    }

    /// The facet across the ridge from `facet`, if `facet` is incident.
    #[must_use]
    pub fn other(&self, facet: FacetKey) -> Option<FacetKey> {
        if self.top == facet {
            Some(self.bottom)
        } else if self.bottom == facet {
            Some(self.top)
        } else {
            None
        }
    }

    /// Whether `facet` is one of the two incident facets.
    #[must_use]
    pub fn is_incident(&self, facet: FacetKey) -> bool {
        self.top == facet || self.bottom == facet
    }

    /// Whether the last convexity test of its facets failed.
    #[must_use]
    pub const fn is_nonconvex(&self) -> bool {
        self.nonconvex
    }

    #[must_use]
    pub const fn is_dupridge(&self) -> bool {
        self.dupridge
    }

    /// Replaces the incident facet `old` by `new`; returns false if `old` is
    /// not incident.
    pub(crate) fn replace_facet(&mut self, old: FacetKey, new: FacetKey) -> bool {
        if self.top == old {
            self.top = new;
        } else if self.bottom == old {
            self.bottom = new;
        } else {
            return false;
        }
        self.tested = false;
        self.nonconvex = false;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    #[test]
    fn test_other_and_replace() {
        let mut facets: SlotMap<FacetKey, ()> = SlotMap::with_key();
        let a = facets.insert(());
        let b = facets.insert(());
        let c = facets.insert(());

        let mut ridge = Ridge::new(0, VertexBuffer::new(), a, b);
        ridge.tested = true;
        assert_eq!(ridge.other(a), Some(b));
        assert_eq!(ridge.other(b), Some(a));
        assert_eq!(ridge.other(c), None);

        assert!(ridge.replace_facet(a, c));
        assert!(!ridge.tested);
        assert!(ridge.is_incident(c));
        assert!(!ridge.is_incident(a));
        assert!(!ridge.replace_facet(a, b));
    }
}
