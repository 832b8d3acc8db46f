//! Collection aliases used by the hull graph and the construction algorithms.
//!
//! The facet, ridge and vertex arenas are slotmaps addressed by generational
//! keys, so a key held by a stale merge request or a deleted facet simply fails
//! to resolve instead of dangling. Hash maps use `FxHash`: keys are small
//! integers or key tuples, and iteration order only needs to be deterministic,
//! not randomized.

use rustc_hash::{FxBuildHasher, FxHashMap, FxHashSet};
use smallvec::SmallVec;

#[cfg(not(feature = "dense-slotmap"))]
use slotmap::SlotMap;

#[cfg(feature = "dense-slotmap")]
use slotmap::DenseSlotMap;

// =============================================================================
// STORAGE BACKEND
// =============================================================================

/// Arena backing the facet, ridge and vertex stores of a hull graph.
///
/// # Feature Flags
///
/// - **default**: `DenseSlotMap` (via the default `dense-slotmap` feature)
/// - **--no-default-features**: `SlotMap`
///
/// The concrete backend never appears in public signatures; the graph exposes
/// keys and views instead.
#[cfg(not(feature = "dense-slotmap"))]
pub type StorageMap<K, V> = SlotMap<K, V>;

#[cfg(feature = "dense-slotmap")]
pub type StorageMap<K, V> = DenseSlotMap<K, V>;

// =============================================================================
// HASHING
// =============================================================================

/// Hash map used for subridge matching, measure caches and lookups.
pub type FastHashMap<K, V> = FxHashMap<K, V>;

/// Hash set used for visible sets, horizon vertices and candidate facets.
pub type FastHashSet<T> = FxHashSet<T>;

/// Build hasher shared by [`FastHashMap`] and [`FastHashSet`].
pub type FastBuildHasher = FxBuildHasher;

// =============================================================================
// SMALL BUFFERS
// =============================================================================

/// Inline buffer for per-facet and per-ridge key lists.
///
/// Facets of a `D`-dimensional hull have at least `D` vertices and neighbors,
/// so an inline capacity of [`MAX_PRACTICAL_DIMENSION_SIZE`] keeps simplicial
/// facets up to 8D off the heap.
pub type SmallBuffer<T, const N: usize> = SmallVec<[T; N]>;

/// Inline capacity for key lists whose length tracks the hull dimension.
pub const MAX_PRACTICAL_DIMENSION_SIZE: usize = 8;

/// Vertex list of a facet or ridge.
pub type VertexBuffer<K> = SmallBuffer<K, MAX_PRACTICAL_DIMENSION_SIZE>;

/// Creates a [`FastHashMap`] with room for `capacity` entries.
#[inline]
#[must_use]
pub fn fast_hash_map_with_capacity<K, V>(capacity: usize) -> FastHashMap<K, V> {
    FastHashMap::with_capacity_and_hasher(capacity, FastBuildHasher::default())
}

/// Creates a [`FastHashSet`] with room for `capacity` entries.
#[inline]
#[must_use]
pub fn fast_hash_set_with_capacity<T>(capacity: usize) -> FastHashSet<T> {
    FastHashSet::with_capacity_and_hasher(capacity, FastBuildHasher::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_helpers() {
        let map = fast_hash_map_with_capacity::<u64, usize>(100);
        assert!(map.capacity() >= 100);

        let set = fast_hash_set_with_capacity::<u64>(50);
        assert!(set.capacity() >= 50);
    }

    #[test]
    fn test_vertex_buffer_spills_past_practical_dimension() {
        let mut buffer: VertexBuffer<u32> = VertexBuffer::new();
        for i in 0..u32::try_from(MAX_PRACTICAL_DIMENSION_SIZE).unwrap() {
            buffer.push(i);
        }
        assert!(!buffer.spilled());

        buffer.push(99);
        assert!(buffer.spilled());
        assert_eq!(buffer.len(), MAX_PRACTICAL_DIMENSION_SIZE + 1);
    }
}
