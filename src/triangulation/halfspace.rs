//! Half-space intersection by point / hyperplane duality.
//!
//! A half-space `n . x + c <= 0` that strictly contains the feasible point `f`
//! (`d = n . f + c < 0`) is mapped to the dual point `-n / d`, relative to
//! `f`. The facets of the dual points' hull correspond to the vertices of the
//! intersection: a dual facet `m . p + o = 0` gives the vertex `f - m / o`,
//! and the half-spaces whose dual points span it are the ones active there.
//! A half-space whose dual point is not a hull vertex is redundant.

use crate::core::error::HullError;
use crate::core::facet::FacetKey;
use crate::core::hull::ConvexHull;
use crate::core::options::HullOptions;
use crate::core::points::PointSet;

/// One vertex of the intersection.
#[derive(Clone, Debug, PartialEq)]
pub struct IntersectionVertex {
    /// Coordinates of the vertex.
    pub point: Vec<f64>,
    /// Indices of the half-spaces whose boundary passes through the vertex.
    pub halfspaces: Vec<usize>,
    /// Dual hull facet the vertex comes from.
    pub facet: FacetKey,
}

/// Intersection of half-spaces `normal . x + offset <= 0`.
///
/// # Examples
///
/// ```
/// use quickhull_nd::prelude::*;
///
/// // The square [-1, 1]^2 as four half-spaces
/// let halfspaces = [[1.0, 0.0, -1.0], [-1.0, 0.0, -1.0], [0.0, 1.0, -1.0], [0.0, -1.0, -1.0]];
/// let intersection = HalfspaceIntersection::from_rows(&halfspaces, &[0.0, 0.0], HullOptions::default()).unwrap();
/// assert_eq!(intersection.vertices().len(), 4);
/// assert!(intersection.redundant().is_empty());
/// ```
#[derive(Debug)]
pub struct HalfspaceIntersection {
    hull: ConvexHull,
    feasible_point: Vec<f64>,
    vertices: Vec<IntersectionVertex>,
    redundant: Vec<usize>,
}

impl HalfspaceIntersection {
    /// Intersects `halfspaces`, each row `[normal..., offset]` of length
    /// `d + 1`, around a point strictly inside all of them.
    ///
    /// # Errors
    ///
    /// Returns [`HullError::Input`] for a dimension mismatch, a feasible point
    /// that is not strictly inside every half-space, Delaunay options, or an
    /// unbounded intersection; otherwise the error of the dual hull.
    pub fn new(
        halfspaces: &PointSet,
        feasible_point: &[f64],
        options: HullOptions,
    ) -> Result<Self, HullError> {
        let dim = feasible_point.len();
        if halfspaces.dim() != dim + 1 {
            return Err(HullError::input(format!(
                "half-spaces have {} coefficients, expected {} for a {dim}D feasible point",
                halfspaces.dim(),
                dim + 1
            )));
        }
        if options.delaunay {
            return Err(HullError::input(
                "Delaunay options do not apply to half-space intersection",
            ));
        }

        let duals = Self::dual_points(halfspaces, feasible_point)?;
        let hull = ConvexHull::new(duals, options)?;
        let vertices = Self::intersection_vertices(&hull, feasible_point)?;
        let redundant: Vec<usize> = (0..halfspaces.len())
            .filter(|&i| hull.vertex_of_point(i).is_none())
            .collect();
        tracing::debug!(
            "intersection of {} half-spaces: {} vertices, {} redundant",
            halfspaces.len(),
            vertices.len(),
            redundant.len()
        );
        Ok(Self {
            hull,
            feasible_point: feasible_point.to_vec(),
            vertices,
            redundant,
        })
    }

    /// Intersects half-spaces given as equally long rows.
    ///
    /// # Errors
    ///
    /// As [`HalfspaceIntersection::new`].
    pub fn from_rows<R: AsRef<[f64]>>(
        rows: &[R],
        feasible_point: &[f64],
        options: HullOptions,
    ) -> Result<Self, HullError> {
        Self::new(&PointSet::from_rows(rows)?, feasible_point, options)
    }

    fn dual_points(halfspaces: &PointSet, feasible_point: &[f64]) -> Result<PointSet, HullError> {
        let dim = feasible_point.len();
        let mut coords = Vec::new();
        coords.try_reserve_exact(halfspaces.len() * dim)?;
        for (index, row) in halfspaces.iter().enumerate() {
            let (normal, offset) = row.split_at(dim);
            let depth = normal
                .iter()
                .zip(feasible_point)
                .map(|(n, f)| n * f)
                .sum::<f64>()
                + offset[0];
            if depth >= 0.0 {
                return Err(HullError::input(format!(
                    "feasible point is not strictly inside half-space {index} (distance {depth:e})"
                )));
            }
            coords.extend(normal.iter().map(|n| -n / depth));
        }
        PointSet::new(dim, coords)
    }

    fn intersection_vertices(
        hull: &ConvexHull,
        feasible_point: &[f64],
    ) -> Result<Vec<IntersectionVertex>, HullError> {
        let tolerance = hull.context().precision().dist_round;
        let mut vertices = Vec::new();
        for facet in hull.all_facets() {
            let offset = facet.offset();
            if offset >= -tolerance {
                return Err(HullError::input(format!(
                    "the intersection is unbounded: the feasible point is not inside the dual of facet f{}",
                    facet.id()
                )));
            }
            let point = feasible_point
                .iter()
                .zip(facet.normal())
                .map(|(f, m)| f - m / offset)
                .collect();
            let mut halfspaces = facet.point_indices();
            halfspaces.sort_unstable();
            vertices.push(IntersectionVertex {
                point,
                halfspaces,
                facet: facet.key(),
            });
        }
        Ok(vertices)
    }

    /// Vertices of the intersection, one per dual facet.
    #[must_use]
    pub fn vertices(&self) -> &[IntersectionVertex] {
        &self.vertices
    }

    /// Half-spaces that do not touch the intersection.
    #[must_use]
    pub fn redundant(&self) -> &[usize] {
        &self.redundant
    }

    /// The point the duality is centered on.
    #[must_use]
    pub fn feasible_point(&self) -> &[f64] {
        &self.feasible_point
    }

    /// Hull of the dual points.
    #[must_use]
    pub const fn dual_hull(&self) -> &ConvexHull {
        &self.hull
    }
}
