//! Delaunay triangulation by lifting onto a paraboloid.
//!
//! Every input point `x` is lifted to `(x, |x|^2)` and the convex hull of the
//! lifted points is built one dimension up. The facets whose outer normal
//! points down form the Delaunay triangulation; with `upper_delaunay` the
//! upward facets (the furthest-site triangulation) are reported instead.
//! Cospherical points make the lower hull flat: merged facets then come out
//! as non-simplicial regions, and `point_at_infinity` adds a point above the
//! paraboloid so a fully cospherical input still has a hull.

use crate::core::error::HullError;
use crate::core::facet::FacetKey;
use crate::core::hull::ConvexHull;
use crate::core::options::HullOptions;
use crate::core::points::PointSet;

/// One Delaunay region: a simplex, or a merged cospherical cell.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DelaunayRegion {
    /// Hull facet of the lifted points.
    pub facet: FacetKey,
    /// Indices of the input points at the corners, by decreasing vertex id.
    pub points: Vec<usize>,
    /// Whether the region has exactly `d+1` corners.
    pub simplicial: bool,
}

/// Delaunay triangulation of a point set.
///
/// # Examples
///
/// ```
/// use quickhull_nd::prelude::*;
///
/// let points = PointSet::from_rows(&[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0], [0.5, 0.5]]).unwrap();
/// let triangulation = DelaunayTriangulation::new(points, HullOptions::default()).unwrap();
/// assert_eq!(triangulation.regions().len(), 4);
/// assert!(triangulation.regions().iter().all(|r| r.points.contains(&4)));
/// ```
#[derive(Debug)]
pub struct DelaunayTriangulation {
    hull: ConvexHull,
    input: PointSet,
    regions: Vec<DelaunayRegion>,
}

impl DelaunayTriangulation {
    /// Triangulates `points`; `options.delaunay` is switched on.
    ///
    /// # Errors
    ///
    /// Returns [`HullError::Input`] for invalid options or too few points,
    /// [`HullError::SingularInput`] for cospherical or flat input without
    /// `point_at_infinity` or joggle, and the build error otherwise.
    pub fn new(points: PointSet, options: HullOptions) -> Result<Self, HullError> {
        let options = HullOptions {
            delaunay: true,
            ..options
        };
        let input = points.clone();
        let hull = ConvexHull::new(points, options)?;
        let regions = Self::collect_regions(&hull, input.len());
        tracing::debug!(
            "Delaunay triangulation of {} points in {}D: {} regions",
            input.len(),
            input.dim(),
            regions.len()
        );
        Ok(Self {
            hull,
            input,
            regions,
        })
    }

    /// Triangulates equally long coordinate rows.
    ///
    /// # Errors
    ///
    /// As [`DelaunayTriangulation::new`].
    pub fn from_rows<R: AsRef<[f64]>>(rows: &[R], options: HullOptions) -> Result<Self, HullError> {
        Self::new(PointSet::from_rows(rows)?, options)
    }

    /// Good facets, except those touching the point at infinity.
    fn collect_regions(hull: &ConvexHull, num_input: usize) -> Vec<DelaunayRegion> {
        let dim = hull.dim();
        hull.good_facets()
            .filter_map(|facet| {
                let points = facet.point_indices();
                if points.iter().any(|&p| p >= num_input) {
                    return None;
                }
                Some(DelaunayRegion {
                    facet: facet.key(),
                    simplicial: points.len() == dim,
                    points,
                })
            })
            .collect()
    }

    /// Dimension of the input points.
    #[must_use]
    pub const fn dim(&self) -> usize {
        self.input.dim()
    }

    /// The input points.
    #[must_use]
    pub const fn points(&self) -> &PointSet {
        &self.input
    }

    /// Delaunay regions.
    #[must_use]
    pub fn regions(&self) -> &[DelaunayRegion] {
        &self.regions
    }

    /// Region corners as point index lists.
    #[must_use]
    pub fn simplices(&self) -> Vec<Vec<usize>> {
        self.regions.iter().map(|r| r.points.clone()).collect()
    }

    /// The hull of the lifted points.
    #[must_use]
    pub const fn hull(&self) -> &ConvexHull {
        &self.hull
    }

    /// Index of the point at infinity among the lifted points, if one was added.
    #[must_use]
    pub fn point_at_infinity(&self) -> Option<usize> {
        self.hull
            .context()
            .options()
            .point_at_infinity
            .then_some(self.input.len())
    }
}
