//! Voronoi diagram as the dual of the Delaunay triangulation.
//!
//! Each good facet of the lifted hull, with plane `a . x + b z + c = 0`,
//! intersects the paraboloid in the circumsphere of its corners; the sphere's
//! center `-a / (2 b)` is a Voronoi vertex. The region of an input point is
//! formed by the Voronoi vertices of the facets around its lifted vertex. A
//! region touching a facet that is not good extends to infinity.

use crate::core::collections::{FastHashMap, fast_hash_map_with_capacity};
use crate::core::error::HullError;
use crate::core::facet::FacetKey;
use crate::core::hull::ConvexHull;
use crate::core::options::HullOptions;
use crate::core::points::PointSet;

use super::delaunay::DelaunayTriangulation;

/// The Voronoi cell of one input point.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VoronoiRegion {
    /// Index of the input point.
    pub site: usize,
    /// Indices into [`VoronoiDiagram::vertices`]; counter-clockwise around
    /// the site in 2D.
    pub vertices: Vec<usize>,
    /// Whether the cell extends to infinity.
    pub unbounded: bool,
}

/// Voronoi diagram of a point set.
///
/// # Examples
///
/// ```
/// use quickhull_nd::prelude::*;
///
/// let points = PointSet::from_rows(&[[0.0, 0.0], [2.0, 0.0], [0.0, 2.0], [2.0, 2.0], [1.0, 0.9]]).unwrap();
/// let diagram = VoronoiDiagram::new(points, HullOptions::default()).unwrap();
/// let center = diagram.region(4).unwrap();
/// assert!(!center.unbounded);
/// assert_eq!(center.vertices.len(), 4);
/// ```
#[derive(Debug)]
pub struct VoronoiDiagram {
    delaunay: DelaunayTriangulation,
    vertices: Vec<Vec<f64>>,
    facet_vertex: FastHashMap<FacetKey, usize>,
    regions: Vec<Option<VoronoiRegion>>,
}

impl VoronoiDiagram {
    /// Builds the Voronoi diagram of `points` (furthest-site with
    /// `upper_delaunay`).
    ///
    /// # Errors
    ///
    /// As [`DelaunayTriangulation::new`].
    pub fn new(points: PointSet, options: HullOptions) -> Result<Self, HullError> {
        let delaunay = DelaunayTriangulation::new(points, options)?;
        let (vertices, facet_vertex) = Self::voronoi_vertices(&delaunay);
        let regions = Self::collect_regions(&delaunay, &facet_vertex, &vertices)?;
        tracing::debug!(
            "Voronoi diagram with {} vertices and {} regions",
            vertices.len(),
            regions.iter().flatten().count()
        );
        Ok(Self {
            delaunay,
            vertices,
            facet_vertex,
            regions,
        })
    }

    /// Builds the diagram of equally long coordinate rows.
    ///
    /// # Errors
    ///
    /// As [`DelaunayTriangulation::new`].
    pub fn from_rows<R: AsRef<[f64]>>(rows: &[R], options: HullOptions) -> Result<Self, HullError> {
        Self::new(PointSet::from_rows(rows)?, options)
    }

    /// Circumcenter of every Delaunay region, in region order.
    fn voronoi_vertices(delaunay: &DelaunayTriangulation) -> (Vec<Vec<f64>>, FastHashMap<FacetKey, usize>) {
        let regions = delaunay.regions();
        let mut vertices = Vec::with_capacity(regions.len());
        let mut facet_vertex = fast_hash_map_with_capacity(regions.len());
        for region in regions {
            let Some(facet) = delaunay.hull().facet(region.facet) else {
                continue;
            };
            let normal = facet.normal();
            let Some((&b, a)) = normal.split_last() else {
                continue;
            };
            if b == 0.0 {
                continue;
            }
            let scale = -0.5 / b;
            facet_vertex.insert(region.facet, vertices.len());
            vertices.push(a.iter().map(|c| c * scale).collect());
        }
        (vertices, facet_vertex)
    }

    fn collect_regions(
        delaunay: &DelaunayTriangulation,
        facet_vertex: &FastHashMap<FacetKey, usize>,
        vertices: &[Vec<f64>],
    ) -> Result<Vec<Option<VoronoiRegion>>, HullError> {
        let hull = delaunay.hull();
        let sites = delaunay.points();
        let mut regions = Vec::new();
        regions.try_reserve_exact(sites.len())?;
        for site in 0..sites.len() {
            let Some(vertex) = hull.vertex_of_point(site).and_then(|v| hull.vertex(v)) else {
                regions.push(None);
                continue;
            };
            let mut region = VoronoiRegion {
                site,
                vertices: Vec::with_capacity(vertex.neighbors().len()),
                unbounded: false,
            };
            for facet in vertex.neighbors() {
                match facet_vertex.get(facet) {
                    Some(&index) => region.vertices.push(index),
                    None => region.unbounded = true,
                }
            }
            if sites.dim() == 2 {
                let center = sites.point(site);
                region.vertices.sort_by(|&i, &j| {
                    let a = angle_around(center, &vertices[i]);
                    let b = angle_around(center, &vertices[j]);
                    a.total_cmp(&b)
                });
            }
            regions.push(Some(region));
        }
        Ok(regions)
    }

    /// Voronoi vertex coordinates.
    #[must_use]
    pub fn vertices(&self) -> &[Vec<f64>] {
        &self.vertices
    }

    /// Regions of all input points that are Delaunay vertices.
    pub fn regions(&self) -> impl Iterator<Item = &VoronoiRegion> + '_ {
        self.regions.iter().flatten()
    }

    /// Region of input point `site`; `None` for duplicate or coplanar points
    /// that are not Delaunay vertices.
    #[must_use]
    pub fn region(&self, site: usize) -> Option<&VoronoiRegion> {
        self.regions.get(site).and_then(Option::as_ref)
    }

    /// Voronoi vertex of a Delaunay region's facet.
    #[must_use]
    pub fn vertex_of_facet(&self, facet: FacetKey) -> Option<usize> {
        self.facet_vertex.get(&facet).copied()
    }

    /// The dual triangulation.
    #[must_use]
    pub const fn delaunay(&self) -> &DelaunayTriangulation {
        &self.delaunay
    }

    /// The hull of the lifted points.
    #[must_use]
    pub const fn hull(&self) -> &ConvexHull {
        self.delaunay.hull()
    }
}

fn angle_around(center: &[f64], point: &[f64]) -> f64 {
    (point[1] - center[1]).atan2(point[0] - center[0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_bounded_cell_in_a_perturbed_square() {
        let diagram = VoronoiDiagram::from_rows(
            &[[0.0, 0.0], [2.0, 0.0], [0.0, 2.0], [2.0, 2.0], [1.0, 0.9]],
            HullOptions::default(),
        )
        .unwrap();
        assert_eq!(diagram.vertices().len(), 4);
        let center = diagram.region(4).unwrap();
        assert!(!center.unbounded);
        assert_eq!(center.vertices.len(), 4);
        for corner in 0..4 {
            assert!(diagram.region(corner).unwrap().unbounded);
        }

        // Counter-clockwise: angles around the site increase
        let site = [1.0, 0.9];
        let angles: Vec<f64> = center
            .vertices
            .iter()
            .map(|&i| angle_around(&site, &diagram.vertices()[i]))
            .collect();
        assert!(angles.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_voronoi_vertex_is_the_circumcenter() {
        let diagram = VoronoiDiagram::from_rows(
            &[[0.0, 0.0], [4.0, 0.0], [0.0, 2.0], [5.0, 5.0]],
            HullOptions::default(),
        )
        .unwrap();
        let region = diagram
            .delaunay()
            .regions()
            .iter()
            .find(|r| {
                let mut points = r.points.clone();
                points.sort_unstable();
                points == vec![0, 1, 2]
            })
            .unwrap();
        let index = diagram.vertex_of_facet(region.facet).unwrap();
        let vertex = &diagram.vertices()[index];
        assert_relative_eq!(vertex[0], 2.0, epsilon = 1e-9);
        assert_relative_eq!(vertex[1], 1.0, epsilon = 1e-9);
    }
}
