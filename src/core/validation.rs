//! Structural and geometric checks of a finished hull.
//!
//! [`HullContext::validate`] checks, in order:
//! 1. closure: every ridge joins two live facets that list each other as
//!    neighbors, simplicial facets keep their vertex / neighbor
//!    correspondence, every vertex lies in at least `D` facets, and up to 3D
//!    a facet has one ridge per neighbor;
//! 2. orientation: the interior point is below every facet;
//! 3. convexity: neighboring facets pass the centrum test with the largest
//!    merge radius (without merging, no vertex of a neighbor is above a facet);
//! 4. containment: no input point is above any facet by more than
//!    `max_outside`.

use thiserror::Error;

use super::collections::{FastHashMap, fast_hash_map_with_capacity};
use super::context::HullContext;
use super::facet::FacetKey;
use super::graph::GraphError;
use super::vertex::VertexKey;
use crate::geometry::hyperplane::Hyperplane;

/// A violated hull property.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum HullValidationError {
    /// A ridge does not join two live facets consistently.
    #[error("Ridge r{ridge}: {message}")]
    InvalidRidge {
        /// Id of the ridge.
        ridge: u32,
        /// Description of the inconsistency.
        message: String,
    },
    /// Two facets share a ridge but not a neighbor entry, or vice versa.
    #[error("Facets f{facet1} and f{facet2} are not mutual neighbors")]
    NotNeighbors {
        /// Id of the first facet.
        facet1: u32,
        /// Id of the second facet.
        facet2: u32,
    },
    /// A facet has the wrong shape for its simplicial flag.
    #[error("Facet f{facet}: {message}")]
    InvalidFacet {
        /// Id of the facet.
        facet: u32,
        /// Description of the problem.
        message: String,
    },
    /// A vertex lies in fewer facets than the dimension.
    #[error("Vertex v{vertex} lies in {facets} facets, fewer than {dimension}")]
    TooFewFacets {
        /// Id of the vertex.
        vertex: u32,
        /// Live facets containing it.
        facets: usize,
        /// Hull dimension.
        dimension: usize,
    },
    /// The interior point is not below a facet.
    #[error("Facet f{facet} is flipped: interior point at distance {distance:e}")]
    Flipped {
        /// Id of the facet.
        facet: u32,
        /// Signed distance of the interior point.
        distance: f64,
    },
    /// Two neighbors are not convex within tolerance.
    #[error("Facets f{facet} and f{neighbor} are not convex: distance {distance:e} exceeds {limit:e}")]
    NonConvex {
        /// Id of the facet whose plane is tested.
        facet: u32,
        /// Id of the neighbor whose centrum or vertex is tested.
        neighbor: u32,
        /// Signed distance above the plane.
        distance: f64,
        /// Largest accepted distance.
        limit: f64,
    },
    /// An input point lies outside the hull.
    #[error("Point {point} is {distance:e} above facet f{facet} (limit {limit:e})")]
    NotContained {
        /// Index of the point.
        point: usize,
        /// Id of the facet.
        facet: u32,
        /// Signed distance above the plane.
        distance: f64,
        /// Largest accepted distance.
        limit: f64,
    },
    /// A key referenced by the graph is missing.
    #[error(transparent)]
    Graph(#[from] GraphError),
}

impl HullContext {
    /// Checks closure, orientation, convexity and containment of the hull.
    ///
    /// # Errors
    ///
    /// Returns the first [`HullValidationError`] found.
    pub fn validate(&self) -> Result<(), HullValidationError> {
        self.validate_closure()?;
        self.validate_orientation()?;
        self.validate_convexity()?;
        self.validate_containment()
    }

    fn validate_closure(&self) -> Result<(), HullValidationError> {
        let dim = self.dim();
        for (key, facet) in self.graph.live_facets() {
            for &v in facet.vertices() {
                if self.graph.vertex(v)?.is_deleted() {
                    return Err(HullValidationError::InvalidFacet {
                        facet: facet.id(),
                        message: "references a deleted vertex".to_string(),
                    });
                }
            }

            let mut across: Vec<FacetKey> = Vec::with_capacity(facet.ridges().len());
            for &r in facet.ridges() {
                let ridge = self.graph.ridge(r)?;
                let Some(other) = ridge.other(key) else {
                    return Err(HullValidationError::InvalidRidge {
                        ridge: ridge.id(),
                        message: format!("listed by f{} but not incident to it", facet.id()),
                    });
                };
                if ridge.vertices().len() != dim - 1 {
                    return Err(HullValidationError::InvalidRidge {
                        ridge: ridge.id(),
                        message: format!("has {} vertices in {dim}D", ridge.vertices().len()),
                    });
                }
                if !ridge.vertices().iter().all(|v| facet.vertices().contains(v)) {
                    return Err(HullValidationError::InvalidRidge {
                        ridge: ridge.id(),
                        message: format!("has a vertex that f{} lacks", facet.id()),
                    });
                }
                if !self.graph.is_live_facet(other) || !self.graph.facet(other)?.ridges().contains(&r) {
                    return Err(HullValidationError::InvalidRidge {
                        ridge: ridge.id(),
                        message: "its other facet is missing or does not list it".to_string(),
                    });
                }
                let neighbor = self.graph.facet(other)?;
                if !facet.neighbors().contains(&other) || !neighbor.neighbors().contains(&key) {
                    return Err(HullValidationError::NotNeighbors {
                        facet1: facet.id(),
                        facet2: neighbor.id(),
                    });
                }
                across.push(other);
            }
            for &n in facet.neighbors() {
                if !across.contains(&n) {
                    return Err(HullValidationError::NotNeighbors {
                        facet1: facet.id(),
                        facet2: self.graph.facet(n)?.id(),
                    });
                }
            }

            if facet.is_simplicial() {
                self.validate_simplicial(key)?;
            } else if dim <= 3 && facet.ridges().len() != facet.neighbors().len() {
                return Err(HullValidationError::InvalidFacet {
                    facet: facet.id(),
                    message: format!(
                        "has {} ridges but {} neighbors",
                        facet.ridges().len(),
                        facet.neighbors().len()
                    ),
                });
            }
        }
        self.validate_vertex_facets()
    }

    /// Every vertex is a corner of at least `D` facets.
    fn validate_vertex_facets(&self) -> Result<(), HullValidationError> {
        let dim = self.dim();
        let mut facets: FastHashMap<VertexKey, usize> =
            fast_hash_map_with_capacity(self.graph.vertex_list.len());
        for (_, facet) in self.graph.live_facets() {
            for &v in facet.vertices() {
                *facets.entry(v).or_default() += 1;
            }
        }
        for (key, vertex) in self.graph.live_vertices() {
            let count = facets.get(&key).copied().unwrap_or(0);
            if count < dim {
                return Err(HullValidationError::TooFewFacets {
                    vertex: vertex.id(),
                    facets: count,
                    dimension: dim,
                });
            }
        }
        Ok(())
    }

    /// `D` vertices and neighbors, the `k`th neighbor sharing every vertex but
    /// the `k`th.
    fn validate_simplicial(&self, key: FacetKey) -> Result<(), HullValidationError> {
        let dim = self.dim();
        let facet = self.graph.facet(key)?;
        if facet.vertices().len() != dim || facet.neighbors().len() != dim {
            return Err(HullValidationError::InvalidFacet {
                facet: facet.id(),
                message: format!(
                    "simplicial with {} vertices and {} neighbors",
                    facet.vertices().len(),
                    facet.neighbors().len()
                ),
            });
        }
        for (k, &n) in facet.neighbors().iter().enumerate() {
            let neighbor = self.graph.facet(n)?;
            let opposite = facet.vertices()[k];
            let shares_rest = facet
                .vertices()
                .iter()
                .filter(|&&v| v != opposite)
                .all(|v| neighbor.vertices().contains(v));
            if neighbor.vertices().contains(&opposite) || !shares_rest {
                return Err(HullValidationError::InvalidFacet {
                    facet: facet.id(),
                    message: format!("neighbor {k} (f{}) is not opposite vertex {k}", neighbor.id()),
                });
            }
        }
        Ok(())
    }

    fn validate_orientation(&self) -> Result<(), HullValidationError> {
        let limit = -self.precision.dist_round;
        for (_, facet) in self.graph.live_facets() {
            let distance = facet.hyperplane().distance(&self.interior);
            if distance >= limit || facet.is_flipped() {
                return Err(HullValidationError::Flipped {
                    facet: facet.id(),
                    distance,
                });
            }
        }
        Ok(())
    }

    pub(crate) fn validate_convexity(&self) -> Result<(), HullValidationError> {
        let dist_round = self.precision.dist_round;
        let merging = self.merging();
        let radius = self
            .precision
            .premerge_centrum
            .max(self.precision.postmerge_centrum);
        for (_, facet) in self.graph.live_facets() {
            let plane = facet.hyperplane();
            for &n in facet.neighbors() {
                let neighbor = self.graph.facet(n)?;
                let (distance, limit) = if merging {
                    let centrum = self.centrum_of(neighbor.vertices(), neighbor.hyperplane())?;
                    (plane.distance(&centrum), radius + dist_round)
                } else {
                    let mut highest = f64::NEG_INFINITY;
                    for &v in neighbor.vertices() {
                        if !facet.vertices().contains(&v) {
                            let point = self.points.point(self.graph.vertex_point(v)?);
                            highest = highest.max(plane.distance(point));
                        }
                    }
                    (highest, 2.0 * dist_round)
                };
                if distance > limit {
                    return Err(HullValidationError::NonConvex {
                        facet: facet.id(),
                        neighbor: neighbor.id(),
                        distance,
                        limit,
                    });
                }
            }
        }
        Ok(())
    }

    fn centrum_of(
        &self,
        vertices: &[VertexKey],
        plane: &Hyperplane,
    ) -> Result<Vec<f64>, HullValidationError> {
        let mut coords = Vec::with_capacity(vertices.len());
        for &v in vertices {
            coords.push(self.points.point(self.graph.vertex_point(v)?));
        }
        Ok(plane.centrum(coords))
    }

    fn validate_containment(&self) -> Result<(), HullValidationError> {
        let limit = self.max_outside + self.precision.dist_round;
        for point in 0..self.points.len() {
            if Some(point) == self.excluded_point {
                continue;
            }
            let coords = self.points.point(point);
            for (_, facet) in self.graph.live_facets() {
                let distance = facet.hyperplane().distance(coords);
                if distance > limit {
                    return Err(HullValidationError::NotContained {
                        point,
                        facet: facet.id(),
                        distance,
                        limit,
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::options::{HullOptions, MergeMode};
    use crate::core::points::PointSet;

    fn built(rows: &[[f64; 3]], merge_mode: MergeMode) -> HullContext {
        let options = HullOptions {
            merge_mode,
            ..HullOptions::default()
        };
        let mut ctx = HullContext::new(PointSet::from_rows(rows).unwrap(), options).unwrap();
        ctx.run().unwrap();
        ctx
    }

    const OCTAHEDRON: [[f64; 3]; 7] = [
        [1.0, 0.0, 0.0],
        [-1.0, 0.0, 0.0],
        [0.0, 1.0, 0.0],
        [0.0, -1.0, 0.0],
        [0.0, 0.0, 1.0],
        [0.0, 0.0, -1.0],
        [0.1, 0.2, 0.1],
    ];

    const CUBE: [[f64; 3]; 8] = [
        [0.0, 0.0, 0.0],
        [1.0, 0.0, 0.0],
        [0.0, 1.0, 0.0],
        [1.0, 1.0, 0.0],
        [0.0, 0.0, 1.0],
        [1.0, 0.0, 1.0],
        [0.0, 1.0, 1.0],
        [1.0, 1.0, 1.0],
    ];

    #[test]
    fn test_valid_hull_passes_all_checks() {
        for mode in [MergeMode::None, MergeMode::Pre] {
            let ctx = built(&OCTAHEDRON, mode);
            assert_eq!(ctx.graph().facet_count(), 8);
            assert_eq!(ctx.validate(), Ok(()));
        }
    }

    #[test]
    fn test_detects_point_outside_the_hull() {
        let mut ctx = built(&OCTAHEDRON, MergeMode::Pre);
        ctx.points = PointSet::from_rows(&[
            [1.0, 0.0, 0.0],
            [-1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, -1.0, 0.0],
            [0.0, 0.0, 1.0],
            [0.0, 0.0, -1.0],
            [3.0, 3.0, 3.0],
        ])
        .unwrap();
        assert!(matches!(
            ctx.validate(),
            Err(HullValidationError::NotContained { point: 6, .. })
        ));
    }

    #[test]
    fn test_detects_broken_neighbor_link() {
        let mut ctx = built(&OCTAHEDRON, MergeMode::Pre);
        let (key, _) = ctx.graph.live_facets().next().unwrap();
        ctx.graph.facet_mut(key).unwrap().neighbors.pop();
        assert!(matches!(
            ctx.validate(),
            Err(HullValidationError::NotNeighbors { .. })
        ));
    }

    #[test]
    fn test_merged_cube_has_one_ridge_per_neighbor() {
        let ctx = built(&CUBE, MergeMode::Both);
        assert_eq!(ctx.validate(), Ok(()));
        for (_, facet) in ctx.graph.live_facets() {
            assert_eq!(facet.ridges().len(), facet.neighbors().len());
        }
    }

    #[test]
    fn test_detects_vertex_in_too_few_facets() {
        let mut ctx = built(&OCTAHEDRON, MergeMode::Pre);
        ctx.graph.add_vertex(6);
        assert!(matches!(
            ctx.validate(),
            Err(HullValidationError::TooFewFacets {
                facets: 0,
                dimension: 3,
                ..
            })
        ));
    }

    #[test]
    fn test_detects_extra_ridge_between_merged_facets() {
        let mut ctx = built(&CUBE, MergeMode::Pre);
        let (key, ridge) = ctx
            .graph
            .live_facets()
            .find(|(_, f)| !f.is_simplicial())
            .map(|(k, f)| (k, f.ridges()[0]))
            .unwrap();
        let ridge = ctx.graph.ridge(ridge).unwrap().clone();
        let other = ridge.other(key).unwrap();
        ctx.graph
            .add_ridge(ridge.vertices().iter().copied().collect(), key, other)
            .unwrap();
        let err = ctx.validate().unwrap_err();
        assert!(
            matches!(&err, HullValidationError::InvalidFacet { message, .. } if message.contains("ridges but")),
            "{err}"
        );
    }
}
