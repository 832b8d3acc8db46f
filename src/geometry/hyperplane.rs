//! Oriented hyperplanes: fitting, signed distances and centrums.
//!
//! A facet of a `D`-dimensional hull stores a unit normal and an offset such
//! that `normal . x + offset` is the signed distance of `x` above the facet.
//! Planes are fitted by least squares through the facet's vertices, which is
//! exact for a simplicial facet and a best fit for a merged one.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::measures::count_as_f64;

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors from the geometry kernel.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum GeometryError {
    /// Fewer points than needed to span a hyperplane.
    #[error("Need at least {expected} points to fit a hyperplane in {dimension}D, got {actual}")]
    TooFewPoints {
        /// Points supplied.
        actual: usize,
        /// Points required.
        expected: usize,
        /// Ambient dimension.
        dimension: usize,
    },
    /// The points span fewer than `D-1` dimensions.
    #[error(
        "Degenerate point configuration: {points} points span fewer than {expected} dimensions (singular value {singular_value:e})"
    )]
    Degenerate {
        /// Number of points.
        points: usize,
        /// Dimensions the points should span.
        expected: usize,
        /// Second smallest singular value of the centered points.
        singular_value: f64,
    },
    /// A coordinate or intermediate value was not finite.
    #[error("Numeric failure: {details}")]
    NumericFailure {
        /// What went wrong.
        details: String,
    },
}

// =============================================================================
// HYPERPLANE
// =============================================================================

/// An oriented hyperplane `normal . x + offset = 0` with a unit normal.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Hyperplane {
    normal: Vec<f64>,
    offset: f64,
}

/// Result of [`Hyperplane::fit`].
#[derive(Clone, Debug, PartialEq)]
pub struct FittedPlane {
    /// The plane, oriented away from the interior point.
    pub plane: Hyperplane,
    /// Signed distance of the interior point (never positive).
    pub interior_distance: f64,
    /// The interior point lies within roundoff of the plane, so the
    /// orientation is not trustworthy.
    pub flipped: bool,
}

impl Hyperplane {
    /// Creates a plane from a normal and an offset, normalizing the normal.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::NumericFailure`] if the normal is zero or not finite.
    pub fn new(normal: Vec<f64>, offset: f64) -> Result<Self, GeometryError> {
        let norm = normal.iter().map(|c| c * c).sum::<f64>().sqrt();
        if !norm.is_finite() || norm == 0.0 || !offset.is_finite() {
            return Err(GeometryError::NumericFailure {
                details: format!("invalid hyperplane normal {normal:?} / offset {offset}"),
            });
        }
        Ok(Self {
            normal: normal.iter().map(|c| c / norm).collect(),
            offset: offset / norm,
        })
    }

    /// Fits a plane through `points` and orients it so `interior` lies below.
    ///
    /// The normal is the right singular vector of the centered points with the
    /// smallest singular value. The points must span `D-1` dimensions: the
    /// second smallest singular value has to exceed `dist_round`.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::TooFewPoints`] for fewer than `D` points,
    /// [`GeometryError::Degenerate`] for a lower-dimensional configuration and
    /// [`GeometryError::NumericFailure`] for non-finite input.
    ///
    /// # Examples
    ///
    /// ```
    /// use quickhull_nd::geometry::hyperplane::Hyperplane;
    ///
    /// let a = [0.0, 0.0, 1.0];
    /// let b = [1.0, 0.0, 1.0];
    /// let c = [0.0, 1.0, 1.0];
    /// let fitted = Hyperplane::fit(&[&a[..], &b[..], &c[..]], &[0.0, 0.0, 0.0], 1e-12).unwrap();
    /// assert!((fitted.plane.normal()[2] - 1.0).abs() < 1e-12);
    /// assert!((fitted.plane.distance(&[5.0, 5.0, 3.0]) - 2.0).abs() < 1e-12);
    /// ```
    pub fn fit(
        points: &[&[f64]],
        interior: &[f64],
        dist_round: f64,
    ) -> Result<FittedPlane, GeometryError> {
        let dim = interior.len();
        if points.len() < dim || dim == 0 {
            return Err(GeometryError::TooFewPoints {
                actual: points.len(),
                expected: dim,
                dimension: dim,
            });
        }

        let center = centroid(points.iter().copied(), dim);
        let centered = DMatrix::from_fn(points.len(), dim, |row, col| points[row][col] - center[col]);
        if centered.iter().any(|value| !value.is_finite()) {
            return Err(GeometryError::NumericFailure {
                details: "non-finite coordinate in hyperplane fit".to_string(),
            });
        }

        let svd = centered.svd(false, true);
        let v_t = svd.v_t.ok_or_else(|| GeometryError::NumericFailure {
            details: "singular value decomposition did not produce V^T".to_string(),
        })?;
        let values = svd.singular_values;
        if values.len() < dim {
            return Err(GeometryError::TooFewPoints {
                actual: values.len(),
                expected: dim,
                dimension: dim,
            });
        }

        let mut order: Vec<usize> = (0..values.len()).collect();
        order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
        let smallest = order[0];
        // A hyperplane in 1D is a point and needs no spanning check.
        if dim > 1 {
            let second = values[order[1]];
            if second <= dist_round * count_as_f64(points.len()).sqrt() {
                return Err(GeometryError::Degenerate {
                    points: points.len(),
                    expected: dim - 1,
                    singular_value: second,
                });
            }
        }

        let normal: Vec<f64> = v_t.row(smallest).iter().copied().collect();
        let offset = -dot(&normal, &center);
        let mut plane = Self::new(normal, offset)?;
        let mut interior_distance = plane.distance(interior);
        if interior_distance > 0.0 {
            plane.flip();
            interior_distance = -interior_distance;
        }

        Ok(FittedPlane {
            plane,
            interior_distance,
            flipped: -interior_distance <= dist_round,
        })
    }

    /// Unit normal.
    #[must_use]
    pub fn normal(&self) -> &[f64] {
        &self.normal
    }

    /// Offset from the origin along the normal.
    #[must_use]
    pub const fn offset(&self) -> f64 {
        self.offset
    }

    /// Dimension of the ambient space.
    #[must_use]
    pub fn dim(&self) -> usize {
        self.normal.len()
    }

    /// Signed distance of `point` (positive above the plane).
    #[inline]
    #[must_use]
    pub fn distance(&self, point: &[f64]) -> f64 {
        dot(&self.normal, point) + self.offset
    }

    /// Reverses the orientation.
    pub fn flip(&mut self) {
        for c in &mut self.normal {
            *c = -*c;
        }
        self.offset = -self.offset;
    }

    /// Cosine of the angle between the two normals.
    #[must_use]
    pub fn cos_angle(&self, other: &Self) -> f64 {
        dot(&self.normal, &other.normal)
    }

    /// Orthogonal projection of `point` onto the plane.
    #[must_use]
    pub fn project(&self, point: &[f64]) -> Vec<f64> {
        let dist = self.distance(point);
        point
            .iter()
            .zip(&self.normal)
            .map(|(p, n)| dist.mul_add(-n, *p))
            .collect()
    }

    /// Centrum of a facet: the centroid of its vertices projected onto the plane.
    #[must_use]
    pub fn centrum<'a, I>(&self, vertices: I) -> Vec<f64>
    where
        I: IntoIterator<Item = &'a [f64]>,
    {
        self.project(&centroid(vertices, self.dim()))
    }
}

/// Dot product of two equally long slices.
#[inline]
#[must_use]
pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Arithmetic mean of `points`; the origin for an empty iterator.
#[must_use]
pub fn centroid<'a, I>(points: I, dim: usize) -> Vec<f64>
where
    I: IntoIterator<Item = &'a [f64]>,
{
    let mut sum = vec![0.0; dim];
    let mut count = 0_usize;
    for point in points {
        for (s, c) in sum.iter_mut().zip(point) {
            *s += c;
        }
        count += 1;
    }
    if count > 0 {
        let scale = 1.0 / count_as_f64(count);
        for s in &mut sum {
            *s *= scale;
        }
    }
    sum
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_fit_line_in_2d_orients_away_from_interior() {
        let a = [0.0, 1.0];
        let b = [1.0, 1.0];
        let fitted = Hyperplane::fit(&[&a[..], &b[..]], &[0.5, 0.0], 1e-14).unwrap();

        assert!(!fitted.flipped);
        assert_relative_eq!(fitted.plane.normal()[0], 0.0, epsilon = 1e-12);
        assert_relative_eq!(fitted.plane.normal()[1], 1.0, epsilon = 1e-12);
        assert_relative_eq!(fitted.interior_distance, -1.0, epsilon = 1e-12);
        assert_relative_eq!(fitted.plane.distance(&[3.0, 2.5]), 1.5, epsilon = 1e-12);
    }

    #[test]
    fn test_fit_least_squares_through_merged_vertices() {
        // Four nearly coplanar points on z = 2
        let pts = [
            [0.0, 0.0, 2.0],
            [1.0, 0.0, 2.0 + 1e-9],
            [1.0, 1.0, 2.0],
            [0.0, 1.0, 2.0 - 1e-9],
        ];
        let refs: Vec<&[f64]> = pts.iter().map(|p| &p[..]).collect();
        let fitted = Hyperplane::fit(&refs, &[0.5, 0.5, 0.0], 1e-14).unwrap();

        assert_relative_eq!(fitted.plane.normal()[2], 1.0, epsilon = 1e-6);
        for p in &pts {
            assert!(fitted.plane.distance(p).abs() < 1e-8);
        }
    }

    #[test]
    fn test_fit_rejects_collinear_points_in_3d() {
        let pts = [[0.0, 0.0, 0.0], [1.0, 1.0, 1.0], [2.0, 2.0, 2.0]];
        let refs: Vec<&[f64]> = pts.iter().map(|p| &p[..]).collect();
        let err = Hyperplane::fit(&refs, &[0.0, 1.0, 0.0], 1e-14).unwrap_err();

        match err {
            GeometryError::Degenerate {
                points, expected, ..
            } => {
                assert_eq!(points, 3);
                assert_eq!(expected, 2);
            }
            other => panic!("Expected Degenerate error, got {other:?}"),
        }
    }

    #[test]
    fn test_fit_rejects_too_few_points() {
        let a = [0.0, 0.0, 0.0];
        let err = Hyperplane::fit(&[&a[..]], &[1.0, 1.0, 1.0], 1e-14).unwrap_err();
        assert!(matches!(
            err,
            GeometryError::TooFewPoints {
                actual: 1,
                expected: 3,
                dimension: 3
            }
        ));
    }

    #[test]
    fn test_fit_flags_interior_point_on_plane() {
        let a = [0.0, 0.0];
        let b = [1.0, 0.0];
        let fitted = Hyperplane::fit(&[&a[..], &b[..]], &[0.5, 0.0], 1e-14).unwrap();
        assert!(fitted.flipped);
    }

    #[test]
    fn test_project_and_centrum() {
        let plane = Hyperplane::new(vec![0.0, 0.0, 2.0], -2.0).unwrap();
        assert_relative_eq!(plane.offset(), -1.0);

        let projected = plane.project(&[3.0, 4.0, 7.0]);
        assert_relative_eq!(projected[0], 3.0);
        assert_relative_eq!(projected[1], 4.0);
        assert_relative_eq!(projected[2], 1.0);

        let pts = [[0.0, 0.0, 1.5], [2.0, 0.0, 0.5], [0.0, 2.0, 1.0]];
        let centrum = plane.centrum(pts.iter().map(|p| &p[..]));
        assert_relative_eq!(centrum[0], 2.0 / 3.0);
        assert_relative_eq!(centrum[1], 2.0 / 3.0);
        assert_relative_eq!(centrum[2], 1.0);
    }

    #[test]
    fn test_new_rejects_zero_normal() {
        assert!(matches!(
            Hyperplane::new(vec![0.0, 0.0], 1.0),
            Err(GeometryError::NumericFailure { .. })
        ));
    }

    #[test]
    fn test_cos_angle_and_flip() {
        let mut a = Hyperplane::new(vec![1.0, 0.0], 0.0).unwrap();
        let b = Hyperplane::new(vec![1.0, 1.0], 0.0).unwrap();
        assert_relative_eq!(a.cos_angle(&b), std::f64::consts::FRAC_1_SQRT_2, epsilon = 1e-12);
        a.flip();
        assert_relative_eq!(a.normal()[0], -1.0);
    }
}
