//! Simplex measures via Gram determinants.
//!
//! The `k`-dimensional measure of a simplex with `k+1` vertices embedded in
//! `D`-space is `sqrt(det(G)) / k!`, where `G = E E^T` and the rows of `E` are
//! the edge vectors from the first vertex. This works for facet areas (`k =
//! D-1`) and full-dimensional volumes (`k = D`) alike.

use nalgebra::DMatrix;
use num_traits::cast;

use super::hyperplane::GeometryError;

/// Measure of the simplex spanned by `points` (length of a segment, area of a
/// triangle, volume of a tetrahedron, ...), in any ambient dimension.
///
/// A single point has measure `1`, matching the empty product. A degenerate
/// simplex has measure `0`.
///
/// # Errors
///
/// Returns [`GeometryError::NumericFailure`] if the points have mismatched
/// dimensions, more vertices than the ambient space allows, or non-finite
/// coordinates.
///
/// # Examples
///
/// ```
/// use quickhull_nd::geometry::measures::simplex_measure;
/// use approx::assert_relative_eq;
///
/// // Triangle in 3D with legs of length 1
/// let a = [0.0, 0.0, 5.0];
/// let b = [1.0, 0.0, 5.0];
/// let c = [0.0, 1.0, 5.0];
/// let area = simplex_measure(&[&a[..], &b[..], &c[..]]).unwrap();
/// assert_relative_eq!(area, 0.5, epsilon = 1e-12);
/// ```
pub fn simplex_measure(points: &[&[f64]]) -> Result<f64, GeometryError> {
    let Some((origin, rest)) = points.split_first() else {
        return Err(GeometryError::NumericFailure {
            details: "simplex measure of an empty point list".to_string(),
        });
    };
    let dim = origin.len();
    let k = rest.len();
    if k == 0 {
        return Ok(1.0);
    }
    if k > dim || rest.iter().any(|p| p.len() != dim) {
        return Err(GeometryError::NumericFailure {
            details: format!("{} points do not form a simplex in {dim}D", points.len()),
        });
    }

    let edges = DMatrix::from_fn(k, dim, |row, col| rest[row][col] - origin[col]);
    let gram = &edges * edges.transpose();
    let det = gram.determinant();
    if !det.is_finite() {
        return Err(GeometryError::NumericFailure {
            details: "Gram determinant is non-finite".to_string(),
        });
    }

    Ok(det.max(0.0).sqrt() / factorial(k))
}

/// `n!` as a float.
#[must_use]
pub fn factorial(n: usize) -> f64 {
    (2..=n).fold(1.0, |acc, i| acc * count_as_f64(i))
}

/// Converts a count (dimension, number of points) to `f64`.
#[inline]
#[must_use]
pub fn count_as_f64(n: usize) -> f64 {
    cast::<usize, f64>(n).unwrap_or(f64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_segment_length_in_3d() {
        let a = [1.0, 2.0, 3.0];
        let b = [4.0, 6.0, 3.0];
        assert_relative_eq!(simplex_measure(&[&a[..], &b[..]]).unwrap(), 5.0, epsilon = 1e-12);
    }

    #[test]
    fn test_tetrahedron_volume() {
        let pts = [
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
        ];
        let refs: Vec<&[f64]> = pts.iter().map(|p| &p[..]).collect();
        assert_relative_eq!(simplex_measure(&refs).unwrap(), 1.0 / 6.0, epsilon = 1e-12);
    }

    #[test]
    fn test_degenerate_simplex_has_zero_measure() {
        let pts = [[0.0, 0.0], [1.0, 1.0], [2.0, 2.0]];
        let refs: Vec<&[f64]> = pts.iter().map(|p| &p[..]).collect();
        assert!(simplex_measure(&refs).unwrap() < 1e-12);
    }

    #[test]
    fn test_single_point_and_errors() {
        let a = [3.0, 4.0];
        assert_relative_eq!(simplex_measure(&[&a[..]]).unwrap(), 1.0);
        assert!(simplex_measure(&[]).is_err());

        let b = [1.0, 0.0];
        let c = [0.0, 1.0];
        let d = [1.0, 1.0];
        assert!(simplex_measure(&[&a[..], &b[..], &c[..], &d[..]]).is_err());
    }

    #[test]
    fn test_factorial() {
        assert_relative_eq!(factorial(0), 1.0);
        assert_relative_eq!(factorial(1), 1.0);
        assert_relative_eq!(factorial(5), 120.0);
    }
}
