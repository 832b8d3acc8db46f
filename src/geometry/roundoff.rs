//! Roundoff bounds and the merge tolerances derived from them.
//!
//! Every outside, coplanar and convexity decision in the builder compares a
//! signed distance against one of the thresholds in [`Precision`], never
//! against zero. The thresholds are all multiples of [`dist_round`], the
//! worst-case error of a single point-to-hyperplane distance.

use serde::{Deserialize, Serialize};

use super::measures::count_as_f64;

/// Ratio of the visibility threshold to the premerge centrum radius.
pub const COPLANAR_RATIO: f64 = 3.0;

/// Multiple of `DISTround` added to the user centrum radius.
pub const CENTRUM_ROUNDOFF_RATIO: f64 = 2.0;

/// Bound on the roundoff error of one signed distance computation.
///
/// `max_abs` is the largest absolute coordinate and `max_sum_abs` the largest
/// per-point sum of absolute coordinates.
///
/// # Examples
///
/// ```
/// use quickhull_nd::geometry::roundoff::dist_round;
///
/// let bound = dist_round(3, 1.0, 3.0);
/// assert!(bound > 0.0);
/// assert!(bound < 1e-14);
/// ```
#[must_use]
pub fn dist_round(dimension: usize, max_abs: f64, max_sum_abs: f64) -> f64 {
    let dim = count_as_f64(dimension);
    let max_dist_sum = (dim.sqrt() * max_abs).min(max_sum_abs);
    f64::EPSILON * dim.mul_add(max_dist_sum * 1.01, max_abs)
}

/// Numeric tolerances for one hull computation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Precision {
    /// Roundoff bound of a signed distance.
    pub dist_round: f64,
    /// Roundoff bound of the cosine between two unit normals.
    pub angle_round: f64,
    /// Centrum radius for merges during construction.
    pub premerge_centrum: f64,
    /// Centrum radius for the final merge pass.
    pub postmerge_centrum: f64,
    /// A point is visible from a facet when it is further than this above it.
    pub min_visible: f64,
    /// A point within this distance below a facet is coplanar with it.
    pub max_coplanar: f64,
    /// A point further than this above a facet joins its outside set.
    pub min_outside: f64,
    /// Largest absolute coordinate of the input.
    pub max_abs_coord: f64,
    /// Largest coordinate range over all axes.
    pub max_width: f64,
}

impl Precision {
    /// Derives the tolerances for a point set with the given bounds.
    ///
    /// Without merging, visibility and coplanarity fall back to the plain
    /// roundoff bound. With merging, the centrum radii are the user values plus
    /// twice the roundoff bound and visibility is [`COPLANAR_RATIO`] times the
    /// premerge radius.
    #[must_use]
    pub fn new(
        dimension: usize,
        bounds: CoordinateBounds,
        merging: bool,
        premerge_centrum: f64,
        postmerge_centrum: f64,
    ) -> Self {
        let dist_round = dist_round(dimension, bounds.max_abs, bounds.max_sum_abs);
        let angle_round = f64::EPSILON * (count_as_f64(dimension) + 1.0);
        let premerge = CENTRUM_ROUNDOFF_RATIO.mul_add(dist_round, premerge_centrum.max(0.0));
        let postmerge = CENTRUM_ROUNDOFF_RATIO.mul_add(dist_round, postmerge_centrum.max(0.0));
        let min_visible = if merging {
            COPLANAR_RATIO * premerge
        } else {
            dist_round
        };

        Self {
            dist_round,
            angle_round,
            premerge_centrum: premerge,
            postmerge_centrum: postmerge,
            min_visible,
            max_coplanar: min_visible,
            min_outside: min_visible,
            max_abs_coord: bounds.max_abs,
            max_width: bounds.max_width,
        }
    }

    /// Tolerance below which an initial simplex is considered flat.
    #[must_use]
    pub fn flat_simplex_tolerance(&self) -> f64 {
        10.0 * self.dist_round
    }
}

/// Coordinate magnitudes of a point set, the inputs of [`dist_round`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CoordinateBounds {
    /// Largest absolute coordinate.
    pub max_abs: f64,
    /// Largest per-point sum of absolute coordinates.
    pub max_sum_abs: f64,
    /// Largest range (max minus min) over all coordinate axes.
    pub max_width: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_dist_round_scales_with_magnitude() {
        let unit = dist_round(3, 1.0, 3.0);
        let large = dist_round(3, 1000.0, 3000.0);
        assert_relative_eq!(large / unit, 1000.0, epsilon = 1e-9);
    }

    #[test]
    fn test_dist_round_uses_smaller_of_sum_and_norm_bound() {
        // sqrt(4) * 1.0 = 2.0 is smaller than the per-point sum 4.0
        let norm_bound = dist_round(4, 1.0, 4.0);
        let sum_bound = dist_round(4, 1.0, 1.5);
        assert!(sum_bound < norm_bound);
    }

    #[test]
    fn test_precision_thresholds_without_merging() {
        let bounds = CoordinateBounds {
            max_abs: 1.0,
            max_sum_abs: 2.0,
            max_width: 1.0,
        };
        let precision = Precision::new(2, bounds, false, 0.0, 0.0);
        assert_relative_eq!(precision.min_visible, precision.dist_round);
        assert_relative_eq!(precision.max_coplanar, precision.dist_round);
    }

    #[test]
    fn test_precision_thresholds_with_merging() {
        let bounds = CoordinateBounds {
            max_abs: 1.0,
            max_sum_abs: 2.0,
            max_width: 1.0,
        };
        let precision = Precision::new(2, bounds, true, 0.01, 0.02);
        assert_relative_eq!(
            precision.premerge_centrum,
            0.01 + 2.0 * precision.dist_round
        );
        assert_relative_eq!(
            precision.postmerge_centrum,
            0.02 + 2.0 * precision.dist_round
        );
        assert_relative_eq!(precision.min_visible, 3.0 * precision.premerge_centrum);
        assert!(precision.min_visible > precision.dist_round);
    }
}
