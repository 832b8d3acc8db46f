//! Owned, immutable point storage.
//!
//! The hull graph refers to points by index only. A [`PointSet`] keeps the
//! coordinates of all points contiguously (`num_points x dim`), which is also
//! where lifted (Delaunay), dual (half-space) and joggled coordinates live.

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::error::HullError;
use crate::geometry::hyperplane::centroid;
use crate::geometry::roundoff::CoordinateBounds;

/// Point coordinates stored row by row.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PointSet {
    dim: usize,
    coords: Vec<f64>,
}

impl PointSet {
    /// Wraps a flat coordinate array of `coords.len() / dim` points.
    ///
    /// # Errors
    ///
    /// Returns [`HullError::Input`] if `dim` is zero, the length is not a
    /// multiple of `dim`, or a coordinate is not finite.
    ///
    /// # Examples
    ///
    /// ```
    /// use quickhull_nd::core::points::PointSet;
    ///
    /// let points = PointSet::new(2, vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0]).unwrap();
    /// assert_eq!(points.len(), 3);
    /// assert_eq!(points.point(1), &[1.0, 0.0]);
    /// ```
    pub fn new(dim: usize, coords: Vec<f64>) -> Result<Self, HullError> {
        if dim == 0 {
            return Err(HullError::input("point dimension must be positive"));
        }
        if coords.len() % dim != 0 {
            return Err(HullError::input(format!(
                "{} coordinates do not divide into points of dimension {dim}",
                coords.len()
            )));
        }
        if let Some(position) = coords.iter().position(|c| !c.is_finite()) {
            return Err(HullError::input(format!(
                "coordinate {} of point {} is not finite",
                position % dim,
                position / dim
            )));
        }
        Ok(Self { dim, coords })
    }

    /// Builds a point set from equally long rows.
    ///
    /// # Errors
    ///
    /// Returns [`HullError::Input`] for an empty slice, rows of different
    /// lengths or non-finite coordinates.
    pub fn from_rows<R: AsRef<[f64]>>(rows: &[R]) -> Result<Self, HullError> {
        let Some(first) = rows.first() else {
            return Err(HullError::input("no points given"));
        };
        let dim = first.as_ref().len();
        let mut coords = Vec::new();
        coords.try_reserve_exact(rows.len() * dim)?;
        for (index, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.len() != dim {
                return Err(HullError::input(format!(
                    "point {index} has dimension {}, expected {dim}",
                    row.len()
                )));
            }
            coords.extend_from_slice(row);
        }
        Self::new(dim, coords)
    }

    /// Dimension of every point.
    #[must_use]
    pub const fn dim(&self) -> usize {
        self.dim
    }

    /// Number of points.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.coords.len() / self.dim
    }

    /// Whether the set holds no points.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    /// Coordinates of point `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    #[must_use]
    pub fn point(&self, index: usize) -> &[f64] {
        &self.coords[index * self.dim..(index + 1) * self.dim]
    }

    /// Coordinates of point `index`, or `None` if out of range.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&[f64]> {
        (index < self.len()).then(|| self.point(index))
    }

    /// Iterates over all points in index order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &[f64]> + '_ {
        self.coords.chunks_exact(self.dim)
    }

    /// Coordinate magnitudes used for the roundoff bound.
    #[must_use]
    pub fn bounds(&self) -> CoordinateBounds {
        let mut bounds = CoordinateBounds::default();
        let mut min = vec![f64::INFINITY; self.dim];
        let mut max = vec![f64::NEG_INFINITY; self.dim];
        for point in self.iter() {
            let mut sum = 0.0;
            for (axis, &c) in point.iter().enumerate() {
                bounds.max_abs = bounds.max_abs.max(c.abs());
                sum += c.abs();
                min[axis] = min[axis].min(c);
                max[axis] = max[axis].max(c);
            }
            bounds.max_sum_abs = bounds.max_sum_abs.max(sum);
        }
        bounds.max_width = min
            .iter()
            .zip(&max)
            .map(|(lo, hi)| hi - lo)
            .filter(|w| w.is_finite())
            .fold(0.0, f64::max);
        bounds
    }

    /// Returns a copy with every coordinate moved by a uniform random amount
    /// in `[-amount, amount]`.
    ///
    /// # Errors
    ///
    /// Returns [`HullError::OutOfMemory`] if the copy cannot be allocated.
    pub fn joggled<R: Rng>(&self, amount: f64, rng: &mut R) -> Result<Self, HullError> {
        let mut coords = Vec::new();
        coords.try_reserve_exact(self.coords.len())?;
        coords.extend(
            self.coords
                .iter()
                .map(|c| c + rng.random_range(-amount..=amount)),
        );
        Ok(Self {
            dim: self.dim,
            coords,
        })
    }

    /// Lifts every point onto the paraboloid `z = |x|^2` in one more
    /// dimension.
    ///
    /// With `at_infinity`, one extra point at the centroid is appended above
    /// the paraboloid, a tenth of the lifted height range over the highest
    /// point (or `1.0` above it when all points are at the same height).
    ///
    /// # Errors
    ///
    /// Returns [`HullError::OutOfMemory`] if the copy cannot be allocated.
    ///
    /// # Examples
    ///
    /// ```
    /// use quickhull_nd::core::points::PointSet;
    ///
    /// let points = PointSet::from_rows(&[[1.0, 2.0], [0.0, 0.0]]).unwrap();
    /// let lifted = points.lifted(false).unwrap();
    /// assert_eq!(lifted.dim(), 3);
    /// assert_eq!(lifted.point(0), &[1.0, 2.0, 5.0]);
    /// ```
    pub fn lifted(&self, at_infinity: bool) -> Result<Self, HullError> {
        let dim = self.dim + 1;
        let count = self.len() + usize::from(at_infinity);
        let mut coords = Vec::new();
        coords.try_reserve_exact(count * dim)?;
        let (mut low, mut high) = (f64::INFINITY, f64::NEG_INFINITY);
        for point in self.iter() {
            let height: f64 = point.iter().map(|c| c * c).sum();
            low = low.min(height);
            high = high.max(height);
            coords.extend_from_slice(point);
            coords.push(height);
        }
        if at_infinity && !self.is_empty() {
            coords.extend(centroid(self.iter(), self.dim));
            let spread = high - low;
            coords.push(if spread > 0.0 {
                0.1f64.mul_add(spread, high)
            } else {
                high + 1.0
            });
        }
        Self::new(dim, coords)
    }
}
