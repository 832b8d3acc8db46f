//! Configuration of a hull computation.
//!
//! [`HullOptions`] is a plain record with serde support; [`HullOptionsBuilder`]
//! (generated by `derive_builder`) fills unset fields from
//! [`HullOptions::default`] and rejects inconsistent combinations.
//!
//! # Examples
//!
//! ```
//! use quickhull_nd::core::options::{HullOptionsBuilder, MergeMode, PointSelection};
//!
//! let options = HullOptionsBuilder::default()
//!     .merge_mode(MergeMode::Both)
//!     .point_selection(PointSelection::Furthest)
//!     .postmerge_centrum(1e-6)
//!     .build()
//!     .unwrap();
//! assert_eq!(options.merge_mode, MergeMode::Both);
//! assert!(options.merge_mode.merges());
//! ```

use serde::{Deserialize, Serialize};

use super::error::HullError;

// =============================================================================
// MODES
// =============================================================================

/// When facets are merged to restore convexity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MergeMode {
    /// Never merge; any flipped facet or duplicate ridge is an error.
    None,
    /// Merge non-convex facets as each point is added.
    #[default]
    Pre,
    /// Merge once after all points have been added.
    Post,
    /// Both during construction and in a final pass.
    Both,
}

impl MergeMode {
    /// Whether any merging happens at all.
    #[must_use]
    pub const fn merges(self) -> bool {
        !matches!(self, Self::None)
    }

    /// Whether non-convex facets are merged during construction.
    #[must_use]
    pub const fn premerges(self) -> bool {
        matches!(self, Self::Pre | Self::Both)
    }

    /// Whether a final merge pass runs after construction.
    #[must_use]
    pub const fn postmerges(self) -> bool {
        matches!(self, Self::Post | Self::Both)
    }
}

/// How the `D+1` points of the initial simplex are searched.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SimplexSearch {
    /// Only points extreme in some coordinate, unless they are nearly flat.
    #[default]
    Heuristic,
    /// All points.
    Exhaustive,
}

/// Which outside point is added next.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PointSelection {
    /// Furthest point of the first facet (in creation order) with outside points.
    #[default]
    FirstAvailable,
    /// Furthest outside point over all facets.
    Furthest,
}

/// Severity measure used to order merges of the same kind.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MergeOrdering {
    /// Centrum distances.
    #[default]
    Distance,
    /// `1 - cos` of the angle between normals.
    Angle,
}

// =============================================================================
// JOGGLE
// =============================================================================

/// Retry precision failures with randomly perturbed input.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JoggleOptions {
    /// Maximum number of joggled reruns.
    pub max_attempts: usize,
    /// Initial perturbation; `None` derives it from the input width.
    pub amount: Option<f64>,
    /// Reruns before the amount grows tenfold.
    pub retries_per_amount: usize,
    /// Seed of the perturbation generator.
    pub seed: u64,
}

impl Default for JoggleOptions {
    fn default() -> Self {
        Self {
            max_attempts: 50,
            amount: None,
            retries_per_amount: 2,
            seed: 0,
        }
    }
}

// =============================================================================
// OUTPUT SELECTION
// =============================================================================

/// Facet selection by visibility from an input point.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GoodPointRule {
    /// Good facets are visible from the point.
    VisibleFrom(usize),
    /// Good facets are not visible from the point.
    HiddenFrom(usize),
}

impl GoodPointRule {
    /// Index of the point.
    #[must_use]
    pub const fn point(self) -> usize {
        match self {
            Self::VisibleFrom(p) | Self::HiddenFrom(p) => p,
        }
    }
}

/// Facet selection by incidence with an input point.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GoodVertexRule {
    /// Good facets have the point as a vertex.
    Includes(usize),
    /// Good facets do not have the point as a vertex.
    Excludes(usize),
}

impl GoodVertexRule {
    /// Index of the point.
    #[must_use]
    pub const fn point(self) -> usize {
        match self {
            Self::Includes(p) | Self::Excludes(p) => p,
        }
    }
}

/// Bound on one coordinate of a facet's unit normal.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum NormalThreshold {
    /// `normal[coordinate] >= bound`.
    AtLeast {
        /// Normal coordinate.
        coordinate: usize,
        /// Lower bound.
        bound: f64,
    },
    /// `normal[coordinate] <= bound`.
    AtMost {
        /// Normal coordinate.
        coordinate: usize,
        /// Upper bound.
        bound: f64,
    },
}

impl NormalThreshold {
    /// Normal coordinate the bound applies to.
    #[must_use]
    pub const fn coordinate(&self) -> usize {
        match self {
            Self::AtLeast { coordinate, .. } | Self::AtMost { coordinate, .. } => *coordinate,
        }
    }

    /// Whether `normal` satisfies the bound.
    #[must_use]
    pub fn accepts(&self, normal: &[f64]) -> bool {
        match *self {
            Self::AtLeast { coordinate, bound } => {
                normal.get(coordinate).is_some_and(|&c| c >= bound)
            }
            Self::AtMost { coordinate, bound } => {
                normal.get(coordinate).is_some_and(|&c| c <= bound)
            }
        }
    }
}

/// Rules that mark facets as good; all given rules must hold.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FacetSelection {
    /// Report only good facets.
    pub only_good: bool,
    /// Visibility rule; the point is left out of the hull.
    pub good_point: Option<GoodPointRule>,
    /// Incidence rule.
    pub good_vertex: Option<GoodVertexRule>,
    /// Normal coordinate bounds.
    pub thresholds: Vec<NormalThreshold>,
}

impl FacetSelection {
    /// Whether any rule is set.
    #[must_use]
    pub const fn has_rules(&self) -> bool {
        self.good_point.is_some() || self.good_vertex.is_some() || !self.thresholds.is_empty()
    }
}

// =============================================================================
// HULL OPTIONS
// =============================================================================

/// Options of one hull computation.
#[derive(Builder, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[builder(default, build_fn(validate = "Self::validate", error = "HullError"))]
pub struct HullOptions {
    /// When to merge non-convex facets.
    pub merge_mode: MergeMode,
    /// Initial simplex search.
    pub simplex_search: SimplexSearch,
    /// Order in which outside points are added.
    pub point_selection: PointSelection,
    /// Severity measure for merges.
    pub merge_order: MergeOrdering,
    /// Extra centrum radius for merges during construction (`C-n`).
    pub premerge_centrum: f64,
    /// Extra centrum radius for the final merge pass (`Cn`).
    pub postmerge_centrum: f64,
    /// Keep coplanar points with their nearest facet.
    pub keep_coplanar: bool,
    /// Keep interior points with their nearest facet.
    pub keep_inside: bool,
    /// Attempts to resolve a pinched horizon before giving up.
    pub max_pinch_retries: usize,
    /// Rerun with perturbed input on precision failures.
    #[builder(setter(strip_option))]
    pub joggle: Option<JoggleOptions>,
    /// Good facet rules.
    pub selection: FacetSelection,
    /// The points are lifted onto a paraboloid.
    pub delaunay: bool,
    /// With `delaunay`, the upper facets are the good ones.
    pub upper_delaunay: bool,
    /// With `delaunay`, add a point above the paraboloid so cospherical
    /// inputs do not produce a flat lower hull.
    pub point_at_infinity: bool,
    /// Validate the finished hull before returning it.
    pub check_output: bool,
}

impl Default for HullOptions {
    fn default() -> Self {
        Self {
            merge_mode: MergeMode::default(),
            simplex_search: SimplexSearch::default(),
            point_selection: PointSelection::default(),
            merge_order: MergeOrdering::default(),
            premerge_centrum: 0.0,
            postmerge_centrum: 0.0,
            keep_coplanar: false,
            keep_inside: false,
            max_pinch_retries: 8,
            joggle: None,
            selection: FacetSelection::default(),
            delaunay: false,
            upper_delaunay: false,
            point_at_infinity: false,
            check_output: false,
        }
    }
}

impl HullOptions {
    /// Checks option combinations that do not depend on the input.
    ///
    /// # Errors
    ///
    /// Returns [`HullError::Input`] for a negative or non-finite centrum
    /// radius, joggle combined with merging, a joggle without attempts, or
    /// Delaunay-only options on a plain hull.
    pub fn validate(&self) -> Result<(), HullError> {
        for (name, value) in [
            ("premerge_centrum", self.premerge_centrum),
            ("postmerge_centrum", self.postmerge_centrum),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(HullError::input(format!(
                    "{name} must be a non-negative finite distance, got {value}"
                )));
            }
        }
        if let Some(joggle) = &self.joggle {
            if self.merge_mode.merges() {
                return Err(HullError::input(
                    "joggle cannot be combined with merging; set merge_mode to None",
                ));
            }
            if joggle.max_attempts == 0 || joggle.retries_per_amount == 0 {
                return Err(HullError::input(
                    "joggle needs positive max_attempts and retries_per_amount",
                ));
            }
            if joggle.amount.is_some_and(|a| !a.is_finite() || a <= 0.0) {
                return Err(HullError::input("joggle amount must be positive"));
            }
        }
        if !self.delaunay && (self.upper_delaunay || self.point_at_infinity) {
            return Err(HullError::input(
                "upper_delaunay and point_at_infinity require Delaunay mode",
            ));
        }
        Ok(())
    }

    /// Checks the options against the input dimension and point count.
    ///
    /// # Errors
    ///
    /// Returns [`HullError::Input`] for a good point or good vertex out of
    /// range and a threshold on a coordinate the normals do not have.
    pub fn validate_for_input(&self, dim: usize, num_points: usize) -> Result<(), HullError> {
        self.validate()?;
        let point_rules = self
            .selection
            .good_point
            .map(GoodPointRule::point)
            .into_iter()
            .chain(self.selection.good_vertex.map(GoodVertexRule::point));
        for point in point_rules {
            if point >= num_points {
                return Err(HullError::input(format!(
                    "good facet rule refers to point {point}, but only {num_points} points were given"
                )));
            }
        }
        if let Some(threshold) = self
            .selection
            .thresholds
            .iter()
            .find(|t| t.coordinate() >= dim)
        {
            return Err(HullError::input(format!(
                "normal threshold on coordinate {} of a {dim}-dimensional hull",
                threshold.coordinate()
            )));
        }
        Ok(())
    }
}

impl HullOptionsBuilder {
    fn validate(&self) -> Result<(), HullError> {
        // Fields left unset fall back to the defaults, which are consistent.
        let defaults = HullOptions::default();
        let options = HullOptions {
            merge_mode: self.merge_mode.unwrap_or(defaults.merge_mode),
            premerge_centrum: self.premerge_centrum.unwrap_or(defaults.premerge_centrum),
            postmerge_centrum: self.postmerge_centrum.unwrap_or(defaults.postmerge_centrum),
            joggle: self.joggle.clone().unwrap_or(defaults.joggle),
            delaunay: self.delaunay.unwrap_or(defaults.delaunay),
            upper_delaunay: self.upper_delaunay.unwrap_or(defaults.upper_delaunay),
            point_at_infinity: self.point_at_infinity.unwrap_or(defaults.point_at_infinity),
            ..defaults
        };
        options.validate()
    }
}

impl From<derive_builder::UninitializedFieldError> for HullError {
    fn from(source: derive_builder::UninitializedFieldError) -> Self {
        Self::input(source.to_string())
    }
}
