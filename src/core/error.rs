//! Error taxonomy of a hull computation.
//!
//! Every failure that reaches the caller is one of the five kinds below. Each
//! kind carries the integer status the Qhull family of tools reports for it, so
//! a command-line or reporting layer can translate it without inspecting the
//! message.

use std::collections::TryReserveError;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::hyperplane::GeometryError;

/// Category of a [`HullError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HullErrorKind {
    /// Bad input: too few points, wrong dimension, inconsistent options.
    Input,
    /// The input lies in a lower-dimensional subspace.
    SingularInput,
    /// Convexity could not be restored within tolerance.
    Precision,
    /// Duplicate ridge or pinched vertex resolution failed.
    Topology,
    /// An allocation failed.
    OutOfMemory,
}

impl HullErrorKind {
    /// Integer exit status for this kind of failure.
    ///
    /// # Examples
    ///
    /// ```
    /// use quickhull_nd::core::error::HullErrorKind;
    ///
    /// assert_eq!(HullErrorKind::Input.exit_code(), 1);
    /// assert_eq!(HullErrorKind::Topology.exit_code(), 7);
    /// ```
    #[must_use]
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::Input => 1,
            Self::SingularInput => 2,
            Self::Precision => 3,
            Self::OutOfMemory => 4,
            Self::Topology => 7,
        }
    }
}

/// Errors surfaced by a hull computation.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum HullError {
    /// Bad input or an inconsistent option combination.
    #[error("Input error: {message}")]
    Input {
        /// Description of the problem.
        message: String,
    },
    /// No non-degenerate initial simplex exists.
    #[error("Singular input: {message}")]
    SingularInput {
        /// Description of the problem.
        message: String,
    },
    /// Convexity could not be restored, or a flipped facet survived.
    #[error("Precision error: {message}")]
    Precision {
        /// Description of the problem.
        message: String,
    },
    /// Duplicate ridge or pinched vertex resolution failed.
    #[error("Topology error: {message}")]
    Topology {
        /// Description of the problem.
        message: String,
    },
    /// An allocation failed.
    #[error("Out of memory: {message}")]
    OutOfMemory {
        /// Description of the problem.
        message: String,
    },
}

impl HullError {
    /// Category of this error.
    #[must_use]
    pub const fn kind(&self) -> HullErrorKind {
        match self {
            Self::Input { .. } => HullErrorKind::Input,
            Self::SingularInput { .. } => HullErrorKind::SingularInput,
            Self::Precision { .. } => HullErrorKind::Precision,
            Self::Topology { .. } => HullErrorKind::Topology,
            Self::OutOfMemory { .. } => HullErrorKind::OutOfMemory,
        }
    }

    /// Integer exit status, see [`HullErrorKind::exit_code`].
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        self.kind().exit_code()
    }

    /// Whether a rerun with joggled input may succeed.
    #[must_use]
    pub const fn is_joggle_recoverable(&self) -> bool {
        matches!(self, Self::SingularInput { .. } | Self::Precision { .. })
    }

    /// The message without the kind prefix.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Input { message }
            | Self::SingularInput { message }
            | Self::Precision { message }
            | Self::Topology { message }
            | Self::OutOfMemory { message } => message,
        }
    }

    pub(crate) fn input(message: impl Into<String>) -> Self {
        Self::Input {
            message: message.into(),
        }
    }

    pub(crate) fn singular(message: impl Into<String>) -> Self {
        Self::SingularInput {
            message: message.into(),
        }
    }

    pub(crate) fn precision(message: impl Into<String>) -> Self {
        Self::Precision {
            message: message.into(),
        }
    }

    pub(crate) fn topology(message: impl Into<String>) -> Self {
        Self::Topology {
            message: message.into(),
        }
    }
}

impl From<GeometryError> for HullError {
    fn from(source: GeometryError) -> Self {
        Self::precision(source.to_string())
    }
}

impl From<TryReserveError> for HullError {
    fn from(source: TryReserveError) -> Self {
        Self::OutOfMemory {
            message: source.to_string(),
        }
    }
}
