//! Lifecycle of a hull computation: run, unwind, reset and joggle reruns.
//!
//! A context runs once. The input points are checkpointed when the context is
//! created; a failed build clears every partially built structure and leaves
//! the context in `Failed(kind)` until [`HullContext::reset`] restores the
//! checkpoint. With joggle enabled, singular and precision failures trigger
//! reruns on perturbed copies of the checkpoint, each attempt starting from a
//! clean graph.

use rand::SeedableRng;
use rand::rngs::StdRng;

use super::context::{ContextState, HullContext, HullCounters};
use super::error::HullError;
use super::options::JoggleOptions;

/// Default initial joggle as a multiple of `eps * width`.
pub const JOGGLE_DEFAULT_RATIO: f64 = 30_000.0;

/// Largest joggle as a fraction of the input width.
pub const JOGGLE_MAX_RATIO: f64 = 1e-2;

/// Growth of the joggle amount after `retries_per_amount` reruns.
pub const JOGGLE_GROWTH: f64 = 10.0;

impl HullContext {
    /// Builds the hull.
    ///
    /// # Errors
    ///
    /// Returns [`HullError::Input`] if the context already ran, otherwise the
    /// error of the failed build (after the joggle budget, if enabled). The
    /// context is then `Failed` and must be [`reset`](Self::reset) before it
    /// can run again.
    ///
    /// # Examples
    ///
    /// ```
    /// use quickhull_nd::prelude::*;
    ///
    /// let points = PointSet::from_rows(&[[0.0, 0.0], [2.0, 0.0], [0.0, 2.0], [0.5, 0.5]]).unwrap();
    /// let mut context = HullContext::new(points, HullOptions::default()).unwrap();
    /// context.run().unwrap();
    /// assert_eq!(context.state(), ContextState::Finished);
    /// assert!(context.run().is_err());
    /// ```
    pub fn run(&mut self) -> Result<(), HullError> {
        if self.state != ContextState::Uninitialized {
            return Err(HullError::input(format!(
                "context is {:?}; reset it before running again",
                self.state
            )));
        }

        let first = self.build();
        let error = match first {
            Ok(()) => return Ok(()),
            Err(error) => error,
        };
        let joggle = match &self.options.joggle {
            Some(joggle) if error.is_joggle_recoverable() => joggle.clone(),
            _ => {
                self.unwind(&error);
                return Err(error);
            }
        };
        self.clear_working_state();
        self.run_joggled(&joggle, error)
    }

    /// Reruns on joggled copies of the checkpoint until one build succeeds.
    fn run_joggled(&mut self, joggle: &JoggleOptions, first: HullError) -> Result<(), HullError> {
        let bounds = self.checkpoint.bounds();
        let width = if bounds.max_width > 0.0 {
            bounds.max_width
        } else if bounds.max_abs > 0.0 {
            bounds.max_abs
        } else {
            1.0
        };
        let base = joggle
            .amount
            .unwrap_or(JOGGLE_DEFAULT_RATIO * f64::EPSILON * width);
        let cap = JOGGLE_MAX_RATIO * width;
        let per_amount = joggle.retries_per_amount.max(1);

        let mut rng = StdRng::seed_from_u64(joggle.seed);
        let mut last = first;
        for attempt in 1..=joggle.max_attempts {
            let growth_steps = i32::try_from((attempt - 1) / per_amount).unwrap_or(i32::MAX);
            let amount = (base * JOGGLE_GROWTH.powi(growth_steps)).min(cap);
            tracing::warn!(
                "{last}; joggle attempt {attempt}/{} with amount {amount:e}",
                joggle.max_attempts
            );

            let joggled = self.checkpoint.joggled(amount, &mut rng)?;
            self.points = Self::prepare_points(&joggled, &self.options)?;
            self.precision = Self::derive_precision(&self.points, &self.options);
            self.counters = HullCounters {
                joggle_attempts: attempt,
                ..HullCounters::default()
            };
            match self.build() {
                Ok(()) => return Ok(()),
                Err(error) if error.is_joggle_recoverable() => {
                    self.clear_working_state();
                    last = error;
                }
                Err(error) => {
                    self.unwind(&error);
                    return Err(error);
                }
            }
        }

        let error = HullError::precision(format!(
            "joggle did not recover after {} attempts: {}",
            joggle.max_attempts,
            last.message()
        ));
        self.unwind(&error);
        Err(error)
    }

    /// Drops every partially built structure and records the failure.
    pub(crate) fn unwind(&mut self, error: &HullError) {
        tracing::warn!("hull computation failed in {:?}: {error}", self.state);
        self.clear_working_state();
        self.state = ContextState::Failed(error.kind());
    }

    /// Returns a finished or failed context to its freshly created state: the
    /// checkpointed points, their precision and zeroed counters.
    ///
    /// # Errors
    ///
    /// Returns [`HullError::OutOfMemory`] if the points cannot be copied.
    pub fn reset(&mut self) -> Result<(), HullError> {
        self.clear_working_state();
        self.points = Self::prepare_points(&self.checkpoint, &self.options)?;
        self.precision = Self::derive_precision(&self.points, &self.options);
        self.counters = HullCounters::default();
        self.state = ContextState::Uninitialized;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::core::context::{ContextState, HullContext};
    use crate::core::error::HullErrorKind;
    use crate::core::options::{HullOptions, JoggleOptions, MergeMode};
    use crate::core::points::PointSet;

    fn collinear() -> PointSet {
        PointSet::from_rows(&[[0.0, 0.0], [1.0, 1.0], [2.0, 2.0], [3.0, 3.0]]).unwrap()
    }

    #[test]
    fn test_failed_run_must_be_reset() {
        let mut ctx = HullContext::new(collinear(), HullOptions::default()).unwrap();
        let err = ctx.run().unwrap_err();
        assert_eq!(err.kind(), HullErrorKind::SingularInput);
        assert_eq!(ctx.state(), ContextState::Failed(HullErrorKind::SingularInput));
        assert_eq!(ctx.graph().facet_count(), 0);

        let again = ctx.run().unwrap_err();
        assert_eq!(again.kind(), HullErrorKind::Input);

        ctx.reset().unwrap();
        assert_eq!(ctx.state(), ContextState::Uninitialized);
        assert_eq!(ctx.run().unwrap_err().kind(), HullErrorKind::SingularInput);
    }

    #[test]
    fn test_joggle_recovers_singular_input() {
        let options = HullOptions {
            merge_mode: MergeMode::None,
            joggle: Some(JoggleOptions {
                amount: Some(1e-3),
                ..JoggleOptions::default()
            }),
            ..HullOptions::default()
        };
        let mut ctx = HullContext::new(collinear(), options).unwrap();
        ctx.run().unwrap();
        assert_eq!(ctx.state(), ContextState::Finished);
        assert!(ctx.counters().joggle_attempts >= 1);
        assert!(ctx.graph().facet_count() >= 3);
        // The checkpoint still holds the original coordinates
        assert_eq!(ctx.checkpoint.point(1), &[1.0, 1.0]);
    }

    #[test]
    fn test_reset_restores_checkpoint() {
        let options = HullOptions {
            merge_mode: MergeMode::None,
            joggle: Some(JoggleOptions {
                amount: Some(1e-3),
                ..JoggleOptions::default()
            }),
            ..HullOptions::default()
        };
        let mut ctx = HullContext::new(collinear(), options).unwrap();
        ctx.run().unwrap();
        assert_ne!(ctx.points(), &ctx.checkpoint);
        ctx.reset().unwrap();
        assert_eq!(ctx.points(), &ctx.checkpoint);
        assert_eq!(ctx.counters().joggle_attempts, 0);
    }
}
