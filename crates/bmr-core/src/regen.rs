//! Regeneration distribution abstraction.

use crate::errors::{ErrorInfo, RestoreError};
use crate::rng::RngHandle;
use crate::types::{AuxData, State};

/// Log-density evaluator plugged into an [`FnRegen`].
pub type RegenLogDensityFn = fn(state: &State, data: &AuxData) -> f64;

/// Sampler plugged into an [`FnRegen`]. Overwrites `state` with a fresh draw
/// and returns the number of target evaluations it spent doing so.
pub type RegenSampleFn = fn(rng: &mut RngHandle, state: &mut State, data: &AuxData) -> u64;

/// Easy-to-sample distribution the process restarts from.
///
/// Its density must be positive wherever the target density is, and it must
/// admit cheap i.i.d. sampling. Neither property is checked.
pub trait RegenDistribution {
    /// Dimension of the state space.
    fn dimension(&self) -> usize;

    /// Log-density at `state`. Must be normalized.
    fn log_density(&self, state: &State) -> f64;

    /// Draws a fresh state into `state`; returns the evaluation cost (zero
    /// for closed-form samplers).
    fn sample(&self, rng: &mut RngHandle, state: &mut State) -> u64;

    /// Energy `-log μ`.
    fn energy(&self, state: &State) -> f64 {
        -self.log_density(state)
    }
}

/// Ensures the regeneration distribution lives in the target's space.
pub fn check_dimensions<R: RegenDistribution + ?Sized>(
    target_dimension: usize,
    regen: &R,
) -> Result<(), RestoreError> {
    if regen.dimension() != target_dimension {
        return Err(RestoreError::Model(
            ErrorInfo::new(
                "dimension-mismatch",
                "regeneration distribution and target differ in dimension",
            )
            .with_context("target", target_dimension.to_string())
            .with_context("regen", regen.dimension().to_string()),
        ));
    }
    Ok(())
}

/// Regeneration distribution assembled from function pointers and data.
#[derive(Debug, Clone)]
pub struct FnRegen {
    dimension: usize,
    data: AuxData,
    log_density: RegenLogDensityFn,
    sample: RegenSampleFn,
}

impl FnRegen {
    /// Creates the distribution from its evaluators.
    pub fn new(
        dimension: usize,
        data: AuxData,
        log_density: RegenLogDensityFn,
        sample: RegenSampleFn,
    ) -> Self {
        Self {
            dimension,
            data,
            log_density,
            sample,
        }
    }

    /// Replaces the auxiliary data.
    pub fn set_data(&mut self, data: AuxData) {
        self.data = data;
    }

    /// Auxiliary data handed to the evaluators.
    pub fn data(&self) -> &AuxData {
        &self.data
    }
}

impl RegenDistribution for FnRegen {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn log_density(&self, state: &State) -> f64 {
        (self.log_density)(state, &self.data)
    }

    fn sample(&self, rng: &mut RngHandle, state: &mut State) -> u64 {
        (self.sample)(rng, state, &self.data)
    }
}
