//! Target model abstraction: an unnormalized density with its gradient and
//! Laplacian.

use crate::errors::{ErrorInfo, RestoreError};
use crate::types::{AuxData, State};

/// Log-density evaluator plugged into an [`FnTarget`].
pub type LogDensityFn = fn(state: &State, data: &AuxData) -> f64;

/// Gradient evaluator plugged into an [`FnTarget`]; writes into `grad`.
pub type GradientFn = fn(state: &State, grad: &mut State, data: &AuxData);

/// Laplacian evaluator plugged into an [`FnTarget`].
pub type LaplacianFn = fn(state: &State, data: &AuxData) -> f64;

/// Which evaluators a target model actually provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Log-density is available.
    pub log_density: bool,
    /// Gradient of the log-density is available.
    pub gradient: bool,
    /// Laplacian of the log-density is available.
    pub laplacian: bool,
}

impl Capabilities {
    /// All three evaluators present.
    pub const fn full() -> Self {
        Self {
            log_density: true,
            gradient: true,
            laplacian: true,
        }
    }

    /// Returns `true` when every evaluator is present.
    pub fn is_complete(&self) -> bool {
        self.log_density && self.gradient && self.laplacian
    }

    /// Names of the evaluators that are absent.
    pub fn missing(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if !self.log_density {
            missing.push("log_density");
        }
        if !self.gradient {
            missing.push("gradient");
        }
        if !self.laplacian {
            missing.push("laplacian");
        }
        missing
    }
}

/// Unnormalized target density over a fixed-dimension real vector space.
///
/// Implementations must be deterministic and free of side effects, and the
/// three evaluators must describe the same log-density. Consistency is not
/// checked by the sampler; presence is, through [`TargetModel::capabilities`].
pub trait TargetModel {
    /// Dimension of the state space.
    fn dimension(&self) -> usize;

    /// Log-density at `state`, up to an additive constant.
    fn log_density(&self, state: &State) -> f64;

    /// Gradient of the log-density at `state`, written into `grad`.
    fn gradient(&self, state: &State, grad: &mut State);

    /// Laplacian (trace of the Hessian) of the log-density at `state`.
    fn laplacian(&self, state: &State) -> f64;

    /// Evaluators this model provides. Defaults to all of them.
    fn capabilities(&self) -> Capabilities {
        Capabilities::full()
    }

    /// Energy `U = -log π`.
    fn energy(&self, state: &State) -> f64 {
        -self.log_density(state)
    }

    /// Gradient of the energy, written into `grad`.
    fn grad_energy(&self, state: &State, grad: &mut State) {
        self.gradient(state, grad);
        grad.neg_mut();
    }

    /// Laplacian of the energy.
    fn laplacian_energy(&self, state: &State) -> f64 {
        -self.laplacian(state)
    }
}

/// Checks that `target` has a usable dimension and all three evaluators.
pub fn validate_target<T: TargetModel + ?Sized>(target: &T) -> Result<(), RestoreError> {
    if target.dimension() == 0 {
        return Err(RestoreError::Model(
            ErrorInfo::new("zero-dimension", "target dimension must be at least 1")
                .with_context("dimension", "0"),
        ));
    }
    let capabilities = target.capabilities();
    if !capabilities.is_complete() {
        return Err(RestoreError::Model(
            ErrorInfo::new(
                "missing-capability",
                "target model does not provide every evaluator required by the regeneration rate",
            )
            .with_context("missing", capabilities.missing().join(","))
            .with_hint("supply log-density, gradient and Laplacian before building the engine"),
        ));
    }
    Ok(())
}

/// Target model assembled from plain function pointers and an auxiliary
/// data matrix.
///
/// Each evaluator may be left unset and supplied later; an unset evaluator
/// yields `NaN` and is reported through [`TargetModel::capabilities`]. Data
/// defaults to an empty `0 x 0` matrix.
#[derive(Debug, Clone)]
pub struct FnTarget {
    dimension: usize,
    data: AuxData,
    log_density: Option<LogDensityFn>,
    gradient: Option<GradientFn>,
    laplacian: Option<LaplacianFn>,
}

impl FnTarget {
    /// Fully specified target.
    pub fn new(
        dimension: usize,
        data: AuxData,
        log_density: LogDensityFn,
        gradient: GradientFn,
        laplacian: LaplacianFn,
    ) -> Self {
        Self {
            dimension,
            data,
            log_density: Some(log_density),
            gradient: Some(gradient),
            laplacian: Some(laplacian),
        }
    }

    /// Target with no data and no evaluators yet.
    pub fn empty(dimension: usize) -> Self {
        Self {
            dimension,
            data: AuxData::zeros(0, 0),
            log_density: None,
            gradient: None,
            laplacian: None,
        }
    }

    /// Replaces the auxiliary data.
    pub fn set_data(&mut self, data: AuxData) {
        self.data = data;
    }

    /// Sets the log-density evaluator.
    pub fn set_log_density(&mut self, log_density: LogDensityFn) {
        self.log_density = Some(log_density);
    }

    /// Sets the gradient evaluator.
    pub fn set_gradient(&mut self, gradient: GradientFn) {
        self.gradient = Some(gradient);
    }

    /// Sets the Laplacian evaluator.
    pub fn set_laplacian(&mut self, laplacian: LaplacianFn) {
        self.laplacian = Some(laplacian);
    }

    /// Auxiliary data handed to every evaluator.
    pub fn data(&self) -> &AuxData {
        &self.data
    }
}

impl TargetModel for FnTarget {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn log_density(&self, state: &State) -> f64 {
        match self.log_density {
            Some(eval) => eval(state, &self.data),
            None => f64::NAN,
        }
    }

    fn gradient(&self, state: &State, grad: &mut State) {
        match self.gradient {
            Some(eval) => eval(state, grad, &self.data),
            None => grad.fill(f64::NAN),
        }
    }

    fn laplacian(&self, state: &State) -> f64 {
        match self.laplacian {
            Some(eval) => eval(state, &self.data),
            None => f64::NAN,
        }
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            log_density: self.log_density.is_some(),
            gradient: self.gradient.is_some(),
            laplacian: self.laplacian.is_some(),
        }
    }
}
