//! Standard isotropic Gaussian regeneration distribution.

use std::f64::consts::PI;

use rand_distr::{Distribution, StandardNormal};

use crate::regen::RegenDistribution;
use crate::rng::RngHandle;
use crate::types::{AuxData, State};

/// Log-density of `N(0, I_d)`. `data` is ignored; the signature matches
/// [`crate::regen::RegenLogDensityFn`].
pub fn isotropic_gaussian_log_density(state: &State, _data: &AuxData) -> f64 {
    standard_log_density(state)
}

/// Draws `N(0, I_d)` coordinate by coordinate. Costs no target evaluations.
pub fn sample_isotropic_gaussian(rng: &mut RngHandle, state: &mut State, _data: &AuxData) -> u64 {
    fill_standard_normal(rng, state);
    0
}

fn standard_log_density(state: &State) -> f64 {
    let d = state.len() as f64;
    -0.5 * d * (2.0 * PI).ln() - 0.5 * state.dot(state)
}

fn fill_standard_normal(rng: &mut RngHandle, state: &mut State) {
    for value in state.iter_mut() {
        *value = StandardNormal.sample(rng);
    }
}

/// `N(0, I_d)` as a [`RegenDistribution`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IsotropicGaussian {
    dimension: usize,
}

impl IsotropicGaussian {
    /// Standard normal in `dimension` coordinates.
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl RegenDistribution for IsotropicGaussian {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn log_density(&self, state: &State) -> f64 {
        standard_log_density(state)
    }

    fn sample(&self, rng: &mut RngHandle, state: &mut State) -> u64 {
        fill_standard_normal(rng, state);
        0
    }
}
