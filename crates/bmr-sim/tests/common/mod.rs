#![allow(dead_code)]

use bmr_core::nalgebra::DMatrix;
use bmr_core::{
    isotropic_gaussian_log_density, sample_isotropic_gaussian, AuxData, FnRegen, FnTarget,
    IsotropicGaussian, RngHandle, State,
};
use bmr_sim::{RestoreConfig, RestoreEngine};

pub const LOG_C: f64 = 2.07;
pub const KAPPA_BAR: f64 = 100.0;

/// Precision of the zero-mean Gaussian with covariance `[[1.2, 0.4], [0.4, 0.8]]`.
pub fn precision() -> AuxData {
    DMatrix::from_row_slice(2, 2, &[1.0, -0.5, -0.5, 1.5])
}

fn gaussian_log_density(state: &State, precision: &AuxData) -> f64 {
    -0.5 * state.dot(&(precision * state))
}

fn gaussian_gradient(state: &State, grad: &mut State, precision: &AuxData) {
    grad.copy_from(&(precision * state));
    grad.neg_mut();
}

fn gaussian_laplacian(_state: &State, precision: &AuxData) -> f64 {
    -precision.trace()
}

/// Correlated 2-d Gaussian target with its precision as auxiliary data.
pub fn gaussian_target() -> FnTarget {
    FnTarget::new(
        2,
        precision(),
        gaussian_log_density,
        gaussian_gradient,
        gaussian_laplacian,
    )
}

pub fn config(ntours: usize, output_rate: f64, seed: u64) -> RestoreConfig {
    RestoreConfig::new(LOG_C, KAPPA_BAR)
        .with_ntours(ntours)
        .with_output_rate(output_rate)
        .with_seed(seed)
}

pub fn gaussian_engine(
    ntours: usize,
    output_rate: f64,
    seed: u64,
) -> RestoreEngine<FnTarget, IsotropicGaussian> {
    RestoreEngine::new(
        gaussian_target(),
        IsotropicGaussian::new(2),
        config(ntours, output_rate, seed),
    )
    .unwrap()
}

pub const SAMPLER_COST: u64 = 7;

fn costly_standard_normal(rng: &mut RngHandle, state: &mut State, data: &AuxData) -> u64 {
    sample_isotropic_gaussian(rng, state, data);
    SAMPLER_COST
}

/// Standard normal regeneration that reports a fixed evaluation cost per draw.
pub fn costly_regen() -> FnRegen {
    FnRegen::new(
        2,
        AuxData::zeros(0, 0),
        isotropic_gaussian_log_density,
        costly_standard_normal,
    )
}

pub fn costly_engine(
    ntours: usize,
    output_rate: f64,
    seed: u64,
) -> RestoreEngine<FnTarget, FnRegen> {
    let config = config(ntours, output_rate, seed);
    RestoreEngine::new(gaussian_target(), costly_regen(), config).unwrap()
}
