use bmr_core::nalgebra::DMatrix;
use bmr_core::{AuxData, FnTarget, IsotropicGaussian, State};
use criterion::{criterion_group, criterion_main, Criterion};

use bmr_sim::{RestoreConfig, RestoreEngine};

fn log_density(state: &State, precision: &AuxData) -> f64 {
    -0.5 * state.dot(&(precision * state))
}

fn gradient(state: &State, grad: &mut State, precision: &AuxData) {
    grad.copy_from(&(precision * state));
    grad.neg_mut();
}

fn laplacian(_state: &State, precision: &AuxData) -> f64 {
    -precision.trace()
}

fn gaussian_target() -> FnTarget {
    let precision = DMatrix::from_row_slice(2, 2, &[1.0, -0.5, -0.5, 1.5]);
    FnTarget::new(2, precision, log_density, gradient, laplacian)
}

fn bench_tours(c: &mut Criterion) {
    let config = RestoreConfig::new(2.07, 100.0)
        .with_ntours(50)
        .with_output_rate(10.0)
        .with_seed(42);

    c.bench_function("restore_50_tours", |b| {
        b.iter(|| {
            let mut engine =
                RestoreEngine::new(gaussian_target(), IsotropicGaussian::new(2), config.clone())
                    .unwrap();
            engine.run_fixed_tours().unwrap()
        })
    });
}

fn bench_steps(c: &mut Criterion) {
    let config = RestoreConfig::new(2.07, 100.0)
        .with_ntours(usize::MAX)
        .with_output_rate(10.0)
        .with_seed(42);
    let mut engine =
        RestoreEngine::new(gaussian_target(), IsotropicGaussian::new(2), config).unwrap();

    c.bench_function("restore_single_step", |b| {
        b.iter(|| engine.advance_one_step().unwrap())
    });
}

criterion_group!(benches, bench_tours, bench_steps);
criterion_main!(benches);
