use bmr_core::{RegenDistribution, State, TargetModel};

/// Curvature part of the regeneration rate, `0.5 * (|grad U|^2 - lap U)`.
///
/// `grad` is scratch storage of the target's dimension.
pub fn kappa_partial<T>(target: &T, state: &State, grad: &mut State) -> f64
where
    T: TargetModel + ?Sized,
{
    target.grad_energy(state, grad);
    0.5 * (grad.dot(grad) - target.laplacian_energy(state))
}

/// Full regeneration rate
/// `kappa_partial(x) + exp(log_c + log mu(x) - log pi(x))`.
///
/// Performs exactly one log-density, one gradient and one Laplacian
/// evaluation of the target.
pub fn kappa<T, R>(target: &T, regen: &R, log_c: f64, state: &State, grad: &mut State) -> f64
where
    T: TargetModel + ?Sized,
    R: RegenDistribution + ?Sized,
{
    kappa_partial(target, state, grad)
        + (log_c + regen.log_density(state) - target.log_density(state)).exp()
}

/// Number of target evaluations charged per rate evaluation.
pub const EVALS_PER_RATE: u64 = 3;
