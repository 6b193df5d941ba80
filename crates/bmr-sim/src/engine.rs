use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use bmr_core::errors::ErrorInfo;
use bmr_core::{
    check_dimensions, validate_target, RegenDistribution, RestoreError, RngHandle, State,
    TargetModel,
};
use rand::Rng;
use rand_distr::{Distribution, Exp, StandardNormal};
use serde::{Deserialize, Serialize};

use crate::config::{self, RestoreConfig};
use crate::rate::{self, EVALS_PER_RATE};
use crate::trace::Trace;

/// What a single call to [`RestoreEngine::advance_one_step`] did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepEvent {
    /// The output clock fired first; the state was recorded.
    Output {
        /// Time of the recorded output.
        time: f64,
    },
    /// A candidate regeneration was thinned away.
    Rejected {
        /// Time of the candidate.
        time: f64,
        /// Regeneration rate evaluated at the candidate state.
        rate: f64,
    },
    /// A candidate regeneration was accepted and the state resampled.
    Regenerated {
        /// Time of the regeneration.
        time: f64,
        /// Regeneration rate evaluated at the pre-regeneration state.
        rate: f64,
        /// Index of the tour that just started.
        tour: usize,
    },
}

/// Why [`RestoreEngine::run_fixed_tours`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Termination {
    /// The configured number of tours was reached.
    Completed,
    /// The cancel flag was raised.
    Cancelled,
    /// `limits.max_steps` steps were taken in this call.
    StepLimit,
    /// `limits.wall_clock_secs` elapsed during this call.
    TimeBudget,
}

/// Cumulative event counters over the lifetime of an engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    /// Steps taken (one per clock event).
    pub steps: u64,
    /// Candidate regenerations evaluated.
    pub candidates: u64,
    /// Accepted regenerations.
    pub regenerations: u64,
    /// Output events recorded.
    pub outputs: u64,
    /// Candidates whose rate exceeded `kappa_bar`.
    pub bound_violations: u64,
    /// Candidates rejected because their rate was not positive.
    pub nonpositive_rates: u64,
}

/// Summary returned by [`RestoreEngine::run_fixed_tours`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Reason the call returned.
    pub termination: Termination,
    /// Steps taken during this call.
    pub steps_this_run: u64,
    /// Tours completed so far.
    pub tours_completed: usize,
    /// Total target evaluations so far.
    pub nevals: u64,
    /// Simulated time reached.
    pub final_time: f64,
    /// Cumulative counters.
    pub stats: RunStats,
}

/// Brownian motion Restore simulation.
///
/// Owns the current state, simulated time, tour counter, evaluation count,
/// RNG stream and output trace. Each step races a dominating regeneration
/// clock of rate `kappa_bar` against an output clock of rate `output_rate`,
/// moves the state by a Brownian increment over the winning waiting time and
/// then either records an output or thins the candidate regeneration.
///
/// Draw order per step is fixed: regeneration waiting time, output waiting
/// time, one standard normal per coordinate, then for candidates a uniform
/// followed by whatever the regeneration sampler draws on acceptance.
#[derive(Debug)]
pub struct RestoreEngine<T, R> {
    target: T,
    regen: R,
    config: RestoreConfig,
    log_kappa_bar: f64,
    regen_clock: Exp<f64>,
    output_clock: Exp<f64>,
    rng: RngHandle,
    state: State,
    grad: State,
    time: f64,
    tour: usize,
    nevals: u64,
    initialized: bool,
    stats: RunStats,
    trace: Trace,
    cancel: Option<Arc<AtomicBool>>,
}

impl<T, R> RestoreEngine<T, R>
where
    T: TargetModel,
    R: RegenDistribution,
{
    /// Builds an engine, rejecting incomplete models, mismatched dimensions
    /// and invalid constants.
    pub fn new(target: T, regen: R, config: RestoreConfig) -> Result<Self, RestoreError> {
        validate_target(&target)?;
        let dimension = target.dimension();
        check_dimensions(dimension, &regen)?;
        config.validate()?;

        let regen_clock = clock(config.kappa_bar, "kappa_bar")?;
        let output_clock = clock(config.output_rate, "output_rate")?;
        let rng = RngHandle::from_seed(config.seed_policy.effective_seed());
        Ok(Self {
            target,
            regen,
            log_kappa_bar: config.kappa_bar.ln(),
            config,
            regen_clock,
            output_clock,
            rng,
            state: State::zeros(dimension),
            grad: State::zeros(dimension),
            time: 0.0,
            tour: 0,
            nevals: 0,
            initialized: false,
            stats: RunStats::default(),
            trace: Trace::new(),
            cancel: None,
        })
    }

    /// Replaces the regeneration distribution.
    pub fn set_regen_dist(&mut self, regen: R) -> Result<(), RestoreError> {
        check_dimensions(self.dimension(), &regen)?;
        self.regen = regen;
        Ok(())
    }

    /// Sets `log C`.
    pub fn set_log_c(&mut self, log_c: f64) -> Result<(), RestoreError> {
        config::validate_log_c(log_c)?;
        self.config.log_c = log_c;
        Ok(())
    }

    /// Sets the rate bound and its logarithm.
    pub fn set_kappa_bar(&mut self, kappa_bar: f64) -> Result<(), RestoreError> {
        config::validate_kappa_bar(kappa_bar)?;
        self.regen_clock = clock(kappa_bar, "kappa_bar")?;
        self.config.kappa_bar = kappa_bar;
        self.log_kappa_bar = kappa_bar.ln();
        Ok(())
    }

    /// Sets the number of tours at which runs stop.
    pub fn set_ntours(&mut self, ntours: usize) {
        self.config.ntours = ntours;
    }

    /// Sets the output clock rate.
    pub fn set_output_rate(&mut self, output_rate: f64) -> Result<(), RestoreError> {
        config::validate_output_rate(output_rate)?;
        self.output_clock = clock(output_rate, "output_rate")?;
        self.config.output_rate = output_rate;
        Ok(())
    }

    /// Restarts the RNG stream from `seed`. Only allowed once, before any
    /// random draw.
    pub fn set_seed(&mut self, seed: u64) -> Result<(), RestoreError> {
        self.rng.reseed(seed)
    }

    /// Installs a flag checked before every step; raising it stops the run.
    pub fn set_cancel_flag(&mut self, flag: Arc<AtomicBool>) {
        self.cancel = Some(flag);
    }

    /// Curvature part of the regeneration rate at `state`. Not counted in
    /// [`RestoreEngine::nevals`].
    pub fn kappa_partial(&self, state: &State) -> f64 {
        let mut grad = State::zeros(self.dimension());
        rate::kappa_partial(&self.target, state, &mut grad)
    }

    /// Regeneration rate at `state`. Not counted in
    /// [`RestoreEngine::nevals`].
    pub fn kappa(&self, state: &State) -> f64 {
        let mut grad = State::zeros(self.dimension());
        rate::kappa(&self.target, &self.regen, self.config.log_c, state, &mut grad)
    }

    /// Simulates until `ntours` regenerations have been accepted, or a limit
    /// or the cancel flag stops the run first.
    ///
    /// The first call draws the initial state from the regeneration
    /// distribution. Later calls resume from the current state, time and
    /// tour and keep appending to the same trace.
    pub fn run_fixed_tours(&mut self) -> Result<RunSummary, RestoreError> {
        self.ensure_initialized();
        let started = Instant::now();
        let budget = self.config.limits.time_budget()?;
        let max_steps = self.config.limits.max_steps;
        let mut steps_this_run = 0u64;

        tracing::info!(
            ntours = self.config.ntours,
            tour = self.tour,
            time = self.time,
            kappa_bar = self.config.kappa_bar,
            output_rate = self.config.output_rate,
            "Starting restore run"
        );

        let termination = loop {
            if self.tour >= self.config.ntours {
                break Termination::Completed;
            }
            if self
                .cancel
                .as_ref()
                .is_some_and(|flag| flag.load(Ordering::Relaxed))
            {
                break Termination::Cancelled;
            }
            if max_steps.is_some_and(|limit| steps_this_run >= limit) {
                break Termination::StepLimit;
            }
            if budget.is_some_and(|limit| started.elapsed() >= limit) {
                break Termination::TimeBudget;
            }
            self.advance_one_step()?;
            steps_this_run += 1;
        };

        if termination != Termination::Completed {
            tracing::warn!(
                termination = ?termination,
                tours_completed = self.tour,
                ntours = self.config.ntours,
                "Restore run stopped before reaching ntours"
            );
        }
        tracing::info!(
            tours_completed = self.tour,
            steps = steps_this_run,
            outputs = self.trace.len(),
            nevals = self.nevals,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Restore run finished"
        );

        Ok(RunSummary {
            termination,
            steps_this_run,
            tours_completed: self.tour,
            nevals: self.nevals,
            final_time: self.time,
            stats: self.stats,
        })
    }

    /// Advances the process to the sooner of the next output time and the
    /// next candidate regeneration time, then resolves that event.
    pub fn advance_one_step(&mut self) -> Result<StepEvent, RestoreError> {
        self.ensure_initialized();

        let t_regen = self.regen_clock.sample(&mut self.rng);
        let t_output = self.output_clock.sample(&mut self.rng);
        let tau = t_regen.min(t_output);
        self.time += tau;
        brownian_increment(&mut self.rng, &mut self.state, tau);
        self.stats.steps += 1;

        if t_regen < t_output {
            self.resolve_candidate()
        } else {
            self.trace.push(self.time, &self.state, self.tour);
            self.stats.outputs += 1;
            Ok(StepEvent::Output { time: self.time })
        }
    }

    fn resolve_candidate(&mut self) -> Result<StepEvent, RestoreError> {
        let u: f64 = self.rng.gen();
        let rate = rate::kappa(
            &self.target,
            &self.regen,
            self.config.log_c,
            &self.state,
            &mut self.grad,
        );
        self.nevals += EVALS_PER_RATE;
        self.stats.candidates += 1;

        if !rate.is_finite() {
            return Err(RestoreError::Numeric(
                ErrorInfo::new("non-finite-rate", "regeneration rate is not finite")
                    .with_context("rate", rate.to_string())
                    .with_context("time", self.time.to_string())
                    .with_context("tour", self.tour.to_string())
                    .with_hint(
                        "check log_c and the target's tails against the regeneration density",
                    ),
            ));
        }
        if rate <= 0.0 {
            self.stats.nonpositive_rates += 1;
            tracing::debug!(rate, time = self.time, "Non-positive regeneration rate; rejecting");
            return Ok(StepEvent::Rejected {
                time: self.time,
                rate,
            });
        }
        if rate > self.config.kappa_bar {
            self.stats.bound_violations += 1;
            if self.stats.bound_violations == 1 {
                tracing::warn!(
                    rate,
                    kappa_bar = self.config.kappa_bar,
                    time = self.time,
                    "Regeneration rate exceeds kappa_bar; thinning is no longer exact"
                );
            } else {
                tracing::debug!(rate, kappa_bar = self.config.kappa_bar, "Rate bound exceeded");
            }
        }

        if u.ln() < rate.ln() - self.log_kappa_bar {
            self.nevals += self.regen.sample(&mut self.rng, &mut self.state);
            self.tour += 1;
            self.stats.regenerations += 1;
            tracing::debug!(tour = self.tour, time = self.time, rate, "Regeneration accepted");
            Ok(StepEvent::Regenerated {
                time: self.time,
                rate,
                tour: self.tour,
            })
        } else {
            Ok(StepEvent::Rejected {
                time: self.time,
                rate,
            })
        }
    }

    fn ensure_initialized(&mut self) {
        if !self.initialized {
            self.nevals += self.regen.sample(&mut self.rng, &mut self.state);
            self.initialized = true;
        }
    }

    /// Dimension of the state space.
    pub fn dimension(&self) -> usize {
        self.state.len()
    }

    /// Total target evaluations: three per candidate plus sampler costs.
    pub fn nevals(&self) -> u64 {
        self.nevals
    }

    /// Configured `log C`.
    pub fn log_c(&self) -> f64 {
        self.config.log_c
    }

    /// Configured rate bound.
    pub fn kappa_bar(&self) -> f64 {
        self.config.kappa_bar
    }

    /// Configured tour count.
    pub fn ntours(&self) -> usize {
        self.config.ntours
    }

    /// Configured output clock rate.
    pub fn output_rate(&self) -> f64 {
        self.config.output_rate
    }

    /// Current configuration, including setter changes.
    pub fn config(&self) -> &RestoreConfig {
        &self.config
    }

    /// Seed the RNG stream started from.
    pub fn seed(&self) -> u64 {
        self.rng.seed()
    }

    /// Simulated time reached.
    pub fn current_time(&self) -> f64 {
        self.time
    }

    /// Index of the current tour, equal to the number of accepted
    /// regenerations.
    pub fn current_tour(&self) -> usize {
        self.tour
    }

    /// Current state of the process.
    pub fn state(&self) -> &State {
        &self.state
    }

    /// Cumulative event counters.
    pub fn stats(&self) -> RunStats {
        self.stats
    }

    /// Recorded outputs.
    pub fn trace(&self) -> &Trace {
        &self.trace
    }

    /// Recorded output times.
    pub fn output_times(&self) -> &[f64] {
        self.trace.times()
    }

    /// Recorded output states.
    pub fn output_states(&self) -> &[State] {
        self.trace.states()
    }

    /// Tour index at each recorded output.
    pub fn output_tours(&self) -> &[usize] {
        self.trace.tours()
    }

    /// Target model.
    pub fn target(&self) -> &T {
        &self.target
    }

    /// Regeneration distribution.
    pub fn regen_dist(&self) -> &R {
        &self.regen
    }

    /// Consumes the engine and returns its trace.
    pub fn into_trace(self) -> Trace {
        self.trace
    }
}

fn clock(rate: f64, name: &str) -> Result<Exp<f64>, RestoreError> {
    Exp::new(rate).map_err(|err| {
        RestoreError::Config(
            ErrorInfo::new("invalid-clock-rate", err.to_string())
                .with_context(name, rate.to_string()),
        )
    })
}

/// Adds an independent `N(0, tau)` increment to every coordinate.
fn brownian_increment(rng: &mut RngHandle, state: &mut State, tau: f64) {
    let scale = tau.sqrt();
    for value in state.iter_mut() {
        let z: f64 = StandardNormal.sample(rng);
        *value += scale * z;
    }
}
