//! Built-in random-walk Metropolis engine for the truncated-normal posterior.
//!
//! Sampling happens on the unconstrained scale `(mu, log sigma)`, where both
//! coordinates are proposed jointly from a Gaussian whose covariance is
//! learned during warm-up. The two parameters are strongly correlated under
//! truncation, so axis-aligned moves would mix poorly. The recorded
//! `log_post` is the log target on that scale, i.e. the log-likelihood plus
//! the log prior plus the `log sigma` Jacobian term.

use rand::rngs::StdRng;
use rand::{RngExt, SeedableRng};
use tracing::{debug, warn};

use crate::inference::{
    EngineOutput, FitDiagnostics, InferenceEngine, ParameterDiagnostics, PosteriorDraw,
    PosteriorDraws, ProposalStats, SamplerOptions, SamplingFailure, SamplingRequest,
};
use crate::input::InitialGuess;
use crate::utils::{mean, sample_variance, usize_to_f64};

use super::diagnostics::{effective_sample_size, split_rhat};
use super::likelihood::SampleStatistics;
use super::priors::TruncatedNormalPriors;
use super::types::{ChainDraws, ChainSet, EffectiveSampleSizes, ProposalTuning};

/// Seed increment between adjacent chains.
///
/// Chain `i` uses `seed + i * CHAIN_SEED_STRIDE` with wrapping arithmetic.
pub const CHAIN_SEED_STRIDE: u64 = 10_000;

const RHAT_WARNING_THRESHOLD: f64 = 1.1;

/// Step size applied to a freshly estimated covariance in two dimensions.
const JOINT_STEP_SIZE: f64 = 2.38 / std::f64::consts::SQRT_2;

/// Pseudo-count shrinking the warm-up covariance towards a small diagonal.
const COVARIANCE_SHRINKAGE_COUNT: f64 = 5.0;
const COVARIANCE_JITTER: f64 = 1.0e-3;

/// Adaptive random-walk Metropolis sampler.
///
/// Recognizes every named field of [`SamplerOptions`] and no `extra` keys.
/// Chains run on scoped threads when `cores > 1`; results do not depend on
/// the core count.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetropolisEngine;

impl InferenceEngine for MetropolisEngine {
    type Fit = ChainSet;

    fn sample(
        &self,
        request: &SamplingRequest<'_>,
    ) -> Result<EngineOutput<ChainSet>, SamplingFailure> {
        let options = request.options;
        if let Some(key) = options.extra.keys().next() {
            return Err(SamplingFailure::UnrecognizedOption { key: key.clone() });
        }
        options.validate()?;
        if !request.model.is_valid() {
            return Err(SamplingFailure::Engine(
                "invalid truncated-normal model configuration".to_owned(),
            ));
        }

        let target = PosteriorTarget {
            statistics: SampleStatistics::from_sample(request.sample),
            priors: request.model.priors,
        };
        let start = ChainState::initialize(&target, request.init)?;
        let proposal = JointProposal::initial(
            request.model.proposal_tuning,
            request.init,
            request.sample.len(),
        );
        let chain_request = ChainRequest {
            target: &target,
            start,
            proposal,
            tuning: request.model.proposal_tuning,
            options,
        };

        let chains = if options.cores > 1 && options.chains > 1 {
            run_chains_parallel(&chain_request)?
        } else {
            (0..options.chains)
                .map(|chain_index| run_mcmc_chain(&chain_request, chain_index))
                .collect()
        };

        Ok(assemble_output(chains, options))
    }
}

#[derive(Debug, Clone, Copy)]
struct PosteriorTarget {
    statistics: SampleStatistics,
    priors: TruncatedNormalPriors,
}

impl PosteriorTarget {
    fn log_posterior(&self, mu: f64, log_sigma: f64) -> f64 {
        let sigma = log_sigma.exp();
        let log_likelihood = self.statistics.log_likelihood(mu, sigma);
        if !log_likelihood.is_finite() {
            return f64::NEG_INFINITY;
        }
        log_likelihood + self.priors.log_density(mu, sigma) + log_sigma
    }
}

#[derive(Debug, Clone, Copy)]
struct ChainState {
    mu: f64,
    log_sigma: f64,
    log_post: f64,
}

impl ChainState {
    fn initialize(target: &PosteriorTarget, init: InitialGuess) -> Result<Self, SamplingFailure> {
        let log_sigma = init.sd_start.ln();
        let log_post = target.log_posterior(init.mean_start, log_sigma);
        if !log_post.is_finite() {
            return Err(SamplingFailure::NonFiniteInitialLogPosterior {
                mu: init.mean_start,
                sigma: init.sd_start,
            });
        }
        Ok(Self {
            mu: init.mean_start,
            log_sigma,
            log_post,
        })
    }

    fn draw(self) -> PosteriorDraw {
        PosteriorDraw {
            mu: self.mu,
            sigma: self.log_sigma.exp(),
            log_post: self.log_post,
        }
    }
}

/// Lower-triangular factor `L` of a 2x2 covariance `L L^T`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct CholeskyFactor {
    l11: f64,
    l21: f64,
    l22: f64,
}

impl CholeskyFactor {
    const fn diagonal(sd_mu: f64, sd_log_sigma: f64) -> Self {
        Self {
            l11: sd_mu,
            l21: 0.0,
            l22: sd_log_sigma,
        }
    }

    /// Factor `[[var_mu, cov], [cov, var_log_sigma]]`, or `None` unless it is
    /// positive definite.
    fn from_covariance(var_mu: f64, cov: f64, var_log_sigma: f64) -> Option<Self> {
        if !(var_mu > 0.0 && var_mu.is_finite() && cov.is_finite()) {
            return None;
        }
        let l11 = var_mu.sqrt();
        let l21 = cov / l11;
        let remainder = l21.mul_add(-l21, var_log_sigma);
        if !(remainder > 0.0 && remainder.is_finite()) {
            return None;
        }
        Some(Self {
            l11,
            l21,
            l22: remainder.sqrt(),
        })
    }
}

/// Gaussian random-walk proposal `step * L z` over `(mu, log sigma)`.
#[derive(Debug, Clone, Copy)]
struct JointProposal {
    factor: CholeskyFactor,
    step: f64,
}

impl JointProposal {
    fn initial(tuning: ProposalTuning, init: InitialGuess, observations: usize) -> Self {
        let shrink = usize_to_f64(observations.max(1)).sqrt();
        Self {
            factor: CholeskyFactor::diagonal(
                (tuning.mu_draw_scale * init.sd_start / shrink).max(tuning.min_draw_scale),
                (tuning.log_sigma_draw_scale / shrink).max(tuning.min_draw_scale),
            ),
            step: 1.0,
        }
    }

    fn propose(&self, state: ChainState, rng: &mut StdRng) -> (f64, f64) {
        let z_mu = sample_standard_normal(rng);
        let z_log_sigma = sample_standard_normal(rng);
        let factor = self.factor;
        (
            (self.step * factor.l11).mul_add(z_mu, state.mu),
            self.step.mul_add(
                factor.l21.mul_add(z_mu, factor.l22 * z_log_sigma),
                state.log_sigma,
            ),
        )
    }
}

/// Streaming mean and covariance of warm-up states (Welford updates).
#[derive(Debug, Clone, Copy, Default)]
struct CovarianceAccumulator {
    count: usize,
    mean_mu: f64,
    mean_log_sigma: f64,
    sum_sq_mu: f64,
    sum_sq_log_sigma: f64,
    sum_cross: f64,
}

impl CovarianceAccumulator {
    fn push(&mut self, mu: f64, log_sigma: f64) {
        self.count += 1;
        let n = usize_to_f64(self.count);
        let delta_mu = mu - self.mean_mu;
        let delta_log_sigma = log_sigma - self.mean_log_sigma;
        self.mean_mu += delta_mu / n;
        self.mean_log_sigma += delta_log_sigma / n;
        self.sum_sq_mu += delta_mu * (mu - self.mean_mu);
        self.sum_sq_log_sigma += delta_log_sigma * (log_sigma - self.mean_log_sigma);
        self.sum_cross += delta_mu * (log_sigma - self.mean_log_sigma);
    }

    /// Shrunk sample covariance, factored for proposals.
    fn regularized_factor(&self) -> Option<CholeskyFactor> {
        if self.count < 2 {
            return None;
        }
        let n = usize_to_f64(self.count);
        let weight = n / (n + COVARIANCE_SHRINKAGE_COUNT);
        let jitter = COVARIANCE_JITTER * (1.0 - weight);
        let scale = weight / (n - 1.0);
        CholeskyFactor::from_covariance(
            self.sum_sq_mu.mul_add(scale, jitter),
            self.sum_cross * scale,
            self.sum_sq_log_sigma.mul_add(scale, jitter),
        )
    }
}

struct ChainRequest<'a> {
    target: &'a PosteriorTarget,
    start: ChainState,
    proposal: JointProposal,
    tuning: ProposalTuning,
    options: &'a SamplerOptions,
}

fn chain_seed(base_seed: u64, chain_index: usize) -> u64 {
    let index_u64 = u64::try_from(chain_index).unwrap_or(u64::MAX);
    base_seed.wrapping_add(index_u64.wrapping_mul(CHAIN_SEED_STRIDE))
}

fn run_chains_parallel(request: &ChainRequest<'_>) -> Result<Vec<ChainDraws>, SamplingFailure> {
    std::thread::scope(|scope| {
        let handles = (0..request.options.chains)
            .map(|chain_index| scope.spawn(move || run_mcmc_chain(request, chain_index)))
            .collect::<Vec<_>>();

        handles
            .into_iter()
            .enumerate()
            .map(|(chain, handle)| {
                handle
                    .join()
                    .map_err(|_| SamplingFailure::ChainPanicked { chain })
            })
            .collect()
    })
}

fn run_mcmc_chain(request: &ChainRequest<'_>, chain_index: usize) -> ChainDraws {
    let options = request.options;
    let tuning = request.tuning;
    let target = request.target;
    let seed = chain_seed(options.seed, chain_index);
    let mut rng = StdRng::seed_from_u64(seed);
    let mut state = request.start;
    let mut proposal = request.proposal;

    let mut window = ProposalStats::default();
    let mut retained = ProposalStats::default();
    let mut covariance = CovarianceAccumulator::default();
    let mut covariance_window = tuning.covariance_window;
    let mut draws = Vec::with_capacity(options.retained_draws_per_chain());

    for iter in 0..options.iterations {
        let warming_up = iter < options.warmup;
        for _ in 0..tuning.transitions_per_iteration {
            let (proposed_mu, proposed_log_sigma) = proposal.propose(state, &mut rng);
            let candidate = target.log_posterior(proposed_mu, proposed_log_sigma);
            let accepted = should_accept(candidate - state.log_post, &mut rng);
            if accepted {
                state.mu = proposed_mu;
                state.log_sigma = proposed_log_sigma;
                state.log_post = candidate;
            }
            if warming_up {
                window.record(accepted);
            } else {
                retained.record(accepted);
            }
        }

        if warming_up {
            // The first window is left out of the covariance estimate so the
            // climb away from the starting point does not inflate it.
            if iter >= tuning.adaptation_interval {
                covariance.push(state.mu, state.log_sigma);
            }
            if (iter + 1).is_multiple_of(tuning.adaptation_interval) {
                proposal.step =
                    adapt_scalar_scale(proposal.step, window.acceptance_rate(), tuning);
                window = ProposalStats::default();
                if covariance.count >= covariance_window {
                    if let Some(factor) = covariance.regularized_factor() {
                        proposal = JointProposal {
                            factor,
                            step: JOINT_STEP_SIZE,
                        };
                    }
                    covariance = CovarianceAccumulator::default();
                    covariance_window = covariance_window.saturating_mul(2);
                }
            }
            continue;
        }

        if (iter - options.warmup).is_multiple_of(options.thin) {
            draws.push(state.draw());
        }
    }

    let acceptance_rate = retained.acceptance_rate();
    debug!(
        chain = chain_index,
        seed,
        retained = draws.len(),
        acceptance_rate,
        step = proposal.step,
        "finished sampling chain"
    );

    ChainDraws {
        seed,
        draws,
        acceptance_rate,
    }
}

fn assemble_output(chains: Vec<ChainDraws>, options: &SamplerOptions) -> EngineOutput<ChainSet> {
    let mu_chains = chains.iter().map(ChainDraws::mu_values).collect::<Vec<_>>();
    let sigma_chains = chains
        .iter()
        .map(ChainDraws::sigma_values)
        .collect::<Vec<_>>();

    let (mu, mu_ess) = parameter_diagnostics("mu", &mu_chains);
    let (sigma, sigma_ess) = parameter_diagnostics("sigma", &sigma_chains);

    let fit = ChainSet {
        chains,
        effective_sample_size: EffectiveSampleSizes {
            mu: mu_ess,
            sigma: sigma_ess,
        },
        options: options.clone(),
    };

    EngineOutput {
        draws: PosteriorDraws::new(fit.pooled_draws()),
        diagnostics: FitDiagnostics { mu, sigma },
        fit,
    }
}

fn parameter_diagnostics(name: &str, chains: &[Vec<f64>]) -> (ParameterDiagnostics, f64) {
    let pooled = chains.concat();
    let posterior_mean = mean(&pooled);
    let std_dev = sample_variance(&pooled, posterior_mean).sqrt();
    let ess = chains
        .iter()
        .map(|chain| effective_sample_size(chain))
        .sum::<f64>();
    let monte_carlo_se = if ess > 0.0 {
        std_dev / ess.sqrt()
    } else {
        f64::NAN
    };
    let rhat = split_rhat(chains).unwrap_or(f64::NAN);
    if rhat >= RHAT_WARNING_THRESHOLD {
        warn!(
            parameter = name,
            rhat, "split-R-hat indicates chains have not mixed"
        );
    }

    (
        ParameterDiagnostics {
            posterior_mean,
            monte_carlo_se,
            rhat,
        },
        ess,
    )
}

fn should_accept(log_acceptance: f64, rng: &mut StdRng) -> bool {
    log_acceptance >= 0.0 || rng.random::<f64>().ln() < log_acceptance
}

fn adapt_scalar_scale(scale: f64, acceptance: f64, tuning: ProposalTuning) -> f64 {
    (scale * adaptation_factor(acceptance, tuning)).max(tuning.min_draw_scale)
}

fn adaptation_factor(acceptance: f64, tuning: ProposalTuning) -> f64 {
    if acceptance < tuning.acceptance_target_low {
        tuning.scale_decrease_factor
    } else if acceptance > tuning.acceptance_target_high {
        tuning.scale_increase_factor
    } else {
        1.0
    }
}

fn sample_standard_normal(rng: &mut StdRng) -> f64 {
    let u1 = (1.0_f64 - rng.random::<f64>()).max(f64::MIN_POSITIVE);
    let u2 = rng.random::<f64>();
    (-2.0_f64 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
}
