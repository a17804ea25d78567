//! Core public types for the truncated-normal module.

use crate::inference::{PosteriorDraw, SamplerOptions};

use super::priors::TruncatedNormalPriors;

/// Proposal-scale and adaptation controls for the joint random-walk sampler.
///
/// During warm-up the step size is retuned every `adaptation_interval`
/// iterations from the window acceptance rate. The proposal covariance of
/// `(mu, log sigma)` is re-estimated from warm-up states over doubling
/// windows, the first spanning `covariance_window` iterations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProposalTuning {
    /// Minimum allowed proposal step size.
    pub min_draw_scale: f64,
    /// Initial random-walk scale for `mu`, in units of the starting `sigma`.
    pub mu_draw_scale: f64,
    /// Initial random-walk scale for `log(sigma)`.
    pub log_sigma_draw_scale: f64,
    /// Adapt every `adaptation_interval` iterations during warm-up.
    pub adaptation_interval: usize,
    /// Warm-up iterations collected before the first covariance estimate.
    pub covariance_window: usize,
    /// Metropolis transitions per recorded iteration.
    pub transitions_per_iteration: usize,
    /// Lower acceptance-rate target for adaptation.
    pub acceptance_target_low: f64,
    /// Upper acceptance-rate target for adaptation.
    pub acceptance_target_high: f64,
    /// Multiplicative scale decrease when acceptance is below target.
    pub scale_decrease_factor: f64,
    /// Multiplicative scale increase when acceptance is above target.
    pub scale_increase_factor: f64,
}

impl Default for ProposalTuning {
    fn default() -> Self {
        Self {
            min_draw_scale: 1.0e-6,
            mu_draw_scale: 1.0,
            log_sigma_draw_scale: 0.5,
            adaptation_interval: 50,
            covariance_window: 100,
            transitions_per_iteration: 4,
            acceptance_target_low: 0.25,
            acceptance_target_high: 0.45,
            scale_decrease_factor: 0.8,
            scale_increase_factor: 1.25,
        }
    }
}

impl ProposalTuning {
    /// Whether proposal tuning settings are numerically valid.
    #[must_use]
    pub fn is_valid(self) -> bool {
        self.min_draw_scale > 0.0
            && self.mu_draw_scale > 0.0
            && self.log_sigma_draw_scale > 0.0
            && self.adaptation_interval > 0
            && self.covariance_window > 1
            && self.transitions_per_iteration > 0
            && self.acceptance_target_low >= 0.0
            && self.acceptance_target_high <= 1.0
            && self.acceptance_target_low < self.acceptance_target_high
            && self.scale_decrease_factor > 0.0
            && self.scale_increase_factor > 0.0
    }
}

/// Handle to the truncated-normal probability model.
///
/// Construct once and pass it into every estimation call; it holds no
/// per-call state and can be shared across threads.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TruncatedNormalModel {
    pub priors: TruncatedNormalPriors,
    pub proposal_tuning: ProposalTuning,
}

impl TruncatedNormalModel {
    #[must_use]
    pub fn new(priors: TruncatedNormalPriors) -> Self {
        Self {
            priors,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn with_proposal_tuning(mut self, proposal_tuning: ProposalTuning) -> Self {
        self.proposal_tuning = proposal_tuning;
        self
    }

    /// Whether both the priors and the proposal tuning are valid.
    #[must_use]
    pub fn is_valid(self) -> bool {
        self.priors.is_valid() && self.proposal_tuning.is_valid()
    }
}

/// Draws and sampler statistics for one chain.
#[derive(Debug, Clone, Default)]
pub struct ChainDraws {
    /// Seed this chain was started from.
    pub seed: u64,
    /// Retained draws in iteration order.
    pub draws: Vec<PosteriorDraw>,
    /// Joint-proposal acceptance rate after warm-up.
    pub acceptance_rate: f64,
}

impl ChainDraws {
    #[must_use]
    pub const fn len(&self) -> usize {
        self.draws.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.draws.is_empty()
    }

    #[must_use]
    pub fn mu_values(&self) -> Vec<f64> {
        self.draws.iter().map(|draw| draw.mu).collect()
    }

    #[must_use]
    pub fn sigma_values(&self) -> Vec<f64> {
        self.draws.iter().map(|draw| draw.sigma).collect()
    }
}

/// Effective sample sizes summed across chains.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EffectiveSampleSizes {
    pub mu: f64,
    pub sigma: f64,
}

/// Raw fit produced by [`MetropolisEngine`](super::MetropolisEngine).
///
/// Exposed verbatim on the estimation result for trace inspection or
/// additional summaries without rerunning inference.
#[derive(Debug, Clone, Default)]
pub struct ChainSet {
    /// Per-chain output in chain order.
    pub chains: Vec<ChainDraws>,
    pub effective_sample_size: EffectiveSampleSizes,
    /// Options the engine actually ran with.
    pub options: SamplerOptions,
}

impl ChainSet {
    #[must_use]
    pub fn total_draws(&self) -> usize {
        self.chains.iter().map(ChainDraws::len).sum()
    }

    /// All draws pooled in chain order.
    #[must_use]
    pub fn pooled_draws(&self) -> Vec<PosteriorDraw> {
        let mut draws = Vec::with_capacity(self.total_draws());
        for chain in &self.chains {
            draws.extend(chain.draws.iter().copied());
        }
        draws
    }
}
