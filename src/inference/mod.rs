//! Inference-engine boundary and sampler configuration.
//!
//! The estimation pipeline never samples on its own. It forwards a
//! [`SamplingRequest`] to an [`InferenceEngine`] and consumes the pooled draws
//! and per-parameter diagnostics it returns.

use std::collections::BTreeMap;

use thiserror::Error;

pub mod engine;

pub use engine::{
    EngineOutput, FitDiagnostics, InferenceEngine, ParameterDiagnostics, PosteriorDraw,
    PosteriorDraws, SamplingFailure, SamplingRequest, run_inference,
};

use crate::utils::usize_to_f64;

/// Errors for sampler option values.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum InferenceError {
    #[error("chain count must be positive")]
    InvalidChainCount,
    #[error("iterations must be positive")]
    InvalidIterations,
    #[error("warm-up ({warmup}) must be smaller than iterations ({iterations})")]
    InvalidWarmup { warmup: usize, iterations: usize },
    #[error("thinning interval must be positive")]
    InvalidThinning,
    #[error("core count must be positive")]
    InvalidCores,
}

/// Sampler options forwarded verbatim to the inference engine.
///
/// The estimation pipeline does not interpret any of these except `cores`,
/// which it always pins to `1`. Engines own the meaning and validation of
/// every field, including the free-form `extra` map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SamplerOptions {
    /// Number of independent chains.
    pub chains: usize,
    /// Iterations per chain, warm-up included.
    pub iterations: usize,
    /// Warm-up iterations discarded before retention.
    pub warmup: usize,
    /// Keep every `thin`-th draw after warm-up.
    pub thin: usize,
    /// RNG seed for reproducibility.
    pub seed: u64,
    /// Worker threads the engine may use.
    pub cores: usize,
    /// Engine-specific options not covered above.
    pub extra: BTreeMap<String, String>,
}

impl Default for SamplerOptions {
    fn default() -> Self {
        Self {
            chains: 4,
            iterations: 2_000,
            warmup: 1_000,
            thin: 1,
            seed: 42,
            cores: 1,
            extra: BTreeMap::new(),
        }
    }
}

impl SamplerOptions {
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// # Errors
    ///
    /// Returns `InferenceError` if schedule values are invalid.
    pub const fn validate(&self) -> Result<(), InferenceError> {
        if self.chains == 0 {
            return Err(InferenceError::InvalidChainCount);
        }
        if self.iterations == 0 {
            return Err(InferenceError::InvalidIterations);
        }
        if self.warmup >= self.iterations {
            return Err(InferenceError::InvalidWarmup {
                warmup: self.warmup,
                iterations: self.iterations,
            });
        }
        if self.thin == 0 {
            return Err(InferenceError::InvalidThinning);
        }
        if self.cores == 0 {
            return Err(InferenceError::InvalidCores);
        }
        Ok(())
    }

    /// Number of retained draws per chain implied by this configuration.
    ///
    /// Zero when warm-up covers every iteration or `thin` is zero.
    #[must_use]
    pub const fn retained_draws_per_chain(&self) -> usize {
        if self.thin == 0 {
            return 0;
        }
        self.iterations.saturating_sub(self.warmup).div_ceil(self.thin)
    }
}

/// Proposal counters for a single Metropolis-Hastings block.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProposalStats {
    pub proposed: usize,
    pub accepted: usize,
}

impl ProposalStats {
    /// Record one proposal and whether it was accepted.
    pub const fn record(&mut self, accepted: bool) {
        self.proposed += 1;
        if accepted {
            self.accepted += 1;
        }
    }

    /// Acceptance rate in `[0, 1]`, or `0` if no proposals were made.
    #[must_use]
    pub fn acceptance_rate(self) -> f64 {
        if self.proposed == 0 {
            0.0
        } else {
            usize_to_f64(self.accepted) / usize_to_f64(self.proposed)
        }
    }
}
