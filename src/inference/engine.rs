//! Engine trait, request/response types, and the single-core adapter.

use thiserror::Error;
use tracing::debug;

use super::{InferenceError, SamplerOptions};
use crate::input::{InitialGuess, TruncatedSample};
use crate::models::truncnorm::TruncatedNormalModel;

/// Failures reported by an inference engine.
///
/// The pipeline propagates these unchanged; it never retries and never
/// returns partial results.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SamplingFailure {
    #[error("invalid sampler options: {0}")]
    InvalidOptions(#[from] InferenceError),
    #[error("unrecognized sampler option `{key}`")]
    UnrecognizedOption { key: String },
    #[error("log-posterior is not finite at the initial values (mu = {mu}, sigma = {sigma})")]
    NonFiniteInitialLogPosterior { mu: f64, sigma: f64 },
    #[error("sampling chain {chain} panicked")]
    ChainPanicked { chain: usize },
    #[error("inference engine failed: {0}")]
    Engine(String),
}

/// Everything an engine needs for one sampling run.
#[derive(Debug, Clone, Copy)]
pub struct SamplingRequest<'a> {
    pub model: &'a TruncatedNormalModel,
    pub sample: &'a TruncatedSample,
    pub init: InitialGuess,
    pub options: &'a SamplerOptions,
}

/// A single pooled posterior draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PosteriorDraw {
    pub mu: f64,
    pub sigma: f64,
    /// Unnormalized log-posterior density recorded for this draw.
    pub log_post: f64,
}

/// Posterior draws pooled across chains in iteration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PosteriorDraws {
    pub draws: Vec<PosteriorDraw>,
}

impl PosteriorDraws {
    #[must_use]
    pub const fn new(draws: Vec<PosteriorDraw>) -> Self {
        Self { draws }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.draws.is_empty()
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.draws.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PosteriorDraw> {
        self.draws.iter()
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

impl<'a> IntoIterator for &'a PosteriorDraws {
    type Item = &'a PosteriorDraw;
    type IntoIter = std::slice::Iter<'a, PosteriorDraw>;

    fn into_iter(self) -> Self::IntoIter {
        self.draws.iter()
    }
}

/// Engine-reported summary diagnostics for one parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterDiagnostics {
    pub posterior_mean: f64,
    pub monte_carlo_se: f64,
    pub rhat: f64,
}

/// Diagnostics for both model parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitDiagnostics {
    pub mu: ParameterDiagnostics,
    pub sigma: ParameterDiagnostics,
}

/// Result of one engine invocation.
#[derive(Debug, Clone)]
pub struct EngineOutput<F> {
    pub draws: PosteriorDraws,
    pub diagnostics: FitDiagnostics,
    /// Engine-specific raw fit, handed to callers untouched.
    pub fit: F,
}

/// A Bayesian inference engine able to sample the truncated-normal posterior.
pub trait InferenceEngine {
    /// Raw fit object exposed to callers for their own inspection.
    type Fit;

    /// Run the sampler once. Blocks until the engine returns.
    ///
    /// # Errors
    ///
    /// Returns `SamplingFailure` if options are rejected or sampling fails.
    fn sample(
        &self,
        request: &SamplingRequest<'_>,
    ) -> Result<EngineOutput<Self::Fit>, SamplingFailure>;
}

/// Forward a request to `engine`, pinning execution to a single core.
///
/// Every other option is passed through untouched; the engine alone decides
/// whether it understands them.
///
/// # Errors
///
/// Returns the engine's `SamplingFailure` unchanged.
pub fn run_inference<E>(
    engine: &E,
    model: &TruncatedNormalModel,
    sample: &TruncatedSample,
    init: InitialGuess,
    options: &SamplerOptions,
) -> Result<EngineOutput<E::Fit>, SamplingFailure>
where
    E: InferenceEngine + ?Sized,
{
    let options = SamplerOptions {
        cores: 1,
        ..options.clone()
    };
    debug!(
        chains = options.chains,
        iterations = options.iterations,
        warmup = options.warmup,
        seed = options.seed,
        observations = sample.len(),
        "invoking inference engine"
    );
    engine.sample(&SamplingRequest {
        model,
        sample,
        init,
        options: &options,
    })
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;

    struct RecordingEngine {
        seen_cores: RefCell<Vec<usize>>,
    }

    impl InferenceEngine for RecordingEngine {
        type Fit = ();

        fn sample(
            &self,
            request: &SamplingRequest<'_>,
        ) -> Result<EngineOutput<()>, SamplingFailure> {
            self.seen_cores.borrow_mut().push(request.options.cores);
            Err(SamplingFailure::Engine("stop".to_owned()))
        }
    }

    #[test]
    fn adapter_pins_cores_and_forwards_extras() {
        let engine = RecordingEngine {
            seen_cores: RefCell::new(Vec::new()),
        };
        let options = SamplerOptions {
            cores: 8,
            ..SamplerOptions::default()
        }
        .with_extra("unknown", "1");
        let sample = TruncatedSample::new(vec![0.5], 0.0, 1.0);
        let result = run_inference(
            &engine,
            &TruncatedNormalModel::default(),
            &sample,
            InitialGuess::default(),
            &options,
        );

        assert_eq!(result.err(), Some(SamplingFailure::Engine("stop".to_owned())));
        assert_eq!(*engine.seen_cores.borrow(), vec![1]);
    }

    #[test]
    fn draws_expose_parameter_columns() {
        let draws = PosteriorDraws::new(vec![
            PosteriorDraw {
                mu: 0.1,
                sigma: 1.0,
                log_post: -2.0,
            },
            PosteriorDraw {
                mu: 0.2,
                sigma: 1.5,
                log_post: -1.0,
            },
        ]);
        assert_eq!(draws.mu_values(), vec![0.1, 0.2]);
        assert_eq!(draws.sigma_values(), vec![1.0, 1.5]);
        assert_eq!(draws.len(), 2);
    }
}
