#![forbid(unsafe_code)]

//! # `truncnorm_bayes`
//!
//! Bayesian point and interval estimation of the location and scale of a
//! normal distribution observed only through samples truncated to a known
//! interval `[a, b]`.
//!
//! A single call validates the inputs, drives an inference engine once, and
//! returns a two-row statistics table (`mean`, `sd`) with the posterior mean,
//! median, joint MAP value, Monte Carlo standard error, equal-tailed credible
//! interval and split-R-hat, together with the engine's raw fit.
//!
//! ```no_run
//! use truncnorm_bayes::{EstimationOptions, TruncatedSample, estimate_truncated_normal};
//!
//! let sample = TruncatedSample::new(vec![0.2, 0.6, 0.7, 1.1, 0.4], 0.0, 2.0);
//! let result = estimate_truncated_normal(&sample, &EstimationOptions::default())?;
//! println!("{}", result.render_table());
//! # Ok::<(), truncnorm_bayes::EstimationError>(())
//! ```

pub mod inference;
pub mod input;
pub mod models;
pub mod utils;

pub use inference::{
    EngineOutput, FitDiagnostics, InferenceEngine, InferenceError, ParameterDiagnostics,
    PosteriorDraw, PosteriorDraws, ProposalStats, SamplerOptions, SamplingFailure,
    SamplingRequest, run_inference,
};
pub use input::{
    DEFAULT_CONFIDENCE_LEVEL, InitialGuess, InputError, TruncatedSample, TruncationBounds,
    validate_inputs,
};

pub use models::truncnorm::{
    CHAIN_SEED_STRIDE, ChainDraws, ChainSet, EffectiveSampleSizes,
    EstimationError, EstimationOptions, EstimationResult, MetropolisEngine, Parameter,
    ProposalTuning, SummaryError, SummaryRow, TruncatedNormalModel, TruncatedNormalPriors,
    assemble_result, autocorrelation, effective_sample_size, estimate_truncated_normal,
    estimate_with_engine, map_draw_index, render_summary_table, split_rhat,
    summarize_posterior,
};
