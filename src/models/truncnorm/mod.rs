//! Bayesian estimation for normal samples truncated to a known interval.
//!
//! The pipeline validates inputs, hands a sampling request to an
//! [`InferenceEngine`](crate::inference::InferenceEngine), reduces the pooled
//! draws into a two-row statistics table (`mean`, `sd`), and returns it with
//! the engine's raw fit. [`MetropolisEngine`] is the built-in engine.

pub mod diagnostics;
pub mod estimation;
pub mod likelihood;
pub mod posterior;
pub mod priors;
pub mod sampler;
pub mod types;

pub use diagnostics::{autocorrelation, effective_sample_size, split_rhat};
pub use estimation::{
    EstimationError, EstimationOptions, EstimationResult, assemble_result,
    estimate_truncated_normal, estimate_with_engine, render_summary_table,
};
pub use likelihood::{
    SampleStatistics, log_standard_normal_mass, log_standard_normal_upper_tail,
};
pub use posterior::{Parameter, SummaryError, SummaryRow, map_draw_index, summarize_posterior};
pub use priors::TruncatedNormalPriors;
pub use sampler::{CHAIN_SEED_STRIDE, MetropolisEngine};
pub use types::{
    ChainDraws, ChainSet, EffectiveSampleSizes, ProposalTuning,
    TruncatedNormalModel,
};
