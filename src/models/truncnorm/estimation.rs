/////////////////////////////////////////////////////////////////////////////////////////////\
//
// End-to-end estimation pipeline for truncated-normal samples.
//
// Created on: 2 Feb 2026     Author: Tobias Kragholm
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! # Truncated-normal estimation
//!
//! Validates inputs, runs the inference engine once, summarizes the draws and
//! packages the statistics table together with the raw engine fit.
//!
//! # Examples
//!
//! ```
//! use truncnorm_bayes::{
//!     EstimationOptions, InputError, EstimationError, TruncatedSample,
//!     estimate_truncated_normal,
//! };
//!
//! let sample = TruncatedSample::new(vec![0.3, 0.8], 1.0, 0.0);
//! let err = estimate_truncated_normal(&sample, &EstimationOptions::default()).unwrap_err();
//! assert!(matches!(
//!     err,
//!     EstimationError::InvalidInput(InputError::InvalidBounds { .. })
//! ));
//! ```

use std::sync::Arc;

use comfy_table::{
    Attribute, Cell, Color, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED,
};
use thiserror::Error;
use tracing::{debug, info};

use crate::inference::{InferenceEngine, SamplerOptions, SamplingFailure, run_inference};
use crate::input::{
    DEFAULT_CONFIDENCE_LEVEL, InitialGuess, InputError, TruncatedSample, validate_inputs,
};

use super::posterior::{Parameter, SummaryError, SummaryRow, summarize_posterior};
use super::sampler::MetropolisEngine;
use super::types::{ChainSet, TruncatedNormalModel};

const RHAT_HIGHLIGHT_THRESHOLD: f64 = 1.1;

/// Errors returned by the estimation pipeline.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EstimationError {
    #[error(transparent)]
    InvalidInput(#[from] InputError),
    #[error(transparent)]
    SamplingFailure(#[from] SamplingFailure),
    #[error(transparent)]
    Summarization(#[from] SummaryError),
}

/// Per-call estimation settings.
#[derive(Debug, Clone, PartialEq)]
pub struct EstimationOptions {
    /// Starting values for every chain.
    pub initial_guess: InitialGuess,
    /// Two-sided equal-tailed credible level in `(0.5, 1)`.
    pub confidence_level: f64,
    /// Options forwarded verbatim to the engine.
    pub sampler: SamplerOptions,
}

impl Default for EstimationOptions {
    fn default() -> Self {
        Self {
            initial_guess: InitialGuess::default(),
            confidence_level: DEFAULT_CONFIDENCE_LEVEL,
            sampler: SamplerOptions::default(),
        }
    }
}

/// Immutable estimation output: the statistics table plus the raw engine fit.
#[derive(Debug)]
pub struct EstimationResult<F> {
    stats: [SummaryRow; 2],
    fit: Arc<F>,
}

impl<F> EstimationResult<F> {
    /// Rows ordered `mean` then `sd`.
    #[must_use]
    pub const fn stats(&self) -> &[SummaryRow; 2] {
        &self.stats
    }

    #[must_use]
    pub const fn mean_row(&self) -> &SummaryRow {
        &self.stats[0]
    }

    #[must_use]
    pub const fn sd_row(&self) -> &SummaryRow {
        &self.stats[1]
    }

    #[must_use]
    pub fn row(&self, param: Parameter) -> &SummaryRow {
        match param {
            Parameter::Mean => self.mean_row(),
            Parameter::Sd => self.sd_row(),
        }
    }

    /// Raw fit produced by the engine.
    #[must_use]
    pub fn fit(&self) -> &F {
        &self.fit
    }

    /// Shared handle to the raw fit, usable beyond the lifetime of this result.
    #[must_use]
    pub fn fit_handle(&self) -> Arc<F> {
        Arc::clone(&self.fit)
    }

    /// Render the statistics table as text.
    #[must_use]
    pub fn render_table(&self) -> String {
        render_summary_table(&self.stats)
    }
}

impl<F> Clone for EstimationResult<F> {
    fn clone(&self) -> Self {
        Self {
            stats: self.stats,
            fit: Arc::clone(&self.fit),
        }
    }
}

/// Package summary rows and the engine fit into an [`EstimationResult`].
#[must_use]
pub fn assemble_result<F>(stats: [SummaryRow; 2], fit: F) -> EstimationResult<F> {
    EstimationResult {
        stats,
        fit: Arc::new(fit),
    }
}

/// Run the full pipeline against an explicit engine and model handle.
///
/// Inputs are validated before the engine is touched; the engine is invoked
/// exactly once, pinned to a single core; any failure aborts without a
/// partial result.
///
/// # Errors
///
/// Returns `EstimationError` wrapping the first failing stage.
pub fn estimate_with_engine<E>(
    engine: &E,
    model: &TruncatedNormalModel,
    sample: &TruncatedSample,
    options: &EstimationOptions,
) -> Result<EstimationResult<E::Fit>, EstimationError>
where
    E: InferenceEngine + ?Sized,
{
    validate_inputs(sample, options.initial_guess, options.confidence_level)?;
    debug!(
        observations = sample.len(),
        lower = sample.bounds.lower,
        upper = sample.bounds.upper,
        "inputs validated"
    );

    let output = run_inference(
        engine,
        model,
        sample,
        options.initial_guess,
        &options.sampler,
    )?;
    debug!(draws = output.draws.len(), "engine returned posterior draws");

    let stats = summarize_posterior(&output.draws, &output.diagnostics, options.confidence_level)?;
    info!(
        mean = stats[0].mean,
        sd = stats[1].mean,
        rhat_mean = stats[0].rhat,
        rhat_sd = stats[1].rhat,
        "truncated-normal estimation finished"
    );

    Ok(assemble_result(stats, output.fit))
}

/// Run the full pipeline with the built-in [`MetropolisEngine`] and default model.
///
/// # Errors
///
/// Returns `EstimationError` wrapping the first failing stage.
pub fn estimate_truncated_normal(
    sample: &TruncatedSample,
    options: &EstimationOptions,
) -> Result<EstimationResult<ChainSet>, EstimationError> {
    estimate_with_engine(
        &MetropolisEngine,
        &TruncatedNormalModel::default(),
        sample,
        options,
    )
}

/// Render summary rows as a text table.
///
/// R-hat values at or above 1.1 are highlighted.
#[must_use]
pub fn render_summary_table(rows: &[SummaryRow]) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            [
                "param", "mean", "median", "maxlp", "se", "ci_lower", "ci_upper", "rhat",
            ]
            .iter()
            .map(|h| Cell::new(*h))
            .collect::<Vec<_>>(),
        );
    for row in rows {
        table.add_row(vec![
            Cell::new(row.param.name()),
            metric_cell(row.mean),
            metric_cell(row.median),
            metric_cell(row.maxlp),
            metric_cell(row.se),
            metric_cell(row.ci_lower),
            metric_cell(row.ci_upper),
            rhat_cell(row.rhat),
        ]);
    }
    table.to_string()
}

fn metric_cell(value: f64) -> Cell {
    Cell::new(format!("{value:.4}"))
}

fn rhat_cell(value: f64) -> Cell {
    if value >= RHAT_HIGHLIGHT_THRESHOLD {
        Cell::new(format!("{value:.3}"))
            .fg(Color::Red)
            .add_attribute(Attribute::Bold)
    } else {
        Cell::new(format!("{value:.3}"))
    }
}
