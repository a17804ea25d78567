//! Reduction of pooled posterior draws into the per-parameter summary table.

use std::fmt;

use thiserror::Error;

use crate::inference::{FitDiagnostics, ParameterDiagnostics, PosteriorDraws};
use crate::utils::{percentile, sorted_copy};

/// Errors raised while summarizing posterior draws.
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum SummaryError {
    #[error("posterior draws are required")]
    EmptyDraws,
    #[error("posterior draw {index} contains a non-finite parameter value")]
    NonFiniteDraw { index: usize },
    #[error("no posterior draw has a comparable log-posterior value")]
    NoFiniteLogPosterior,
    #[error("confidence level must lie strictly between 0.5 and 1; found {level}")]
    InvalidConfidenceLevel { level: f64 },
}

/// Summarized model parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Parameter {
    /// Location `mu` of the untruncated normal.
    Mean,
    /// Scale `sigma` of the untruncated normal.
    Sd,
}

impl Parameter {
    /// Row label used in the statistics table.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Mean => "mean",
            Self::Sd => "sd",
        }
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One row of the posterior statistics table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SummaryRow {
    pub param: Parameter,
    /// Posterior mean as reported by the engine.
    pub mean: f64,
    pub median: f64,
    /// Parameter value at the joint maximum-a-posteriori draw.
    pub maxlp: f64,
    /// Monte Carlo standard error of the posterior mean.
    pub se: f64,
    pub ci_lower: f64,
    pub ci_upper: f64,
    pub rhat: f64,
}

/// Index of the draw with the highest log-posterior.
///
/// The earliest draw wins ties and `NaN` values are skipped. Returns `None`
/// if no draw has a comparable value.
#[must_use]
pub fn map_draw_index(draws: &PosteriorDraws) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (index, draw) in draws.iter().enumerate() {
        if draw.log_post.is_nan() {
            continue;
        }
        match best {
            Some((_, best_log_post)) if draw.log_post <= best_log_post => {}
            _ => best = Some((index, draw.log_post)),
        }
    }
    best.map(|(index, _)| index)
}

/// Reduce draws and engine diagnostics into `[mean row, sd row]`.
///
/// Quantiles use linear interpolation between order statistics, so
/// `ci_lower <= median <= ci_upper` holds for any level above one half.
/// The MAP draw is chosen once and shared by both rows.
///
/// # Errors
///
/// Returns `SummaryError` if draws are empty or malformed, or if the level
/// lies outside `(0.5, 1)`.
pub fn summarize_posterior(
    draws: &PosteriorDraws,
    diagnostics: &FitDiagnostics,
    confidence_level: f64,
) -> Result<[SummaryRow; 2], SummaryError> {
    if !(confidence_level > 0.5 && confidence_level < 1.0) {
        return Err(SummaryError::InvalidConfidenceLevel {
            level: confidence_level,
        });
    }
    if draws.is_empty() {
        return Err(SummaryError::EmptyDraws);
    }
    if let Some(index) = draws
        .iter()
        .position(|draw| !(draw.mu.is_finite() && draw.sigma.is_finite()))
    {
        return Err(SummaryError::NonFiniteDraw { index });
    }

    let map_index = map_draw_index(draws).ok_or(SummaryError::NoFiniteLogPosterior)?;
    let map_draw = draws.draws[map_index];

    Ok([
        summarize_parameter(
            Parameter::Mean,
            &draws.mu_values(),
            diagnostics.mu,
            map_draw.mu,
            confidence_level,
        ),
        summarize_parameter(
            Parameter::Sd,
            &draws.sigma_values(),
            diagnostics.sigma,
            map_draw.sigma,
            confidence_level,
        ),
    ])
}

fn summarize_parameter(
    param: Parameter,
    values: &[f64],
    diagnostics: ParameterDiagnostics,
    maxlp: f64,
    confidence_level: f64,
) -> SummaryRow {
    let sorted = sorted_copy(values);
    SummaryRow {
        param,
        mean: diagnostics.posterior_mean,
        median: percentile(&sorted, 0.5),
        maxlp,
        se: diagnostics.monte_carlo_se,
        ci_lower: percentile(&sorted, 1.0 - confidence_level),
        ci_upper: percentile(&sorted, confidence_level),
        rhat: diagnostics.rhat,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::PosteriorDraw;
    use approx::assert_relative_eq;

    fn diagnostics() -> FitDiagnostics {
        FitDiagnostics {
            mu: ParameterDiagnostics {
                posterior_mean: 0.25,
                monte_carlo_se: 0.01,
                rhat: 1.002,
            },
            sigma: ParameterDiagnostics {
                posterior_mean: 1.5,
                monte_carlo_se: 0.02,
                rhat: 1.004,
            },
        }
    }

    fn draw(mu: f64, sigma: f64, log_post: f64) -> PosteriorDraw {
        PosteriorDraw {
            mu,
            sigma,
            log_post,
        }
    }

    #[test]
    fn empty_draws_are_rejected() {
        let result = summarize_posterior(&PosteriorDraws::default(), &diagnostics(), 0.95);
        assert_eq!(result, Err(SummaryError::EmptyDraws));
    }

    #[test]
    fn mean_se_and_rhat_come_from_engine() {
        let draws = PosteriorDraws::new(vec![draw(0.0, 1.0, -1.0), draw(1.0, 2.0, -2.0)]);
        let [mean_row, sd_row] =
            summarize_posterior(&draws, &diagnostics(), 0.95).expect("summary should work");
        assert_eq!(mean_row.param, Parameter::Mean);
        assert_eq!(sd_row.param, Parameter::Sd);
        assert_relative_eq!(mean_row.mean, 0.25);
        assert_relative_eq!(mean_row.se, 0.01);
        assert_relative_eq!(sd_row.rhat, 1.004);
    }

    #[test]
    fn median_averages_central_pair_for_even_length() {
        let draws = PosteriorDraws::new(vec![
            draw(4.0, 1.0, -1.0),
            draw(1.0, 2.0, -1.0),
            draw(3.0, 3.0, -1.0),
            draw(2.0, 4.0, -1.0),
        ]);
        let [mean_row, sd_row] =
            summarize_posterior(&draws, &diagnostics(), 0.9).expect("summary should work");
        assert_relative_eq!(mean_row.median, 2.5);
        assert_relative_eq!(sd_row.median, 2.5);
    }

    #[test]
    fn credible_interval_uses_interpolated_quantiles() {
        let draws = PosteriorDraws::new(
            (0..=10)
                .map(|i| draw(f64::from(i), 1.0, -1.0))
                .collect(),
        );
        let [mean_row, _] =
            summarize_posterior(&draws, &diagnostics(), 0.95).expect("summary should work");
        assert_relative_eq!(mean_row.ci_lower, 0.5, epsilon = 1.0e-12);
        assert_relative_eq!(mean_row.ci_upper, 9.5, epsilon = 1.0e-12);
        assert!(mean_row.ci_lower <= mean_row.median && mean_row.median <= mean_row.ci_upper);
    }

    #[test]
    fn map_is_joint_and_first_tie_wins() {
        let draws = PosteriorDraws::new(vec![
            draw(0.1, 1.1, -5.0),
            draw(0.2, 1.2, -1.0),
            draw(0.3, 1.3, -1.0),
            draw(0.4, 1.4, -3.0),
        ]);
        assert_eq!(map_draw_index(&draws), Some(1));
        let [mean_row, sd_row] =
            summarize_posterior(&draws, &diagnostics(), 0.95).expect("summary should work");
        assert_relative_eq!(mean_row.maxlp, 0.2);
        assert_relative_eq!(sd_row.maxlp, 1.2);
    }

    #[test]
    fn map_skips_nan_log_posterior() {
        let draws = PosteriorDraws::new(vec![draw(0.1, 1.0, f64::NAN), draw(0.2, 1.0, -7.0)]);
        assert_eq!(map_draw_index(&draws), Some(1));
    }

    #[test]
    fn all_nan_log_posterior_is_an_error() {
        let draws = PosteriorDraws::new(vec![draw(0.1, 1.0, f64::NAN)]);
        assert_eq!(
            summarize_posterior(&draws, &diagnostics(), 0.95),
            Err(SummaryError::NoFiniteLogPosterior)
        );
    }

    #[test]
    fn non_finite_parameter_value_is_an_error() {
        let draws = PosteriorDraws::new(vec![draw(0.1, 1.0, -1.0), draw(0.2, f64::INFINITY, -1.0)]);
        assert_eq!(
            summarize_posterior(&draws, &diagnostics(), 0.95),
            Err(SummaryError::NonFiniteDraw { index: 1 })
        );
    }

    #[test]
    fn single_draw_collapses_interval() {
        let draws = PosteriorDraws::new(vec![draw(0.7, 0.4, -2.0)]);
        let [mean_row, sd_row] =
            summarize_posterior(&draws, &diagnostics(), 0.95).expect("summary should work");
        assert_relative_eq!(mean_row.ci_lower, 0.7);
        assert_relative_eq!(mean_row.ci_upper, 0.7);
        assert_relative_eq!(sd_row.median, 0.4);
    }

    #[test]
    fn parameter_names_match_table_labels() {
        assert_eq!(Parameter::Mean.to_string(), "mean");
        assert_eq!(Parameter::Sd.name(), "sd");
    }
}
