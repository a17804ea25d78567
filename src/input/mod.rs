//! # Model inputs
//!
//! Containers for a truncated sample, its truncation bounds, and the sampler
//! starting point, plus the up-front validation run before any inference.
//!
//! # Examples
//!
//! ```
//! use truncnorm_bayes::{InitialGuess, TruncatedSample, validate_inputs};
//!
//! let sample = TruncatedSample::new(vec![0.2, 0.9, 1.4], 0.0, 2.0);
//! assert!(validate_inputs(&sample, InitialGuess::default(), 0.95).is_ok());
//! ```
//!
//! ```
//! use truncnorm_bayes::{InitialGuess, InputError, TruncatedSample, validate_inputs};
//!
//! let sample = TruncatedSample::new(vec![0.2, 2.5], 0.0, 2.0);
//! let err = validate_inputs(&sample, InitialGuess::default(), 0.95).unwrap_err();
//! assert!(matches!(err, InputError::DataOutOfBounds { index: 1, .. }));
//! ```

use std::cmp::Ordering;

use thiserror::Error;

/// Default two-sided credible level.
pub const DEFAULT_CONFIDENCE_LEVEL: f64 = 0.95;

/// Errors returned when validating estimation inputs.
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum InputError {
    #[error("lower truncation bound ({lower}) must be smaller than upper bound ({upper})")]
    InvalidBounds { lower: f64, upper: f64 },
    #[error("starting standard deviation must be positive; found {sd_start}")]
    InvalidStartValue { sd_start: f64 },
    #[error("observation {index} ({value}) lies outside [{lower}, {upper}]")]
    DataOutOfBounds {
        index: usize,
        value: f64,
        lower: f64,
        upper: f64,
    },
    #[error("confidence level must lie strictly between 0.5 and 1; found {level}")]
    InvalidConfidenceLevel { level: f64 },
}

/// Known truncation interval `[lower, upper]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TruncationBounds {
    pub lower: f64,
    pub upper: f64,
}

impl TruncationBounds {
    #[must_use]
    pub const fn new(lower: f64, upper: f64) -> Self {
        Self { lower, upper }
    }

    /// Whether `value` lies in the closed interval. `NaN` is never contained.
    #[must_use]
    pub fn contains(self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }

    #[must_use]
    pub fn width(self) -> f64 {
        self.upper - self.lower
    }
}

/// Observed values together with the interval they were truncated to.
#[derive(Debug, Clone)]
pub struct TruncatedSample {
    pub observations: Vec<f64>,
    pub bounds: TruncationBounds,
}

impl TruncatedSample {
    #[must_use]
    pub const fn new(observations: Vec<f64>, lower: f64, upper: f64) -> Self {
        Self {
            observations,
            bounds: TruncationBounds::new(lower, upper),
        }
    }

    #[must_use]
    pub fn observations(&self) -> &[f64] {
        &self.observations
    }

    #[must_use]
    pub const fn bounds(&self) -> TruncationBounds {
        self.bounds
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.observations.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
}

/// Starting values handed to every sampling chain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InitialGuess {
    pub mean_start: f64,
    pub sd_start: f64,
}

impl Default for InitialGuess {
    fn default() -> Self {
        Self {
            mean_start: 0.0,
            sd_start: 1.0,
        }
    }
}

/// Check structural preconditions before any inference runs.
///
/// Checks run in a fixed order and the first failure is returned:
/// bounds, starting standard deviation, observations, confidence level.
///
/// # Errors
///
/// Returns `InputError` describing the first violated precondition.
pub fn validate_inputs(
    sample: &TruncatedSample,
    init: InitialGuess,
    confidence_level: f64,
) -> Result<(), InputError> {
    let bounds = sample.bounds;
    if bounds.lower.partial_cmp(&bounds.upper) != Some(Ordering::Less) {
        return Err(InputError::InvalidBounds {
            lower: bounds.lower,
            upper: bounds.upper,
        });
    }
    if init.sd_start.partial_cmp(&0.0) != Some(Ordering::Greater) {
        return Err(InputError::InvalidStartValue {
            sd_start: init.sd_start,
        });
    }
    if let Some((index, &value)) = sample
        .observations
        .iter()
        .enumerate()
        .find(|(_, value)| !bounds.contains(**value))
    {
        return Err(InputError::DataOutOfBounds {
            index,
            value,
            lower: bounds.lower,
            upper: bounds.upper,
        });
    }
    if !(confidence_level > 0.5 && confidence_level < 1.0) {
        return Err(InputError::InvalidConfidenceLevel {
            level: confidence_level,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(values: &[f64]) -> TruncatedSample {
        TruncatedSample::new(values.to_vec(), 0.0, 2.0)
    }

    #[test]
    fn accepts_values_on_the_bounds() {
        let input = sample(&[0.0, 1.0, 2.0]);
        assert!(validate_inputs(&input, InitialGuess::default(), 0.95).is_ok());
    }

    #[test]
    fn accepts_empty_sample() {
        let input = sample(&[]);
        assert!(validate_inputs(&input, InitialGuess::default(), 0.95).is_ok());
    }

    #[test]
    fn bounds_are_checked_before_everything_else() {
        let input = TruncatedSample::new(vec![5.0], 2.0, 2.0);
        let init = InitialGuess {
            mean_start: 0.0,
            sd_start: -1.0,
        };
        assert!(matches!(
            validate_inputs(&input, init, 0.2),
            Err(InputError::InvalidBounds { .. })
        ));
    }

    #[test]
    fn nan_bounds_are_rejected() {
        let input = TruncatedSample::new(vec![], f64::NAN, 1.0);
        assert!(matches!(
            validate_inputs(&input, InitialGuess::default(), 0.95),
            Err(InputError::InvalidBounds { .. })
        ));
    }

    #[test]
    fn non_positive_start_sd_is_rejected_before_data() {
        let input = sample(&[3.0]);
        let init = InitialGuess {
            mean_start: 0.0,
            sd_start: 0.0,
        };
        assert!(matches!(
            validate_inputs(&input, init, 0.95),
            Err(InputError::InvalidStartValue { .. })
        ));
    }

    #[test]
    fn reports_first_out_of_bounds_observation() {
        let input = sample(&[0.5, -0.1, 2.5]);
        assert_eq!(
            validate_inputs(&input, InitialGuess::default(), 0.95),
            Err(InputError::DataOutOfBounds {
                index: 1,
                value: -0.1,
                lower: 0.0,
                upper: 2.0,
            })
        );
    }

    #[test]
    fn nan_observation_is_out_of_bounds() {
        let input = sample(&[0.5, f64::NAN]);
        assert!(matches!(
            validate_inputs(&input, InitialGuess::default(), 0.95),
            Err(InputError::DataOutOfBounds { index: 1, .. })
        ));
    }

    #[test]
    fn confidence_level_must_be_open_interval() {
        let input = sample(&[1.0]);
        for level in [0.5, 1.0, 0.3, f64::NAN] {
            assert!(matches!(
                validate_inputs(&input, InitialGuess::default(), level),
                Err(InputError::InvalidConfidenceLevel { .. })
            ));
        }
        assert!(validate_inputs(&input, InitialGuess::default(), 0.51).is_ok());
    }
}
