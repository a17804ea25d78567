/////////////////////////////////////////////////////////////////////////////////////////////\
//
// Shared statistics utilities for posterior summaries and diagnostics.
//
// Created on: 24 Jan 2026     Author: Tobias Kragholm
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! # Utilities
//!
//! Small numeric helpers shared by the sampler, the diagnostics, and the
//! posterior summaries.

use num_traits::ToPrimitive;

/// Lossy `usize -> f64` conversion saturating at `u32::MAX`.
#[must_use]
pub fn usize_to_f64(value: usize) -> f64 {
    f64::from(u32::try_from(value).unwrap_or(u32::MAX))
}

/// Arithmetic mean, or `NaN` for an empty slice.
#[must_use]
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / usize_to_f64(values.len())
}

/// Unbiased sample variance around a precomputed mean; `0` for fewer than two values.
#[must_use]
pub fn sample_variance(values: &[f64], mean: f64) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    values
        .iter()
        .map(|value| {
            let centered = *value - mean;
            centered * centered
        })
        .sum::<f64>()
        / usize_to_f64(values.len() - 1)
}

/// Quantile of already-sorted values with linear interpolation between order
/// statistics (Hyndman-Fan type 7).
///
/// Returns `NaN` for an empty slice.
#[must_use]
pub fn percentile(sorted_values: &[f64], probability: f64) -> f64 {
    if sorted_values.is_empty() {
        return f64::NAN;
    }

    let clamped = probability.clamp(0.0, 1.0);
    let last = sorted_values.len() - 1;
    let position = clamped * usize_to_f64(last);
    let lower = position.floor().to_usize().unwrap_or(0).min(last);
    let upper = position.ceil().to_usize().unwrap_or(last).min(last);

    if lower == upper {
        sorted_values[lower]
    } else {
        let weight = position - usize_to_f64(lower);
        (1.0 - weight).mul_add(sorted_values[lower], weight * sorted_values[upper])
    }
}

/// Sorted copy of `values` using IEEE total ordering.
#[must_use]
pub fn sorted_copy(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn mean_of_empty_slice_is_nan() {
        assert!(mean(&[]).is_nan());
    }

    #[test]
    fn sample_variance_is_zero_for_single_value() {
        assert_relative_eq!(sample_variance(&[3.0], 3.0), 0.0);
    }

    #[test]
    fn sample_variance_uses_n_minus_one() {
        let values = [1.0, 2.0, 3.0, 4.0];
        assert_relative_eq!(sample_variance(&values, mean(&values)), 5.0 / 3.0);
    }

    #[test]
    fn percentile_interpolates_between_order_statistics() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert_relative_eq!(percentile(&sorted, 0.5), 2.5);
        assert_relative_eq!(percentile(&sorted, 0.0), 1.0);
        assert_relative_eq!(percentile(&sorted, 1.0), 4.0);
        assert_relative_eq!(percentile(&sorted, 0.25), 1.75);
    }

    #[test]
    fn percentile_of_odd_length_median_is_central_value() {
        assert_relative_eq!(percentile(&[5.0, 7.0, 100.0], 0.5), 7.0);
    }

    #[test]
    fn percentile_is_nan_for_empty_input() {
        assert!(percentile(&[], 0.5).is_nan());
    }

    #[test]
    fn sorted_copy_leaves_input_untouched() {
        let values = [3.0, -1.0, 2.0];
        let sorted = sorted_copy(&values);
        assert_eq!(sorted, vec![-1.0, 2.0, 3.0]);
        assert_relative_eq!(values[0], 3.0);
    }
}
