//! Likelihood and numerical-stability helpers for the truncated-normal model.

use statrs::function::erf::{erf, erfc};

use crate::input::{TruncatedSample, TruncationBounds};
use crate::utils::{mean, usize_to_f64};

/// Beyond this point the upper tail switches to its asymptotic expansion.
const ASYMPTOTIC_TAIL_THRESHOLD: f64 = 25.0;

/// Upper tail `P(Z > z)` of the standard normal.
#[must_use]
pub fn standard_normal_upper_tail(value: f64) -> f64 {
    0.5 * erfc(value / std::f64::consts::SQRT_2)
}

/// `log P(Z > z)`, finite for every finite `z`.
///
/// Far in the upper tail, where `erfc` underflows, this uses the Mills-ratio
/// series `phi(z) / z * (1 - 1/z^2 + 3/z^4 - 15/z^6 + 105/z^8)`.
#[must_use]
pub fn log_standard_normal_upper_tail(value: f64) -> f64 {
    if value <= ASYMPTOTIC_TAIL_THRESHOLD {
        return standard_normal_upper_tail(value).ln();
    }
    let inv_sq = (value * value).recip();
    let series = inv_sq.mul_add(
        inv_sq.mul_add(inv_sq.mul_add(105.0 * inv_sq - 15.0, 3.0), -1.0),
        1.0,
    );
    -0.5 * value * value - value.ln() - 0.5 * std::f64::consts::TAU.ln() + series.ln()
}

/// Stable `log(Phi(beta) - Phi(alpha))` for `alpha < beta`.
///
/// One-sided intervals are handled as a difference of log upper tails, so the
/// mass stays finite however far the interval lies from the origin.
#[must_use]
pub fn log_standard_normal_mass(alpha: f64, beta: f64) -> f64 {
    if !(alpha < beta) {
        return f64::NEG_INFINITY;
    }
    if alpha >= 0.0 {
        log_tail_difference(alpha, beta)
    } else if beta <= 0.0 {
        log_tail_difference(-beta, -alpha)
    } else {
        let mass = 0.5
            * (erf(beta / std::f64::consts::SQRT_2) - erf(alpha / std::f64::consts::SQRT_2));
        if mass > 0.0 {
            mass.ln()
        } else {
            f64::NEG_INFINITY
        }
    }
}

/// `log(Q(near) - Q(far))` for `0 <= near < far`, `Q` the upper tail.
fn log_tail_difference(near: f64, far: f64) -> f64 {
    let log_near = log_standard_normal_upper_tail(near);
    let log_far = log_standard_normal_upper_tail(far);
    let ratio = (log_far - log_near).exp();
    if ratio < 1.0 {
        log_near + (-ratio).ln_1p()
    } else {
        f64::NEG_INFINITY
    }
}

/// Sufficient statistics of a truncated sample.
///
/// The likelihood only depends on the data through `n`, the sample mean, and
/// the centered sum of squares, so each evaluation is `O(1)`.
#[derive(Debug, Clone, Copy)]
pub struct SampleStatistics {
    pub count: usize,
    pub mean: f64,
    pub centered_sum_squares: f64,
    pub bounds: TruncationBounds,
}

impl SampleStatistics {
    #[must_use]
    pub fn from_sample(sample: &TruncatedSample) -> Self {
        let observations = sample.observations();
        let count = observations.len();
        let sample_mean = if count == 0 { 0.0 } else { mean(observations) };
        let centered_sum_squares = observations
            .iter()
            .map(|value| {
                let centered = value - sample_mean;
                centered * centered
            })
            .sum();
        Self {
            count,
            mean: sample_mean,
            centered_sum_squares,
            bounds: sample.bounds(),
        }
    }

    /// Log-likelihood of `Normal(mu, sigma)` truncated to the sample bounds.
    #[must_use]
    pub fn log_likelihood(&self, mu: f64, sigma: f64) -> f64 {
        if !(sigma > 0.0) || !mu.is_finite() {
            return f64::NEG_INFINITY;
        }
        if self.count == 0 {
            return 0.0;
        }

        let n = usize_to_f64(self.count);
        let offset = self.mean - mu;
        let sum_squares = n.mul_add(offset * offset, self.centered_sum_squares);
        let alpha = (self.bounds.lower - mu) / sigma;
        let beta = (self.bounds.upper - mu) / sigma;
        let log_mass = log_standard_normal_mass(alpha, beta);
        if !log_mass.is_finite() {
            return f64::NEG_INFINITY;
        }

        -n * (sigma.ln() + 0.5 * std::f64::consts::TAU.ln() + log_mass)
            - 0.5 * sum_squares / (sigma * sigma)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn naive_log_likelihood(values: &[f64], lower: f64, upper: f64, mu: f64, sigma: f64) -> f64 {
        let phi = |z: f64| 1.0 - standard_normal_upper_tail(z);
        let log_mass = (phi((upper - mu) / sigma) - phi((lower - mu) / sigma)).ln();
        values
            .iter()
            .map(|value| {
                let z = (value - mu) / sigma;
                -0.5 * z * z - sigma.ln() - 0.5 * std::f64::consts::TAU.ln() - log_mass
            })
            .sum()
    }

    #[test]
    fn upper_tail_is_half_at_zero() {
        assert_relative_eq!(standard_normal_upper_tail(0.0), 0.5, epsilon = 1.0e-12);
    }

    #[test]
    fn mass_of_whole_line_is_one() {
        assert_relative_eq!(
            log_standard_normal_mass(f64::NEG_INFINITY, f64::INFINITY),
            0.0,
            epsilon = 1.0e-12
        );
    }

    #[test]
    fn mass_is_stable_far_in_the_tail() {
        let log_mass = log_standard_normal_mass(8.0, 9.0);
        assert!(log_mass.is_finite());
        assert!(log_mass < -30.0);
    }

    #[test]
    fn log_tail_is_continuous_at_the_series_switch() {
        let below = log_standard_normal_upper_tail(ASYMPTOTIC_TAIL_THRESHOLD);
        let above = log_standard_normal_upper_tail(ASYMPTOTIC_TAIL_THRESHOLD + 1.0e-9);
        assert_relative_eq!(below, above, max_relative = 1.0e-9);
    }

    #[test]
    fn mass_stays_finite_where_erfc_underflows() {
        let log_mass = log_standard_normal_mass(40.0, 41.0);
        assert!(log_mass.is_finite());
        // Q(41) is negligible next to Q(40), so the mass is the tail at 40.
        assert_relative_eq!(log_mass, log_standard_normal_upper_tail(40.0), epsilon = 1.0e-9);
        assert_relative_eq!(log_standard_normal_mass(-41.0, -40.0), log_mass, epsilon = 1.0e-12);
    }

    #[test]
    fn far_tail_log_likelihood_is_finite_at_the_origin() {
        let sample = TruncatedSample::new(vec![40.2, 40.5, 40.9], 40.0, 41.0);
        let stats = SampleStatistics::from_sample(&sample);
        assert!(stats.log_likelihood(0.0, 1.0).is_finite());
    }

    #[test]
    fn one_sided_intervals_reach_the_tail_mass() {
        assert_relative_eq!(
            log_standard_normal_mass(1.5, f64::INFINITY),
            standard_normal_upper_tail(1.5).ln(),
            epsilon = 1.0e-12
        );
        assert_relative_eq!(
            log_standard_normal_mass(f64::NEG_INFINITY, -1.5),
            standard_normal_upper_tail(1.5).ln(),
            epsilon = 1.0e-12
        );
    }

    #[test]
    fn empty_interval_has_no_mass() {
        assert!(!log_standard_normal_mass(1.0, 1.0).is_finite());
    }

    #[test]
    fn sufficient_statistics_match_direct_sum() {
        let values = [0.1, 0.4, 0.9, 1.3, 1.9];
        let sample = TruncatedSample::new(values.to_vec(), 0.0, 2.0);
        let stats = SampleStatistics::from_sample(&sample);
        for (mu, sigma) in [(0.5, 0.5), (-1.0, 2.0), (1.7, 0.3)] {
            assert_relative_eq!(
                stats.log_likelihood(mu, sigma),
                naive_log_likelihood(&values, 0.0, 2.0, mu, sigma),
                epsilon = 1.0e-9
            );
        }
    }

    #[test]
    fn empty_sample_has_zero_log_likelihood() {
        let sample = TruncatedSample::new(Vec::new(), 0.0, 1.0);
        let stats = SampleStatistics::from_sample(&sample);
        assert_relative_eq!(stats.log_likelihood(0.3, 1.0), 0.0);
    }

    #[test]
    fn non_positive_sigma_is_impossible() {
        let sample = TruncatedSample::new(vec![0.5], 0.0, 1.0);
        let stats = SampleStatistics::from_sample(&sample);
        assert!(!stats.log_likelihood(0.5, 0.0).is_finite());
    }
}
