//! MCMC convergence diagnostics for scalar parameter chains.

use crate::utils::{mean, sample_variance, usize_to_f64};

/// Minimum per-chain draw count for split-R-hat.
pub const MIN_SPLIT_RHAT_DRAWS: usize = 4;

/// Lag-`k` autocorrelation for a scalar chain.
#[must_use]
pub fn autocorrelation(series: &[f64], lag: usize) -> f64 {
    if series.is_empty() || lag >= series.len() {
        return 0.0;
    }

    let n = series.len() - lag;
    let series_mean = mean(series);

    let mut numerator = 0.0;
    let mut denominator = 0.0;

    for value in series {
        let centered = value - series_mean;
        denominator += centered * centered;
    }

    if denominator <= 0.0 {
        return 0.0;
    }

    for idx in 0..n {
        numerator += (series[idx] - series_mean) * (series[idx + lag] - series_mean);
    }

    numerator / denominator
}

/// Heuristic effective sample size using positive autocorrelation truncation.
#[must_use]
pub fn effective_sample_size(series: &[f64]) -> f64 {
    let n = series.len();
    if n < 2 {
        return usize_to_f64(n);
    }

    let mut rho_sum = 0.0;
    for lag in 1..n {
        let rho = autocorrelation(series, lag);
        if rho <= 0.0 {
            break;
        }
        rho_sum += rho;
    }

    usize_to_f64(n) / (2.0f64.mul_add(rho_sum, 1.0)).max(1.0)
}

/// Split-R-hat across one or more chains.
///
/// Chains are truncated to the shortest common even length and each is split
/// in half, so a single chain still yields two sequences to compare.
/// Returns `None` when fewer than [`MIN_SPLIT_RHAT_DRAWS`] draws per chain
/// are available.
#[must_use]
pub fn split_rhat(chains: &[Vec<f64>]) -> Option<f64> {
    let min_draws = chains.iter().map(Vec::len).min()?;
    let draws_per_chain_used = min_draws - (min_draws % 2);
    if draws_per_chain_used < MIN_SPLIT_RHAT_DRAWS {
        return None;
    }

    let half = draws_per_chain_used / 2;
    let mut split_chains = Vec::with_capacity(chains.len() * 2);
    for chain in chains {
        split_chains.push(&chain[..half]);
        split_chains.push(&chain[half..draws_per_chain_used]);
    }

    Some(split_rhat_scalar(&split_chains))
}

fn split_rhat_scalar(chains: &[&[f64]]) -> f64 {
    let n = chains.first().map_or(0, |chain| chain.len());
    let m = chains.len();

    let chain_means = chains.iter().map(|chain| mean(chain)).collect::<Vec<_>>();
    let chain_vars = chains
        .iter()
        .zip(chain_means.iter())
        .map(|(chain, chain_mean)| sample_variance(chain, *chain_mean))
        .collect::<Vec<_>>();

    let mean_of_means = mean(&chain_means);
    let between = usize_to_f64(n)
        * chain_means
            .iter()
            .map(|chain_mean| {
                let centered = *chain_mean - mean_of_means;
                centered * centered
            })
            .sum::<f64>()
        / usize_to_f64(m - 1);
    let within = mean(&chain_vars);

    if !(within.is_finite() && within > 0.0 && between.is_finite()) {
        return 1.0;
    }

    let n_f64 = usize_to_f64(n);
    let var_plus = ((n_f64 - 1.0) / n_f64).mul_add(within, between / n_f64);
    if !var_plus.is_finite() || var_plus <= 0.0 {
        return 1.0;
    }

    (var_plus / within).sqrt().max(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn autocorrelation_is_zero_for_invalid_lag() {
        let values = [1.0, 2.0, 3.0];
        assert!((autocorrelation(&values, 3) - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn autocorrelation_at_lag_zero_is_one() {
        let values = [1.0, 3.0, 2.0, 5.0];
        assert!((autocorrelation(&values, 0) - 1.0).abs() < 1.0e-12);
    }

    #[test]
    fn ess_bounded_by_chain_length() {
        let values = [1.0, 1.5, 2.0, 2.5, 3.0];
        let ess = effective_sample_size(&values);
        assert!(ess <= 5.0);
        assert!(ess > 0.0);
    }

    #[test]
    fn ess_of_alternating_series_is_full_length() {
        let values = [1.0, -1.0, 1.0, -1.0, 1.0, -1.0];
        assert!((effective_sample_size(&values) - 6.0).abs() < 1.0e-12);
    }

    #[test]
    fn split_rhat_requires_four_draws() {
        assert!(split_rhat(&[vec![1.0, 2.0, 3.0]]).is_none());
        assert!(split_rhat(&[]).is_none());
    }

    #[test]
    fn split_rhat_works_for_single_chain() {
        let chain = vec![0.1, -0.2, 0.3, 0.0, -0.1, 0.2, 0.05, -0.15];
        let rhat = split_rhat(&[chain]).expect("rhat should be available");
        assert!(rhat >= 1.0);
        assert!(rhat < 1.5);
    }

    #[test]
    fn split_rhat_flags_chains_stuck_apart() {
        let chain_a = vec![0.0, 0.1, -0.1, 0.05, 0.0, -0.05];
        let chain_b = vec![10.0, 10.1, 9.9, 10.05, 10.0, 9.95];
        let rhat = split_rhat(&[chain_a, chain_b]).expect("rhat should be available");
        assert!(rhat > 2.0);
    }

    #[test]
    fn split_rhat_of_constant_chains_is_one() {
        let rhat = split_rhat(&[vec![1.0; 6], vec![1.0; 6]]).expect("rhat should be available");
        assert!((rhat - 1.0).abs() < f64::EPSILON);
    }
}
