//! Prior specifications and log-density helpers for the truncated-normal model.

/// Hyperparameters for the `(mu, sigma)` prior set.
///
/// Defaults are wide enough to be effectively flat on typical data scales.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TruncatedNormalPriors {
    /// Variance for the Normal(0, variance) prior on `mu`.
    pub mu_variance: f64,
    /// Variance of the half-normal prior on `sigma`.
    pub sigma_variance: f64,
}

impl Default for TruncatedNormalPriors {
    fn default() -> Self {
        Self {
            mu_variance: 1.0e4,
            sigma_variance: 1.0e4,
        }
    }
}

impl TruncatedNormalPriors {
    /// Whether all prior hyperparameters are numerically valid.
    #[must_use]
    pub fn is_valid(self) -> bool {
        self.mu_variance.is_finite()
            && self.mu_variance > 0.0
            && self.sigma_variance.is_finite()
            && self.sigma_variance > 0.0
    }

    /// Joint log prior density of `(mu, sigma)` on the constrained scale.
    #[must_use]
    pub fn log_density(self, mu: f64, sigma: f64) -> f64 {
        log_zero_mean_normal_density(mu, self.mu_variance)
            + log_half_normal_density(sigma, self.sigma_variance)
    }
}

/// Log-density for `Normal(0, variance)`.
#[must_use]
pub fn log_zero_mean_normal_density(value: f64, variance: f64) -> f64 {
    if variance <= 0.0 {
        return f64::NEG_INFINITY;
    }
    -0.5 * (std::f64::consts::TAU.ln() + variance.ln() + value * value / variance)
}

/// Log-density of a half-normal with scale `sqrt(variance)`, supported on `(0, inf)`.
#[must_use]
pub fn log_half_normal_density(value: f64, variance: f64) -> f64 {
    if !(value > 0.0 && variance > 0.0) {
        return f64::NEG_INFINITY;
    }
    std::f64::consts::LN_2 + log_zero_mean_normal_density(value, variance)
}
