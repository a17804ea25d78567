//! # Models
//!
//! Model families supported by the crate. Each family bundles its likelihood,
//! priors, built-in sampler, diagnostics, and posterior summaries.

pub mod truncnorm;
