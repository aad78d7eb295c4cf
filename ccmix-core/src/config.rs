use crate::error::{ModelError, Result};
use crate::types::DEFAULT_SEED;

/// What to do with test tokens the training vocabulary never saw.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum OovPolicy {
    /// Drop them from the test documents before sampling.
    #[default]
    Skip,
    /// Fail with an unknown-token error.
    Reject,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SamplerConfig {
    pub num_topics: usize,
    /// Prior weight of the corpus-specific word distribution.
    pub lambda: f64,
    /// Dirichlet pseudo-count for document-topic distributions.
    pub alpha: f64,
    /// Dirichlet pseudo-count for topic-word distributions.
    pub beta: f64,
    pub num_iters: usize,
    /// Iterations excluded from the posterior mean.
    pub burn_in: usize,
    pub seed: u64,
    pub oov: OovPolicy,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        SamplerConfig {
            num_topics: 10,
            lambda: 0.5,
            alpha: 0.1,
            beta: 0.01,
            num_iters: 1100,
            burn_in: 1000,
            seed: DEFAULT_SEED,
            oov: OovPolicy::Skip,
        }
    }
}

impl SamplerConfig {
    pub fn new(num_topics: usize) -> Self {
        SamplerConfig { num_topics, ..Default::default() }
    }

    pub fn lambda(mut self, lambda: f64) -> Self { self.lambda = lambda; self }
    pub fn alpha(mut self, alpha: f64) -> Self { self.alpha = alpha; self }
    pub fn beta(mut self, beta: f64) -> Self { self.beta = beta; self }
    pub fn num_iters(mut self, n: usize) -> Self { self.num_iters = n; self }
    pub fn burn_in(mut self, n: usize) -> Self { self.burn_in = n; self }
    pub fn seed(mut self, seed: u64) -> Self { self.seed = seed; self }
    pub fn oov(mut self, oov: OovPolicy) -> Self { self.oov = oov; self }

    pub fn validate(&self) -> Result<()> {
        if self.num_topics == 0 {
            return Err(ModelError::config("number of topics must be positive"));
        }
        if !(0.0..=1.0).contains(&self.lambda) {
            return Err(ModelError::config(format!("lambda must lie in [0, 1], got {}", self.lambda)));
        }
        if !(self.alpha.is_finite() && self.alpha > 0.0) {
            return Err(ModelError::config(format!("alpha must be positive, got {}", self.alpha)));
        }
        if !(self.beta.is_finite() && self.beta > 0.0) {
            return Err(ModelError::config(format!("beta must be positive, got {}", self.beta)));
        }
        if self.num_iters == 0 {
            return Err(ModelError::config("number of iterations must be positive"));
        }
        if self.burn_in > self.num_iters {
            return Err(ModelError::config(format!(
                "burn-in ({}) exceeds number of iterations ({})",
                self.burn_in, self.num_iters
            )));
        }
        Ok(())
    }
}
