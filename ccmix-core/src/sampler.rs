//! Collapsed Gibbs sampler for the cross-collection mixture model.
//!
//! One iteration sweeps every training token, re-estimates the training
//! parameters, sweeps every test token against the freshly estimated training
//! word distributions, re-estimates test theta and scores both sets.
//!
//! Resampling token `i` of document `d` in corpus `c`:
//!
//! ```text
//! p(z = k) ~ (n_dk + a) / (n_d* + K a) * f(k)
//! f(k)     = (n_kw + b) / (n_k* + V b)       if x = 0
//!          = (n_ckw + b) / (n_ck* + V b)     if x = 1
//! p(x = 0) ~ (1 - lambda) * f0(z)
//! p(x = 1) ~ lambda * f1(z)
//! ```
//!
//! with the token excluded from every count. Test tokens replace the smoothed
//! ratios with the training `phi` / `phi_c` snapshot.

use std::borrow::Cow;
use std::ops::ControlFlow;

use log::{debug, info, trace, warn};

use crate::config::{OovPolicy, SamplerConfig};
use crate::error::{ModelError, Result};
use crate::posterior::{Estimates, PosteriorMean};
use crate::prng::Pcg32;
use crate::stats::SufficientStatistics;
use crate::text::{Document, DocumentSet};
use crate::types::*;
use crate::vocab::Vocabulary;

/// Draw an index with probability proportional to `weights`.
///
/// Fails when the weights carry no usable mass instead of picking an
/// arbitrary index.
pub fn sample_categorical(weights: &[f64], rng: &mut Pcg32) -> Result<usize> {
    let total: f64 = weights.iter().sum();
    if weights.is_empty() || !total.is_finite() || total < f64::MIN_POSITIVE {
        return Err(ModelError::DegenerateDistribution { len: weights.len(), total, site: None });
    }
    Ok(pick(weights, total, rng.uniform(total)))
}

// Walk down from `total` and stop at the first index where the running total
// reaches `u`.
fn pick(weights: &[f64], total: f64, u: f64) -> usize {
    let mut running = total;
    for (i, &w) in weights.iter().enumerate() {
        running -= w;
        if running <= u {
            return i;
        }
    }
    // rounding left the running total above u: last outcome with mass
    weights.iter().rposition(|&w| w > 0.0).unwrap_or(weights.len() - 1)
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IterationReport {
    /// 1-based.
    pub iteration: usize,
    pub train_log_likelihood: f64,
    pub test_log_likelihood: f64,
    /// Whether this iteration's snapshot went into the posterior mean.
    pub accumulated: bool,
}

#[derive(Clone, Copy)]
struct Hyper {
    num_topics: usize,
    lambda: f64,
    alpha: f64,
    beta: f64,
}

// Topic-word factor of own word `w` under topic `k`: smoothed counts for the
// training set, the adopted snapshot for the test set.
#[inline]
fn word_factor(stats: &SufficientStatistics, c: usize, k: Topic, w: WordId, x: Indicator, beta: f64) -> f64 {
    match (stats.role(), x) {
        (SetRole::Train, Indicator::Global) => stats.smoothed_global(k, w, beta),
        (SetRole::Train, Indicator::Corpus) => stats.smoothed_corpus(c, k, w, beta),
        (SetRole::Test, Indicator::Global) => stats.phi_of_word(k, w),
        (SetRole::Test, Indicator::Corpus) => stats.phi_corpus_of_word(c, k, w),
    }
}

fn resample_token(
    stats: &mut SufficientStatistics,
    d: usize,
    i: usize,
    rng: &mut Pcg32,
    h: Hyper,
    weights: &mut [f64],
) -> Result<()> {
    let site = TokenSite { set: stats.role(), doc: d, position: i };
    stats.exclude(d, i)?;

    let c = stats.corpus_of(d);
    let w = stats.word_at(d, i);
    let x_cur = stats.indicator_at(d, i);
    let denom = stats.doc_length(d) as f64 + h.num_topics as f64 * h.alpha;
    for (k, weight) in weights.iter_mut().enumerate() {
        let doc_factor = (stats.topic_count(d, k) as f64 + h.alpha) / denom;
        *weight = doc_factor * word_factor(stats, c, k, w, x_cur, h.beta);
    }
    let z_new = sample_categorical(weights, rng).map_err(|e| e.at(site))?;

    let px = [
        (1.0 - h.lambda) * word_factor(stats, c, z_new, w, Indicator::Global, h.beta),
        h.lambda * word_factor(stats, c, z_new, w, Indicator::Corpus, h.beta),
    ];
    let x_new = Indicator::from_index(sample_categorical(&px, rng).map_err(|e| e.at(site))?);

    stats.include(d, i, z_new, x_new);
    Ok(())
}

// Document-ascending, token-ascending pass over one set.
fn sweep(stats: &mut SufficientStatistics, rng: &mut Pcg32, h: Hyper, weights: &mut [f64]) -> Result<()> {
    if stats.role() == SetRole::Test && !stats.has_word_distributions() {
        return Err(ModelError::config("test sweep needs adopted word distributions"));
    }
    for d in 0..stats.num_docs() {
        for i in 0..stats.doc_length(d) {
            resample_token(stats, d, i, rng, h, weights)?;
        }
    }
    Ok(())
}

/// Sum over tokens of `ln sum_k theta[d][k] ((1 - lambda) phi[k][w] + lambda phi_c[c][k][w])`.
pub fn compute_log_likelihood(stats: &SufficientStatistics, lambda: f64) -> Result<f64> {
    let mut ll = 0.0;
    for d in 0..stats.num_docs() {
        let n = stats.doc_length(d);
        if n == 0 {
            continue;
        }
        if !stats.has_word_distributions() {
            return Err(ModelError::config(format!(
                "{} set has no word distributions to score with",
                stats.role()
            )));
        }
        let c = stats.corpus_of(d);
        for i in 0..n {
            let w = stats.word_at(d, i);
            let mut p = 0.0;
            for k in 0..stats.num_topics() {
                let mix = (1.0 - lambda) * stats.phi_of_word(k, w) + lambda * stats.phi_corpus_of_word(c, k, w);
                p += stats.theta(d, k) * mix;
            }
            if !(p > 0.0 && p.is_finite()) {
                return Err(ModelError::NumericalInvariant {
                    value: p,
                    token: stats.token_at(d, i).to_string(),
                    site: TokenSite { set: stats.role(), doc: d, position: i },
                });
            }
            ll += p.ln();
        }
    }
    Ok(ll)
}

// Apply the out-of-vocabulary policy to the test documents.
fn restrict_to_vocabulary<'a>(
    test: &'a DocumentSet,
    vocab: &Vocabulary,
    policy: OovPolicy,
) -> Result<Cow<'a, DocumentSet>> {
    let mut unknown = 0usize;
    for (d, doc) in test.iter().enumerate() {
        for (i, token) in doc.tokens.iter().enumerate() {
            if vocab.get(token).is_some() {
                continue;
            }
            if policy == OovPolicy::Reject {
                return Err(ModelError::UnknownToken {
                    token: token.clone(),
                    site: Some(TokenSite { set: SetRole::Test, doc: d, position: i }),
                });
            }
            unknown += 1;
        }
    }
    if unknown == 0 {
        return Ok(Cow::Borrowed(test));
    }
    warn!("skipping {} test tokens missing from the training vocabulary", unknown);
    let documents = test
        .iter()
        .map(|doc| Document {
            corpus: doc.corpus,
            tokens: doc.tokens.iter().filter(|t| vocab.get(t).is_some()).cloned().collect(),
        })
        .collect();
    Ok(Cow::Owned(DocumentSet::new(documents)))
}

pub struct Sampler {
    config: SamplerConfig,
    train: SufficientStatistics,
    test: SufficientStatistics,
    rng: Pcg32,
    iteration: usize,
    train_mean: PosteriorMean,
    test_mean: PosteriorMean,
    weights: Vec<f64>,
}

impl Sampler {
    /// Validate `config`, build both statistics and assign random initial
    /// topics and indicators.
    pub fn new(train: &DocumentSet, test: &DocumentSet, config: SamplerConfig) -> Result<Self> {
        config.validate()?;
        if train.num_tokens() == 0 {
            return Err(ModelError::config("training set has no tokens"));
        }
        let mut rng = Pcg32::seeded(config.seed);
        let mut init = rng.split();

        let k = config.num_topics;
        let train_stats = SufficientStatistics::new(SetRole::Train, train, k, &mut init)?;
        let test_docs = restrict_to_vocabulary(test, train_stats.vocabulary(), config.oov)?;
        let test_stats = SufficientStatistics::new(SetRole::Test, &test_docs, k, &mut init)?;

        info!(
            "sampler: K={} lambda={} alpha={} beta={} iterations={} burn-in={} seed={}",
            k, config.lambda, config.alpha, config.beta, config.num_iters, config.burn_in, config.seed
        );
        Ok(Sampler {
            train: train_stats,
            test: test_stats,
            rng,
            iteration: 0,
            train_mean: PosteriorMean::new(),
            test_mean: PosteriorMean::new(),
            weights: vec![0.0; k],
            config,
        })
    }

    fn hyper(&self) -> Hyper {
        Hyper {
            num_topics: self.config.num_topics,
            lambda: self.config.lambda,
            alpha: self.config.alpha,
            beta: self.config.beta,
        }
    }

    pub fn config(&self) -> &SamplerConfig { &self.config }
    pub fn train(&self) -> &SufficientStatistics { &self.train }
    pub fn test(&self) -> &SufficientStatistics { &self.test }
    /// Completed iterations.
    pub fn iteration(&self) -> usize { self.iteration }
    pub fn is_finished(&self) -> bool { self.iteration >= self.config.num_iters }
    pub fn train_posterior(&self) -> &PosteriorMean { &self.train_mean }
    pub fn test_posterior(&self) -> &PosteriorMean { &self.test_mean }

    /// Run one full iteration.
    pub fn step(&mut self) -> Result<IterationReport> {
        if self.is_finished() {
            return Err(ModelError::config(format!(
                "all {} iterations have already run",
                self.config.num_iters
            )));
        }
        let h = self.hyper();
        self.iteration += 1;
        let t = self.iteration;

        trace!("iteration {}: train sweep", t);
        sweep(&mut self.train, &mut self.rng, h, &mut self.weights)?;
        self.train.estimate_theta(h.alpha);
        self.train.estimate_phi(h.beta);
        self.train.estimate_phi_corpus(h.beta);

        let accumulated = t > self.config.burn_in;
        if accumulated {
            self.train_mean.accumulate(&self.train);
        }

        // the test sweep and test scoring both read this snapshot
        self.test.adopt_word_distributions(&self.train)?;
        trace!("iteration {}: test sweep", t);
        sweep(&mut self.test, &mut self.rng, h, &mut self.weights)?;
        self.test.estimate_theta(h.alpha);
        if accumulated {
            self.test_mean.accumulate(&self.test);
        }

        let report = IterationReport {
            iteration: t,
            train_log_likelihood: compute_log_likelihood(&self.train, h.lambda)?,
            test_log_likelihood: compute_log_likelihood(&self.test, h.lambda)?,
            accumulated,
        };
        debug!(
            "iteration {}/{}: train ll {} test ll {}",
            t, self.config.num_iters, report.train_log_likelihood, report.test_log_likelihood
        );
        Ok(report)
    }

    /// Run every remaining iteration.
    pub fn run(&mut self) -> Result<Vec<IterationReport>> {
        self.run_with(|_| ControlFlow::Continue(()))
    }

    /// Run the remaining iterations, handing each report to `on_iteration`.
    /// Returning `ControlFlow::Break` stops after the current iteration.
    pub fn run_with<F>(&mut self, mut on_iteration: F) -> Result<Vec<IterationReport>>
    where
        F: FnMut(&IterationReport) -> ControlFlow<()>,
    {
        let mut reports = Vec::with_capacity(self.config.num_iters - self.iteration);
        while !self.is_finished() {
            let report = self.step()?;
            reports.push(report);
            if on_iteration(&report).is_break() {
                info!("stopped after iteration {}", report.iteration);
                break;
            }
        }
        info!(
            "finished {} iterations, {} snapshots averaged",
            self.iteration,
            self.train_mean.samples()
        );
        Ok(reports)
    }

    /// Posterior means of train and test parameters, or the latest snapshots
    /// when no iteration has passed burn-in.
    pub fn final_estimates(&self) -> (Estimates, Estimates) {
        (
            self.train_mean.estimate_or_snapshot(&self.train),
            self.test_mean.estimate_or_snapshot(&self.test),
        )
    }
}
