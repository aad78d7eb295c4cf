use crate::stats::SufficientStatistics;
use crate::types::Topic;

/// A set of parameter values: one snapshot, or the mean of several.
#[derive(Clone, Debug, PartialEq)]
pub struct Estimates {
    pub num_docs: usize,
    pub num_topics: usize,
    /// Word columns of `phi`/`phi_corpus`.
    pub vocab_size: usize,
    pub theta: Vec<f64>,
    pub phi: Vec<f64>,
    pub phi_corpus: Vec<f64>,
}

impl Estimates {
    pub fn snapshot(stats: &SufficientStatistics) -> Self {
        Estimates {
            num_docs: stats.num_docs(),
            num_topics: stats.num_topics(),
            vocab_size: stats.phi_width(),
            theta: stats.theta_values().to_vec(),
            phi: stats.phi_values().to_vec(),
            phi_corpus: stats.phi_corpus_values().to_vec(),
        }
    }

    pub fn theta_row(&self, d: usize) -> &[f64] {
        &self.theta[d * self.num_topics..(d + 1) * self.num_topics]
    }

    pub fn phi_row(&self, k: Topic) -> &[f64] {
        &self.phi[k * self.vocab_size..(k + 1) * self.vocab_size]
    }

    /// All `[topic][word]` values of corpus `c`.
    pub fn phi_corpus_block(&self, c: usize) -> &[f64] {
        let block = self.num_topics * self.vocab_size;
        &self.phi_corpus[c * block..(c + 1) * block]
    }

    fn same_shape(&self, other: &Estimates) -> bool {
        self.num_docs == other.num_docs
            && self.num_topics == other.num_topics
            && self.vocab_size == other.vocab_size
            && self.theta.len() == other.theta.len()
            && self.phi.len() == other.phi.len()
            && self.phi_corpus.len() == other.phi_corpus.len()
    }
}

/// Running arithmetic mean of parameter snapshots taken after burn-in.
#[derive(Clone, Debug, Default)]
pub struct PosteriorMean {
    samples: usize,
    mean: Option<Estimates>,
}

fn fold(mean: &mut [f64], sample: &[f64], n: f64) {
    for (m, &s) in mean.iter_mut().zip(sample) {
        *m += (s - *m) / n;
    }
}

impl PosteriorMean {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accumulate(&mut self, stats: &SufficientStatistics) {
        self.add(Estimates::snapshot(stats));
    }

    pub fn add(&mut self, sample: Estimates) {
        self.samples += 1;
        let n = self.samples as f64;
        match self.mean.as_mut() {
            Some(mean) if mean.same_shape(&sample) => {
                fold(&mut mean.theta, &sample.theta, n);
                fold(&mut mean.phi, &sample.phi, n);
                fold(&mut mean.phi_corpus, &sample.phi_corpus, n);
            }
            _ => {
                self.samples = 1;
                self.mean = Some(sample);
            }
        }
    }

    #[inline] pub fn samples(&self) -> usize { self.samples }
    pub fn mean(&self) -> Option<&Estimates> { self.mean.as_ref() }

    /// Mean if any snapshot was accumulated, otherwise the current snapshot
    /// of `stats`.
    pub fn estimate_or_snapshot(&self, stats: &SufficientStatistics) -> Estimates {
        match &self.mean {
            Some(m) => m.clone(),
            None => Estimates::snapshot(stats),
        }
    }
}
