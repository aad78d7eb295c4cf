//! Per-document-set sufficient statistics.
//!
//! Holds the latent `(z, x)` assignment of every token, the count tables the
//! collapsed sampler conditions on, and the smoothed parameter snapshots
//! estimated from them. Tables are flat row-major vectors:
//!
//! - `ndk`:       `[doc][topic]`
//! - `nckw`:      `[corpus][topic][word]`
//! - `nckw_star`: `[corpus][topic]`
//!
//! Corpus-agnostic counts are summed over the corpora on demand.

use log::info;

use crate::error::{ModelError, Result};
use crate::prng::Pcg32;
use crate::text::DocumentSet;
use crate::types::*;
use crate::vocab::Vocabulary;

#[derive(Clone, Debug)]
pub struct SufficientStatistics {
    role: SetRole,
    num_topics: usize,
    vocab: Vocabulary,
    corpus: Vec<usize>,
    words: Vec<Vec<WordId>>,
    z: Vec<Vec<Topic>>,
    x: Vec<Vec<Indicator>>,

    ndk: Vec<Count>,
    nckw: Vec<Count>,
    nckw_star: Vec<Count>,

    theta: Vec<f64>,
    phi: Vec<f64>,
    phi_corpus: Vec<f64>,
    // columns of phi/phi_corpus, and the column of each own word in them;
    // differs from the own vocabulary once distributions are adopted
    phi_width: usize,
    word_map: Vec<usize>,
}

impl SufficientStatistics {
    /// Build the vocabulary and assign every token a uniformly random topic
    /// and indicator.
    pub fn new(role: SetRole, set: &DocumentSet, num_topics: usize, rng: &mut Pcg32) -> Result<Self> {
        if num_topics == 0 {
            return Err(ModelError::config("number of topics must be positive"));
        }
        let vocab = Vocabulary::from_documents(set);
        let v = vocab.len();
        let n_docs = set.len();

        let mut stats = SufficientStatistics {
            role,
            num_topics,
            corpus: Vec::with_capacity(n_docs),
            words: Vec::with_capacity(n_docs),
            z: Vec::with_capacity(n_docs),
            x: Vec::with_capacity(n_docs),
            ndk: vec![0; n_docs * num_topics],
            nckw: vec![0; NUM_CORPORA * num_topics * v],
            nckw_star: vec![0; NUM_CORPORA * num_topics],
            theta: vec![0.0; n_docs * num_topics],
            phi: Vec::new(),
            phi_corpus: Vec::new(),
            phi_width: 0,
            word_map: Vec::new(),
            vocab,
        };

        for (d, doc) in set.iter().enumerate() {
            if doc.corpus >= NUM_CORPORA {
                return Err(ModelError::config(format!(
                    "{} document {}: corpus id {} outside 0..{}",
                    role, d, doc.corpus, NUM_CORPORA
                )));
            }
            let c = doc.corpus;
            let mut ws = Vec::with_capacity(doc.len());
            let mut zs = Vec::with_capacity(doc.len());
            let mut xs = Vec::with_capacity(doc.len());
            for token in &doc.tokens {
                let w = stats.vocab.word_index(token)?;
                let x = Indicator::from_index(rng.next_usize(2));
                let k = rng.next_usize(num_topics);
                stats.ndk[doc_topic_index(d, k, num_topics)] += 1;
                stats.nckw[corpus_topic_word_index(c, k, w, num_topics, v)] += 1;
                stats.nckw_star[c * num_topics + k] += 1;
                ws.push(w);
                zs.push(k);
                xs.push(x);
            }
            stats.corpus.push(c);
            stats.words.push(ws);
            stats.z.push(zs);
            stats.x.push(xs);
        }

        info!(
            "{} set: {} documents, {} tokens, vocabulary {}",
            role,
            n_docs,
            set.num_tokens(),
            v
        );
        Ok(stats)
    }

    #[inline] pub fn role(&self) -> SetRole { self.role }
    #[inline] pub fn num_topics(&self) -> usize { self.num_topics }
    #[inline] pub fn num_docs(&self) -> usize { self.words.len() }
    #[inline] pub fn vocab_size(&self) -> usize { self.vocab.len() }
    pub fn vocabulary(&self) -> &Vocabulary { &self.vocab }

    pub fn word_index(&self, token: &str) -> Result<WordId> {
        self.vocab.word_index(token)
    }

    #[inline] pub fn corpus_of(&self, d: usize) -> usize { self.corpus[d] }
    #[inline] pub fn doc_length(&self, d: usize) -> usize { self.words[d].len() }
    #[inline] pub fn word_at(&self, d: usize, i: usize) -> WordId { self.words[d][i] }
    #[inline] pub fn token_at(&self, d: usize, i: usize) -> &str { self.vocab.word(self.words[d][i]) }
    #[inline] pub fn topic_at(&self, d: usize, i: usize) -> Topic { self.z[d][i] }
    #[inline] pub fn indicator_at(&self, d: usize, i: usize) -> Indicator { self.x[d][i] }

    #[inline]
    pub fn topic_count(&self, d: usize, k: Topic) -> Count {
        self.ndk[doc_topic_index(d, k, self.num_topics)]
    }

    #[inline]
    pub fn corpus_topic_word_count(&self, c: usize, k: Topic, w: WordId) -> Count {
        self.nckw[corpus_topic_word_index(c, k, w, self.num_topics, self.vocab.len())]
    }

    #[inline]
    pub fn corpus_topic_total(&self, c: usize, k: Topic) -> Count {
        self.nckw_star[c * self.num_topics + k]
    }

    #[inline]
    pub fn global_topic_word_count(&self, k: Topic, w: WordId) -> Count {
        (0..NUM_CORPORA).map(|c| self.corpus_topic_word_count(c, k, w)).sum()
    }

    #[inline]
    pub fn global_topic_total(&self, k: Topic) -> Count {
        (0..NUM_CORPORA).map(|c| self.corpus_topic_total(c, k)).sum()
    }

    pub fn doc_topic_counts(&self) -> &[Count] { &self.ndk }
    pub fn corpus_topic_word_counts(&self) -> &[Count] { &self.nckw }
    pub fn corpus_topic_totals(&self) -> &[Count] { &self.nckw_star }

    /// Remove token `i` of document `d` from the count tables under its
    /// current topic. Nothing is modified when a count would go negative.
    pub fn exclude(&mut self, d: usize, i: usize) -> Result<()> {
        let k = self.z[d][i];
        let c = self.corpus[d];
        let w = self.words[d][i];
        let dk = doc_topic_index(d, k, self.num_topics);
        let ckw = corpus_topic_word_index(c, k, w, self.num_topics, self.vocab.len());
        let ck = c * self.num_topics + k;

        let site = TokenSite { set: self.role, doc: d, position: i };
        if self.ndk[dk] == 0 {
            return Err(ModelError::CountConsistency { table: "ndk", site });
        }
        if self.nckw[ckw] == 0 {
            return Err(ModelError::CountConsistency { table: "nckw", site });
        }
        if self.nckw_star[ck] == 0 {
            return Err(ModelError::CountConsistency { table: "nckw_star", site });
        }
        self.ndk[dk] -= 1;
        self.nckw[ckw] -= 1;
        self.nckw_star[ck] -= 1;
        Ok(())
    }

    /// Store the new assignment of token `i` of document `d` and add it back
    /// to the count tables.
    pub fn include(&mut self, d: usize, i: usize, k: Topic, x: Indicator) {
        assert!(k < self.num_topics, "topic {} out of range 0..{}", k, self.num_topics);
        let c = self.corpus[d];
        let w = self.words[d][i];
        self.ndk[doc_topic_index(d, k, self.num_topics)] += 1;
        self.nckw[corpus_topic_word_index(c, k, w, self.num_topics, self.vocab.len())] += 1;
        self.nckw_star[c * self.num_topics + k] += 1;
        self.z[d][i] = k;
        self.x[d][i] = x;
    }

    /// `(n_kw + beta) / (n_k* + V beta)` over all corpora.
    #[inline]
    pub fn smoothed_global(&self, k: Topic, w: WordId, beta: f64) -> f64 {
        let vb = self.vocab.len() as f64 * beta;
        (self.global_topic_word_count(k, w) as f64 + beta) / (self.global_topic_total(k) as f64 + vb)
    }

    /// `(n_ckw + beta) / (n_ck* + V beta)` within corpus `c`.
    #[inline]
    pub fn smoothed_corpus(&self, c: usize, k: Topic, w: WordId, beta: f64) -> f64 {
        let vb = self.vocab.len() as f64 * beta;
        (self.corpus_topic_word_count(c, k, w) as f64 + beta) / (self.corpus_topic_total(c, k) as f64 + vb)
    }

    pub fn estimate_theta(&mut self, alpha: f64) {
        let k_alpha = self.num_topics as f64 * alpha;
        for d in 0..self.words.len() {
            let denom = self.words[d].len() as f64 + k_alpha;
            for k in 0..self.num_topics {
                let idx = doc_topic_index(d, k, self.num_topics);
                self.theta[idx] = (self.ndk[idx] as f64 + alpha) / denom;
            }
        }
    }

    pub fn estimate_phi(&mut self, beta: f64) {
        let v = self.vocab.len();
        self.use_own_columns();
        self.phi.clear();
        self.phi.resize(self.num_topics * v, 0.0);
        for k in 0..self.num_topics {
            for w in 0..v {
                self.phi[topic_word_index(k, w, v)] = self.smoothed_global(k, w, beta);
            }
        }
    }

    pub fn estimate_phi_corpus(&mut self, beta: f64) {
        let v = self.vocab.len();
        self.use_own_columns();
        self.phi_corpus.clear();
        self.phi_corpus.resize(NUM_CORPORA * self.num_topics * v, 0.0);
        for c in 0..NUM_CORPORA {
            for k in 0..self.num_topics {
                for w in 0..v {
                    let idx = corpus_topic_word_index(c, k, w, self.num_topics, v);
                    self.phi_corpus[idx] = self.smoothed_corpus(c, k, w, beta);
                }
            }
        }
    }

    // Re-estimated tables are laid out in this set's own word order, so any
    // map left over from an adoption is dropped.
    fn use_own_columns(&mut self) {
        let v = self.vocab.len();
        self.phi_width = v;
        self.word_map.clear();
        self.word_map.extend(0..v);
    }

    /// Copy `phi` and `phi_c` from `source` and index them by this set's
    /// words through `source`'s vocabulary.
    pub fn adopt_word_distributions(&mut self, source: &SufficientStatistics) -> Result<()> {
        if source.num_topics != self.num_topics {
            return Err(ModelError::config(format!(
                "cannot adopt word distributions over {} topics into a {}-topic set",
                source.num_topics, self.num_topics
            )));
        }
        if source.phi.is_empty() || source.phi_corpus.is_empty() {
            return Err(ModelError::config(format!(
                "{} set has no estimated word distributions to adopt",
                source.role
            )));
        }
        let mut word_map = Vec::with_capacity(self.vocab.len());
        for word in self.vocab.words() {
            let id = source.vocab.word_index(word)?;
            word_map.push(source.word_map[id]);
        }
        self.word_map = word_map;
        self.phi_width = source.phi_width;
        self.phi.clone_from(&source.phi);
        self.phi_corpus.clone_from(&source.phi_corpus);
        Ok(())
    }

    #[inline]
    pub fn theta(&self, d: usize, k: Topic) -> f64 {
        self.theta[doc_topic_index(d, k, self.num_topics)]
    }

    pub fn theta_row(&self, d: usize) -> &[f64] {
        let start = d * self.num_topics;
        &self.theta[start..start + self.num_topics]
    }

    /// Number of word columns in the current `phi`/`phi_c` snapshot.
    #[inline] pub fn phi_width(&self) -> usize { self.phi_width }
    pub fn has_word_distributions(&self) -> bool { !self.phi.is_empty() && !self.phi_corpus.is_empty() }

    // Direct snapshot reads, indexed by snapshot column.
    #[inline]
    pub fn phi(&self, k: Topic, col: usize) -> f64 {
        self.phi[topic_word_index(k, col, self.phi_width)]
    }

    #[inline]
    pub fn phi_corpus(&self, c: usize, k: Topic, col: usize) -> f64 {
        self.phi_corpus[corpus_topic_word_index(c, k, col, self.num_topics, self.phi_width)]
    }

    // Snapshot reads for one of this set's own words.
    #[inline]
    pub fn phi_of_word(&self, k: Topic, w: WordId) -> f64 {
        self.phi(k, self.word_map[w])
    }

    #[inline]
    pub fn phi_corpus_of_word(&self, c: usize, k: Topic, w: WordId) -> f64 {
        self.phi_corpus(c, k, self.word_map[w])
    }

    pub fn theta_values(&self) -> &[f64] { &self.theta }
    pub fn phi_values(&self) -> &[f64] { &self.phi }
    pub fn phi_corpus_values(&self) -> &[f64] { &self.phi_corpus }

    /// Recount every table from the assignments and compare.
    pub fn is_consistent(&self) -> bool {
        let k_n = self.num_topics;
        let v = self.vocab.len();
        let mut ndk = vec![0 as Count; self.ndk.len()];
        let mut nckw = vec![0 as Count; self.nckw.len()];
        let mut nckw_star = vec![0 as Count; self.nckw_star.len()];
        for d in 0..self.words.len() {
            let c = self.corpus[d];
            for (i, &w) in self.words[d].iter().enumerate() {
                let k = self.z[d][i];
                ndk[doc_topic_index(d, k, k_n)] += 1;
                nckw[corpus_topic_word_index(c, k, w, k_n, v)] += 1;
                nckw_star[c * k_n + k] += 1;
            }
        }
        ndk == self.ndk && nckw == self.nckw && nckw_star == self.nckw_star
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::parse_documents;
    use approx::assert_abs_diff_eq;

    fn train_stats(k: usize, seed: u64) -> SufficientStatistics {
        let set = parse_documents("0 a b a c\n1 b c b d d\n0 d a\n").unwrap();
        SufficientStatistics::new(SetRole::Train, &set, k, &mut Pcg32::seeded(seed)).unwrap()
    }

    fn assert_conserved(s: &SufficientStatistics) {
        for d in 0..s.num_docs() {
            let total: Count = (0..s.num_topics()).map(|k| s.topic_count(d, k)).sum();
            assert_eq!(total as usize, s.doc_length(d));
        }
        for c in 0..NUM_CORPORA {
            for k in 0..s.num_topics() {
                let total: Count = (0..s.vocab_size()).map(|w| s.corpus_topic_word_count(c, k, w)).sum();
                assert_eq!(total, s.corpus_topic_total(c, k));
            }
        }
        assert!(s.is_consistent());
    }

    #[test]
    fn initial_counts_match_assignments() {
        let s = train_stats(3, 5);
        assert_eq!(s.num_docs(), 3);
        assert_eq!(s.vocab_size(), 4);
        assert_eq!(s.word_index("c").unwrap(), 2);
        assert_eq!(s.token_at(1, 3), "d");
        assert_conserved(&s);
        let global: Count = (0..3).map(|k| s.global_topic_total(k)).sum();
        assert_eq!(global, 11);
    }

    #[test]
    fn exclude_then_include_restores_tables() {
        let mut s = train_stats(3, 9);
        for d in 0..s.num_docs() {
            for i in 0..s.doc_length(d) {
                let before = (s.ndk.clone(), s.nckw.clone(), s.nckw_star.clone());
                let (k, x) = (s.topic_at(d, i), s.indicator_at(d, i));
                s.exclude(d, i).unwrap();
                assert_eq!(s.doc_topic_counts().iter().map(|&n| n as usize).sum::<usize>(), 10);
                s.include(d, i, k, x);
                assert_eq!(before, (s.ndk.clone(), s.nckw.clone(), s.nckw_star.clone()));
            }
        }
    }

    #[test]
    fn moving_tokens_conserves_counts() {
        let mut s = train_stats(4, 2);
        let mut rng = Pcg32::seeded(77);
        for _ in 0..50 {
            for d in 0..s.num_docs() {
                for i in 0..s.doc_length(d) {
                    s.exclude(d, i).unwrap();
                    let k = rng.next_usize(4);
                    s.include(d, i, k, Indicator::from_index(rng.next_usize(2)));
                }
            }
            assert_conserved(&s);
        }
    }

    #[test]
    fn double_exclude_is_a_consistency_error() {
        let set = parse_documents("1 a\n").unwrap();
        let mut s = SufficientStatistics::new(SetRole::Train, &set, 2, &mut Pcg32::seeded(1)).unwrap();
        s.exclude(0, 0).unwrap();
        let err = s.exclude(0, 0).unwrap_err();
        assert_eq!(
            err,
            ModelError::CountConsistency {
                table: "ndk",
                site: TokenSite { set: SetRole::Train, doc: 0, position: 0 },
            }
        );
        assert!(s.doc_topic_counts().iter().all(|&n| n == 0));
    }

    #[test]
    fn estimates_are_normalized() {
        let mut s = train_stats(3, 4);
        s.estimate_theta(0.1);
        s.estimate_phi(0.01);
        s.estimate_phi_corpus(0.01);
        for d in 0..s.num_docs() {
            assert_abs_diff_eq!(s.theta_row(d).iter().sum::<f64>(), 1.0, epsilon = 1e-12);
        }
        for k in 0..3 {
            let row: f64 = (0..s.vocab_size()).map(|w| s.phi(k, w)).sum();
            assert_abs_diff_eq!(row, 1.0, epsilon = 1e-12);
            for c in 0..NUM_CORPORA {
                let row: f64 = (0..s.vocab_size()).map(|w| s.phi_corpus(c, k, w)).sum();
                assert_abs_diff_eq!(row, 1.0, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn theta_matches_formula() {
        let mut s = train_stats(2, 8);
        s.estimate_theta(0.5);
        let expected = (s.topic_count(1, 1) as f64 + 0.5) / (5.0 + 2.0 * 0.5);
        assert_abs_diff_eq!(s.theta(1, 1), expected, epsilon = 1e-15);
    }

    #[test]
    fn adopted_distributions_follow_source_vocabulary() {
        let mut train = train_stats(2, 3);
        train.estimate_phi(0.1);
        train.estimate_phi_corpus(0.1);

        let test_set = parse_documents("1 d a\n").unwrap();
        let mut test = SufficientStatistics::new(SetRole::Test, &test_set, 2, &mut Pcg32::seeded(4)).unwrap();
        assert!(!test.has_word_distributions());
        test.adopt_word_distributions(&train).unwrap();

        assert_eq!(test.phi_width(), 4);
        let d_train = train.word_index("d").unwrap();
        let d_test = test.word_index("d").unwrap();
        assert_eq!(d_test, 0);
        for k in 0..2 {
            assert_eq!(test.phi_of_word(k, d_test), train.phi(k, d_train));
            assert_eq!(test.phi_corpus_of_word(1, k, d_test), train.phi_corpus(1, k, d_train));
        }
    }

    #[test]
    fn estimating_after_adoption_uses_own_columns() {
        let train_set = parse_documents("0 a a a b\n").unwrap();
        let mut train = SufficientStatistics::new(SetRole::Train, &train_set, 1, &mut Pcg32::seeded(1)).unwrap();
        train.estimate_phi(0.1);
        train.estimate_phi_corpus(0.1);

        // same vocabulary size, words first seen in the opposite order
        let other_set = parse_documents("0 b a a\n").unwrap();
        let mut other = SufficientStatistics::new(SetRole::Train, &other_set, 1, &mut Pcg32::seeded(2)).unwrap();
        other.adopt_word_distributions(&train).unwrap();
        let b = other.word_index("b").unwrap();
        assert_eq!(other.phi_of_word(0, b), train.phi(0, train.word_index("b").unwrap()));

        other.estimate_phi(0.1);
        other.estimate_phi_corpus(0.1);
        assert_abs_diff_eq!(other.phi_of_word(0, b), other.smoothed_global(0, b, 0.1), epsilon = 1e-15);
        assert_abs_diff_eq!(other.phi_of_word(0, b), 1.1 / 3.2, epsilon = 1e-15);
        for c in 0..NUM_CORPORA {
            assert_abs_diff_eq!(
                other.phi_corpus_of_word(c, 0, b),
                other.smoothed_corpus(c, 0, b, 0.1),
                epsilon = 1e-15
            );
        }
    }

    #[test]
    fn adopting_requires_known_words() {
        let mut train = train_stats(2, 3);
        train.estimate_phi(0.1);
        train.estimate_phi_corpus(0.1);
        let test_set = parse_documents("0 a zebra\n").unwrap();
        let mut test = SufficientStatistics::new(SetRole::Test, &test_set, 2, &mut Pcg32::seeded(4)).unwrap();
        let err = test.adopt_word_distributions(&train).unwrap_err();
        assert!(matches!(err, ModelError::UnknownToken { ref token, .. } if token == "zebra"));
    }

    #[test]
    fn rejects_unsupported_corpus() {
        use crate::text::{Document, DocumentSet};
        let set = DocumentSet::new(vec![Document::new(2, ["a"])]);
        let err = SufficientStatistics::new(SetRole::Train, &set, 2, &mut Pcg32::seeded(1)).unwrap_err();
        assert!(matches!(err, ModelError::Configuration(_)));
    }
}
