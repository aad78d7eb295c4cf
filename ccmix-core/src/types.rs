use core::fmt;

pub type Topic = usize;
pub type WordId = usize;
pub type Count = u32;

/// Number of collections the model distinguishes.
pub const NUM_CORPORA: usize = 2;

pub const DEFAULT_SEED: u64 = 1;

/// Per-token flag choosing the word distribution a token is drawn from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Indicator {
    Global,
    Corpus,
}

impl Indicator {
    #[inline]
    pub fn from_index(i: usize) -> Self {
        if i == 0 { Indicator::Global } else { Indicator::Corpus }
    }
}

/// Which document set a statistics value holds.
///
/// The training set estimates word distributions from its own counts; the
/// test set inherits them from training.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SetRole {
    Train,
    Test,
}

impl fmt::Display for SetRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SetRole::Train => f.write_str("train"),
            SetRole::Test => f.write_str("test"),
        }
    }
}

/// Location of a token, used to name it in error messages.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TokenSite {
    pub set: SetRole,
    pub doc: usize,
    pub position: usize,
}

impl fmt::Display for TokenSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} document {}, position {}", self.set, self.doc, self.position)
    }
}

// flat offset helpers for the count and parameter tables
#[inline]
pub fn doc_topic_index(d: usize, k: Topic, num_topics: usize) -> usize {
    d * num_topics + k
}

#[inline]
pub fn topic_word_index(k: Topic, w: WordId, vocab_size: usize) -> usize {
    k * vocab_size + w
}

#[inline]
pub fn corpus_topic_word_index(c: usize, k: Topic, w: WordId, num_topics: usize, vocab_size: usize) -> usize {
    (c * num_topics + k) * vocab_size + w
}
