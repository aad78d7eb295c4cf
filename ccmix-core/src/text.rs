use crate::error::{ModelError, Result};
use crate::posterior::Estimates;
use crate::sampler::IterationReport;
use crate::types::NUM_CORPORA;
use crate::vocab::Vocabulary;

#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    pub corpus: usize,
    pub tokens: Vec<String>,
}
impl Document {
    pub fn new<S: Into<String>>(corpus: usize, tokens: impl IntoIterator<Item = S>) -> Self {
        Document { corpus, tokens: tokens.into_iter().map(Into::into).collect() }
    }
    #[inline] pub fn len(&self) -> usize { self.tokens.len() }
    #[inline] pub fn is_empty(&self) -> bool { self.tokens.is_empty() }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct DocumentSet {
    pub documents: Vec<Document>,
}
impl DocumentSet {
    pub fn new(documents: Vec<Document>) -> Self {
        DocumentSet { documents }
    }
    #[inline] pub fn len(&self) -> usize { self.documents.len() }
    #[inline] pub fn is_empty(&self) -> bool { self.documents.is_empty() }
    pub fn num_tokens(&self) -> usize {
        self.documents.iter().map(Document::len).sum()
    }
    pub fn iter(&self) -> impl Iterator<Item = &Document> {
        self.documents.iter()
    }
}

/// Parse one document per line: a corpus id followed by the document's tokens.
///
/// Blank lines are ignored. A line holding only a corpus id is an empty
/// document.
pub fn parse_documents(s: &str) -> Result<DocumentSet> {
    let mut documents = Vec::new();
    for (lineno, line) in s.lines().enumerate() {
        let mut fields = line.split_whitespace();
        let head = match fields.next() {
            Some(h) => h,
            None => continue,
        };
        let corpus: usize = head.parse().map_err(|_| {
            ModelError::config(format!("line {}: bad corpus id {:?}", lineno + 1, head))
        })?;
        if corpus >= NUM_CORPORA {
            return Err(ModelError::config(format!(
                "line {}: corpus id {} outside 0..{}",
                lineno + 1,
                corpus,
                NUM_CORPORA
            )));
        }
        documents.push(Document::new(corpus, fields));
    }
    Ok(DocumentSet { documents })
}

// one line per iteration: index, train, test
pub fn write_log_likelihoods(reports: &[IterationReport]) -> String {
    reports
        .iter()
        .map(|r| format!("{} {} {}\n", r.iteration, r.train_log_likelihood, r.test_log_likelihood))
        .collect()
}

fn write_rows(out: &mut String, values: &[f64], width: usize) {
    if width == 0 {
        return;
    }
    for row in values.chunks(width) {
        let row: Vec<String> = row.iter().map(f64::to_string).collect();
        out.push_str(&row.join(" "));
        out.push('\n');
    }
}

/// Full output report: log-likelihood table followed by the final estimates.
pub fn write_report(
    reports: &[IterationReport],
    vocabulary: &Vocabulary,
    train: &Estimates,
    test: &Estimates,
) -> String {
    let mut out = format!("# log-likelihood {}\n", reports.len());
    out.push_str(&write_log_likelihoods(reports));

    let k = train.num_topics;
    out.push_str(&format!("# theta train {} {}\n", train.num_docs, k));
    write_rows(&mut out, &train.theta, k);
    out.push_str(&format!("# theta test {} {}\n", test.num_docs, k));
    write_rows(&mut out, &test.theta, k);

    let v = train.vocab_size;
    out.push_str(&format!("# vocabulary {}\n", v));
    out.push_str(&vocabulary.words().join(" "));
    out.push('\n');

    out.push_str(&format!("# phi {} {}\n", k, v));
    write_rows(&mut out, &train.phi, v);
    for c in 0..NUM_CORPORA {
        out.push_str(&format!("# phi_c {} {} {}\n", c, k, v));
        write_rows(&mut out, train.phi_corpus_block(c), v);
    }
    out
}
