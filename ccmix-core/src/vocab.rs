use hashbrown::HashMap;

use crate::error::{ModelError, Result};
use crate::text::DocumentSet;
use crate::types::WordId;

/// Token strings of one document set, indexed in first-seen order.
#[derive(Clone, Debug, Default)]
pub struct Vocabulary {
    ids: HashMap<String, WordId>,
    words: Vec<String>,
}

impl Vocabulary {
    pub fn from_documents(set: &DocumentSet) -> Self {
        let mut vocab = Vocabulary::default();
        for doc in set.iter() {
            for token in &doc.tokens {
                vocab.intern(token);
            }
        }
        vocab
    }

    fn intern(&mut self, token: &str) -> WordId {
        if let Some(&id) = self.ids.get(token) {
            return id;
        }
        let id = self.words.len();
        self.ids.insert(token.to_string(), id);
        self.words.push(token.to_string());
        id
    }

    #[inline]
    pub fn get(&self, token: &str) -> Option<WordId> {
        self.ids.get(token).copied()
    }

    pub fn word_index(&self, token: &str) -> Result<WordId> {
        self.get(token).ok_or_else(|| ModelError::UnknownToken { token: token.to_string(), site: None })
    }

    #[inline]
    pub fn word(&self, id: WordId) -> &str {
        &self.words[id]
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    #[inline] pub fn len(&self) -> usize { self.words.len() }
    #[inline] pub fn is_empty(&self) -> bool { self.words.is_empty() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::parse_documents;

    #[test]
    fn first_seen_order() {
        let set = parse_documents("0 b a b\n1 c a\n").unwrap();
        let vocab = Vocabulary::from_documents(&set);
        assert_eq!(vocab.len(), 3);
        assert_eq!(vocab.words(), ["b", "a", "c"]);
        assert_eq!(vocab.word_index("a").unwrap(), 1);
        assert_eq!(vocab.word(2), "c");
    }

    #[test]
    fn unknown_token_is_an_error() {
        let set = parse_documents("0 a\n").unwrap();
        let vocab = Vocabulary::from_documents(&set);
        assert_eq!(
            vocab.word_index("z"),
            Err(ModelError::UnknownToken { token: "z".into(), site: None })
        );
    }
}
