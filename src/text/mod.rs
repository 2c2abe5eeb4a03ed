pub mod ngrams;
pub mod overlap;
pub mod pos;
pub mod stopwords;
pub mod tokenizer;

use std::sync::Arc;

pub use ngrams::{generate_ngrams, phrase_offset, NON_WORD_CHARS, NON_WORD_NON_PUNCTUATION_CHARS};
pub use overlap::{find_overlap, Overlap};
pub use pos::{LexiconPosLookup, PartsOfSpeech, PosCategory, PosLookup};
pub use stopwords::is_stopword;
pub use tokenizer::{EnglishStemmer, Stemmer, Tokenizer, WordTokenizer};

pub const TARGET_TEXT: &str = "text";

/// Tokenizer and stemmer pair shared by every indexer.
#[derive(Clone)]
pub struct TextTools {
    tokenizer: Arc<dyn Tokenizer + Send + Sync>,
    stemmer: Arc<dyn Stemmer + Send + Sync>,
}

impl Default for TextTools {
    fn default() -> Self {
        Self {
            tokenizer: Arc::new(WordTokenizer),
            stemmer: Arc::new(EnglishStemmer::new()),
        }
    }
}

impl std::fmt::Debug for TextTools {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextTools").finish_non_exhaustive()
    }
}

impl TextTools {
    pub fn new(
        tokenizer: Arc<dyn Tokenizer + Send + Sync>,
        stemmer: Arc<dyn Stemmer + Send + Sync>,
    ) -> Self {
        Self { tokenizer, stemmer }
    }

    pub fn tokenize(&self, text: &str) -> Vec<String> {
        self.tokenizer.tokenize(text)
    }

    pub fn stem(&self, word: &str) -> String {
        self.stemmer.stem(word)
    }

    /// Stems every token of `text` and joins the stems with single spaces.
    pub fn stem_text(&self, text: &str) -> String {
        self.tokenize(text)
            .iter()
            .map(|token| self.stem(token))
            .collect::<Vec<_>>()
            .join(" ")
    }
}
