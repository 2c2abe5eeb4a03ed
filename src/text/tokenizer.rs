use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer as SnowballStemmer};

use super::ngrams::NON_WORD_CHARS;

/// Splits text into word tokens.
pub trait Tokenizer {
    fn tokenize(&self, text: &str) -> Vec<String>;
}

/// Reduces a word to its canonical form.
///
/// Implementations must be deterministic and idempotent.
pub trait Stemmer {
    fn stem(&self, word: &str) -> String;
}

lazy_static! {
    static ref WORD_SPLIT: Regex = Regex::new(NON_WORD_CHARS).expect("valid word split pattern");
}

/// Splits on runs of non-word characters (latin, cyrillic, digits and `_` are word characters).
#[derive(Debug, Clone, Copy, Default)]
pub struct WordTokenizer;

impl Tokenizer for WordTokenizer {
    fn tokenize(&self, text: &str) -> Vec<String> {
        WORD_SPLIT
            .split(text)
            .filter(|token| !token.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Lower-cases, then applies the English snowball algorithm.
pub struct EnglishStemmer {
    inner: SnowballStemmer,
}

impl Default for EnglishStemmer {
    fn default() -> Self {
        Self::new()
    }
}

impl EnglishStemmer {
    pub fn new() -> Self {
        Self {
            inner: SnowballStemmer::create(Algorithm::English),
        }
    }
}

impl Stemmer for EnglishStemmer {
    fn stem(&self, word: &str) -> String {
        self.inner.stem(&word.to_lowercase()).to_string()
    }
}
