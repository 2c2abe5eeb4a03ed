use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;

use super::tokenizer::{Tokenizer, WordTokenizer};
use super::TextTools;

/// Word-level part-of-speech partition of a phrase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartsOfSpeech {
    #[serde(default)]
    pub nouns: Vec<String>,
    #[serde(default)]
    pub verbs: Vec<String>,
    #[serde(default)]
    pub adjectives: Vec<String>,
    #[serde(default)]
    pub adverbs: Vec<String>,
    #[serde(default)]
    pub rest: Vec<String>,
}

impl PartsOfSpeech {
    pub fn buckets(&self) -> [&Vec<String>; 5] {
        [
            &self.nouns,
            &self.verbs,
            &self.adjectives,
            &self.adverbs,
            &self.rest,
        ]
    }

    fn buckets_mut(&mut self) -> [&mut Vec<String>; 5] {
        [
            &mut self.nouns,
            &mut self.verbs,
            &mut self.adjectives,
            &mut self.adverbs,
            &mut self.rest,
        ]
    }

    /// Number of words in each bucket, in `buckets()` order.
    pub fn counts(&self) -> [usize; 5] {
        self.buckets().map(|bucket| bucket.len())
    }

    /// Adds the stems of `other`'s words, skipping stems already present.
    pub fn merge_stemmed(&mut self, other: &PartsOfSpeech, tools: &TextTools) {
        for (target, source) in self.buckets_mut().into_iter().zip(other.buckets()) {
            for word in source {
                let stemmed = tools.stem_text(word);
                if !target.contains(&stemmed) {
                    target.push(stemmed);
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PosCategory {
    Noun,
    Verb,
    Adjective,
    Adverb,
}

/// Lexical-category lookup for a word or phrase.
pub trait PosLookup: Send + Sync {
    fn pos_of(&self, text: &str) -> impl Future<Output = Result<PartsOfSpeech>> + Send;
}

/// Dictionary-backed lookup. Words missing from the lexicon land in `rest`.
#[derive(Debug, Clone, Default)]
pub struct LexiconPosLookup {
    lexicon: HashMap<String, Vec<PosCategory>>,
}

impl LexiconPosLookup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a `{"word": ["noun", "verb"], ...}` lexicon.
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: HashMap<String, Vec<PosCategory>> =
            serde_json::from_str(json).context("Failed to parse part-of-speech lexicon")?;
        Ok(Self {
            lexicon: raw
                .into_iter()
                .map(|(word, categories)| (word.to_lowercase(), categories))
                .collect(),
        })
    }

    pub fn with_word(mut self, word: &str, categories: &[PosCategory]) -> Self {
        self.lexicon
            .insert(word.to_lowercase(), categories.to_vec());
        self
    }

    pub fn len(&self) -> usize {
        self.lexicon.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lexicon.is_empty()
    }

    pub fn lookup(&self, text: &str) -> PartsOfSpeech {
        let mut pos = PartsOfSpeech::default();
        for word in WordTokenizer.tokenize(text) {
            match self.lexicon.get(&word.to_lowercase()) {
                Some(categories) if !categories.is_empty() => {
                    for category in categories {
                        let bucket = match category {
                            PosCategory::Noun => &mut pos.nouns,
                            PosCategory::Verb => &mut pos.verbs,
                            PosCategory::Adjective => &mut pos.adjectives,
                            PosCategory::Adverb => &mut pos.adverbs,
                        };
                        push_unique(bucket, &word);
                    }
                }
                _ => push_unique(&mut pos.rest, &word),
            }
        }
        pos
    }
}

fn push_unique(bucket: &mut Vec<String>, word: &str) {
    if !bucket.iter().any(|existing| existing == word) {
        bucket.push(word.to_string());
    }
}

impl PosLookup for LexiconPosLookup {
    async fn pos_of(&self, text: &str) -> Result<PartsOfSpeech> {
        Ok(self.lookup(text))
    }
}
