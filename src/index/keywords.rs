use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use super::TARGET_INDEX;
use crate::document::{ImageKeyword, LeadImage};
use crate::error::TermError;
use crate::text::{generate_ngrams, is_stopword, TextTools};

/// Keyword type assigned to terms derived from an image caption.
pub const CAPTION_KEYWORD_TYPE: &str = "Caption";

/// A stemmed image keyword or caption term.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordRecord {
    pub keyword_id: Option<i64>,
    pub stemmed_text: String,
    pub original_terms: Vec<String>,
    #[serde(rename = "type")]
    pub keyword_type: String,
    pub relevance: Option<f64>,
}

impl KeywordRecord {
    pub fn is_caption_term(&self) -> bool {
        self.keyword_type == CAPTION_KEYWORD_TYPE
    }
}

/// Builds the extended keyword list of a lead image: its own keywords
/// followed by caption terms whose stem no keyword already covers.
#[derive(Debug, Clone, Default)]
pub struct KeywordIndexer {
    tools: TextTools,
}

impl KeywordIndexer {
    pub fn new(tools: TextTools) -> Self {
        Self { tools }
    }

    pub fn index(&self, image: &LeadImage) -> Result<Vec<KeywordRecord>> {
        let caption_terms = self.caption_terms(image)?;
        let stemmed_caption_terms = self.stem_and_combine(&caption_terms);
        let mut extended = self.stem_keywords(&image.keywords)?;

        let keyword_count = extended.len();
        for (stemmed_text, original_terms) in stemmed_caption_terms {
            if extended.iter().any(|kw| kw.stemmed_text == stemmed_text) {
                continue;
            }
            extended.push(KeywordRecord {
                keyword_id: None,
                stemmed_text,
                original_terms,
                keyword_type: CAPTION_KEYWORD_TYPE.to_string(),
                relevance: None,
            });
        }

        debug!(
            target: TARGET_INDEX,
            "Extended {} image keywords with {} caption terms",
            keyword_count,
            extended.len() - keyword_count
        );
        Ok(extended)
    }

    /// Non-stopword tokens and n-grams of `"<title>. <caption>"`.
    fn caption_terms(&self, image: &LeadImage) -> Result<Vec<String>> {
        let mut parts = Vec::new();
        if !image.title.trim().is_empty() {
            parts.push(format!("{}.", image.title.trim()));
        }
        if !image.caption.trim().is_empty() {
            parts.push(image.caption.trim().to_string());
        }
        let caption = parts.join(" ");

        let tokens = self.tools.tokenize(&caption);
        let ngrams = generate_ngrams(&tokens, None, 2, 4)?;
        Ok(tokens
            .into_iter()
            .filter(|token| !is_stopword(token))
            .chain(ngrams)
            .collect())
    }

    fn stem_and_combine(&self, terms: &[String]) -> Vec<(String, Vec<String>)> {
        let mut combined: Vec<(String, Vec<String>)> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();
        for term in terms {
            let stemmed = self.tools.stem_text(term);
            match positions.get(&stemmed) {
                Some(&index) => {
                    let originals = &mut combined[index].1;
                    if !originals.contains(term) {
                        originals.push(term.clone());
                    }
                }
                None => {
                    positions.insert(stemmed.clone(), combined.len());
                    combined.push((stemmed, vec![term.clone()]));
                }
            }
        }
        combined
    }

    fn stem_keywords(&self, keywords: &[ImageKeyword]) -> Result<Vec<KeywordRecord>> {
        keywords
            .iter()
            .map(|kw| {
                if kw.text.trim().is_empty() {
                    return Err(TermError::invalid_input(format!(
                        "image keyword {:?} has no text",
                        kw.keyword_id
                    )));
                }
                Ok(KeywordRecord {
                    keyword_id: kw.keyword_id,
                    stemmed_text: self.tools.stem_text(&kw.text),
                    original_terms: vec![kw.text.clone()],
                    keyword_type: kw.keyword_type.clone(),
                    relevance: kw.relevance,
                })
            })
            .collect()
    }
}
