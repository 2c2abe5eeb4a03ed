use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::document::ParagraphType;
use crate::text::{is_stopword, PartsOfSpeech};

/// A surface string collected from the article before stemming.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTerm {
    pub original_term: String,
    /// One entry per occurrence.
    pub containing_elements: Vec<ParagraphType>,
    pub pos: PartsOfSpeech,
    pub first_occurrence: Option<f64>,
}

impl RawTerm {
    pub fn new(original_term: &str) -> Self {
        RawTerm {
            original_term: original_term.to_string(),
            containing_elements: Vec::new(),
            pos: PartsOfSpeech::default(),
            first_occurrence: None,
        }
    }
}

/// A stemmed lexical unit of an article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Term {
    pub stemmed_term: String,
    pub original_terms: Vec<String>,
    /// Paragraph type of every occurrence (a multiset).
    pub containing_elements: Vec<ParagraphType>,
    pub term_frequency: usize,
    /// Normalised position in `[0, 1]`; `None` when the term could not be located.
    pub first_occurrence: Option<f64>,
    pub pos: PartsOfSpeech,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_keyword: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,
}

impl Term {
    pub fn new(stemmed_term: &str) -> Self {
        Term {
            stemmed_term: stemmed_term.to_string(),
            original_terms: Vec::new(),
            containing_elements: Vec::new(),
            term_frequency: 0,
            first_occurrence: None,
            pos: PartsOfSpeech::default(),
            is_keyword: None,
            entity_type: None,
        }
    }

    /// Display form used when building queries.
    pub fn display_form(&self) -> &str {
        self.original_terms
            .first()
            .map(String::as_str)
            .unwrap_or(&self.stemmed_term)
    }

    /// Distinct paragraph types in first-seen order.
    pub fn element_types(&self) -> Vec<ParagraphType> {
        let mut distinct: Vec<ParagraphType> = Vec::new();
        for element in &self.containing_elements {
            if !distinct.contains(element) {
                distinct.push(element.clone());
            }
        }
        distinct
    }

    pub fn is_entity(&self) -> bool {
        self.entity_type.is_some()
    }

    /// A term is a stopword when its stem is one, or every surface form is.
    pub fn is_stopword(&self) -> bool {
        is_stopword(&self.stemmed_term)
            || (!self.original_terms.is_empty()
                && self.original_terms.iter().all(|term| is_stopword(term)))
    }

    pub fn word_count(&self) -> usize {
        self.display_form().split_whitespace().count()
    }
}

/// Terms keyed by stem, iterated in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TermIndex {
    terms: Vec<Term>,
    positions: HashMap<String, usize>,
}

impl TermIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `term` unless its stem is already present. Returns whether it was inserted.
    pub fn insert(&mut self, term: Term) -> bool {
        if self.positions.contains_key(&term.stemmed_term) {
            return false;
        }
        self.positions
            .insert(term.stemmed_term.clone(), self.terms.len());
        self.terms.push(term);
        true
    }

    pub fn get(&self, stemmed_term: &str) -> Option<&Term> {
        self.positions
            .get(stemmed_term)
            .map(|&index| &self.terms[index])
    }

    pub fn get_mut(&mut self, stemmed_term: &str) -> Option<&mut Term> {
        match self.positions.get(stemmed_term) {
            Some(&index) => Some(&mut self.terms[index]),
            None => None,
        }
    }

    pub fn contains(&self, stemmed_term: &str) -> bool {
        self.positions.contains_key(stemmed_term)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Term> {
        self.terms.iter()
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn to_vec(&self) -> Vec<Term> {
        self.terms.clone()
    }

    pub fn into_vec(self) -> Vec<Term> {
        self.terms
    }
}

impl FromIterator<Term> for TermIndex {
    fn from_iter<I: IntoIterator<Item = Term>>(iter: I) -> Self {
        let mut index = TermIndex::new();
        for term in iter {
            index.insert(term);
        }
        index
    }
}
