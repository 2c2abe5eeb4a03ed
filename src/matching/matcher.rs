use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

use super::fuzzy::{FuzzyIndex, FUZZY_MATCH_THRESHOLD};
use super::stats::MatchStats;
use super::TARGET_MATCH;
use crate::index::{KeywordRecord, Term};

/// Keyword types too generic to be matched by similarity.
pub const GENERIC_KEYWORD_TYPES: &[&str] = &[
    "Age",
    "Color",
    "Composition",
    "Gender",
    "ImageTechnique",
    "NumberOfPeople",
    "Viewpoint",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
    Exact,
    Fuzzy,
}

/// An article term and every image keyword that matched it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TermMatch {
    pub term: Term,
    pub keyword_stems: Vec<String>,
    pub keyword_originals: Vec<String>,
    pub keyword_types: Vec<String>,
    /// `Exact` as soon as one keyword matched by stem equality.
    pub kind: MatchKind,
    pub similarity: f64,
}

impl TermMatch {
    fn accumulate(&mut self, keyword: &KeywordRecord, kind: MatchKind, similarity: f64) {
        push_unique(&mut self.keyword_stems, &keyword.stemmed_text);
        for original in &keyword.original_terms {
            push_unique(&mut self.keyword_originals, original);
        }
        push_unique(&mut self.keyword_types, &keyword.keyword_type);
        if kind == MatchKind::Exact {
            self.kind = MatchKind::Exact;
        }
        self.similarity = self.similarity.max(similarity);
    }
}

fn push_unique(values: &mut Vec<String>, value: &str) {
    if !values.iter().any(|v| v == value) {
        values.push(value.to_string());
    }
}

/// Matches article terms against the keywords of the article's lead image.
#[derive(Debug, Clone)]
pub struct TermMatcher {
    article_terms: Vec<Term>,
    positions: HashMap<String, usize>,
    keywords: Vec<KeywordRecord>,
    fuzzy_index: FuzzyIndex,
    fuzzy_threshold: f64,
    use_fuzzy_matching: bool,
    matches: Vec<TermMatch>,
    stats: Option<MatchStats>,
}

impl TermMatcher {
    pub fn new(article_terms: Vec<Term>, keywords: Vec<KeywordRecord>) -> Self {
        let mut positions = HashMap::new();
        for (index, term) in article_terms.iter().enumerate() {
            positions.entry(term.stemmed_term.clone()).or_insert(index);
        }
        let fuzzy_index = FuzzyIndex::new(article_terms.iter().map(|t| t.stemmed_term.clone()));
        Self {
            article_terms,
            positions,
            keywords,
            fuzzy_index,
            fuzzy_threshold: FUZZY_MATCH_THRESHOLD,
            use_fuzzy_matching: true,
            matches: Vec::new(),
            stats: None,
        }
    }

    pub fn with_fuzzy_matching(mut self, enabled: bool) -> Self {
        self.use_fuzzy_matching = enabled;
        self
    }

    pub fn with_fuzzy_threshold(mut self, threshold: f64) -> Self {
        self.fuzzy_threshold = threshold;
        self
    }

    /// Finds the matches and computes the statistics.
    pub fn match_terms(&mut self) -> &[TermMatch] {
        let mut matches: Vec<TermMatch> = Vec::new();
        let mut by_stem: HashMap<String, usize> = HashMap::new();
        let mut matched_keywords = 0;

        for keyword in &self.keywords {
            let Some((stem, kind, similarity)) = self.find_article_term(keyword) else {
                continue;
            };
            matched_keywords += 1;
            debug!(
                target: TARGET_MATCH,
                "Keyword '{}' matched article term '{}' ({:?}, {:.2})",
                keyword.stemmed_text,
                stem,
                kind,
                similarity
            );

            let index = match by_stem.get(&stem) {
                Some(index) => *index,
                None => {
                    let term = self.article_terms[self.positions[&stem]].clone();
                    matches.push(TermMatch {
                        term,
                        keyword_stems: Vec::new(),
                        keyword_originals: Vec::new(),
                        keyword_types: Vec::new(),
                        kind,
                        similarity,
                    });
                    by_stem.insert(stem, matches.len() - 1);
                    matches.len() - 1
                }
            };
            matches[index].accumulate(keyword, kind, similarity);
        }

        let stats = MatchStats::calculate(&self.article_terms, self.keywords.len(), matched_keywords);
        info!(
            target: TARGET_MATCH,
            "Matched {} of {} keywords onto {} article terms ({}%)",
            matched_keywords,
            self.keywords.len(),
            matches.len(),
            stats.match_percentage
        );
        self.matches = matches;
        self.stats = Some(stats);
        &self.matches
    }

    fn find_article_term(&self, keyword: &KeywordRecord) -> Option<(String, MatchKind, f64)> {
        if self.positions.contains_key(&keyword.stemmed_text) {
            return Some((keyword.stemmed_text.clone(), MatchKind::Exact, 1.0));
        }
        if !self.use_fuzzy_matching
            || GENERIC_KEYWORD_TYPES.contains(&keyword.keyword_type.as_str())
        {
            return None;
        }
        self.fuzzy_index
            .best_match(&keyword.stemmed_text, self.fuzzy_threshold)
            .map(|(stem, similarity)| (stem.to_string(), MatchKind::Fuzzy, similarity))
    }

    /// Matches from the last `match_terms` call.
    pub fn matches(&self) -> &[TermMatch] {
        &self.matches
    }

    pub fn stats(&self) -> Option<&MatchStats> {
        self.stats.as_ref()
    }

    pub fn article_terms(&self) -> &[Term] {
        &self.article_terms
    }

    pub fn keywords(&self) -> &[KeywordRecord] {
        &self.keywords
    }

    fn matched_stems(&self) -> HashSet<&str> {
        self.matches
            .iter()
            .map(|m| m.term.stemmed_term.as_str())
            .collect()
    }

    /// Article terms matched by at least one keyword.
    pub fn keyword_terms(&self) -> Vec<Term> {
        let matched = self.matched_stems();
        self.article_terms
            .iter()
            .filter(|t| matched.contains(t.stemmed_term.as_str()))
            .cloned()
            .collect()
    }

    /// Article terms no keyword matched.
    pub fn non_keyword_terms(&self) -> Vec<Term> {
        let matched = self.matched_stems();
        self.article_terms
            .iter()
            .filter(|t| !matched.contains(t.stemmed_term.as_str()))
            .cloned()
            .collect()
    }
}
