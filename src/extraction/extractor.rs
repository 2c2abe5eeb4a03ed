use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::{info, warn};

use super::query::{generate_query, query_from_entities, CollapsePolicy};
use super::TARGET_EXTRACT;
use crate::error::TermError;
use crate::index::Term;
use crate::text::TextTools;

/// A term with its probability of being a good search term.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredTerm {
    #[serde(flatten)]
    pub term: Term,
    pub p: f64,
}

/// Assigns search-term probabilities to a set of non-stopword terms.
///
/// Implementations return one score per input term; ranking is done by the
/// extractor.
pub trait ScoringStrategy {
    fn name(&self) -> &'static str;

    fn calculate_probabilities(&self, terms: &[Term]) -> Result<Vec<ScoredTerm>>;
}

impl<S: ScoringStrategy + ?Sized> ScoringStrategy for &S {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn calculate_probabilities(&self, terms: &[Term]) -> Result<Vec<ScoredTerm>> {
        (**self).calculate_probabilities(terms)
    }
}

/// Which query heuristic `generate_search_term` applies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum QueryMode {
    /// Collapse subterms of the terms above the threshold and join the best two.
    #[default]
    Heuristic,
    /// Use entity terms only.
    EntitiesOnly,
}

pub struct SearchTermExtractor<S: ScoringStrategy> {
    strategy: S,
    terms: Vec<Term>,
    keyword_threshold: f64,
    policy: CollapsePolicy,
    tools: TextTools,
    ranked: Option<Vec<ScoredTerm>>,
    query: Option<String>,
}

impl<S: ScoringStrategy> SearchTermExtractor<S> {
    /// Stopword terms are dropped here and never scored.
    pub fn new(strategy: S, terms: Vec<Term>, keyword_threshold: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&keyword_threshold) {
            return Err(TermError::invalid_input(format!(
                "keyword threshold {} is outside [0, 1]",
                keyword_threshold
            )));
        }
        let terms: Vec<Term> = terms.into_iter().filter(|t| !t.is_stopword()).collect();
        Ok(Self {
            strategy,
            terms,
            keyword_threshold,
            policy: CollapsePolicy::default(),
            tools: TextTools::default(),
            ranked: None,
            query: None,
        })
    }

    pub fn with_policy(mut self, policy: CollapsePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Tokenizer used to count the words of entity names.
    pub fn with_tools(mut self, tools: TextTools) -> Self {
        self.tools = tools;
        self
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    pub fn keyword_threshold(&self) -> f64 {
        self.keyword_threshold
    }

    /// Terms that take part in scoring.
    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    /// Scores and ranks the terms, then builds the query.
    ///
    /// An empty string means no query was found.
    pub fn generate_search_term(&mut self, mode: QueryMode) -> Result<String> {
        let mut ranked = self.strategy.calculate_probabilities(&self.terms)?;
        if ranked.len() != self.terms.len() {
            return Err(TermError::model(format!(
                "{} strategy scored {} of {} terms",
                self.strategy.name(),
                ranked.len(),
                self.terms.len()
            )));
        }
        ranked.sort_by(|a, b| b.p.partial_cmp(&a.p).unwrap_or(Ordering::Equal));

        let query = match mode {
            QueryMode::Heuristic => generate_query(&ranked, self.keyword_threshold, self.policy),
            QueryMode::EntitiesOnly => query_from_entities(&ranked, &self.tools),
        };
        if query.is_empty() {
            warn!(
                target: TARGET_EXTRACT,
                "No query found among {} terms ({} strategy, {:?})",
                ranked.len(),
                self.strategy.name(),
                mode
            );
        } else {
            info!(
                target: TARGET_EXTRACT,
                "Generated query '{}' from {} terms ({} strategy)", query, ranked.len(), self.strategy.name()
            );
        }

        self.ranked = Some(ranked);
        self.query = Some(query.clone());
        Ok(query)
    }

    /// Ranked terms; empty until `generate_search_term` has run.
    pub fn ranked_terms(&self) -> &[ScoredTerm] {
        self.ranked.as_deref().unwrap_or_default()
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// Ranked terms with `p` above the threshold.
    pub fn keywords(&self) -> Vec<ScoredTerm> {
        self.partition(true)
    }

    /// Ranked terms with `p` at or below the threshold.
    pub fn non_keywords(&self) -> Vec<ScoredTerm> {
        self.partition(false)
    }

    fn partition(&self, above: bool) -> Vec<ScoredTerm> {
        self.ranked_terms()
            .iter()
            .filter(|scored| (scored.p > self.keyword_threshold) == above)
            .cloned()
            .collect()
    }
}
