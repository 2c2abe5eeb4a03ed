use anyhow::Result;
use futures::future::try_join_all;
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::{debug, info, warn};

use super::types::{RawTerm, Term, TermIndex};
use super::TARGET_INDEX;
use crate::document::{Article, Paragraph};
use crate::entity::{aggregate_entities, Aggregation, EntityTree};
use crate::error::TermError;
use crate::text::{generate_ngrams, phrase_offset, PartsOfSpeech, PosLookup, TextTools};

const MIN_NGRAM_LENGTH: usize = 2;
const MAX_NGRAM_LENGTH: usize = 4;

/// Builds the stemmed term index of one article.
///
/// The index is only published once every stage has completed; a failed
/// lookup leaves the indexer without terms.
#[derive(Debug)]
pub struct ArticleIndexer {
    tools: TextTools,
    paragraphs: Vec<Paragraph>,
    full_text: String,
    full_text_stemmed: String,
    canonical: Option<TermIndex>,
    aggregated: Option<TermIndex>,
}

impl ArticleIndexer {
    pub fn new(article: &Article, tools: TextTools) -> Result<Self> {
        let paragraphs = article.paragraphs_with_headline();
        if paragraphs.iter().all(|p| p.content.trim().is_empty()) {
            return Err(TermError::invalid_input(
                "article has no headline and no paragraph content",
            ));
        }

        let full_text = paragraphs
            .iter()
            .map(|p| p.content.as_str())
            .filter(|content| !content.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        let full_text_stemmed = tools.stem_text(&full_text);

        Ok(Self {
            tools,
            paragraphs,
            full_text,
            full_text_stemmed,
            canonical: None,
            aggregated: None,
        })
    }

    pub fn full_text(&self) -> &str {
        &self.full_text
    }

    pub fn full_text_stemmed(&self) -> &str {
        &self.full_text_stemmed
    }

    pub fn tools(&self) -> &TextTools {
        &self.tools
    }

    pub fn is_indexed(&self) -> bool {
        self.canonical.is_some()
    }

    /// Tokens and clause-bounded n-grams of every paragraph, keyed by surface form.
    pub fn collect_raw_terms(&self) -> Result<Vec<RawTerm>> {
        let mut raw_terms: Vec<RawTerm> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();

        for paragraph in &self.paragraphs {
            let tokens = self.tools.tokenize(&paragraph.content);
            let ngrams = generate_ngrams(
                &tokens,
                Some(&self.full_text),
                MIN_NGRAM_LENGTH,
                MAX_NGRAM_LENGTH,
            )?;

            for term in tokens.into_iter().chain(ngrams) {
                let index = *positions.entry(term.clone()).or_insert_with(|| {
                    raw_terms.push(RawTerm::new(&term));
                    raw_terms.len() - 1
                });
                raw_terms[index]
                    .containing_elements
                    .push(paragraph.paragraph_type.clone());
            }
        }

        debug!(
            target: TARGET_INDEX,
            "Collected {} raw terms from {} paragraphs", raw_terms.len(), self.paragraphs.len()
        );
        Ok(raw_terms)
    }

    /// Runs the full indexing pipeline and publishes the canonical term index.
    pub async fn index<P: PosLookup>(&mut self, pos_lookup: &P) -> Result<()> {
        let mut raw_terms = self.collect_raw_terms()?;

        let annotations = try_join_all(raw_terms.iter().map(|raw| {
            let term = raw.original_term.as_str();
            async move {
                pos_lookup
                    .pos_of(term)
                    .await
                    .map_err(|err| TermError::lookup(term, err.to_string()))
            }
        }))
        .await?;
        for (raw, pos) in raw_terms.iter_mut().zip(annotations) {
            raw.pos = pos;
        }

        self.assign_first_occurrences(&mut raw_terms)?;

        let canonical = canonicalize(&raw_terms, &self.tools);
        info!(
            target: TARGET_INDEX,
            "Indexed {} raw terms into {} canonical terms", raw_terms.len(), canonical.len()
        );
        self.canonical = Some(canonical);
        self.aggregated = None;
        Ok(())
    }

    fn assign_first_occurrences(&self, raw_terms: &mut [RawTerm]) -> Result<()> {
        let text_length = self.full_text.chars().count();
        for raw in raw_terms.iter_mut() {
            raw.first_occurrence = match phrase_offset(&self.full_text, &raw.original_term)? {
                Some(offset) if text_length > 0 => Some(offset as f64 / text_length as f64),
                _ => {
                    warn!(
                        target: TARGET_INDEX,
                        "Term '{}' could not be located in the article text", raw.original_term
                    );
                    None
                }
            };
        }
        Ok(())
    }

    /// Reconciles the canonical terms with external entity annotations.
    ///
    /// After this call `processed_terms` returns the aggregated set.
    pub async fn aggregate_entities<P: PosLookup>(
        &mut self,
        entities: &EntityTree,
        pos_lookup: &P,
    ) -> Result<Aggregation> {
        let canonical = self.canonical.as_ref().ok_or_else(|| {
            TermError::invalid_input("entity aggregation requires an indexed article")
        })?;
        let aggregation =
            aggregate_entities(canonical, entities, &self.full_text, &self.tools, pos_lookup)
                .await?;
        self.aggregated = Some(aggregation.terms.clone());
        Ok(aggregation)
    }

    pub fn canonical_terms(&self) -> Option<&TermIndex> {
        self.canonical.as_ref()
    }

    pub fn aggregated_terms(&self) -> Option<&TermIndex> {
        self.aggregated.as_ref()
    }

    fn active_terms(&self) -> Option<&TermIndex> {
        self.aggregated.as_ref().or(self.canonical.as_ref())
    }

    /// Aggregated terms if entity aggregation ran, canonical terms otherwise.
    pub fn processed_terms(&self, exclude_stopwords: bool) -> Vec<Term> {
        self.active_terms()
            .map(|terms| {
                terms
                    .iter()
                    .filter(|term| !(exclude_stopwords && term.is_stopword()))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn processed_terms_by<F>(&self, exclude_stopwords: bool, compare: F) -> Vec<Term>
    where
        F: FnMut(&Term, &Term) -> Ordering,
    {
        let mut terms = self.processed_terms(exclude_stopwords);
        terms.sort_by(compare);
        terms
    }

    /// Flags a term as a keyword. Returns `false` when the stem is unknown.
    pub fn set_keyword(&mut self, stemmed_term: &str) -> bool {
        let mut found = false;
        for terms in [self.canonical.as_mut(), self.aggregated.as_mut()]
            .into_iter()
            .flatten()
        {
            if let Some(term) = terms.get_mut(stemmed_term) {
                term.is_keyword = Some(true);
                found = true;
            }
        }
        found
    }
}

/// Groups raw terms by stem and merges their metadata.
pub fn canonicalize(raw_terms: &[RawTerm], tools: &TextTools) -> TermIndex {
    let mut index = TermIndex::new();

    for raw in raw_terms {
        let stemmed = tools.stem_text(&raw.original_term);
        if !index.contains(&stemmed) {
            let mut term = Term::new(&stemmed);
            term.first_occurrence = raw.first_occurrence;
            index.insert(term);
        }
        let Some(term) = index.get_mut(&stemmed) else {
            continue;
        };

        if !term.original_terms.contains(&raw.original_term) {
            term.original_terms.push(raw.original_term.clone());
        }
        term.containing_elements
            .extend(raw.containing_elements.iter().cloned());
        term.term_frequency += raw.containing_elements.len();
        term.pos.merge_stemmed(&raw.pos, tools);
        term.first_occurrence = min_occurrence(term.first_occurrence, raw.first_occurrence);
    }

    index
}

fn min_occurrence(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (Some(x), Some(y)) => Some(x.min(y)),
        (x, None) => x,
        (None, y) => y,
    }
}

/// Parts of speech of an entity name, merged the same way as article terms.
pub(crate) fn stemmed_pos(pos: &PartsOfSpeech, tools: &TextTools) -> PartsOfSpeech {
    let mut merged = PartsOfSpeech::default();
    merged.merge_stemmed(pos, tools);
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::ParagraphType;
    use crate::text::{LexiconPosLookup, PosCategory};

    fn article() -> Article {
        Article::new(
            "Storm hits New York",
            vec![
                Paragraph::new(
                    ParagraphType::P,
                    "A storm hit New York on Monday. Storms are rare in New York.",
                ),
                Paragraph::new(ParagraphType::LI, "Flights were cancelled."),
            ],
        )
    }

    fn lexicon() -> LexiconPosLookup {
        LexiconPosLookup::new()
            .with_word("storm", &[PosCategory::Noun, PosCategory::Verb])
            .with_word("storms", &[PosCategory::Noun])
            .with_word("hit", &[PosCategory::Verb])
            .with_word("hits", &[PosCategory::Verb])
    }

    async fn indexed() -> ArticleIndexer {
        let mut indexer = ArticleIndexer::new(&article(), TextTools::default()).unwrap();
        indexer.index(&lexicon()).await.unwrap();
        indexer
    }

    #[test]
    fn test_rejects_empty_article() {
        let empty = Article::new("  ", vec![Paragraph::new(ParagraphType::P, "")]);
        let err = ArticleIndexer::new(&empty, TextTools::default()).unwrap_err();
        assert!(matches!(
            crate::error::classify(&err),
            Some(TermError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_full_text_starts_with_headline() {
        let indexer = ArticleIndexer::new(&article(), TextTools::default()).unwrap();
        assert!(indexer.full_text().starts_with("Storm hits New York A storm hit"));
        assert!(indexer.full_text_stemmed().starts_with("storm hit new york a storm hit"));
    }

    #[test]
    fn test_raw_terms_record_every_occurrence() {
        let indexer = ArticleIndexer::new(&article(), TextTools::default()).unwrap();
        let raw = indexer.collect_raw_terms().unwrap();
        let new_york = raw.iter().find(|r| r.original_term == "New York").unwrap();
        assert_eq!(
            new_york.containing_elements,
            vec![ParagraphType::H1, ParagraphType::P, ParagraphType::P]
        );
        // "Monday. Storms" crosses a sentence boundary
        assert!(!raw.iter().any(|r| r.original_term == "Monday Storms"));
    }

    #[tokio::test]
    async fn test_canonical_terms_merge_surface_forms() {
        let indexer = indexed().await;
        let terms = indexer.canonical_terms().unwrap();

        let storm = terms.get("storm").unwrap();
        assert_eq!(storm.original_terms, vec!["Storm", "storm", "Storms"]);
        assert_eq!(storm.term_frequency, 3);
        assert_eq!(storm.first_occurrence, Some(0.0));
        assert_eq!(storm.pos.nouns, vec!["storm"]);
        assert_eq!(storm.pos.verbs, vec!["storm"]);
        assert_eq!(
            storm.element_types(),
            vec![ParagraphType::H1, ParagraphType::P]
        );

        let flights = terms.get("flight").unwrap();
        assert_eq!(flights.containing_elements, vec![ParagraphType::LI]);
        assert_eq!(flights.pos.rest, vec!["flight"]);
    }

    #[tokio::test]
    async fn test_first_occurrence_is_normalised() {
        let indexer = indexed().await;
        for term in indexer.canonical_terms().unwrap().iter() {
            let fo = term.first_occurrence.expect("every article term is located");
            assert!((0.0..=1.0).contains(&fo), "{} -> {}", term.stemmed_term, fo);
        }
        let flights = indexer.canonical_terms().unwrap().get("flight").unwrap();
        assert!(flights.first_occurrence.unwrap() > 0.75);
    }

    #[tokio::test]
    async fn test_term_frequency_counts_occurrences() {
        let indexer = indexed().await;
        let raw = indexer.collect_raw_terms().unwrap();
        for term in indexer.canonical_terms().unwrap().iter() {
            let expected: usize = raw
                .iter()
                .filter(|r| term.original_terms.contains(&r.original_term))
                .map(|r| r.containing_elements.len())
                .sum();
            assert_eq!(term.term_frequency, expected, "{}", term.stemmed_term);
        }
    }

    #[tokio::test]
    async fn test_canonicalize_is_idempotent() {
        let indexer = indexed().await;
        let raw = indexer.collect_raw_terms().unwrap();
        let tools = TextTools::default();
        assert_eq!(canonicalize(&raw, &tools), canonicalize(&raw, &tools));
    }

    #[tokio::test]
    async fn test_processed_terms_and_keywords() {
        let mut indexer = indexed().await;
        let all = indexer.processed_terms(false);
        let filtered = indexer.processed_terms(true);
        assert!(all.iter().any(|t| t.stemmed_term == "on"));
        assert!(!filtered.iter().any(|t| t.stemmed_term == "on"));

        let sorted = indexer.processed_terms_by(true, |a, b| b.term_frequency.cmp(&a.term_frequency));
        assert!(sorted
            .windows(2)
            .all(|w| w[0].term_frequency >= w[1].term_frequency));

        assert!(indexer.set_keyword("new york"));
        assert!(!indexer.set_keyword("chicago"));
        let new_york = indexer.canonical_terms().unwrap().get("new york").unwrap();
        assert_eq!(new_york.is_keyword, Some(true));
    }

    struct FailingLookup;

    impl PosLookup for FailingLookup {
        async fn pos_of(&self, text: &str) -> Result<PartsOfSpeech> {
            if text == "Flights" {
                anyhow::bail!("lexicon offline");
            }
            Ok(PartsOfSpeech::default())
        }
    }

    #[tokio::test]
    async fn test_lookup_failure_publishes_nothing() {
        let mut indexer = ArticleIndexer::new(&article(), TextTools::default()).unwrap();
        let err = indexer.index(&FailingLookup).await.unwrap_err();
        assert!(matches!(
            crate::error::classify(&err),
            Some(TermError::Lookup { .. })
        ));
        assert!(!indexer.is_indexed());
        assert!(indexer.processed_terms(false).is_empty());
    }
}
