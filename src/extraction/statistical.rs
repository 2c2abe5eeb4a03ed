use anyhow::Result;
use tracing::debug;

use super::extractor::{ScoredTerm, ScoringStrategy};
use super::TARGET_EXTRACT;
use crate::index::Term;

/// Scores frequent, early terms highest: `tf / max_tf * (1 - first_occurrence)`.
///
/// Terms that were never located count as occurring at the very end.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatisticalStrategy;

impl ScoringStrategy for StatisticalStrategy {
    fn name(&self) -> &'static str {
        "statistical"
    }

    fn calculate_probabilities(&self, terms: &[Term]) -> Result<Vec<ScoredTerm>> {
        let max_term_frequency = terms.iter().map(|t| t.term_frequency).max().unwrap_or(0);
        if max_term_frequency == 0 {
            debug!(
                target: TARGET_EXTRACT,
                "No term frequencies among {} terms; every term scores zero", terms.len()
            );
        }

        Ok(terms
            .iter()
            .map(|term| {
                let p = if max_term_frequency == 0 {
                    0.0
                } else {
                    let first_occurrence = term.first_occurrence.unwrap_or(1.0);
                    (term.term_frequency as f64 / max_term_frequency as f64) * (1.0 - first_occurrence)
                };
                ScoredTerm { term: term.clone(), p }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::{QueryMode, SearchTermExtractor};

    fn term(stem: &str, tf: usize, fo: Option<f64>) -> Term {
        let mut term = Term::new(stem);
        term.original_terms = vec![stem.to_string()];
        term.term_frequency = tf;
        term.first_occurrence = fo;
        term
    }

    #[test]
    fn test_probabilities() {
        let terms = vec![
            term("storm", 4, Some(0.0)),
            term("flood", 2, Some(0.5)),
            term("rain", 4, None),
        ];
        let scored = StatisticalStrategy.calculate_probabilities(&terms).unwrap();
        assert_eq!(scored[0].p, 1.0);
        assert_eq!(scored[1].p, 0.25);
        assert_eq!(scored[2].p, 0.0);
        assert!(scored.iter().all(|s| (0.0..=1.0).contains(&s.p)));
    }

    #[test]
    fn test_degenerate_sets_score_zero() {
        assert!(StatisticalStrategy.calculate_probabilities(&[]).unwrap().is_empty());
        let scored = StatisticalStrategy
            .calculate_probabilities(&[term("storm", 0, Some(0.1))])
            .unwrap();
        assert_eq!(scored[0].p, 0.0);
    }

    #[test]
    fn test_statistical_extraction() {
        let terms = vec![
            term("rain", 1, Some(0.9)),
            term("storm", 4, Some(0.0)),
            term("flood", 3, Some(0.1)),
        ];
        let mut extractor = SearchTermExtractor::new(StatisticalStrategy, terms, 0.3).unwrap();
        assert_eq!(
            extractor.generate_search_term(QueryMode::Heuristic).unwrap(),
            "storm flood"
        );
        assert_eq!(extractor.non_keywords()[0].term.stemmed_term, "rain");
    }
}
