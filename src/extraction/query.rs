use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use super::extractor::ScoredTerm;
use super::TARGET_EXTRACT;
use crate::error::TermError;
use crate::text::TextTools;

/// Longest query, in words, that is kept as a two-term concatenation.
const MAX_QUERY_WORDS: usize = 3;

/// How already-selected candidates suppress later ones while collapsing subterms.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CollapsePolicy {
    /// A kept candidate that contains or equals the new one suppresses it.
    #[default]
    ContainingOrIdentical,
    /// Only a kept candidate strictly containing the new one suppresses it.
    StrictlyContaining,
}

impl FromStr for CollapsePolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "containing-or-identical" | "identical" => Ok(CollapsePolicy::ContainingOrIdentical),
            "strictly-containing" | "strict" => Ok(CollapsePolicy::StrictlyContaining),
            other => Err(TermError::invalid_input(format!(
                "unknown collapse policy '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for CollapsePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollapsePolicy::ContainingOrIdentical => write!(f, "containing-or-identical"),
            CollapsePolicy::StrictlyContaining => write!(f, "strictly-containing"),
        }
    }
}

/// Index of the candidate with the most words that contains `term`.
///
/// Ties keep the earliest candidate. Identical strings only count as parents
/// when `include_identical` is set.
pub fn largest_parent(candidates: &[&str], term: &str, include_identical: bool) -> Option<usize> {
    let mut parent = None;
    let mut parent_length = 0;
    for (index, candidate) in candidates.iter().enumerate() {
        let contains = (include_identical || *candidate != term) && candidate.contains(term);
        let length = candidate.split(' ').count();
        if contains && length > parent_length {
            parent = Some(index);
            parent_length = length;
        }
    }
    parent
}

/// Replaces every keyword by its largest superterm and drops repeats.
///
/// The output keeps the rank order of each candidate's first subterm.
pub fn collapse_subterms<'a>(
    keywords: &'a [ScoredTerm],
    policy: CollapsePolicy,
) -> Vec<&'a ScoredTerm> {
    let stems: Vec<&str> = keywords
        .iter()
        .map(|keyword| keyword.term.stemmed_term.as_str())
        .collect();
    let mut merged: Vec<&ScoredTerm> = Vec::new();

    for keyword in keywords {
        let candidate = largest_parent(&stems, &keyword.term.stemmed_term, false)
            .map(|index| &keywords[index])
            .unwrap_or(keyword);

        let merged_stems: Vec<&str> = merged
            .iter()
            .map(|kept| kept.term.stemmed_term.as_str())
            .collect();
        let include_identical = policy == CollapsePolicy::ContainingOrIdentical;
        if largest_parent(&merged_stems, &candidate.term.stemmed_term, include_identical).is_none()
        {
            merged.push(candidate);
        }
    }
    merged
}

/// Builds the query from terms ranked by descending probability.
///
/// Returns an empty string when no term clears the threshold.
pub fn generate_query(ranked: &[ScoredTerm], keyword_threshold: f64, policy: CollapsePolicy) -> String {
    let keywords: Vec<ScoredTerm> = ranked
        .iter()
        .filter(|scored| scored.p > keyword_threshold)
        .cloned()
        .collect();
    let merged = collapse_subterms(&keywords, policy);
    debug!(
        target: TARGET_EXTRACT,
        "{} terms above threshold {}, {} after collapsing", keywords.len(), keyword_threshold, merged.len()
    );

    let selected: Vec<&str> = merged
        .iter()
        .take(2)
        .map(|scored| scored.term.display_form())
        .collect();
    let concatenated = selected.join(" ");

    let query = if concatenated.split(' ').count() > MAX_QUERY_WORDS {
        let first = selected.first().copied().unwrap_or_default();
        let second = selected.get(1).copied().unwrap_or_default();
        if second.split(' ').count() > first.split(' ').count() {
            second.to_string()
        } else {
            first.to_string()
        }
    } else {
        concatenated
    };
    query.to_lowercase()
}

/// Builds the query from entity terms only.
///
/// The best entity is used alone unless it and the runner-up are both single words.
/// Words are counted with the tokenizer, so "U.S." is two words.
pub fn query_from_entities(ranked: &[ScoredTerm], tools: &TextTools) -> String {
    let mut entities: Vec<&ScoredTerm> = ranked.iter().filter(|s| s.term.is_entity()).collect();
    entities.sort_by(|a, b| b.p.partial_cmp(&a.p).unwrap_or(std::cmp::Ordering::Equal));

    match entities.as_slice() {
        [] => String::new(),
        [only] => only.term.display_form().to_string(),
        [first, second, ..] => {
            let first = first.term.display_form();
            let second = second.term.display_form();
            if tools.tokenize(first).len() < 2 && tools.tokenize(second).len() < 2 {
                format!("{} {}", first, second)
            } else {
                first.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::Term;

    fn scored(stem: &str, original: &str, p: f64) -> ScoredTerm {
        let mut term = Term::new(stem);
        term.original_terms = vec![original.to_string()];
        ScoredTerm { term, p }
    }

    fn entity(stem: &str, original: &str, entity_type: &str, p: f64) -> ScoredTerm {
        let mut scored = scored(stem, original, p);
        scored.term.entity_type = Some(entity_type.to_string());
        scored
    }

    fn stems(collapsed: &[&ScoredTerm]) -> Vec<String> {
        collapsed.iter().map(|s| s.term.stemmed_term.clone()).collect()
    }

    #[test]
    fn test_largest_parent() {
        let candidates = ["new york", "new york citi", "york"];
        assert_eq!(largest_parent(&candidates, "york", false), Some(1));
        assert_eq!(largest_parent(&candidates, "new york citi", false), None);
        assert_eq!(largest_parent(&candidates, "new york citi", true), Some(1));
        assert_eq!(largest_parent(&candidates, "chicago", true), None);
    }

    #[test]
    fn test_largest_parent_tie_keeps_first() {
        let candidates = ["big york", "new york"];
        assert_eq!(largest_parent(&candidates, "york", false), Some(0));
    }

    #[test]
    fn test_subterms_collapse_into_superterm() {
        let ranked = vec![
            scored("new york citi", "New York City", 0.9),
            scored("new york", "New York", 0.8),
            scored("citi", "city", 0.7),
        ];
        let collapsed = collapse_subterms(&ranked, CollapsePolicy::ContainingOrIdentical);
        assert_eq!(stems(&collapsed), vec!["new york citi"]);
        assert_eq!(
            generate_query(&ranked, 0.5, CollapsePolicy::ContainingOrIdentical),
            "new york city"
        );
    }

    #[test]
    fn test_strict_policy_keeps_repeated_superterms() {
        let ranked = vec![
            scored("new york citi", "New York City", 0.9),
            scored("new york", "New York", 0.8),
            scored("citi", "city", 0.7),
        ];
        let collapsed = collapse_subterms(&ranked, CollapsePolicy::StrictlyContaining);
        assert_eq!(collapsed.len(), 3);
        assert!(collapsed.iter().all(|s| s.term.stemmed_term == "new york citi"));
        // the repeat pushes the concatenation over the word cap, leaving one copy
        assert_eq!(
            generate_query(&ranked, 0.5, CollapsePolicy::StrictlyContaining),
            "new york city"
        );
    }

    #[test]
    fn test_policies_agree_without_repeats() {
        let ranked = vec![
            scored("storm", "storm", 0.9),
            scored("flood", "floods", 0.8),
        ];
        for policy in [CollapsePolicy::ContainingOrIdentical, CollapsePolicy::StrictlyContaining] {
            assert_eq!(generate_query(&ranked, 0.5, policy), "storm floods");
        }
    }

    #[test]
    fn test_three_words_are_kept_together() {
        let ranked = vec![
            scored("barack obama", "Barack Obama", 0.9),
            scored("presid", "President", 0.8),
        ];
        assert_eq!(
            generate_query(&ranked, 0.5, CollapsePolicy::default()),
            "barack obama president"
        );
    }

    #[test]
    fn test_four_words_keep_longer_or_first() {
        let ranked = vec![
            scored("barack obama", "Barack Obama", 0.9),
            scored("unit state", "United States", 0.8),
        ];
        assert_eq!(
            generate_query(&ranked, 0.5, CollapsePolicy::default()),
            "barack obama"
        );

        let ranked = vec![
            scored("obama", "Obama", 0.9),
            scored("white hous press offic", "White House press office", 0.8),
        ];
        assert_eq!(
            generate_query(&ranked, 0.5, CollapsePolicy::default()),
            "white house press office"
        );
    }

    #[test]
    fn test_threshold_is_exclusive_and_empty_set_gives_empty_query() {
        let ranked = vec![scored("storm", "storm", 0.5), scored("rain", "rain", 0.2)];
        assert_eq!(generate_query(&ranked, 0.5, CollapsePolicy::default()), "");
        assert_eq!(generate_query(&[], 0.0, CollapsePolicy::default()), "");
    }

    #[test]
    fn test_single_keyword_query() {
        let ranked = vec![scored("storm", "Storm", 0.9), scored("rain", "rain", 0.1)];
        assert_eq!(generate_query(&ranked, 0.5, CollapsePolicy::default()), "storm");
    }

    #[test]
    fn test_entity_query() {
        let tools = TextTools::default();
        let ranked = vec![
            scored("storm", "storm", 0.95),
            entity("obama", "Obama", "Person", 0.7),
            entity("chicago", "Chicago", "City", 0.9),
        ];
        assert_eq!(query_from_entities(&ranked, &tools), "Chicago Obama");

        let ranked = vec![
            entity("barack obama", "Barack Obama", "Person", 0.9),
            entity("chicago", "Chicago", "City", 0.7),
        ];
        assert_eq!(query_from_entities(&ranked, &tools), "Barack Obama");

        let ranked = vec![entity("chicago", "Chicago", "City", 0.7)];
        assert_eq!(query_from_entities(&ranked, &tools), "Chicago");
        assert_eq!(query_from_entities(&[scored("storm", "storm", 0.9)], &tools), "");
    }

    #[test]
    fn test_punctuated_entity_counts_as_several_words() {
        let tools = TextTools::default();
        let ranked = vec![
            entity("obama", "Obama", "Person", 0.9),
            entity("u s", "U.S.", "Country", 0.8),
        ];
        assert_eq!(query_from_entities(&ranked, &tools), "Obama");

        let ranked = vec![
            entity("al qaeda", "Al-Qaeda", "Organization", 0.9),
            entity("kabul", "Kabul", "City", 0.8),
        ];
        assert_eq!(query_from_entities(&ranked, &tools), "Al-Qaeda");
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!(
            "strict".parse::<CollapsePolicy>().unwrap(),
            CollapsePolicy::StrictlyContaining
        );
        assert_eq!(
            CollapsePolicy::ContainingOrIdentical
                .to_string()
                .parse::<CollapsePolicy>()
                .unwrap(),
            CollapsePolicy::ContainingOrIdentical
        );
        assert!("loose".parse::<CollapsePolicy>().is_err());
    }
}
