//! Training-data generation and classifier evaluation.

use anyhow::Result;
use serde::Serialize;
use std::str::FromStr;
use tracing::{info, warn};

use crate::error::TermError;
use crate::extraction::FeatureBuilder;
use crate::index::{ArticleIndexer, KeywordIndexer, Term};
use crate::matching::TermMatcher;
use crate::storage::{ArticleFilter, DocumentStore};
use crate::text::{PosLookup, TextTools};

pub const DEFAULT_SLICE: usize = 1000;

/// Every n-th term of an article is held out for testing.
const TEST_EVERY: usize = 10;

/// Flags every article term matched by an image keyword. Returns the number flagged.
pub fn label_article_terms(indexer: &mut ArticleIndexer, matcher: &TermMatcher) -> usize {
    matcher
        .keyword_terms()
        .iter()
        .filter(|term| indexer.set_keyword(&term.stemmed_term))
        .count()
}

/// How `select_training_data` picks rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// The first `n` rows.
    Slice(usize),
    /// As many non-keywords as keywords, at most `n` rows in total.
    Balanced(Option<usize>),
}

impl Default for Selection {
    fn default() -> Self {
        Selection::Slice(DEFAULT_SLICE)
    }
}

impl FromStr for Selection {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "slice" => Ok(Selection::Slice(DEFAULT_SLICE)),
            "balanced" => Ok(Selection::Balanced(None)),
            other => Err(TermError::invalid_input(format!(
                "unknown selection '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingSet {
    pub features: Vec<Vec<f64>>,
    pub labels: Vec<f64>,
}

impl TrainingSet {
    /// Feature rows and keyword labels of flagged terms.
    pub fn from_terms(terms: &[Term], builder: &FeatureBuilder) -> Self {
        TrainingSet {
            features: builder.build_all(terms),
            labels: terms.iter().map(label_of).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

fn label_of(term: &Term) -> f64 {
    if term.is_keyword.unwrap_or(false) {
        1.0
    } else {
        0.0
    }
}

fn is_keyword_label(label: f64) -> bool {
    label >= 0.5
}

pub fn select_training_data(
    features: &[Vec<f64>],
    labels: &[f64],
    selection: Selection,
) -> Result<TrainingSet> {
    if features.len() != labels.len() {
        return Err(TermError::model(format!(
            "{} feature vectors but {} labels",
            features.len(),
            labels.len()
        )));
    }

    let selected = match selection {
        Selection::Slice(n) => TrainingSet {
            features: features.iter().take(n).cloned().collect(),
            labels: labels.iter().take(n).copied().collect(),
        },
        Selection::Balanced(n) => {
            let keyword_cap = n.map_or(usize::MAX, |n| (n as f64 / 2.0).round() as usize);
            let keywords: Vec<&Vec<f64>> = features
                .iter()
                .zip(labels)
                .filter(|(_, label)| is_keyword_label(**label))
                .map(|(row, _)| row)
                .take(keyword_cap)
                .collect();
            let regular: Vec<&Vec<f64>> = features
                .iter()
                .zip(labels)
                .filter(|(_, label)| !is_keyword_label(**label))
                .map(|(row, _)| row)
                .take(keywords.len())
                .collect();

            let mut set = TrainingSet::default();
            for row in &keywords {
                set.features.push((*row).clone());
                set.labels.push(1.0);
            }
            for row in &regular {
                set.features.push((*row).clone());
                set.labels.push(0.0);
            }
            set
        }
    };

    info!(
        "Selected {} of {} rows ({} keywords)",
        selected.len(),
        labels.len(),
        selected.labels.iter().filter(|l| is_keyword_label(**l)).count()
    );
    Ok(selected)
}

/// Prediction quality against known labels. Rates over empty classes are `NaN`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Evaluation {
    pub total: usize,
    pub keywords_total: usize,
    pub regular_total: usize,
    pub keywords_correct: usize,
    pub regular_correct: usize,
    pub predicted_keywords: usize,
    pub prediction_rate: f64,
    pub regular_rate: f64,
    pub keyword_rate: f64,
    pub keyword_precision: f64,
}

/// A prediction counts as a keyword when it exceeds `threshold`.
pub fn evaluate(predictions: &[f64], labels: &[f64], threshold: f64) -> Result<Evaluation> {
    if predictions.len() != labels.len() {
        return Err(TermError::model(format!(
            "{} predictions but {} labels",
            predictions.len(),
            labels.len()
        )));
    }

    let mut evaluation = Evaluation {
        total: labels.len(),
        keywords_total: 0,
        regular_total: 0,
        keywords_correct: 0,
        regular_correct: 0,
        predicted_keywords: 0,
        prediction_rate: f64::NAN,
        regular_rate: f64::NAN,
        keyword_rate: f64::NAN,
        keyword_precision: f64::NAN,
    };
    for (prediction, label) in predictions.iter().zip(labels) {
        let predicted = *prediction > threshold;
        let actual = is_keyword_label(*label);
        if predicted {
            evaluation.predicted_keywords += 1;
        }
        match (actual, predicted) {
            (true, true) => evaluation.keywords_correct += 1,
            (false, false) => evaluation.regular_correct += 1,
            _ => {}
        }
        if actual {
            evaluation.keywords_total += 1;
        } else {
            evaluation.regular_total += 1;
        }
    }

    let rate = |correct: usize, total: usize| correct as f64 / total as f64;
    evaluation.prediction_rate = rate(
        evaluation.keywords_correct + evaluation.regular_correct,
        evaluation.total,
    );
    evaluation.regular_rate = rate(evaluation.regular_correct, evaluation.regular_total);
    evaluation.keyword_rate = rate(evaluation.keywords_correct, evaluation.keywords_total);
    evaluation.keyword_precision = rate(evaluation.keywords_correct, evaluation.predicted_keywords);
    Ok(evaluation)
}

/// Labelled non-stopword terms, split into training and held-out test terms.
#[derive(Debug, Clone, Default)]
pub struct TrainingCorpus {
    pub training: Vec<Term>,
    pub test: Vec<Term>,
    pub articles: usize,
}

/// Indexes and labels every matching article of `store`.
///
/// Articles without a lead image are skipped; a failing article aborts the run.
pub async fn collect_training_terms<D, P>(
    store: &D,
    filter: &ArticleFilter,
    tools: &TextTools,
    pos_lookup: &P,
    fuzzy_threshold: f64,
) -> Result<TrainingCorpus>
where
    D: DocumentStore,
    P: PosLookup,
{
    let ids = store.get_article_ids(filter).await?;
    let keyword_indexer = KeywordIndexer::new(tools.clone());
    let mut corpus = TrainingCorpus::default();

    for (position, id) in ids.iter().enumerate() {
        let Some(article) = store.get_article(*id).await? else {
            warn!("Article {} disappeared from the store", id);
            continue;
        };
        let Some(lead_image) = &article.lead_image else {
            warn!("Article {} has no lead image; skipping", id);
            continue;
        };

        let mut indexer = ArticleIndexer::new(&article, tools.clone())?;
        indexer.index(pos_lookup).await?;
        if let Some(entities) = &article.entities {
            indexer.aggregate_entities(entities, pos_lookup).await?;
        }
        let keywords = keyword_indexer.index(lead_image)?;

        let mut matcher = TermMatcher::new(indexer.processed_terms(false), keywords)
            .with_fuzzy_threshold(fuzzy_threshold);
        matcher.match_terms();
        let flagged = label_article_terms(&mut indexer, &matcher);

        let terms = indexer.processed_terms(true);
        info!(
            "({}/{}) article {}: {} terms, {} keywords",
            position + 1,
            ids.len(),
            id,
            terms.len(),
            flagged
        );
        for (index, term) in terms.into_iter().enumerate() {
            if index % TEST_EVERY == 0 {
                corpus.test.push(term);
            } else {
                corpus.training.push(term);
            }
        }
        corpus.articles += 1;
    }
    Ok(corpus)
}
