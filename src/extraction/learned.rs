use anyhow::Result;
use std::path::Path;
use tracing::info;

use super::classifier::{Classifier, ModelKind};
use super::extractor::{ScoredTerm, ScoringStrategy};
use super::features::FeatureBuilder;
use super::TARGET_EXTRACT;
use crate::error::TermError;
use crate::index::Term;

/// Scores terms with a trained classifier in one batched prediction.
pub struct LearnedStrategy {
    classifier: Box<dyn Classifier>,
    features: FeatureBuilder,
}

impl std::fmt::Debug for LearnedStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LearnedStrategy")
            .field("kind", &self.classifier.kind())
            .field("features", &self.features)
            .finish()
    }
}

impl LearnedStrategy {
    pub fn new(classifier: Box<dyn Classifier>, features: FeatureBuilder) -> Self {
        Self {
            classifier,
            features,
        }
    }

    /// Loads a serialized model. A model that does not load is an error.
    pub fn from_model_str(kind: ModelKind, model: &str, features: FeatureBuilder) -> Result<Self> {
        let mut classifier = kind.classifier();
        classifier.load_from_str(model)?;
        Ok(Self::new(classifier, features))
    }

    pub fn from_model_file(
        kind: ModelKind,
        path: impl AsRef<Path>,
        features: FeatureBuilder,
    ) -> Result<Self> {
        let path = path.as_ref();
        let model = std::fs::read_to_string(path).map_err(|err| {
            TermError::model(format!("cannot read model file {}: {}", path.display(), err))
        })?;
        let strategy = Self::from_model_str(kind, &model, features).map_err(|err| {
            TermError::model(format!(
                "error loading model from file {}: {}",
                path.display(),
                err
            ))
        })?;
        info!(
            target: TARGET_EXTRACT,
            "Loaded {} model from {}", kind, path.display()
        );
        Ok(strategy)
    }

    pub fn features(&self) -> &FeatureBuilder {
        &self.features
    }
}

impl ScoringStrategy for LearnedStrategy {
    fn name(&self) -> &'static str {
        "learned"
    }

    fn calculate_probabilities(&self, terms: &[Term]) -> Result<Vec<ScoredTerm>> {
        if terms.is_empty() {
            return Ok(Vec::new());
        }
        let rows = self.features.build_all(terms);
        let predictions = self.classifier.predict(&rows)?;
        if predictions.len() != terms.len() {
            return Err(TermError::model(format!(
                "classifier returned {} predictions for {} terms",
                predictions.len(),
                terms.len()
            )));
        }
        Ok(terms
            .iter()
            .zip(predictions)
            .map(|(term, p)| ScoredTerm {
                term: term.clone(),
                p,
            })
            .collect())
    }
}
