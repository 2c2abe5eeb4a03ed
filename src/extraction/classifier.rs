use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{info, warn};

use super::TARGET_EXTRACT;
use crate::error::TermError;

/// A trainable binary classifier over fixed-width feature vectors.
pub trait Classifier: Send + Sync {
    fn kind(&self) -> ModelKind;

    /// Fits the model. Fails before fitting when features and labels disagree.
    fn train(&mut self, features: &[Vec<f64>], labels: &[f64]) -> Result<()>;

    /// One score per feature vector.
    fn predict(&self, features: &[Vec<f64>]) -> Result<Vec<f64>>;

    fn serialize(&self) -> Result<String>;

    /// Replaces the model with one read from `serialize` output.
    fn load_from_str(&mut self, model: &str) -> Result<()>;
}

/// Supported model types.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    /// Logistic regression emitting probabilities.
    #[default]
    Logistic,
    /// The same linear model emitting hard 0/1 labels.
    Linear,
}

impl ModelKind {
    /// Parses a model type name, falling back to the default kind for unknown names.
    pub fn parse_or_default(name: &str) -> ModelKind {
        name.parse().unwrap_or_else(|_| {
            let fallback = ModelKind::default();
            warn!(
                target: TARGET_EXTRACT,
                "'{}' is not a valid model type. Falling back to '{}'", name, fallback
            );
            fallback
        })
    }

    pub fn classifier(self) -> Box<dyn Classifier> {
        let output = match self {
            ModelKind::Logistic => ScoreOutput::Probability,
            ModelKind::Linear => ScoreOutput::Label,
        };
        Box::new(LogisticClassifier::new(output))
    }
}

impl FromStr for ModelKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "logistic" => Ok(ModelKind::Logistic),
            "linear" => Ok(ModelKind::Linear),
            other => Err(TermError::invalid_input(format!(
                "unknown model type '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelKind::Logistic => write!(f, "logistic"),
            ModelKind::Linear => write!(f, "linear"),
        }
    }
}

/// What `predict` returns for each row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreOutput {
    Probability,
    Label,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct SerializedModel {
    kind: ModelKind,
    weights: Vec<f64>,
    bias: f64,
}

const EPOCHS: usize = 500;
const LEARNING_RATE: f64 = 0.5;

/// Logistic regression fitted with batch gradient descent.
#[derive(Debug, Clone)]
pub struct LogisticClassifier {
    output: ScoreOutput,
    weights: Vec<f64>,
    bias: f64,
    trained: bool,
}

impl Default for LogisticClassifier {
    fn default() -> Self {
        Self::new(ScoreOutput::Probability)
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

impl LogisticClassifier {
    pub fn new(output: ScoreOutput) -> Self {
        Self {
            output,
            weights: Vec::new(),
            bias: 0.0,
            trained: false,
        }
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn bias(&self) -> f64 {
        self.bias
    }

    fn probability(&self, row: &[f64]) -> f64 {
        let z: f64 = self
            .weights
            .iter()
            .zip(row)
            .map(|(w, x)| w * x)
            .sum::<f64>()
            + self.bias;
        sigmoid(z)
    }

    fn check_width(&self, features: &[Vec<f64>]) -> Result<()> {
        if let Some((index, row)) = features
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != self.weights.len())
        {
            return Err(TermError::model(format!(
                "feature vector {} has {} values, model expects {}",
                index,
                row.len(),
                self.weights.len()
            )));
        }
        Ok(())
    }
}

impl Classifier for LogisticClassifier {
    fn kind(&self) -> ModelKind {
        match self.output {
            ScoreOutput::Probability => ModelKind::Logistic,
            ScoreOutput::Label => ModelKind::Linear,
        }
    }

    fn train(&mut self, features: &[Vec<f64>], labels: &[f64]) -> Result<()> {
        if features.len() != labels.len() {
            return Err(TermError::model(format!(
                "{} feature vectors but {} labels",
                features.len(),
                labels.len()
            )));
        }
        let Some(first) = features.first() else {
            return Err(TermError::model("no training data"));
        };
        self.weights = vec![0.0; first.len()];
        self.bias = 0.0;
        self.check_width(features)?;

        info!(
            target: TARGET_EXTRACT,
            "Training {} model with {} terms ({} keywords)",
            self.kind(),
            features.len(),
            labels.iter().filter(|label| **label >= 0.5).count()
        );

        let n = features.len() as f64;
        for _ in 0..EPOCHS {
            let mut weight_gradient = vec![0.0; self.weights.len()];
            let mut bias_gradient = 0.0;
            for (row, label) in features.iter().zip(labels) {
                let error = self.probability(row) - label;
                for (gradient, x) in weight_gradient.iter_mut().zip(row) {
                    *gradient += error * x;
                }
                bias_gradient += error;
            }
            for (weight, gradient) in self.weights.iter_mut().zip(&weight_gradient) {
                *weight -= LEARNING_RATE * gradient / n;
            }
            self.bias -= LEARNING_RATE * bias_gradient / n;
        }
        self.trained = true;
        Ok(())
    }

    fn predict(&self, features: &[Vec<f64>]) -> Result<Vec<f64>> {
        if !self.trained {
            return Err(TermError::model("classifier has no trained or loaded model"));
        }
        self.check_width(features)?;
        info!(
            target: TARGET_EXTRACT,
            "Predicting labels for {} terms", features.len()
        );
        Ok(features
            .iter()
            .map(|row| {
                let p = self.probability(row);
                match self.output {
                    ScoreOutput::Probability => p,
                    ScoreOutput::Label if p >= 0.5 => 1.0,
                    ScoreOutput::Label => 0.0,
                }
            })
            .collect())
    }

    fn serialize(&self) -> Result<String> {
        if !self.trained {
            return Err(TermError::model("cannot serialize an untrained classifier"));
        }
        let model = SerializedModel {
            kind: self.kind(),
            weights: self.weights.clone(),
            bias: self.bias,
        };
        Ok(serde_json::to_string(&model)?)
    }

    fn load_from_str(&mut self, model: &str) -> Result<()> {
        let model: SerializedModel = serde_json::from_str(model)
            .map_err(|err| TermError::model(format!("malformed model: {}", err)))?;
        if model.kind != self.kind() {
            return Err(TermError::model(format!(
                "model was trained as '{}', not '{}'. Did you specify the correct model type?",
                model.kind,
                self.kind()
            )));
        }
        if model.weights.iter().any(|w| !w.is_finite()) || !model.bias.is_finite() {
            return Err(TermError::model("model contains non-finite weights"));
        }
        self.weights = model.weights;
        self.bias = model.bias;
        self.trained = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{classify, TermError};

    fn separable() -> (Vec<Vec<f64>>, Vec<f64>) {
        let features = vec![
            vec![1.0, 0.0],
            vec![0.9, 0.1],
            vec![0.8, 0.2],
            vec![0.1, 0.9],
            vec![0.0, 1.0],
            vec![0.2, 0.8],
        ];
        let labels = vec![1.0, 1.0, 1.0, 0.0, 0.0, 0.0];
        (features, labels)
    }

    fn is_model_error(err: &anyhow::Error) -> bool {
        matches!(classify(err), Some(TermError::Model(_)))
    }

    #[test]
    fn test_training_separates_classes() {
        let (features, labels) = separable();
        let mut classifier = LogisticClassifier::default();
        classifier.train(&features, &labels).unwrap();

        let scores = classifier.predict(&features).unwrap();
        assert!(scores[..3].iter().all(|p| *p > 0.5));
        assert!(scores[3..].iter().all(|p| *p < 0.5));
        assert!(scores.iter().all(|p| (0.0..=1.0).contains(p)));
    }

    #[test]
    fn test_label_output() {
        let (features, labels) = separable();
        let mut classifier = ModelKind::Linear.classifier();
        classifier.train(&features, &labels).unwrap();
        assert_eq!(classifier.predict(&features).unwrap(), labels);
    }

    #[test]
    fn test_length_mismatch_fails_before_training() {
        let (features, _) = separable();
        let mut classifier = LogisticClassifier::default();
        let err = classifier.train(&features, &[1.0, 0.0]).unwrap_err();
        assert!(is_model_error(&err));
        assert!(classifier.weights().is_empty());
        assert!(is_model_error(&classifier.train(&[], &[]).unwrap_err()));

        let ragged = vec![vec![1.0, 0.0], vec![1.0]];
        assert!(is_model_error(&classifier.train(&ragged, &[1.0, 0.0]).unwrap_err()));
    }

    #[test]
    fn test_predict_requires_model_and_width() {
        let classifier = LogisticClassifier::default();
        assert!(is_model_error(&classifier.predict(&[vec![1.0]]).unwrap_err()));

        let (features, labels) = separable();
        let mut classifier = LogisticClassifier::default();
        classifier.train(&features, &labels).unwrap();
        assert!(is_model_error(&classifier.predict(&[vec![1.0]]).unwrap_err()));
    }

    #[test]
    fn test_serialize_and_load() {
        let (features, labels) = separable();
        let mut trained = LogisticClassifier::default();
        trained.train(&features, &labels).unwrap();
        let model = trained.serialize().unwrap();

        let mut loaded = LogisticClassifier::default();
        loaded.load_from_str(&model).unwrap();
        assert_eq!(loaded.weights(), trained.weights());
        assert_eq!(
            loaded.predict(&features).unwrap(),
            trained.predict(&features).unwrap()
        );

        let mut wrong_kind = ModelKind::Linear.classifier();
        assert!(is_model_error(&wrong_kind.load_from_str(&model).unwrap_err()));
        assert!(is_model_error(&loaded.load_from_str("not a model").unwrap_err()));
        assert!(LogisticClassifier::default().serialize().is_err());
    }

    #[test]
    fn test_model_kind_parsing() {
        assert_eq!("Linear".parse::<ModelKind>().unwrap(), ModelKind::Linear);
        assert_eq!(ModelKind::parse_or_default("svm"), ModelKind::Logistic);
        assert_eq!(ModelKind::parse_or_default("linear"), ModelKind::Linear);
    }
}
