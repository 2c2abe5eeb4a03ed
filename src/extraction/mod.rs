pub mod classifier;
pub mod extractor;
pub mod features;
pub mod learned;
pub mod query;
pub mod statistical;

pub use classifier::{Classifier, LogisticClassifier, ModelKind, ScoreOutput};
pub use extractor::{QueryMode, ScoredTerm, ScoringStrategy, SearchTermExtractor};
pub use features::{scaled_sigmoid, FeatureBuilder, FeatureGroup};
pub use learned::LearnedStrategy;
pub use query::{collapse_subterms, generate_query, largest_parent, query_from_entities, CollapsePolicy};
pub use statistical::StatisticalStrategy;

pub const TARGET_EXTRACT: &str = "extract";
