use anyhow::Result;
use std::path::PathBuf;
use tracing::info;

use crate::environment::{get_env_var_as_bool, get_env_var_as_vec, get_env_var_parsed};
use crate::error::TermError;
use crate::extraction::{CollapsePolicy, FeatureBuilder, FeatureGroup, ModelKind, QueryMode};
use crate::matching::FUZZY_MATCH_THRESHOLD;

pub const DEFAULT_KEYWORD_THRESHOLD: f64 = 0.5;

/// Tunables of the extraction pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractorConfig {
    pub keyword_threshold: f64,
    pub feature_groups: Vec<FeatureGroup>,
    pub normalize_features: bool,
    pub collapse_policy: CollapsePolicy,
    pub query_mode: QueryMode,
    pub model_kind: ModelKind,
    /// Serialized classifier; the learned strategy is only available when set.
    pub model_path: Option<PathBuf>,
    pub fuzzy_threshold: f64,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            keyword_threshold: DEFAULT_KEYWORD_THRESHOLD,
            feature_groups: FeatureGroup::ALL.to_vec(),
            normalize_features: true,
            collapse_policy: CollapsePolicy::default(),
            query_mode: QueryMode::default(),
            model_kind: ModelKind::default(),
            model_path: None,
            fuzzy_threshold: FUZZY_MATCH_THRESHOLD,
        }
    }
}

impl ExtractorConfig {
    /// Defaults overridden by `SEARCHTERM_*` environment variables:
    ///
    /// - `SEARCHTERM_KEYWORD_THRESHOLD`: probability a search term must exceed
    /// - `SEARCHTERM_FEATURES`: comma-separated feature groups (`tf,fo,ptype,pos,calais-entity`)
    /// - `SEARCHTERM_NORMALIZE`: normalise feature values
    /// - `SEARCHTERM_COLLAPSE_POLICY`: `containing-or-identical` or `strictly-containing`
    /// - `SEARCHTERM_ENTITIES_ONLY`: build queries from entity terms only
    /// - `SEARCHTERM_MODEL_TYPE`, `SEARCHTERM_MODEL_PATH`: classifier for the learned strategy
    /// - `SEARCHTERM_FUZZY_THRESHOLD`: minimum similarity for fuzzy keyword matches
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(threshold) = get_env_var_parsed::<f64>("SEARCHTERM_KEYWORD_THRESHOLD")? {
            config.keyword_threshold = threshold;
        }
        let features = get_env_var_as_vec("SEARCHTERM_FEATURES", ',');
        if !features.is_empty() {
            config.feature_groups = features
                .iter()
                .map(|name| name.parse())
                .collect::<Result<Vec<FeatureGroup>>>()?;
        }
        if let Some(normalize) = get_env_var_as_bool("SEARCHTERM_NORMALIZE") {
            config.normalize_features = normalize;
        }
        if let Some(policy) = get_env_var_parsed::<CollapsePolicy>("SEARCHTERM_COLLAPSE_POLICY")? {
            config.collapse_policy = policy;
        }
        if get_env_var_as_bool("SEARCHTERM_ENTITIES_ONLY").unwrap_or(false) {
            config.query_mode = QueryMode::EntitiesOnly;
        }
        if let Ok(model_type) = std::env::var("SEARCHTERM_MODEL_TYPE") {
            config.model_kind = ModelKind::parse_or_default(&model_type);
        }
        if let Some(path) = get_env_var_parsed::<PathBuf>("SEARCHTERM_MODEL_PATH")? {
            config.model_path = Some(path);
        }
        if let Some(threshold) = get_env_var_parsed::<f64>("SEARCHTERM_FUZZY_THRESHOLD")? {
            config.fuzzy_threshold = threshold;
        }

        config.validate()?;
        info!(
            "Extractor configuration: threshold {}, features [{}], policy {}, mode {:?}",
            config.keyword_threshold,
            config
                .feature_groups
                .iter()
                .map(|g| g.name())
                .collect::<Vec<_>>()
                .join(","),
            config.collapse_policy,
            config.query_mode
        );
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("keyword threshold", self.keyword_threshold),
            ("fuzzy threshold", self.fuzzy_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(TermError::invalid_input(format!(
                    "{} {} is outside [0, 1]",
                    name, value
                )));
            }
        }
        if self.feature_groups.is_empty() {
            return Err(TermError::invalid_input("no feature groups selected"));
        }
        Ok(())
    }

    pub fn feature_builder(&self) -> FeatureBuilder {
        FeatureBuilder::new(self.feature_groups.clone(), self.normalize_features)
    }
}
