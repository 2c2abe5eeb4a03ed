use anyhow::Result;
use serde::Serialize;
use tracing::info;

use crate::config::ExtractorConfig;
use crate::document::Article;
use crate::error::TermError;
use crate::extraction::{LearnedStrategy, ScoredTerm, ScoringStrategy, SearchTermExtractor};
use crate::extraction::TARGET_EXTRACT;
use crate::index::ArticleIndexer;
use crate::text::{PosLookup, TextTools};

/// Outcome of analysing one article.
#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    /// Empty when no query was found.
    pub query: String,
    pub keywords: Vec<ScoredTerm>,
    pub non_keywords: Vec<ScoredTerm>,
    pub entity_count: usize,
}

impl Analysis {
    pub fn found_query(&self) -> bool {
        !self.query.is_empty()
    }
}

/// Indexes the article, folds in its entity annotations when present and
/// extracts the search query with `strategy`.
pub async fn analyze_article<S, P>(
    article: &Article,
    strategy: S,
    tools: &TextTools,
    pos_lookup: &P,
    config: &ExtractorConfig,
) -> Result<Analysis>
where
    S: ScoringStrategy,
    P: PosLookup,
{
    let mut indexer = ArticleIndexer::new(article, tools.clone())?;
    indexer.index(pos_lookup).await?;

    let entity_count = match &article.entities {
        Some(entities) => {
            indexer
                .aggregate_entities(entities, pos_lookup)
                .await?
                .entities
                .len()
        }
        None => 0,
    };

    let mut extractor =
        SearchTermExtractor::new(strategy, indexer.processed_terms(false), config.keyword_threshold)?
            .with_policy(config.collapse_policy)
            .with_tools(tools.clone());
    let query = extractor.generate_search_term(config.query_mode)?;
    info!(
        target: TARGET_EXTRACT,
        "Article {:?}: query '{}' from {} keywords",
        article.id,
        query,
        extractor.keywords().len()
    );

    Ok(Analysis {
        query,
        keywords: extractor.keywords(),
        non_keywords: extractor.non_keywords(),
        entity_count,
    })
}

/// The learned strategy described by `config`; requires a model path.
pub fn learned_strategy(config: &ExtractorConfig) -> Result<LearnedStrategy> {
    let path = config
        .model_path
        .as_ref()
        .ok_or_else(|| TermError::invalid_input("the learned strategy needs a model path"))?;
    LearnedStrategy::from_model_file(config.model_kind, path, config.feature_builder())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Paragraph, ParagraphType};
    use crate::error::{classify, TermError};
    use crate::extraction::{QueryMode, StatisticalStrategy};
    use crate::storage::memory::tests::storm_article;
    use crate::text::LexiconPosLookup;

    #[tokio::test]
    async fn test_statistical_analysis() {
        let config = ExtractorConfig::default();
        let analysis = analyze_article(
            &storm_article(),
            StatisticalStrategy,
            &TextTools::default(),
            &LexiconPosLookup::new(),
            &config,
        )
        .await
        .unwrap();

        assert!(analysis.found_query());
        assert!(analysis.query.contains("storm"));
        assert_eq!(analysis.query, analysis.query.to_lowercase());
        assert_eq!(analysis.entity_count, 1);
        assert!(analysis.keywords.iter().all(|s| s.p > config.keyword_threshold));
        assert!(analysis
            .non_keywords
            .iter()
            .all(|s| s.p <= config.keyword_threshold));
        assert!(analysis
            .keywords
            .iter()
            .chain(&analysis.non_keywords)
            .all(|s| !s.term.is_stopword()));
    }

    #[tokio::test]
    async fn test_entity_only_analysis() {
        let config = ExtractorConfig {
            query_mode: QueryMode::EntitiesOnly,
            ..Default::default()
        };
        let analysis = analyze_article(
            &storm_article(),
            StatisticalStrategy,
            &TextTools::default(),
            &LexiconPosLookup::new(),
            &config,
        )
        .await
        .unwrap();
        assert_eq!(analysis.query, "New York");
    }

    #[tokio::test]
    async fn test_article_without_entities() {
        let article = Article::new(
            "Floods",
            vec![Paragraph::new(ParagraphType::P, "Floods closed the bridge.")],
        );
        let analysis = analyze_article(
            &article,
            StatisticalStrategy,
            &TextTools::default(),
            &LexiconPosLookup::new(),
            &ExtractorConfig::default(),
        )
        .await
        .unwrap();
        assert_eq!(analysis.entity_count, 0);
        assert!(analysis.query.starts_with("floods"));
    }

    #[tokio::test]
    async fn test_empty_article_is_rejected() {
        let err = analyze_article(
            &Article::new("", Vec::new()),
            StatisticalStrategy,
            &TextTools::default(),
            &LexiconPosLookup::new(),
            &ExtractorConfig::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(classify(&err), Some(TermError::InvalidInput(_))));
    }

    #[test]
    fn test_learned_strategy_needs_model() {
        let err = learned_strategy(&ExtractorConfig::default()).unwrap_err();
        assert!(matches!(classify(&err), Some(TermError::InvalidInput(_))));
    }
}
