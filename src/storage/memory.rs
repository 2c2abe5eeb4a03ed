use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

use super::{ArticleFilter, DocumentStore, StoredArticle, StoredLeadImage, TARGET_STORE};
use crate::document::{Article, ImageKeyword};
use crate::entity::EntityTree;
use crate::error::TermError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoredEntities {
    article_id: i64,
    entities: EntityTree,
}

/// On-disk layout of a `MemoryStore`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoreFile {
    #[serde(default)]
    articles: Vec<StoredArticle>,
    #[serde(default)]
    keywords: Vec<ImageKeyword>,
    #[serde(default)]
    entities: Vec<StoredEntities>,
}

/// A document store held in memory and persisted as one JSON file.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    articles: BTreeMap<i64, StoredArticle>,
    keywords: BTreeMap<i64, ImageKeyword>,
    entities: BTreeMap<i64, EntityTree>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let file: StoreFile = serde_json::from_str(json)
            .map_err(|err| TermError::storage(format!("malformed store document: {}", err)))?;

        let mut store = MemoryStore::new();
        for keyword in file.keywords {
            let id = keyword
                .keyword_id
                .ok_or_else(|| TermError::storage(format!("keyword '{}' has no id", keyword.text)))?;
            store.keywords.insert(id, keyword);
        }
        for article in file.articles {
            store.articles.insert(article.id, article);
        }
        for stored in file.entities {
            store.entities.insert(stored.article_id, stored.entities);
        }
        Ok(store)
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = tokio::fs::read_to_string(path).await.map_err(|err| {
            TermError::storage(format!("cannot read {}: {}", path.display(), err))
        })?;
        let store = Self::from_json(&json)?;
        info!(
            target: TARGET_STORE,
            "Loaded {} articles and {} keywords from {}",
            store.articles.len(),
            store.keywords.len(),
            path.display()
        );
        Ok(store)
    }

    pub fn to_json(&self) -> Result<String> {
        let file = StoreFile {
            articles: self.articles.values().cloned().collect(),
            keywords: self.keywords.values().cloned().collect(),
            entities: self
                .entities
                .iter()
                .map(|(article_id, entities)| StoredEntities {
                    article_id: *article_id,
                    entities: entities.clone(),
                })
                .collect(),
        };
        Ok(serde_json::to_string_pretty(&file)?)
    }

    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        tokio::fs::write(path, self.to_json()?).await.map_err(|err| {
            TermError::storage(format!("cannot write {}: {}", path.display(), err))
        })?;
        debug!(target: TARGET_STORE, "Saved store to {}", path.display());
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.articles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }

    /// Stores an article, its lead-image keywords and entities; returns the article id.
    ///
    /// Keywords without an id get a fresh one; keywords with a known id are reused.
    pub fn insert_article(&mut self, article: &Article) -> i64 {
        let id = article
            .id
            .unwrap_or_else(|| self.articles.keys().next_back().map_or(1, |last| last + 1));

        let lead_image = article.lead_image.as_ref().map(|image| {
            let keyword_ids = image
                .keywords
                .iter()
                .map(|keyword| self.insert_keyword(keyword))
                .collect();
            StoredLeadImage {
                title: image.title.clone(),
                caption: image.caption.clone(),
                keyword_ids,
            }
        });

        self.articles.insert(
            id,
            StoredArticle {
                id,
                headline: article.headline.clone(),
                paragraphs: article.paragraphs.clone(),
                lead_image,
            },
        );
        if let Some(entities) = &article.entities {
            self.entities.insert(id, entities.clone());
        }
        id
    }

    fn insert_keyword(&mut self, keyword: &ImageKeyword) -> i64 {
        let id = keyword
            .keyword_id
            .unwrap_or_else(|| self.keywords.keys().next_back().map_or(1, |last| last + 1));
        self.keywords.entry(id).or_insert_with(|| ImageKeyword {
            keyword_id: Some(id),
            ..keyword.clone()
        });
        id
    }

    fn resolve_keywords(&self, ids: &[i64]) -> Vec<ImageKeyword> {
        ids.iter()
            .filter_map(|id| {
                let keyword = self.keywords.get(id);
                if keyword.is_none() {
                    debug!(target: TARGET_STORE, "Keyword {} not found", id);
                }
                keyword.cloned()
            })
            .collect()
    }
}

impl DocumentStore for MemoryStore {
    async fn get_article(&self, id: i64) -> Result<Option<Article>> {
        let Some(stored) = self.articles.get(&id) else {
            return Ok(None);
        };
        let keywords = stored
            .lead_image
            .as_ref()
            .map(|image| self.resolve_keywords(&image.keyword_ids))
            .unwrap_or_default();
        let entities = self.entities.get(&id).cloned();
        Ok(Some(stored.clone().assemble(keywords, entities)))
    }

    async fn get_article_ids(&self, filter: &ArticleFilter) -> Result<Vec<i64>> {
        Ok(self
            .articles
            .values()
            .filter(|article| !filter.with_lead_image || article.lead_image.is_some())
            .filter(|article| !filter.with_entities || self.entities.contains_key(&article.id))
            .map(|article| article.id)
            .take(filter.limit.unwrap_or(usize::MAX))
            .collect())
    }

    async fn get_keywords(&self, ids: &[i64]) -> Result<Vec<ImageKeyword>> {
        Ok(self.resolve_keywords(ids))
    }

    async fn get_entities(&self, article_id: i64) -> Result<Option<EntityTree>> {
        Ok(self.entities.get(&article_id).cloned())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::document::{LeadImage, Paragraph, ParagraphType};
    use crate::error::{classify, TermError};

    pub(crate) fn storm_article() -> Article {
        let mut article = Article::new(
            "Storm hits New York",
            vec![Paragraph::new(
                ParagraphType::P,
                "A storm hit New York on Monday.",
            )],
        );
        article.lead_image = Some(LeadImage {
            title: "Storm over Manhattan".to_string(),
            caption: "Clouds gather over New York.".to_string(),
            keywords: vec![
                ImageKeyword {
                    keyword_id: None,
                    text: "storm".to_string(),
                    keyword_type: "Concept".to_string(),
                    relevance: Some(0.9),
                },
                ImageKeyword {
                    keyword_id: None,
                    text: "New York City".to_string(),
                    keyword_type: "Location".to_string(),
                    relevance: None,
                },
            ],
        });
        article.entities = Some(
            serde_json::from_str(
                r#"[{"_type": "City", "name": "New York", "instances": [{"exact": "New York", "offset": 11}]}]"#,
            )
            .unwrap(),
        );
        article
    }

    #[tokio::test]
    async fn test_insert_and_get_article() {
        let mut store = MemoryStore::new();
        let id = store.insert_article(&storm_article());
        assert_eq!(id, 1);

        let article = store.get_article(id).await.unwrap().unwrap();
        assert_eq!(article.id, Some(1));
        assert_eq!(article.headline, "Storm hits New York");
        let image = article.lead_image.unwrap();
        assert_eq!(image.keywords.len(), 2);
        assert_eq!(image.keywords[1].keyword_id, Some(2));
        assert_eq!(article.entities.unwrap().flatten()[0].name, "New York");
        assert!(store.get_article(7).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_article_filter() {
        let mut store = MemoryStore::new();
        store.insert_article(&storm_article());
        store.insert_article(&Article::new("Plain", Vec::new()));
        let mut annotated = storm_article();
        annotated.lead_image = None;
        store.insert_article(&annotated);

        let all = store.get_article_ids(&ArticleFilter::default()).await.unwrap();
        assert_eq!(all, vec![1, 2, 3]);
        let with_images = store
            .get_article_ids(&ArticleFilter::default().with_lead_image())
            .await
            .unwrap();
        assert_eq!(with_images, vec![1]);
        let with_entities = store
            .get_article_ids(&ArticleFilter::default().with_entities().limit(1))
            .await
            .unwrap();
        assert_eq!(with_entities, vec![1]);
    }

    #[tokio::test]
    async fn test_get_articles_rejects_unknown_ids() {
        let mut store = MemoryStore::new();
        store.insert_article(&storm_article());
        assert_eq!(store.get_articles(&[1]).await.unwrap().len(), 1);
        let err = store.get_articles(&[1, 9]).await.unwrap_err();
        assert!(matches!(classify(&err), Some(TermError::Storage(_))));
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let mut store = MemoryStore::new();
        store.insert_article(&storm_article());
        let path = std::env::temp_dir().join(format!("searchterm-store-{}.json", std::process::id()));
        store.save(&path).await.unwrap();

        let loaded = MemoryStore::load(&path).await.unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.get_keywords(&[2, 5, 1]).await.unwrap().len(), 2);
        assert!(loaded.get_entities(1).await.unwrap().is_some());

        let original = store.get_article(1).await.unwrap().unwrap();
        let reloaded = loaded.get_article(1).await.unwrap().unwrap();
        assert_eq!(original.lead_image, reloaded.lead_image);
    }

    #[test]
    fn test_keywords_need_ids() {
        let err = MemoryStore::from_json(r#"{"keywords": [{"text": "storm", "type": "Concept"}]}"#)
            .unwrap_err();
        assert!(matches!(classify(&err), Some(TermError::Storage(_))));
    }
}
