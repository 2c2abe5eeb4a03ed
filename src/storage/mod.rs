//! Document store access for articles, lead-image keywords and entity annotations.
//!
//! The pipeline and tooling only depend on [`DocumentStore`]; `MemoryStore`
//! and `SqliteStore` are interchangeable backends.

pub mod memory;
pub mod sqlite;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::future::Future;

use crate::document::{Article, ImageKeyword, LeadImage, Paragraph};
use crate::entity::EntityTree;
use crate::error::TermError;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

pub const TARGET_STORE: &str = "store";

/// Which articles `get_article_ids` returns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticleFilter {
    /// Only articles with a lead image.
    pub with_lead_image: bool,
    /// Only articles with entity annotations.
    pub with_entities: bool,
    pub limit: Option<usize>,
}

impl ArticleFilter {
    pub fn with_lead_image(mut self) -> Self {
        self.with_lead_image = true;
        self
    }

    pub fn with_entities(mut self) -> Self {
        self.with_entities = true;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Article as persisted: the lead image refers to keywords by id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoredArticle {
    pub id: i64,
    #[serde(default)]
    pub headline: String,
    #[serde(default)]
    pub paragraphs: Vec<Paragraph>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lead_image: Option<StoredLeadImage>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoredLeadImage {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub caption: String,
    #[serde(default)]
    pub keyword_ids: Vec<i64>,
}

impl StoredArticle {
    /// Rebuilds the full article from its resolved keywords and entities.
    pub fn assemble(self, keywords: Vec<ImageKeyword>, entities: Option<EntityTree>) -> Article {
        Article {
            id: Some(self.id),
            headline: self.headline,
            paragraphs: self.paragraphs,
            lead_image: self.lead_image.map(|image| LeadImage {
                title: image.title,
                caption: image.caption,
                keywords,
            }),
            entities,
        }
    }
}

/// Read access to a corpus of annotated articles.
pub trait DocumentStore: Send + Sync {
    /// The article with its lead-image keywords and entity annotations resolved.
    fn get_article(&self, id: i64) -> impl Future<Output = Result<Option<Article>>> + Send;

    fn get_article_ids(&self, filter: &ArticleFilter)
        -> impl Future<Output = Result<Vec<i64>>> + Send;

    /// Keywords in the order of `ids`; unknown ids are skipped.
    fn get_keywords(&self, ids: &[i64]) -> impl Future<Output = Result<Vec<ImageKeyword>>> + Send;

    fn get_entities(&self, article_id: i64)
        -> impl Future<Output = Result<Option<EntityTree>>> + Send;

    /// Every listed article; an unknown id is an error.
    fn get_articles(&self, ids: &[i64]) -> impl Future<Output = Result<Vec<Article>>> + Send {
        async move {
            let mut articles = Vec::with_capacity(ids.len());
            for id in ids {
                match self.get_article(*id).await? {
                    Some(article) => articles.push(article),
                    None => {
                        return Err(TermError::storage(format!("article {} not found", id)))
                    }
                }
            }
            Ok(articles)
        }
    }
}
