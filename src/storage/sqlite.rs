use anyhow::Result;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous},
    Pool, Sqlite,
};
use std::str::FromStr;
use tokio::time::Duration;
use tracing::{debug, info};

use super::{ArticleFilter, DocumentStore, StoredArticle, StoredLeadImage, TARGET_STORE};
use crate::document::{Article, ImageKeyword, Paragraph};
use crate::entity::EntityTree;
use crate::error::TermError;

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS articles (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        headline TEXT NOT NULL,
        paragraphs TEXT NOT NULL, -- JSON list of {type, content}
        has_lead_image BOOLEAN NOT NULL,
        image_title TEXT,
        image_caption TEXT
    );

    CREATE TABLE IF NOT EXISTS keywords (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        text TEXT NOT NULL,
        type TEXT NOT NULL,
        relevance REAL
    );

    CREATE TABLE IF NOT EXISTS article_keywords (
        article_id INTEGER NOT NULL,
        keyword_id INTEGER NOT NULL,
        position INTEGER NOT NULL,
        FOREIGN KEY (article_id) REFERENCES articles (id) ON DELETE CASCADE,
        FOREIGN KEY (keyword_id) REFERENCES keywords (id) ON DELETE CASCADE,
        UNIQUE(article_id, position)
    );
    CREATE INDEX IF NOT EXISTS idx_article_keywords_article_id ON article_keywords (article_id);

    CREATE TABLE IF NOT EXISTS article_entities (
        article_id INTEGER PRIMARY KEY,
        entities TEXT NOT NULL, -- JSON entity tree
        FOREIGN KEY (article_id) REFERENCES articles (id) ON DELETE CASCADE
    );
"#;

fn storage_error(err: sqlx::Error) -> anyhow::Error {
    TermError::storage(err.to_string())
}

fn json_error(err: serde_json::Error) -> anyhow::Error {
    TermError::storage(format!("malformed JSON column: {}", err))
}

/// A document store backed by SQLite.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    /// Opens (creating if needed) the database file at `path`.
    pub async fn connect(path: &str) -> Result<Self> {
        info!(target: TARGET_STORE, "Opening document store at {}", path);
        let connect_options = SqliteConnectOptions::from_str(&format!("sqlite://{}", path))
            .map_err(storage_error)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5))
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await
            .map_err(storage_error)?;
        Self::with_pool(pool).await
    }

    /// A private in-memory database; it lives as long as the store.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .map_err(storage_error)?;
        Self::with_pool(pool).await
    }

    async fn with_pool(pool: Pool<Sqlite>) -> Result<Self> {
        let mut conn = pool.acquire().await.map_err(storage_error)?;
        sqlx::query(SCHEMA)
            .execute(&mut *conn)
            .await
            .map_err(storage_error)?;
        drop(conn);
        info!(target: TARGET_STORE, "Document store schema initialized");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Stores an article with its lead-image keywords and entities; returns the article id.
    pub async fn insert_article(&self, article: &Article) -> Result<i64> {
        let paragraphs = serde_json::to_string(&article.paragraphs)?;
        let mut tx = self.pool.begin().await.map_err(storage_error)?;

        let id = sqlx::query(
            "INSERT INTO articles (id, headline, paragraphs, has_lead_image, image_title, image_caption)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(article.id)
        .bind(&article.headline)
        .bind(&paragraphs)
        .bind(article.lead_image.is_some())
        .bind(article.lead_image.as_ref().map(|image| image.title.as_str()))
        .bind(article.lead_image.as_ref().map(|image| image.caption.as_str()))
        .execute(&mut *tx)
        .await
        .map_err(storage_error)?
        .last_insert_rowid();

        if let Some(image) = &article.lead_image {
            for (position, keyword) in image.keywords.iter().enumerate() {
                let keyword_id = sqlx::query(
                    "INSERT OR IGNORE INTO keywords (id, text, type, relevance) VALUES (?, ?, ?, ?)",
                )
                .bind(keyword.keyword_id)
                .bind(&keyword.text)
                .bind(&keyword.keyword_type)
                .bind(keyword.relevance)
                .execute(&mut *tx)
                .await
                .map_err(storage_error)?
                .last_insert_rowid();
                let keyword_id = keyword.keyword_id.unwrap_or(keyword_id);

                sqlx::query(
                    "INSERT INTO article_keywords (article_id, keyword_id, position) VALUES (?, ?, ?)",
                )
                .bind(id)
                .bind(keyword_id)
                .bind(position as i64)
                .execute(&mut *tx)
                .await
                .map_err(storage_error)?;
            }
        }

        if let Some(entities) = &article.entities {
            sqlx::query("INSERT INTO article_entities (article_id, entities) VALUES (?, ?)")
                .bind(id)
                .bind(serde_json::to_string(entities)?)
                .execute(&mut *tx)
                .await
                .map_err(storage_error)?;
        }

        tx.commit().await.map_err(storage_error)?;
        debug!(target: TARGET_STORE, "Stored article {}", id);
        Ok(id)
    }

    async fn get_keyword_ids(&self, article_id: i64) -> Result<Vec<i64>> {
        sqlx::query_scalar::<_, i64>(
            "SELECT keyword_id FROM article_keywords WHERE article_id = ? ORDER BY position",
        )
        .bind(article_id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)
    }
}

impl DocumentStore for SqliteStore {
    async fn get_article(&self, id: i64) -> Result<Option<Article>> {
        let row = sqlx::query_as::<_, (i64, String, String, bool, Option<String>, Option<String>)>(
            "SELECT id, headline, paragraphs, has_lead_image, image_title, image_caption
             FROM articles WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error)?;

        let Some((id, headline, paragraphs, has_lead_image, title, caption)) = row else {
            return Ok(None);
        };
        let paragraphs: Vec<Paragraph> = serde_json::from_str(&paragraphs).map_err(json_error)?;

        let (lead_image, keywords) = if has_lead_image {
            let keyword_ids = self.get_keyword_ids(id).await?;
            let keywords = self.get_keywords(&keyword_ids).await?;
            let image = StoredLeadImage {
                title: title.unwrap_or_default(),
                caption: caption.unwrap_or_default(),
                keyword_ids,
            };
            (Some(image), keywords)
        } else {
            (None, Vec::new())
        };

        let stored = StoredArticle {
            id,
            headline,
            paragraphs,
            lead_image,
        };
        let entities = self.get_entities(id).await?;
        Ok(Some(stored.assemble(keywords, entities)))
    }

    async fn get_article_ids(&self, filter: &ArticleFilter) -> Result<Vec<i64>> {
        let limit = filter.limit.map_or(-1, |limit| limit as i64);
        sqlx::query_scalar::<_, i64>(
            "SELECT id FROM articles
             WHERE (? = 0 OR has_lead_image = 1)
               AND (? = 0 OR id IN (SELECT article_id FROM article_entities))
             ORDER BY id
             LIMIT ?",
        )
        .bind(filter.with_lead_image)
        .bind(filter.with_entities)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)
    }

    async fn get_keywords(&self, ids: &[i64]) -> Result<Vec<ImageKeyword>> {
        let mut keywords = Vec::with_capacity(ids.len());
        for id in ids {
            let row = sqlx::query_as::<_, (i64, String, String, Option<f64>)>(
                "SELECT id, text, type, relevance FROM keywords WHERE id = ?",
            )
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error)?;
            match row {
                Some((keyword_id, text, keyword_type, relevance)) => keywords.push(ImageKeyword {
                    keyword_id: Some(keyword_id),
                    text,
                    keyword_type,
                    relevance,
                }),
                None => debug!(target: TARGET_STORE, "Keyword {} not found", id),
            }
        }
        Ok(keywords)
    }

    async fn get_entities(&self, article_id: i64) -> Result<Option<EntityTree>> {
        let entities = sqlx::query_scalar::<_, String>(
            "SELECT entities FROM article_entities WHERE article_id = ?",
        )
        .bind(article_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error)?;
        entities
            .map(|json| serde_json::from_str(&json).map_err(json_error))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::ImageKeyword;
    use crate::storage::memory::tests::storm_article;

    #[tokio::test]
    async fn test_insert_and_get_article() {
        let store = SqliteStore::in_memory().await.unwrap();
        let id = store.insert_article(&storm_article()).await.unwrap();

        let article = store.get_article(id).await.unwrap().unwrap();
        assert_eq!(article.id, Some(id));
        assert_eq!(article.paragraphs, storm_article().paragraphs);
        let image = article.lead_image.unwrap();
        assert_eq!(image.caption, "Clouds gather over New York.");
        let texts: Vec<&str> = image.keywords.iter().map(|k| k.text.as_str()).collect();
        assert_eq!(texts, vec!["storm", "New York City"]);
        assert_eq!(image.keywords[0].relevance, Some(0.9));
        assert_eq!(article.entities, storm_article().entities);

        assert!(store.get_article(id + 100).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_shared_keywords_are_stored_once() {
        let store = SqliteStore::in_memory().await.unwrap();
        let mut first = storm_article();
        if let Some(image) = first.lead_image.as_mut() {
            image.keywords = vec![ImageKeyword {
                keyword_id: Some(42),
                text: "storm".to_string(),
                keyword_type: "Concept".to_string(),
                relevance: None,
            }];
        }
        let second = first.clone();
        let first_id = store.insert_article(&first).await.unwrap();
        let second_id = store.insert_article(&second).await.unwrap();
        assert_ne!(first_id, second_id);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM keywords")
            .fetch_one(store.pool())
            .await
            .unwrap();
        assert_eq!(count, 1);
        let article = store.get_article(second_id).await.unwrap().unwrap();
        assert_eq!(article.lead_image.unwrap().keywords[0].keyword_id, Some(42));
    }

    #[tokio::test]
    async fn test_article_filter() {
        let store = SqliteStore::in_memory().await.unwrap();
        store.insert_article(&storm_article()).await.unwrap();
        store
            .insert_article(&Article::new("Plain", Vec::new()))
            .await
            .unwrap();

        let all = store.get_article_ids(&ArticleFilter::default()).await.unwrap();
        assert_eq!(all.len(), 2);
        let annotated = store
            .get_article_ids(&ArticleFilter::default().with_lead_image().with_entities())
            .await
            .unwrap();
        assert_eq!(annotated, vec![all[0]]);
        let limited = store
            .get_article_ids(&ArticleFilter::default().limit(1))
            .await
            .unwrap();
        assert_eq!(limited.len(), 1);
        assert_eq!(store.get_articles(&all).await.unwrap().len(), 2);
    }
}
