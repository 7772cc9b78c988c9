//! History store: append/list/fetch/delete of past generations.
//!
//! Writes are best-effort at the call site (the orchestrator logs and
//! swallows a save failure rather than failing the user-facing response);
//! reads return [`Error::NotFound`] on an unknown id.

use articlesmith_core::{ArticleType, Draft, Error, Result};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde_json;
use sqlx::{PgPool, Row};
use uuid::Uuid;

/// A lightweight summary row for `history_list`. Avoids re-serializing full section bodies for a listing
/// view.
#[derive(Debug, Clone)]
pub struct DraftSummary {
    pub id: Uuid,
    pub category: ArticleType,
    pub theme: String,
    pub actual_length: u32,
    pub created_at: NaiveDateTime,
}

/// The append/list/fetch/delete surface a history store must implement.
///
/// `markdown` is the already-rendered draft; the store persists it verbatim alongside the
/// structured `draft` so `get`/`list` never need to re-render.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn save(
        &self,
        input_material: &str,
        category: ArticleType,
        draft: &Draft,
        markdown: &str,
    ) -> Result<Uuid>;

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<DraftSummary>>;

    async fn get(&self, id: Uuid) -> Result<Draft>;

    async fn delete(&self, id: Uuid) -> Result<()>;
}

/// Postgres-backed implementation over `generated_articles`.
pub struct PgHistoryStore {
    pool: PgPool,
}

impl PgHistoryStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HistoryStore for PgHistoryStore {
    async fn save(
        &self,
        input_material: &str,
        category: ArticleType,
        draft: &Draft,
        markdown: &str,
    ) -> Result<Uuid> {
        let id = Uuid::new_v4();
        let content = serde_json::to_value(draft).map_err(|e| Error::Internal(e.to_string()))?;
        sqlx::query(
            r"INSERT INTO generated_articles (id, input_material, category, content, markdown)
              VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(id)
        .bind(input_material)
        .bind(category.as_str())
        .bind(&content)
        .bind(&markdown)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Retrieval(format!("history save failed: {e}")))?;
        Ok(id)
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<DraftSummary>> {
        let rows = sqlx::query(
            r"SELECT id, category, content, created_at
              FROM generated_articles
              ORDER BY created_at DESC
              LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::Retrieval(format!("history list failed: {e}")))?;

        rows.iter()
            .map(|row| {
                let category_str: String =
                    row.try_get("category").map_err(|e| Error::Retrieval(e.to_string()))?;
                let category = ArticleType::parse(&category_str).ok_or_else(|| {
                    Error::Invariant(format!("unknown category in generated_articles row: {category_str}"))
                })?;
                let content: serde_json::Value =
                    row.try_get("content").map_err(|e| Error::Retrieval(e.to_string()))?;
                let draft: Draft =
                    serde_json::from_value(content).map_err(|e| Error::Internal(e.to_string()))?;
                Ok(DraftSummary {
                    id: row.try_get("id").map_err(|e| Error::Retrieval(e.to_string()))?,
                    category,
                    theme: draft.theme,
                    actual_length: draft.actual_length,
                    created_at: row.try_get("created_at").map_err(|e| Error::Retrieval(e.to_string()))?,
                })
            })
            .collect()
    }

    async fn get(&self, id: Uuid) -> Result<Draft> {
        let row = sqlx::query(r"SELECT content FROM generated_articles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Error::Retrieval(format!("history get failed: {e}")))?
            .ok_or_else(|| Error::NotFound(format!("no generation with id {id}")))?;
        let content: serde_json::Value =
            row.try_get("content").map_err(|e| Error::Retrieval(e.to_string()))?;
        serde_json::from_value(content).map_err(|e| Error::Internal(e.to_string()))
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query(r"DELETE FROM generated_articles WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| Error::Retrieval(format!("history delete failed: {e}")))?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("no generation with id {id}")));
        }
        Ok(())
    }
}

#[cfg(any(test, feature = "test-support"))]
mod tests {
    use super::*;
    use crate::fakes::FakeHistoryStore;
    use articlesmith_core::DraftSection;

    fn sample_draft() -> Draft {
        Draft {
            titles: ["a".into(), "b".into(), "c".into()],
            lead: "lead".into(),
            sections: vec![DraftSection {
                heading: "## h".into(),
                body: "body".into(),
            }],
            closing: "closing".into(),
            category: ArticleType::Announcement,
            theme: "theme".into(),
            desired_length: 2000,
            actual_length: 8,
            tag_count: 0,
            consistency_score: 0.9,
            verification_confidence: 0.9,
        }
    }

    #[tokio::test]
    async fn save_then_get_round_trips() {
        let store = FakeHistoryStore::default();
        let draft = sample_draft();
        let id = store.save("raw material", ArticleType::Announcement, &draft, "# markdown").await.unwrap();
        let fetched = store.get(id).await.unwrap();
        assert_eq!(fetched.theme, draft.theme);
        assert_eq!(fetched.titles, draft.titles);
    }

    #[tokio::test]
    async fn get_unknown_id_is_not_found() {
        let store = FakeHistoryStore::default();
        let result = store.get(Uuid::new_v4()).await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn delete_then_get_is_not_found() {
        let store = FakeHistoryStore::default();
        let draft = sample_draft();
        let id = store.save("raw", ArticleType::Announcement, &draft, "# markdown").await.unwrap();
        store.delete(id).await.unwrap();
        assert!(matches!(store.get(id).await, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn list_orders_newest_first() {
        let store = FakeHistoryStore::default();
        let mut d1 = sample_draft();
        d1.theme = "first".into();
        let mut d2 = sample_draft();
        d2.theme = "second".into();
        store.save("raw", ArticleType::Announcement, &d1, "# markdown").await.unwrap();
        store.save("raw", ArticleType::Announcement, &d2, "# markdown").await.unwrap();
        let summaries = store.list(10, 0).await.unwrap();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].theme, "second");
    }
}
