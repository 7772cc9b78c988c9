//! Document store: the read API over `documents` and `style_profiles`
//! that `articlesmith-search` builds the hybrid searcher on top of.

use articlesmith_core::{ArticleType, Error, Passage, Result, StyleKind, StyleRecord};
use async_trait::async_trait;
use pgvector::Vector;
use sqlx::{PgPool, Row};

/// Default minimum trigram similarity for [`DocumentStore::trigram_search`].
pub const DEFAULT_MIN_TRIGRAM_SIMILARITY: f64 = 0.1;

/// The read API required of the relational store. Implemented against
/// Postgres (pgvector + `pg_trgm`) in [`PgDocumentStore`]; tests elsewhere
/// in the workspace use an in-memory fake against the same trait.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Up to `limit` passages for `category`, ordered by cosine distance to
    /// `query_vec` ascending, each carrying its 1-based rank.
    async fn vector_search(
        &self,
        query_vec: &[f32],
        category: ArticleType,
        limit: usize,
    ) -> Result<Vec<(Passage, usize)>>;

    /// Up to `limit` passages for `category` whose trigram similarity to
    /// `query_text` exceeds `min_similarity`, ordered by similarity
    /// descending, each carrying its 1-based rank.
    async fn trigram_search(
        &self,
        query_text: &str,
        category: ArticleType,
        limit: usize,
        min_similarity: f64,
    ) -> Result<Vec<(Passage, usize)>>;

    /// The unique `profile`-kind style record for `category`, if any.
    async fn style_profile(&self, category: ArticleType) -> Result<Option<StyleRecord>>;

    /// Up to `limit` `excerpt`-kind style records for `category`, ordered
    /// by cosine distance to `query_vec` ascending.
    async fn style_excerpts(
        &self,
        query_vec: &[f32],
        category: ArticleType,
        limit: usize,
    ) -> Result<Vec<StyleRecord>>;
}

/// Postgres-backed implementation of [`DocumentStore`].
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_passage(row: &sqlx::postgres::PgRow) -> Result<Passage> {
    let category_str: String = row
        .try_get("category")
        .map_err(|e| Error::Retrieval(e.to_string()))?;
    let category = ArticleType::parse(&category_str)
        .ok_or_else(|| Error::Invariant(format!("unknown category in documents row: {category_str}")))?;
    let attrs_json: serde_json::Value = row
        .try_get("attrs")
        .map_err(|e| Error::Retrieval(e.to_string()))?;
    let attrs = match attrs_json {
        serde_json::Value::Object(map) => map.into_iter().collect(),
        _ => Default::default(),
    };
    let embedding: Option<Vector> = row.try_get("embedding").ok();
    Ok(Passage {
        id: row.try_get("id").map_err(|e| Error::Retrieval(e.to_string()))?,
        body: row.try_get("body").map_err(|e| Error::Retrieval(e.to_string()))?,
        attrs,
        embedding: embedding.map(Vector::into),
        category,
        source: row.try_get("source").map_err(|e| Error::Retrieval(e.to_string()))?,
        chunk_index: row.try_get("chunk_index").map_err(|e| Error::Retrieval(e.to_string()))?,
        total_chunks: row.try_get("total_chunks").map_err(|e| Error::Retrieval(e.to_string()))?,
        created_at: row.try_get("created_at").map_err(|e| Error::Retrieval(e.to_string()))?,
    })
}

fn row_to_style_record(row: &sqlx::postgres::PgRow) -> Result<StyleRecord> {
    let category_str: String = row
        .try_get("category")
        .map_err(|e| Error::Retrieval(e.to_string()))?;
    let category = ArticleType::parse(&category_str)
        .ok_or_else(|| Error::Invariant(format!("unknown category in style_profiles row: {category_str}")))?;
    let kind_str: String = row.try_get("kind").map_err(|e| Error::Retrieval(e.to_string()))?;
    let kind = match kind_str.as_str() {
        "profile" => StyleKind::Profile,
        "excerpt" => StyleKind::Excerpt,
        other => return Err(Error::Invariant(format!("unknown style kind: {other}"))),
    };
    let embedding: Option<Vector> = row.try_get("embedding").ok();
    Ok(StyleRecord {
        id: row.try_get("id").map_err(|e| Error::Retrieval(e.to_string()))?,
        category,
        kind,
        body: row.try_get("body").map_err(|e| Error::Retrieval(e.to_string()))?,
        embedding: embedding.map(Vector::into),
        created_at: row.try_get("created_at").map_err(|e| Error::Retrieval(e.to_string()))?,
        updated_at: row.try_get("updated_at").map_err(|e| Error::Retrieval(e.to_string()))?,
    })
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn vector_search(
        &self,
        query_vec: &[f32],
        category: ArticleType,
        limit: usize,
    ) -> Result<Vec<(Passage, usize)>> {
        let vector = Vector::from(query_vec.to_vec());
        let limit_i64 = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = sqlx::query(
            r"SELECT id, body, attrs, embedding, category, source, chunk_index, total_chunks, created_at
              FROM documents
              WHERE category = $1 AND embedding IS NOT NULL
              ORDER BY embedding <-> $2
              LIMIT $3",
        )
        .bind(category.as_str())
        .bind(&vector)
        .bind(limit_i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::Retrieval(format!("vector_search failed: {e}")))?;

        rows.iter()
            .enumerate()
            .map(|(idx, row)| row_to_passage(row).map(|p| (p, idx + 1)))
            .collect()
    }

    async fn trigram_search(
        &self,
        query_text: &str,
        category: ArticleType,
        limit: usize,
        min_similarity: f64,
    ) -> Result<Vec<(Passage, usize)>> {
        let limit_i64 = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = sqlx::query(
            r"SELECT id, body, attrs, embedding, category, source, chunk_index, total_chunks, created_at
              FROM documents
              WHERE category = $1 AND similarity(body, $2) > $3
              ORDER BY similarity(body, $2) DESC
              LIMIT $4",
        )
        .bind(category.as_str())
        .bind(query_text)
        .bind(min_similarity)
        .bind(limit_i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::Retrieval(format!("trigram_search failed: {e}")))?;

        rows.iter()
            .enumerate()
            .map(|(idx, row)| row_to_passage(row).map(|p| (p, idx + 1)))
            .collect()
    }

    async fn style_profile(&self, category: ArticleType) -> Result<Option<StyleRecord>> {
        let rows = sqlx::query(
            r"SELECT id, category, kind, body, embedding, created_at, updated_at
              FROM style_profiles
              WHERE category = $1 AND kind = 'profile'",
        )
        .bind(category.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::Retrieval(format!("style_profile failed: {e}")))?;

        if rows.len() > 1 {
            return Err(Error::Invariant(format!(
                "more than one profile record for category {category}"
            )));
        }
        rows.first().map(row_to_style_record).transpose()
    }

    async fn style_excerpts(
        &self,
        query_vec: &[f32],
        category: ArticleType,
        limit: usize,
    ) -> Result<Vec<StyleRecord>> {
        let vector = Vector::from(query_vec.to_vec());
        let limit_i64 = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = sqlx::query(
            r"SELECT id, category, kind, body, embedding, created_at, updated_at
              FROM style_profiles
              WHERE category = $1 AND kind = 'excerpt' AND embedding IS NOT NULL
              ORDER BY embedding <-> $2
              LIMIT $3",
        )
        .bind(category.as_str())
        .bind(&vector)
        .bind(limit_i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::Retrieval(format!("style_excerpts failed: {e}")))?;

        rows.iter().map(row_to_style_record).collect()
    }
}

#[cfg(any(test, feature = "test-support"))]
mod tests {
    use super::*;
    use crate::fakes::FakeDocumentStore;
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn sample_passage(id: i64, category: ArticleType, body: &str, embedding: Vec<f32>) -> Passage {
        Passage {
            id,
            body: body.to_string(),
            attrs: BTreeMap::new(),
            embedding: Some(embedding),
            category,
            source: "test-source".to_string(),
            chunk_index: 0,
            total_chunks: 1,
            created_at: Utc::now().naive_utc(),
        }
    }

    #[tokio::test]
    async fn vector_search_filters_by_category() {
        let store = FakeDocumentStore::default();
        store.passages.lock().unwrap().push(sample_passage(
            1,
            ArticleType::Announcement,
            "announcement body",
            vec![1.0; 768],
        ));
        store.passages.lock().unwrap().push(sample_passage(
            2,
            ArticleType::Interview,
            "interview body",
            vec![1.0; 768],
        ));
        let results = store
            .vector_search(&[1.0; 768], ArticleType::Announcement, 10)
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0.id, 1);
        assert_eq!(results[0].1, 1);
    }

    #[tokio::test]
    async fn style_profile_errs_on_more_than_one_per_category() {
        let store = FakeDocumentStore::default();
        let now = Utc::now().naive_utc();
        for id in [1, 2] {
            store.style_records.lock().unwrap().push(StyleRecord {
                id,
                category: ArticleType::Culture,
                kind: StyleKind::Profile,
                body: "rulebook".to_string(),
                embedding: None,
                created_at: now,
                updated_at: now,
            });
        }
        let result = store.style_profile(ArticleType::Culture).await;
        assert!(matches!(result, Err(Error::Invariant(_))));
    }
}
