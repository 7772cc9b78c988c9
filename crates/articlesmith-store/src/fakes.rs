//! In-memory fakes for [`DocumentStore`] and [`HistoryStore`], gated behind
//! the `test-support` feature. Used by this crate's own tests and by
//! `articlesmith-search`/`articlesmith-pipeline` to exercise pipeline
//! behavior without a live Postgres instance.

use std::collections::HashMap;
use std::sync::Mutex;

use articlesmith_core::{ArticleType, Draft, Error, Passage, Result, StyleKind, StyleRecord};
use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::document_store::DocumentStore;
use crate::history_store::{DraftSummary, HistoryStore};

/// Cosine distance between two equal-length vectors; smaller is closer.
/// Falls back to `f32::MAX` on dimension mismatch so a malformed fixture
/// sorts last rather than panicking.
fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return f32::MAX;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    1.0 - dot / (norm_a * norm_b)
}

/// Trigram-ish similarity stand-in: fraction of 3-character windows of
/// `query` that appear in `body`. Good enough to exercise ranking/threshold
/// behavior in tests without pulling in `pg_trgm`'s actual algorithm.
fn trigram_similarity(query: &str, body: &str) -> f64 {
    let grams: Vec<String> = query
        .chars()
        .collect::<Vec<_>>()
        .windows(3)
        .map(|w| w.iter().collect())
        .collect();
    if grams.is_empty() {
        return if body.contains(query) { 1.0 } else { 0.0 };
    }
    let hits = grams.iter().filter(|g| body.contains(g.as_str())).count();
    hits as f64 / grams.len() as f64
}

/// In-memory [`DocumentStore`]. Tests push fixtures directly into the
/// exposed `Mutex<Vec<_>>` fields.
#[derive(Default)]
pub struct FakeDocumentStore {
    pub passages: Mutex<Vec<Passage>>,
    pub style_records: Mutex<Vec<StyleRecord>>,
}

#[async_trait]
impl DocumentStore for FakeDocumentStore {
    async fn vector_search(
        &self,
        query_vec: &[f32],
        category: ArticleType,
        limit: usize,
    ) -> Result<Vec<(Passage, usize)>> {
        let passages = self.passages.lock().unwrap();
        let mut scored: Vec<(Passage, f32)> = passages
            .iter()
            .filter(|p| p.category == category && p.embedding.is_some())
            .map(|p| {
                let dist = cosine_distance(query_vec, p.embedding.as_ref().unwrap());
                (p.clone(), dist)
            })
            .collect();
        scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        Ok(scored
            .into_iter()
            .take(limit)
            .enumerate()
            .map(|(idx, (p, _))| (p, idx + 1))
            .collect())
    }

    async fn trigram_search(
        &self,
        query_text: &str,
        category: ArticleType,
        limit: usize,
        min_similarity: f64,
    ) -> Result<Vec<(Passage, usize)>> {
        let passages = self.passages.lock().unwrap();
        let mut scored: Vec<(Passage, f64)> = passages
            .iter()
            .filter(|p| p.category == category)
            .map(|p| (p.clone(), trigram_similarity(query_text, &p.body)))
            .filter(|(_, sim)| *sim > min_similarity)
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        Ok(scored
            .into_iter()
            .take(limit)
            .enumerate()
            .map(|(idx, (p, _))| (p, idx + 1))
            .collect())
    }

    async fn style_profile(&self, category: ArticleType) -> Result<Option<StyleRecord>> {
        let records = self.style_records.lock().unwrap();
        let mut matches = records
            .iter()
            .filter(|r| r.category == category && r.kind == StyleKind::Profile);
        let first = matches.next().cloned();
        if matches.next().is_some() {
            return Err(Error::Invariant(format!(
                "more than one profile record for category {category}"
            )));
        }
        Ok(first)
    }

    async fn style_excerpts(
        &self,
        query_vec: &[f32],
        category: ArticleType,
        limit: usize,
    ) -> Result<Vec<StyleRecord>> {
        let records = self.style_records.lock().unwrap();
        let mut scored: Vec<(StyleRecord, f32)> = records
            .iter()
            .filter(|r| r.category == category && r.kind == StyleKind::Excerpt && r.embedding.is_some())
            .map(|r| {
                let dist = cosine_distance(query_vec, r.embedding.as_ref().unwrap());
                (r.clone(), dist)
            })
            .collect();
        scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        Ok(scored.into_iter().take(limit).map(|(r, _)| r).collect())
    }
}

/// In-memory [`HistoryStore`].
#[derive(Default)]
pub struct FakeHistoryStore {
    entries: Mutex<HashMap<Uuid, (String, ArticleType, Draft, String, chrono::NaiveDateTime)>>,
}

#[async_trait]
impl HistoryStore for FakeHistoryStore {
    async fn save(
        &self,
        input_material: &str,
        category: ArticleType,
        draft: &Draft,
        markdown: &str,
    ) -> Result<Uuid> {
        let id = Uuid::new_v4();
        self.entries.lock().unwrap().insert(
            id,
            (
                input_material.to_string(),
                category,
                draft.clone(),
                markdown.to_string(),
                Utc::now().naive_utc(),
            ),
        );
        Ok(id)
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<DraftSummary>> {
        let entries = self.entries.lock().unwrap();
        let mut rows: Vec<_> = entries.iter().collect();
        rows.sort_by(|a, b| b.1 .4.cmp(&a.1 .4));
        Ok(rows
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .map(|(id, (_, category, draft, _, created_at))| DraftSummary {
                id: *id,
                category: *category,
                theme: draft.theme.clone(),
                actual_length: draft.actual_length,
                created_at: *created_at,
            })
            .collect())
    }

    async fn get(&self, id: Uuid) -> Result<Draft> {
        self.entries
            .lock()
            .unwrap()
            .get(&id)
            .map(|(_, _, draft, _, _)| draft.clone())
            .ok_or_else(|| Error::NotFound(format!("no generation with id {id}")))
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        self.entries
            .lock()
            .unwrap()
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| Error::NotFound(format!("no generation with id {id}")))
    }
}
