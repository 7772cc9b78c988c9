//! Style-profile retriever: the per-category rulebook, plus the
//! theme-matched style excerpts.

use std::sync::Arc;

use articlesmith_core::{ArticleType, Result};
use articlesmith_gateway::{EmbeddingGateway, RerankerGateway};
use articlesmith_store::DocumentStore;

/// Wraps a [`DocumentStore`] with the two read-only style-corpus lookups.
/// Never reranks the profile lookup — there is at most one.
pub struct StyleRetriever {
    embedding_gateway: Arc<dyn EmbeddingGateway>,
    document_store: Arc<dyn DocumentStore>,
    reranker: Option<Arc<dyn RerankerGateway>>,
}

impl StyleRetriever {
    #[must_use]
    pub fn new(
        embedding_gateway: Arc<dyn EmbeddingGateway>,
        document_store: Arc<dyn DocumentStore>,
        reranker: Option<Arc<dyn RerankerGateway>>,
    ) -> Self {
        Self {
            embedding_gateway,
            document_store,
            reranker,
        }
    }

    /// The body text of the unique `profile` record for `category`, or an
    /// empty string if the category has none.
    pub async fn retrieve_profile(&self, category: ArticleType) -> Result<String> {
        Ok(self
            .document_store
            .style_profile(category)
            .await?
            .map(|record| record.body)
            .unwrap_or_default())
    }

    /// Up to `top_k` style excerpts matching `theme`, deduplicated by id,
    /// reranked when a reranker is available.
    pub async fn retrieve_excerpts(
        &self,
        theme: &str,
        category: ArticleType,
        top_k: usize,
    ) -> Result<Vec<String>> {
        if top_k == 0 {
            return Ok(Vec::new());
        }
        let theme_vec = self.embedding_gateway.embed(theme).await?;
        let candidates = self
            .document_store
            .style_excerpts(&theme_vec, category, top_k.saturating_mul(2))
            .await?;

        let Some(reranker) = &self.reranker else {
            return Ok(candidates.into_iter().take(top_k).map(|r| r.body).collect());
        };

        let pairs: Vec<(i64, String)> = candidates.iter().map(|r| (r.id, r.body.clone())).collect();
        let reranked = reranker.rerank(theme, &pairs, top_k).await?;
        let mut by_id: std::collections::HashMap<i64, String> =
            candidates.into_iter().map(|r| (r.id, r.body)).collect();
        Ok(reranked
            .into_iter()
            .filter_map(|hit| by_id.remove(&hit.id))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use articlesmith_core::{StyleKind, StyleRecord};
    use articlesmith_gateway::RerankedPassage;
    use articlesmith_store::fakes::FakeDocumentStore;
    use async_trait::async_trait;
    use chrono::Utc;

    struct StubEmbeddingGateway;

    #[async_trait]
    impl EmbeddingGateway for StubEmbeddingGateway {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            Ok(vec![text.len() as f32; 768])
        }
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            let mut out = Vec::new();
            for t in texts {
                out.push(self.embed(t).await?);
            }
            Ok(out)
        }
    }

    fn style_record(id: i64, category: ArticleType, kind: StyleKind, body: &str) -> StyleRecord {
        StyleRecord {
            id,
            category,
            kind,
            body: body.to_string(),
            embedding: Some(vec![1.0; 768]),
            created_at: Utc::now().naive_utc(),
            updated_at: Utc::now().naive_utc(),
        }
    }

    #[tokio::test]
    async fn missing_profile_returns_empty_string_not_error() {
        let store: Arc<dyn DocumentStore> = Arc::new(FakeDocumentStore::default());
        let retriever = StyleRetriever::new(Arc::new(StubEmbeddingGateway), store, None);
        let profile = retriever.retrieve_profile(ArticleType::Culture).await.unwrap();
        assert_eq!(profile, "");
    }

    #[tokio::test]
    async fn profile_returns_body_when_present() {
        let store = FakeDocumentStore::default();
        store.style_records.lock().unwrap().push(style_record(
            1,
            ArticleType::Culture,
            StyleKind::Profile,
            "rulebook text",
        ));
        let store: Arc<dyn DocumentStore> = Arc::new(store);
        let retriever = StyleRetriever::new(Arc::new(StubEmbeddingGateway), store, None);
        let profile = retriever.retrieve_profile(ArticleType::Culture).await.unwrap();
        assert_eq!(profile, "rulebook text");
    }

    #[tokio::test]
    async fn excerpts_deduplicated_and_capped_at_top_k() {
        let store = FakeDocumentStore::default();
        for i in 1..=5 {
            store.style_records.lock().unwrap().push(style_record(
                i,
                ArticleType::Interview,
                StyleKind::Excerpt,
                &format!("excerpt {i}"),
            ));
        }
        let store: Arc<dyn DocumentStore> = Arc::new(store);
        let retriever = StyleRetriever::new(Arc::new(StubEmbeddingGateway), store, None);
        let excerpts = retriever.retrieve_excerpts("theme", ArticleType::Interview, 2).await.unwrap();
        assert_eq!(excerpts.len(), 2);
    }

    struct StubReranker;

    #[async_trait]
    impl RerankerGateway for StubReranker {
        async fn rerank(
            &self,
            _query: &str,
            passages: &[(i64, String)],
            top_k: usize,
        ) -> Result<Vec<RerankedPassage>> {
            let mut out: Vec<RerankedPassage> = passages
                .iter()
                .map(|(id, _)| RerankedPassage {
                    id: *id,
                    raw_score: *id as f64,
                    normalized_score: 0.5,
                })
                .collect();
            out.sort_by(|a, b| b.raw_score.partial_cmp(&a.raw_score).unwrap());
            out.truncate(top_k);
            Ok(out)
        }
    }

    #[tokio::test]
    async fn reranker_reorders_excerpts() {
        let store = FakeDocumentStore::default();
        for i in 1..=4 {
            store.style_records.lock().unwrap().push(style_record(
                i,
                ArticleType::Interview,
                StyleKind::Excerpt,
                &format!("excerpt {i}"),
            ));
        }
        let store: Arc<dyn DocumentStore> = Arc::new(store);
        let reranker: Option<Arc<dyn RerankerGateway>> = Some(Arc::new(StubReranker));
        let retriever = StyleRetriever::new(Arc::new(StubEmbeddingGateway), store, reranker);
        let excerpts = retriever.retrieve_excerpts("theme", ArticleType::Interview, 2).await.unwrap();
        // StubReranker favors highest id, so id 4's excerpt should lead.
        assert_eq!(excerpts[0], "excerpt 4");
    }
}
