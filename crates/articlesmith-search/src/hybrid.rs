//! Hybrid searcher: parallel vector + trigram fan-out, fused by RRF,
//! optionally reranked by the cross-encoder.

use std::sync::Arc;

use articlesmith_core::{ArticleType, Error, Passage, Result};
use articlesmith_gateway::{EmbeddingGateway, RerankerGateway};
use articlesmith_store::DocumentStore;

use crate::rrf::{fuse, RankedHit, DEFAULT_RRF_K};

/// Tunables for a single `search` call.
#[derive(Debug, Clone, Copy)]
pub struct HybridSearchParams {
    pub k_per_source: usize,
    pub final_k: usize,
    pub rrf_k: f64,
}

impl Default for HybridSearchParams {
    fn default() -> Self {
        Self {
            k_per_source: 30,
            final_k: 10,
            rrf_k: DEFAULT_RRF_K,
        }
    }
}

/// Fan-out/fan-in hybrid searcher over a [`DocumentStore`], with an
/// optional reranker.
pub struct HybridSearcher {
    embedding_gateway: Arc<dyn EmbeddingGateway>,
    document_store: Arc<dyn DocumentStore>,
    reranker: Option<Arc<dyn RerankerGateway>>,
    reranker_top_k: usize,
}

impl HybridSearcher {
    #[must_use]
    pub fn new(
        embedding_gateway: Arc<dyn EmbeddingGateway>,
        document_store: Arc<dyn DocumentStore>,
        reranker: Option<Arc<dyn RerankerGateway>>,
        reranker_top_k: usize,
    ) -> Self {
        Self {
            embedding_gateway,
            document_store,
            reranker,
            reranker_top_k,
        }
    }

    /// Run the full hybrid retrieval algorithm.
    ///
    /// # Errors
    /// Returns [`Error::Retrieval`] if either retrieval lane fails: partial
    /// results from just one lane are never returned as if complete.
    pub async fn search(
        &self,
        query_text: &str,
        category: ArticleType,
        params: HybridSearchParams,
    ) -> Result<Vec<Passage>> {
        let query_vec = self.embedding_gateway.embed(query_text).await?;

        // Step 2: the two lanes run concurrently; either failing fails the
        // whole call, implemented with `try_join!`
        // so the first error short-circuits the sibling future.
        let (vector_hits, trigram_hits) = tokio::try_join!(
            self.document_store.vector_search(&query_vec, category, params.k_per_source),
            self.document_store.trigram_search(
                query_text,
                category,
                params.k_per_source,
                articlesmith_store::DEFAULT_MIN_TRIGRAM_SIMILARITY,
            ),
        )
        .map_err(|e| Error::Retrieval(format!("hybrid search fan-out failed: {e}")))?;

        if vector_hits.is_empty() && trigram_hits.is_empty() {
            return Ok(Vec::new());
        }

        let mut passages_by_id: std::collections::HashMap<i64, Passage> =
            std::collections::HashMap::new();
        let vector_ranked: Vec<RankedHit> = vector_hits
            .into_iter()
            .map(|(p, rank)| {
                let id = p.id;
                passages_by_id.insert(id, p);
                RankedHit { id, rank }
            })
            .collect();
        let trigram_ranked: Vec<RankedHit> = trigram_hits
            .into_iter()
            .map(|(p, rank)| {
                let id = p.id;
                passages_by_id.entry(id).or_insert(p);
                RankedHit { id, rank }
            })
            .collect();

        let fused = fuse(&[&vector_ranked, &trigram_ranked], params.rrf_k);
        let truncated: Vec<Passage> = fused
            .into_iter()
            .take(params.final_k)
            .filter_map(|f| passages_by_id.get(&f.id).cloned())
            .collect();

        // Step 5: rerank only when available and truncated exceeds top-K.
        let Some(reranker) = &self.reranker else {
            return Ok(truncated);
        };
        if truncated.len() <= self.reranker_top_k {
            return Ok(truncated);
        }

        let pairs: Vec<(i64, String)> = truncated.iter().map(|p| (p.id, p.body.clone())).collect();
        let reranked = reranker.rerank(query_text, &pairs, self.reranker_top_k).await?;

        let mut by_id: std::collections::HashMap<i64, Passage> =
            truncated.into_iter().map(|p| (p.id, p)).collect();
        let mut ordered = Vec::with_capacity(reranked.len());
        for hit in reranked {
            if let Some(mut passage) = by_id.remove(&hit.id) {
                passage.set_rerank_score(hit.normalized_score);
                ordered.push(passage);
            }
        }
        Ok(ordered)
    }
}
