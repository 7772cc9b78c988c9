//! Reranker gateway: cross-encoder scoring of `(query, passage)` pairs,
//! sigmoid-normalized. Absence is graceful degradation, not an error —
//! callers hold an `Option<Arc<dyn RerankerGateway>>` and skip the call
//! entirely when it is `None`.

use std::time::Duration;

use articlesmith_core::{Error, Result};
use async_trait::async_trait;
use serde::Deserialize;

use crate::retry::{retry_transient, Attempt};

/// One reranked passage: the caller's opaque id, the raw cross-encoder
/// score, and `normalized_score = sigmoid(raw_score)`.
#[derive(Debug, Clone, PartialEq)]
pub struct RerankedPassage {
    pub id: i64,
    pub raw_score: f64,
    pub normalized_score: f64,
}

/// Uniform surface over the cross-encoder reranker model. A process-wide
/// singleton, loaded once.
#[async_trait]
pub trait RerankerGateway: Send + Sync {
    /// Score `(query, passage.body)` for every `(id, body)` pair and return
    /// them ordered by raw score descending, ties broken by input order,
    /// truncated to `top_k`.
    async fn rerank(&self, query: &str, passages: &[(i64, String)], top_k: usize)
        -> Result<Vec<RerankedPassage>>;
}

/// HTTP-backed cross-encoder reranker. Construction can fail (model
/// endpoint unreachable, feature flag off); [`HttpRerankerGateway::try_new`]
/// returns `None` in that case so callers degrade gracefully rather than
/// treating an absent reranker as an error.
pub struct HttpRerankerGateway {
    base_url: String,
    api_key: Option<String>,
    call_timeout: Duration,
    max_attempts: u32,
}

impl HttpRerankerGateway {
    /// Construct the gateway, or return `None` if `base_url` is absent
    /// (the "reranker not configured" case).
    #[must_use]
    pub fn try_new(
        base_url: Option<String>,
        api_key: Option<String>,
        call_timeout: Duration,
        max_attempts: u32,
    ) -> Option<Self> {
        let base_url = base_url?;
        if base_url.trim().is_empty() {
            return None;
        }
        Some(Self {
            base_url,
            api_key,
            call_timeout,
            max_attempts,
        })
    }

    async fn call_once(
        &self,
        query: &str,
        passages: &[(i64, String)],
    ) -> Attempt<Vec<(i64, f64)>, Error> {
        let url = format!("{}/rerank", self.base_url.trim_end_matches('/'));
        let payload = serde_json::json!({
            "query": query,
            "documents": passages.iter().map(|(id, body)| serde_json::json!({
                "id": id,
                "text": body,
            })).collect::<Vec<_>>(),
        });
        let body = match serde_json::to_vec(&payload) {
            Ok(b) => b,
            Err(e) => return Attempt::Permanent(Error::Schema(e.to_string())),
        };

        let mut headers = vec![("Content-Type".to_string(), "application/json".to_string())];
        if let Some(key) = &self.api_key {
            headers.push(("Authorization".to_string(), format!("Bearer {key}")));
        }

        let client = asupersync::http::h1::HttpClient::new();
        let request = client.request(asupersync::http::h1::Method::Post, &url, headers, body);
        let response = match tokio::time::timeout(self.call_timeout, request).await {
            Ok(Ok(resp)) => resp,
            Ok(Err(e)) => return Attempt::Transient(Error::Upstream(e.to_string())),
            Err(_) => return Attempt::Transient(Error::Timeout("rerank call".to_string())),
        };

        if response.status >= 500 || response.status == 429 {
            return Attempt::Transient(Error::Upstream(format!(
                "reranker gateway returned {}",
                response.status
            )));
        }
        if response.status != 200 {
            let body_text = String::from_utf8_lossy(&response.body).to_string();
            return Attempt::Permanent(Error::Upstream(format!(
                "reranker gateway returned {}: {body_text}",
                response.status
            )));
        }

        #[derive(Deserialize)]
        struct ScoredDoc {
            id: i64,
            score: f64,
        }
        #[derive(Deserialize)]
        struct RerankResponse {
            results: Vec<ScoredDoc>,
        }

        match serde_json::from_slice::<RerankResponse>(&response.body) {
            Ok(parsed) => Attempt::Ok(parsed.results.into_iter().map(|d| (d.id, d.score)).collect()),
            Err(e) => Attempt::Permanent(Error::Schema(format!("rerank response: {e}"))),
        }
    }
}

#[async_trait]
impl RerankerGateway for HttpRerankerGateway {
    async fn rerank(
        &self,
        query: &str,
        passages: &[(i64, String)],
        top_k: usize,
    ) -> Result<Vec<RerankedPassage>> {
        if passages.is_empty() {
            return Ok(Vec::new());
        }
        let raw_scores = retry_transient(self.max_attempts, Duration::from_millis(250), || {
            self.call_once(query, passages)
        })
        .await?;

        let order_index: std::collections::HashMap<i64, usize> = passages
            .iter()
            .enumerate()
            .map(|(idx, (id, _))| (*id, idx))
            .collect();

        let mut scored: Vec<RerankedPassage> = raw_scores
            .into_iter()
            .map(|(id, raw_score)| RerankedPassage {
                id,
                raw_score,
                normalized_score: sigmoid(raw_score),
            })
            .collect();

        scored.sort_by(|a, b| {
            b.raw_score
                .partial_cmp(&a.raw_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| {
                    let ai = order_index.get(&a.id).copied().unwrap_or(usize::MAX);
                    let bi = order_index.get(&b.id).copied().unwrap_or(usize::MAX);
                    ai.cmp(&bi)
                })
        });
        scored.truncate(top_k);
        Ok(scored)
    }
}

/// `1 / (1 + exp(-x))`.
#[must_use]
pub fn sigmoid(raw_score: f64) -> f64 {
    1.0 / (1.0 + (-raw_score).exp())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sigmoid_maps_zero_to_one_half() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn sigmoid_is_monotonic_increasing() {
        assert!(sigmoid(-5.0) < sigmoid(0.0));
        assert!(sigmoid(0.0) < sigmoid(5.0));
    }

    #[test]
    fn sigmoid_stays_in_unit_interval() {
        for raw in [-100.0, -1.0, 0.0, 1.0, 100.0] {
            let v = sigmoid(raw);
            assert!((0.0..=1.0).contains(&v));
        }
    }

    #[test]
    fn try_new_returns_none_without_base_url() {
        assert!(HttpRerankerGateway::try_new(None, None, Duration::from_secs(1), 3).is_none());
        assert!(HttpRerankerGateway::try_new(
            Some(String::new()),
            None,
            Duration::from_secs(1),
            3
        )
        .is_none());
    }
}
