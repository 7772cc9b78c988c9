//! Embedding gateway: `embed`/`embed_batch` over the external embedding
//! model. The model's identity is external configuration; only the
//! shape — text in, `vector[768]` out — matters here.

use std::time::Duration;

use articlesmith_core::{Error, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::retry::{retry_transient, Attempt};

/// The fixed embedding width the rest of the workspace assumes.
pub const EMBEDDING_DIM: usize = 768;

/// Uniform surface over the embedding model. Implementations must be safe
/// for concurrent use — the gateway is a process-wide singleton.
#[async_trait]
pub trait EmbeddingGateway: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// HTTP-backed embedding gateway speaking a single `{"input": [...]}` →
/// `{"embeddings": [[...]]}` contract, with retry and a hard per-call
/// timeout.
pub struct HttpEmbeddingGateway {
    base_url: String,
    api_key: Option<String>,
    call_timeout: Duration,
    max_attempts: u32,
}

impl HttpEmbeddingGateway {
    #[must_use]
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        call_timeout: Duration,
        max_attempts: u32,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            api_key,
            call_timeout,
            max_attempts,
        }
    }

    fn client(&self) -> asupersync::http::h1::HttpClient {
        asupersync::http::h1::HttpClient::new()
    }

    async fn call_once(&self, inputs: &[String]) -> Attempt<Vec<Vec<f32>>, Error> {
        let url = format!("{}/embeddings", self.base_url.trim_end_matches('/'));
        let payload = json!({ "input": inputs });
        let body = match serde_json::to_vec(&payload) {
            Ok(b) => b,
            Err(e) => return Attempt::Permanent(Error::Schema(e.to_string())),
        };

        let mut headers = vec![("Content-Type".to_string(), "application/json".to_string())];
        if let Some(key) = &self.api_key {
            headers.push(("Authorization".to_string(), format!("Bearer {key}")));
        }

        let request = self
            .client()
            .request(asupersync::http::h1::Method::Post, &url, headers, body);
        let response = match tokio::time::timeout(self.call_timeout, request).await {
            Ok(Ok(resp)) => resp,
            Ok(Err(e)) => return Attempt::Transient(Error::Upstream(e.to_string())),
            Err(_) => return Attempt::Transient(Error::Timeout("embedding call".to_string())),
        };

        if response.status >= 500 || response.status == 429 {
            return Attempt::Transient(Error::Upstream(format!(
                "embedding gateway returned {}",
                response.status
            )));
        }
        if response.status != 200 {
            let body_text = String::from_utf8_lossy(&response.body).to_string();
            return Attempt::Permanent(Error::Upstream(format!(
                "embedding gateway returned {}: {body_text}",
                response.status
            )));
        }

        #[derive(Deserialize)]
        struct EmbeddingResponse {
            embeddings: Vec<Vec<f32>>,
        }

        match serde_json::from_slice::<EmbeddingResponse>(&response.body) {
            Ok(parsed) => Attempt::Ok(parsed.embeddings),
            Err(e) => Attempt::Permanent(Error::Schema(format!("embedding response: {e}"))),
        }
    }
}

#[async_trait]
impl EmbeddingGateway for HttpEmbeddingGateway {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_batch(std::slice::from_ref(&text.to_string())).await?;
        vectors.pop().ok_or_else(|| {
            Error::Schema("embedding gateway returned no vectors for a single input".to_string())
        })
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        retry_transient(self.max_attempts, Duration::from_millis(250), || {
            self.call_once(texts)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubEmbeddingGateway;

    #[async_trait]
    impl EmbeddingGateway for StubEmbeddingGateway {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            Ok(vec![text.len() as f32; EMBEDDING_DIM])
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            let mut out = Vec::with_capacity(texts.len());
            for text in texts {
                out.push(self.embed(text).await?);
            }
            Ok(out)
        }
    }

    #[tokio::test]
    async fn stub_embed_produces_fixed_width_vectors() {
        let gw = StubEmbeddingGateway;
        let vec = gw.embed("hello").await.unwrap();
        assert_eq!(vec.len(), EMBEDDING_DIM);
    }

    #[tokio::test]
    async fn stub_embed_batch_matches_single_calls() {
        let gw = StubEmbeddingGateway;
        let texts = vec!["a".to_string(), "bb".to_string()];
        let batch = gw.embed_batch(&texts).await.unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0], gw.embed("a").await.unwrap());
    }

    #[tokio::test]
    async fn empty_batch_short_circuits() {
        let gw = HttpEmbeddingGateway::new(
            "http://localhost:1",
            None,
            Duration::from_secs(1),
            1,
        );
        let result = gw.embed_batch(&[]).await.unwrap();
        assert!(result.is_empty());
    }
}
