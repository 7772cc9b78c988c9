//! Uniform gateways to the external embedding model, the two-tier LLM, and
//! the optional cross-encoder reranker.
//!
//! Nothing in this crate knows about prompts or article structure; it only
//! owns the network boundary: request shaping, deterministic JSON decoding,
//! timeouts, and the retry/backoff discipline shared by every upstream call.

pub mod embedding;
pub mod llm;
pub mod reranker;
pub mod retry;

pub use embedding::{EmbeddingGateway, HttpEmbeddingGateway};
pub use llm::{ChatMessage, ChatRole, HttpLlmGateway, LlmGateway, ModelTier};
pub use reranker::{HttpRerankerGateway, RerankedPassage, RerankerGateway};
pub use retry::{retry_transient, Attempt};
