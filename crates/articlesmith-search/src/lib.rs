//! Hybrid lexical+vector search and the style-profile retriever.
//!
//! This crate owns the retrieval algorithms; it knows nothing about
//! prompts, chains, or the orchestrator above it.

pub mod hybrid;
pub mod rrf;
pub mod style;

pub use hybrid::{HybridSearchParams, HybridSearcher};
pub use rrf::{fuse, rrf_score, FusedScore, RankedHit, DEFAULT_RRF_K};
pub use style::StyleRetriever;
