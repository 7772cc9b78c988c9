//! Postgres-backed document store and history store.
//!
//! Owns the only SQL in the workspace: the `documents`/`style_profiles`
//! schema with its vector and trigram indexes, and the append-only
//! `generated_articles` history table. Everything above this crate talks to
//! [`DocumentStore`]/[`HistoryStore`] traits, never to `sqlx` directly.

pub mod document_store;
pub mod history_store;
pub mod pool;
pub mod schema;

#[cfg(any(test, feature = "test-support"))]
pub mod fakes;

pub use document_store::{DocumentStore, PgDocumentStore, DEFAULT_MIN_TRIGRAM_SIMILARITY};
pub use history_store::{DraftSummary, HistoryStore, PgHistoryStore};
pub use pool::connect;
