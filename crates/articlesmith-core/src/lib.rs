//! Shared types, error taxonomy, and configuration for the ArticleSmith
//! recruiting-article generation pipeline.
//!
//! This crate owns nothing that talks to the network or a database; it is
//! the vocabulary every other crate in the workspace shares.

pub mod article_type;
pub mod config;
pub mod error;
pub mod models;
pub mod progress;

pub use article_type::ArticleType;
pub use config::{Config, FeatureFlags};
pub use error::{Error, Result};
pub use models::{
    count_unverified_markers, unverified_marker, ClassificationResult, CorrectedSection, Draft,
    DraftSection, HallucinationResult, InterviewQuote, IssueSeverity, Outline, OutlineLevel,
    OutlineSection, Passage, RetrievalBundle, StructureSummary, StructuredInput, StyleCheckResult,
    StyleIssue, StyleKind, StyleRecord, StyleSummary, UnverifiedClaim, UNVERIFIED_MARKER_PREFIX,
};
pub use progress::{CompleteEvent, ErrorEvent, ProgressEvent, Stage, StreamEvent};
