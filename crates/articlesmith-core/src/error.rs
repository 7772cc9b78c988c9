//! Error taxonomy for the generation pipeline.
//!
//! Every variant maps to exactly one external taxonomy tag (`error_type`)
//! surfaced in `ErrorEvent.kind` (see [`crate::progress::ErrorEvent`]), and
//! to a recovery classification used by callers deciding whether a failure
//! should abort generation or degrade gracefully.

use thiserror::Error;

/// Result type alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the retrieval-and-generation pipeline.
#[derive(Debug, Error)]
pub enum Error {
    /// Transient LLM/embedding/reranker failure that survived retries.
    #[error("upstream model gateway failed: {0}")]
    Upstream(String),

    /// Model output did not match the parser/schema a chain expected.
    #[error("model output failed schema validation: {0}")]
    Schema(String),

    /// Document-store failure, or a fan-out retrieval task failed.
    #[error("retrieval failed: {0}")]
    Retrieval(String),

    /// Per-call or per-request timeout was exceeded.
    #[error("operation timed out: {0}")]
    Timeout(String),

    /// A history/draft lookup referenced an id that does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// An internal invariant was violated (e.g. more than one style
    /// profile observed for a category).
    #[error("invariant violation: {0}")]
    Invariant(String),

    /// The client cancelled the request (SSE stream closed, ctrl-c, etc).
    #[error("request cancelled")]
    Cancelled,

    /// Invalid argument supplied by the caller.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// The taxonomy tag for this error, used verbatim as `ErrorEvent.kind`.
    #[must_use]
    pub const fn error_type(&self) -> &'static str {
        match self {
            Self::Upstream(_) => "ErrUpstream",
            Self::Schema(_) => "ErrSchema",
            Self::Retrieval(_) => "ErrRetrieval",
            Self::Timeout(_) => "ErrTimeout",
            Self::NotFound(_) => "ErrNotFound",
            Self::Invariant(_) => "ErrInvariant",
            Self::Cancelled => "ErrCancelled",
            Self::InvalidArgument(_) => "ErrInvalidArgument",
            Self::Io(_) | Self::Serialization(_) | Self::Internal(_) => "ErrInternal",
        }
    }

    /// Whether the stage that raised this error should be treated as
    /// best-effort (log and continue) rather than aborting generation.
    ///
    /// Only the verification sub-stages (style check, hallucination
    /// detection, rewrite) degrade gracefully; everything else aborts.
    /// This flag is advisory — callers in `articlesmith-pipeline` decide
    /// per call-site which stages are verification sub-stages.
    #[must_use]
    pub const fn is_retryable_upstream(&self) -> bool {
        matches!(self, Self::Upstream(_) | Self::Timeout(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_type_mapping_is_exhaustive_over_taxonomy() {
        let cases: Vec<(Error, &str)> = vec![
            (Error::Upstream("x".into()), "ErrUpstream"),
            (Error::Schema("x".into()), "ErrSchema"),
            (Error::Retrieval("x".into()), "ErrRetrieval"),
            (Error::Timeout("x".into()), "ErrTimeout"),
            (Error::NotFound("x".into()), "ErrNotFound"),
            (Error::Invariant("x".into()), "ErrInvariant"),
            (Error::Cancelled, "ErrCancelled"),
            (Error::InvalidArgument("x".into()), "ErrInvalidArgument"),
            (Error::Internal("x".into()), "ErrInternal"),
        ];
        for (err, expected) in cases {
            assert_eq!(err.error_type(), expected, "for {err:?}");
        }
    }

    #[test]
    fn upstream_and_timeout_are_retryable_markers() {
        assert!(Error::Upstream("x".into()).is_retryable_upstream());
        assert!(Error::Timeout("x".into()).is_retryable_upstream());
        assert!(!Error::Schema("x".into()).is_retryable_upstream());
        assert!(!Error::Cancelled.is_retryable_upstream());
    }

    #[test]
    fn display_messages_are_non_empty() {
        let errs: Vec<Error> = vec![
            Error::Upstream(String::new()),
            Error::Schema(String::new()),
            Error::Retrieval(String::new()),
            Error::Timeout(String::new()),
            Error::NotFound(String::new()),
            Error::Invariant(String::new()),
            Error::Cancelled,
            Error::InvalidArgument(String::new()),
            Error::Internal(String::new()),
        ];
        for err in errs {
            assert!(!err.to_string().is_empty());
        }
    }
}
