//! Data model shared across the generation pipeline.
//!
//! Field names are kept stable across crate boundaries so every stage of
//! the pipeline reads and writes the same vocabulary.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::article_type::ArticleType;

/// Literal substring inserted immediately after a sentence whose factual
/// content is not supported by retrieved passages. `tag_count` on a
/// [`Draft`] counts occurrences of this prefix.
pub const UNVERIFIED_MARKER_PREFIX: &str = "[要確認:";

/// Build the literal marker for a given suggested tag, e.g. `創業年` ->
/// `[要確認: 創業年]`.
#[must_use]
pub fn unverified_marker(tag: &str) -> String {
    format!("{UNVERIFIED_MARKER_PREFIX} {tag}]")
}

/// Count non-overlapping occurrences of the unverified-claim marker.
#[must_use]
pub fn count_unverified_markers(text: &str) -> usize {
    text.matches(UNVERIFIED_MARKER_PREFIX).count()
}

// ---------------------------------------------------------------------------
// Corpus records (owned by the document store)
// ---------------------------------------------------------------------------

/// A content unit retrieved from the corpus.
///
/// Invariant: every passage has exactly one `category`. Passages are
/// inserted by the external ingester and never mutated afterward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Passage {
    pub id: i64,
    pub body: String,
    /// Freeform key/value attributes; after a rerank pass this also carries
    /// `"rerank_score_normalized"` (see [`crate::progress`] docs and
    /// `articlesmith-search`).
    pub attrs: BTreeMap<String, Value>,
    /// 768-dimensional embedding; `None` only while still being ingested.
    pub embedding: Option<Vec<f32>>,
    pub category: ArticleType,
    pub source: String,
    pub chunk_index: i32,
    pub total_chunks: i32,
    pub created_at: NaiveDateTime,
}

impl Passage {
    /// Attach (or replace) the normalized cross-encoder score produced by
    /// a rerank pass.
    pub fn set_rerank_score(&mut self, normalized_score: f64) {
        self.attrs.insert(
            "rerank_score_normalized".to_string(),
            Value::from(normalized_score),
        );
    }

    #[must_use]
    pub fn rerank_score(&self) -> Option<f64> {
        self.attrs.get("rerank_score_normalized").and_then(Value::as_f64)
    }
}

/// The kind of a [`StyleRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StyleKind {
    /// The single per-category rulebook.
    Profile,
    /// A style exemplar retrieved by theme similarity.
    Excerpt,
}

/// A style-corpus asset: either the single rulebook for a category, or one
/// of its style excerpts.
///
/// Invariant enforced by the store: at most one `Profile` record per
/// category; zero or more `Excerpt` records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StyleRecord {
    pub id: i64,
    pub category: ArticleType,
    pub kind: StyleKind,
    pub body: String,
    pub embedding: Option<Vec<f32>>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

// ---------------------------------------------------------------------------
// Per-request records (owned by the orchestrator for the request lifetime)
// ---------------------------------------------------------------------------

/// A single interview quote extracted from the raw input material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct InterviewQuote {
    pub speaker: String,
    pub quote: String,
}

/// The structured brief produced by the input-parser chain.
///
/// Immutable once produced. `desired_length` defaults to 2000 characters
/// when the raw material doesn't specify one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredInput {
    pub theme: String,
    #[serde(default)]
    pub audience: String,
    #[serde(default)]
    pub goal: String,
    #[serde(default = "default_desired_length")]
    pub desired_length: u32,
    #[serde(default)]
    pub key_points: Vec<String>,
    #[serde(default)]
    pub quotes: Vec<InterviewQuote>,
    #[serde(default)]
    pub data_facts: Vec<String>,
    /// 5-10 keywords driving hybrid-search query generation.
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub missing_info: Vec<String>,
}

const fn default_desired_length() -> u32 {
    2000
}

impl Default for StructuredInput {
    fn default() -> Self {
        Self {
            theme: String::new(),
            audience: String::new(),
            goal: String::new(),
            desired_length: default_desired_length(),
            key_points: Vec::new(),
            quotes: Vec::new(),
            data_facts: Vec::new(),
            keywords: Vec::new(),
            missing_info: Vec::new(),
        }
    }
}

/// Result of the Retrieve fan-out stage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetrievalBundle {
    /// Ordered, deduplicated content passages from the hybrid searcher.
    pub content_passages: Vec<Passage>,
    /// The category's style rulebook body; empty string if none exists.
    pub style_rulebook: String,
    /// Ordered style-excerpt bodies matching the theme.
    pub style_excerpts: Vec<String>,
}

/// Heading level for an outline section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutlineLevel {
    H2,
    H3,
}

impl OutlineLevel {
    #[must_use]
    pub const fn marker(self) -> &'static str {
        match self {
            Self::H2 => "##",
            Self::H3 => "###",
        }
    }
}

/// A single section spec produced by the outline-generator chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutlineSection {
    pub level: OutlineLevel,
    pub title: String,
    pub content_summary: String,
    /// Identifiers/descriptions of the sources this section should draw on.
    pub key_sources: Vec<String>,
    pub target_length: u32,
}

/// The outline driving the four content chains (title, lead, sections,
/// closing).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Outline {
    pub sections: Vec<OutlineSection>,
    pub total_target_length: u32,
}

/// One rendered `{heading, body}` pair in the final draft.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftSection {
    pub heading: String,
    pub body: String,
}

/// The final generated artifact.
///
/// Invariants:
/// - `actual_length == char count of lead + every section body + closing`
/// - `tag_count == count of unverified-marker occurrences across all text
///   fields`
/// - exactly 3 `titles`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Draft {
    pub titles: [String; 3],
    pub lead: String,
    pub sections: Vec<DraftSection>,
    pub closing: String,
    pub category: ArticleType,
    pub theme: String,
    pub desired_length: u32,
    pub actual_length: u32,
    pub tag_count: u32,
    /// In `[0, 1]`.
    pub consistency_score: f64,
    /// In `[0, 1]`.
    pub verification_confidence: f64,
}

impl Draft {
    /// Recompute `actual_length` and `tag_count` from the current text
    /// fields. Must be called after any mutation to the draft's text.
    pub fn recompute_derived_fields(&mut self) {
        let mut chars: usize = self.lead.chars().count() + self.closing.chars().count();
        let mut tags =
            count_unverified_markers(&self.lead) + count_unverified_markers(&self.closing);
        for section in &self.sections {
            chars += section.body.chars().count();
            tags += count_unverified_markers(&section.body);
        }
        for title in &self.titles {
            tags += count_unverified_markers(title);
        }
        self.actual_length = u32::try_from(chars).unwrap_or(u32::MAX);
        self.tag_count = u32::try_from(tags).unwrap_or(u32::MAX);
    }

    /// The full composed draft text used as input to the verification
    /// chains: `title[0] + lead + sections + closing`.
    ///
    /// Headings keep their `## `/`### ` markers verbatim: the auto-rewriter
    /// is reparsed against this same text, and the H2/H3 skeleton can only
    /// be recovered deterministically if the markers survive the round
    /// trip.
    #[must_use]
    pub fn compose_full_text(&self) -> String {
        let mut out = String::new();
        out.push_str(&self.titles[0]);
        out.push('\n');
        out.push_str(&self.lead);
        out.push('\n');
        for section in &self.sections {
            out.push_str(&section.heading);
            out.push('\n');
            out.push_str(&section.body);
            out.push('\n');
        }
        out.push_str(&self.closing);
        out
    }
}

// ---------------------------------------------------------------------------
// Chain I/O records — small typed records passed between the
// classifier/analyzer/verification chains and the orchestrator that drives
// them. Kept in this crate (rather than `articlesmith-chains`) since both
// `articlesmith-chains` and `articlesmith-pipeline` need to name them.
// ---------------------------------------------------------------------------

/// Output of the classifier chain: the chosen category plus its confidence.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub article_type: ArticleType,
    /// In `[0, 1]`.
    pub confidence: f64,
}

/// Output of the style-analyzer chain: a structured summary of the
/// reference corpus's prose style.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StyleSummary {
    pub sentence_endings: Vec<String>,
    pub tone: String,
    pub first_person: String,
    pub notable_phrases: Vec<String>,
}

/// Output of the structure-analyzer chain: a structured summary of the
/// reference corpus's document structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StructureSummary {
    pub heading_patterns: Vec<String>,
    pub lead_patterns: Vec<String>,
    pub closing_patterns: Vec<String>,
}

/// Severity of a single style-check issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueSeverity {
    Low,
    Medium,
    High,
}

/// One style-consistency issue found by the style-checker chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StyleIssue {
    pub location: String,
    pub description: String,
    pub severity: IssueSeverity,
}

/// A style checker's suggested fix for one excerpt of the draft.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrectedSection {
    pub original: String,
    pub corrected: String,
    pub reason: String,
}

/// Output of the style-checker chain.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StyleCheckResult {
    /// In `[0, 1]`.
    pub consistency_score: f64,
    pub issues: Vec<StyleIssue>,
    pub corrected_sections: Vec<CorrectedSection>,
}

/// One claim the hallucination detector judged unsupported by the
/// retrieved passages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnverifiedClaim {
    pub claim: String,
    pub reason: String,
    pub suggested_tag: String,
}

/// Output of the hallucination-detector chain.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HallucinationResult {
    pub unverified_claims: Vec<UnverifiedClaim>,
    /// In `[0, 1]`.
    pub confidence: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_draft() -> Draft {
        Draft {
            titles: ["T1".into(), "T2".into(), "T3".into()],
            lead: "lead text".into(),
            sections: vec![DraftSection {
                heading: "## 見出し".into(),
                body: "本文です".into(),
            }],
            closing: "closing".into(),
            category: ArticleType::Announcement,
            theme: "theme".into(),
            desired_length: 2000,
            actual_length: 0,
            tag_count: 0,
            consistency_score: 0.0,
            verification_confidence: 0.0,
        }
    }

    #[test]
    fn recompute_matches_sum_of_char_counts() {
        let mut d = sample_draft();
        d.recompute_derived_fields();
        let expected = d.lead.chars().count()
            + d.sections.iter().map(|s| s.body.chars().count()).sum::<usize>()
            + d.closing.chars().count();
        assert_eq!(d.actual_length as usize, expected);
    }

    #[test]
    fn tag_count_counts_marker_occurrences_across_fields() {
        let mut d = sample_draft();
        d.lead = format!("claim one{}", unverified_marker("創業年"));
        d.sections[0].body = format!("claim two{}", unverified_marker("人数"));
        d.recompute_derived_fields();
        assert_eq!(d.tag_count, 2);
    }

    #[test]
    fn desired_length_defaults_to_2000() {
        let input: StructuredInput = serde_json::from_str("{\"theme\": \"x\"}").unwrap();
        assert_eq!(input.desired_length, 2000);
    }

    #[test]
    fn marker_helper_produces_expected_literal() {
        assert_eq!(unverified_marker("創業年"), "[要確認: 創業年]");
        assert_eq!(count_unverified_markers("a[要確認: x]b[要確認: y]"), 2);
    }
}
