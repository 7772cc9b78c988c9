//! Verification & rewrite: style-consistency scoring, the conditional
//! rewrite sub-step, and hallucination tagging.
//!
//! Runs after Contents and before Assemble. All three sub-stages are
//! best-effort: a transient failure degrades to `consistency_score =
//! 0`/`confidence = 0`/no tags rather than aborting generation.

use articlesmith_chains::{
    should_rewrite, AutoRewriterChain, Chain, HallucinationDetectorChain, HallucinationInput,
    RewriteInput, StyleCheckInput, StyleCheckerChain,
};
use articlesmith_core::{
    unverified_marker, Draft, DraftSection, HallucinationResult, Passage, StyleCheckResult,
};
use articlesmith_gateway::{LlmGateway, ModelTier};

/// Run the style checker, degrading to a zero-score result on any error.
pub async fn check_style(
    gateway: &dyn LlmGateway,
    tier: ModelTier,
    draft_text: &str,
    rulebook: &str,
) -> StyleCheckResult {
    let chain = StyleCheckerChain;
    let input = StyleCheckInput {
        draft_text: draft_text.to_string(),
        rulebook: rulebook.to_string(),
    };
    chain.run(gateway, tier, input).await.unwrap_or_default()
}

/// Run the hallucination detector, degrading to an empty, zero-confidence
/// result on any error.
pub async fn detect_hallucinations(
    gateway: &dyn LlmGateway,
    tier: ModelTier,
    draft_text: &str,
    content_passages: &[Passage],
) -> HallucinationResult {
    let chain = HallucinationDetectorChain;
    let input = HallucinationInput {
        draft_text: draft_text.to_string(),
        content_passages: content_passages.to_vec(),
    };
    chain.run(gateway, tier, input).await.unwrap_or_default()
}

/// Run the auto rewriter and splice its output back into `draft`, if
/// `use_auto_rewrite` is on and the check warrants it.
///
/// On any rewriter failure the draft is left untouched — a failed rewrite
/// degrades to "no rewrite", never to aborting generation.
pub async fn maybe_rewrite(
    gateway: &dyn LlmGateway,
    tier: ModelTier,
    draft: &mut Draft,
    style_check: &StyleCheckResult,
    rulebook: &str,
    use_auto_rewrite: bool,
) {
    if !should_rewrite(use_auto_rewrite, style_check.consistency_score) {
        return;
    }
    let chain = AutoRewriterChain;
    let input = RewriteInput {
        draft_text: draft.compose_full_text(),
        style_check: style_check.clone(),
        rulebook: rulebook.to_string(),
    };
    if let Ok(rewritten) = chain.run(gateway, tier, input).await {
        splice_rewritten_text(draft, &rewritten.rewritten_text);
    }
}

/// Re-parse a rewritten composed text back into `draft`'s lead/sections,
/// preserving the original title list and closing unless the rewrite
/// supplies replacements for them.
///
/// The skeleton is recovered deterministically: line 1 is a candidate
/// title replacement; everything up to the first `## `/`### ` line is the
/// new lead; each heading line starts a new section running until the
/// next heading; whatever trails the last section is a candidate closing
/// replacement.
fn splice_rewritten_text(draft: &mut Draft, rewritten_text: &str) {
    let mut lines = rewritten_text.lines();

    let Some(title_line) = lines.next() else {
        return;
    };
    if !title_line.trim().is_empty() {
        draft.titles[0] = title_line.to_string();
    }

    let mut lead_lines = Vec::new();
    let mut sections: Vec<DraftSection> = Vec::new();
    let mut current_heading: Option<String> = None;
    let mut current_body: Vec<String> = Vec::new();

    for line in lines {
        if is_heading_line(line) {
            if let Some(heading) = current_heading.take() {
                sections.push(DraftSection {
                    heading,
                    body: current_body.join("\n").trim().to_string(),
                });
                current_body.clear();
            }
            current_heading = Some(line.to_string());
        } else if current_heading.is_some() {
            current_body.push(line.to_string());
        } else {
            lead_lines.push(line.to_string());
        }
    }

    if let Some(heading) = current_heading.take() {
        // The last heading's body runs to end of text; there is no
        // distinct marker for a trailing closing paragraph, so the
        // original closing is preserved.
        sections.push(DraftSection {
            heading,
            body: current_body.join("\n").trim().to_string(),
        });
    }

    if !lead_lines.is_empty() {
        let lead = lead_lines.join("\n").trim().to_string();
        if !lead.is_empty() {
            draft.lead = lead;
        }
    }
    if !sections.is_empty() {
        draft.sections = sections;
    }
}

fn is_heading_line(line: &str) -> bool {
    line.starts_with("## ") || line.starts_with("### ")
}

/// Insert `[要確認: <tag>]` at the end of the sentence containing each
/// verbatim occurrence of each unverified claim, across every text field
/// that contains it. Tagging the same claim twice inserts the marker only
/// once per sentence occurrence, never duplicating an already-tagged one.
pub fn tag_unverified_claims(draft: &mut Draft, hallucinations: &HallucinationResult) {
    for claim in &hallucinations.unverified_claims {
        let marker = unverified_marker(&claim.suggested_tag);
        for title in &mut draft.titles {
            *title = insert_marker_after_claim(title, &claim.claim, &marker);
        }
        draft.lead = insert_marker_after_claim(&draft.lead, &claim.claim, &marker);
        for section in &mut draft.sections {
            section.body = insert_marker_after_claim(&section.body, &claim.claim, &marker);
        }
        draft.closing = insert_marker_after_claim(&draft.closing, &claim.claim, &marker);
    }
    draft.recompute_derived_fields();
}

/// Find the sentence containing each occurrence of `claim` in `text` and
/// append `marker` to the end of that sentence, unless the sentence is
/// already immediately followed by `marker` (idempotent re-tagging: adds
/// the marker only once per sentence occurrence).
///
/// Sentence boundaries are the Japanese full stop `。`, a newline, or an
/// English period followed by whitespace; a claim with no boundary ahead
/// of it runs to the end of `text`.
fn insert_marker_after_claim(text: &str, claim: &str, marker: &str) -> String {
    if claim.is_empty() || !text.contains(claim) {
        return text.to_string();
    }

    let mut occurrence_starts = Vec::new();
    let mut search_from = 0;
    while let Some(pos) = text[search_from..].find(claim) {
        let start = search_from + pos;
        occurrence_starts.push(start);
        search_from = start + claim.len();
        if search_from > text.len() {
            break;
        }
    }

    let mut insertion_points: Vec<usize> = occurrence_starts
        .iter()
        .map(|&start| sentence_end_after(text, start + claim.len()))
        .collect();
    insertion_points.sort_unstable();
    insertion_points.dedup();

    let mut out = String::with_capacity(text.len() + marker.len() * insertion_points.len());
    let mut cursor = 0;
    for point in insertion_points {
        out.push_str(&text[cursor..point]);
        if !text[point..].starts_with(marker) {
            out.push_str(marker);
        }
        cursor = point;
    }
    out.push_str(&text[cursor..]);
    out
}

/// The byte offset of the end of the sentence that starts at or after
/// `from`: the position right after the first `。`, `\n`, or `. `
/// (period immediately followed by whitespace) found at or after `from`,
/// or `text.len()` if none is found.
fn sentence_end_after(text: &str, from: usize) -> usize {
    let mut chars = text[from..].char_indices().peekable();
    while let Some((offset, ch)) = chars.next() {
        let idx = from + offset;
        match ch {
            '。' | '\n' => return idx + ch.len_utf8(),
            '.' => {
                if let Some(&(_, next_ch)) = chars.peek() {
                    if next_ch.is_whitespace() {
                        return idx + ch.len_utf8();
                    }
                }
            }
            _ => {}
        }
    }
    text.len()
}
