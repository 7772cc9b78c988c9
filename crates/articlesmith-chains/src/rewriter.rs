//! Auto rewriter chain: full draft text +
//! style-check result + rulebook -> rewritten draft text.
//!
//! Invoked only when `use_auto_rewrite` is on and `consistency_score < 0.8`
//! (strict inequality: exactly `0.8` does not trigger a rewrite).
//! Re-parsing the H2/H3 skeleton out of the rewritten text back into
//! `Draft` fields is the orchestrator's job, not this chain's.

use articlesmith_core::{Error, Result, StyleCheckResult};
use articlesmith_gateway::{ChatMessage, ModelTier};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::chain::{Chain, JSON_ONLY_SYSTEM_PREAMBLE};
use crate::prompt::render;

#[derive(Debug, Clone)]
pub struct RewriteInput {
    pub draft_text: String,
    pub style_check: StyleCheckResult,
    pub rulebook: String,
}

#[derive(Serialize)]
struct IssueCtx<'a> {
    location: &'a str,
    description: &'a str,
}

#[derive(Serialize)]
struct PromptCtx<'a> {
    draft_text: &'a str,
    rulebook: &'a str,
    issues: Vec<IssueCtx<'a>>,
}

const TEMPLATE: &str = r#"
次の草稿を文体ルールブックと指摘事項に従って書き直してください。事実関係は一切
変更せず、見出しレベル（## / ###）の構成もそのまま維持してください。

出力スキーマ:
{ "rewritten_text": "string" }

文体ルールブック:
{{ rulebook }}

指摘事項:
{% for issue in issues %}- {{ issue.location }}: {{ issue.description }}
{% endfor %}

元の草稿:
---
{{ draft_text }}
---
"#;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewrittenDraft {
    pub rewritten_text: String,
}

/// Rewrites the composed draft text toward the style rulebook while
/// preserving facts and the heading skeleton.
pub struct AutoRewriterChain;

#[async_trait]
impl Chain for AutoRewriterChain {
    type Input = RewriteInput;
    type Output = RewrittenDraft;

    const TIER: ModelTier = ModelTier::High;
    const NAME: &'static str = "auto_rewriter";

    fn render_messages(&self, input: &Self::Input) -> Result<Vec<ChatMessage>> {
        let prompt = render(
            TEMPLATE,
            PromptCtx {
                draft_text: &input.draft_text,
                rulebook: &input.rulebook,
                issues: input
                    .style_check
                    .issues
                    .iter()
                    .map(|i| IssueCtx {
                        location: &i.location,
                        description: &i.description,
                    })
                    .collect(),
            },
        )?;
        Ok(vec![
            ChatMessage::system(JSON_ONLY_SYSTEM_PREAMBLE),
            ChatMessage::user(prompt),
        ])
    }

    fn validate(&self, output: &Self::Output) -> Result<()> {
        if output.rewritten_text.trim().is_empty() {
            return Err(Error::Schema("auto_rewriter: empty rewritten text".to_string()));
        }
        Ok(())
    }
}

/// Whether the rewrite sub-step runs at all.
#[must_use]
pub fn should_rewrite(use_auto_rewrite: bool, consistency_score: f64) -> bool {
    use_auto_rewrite && consistency_score < 0.8
}

#[cfg(test)]
mod tests {
    use super::*;
    use articlesmith_core::{IssueSeverity, StyleIssue};

    #[test]
    fn should_rewrite_is_strict_less_than() {
        assert!(!should_rewrite(true, 0.8));
        assert!(should_rewrite(true, 0.79));
        assert!(!should_rewrite(false, 0.1));
    }

    #[test]
    fn renders_issues_into_prompt() {
        let chain = AutoRewriterChain;
        let input = RewriteInput {
            draft_text: "## 見出し\n本文".to_string(),
            style_check: StyleCheckResult {
                consistency_score: 0.5,
                issues: vec![StyleIssue {
                    location: "lead".to_string(),
                    description: "敬体でない".to_string(),
                    severity: IssueSeverity::Medium,
                }],
                corrected_sections: vec![],
            },
            rulebook: String::new(),
        };
        let messages = chain.render_messages(&input).unwrap();
        assert!(messages[1].content.contains("敬体でない"));
    }
}
