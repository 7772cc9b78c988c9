//! Style checker chain: full draft text +
//! rulebook -> [`StyleCheckResult`].

use articlesmith_core::{Error, Result, StyleCheckResult};
use articlesmith_gateway::{ChatMessage, ModelTier};
use async_trait::async_trait;
use serde::Serialize;

use crate::chain::{Chain, JSON_ONLY_SYSTEM_PREAMBLE};
use crate::prompt::render;

#[derive(Debug, Clone)]
pub struct StyleCheckInput {
    pub draft_text: String,
    pub rulebook: String,
}

#[derive(Serialize)]
struct PromptCtx<'a> {
    draft_text: &'a str,
    rulebook: &'a str,
}

const TEMPLATE: &str = r#"
次の草稿が文体ルールブックにどれだけ一致しているか採点してください。

出力スキーマ:
{ "consistency_score": number (0から1),
  "issues": [{"location": "string", "description": "string", "severity": "low"|"medium"|"high"}, ...],
  "corrected_sections": [{"original": "string", "corrected": "string", "reason": "string"}, ...] }

文体ルールブック:
{{ rulebook }}

草稿:
---
{{ draft_text }}
---
"#;

/// Scores a composed draft against the category's style rulebook.
pub struct StyleCheckerChain;

#[async_trait]
impl Chain for StyleCheckerChain {
    type Input = StyleCheckInput;
    type Output = StyleCheckResult;

    const TIER: ModelTier = ModelTier::Lite;
    const NAME: &'static str = "style_checker";

    fn render_messages(&self, input: &Self::Input) -> Result<Vec<ChatMessage>> {
        let prompt = render(
            TEMPLATE,
            PromptCtx {
                draft_text: &input.draft_text,
                rulebook: &input.rulebook,
            },
        )?;
        Ok(vec![
            ChatMessage::system(JSON_ONLY_SYSTEM_PREAMBLE),
            ChatMessage::user(prompt),
        ])
    }

    fn validate(&self, output: &Self::Output) -> Result<()> {
        if !(0.0..=1.0).contains(&output.consistency_score) {
            return Err(Error::Schema(format!(
                "style_checker: consistency_score out of range: {}",
                output.consistency_score
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_draft_and_rulebook() {
        let chain = StyleCheckerChain;
        let input = StyleCheckInput {
            draft_text: "見出し\n本文です。".to_string(),
            rulebook: "敬体で統一".to_string(),
        };
        let messages = chain.render_messages(&input).unwrap();
        assert!(messages[1].content.contains("本文です。"));
        assert!(messages[1].content.contains("敬体で統一"));
    }

    #[test]
    fn validate_rejects_out_of_range_score() {
        let chain = StyleCheckerChain;
        let mut result = StyleCheckResult::default();
        result.consistency_score = 1.2;
        assert!(chain.validate(&result).is_err());
    }
}
