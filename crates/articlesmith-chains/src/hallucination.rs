//! Hallucination detector chain: full draft
//! text + content passages -> [`HallucinationResult`].

use articlesmith_core::{Error, HallucinationResult, Passage, Result};
use articlesmith_gateway::{ChatMessage, ModelTier};
use async_trait::async_trait;
use serde::Serialize;

use crate::chain::{Chain, JSON_ONLY_SYSTEM_PREAMBLE};
use crate::prompt::render;

#[derive(Debug, Clone)]
pub struct HallucinationInput {
    pub draft_text: String,
    pub content_passages: Vec<Passage>,
}

#[derive(Serialize)]
struct PromptCtx<'a> {
    draft_text: &'a str,
    passages: Vec<&'a str>,
}

const TEMPLATE: &str = r#"
次の草稿に含まれる事実主張のうち、提供されたコンテンツのどこにも裏付けがないものを
すべて列挙してください。

出力スキーマ:
{ "unverified_claims": [{"claim": "string", "reason": "string", "suggested_tag": "string"}, ...],
  "confidence": number (0から1) }

草稿:
---
{{ draft_text }}
---

裏付けとして利用可能なコンテンツ:
{% for passage in passages %}---
{{ passage }}
{% endfor %}
"#;

/// Flags claims in the composed draft that no retrieved passage supports.
pub struct HallucinationDetectorChain;

#[async_trait]
impl Chain for HallucinationDetectorChain {
    type Input = HallucinationInput;
    type Output = HallucinationResult;

    const TIER: ModelTier = ModelTier::Lite;
    const NAME: &'static str = "hallucination_detector";

    fn render_messages(&self, input: &Self::Input) -> Result<Vec<ChatMessage>> {
        let prompt = render(
            TEMPLATE,
            PromptCtx {
                draft_text: &input.draft_text,
                passages: input.content_passages.iter().map(|p| p.body.as_str()).collect(),
            },
        )?;
        Ok(vec![
            ChatMessage::system(JSON_ONLY_SYSTEM_PREAMBLE),
            ChatMessage::user(prompt),
        ])
    }

    fn validate(&self, output: &Self::Output) -> Result<()> {
        if !(0.0..=1.0).contains(&output.confidence) {
            return Err(Error::Schema(format!(
                "hallucination_detector: confidence out of range: {}",
                output.confidence
            )));
        }
        Ok(())
    }
}
