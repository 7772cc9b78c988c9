//! Style analyzer chain: ordered reference
//! passage bodies -> [`StyleSummary`].

use articlesmith_core::{Result, StyleSummary};
use articlesmith_gateway::{ChatMessage, ModelTier};
use async_trait::async_trait;
use serde::Serialize;

use crate::chain::{Chain, JSON_ONLY_SYSTEM_PREAMBLE};
use crate::prompt::render;

#[derive(Serialize)]
struct PromptCtx<'a> {
    passages: &'a [String],
}

const TEMPLATE: &str = r#"
以下は参考記事からの抜粋です。文体を分析し、次のJSONスキーマで出力してください。

出力スキーマ:
{ "sentence_endings": ["string", ...],
  "tone": "string",
  "first_person": "string",
  "notable_phrases": ["string", ...] }

参考抜粋:
{% for passage in passages %}---
{{ passage }}
{% endfor %}
"#;

/// Analyzes reference passages for sentence-level style signals.
pub struct StyleAnalyzerChain;

#[async_trait]
impl Chain for StyleAnalyzerChain {
    type Input = Vec<String>;
    type Output = StyleSummary;

    const TIER: ModelTier = ModelTier::Lite;
    const NAME: &'static str = "style_analyzer";

    fn render_messages(&self, input: &Self::Input) -> Result<Vec<ChatMessage>> {
        let prompt = render(TEMPLATE, PromptCtx { passages: input })?;
        Ok(vec![
            ChatMessage::system(JSON_ONLY_SYSTEM_PREAMBLE),
            ChatMessage::user(prompt),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_each_passage_into_prompt() {
        let chain = StyleAnalyzerChain;
        let input = vec!["本文その一".to_string(), "本文その二".to_string()];
        let messages = chain.render_messages(&input).unwrap();
        assert!(messages[1].content.contains("本文その一"));
        assert!(messages[1].content.contains("本文その二"));
    }
}
