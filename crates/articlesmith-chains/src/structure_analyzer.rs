//! Structure analyzer chain: ordered reference
//! passage bodies -> [`StructureSummary`].

use articlesmith_core::{Result, StructureSummary};
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
以下は参考記事からの抜粋です。見出し・リード・結びの構成パターンを分析し、
次のJSONスキーマで出力してください。

出力スキーマ:
{ "heading_patterns": ["string", ...],
  "lead_patterns": ["string", ...],
  "closing_patterns": ["string", ...] }

参考抜粋:
{% for passage in passages %}---
{{ passage }}
{% endfor %}
"#;

/// Analyzes reference passages for document-structure patterns.
pub struct StructureAnalyzerChain;

#[async_trait]
impl Chain for StructureAnalyzerChain {
    type Input = Vec<String>;
    type Output = StructureSummary;

    const TIER: ModelTier = ModelTier::Lite;
    const NAME: &'static str = "structure_analyzer";

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
        let chain = StructureAnalyzerChain;
        let input = vec!["見出し1本文".to_string()];
        let messages = chain.render_messages(&input).unwrap();
        assert!(messages[1].content.contains("見出し1本文"));
    }
}
