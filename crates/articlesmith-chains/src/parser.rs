//! Input parser chain: raw material text ->
//! [`StructuredInput`].

use articlesmith_core::{Result, StructuredInput};
use articlesmith_gateway::{ChatMessage, ModelTier};
use async_trait::async_trait;
use serde::Serialize;

use crate::chain::{Chain, JSON_ONLY_SYSTEM_PREAMBLE};
use crate::prompt::render;

#[derive(Serialize)]
struct PromptCtx<'a> {
    raw_material: &'a str,
}

const TEMPLATE: &str = r#"
以下は採用広報記事の元になる素材テキストです。この内容から記事作成に必要な情報を
抽出し、次のJSONスキーマで出力してください。

スキーマ:
{
  "theme": "string (短い一文)",
  "audience": "string (空文字列可)",
  "goal": "string (空文字列可)",
  "desired_length": "number (素材に記載がなければ2000)",
  "key_points": ["string", ...],
  "quotes": [{"speaker": "string", "quote": "string"}, ...],
  "data_facts": ["string", ...],
  "keywords": ["string", ...] (5から10個),
  "missing_info": ["string", ...]
}

素材テキスト:
---
{{ raw_material }}
---
"#;

/// Parses free-form input material into a [`StructuredInput`] brief.
pub struct InputParserChain;

#[async_trait]
impl Chain for InputParserChain {
    type Input = String;
    type Output = StructuredInput;

    const TIER: ModelTier = ModelTier::Lite;
    const NAME: &'static str = "input_parser";

    fn render_messages(&self, input: &Self::Input) -> Result<Vec<ChatMessage>> {
        let prompt = render(TEMPLATE, PromptCtx { raw_material: input })?;
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
    fn renders_raw_material_into_prompt_body() {
        let chain = InputParserChain;
        let messages = chain.render_messages(&"テスト素材".to_string()).unwrap();
        assert_eq!(messages.len(), 2);
        assert!(messages[1].content.contains("テスト素材"));
    }
}
