//! Closing generator chain: brief + outline +
//! rulebook -> closing text.

use articlesmith_core::{Outline, Result, StructuredInput};
use articlesmith_gateway::{ChatMessage, ModelTier};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::chain::{Chain, JSON_ONLY_SYSTEM_PREAMBLE};
use crate::prompt::render;

#[derive(Debug, Clone)]
pub struct ClosingInput {
    pub structured_input: StructuredInput,
    pub outline: Outline,
    pub rulebook: String,
}

#[derive(Serialize)]
struct PromptCtx<'a> {
    theme: &'a str,
    goal: &'a str,
    section_titles: Vec<&'a str>,
    rulebook: &'a str,
}

const TEMPLATE: &str = r#"
次の記事の結びの文章を作成してください。

出力スキーマ:
{ "closing": "string" }

テーマ: {{ theme }}
目的: {{ goal }}
セクション見出し:
{% for title in section_titles %}- {{ title }}
{% endfor %}

文体ルールブック:
{{ rulebook }}
"#;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedClosing {
    pub closing: String,
}

/// Writes the article's closing paragraph.
pub struct ClosingGeneratorChain;

#[async_trait]
impl Chain for ClosingGeneratorChain {
    type Input = ClosingInput;
    type Output = GeneratedClosing;

    const TIER: ModelTier = ModelTier::High;
    const NAME: &'static str = "closing_generator";

    fn render_messages(&self, input: &Self::Input) -> Result<Vec<ChatMessage>> {
        let prompt = render(
            TEMPLATE,
            PromptCtx {
                theme: &input.structured_input.theme,
                goal: &input.structured_input.goal,
                section_titles: input.outline.sections.iter().map(|s| s.title.as_str()).collect(),
                rulebook: &input.rulebook,
            },
        )?;
        Ok(vec![
            ChatMessage::system(JSON_ONLY_SYSTEM_PREAMBLE),
            ChatMessage::user(prompt),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use articlesmith_core::{OutlineLevel, OutlineSection};

    #[test]
    fn renders_theme_and_goal() {
        let chain = ClosingGeneratorChain;
        let input = ClosingInput {
            structured_input: StructuredInput {
                theme: "カルチャー特集".to_string(),
                goal: "社風を伝える".to_string(),
                ..Default::default()
            },
            outline: Outline {
                sections: vec![OutlineSection {
                    level: OutlineLevel::H2,
                    title: "メンバーの声".to_string(),
                    content_summary: String::new(),
                    key_sources: vec![],
                    target_length: 300,
                }],
                total_target_length: 300,
            },
            rulebook: String::new(),
        };
        let messages = chain.render_messages(&input).unwrap();
        assert!(messages[1].content.contains("カルチャー特集"));
        assert!(messages[1].content.contains("社風を伝える"));
    }
}
