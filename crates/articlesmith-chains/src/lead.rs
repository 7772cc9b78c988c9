//! Lead generator chain: brief + outline +
//! rulebook + excerpts -> one lead paragraph, target 100-150 characters.

use articlesmith_core::{Outline, Result, StructuredInput};
use articlesmith_gateway::{ChatMessage, ModelTier};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::chain::{Chain, JSON_ONLY_SYSTEM_PREAMBLE};
use crate::prompt::render;

#[derive(Debug, Clone)]
pub struct LeadInput {
    pub structured_input: StructuredInput,
    pub outline: Outline,
    pub rulebook: String,
    pub excerpts: Vec<String>,
}

#[derive(Serialize)]
struct PromptCtx<'a> {
    theme: &'a str,
    audience: &'a str,
    goal: &'a str,
    section_titles: Vec<&'a str>,
    rulebook: &'a str,
    excerpts: &'a [String],
}

const TEMPLATE: &str = r#"
次の記事のリード文を1つ作成してください。目標は100から150文字です。

出力スキーマ:
{ "lead": "string" }

テーマ: {{ theme }}
対象読者: {{ audience }}
目的: {{ goal }}
セクション見出し:
{% for title in section_titles %}- {{ title }}
{% endfor %}

文体ルールブック:
{{ rulebook }}

文体抜粋:
{% for excerpt in excerpts %}- {{ excerpt }}
{% endfor %}
"#;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedLead {
    pub lead: String,
}

/// Writes the article's lead paragraph.
pub struct LeadGeneratorChain;

#[async_trait]
impl Chain for LeadGeneratorChain {
    type Input = LeadInput;
    type Output = GeneratedLead;

    const TIER: ModelTier = ModelTier::High;
    const NAME: &'static str = "lead_generator";

    fn render_messages(&self, input: &Self::Input) -> Result<Vec<ChatMessage>> {
        let prompt = render(
            TEMPLATE,
            PromptCtx {
                theme: &input.structured_input.theme,
                audience: &input.structured_input.audience,
                goal: &input.structured_input.goal,
                section_titles: input.outline.sections.iter().map(|s| s.title.as_str()).collect(),
                rulebook: &input.rulebook,
                excerpts: &input.excerpts,
            },
        )?;
        Ok(vec![
            ChatMessage::system(JSON_ONLY_SYSTEM_PREAMBLE),
            ChatMessage::user(prompt),
        ])
    }
}
