//! Title generator chain: brief + outline +
//! rulebook -> exactly three candidate titles.

use articlesmith_core::{Error, Outline, Result, StructuredInput};
use articlesmith_gateway::{ChatMessage, ModelTier};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::chain::{Chain, JSON_ONLY_SYSTEM_PREAMBLE};
use crate::prompt::render;

/// The title chain's own record: `Outline` provides the structured
/// skeleton, the brief provides theme/audience/goal.
#[derive(Debug, Clone)]
pub struct TitleInput {
    pub structured_input: StructuredInput,
    pub outline: Outline,
    pub rulebook: String,
}

#[derive(Serialize)]
struct PromptCtx<'a> {
    theme: &'a str,
    audience: &'a str,
    goal: &'a str,
    section_titles: Vec<&'a str>,
    rulebook: &'a str,
}

const TEMPLATE: &str = r#"
次の記事の候補タイトルをちょうど3つ提案してください。

出力スキーマ:
{ "titles": ["string", "string", "string"] }

テーマ: {{ theme }}
対象読者: {{ audience }}
目的: {{ goal }}
セクション見出し:
{% for title in section_titles %}- {{ title }}
{% endfor %}

文体ルールブック:
{{ rulebook }}
"#;

/// Raw parsed output before the exactly-three-titles check is applied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedTitles {
    pub titles: Vec<String>,
}

/// Proposes three candidate titles for the draft.
pub struct TitleGeneratorChain;

#[async_trait]
impl Chain for TitleGeneratorChain {
    type Input = TitleInput;
    type Output = GeneratedTitles;

    const TIER: ModelTier = ModelTier::High;
    const NAME: &'static str = "title_generator";

    fn render_messages(&self, input: &Self::Input) -> Result<Vec<ChatMessage>> {
        let prompt = render(
            TEMPLATE,
            PromptCtx {
                theme: &input.structured_input.theme,
                audience: &input.structured_input.audience,
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

    fn validate(&self, output: &Self::Output) -> Result<()> {
        if output.titles.len() != 3 {
            return Err(Error::Schema(format!(
                "title_generator: expected exactly 3 titles, got {}",
                output.titles.len()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use articlesmith_core::OutlineLevel;
    use articlesmith_core::OutlineSection;

    fn sample_input() -> TitleInput {
        TitleInput {
            structured_input: StructuredInput {
                theme: "新オフィス開設".to_string(),
                ..Default::default()
            },
            outline: Outline {
                sections: vec![OutlineSection {
                    level: OutlineLevel::H2,
                    title: "背景".to_string(),
                    content_summary: String::new(),
                    key_sources: vec![],
                    target_length: 400,
                }],
                total_target_length: 400,
            },
            rulebook: String::new(),
        }
    }

    #[test]
    fn renders_theme_and_section_titles() {
        let chain = TitleGeneratorChain;
        let messages = chain.render_messages(&sample_input()).unwrap();
        assert!(messages[1].content.contains("新オフィス開設"));
        assert!(messages[1].content.contains("背景"));
    }

    #[test]
    fn validate_rejects_wrong_title_count() {
        let chain = TitleGeneratorChain;
        let too_few = GeneratedTitles { titles: vec!["A".into(), "B".into()] };
        assert!(chain.validate(&too_few).is_err());
        let just_right = GeneratedTitles {
            titles: vec!["A".into(), "B".into(), "C".into()],
        };
        assert!(chain.validate(&just_right).is_ok());
    }
}
