//! Outline generator chain: the full retrieval +
//! analysis bundle -> [`Outline`].

use articlesmith_core::{Error, Outline, Passage, Result, StructureSummary, StructuredInput, StyleSummary};
use articlesmith_gateway::{ChatMessage, ModelTier};
use async_trait::async_trait;
use serde::Serialize;

use crate::chain::{Chain, JSON_ONLY_SYSTEM_PREAMBLE};
use crate::prompt::render;

/// Everything the outline chain needs: the brief, the two analyzer
/// summaries, the style rulebook and excerpts, and the content passages
/// retrieved for the request.
#[derive(Debug, Clone)]
pub struct OutlineInput {
    pub structured_input: StructuredInput,
    pub style_summary: StyleSummary,
    pub structure_summary: StructureSummary,
    pub rulebook: String,
    pub excerpts: Vec<String>,
    pub content_passages: Vec<Passage>,
}

#[derive(Serialize)]
struct PromptCtx<'a> {
    theme: &'a str,
    audience: &'a str,
    goal: &'a str,
    desired_length: u32,
    key_points: &'a [String],
    sentence_endings: &'a [String],
    tone: &'a str,
    notable_phrases: &'a [String],
    heading_patterns: &'a [String],
    lead_patterns: &'a [String],
    closing_patterns: &'a [String],
    rulebook: &'a str,
    excerpts: &'a [String],
    passages: Vec<&'a str>,
}

const TEMPLATE: &str = r#"
次の情報をもとに記事のアウトラインを設計してください。各セクションは見出しレベル
（H2またはH3）、タイトル、内容要約、参照すべきソースの一覧、目標文字数を持ちます。

出力スキーマ:
{ "sections": [{"level": "H2"|"H3", "title": "string", "content_summary": "string",
  "key_sources": ["string", ...], "target_length": number}, ...],
  "total_target_length": number }

テーマ: {{ theme }}
対象読者: {{ audience }}
目的: {{ goal }}
目標総文字数: {{ desired_length }}
キーポイント:
{% for point in key_points %}- {{ point }}
{% endfor %}

文体傾向: {{ tone }}
文末表現: {{ sentence_endings|join(", ") }}
特徴的な言い回し: {{ notable_phrases|join(", ") }}

見出しパターン: {{ heading_patterns|join(", ") }}
リードパターン: {{ lead_patterns|join(", ") }}
結びパターン: {{ closing_patterns|join(", ") }}

文体ルールブック:
{{ rulebook }}

文体抜粋:
{% for excerpt in excerpts %}- {{ excerpt }}
{% endfor %}

参照可能なコンテンツ:
{% for passage in passages %}---
{{ passage }}
{% endfor %}
"#;

/// Designs the section-by-section outline driving the four content chains.
pub struct OutlineGeneratorChain;

#[async_trait]
impl Chain for OutlineGeneratorChain {
    type Input = OutlineInput;
    type Output = Outline;

    const TIER: ModelTier = ModelTier::High;
    const NAME: &'static str = "outline_generator";

    fn render_messages(&self, input: &Self::Input) -> Result<Vec<ChatMessage>> {
        let prompt = render(
            TEMPLATE,
            PromptCtx {
                theme: &input.structured_input.theme,
                audience: &input.structured_input.audience,
                goal: &input.structured_input.goal,
                desired_length: input.structured_input.desired_length,
                key_points: &input.structured_input.key_points,
                sentence_endings: &input.style_summary.sentence_endings,
                tone: &input.style_summary.tone,
                notable_phrases: &input.style_summary.notable_phrases,
                heading_patterns: &input.structure_summary.heading_patterns,
                lead_patterns: &input.structure_summary.lead_patterns,
                closing_patterns: &input.structure_summary.closing_patterns,
                rulebook: &input.rulebook,
                excerpts: &input.excerpts,
                passages: input.content_passages.iter().map(|p| p.body.as_str()).collect(),
            },
        )?;
        Ok(vec![
            ChatMessage::system(JSON_ONLY_SYSTEM_PREAMBLE),
            ChatMessage::user(prompt),
        ])
    }

    fn validate(&self, output: &Self::Output) -> Result<()> {
        if output.sections.is_empty() {
            return Err(Error::Schema("outline_generator: no sections".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use articlesmith_core::ArticleType;
    use chrono::NaiveDateTime;
    use std::collections::BTreeMap;

    fn sample_passage() -> Passage {
        Passage {
            id: 1,
            body: "サンプル本文".to_string(),
            attrs: BTreeMap::new(),
            embedding: None,
            category: ArticleType::Announcement,
            source: "src".to_string(),
            chunk_index: 0,
            total_chunks: 1,
            created_at: NaiveDateTime::UNIX_EPOCH,
        }
    }

    fn sample_input() -> OutlineInput {
        OutlineInput {
            structured_input: StructuredInput {
                theme: "新サービスの発表".to_string(),
                ..Default::default()
            },
            style_summary: StyleSummary::default(),
            structure_summary: StructureSummary::default(),
            rulebook: "敬体で統一する".to_string(),
            excerpts: vec![],
            content_passages: vec![sample_passage()],
        }
    }

    #[test]
    fn renders_theme_and_passages_into_prompt() {
        let chain = OutlineGeneratorChain;
        let messages = chain.render_messages(&sample_input()).unwrap();
        assert!(messages[1].content.contains("新サービスの発表"));
        assert!(messages[1].content.contains("サンプル本文"));
    }

    #[test]
    fn validate_rejects_empty_section_list() {
        let chain = OutlineGeneratorChain;
        let outline = Outline { sections: vec![], total_target_length: 0 };
        assert!(chain.validate(&outline).is_err());
    }
}
