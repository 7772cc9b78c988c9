//! Section generator chain: one outline section
//! spec + content passages + rulebook -> `{heading, body}`.
//!
//! Run once per outline section, concurrently, capped at
//! `max_parallel_sections` — the cap itself is the
//! orchestrator's job, not this chain's.

use articlesmith_core::{DraftSection, OutlineSection, Passage, Result};
use articlesmith_gateway::{ChatMessage, ModelTier};
use async_trait::async_trait;
use serde::Serialize;

use crate::chain::{Chain, JSON_ONLY_SYSTEM_PREAMBLE};
use crate::prompt::render;

#[derive(Debug, Clone)]
pub struct SectionInput {
    pub section_spec: OutlineSection,
    pub content_passages: Vec<Passage>,
    pub rulebook: String,
}

#[derive(Serialize)]
struct PromptCtx<'a> {
    level_marker: &'a str,
    title: &'a str,
    content_summary: &'a str,
    target_length: u32,
    key_sources: &'a [String],
    passages: Vec<&'a str>,
    rulebook: &'a str,
}

const TEMPLATE: &str = r#"
次のセクション仕様に従い、本文を作成してください。本文は提供されたコンテンツの
範囲内の事実のみを使用し、憶測で事実を補わないでください。

出力スキーマ:
{ "heading": "string", "body": "string" }

見出しレベル: {{ level_marker }}
セクションタイトル: {{ title }}
内容要約: {{ content_summary }}
目標文字数: {{ target_length }}
参照すべきソース: {{ key_sources|join(", ") }}

利用可能なコンテンツ:
{% for passage in passages %}---
{{ passage }}
{% endfor %}

文体ルールブック:
{{ rulebook }}
"#;

/// Writes a single draft section. The body "must draw only on the
/// provided passages" — enforced upstream by the hallucination
/// detector, not by this chain.
pub struct SectionGeneratorChain;

#[async_trait]
impl Chain for SectionGeneratorChain {
    type Input = SectionInput;
    type Output = DraftSection;

    const TIER: ModelTier = ModelTier::High;
    const NAME: &'static str = "section_generator";

    fn render_messages(&self, input: &Self::Input) -> Result<Vec<ChatMessage>> {
        let prompt = render(
            TEMPLATE,
            PromptCtx {
                level_marker: input.section_spec.level.marker(),
                title: &input.section_spec.title,
                content_summary: &input.section_spec.content_summary,
                target_length: input.section_spec.target_length,
                key_sources: &input.section_spec.key_sources,
                passages: input.content_passages.iter().map(|p| p.body.as_str()).collect(),
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
    use articlesmith_core::{ArticleType, OutlineLevel};
    use chrono::NaiveDateTime;
    use std::collections::BTreeMap;

    fn sample_input() -> SectionInput {
        SectionInput {
            section_spec: OutlineSection {
                level: OutlineLevel::H2,
                title: "導入の背景".to_string(),
                content_summary: "背景を説明する".to_string(),
                key_sources: vec!["doc-1".to_string()],
                target_length: 300,
            },
            content_passages: vec![Passage {
                id: 1,
                body: "2025年に新サービスを開始".to_string(),
                attrs: BTreeMap::new(),
                embedding: None,
                category: ArticleType::Announcement,
                source: "doc-1".to_string(),
                chunk_index: 0,
                total_chunks: 1,
                created_at: NaiveDateTime::UNIX_EPOCH,
            }],
            rulebook: String::new(),
        }
    }

    #[test]
    fn renders_section_spec_and_passages() {
        let chain = SectionGeneratorChain;
        let messages = chain.render_messages(&sample_input()).unwrap();
        assert!(messages[1].content.contains("導入の背景"));
        assert!(messages[1].content.contains("2025年に新サービスを開始"));
        assert!(messages[1].content.contains("##"));
    }
}
