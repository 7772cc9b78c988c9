//! Classifier chain: `StructuredInput` ->
//! `(ArticleType, confidence)`.

use articlesmith_core::{ClassificationResult, Error, Result, StructuredInput};
use articlesmith_gateway::{ChatMessage, ModelTier};
use async_trait::async_trait;
use serde::Serialize;

use crate::chain::{Chain, JSON_ONLY_SYSTEM_PREAMBLE};
use crate::prompt::render;

#[derive(Serialize)]
struct QuoteCtx<'a> {
    speaker: &'a str,
    quote: &'a str,
}

#[derive(Serialize)]
struct PromptCtx<'a> {
    theme: &'a str,
    audience: &'a str,
    goal: &'a str,
    key_points: &'a [String],
    quotes: Vec<QuoteCtx<'a>>,
}

const TEMPLATE: &str = r#"
次の構造化された記事の元情報を読み、記事のカテゴリを次の4種類のいずれかに分類して
ください: ANNOUNCEMENT（お知らせ・新サービス発表など）, EVENT_REPORT（イベント
レポート）, INTERVIEW（インタビュー）, CULTURE（カルチャー・ストーリー）。

出力スキーマ:
{ "article_type": "ANNOUNCEMENT" | "EVENT_REPORT" | "INTERVIEW" | "CULTURE",
  "confidence": number (0から1) }

テーマ: {{ theme }}
対象読者: {{ audience }}
目的: {{ goal }}
キーポイント:
{% for point in key_points %}- {{ point }}
{% endfor %}
引用:
{% for quote in quotes %}- {{ quote.speaker }}: {{ quote.quote }}
{% endfor %}
"#;

/// Classifies a [`StructuredInput`] into one of the four article categories.
pub struct ClassifierChain;

#[async_trait]
impl Chain for ClassifierChain {
    type Input = StructuredInput;
    type Output = ClassificationResult;

    const TIER: ModelTier = ModelTier::Lite;
    const NAME: &'static str = "classifier";

    fn render_messages(&self, input: &Self::Input) -> Result<Vec<ChatMessage>> {
        let prompt = render(
            TEMPLATE,
            PromptCtx {
                theme: &input.theme,
                audience: &input.audience,
                goal: &input.goal,
                key_points: &input.key_points,
                quotes: input
                    .quotes
                    .iter()
                    .map(|q| QuoteCtx {
                        speaker: &q.speaker,
                        quote: &q.quote,
                    })
                    .collect(),
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
                "classifier confidence out of range: {}",
                output.confidence
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use articlesmith_core::ArticleType;

    fn sample_input() -> StructuredInput {
        StructuredInput {
            theme: "新サービスのリリース".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn renders_theme_into_prompt() {
        let chain = ClassifierChain;
        let messages = chain.render_messages(&sample_input()).unwrap();
        assert!(messages[1].content.contains("新サービスのリリース"));
    }

    #[test]
    fn validate_rejects_out_of_range_confidence() {
        let chain = ClassifierChain;
        let result = ClassificationResult {
            article_type: ArticleType::Announcement,
            confidence: 1.5,
        };
        assert!(chain.validate(&result).is_err());
    }

    #[test]
    fn validate_accepts_in_range_confidence() {
        let chain = ClassifierChain;
        let result = ClassificationResult {
            article_type: ArticleType::Announcement,
            confidence: 0.8,
        };
        assert!(chain.validate(&result).is_ok());
    }
}
