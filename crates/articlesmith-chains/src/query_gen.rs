//! Query generator chain: `StructuredInput` +
//! category -> a whitespace-joined hybrid-search query string.

use articlesmith_core::{ArticleType, Error, Result, StructuredInput};
use articlesmith_gateway::{ChatMessage, ModelTier};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::chain::{Chain, JSON_ONLY_SYSTEM_PREAMBLE};
use crate::prompt::render;

#[derive(Serialize)]
struct PromptCtx<'a> {
    theme: &'a str,
    key_points: &'a [String],
    keywords: &'a [String],
    category: &'a str,
}

const TEMPLATE: &str = r#"
次の記事情報からハイブリッド検索用のクエリを生成してください。3から5個の概念を選び、
各概念を1から6トークンのキーワードで表現し、それらをすべて空白区切りの1つの文字列に
まとめてください。

出力スキーマ:
{ "query": "string (空白区切りのキーワード列)" }

カテゴリ: {{ category }}
テーマ: {{ theme }}
キーポイント:
{% for point in key_points %}- {{ point }}
{% endfor %}
既存キーワード: {{ keywords|join(", ") }}
"#;

/// Parsed output of the query-generator chain: a single whitespace-joined
/// query string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedQuery {
    pub query: String,
}

/// Input bundle for the query-generator chain.
#[derive(Debug, Clone)]
pub struct QueryGenInput {
    pub structured_input: StructuredInput,
    pub category: ArticleType,
}

/// Generates the hybrid-search query string from a structured brief.
pub struct QueryGeneratorChain;

#[async_trait]
impl Chain for QueryGeneratorChain {
    type Input = QueryGenInput;
    type Output = GeneratedQuery;

    const TIER: ModelTier = ModelTier::Lite;
    const NAME: &'static str = "query_generator";

    fn render_messages(&self, input: &Self::Input) -> Result<Vec<ChatMessage>> {
        let prompt = render(
            TEMPLATE,
            PromptCtx {
                theme: &input.structured_input.theme,
                key_points: &input.structured_input.key_points,
                keywords: &input.structured_input.keywords,
                category: input.category.as_str(),
            },
        )?;
        Ok(vec![
            ChatMessage::system(JSON_ONLY_SYSTEM_PREAMBLE),
            ChatMessage::user(prompt),
        ])
    }

    fn validate(&self, output: &Self::Output) -> Result<()> {
        if output.query.trim().is_empty() {
            return Err(Error::Schema("query_generator: empty query".to_string()));
        }
        Ok(())
    }
}

/// Fallback query construction used when `use_query_generator` is off
///: `" ".join(keywords)` from the structured input, with no
/// model call at all.
#[must_use]
pub fn keyword_join_fallback(structured_input: &StructuredInput) -> String {
    structured_input.keywords.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_category_and_theme_into_prompt() {
        let chain = QueryGeneratorChain;
        let input = QueryGenInput {
            structured_input: StructuredInput {
                theme: "新オフィス移転".to_string(),
                ..Default::default()
            },
            category: ArticleType::Announcement,
        };
        let messages = chain.render_messages(&input).unwrap();
        assert!(messages[1].content.contains("新オフィス移転"));
        assert!(messages[1].content.contains("ANNOUNCEMENT"));
    }

    #[test]
    fn validate_rejects_empty_query() {
        let chain = QueryGeneratorChain;
        assert!(chain
            .validate(&GeneratedQuery { query: String::new() })
            .is_err());
    }

    #[test]
    fn keyword_join_fallback_joins_with_single_space() {
        let input = StructuredInput {
            keywords: vec!["採用".to_string(), "エンジニア".to_string()],
            ..Default::default()
        };
        assert_eq!(keyword_join_fallback(&input), "採用 エンジニア");
    }
}
