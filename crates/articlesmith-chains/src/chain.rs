//! The `Chain` abstraction: "a function from
//! a typed input record to a typed output record", composed by ordinary
//! value passing. No operator overloading, no metaclasses — one trait with
//! one method, implemented by each of the twelve chains in this crate.

use articlesmith_core::{Error, Result};
use articlesmith_gateway::{ChatMessage, LlmGateway, ModelTier};
use async_trait::async_trait;
use serde::de::DeserializeOwned;

/// A pure `(prompt_template, tier, parser)` triple.
///
/// `render_prompt` and `validate` are the only hooks an implementation
/// needs to provide beyond the declared tier/temperature; `run` wires them
/// to the gateway call and the schema-validation failure path: a model
/// response that doesn't match the declared output shape fails with
/// `ErrSchema`.
#[async_trait]
pub trait Chain: Send + Sync {
    type Input: Send + Sync;
    type Output: DeserializeOwned + Send;

    /// The model tier this chain is declared to use.
    /// Tier *routing* (whether this declaration is honored or overridden
    /// by `use_lite_model`) is the orchestrator's job, not the chain's.
    const TIER: ModelTier;

    /// Sampling temperature for this chain's calls.
    const TEMPERATURE: f64 = 0.3;

    /// Human-readable name used in error messages and tracing spans.
    const NAME: &'static str;

    /// Render the chat messages (system + user) for a given input.
    fn render_messages(&self, input: &Self::Input) -> Result<Vec<ChatMessage>>;

    /// Structural checks beyond what `serde` can express (e.g. "exactly
    /// three titles"). Default: no extra validation.
    fn validate(&self, _output: &Self::Output) -> Result<()> {
        Ok(())
    }

    /// Render, call, parse, and validate — the chain's only public
    /// operation.
    async fn run(&self, gateway: &dyn LlmGateway, tier: ModelTier, input: Self::Input) -> Result<Self::Output> {
        let messages = self.render_messages(&input)?;
        let value = gateway.chat(tier, Self::TEMPERATURE, &messages).await?;
        let output: Self::Output = serde_json::from_value(value)
            .map_err(|e| Error::Schema(format!("{}: {e}", Self::NAME)))?;
        self.validate(&output)?;
        Ok(output)
    }
}

/// Resolve a chain's effective tier against the `use_lite_model` flag.
#[must_use]
pub const fn effective_tier(declared: ModelTier, use_lite_model: bool) -> ModelTier {
    if use_lite_model {
        ModelTier::High
    } else {
        declared
    }
}

/// Shared system preamble every chain prepends to its rendered user
/// message, instructing the model to answer with JSON only.
pub const JSON_ONLY_SYSTEM_PREAMBLE: &str =
    "あなたは採用広報記事の作成を支援するアシスタントです。必ず指定されたJSONスキーマに \
     一致する有効なJSONオブジェクトのみを出力してください。説明文やMarkdownのコードフェンスは不要です。";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn use_lite_model_forces_high_regardless_of_declared_tier() {
        assert_eq!(effective_tier(ModelTier::Lite, true), ModelTier::High);
        assert_eq!(effective_tier(ModelTier::High, true), ModelTier::High);
    }

    #[test]
    fn declared_tier_is_honored_when_flag_is_off() {
        assert_eq!(effective_tier(ModelTier::Lite, false), ModelTier::Lite);
        assert_eq!(effective_tier(ModelTier::High, false), ModelTier::High);
    }
}
