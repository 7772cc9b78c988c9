//! Process-wide configuration, assembled once from the environment at
//! startup and passed explicitly to the orchestrator.

use std::env;
use std::time::Duration;

/// Feature-flag set controlling optional pipeline behavior. Each flag is a
/// pure boolean switch the orchestrator consults at the relevant stage;
/// none of them change the shape of any type, only which code path a
/// stage takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureFlags {
    /// When true, all chains route to the `high` tier regardless of their
    /// declared tier (tier routing is disabled entirely).
    pub use_lite_model: bool,
    /// When false, the hybrid-search query is `keywords.join(" ")` instead
    /// of the query-generator chain's output.
    pub use_query_generator: bool,
    /// When false, `retrieve_profile`/`retrieve_excerpts` are skipped and
    /// the style/structure analyzer outputs are used alone.
    pub use_style_profile_kb: bool,
    /// When false, the Quality stage never invokes the rewriter even if
    /// `consistency_score < 0.8`.
    pub use_auto_rewrite: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            use_lite_model: false,
            use_query_generator: true,
            use_style_profile_kb: true,
            use_auto_rewrite: true,
        }
    }
}

impl FeatureFlags {
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            use_lite_model: env_bool("AS_USE_LITE_MODEL", defaults.use_lite_model),
            use_query_generator: env_bool("AS_USE_QUERY_GENERATOR", defaults.use_query_generator),
            use_style_profile_kb: env_bool(
                "AS_USE_STYLE_PROFILE_KB",
                defaults.use_style_profile_kb,
            ),
            use_auto_rewrite: env_bool("AS_USE_AUTO_REWRITE", defaults.use_auto_rewrite),
        }
    }
}

/// Process-wide configuration record.
///
/// Constructed once (`Config::from_env`) and shared (behind an `Arc`) by
/// every per-request orchestrator invocation; nothing in here is mutated
/// after construction.
#[derive(Debug, Clone)]
pub struct Config {
    // Database
    pub database_url: String,
    pub database_pool_size: u32,

    // Gateways
    pub embedding_base_url: String,
    pub llm_base_url: String,
    pub reranker_base_url: Option<String>,
    pub gateway_api_key: Option<String>,
    /// Hard per-call timeout.
    pub gateway_call_timeout: Duration,
    /// Max attempts for transient-error retry, including the first try.
    pub gateway_max_attempts: u32,

    // Hybrid search
    pub rrf_k: f64,
    pub hybrid_k_per_source: usize,
    pub hybrid_final_k: usize,
    pub reranker_top_k: usize,

    // Orchestrator
    /// Cap on concurrent outline-section generation.
    pub max_parallel_sections: usize,
    /// End-to-end per-request timeout.
    pub request_timeout: Duration,

    pub feature_flags: FeatureFlags,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "postgres://localhost/articlesmith".to_string(),
            database_pool_size: 10,
            embedding_base_url: "http://localhost:8081".to_string(),
            llm_base_url: "http://localhost:8082".to_string(),
            reranker_base_url: None,
            gateway_api_key: None,
            gateway_call_timeout: Duration::from_secs(60),
            gateway_max_attempts: 3,
            rrf_k: 60.0,
            hybrid_k_per_source: 30,
            hybrid_final_k: 10,
            reranker_top_k: 10,
            max_parallel_sections: 4,
            request_timeout: Duration::from_secs(600),
            feature_flags: FeatureFlags::default(),
        }
    }
}

impl Config {
    /// Load configuration from the process environment, falling back to
    /// [`Config::default`] for anything unset.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            database_url: env::var("AS_DATABASE_URL").unwrap_or(defaults.database_url),
            database_pool_size: env_u32("AS_DATABASE_POOL_SIZE", defaults.database_pool_size),
            embedding_base_url: env::var("AS_EMBEDDING_BASE_URL")
                .unwrap_or(defaults.embedding_base_url),
            llm_base_url: env::var("AS_LLM_BASE_URL").unwrap_or(defaults.llm_base_url),
            reranker_base_url: env::var("AS_RERANKER_BASE_URL").ok(),
            gateway_api_key: env::var("AS_GATEWAY_API_KEY").ok(),
            gateway_call_timeout: Duration::from_secs(env_u64(
                "AS_GATEWAY_CALL_TIMEOUT_SECS",
                defaults.gateway_call_timeout.as_secs(),
            )),
            gateway_max_attempts: env_u32(
                "AS_GATEWAY_MAX_ATTEMPTS",
                defaults.gateway_max_attempts,
            ),
            rrf_k: env_f64("AS_RRF_K", defaults.rrf_k),
            hybrid_k_per_source: env_usize(
                "AS_HYBRID_K_PER_SOURCE",
                defaults.hybrid_k_per_source,
            ),
            hybrid_final_k: env_usize("AS_HYBRID_FINAL_K", defaults.hybrid_final_k),
            reranker_top_k: env_usize("AS_RERANKER_TOP_K", defaults.reranker_top_k),
            max_parallel_sections: env_usize(
                "AS_MAX_PARALLEL_SECTIONS",
                defaults.max_parallel_sections,
            ),
            request_timeout: Duration::from_secs(env_u64(
                "AS_REQUEST_TIMEOUT_SECS",
                defaults.request_timeout.as_secs(),
            )),
            feature_flags: FeatureFlags::from_env(),
        }
    }
}

fn env_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .ok()
        .and_then(|v| match v.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        })
        .unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_f64(key: &str, default: f64) -> f64 {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}
