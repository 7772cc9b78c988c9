//! Command-line entry point for the ArticleSmith generation pipeline.
//!
//! Wires concrete HTTP gateways and the Postgres-backed stores from
//! [`articlesmith_core::Config`] into an [`articlesmith_pipeline::Orchestrator`],
//! then dispatches one of the operations exposed on the command line.

#![forbid(unsafe_code)]

use std::env;
use std::process::ExitCode;
use std::sync::Arc;

use articlesmith_core::{ArticleType, Config, Result};
use articlesmith_gateway::{HttpEmbeddingGateway, HttpLlmGateway, HttpRerankerGateway};
use articlesmith_pipeline::Orchestrator;
use articlesmith_store::{connect, PgDocumentStore, PgHistoryStore};
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "articlesmith")]
#[command(version, about = "Recruiting-article generation pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full nine-stage pipeline and print the assembled Markdown.
    Generate {
        /// Raw input material (free text, interview notes, press-release draft, ...).
        #[arg(long)]
        input: String,

        /// Force a specific article category instead of letting the classifier decide.
        #[arg(long, value_enum)]
        category: Option<ArticleType>,

        /// Print each progress event to stderr as it is emitted.
        #[arg(long)]
        stream: bool,
    },

    /// Run C4's hybrid search directly and print the matching passages.
    Search {
        #[arg(long)]
        query: String,

        #[arg(long, value_enum)]
        category: ArticleType,

        #[arg(long, default_value_t = 10)]
        k: usize,
    },

    /// Run C8's style check and hallucination detector directly.
    Verify {
        #[arg(long)]
        draft_text: String,

        #[arg(long, value_enum)]
        category: ArticleType,
    },

    /// List past generations (most recent first).
    HistoryList {
        #[arg(long, default_value_t = 20)]
        limit: i64,

        #[arg(long, default_value_t = 0)]
        offset: i64,
    },

    /// Fetch one past generation's structured draft by id.
    HistoryGet {
        #[arg(long)]
        id: Uuid,
    },

    /// Delete one past generation by id.
    HistoryDelete {
        #[arg(long)]
        id: Uuid,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error[{}]: {err}", err.error_type());
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::from_env();
    let orchestrator = build_orchestrator(&config).await?;

    match cli.command {
        Commands::Generate { input, category, stream } => {
            if stream {
                let (tx, mut rx) = mpsc::channel(32);
                let request_id = Uuid::new_v4().to_string();
                let handle = tokio::spawn({
                    let orchestrator = orchestrator;
                    async move { orchestrator.generate_stream(input, category, request_id, tx).await }
                });
                while let Some(event) = rx.recv().await {
                    eprint!("{}", event.to_sse_text());
                }
                handle.await.map_err(|e| {
                    articlesmith_core::Error::Internal(format!("generate task panicked: {e}"))
                })??;
            } else {
                let draft = orchestrator.generate(input, category).await?;
                let markdown = articlesmith_pipeline::render_markdown(&draft);
                println!("{markdown}");
            }
        }
        Commands::Search { query, category, k } => {
            let passages = orchestrator.search(&query, category, k).await?;
            println!("{}", serde_json::to_string_pretty(&passages)?);
        }
        Commands::Verify { draft_text, category } => {
            let (style_check, hallucinations) = orchestrator.verify(&draft_text, category).await?;
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "style_check": style_check,
                    "hallucinations": hallucinations,
                }))?
            );
        }
        Commands::HistoryList { limit, offset } => {
            let summaries = orchestrator.history_list(limit, offset).await?;
            for summary in summaries {
                println!(
                    "{}\t{}\t{}\t{}字",
                    summary.id, summary.created_at, summary.theme, summary.actual_length
                );
            }
        }
        Commands::HistoryGet { id } => {
            let draft = orchestrator.history_get(id).await?;
            println!("{}", articlesmith_pipeline::render_markdown(&draft));
        }
        Commands::HistoryDelete { id } => {
            orchestrator.history_delete(id).await?;
        }
    }
    Ok(())
}

async fn build_orchestrator(config: &Config) -> Result<Orchestrator> {
    let embedding_gateway = Arc::new(HttpEmbeddingGateway::new(
        config.embedding_base_url.clone(),
        config.gateway_api_key.clone(),
        config.gateway_call_timeout,
        config.gateway_max_attempts,
    ));
    let llm_gateway = Arc::new(HttpLlmGateway::new(
        config.llm_base_url.clone(),
        config.gateway_api_key.clone(),
        env::var("AS_LLM_HIGH_MODEL").unwrap_or_else(|_| "high".to_string()),
        env::var("AS_LLM_LITE_MODEL").unwrap_or_else(|_| "lite".to_string()),
        config.gateway_call_timeout,
        config.gateway_max_attempts,
    ));
    let reranker = HttpRerankerGateway::try_new(
        config.reranker_base_url.clone(),
        config.gateway_api_key.clone(),
        config.gateway_call_timeout,
        config.gateway_max_attempts,
    )
    .map(|gw| Arc::new(gw) as Arc<dyn articlesmith_gateway::RerankerGateway>);

    let pool = connect(config).await?;
    let document_store = Arc::new(PgDocumentStore::new(pool.clone()));
    let history_store = Arc::new(PgHistoryStore::new(pool));

    Ok(Orchestrator::new(
        embedding_gateway,
        llm_gateway,
        reranker,
        document_store,
        history_store,
        config.clone(),
    ))
}
