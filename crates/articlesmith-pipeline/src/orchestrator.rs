//! Pipeline orchestrator: drives the nine-stage state machine, fans
//! out retrieval and content generation, emits progress events, and
//! enforces tier routing and feature flags.

use std::sync::Arc;

use articlesmith_chains::{
    effective_tier, keyword_join_fallback, Chain, ClassifierChain, ClosingGeneratorChain,
    ClosingInput, GeneratedQuery, InputParserChain, LeadGeneratorChain, LeadInput,
    OutlineGeneratorChain, OutlineInput, QueryGenInput, QueryGeneratorChain, SectionGeneratorChain,
    SectionInput, StyleAnalyzerChain, StructureAnalyzerChain, TitleGeneratorChain, TitleInput,
};
use articlesmith_chains::{AutoRewriterChain, HallucinationDetectorChain, StyleCheckerChain};
use articlesmith_core::{
    ArticleType, ClassificationResult, CompleteEvent, Config, Draft, DraftSection, Error,
    ErrorEvent, HallucinationResult, Outline, Passage, ProgressEvent, Result, RetrievalBundle,
    Stage, StreamEvent, StructuredInput, StyleCheckResult,
};
use articlesmith_gateway::{EmbeddingGateway, LlmGateway, ModelTier, RerankerGateway};
use articlesmith_search::{HybridSearchParams, HybridSearcher, StyleRetriever};
use articlesmith_store::{DocumentStore, HistoryStore};
use tokio::sync::{mpsc, Semaphore};
use tracing::warn;
use uuid::Uuid;

use crate::assembler;
use crate::verify;

/// The process-wide singletons a request-scoped [`Orchestrator::generate_stream`]
/// call draws on.
pub struct Orchestrator {
    embedding_gateway: Arc<dyn EmbeddingGateway>,
    llm_gateway: Arc<dyn LlmGateway>,
    reranker: Option<Arc<dyn RerankerGateway>>,
    document_store: Arc<dyn DocumentStore>,
    history_store: Arc<dyn HistoryStore>,
    hybrid_searcher: HybridSearcher,
    style_retriever: StyleRetriever,
    config: Config,
}

impl Orchestrator {
    #[must_use]
    pub fn new(
        embedding_gateway: Arc<dyn EmbeddingGateway>,
        llm_gateway: Arc<dyn LlmGateway>,
        reranker: Option<Arc<dyn RerankerGateway>>,
        document_store: Arc<dyn DocumentStore>,
        history_store: Arc<dyn HistoryStore>,
        config: Config,
    ) -> Self {
        let hybrid_searcher = HybridSearcher::new(
            embedding_gateway.clone(),
            document_store.clone(),
            reranker.clone(),
            config.reranker_top_k,
        );
        let style_retriever = StyleRetriever::new(
            embedding_gateway.clone(),
            document_store.clone(),
            reranker.clone(),
        );
        Self {
            embedding_gateway,
            llm_gateway,
            reranker,
            document_store,
            history_store,
            hybrid_searcher,
            style_retriever,
            config,
        }
    }

    fn tier_for<C: Chain>(&self) -> ModelTier {
        effective_tier(C::TIER, self.config.feature_flags.use_lite_model)
    }

    async fn run_chain<C: Chain>(&self, chain: C, input: C::Input) -> Result<C::Output> {
        let tier = self.tier_for::<C>();
        chain.run(self.llm_gateway.as_ref(), tier, input).await
    }

    async fn emit(&self, events: &mpsc::Sender<StreamEvent>, stage: Stage, request_id: &str) {
        let _ = events
            .send(StreamEvent::Progress(ProgressEvent::for_stage(stage, request_id, None)))
            .await;
    }

    /// A dropped receiver means the client disconnected (SSE stream
    /// closed). There is nothing left to stream progress to, so the
    /// pipeline stops doing further gateway work rather than running the
    /// remaining stages to completion unobserved.
    fn check_cancelled(events: &mpsc::Sender<StreamEvent>) -> Result<()> {
        if events.is_closed() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Run the full nine-stage pipeline for one request, streaming
    /// progress over `events` and returning the assembled [`Draft`].
    ///
    /// Any hard stage failure emits a final `error` event carrying the
    /// taxonomy tag before
    /// the error is propagated to the caller; verification sub-stages never
    /// fail this call, so no `error` event originates there.
    ///
    /// A client disconnect (the progress receiver dropped) is observed at
    /// the next stage boundary and surfaces as `ErrCancelled`; exceeding
    /// the configured end-to-end request timeout surfaces as `ErrTimeout`.
    /// Neither emits a `complete` event, and a cancellation emits no final
    /// `error` event either, since the channel is by definition no longer
    /// writable.
    ///
    /// # Errors
    /// Propagates the first hard failure from any non-verification stage.
    pub async fn generate_stream(
        &self,
        input_material: String,
        requested_type: Option<ArticleType>,
        request_id: String,
        events: mpsc::Sender<StreamEvent>,
    ) -> Result<Draft> {
        let run = self.run_stages(input_material, requested_type, request_id, events.clone());
        let outcome = match tokio::time::timeout(self.config.request_timeout, run).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout("request exceeded end-to-end timeout".to_string())),
        };
        match outcome {
            Ok(draft) => Ok(draft),
            Err(err) => {
                let _ = events
                    .send(StreamEvent::Error(ErrorEvent {
                        kind: err.error_type().to_string(),
                        message: err.to_string(),
                    }))
                    .await;
                Err(err)
            }
        }
    }

    async fn run_stages(
        &self,
        input_material: String,
        requested_type: Option<ArticleType>,
        request_id: String,
        events: mpsc::Sender<StreamEvent>,
    ) -> Result<Draft> {
        let flags = self.config.feature_flags;

        self.emit(&events, Stage::InputParse, &request_id).await;
        Self::check_cancelled(&events)?;
        let structured: StructuredInput =
            self.run_chain(InputParserChain, input_material.clone()).await?;

        self.emit(&events, Stage::Classify, &request_id).await;
        Self::check_cancelled(&events)?;
        let classification: ClassificationResult =
            self.run_chain(ClassifierChain, structured.clone()).await?;
        let category = resolve_category(requested_type, classification);

        self.emit(&events, Stage::QueryGen, &request_id).await;
        Self::check_cancelled(&events)?;
        let query = if flags.use_query_generator {
            let generated: GeneratedQuery = self
                .run_chain(
                    QueryGeneratorChain,
                    QueryGenInput { structured_input: structured.clone(), category },
                )
                .await?;
            generated.query
        } else {
            keyword_join_fallback(&structured)
        };

        self.emit(&events, Stage::Retrieve, &request_id).await;
        Self::check_cancelled(&events)?;
        let bundle = self.retrieve(&query, &structured.theme, category, flags.use_style_profile_kb).await?;

        self.emit(&events, Stage::Analyze, &request_id).await;
        Self::check_cancelled(&events)?;
        let bodies: Vec<String> = bundle.content_passages.iter().map(|p| p.body.clone()).collect();
        let (style_summary, structure_summary) = tokio::try_join!(
            self.run_chain(StyleAnalyzerChain, bodies.clone()),
            self.run_chain(StructureAnalyzerChain, bodies.clone()),
        )?;

        self.emit(&events, Stage::Outline, &request_id).await;
        Self::check_cancelled(&events)?;
        let outline: Outline = self
            .run_chain(
                OutlineGeneratorChain,
                OutlineInput {
                    structured_input: structured.clone(),
                    style_summary,
                    structure_summary,
                    rulebook: bundle.style_rulebook.clone(),
                    excerpts: bundle.style_excerpts.clone(),
                    content_passages: bundle.content_passages.clone(),
                },
            )
            .await?;

        self.emit(&events, Stage::Contents, &request_id).await;
        Self::check_cancelled(&events)?;
        let (titles, lead, sections, closing) =
            self.generate_contents(&structured, &outline, &bundle).await?;

        let mut draft = Draft {
            titles,
            lead,
            sections,
            closing,
            category,
            theme: structured.theme.clone(),
            desired_length: structured.desired_length,
            actual_length: 0,
            tag_count: 0,
            consistency_score: 0.0,
            verification_confidence: 0.0,
        };

        self.emit(&events, Stage::Quality, &request_id).await;
        Self::check_cancelled(&events)?;
        self.run_quality(&mut draft, &bundle, flags.use_auto_rewrite).await;

        self.emit(&events, Stage::Assemble, &request_id).await;
        Self::check_cancelled(&events)?;
        let markdown = assembler::assemble(&mut draft);

        let draft_id = match self
            .history_store
            .save(&input_material, category, &draft, &markdown)
            .await
        {
            Ok(id) => id,
            Err(err) => {
                warn!(error = %err, "history store write failed; response is unaffected");
                Uuid::new_v4()
            }
        };

        let _ = events
            .send(StreamEvent::Complete(CompleteEvent { markdown, draft_id: draft_id.to_string() }))
            .await;

        Ok(draft)
    }

    /// Convenience synchronous wrapper over [`Self::generate_stream`] that
    /// discards progress events and returns only the final [`Draft`].
    pub async fn generate(
        &self,
        input_material: String,
        requested_type: Option<ArticleType>,
    ) -> Result<Draft> {
        let (tx, mut rx) = mpsc::channel(16);
        let request_id = Uuid::new_v4().to_string();
        tokio::spawn(async move { while rx.recv().await.is_some() {} });
        self.generate_stream(input_material, requested_type, request_id, tx).await
    }

    /// Exposes the hybrid searcher directly, outside a full generation run.
    pub async fn search(&self, query: &str, category: ArticleType, k: usize) -> Result<Vec<Passage>> {
        self.hybrid_searcher
            .search(
                query,
                category,
                HybridSearchParams {
                    k_per_source: self.config.hybrid_k_per_source,
                    final_k: k,
                    rrf_k: self.config.rrf_k,
                },
            )
            .await
    }

    /// Exposes the style-check and hallucination-detection sub-operations
    /// directly, against the category's rulebook and the supplied draft text.
    pub async fn verify(
        &self,
        draft_text: &str,
        category: ArticleType,
    ) -> Result<(StyleCheckResult, HallucinationResult)> {
        let rulebook = self.style_retriever.retrieve_profile(category).await?;
        let style_tier = self.tier_for::<StyleCheckerChain>();
        let hallucination_tier = self.tier_for::<HallucinationDetectorChain>();
        let style_check =
            verify::check_style(self.llm_gateway.as_ref(), style_tier, draft_text, &rulebook).await;
        let hallucinations =
            verify::detect_hallucinations(self.llm_gateway.as_ref(), hallucination_tier, draft_text, &[])
                .await;
        Ok((style_check, hallucinations))
    }

    pub async fn history_list(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<articlesmith_store::DraftSummary>> {
        self.history_store.list(limit, offset).await
    }

    pub async fn history_get(&self, id: Uuid) -> Result<Draft> {
        self.history_store.get(id).await
    }

    pub async fn history_delete(&self, id: Uuid) -> Result<()> {
        self.history_store.delete(id).await
    }

    /// Retrieve stage: three concurrent tasks joined into a
    /// [`RetrievalBundle`]. When `use_style_profile_kb` is off, the style
    /// sub-tasks are skipped entirely rather than run and discarded.
    async fn retrieve(
        &self,
        query: &str,
        theme: &str,
        category: ArticleType,
        use_style_profile_kb: bool,
    ) -> Result<RetrievalBundle> {
        let params = HybridSearchParams {
            k_per_source: self.config.hybrid_k_per_source,
            final_k: self.config.hybrid_final_k,
            rrf_k: self.config.rrf_k,
        };
        if !use_style_profile_kb {
            let content_passages = self.hybrid_searcher.search(query, category, params).await?;
            return Ok(RetrievalBundle { content_passages, style_rulebook: String::new(), style_excerpts: vec![] });
        }
        let (content_passages, style_rulebook, style_excerpts) = tokio::try_join!(
            self.hybrid_searcher.search(query, category, params),
            self.style_retriever.retrieve_profile(category),
            self.style_retriever.retrieve_excerpts(theme, category, self.config.reranker_top_k),
        )?;
        Ok(RetrievalBundle { content_passages, style_rulebook, style_excerpts })
    }

    /// Contents stage: title, lead, sections (one subtask per
    /// outline section, capped at `max_parallel_sections`), and closing
    /// all run concurrently. Any section failure fails the whole stage.
    async fn generate_contents(
        &self,
        structured: &StructuredInput,
        outline: &Outline,
        bundle: &RetrievalBundle,
    ) -> Result<([String; 3], String, Vec<DraftSection>, String)> {
        let title_fut = self.run_chain(
            TitleGeneratorChain,
            TitleInput {
                structured_input: structured.clone(),
                outline: outline.clone(),
                rulebook: bundle.style_rulebook.clone(),
            },
        );
        let lead_fut = self.run_chain(
            LeadGeneratorChain,
            LeadInput {
                structured_input: structured.clone(),
                outline: outline.clone(),
                rulebook: bundle.style_rulebook.clone(),
                excerpts: bundle.style_excerpts.clone(),
            },
        );
        let closing_fut = self.run_chain(
            ClosingGeneratorChain,
            ClosingInput {
                structured_input: structured.clone(),
                outline: outline.clone(),
                rulebook: bundle.style_rulebook.clone(),
            },
        );

        let semaphore = Arc::new(Semaphore::new(self.config.max_parallel_sections.max(1)));
        let section_futs = outline.sections.iter().enumerate().map(move |(idx, spec)| {
            let semaphore = semaphore.clone();
            let rulebook = bundle.style_rulebook.clone();
            let content_passages = bundle.content_passages.clone();
            let spec = spec.clone();
            async move {
                let _permit = semaphore
                    .acquire()
                    .await
                    .map_err(|e| Error::Internal(format!("section semaphore closed: {e}")))?;
                let section: DraftSection = self
                    .run_chain(SectionGeneratorChain, SectionInput {
                        section_spec: spec,
                        content_passages,
                        rulebook,
                    })
                    .await?;
                Ok::<(usize, DraftSection), Error>((idx, section))
            }
        });
        let sections_fut = futures::future::try_join_all(section_futs);

        let (title_result, lead_result, closing_result, mut indexed_sections) =
            tokio::try_join!(title_fut, lead_fut, closing_fut, sections_fut)?;

        if title_result.titles.len() != 3 {
            return Err(Error::Schema(format!(
                "title_generator: expected exactly 3 titles, got {}",
                title_result.titles.len()
            )));
        }
        indexed_sections.sort_by_key(|(idx, _)| *idx);
        let sections = indexed_sections.into_iter().map(|(_, s)| s).collect();
        let titles = [
            title_result.titles[0].clone(),
            title_result.titles[1].clone(),
            title_result.titles[2].clone(),
        ];
        Ok((titles, lead_result.lead, sections, closing_result.closing))
    }

    /// Quality stage: style check, conditional rewrite,
    /// hallucination tagging. Never fails the request.
    async fn run_quality(&self, draft: &mut Draft, bundle: &RetrievalBundle, use_auto_rewrite: bool) {
        let style_tier = self.tier_for::<StyleCheckerChain>();
        let rewrite_tier = self.tier_for::<AutoRewriterChain>();
        let hallucination_tier = self.tier_for::<HallucinationDetectorChain>();

        let draft_text = draft.compose_full_text();
        let style_check = verify::check_style(
            self.llm_gateway.as_ref(),
            style_tier,
            &draft_text,
            &bundle.style_rulebook,
        )
        .await;

        verify::maybe_rewrite(
            self.llm_gateway.as_ref(),
            rewrite_tier,
            draft,
            &style_check,
            &bundle.style_rulebook,
            use_auto_rewrite,
        )
        .await;

        let draft_text = draft.compose_full_text();
        let hallucinations = verify::detect_hallucinations(
            self.llm_gateway.as_ref(),
            hallucination_tier,
            &draft_text,
            &bundle.content_passages,
        )
        .await;
        verify::tag_unverified_claims(draft, &hallucinations);

        draft.consistency_score = style_check.consistency_score;
        draft.verification_confidence = hallucinations.confidence;
    }
}

/// The category-resolution rule: an explicit, non-auto
/// request always wins unless it disagrees with the classifier and the
/// classifier's own confidence is below 0.5, in which case the classifier
/// output is used instead (see DESIGN.md for the Open-Question writeup).
fn resolve_category(requested: Option<ArticleType>, classification: ClassificationResult) -> ArticleType {
    match requested {
        None => classification.article_type,
        Some(requested_category) => {
            if requested_category != classification.article_type && classification.confidence < 0.5 {
                classification.article_type
            } else {
                requested_category
            }
        }
    }
}
