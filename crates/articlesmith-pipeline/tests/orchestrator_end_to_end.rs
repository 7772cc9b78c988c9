//! End-to-end exercise of the nine-stage pipeline against scripted gateways
//! and in-memory stores, covering retrieval, fan-out content generation,
//! the rewrite-on-low-consistency path, and hallucination tagging in one
//! run.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use articlesmith_core::{ArticleType, Config, StreamEvent};
use articlesmith_gateway::{ChatMessage, EmbeddingGateway, LlmGateway, ModelTier};
use articlesmith_pipeline::Orchestrator;
use articlesmith_store::fakes::{FakeDocumentStore, FakeHistoryStore};
use articlesmith_store::{DocumentStore, StyleKind, StyleRecord};
use articlesmith_core::Passage;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde_json::Value;
use tokio::sync::mpsc;

struct FakeEmbeddingGateway;

#[async_trait]
impl EmbeddingGateway for FakeEmbeddingGateway {
    async fn embed(&self, _text: &str) -> articlesmith_core::Result<Vec<f32>> {
        Ok(vec![1.0, 0.0, 0.0, 0.0])
    }

    async fn embed_batch(&self, texts: &[String]) -> articlesmith_core::Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }
}

/// Routes each chat call to a canned response keyed on a distinctive
/// substring of that chain's prompt template, standing in for the twelve
/// real model calls a live run would make.
struct ScriptedLlmGateway;

fn section_title(prompt: &str) -> String {
    prompt
        .lines()
        .find_map(|line| line.strip_prefix("セクションタイトル: "))
        .unwrap_or("セクション")
        .trim()
        .to_string()
}

#[async_trait]
impl LlmGateway for ScriptedLlmGateway {
    async fn chat(
        &self,
        _tier: ModelTier,
        _temperature: f64,
        messages: &[ChatMessage],
    ) -> articlesmith_core::Result<Value> {
        let prompt = &messages[1].content;

        let value = if prompt.contains("記事作成に必要な情報を") {
            serde_json::json!({
                "theme": "新オフィス移転",
                "audience": "転職潜在層",
                "goal": "認知拡大",
                "desired_length": 1200,
                "key_points": ["広いワークスペース", "駅近の立地"],
                "quotes": [],
                "data_facts": [],
                "keywords": ["オフィス移転", "働き方"],
                "missing_info": []
            })
        } else if prompt.contains("記事のカテゴリを次の4種類") {
            serde_json::json!({ "article_type": "ANNOUNCEMENT", "confidence": 0.92 })
        } else if prompt.contains("ハイブリッド検索用のクエリ") {
            serde_json::json!({ "query": "オフィス移転 働き方" })
        } else if prompt.contains("文体を分析し") {
            serde_json::json!({
                "sentence_endings": ["です", "ます"],
                "tone": "丁寧",
                "first_person": "当社",
                "notable_phrases": ["新たな一歩"]
            })
        } else if prompt.contains("見出し・リード・結びの構成パターン") {
            serde_json::json!({
                "heading_patterns": ["背景", "詳細"],
                "lead_patterns": ["結論から述べる"],
                "closing_patterns": ["今後の展望"]
            })
        } else if prompt.contains("記事のアウトラインを設計") {
            serde_json::json!({
                "sections": [
                    {
                        "level": "H2",
                        "title": "移転の背景",
                        "content_summary": "移転に至った背景を説明する",
                        "key_sources": ["doc-1"],
                        "target_length": 300
                    },
                    {
                        "level": "H2",
                        "title": "新オフィスの特徴",
                        "content_summary": "新オフィスの特徴を説明する",
                        "key_sources": ["doc-1"],
                        "target_length": 300
                    }
                ],
                "total_target_length": 600
            })
        } else if prompt.contains("候補タイトルをちょうど3つ") {
            serde_json::json!({ "titles": ["タイトル案A", "タイトル案B", "タイトル案C"] })
        } else if prompt.contains("リード文を1つ作成") {
            serde_json::json!({ "lead": "このたび、当社は新オフィスへ移転しました。" })
        } else if prompt.contains("セクション仕様に従い") {
            let title = section_title(prompt);
            serde_json::json!({
                "heading": format!("## {title}"),
                "body": format!("{title}についての本文です。"),
            })
        } else if prompt.contains("結びの文章を作成") {
            serde_json::json!({ "closing": "引き続き当社の成長にご期待ください。" })
        } else if prompt.contains("文体ルールブックにどれだけ一致") {
            serde_json::json!({ "consistency_score": 0.72, "issues": [], "corrected_sections": [] })
        } else if prompt.contains("書き直してください") {
            serde_json::json!({
                "rewritten_text": "新しいタイトル案\n\
新しいリード文です。\n\
## 移転の背景\n\
移転の背景についての本文です。2019年に創業しました。\n\
## 新オフィスの特徴\n\
新オフィスの特徴についての本文です。"
            })
        } else if prompt.contains("事実主張のうち") {
            serde_json::json!({
                "unverified_claims": [{
                    "claim": "2019年に創業しました",
                    "reason": "no supporting passage contains this date",
                    "suggested_tag": "創業年"
                }],
                "confidence": 0.4
            })
        } else {
            panic!("unscripted prompt reached ScriptedLlmGateway: {prompt}");
        };
        Ok(value)
    }
}

fn sample_passage(id: i64, body: &str) -> Passage {
    Passage {
        id,
        body: body.to_string(),
        attrs: BTreeMap::new(),
        embedding: Some(vec![1.0, 0.0, 0.0, 0.0]),
        category: ArticleType::Announcement,
        source: format!("doc-{id}"),
        chunk_index: 0,
        total_chunks: 1,
        created_at: NaiveDateTime::UNIX_EPOCH,
    }
}

#[tokio::test]
async fn full_pipeline_runs_rewrite_and_tags_the_seeded_hallucination() {
    let document_store = FakeDocumentStore::default();
    document_store.passages.lock().unwrap().push(sample_passage(
        1,
        "当社は2025年にオフィス移転を行い、働き方を一新しました。",
    ));
    document_store.passages.lock().unwrap().push(sample_passage(
        2,
        "新しいオフィスは駅近で、広いワークスペースを備えています。",
    ));
    document_store.style_records.lock().unwrap().push(StyleRecord {
        id: 1,
        category: ArticleType::Announcement,
        kind: StyleKind::Profile,
        body: "文末は敬体（です・ます）で統一する。".to_string(),
        embedding: None,
        created_at: NaiveDateTime::UNIX_EPOCH,
        updated_at: NaiveDateTime::UNIX_EPOCH,
    });
    let document_store: Arc<dyn DocumentStore> = Arc::new(document_store);

    let orchestrator = Orchestrator::new(
        Arc::new(FakeEmbeddingGateway),
        Arc::new(ScriptedLlmGateway),
        None,
        document_store,
        Arc::new(FakeHistoryStore::default()),
        Config::default(),
    );

    let draft = orchestrator
        .generate("新オフィスへの移転についてのお知らせ記事を書いてください。".to_string(), None)
        .await
        .expect("pipeline run should succeed against scripted gateways");

    assert_eq!(draft.category, ArticleType::Announcement);
    assert_eq!(draft.titles[0], "新しいタイトル案");
    assert_eq!(draft.lead, "新しいリード文です。");
    assert_eq!(draft.sections.len(), 2);
    assert!((draft.consistency_score - 0.72).abs() < 1e-9);
    assert!((draft.verification_confidence - 0.4).abs() < 1e-9);

    let markdown = articlesmith_pipeline::render_markdown(&draft);
    assert!(markdown.contains("[要確認: 創業年]"));
    assert!(markdown.contains("記事カテゴリ: アナウンスメント"));
    assert!(markdown.contains("文体一貫性スコア: 72%"));
    assert!(markdown.contains("事実検証信頼度: 40%"));
}

#[tokio::test]
async fn search_exposes_c4_directly_against_the_seeded_corpus() {
    let document_store = FakeDocumentStore::default();
    document_store
        .passages
        .lock()
        .unwrap()
        .push(sample_passage(1, "オフィス移転に関する参考記事本文。"));
    let document_store: Arc<dyn DocumentStore> = Arc::new(document_store);

    let orchestrator = Orchestrator::new(
        Arc::new(FakeEmbeddingGateway),
        Arc::new(ScriptedLlmGateway),
        None,
        document_store,
        Arc::new(FakeHistoryStore::default()),
        Config::default(),
    );

    let passages = orchestrator
        .search("オフィス移転", ArticleType::Announcement, 5)
        .await
        .unwrap();
    assert_eq!(passages.len(), 1);
    assert_eq!(passages[0].id, 1);
}

/// A gateway whose `chat` always fails schema validation, standing in for a
/// malformed model response so the Parse stage aborts immediately.
struct AlwaysSchemaFailureLlmGateway;

#[async_trait]
impl LlmGateway for AlwaysSchemaFailureLlmGateway {
    async fn chat(
        &self,
        _tier: ModelTier,
        _temperature: f64,
        _messages: &[ChatMessage],
    ) -> articlesmith_core::Result<Value> {
        Err(articlesmith_core::Error::Schema("not valid JSON".to_string()))
    }
}

#[tokio::test]
async fn a_hard_stage_failure_emits_a_final_error_event_and_no_complete_event() {
    let document_store: Arc<dyn DocumentStore> = Arc::new(FakeDocumentStore::default());
    let orchestrator = Orchestrator::new(
        Arc::new(FakeEmbeddingGateway),
        Arc::new(AlwaysSchemaFailureLlmGateway),
        None,
        document_store,
        Arc::new(FakeHistoryStore::default()),
        Config::default(),
    );

    let (tx, mut rx) = mpsc::channel(16);
    let result = orchestrator
        .generate_stream("何か入力".to_string(), None, "req-err".to_string(), tx)
        .await;
    assert!(result.is_err());

    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    let last = events.last().expect("at least one event should have been emitted");
    match last {
        StreamEvent::Error(e) => assert_eq!(e.kind, "ErrSchema"),
        other => panic!("expected a final error event, got {other:?}"),
    }
    assert!(!events.iter().any(|e| matches!(e, StreamEvent::Complete(_))));
}

/// Stands in for a model call that would otherwise take part in a
/// cancelled request: the test asserts this is never reached.
struct PanicsIfCalledLlmGateway;

#[async_trait]
impl LlmGateway for PanicsIfCalledLlmGateway {
    async fn chat(
        &self,
        _tier: ModelTier,
        _temperature: f64,
        _messages: &[ChatMessage],
    ) -> articlesmith_core::Result<Value> {
        panic!("gateway must not be called once the client has disconnected");
    }
}

#[tokio::test]
async fn dropping_the_progress_receiver_cancels_before_any_gateway_call() {
    let document_store: Arc<dyn DocumentStore> = Arc::new(FakeDocumentStore::default());
    let orchestrator = Orchestrator::new(
        Arc::new(FakeEmbeddingGateway),
        Arc::new(PanicsIfCalledLlmGateway),
        None,
        document_store,
        Arc::new(FakeHistoryStore::default()),
        Config::default(),
    );

    let (tx, rx) = mpsc::channel(16);
    drop(rx);
    let result = orchestrator
        .generate_stream("何か入力".to_string(), None, "req-cancel".to_string(), tx)
        .await;
    assert!(matches!(result, Err(articlesmith_core::Error::Cancelled)));
}

/// Always succeeds, but slowly enough to blow through a tiny configured
/// end-to-end request timeout.
struct SlowLlmGateway;

#[async_trait]
impl LlmGateway for SlowLlmGateway {
    async fn chat(
        &self,
        _tier: ModelTier,
        _temperature: f64,
        _messages: &[ChatMessage],
    ) -> articlesmith_core::Result<Value> {
        tokio::time::sleep(Duration::from_millis(50)).await;
        Ok(serde_json::json!({
            "theme": "x", "audience": "", "goal": "", "desired_length": 2000,
            "key_points": [], "quotes": [], "data_facts": [], "keywords": ["x"],
            "missing_info": []
        }))
    }
}

#[tokio::test]
async fn exceeding_the_request_timeout_surfaces_errtimeout_and_a_final_error_event() {
    let document_store: Arc<dyn DocumentStore> = Arc::new(FakeDocumentStore::default());
    let mut config = Config::default();
    config.request_timeout = Duration::from_millis(1);
    let orchestrator = Orchestrator::new(
        Arc::new(FakeEmbeddingGateway),
        Arc::new(SlowLlmGateway),
        None,
        document_store,
        Arc::new(FakeHistoryStore::default()),
        config,
    );

    let (tx, mut rx) = mpsc::channel(16);
    let result = orchestrator
        .generate_stream("何か入力".to_string(), None, "req-timeout".to_string(), tx)
        .await;
    assert!(matches!(result, Err(articlesmith_core::Error::Timeout(_))));

    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    let last = events.last().expect("at least one event should have been emitted");
    match last {
        StreamEvent::Error(e) => assert_eq!(e.kind, "ErrTimeout"),
        other => panic!("expected a final error event, got {other:?}"),
    }
}
