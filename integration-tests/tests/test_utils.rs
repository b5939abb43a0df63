use std::sync::Arc;

use common::{
    storage::{
        db::SurrealDbClient,
        types::{
            graph_edge::{EdgeKind, EdgeProvenance, GraphEdge},
            graph_node::GraphNode,
            wiki_document::WikiDocument,
        },
    },
    utils::embedding::EmbeddingProvider,
};
use hybrid_retrieval::{
    HybridSearchService, KeywordConfig, KeywordExtractor, RetrievalTuning,
};
use lexical_index::{LexicalIndexCache, Segmenter};
use tempfile::TempDir;
use uuid::Uuid;

pub const EMBEDDING_DIM: usize = 16;

static TRACING: std::sync::Once = std::sync::Once::new();

// RUST_LOG=debug cargo test -p integration-tests shows pipeline internals.
fn init_tracing() {
    TRACING.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// Everything one end-to-end scenario needs, with the snapshot directory kept
/// alive for the duration of the test.
pub struct TestHarness {
    pub db: Arc<SurrealDbClient>,
    pub embedder: Arc<EmbeddingProvider>,
    pub index: Arc<LexicalIndexCache>,
    pub service: HybridSearchService,
    _snapshot_dir: TempDir,
}

pub async fn setup_harness() -> TestHarness {
    setup_harness_with_tuning(RetrievalTuning::default()).await
}

pub async fn setup_harness_with_tuning(tuning: RetrievalTuning) -> TestHarness {
    init_tracing();

    let db = Arc::new(
        SurrealDbClient::memory("integration_ns", &Uuid::new_v4().to_string())
            .await
            .expect("Failed to start in-memory surrealdb"),
    );
    db.define_indexes(EMBEDDING_DIM)
        .await
        .expect("Failed to define indexes");

    let embedder =
        Arc::new(EmbeddingProvider::new_hashed(EMBEDDING_DIM).expect("embedding provider"));

    let snapshot_dir = TempDir::new().expect("tempdir");
    let index = Arc::new(LexicalIndexCache::new(
        snapshot_dir.path().join("lexical-index.json"),
        Segmenter::default(),
    ));

    let service = HybridSearchService::new(
        Arc::clone(&db),
        Arc::clone(&embedder),
        Arc::clone(&index),
        KeywordExtractor::new(KeywordConfig::default(), None, None),
        tuning,
    );

    TestHarness {
        db,
        embedder,
        index,
        service,
        _snapshot_dir: snapshot_dir,
    }
}

pub async fn store_document(
    harness: &TestHarness,
    id: &str,
    title: &str,
    labels: &[&str],
    body: &str,
) {
    let embedding = harness
        .embedder
        .embed(&format!("{title} {body}"))
        .await
        .expect("embed");

    let doc = WikiDocument::new(
        id.to_owned(),
        title.to_owned(),
        body.to_owned(),
        labels.iter().map(|s| (*s).to_owned()).collect(),
        None,
        "DEV".to_owned(),
        format!("https://wiki.example.com/pages/{id}"),
        embedding,
    );
    harness.db.store_item(doc).await.expect("store document");

    harness
        .db
        .store_item(GraphNode::document(id, title.to_owned()))
        .await
        .expect("store graph node");
}

pub async fn store_edge(
    harness: &TestHarness,
    from: &str,
    to: &str,
    kind: EdgeKind,
    weight: f32,
) {
    let edge = GraphEdge::new(
        GraphNode::document_key(from),
        GraphNode::document_key(to),
        kind,
        weight,
        EdgeProvenance::Content,
        None,
    );
    harness.db.store_item(edge).await.expect("store edge");
}

/// Wiki corpus used by most scenarios: a feature page, a near-duplicate, a
/// meeting-notes page, and archived material.
pub async fn seed_default_corpus(harness: &TestHarness) {
    store_document(
        harness,
        "164",
        "ログイン機能",
        &[],
        "ログイン処理の詳細仕様。認証フローとセッション管理について。",
    )
    .await;
    store_document(
        harness,
        "177",
        "教室削除機能",
        &[],
        "教室を削除する手順とエラー条件の一覧。",
    )
    .await;
    store_document(
        harness,
        "200",
        "定例会議 2025-06",
        &["議事録"],
        "ログイン機能の改修についての議論メモ。",
    )
    .await;
    store_document(
        harness,
        "210",
        "認証まわりの覚書",
        &[],
        "認証トークンとセッションの補足資料。",
    )
    .await;
    store_document(
        harness,
        "300",
        "旧ログイン仕様",
        &["アーカイブ"],
        "過去のログイン仕様。現在は無効。",
    )
    .await;

    harness
        .index
        .rebuild(&harness.db)
        .await
        .expect("rebuild lexical index");
}
