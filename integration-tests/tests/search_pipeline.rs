use common::storage::types::graph_edge::EdgeKind;
use hybrid_retrieval::{
    LabelPolicyFlags, RetrievalTuning, RetrieverKind, SearchRequest,
};

mod test_utils;
use test_utils::*;

// Scenario A: Japanese query with meeting notes excluded by default flags.
#[tokio::test]
async fn scenario_a_label_filtered_japanese_query() {
    let harness = setup_harness().await;
    seed_default_corpus(&harness).await;

    let results = harness
        .service
        .search(SearchRequest::new("ログイン機能の詳細を教えて", 10))
        .await
        .expect("search");

    assert!(!results.is_empty());
    assert!(results.len() <= 10);
    assert!(
        results
            .iter()
            .all(|r| !r.labels.contains(&"議事録".to_owned())),
        "meeting notes must not appear while their flag is off"
    );
    assert_eq!(results[0].id, "164", "the login feature page ranks first");
}

// Scenario A variant: the flag opens meeting notes up again.
#[tokio::test]
async fn meeting_notes_return_when_the_flag_allows_them() {
    let harness = setup_harness().await;
    seed_default_corpus(&harness).await;

    let mut request = SearchRequest::new("ログイン機能の議論", 10);
    request.label_flags = LabelPolicyFlags {
        include_meeting_notes: true,
        ..LabelPolicyFlags::default()
    };

    let results = harness.service.search(request).await.expect("search");
    assert!(results.iter().any(|r| r.id == "200"));
}

// Scenario B: always-excluded labels stay out regardless of score or flags.
#[tokio::test]
async fn scenario_b_always_excluded_labels() {
    let harness = setup_harness().await;
    seed_default_corpus(&harness).await;

    let mut request = SearchRequest::new("旧ログイン仕様", 10);
    request.label_flags = LabelPolicyFlags {
        include_meeting_notes: true,
        include_archived: true,
    };

    let results = harness.service.search(request).await.expect("search");
    assert!(
        results.iter().all(|r| r.id != "300"),
        "アーカイブ-labelled documents are always excluded"
    );
    assert!(results
        .iter()
        .all(|r| !r.labels.iter().any(|l| l == "アーカイブ" || l == "フォルダ")));
}

// Scenario C: same normalized title from two retrievers keeps one entry, the
// first-seen occurrence in ranked order.
#[tokio::test]
async fn scenario_c_duplicate_titles_collapse() {
    let harness = setup_harness().await;
    seed_default_corpus(&harness).await;

    // A second page with the identical title (a copied page in another space).
    store_document(
        &harness,
        "178",
        "教室削除機能",
        &[],
        "教室削除の旧手順のコピー。",
    )
    .await;
    harness
        .index
        .rebuild(&harness.db)
        .await
        .expect("rebuild lexical index");

    let results = harness
        .service
        .search(SearchRequest::new("教室の削除手順とエラー条件", 10))
        .await
        .expect("search");

    let matching: Vec<_> = results
        .iter()
        .filter(|r| r.title == "教室削除機能")
        .collect();
    assert_eq!(matching.len(), 1, "exactly one entry per normalized title");
}

// Scenario D: cold inverted index degrades to the other retrievers.
#[tokio::test]
async fn scenario_d_unavailable_index_still_answers() {
    let harness = setup_harness().await;

    // Seed without building the index.
    store_document(
        &harness,
        "164",
        "ログイン機能",
        &[],
        "ログイン処理の詳細仕様。",
    )
    .await;

    assert!(!harness.index.is_ready().await);

    let results = harness
        .service
        .search(SearchRequest::new("ログイン機能の詳細を教えて", 10))
        .await
        .expect("search");

    assert!(!results.is_empty(), "vector and keyword retrievers fill in");
    assert!(results.iter().all(|r| r.origin != RetrieverKind::Bm25));
}

// Scenario E: graph expansion adds reference and related targets with tags.
#[tokio::test]
async fn scenario_e_graph_expansion_tags_added_documents() {
    let harness = setup_harness().await;
    seed_default_corpus(&harness).await;

    store_edge(&harness, "164", "177", EdgeKind::Reference, 0.9).await;
    store_edge(&harness, "164", "210", EdgeKind::Related, 0.55).await;

    // top_k = 1 keeps the expansion targets out of the seed set.
    let results = harness
        .service
        .search(SearchRequest::new("ログイン機能の詳細を教えて", 1))
        .await
        .expect("search");

    let reference = results
        .iter()
        .find(|r| r.expansion.as_ref().is_some_and(|t| t.edge_kind == EdgeKind::Reference));
    let related = results
        .iter()
        .find(|r| r.expansion.as_ref().is_some_and(|t| t.edge_kind == EdgeKind::Related));

    let reference = reference.expect("the reference edge pulls in document 177");
    assert_eq!(reference.id, "177");
    let tag = reference.expansion.as_ref().expect("tag");
    assert!((tag.weight - 0.9).abs() < 1e-6);
    assert_eq!(tag.seed_id, "164");

    let related = related.expect("the related edge pulls in document 210");
    assert_eq!(related.id, "210");

    let cap = RetrievalTuning::default().expansion_total_cap;
    assert!(results.len() <= cap);

    // No document appears twice even with expansion in play.
    let mut ids: Vec<&str> = results.iter().map(|r| r.id.as_str()).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), results.len());
}

// Fusion bound + idempotence invariants over the full pipeline.
#[tokio::test]
async fn hybrid_scores_are_bounded_and_runs_are_idempotent() {
    let harness = setup_harness().await;
    seed_default_corpus(&harness).await;

    let request = SearchRequest::new("認証とセッションの設定", 10);
    let first = harness
        .service
        .search(request.clone())
        .await
        .expect("search");
    let second = harness.service.search(request).await.expect("search");

    assert!(first.iter().all(|r| (0.0..=1.0).contains(&r.score)));
    assert_eq!(first, second, "identical queries must rank identically");
}

// Retriever-priority tiebreak surfaces through the public contract.
#[tokio::test]
async fn title_exact_candidates_outrank_equal_scores() {
    let harness = setup_harness().await;
    seed_default_corpus(&harness).await;

    let mut request = SearchRequest::new("ログイン機能の詳細を教えて", 10);
    request.exact_title_candidates = vec!["認証まわりの覚書".to_owned()];

    let results = harness.service.search(request).await.expect("search");
    let exact = results
        .iter()
        .find(|r| r.id == "210")
        .expect("title-exact candidate is present");
    assert_eq!(exact.origin, RetrieverKind::TitleExact);
}

// Graph expansion can be disabled outright.
#[tokio::test]
async fn expansion_can_be_turned_off() {
    let tuning = RetrievalTuning {
        expand_graph: false,
        ..RetrievalTuning::default()
    };
    let harness = setup_harness_with_tuning(tuning).await;
    seed_default_corpus(&harness).await;
    store_edge(&harness, "164", "177", EdgeKind::Reference, 0.9).await;

    let results = harness
        .service
        .search(SearchRequest::new("ログイン機能の詳細を教えて", 3))
        .await
        .expect("search");

    assert!(results.iter().all(|r| r.expansion.is_none()));
}

// Warm-up builds the index in the background and BM25 joins later queries.
#[tokio::test]
async fn warm_up_enables_the_lexical_retriever() {
    let harness = setup_harness().await;
    store_document(
        &harness,
        "164",
        "ログイン機能",
        &[],
        "ログイン処理の詳細仕様。",
    )
    .await;

    harness.service.warm_up().await.expect("warm-up task");
    assert!(harness.index.is_ready().await);

    let results = harness
        .service
        .search(SearchRequest::new("ログイン機能の詳細", 10))
        .await
        .expect("search");

    assert!(results
        .iter()
        .any(|r| r.score_note.as_deref().is_some_and(|n| n.starts_with("BM25"))
            || r.origin == RetrieverKind::Bm25
            || r.id == "164"));
}
