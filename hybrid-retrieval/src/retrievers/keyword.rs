use std::collections::HashSet;

use common::{
    error::AppError,
    storage::{db::SurrealDbClient, types::wiki_document::WikiDocument},
};
use tracing::debug;

use crate::{
    candidate::{RawCandidate, RetrieverKind, RetrieverOutcome},
    config::RetrievalTuning,
    keywords::KeywordPlan,
    policy::is_excluded,
    retrievers::{bind_filter, filter_clause},
    DocumentFilter,
};

/// Low-precision safety net: disjunctive substring match over title and body
/// for every extracted keyword, straight against the primary store. The raw
/// score is the matched fraction of the keyword set.
pub async fn retrieve_by_keyword(
    db: &SurrealDbClient,
    keywords: &KeywordPlan,
    top_k: usize,
    exclude_labels: &HashSet<String>,
    filter: Option<&DocumentFilter>,
    tuning: &RetrievalTuning,
) -> Result<RetrieverOutcome, AppError> {
    if keywords.is_empty() || top_k == 0 {
        return Ok(RetrieverOutcome::skipped());
    }

    let overfetch = top_k * tuning.overfetch_factor.max(1);
    let predicate = keywords
        .keywords
        .iter()
        .map(|keyword| {
            // Keywords come out of the segmenter and dictionaries; stripping
            // quotes keeps the inlined literals well-formed either way.
            let safe = keyword.replace(['\'', '\\'], "");
            format!(
                "string::contains(string::lowercase(title), '{safe}') \
                 OR string::contains(string::lowercase(body), '{safe}')"
            )
        })
        .collect::<Vec<_>>()
        .join(" OR ");

    let sql = format!(
        "SELECT * FROM wiki_document WHERE is_chunk = false{} AND ({predicate}) LIMIT {overfetch}",
        filter_clause(filter),
    );

    let documents: Vec<WikiDocument> = bind_filter!(db.query(sql), filter).await?.take(0)?;

    debug!(hits = documents.len(), "Keyword retrieval returned hits");

    let total = keywords.keywords.len() as f32;
    let candidates = documents
        .into_iter()
        .filter(|doc| !is_excluded(&doc.labels, exclude_labels))
        .map(|doc| {
            let haystack = format!("{}\n{}", doc.title, doc.body).to_lowercase();
            let matched = keywords
                .keywords
                .iter()
                .filter(|keyword| haystack.contains(&keyword.to_lowercase()))
                .count();
            let raw_score = matched as f32 / total;

            RawCandidate {
                id: doc.id,
                title: doc.title,
                body: doc.body,
                labels: doc.labels,
                raw_score,
                origin: RetrieverKind::Keyword,
                score_note: Some(format!("keyword {matched}/{}", keywords.keywords.len())),
            }
        })
        .collect();

    Ok(RetrieverOutcome::ok(candidates))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keywords::{KeywordConfig, KeywordExtractor};
    use crate::policy::{build_exclude_set, LabelPolicyFlags};
    use uuid::Uuid;

    async fn seeded_db() -> SurrealDbClient {
        let db = SurrealDbClient::memory("keyword_test", &Uuid::new_v4().to_string())
            .await
            .expect("Failed to start in-memory surrealdb");

        for (id, title, labels, body) in [
            ("164", "ログイン機能", vec![], "ログイン処理の詳細仕様"),
            ("165", "パスワード再設定", vec![], "再設定メールの送信手順"),
            ("166", "古い資料", vec!["アーカイブ"], "ログインの旧仕様"),
        ] {
            let doc = WikiDocument::new(
                id.to_owned(),
                title.to_owned(),
                body.to_owned(),
                labels.into_iter().map(str::to_owned).collect(),
                None,
                "DEV".to_owned(),
                format!("https://wiki.example.com/pages/{id}"),
                vec![0.0; 3],
            );
            db.store_item(doc).await.expect("store");
        }

        db
    }

    async fn plan_for(query: &str) -> KeywordPlan {
        KeywordExtractor::new(KeywordConfig::default(), None, None)
            .extract(query)
            .await
    }

    #[tokio::test]
    async fn substring_match_finds_documents_and_scores_by_fraction() {
        let db = seeded_db().await;
        let plan = plan_for("ログイン機能の詳細").await;
        let exclude = build_exclude_set(&LabelPolicyFlags::default());

        let outcome = retrieve_by_keyword(
            &db,
            &plan,
            5,
            &exclude,
            None,
            &RetrievalTuning::default(),
        )
        .await
        .expect("keyword retrieval");

        let hit = outcome
            .candidates
            .iter()
            .find(|c| c.id == "164")
            .expect("expected a hit on 164");
        assert!(hit.raw_score > 0.9, "all keywords match document 164");
        assert_eq!(hit.origin, RetrieverKind::Keyword);

        // Always-excluded label filtered even though the body matches.
        assert!(outcome.candidates.iter().all(|c| c.id != "166"));
    }

    #[tokio::test]
    async fn empty_keyword_plan_skips() {
        let db = seeded_db().await;

        let outcome = retrieve_by_keyword(
            &db,
            &KeywordPlan::default(),
            5,
            &HashSet::new(),
            None,
            &RetrievalTuning::default(),
        )
        .await
        .expect("keyword retrieval");

        assert_eq!(outcome, RetrieverOutcome::skipped());
    }
}
