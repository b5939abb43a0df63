use std::collections::HashSet;

use common::{error::AppError, storage::db::SurrealDbClient};
use lexical_index::LexicalIndexCache;
use tracing::debug;

use crate::{
    candidate::{RawCandidate, RetrieverKind, RetrieverOutcome},
    config::RetrievalTuning,
    keywords::KeywordPlan,
    policy::is_excluded,
    retrievers::{fetch_documents_by_ids, warn_unresolved},
    DocumentFilter,
};

/// BM25 retrieval through the inverted index. Only runs once the index cache
/// is loaded and at least one keyword was extracted; an index that is still
/// building is an unavailable source, not an empty result.
#[allow(clippy::too_many_arguments)]
pub async fn retrieve_by_lexical(
    db: &SurrealDbClient,
    index: &LexicalIndexCache,
    query: &str,
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
    let Some(hits) = index.search(query, overfetch).await else {
        debug!("Lexical index not ready, skipping BM25 retrieval");
        return Ok(RetrieverOutcome::unavailable());
    };

    debug!(hits = hits.len(), "Lexical retrieval returned hits");

    // Hits hydrate from the primary store so results carry current content.
    let owning_ids: Vec<String> = hits
        .iter()
        .map(|hit| hit.document.owning_document_id().to_owned())
        .collect();
    let documents = fetch_documents_by_ids(db, &owning_ids).await?;

    let mut candidates = Vec::with_capacity(hits.len());
    for hit in hits {
        let owning_id = hit.document.owning_document_id();
        let Some(doc) = documents.get(owning_id).cloned() else {
            warn_unresolved("bm25", owning_id);
            continue;
        };
        if is_excluded(&doc.labels, exclude_labels) {
            continue;
        }
        if !matches_filter(&doc, filter) {
            continue;
        }

        candidates.push(RawCandidate {
            id: doc.id,
            title: doc.title,
            body: doc.body,
            labels: doc.labels,
            raw_score: hit.score,
            origin: RetrieverKind::Bm25,
            score_note: Some(format!("BM25 {:.2}", hit.score)),
        });
    }

    Ok(RetrieverOutcome::ok(candidates))
}

fn matches_filter(
    doc: &common::storage::types::wiki_document::WikiDocument,
    filter: Option<&DocumentFilter>,
) -> bool {
    let Some(filter) = filter else {
        return true;
    };
    if let Some(space_key) = &filter.space_key {
        if &doc.space_key != space_key {
            return false;
        }
    }
    if let Some(updated_after) = filter.updated_after {
        if doc.updated_at < updated_after {
            return false;
        }
    }
    true
}
