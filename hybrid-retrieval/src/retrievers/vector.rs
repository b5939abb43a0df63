use std::collections::HashSet;

use common::{
    error::AppError,
    storage::{db::SurrealDbClient, types::wiki_document::deserialize_flexible_id},
    utils::embedding::EmbeddingProvider,
};
use serde::Deserialize;
use tracing::debug;

use crate::{
    candidate::{RawCandidate, RetrieverKind, RetrieverOutcome},
    config::RetrievalTuning,
    policy::is_excluded,
    retrievers::{bind_filter, fetch_documents_by_ids, filter_clause, warn_unresolved},
    DocumentFilter,
};

#[derive(Debug, Deserialize)]
struct VectorScoreRow {
    #[serde(deserialize_with = "deserialize_flexible_id")]
    id: String,
    distance: Option<f32>,
}

/// Nearest-neighbor retrieval over the document embeddings. Over-fetches
/// beyond top_k so the label filter does not starve the result set; the raw
/// score is the store-reported distance (lower is better).
pub async fn retrieve_by_vector(
    db: &SurrealDbClient,
    embedder: &EmbeddingProvider,
    query: &str,
    top_k: usize,
    exclude_labels: &HashSet<String>,
    filter: Option<&DocumentFilter>,
    tuning: &RetrievalTuning,
) -> Result<RetrieverOutcome, AppError> {
    if query.trim().is_empty() || top_k == 0 {
        return Ok(RetrieverOutcome::skipped());
    }

    let embedding = embedder.embed(query).await?;
    let overfetch = top_k * tuning.overfetch_factor.max(1);

    let sql = format!(
        "SELECT id, vector::distance::knn() AS distance FROM wiki_document \
         WHERE is_chunk = false{} AND embedding <|{overfetch},40|> {embedding:?} \
         ORDER BY distance",
        filter_clause(filter),
    );

    let mut response = bind_filter!(db.query(sql), filter).await?;
    let score_rows: Vec<VectorScoreRow> = response.take(0)?;

    debug!(hits = score_rows.len(), "Vector retrieval returned hits");

    let ids: Vec<String> = score_rows.iter().map(|row| row.id.clone()).collect();
    let mut documents = fetch_documents_by_ids(db, &ids).await?;

    let mut candidates = Vec::with_capacity(score_rows.len());
    for row in score_rows {
        let Some(doc) = documents.remove(&row.id) else {
            warn_unresolved("vector", &row.id);
            continue;
        };
        if is_excluded(&doc.labels, exclude_labels) {
            continue;
        }

        candidates.push(RawCandidate {
            id: doc.id,
            title: doc.title,
            body: doc.body,
            labels: doc.labels,
            raw_score: row.distance.unwrap_or(1.0),
            origin: RetrieverKind::Vector,
            score_note: None,
        });
    }

    Ok(RetrieverOutcome::ok(candidates))
}
