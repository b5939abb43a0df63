use std::collections::HashSet;

use common::{
    error::AppError,
    storage::{db::SurrealDbClient, types::wiki_document::WikiDocument},
};
use tracing::debug;

use crate::{
    candidate::{RawCandidate, RetrieverKind, RetrieverOutcome},
    policy::is_excluded,
    retrievers::{bind_filter, filter_clause},
    DocumentFilter,
};

/// Exact-title lookup, used when an upstream component already knows likely
/// titles. Equality, not substring; skipped entirely without candidates.
pub async fn retrieve_by_title(
    db: &SurrealDbClient,
    exact_titles: &[String],
    exclude_labels: &HashSet<String>,
    filter: Option<&DocumentFilter>,
) -> Result<RetrieverOutcome, AppError> {
    if exact_titles.is_empty() {
        return Ok(RetrieverOutcome::skipped());
    }

    let sql = format!(
        "SELECT * FROM wiki_document WHERE is_chunk = false{} AND title IN $titles",
        filter_clause(filter),
    );

    let documents: Vec<WikiDocument> = bind_filter!(db.query(sql), filter)
        .bind(("titles", exact_titles.to_vec()))
        .await?
        .take(0)?;

    debug!(hits = documents.len(), "Title-exact retrieval returned hits");

    let candidates = documents
        .into_iter()
        .filter(|doc| !is_excluded(&doc.labels, exclude_labels))
        .map(|doc| RawCandidate {
            id: doc.id,
            title: doc.title,
            body: doc.body,
            labels: doc.labels,
            raw_score: 1.0,
            origin: RetrieverKind::TitleExact,
            score_note: None,
        })
        .collect();

    Ok(RetrieverOutcome::ok(candidates))
}
