pub mod keyword;
pub mod lexical;
pub mod title;
pub mod vector;

use std::collections::HashMap;

use common::{
    error::AppError,
    storage::{db::SurrealDbClient, types::wiki_document::WikiDocument},
};
use surrealdb::sql::Thing;
use tracing::warn;

use crate::DocumentFilter;

/// Hydrates full document rows for a list of ids, keyed by id. Ids that do
/// not resolve are simply absent; the caller drops those hits.
pub(crate) async fn fetch_documents_by_ids(
    db: &SurrealDbClient,
    ids: &[String],
) -> Result<HashMap<String, WikiDocument>, AppError> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let things: Vec<Thing> = ids
        .iter()
        .map(|id| Thing::from(("wiki_document", id.as_str())))
        .collect();

    let documents: Vec<WikiDocument> = db
        .query("SELECT * FROM wiki_document WHERE id IN $things")
        .bind(("things", things))
        .await?
        .take(0)?;

    Ok(documents
        .into_iter()
        .map(|doc| (doc.id.clone(), doc))
        .collect())
}

/// SQL fragment + binds for the caller's structured filter predicate.
pub(crate) fn filter_clause(filter: Option<&DocumentFilter>) -> String {
    let mut clause = String::new();
    if let Some(filter) = filter {
        if filter.space_key.is_some() {
            clause.push_str(" AND space_key = $space_key");
        }
        if filter.updated_after.is_some() {
            clause.push_str(" AND updated_at >= $updated_after");
        }
    }
    clause
}

/// Bind values for `filter_clause`; kept as a macro so it composes with the
/// store's by-value query builder without naming its type.
macro_rules! bind_filter {
    ($query:expr, $filter:expr) => {{
        let mut query = $query;
        if let Some(filter) = $filter {
            if let Some(space_key) = &filter.space_key {
                query = query.bind(("space_key", space_key.clone()));
            }
            if let Some(updated_after) = filter.updated_after {
                query = query.bind((
                    "updated_after",
                    surrealdb::sql::Datetime::from(updated_after),
                ));
            }
        }
        query
    }};
}
pub(crate) use bind_filter;

/// Logs and drops hits whose owning document could not be resolved from the
/// primary store (malformed or deleted rows are not retried).
pub(crate) fn warn_unresolved(origin: &str, id: &str) {
    warn!(origin, id, "Dropping hit whose document could not be resolved");
}
