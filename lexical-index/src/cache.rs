use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use common::{
    error::AppError,
    storage::{db::SurrealDbClient, types::wiki_document::WikiDocument},
};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::{
    document::IndexedDocument,
    index::{SearchHit, SearchIndex},
    segmenter::Segmenter,
    snapshot::IndexSnapshot,
};

/// A lexical hit hydrated with the indexed document it came from.
#[derive(Debug, Clone)]
pub struct LexicalHit {
    pub document: IndexedDocument,
    pub score: f32,
}

struct LoadedIndex {
    index: SearchIndex,
    documents: HashMap<String, IndexedDocument>,
}

/// Owns the inverted index lifecycle: snapshot fast path on startup, full
/// rebuild otherwise, and query serving. Rebuilds replace the loaded state
/// wholesale behind the lock; readers never observe a partially built index.
pub struct LexicalIndexCache {
    snapshot_path: PathBuf,
    segmenter: Segmenter,
    state: RwLock<Option<Arc<LoadedIndex>>>,
}

impl LexicalIndexCache {
    pub fn new(snapshot_path: PathBuf, segmenter: Segmenter) -> Self {
        Self {
            snapshot_path,
            segmenter,
            state: RwLock::new(None),
        }
    }

    pub async fn is_ready(&self) -> bool {
        self.state.read().await.is_some()
    }

    /// Tries the persisted snapshot; returns whether it was usable.
    pub async fn load(&self) -> bool {
        let Some(snapshot) = IndexSnapshot::load(&self.snapshot_path) else {
            return false;
        };

        info!(
            documents = snapshot.documents.len(),
            built_at = %snapshot.built_at,
            "Loaded lexical index snapshot from disk"
        );
        self.install(snapshot.documents, snapshot.index).await;
        true
    }

    /// Full rebuild from the primary store: pull the current document set,
    /// tokenize, build, persist. Chunk rows are skipped; the index serves
    /// page-level lookups.
    pub async fn rebuild(&self, db: &SurrealDbClient) -> Result<(), AppError> {
        let documents: Vec<WikiDocument> = db
            .query("SELECT * FROM wiki_document WHERE is_chunk = false")
            .await?
            .take(0)?;

        debug!(documents = documents.len(), "Rebuilding lexical index");

        let indexed: Vec<IndexedDocument> = documents
            .iter()
            .map(|doc| IndexedDocument::from_wiki_document(doc, &self.segmenter))
            .collect();
        let index = SearchIndex::build(&indexed);

        match IndexSnapshot::new(indexed.clone(), index.clone()) {
            Ok(snapshot) => {
                if let Err(err) = snapshot.save(&self.snapshot_path) {
                    // A failed persist only costs the next cold start a rebuild.
                    warn!(error = %err, "Failed to persist lexical index snapshot");
                }
            }
            Err(err) => warn!(error = %err, "Failed to assemble lexical index snapshot"),
        }

        info!(documents = indexed.len(), "Lexical index rebuilt");
        self.install(indexed, index).await;
        Ok(())
    }

    /// Snapshot fast path, falling back to a rebuild.
    pub async fn load_or_rebuild(&self, db: &SurrealDbClient) -> Result<(), AppError> {
        if self.load().await {
            return Ok(());
        }
        self.rebuild(db).await
    }

    /// Searches the loaded index with the same segmenter used at build time.
    /// Returns `None` while the index is not ready; the caller treats that
    /// as an unavailable source, not as an empty result.
    pub async fn search(&self, query: &str, limit: usize) -> Option<Vec<LexicalHit>> {
        let state = self.state.read().await;
        let loaded = state.as_ref()?;

        let query_tokens = self.segmenter.tokenize(query);
        let hits = loaded.index.search(&query_tokens, limit);

        Some(
            hits.into_iter()
                .filter_map(|SearchHit { doc_id, score }| {
                    loaded.documents.get(&doc_id).map(|document| LexicalHit {
                        document: document.clone(),
                        score,
                    })
                })
                .collect(),
        )
    }

    async fn install(&self, documents: Vec<IndexedDocument>, index: SearchIndex) {
        let documents: HashMap<String, IndexedDocument> = documents
            .into_iter()
            .map(|doc| (doc.id.clone(), doc))
            .collect();
        let mut state = self.state.write().await;
        *state = Some(Arc::new(LoadedIndex { index, documents }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn wiki_doc(id: &str, title: &str, body: &str, labels: &[&str]) -> WikiDocument {
        WikiDocument::new(
            id.to_owned(),
            title.to_owned(),
            body.to_owned(),
            labels.iter().map(|s| (*s).to_owned()).collect(),
            None,
            "DEV".to_owned(),
            format!("https://wiki.example.com/pages/{id}"),
            vec![0.0; 3],
        )
    }

    async fn seeded_db() -> SurrealDbClient {
        let db = SurrealDbClient::memory("lexical_test", &Uuid::new_v4().to_string())
            .await
            .expect("Failed to start in-memory surrealdb");

        db.store_item(wiki_doc(
            "164",
            "ログイン機能",
            "ログイン処理の詳細仕様",
            &["認証"],
        ))
        .await
        .expect("store");
        db.store_item(wiki_doc("177", "教室削除機能", "教室を削除する手順", &[]))
            .await
            .expect("store");

        db
    }

    #[tokio::test]
    async fn starts_not_ready_and_search_is_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = LexicalIndexCache::new(dir.path().join("index.json"), Segmenter::default());

        assert!(!cache.is_ready().await);
        assert!(cache.search("ログイン", 10).await.is_none());
    }

    #[tokio::test]
    async fn rebuild_then_search() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = LexicalIndexCache::new(dir.path().join("index.json"), Segmenter::default());
        let db = seeded_db().await;

        cache.rebuild(&db).await.expect("rebuild");
        assert!(cache.is_ready().await);

        let hits = cache
            .search("ログイン機能の詳細", 10)
            .await
            .expect("index ready");
        assert!(!hits.is_empty());
        assert_eq!(hits[0].document.id, "164");
    }

    #[tokio::test]
    async fn snapshot_round_trips_between_instances() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("index.json");
        let db = seeded_db().await;

        let cache = LexicalIndexCache::new(path.clone(), Segmenter::default());
        cache.rebuild(&db).await.expect("rebuild");

        // A fresh process: same path, no rebuild needed.
        let warm = LexicalIndexCache::new(path, Segmenter::default());
        assert!(warm.load().await, "snapshot should satisfy the fast path");

        // No dictionary loaded: the query still hits through the body tokens.
        let hits = warm.search("教室の削除手順", 10).await.expect("index ready");
        assert!(hits.iter().any(|hit| hit.document.id == "177"));
    }

    #[tokio::test]
    async fn chunk_rows_are_not_indexed() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = LexicalIndexCache::new(dir.path().join("index.json"), Segmenter::default());
        let db = seeded_db().await;

        let mut chunk = wiki_doc("164-c1", "ログイン機能 抜粋", "ログインの断片", &[]);
        chunk.is_chunk = true;
        chunk.owner_id = Some("164".to_owned());
        db.store_item(chunk).await.expect("store");

        cache.rebuild(&db).await.expect("rebuild");
        let hits = cache.search("ログイン", 10).await.expect("index ready");

        assert!(hits.iter().all(|hit| hit.document.id != "164-c1"));
    }
}
