use crate::error::AppError;
use crate::utils::config::AppConfig;

use super::types::StoredObject;
use std::{ops::Deref, sync::Arc};
use surrealdb::{
    engine::any::{connect, Any},
    opt::auth::Root,
    Error, Surreal,
};
use tokio::sync::OnceCell;
use tracing::info;

#[derive(Clone)]
pub struct SurrealDbClient {
    pub client: Surreal<Any>,
}

impl SurrealDbClient {
    pub async fn new(
        address: &str,
        username: &str,
        password: &str,
        namespace: &str,
        database: &str,
    ) -> Result<Self, Error> {
        let db = connect(address).await?;

        // Sign in to database; embedded engines carry no auth layer.
        if !address.starts_with("mem://") {
            db.signin(Root { username, password }).await?;
        }

        // Set namespace
        db.use_ns(namespace).use_db(database).await?;

        Ok(SurrealDbClient { client: db })
    }

    /// Index DDL for the document and graph tables. Idempotent; safe to run at startup.
    pub async fn define_indexes(&self, embedding_dimension: usize) -> Result<(), Error> {
        self.client
            .query(format!(
                "DEFINE INDEX IF NOT EXISTS idx_embedding_documents ON wiki_document FIELDS embedding HNSW DIMENSION {embedding_dimension} DIST COSINE"
            ))
            .await?;
        self.client
            .query("DEFINE INDEX IF NOT EXISTS idx_document_space ON wiki_document FIELDS space_key")
            .await?;
        self.client
            .query("DEFINE INDEX IF NOT EXISTS idx_document_title ON wiki_document FIELDS title")
            .await?;
        self.client
            .query("DEFINE INDEX IF NOT EXISTS idx_edge_from ON graph_edge FIELDS from_id")
            .await?;

        Ok(())
    }

    pub async fn store_item<T>(&self, item: T) -> Result<Option<T>, Error>
    where
        T: StoredObject + Send + Sync + 'static,
    {
        self.client
            .create((T::table_name(), item.get_id()))
            .content(item)
            .await
    }

    pub async fn get_all_stored_items<T>(&self) -> Result<Vec<T>, Error>
    where
        T: for<'de> StoredObject,
    {
        self.client.select(T::table_name()).await
    }

    pub async fn get_item<T>(&self, id: &str) -> Result<Option<T>, Error>
    where
        T: for<'de> StoredObject,
    {
        self.client.select((T::table_name(), id)).await
    }

    pub async fn delete_item<T>(&self, id: &str) -> Result<Option<T>, Error>
    where
        T: for<'de> StoredObject,
    {
        self.client.delete((T::table_name(), id)).await
    }
}

impl Deref for SurrealDbClient {
    type Target = Surreal<Any>;

    fn deref(&self) -> &Self::Target {
        &self.client
    }
}

/// Lazily connected handle to the primary store.
///
/// Concurrent first-time callers await the same in-flight connection attempt
/// instead of opening a second one; afterwards everyone shares one client for
/// the process lifetime.
pub struct DbHandle {
    config: AppConfig,
    cell: OnceCell<Arc<SurrealDbClient>>,
}

impl DbHandle {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            cell: OnceCell::new(),
        }
    }

    pub async fn get(&self) -> Result<Arc<SurrealDbClient>, AppError> {
        let client = self
            .cell
            .get_or_try_init(|| async {
                info!(address = %self.config.surrealdb_address, "Connecting to primary store");
                let client = SurrealDbClient::new(
                    &self.config.surrealdb_address,
                    &self.config.surrealdb_username,
                    &self.config.surrealdb_password,
                    &self.config.surrealdb_namespace,
                    &self.config.surrealdb_database,
                )
                .await?;
                Ok::<_, AppError>(Arc::new(client))
            })
            .await?;

        Ok(Arc::clone(client))
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl SurrealDbClient {
    /// Create an in-memory SurrealDB client for testing.
    pub async fn memory(namespace: &str, database: &str) -> Result<Self, Error> {
        let db = connect("mem://").await?;

        db.use_ns(namespace).use_db(database).await?;

        Ok(SurrealDbClient { client: db })
    }
}
