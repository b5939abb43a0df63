use chrono::{DateTime, Utc};
use common::storage::types::wiki_document::WikiDocument;
use serde::{Deserialize, Serialize};

use crate::segmenter::{strip_markup, Segmenter};

/// One corpus document as held by the inverted index. Built in bulk per
/// corpus snapshot; immutable until the next full rebuild.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexedDocument {
    pub id: String,
    pub title: String,
    pub body: String,
    pub tokenized_title: String,
    pub tokenized_body: String,
    pub labels: Vec<String>,
    pub owner_id: Option<String>,
    pub source_url: String,
    pub space_key: String,
    pub updated_at: DateTime<Utc>,
}

impl IndexedDocument {
    /// Tokenizes one store row into its indexed form. The same segmenter
    /// instance must later tokenize queries against this index.
    pub fn from_wiki_document(doc: &WikiDocument, segmenter: &Segmenter) -> Self {
        let body_text = strip_markup(&doc.body);
        let tokenized_title = segmenter.tokenize(&doc.title).join(" ");
        let tokenized_body = segmenter.tokenize(&body_text).join(" ");

        Self {
            id: doc.id.clone(),
            title: doc.title.clone(),
            body: doc.body.clone(),
            tokenized_title,
            tokenized_body,
            labels: doc.labels.clone(),
            owner_id: doc.owner_id.clone(),
            source_url: doc.source_url.clone(),
            space_key: doc.space_key.clone(),
            updated_at: doc.updated_at,
        }
    }

    /// Id of the page this entry hydrates to: the owner for chunked rows,
    /// otherwise the document itself.
    pub fn owning_document_id(&self) -> &str {
        self.owner_id.as_deref().unwrap_or(&self.id)
    }
}
