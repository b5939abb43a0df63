use crate::stored_object;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Document,
    Domain,
    Category,
}

/// Externally maintained per-document classification record, consumed read-only.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Classification {
    pub domain: String,
    pub category: String,
    pub tags: Vec<String>,
    pub status: String,
}

stored_object!(GraphNode, "graph_node", {
    kind: NodeKind,
    name: String,
    document_id: Option<String>,
    classification: Option<Classification>,
    importance: Option<f32>
});

impl GraphNode {
    /// Node key for a wiki document; the offline graph builder uses the same scheme.
    pub fn document_key(document_id: &str) -> String {
        format!("document-{document_id}")
    }

    pub fn document(document_id: &str, name: String) -> Self {
        let now = Utc::now();
        Self {
            id: Self::document_key(document_id),
            created_at: now,
            updated_at: now,
            kind: NodeKind::Document,
            name,
            document_id: Some(document_id.to_owned()),
            classification: None,
            importance: None,
        }
    }
}
