use crate::stored_object;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    Reference,
    Implements,
    Related,
    DomainMember,
    CategoryMember,
}

impl EdgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeKind::Reference => "reference",
            EdgeKind::Implements => "implements",
            EdgeKind::Related => "related",
            EdgeKind::DomainMember => "domain_member",
            EdgeKind::CategoryMember => "category_member",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EdgeProvenance {
    Content,
    Classification,
    Manual,
}

/// Extraction details recorded by the offline graph builder.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct EdgeMetadata {
    pub matched_text: Option<String>,
    pub tag_similarity: Option<f32>,
    pub domain: Option<String>,
}

stored_object!(GraphEdge, "graph_edge", {
    from_id: String,
    to_id: String,
    kind: EdgeKind,
    weight: f32,
    provenance: EdgeProvenance,
    metadata: Option<EdgeMetadata>
});

impl GraphEdge {
    pub fn new(
        from_id: String,
        to_id: String,
        kind: EdgeKind,
        weight: f32,
        provenance: EdgeProvenance,
        metadata: Option<EdgeMetadata>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            created_at: now,
            updated_at: now,
            from_id,
            to_id,
            kind,
            weight,
            provenance,
            metadata,
        }
    }
}
