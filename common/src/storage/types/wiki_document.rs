use crate::stored_object;

stored_object!(WikiDocument, "wiki_document", {
    title: String,
    body: String,
    labels: Vec<String>,
    owner_id: Option<String>,
    is_chunk: bool,
    space_key: String,
    source_url: String,
    embedding: Vec<f32>
});

impl WikiDocument {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: String,
        title: String,
        body: String,
        labels: Vec<String>,
        owner_id: Option<String>,
        space_key: String,
        source_url: String,
        embedding: Vec<f32>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            created_at: now,
            updated_at: now,
            title,
            body,
            labels,
            owner_id,
            is_chunk: false,
            space_key,
            source_url,
            embedding,
        }
    }

    /// Leading slice of the body used in caller-facing results.
    pub fn excerpt(&self, max_chars: usize) -> String {
        self.body.chars().take(max_chars).collect()
    }
}
