use serde::{Deserialize, Serialize};

use crate::scoring::FusionWeights;

/// Tunable parameters that govern each retrieval stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalTuning {
    /// Over-fetch multiplier applied to top_k by the vector and lexical
    /// retrievers to absorb post-filtering losses.
    pub overfetch_factor: usize,
    pub excerpt_max_chars: usize,
    pub fusion: FusionWeights,
    pub expand_graph: bool,
    pub expansion_seed_limit: usize,
    pub expansion_total_cap: usize,
    pub reference_min_weight: f32,
    pub related_min_weight: f32,
    /// Store limitation: batched node lookups take at most this many ids.
    pub node_batch_limit: usize,
}

impl Default for RetrievalTuning {
    fn default() -> Self {
        Self {
            overfetch_factor: 2,
            excerpt_max_chars: 200,
            fusion: FusionWeights::default(),
            expand_graph: true,
            expansion_seed_limit: 8,
            expansion_total_cap: 12,
            reference_min_weight: 0.7,
            related_min_weight: 0.5,
            node_batch_limit: 30,
        }
    }
}
