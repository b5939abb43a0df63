use std::cmp::Ordering;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::document::IndexedDocument;

/// Per-field term weights, applied when documents are folded into the index.
/// Title outranks labels outranks body; query scoring reads the same postings,
/// so build and query time cannot drift apart.
pub const FIELD_BOOSTS: FieldBoosts = FieldBoosts {
    title: 3.0,
    labels: 2.0,
    body: 1.0,
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct FieldBoosts {
    pub title: f32,
    pub labels: f32,
    pub body: f32,
}

const BM25_K1: f32 = 1.2;
const BM25_B: f32 = 0.75;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct Posting {
    doc_id: String,
    weighted_tf: f32,
}

/// Term → postings map with BM25 scoring over boost-weighted term frequencies.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SearchIndex {
    postings: HashMap<String, Vec<Posting>>,
    doc_lengths: HashMap<String, f32>,
    avg_doc_length: f32,
    boosts: FieldBoosts,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub doc_id: String,
    pub score: f32,
}

impl Default for FieldBoosts {
    fn default() -> Self {
        FIELD_BOOSTS
    }
}

impl SearchIndex {
    pub fn build(documents: &[IndexedDocument]) -> Self {
        let boosts = FIELD_BOOSTS;
        let mut postings: HashMap<String, Vec<Posting>> = HashMap::new();
        let mut doc_lengths: HashMap<String, f32> = HashMap::new();

        for doc in documents {
            let mut term_weights: HashMap<&str, f32> = HashMap::new();

            for token in doc.tokenized_title.split_whitespace() {
                *term_weights.entry(token).or_default() += boosts.title;
            }
            let label_tokens: Vec<String> = doc
                .labels
                .iter()
                .flat_map(|label| {
                    crate::segmenter::normalize(label)
                        .split_whitespace()
                        .map(str::to_owned)
                        .collect::<Vec<_>>()
                })
                .collect();
            for token in &label_tokens {
                *term_weights.entry(token.as_str()).or_default() += boosts.labels;
            }
            for token in doc.tokenized_body.split_whitespace() {
                *term_weights.entry(token).or_default() += boosts.body;
            }

            let length: f32 = term_weights.values().sum();
            doc_lengths.insert(doc.id.clone(), length);

            for (token, weighted_tf) in term_weights {
                postings.entry(token.to_owned()).or_default().push(Posting {
                    doc_id: doc.id.clone(),
                    weighted_tf,
                });
            }
        }

        let avg_doc_length = if doc_lengths.is_empty() {
            0.0
        } else {
            doc_lengths.values().sum::<f32>() / doc_lengths.len() as f32
        };

        Self {
            postings,
            doc_lengths,
            avg_doc_length,
            boosts,
        }
    }

    pub fn document_count(&self) -> usize {
        self.doc_lengths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.doc_lengths.is_empty()
    }

    /// BM25 over the query tokens; the tokens must come out of the same
    /// segmenter that produced the indexed documents.
    pub fn search(&self, query_tokens: &[String], limit: usize) -> Vec<SearchHit> {
        if query_tokens.is_empty() || self.is_empty() || limit == 0 {
            return Vec::new();
        }

        let doc_count = self.doc_lengths.len() as f32;
        let mut scores: HashMap<&str, f32> = HashMap::new();

        for token in query_tokens {
            let Some(postings) = self.postings.get(token.as_str()) else {
                continue;
            };

            let df = postings.len() as f32;
            let idf = ((doc_count - df + 0.5) / (df + 0.5) + 1.0).ln();

            for posting in postings {
                let length = self
                    .doc_lengths
                    .get(&posting.doc_id)
                    .copied()
                    .unwrap_or(self.avg_doc_length);
                let norm = 1.0 - BM25_B + BM25_B * length / self.avg_doc_length.max(f32::EPSILON);
                let tf_component =
                    posting.weighted_tf * (BM25_K1 + 1.0) / (posting.weighted_tf + BM25_K1 * norm);

                *scores.entry(posting.doc_id.as_str()).or_default() += idf * tf_component;
            }
        }

        let mut hits: Vec<SearchHit> = scores
            .into_iter()
            .map(|(doc_id, score)| SearchHit {
                doc_id: doc_id.to_owned(),
                score,
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.doc_id.cmp(&b.doc_id))
        });
        hits.truncate(limit);

        hits
    }
}
