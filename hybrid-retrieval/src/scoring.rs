use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use lexical_index::segmenter::normalize;

use crate::{
    candidate::{RawCandidate, RetrieverKind, ScoredCandidate},
    keywords::KeywordPlan,
};

/// Weights of the fixed convex combination producing the hybrid score.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FusionWeights {
    pub source: f32,
    pub keyword: f32,
    pub label: f32,
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self {
            source: 0.4,
            keyword: 0.4,
            label: 0.2,
        }
    }
}

const TITLE_WEIGHT: f32 = 3.0;
const LABEL_WEIGHT: f32 = 2.0;
const BODY_WEIGHT: f32 = 1.0;
const HIGH_PRIORITY_BONUS: f32 = 2.0;
const LOW_PRIORITY_BONUS: f32 = 1.0;
const KEYWORD_SCORE_DIVISOR: f32 = 10.0;
const BM25_SCORE_DIVISOR: f32 = 10.0;

pub fn clamp_unit(value: f32) -> f32 {
    if !value.is_finite() {
        return 0.0;
    }
    value.max(0.0).min(1.0)
}

/// Weighted keyword occurrences over title, labels, and body, plus a flat
/// bonus per keyword that matched anywhere, graded by its priority tier.
pub fn keyword_match_score(candidate: &RawCandidate, plan: &KeywordPlan) -> f32 {
    if plan.keywords.is_empty() {
        return 0.0;
    }

    let title = normalize(&candidate.title);
    let labels = normalize(&candidate.labels.join(" "));
    let body = normalize(&candidate.body);

    let mut score = 0.0;
    for keyword in &plan.keywords {
        let needle = keyword.to_lowercase();
        if needle.is_empty() {
            continue;
        }

        let occurrences = TITLE_WEIGHT * count_occurrences(&title, &needle)
            + LABEL_WEIGHT * count_occurrences(&labels, &needle)
            + BODY_WEIGHT * count_occurrences(&body, &needle);

        if occurrences > 0.0 {
            score += occurrences;
            if plan.high_priority.contains(&needle) {
                score += HIGH_PRIORITY_BONUS;
            } else if plan.low_priority.contains(&needle) {
                score += LOW_PRIORITY_BONUS;
            }
        }
    }

    score
}

fn count_occurrences(haystack: &str, needle: &str) -> f32 {
    haystack.matches(needle).count() as f32
}

/// Brings each retriever's raw score onto the common higher-is-better [0,1]
/// scale. The vector store reports a distance, so it is inverted here.
pub fn normalize_source_score(origin: RetrieverKind, raw: f32) -> f32 {
    match origin {
        RetrieverKind::Vector => clamp_unit(1.0 - clamp_unit(raw)),
        RetrieverKind::Bm25 => clamp_unit(raw / BM25_SCORE_DIVISOR),
        RetrieverKind::Keyword => clamp_unit(raw),
        RetrieverKind::TitleExact => 1.0,
    }
}

pub fn fuse(source_score: f32, keyword_score: f32, label_score: f32, weights: FusionWeights) -> f32 {
    clamp_unit(
        weights.source * clamp_unit(source_score)
            + weights.keyword * clamp_unit(keyword_score)
            + weights.label * clamp_unit(label_score),
    )
}

pub fn score_candidates(
    candidates: Vec<RawCandidate>,
    plan: &KeywordPlan,
    weights: FusionWeights,
) -> Vec<ScoredCandidate> {
    candidates
        .into_iter()
        .map(|candidate| {
            let keyword_score =
                clamp_unit(keyword_match_score(&candidate, plan) / KEYWORD_SCORE_DIVISOR);
            let source_score = normalize_source_score(candidate.origin, candidate.raw_score);
            // Reserved: label scoring has no semantics yet, the slot and its
            // weight stay in the formula at zero.
            let label_score = 0.0;
            let hybrid_score = fuse(source_score, keyword_score, label_score, weights);

            ScoredCandidate {
                candidate,
                keyword_score,
                label_score,
                hybrid_score,
            }
        })
        .collect()
}

/// Descending hybrid score; ties broken by retriever priority, then id, so
/// identical inputs always rank identically across runs.
pub fn rank(candidates: &mut [ScoredCandidate]) {
    candidates.sort_by(|a, b| {
        b.hybrid_score
            .partial_cmp(&a.hybrid_score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| {
                b.candidate
                    .origin
                    .priority()
                    .cmp(&a.candidate.origin.priority())
            })
            .then_with(|| a.candidate.id.cmp(&b.candidate.id))
    });
}
