use std::collections::HashSet;

use lexical_index::segmenter::normalize;

use crate::candidate::ScoredCandidate;

/// Title under which two candidates count as the same logical document.
pub fn normalized_title(title: &str) -> String {
    normalize(title.trim())
}

/// First-seen-wins collapse over the ranked order. Must run after ranking;
/// running it earlier could keep a lower-quality duplicate alive.
pub fn dedup_ranked(candidates: Vec<ScoredCandidate>) -> Vec<ScoredCandidate> {
    let mut seen: HashSet<String> = HashSet::new();

    candidates
        .into_iter()
        .filter(|scored| seen.insert(normalized_title(&scored.candidate.title)))
        .collect()
}
