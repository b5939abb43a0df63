use serde::{Deserialize, Serialize};

/// Which retrieval strategy produced a candidate. The ordering doubles as the
/// ranking tiebreak: on identical hybrid scores a title-exact hit outranks a
/// BM25 hit, which outranks a vector hit, which outranks a substring hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RetrieverKind {
    TitleExact,
    Bm25,
    Vector,
    Keyword,
}

impl RetrieverKind {
    pub fn priority(&self) -> u8 {
        match self {
            RetrieverKind::TitleExact => 3,
            RetrieverKind::Bm25 => 2,
            RetrieverKind::Vector => 1,
            RetrieverKind::Keyword => 0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RetrieverKind::TitleExact => "title-exact",
            RetrieverKind::Bm25 => "bm25",
            RetrieverKind::Vector => "vector",
            RetrieverKind::Keyword => "keyword",
        }
    }
}

impl std::fmt::Display for RetrieverKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One locally-scored candidate as returned by a single retriever, before
/// fusion. The raw score is on the retriever's own scale; normalization
/// happens in scoring.
#[derive(Debug, Clone, PartialEq)]
pub struct RawCandidate {
    pub id: String,
    pub title: String,
    pub body: String,
    pub labels: Vec<String>,
    pub raw_score: f32,
    pub origin: RetrieverKind,
    pub score_note: Option<String>,
}

/// A candidate with its derived sub-scores and the fused hybrid score.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    pub candidate: RawCandidate,
    pub keyword_score: f32,
    /// Reserved slot; always 0.0 until label scoring gets real semantics.
    pub label_score: f32,
    pub hybrid_score: f32,
}

/// Why a retriever returned what it returned. Distinguishes "empty because
/// the source was unavailable or skipped" from "empty because nothing
/// matched" so callers and tests can assert on the right condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceStatus {
    Ok,
    Skipped,
    Unavailable,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetrieverOutcome {
    pub status: SourceStatus,
    pub candidates: Vec<RawCandidate>,
}

impl RetrieverOutcome {
    pub fn ok(candidates: Vec<RawCandidate>) -> Self {
        Self {
            status: SourceStatus::Ok,
            candidates,
        }
    }

    pub fn skipped() -> Self {
        Self {
            status: SourceStatus::Skipped,
            candidates: Vec::new(),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            status: SourceStatus::Unavailable,
            candidates: Vec::new(),
        }
    }
}
