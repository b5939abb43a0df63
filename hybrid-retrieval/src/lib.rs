//! Hybrid retrieval and ranking engine for the wiki knowledge base.
//!
//! One query fans out to four independent candidate sources (vector KNN,
//! BM25 over the inverted index, keyword substring, exact title), each
//! filtered through the same label policy. Candidates are fused onto one
//! score scale, ranked with a deterministic tiebreak, deduplicated by
//! normalized title, and optionally enriched by a bounded walk over the
//! document relationship graph.

pub mod candidate;
pub mod config;
pub mod dedup;
pub mod graph;
pub mod keywords;
pub mod policy;
pub mod retrievers;
pub mod scoring;

use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::{
    error::AppError,
    storage::db::SurrealDbClient,
    utils::{config::AppConfig, embedding::EmbeddingProvider},
};
use lexical_index::{LexicalIndexCache, Segmenter, SegmenterDictionary};
use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};

pub use candidate::{RawCandidate, RetrieverKind, RetrieverOutcome, ScoredCandidate, SourceStatus};
pub use config::RetrievalTuning;
pub use graph::ExpansionTag;
pub use keywords::{DomainDictionary, KeywordConfig, KeywordExtractor, KeywordPlan};
pub use policy::LabelPolicyFlags;

use crate::{
    dedup::dedup_ranked,
    policy::{build_exclude_set, is_excluded},
    retrievers::{
        keyword::retrieve_by_keyword, lexical::retrieve_by_lexical, title::retrieve_by_title,
        vector::retrieve_by_vector,
    },
    scoring::{rank, score_candidates},
};

/// Structured predicate pushed down to the store-backed retrievers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentFilter {
    pub space_key: Option<String>,
    pub updated_after: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub query: String,
    pub top_k: usize,
    pub min_score: Option<f32>,
    pub filter: Option<DocumentFilter>,
    pub label_flags: LabelPolicyFlags,
    /// Titles an upstream component already believes are relevant; enables
    /// the title-exact retriever.
    pub exact_title_candidates: Vec<String>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>, top_k: usize) -> Self {
        Self {
            query: query.into(),
            top_k,
            min_score: None,
            filter: None,
            label_flags: LabelPolicyFlags::default(),
            exact_title_candidates: Vec::new(),
        }
    }
}

/// One entry of the final ranked list. Expansion-added documents keep their
/// seed's retriever tag and carry the edge that pulled them in.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedResult {
    pub id: String,
    pub title: String,
    pub excerpt: String,
    pub labels: Vec<String>,
    pub score: f32,
    pub origin: RetrieverKind,
    pub score_note: Option<String>,
    pub expansion: Option<ExpansionTag>,
}

/// The retrieval pipeline with its collaborators injected once at startup;
/// no global connection or cache state.
pub struct HybridSearchService {
    db: Arc<SurrealDbClient>,
    embedder: Arc<EmbeddingProvider>,
    index: Arc<LexicalIndexCache>,
    extractor: KeywordExtractor,
    tuning: RetrievalTuning,
}

impl HybridSearchService {
    pub fn new(
        db: Arc<SurrealDbClient>,
        embedder: Arc<EmbeddingProvider>,
        index: Arc<LexicalIndexCache>,
        extractor: KeywordExtractor,
        tuning: RetrievalTuning,
    ) -> Self {
        Self {
            db,
            embedder,
            index,
            extractor,
            tuning,
        }
    }

    /// Wires the full pipeline from configuration: embedding provider,
    /// segmenter/domain dictionaries, snapshot path, and the optional
    /// expansion client. Missing dictionaries degrade to the fallback
    /// tokenizer rather than failing startup.
    pub fn from_config(config: &AppConfig, db: Arc<SurrealDbClient>) -> Result<Self, AppError> {
        let openai_client = (!config.openai_api_key.is_empty()).then(|| {
            Arc::new(async_openai::Client::with_config(
                async_openai::config::OpenAIConfig::new()
                    .with_api_key(&config.openai_api_key)
                    .with_api_base(&config.openai_base_url),
            ))
        });

        let embedder = Arc::new(EmbeddingProvider::from_config(config, openai_client.clone())?);

        let segmenter_dictionary = config.domain_dictionary_path.as_ref().and_then(|path| {
            match SegmenterDictionary::load_from_file(Path::new(path)) {
                Ok(dictionary) => Some(Arc::new(dictionary)),
                Err(err) => {
                    warn!(error = %err, "Segmenter dictionary unavailable, using the fallback tokenizer");
                    None
                }
            }
        });
        let domain_dictionary = config.domain_dictionary_path.as_ref().and_then(|path| {
            match DomainDictionary::load_from_file(Path::new(path)) {
                Ok(dictionary) => Some(Arc::new(dictionary)),
                Err(err) => {
                    warn!(error = %err, "Domain dictionary unavailable, extraction falls back to basic terms");
                    None
                }
            }
        });

        let index = Arc::new(LexicalIndexCache::new(
            config.lexical_index_path(),
            Segmenter::new(segmenter_dictionary),
        ));

        let keyword_config = KeywordConfig {
            enable_llm_expansion: config.enable_keyword_expansion,
            expansion_model: config.keyword_expansion_model.clone(),
            ..KeywordConfig::default()
        };
        let extractor = KeywordExtractor::new(keyword_config, domain_dictionary, openai_client);

        Ok(Self::new(
            db,
            embedder,
            index,
            extractor,
            RetrievalTuning::default(),
        ))
    }

    /// Builds (or loads) the lexical index on a background task. Queries
    /// issued before it finishes fall back to the other retrievers.
    pub fn warm_up(&self) -> tokio::task::JoinHandle<()> {
        let db = Arc::clone(&self.db);
        let index = Arc::clone(&self.index);

        tokio::spawn(async move {
            if let Err(err) = index.load_or_rebuild(&db).await {
                error!(error = %err, "Lexical index warm-up failed");
            }
        })
    }

    #[instrument(skip_all, fields(top_k = request.top_k))]
    pub async fn search(&self, request: SearchRequest) -> Result<Vec<RankedResult>, AppError> {
        let query = request.query.trim();
        let preview: String = query.chars().take(120).collect();
        info!(preview = %preview.replace('\n', " "), "Starting hybrid retrieval");

        let plan = self.extractor.extract(query).await;
        let exclude = build_exclude_set(&request.label_flags);
        let filter = request.filter.as_ref();

        // Fan-out/fan-in: the four sources are independent and a failing one
        // contributes nothing instead of aborting the query.
        let (vector, lexical, keyword, title) = tokio::join!(
            degrade(
                RetrieverKind::Vector,
                retrieve_by_vector(
                    &self.db,
                    &self.embedder,
                    query,
                    request.top_k,
                    &exclude,
                    filter,
                    &self.tuning,
                )
            ),
            degrade(
                RetrieverKind::Bm25,
                retrieve_by_lexical(
                    &self.db,
                    &self.index,
                    query,
                    &plan,
                    request.top_k,
                    &exclude,
                    filter,
                    &self.tuning,
                )
            ),
            degrade(
                RetrieverKind::Keyword,
                retrieve_by_keyword(
                    &self.db,
                    &plan,
                    request.top_k,
                    &exclude,
                    filter,
                    &self.tuning
                )
            ),
            degrade(
                RetrieverKind::TitleExact,
                retrieve_by_title(&self.db, &request.exact_title_candidates, &exclude, filter)
            ),
        );

        debug!(
            vector = vector.candidates.len(),
            bm25 = lexical.candidates.len(),
            keyword = keyword.candidates.len(),
            title_exact = title.candidates.len(),
            bm25_status = ?lexical.status,
            "Candidate source counts"
        );

        let mut candidates = Vec::with_capacity(
            vector.candidates.len()
                + lexical.candidates.len()
                + keyword.candidates.len()
                + title.candidates.len(),
        );
        candidates.extend(title.candidates);
        candidates.extend(lexical.candidates);
        candidates.extend(vector.candidates);
        candidates.extend(keyword.candidates);

        let mut scored = score_candidates(candidates, &plan, self.tuning.fusion);
        rank(&mut scored);

        if let Some(floor) = request.min_score {
            scored.retain(|s| s.hybrid_score >= floor);
        }
        // Same policy functions the retrievers used; nothing excluded can
        // slip through fusion.
        scored.retain(|s| !is_excluded(&s.candidate.labels, &exclude));

        let mut results: Vec<RankedResult> = dedup_ranked(scored)
            .into_iter()
            .take(request.top_k)
            .map(|s| self.to_result(s))
            .collect();

        if self.tuning.expand_graph {
            let additions =
                graph::expand_results(&self.db, &results, &self.tuning, &exclude).await;
            results.extend(additions);
        }

        info!(results = results.len(), "Hybrid retrieval finished");
        Ok(results)
    }

    fn to_result(&self, scored: ScoredCandidate) -> RankedResult {
        let candidate = scored.candidate;
        let excerpt: String = candidate
            .body
            .chars()
            .take(self.tuning.excerpt_max_chars)
            .collect();

        RankedResult {
            id: candidate.id,
            title: candidate.title,
            excerpt,
            labels: candidate.labels,
            score: scored.hybrid_score,
            origin: candidate.origin,
            score_note: candidate.score_note,
            expansion: None,
        }
    }
}

async fn degrade<F>(origin: RetrieverKind, fut: F) -> RetrieverOutcome
where
    F: Future<Output = Result<RetrieverOutcome, AppError>>,
{
    match fut.await {
        Ok(outcome) => outcome,
        Err(err) => {
            warn!(origin = %origin, error = %err, "Retriever failed, contributing no candidates");
            RetrieverOutcome::unavailable()
        }
    }
}
