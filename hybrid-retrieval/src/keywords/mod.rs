pub mod dictionary;
pub mod expansion;

use std::collections::HashSet;
use std::sync::Arc;

use async_openai::Client;
use tracing::{debug, warn};

use lexical_index::segmenter::{normalize, Segmenter};

pub use dictionary::DomainDictionary;

/// Generic action/attribute words that show up in how-do-I questions about
/// any feature; low-signal on their own but useful as secondary terms.
const FUNCTION_PATTERNS: &[&str] = &[
    "一覧", "登録", "編集", "削除", "追加", "更新", "検索", "設定", "条件", "エラー", "権限",
    "通知", "画面", "機能", "list", "register", "edit", "delete", "condition", "error",
];

const BASIC_TERM_MIN_CHARS: usize = 2;
const BASIC_TERM_MAX_CHARS: usize = 4;

/// Stage toggles and limits for the extraction service. One configuration
/// struct instead of environment-driven branching between variants.
#[derive(Debug, Clone)]
pub struct KeywordConfig {
    pub max_keywords: usize,
    pub extra_stop_words: HashSet<String>,
    pub enable_llm_expansion: bool,
    pub expansion_model: String,
}

impl Default for KeywordConfig {
    fn default() -> Self {
        Self {
            max_keywords: 8,
            extra_stop_words: HashSet::new(),
            enable_llm_expansion: false,
            expansion_model: "gpt-4o-mini".to_owned(),
        }
    }
}

/// Ordered-unique keyword list plus the priority tiers used for score
/// boosting downstream. All terms are normalized lowercase.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeywordPlan {
    pub keywords: Vec<String>,
    pub high_priority: HashSet<String>,
    pub low_priority: HashSet<String>,
}

impl KeywordPlan {
    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }
}

/// Turns a natural-language query into search terms through four prioritized
/// stages: script-aware extraction, domain-dictionary matching, function
/// patterns, and optional LLM expansion. Later stages only add what earlier
/// stages missed.
pub struct KeywordExtractor {
    config: KeywordConfig,
    dictionary: Option<Arc<DomainDictionary>>,
    openai: Option<Arc<Client<async_openai::config::OpenAIConfig>>>,
    segmenter: Segmenter,
}

impl KeywordExtractor {
    pub fn new(
        config: KeywordConfig,
        dictionary: Option<Arc<DomainDictionary>>,
        openai: Option<Arc<Client<async_openai::config::OpenAIConfig>>>,
    ) -> Self {
        Self {
            config,
            dictionary,
            openai,
            segmenter: Segmenter::default(),
        }
    }

    /// Extraction never fails the query: the LLM stage degrades to nothing on
    /// error, and a query with no extractable tokens yields an empty plan the
    /// caller must handle (keyword-dependent retrievers skip).
    pub async fn extract(&self, query: &str) -> KeywordPlan {
        let basic = self.basic_terms(query);
        let domain = self.domain_terms(query, &basic);
        let patterns = function_pattern_terms(query);
        let expanded = self.expanded_terms(query, &basic).await;

        let mut plan = KeywordPlan::default();
        let mut seen: HashSet<String> = HashSet::new();

        for (terms, high_priority) in [
            (basic, true),
            (domain, true),
            (patterns, false),
            (expanded, false),
        ] {
            for term in terms {
                if plan.keywords.len() >= self.config.max_keywords {
                    break;
                }
                let key = term.to_lowercase();
                if key.is_empty() || !seen.insert(key.clone()) {
                    continue;
                }
                if high_priority {
                    plan.high_priority.insert(key);
                } else if !plan.high_priority.contains(&key) {
                    plan.low_priority.insert(key);
                }
                plan.keywords.push(term);
            }
        }

        debug!(
            keywords = ?plan.keywords,
            high = plan.high_priority.len(),
            low = plan.low_priority.len(),
            "Extracted keywords"
        );

        plan
    }

    // Stage 1: particle/punctuation split into script-aware tokens of
    // plausible keyword length.
    fn basic_terms(&self, query: &str) -> Vec<String> {
        self.segmenter
            .tokenize(query)
            .into_iter()
            .filter(|token| {
                let chars = token.chars().count();
                (BASIC_TERM_MIN_CHARS..=BASIC_TERM_MAX_CHARS).contains(&chars)
                    && !self.config.extra_stop_words.contains(token)
            })
            .collect()
    }

    // Stage 2: corpus entity names. Without a dictionary this degrades to the
    // same script-aware extraction (all of which stage 1 already picked).
    fn domain_terms(&self, query: &str, basic: &[String]) -> Vec<String> {
        match self.dictionary.as_deref() {
            Some(dictionary) if !dictionary.is_empty() => {
                dictionary.matches_in(&normalize(query))
            }
            _ => basic.to_vec(),
        }
    }

    // Stage 4: optional, fail-soft.
    async fn expanded_terms(&self, query: &str, seeds: &[String]) -> Vec<String> {
        if !self.config.enable_llm_expansion {
            return Vec::new();
        }
        let Some(client) = self.openai.as_ref() else {
            return Vec::new();
        };

        match expansion::expand_keywords(client, &self.config.expansion_model, query, seeds).await
        {
            Ok(terms) => terms,
            Err(err) => {
                warn!(error = %err, "Keyword expansion failed, continuing without it");
                Vec::new()
            }
        }
    }
}

// Stage 3: fixed pattern list matched against the normalized query.
fn function_pattern_terms(query: &str) -> Vec<String> {
    let normalized = normalize(query);
    FUNCTION_PATTERNS
        .iter()
        .filter(|pattern| normalized.contains(*pattern))
        .map(|pattern| (*pattern).to_owned())
        .collect()
}
