use anyhow::Context;
use tracing::debug;

use lexical_index::segmenter::normalize;

/// Entity terms harvested offline from the corpus. One JSON array of surface
/// forms, shared with the segmenter dictionary file.
#[derive(Debug, Default)]
pub struct DomainDictionary {
    terms: Vec<String>,
}

impl DomainDictionary {
    pub fn from_terms<I: IntoIterator<Item = String>>(terms: I) -> Self {
        let mut terms: Vec<String> = terms
            .into_iter()
            .map(|term| normalize(&term))
            .filter(|term| !term.is_empty())
            .collect();
        terms.sort();
        terms.dedup();
        Self { terms }
    }

    pub fn load_from_file(path: &std::path::Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading domain dictionary at {}", path.display()))?;
        let terms: Vec<String> =
            serde_json::from_str(&raw).context("parsing domain dictionary JSON")?;
        debug!(terms = terms.len(), "Loaded domain dictionary");
        Ok(Self::from_terms(terms))
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Dictionary terms occurring in the query, longest first so compound
    /// entity names win over their fragments.
    pub fn matches_in(&self, normalized_query: &str) -> Vec<String> {
        let mut matched: Vec<String> = self
            .terms
            .iter()
            .filter(|term| normalized_query.contains(term.as_str()))
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()).then(a.cmp(b)));
        matched
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_are_longest_first() {
        let dictionary = DomainDictionary::from_terms(
            ["教室", "教室削除", "会員"].map(String::from),
        );
        let matched = dictionary.matches_in(&normalize("教室削除の手順"));

        assert_eq!(matched, vec!["教室削除".to_owned(), "教室".to_owned()]);
    }

    #[test]
    fn no_match_for_unrelated_query() {
        let dictionary = DomainDictionary::from_terms(["会員".to_owned()]);
        assert!(dictionary.matches_in(&normalize("ログインできない")).is_empty());
    }

    #[test]
    fn load_from_file_round_trips() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("domain-dictionary.json");
        std::fs::write(&path, "[\"教室\", \"会員管理\"]").expect("write");

        let dictionary = DomainDictionary::load_from_file(&path).expect("load");
        assert_eq!(dictionary.len(), 2);
    }
}
