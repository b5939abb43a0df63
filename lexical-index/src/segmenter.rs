use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Context;
use tracing::debug;
use unicode_normalization::UnicodeNormalization;

/// Particles and filler words that carry no lexical signal on their own.
pub const STOP_WORDS: &[&str] = &[
    "の", "を", "に", "は", "が", "で", "と", "も", "や", "へ", "から", "まで", "より", "など",
    "です", "ます", "ある", "いる", "する", "した", "して", "ください", "について", "ついて",
    "こと", "もの", "ため", "よう", "どう", "どこ", "になる", "される", "できる", "したい",
    "the", "a", "an", "of", "to", "and", "for", "in", "is",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScriptClass {
    Ideograph,
    Hiragana,
    Katakana,
    Alnum,
    Other,
}

fn script_class(c: char) -> ScriptClass {
    match c {
        '\u{4E00}'..='\u{9FFF}' | '\u{3400}'..='\u{4DBF}' | '々' => ScriptClass::Ideograph,
        '\u{3040}'..='\u{309F}' => ScriptClass::Hiragana,
        '\u{30A0}'..='\u{30FF}' => ScriptClass::Katakana,
        _ if c.is_ascii_alphanumeric() => ScriptClass::Alnum,
        _ => ScriptClass::Other,
    }
}

/// Term dictionary backing longest-match segmentation. Harvested offline from
/// the corpus; one JSON array of surface forms.
#[derive(Debug)]
pub struct SegmenterDictionary {
    terms: HashSet<String>,
    max_term_chars: usize,
}

impl SegmenterDictionary {
    pub fn from_terms<I: IntoIterator<Item = String>>(terms: I) -> Self {
        let terms: HashSet<String> = terms
            .into_iter()
            .map(|term| normalize(&term))
            .filter(|term| !term.is_empty())
            .collect();
        let max_term_chars = terms.iter().map(|t| t.chars().count()).max().unwrap_or(0);
        Self {
            terms,
            max_term_chars,
        }
    }

    pub fn load_from_file(path: &std::path::Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading segmenter dictionary at {}", path.display()))?;
        let terms: Vec<String> =
            serde_json::from_str(&raw).context("parsing segmenter dictionary JSON")?;
        debug!(terms = terms.len(), "Loaded segmenter dictionary");
        Ok(Self::from_terms(terms))
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    fn contains(&self, term: &str) -> bool {
        self.terms.contains(term)
    }
}

/// NFKC-normalize and lowercase; applied to every string before tokenization
/// so build-time and query-time token streams agree.
pub fn normalize(text: &str) -> String {
    text.nfkc().collect::<String>().to_lowercase()
}

/// Drops markup before indexing: HTML-ish tags and wiki macro braces. The
/// body text stored upstream is mostly plain but issue-tracker pages carry
/// remnants of both.
pub fn strip_markup(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_tag = false;
    let mut in_macro = false;

    for c in text.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => {
                in_tag = false;
                out.push(' ');
            }
            '{' => in_macro = true,
            '}' if in_macro => {
                in_macro = false;
                out.push(' ');
            }
            _ if in_tag || in_macro => {}
            _ => out.push(c),
        }
    }

    out
}

/// Language-aware tokenizer.
///
/// Text is first split on script-class boundaries (ideograph / hiragana /
/// katakana / alphanumeric). When a term dictionary is loaded, ideograph and
/// katakana runs are further segmented by greedy longest match against it;
/// without a dictionary the raw runs are the tokens, which is the lightweight
/// fallback mode used before the dictionary has loaded.
#[derive(Debug, Clone, Default)]
pub struct Segmenter {
    dictionary: Option<Arc<SegmenterDictionary>>,
}

impl Segmenter {
    pub fn new(dictionary: Option<Arc<SegmenterDictionary>>) -> Self {
        Self { dictionary }
    }

    pub fn has_dictionary(&self) -> bool {
        self.dictionary.is_some()
    }

    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let normalized = normalize(text);
        let mut tokens = Vec::new();

        for (class, run) in script_runs(&normalized) {
            match class {
                ScriptClass::Other => {}
                // Short hiragana runs are almost always okurigana or particles.
                ScriptClass::Hiragana => {
                    if run.chars().count() >= 3 && !is_stop_word(&run) {
                        tokens.push(run);
                    }
                }
                ScriptClass::Alnum => {
                    if !is_stop_word(&run) {
                        tokens.push(run);
                    }
                }
                ScriptClass::Ideograph | ScriptClass::Katakana => {
                    self.segment_run(&run, &mut tokens);
                }
            }
        }

        tokens
    }

    // Greedy longest match over one script run; unmatched stretches between
    // dictionary hits are flushed as single tokens so the fallback and the
    // dictionary path produce the same stream for out-of-vocabulary text.
    fn segment_run(&self, run: &str, tokens: &mut Vec<String>) {
        let Some(dictionary) = self.dictionary.as_deref() else {
            if run.chars().count() >= 2 {
                tokens.push(run.to_owned());
            }
            return;
        };

        let chars: Vec<char> = run.chars().collect();
        let mut pending = String::new();
        let mut i = 0;

        while i < chars.len() {
            let mut matched = None;
            let longest = dictionary.max_term_chars.min(chars.len() - i);
            for len in (1..=longest).rev() {
                let candidate: String = chars[i..i + len].iter().collect();
                if dictionary.contains(&candidate) {
                    matched = Some((candidate, len));
                    break;
                }
            }

            match matched {
                Some((term, len)) => {
                    flush_pending(&mut pending, tokens);
                    tokens.push(term);
                    i += len;
                }
                None => {
                    pending.push(chars[i]);
                    i += 1;
                }
            }
        }

        flush_pending(&mut pending, tokens);
    }
}

fn is_stop_word(token: &str) -> bool {
    STOP_WORDS.contains(&token)
}

// Out-of-vocabulary stretches shorter than two chars are noise, not terms.
fn flush_pending(pending: &mut String, tokens: &mut Vec<String>) {
    if pending.chars().count() >= 2 {
        tokens.push(std::mem::take(pending));
    } else {
        pending.clear();
    }
}

fn script_runs(text: &str) -> Vec<(ScriptClass, String)> {
    let mut runs: Vec<(ScriptClass, String)> = Vec::new();

    for c in text.chars() {
        let class = script_class(c);
        match runs.last_mut() {
            Some((last_class, run)) if *last_class == class => run.push(c),
            _ => runs.push((class, c.to_string())),
        }
    }

    runs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_splits_on_script_boundaries() {
        let segmenter = Segmenter::default();
        let tokens = segmenter.tokenize("ログイン機能の詳細を教えて");

        assert_eq!(tokens, vec!["ログイン", "機能", "詳細"]);
    }

    #[test]
    fn fallback_keeps_ascii_runs_lowercased() {
        let segmenter = Segmenter::default();
        let tokens = segmenter.tokenize("APIキーの設定方法");

        assert_eq!(tokens, vec!["api", "キー", "設定方法"]);
    }

    #[test]
    fn dictionary_splits_compound_ideograph_runs() {
        let dictionary = Arc::new(SegmenterDictionary::from_terms(
            ["教室", "削除", "機能"].map(String::from),
        ));
        let segmenter = Segmenter::new(Some(dictionary));
        let tokens = segmenter.tokenize("教室削除機能");

        assert_eq!(tokens, vec!["教室", "削除", "機能"]);
    }

    #[test]
    fn unmatched_stretch_between_dictionary_hits_stays_one_token() {
        let dictionary = Arc::new(SegmenterDictionary::from_terms(
            ["機能"].map(String::from),
        ));
        let segmenter = Segmenter::new(Some(dictionary));
        let tokens = segmenter.tokenize("教室削除機能");

        assert_eq!(tokens, vec!["教室削除", "機能"]);
    }

    #[test]
    fn normalization_folds_fullwidth_ascii() {
        assert_eq!(normalize("ＡＰＩ１２３"), "api123");
    }

    #[test]
    fn strip_markup_removes_tags_and_macros() {
        let stripped = strip_markup("<p>ログイン</p>{toc}機能");
        let segmenter = Segmenter::default();

        assert_eq!(segmenter.tokenize(&stripped), vec!["ログイン", "機能"]);
    }

    #[test]
    fn particles_are_dropped() {
        let segmenter = Segmenter::default();
        let tokens = segmenter.tokenize("エラーの条件について");

        assert_eq!(tokens, vec!["エラー", "条件"]);
    }
}
