use std::collections::HashSet;

/// Labels that never appear in results, regardless of caller flags.
pub const ALWAYS_EXCLUDED_LABELS: &[&str] = &["アーカイブ", "フォルダ"];

/// Caller-toggleable visibility flags. A label governed by a flag is excluded
/// while its flag is false.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LabelPolicyFlags {
    pub include_meeting_notes: bool,
    pub include_archived: bool,
}

/// Single source of truth for visibility policy: every retriever and the
/// final filter derive their exclusions from these two functions, so the
/// sources cannot disagree on what is filterable.
pub fn build_exclude_set(flags: &LabelPolicyFlags) -> HashSet<String> {
    let mut exclude: HashSet<String> = ALWAYS_EXCLUDED_LABELS
        .iter()
        .map(|label| label.to_lowercase())
        .collect();

    if !flags.include_meeting_notes {
        exclude.insert("議事録".to_lowercase());
    }
    if !flags.include_archived {
        exclude.insert("過去ログ".to_lowercase());
    }

    exclude
}

/// Case-insensitive set-intersection test.
pub fn is_excluded(labels: &[String], exclude: &HashSet<String>) -> bool {
    labels
        .iter()
        .any(|label| exclude.contains(&label.to_lowercase()))
}
