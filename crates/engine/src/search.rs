//! Search relevance for palette queries.
//!
//! Match quality tiers, best first: exact label, label prefix, word prefix,
//! label substring, keyword/description hit, fuzzy subsequence. Commands
//! that match none of these are dropped from the palette.

use serde::Serialize;

use crate::command::Command;

/// How a query matched a command.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchQuality {
    Fuzzy,
    Keyword,
    Substring,
    WordPrefix,
    Prefix,
    Exact,
}

impl MatchQuality {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Prefix => "prefix",
            Self::WordPrefix => "word_prefix",
            Self::Substring => "substring",
            Self::Keyword => "keyword",
            Self::Fuzzy => "fuzzy",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct SearchMatch {
    pub quality: MatchQuality,
    /// Relevance in `(0, 1]`.
    pub score: f64,
}

impl SearchMatch {
    fn new(quality: MatchQuality, score: f64) -> Self {
        Self { quality, score }
    }
}

const FUZZY_FLOOR: f64 = 0.1;
const FUZZY_CEIL: f64 = 0.4;

/// Simple substring match scorer over a single haystack.
pub fn score_text_match(needle: &str, haystack: &str) -> Option<SearchMatch> {
    let needle_lower = needle.trim().to_lowercase();
    if needle_lower.is_empty() {
        return None;
    }
    let haystack_lower = haystack.to_lowercase();

    // Exact match (highest)
    if haystack_lower == needle_lower {
        return Some(SearchMatch::new(MatchQuality::Exact, 1.0));
    }

    // Prefix match (high)
    if haystack_lower.starts_with(&needle_lower) {
        return Some(SearchMatch::new(MatchQuality::Prefix, 0.9));
    }

    // Word boundary match (needle matches start of any word)
    let word_hit = haystack_lower
        .split(|c: char| c.is_whitespace() || c == '-' || c == '_' || c == '/')
        .any(|word| !word.is_empty() && word.starts_with(&needle_lower));
    if word_hit {
        return Some(SearchMatch::new(MatchQuality::WordPrefix, 0.8));
    }

    // Contains match (medium)
    if haystack_lower.contains(&needle_lower) {
        return Some(SearchMatch::new(MatchQuality::Substring, 0.7));
    }

    None
}

/// Ordered-subsequence match. Tighter spans score higher.
pub fn score_fuzzy_match(needle: &str, haystack: &str) -> Option<SearchMatch> {
    let needle: Vec<char> = needle
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    if needle.is_empty() {
        return None;
    }
    let haystack: Vec<char> = haystack.to_lowercase().chars().collect();

    let mut next = 0;
    let mut first = None;
    let mut last = 0;
    for (i, c) in haystack.iter().enumerate() {
        if next < needle.len() && *c == needle[next] {
            first.get_or_insert(i);
            last = i;
            next += 1;
        }
    }
    if next < needle.len() {
        return None;
    }

    let span = (last - first.unwrap_or(0) + 1) as f64;
    let compactness = needle.len() as f64 / span;
    Some(SearchMatch::new(
        MatchQuality::Fuzzy,
        FUZZY_FLOOR + (FUZZY_CEIL - FUZZY_FLOOR) * compactness,
    ))
}

/// Match a query against a command's label, keywords and description.
///
/// Returns `None` for a blank query as well as for a miss; callers treat a
/// blank query as "no search".
pub fn match_command(command: &Command, query: &str) -> Option<SearchMatch> {
    if query.trim().is_empty() {
        return None;
    }

    if let Some(m) = score_text_match(query, &command.label) {
        return Some(m);
    }

    // Keyword and description hits share one lower tier
    let keyword_hit = command
        .keywords
        .iter()
        .any(|k| score_text_match(query, k).is_some());
    let description_hit = command
        .description
        .as_deref()
        .is_some_and(|d| score_text_match(query, d).is_some());
    if keyword_hit || description_hit {
        return Some(SearchMatch::new(MatchQuality::Keyword, 0.5));
    }

    score_fuzzy_match(query, &command.label)
}
