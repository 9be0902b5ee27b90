//! Per-source fuzzy filtering and near-duplicate removal.

use std::collections::HashSet;

use sift_config::SimilarSuggestionRemoval;
use sift_fuzzy::{fuzzy_match, match_indices, subsequence_score};
use sift_provider::Suggestion;

/// Scorer used when a source asks for its suggestions to be filtered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scorer {
    /// Pure subsequence-shape scoring.
    Standard,
    /// Prefix matches outrank every fuzzy match.
    Alternate,
}

impl Scorer {
    pub fn from_alternate_flag(use_alternate_scoring: bool) -> Self {
        if use_alternate_scoring {
            Scorer::Alternate
        } else {
            Scorer::Standard
        }
    }

    /// Positive score of `prefix` against `text`, or `None` when it does not match.
    fn score(self, prefix: &str, text: &str) -> Option<f64> {
        let raw = match self {
            Scorer::Standard => subsequence_score(prefix, text)?,
            Scorer::Alternate => fuzzy_match(prefix, text)?.score,
        };
        Some(f64::from(raw.max(1)))
    }
}

/// Rank-decay factor for the suggestion at `index` in its source's list.
#[inline]
pub fn rank_decay(index: usize) -> f64 {
    (3.0 - index as f64 / 10.0).max(0.0) + 1.0
}

fn first_char_matches(prefix: &str, text: &str) -> bool {
    match (prefix.chars().next(), text.chars().next()) {
        (Some(p), Some(t)) => p.to_lowercase().eq(t.to_lowercase()),
        _ => false,
    }
}

/// Re-score and re-rank one source's suggestions against their prefixes.
///
/// Each suggestion is scored against its own replacement prefix, falling back
/// to `prefix`. A blank prefix lets every suggestion through unscored; otherwise
/// the first characters must agree (case-insensitively) and the text must
/// contain the prefix as a subsequence.
pub fn filter_suggestions(
    suggestions: Vec<Suggestion>,
    prefix: &str,
    scorer: Scorer,
) -> Vec<Suggestion> {
    let mut results = Vec::with_capacity(suggestions.len());
    for (index, mut suggestion) in suggestions.into_iter().enumerate() {
        let sort_score = rank_decay(index);
        suggestion.sort_score = Some(sort_score);
        suggestion.score = None;

        let text = suggestion.insertion_text().unwrap_or_default().to_owned();
        let effective_prefix = suggestion
            .replacement_prefix
            .clone()
            .unwrap_or_else(|| prefix.to_owned());

        if effective_prefix.trim().is_empty() {
            results.push(suggestion);
            continue;
        }
        if !first_char_matches(&effective_prefix, &text) {
            continue;
        }
        let Some(score) = scorer.score(&effective_prefix, &text) else {
            continue;
        };
        suggestion.score = Some(score * sort_score);
        suggestion.character_match_indices = match_indices(&effective_prefix, &text);
        results.push(suggestion);
    }

    // Stable: equal keys keep the source's order.
    results.sort_by(|a, b| {
        let key = |s: &Suggestion| s.score.or(s.sort_score).unwrap_or(0.0);
        key(b)
            .total_cmp(&key(a))
            .then_with(|| {
                b.sort_score
                    .unwrap_or(0.0)
                    .total_cmp(&a.sort_score.unwrap_or(0.0))
            })
    });
    results
}

/// Collapse near-duplicates, keeping the first of each group.
pub fn remove_similar(
    suggestions: Vec<Suggestion>,
    strategy: SimilarSuggestionRemoval,
) -> Vec<Suggestion> {
    match strategy {
        SimilarSuggestionRemoval::None => suggestions,
        SimilarSuggestionRemoval::TextOrSnippet => {
            let mut seen = HashSet::new();
            suggestions
                .into_iter()
                .filter(|suggestion| seen.insert((suggestion.text.clone(), suggestion.snippet.clone())))
                .collect()
        }
    }
}
