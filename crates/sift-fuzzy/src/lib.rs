//! Fuzzy matching primitives used by the completion engine.
//!
//! Matching works on `char`s and is case-insensitive (simple lowercase
//! folding). Columns and match indices are character offsets.
//!
//! Two scorers are exposed. [`subsequence_score`] ranks purely on the shape of
//! the subsequence match, while [`fuzzy_match`] additionally fast-paths prefix
//! matches so they always outrank fuzzy ones. [`find_words_with_subsequence`]
//! scans a text snapshot for distinct words matching a query.

#![forbid(unsafe_code)]

mod scoring;
mod words;

pub use scoring::{
    fuzzy_match, match_indices, subsequence_score, FuzzyMatcher, MatchKind, MatchScore,
};
pub use words::{find_words_with_subsequence, WordBoundary, WordMatch, WordSearch};
