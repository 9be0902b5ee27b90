//! Distinct-word subsequence search over a text snapshot.

use std::collections::{HashMap, HashSet};
use std::ops::RangeInclusive;

use sift_core::{LineIndex, Point};

use crate::scoring::FuzzyMatcher;

/// How a line is split into words.
#[derive(Debug, Clone, Copy)]
pub enum WordBoundary<'a> {
    /// Words are runs of alphanumeric characters plus the given extras.
    WordCharacters { extra: &'a str },
    /// Words are runs of anything except whitespace and the given separators.
    Separators(&'a str),
}

impl WordBoundary<'_> {
    #[inline]
    fn is_word_char(&self, ch: char) -> bool {
        match self {
            WordBoundary::WordCharacters { extra } => ch.is_alphanumeric() || extra.contains(ch),
            WordBoundary::Separators(separators) => {
                !ch.is_whitespace() && !separators.contains(ch)
            }
        }
    }
}

/// A distinct word matching the query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordMatch {
    pub word: String,
    pub score: i32,
    /// Start of every occurrence, in document order.
    pub positions: Vec<Point>,
    /// Character indices within `word` matched by the query.
    pub match_indices: Vec<usize>,
}

/// Parameters for [`find_words_with_subsequence`].
#[derive(Debug, Clone)]
pub struct WordSearch<'a> {
    pub query: &'a str,
    pub boundary: WordBoundary<'a>,
    pub max_results: usize,
    /// Rows to scan; `None` scans the whole text.
    pub rows: Option<RangeInclusive<u32>>,
}

/// Collect the best `max_results` distinct words in `text` that contain the
/// query as a case-insensitive subsequence.
///
/// Results are ordered by score (descending), then by word length, then by
/// first occurrence.
pub fn find_words_with_subsequence(text: &str, search: &WordSearch<'_>) -> Vec<WordMatch> {
    if search.query.is_empty() || search.max_results == 0 {
        return Vec::new();
    }

    let index = LineIndex::new(text);
    let last_row = index.line_count().saturating_sub(1);
    let rows = match &search.rows {
        Some(rows) => *rows.start()..=(*rows.end()).min(last_row),
        None => 0..=last_row,
    };

    let mut matcher = FuzzyMatcher::new(search.query);
    let mut by_word: HashMap<&str, usize> = HashMap::new();
    let mut rejected: HashSet<&str> = HashSet::new();
    let mut matches: Vec<WordMatch> = Vec::new();

    for row in rows {
        let Some(line) = index.line_text(text, row) else {
            continue;
        };
        for (column, word) in words_in_line(line, search.boundary) {
            if let Some(&slot) = by_word.get(word) {
                matches[slot].positions.push(Point::new(row, column));
                continue;
            }
            if rejected.contains(word) {
                continue;
            }
            let Some((score, match_indices)) = matcher.subsequence_match(word) else {
                rejected.insert(word);
                continue;
            };
            by_word.insert(word, matches.len());
            matches.push(WordMatch {
                word: word.to_owned(),
                score,
                positions: vec![Point::new(row, column)],
                match_indices,
            });
        }
    }

    matches.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| a.word.len().cmp(&b.word.len()))
    });
    matches.truncate(search.max_results);
    matches
}

/// Yield `(start_column, word)` pairs for `line`.
fn words_in_line<'a>(
    line: &'a str,
    boundary: WordBoundary<'a>,
) -> impl Iterator<Item = (u32, &'a str)> + 'a {
    let mut chars = line.char_indices().enumerate().peekable();
    std::iter::from_fn(move || {
        // Skip to the next word start.
        let (column, start) = loop {
            let (column, (byte, ch)) = chars.next()?;
            if boundary.is_word_char(ch) {
                break (column, byte);
            }
        };
        let mut end = line.len();
        while let Some(&(_, (byte, ch))) = chars.peek() {
            if !boundary.is_word_char(ch) {
                end = byte;
                break;
            }
            chars.next();
        }
        Some((column as u32, &line[start..end]))
    })
}
