/// How a candidate matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    /// The candidate starts with the query (case-insensitive).
    Prefix,
    /// The query is a scattered subsequence of the candidate.
    Fuzzy,
}

/// Score returned by [`fuzzy_match`]; compare `score` only within one query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchScore {
    pub kind: MatchKind,
    pub score: i32,
}

const MATCH: i32 = 10;
const BOUNDARY_BONUS: i32 = 15;
const ADJACENT_BONUS: i32 = 5;
const SAME_CASE_BONUS: i32 = 2;
/// Per skipped candidate character between two matched ones.
const GAP_PENALTY: i32 = 1;
/// Per candidate character before the first match.
const LEADING_PENALTY: i32 = 1;
/// Per candidate character after the last match.
const TRAILING_PENALTY: i32 = 1;

/// Prefix matches score this minus the candidate length in characters.
const PREFIX_SCORE: i32 = 1_000_000;

#[inline]
fn fold(ch: char) -> char {
    ch.to_lowercase().next().unwrap_or(ch)
}

/// Whether `cur` (preceded by `prev`) starts a word: after punctuation or
/// whitespace, at a lower-to-upper hump, or at a letter/digit transition.
fn starts_word(prev: char, cur: char) -> bool {
    !prev.is_alphanumeric()
        || (prev.is_lowercase() && cur.is_uppercase())
        || (prev.is_alphabetic() && cur.is_numeric())
        || (prev.is_numeric() && cur.is_alphabetic())
}

/// Best alignment of the query prefix `..=i` ending at candidate char `j`.
#[derive(Debug, Clone, Copy)]
struct Cell {
    score: i32,
    /// Candidate index matched by query char `i - 1`.
    from: usize,
}

/// A query compiled for repeated scoring. Scratch buffers are reused across
/// candidates.
#[derive(Debug, Clone)]
pub struct FuzzyMatcher {
    query: String,
    chars: Vec<char>,
    folded: Vec<char>,
    candidate: Vec<char>,
    word_start: Vec<bool>,
    table: Vec<Option<Cell>>,
}

impl FuzzyMatcher {
    pub fn new(query: &str) -> Self {
        let chars: Vec<char> = query.chars().collect();
        let folded = chars.iter().copied().map(fold).collect();
        Self {
            query: query.to_owned(),
            chars,
            folded,
            candidate: Vec::new(),
            word_start: Vec::new(),
            table: Vec::new(),
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// Alternate scoring: a candidate that starts with the query beats any
    /// scattered match, and shorter prefix matches beat longer ones.
    pub fn score(&mut self, candidate: &str) -> Option<MatchScore> {
        if self.chars.is_empty() {
            return Some(MatchScore {
                kind: MatchKind::Prefix,
                score: 0,
            });
        }

        let mut candidate_chars = candidate.chars();
        let is_prefix = self
            .folded
            .iter()
            .all(|&q| candidate_chars.next().is_some_and(|c| fold(c) == q));
        if is_prefix {
            let len = i32::try_from(candidate.chars().count()).unwrap_or(i32::MAX);
            return Some(MatchScore {
                kind: MatchKind::Prefix,
                score: PREFIX_SCORE.saturating_sub(len),
            });
        }

        self.subsequence_score(candidate).map(|score| MatchScore {
            kind: MatchKind::Fuzzy,
            score,
        })
    }

    /// Score of the best case-insensitive subsequence alignment, or `None`
    /// when the query is not a subsequence of `candidate`.
    pub fn subsequence_score(&mut self, candidate: &str) -> Option<i32> {
        self.align(candidate).map(|(score, _)| score)
    }

    /// Like [`FuzzyMatcher::subsequence_score`], also returning the character
    /// indices of `candidate` used by the best alignment.
    pub fn subsequence_match(&mut self, candidate: &str) -> Option<(i32, Vec<usize>)> {
        let (score, end) = self.align(candidate)?;
        Some((score, self.backtrack(end)))
    }

    /// Fill the alignment table; returns the best score and the candidate
    /// index the last query char landed on.
    fn align(&mut self, candidate: &str) -> Option<(i32, usize)> {
        self.candidate.clear();
        self.candidate.extend(candidate.chars());
        let m = self.chars.len();
        let n = self.candidate.len();
        if m == 0 {
            return Some((0, 0));
        }
        if m > n {
            return None;
        }

        self.word_start.clear();
        let candidate = &self.candidate;
        self.word_start
            .extend((0..n).map(|j| j == 0 || starts_word(candidate[j - 1], candidate[j])));
        self.table.clear();
        self.table.resize(m * n, None);

        for i in 0..m {
            // Best `score + GAP_PENALTY * k` over the previous row up to `j - 2`.
            let mut gapped: Option<(i32, usize)> = None;
            for j in i..n {
                if i > 0 && j >= 2 {
                    if let Some(cell) = self.table[(i - 1) * n + j - 2] {
                        let lifted = cell.score + GAP_PENALTY * (j - 2) as i32;
                        if gapped.map_or(true, |(best, _)| lifted > best) {
                            gapped = Some((lifted, j - 2));
                        }
                    }
                }

                let c = self.candidate[j];
                if fold(c) != self.folded[i] {
                    continue;
                }
                let mut gain = MATCH;
                if self.word_start[j] {
                    gain += BOUNDARY_BONUS;
                }
                if c == self.chars[i] {
                    gain += SAME_CASE_BONUS;
                }

                let cell = if i == 0 {
                    Some(Cell {
                        score: gain - LEADING_PENALTY * j as i32,
                        from: 0,
                    })
                } else {
                    let adjacent = self.table[(i - 1) * n + j - 1].map(|prev| Cell {
                        score: prev.score + ADJACENT_BONUS + gain,
                        from: j - 1,
                    });
                    let skipped = gapped.map(|(lifted, k)| Cell {
                        score: lifted - GAP_PENALTY * (j - 1) as i32 + gain,
                        from: k,
                    });
                    match (adjacent, skipped) {
                        (Some(a), Some(s)) => Some(if s.score > a.score { s } else { a }),
                        (a, s) => a.or(s),
                    }
                };
                self.table[i * n + j] = cell;
            }
        }

        let last = (m - 1) * n;
        (m - 1..n)
            .filter_map(|j| {
                self.table[last + j]
                    .map(|cell| (cell.score - TRAILING_PENALTY * (n - 1 - j) as i32, j))
            })
            .fold(None, |best: Option<(i32, usize)>, (score, j)| match best {
                Some((best_score, _)) if best_score >= score => best,
                _ => Some((score, j)),
            })
    }

    fn backtrack(&self, end: usize) -> Vec<usize> {
        let m = self.chars.len();
        let n = self.candidate.len();
        let mut indices = vec![0; m];
        let mut j = end;
        for i in (0..m).rev() {
            indices[i] = j;
            if i > 0 {
                j = self.table[i * n + j].map_or(0, |cell| cell.from);
            }
        }
        indices
    }
}

/// Alternate scorer: prefix matches first, then subsequence matches.
pub fn fuzzy_match(query: &str, candidate: &str) -> Option<MatchScore> {
    FuzzyMatcher::new(query).score(candidate)
}

/// Standard scorer: the subsequence alignment score alone.
pub fn subsequence_score(query: &str, candidate: &str) -> Option<i32> {
    FuzzyMatcher::new(query).subsequence_score(candidate)
}

/// Character indices of `candidate` matched by `query` in the best-scoring
/// alignment.
pub fn match_indices(query: &str, candidate: &str) -> Option<Vec<usize>> {
    FuzzyMatcher::new(query)
        .subsequence_match(candidate)
        .map(|(_, indices)| indices)
}
