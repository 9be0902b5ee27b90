use std::collections::HashMap;
use std::sync::OnceLock;

use parking_lot::Mutex;
use sift_core::ScopeChain;

use crate::Selector;

/// Memoized `(selector, chain) -> bool` results, keyed by the selector text
/// and the rendered chain string (see [`ScopeChain::to_chain_string`]).
///
/// Entries are never evicted; the key space is bounded by the distinct scope
/// chains an editor session produces.
#[derive(Debug, Default)]
pub struct MatchCache {
    entries: Mutex<HashMap<String, HashMap<String, bool>>>,
}

static GLOBAL: OnceLock<MatchCache> = OnceLock::new();

/// A chain split into per-element class lists, with the rendered string of
/// every right-truncation.
struct PreparedChain<'a> {
    elements: Vec<Vec<&'a str>>,
    rendered: String,
    /// `rendered[..ends[k]]` renders the first `k + 1` elements.
    ends: Vec<usize>,
}

impl<'a> PreparedChain<'a> {
    fn new(chain: &'a ScopeChain) -> Self {
        let rendered = chain.to_chain_string();
        let mut ends = Vec::with_capacity(chain.len());
        let mut len = 0;
        for (idx, scope) in chain.scopes().iter().enumerate() {
            // ".scope", plus the separating space after the first element.
            len += scope.len() + 1 + usize::from(idx > 0);
            ends.push(len);
        }
        Self {
            elements: chain
                .scopes()
                .iter()
                .map(|scope| scope.split('.').collect())
                .collect(),
            rendered,
            ends,
        }
    }

    fn truncated(&self, len: usize) -> (&[Vec<&'a str>], &str) {
        (&self.elements[..len], &self.rendered[..self.ends[len - 1]])
    }
}

impl MatchCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide cache used by the free functions of this crate.
    pub fn global() -> &'static MatchCache {
        GLOBAL.get_or_init(MatchCache::new)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    fn matches_exactly(&self, selector: &Selector, elements: &[Vec<&str>], rendered: &str) -> bool {
        if let Some(&hit) = self
            .entries
            .lock()
            .get(selector.source())
            .and_then(|by_chain| by_chain.get(rendered))
        {
            return hit;
        }

        let hit = selector.matches_elements(elements);
        self.entries
            .lock()
            .entry(selector.source().to_owned())
            .or_default()
            .insert(rendered.to_owned(), hit);
        hit
    }

    /// Whether any selector matches some right-truncation of `chain`.
    pub fn matches(&self, selectors: &[Selector], chain: &ScopeChain) -> bool {
        if selectors.is_empty() || chain.is_empty() {
            return false;
        }
        let prepared = PreparedChain::new(chain);
        (1..=chain.len()).rev().any(|len| {
            let (elements, rendered) = prepared.truncated(len);
            selectors
                .iter()
                .any(|selector| self.matches_exactly(selector, elements, rendered))
        })
    }

    /// Walk right-truncations from the full chain down; at the first length
    /// where anything matches, return the most specific match (first wins ties).
    pub fn best_match<'s>(&self, selectors: &'s [Selector], chain: &ScopeChain) -> Option<&'s Selector> {
        if selectors.is_empty() || chain.is_empty() {
            return None;
        }
        let prepared = PreparedChain::new(chain);
        for len in (1..=chain.len()).rev() {
            let (elements, rendered) = prepared.truncated(len);
            let mut best: Option<&Selector> = None;
            for selector in selectors {
                if !self.matches_exactly(selector, elements, rendered) {
                    continue;
                }
                if best.map_or(true, |b| selector.specificity() > b.specificity()) {
                    best = Some(selector);
                }
            }
            if best.is_some() {
                return best;
            }
        }
        None
    }
}
