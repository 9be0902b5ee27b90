//! Scope selectors: CSS-like patterns over scope chains.
//!
//! A pattern such as `.source.js .string, .comment` is parsed into one
//! [`Selector`] per comma-separated alternative. Matching works right to
//! left and also considers every right-truncation of the chain, so a
//! selector written for an outer scope still applies inside nested scopes.

#![forbid(unsafe_code)]

mod cache;
mod parse;

use sift_core::ScopeChain;

pub use cache::MatchCache;
pub use parse::{Combinator, Compound, Selector, SelectorError};

/// Parse `pattern`, logging and discarding it when malformed.
///
/// Malformed patterns degrade to "matches nothing".
pub fn parse_or_warn(pattern: &str) -> Vec<Selector> {
    match Selector::parse(pattern) {
        Ok(selectors) => selectors,
        Err(err) => {
            tracing::warn!(target: "sift.selector", pattern, error = %err, "ignoring malformed selector");
            Vec::new()
        }
    }
}

/// Whether any of `selectors` matches `chain`, using the process-wide cache.
pub fn matches(selectors: &[Selector], chain: &ScopeChain) -> bool {
    MatchCache::global().matches(selectors, chain)
}

/// The most specific selector matching the longest matchable truncation of
/// `chain`, using the process-wide cache.
pub fn best_match<'a>(selectors: &'a [Selector], chain: &ScopeChain) -> Option<&'a Selector> {
    MatchCache::global().best_match(selectors, chain)
}

/// Specificity of [`best_match`], or 0 when nothing matches.
pub fn specificity_for(selectors: &[Selector], chain: &ScopeChain) -> u32 {
    best_match(selectors, chain).map_or(0, Selector::specificity)
}
