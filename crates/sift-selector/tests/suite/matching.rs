use sift_core::ScopeChain;
use sift_selector::{best_match, matches, MatchCache, Selector};

fn chain(scopes: &[&str]) -> ScopeChain {
    ScopeChain::new(scopes.iter().copied())
}

fn sel(pattern: &str) -> Vec<Selector> {
    Selector::parse(pattern).unwrap()
}

#[test]
fn matches_outer_scope_from_nested_position() {
    let js = chain(&["source.js", "string.quoted.double.js", "punctuation.definition.string"]);

    assert!(matches(&sel(".source.js"), &js));
    assert!(matches(&sel(".source.js .string"), &js));
    assert!(matches(&sel(".source .string.quoted"), &js));
    assert!(matches(&sel("*"), &js));
    assert!(!matches(&sel(".source.coffee"), &js));
    assert!(!matches(&sel(".comment"), &js));
}

#[test]
fn child_combinator_respects_truncation() {
    let js = chain(&["source.js", "string.quoted", "punctuation"]);

    assert!(matches(&sel(".source > .string"), &js));
    assert!(!matches(&sel(".source > .punctuation"), &js));
}

#[test]
fn any_alternative_is_enough() {
    let css = chain(&["source.css", "meta.property-list"]);
    assert!(matches(&sel(".source.js, .source.css"), &css));
    assert!(!matches(&sel(".source.js, .text.html"), &css));
}

#[test]
fn best_match_uses_the_longest_matching_truncation() {
    let js = chain(&["source.js", "comment.block"]);
    let selectors = sel(".source.js.es6.jsx, .comment, .source.js");

    // `.comment` matches the full chain; `.source.js` only a truncation.
    assert_eq!(best_match(&selectors, &js).unwrap().source(), ".comment");
}

#[test]
fn isolated_cache_agrees_with_global_cache() {
    let cache = MatchCache::new();
    let selectors = sel(".text.html .source.js, .source.js > .string");
    for scopes in [
        &["text.html.basic", "source.js.embedded", "string"][..],
        &["source.js", "string"][..],
        &["source.js", "meta", "string"][..],
        &["text.plain"][..],
    ] {
        let c = chain(scopes);
        assert_eq!(cache.matches(&selectors, &c), matches(&selectors, &c), "{c}");
    }
}
