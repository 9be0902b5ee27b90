use sift_core::ScopeChain;
use sift_provider::{ProviderOptions, ProviderRegistry, DEFAULT_LABEL};

use super::{names, registry_with, stub};

fn labelled_registry() -> ProviderRegistry {
    let mut provider2 = ProviderOptions::scope_selector(".source.js .variable.js")
        .with_disable_for_scope_selector(".source.js .variable.js .comment2");
    provider2.disable_default_provider_selector = Some(".source.js .variable.js .comment3".into());

    registry_with(&[
        stub("provider1", ProviderOptions::scope_selector(".source.js")),
        stub("provider2", provider2),
        stub("provider3", ProviderOptions::scope_selector("*")),
        stub(
            "provider4",
            ProviderOptions::scope_selector(".source.js .comment")
                .with_labels([DEFAULT_LABEL, "label1"]),
        ),
        stub(
            "provider5",
            ProviderOptions::scope_selector("*").with_labels(["label1"]),
        ),
    ])
}

fn applicable(registry: &ProviderRegistry, labels: &[&str], chain: &str) -> Vec<String> {
    names(&registry.applicable_sources(labels, &ScopeChain::parse(chain)))
        .into_iter()
        .map(str::to_owned)
        .collect()
}

#[test]
fn orders_by_priority_then_specificity() {
    let registry = labelled_registry();
    let center = [DEFAULT_LABEL];

    assert_eq!(applicable(&registry, &center, ".source.other"), ["provider3", "builtin"]);
    assert_eq!(
        applicable(&registry, &center, ".source.js"),
        ["provider1", "provider3", "builtin"]
    );
    assert_eq!(
        applicable(&registry, &center, ".source.js .comment"),
        ["provider4", "provider1", "provider3", "builtin"]
    );
    assert_eq!(
        applicable(&registry, &center, ".source.js .variable.js"),
        ["provider2", "provider1", "provider3", "builtin"]
    );
    assert_eq!(
        applicable(&registry, &center, ".source.js .other.js"),
        ["provider1", "provider3", "builtin"]
    );
}

#[test]
fn labels_select_the_candidate_set() {
    let registry = labelled_registry();

    assert_eq!(
        applicable(&registry, &["label1"], ".source.js .comment"),
        ["provider4", "provider5"]
    );
    assert_eq!(
        applicable(&registry, &["label1", DEFAULT_LABEL], ".source.js .comment").len(),
        5
    );
    assert!(applicable(&registry, &["elsewhere"], ".source.js").is_empty());
}

#[test]
fn scope_blacklist_short_circuits() {
    let registry = labelled_registry();
    let center = [DEFAULT_LABEL];
    assert_eq!(applicable(&registry, &center, ".source.js .comment").len(), 4);

    registry.set_scope_blacklist(&[".source.js .comment".to_owned()]);
    assert!(applicable(&registry, &center, ".source.js .comment").is_empty());

    registry.set_scope_blacklist(&[".source.js *".to_owned()]);
    assert!(applicable(&registry, &center, ".source.js .comment").is_empty());
    assert!(applicable(&registry, &center, ".source.js .comment .other").is_empty());

    registry.set_scope_blacklist(&[".source.coffee *".to_owned()]);
    assert_eq!(applicable(&registry, &center, ".source.js .comment").len(), 4);
}

#[test]
fn disable_patterns_drop_the_source() {
    let registry = labelled_registry();
    let center = [DEFAULT_LABEL];

    assert_eq!(
        applicable(&registry, &center, ".source.js .variable.js .other.js"),
        ["provider2", "provider1", "provider3", "builtin"]
    );
    assert_eq!(
        applicable(&registry, &center, ".source.js .variable.js .comment2.js"),
        ["provider1", "provider3", "builtin"]
    );
}

#[test]
fn default_provider_selector_suppresses_the_builtin() {
    let registry = labelled_registry();

    assert_eq!(
        applicable(&registry, &[DEFAULT_LABEL], ".source.js .variable.js .comment3.js"),
        ["provider2", "provider1", "provider3"]
    );
}

fn inclusion_registry() -> ProviderRegistry {
    registry_with(&[
        stub(
            "accessory1",
            ProviderOptions::scope_selector("*").with_inclusion_priority(2, false),
        ),
        stub(
            "accessory2",
            ProviderOptions::scope_selector(".source.js").with_inclusion_priority(2, false),
        ),
        stub(
            "very_specific",
            ProviderOptions::scope_selector(".source.js .comment").with_inclusion_priority(2, true),
        ),
        stub(
            "main",
            ProviderOptions::scope_selector(".source.js").with_inclusion_priority(1, true),
        ),
    ])
}

#[test]
fn lower_priorities_survive_without_an_excluding_source() {
    let registry = inclusion_registry();
    assert_eq!(
        applicable(&registry, &[DEFAULT_LABEL], ".source.coffee"),
        ["accessory1", "builtin"]
    );
}

#[test]
fn excluding_source_drops_lower_inclusion_priorities() {
    let registry = inclusion_registry();
    assert_eq!(
        applicable(&registry, &[DEFAULT_LABEL], ".source.js"),
        ["accessory2", "main", "accessory1"]
    );
    assert_eq!(
        applicable(&registry, &[DEFAULT_LABEL], ".source.js .comment"),
        ["very_specific", "accessory2", "accessory1"]
    );
}

#[test]
fn equal_suggestion_priorities_sort_by_specificity() {
    let registry = registry_with(&[
        stub("provider1", ProviderOptions::scope_selector("*").with_suggestion_priority(2)),
        stub(
            "provider2",
            ProviderOptions::scope_selector(".source.js").with_suggestion_priority(3),
        ),
        stub(
            "provider3",
            ProviderOptions::scope_selector(".source.js .comment").with_suggestion_priority(2),
        ),
    ]);

    assert_eq!(
        applicable(&registry, &[DEFAULT_LABEL], ".source.js .comment"),
        ["provider2", "provider3", "provider1", "builtin"]
    );
}

#[test]
fn comma_alternatives_use_the_most_specific_match() {
    let registry = registry_with(&[
        stub("broad", ProviderOptions::scope_selector(".source.js")),
        stub("either", ProviderOptions::scope_selector(".text, .source.js .string.quoted")),
    ]);

    assert_eq!(
        applicable(&registry, &[DEFAULT_LABEL], ".source.js .string.quoted.double"),
        ["either", "broad", "builtin"]
    );
}
