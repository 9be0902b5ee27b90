use std::sync::Arc;
use std::time::Duration;

use sift_complete::{CycleOutcome, Orchestrator, RecordingConsumer, SubsequenceProvider};
use sift_config::{ConfigStore, SimilarSuggestionRemoval};
use sift_core::{DocumentId, Point, TextBuffer};
use sift_provider::{ApiVersion, ProviderOptions, ProviderRegistry, Source};

use super::{labels, Churning, Harness, LegacyRecorder, Reply, Scripted};

#[tokio::test]
async fn matching_source_results_are_displayed_in_order() {
    let harness = Harness::new("a", Point::new(0, 1));
    harness.register(Scripted::words("words", &["ab", "abc"]), ApiVersion::V4);

    assert_eq!(harness.orchestrator.activate(true).await, CycleOutcome::Displayed(2));
    assert_eq!(harness.displayed(), vec![labels(&["ab", "abc"])]);
    assert!(harness.orchestrator.is_list_active());
}

#[tokio::test]
async fn sources_are_merged_in_registry_order() {
    let harness = Harness::new("a", Point::new(0, 1));
    harness.register(
        Scripted::words("low", &["alpha"]).with_options(ProviderOptions::scope_selector("*")),
        ApiVersion::V4,
    );
    harness.register(
        Scripted::words("high", &["amber"])
            .with_options(ProviderOptions::scope_selector("*").with_suggestion_priority(5)),
        ApiVersion::V4,
    );

    harness.orchestrator.activate(false).await;
    assert_eq!(harness.displayed(), vec![labels(&["amber", "alpha"])]);
}

#[tokio::test(start_paused = true)]
async fn superseded_results_never_reach_the_consumer() {
    let harness = Harness::new("a", Point::new(0, 1));
    let provider = harness.register(
        Scripted::words("slow", &["second"]).then(Duration::from_millis(100), Reply::Words(vec!["first"])),
        ApiVersion::V4,
    );

    let first = tokio::spawn({
        let orchestrator = harness.orchestrator.clone();
        async move { orchestrator.activate(false).await }
    });
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(provider.calls(), 1);

    assert_eq!(harness.orchestrator.activate(false).await, CycleOutcome::Displayed(1));
    assert_eq!(first.await.unwrap(), CycleOutcome::Superseded);

    assert_eq!(harness.displayed(), vec![labels(&["second"])]);
    let metrics = harness.metrics.snapshot_for("slow");
    assert_eq!(metrics.request_count, 2);
    assert_eq!(metrics.stale_count, 1);
}

#[tokio::test]
async fn failing_sources_are_isolated() {
    let harness = Harness::new("a", Point::new(0, 1));
    harness.register(Scripted::words("good", &["abc"]), ApiVersion::V4);
    harness.register(Scripted::new("bad", Reply::Fail), ApiVersion::V4);
    harness.register(Scripted::new("boom", Reply::Panic), ApiVersion::V4);
    harness.register(Scripted::new("eager", Reply::PanicEagerly), ApiVersion::V4);
    harness.register(Scripted::new("silent", Reply::Nothing), ApiVersion::V4);

    assert_eq!(harness.orchestrator.activate(false).await, CycleOutcome::Displayed(1));
    assert_eq!(harness.displayed(), vec![labels(&["abc"])]);

    assert_eq!(harness.metrics.snapshot_for("good").request_count, 1);
    assert_eq!(harness.metrics.snapshot_for("bad").error_count, 1);
    assert_eq!(harness.metrics.snapshot_for("boom").panic_count, 1);
    assert_eq!(harness.metrics.snapshot_for("eager").panic_count, 1);
    assert_eq!(harness.metrics.snapshot_for("silent").error_count, 0);
}

#[tokio::test]
async fn empty_results_hide_an_open_list() {
    let harness = Harness::new("a", Point::new(0, 1));
    harness.register(
        Scripted::new("once", Reply::Nothing).then(Duration::ZERO, Reply::Words(vec!["abc"])),
        ApiVersion::V4,
    );

    assert_eq!(harness.orchestrator.activate(false).await, CycleOutcome::Displayed(1));
    assert_eq!(harness.orchestrator.activate(false).await, CycleOutcome::Hidden);
    assert_eq!(harness.hides(), 1);
    assert!(!harness.orchestrator.is_list_active());
}

#[tokio::test]
async fn nothing_applicable_skips_the_cycle() {
    let harness = Harness::new("a", Point::new(0, 1));
    harness.register(
        Scripted::words("python", &["abc"]).with_options(ProviderOptions::scope_selector(".source.python")),
        ApiVersion::V4,
    );
    assert_eq!(harness.orchestrator.activate(false).await, CycleOutcome::Skipped);
    assert!(harness.consumer.events().is_empty());
}

#[tokio::test]
async fn identical_suggestions_collapse_to_the_first() {
    let harness = Harness::new("a", Point::new(0, 1));
    harness.register(Scripted::words("dupes", &["ab", "ab", "abc"]), ApiVersion::V4);
    assert_eq!(harness.orchestrator.activate(false).await, CycleOutcome::Displayed(2));

    let harness = Harness::with_config("a", Point::new(0, 1), |config| {
        config.similar_suggestion_removal = SimilarSuggestionRemoval::None;
    });
    harness.register(Scripted::words("dupes", &["ab", "ab", "abc"]), ApiVersion::V4);
    assert_eq!(harness.orchestrator.activate(false).await, CycleOutcome::Displayed(3));
}

#[tokio::test]
async fn filtering_sources_are_rescored_against_the_prefix() {
    let harness = Harness::new("a", Point::new(0, 1));
    harness.register(
        Scripted::words("fuzzy", &["xa", "abc", "banana"])
            .with_options(ProviderOptions::scope_selector("*").with_filter_suggestions(true)),
        ApiVersion::V4,
    );
    harness.orchestrator.activate(false).await;
    assert_eq!(harness.displayed(), vec![labels(&["abc"])]);
}

#[tokio::test]
async fn prefixes_are_shaped_per_api_level() {
    let harness = Harness::new("foo(", Point::new(0, 4));
    let legacy = Arc::new(LegacyRecorder::new(".source.js"));
    harness
        .orchestrator
        .registry()
        .register(Source::Legacy(legacy.clone()), ApiVersion::V1);
    let v2 = harness.register(
        Scripted::words("v2", &["two"]).with_options(ProviderOptions::scope_selector(".source")),
        ApiVersion::V2,
    );
    let v4 = harness.register(Scripted::words("v4", &["four"]), ApiVersion::V4);

    harness.orchestrator.activate(false).await;

    assert_eq!(
        *legacy.requests.lock(),
        vec![("(".to_owned(), ".source.js".to_owned())]
    );
    assert_eq!(v2.prefixes(), vec!["("]);
    assert_eq!(v4.prefixes(), vec![""]);
}

#[tokio::test]
async fn blacklisted_files_never_run_a_cycle() {
    let harness = Harness::new("a", Point::new(0, 1));
    harness.register(Scripted::words("words", &["ab"]), ApiVersion::V4);

    let dotfile = Arc::new(
        TextBuffer::new(DocumentId::from_raw(7), "a")
            .with_path("/project/.env")
            .with_root_scope("source.js"),
    );
    dotfile.set_cursor(Point::new(0, 1));
    harness.orchestrator.attach(dotfile, Vec::new());
    assert_eq!(harness.orchestrator.activate(false).await, CycleOutcome::Skipped);
}

#[tokio::test]
async fn builtin_source_follows_the_config() {
    let harness = Harness::with_config("apple apricot\nap", Point::new(1, 2), |config| {
        config.enable_builtin_provider = true;
    });
    assert!(harness.orchestrator.registry().builtin_id().is_some());

    assert_eq!(harness.orchestrator.activate(false).await, CycleOutcome::Displayed(2));
    assert_eq!(harness.displayed(), vec![labels(&["apple", "apricot"])]);

    let watcher = harness.orchestrator.spawn_config_watcher();
    harness.config.modify(|config| config.enable_builtin_provider = false);
    for _ in 0..50 {
        if harness.orchestrator.registry().builtin_id().is_none() {
            break;
        }
        tokio::task::yield_now().await;
    }
    assert!(harness.orchestrator.registry().builtin_id().is_none());
    assert_eq!(harness.orchestrator.activate(false).await, CycleOutcome::Skipped);
    watcher.abort();
}

#[tokio::test]
async fn builtin_searches_every_watched_document() {
    let config = ConfigStore::default();
    let builtin = Arc::new(SubsequenceProvider::new(config.clone()));
    let consumer = Arc::new(RecordingConsumer::new());
    let orchestrator = Orchestrator::builder(ProviderRegistry::new(), config, consumer.clone())
        .builtin(builtin.clone())
        .build();

    let other = Arc::new(TextBuffer::new(DocumentId::from_raw(2), "apology").with_root_scope("source.js"));
    builtin.watch(other);
    let document = Arc::new(TextBuffer::new(DocumentId::from_raw(1), "ap").with_root_scope("source.js"));
    document.set_cursor(Point::new(0, 2));
    orchestrator.attach(document, Vec::new());
    assert_eq!(
        builtin.watched(),
        vec![DocumentId::from_raw(2), DocumentId::from_raw(1)]
    );

    assert_eq!(orchestrator.activate(false).await, CycleOutcome::Displayed(1));
    assert_eq!(consumer.last_ready(), Some(labels(&["apology"])));

    orchestrator.detach();
    assert_eq!(builtin.watched(), vec![DocumentId::from_raw(2)]);
}

#[tokio::test]
async fn a_search_over_a_changing_document_shows_nothing() {
    let config = ConfigStore::default();
    let builtin = Arc::new(SubsequenceProvider::new(config.clone()));
    let consumer = Arc::new(RecordingConsumer::new());
    let orchestrator = Orchestrator::builder(ProviderRegistry::new(), config, consumer.clone())
        .builtin(builtin)
        .build();

    let document = Churning::new(
        TextBuffer::new(DocumentId::from_raw(1), "apple ap").with_root_scope("source.js"),
    );
    document.buffer.set_cursor(Point::new(0, 8));
    orchestrator.attach(document, Vec::new());

    assert_eq!(orchestrator.activate(false).await, CycleOutcome::Hidden);
    assert_eq!(consumer.last_ready(), None);
}
