use sift_complete::{ConsumerEvent, CycleOutcome};
use sift_core::{Document, Point};
use sift_provider::{ApiVersion, Suggestion};

use super::{Harness, Scripted};

#[tokio::test]
async fn a_single_manual_suggestion_is_accepted_directly() {
    let harness = Harness::new("ab", Point::new(0, 2));
    let provider = harness.register(Scripted::words("words", &["abc"]), ApiVersion::V4);

    assert_eq!(harness.orchestrator.activate(true).await, CycleOutcome::Accepted);
    assert_eq!(&*harness.document.text(), "abc");
    assert_eq!(provider.inserted(), vec!["abc"]);
    assert!(matches!(
        harness.consumer.events().as_slice(),
        [ConsumerEvent::Accept(suggestion)] if suggestion.text.as_deref() == Some("abc")
    ));
}

#[tokio::test]
async fn auto_confirm_needs_a_manual_activation_and_the_setting() {
    let harness = Harness::new("ab", Point::new(0, 2));
    harness.register(Scripted::words("words", &["abc"]), ApiVersion::V4);
    assert_eq!(harness.orchestrator.activate(false).await, CycleOutcome::Displayed(1));

    let harness = Harness::with_config("ab", Point::new(0, 2), |config| {
        config.enable_auto_confirm_single_suggestion = false;
    });
    harness.register(Scripted::words("words", &["abc"]), ApiVersion::V4);
    assert_eq!(harness.orchestrator.activate(true).await, CycleOutcome::Displayed(1));
    assert_eq!(&*harness.document.text(), "ab");
}

#[tokio::test]
async fn only_cursors_after_the_replacement_prefix_are_edited() {
    let harness = Harness::new("ab\nxy", Point::new(0, 2));
    harness.document.set_cursors([Point::new(0, 2), Point::new(1, 2)]);

    let suggestion = Suggestion::text("abc").with_replacement_prefix("ab");
    assert_eq!(harness.orchestrator.confirm(&suggestion), 1);
    assert_eq!(&*harness.document.text(), "abc\nxy");
}

#[tokio::test]
async fn every_matching_cursor_is_edited_in_one_transaction() {
    let harness = Harness::new("ab ab", Point::new(0, 2));
    harness.document.set_cursors([Point::new(0, 2), Point::new(0, 5)]);
    let version = harness.document.version();

    let suggestion = Suggestion::text("abc").with_replacement_prefix("ab");
    assert_eq!(harness.orchestrator.confirm(&suggestion), 2);
    assert_eq!(&*harness.document.text(), "abc abc");
    assert_eq!(harness.document.version(), version + 1);
}

#[tokio::test]
async fn a_consumed_suffix_does_not_swallow_the_next_cursor() {
    let harness = Harness::new("abab", Point::new(0, 2));
    harness.document.set_cursors([Point::new(0, 2), Point::new(0, 4)]);

    let suggestion = Suggestion::text("abab").with_replacement_prefix("ab");
    assert_eq!(harness.orchestrator.confirm(&suggestion), 2);
    assert_eq!(&*harness.document.text(), "abababab");
}

#[tokio::test]
async fn the_overlapping_suffix_is_consumed() {
    let suggestion = Suggestion::text("foobar").with_replacement_prefix("foo");

    let harness = Harness::new("foobar", Point::new(0, 3));
    harness.orchestrator.confirm(&suggestion);
    assert_eq!(&*harness.document.text(), "foobar");

    let harness = Harness::with_config("foobar", Point::new(0, 3), |config| {
        config.consume_suffix = false;
    });
    harness.orchestrator.confirm(&suggestion);
    assert_eq!(&*harness.document.text(), "foobarbar");
}

#[tokio::test]
async fn closing_punctuation_after_the_cursor_is_kept() {
    let harness = Harness::new("foo()", Point::new(0, 3));
    harness
        .orchestrator
        .confirm(&Suggestion::text("foobar()").with_replacement_prefix("foo"));
    assert_eq!(&*harness.document.text(), "foobar()()");
}

#[tokio::test]
async fn accepting_hides_the_open_list() {
    let harness = Harness::new("a", Point::new(0, 1));
    harness.register(Scripted::words("words", &["ab", "abc"]), ApiVersion::V4);
    assert_eq!(harness.orchestrator.activate(false).await, CycleOutcome::Displayed(2));

    harness
        .orchestrator
        .confirm(&Suggestion::text("abc").with_replacement_prefix("a"));
    assert!(!harness.orchestrator.is_list_active());
    assert_eq!(harness.hides(), 1);
    assert_eq!(&*harness.document.text(), "abc");
}
