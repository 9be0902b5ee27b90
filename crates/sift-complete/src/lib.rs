//! Suggestion aggregation for an editor.
//!
//! An [`Orchestrator`] turns keystrokes and explicit activations into
//! suggestion cycles: it computes the prefix at the cursor, asks every
//! applicable source of a [`sift_provider::ProviderRegistry`] for suggestions
//! concurrently, merges the results in registry order and hands them to a
//! [`SuggestionConsumer`]. [`SubsequenceProvider`] is the builtin source that
//! searches open documents for words containing the prefix.

pub mod accept;
pub mod filter;
pub mod prefix;
pub mod trigger;

mod consumer;
mod orchestrator;
mod subsequence;

pub use consumer::{ConsumerEvent, RecordingConsumer, SuggestionConsumer};
pub use orchestrator::{
    CompletionRequest, CycleOutcome, Orchestrator, OrchestratorBuilder, TriggerDecision,
};
pub use subsequence::{
    clamped_range, SubsequenceProvider, SUBSEQUENCE_API_VERSION, SUBSEQUENCE_PROVIDER_NAME,
};
