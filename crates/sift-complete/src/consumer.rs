use parking_lot::Mutex;
use sift_provider::Suggestion;

use crate::CompletionRequest;

/// Presentation-side callbacks. Called without any orchestrator lock held.
pub trait SuggestionConsumer: Send + Sync {
    fn on_suggestions_ready(&self, suggestions: &[Suggestion], request: &CompletionRequest);

    fn on_hide(&self);

    fn on_accept(&self, _suggestion: &Suggestion) {}
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConsumerEvent {
    Ready { labels: Vec<String>, prefix: String },
    Hide,
    Accept(Suggestion),
}

/// Consumer that records every callback, for tests and headless embedders.
#[derive(Debug, Default)]
pub struct RecordingConsumer {
    events: Mutex<Vec<ConsumerEvent>>,
}

impl RecordingConsumer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ConsumerEvent> {
        self.events.lock().clone()
    }

    /// Labels of the most recently displayed list.
    pub fn last_ready(&self) -> Option<Vec<String>> {
        self.events.lock().iter().rev().find_map(|event| match event {
            ConsumerEvent::Ready { labels, .. } => Some(labels.clone()),
            _ => None,
        })
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl SuggestionConsumer for RecordingConsumer {
    fn on_suggestions_ready(&self, suggestions: &[Suggestion], request: &CompletionRequest) {
        self.events.lock().push(ConsumerEvent::Ready {
            labels: suggestions.iter().map(|s| s.label().to_owned()).collect(),
            prefix: request.prefix.clone(),
        });
    }

    fn on_hide(&self) {
        self.events.lock().push(ConsumerEvent::Hide);
    }

    fn on_accept(&self, suggestion: &Suggestion) {
        self.events.lock().push(ConsumerEvent::Accept(suggestion.clone()));
    }
}
