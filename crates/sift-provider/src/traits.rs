//! Source capability traits.
//!
//! ## Cancellation
//!
//! Each request carries a [`CancellationToken`] that is cancelled once a newer
//! request supersedes it. Sources may stop early by returning
//! [`ProviderError::cancelled`](crate::ProviderError::cancelled); results of a
//! superseded request are discarded regardless, so observing the token is an
//! optimization rather than a requirement.
//!
//! ## Failures
//!
//! A source that returns an error (or panics) contributes no suggestions to
//! the batch. Sibling sources are unaffected.

use std::sync::Arc;

use futures::future::BoxFuture;
use sift_core::{Document, Point, ScopeChain};
use sift_scheduler::CancellationToken;

use crate::outcome::ProviderResult;
use crate::{RegistrationHandle, Suggestion};

/// Context label of the primary editor surface.
pub const DEFAULT_LABEL: &str = "workspace-center";

/// The future returned by a source fetch. `Ok(None)` means "nothing to say".
pub type SuggestionsFuture<'a> = BoxFuture<'a, ProviderResult<Option<Vec<Suggestion>>>>;

/// Static registration metadata of a source.
#[derive(Clone, Debug)]
pub struct ProviderOptions {
    /// Match pattern for API levels 1 and 2.
    pub selector: Option<String>,
    /// Disable pattern for API levels 1 and 2.
    pub disable_for_selector: Option<String>,
    /// Match pattern for API level 2 and newer.
    pub scope_selector: Option<String>,
    /// Disable pattern for API level 2 and newer.
    pub disable_for_scope_selector: Option<String>,
    /// Scopes in which the builtin source is suppressed while this source applies.
    pub disable_default_provider_selector: Option<String>,
    /// Context labels; empty means [`DEFAULT_LABEL`].
    pub labels: Vec<String>,
    pub inclusion_priority: i32,
    pub suggestion_priority: i32,
    /// Drop applicable sources whose inclusion priority is below this one's.
    pub exclude_lower_priority: bool,
    /// Let the orchestrator fuzzy-filter and re-rank this source's results.
    pub filter_suggestions: bool,
}

impl Default for ProviderOptions {
    fn default() -> Self {
        Self {
            selector: None,
            disable_for_selector: None,
            scope_selector: None,
            disable_for_scope_selector: None,
            disable_default_provider_selector: None,
            labels: Vec::new(),
            inclusion_priority: 0,
            suggestion_priority: 1,
            exclude_lower_priority: false,
            filter_suggestions: false,
        }
    }
}

impl ProviderOptions {
    /// Options for an API level 2+ source matching `scope_selector`.
    pub fn scope_selector(scope_selector: impl Into<String>) -> Self {
        Self {
            scope_selector: Some(scope_selector.into()),
            ..Self::default()
        }
    }

    /// Options for an API level 1 source matching `selector`.
    pub fn selector(selector: impl Into<String>) -> Self {
        Self {
            selector: Some(selector.into()),
            ..Self::default()
        }
    }

    pub fn with_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.labels = labels.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_disable_for_scope_selector(mut self, selector: impl Into<String>) -> Self {
        self.disable_for_scope_selector = Some(selector.into());
        self
    }

    pub fn with_suggestion_priority(mut self, priority: i32) -> Self {
        self.suggestion_priority = priority;
        self
    }

    pub fn with_inclusion_priority(mut self, priority: i32, exclude_lower_priority: bool) -> Self {
        self.inclusion_priority = priority;
        self.exclude_lower_priority = exclude_lower_priority;
        self
    }

    pub fn with_filter_suggestions(mut self, filter: bool) -> Self {
        self.filter_suggestions = filter;
        self
    }

    /// Labels with the default applied.
    pub fn effective_labels(&self) -> Vec<String> {
        if self.labels.is_empty() {
            vec![DEFAULT_LABEL.to_owned()]
        } else {
            self.labels.clone()
        }
    }
}

/// Arguments for API level 2+ sources.
#[derive(Clone)]
pub struct SuggestionRequest {
    pub document: Arc<dyn Document>,
    pub position: Point,
    pub scope_chain: ScopeChain,
    /// Legacy prefix for levels 2 and 3, primary prefix for level 4.
    pub prefix: String,
    pub activated_manually: bool,
    pub cancel: CancellationToken,
}

/// Arguments for API level 1 sources.
#[derive(Clone)]
pub struct LegacyRequest {
    pub document: Arc<dyn Document>,
    pub prefix: String,
    pub buffer_position: Point,
    /// Same as `buffer_position`.
    pub position: Point,
    pub scope: ScopeChain,
    /// `scope` rendered as `.a.b .c`.
    pub scope_chain: String,
    /// The live cursor.
    pub cursor: Point,
}

/// Passed to [`SuggestionProvider::on_did_insert_suggestion`] after acceptance.
#[derive(Clone)]
pub struct InsertedSuggestion {
    pub document: Arc<dyn Document>,
    pub suggestion: Suggestion,
    /// Live cursor position before the insertion.
    pub trigger_position: Point,
}

/// A source written against API level 2, 3 or 4.
pub trait SuggestionProvider: Send + Sync {
    fn name(&self) -> &str;

    fn options(&self) -> &ProviderOptions;

    fn get_suggestions(&self, request: SuggestionRequest) -> SuggestionsFuture<'_>;

    fn on_did_insert_suggestion(&self, _event: &InsertedSuggestion) {}

    /// Called once after a successful registration; a source may keep the
    /// handle to unregister itself later.
    fn on_registered(&self, _handle: RegistrationHandle) {}

    fn dispose(&self) {}
}

/// A source written against API level 1.
pub trait LegacyProvider: Send + Sync {
    fn name(&self) -> &str;

    fn options(&self) -> &ProviderOptions;

    fn request_handler(&self, request: LegacyRequest) -> SuggestionsFuture<'_>;

    fn on_registered(&self, _handle: RegistrationHandle) {}

    fn dispose(&self) {}
}

/// A registered suggestion source.
#[derive(Clone)]
pub enum Source {
    Legacy(Arc<dyn LegacyProvider>),
    Current(Arc<dyn SuggestionProvider>),
}

impl Source {
    pub fn current(provider: impl SuggestionProvider + 'static) -> Self {
        Source::Current(Arc::new(provider))
    }

    pub fn legacy(provider: impl LegacyProvider + 'static) -> Self {
        Source::Legacy(Arc::new(provider))
    }

    pub fn name(&self) -> &str {
        match self {
            Source::Legacy(provider) => provider.name(),
            Source::Current(provider) => provider.name(),
        }
    }

    pub fn options(&self) -> &ProviderOptions {
        match self {
            Source::Legacy(provider) => provider.options(),
            Source::Current(provider) => provider.options(),
        }
    }

    /// Identity comparison: both wrap the same provider object.
    pub fn same_source(&self, other: &Source) -> bool {
        self.addr() == other.addr()
    }

    fn addr(&self) -> *const () {
        match self {
            Source::Legacy(provider) => Arc::as_ptr(provider) as *const (),
            Source::Current(provider) => Arc::as_ptr(provider) as *const (),
        }
    }

    pub(crate) fn on_registered(&self, handle: RegistrationHandle) {
        match self {
            Source::Legacy(provider) => provider.on_registered(handle),
            Source::Current(provider) => provider.on_registered(handle),
        }
    }

    pub fn dispose(&self) {
        match self {
            Source::Legacy(provider) => provider.dispose(),
            Source::Current(provider) => provider.dispose(),
        }
    }
}

impl std::fmt::Debug for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self {
            Source::Legacy(_) => "Legacy",
            Source::Current(_) => "Current",
        };
        f.debug_tuple(kind).field(&self.name()).finish()
    }
}
