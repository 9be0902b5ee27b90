//! Suggestion sources and the registry that decides which of them apply to a
//! scope chain.
//!
//! Sources come in two shapes selected by API level: [`LegacyProvider`] for
//! level 1 and [`SuggestionProvider`] for levels 2 through 4. Both are wrapped
//! in [`Source`] for registration with a [`ProviderRegistry`].

mod metrics;
mod outcome;
mod registry;
mod traits;
mod types;

pub use metrics::{NoopMetricsSink, ProviderMetricsSink, TestMetricsSink, TestMetricsSnapshot};
pub use outcome::{ProviderError, ProviderErrorKind, ProviderResult};
pub use registry::{ProviderRegistry, RegisterError, RegisteredSource, RegistrationHandle};
pub use traits::{
    InsertedSuggestion, LegacyProvider, LegacyRequest, ProviderOptions, Source,
    SuggestionProvider, SuggestionRequest, SuggestionsFuture, DEFAULT_LABEL,
};
pub use types::{ApiVersion, SourceId, Suggestion};

pub use sift_scheduler::CancellationToken;
