use std::sync::Arc;

use sift_core::{Document, DocumentId, Point, ScopeChain, TextBuffer};
use sift_provider::{
    ApiVersion, CancellationToken, LegacyProvider, LegacyRequest, ProviderError, ProviderOptions,
    ProviderRegistry, Source, Suggestion, SuggestionProvider, SuggestionRequest, SuggestionsFuture,
    DEFAULT_LABEL,
};

/// Suggests its prefix back, or gives up once the request is cancelled.
struct Echo(ProviderOptions);

impl Echo {
    fn new() -> Self {
        Self(ProviderOptions::scope_selector(".source.js"))
    }
}

impl SuggestionProvider for Echo {
    fn name(&self) -> &str {
        "echo"
    }

    fn options(&self) -> &ProviderOptions {
        &self.0
    }

    fn get_suggestions(&self, request: SuggestionRequest) -> SuggestionsFuture<'_> {
        Box::pin(async move {
            tokio::task::yield_now().await;
            if request.cancel.is_cancelled() {
                return Err(ProviderError::cancelled());
            }
            Ok(Some(vec![Suggestion::text(format!("{}!", request.prefix))]))
        })
    }
}

struct ScopeReporter(ProviderOptions);

impl LegacyProvider for ScopeReporter {
    fn name(&self) -> &str {
        "scopes"
    }

    fn options(&self) -> &ProviderOptions {
        &self.0
    }

    fn request_handler(&self, request: LegacyRequest) -> SuggestionsFuture<'_> {
        Box::pin(async move { Ok(Some(vec![Suggestion::text(request.scope_chain)])) })
    }
}

fn document() -> Arc<dyn Document> {
    Arc::new(TextBuffer::new(DocumentId::from_raw(1), "ab").with_root_scope("source.js"))
}

fn request(prefix: &str, cancel: CancellationToken) -> SuggestionRequest {
    SuggestionRequest {
        document: document(),
        position: Point::new(0, 2),
        scope_chain: ScopeChain::parse(".source.js"),
        prefix: prefix.to_owned(),
        activated_manually: false,
        cancel,
    }
}

#[tokio::test]
async fn applicable_sources_can_be_fetched() {
    let registry = ProviderRegistry::with_cache(Arc::default());
    registry.register(Source::current(Echo::new()), ApiVersion::V4);
    registry.register(
        Source::legacy(ScopeReporter(ProviderOptions::selector(".source.js"))),
        ApiVersion::V1,
    );

    let chain = ScopeChain::parse(".source.js");
    let applicable = registry.applicable_sources(&[DEFAULT_LABEL], &chain);
    assert_eq!(applicable.len(), 2);

    let mut labels = Vec::new();
    for registered in applicable {
        let reply = match &registered.source {
            Source::Current(provider) => {
                provider
                    .get_suggestions(request("ab", CancellationToken::new()))
                    .await
            }
            Source::Legacy(provider) => {
                provider
                    .request_handler(LegacyRequest {
                        document: document(),
                        prefix: "ab".to_owned(),
                        buffer_position: Point::new(0, 2),
                        position: Point::new(0, 2),
                        scope: chain.clone(),
                        scope_chain: chain.to_chain_string(),
                        cursor: Point::new(0, 2),
                    })
                    .await
            }
        };
        let suggestions = reply.unwrap().unwrap();
        labels.extend(suggestions.iter().map(|s| s.label().to_owned()));
    }
    labels.sort();
    assert_eq!(labels, [".source.js", "ab!"]);
}

#[tokio::test]
async fn cancelled_requests_report_cancellation() {
    let registry = ProviderRegistry::with_cache(Arc::default());
    registry.register(Source::current(Echo::new()), ApiVersion::V4);
    let applicable =
        registry.applicable_sources(&[DEFAULT_LABEL], &ScopeChain::parse(".source.js .string"));
    let Source::Current(provider) = &applicable[0].source else {
        panic!("expected a level 4 source");
    };

    let cancel = CancellationToken::new();
    let fetch = provider.get_suggestions(request("ab", cancel.clone()));
    cancel.cancel();
    let err = fetch.await.unwrap_err();
    assert!(err.is_cancelled());
}
