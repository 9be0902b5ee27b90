//! Per-editor suggestion cycles: trigger, fan out, merge, display or accept.
//!
//! ## Supersession
//!
//! Every cycle captures a [`CompletionRequest`] and records it as current.
//! When the merged batch is ready, the cycle only proceeds if its request is
//! still current (pointer identity); otherwise the batch is dropped without
//! any consumer callback. Starting a cycle also cancels the previous
//! request's [`CancellationToken`] so cooperative sources can stop early.
//!
//! ## Locking
//!
//! The state mutex is never held across an `.await` or while calling into a
//! source or the [`SuggestionConsumer`].

use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use futures::future::join_all;
use futures::FutureExt;
use parking_lot::Mutex;
use sift_config::{ConfigStore, FileBlacklist, SiftConfig};
use sift_core::{Document, Point, Range, ScopeChain, TextChange};
use sift_provider::{
    ApiVersion, InsertedSuggestion, LegacyRequest, NoopMetricsSink, ProviderMetricsSink,
    ProviderRegistry, ProviderResult, RegisteredSource, Source, Suggestion, SuggestionRequest,
    DEFAULT_LABEL,
};
use sift_scheduler::{CancellationToken, KeyedDebouncer};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::accept::{replacement_edits, AcceptOptions};
use crate::filter::{filter_suggestions, remove_similar, Scorer};
use crate::prefix::{is_word_prefix, legacy_prefix, primary_prefix};
use crate::subsequence::{SubsequenceProvider, SUBSEQUENCE_API_VERSION};
use crate::trigger::{decide, TriggerContext};
use crate::SuggestionConsumer;

/// The context a cycle was computed for.
#[derive(Clone)]
pub struct CompletionRequest {
    pub document: Arc<dyn Document>,
    /// The live cursor.
    pub position: Point,
    pub scope_chain: ScopeChain,
    /// Primary prefix.
    pub prefix: String,
    /// Prefix handed to sources below API level 4.
    pub legacy_prefix: String,
    pub activated_manually: bool,
}

impl std::fmt::Debug for CompletionRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionRequest")
            .field("document", &self.document.id())
            .field("position", &self.position)
            .field("scope_chain", &self.scope_chain)
            .field("prefix", &self.prefix)
            .field("legacy_prefix", &self.legacy_prefix)
            .field("activated_manually", &self.activated_manually)
            .finish()
    }
}

/// What a cycle ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The list was shown with this many suggestions.
    Displayed(usize),
    /// The single suggestion of a manual activation was inserted.
    Accepted,
    /// Nothing to show; any open list was hidden.
    Hidden,
    /// A newer request started before this one finished.
    Superseded,
    /// No cycle ran: nothing attached, blacklisted, or no applicable source.
    Skipped,
}

/// Reaction of [`Orchestrator::on_text_changed`] to a batch of changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerDecision {
    Ignored,
    /// The trigger timer was (re)armed.
    Armed,
    Hidden,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum TimerKey {
    Trigger,
    Hide,
}

struct Binding {
    document: Arc<dyn Document>,
    labels: Vec<String>,
}

struct State {
    binding: Option<Binding>,
    current: Option<Arc<CompletionRequest>>,
    current_cancel: CancellationToken,
    should_display: bool,
    list_active: bool,
    composition: bool,
    /// File blacklist compiled from the snapshot it belongs to.
    blacklist: Option<(Arc<SiftConfig>, Arc<FileBlacklist>)>,
    disposed: bool,
}

struct Inner {
    registry: ProviderRegistry,
    config: ConfigStore,
    consumer: Arc<dyn SuggestionConsumer>,
    metrics: Arc<dyn ProviderMetricsSink>,
    builtin: Option<Arc<SubsequenceProvider>>,
    runtime: Handle,
    timers: KeyedDebouncer<TimerKey>,
    state: Mutex<State>,
}

/// Outcome of calling one source.
enum Fetched {
    Done(ProviderResult<Option<Vec<Suggestion>>>),
    Panicked,
}

pub struct OrchestratorBuilder {
    registry: ProviderRegistry,
    config: ConfigStore,
    consumer: Arc<dyn SuggestionConsumer>,
    metrics: Option<Arc<dyn ProviderMetricsSink>>,
    builtin: Option<Arc<SubsequenceProvider>>,
    runtime: Option<Handle>,
}

impl OrchestratorBuilder {
    pub fn metrics(mut self, metrics: Arc<dyn ProviderMetricsSink>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// The builtin source, registered while `enable_builtin_provider` is on.
    pub fn builtin(mut self, provider: Arc<SubsequenceProvider>) -> Self {
        self.builtin = Some(provider);
        self
    }

    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Panics outside a Tokio runtime unless [`OrchestratorBuilder::runtime`] was set.
    pub fn build(self) -> Orchestrator {
        let runtime = self.runtime.unwrap_or_else(Handle::current);
        let orchestrator = Orchestrator {
            inner: Arc::new(Inner {
                registry: self.registry,
                config: self.config,
                consumer: self.consumer,
                metrics: self
                    .metrics
                    .unwrap_or_else(|| Arc::new(NoopMetricsSink) as Arc<dyn ProviderMetricsSink>),
                builtin: self.builtin,
                timers: KeyedDebouncer::new(runtime.clone(), Duration::ZERO),
                runtime,
                state: Mutex::new(State {
                    binding: None,
                    current: None,
                    current_cancel: CancellationToken::new(),
                    should_display: false,
                    list_active: false,
                    composition: false,
                    blacklist: None,
                    disposed: false,
                }),
            }),
        };
        orchestrator.apply_config();
        orchestrator
    }
}

/// Drives suggestion cycles for one editor.
#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<Inner>,
}

impl Orchestrator {
    pub fn builder(
        registry: ProviderRegistry,
        config: ConfigStore,
        consumer: Arc<dyn SuggestionConsumer>,
    ) -> OrchestratorBuilder {
        OrchestratorBuilder {
            registry,
            config,
            consumer,
            metrics: None,
            builtin: None,
            runtime: None,
        }
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.inner.registry
    }

    /// Bind to `document`. Empty `labels` means [`DEFAULT_LABEL`].
    pub fn attach(&self, document: Arc<dyn Document>, labels: Vec<String>) {
        self.detach();
        let labels = if labels.is_empty() {
            vec![DEFAULT_LABEL.to_owned()]
        } else {
            labels
        };
        if let Some(builtin) = &self.inner.builtin {
            builtin.watch(Arc::clone(&document));
        }
        tracing::debug!(target: "sift.complete", document = %document.id(), ?labels, "attached");
        self.inner.state.lock().binding = Some(Binding { document, labels });
    }

    /// Unbind from the current document, hiding any open list.
    pub fn detach(&self) {
        self.inner.timers.cancel_all();
        self.inner.hide_list();
        let binding = {
            let mut state = self.inner.state.lock();
            state.current_cancel.cancel();
            state.current = None;
            state.composition = false;
            state.binding.take()
        };
        if let (Some(binding), Some(builtin)) = (binding, &self.inner.builtin) {
            builtin.unwatch(binding.document.id());
        }
    }

    /// Run a cycle now. Explicit activations pass `manual = true`.
    pub async fn activate(&self, manual: bool) -> CycleOutcome {
        self.inner.timers.cancel(&TimerKey::Hide);
        self.inner.timers.cancel(&TimerKey::Trigger);
        self.inner.state.lock().should_display = true;
        self.inner.find_suggestions(manual).await
    }

    /// React to edits of the attached document.
    pub fn on_text_changed(&self, changes: &[TextChange]) -> TriggerDecision {
        let config = self.inner.config.get();
        let (document, list_active, composition) = {
            let state = self.inner.state.lock();
            if state.disposed {
                return TriggerDecision::Ignored;
            }
            let Some(binding) = &state.binding else {
                return TriggerDecision::Ignored;
            };
            (
                Arc::clone(&binding.document),
                state.list_active,
                state.composition,
            )
        };
        if self.inner.is_blacklisted(&*document, &config) {
            return TriggerDecision::Ignored;
        }
        let Some(last_cursor) = document.last_cursor() else {
            return TriggerDecision::Ignored;
        };

        let ctx = TriggerContext {
            auto_activation: config.enable_auto_activation,
            list_active,
            backspace_triggers: config.backspace_triggers_autocomplete,
            composition,
        };
        match decide(changes, last_cursor, ctx) {
            None => TriggerDecision::Ignored,
            Some(true) => {
                self.inner.timers.cancel(&TimerKey::Hide);
                self.inner.state.lock().should_display = true;
                let weak = Arc::downgrade(&self.inner);
                self.inner.timers.debounce_with_delay(
                    TimerKey::Trigger,
                    config.auto_activation_delay(),
                    move |_| async move {
                        if let Some(inner) = weak.upgrade() {
                            inner.find_suggestions(false).await;
                        }
                    },
                );
                TriggerDecision::Armed
            }
            Some(false) => {
                self.inner.timers.cancel(&TimerKey::Trigger);
                self.inner.hide_list();
                TriggerDecision::Hidden
            }
        }
    }

    /// A cursor moved. Moves caused by an edit are handled by [`Orchestrator::on_text_changed`].
    pub fn cursor_moved(&self, text_changed: bool) {
        if !text_changed {
            self.request_hide();
        }
    }

    pub fn buffer_saved(&self) {
        if !self.inner.config.get().autosave_enabled {
            self.hide();
        }
    }

    pub fn composition_started(&self) {
        self.inner.state.lock().composition = true;
    }

    pub fn composition_ended(&self) {
        self.inner.state.lock().composition = false;
    }

    /// Hide on the next tick unless an edit arms the trigger first.
    pub fn request_hide(&self) {
        if !self.inner.timers.is_pending(&TimerKey::Hide) {
            let weak = Arc::downgrade(&self.inner);
            self.inner
                .timers
                .debounce_with_delay(TimerKey::Hide, Duration::ZERO, move |_| async move {
                    if let Some(inner) = weak.upgrade() {
                        inner.hide_list();
                    }
                });
        }
        self.inner.state.lock().should_display = false;
    }

    pub fn hide(&self) {
        self.inner.timers.cancel(&TimerKey::Hide);
        self.inner.hide_list();
    }

    pub fn is_list_active(&self) -> bool {
        self.inner.state.lock().list_active
    }

    /// Insert `suggestion` at every cursor it was computed for. Returns the
    /// number of cursors edited.
    pub fn confirm(&self, suggestion: &Suggestion) -> usize {
        self.inner.confirm(suggestion)
    }

    /// Push the current config snapshot into the registry: scope blacklist
    /// and the builtin source toggle.
    pub fn apply_config(&self) {
        let config = self.inner.config.get();
        self.inner.registry.set_scope_blacklist(&config.scope_blacklist);

        let Some(builtin) = &self.inner.builtin else {
            return;
        };
        let source = builtin.source();
        self.inner
            .registry
            .set_builtin_enabled(config.enable_builtin_provider, move || {
                (source, SUBSEQUENCE_API_VERSION)
            });
        if config.enable_builtin_provider {
            let document = self
                .inner
                .state
                .lock()
                .binding
                .as_ref()
                .map(|binding| Arc::clone(&binding.document));
            if let Some(document) = document {
                builtin.watch(document);
            }
        }
    }

    /// Re-apply the config on every store update until the orchestrator is dropped.
    pub fn spawn_config_watcher(&self) -> JoinHandle<()> {
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let mut updates = self.inner.config.subscribe();
        self.inner.runtime.spawn(async move {
            while updates.changed().await.is_ok() {
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                Orchestrator { inner }.apply_config();
            }
        })
    }

    /// Stop reacting to anything. The registry is shared and left as is.
    pub fn dispose(&self) {
        self.inner.timers.cancel_all();
        let binding = {
            let mut state = self.inner.state.lock();
            state.disposed = true;
            state.current_cancel.cancel();
            state.current = None;
            state.list_active = false;
            state.should_display = false;
            state.binding.take()
        };
        if let (Some(binding), Some(builtin)) = (binding, &self.inner.builtin) {
            builtin.unwatch(binding.document.id());
        }
    }
}

impl Inner {
    fn is_blacklisted(&self, document: &dyn Document, config: &Arc<SiftConfig>) -> bool {
        let Some(path) = document.path() else {
            return false;
        };
        let blacklist = {
            let mut state = self.state.lock();
            match &state.blacklist {
                Some((snapshot, blacklist)) if Arc::ptr_eq(snapshot, config) => Arc::clone(blacklist),
                _ => {
                    let blacklist = Arc::new(config.file_blacklist());
                    state.blacklist = Some((Arc::clone(config), Arc::clone(&blacklist)));
                    blacklist
                }
            }
        };
        blacklist.is_blacklisted(&path)
    }

    /// Returns whether a displayed list was hidden.
    fn hide_list(&self) -> bool {
        let was_active = {
            let mut state = self.state.lock();
            state.should_display = false;
            std::mem::replace(&mut state.list_active, false)
        };
        if was_active {
            self.consumer.on_hide();
        }
        was_active
    }

    async fn find_suggestions(&self, manual: bool) -> CycleOutcome {
        let config = self.config.get();
        let (document, labels) = {
            let state = self.state.lock();
            if state.disposed {
                return CycleOutcome::Skipped;
            }
            let Some(binding) = &state.binding else {
                return CycleOutcome::Skipped;
            };
            (Arc::clone(&binding.document), binding.labels.clone())
        };
        if self.is_blacklisted(&*document, &config) {
            return CycleOutcome::Skipped;
        }
        let Some(position) = document.last_cursor() else {
            return CycleOutcome::Skipped;
        };

        let line = document.text_in_range(Range::new(Point::new(position.row, 0), position));
        let additional = config.additional_word_characters();
        let request = Arc::new(CompletionRequest {
            scope_chain: document.scope_chain_at(position),
            prefix: primary_prefix(&line, &additional).to_owned(),
            legacy_prefix: legacy_prefix(&line, config.enable_extended_unicode_support).to_owned(),
            document,
            position,
            activated_manually: manual,
        });
        self.run_cycle(request, &labels, &config).await
    }

    async fn run_cycle(
        &self,
        request: Arc<CompletionRequest>,
        labels: &[String],
        config: &Arc<SiftConfig>,
    ) -> CycleOutcome {
        let sources = self.registry.applicable_sources(labels, &request.scope_chain);
        if sources.is_empty() {
            return CycleOutcome::Skipped;
        }

        let cancel = CancellationToken::new();
        {
            let mut state = self.state.lock();
            state.current_cancel.cancel();
            state.current_cancel = cancel.clone();
            state.current = Some(Arc::clone(&request));
        }

        let fetches = sources
            .iter()
            .map(|registered| self.fetch(registered, &request, &cancel, config));
        let merged: Vec<Suggestion> = join_all(fetches).await.into_iter().flatten().collect();

        let should_display = {
            let state = self.state.lock();
            let current = state
                .current
                .as_ref()
                .is_some_and(|current| Arc::ptr_eq(current, &request));
            if !current || state.disposed {
                None
            } else {
                Some(state.should_display)
            }
        };
        let Some(should_display) = should_display else {
            for registered in &sources {
                self.metrics.record_stale(registered.source.name());
            }
            tracing::debug!(
                target: "sift.complete",
                prefix = %request.prefix,
                "dropping superseded suggestions"
            );
            return CycleOutcome::Superseded;
        };

        if request.activated_manually
            && should_display
            && config.enable_auto_confirm_single_suggestion
            && merged.len() == 1
        {
            self.confirm(&merged[0]);
            return CycleOutcome::Accepted;
        }

        let merged = remove_similar(merged, config.similar_suggestion_removal);
        if should_display && !merged.is_empty() {
            self.state.lock().list_active = true;
            self.consumer.on_suggestions_ready(&merged, &request);
            CycleOutcome::Displayed(merged.len())
        } else {
            self.hide_list();
            CycleOutcome::Hidden
        }
    }

    /// Fetch, normalize and optionally filter one source's suggestions.
    /// Failures and panics yield an empty list.
    async fn fetch(
        &self,
        registered: &RegisteredSource,
        request: &CompletionRequest,
        cancel: &CancellationToken,
        config: &SiftConfig,
    ) -> Vec<Suggestion> {
        let name = registered.source.name();
        let started = Instant::now();
        let fetched = call_source(registered, request, cancel).await;
        self.metrics.record_request(name, started.elapsed());

        let suggestions = match fetched {
            Fetched::Done(Ok(suggestions)) => suggestions.unwrap_or_default(),
            Fetched::Done(Err(err)) if err.is_cancelled() => {
                tracing::trace!(target: "sift.complete", source = name, "source gave up on a superseded request");
                Vec::new()
            }
            Fetched::Done(Err(err)) => {
                tracing::warn!(target: "sift.complete", source = name, error = %err, "suggestion source failed");
                self.metrics.record_error(name);
                Vec::new()
            }
            Fetched::Panicked => {
                tracing::warn!(target: "sift.complete", source = name, "suggestion source panicked");
                self.metrics.record_panic(name);
                Vec::new()
            }
        };

        let prefix = normalization_prefix(registered.api_version, &request.prefix, config);
        let mut suggestions: Vec<Suggestion> = suggestions
            .into_iter()
            .filter(Suggestion::has_content)
            .map(|mut suggestion| {
                if suggestion.replacement_prefix.is_none() || suggestion.prefix_modified {
                    suggestion.replacement_prefix = Some(prefix.to_owned());
                    suggestion.prefix_modified = true;
                }
                suggestion.source = Some(registered.id);
                suggestion
            })
            .collect();

        if registered.options.filter_suggestions {
            suggestions = filter_suggestions(
                suggestions,
                &request.prefix,
                Scorer::from_alternate_flag(config.use_alternate_scoring),
            );
        }
        suggestions
    }

    fn confirm(&self, suggestion: &Suggestion) -> usize {
        let config = self.config.get();
        let document = {
            let state = self.state.lock();
            if state.disposed {
                return 0;
            }
            let Some(binding) = &state.binding else {
                return 0;
            };
            Arc::clone(&binding.document)
        };
        let trigger_position = document.last_cursor().unwrap_or(Point::zero());

        self.timers.cancel(&TimerKey::Hide);
        self.hide_list();

        let edits = replacement_edits(
            &*document,
            suggestion,
            AcceptOptions {
                consume_suffix: config.consume_suffix,
                non_word_characters: &config.non_word_characters,
            },
        );
        let edited = edits.len();
        if let Err(err) = document.transact(edits) {
            tracing::warn!(target: "sift.complete", error = %err, "failed to insert suggestion");
            return 0;
        }
        tracing::debug!(
            target: "sift.complete",
            text = suggestion.label(),
            cursors = edited,
            "accepted suggestion"
        );

        if let Some(registered) = suggestion.source.and_then(|id| self.registry.source_for_id(id)) {
            if let Source::Current(provider) = &registered.source {
                provider.on_did_insert_suggestion(&InsertedSuggestion {
                    document: Arc::clone(&document),
                    suggestion: suggestion.clone(),
                    trigger_position,
                });
            }
        }
        self.consumer.on_accept(suggestion);
        edited
    }
}

/// The replacement prefix assigned to suggestions that do not bring one.
fn normalization_prefix<'a>(version: ApiVersion, prefix: &'a str, config: &SiftConfig) -> &'a str {
    if !version.uses_legacy_prefix() || is_word_prefix(prefix, config.enable_extended_unicode_support)
    {
        prefix
    } else {
        ""
    }
}

/// Call `registered` with the argument shape of its API level, catching panics
/// both while creating and while polling the future.
async fn call_source(
    registered: &RegisteredSource,
    request: &CompletionRequest,
    cancel: &CancellationToken,
) -> Fetched {
    let future = std::panic::catch_unwind(AssertUnwindSafe(|| match &registered.source {
        Source::Legacy(provider) => provider.request_handler(LegacyRequest {
            document: Arc::clone(&request.document),
            prefix: request.legacy_prefix.clone(),
            buffer_position: request.position,
            position: request.position,
            scope: request.scope_chain.clone(),
            scope_chain: request.scope_chain.to_chain_string(),
            cursor: request.position,
        }),
        Source::Current(provider) => provider.get_suggestions(SuggestionRequest {
            document: Arc::clone(&request.document),
            position: request.position,
            scope_chain: request.scope_chain.clone(),
            prefix: if registered.api_version.uses_legacy_prefix() {
                request.legacy_prefix.clone()
            } else {
                request.prefix.clone()
            },
            activated_manually: request.activated_manually,
            cancel: cancel.clone(),
        }),
    }));
    let Ok(future) = future else {
        return Fetched::Panicked;
    };
    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(result) => Fetched::Done(result),
        Err(_) => Fetched::Panicked,
    }
}
