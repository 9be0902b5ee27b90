use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use sift_complete::{
    ConsumerEvent, Orchestrator, RecordingConsumer, SubsequenceProvider, TriggerDecision,
};
use sift_config::{ConfigStore, SiftConfig};
use sift_core::{
    Document, DocumentEdit, DocumentId, EditError, Point, Range, ScopeChain, TextBuffer, TextChange,
};
use sift_provider::{
    ApiVersion, InsertedSuggestion, LegacyProvider, LegacyRequest, ProviderError, ProviderOptions,
    ProviderRegistry, Source, Suggestion, SuggestionProvider, SuggestionRequest, SuggestionsFuture,
    TestMetricsSink,
};

mod accept;
mod cycle;

#[derive(Clone, Debug)]
pub enum Reply {
    Words(Vec<&'static str>),
    Nothing,
    Fail,
    /// Panic while the future is polled.
    Panic,
    /// Panic before a future is returned.
    PanicEagerly,
}

/// A source that answers from a script, then from a fixed fallback reply.
pub struct Scripted {
    name: String,
    options: ProviderOptions,
    steps: Mutex<VecDeque<(Duration, Reply)>>,
    fallback: Reply,
    calls: AtomicUsize,
    prefixes: Mutex<Vec<String>>,
    inserted: Mutex<Vec<String>>,
}

impl Scripted {
    pub fn new(name: &str, reply: Reply) -> Self {
        Self {
            name: name.to_owned(),
            options: ProviderOptions::scope_selector("*"),
            steps: Mutex::new(VecDeque::new()),
            fallback: reply,
            calls: AtomicUsize::new(0),
            prefixes: Mutex::new(Vec::new()),
            inserted: Mutex::new(Vec::new()),
        }
    }

    pub fn words(name: &str, words: &[&'static str]) -> Self {
        Self::new(name, Reply::Words(words.to_vec()))
    }

    pub fn with_options(mut self, options: ProviderOptions) -> Self {
        self.options = options;
        self
    }

    /// Answer the next unscripted call with `reply` after `delay`.
    pub fn then(self, delay: Duration, reply: Reply) -> Self {
        self.steps.lock().push_back((delay, reply));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prefixes(&self) -> Vec<String> {
        self.prefixes.lock().clone()
    }

    pub fn inserted(&self) -> Vec<String> {
        self.inserted.lock().clone()
    }
}

impl SuggestionProvider for Scripted {
    fn name(&self) -> &str {
        &self.name
    }

    fn options(&self) -> &ProviderOptions {
        &self.options
    }

    fn get_suggestions(&self, request: SuggestionRequest) -> SuggestionsFuture<'_> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prefixes.lock().push(request.prefix.clone());
        let (delay, reply) = self
            .steps
            .lock()
            .pop_front()
            .unwrap_or_else(|| (Duration::ZERO, self.fallback.clone()));
        if matches!(reply, Reply::PanicEagerly) {
            panic!("{} failed before returning a future", self.name);
        }

        Box::pin(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            match reply {
                Reply::Words(words) => Ok(Some(words.into_iter().map(Suggestion::text).collect())),
                Reply::Nothing => Ok(None),
                Reply::Fail => Err(ProviderError::other("scripted failure")),
                Reply::Panic | Reply::PanicEagerly => panic!("scripted panic"),
            }
        })
    }

    fn on_did_insert_suggestion(&self, event: &InsertedSuggestion) {
        self.inserted.lock().push(event.suggestion.label().to_owned());
    }
}

/// Level 1 source recording the flat argument set it receives.
pub struct LegacyRecorder {
    options: ProviderOptions,
    pub requests: Mutex<Vec<(String, String)>>,
}

impl LegacyRecorder {
    pub fn new(selector: &str) -> Self {
        Self {
            options: ProviderOptions::selector(selector),
            requests: Mutex::new(Vec::new()),
        }
    }
}

impl LegacyProvider for LegacyRecorder {
    fn name(&self) -> &str {
        "legacy"
    }

    fn options(&self) -> &ProviderOptions {
        &self.options
    }

    fn request_handler(&self, request: LegacyRequest) -> SuggestionsFuture<'_> {
        self.requests
            .lock()
            .push((request.prefix.clone(), request.scope_chain.clone()));
        Box::pin(async { Ok(Some(vec![Suggestion::text("legacy")])) })
    }
}

/// A document whose version moves on every read, as if another writer kept
/// editing it.
pub struct Churning {
    pub buffer: TextBuffer,
    reads: AtomicU64,
}

impl Churning {
    pub fn new(buffer: TextBuffer) -> Arc<Self> {
        Arc::new(Self {
            buffer,
            reads: AtomicU64::new(0),
        })
    }
}

impl Document for Churning {
    fn id(&self) -> DocumentId {
        self.buffer.id()
    }

    fn version(&self) -> u64 {
        self.buffer.version() + self.reads.fetch_add(1, Ordering::SeqCst)
    }

    fn text(&self) -> Arc<str> {
        self.buffer.text()
    }

    fn line_count(&self) -> u32 {
        self.buffer.line_count()
    }

    fn text_in_range(&self, range: Range) -> String {
        self.buffer.text_in_range(range)
    }

    fn cursors(&self) -> Vec<Point> {
        self.buffer.cursors()
    }

    fn scope_chain_at(&self, point: Point) -> ScopeChain {
        self.buffer.scope_chain_at(point)
    }

    fn transact(&self, edits: Vec<DocumentEdit>) -> Result<Vec<TextChange>, EditError> {
        self.buffer.transact(edits)
    }
}

pub struct Harness {
    pub orchestrator: Orchestrator,
    pub consumer: Arc<RecordingConsumer>,
    pub metrics: Arc<TestMetricsSink>,
    pub config: ConfigStore,
    pub document: Arc<TextBuffer>,
}

impl Harness {
    /// An orchestrator attached to a `source.js` document, with the builtin
    /// source disabled. Must run inside a Tokio runtime.
    pub fn new(text: &str, cursor: Point) -> Self {
        Self::with_config(text, cursor, |_| {})
    }

    pub fn with_config(text: &str, cursor: Point, configure: impl FnOnce(&mut SiftConfig)) -> Self {
        let mut config = SiftConfig {
            enable_builtin_provider: false,
            ..SiftConfig::default()
        };
        configure(&mut config);
        let config = ConfigStore::new(config);

        let consumer = Arc::new(RecordingConsumer::new());
        let metrics = Arc::new(TestMetricsSink::default());
        let orchestrator =
            Orchestrator::builder(ProviderRegistry::new(), config.clone(), consumer.clone())
                .metrics(metrics.clone())
                .builtin(Arc::new(SubsequenceProvider::new(config.clone())))
                .build();

        let document =
            Arc::new(TextBuffer::new(DocumentId::from_raw(1), text).with_root_scope("source.js"));
        document.set_cursor(cursor);
        orchestrator.attach(document.clone(), Vec::new());

        Self {
            orchestrator,
            consumer,
            metrics,
            config,
            document,
        }
    }

    pub fn register(&self, provider: Scripted, version: ApiVersion) -> Arc<Scripted> {
        let provider = Arc::new(provider);
        self.orchestrator
            .registry()
            .register(Source::Current(provider.clone()), version);
        provider
    }

    pub fn type_text(&self, text: &str) -> TriggerDecision {
        let changes = self.document.insert_at_cursors(text).unwrap();
        self.orchestrator.on_text_changed(&changes)
    }

    pub fn backspace(&self) -> TriggerDecision {
        let changes = self.document.backspace().unwrap();
        self.orchestrator.on_text_changed(&changes)
    }

    /// Labels of every displayed list, in order.
    pub fn displayed(&self) -> Vec<Vec<String>> {
        self.consumer
            .events()
            .into_iter()
            .filter_map(|event| match event {
                ConsumerEvent::Ready { labels, .. } => Some(labels),
                _ => None,
            })
            .collect()
    }

    pub fn hides(&self) -> usize {
        self.consumer
            .events()
            .iter()
            .filter(|event| matches!(event, ConsumerEvent::Hide))
            .count()
    }
}

pub fn labels(words: &[&str]) -> Vec<String> {
    words.iter().map(|word| (*word).to_owned()).collect()
}
