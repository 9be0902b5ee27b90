use std::collections::HashSet;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use sift_core::ScopeChain;
use sift_selector::{parse_or_warn, MatchCache, Selector};
use thiserror::Error;

use crate::traits::{ProviderOptions, Source};
use crate::types::{ApiVersion, SourceId};

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RegisterError {
    #[error("invalid suggestion source {name}: {reason}")]
    InvalidSource { name: String, reason: String },
    #[error("unsupported provider API level {level}")]
    UnsupportedApiLevel { level: String },
}

/// A source as stored by the registry, with the options it registered with.
#[derive(Clone, Debug)]
pub struct RegisteredSource {
    pub id: SourceId,
    pub source: Source,
    pub api_version: ApiVersion,
    pub options: ProviderOptions,
}

struct Registration {
    info: RegisteredSource,
    match_selectors: Vec<Selector>,
    disable_selectors: Vec<Selector>,
    disable_default_selectors: Vec<Selector>,
}

struct Builtin {
    id: SourceId,
    source: Source,
    handle: RegistrationHandle,
}

#[derive(Default)]
struct RegistryState {
    next_id: u64,
    /// Every registration, in registration order.
    registrations: Vec<Arc<Registration>>,
    by_label: HashMap<String, Vec<Arc<Registration>>>,
    builtin: Option<Builtin>,
    scope_blacklist: Vec<Selector>,
}

struct RegistryInner {
    state: RwLock<RegistryState>,
    /// Serializes builtin toggles.
    builtin_toggle: Mutex<()>,
    cache: Option<Arc<MatchCache>>,
}

impl RegistryInner {
    fn remove(&self, id: SourceId) -> Option<Source> {
        let mut state = self.state.write();
        let idx = state
            .registrations
            .iter()
            .position(|registration| registration.info.id == id)?;
        let removed = state.registrations.remove(idx);
        state.by_label.retain(|_, registrations| {
            registrations.retain(|registration| registration.info.id != id);
            !registrations.is_empty()
        });
        if state.builtin.as_ref().is_some_and(|builtin| builtin.id == id) {
            state.builtin = None;
        }
        tracing::debug!(target: "sift.provider", source = removed.info.source.name(), %id, "unregistered source");
        Some(removed.info.source.clone())
    }
}

/// Disposes one registration (every label it was filed under).
///
/// Handles are cheap to clone and disposal is idempotent. Handles do not keep
/// the registry alive.
#[derive(Clone)]
pub struct RegistrationHandle {
    target: Option<(Weak<RegistryInner>, SourceId)>,
    disposed: Arc<AtomicBool>,
}

impl RegistrationHandle {
    /// A handle that owns nothing; returned for rejected sources.
    pub fn noop() -> Self {
        Self {
            target: None,
            disposed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn id(&self) -> Option<SourceId> {
        self.target.as_ref().map(|(_, id)| *id)
    }

    pub fn is_noop(&self) -> bool {
        self.target.is_none()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some((registry, id)) = &self.target {
            if let Some(registry) = registry.upgrade() {
                registry.remove(*id);
            }
        }
    }
}

impl fmt::Debug for RegistrationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrationHandle")
            .field("id", &self.id())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Registered suggestion sources, filed by context label.
///
/// Reads (`applicable_sources`) take a shared lock; registration changes are
/// serialized behind the write lock. Source callbacks (`on_registered`,
/// `dispose`) always run with no lock held.
#[derive(Clone)]
pub struct ProviderRegistry {
    inner: Arc<RegistryInner>,
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.read();
        f.debug_struct("ProviderRegistry")
            .field(
                "sources",
                &state
                    .registrations
                    .iter()
                    .map(|registration| registration.info.source.name())
                    .collect::<Vec<_>>(),
            )
            .field("builtin", &state.builtin.as_ref().map(|builtin| builtin.id))
            .finish()
    }
}

impl ProviderRegistry {
    /// Registry using the process-wide selector cache.
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Registry with its own selector cache.
    pub fn with_cache(cache: Arc<MatchCache>) -> Self {
        Self::build(Some(cache))
    }

    fn build(cache: Option<Arc<MatchCache>>) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                state: RwLock::new(RegistryState::default()),
                builtin_toggle: Mutex::new(()),
                cache,
            }),
        }
    }

    fn cache(&self) -> &MatchCache {
        match &self.inner.cache {
            Some(cache) => cache.as_ref(),
            None => MatchCache::global(),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.state.read().registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Register `source`, logging and returning a no-op handle if it is invalid.
    ///
    /// Returns `None` when the same source object is already registered.
    pub fn register(&self, source: Source, version: ApiVersion) -> Option<RegistrationHandle> {
        match self.try_register(source, version) {
            Ok(handle) => handle,
            Err(err) => {
                tracing::warn!(target: "sift.provider", error = %err, "rejected suggestion source");
                Some(RegistrationHandle::noop())
            }
        }
    }

    /// Like [`ProviderRegistry::register`], for a numeric API level.
    pub fn register_with_level(&self, source: Source, level: u32) -> Option<RegistrationHandle> {
        match ApiVersion::try_from(level) {
            Ok(version) => self.register(source, version),
            Err(err) => {
                tracing::warn!(target: "sift.provider", source = source.name(), error = %err, "rejected suggestion source");
                Some(RegistrationHandle::noop())
            }
        }
    }

    pub fn try_register(
        &self,
        source: Source,
        version: ApiVersion,
    ) -> Result<Option<RegistrationHandle>, RegisterError> {
        let selectors = validate(&source, version)?;

        let handle = {
            let mut state = self.inner.state.write();
            if state
                .registrations
                .iter()
                .any(|registration| registration.info.source.same_source(&source))
            {
                return Ok(None);
            }

            state.next_id += 1;
            let id = SourceId::from_raw(state.next_id);
            let options = source.options().clone();
            let mut labels = options.effective_labels();
            labels.dedup();

            let registration = Arc::new(Registration {
                info: RegisteredSource {
                    id,
                    source: source.clone(),
                    api_version: version,
                    options,
                },
                match_selectors: selectors.matching,
                disable_selectors: selectors.disable,
                disable_default_selectors: selectors.disable_default,
            });
            for label in labels {
                state
                    .by_label
                    .entry(label)
                    .or_default()
                    .push(Arc::clone(&registration));
            }
            state.registrations.push(registration);

            RegistrationHandle {
                target: Some((Arc::downgrade(&self.inner), id)),
                disposed: Arc::new(AtomicBool::new(false)),
            }
        };

        tracing::debug!(
            target: "sift.provider",
            source = source.name(),
            id = ?handle.id(),
            %version,
            "registered source"
        );
        source.on_registered(handle.clone());
        Ok(Some(handle))
    }

    /// Remove every registration of `source`. Returns `false` if it was not registered.
    pub fn unregister(&self, source: &Source) -> bool {
        let id = self
            .inner
            .state
            .read()
            .registrations
            .iter()
            .find(|registration| registration.info.source.same_source(source))
            .map(|registration| registration.info.id);
        match id {
            Some(id) => self.inner.remove(id).is_some(),
            None => false,
        }
    }

    pub fn source_for_id(&self, id: SourceId) -> Option<RegisteredSource> {
        self.inner
            .state
            .read()
            .registrations
            .iter()
            .find(|registration| registration.info.id == id)
            .map(|registration| registration.info.clone())
    }

    pub fn registration_for(&self, source: &Source) -> Option<RegisteredSource> {
        self.inner
            .state
            .read()
            .registrations
            .iter()
            .find(|registration| registration.info.source.same_source(source))
            .map(|registration| registration.info.clone())
    }

    /// Replace the global scope blacklist. Malformed patterns are logged and skipped.
    pub fn set_scope_blacklist(&self, patterns: &[String]) {
        let selectors: Vec<Selector> = patterns
            .iter()
            .flat_map(|pattern| parse_or_warn(pattern))
            .collect();
        self.inner.state.write().scope_blacklist = selectors;
    }

    /// Create (once) or tear down (once) the builtin source registration.
    pub fn set_builtin_enabled(&self, enabled: bool, factory: impl FnOnce() -> (Source, ApiVersion)) {
        let _toggle = self.inner.builtin_toggle.lock();
        if !enabled {
            self.disable_builtin();
            return;
        }
        if self.inner.state.read().builtin.is_some() {
            return;
        }

        let (source, version) = factory();
        let Some(handle) = self.register(source.clone(), version) else {
            return;
        };
        let Some(id) = handle.id() else {
            return;
        };
        self.inner.state.write().builtin = Some(Builtin { id, source, handle });
    }

    fn disable_builtin(&self) {
        let Some(builtin) = self.inner.state.write().builtin.take() else {
            return;
        };
        builtin.handle.dispose();
        builtin.source.dispose();
    }

    pub fn is_builtin(&self, id: SourceId) -> bool {
        self.inner
            .state
            .read()
            .builtin
            .as_ref()
            .is_some_and(|builtin| builtin.id == id)
    }

    pub fn builtin_id(&self) -> Option<SourceId> {
        self.inner.state.read().builtin.as_ref().map(|builtin| builtin.id)
    }

    /// Sources applicable to `chain` under any of `labels`, in fetch order.
    ///
    /// Sources are filed by label; matches are filtered by disable patterns
    /// and the builtin suppression patterns, then by `exclude_lower_priority`,
    /// then stably sorted by suggestion priority and selector specificity.
    pub fn applicable_sources<S: AsRef<str>>(
        &self,
        labels: &[S],
        chain: &ScopeChain,
    ) -> Vec<RegisteredSource> {
        let cache = self.cache();
        let state = self.inner.state.read();

        if chain.is_empty() {
            return Vec::new();
        }
        if !state.scope_blacklist.is_empty() && cache.matches(&state.scope_blacklist, chain) {
            tracing::trace!(target: "sift.provider", chain = %chain, "scope chain is blacklisted");
            return Vec::new();
        }

        let mut seen = HashSet::new();
        let mut candidates: Vec<&Arc<Registration>> = Vec::new();
        for label in labels {
            let Some(registrations) = state.by_label.get(label.as_ref()) else {
                continue;
            };
            for registration in registrations {
                if seen.insert(registration.info.id) {
                    candidates.push(registration);
                }
            }
        }

        let mut disable_builtin = false;
        let mut matching: Vec<&Arc<Registration>> = Vec::new();
        for registration in candidates {
            if !registration.disable_selectors.is_empty()
                && cache.matches(&registration.disable_selectors, chain)
            {
                continue;
            }
            if !cache.matches(&registration.match_selectors, chain) {
                continue;
            }
            if !registration.disable_default_selectors.is_empty()
                && cache.matches(&registration.disable_default_selectors, chain)
            {
                disable_builtin = true;
            }
            matching.push(registration);
        }

        if disable_builtin {
            if let Some(builtin) = &state.builtin {
                matching.retain(|registration| registration.info.id != builtin.id);
            }
        }

        let threshold = matching
            .iter()
            .filter(|registration| registration.info.options.exclude_lower_priority)
            .map(|registration| registration.info.options.inclusion_priority)
            .max();
        if let Some(threshold) = threshold {
            matching.retain(|registration| registration.info.options.inclusion_priority >= threshold);
        }

        let mut ranked: Vec<(u32, &Arc<Registration>)> = matching
            .into_iter()
            .map(|registration| {
                let specificity = cache
                    .best_match(&registration.match_selectors, chain)
                    .map_or(0, Selector::specificity);
                (specificity, registration)
            })
            .collect();
        // `sort_by` is stable: full ties keep label/registration order.
        ranked.sort_by(|(specificity_a, a), (specificity_b, b)| {
            b.info
                .options
                .suggestion_priority
                .cmp(&a.info.options.suggestion_priority)
                .then_with(|| specificity_b.cmp(specificity_a))
        });

        ranked
            .into_iter()
            .map(|(_, registration)| registration.info.clone())
            .collect()
    }

    /// Tear down every registration and dispose each source once.
    pub fn dispose(&self) {
        {
            let _toggle = self.inner.builtin_toggle.lock();
            self.disable_builtin();
        }
        let drained = {
            let mut state = self.inner.state.write();
            state.by_label.clear();
            std::mem::take(&mut state.registrations)
        };
        for registration in drained {
            registration.info.source.dispose();
        }
    }
}

struct ValidatedSelectors {
    matching: Vec<Selector>,
    disable: Vec<Selector>,
    disable_default: Vec<Selector>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|value| !value.trim().is_empty())
}

fn validate(source: &Source, version: ApiVersion) -> Result<ValidatedSelectors, RegisterError> {
    let name = source.name();
    let invalid = |reason: &str| RegisterError::InvalidSource {
        name: name.to_owned(),
        reason: reason.to_owned(),
    };

    match (version, source) {
        (ApiVersion::V1, Source::Legacy(_)) => {}
        (ApiVersion::V1, Source::Current(_)) => {
            return Err(invalid("level 1 sources must implement request_handler"));
        }
        (_, Source::Legacy(_)) => {
            return Err(invalid("level 2+ sources must implement get_suggestions"));
        }
        (_, Source::Current(_)) => {}
    }

    let options = source.options();
    let (match_pattern, disable_pattern) = match version {
        ApiVersion::V1 => (
            non_empty(&options.selector).ok_or_else(|| invalid("missing selector"))?,
            non_empty(&options.disable_for_selector),
        ),
        ApiVersion::V2 => {
            if options.selector.is_some() || options.disable_for_selector.is_some() {
                tracing::warn!(
                    target: "sift.provider",
                    source = name,
                    "`selector` and `disable_for_selector` are deprecated; use `scope_selector` and `disable_for_scope_selector`"
                );
            }
            (
                non_empty(&options.selector)
                    .or(non_empty(&options.scope_selector))
                    .ok_or_else(|| invalid("missing scope_selector"))?,
                non_empty(&options.disable_for_selector)
                    .or(non_empty(&options.disable_for_scope_selector)),
            )
        }
        ApiVersion::V3 | ApiVersion::V4 => {
            if options.selector.is_some() {
                return Err(invalid("specifies `selector` instead of `scope_selector`"));
            }
            if options.disable_for_selector.is_some() {
                return Err(invalid(
                    "specifies `disable_for_selector` instead of `disable_for_scope_selector`",
                ));
            }
            (
                non_empty(&options.scope_selector).ok_or_else(|| invalid("missing scope_selector"))?,
                non_empty(&options.disable_for_scope_selector),
            )
        }
    };

    let parse = |pattern: &str| {
        Selector::parse(pattern).map_err(|err| RegisterError::InvalidSource {
            name: name.to_owned(),
            reason: format!("malformed selector: {err}"),
        })
    };
    Ok(ValidatedSelectors {
        matching: parse(match_pattern)?,
        disable: disable_pattern.map(parse).transpose()?.unwrap_or_default(),
        disable_default: non_empty(&options.disable_default_provider_selector)
            .map(parse)
            .transpose()?
            .unwrap_or_default(),
    })
}
