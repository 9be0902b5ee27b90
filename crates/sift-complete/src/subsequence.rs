//! The builtin source: words from open documents that contain the prefix as a
//! subsequence, ranked by match shape and distance from the cursor.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use sift_config::{ConfigStore, SiftConfig, SUGGESTION_LIST_SEPARATORS};
use sift_core::{Document, DocumentId, Point, ScopeChain};
use sift_fuzzy::{find_words_with_subsequence, WordBoundary, WordMatch, WordSearch};
use sift_provider::{
    ApiVersion, ProviderOptions, ProviderResult, RegistrationHandle, Source, Suggestion,
    SuggestionProvider, SuggestionRequest, SuggestionsFuture, DEFAULT_LABEL,
};
use sift_scheduler::check_cancelled;
use sift_selector::{parse_or_warn, MatchCache, Selector};

pub const SUBSEQUENCE_PROVIDER_NAME: &str = "subsequence-provider";

/// API level the builtin source registers with.
pub const SUBSEQUENCE_API_VERSION: ApiVersion = ApiVersion::V4;

/// The row window `[start, end]` of `2 * max_delta` rows around `cursor_row`,
/// shifted to stay inside `[0, max_row]` when the document is long enough.
///
/// Ends may fall outside the document; callers clip before scanning.
pub fn clamped_range(max_delta: u32, cursor_row: u32, max_row: u32) -> (i64, i64) {
    let delta = i64::from(max_delta);
    let cursor = i64::from(cursor_row);
    let clamped_min = (cursor - delta).max(0);
    let clamped_max = (cursor + delta).min(i64::from(max_row));
    let below = cursor - clamped_min;
    let above = clamped_max - cursor;
    (cursor - below - (delta - above), cursor + above + (delta - below))
}

/// `floor(11 / (1 + 0.04 * distance))`.
fn locality_bonus(distance: u32) -> i32 {
    (11.0 / (1.0 + 0.04 * f64::from(distance))).floor() as i32
}

struct CompiledType {
    name: String,
    selectors: Vec<Selector>,
    priority: u32,
}

/// A configured suggestion, one per row of the pseudo-document.
struct ConfiguredSuggestion {
    text: String,
    type_tag: Option<String>,
}

/// Everything derived from the symbol configuration.
#[derive(Default)]
struct SymbolState {
    /// Snapshot the state was last checked against.
    config: Option<Arc<SiftConfig>>,
    symbols: sift_config::SymbolsConfig,
    types: Vec<CompiledType>,
    by_chain: HashMap<String, Option<String>>,
    suggestion_text: String,
    suggestions: Vec<ConfiguredSuggestion>,
}

impl SymbolState {
    fn refresh(&mut self, config: &Arc<SiftConfig>) {
        if self
            .config
            .as_ref()
            .is_some_and(|current| Arc::ptr_eq(current, config))
        {
            return;
        }
        self.config = Some(Arc::clone(config));

        let symbols = config.effective_symbols();
        if symbols == self.symbols && !self.types.is_empty() {
            return;
        }

        self.types = symbols
            .iter()
            .map(|(name, symbol)| CompiledType {
                name: name.clone(),
                selectors: parse_or_warn(&symbol.selector),
                priority: symbol.type_priority,
            })
            .collect();
        self.suggestions = symbols
            .iter()
            .flat_map(|(name, symbol)| {
                symbol.suggestions.iter().map(move |text| ConfiguredSuggestion {
                    text: text.clone(),
                    type_tag: (!name.is_empty()).then(|| name.clone()),
                })
            })
            .collect();
        self.suggestion_text = self
            .suggestions
            .iter()
            .map(|suggestion| suggestion.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        self.by_chain.clear();
        self.symbols = symbols;
    }

    fn type_for(&mut self, chain: &ScopeChain) -> Option<String> {
        let key = chain.to_chain_string();
        if let Some(cached) = self.by_chain.get(&key) {
            return cached.clone();
        }

        let mut best: Option<&CompiledType> = None;
        for candidate in &self.types {
            if !MatchCache::global().matches(&candidate.selectors, chain) {
                continue;
            }
            if best.map_or(true, |b| candidate.priority > b.priority) {
                best = Some(candidate);
            }
        }
        let type_tag = best
            .filter(|b| !b.name.is_empty())
            .map(|b| b.name.clone());
        self.by_chain.insert(key, type_tag.clone());
        type_tag
    }
}

struct Ranked {
    score: i32,
    suggestion: Suggestion,
}

impl Ranked {
    fn word_len(&self) -> usize {
        self.suggestion.text.as_deref().map_or(0, |text| text.chars().count())
    }
}

/// Builtin fallback source over the tracked documents and the configured
/// suggestion lists.
pub struct SubsequenceProvider {
    config: ConfigStore,
    options: ProviderOptions,
    documents: RwLock<Vec<Arc<dyn Document>>>,
    symbols: Mutex<SymbolState>,
    handle: Mutex<Option<RegistrationHandle>>,
}

impl SubsequenceProvider {
    pub fn new(config: ConfigStore) -> Self {
        let options = ProviderOptions::scope_selector("*")
            .with_labels([DEFAULT_LABEL, "default", SUBSEQUENCE_PROVIDER_NAME])
            .with_inclusion_priority(0, false)
            .with_suggestion_priority(0);
        Self {
            config,
            options,
            documents: RwLock::new(Vec::new()),
            symbols: Mutex::new(SymbolState::default()),
            handle: Mutex::new(None),
        }
    }

    /// This provider as a registrable source.
    pub fn source(self: &Arc<Self>) -> Source {
        Source::Current(Arc::clone(self) as Arc<dyn SuggestionProvider>)
    }

    /// Track `document` as a search target. Re-watching a document is a no-op.
    pub fn watch(&self, document: Arc<dyn Document>) {
        let mut documents = self.documents.write();
        if documents.iter().any(|tracked| tracked.id() == document.id()) {
            return;
        }
        documents.push(document);
    }

    pub fn unwatch(&self, id: DocumentId) -> bool {
        let mut documents = self.documents.write();
        let before = documents.len();
        documents.retain(|tracked| tracked.id() != id);
        documents.len() != before
    }

    pub fn watched(&self) -> Vec<DocumentId> {
        self.documents.read().iter().map(|document| document.id()).collect()
    }

    /// Search one document around `cursor_row`; `None` when it changed meanwhile.
    fn search_document(
        &self,
        document: &dyn Document,
        prefix: &str,
        cursor_row: u32,
        config: &SiftConfig,
        word_characters: &str,
    ) -> Option<Vec<WordMatch>> {
        let version = document.version();
        let text = document.text();
        let max_row = document.line_count().saturating_sub(1);

        let (start, end) = clamped_range(config.max_search_row_delta, cursor_row, max_row);
        if end < 0 || start > i64::from(max_row) {
            return Some(Vec::new());
        }
        let start = u32::try_from(start.max(0)).unwrap_or(0);
        let end = u32::try_from(end.min(i64::from(max_row))).unwrap_or(max_row);

        let matches = find_words_with_subsequence(
            &text,
            &WordSearch {
                query: prefix,
                boundary: WordBoundary::WordCharacters {
                    extra: word_characters,
                },
                max_results: config.max_results_per_buffer,
                rows: Some(start..=end),
            },
        );
        (document.version() == version).then_some(matches)
    }

    async fn collect(&self, request: SuggestionRequest) -> ProviderResult<Option<Vec<Suggestion>>> {
        let config = self.config.get();
        let prefix = request.prefix.as_str();
        if prefix.is_empty() || prefix.trim().chars().count() < config.minimum_word_length {
            return Ok(Some(Vec::new()));
        }

        let requesting = Arc::clone(&request.document);
        let mut documents = vec![Arc::clone(&requesting)];
        if config.include_completions_from_all_buffers {
            documents.extend(
                self.documents
                    .read()
                    .iter()
                    .filter(|document| document.id() != requesting.id())
                    .cloned(),
            );
        }

        let word_characters = config.additional_word_characters();
        let mut seen: HashSet<String> = HashSet::new();
        let mut ranked: Vec<Ranked> = Vec::new();

        for document in documents {
            check_cancelled(&request.cancel)?;

            let is_requesting = document.id() == requesting.id();
            let cursor_row = if is_requesting {
                request.position.row
            } else {
                document.last_cursor().map_or(0, |cursor| cursor.row)
            };
            let Some(matches) =
                self.search_document(&*document, prefix, cursor_row, &config, &word_characters)
            else {
                tracing::trace!(
                    target: "sift.subsequence",
                    document = %document.id(),
                    "document changed during search"
                );
                return Ok(None);
            };

            let cursors = if is_requesting {
                document.cursors()
            } else {
                Vec::new()
            };
            for word_match in matches {
                if word_match.word == prefix || seen.contains(&word_match.word) {
                    continue;
                }
                if config.strict_matching && !word_match.word.starts_with(prefix) {
                    continue;
                }
                if is_requesting && only_under_cursors(&word_match, &cursors) {
                    continue;
                }

                let mut score = word_match.score;
                if is_requesting && config.use_locality_bonus {
                    if let Some(distance) = word_match
                        .positions
                        .iter()
                        .map(|position| position.row.abs_diff(request.position.row))
                        .min()
                    {
                        score += locality_bonus(distance);
                    }
                }

                let type_tag = word_match.positions.first().and_then(|&position| {
                    let chain = document.scope_chain_at(position);
                    self.symbols.lock().type_for(&chain)
                });
                seen.insert(word_match.word.clone());
                let mut suggestion = Suggestion::text(word_match.word);
                suggestion.type_tag = type_tag;
                suggestion.character_match_indices = Some(word_match.match_indices);
                ranked.push(Ranked { score, suggestion });
            }

            tokio::task::yield_now().await;
        }

        check_cancelled(&request.cancel)?;
        self.collect_configured(prefix, &config, &mut seen, &mut ranked);

        ranked.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.word_len().cmp(&b.word_len())));
        ranked.truncate(config.max_suggestions);
        Ok(Some(ranked.into_iter().map(|r| r.suggestion).collect()))
    }

    /// Match the configured suggestion lists as one pseudo-document.
    fn collect_configured(
        &self,
        prefix: &str,
        config: &Arc<SiftConfig>,
        seen: &mut HashSet<String>,
        ranked: &mut Vec<Ranked>,
    ) {
        let mut symbols = self.symbols.lock();
        symbols.refresh(config);
        if symbols.suggestions.is_empty() {
            return;
        }

        let matches = find_words_with_subsequence(
            &symbols.suggestion_text,
            &WordSearch {
                query: prefix,
                boundary: WordBoundary::Separators(SUGGESTION_LIST_SEPARATORS),
                max_results: config.max_results_per_buffer,
                rows: None,
            },
        );
        for word_match in matches {
            if word_match.word == prefix {
                continue;
            }
            if config.strict_matching && !word_match.word.starts_with(prefix) {
                continue;
            }
            let Some(configured) = word_match
                .positions
                .first()
                .and_then(|position| symbols.suggestions.get(position.row as usize))
            else {
                continue;
            };
            if !seen.insert(configured.text.clone()) {
                continue;
            }
            let mut suggestion = Suggestion::text(configured.text.clone());
            suggestion.type_tag = configured.type_tag.clone();
            if configured.text == word_match.word {
                suggestion.character_match_indices = Some(word_match.match_indices);
            }
            ranked.push(Ranked {
                score: word_match.score,
                suggestion,
            });
        }
    }
}

/// Whether every occurrence of the word is one a cursor sits in (or at the end of).
fn only_under_cursors(word_match: &WordMatch, cursors: &[Point]) -> bool {
    let len = word_match.word.chars().count() as u32;
    !cursors.is_empty()
        && word_match.positions.iter().all(|position| {
            cursors.iter().any(|cursor| {
                cursor.row == position.row
                    && position.column <= cursor.column
                    && cursor.column <= position.column + len
            })
        })
}

impl SuggestionProvider for SubsequenceProvider {
    fn name(&self) -> &str {
        SUBSEQUENCE_PROVIDER_NAME
    }

    fn options(&self) -> &ProviderOptions {
        &self.options
    }

    fn get_suggestions(&self, request: SuggestionRequest) -> SuggestionsFuture<'_> {
        Box::pin(async move {
            // Refresh before searching so a symbols change applies to this request.
            {
                let config = self.config.get();
                self.symbols.lock().refresh(&config);
            }
            self.collect(request).await
        })
    }

    fn on_registered(&self, handle: RegistrationHandle) {
        *self.handle.lock() = Some(handle);
    }

    fn dispose(&self) {
        if let Some(handle) = self.handle.lock().take() {
            handle.dispose();
        }
        self.documents.write().clear();
        *self.symbols.lock() = SymbolState::default();
        tracing::debug!(target: "sift.subsequence", "builtin provider disposed");
    }
}

impl std::fmt::Debug for SubsequenceProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubsequenceProvider")
            .field("watched", &self.watched())
            .finish_non_exhaustive()
    }
}
