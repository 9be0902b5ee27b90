use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

mod blacklist;
mod logging;
mod schema;
mod store;

pub use blacklist::FileBlacklist;
pub use logging::{init_tracing, LoggingConfig};
pub use schema::json_schema;
pub use store::ConfigStore;

/// Environment variable overriding config discovery.
pub const SIFT_CONFIG_ENV_VAR: &str = "SIFT_CONFIG_PATH";

/// Characters that may count as word characters unless listed in
/// [`SiftConfig::non_word_characters`].
pub const POSSIBLE_WORD_CHARACTERS: &str = "/\\()\"':,.;<>~!@#$%^&*|+=[]{}`?_-…";

/// Separators between words of the configured suggestion lists.
pub const SUGGESTION_LIST_SEPARATORS: &str = "(){}[] :;,$@%";

/// How near-duplicate suggestions are collapsed before display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SimilarSuggestionRemoval {
    None,
    /// Collapse suggestions with the same text and snippet, keeping the first.
    #[default]
    TextOrSnippet,
}

/// A suggestion type used by the builtin provider: which scopes map to it and
/// which static suggestions it contributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[schemars(deny_unknown_fields)]
pub struct SymbolTypeConfig {
    /// Selector matched against the scope chain of a word occurrence.
    #[serde(default)]
    pub selector: String,

    /// Higher priorities win when several types match.
    #[serde(default = "SymbolTypeConfig::default_priority")]
    pub type_priority: u32,

    /// Static words offered as suggestions of this type.
    #[serde(default)]
    pub suggestions: Vec<String>,
}

impl SymbolTypeConfig {
    fn default_priority() -> u32 {
        1
    }

    pub fn new(selector: impl Into<String>, type_priority: u32) -> Self {
        Self {
            selector: selector.into(),
            type_priority,
            suggestions: Vec::new(),
        }
    }
}

/// Symbol types keyed by type tag. The empty tag is the fallback type.
pub type SymbolsConfig = BTreeMap<String, SymbolTypeConfig>;

/// Builtin symbol types; user entries with the same name replace these.
pub fn default_symbol_types() -> SymbolsConfig {
    BTreeMap::from([
        (
            "class".to_owned(),
            SymbolTypeConfig::new(".class.name, .inherited-class, .instance.type", 4),
        ),
        ("function".to_owned(), SymbolTypeConfig::new(".function.name", 3)),
        ("variable".to_owned(), SymbolTypeConfig::new(".variable", 2)),
        (String::new(), SymbolTypeConfig::new(".source", 1)),
    ])
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[schemars(deny_unknown_fields)]
pub struct SiftConfig {
    /// Register the builtin subsequence provider.
    #[serde(default = "default_true")]
    pub enable_builtin_provider: bool,

    /// Show suggestions while typing (as opposed to only on explicit activation).
    #[serde(default = "default_true")]
    pub enable_auto_activation: bool,

    /// Delay between the last qualifying keystroke and the suggestion request.
    #[serde(default = "SiftConfig::default_auto_activation_delay_ms")]
    pub auto_activation_delay_ms: u64,

    /// Deleting text re-triggers suggestions.
    #[serde(default)]
    pub backspace_triggers_autocomplete: bool,

    /// Accept the only suggestion of an explicit activation without showing the list.
    #[serde(default = "default_true")]
    pub enable_auto_confirm_single_suggestion: bool,

    /// Replace text after the cursor that overlaps the end of an accepted suggestion.
    #[serde(default = "default_true")]
    pub consume_suffix: bool,

    /// Let prefix matches dominate when filtering; otherwise score purely by subsequence shape.
    #[serde(default = "default_true")]
    pub use_alternate_scoring: bool,

    /// Use Unicode letter classes in the legacy prefix expression.
    #[serde(default)]
    pub enable_extended_unicode_support: bool,

    /// Glob patterns on document file names that never trigger suggestions.
    #[serde(default = "SiftConfig::default_file_blacklist")]
    pub file_blacklist: Vec<String>,

    /// Selectors for scopes in which no source is consulted.
    #[serde(default)]
    pub scope_blacklist: Vec<String>,

    /// Minimum trimmed prefix length for the builtin provider.
    #[serde(default = "SiftConfig::default_minimum_word_length")]
    #[schemars(range(min = 1))]
    pub minimum_word_length: usize,

    /// Rows searched above and below the cursor by the builtin provider.
    #[serde(default = "SiftConfig::default_max_search_row_delta")]
    pub max_search_row_delta: u32,

    /// Distinct words returned per searched document.
    #[serde(default = "SiftConfig::default_max_results")]
    pub max_results_per_buffer: usize,

    /// Suggestions returned by the builtin provider.
    #[serde(default = "SiftConfig::default_max_results")]
    pub max_suggestions: usize,

    #[serde(default)]
    pub similar_suggestion_removal: SimilarSuggestionRemoval,

    /// Search every tracked document, not only the one being edited.
    #[serde(default = "default_true")]
    pub include_completions_from_all_buffers: bool,

    /// Boost words that occur close to the cursor.
    #[serde(default = "default_true")]
    pub use_locality_bonus: bool,

    /// Only offer words that start with the prefix (case-sensitive).
    #[serde(default)]
    pub strict_matching: bool,

    /// Characters that delimit words.
    #[serde(default = "SiftConfig::default_non_word_characters")]
    pub non_word_characters: String,

    /// Characters always treated as part of a word.
    #[serde(default)]
    pub extra_word_characters: String,

    /// Saving keeps the list open when the host saves automatically.
    #[serde(default)]
    pub autosave_enabled: bool,

    /// Builtin-provider symbol types, merged over [`default_symbol_types`].
    #[serde(default)]
    pub symbols: SymbolsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_true() -> bool {
    true
}

impl SiftConfig {
    fn default_auto_activation_delay_ms() -> u64 {
        100
    }

    fn default_file_blacklist() -> Vec<String> {
        vec![".*".to_owned()]
    }

    fn default_minimum_word_length() -> usize {
        1
    }

    fn default_max_search_row_delta() -> u32 {
        3000
    }

    fn default_max_results() -> usize {
        20
    }

    fn default_non_word_characters() -> String {
        "/\\()\"':,.;<>~!@#$%^&*|+=[]{}`?-…".to_owned()
    }

    pub fn auto_activation_delay(&self) -> Duration {
        Duration::from_millis(self.auto_activation_delay_ms)
    }

    /// Characters counted as word characters in addition to letters and digits.
    pub fn additional_word_characters(&self) -> String {
        let mut out: String = POSSIBLE_WORD_CHARACTERS
            .chars()
            .filter(|ch| !self.non_word_characters.contains(*ch))
            .collect();
        for ch in self.extra_word_characters.chars() {
            if !out.contains(ch) {
                out.push(ch);
            }
        }
        out
    }

    /// Symbol types with user entries applied over the defaults.
    pub fn effective_symbols(&self) -> SymbolsConfig {
        let mut symbols = default_symbol_types();
        symbols.extend(self.symbols.iter().map(|(k, v)| (k.clone(), v.clone())));
        symbols
    }

    pub fn file_blacklist(&self) -> FileBlacklist {
        FileBlacklist::new(&self.file_blacklist)
    }

    /// Load a config file from TOML.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::load_from_str(&text)
    }

    pub fn load_from_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }
}

impl Default for SiftConfig {
    fn default() -> Self {
        Self {
            enable_builtin_provider: true,
            enable_auto_activation: true,
            auto_activation_delay_ms: Self::default_auto_activation_delay_ms(),
            backspace_triggers_autocomplete: false,
            enable_auto_confirm_single_suggestion: true,
            consume_suffix: true,
            use_alternate_scoring: true,
            enable_extended_unicode_support: false,
            file_blacklist: Self::default_file_blacklist(),
            scope_blacklist: Vec::new(),
            minimum_word_length: Self::default_minimum_word_length(),
            max_search_row_delta: Self::default_max_search_row_delta(),
            max_results_per_buffer: Self::default_max_results(),
            max_suggestions: Self::default_max_results(),
            similar_suggestion_removal: SimilarSuggestionRemoval::default(),
            include_completions_from_all_buffers: true,
            use_locality_bonus: true,
            strict_matching: false,
            non_word_characters: Self::default_non_word_characters(),
            extra_word_characters: String::new(),
            autosave_enabled: false,
            symbols: BTreeMap::new(),
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse toml config: {0}")]
    Toml(String),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        // The default `Display` embeds a source snippet; keep just the message.
        ConfigError::Toml(err.message().to_owned())
    }
}

/// Discover the config file for a workspace root.
///
/// Search order:
/// 1) `SIFT_CONFIG_PATH` (absolute or relative to `workspace_root`)
/// 2) `sift.toml` in `workspace_root`
/// 3) `.sift.toml` in `workspace_root`
pub fn discover_config_path(workspace_root: &Path) -> Option<PathBuf> {
    if let Some(value) = std::env::var_os(SIFT_CONFIG_ENV_VAR) {
        let candidate = PathBuf::from(value);
        let path = if candidate.is_absolute() {
            candidate
        } else {
            workspace_root.join(candidate)
        };
        return Some(path);
    }

    ["sift.toml", ".sift.toml"]
        .into_iter()
        .map(|name| workspace_root.join(name))
        .find(|path| path.is_file())
}

/// Load the configuration for a workspace root.
///
/// If no config is present, returns [`SiftConfig::default`] and `None`.
pub fn load_for_workspace(
    workspace_root: &Path,
) -> Result<(SiftConfig, Option<PathBuf>), ConfigError> {
    match discover_config_path(workspace_root) {
        Some(path) => {
            let config = SiftConfig::load_from_path(&path)?;
            tracing::debug!(target: "sift.config", path = %path.display(), "loaded config");
            Ok((config, Some(path)))
        }
        None => Ok((SiftConfig::default(), None)),
    }
}
