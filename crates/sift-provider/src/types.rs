use std::fmt;
use std::str::FromStr;

use crate::RegisterError;

/// Provider API level a source was written against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ApiVersion {
    /// `request_handler` with the flat legacy argument set.
    V1 = 1,
    /// `get_suggestions`; `selector` is still accepted (deprecated).
    V2 = 2,
    /// `scope_selector` only.
    V3 = 3,
    /// Like V3, but receives the primary prefix instead of the legacy one.
    V4 = 4,
}

impl ApiVersion {
    pub fn as_u32(self) -> u32 {
        self as u32
    }

    /// Whether requests carry the legacy (regex-derived) prefix.
    pub fn uses_legacy_prefix(self) -> bool {
        self < ApiVersion::V4
    }
}

impl TryFrom<u32> for ApiVersion {
    type Error = RegisterError;

    fn try_from(level: u32) -> Result<Self, Self::Error> {
        match level {
            1 => Ok(ApiVersion::V1),
            2 => Ok(ApiVersion::V2),
            3 => Ok(ApiVersion::V3),
            4 => Ok(ApiVersion::V4),
            other => Err(RegisterError::UnsupportedApiLevel {
                level: other.to_string(),
            }),
        }
    }
}

/// Parses version strings such as `"2.0.0"` by their major component.
impl FromStr for ApiVersion {
    type Err = RegisterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unsupported = || RegisterError::UnsupportedApiLevel {
            level: s.to_owned(),
        };
        let major = s.trim().split('.').next().ok_or_else(unsupported)?;
        let major: u32 = major.parse().map_err(|_| unsupported())?;
        ApiVersion::try_from(major).map_err(|_| unsupported())
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.0.0", self.as_u32())
    }
}

/// Identifies one registration in a [`crate::ProviderRegistry`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SourceId(u64);

impl SourceId {
    #[inline]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn to_raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "source#{}", self.0)
    }
}

/// A single completion candidate.
///
/// Suggestions are plain values rebuilt every cycle. `replacement_prefix` is
/// either supplied by the source or assigned from the live prefix by the
/// orchestrator, in which case `prefix_modified` is set and the value is
/// re-derived on the next cycle instead of being reused.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Suggestion {
    pub text: Option<String>,
    /// Snippet body; expansion of tab stops is up to the embedder.
    pub snippet: Option<String>,
    pub display_text: Option<String>,
    pub replacement_prefix: Option<String>,
    pub prefix_modified: bool,
    pub type_tag: Option<String>,
    pub left_label: Option<String>,
    pub right_label: Option<String>,
    pub description: Option<String>,
    /// Rank-decay factor assigned by filtering.
    pub sort_score: Option<f64>,
    /// Filter score; higher is better.
    pub score: Option<f64>,
    /// Character indices of the matched query characters within the text.
    pub character_match_indices: Option<Vec<usize>>,
    /// The registration that produced this suggestion.
    pub source: Option<SourceId>,
}

impl Suggestion {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn snippet(snippet: impl Into<String>) -> Self {
        Self {
            snippet: Some(snippet.into()),
            ..Self::default()
        }
    }

    pub fn with_replacement_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.replacement_prefix = Some(prefix.into());
        self.prefix_modified = false;
        self
    }

    pub fn with_type(mut self, type_tag: impl Into<String>) -> Self {
        self.type_tag = Some(type_tag.into());
        self
    }

    pub fn with_display_text(mut self, display_text: impl Into<String>) -> Self {
        self.display_text = Some(display_text.into());
        self
    }

    /// Snippet if present, else text.
    pub fn insertion_text(&self) -> Option<&str> {
        self.snippet.as_deref().or(self.text.as_deref())
    }

    /// Whether there is anything to insert: a non-empty text or snippet.
    pub fn has_content(&self) -> bool {
        let non_empty = |value: &Option<String>| value.as_deref().is_some_and(|v| !v.is_empty());
        non_empty(&self.text) || non_empty(&self.snippet)
    }

    /// Text shown in a list: display text, else text, else snippet.
    pub fn label(&self) -> &str {
        self.display_text
            .as_deref()
            .or(self.text.as_deref())
            .or(self.snippet.as_deref())
            .unwrap_or("")
    }
}
