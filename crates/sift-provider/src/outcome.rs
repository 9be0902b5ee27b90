use std::fmt;

/// The result type returned by suggestion sources.
pub type ProviderResult<T> = Result<T, ProviderError>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProviderErrorKind {
    /// The source returned something unusable.
    InvalidResponse,
    /// The source observed its request's cancellation token and gave up.
    Cancelled,
    /// Any other source-side failure.
    Other,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    pub message: String,
}

impl ProviderError {
    pub fn new(kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn cancelled() -> Self {
        Self::new(ProviderErrorKind::Cancelled, "request superseded")
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Other, message)
    }

    pub fn is_cancelled(&self) -> bool {
        self.kind == ProviderErrorKind::Cancelled
    }
}

impl From<sift_scheduler::Cancelled> for ProviderError {
    fn from(_: sift_scheduler::Cancelled) -> Self {
        Self::cancelled()
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for ProviderError {}

impl fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProviderErrorKind::InvalidResponse => "invalid_response",
            ProviderErrorKind::Cancelled => "cancelled",
            ProviderErrorKind::Other => "other",
        };
        f.write_str(name)
    }
}
