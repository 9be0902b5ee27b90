use std::fmt;
use std::sync::Arc;

/// Ordered syntactic context tags at a buffer position, outermost first.
///
/// Each scope is a dot-separated class list such as `source.js` or
/// `comment.line.double-slash.js`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ScopeChain {
    scopes: Arc<[String]>,
}

impl ScopeChain {
    pub fn new<I, S>(scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let scopes: Vec<String> = scopes
            .into_iter()
            .map(Into::into)
            .map(|scope| scope.trim_start_matches('.').to_owned())
            .filter(|scope| !scope.is_empty())
            .collect();
        Self {
            scopes: scopes.into(),
        }
    }

    /// Parse a rendered chain such as `.source.js .comment.line`.
    pub fn parse(chain: &str) -> Self {
        Self::new(chain.split_whitespace())
    }

    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    /// Render as `.a.b .c.d`, the literal form used as a cache key.
    pub fn to_chain_string(&self) -> String {
        let mut out = String::new();
        for (idx, scope) in self.scopes.iter().enumerate() {
            if idx > 0 {
                out.push(' ');
            }
            out.push('.');
            out.push_str(scope);
        }
        out
    }

    /// Return a copy with `scope` appended as the innermost element.
    pub fn with_scope(&self, scope: impl Into<String>) -> Self {
        Self::new(self.scopes.iter().cloned().chain(std::iter::once(scope.into())))
    }
}

impl fmt::Display for ScopeChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_chain_string())
    }
}
