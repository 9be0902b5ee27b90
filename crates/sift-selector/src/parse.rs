use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectorError {
    #[error("empty selector in {pattern:?}")]
    Empty { pattern: String },
    #[error("unsupported character {ch:?} in selector {pattern:?}")]
    Unsupported { pattern: String, ch: char },
    #[error("combinator without a scope on both sides in {pattern:?}")]
    DanglingCombinator { pattern: String },
    #[error("empty class name in selector {pattern:?}")]
    EmptyClass { pattern: String },
}

/// How a compound relates to the compound before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    /// Whitespace: any ancestor.
    Descendant,
    /// `>`: the immediate parent.
    Child,
}

/// A single scope test: `*` or a set of classes that must all be present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Compound {
    Any,
    Classes(Vec<String>),
}

impl Compound {
    fn parse(text: &str, pattern: &str) -> Result<Self, SelectorError> {
        if text == "*" {
            return Ok(Compound::Any);
        }
        let body = text.strip_prefix('.').unwrap_or(text);
        let classes: Vec<String> = body.split('.').map(str::to_owned).collect();
        if classes.iter().any(String::is_empty) {
            return Err(SelectorError::EmptyClass {
                pattern: pattern.to_owned(),
            });
        }
        Ok(Compound::Classes(classes))
    }

    fn specificity(&self) -> u32 {
        match self {
            Compound::Any => 0,
            Compound::Classes(classes) => 10 * classes.len() as u32,
        }
    }

    pub(crate) fn matches(&self, element: &[&str]) -> bool {
        match self {
            Compound::Any => true,
            Compound::Classes(classes) => classes
                .iter()
                .all(|class| element.contains(&class.as_str())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Part {
    pub(crate) combinator: Combinator,
    pub(crate) compound: Compound,
}

/// One alternative of a comma-separated scope selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    source: String,
    parts: Vec<Part>,
    specificity: u32,
}

impl Selector {
    /// Parse a comma-separated pattern into its alternatives.
    pub fn parse(pattern: &str) -> Result<Vec<Selector>, SelectorError> {
        pattern
            .split(',')
            .map(|alternative| Self::parse_alternative(alternative.trim(), pattern))
            .collect()
    }

    fn parse_alternative(text: &str, pattern: &str) -> Result<Selector, SelectorError> {
        let mut parts: Vec<Part> = Vec::new();
        let mut pending = Combinator::Descendant;
        let mut current = String::new();

        let flush = |current: &mut String,
                     pending: &mut Combinator,
                     parts: &mut Vec<Part>|
         -> Result<(), SelectorError> {
            if current.is_empty() {
                return Ok(());
            }
            parts.push(Part {
                combinator: *pending,
                compound: Compound::parse(current.as_str(), pattern)?,
            });
            *pending = Combinator::Descendant;
            current.clear();
            Ok(())
        };

        for ch in text.chars() {
            match ch {
                '(' | ')' | '[' | ']' | ':' | '"' | '\'' => {
                    return Err(SelectorError::Unsupported {
                        pattern: pattern.to_owned(),
                        ch,
                    });
                }
                '>' => {
                    flush(&mut current, &mut pending, &mut parts)?;
                    if parts.is_empty() || pending == Combinator::Child {
                        return Err(SelectorError::DanglingCombinator {
                            pattern: pattern.to_owned(),
                        });
                    }
                    pending = Combinator::Child;
                }
                ch if ch.is_whitespace() => flush(&mut current, &mut pending, &mut parts)?,
                ch => current.push(ch),
            }
        }
        flush(&mut current, &mut pending, &mut parts)?;

        if parts.is_empty() {
            return Err(SelectorError::Empty {
                pattern: pattern.to_owned(),
            });
        }
        if pending == Combinator::Child {
            return Err(SelectorError::DanglingCombinator {
                pattern: pattern.to_owned(),
            });
        }

        let specificity = parts.iter().map(|part| part.compound.specificity()).sum();
        Ok(Selector {
            source: text.to_owned(),
            parts,
            specificity,
        })
    }

    /// The alternative's text as written (trimmed).
    pub fn source(&self) -> &str {
        &self.source
    }

    /// 10 per class name; `*` contributes nothing.
    pub fn specificity(&self) -> u32 {
        self.specificity
    }

    pub fn compounds(&self) -> impl Iterator<Item = (Combinator, &Compound)> {
        self.parts.iter().map(|part| (part.combinator, &part.compound))
    }

    /// Whether the rightmost compound matches the last element of `elements`
    /// and the remaining compounds match its ancestors.
    pub(crate) fn matches_elements(&self, elements: &[Vec<&str>]) -> bool {
        match_from(&self.parts, elements)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn match_from(parts: &[Part], elements: &[Vec<&str>]) -> bool {
    let Some((last, rest)) = parts.split_last() else {
        return true;
    };
    let Some((element, ancestors)) = elements.split_last() else {
        return false;
    };
    if !last.compound.matches(element) {
        return false;
    }
    if rest.is_empty() {
        return true;
    }
    match last.combinator {
        Combinator::Child => match_from(rest, ancestors),
        Combinator::Descendant => (1..=ancestors.len())
            .rev()
            .any(|end| match_from(rest, &ancestors[..end])),
    }
}
