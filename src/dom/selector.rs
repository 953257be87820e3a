//! Simple CSS selectors.
//!
//! Supports compound selectors made of a tag, an `#id` and `.class`es,
//! joined by descendant (whitespace) or child (`>`) combinators. Enough to
//! name a page's content region (`.Page-content > main`).

use std::fmt;

use thiserror::Error;

use super::{Document, Element, NodeId};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectorError {
    #[error("empty selector")]
    Empty,

    #[error("unsupported selector syntax `{0}`")]
    Unsupported(String),

    #[error("dangling combinator in `{0}`")]
    DanglingCombinator(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
}

impl Compound {
    fn parse(source: &str, full: &str) -> Result<Self, SelectorError> {
        let mut compound = Self::default();
        let mut rest = source;

        // Leading tag name (or `*`)
        let tag_end = rest.find(['#', '.']).unwrap_or(rest.len());
        let tag = &rest[..tag_end];
        if !tag.is_empty() && tag != "*" {
            if !is_ident(tag) {
                return Err(SelectorError::Unsupported(full.to_string()));
            }
            compound.tag = Some(tag.to_ascii_lowercase());
        }
        rest = &rest[tag_end..];

        while let Some(marker) = rest.chars().next() {
            let body = &rest[1..];
            let end = body.find(['#', '.']).unwrap_or(body.len());
            let name = &body[..end];
            if !is_ident(name) {
                return Err(SelectorError::Unsupported(full.to_string()));
            }
            match marker {
                '#' => compound.id = Some(name.to_string()),
                _ => compound.classes.push(name.to_string()),
            }
            rest = &body[end..];
        }

        Ok(compound)
    }

    fn matches(&self, element: &Element) -> bool {
        self.tag.as_ref().is_none_or(|t| element.tag == *t)
            && self.id.as_ref().is_none_or(|id| element.attr("id") == Some(id))
            && self.classes.iter().all(|c| element.has_class(c))
    }
}

fn is_ident(s: &str) -> bool {
    !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Parsed selector: compounds left to right, each with the combinator that
/// links it to the previous one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    source: String,
    parts: Vec<(Combinator, Compound)>,
}

impl Selector {
    pub fn parse(source: &str) -> Result<Self, SelectorError> {
        let trimmed = source.trim();
        if trimmed.is_empty() {
            return Err(SelectorError::Empty);
        }

        // Make `>` its own token regardless of surrounding spaces
        let spaced = trimmed.replace('>', " > ");
        let mut parts = Vec::new();
        let mut pending = Combinator::Descendant;
        let mut expecting_compound = true;

        for token in spaced.split_ascii_whitespace() {
            if token == ">" {
                if expecting_compound {
                    return Err(SelectorError::DanglingCombinator(trimmed.to_string()));
                }
                pending = Combinator::Child;
                expecting_compound = true;
                continue;
            }
            parts.push((pending, Compound::parse(token, trimmed)?));
            pending = Combinator::Descendant;
            expecting_compound = false;
        }

        if expecting_compound {
            return Err(SelectorError::DanglingCombinator(trimmed.to_string()));
        }

        Ok(Self {
            source: trimmed.to_string(),
            parts,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Check if `node` matches, with ancestors bounded by the whole tree.
    pub fn matches(&self, doc: &Document, node: NodeId) -> bool {
        self.matches_at(doc, node, self.parts.len() - 1)
    }

    fn matches_at(&self, doc: &Document, node: NodeId, idx: usize) -> bool {
        let (combinator, compound) = &self.parts[idx];
        let Some(element) = doc.element(node) else {
            return false;
        };
        if !compound.matches(element) {
            return false;
        }
        if idx == 0 {
            return true;
        }

        match combinator {
            Combinator::Child => doc
                .parent(node)
                .is_some_and(|parent| self.matches_at(doc, parent, idx - 1)),
            Combinator::Descendant => {
                let mut current = doc.parent(node);
                while let Some(ancestor) = current {
                    if self.matches_at(doc, ancestor, idx - 1) {
                        return true;
                    }
                    current = doc.parent(ancestor);
                }
                false
            }
        }
    }

    /// First matching descendant of `root` in document order.
    pub fn find_first(&self, doc: &Document, root: NodeId) -> Option<NodeId> {
        doc.descendants(root)
            .into_iter()
            .find(|&n| self.matches(doc, n))
    }

    /// All matching descendants of `root` in document order.
    pub fn find_all(&self, doc: &Document, root: NodeId) -> Vec<NodeId> {
        doc.descendants(root)
            .into_iter()
            .filter(|&n| self.matches(doc, n))
            .collect()
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl std::str::FromStr for Selector {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
