//! Tag-plus-predicate node matching over a [`Document`] arena.
//!
//! This is deliberately not CSS: job-board descriptors only ever need
//! "tag with a class fragment" or "tag with an attribute fragment", and a
//! forgiving substring predicate survives the class-name churn those sites
//! go through better than an exact selector would.

use crate::dom::{Document, NodeId};

/// How a candidate element's attributes are matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// Matches every element.
    Any,
    /// Substring match against the `class` attribute.
    Class(String),
    /// Substring match against a named attribute's value.
    Attr { name: String, value: String },
}

impl Predicate {
    /// Parse descriptor syntax:
    ///
    /// - `""` → [`Predicate::Any`]
    /// - `name="value"` → attribute substring match (`class="x"` folds into
    ///   a class match)
    /// - anything else → class substring match
    pub fn parse(raw: &str) -> Self {
        if raw.is_empty() {
            return Predicate::Any;
        }
        if let Some((name, rest)) = raw.split_once("=\"") {
            if let Some(value) = rest.strip_suffix('"') {
                if name == "class" {
                    return Predicate::Class(value.to_string());
                }
                return Predicate::Attr {
                    name: name.to_string(),
                    value: value.to_string(),
                };
            }
        }
        Predicate::Class(raw.to_string())
    }

    fn matches(&self, doc: &Document, id: NodeId) -> bool {
        match self {
            Predicate::Any => true,
            Predicate::Class(fragment) => doc
                .attr(id, "class")
                .is_some_and(|classes| classes.contains(fragment.as_str())),
            Predicate::Attr { name, value } => doc
                .attr(id, name)
                .is_some_and(|v| v.contains(value.as_str())),
        }
    }
}

/// A `(tag, predicate)` pair. Empty tag matches any element; tag comparison
/// is exact against the arena's lowercased names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    pub tag: String,
    pub predicate: Predicate,
}

impl Selector {
    pub fn new(tag: &str, predicate: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            predicate: Predicate::parse(predicate),
        }
    }

    /// Does this element node match? Text nodes never match.
    pub fn matches(&self, doc: &Document, id: NodeId) -> bool {
        let Some(tag) = doc.tag(id) else {
            return false;
        };
        if !self.tag.is_empty() && tag != self.tag {
            return false;
        }
        self.predicate.matches(doc, id)
    }
}

/// Lazy pre-order iterator over matching element nodes.
///
/// Yields in document order; a matched node's descendants are still
/// searched, so matches can nest. Finite and non-restartable.
pub struct Matches<'a> {
    doc: &'a Document,
    selector: &'a Selector,
    stack: Vec<NodeId>,
}

impl Iterator for Matches<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        while let Some(id) = self.stack.pop() {
            // Reversed push keeps pop order = document order.
            for child in self.doc.children(id).iter().rev() {
                self.stack.push(*child);
            }
            if self.selector.matches(self.doc, id) {
                return Some(id);
            }
        }
        None
    }
}

/// All elements under (and including) `scope` that match `selector`.
pub fn select<'a>(doc: &'a Document, scope: NodeId, selector: &'a Selector) -> Matches<'a> {
    Matches {
        doc,
        selector,
        stack: vec![scope],
    }
}

/// First match in document order, if any. Absence is not an error.
pub fn first_match(doc: &Document, scope: NodeId, selector: &Selector) -> Option<NodeId> {
    select(doc, scope, selector).next()
}
