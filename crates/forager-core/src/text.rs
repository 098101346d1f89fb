//! Text and attribute extraction from matched subtrees.

use crate::dom::{Document, NodeId};

/// Flattened visible text of a subtree.
///
/// A text node contributes its literal content; an element contributes its
/// children's extractions joined by single spaces with empty pieces
/// skipped. Equivalent to joining every non-empty text node under `id` in
/// document order — run [`clean_text`] over the result before storing it.
pub fn extract_text(doc: &Document, id: NodeId) -> String {
    let mut out = String::new();
    let mut stack = vec![id];
    while let Some(current) = stack.pop() {
        if let Some(text) = doc.text(current) {
            if !text.is_empty() {
                if !out.is_empty() {
                    out.push(' ');
                }
                out.push_str(text);
            }
        } else {
            for child in doc.children(current).iter().rev() {
                stack.push(*child);
            }
        }
    }
    out
}

/// Collapse whitespace runs to single spaces and trim the result.
/// Idempotent.
pub fn clean_text(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut pending_space = false;
    for c in text.chars() {
        if c.is_whitespace() {
            pending_space = !result.is_empty();
        } else {
            if pending_space {
                result.push(' ');
                pending_space = false;
            }
            result.push(c);
        }
    }
    result
}

/// Attribute value of an element node, or `""` when absent.
pub fn extract_attr(doc: &Document, id: NodeId, name: &str) -> String {
    doc.attr(id, name).unwrap_or_default().to_string()
}
