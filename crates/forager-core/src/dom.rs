//! Owned, index-addressed view of a parsed HTML page.
//!
//! Parsing is delegated to `scraper` (html5ever underneath), which tolerates
//! the malformed markup job boards routinely serve. The parse tree is then
//! flattened into an arena: nodes live in a single `Vec`, children are index
//! lists, and a [`NodeId`] is all a caller ever holds. That keeps traversal
//! free of borrow gymnastics and makes the document `Send`, so extraction
//! can run inside per-site worker tasks.
//!
//! Documents are built fresh per fetched page and dropped after extraction;
//! nothing downstream retains node references.

use crate::error::ScrapeError;

/// Index of a node within its [`Document`] arena.
///
/// Arena order is pre-order document order, so comparing indices compares
/// document positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// A single node: an element with tag/attributes/children, or a text run.
#[derive(Debug, Clone)]
pub enum Node {
    Element {
        /// Lowercased at build time; matching is exact-name afterwards.
        tag: String,
        /// Ordered; names are unique within a node (parser-enforced).
        attrs: Vec<(String, String)>,
        children: Vec<NodeId>,
    },
    Text(String),
}

/// An immutable HTML document arena, rooted at the `<html>` element.
#[derive(Debug)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Document {
    /// Parse an HTML string.
    ///
    /// html5ever recovers from almost anything, so this only fails when the
    /// input produces no root element at all.
    pub fn parse(html: &str) -> Result<Self, ScrapeError> {
        let parsed = scraper::Html::parse_document(html);
        let root_ref = parsed
            .tree
            .root()
            .children()
            .find_map(scraper::ElementRef::wrap)
            .ok_or_else(|| ScrapeError::Parse("document has no root element".to_string()))?;

        let root = NodeId(0);
        let mut nodes = vec![convert_element(&root_ref)];

        // Iterative pre-order flatten; children are pushed reversed so they
        // pop in document order. Adversarially deep nesting therefore can't
        // blow the call stack.
        let mut stack: Vec<(ego_tree::NodeRef<'_, scraper::Node>, NodeId)> =
            root_ref.children().rev().map(|c| (c, root)).collect();

        while let Some((node_ref, parent)) = stack.pop() {
            let converted = match node_ref.value() {
                scraper::Node::Element(_) => match scraper::ElementRef::wrap(node_ref) {
                    Some(e) => convert_element(&e),
                    None => continue,
                },
                scraper::Node::Text(t) => Node::Text(t.text.to_string()),
                // Comments, doctypes, PIs carry nothing we extract.
                _ => continue,
            };

            let id = NodeId(nodes.len() as u32);
            let is_element = matches!(converted, Node::Element { .. });
            nodes.push(converted);
            if let Node::Element { children, .. } = &mut nodes[parent.index()] {
                children.push(id);
            }
            if is_element {
                for child in node_ref.children().rev() {
                    stack.push((child, id));
                }
            }
        }

        Ok(Self { nodes, root })
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    /// Tag name of an element node, `None` for text nodes.
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match self.get(id) {
            Node::Element { tag, .. } => Some(tag),
            Node::Text(_) => None,
        }
    }

    /// Attribute value by name, `None` for text nodes or absent attributes.
    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        match self.get(id) {
            Node::Element { attrs, .. } => attrs
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.as_str()),
            Node::Text(_) => None,
        }
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        match self.get(id) {
            Node::Element { children, .. } => children,
            Node::Text(_) => &[],
        }
    }

    /// Literal content of a text node, `None` for elements.
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.get(id) {
            Node::Text(t) => Some(t),
            Node::Element { .. } => None,
        }
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.get(id), Node::Element { .. })
    }
}

fn convert_element(el: &scraper::ElementRef<'_>) -> Node {
    let value = el.value();
    Node::Element {
        tag: value.name().to_ascii_lowercase(),
        attrs: value
            .attrs()
            .map(|(n, v)| (n.to_string(), v.to_string()))
            .collect(),
        children: Vec::new(),
    }
}
