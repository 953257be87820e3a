//! Document Model
//!
//! Arena-backed page model the reconcilers operate on.
//!
//! # Modules
//!
//! - `parse` - Markup parsing via `tl`
//! - `selector` - Simple CSS selectors (tag, id, class, `>` and descendant)
//! - `table` - Side tables keyed by node handle
//!
//! A detached node keeps its handle, attributes and children, so lifecycle
//! handlers can still inspect a region after it left the page. Once nothing
//! needs a detached subtree any more, [`Document::release`] drops its
//! contents. Handles are never reused, so a stale handle cannot alias a
//! newer node.

mod parse;
mod selector;
mod table;

use std::sync::Arc;

use parking_lot::Mutex;
use smallvec::SmallVec;

pub use parse::DomError;
pub use selector::{Selector, SelectorError};
pub use table::NodeTable;

/// Document shared between the reconciler and its deferred insertions.
pub type SharedDocument = Arc<Mutex<Document>>;

/// Stable handle of a node inside a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Element tag plus attributes (in source order).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub tag: String,
    pub attrs: SmallVec<[(String, String); 4]>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into().to_ascii_lowercase(),
            attrs: SmallVec::new(),
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attr(name).is_some()
    }

    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self
            .attrs
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
        {
            Some((_, v)) => *v = value,
            None => self.attrs.push((name.to_ascii_lowercase(), value)),
        }
    }

    pub fn remove_attr(&mut self, name: &str) {
        self.attrs.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
    }

    /// Whitespace-separated class list contains `class`.
    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .is_some_and(|list| list.split_ascii_whitespace().any(|c| c == class))
    }
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    /// The document itself.
    Root,
    Element(Box<Element>),
    Text(String),
    /// Detached container for parsed markup.
    Fragment,
    /// Contents dropped by [`Document::release`].
    Released,
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Arena of nodes rooted at [`Document::root`].
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
}

const ROOT: NodeId = NodeId(0);

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create a document with an empty `html > head + body` skeleton.
    pub fn new() -> Self {
        let mut doc = Self::empty();
        let html = doc.create_element("html");
        let head = doc.create_element("head");
        let body = doc.create_element("body");
        doc.append_child(ROOT, html);
        doc.append_child(html, head);
        doc.append_child(html, body);
        doc
    }

    /// Create a document holding only the root node.
    pub fn empty() -> Self {
        Self {
            nodes: vec![Node {
                kind: NodeKind::Root,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    /// Wrap the document for sharing with the reconciler.
    pub fn into_shared(self) -> SharedDocument {
        Arc::new(Mutex::new(self))
    }

    #[inline]
    pub const fn root(&self) -> NodeId {
        ROOT
    }

    /// Number of nodes ever created (attached or not).
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    // -------------------------------------------------------------------------
    // Creation
    // -------------------------------------------------------------------------

    fn push(&mut self, kind: NodeKind) -> NodeId {
        #[allow(clippy::cast_possible_truncation)] // arena never approaches u32::MAX nodes
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            kind,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    /// Create a detached element.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(NodeKind::Element(Box::new(Element::new(tag))))
    }

    /// Create a detached text node.
    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeKind::Text(text.into()))
    }

    /// Create a detached fragment container.
    pub fn create_fragment(&mut self) -> NodeId {
        self.push(NodeKind::Fragment)
    }

    // -------------------------------------------------------------------------
    // Node data
    // -------------------------------------------------------------------------

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.index()].kind
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match &self.nodes[id.index()].kind {
            NodeKind::Element(element) => Some(&**element),
            _ => None,
        }
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match &mut self.nodes[id.index()].kind {
            NodeKind::Element(element) => Some(&mut **element),
            _ => None,
        }
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|e| e.tag.as_str())
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id).and_then(|e| e.attr(name))
    }

    /// Set an attribute. No-op on non-element nodes.
    pub fn set_attr(&mut self, id: NodeId, name: &str, value: impl Into<String>) {
        if let Some(element) = self.element_mut(id) {
            element.set_attr(name, value);
        }
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) {
        if let Some(element) = self.element_mut(id) {
            element.remove_attr(name);
        }
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        if let NodeKind::Text(text) = &self.nodes[id.index()].kind {
            out.push_str(text);
        }
        for node in self.descendants(id) {
            if let NodeKind::Text(text) = &self.nodes[node.index()].kind {
                out.push_str(text);
            }
        }
        out
    }

    /// Replace all children with a single text node.
    pub fn set_text_content(&mut self, id: NodeId, text: impl Into<String>) {
        for child in self.nodes[id.index()].children.clone() {
            self.detach(child);
        }
        let text = text.into();
        if !text.is_empty() {
            let node = self.create_text(text);
            self.append_child(id, node);
        }
    }

    // -------------------------------------------------------------------------
    // Tree navigation
    // -------------------------------------------------------------------------

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.index()].children
    }

    /// Next sibling that is an element.
    pub fn next_element_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let siblings = self.children(parent);
        let pos = siblings.iter().position(|&c| c == id)?;
        siblings[pos + 1..]
            .iter()
            .copied()
            .find(|&c| self.element(c).is_some())
    }

    /// Preorder descendants of `id` (excluding `id`).
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).iter().rev().copied());
        }
        out
    }

    /// Descendant elements with the given tag, in document order.
    pub fn elements_by_tag(&self, root: NodeId, tag: &str) -> Vec<NodeId> {
        self.descendants(root)
            .into_iter()
            .filter(|&n| self.tag(n).is_some_and(|t| t.eq_ignore_ascii_case(tag)))
            .collect()
    }

    /// First descendant (preorder) matching `pred`.
    pub fn find_first(&self, root: NodeId, pred: impl Fn(&Element) -> bool) -> Option<NodeId> {
        self.descendants(root)
            .into_iter()
            .find(|&n| self.element(n).is_some_and(&pred))
    }

    /// Check if `ancestor` contains `id` (a node contains itself).
    pub fn contains(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            current = self.parent(node);
        }
        false
    }

    /// Check if the node is connected to the document root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        self.contains(ROOT, id)
    }

    pub fn head(&self) -> Option<NodeId> {
        self.elements_by_tag(ROOT, "head").into_iter().next()
    }

    pub fn body(&self) -> Option<NodeId> {
        self.elements_by_tag(ROOT, "body").into_iter().next()
    }

    // -------------------------------------------------------------------------
    // Mutation
    // -------------------------------------------------------------------------

    /// Remove a node from its parent. The node keeps its subtree.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.index()].parent.take() {
            self.nodes[parent.index()].children.retain(|&c| c != id);
        }
    }

    /// Append `child` as the last child of `parent`, moving it if attached.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.insert_before(parent, child, None);
    }

    /// Insert `child` before `reference` under `parent`.
    ///
    /// Appends when `reference` is `None` or not a child of `parent`.
    /// Inserting a node into its own subtree is ignored.
    pub fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: Option<NodeId>) {
        if child == ROOT || self.contains(child, parent) {
            return;
        }
        self.detach(child);

        let children = &mut self.nodes[parent.index()].children;
        let pos = reference
            .and_then(|r| children.iter().position(|&c| c == r))
            .unwrap_or(children.len());
        children.insert(pos, child);
        self.nodes[child.index()].parent = Some(parent);
    }

    /// Insert `child` directly after `reference` (same parent).
    ///
    /// Returns false if `reference` is detached.
    pub fn insert_after(&mut self, child: NodeId, reference: NodeId) -> bool {
        let Some(parent) = self.parent(reference) else {
            return false;
        };
        if child == reference {
            return true;
        }
        // Detach first so the sibling lookup sees the final order.
        self.detach(child);
        let siblings = self.children(parent);
        let next = siblings
            .iter()
            .position(|&c| c == reference)
            .and_then(|pos| siblings.get(pos + 1).copied());
        self.insert_before(parent, child, next);
        true
    }

    /// Put `new` where `old` is; `old` ends up detached.
    ///
    /// Returns false if `old` is detached.
    pub fn replace_child(&mut self, new: NodeId, old: NodeId) -> bool {
        let Some(parent) = self.parent(old) else {
            return false;
        };
        if new == old {
            return true;
        }
        self.insert_before(parent, new, Some(old));
        self.detach(old);
        true
    }

    /// Drop the contents of a detached subtree.
    ///
    /// Every node under `id` (inclusive) becomes [`NodeKind::Released`] with
    /// no children. Attached nodes and the root are left alone. Returns how
    /// many nodes were released.
    pub fn release(&mut self, id: NodeId) -> usize {
        if id == ROOT || self.is_attached(id) {
            return 0;
        }
        self.detach(id);

        let mut released = 0;
        let mut stack = vec![id];
        while let Some(node) = stack.pop() {
            let slot = &mut self.nodes[node.index()];
            stack.append(&mut slot.children);
            slot.children.shrink_to_fit();
            slot.parent = None;
            if !matches!(slot.kind, NodeKind::Released) {
                slot.kind = NodeKind::Released;
                released += 1;
            }
        }
        released
    }

    /// Position of `id` among its parent's children.
    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&c| c == id)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_document_skeleton() {
        let doc = Document::new();
        let head = doc.head().unwrap();
        let body = doc.body().unwrap();
        assert_eq!(doc.tag(head), Some("head"));
        assert_eq!(doc.tag(body), Some("body"));
        assert!(doc.is_attached(body));
    }

    #[test]
    fn test_append_moves_between_parents() {
        let mut doc = Document::new();
        let body = doc.body().unwrap();
        let head = doc.head().unwrap();
        let node = doc.create_element("div");

        assert!(!doc.is_attached(node));
        doc.append_child(body, node);
        assert_eq!(doc.parent(node), Some(body));

        doc.append_child(head, node);
        assert_eq!(doc.parent(node), Some(head));
        assert!(doc.children(body).is_empty());
    }

    #[test]
    fn test_insert_before_and_after() {
        let mut doc = Document::new();
        let body = doc.body().unwrap();
        let a = doc.create_element("a");
        let b = doc.create_element("b");
        let c = doc.create_element("c");

        doc.append_child(body, a);
        doc.insert_before(body, c, Some(a));
        assert!(doc.insert_after(b, c));
        assert_eq!(doc.children(body), &[c, b, a]);

        // Reordering within the same parent
        assert!(doc.insert_after(c, a));
        assert_eq!(doc.children(body), &[b, a, c]);
        assert_eq!(doc.next_element_sibling(b), Some(a));
        assert_eq!(doc.next_element_sibling(c), None);
    }

    #[test]
    fn test_replace_child_detaches_old() {
        let mut doc = Document::new();
        let body = doc.body().unwrap();
        let old = doc.create_element("script");
        let new = doc.create_element("script");
        doc.append_child(body, old);

        assert!(doc.replace_child(new, old));
        assert_eq!(doc.children(body), &[new]);
        assert!(!doc.is_attached(old));
        let orphan = doc.create_element("p");
        assert!(!doc.replace_child(old, orphan));
    }

    #[test]
    fn test_insert_into_own_subtree_is_ignored() {
        let mut doc = Document::new();
        let body = doc.body().unwrap();
        let outer = doc.create_element("div");
        let inner = doc.create_element("div");
        doc.append_child(body, outer);
        doc.append_child(outer, inner);

        doc.append_child(inner, outer);
        assert_eq!(doc.parent(outer), Some(body));
    }

    #[test]
    fn test_text_content_and_attrs() {
        let mut doc = Document::new();
        let node = doc.create_element("script");
        doc.set_text_content(node, "window.x = 1;");
        doc.set_attr(node, "Data-Script-Key", "x");

        assert_eq!(doc.text_content(node), "window.x = 1;");
        assert_eq!(doc.attr(node, "data-script-key"), Some("x"));

        doc.remove_attr(node, "data-script-key");
        assert_eq!(doc.attr(node, "data-script-key"), None);
    }

    #[test]
    fn test_release_drops_detached_subtree_only() {
        let mut doc = Document::new();
        let body = doc.body().unwrap();
        let kept = doc.create_element("main");
        doc.append_child(body, kept);

        let fragment = doc.create_fragment();
        let region = doc.create_element("main");
        let text = doc.create_text("old");
        doc.append_child(fragment, region);
        doc.append_child(region, text);

        assert_eq!(doc.release(kept), 0);
        assert_eq!(doc.tag(kept), Some("main"));

        let before = doc.len();
        assert_eq!(doc.release(fragment), 3);
        assert_eq!(doc.len(), before);
        assert!(matches!(doc.kind(region), NodeKind::Released));
        assert!(doc.element(region).is_none());
        assert_eq!(doc.text_content(region), "");
        assert!(doc.children(fragment).is_empty());
        assert_eq!(doc.parent(text), None);

        // New nodes get fresh handles
        let fresh = doc.create_element("div");
        assert!(![fragment, region, text].contains(&fresh));
    }

    #[test]
    fn test_descendants_preorder() {
        let mut doc = Document::empty();
        let a = doc.create_element("a");
        let b = doc.create_element("b");
        let c = doc.create_element("c");
        doc.append_child(doc.root(), a);
        doc.append_child(a, b);
        doc.append_child(doc.root(), c);
        assert_eq!(doc.descendants(doc.root()), vec![a, b, c]);
        assert_eq!(doc.index_in_parent(c), Some(1));
    }
}
