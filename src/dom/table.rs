//! Side tables keyed by node handle.
//!
//! Per-element state (lifecycle status, in-flight loads, feature
//! controllers) lives here instead of on the element itself. The component
//! that creates the elements owns the table.

use rustc_hash::FxHashMap;

use super::{Document, NodeId};

#[derive(Debug, Clone)]
pub struct NodeTable<T> {
    entries: FxHashMap<NodeId, T>,
}

impl<T> Default for NodeTable<T> {
    fn default() -> Self {
        Self {
            entries: FxHashMap::default(),
        }
    }
}

impl<T> NodeTable<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, node: NodeId) -> Option<&T> {
        self.entries.get(&node)
    }

    pub fn get_mut(&mut self, node: NodeId) -> Option<&mut T> {
        self.entries.get_mut(&node)
    }

    /// Return the value for `node`, creating it on first access.
    pub fn get_or_insert_with(&mut self, node: NodeId, create: impl FnOnce() -> T) -> &mut T {
        self.entries.entry(node).or_insert_with(create)
    }

    pub fn insert(&mut self, node: NodeId, value: T) -> Option<T> {
        self.entries.insert(node, value)
    }

    pub fn remove(&mut self, node: NodeId) -> Option<T> {
        self.entries.remove(&node)
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.entries.contains_key(&node)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop entries whose node left the page.
    pub fn retain_attached(&mut self, doc: &Document) {
        self.entries.retain(|node, _| doc.is_attached(*node));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Carousel {
        slides: usize,
    }

    #[test]
    fn test_get_or_insert_reuses_instance() {
        let mut doc = Document::new();
        let node = doc.create_element("div");
        let mut table = NodeTable::new();

        table.get_or_insert_with(node, || Carousel { slides: 3 });
        // Second access must not rebuild the controller
        let carousel = table.get_or_insert_with(node, || Carousel { slides: 0 });
        assert_eq!(carousel.slides, 3);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_retain_attached() {
        let mut doc = Document::new();
        let body = doc.body().unwrap();
        let kept = doc.create_element("div");
        let gone = doc.create_element("div");
        doc.append_child(body, kept);

        let mut table = NodeTable::new();
        table.insert(kept, 1);
        table.insert(gone, 2);
        table.retain_attached(&doc);

        assert!(table.contains(kept));
        assert!(!table.contains(gone));
    }
}
