//! Stylesheet reconciliation.
//!
//! Styles have no lifecycle. Old sheets missing from the new page are
//! detached; the new list is then laid out in declared order, reusing
//! retained elements and moving fetched ones into place.

use rustc_hash::FxHashSet;

use super::Reconciler;
use crate::debug;
use crate::dom::{Document, NodeId};
use crate::resource::{IdentityMap, StyleResource, is_stylesheet};

impl Reconciler {
    /// Reconcile stylesheets under `region` (usually `head`).
    ///
    /// Returns the styles now on the page, in declared order.
    pub fn reconcile_styles(
        &self,
        old: &[StyleResource],
        new: &[StyleResource],
        region: NodeId,
    ) -> Vec<StyleResource> {
        let mut doc = self.doc.lock();
        remove_old_styles(&mut doc, old, new);
        add_new_styles(&mut doc, old, new, region)
    }
}

fn remove_old_styles(doc: &mut Document, old: &[StyleResource], new: &[StyleResource]) {
    let new_map = IdentityMap::new(new);
    for style in old {
        if new_map.contains(&style.address) || !doc.is_attached(style.node) {
            continue;
        }
        doc.detach(style.node);
        debug!("styles"; "removed {}", style.address);
    }
}

fn add_new_styles(
    doc: &mut Document,
    old: &[StyleResource],
    new: &[StyleResource],
    region: NodeId,
) -> Vec<StyleResource> {
    let old_map = IdentityMap::new(old);
    let first_existing = doc
        .elements_by_tag(region, "link")
        .into_iter()
        .find(|&node| is_stylesheet(doc, node));

    let mut seen = FxHashSet::default();
    let mut on_page = Vec::with_capacity(new.len());
    let mut previous: Option<NodeId> = None;

    for style in new {
        if !seen.insert(&style.address) {
            continue;
        }

        let placed = match old_map.get(&style.address) {
            Some(retained) => {
                // Move only when out of order
                if let Some(prev) = previous
                    && doc.next_element_sibling(prev) != Some(retained.node)
                {
                    doc.insert_after(retained.node, prev);
                    debug!("styles"; "reordered {}", retained.address);
                }
                retained.clone()
            }
            None => {
                match (previous, first_existing) {
                    (Some(prev), _) => {
                        doc.insert_after(style.node, prev);
                    }
                    (None, Some(first)) => match doc.parent(first) {
                        Some(parent) => doc.insert_before(parent, style.node, Some(first)),
                        None => doc.append_child(region, style.node),
                    },
                    (None, None) => doc.append_child(region, style.node),
                }
                debug!("styles"; "inserted {}", style.address);
                style.clone()
            }
        };

        previous = Some(placed.node);
        on_page.push(placed);
    }

    on_page
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::core::{Address, Environment};
    use crate::lifecycle::LifecycleBus;

    fn reconciler(doc: Document) -> Reconciler {
        let env = Environment::parse("https://example.com", true).unwrap();
        Reconciler::new(doc.into_shared(), Arc::new(LifecycleBus::new()), env)
    }

    fn link(doc: &mut Document, path: &str) -> StyleResource {
        let node = doc.create_element("link");
        doc.set_attr(node, "rel", "stylesheet");
        doc.set_attr(node, "href", path);
        StyleResource::new(node, Address::from_absolute(format!("https://example.com{path}")))
    }

    fn hrefs(doc: &Document, region: NodeId) -> Vec<String> {
        doc.children(region)
            .iter()
            .filter_map(|&n| doc.attr(n, "href").map(str::to_string))
            .collect()
    }

    #[test]
    fn test_new_style_lands_before_retained() {
        let mut doc = Document::new();
        let head = doc.head().unwrap();
        let x = link(&mut doc, "/x.css");
        doc.append_child(head, x.node);
        let y = link(&mut doc, "/y.css");
        let x_again = link(&mut doc, "/x.css");

        let r = reconciler(doc);
        let on_page = r.reconcile_styles(&[x.clone()], &[y.clone(), x_again], head);

        assert_eq!(on_page, vec![y, x.clone()]);
        let doc = r.document().lock();
        assert_eq!(hrefs(&doc, head), vec!["/y.css", "/x.css"]);
        assert_eq!(doc.parent(x.node), Some(head));
    }

    #[test]
    fn test_removed_styles_are_detached() {
        let mut doc = Document::new();
        let head = doc.head().unwrap();
        let a = link(&mut doc, "/a.css");
        let b = link(&mut doc, "/b.css");
        doc.append_child(head, a.node);
        doc.append_child(head, b.node);

        let r = reconciler(doc);
        let on_page = r.reconcile_styles(&[a.clone(), b.clone()], &[b.clone()], head);

        assert_eq!(on_page, vec![b]);
        assert!(!r.document().lock().is_attached(a.node));
    }

    #[test]
    fn test_declared_order_wins() {
        let mut doc = Document::new();
        let head = doc.head().unwrap();
        let meta = doc.create_element("meta");
        doc.append_child(head, meta);
        let a = link(&mut doc, "/a.css");
        let b = link(&mut doc, "/b.css");
        doc.append_child(head, b.node);
        doc.append_child(head, a.node);
        let c = link(&mut doc, "/c.css");

        let r = reconciler(doc);
        let new = [a.clone(), c.clone(), b.clone()];
        let on_page = r.reconcile_styles(&[a, b], &new, head);

        assert_eq!(on_page, new.to_vec());
        let doc = r.document().lock();
        assert_eq!(hrefs(&doc, head), vec!["/a.css", "/c.css", "/b.css"]);
        assert_eq!(doc.children(head)[0], meta);
    }

    #[test]
    fn test_region_without_styles_gets_appended() {
        let mut doc = Document::new();
        let head = doc.head().unwrap();
        let title = doc.create_element("title");
        doc.append_child(head, title);
        let a = link(&mut doc, "/a.css");
        let b = link(&mut doc, "/b.css");

        let r = reconciler(doc);
        r.reconcile_styles(&[], &[a, b], head);

        let doc = r.document().lock();
        assert_eq!(doc.children(head)[0], title);
        assert_eq!(hrefs(&doc, head), vec!["/a.css", "/b.css"]);
    }

    #[test]
    fn test_unchanged_styles_do_not_move() {
        let mut doc = Document::new();
        let head = doc.head().unwrap();
        let a = link(&mut doc, "/a.css");
        let b = link(&mut doc, "/b.css");
        doc.append_child(head, a.node);
        doc.append_child(head, b.node);
        let before = doc.children(head).to_vec();

        let r = reconciler(doc);
        let styles = [a, b];
        let on_page = r.reconcile_styles(&styles, &styles, head);

        assert_eq!(on_page, styles.to_vec());
        assert_eq!(r.document().lock().children(head), before.as_slice());
    }
}
