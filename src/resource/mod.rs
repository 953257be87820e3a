//! Page resources: scripts and stylesheets.
//!
//! Markup contract for scripts:
//!
//! ```html
//! <script src="/js/gallery.js"
//!         data-script-key="gallery"
//!         data-script-dependencies='["lightbox"]'></script>
//! ```
//!
//! A script takes part in the lifecycle only with a same-origin `src` and a
//! key. Stylesheets are `link` elements with `rel="stylesheet"` or an
//! `href` ending in `.css`.

mod identity;

use std::sync::Arc;

use url::Url;

use crate::core::{Address, Key};
use crate::dom::{Document, NodeId};
use crate::reconcile::ReconcileError;

pub use identity::{Addressed, IdentityMap};

/// Attribute carrying the logical feature key.
pub const KEY_ATTR: &str = "data-script-key";

/// Attribute carrying the JSON list of dependency keys.
pub const DEPENDENCIES_ATTR: &str = "data-script-dependencies";

// =============================================================================
// Scripts
// =============================================================================

/// One external script, identified by its address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptResource {
    /// Element on the page (or in the fetched fragment).
    pub node: NodeId,
    pub address: Address,
    pub key: Option<Key>,
    /// Keys that must be ready before this script is inserted.
    pub dependencies: Vec<Key>,
    pub script_type: Option<Arc<str>>,
    pub no_module: bool,
    pub cross_origin: Option<Arc<str>>,
}

impl ScriptResource {
    pub fn new(node: NodeId, address: Address) -> Self {
        Self {
            node,
            address,
            key: None,
            dependencies: Vec::new(),
            script_type: None,
            no_module: false,
            cross_origin: None,
        }
    }

    pub fn with_key(mut self, key: impl Into<Key>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_dependencies<K: Into<Key>>(mut self, deps: impl IntoIterator<Item = K>) -> Self {
        self.dependencies = deps.into_iter().map(Into::into).collect();
        self
    }

    /// Read a `script` element. Returns `Ok(None)` for inline scripts.
    ///
    /// Fails on a malformed dependency list; there is no partial recovery.
    pub fn from_element(
        doc: &Document,
        node: NodeId,
        base: &Url,
    ) -> Result<Option<Self>, ReconcileError> {
        let Some(element) = doc.element(node) else {
            return Ok(None);
        };
        let Some(address) = element.attr("src").and_then(|src| Address::resolve(base, src))
        else {
            return Ok(None);
        };

        let dependencies = match element.attr(DEPENDENCIES_ATTR) {
            Some(raw) => parse_dependencies(raw).map_err(|source| {
                ReconcileError::MalformedDependencies {
                    address: address.clone(),
                    source,
                }
            })?,
            None => Vec::new(),
        };

        Ok(Some(Self {
            node,
            key: element
                .attr(KEY_ATTR)
                .filter(|k| !k.trim().is_empty())
                .map(Key::from),
            dependencies,
            script_type: element.attr("type").map(Arc::from),
            no_module: element.has_attr("nomodule"),
            cross_origin: element.attr("crossorigin").map(Arc::from),
            address,
        }))
    }

    pub fn is_module(&self) -> bool {
        self.script_type
            .as_deref()
            .is_some_and(|t| t.trim().eq_ignore_ascii_case("module"))
    }
}

/// Parse `data-script-dependencies` (a JSON array of key strings).
pub fn parse_dependencies(raw: &str) -> Result<Vec<Key>, serde_json::Error> {
    serde_json::from_str(raw)
}

/// Collect every `script[src]` under `root`, in document order.
pub fn collect_scripts(
    doc: &Document,
    root: NodeId,
    base: &Url,
) -> Result<Vec<ScriptResource>, ReconcileError> {
    let mut scripts = Vec::new();
    for node in doc.elements_by_tag(root, "script") {
        if let Some(script) = ScriptResource::from_element(doc, node, base)? {
            scripts.push(script);
        }
    }
    Ok(scripts)
}

// =============================================================================
// Styles
// =============================================================================

/// One external stylesheet, identified by its address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleResource {
    pub node: NodeId,
    pub address: Address,
}

impl StyleResource {
    pub fn new(node: NodeId, address: Address) -> Self {
        Self { node, address }
    }
}

/// Check if a `link` element is a stylesheet.
pub fn is_stylesheet(doc: &Document, node: NodeId) -> bool {
    let rel_stylesheet = doc
        .attr(node, "rel")
        .is_some_and(|rel| rel.split_ascii_whitespace().any(|r| r.eq_ignore_ascii_case("stylesheet")));
    let css_href = doc.attr(node, "href").is_some_and(|href| href.ends_with(".css"));
    rel_stylesheet || css_href
}

/// Collect stylesheet links under `root`, in document order.
pub fn collect_styles(doc: &Document, root: NodeId, base: &Url) -> Vec<StyleResource> {
    doc.elements_by_tag(root, "link")
        .into_iter()
        .filter(|&node| is_stylesheet(doc, node))
        .filter_map(|node| {
            let href = doc.attr(node, "href")?;
            Address::resolve(base, href).map(|address| StyleResource::new(node, address))
        })
        .collect()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://example.com/").unwrap()
    }

    fn script(doc: &mut Document, attrs: &[(&str, &str)]) -> NodeId {
        let body = doc.body().unwrap();
        let node = doc.create_element("script");
        for (k, v) in attrs {
            doc.set_attr(node, k, *v);
        }
        doc.append_child(body, node);
        node
    }

    #[test]
    fn test_from_element_reads_contract() {
        let mut doc = Document::new();
        let node = script(
            &mut doc,
            &[
                ("src", "/js/gallery.js"),
                (KEY_ATTR, "gallery"),
                (DEPENDENCIES_ATTR, r#"["lightbox", "utils"]"#),
                ("type", "module"),
                ("crossorigin", "anonymous"),
            ],
        );

        let resource = ScriptResource::from_element(&doc, node, &base())
            .unwrap()
            .unwrap();
        assert_eq!(resource.address.as_str(), "https://example.com/js/gallery.js");
        assert_eq!(resource.key, Some(Key::from("gallery")));
        assert_eq!(
            resource.dependencies,
            vec![Key::from("lightbox"), Key::from("utils")]
        );
        assert!(resource.is_module());
        assert!(!resource.no_module);
        assert_eq!(resource.cross_origin.as_deref(), Some("anonymous"));
    }

    #[test]
    fn test_inline_script_is_not_a_resource() {
        let mut doc = Document::new();
        let node = script(&mut doc, &[]);
        assert_eq!(ScriptResource::from_element(&doc, node, &base()).unwrap(), None);
    }

    #[test]
    fn test_malformed_dependencies_fail_fast() {
        let mut doc = Document::new();
        script(&mut doc, &[("src", "/ok.js")]);
        script(&mut doc, &[("src", "/bad.js"), (DEPENDENCIES_ATTR, "[lightbox")]);

        let err = collect_scripts(&doc, doc.root(), &base()).unwrap_err();
        assert!(matches!(err, ReconcileError::MalformedDependencies { .. }));
        assert!(err.to_string().contains("bad.js"));
    }

    #[test]
    fn test_blank_key_is_no_key() {
        let mut doc = Document::new();
        let node = script(&mut doc, &[("src", "/a.js"), (KEY_ATTR, "  ")]);
        let resource = ScriptResource::from_element(&doc, node, &base())
            .unwrap()
            .unwrap();
        assert_eq!(resource.key, None);
    }

    #[test]
    fn test_collect_styles() {
        let mut doc = Document::new();
        let head = doc.head().unwrap();
        for (rel, href) in [
            ("stylesheet", "/a.css"),
            ("preload", "/b.css"),
            ("icon", "/favicon.ico"),
            ("alternate stylesheet", "/theme"),
        ] {
            let link = doc.create_element("link");
            doc.set_attr(link, "rel", rel);
            doc.set_attr(link, "href", href);
            doc.append_child(head, link);
        }

        let styles: Vec<_> = collect_styles(&doc, head, &base())
            .into_iter()
            .map(|s| s.address.path().unwrap())
            .collect();
        assert_eq!(styles, vec!["/a.css", "/b.css", "/theme"]);
    }
}
