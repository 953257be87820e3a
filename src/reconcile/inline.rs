//! Inline script rebuild.
//!
//! Inline scripts have no address, so they are never retained. Every pass
//! swaps each executable one in the new region for a fresh copy, which is
//! what makes it run again.

use crate::dom::{Document, NodeId};

/// Check if a `type` attribute value denotes executable script.
///
/// Missing or empty types, JavaScript/ECMAScript MIME types and `module`
/// are executable; data blocks (`application/json`, templates) are not.
pub fn is_executable(script_type: Option<&str>) -> bool {
    let Some(raw) = script_type else {
        return true;
    };
    let ty = raw.trim().to_ascii_lowercase();
    ty.is_empty() || ty == "module" || ty.contains("javascript") || ty.contains("ecmascript")
}

/// Replace every inline executable script under `root` with a fresh copy.
///
/// Returns how many were replaced.
pub fn rebuild_inline_scripts(doc: &mut Document, root: NodeId) -> usize {
    let targets: Vec<NodeId> = doc
        .elements_by_tag(root, "script")
        .into_iter()
        .filter(|&node| {
            doc.element(node)
                .is_some_and(|e| !e.has_attr("src") && is_executable(e.attr("type")))
        })
        .collect();

    let mut rebuilt = 0;
    for old in targets {
        let Some(attrs) = doc.element(old).map(|e| e.attrs.clone()) else {
            continue;
        };
        let code = doc.text_content(old);

        let fresh = doc.create_element("script");
        for (name, value) in attrs {
            doc.set_attr(fresh, &name, value);
        }
        doc.set_text_content(fresh, code);

        if doc.replace_child(fresh, old) {
            rebuilt += 1;
        }
    }
    rebuilt
}
