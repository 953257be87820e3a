//! Markup parsing.
//!
//! Converts `tl` parse trees into [`Document`] nodes. Whitespace-only text
//! is dropped except inside raw text elements (`script`, `style`), where it
//! is part of the code.

use thiserror::Error;

use super::{Document, NodeId};

/// Markup could not be turned into nodes.
#[derive(Debug, Error)]
pub enum DomError {
    #[error("failed to parse markup: {0}")]
    Parse(String),
}

/// Elements whose text content is code, not prose.
fn is_raw_text_element(tag: &str) -> bool {
    matches!(tag, "script" | "style")
}

impl Document {
    /// Parse a complete page.
    ///
    /// Missing `head`/`body` are not synthesized; the markup decides.
    pub fn parse(html: &str) -> Result<Self, DomError> {
        let mut doc = Self::empty();
        let root = doc.root();
        doc.parse_into(root, html)?;
        Ok(doc)
    }

    /// Parse markup into a new detached fragment and return the fragment.
    ///
    /// Used for freshly fetched pages: their nodes live in this document
    /// but stay off the page until a reconciler inserts them.
    pub fn parse_fragment(&mut self, html: &str) -> Result<NodeId, DomError> {
        let fragment = self.create_fragment();
        self.parse_into(fragment, html)?;
        Ok(fragment)
    }

    fn parse_into(&mut self, parent: NodeId, html: &str) -> Result<(), DomError> {
        let dom = tl::parse(html, tl::ParserOptions::default())
            .map_err(|e| DomError::Parse(format!("{e:?}")))?;

        let parser = dom.parser();
        for handle in dom.children() {
            self.convert_node(*handle, parser, parent, false);
        }
        Ok(())
    }

    /// Convert a tl node (and its subtree) under `parent`.
    fn convert_node(
        &mut self,
        handle: tl::NodeHandle,
        parser: &tl::Parser,
        parent: NodeId,
        raw_text: bool,
    ) {
        let Some(node) = handle.get(parser) else {
            return;
        };

        match node {
            tl::Node::Tag(tag) => {
                let tag_name = tag.name().as_utf8_str().to_lowercase();
                // <!DOCTYPE html> and friends
                if tag_name.starts_with('!') {
                    return;
                }

                let element = self.create_element(&tag_name);
                let attrs = tag.attributes();
                for (key, value) in attrs.iter() {
                    let key_str: &str = key.as_ref();
                    let value_str = value.map(|v| v.to_string()).unwrap_or_default();
                    self.set_attr(element, key_str, value_str);
                }
                // tl keeps id/class apart from the generic attribute list
                if let Some(id) = attrs.id()
                    && self.attr(element, "id").is_none()
                {
                    self.set_attr(element, "id", id.as_utf8_str().to_string());
                }
                if let Some(class) = attrs.class()
                    && self.attr(element, "class").is_none()
                {
                    self.set_attr(element, "class", class.as_utf8_str().to_string());
                }

                self.append_child(parent, element);

                let child_raw = is_raw_text_element(&tag_name);
                for child_handle in tag.children().top().iter() {
                    self.convert_node(*child_handle, parser, element, child_raw);
                }
            }
            tl::Node::Raw(bytes) => {
                let text = bytes.as_utf8_str().to_string();
                if raw_text || !text.trim().is_empty() {
                    let node = self.create_text(text);
                    self.append_child(parent, node);
                }
            }
            tl::Node::Comment(_) => {}
        }
    }
}
