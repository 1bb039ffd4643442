//! Tree backend: roxmltree parsing and the node-to-value walk.

use crate::backend::Backend;
use crate::node::{read_declaration, XmlContent, XmlNode, XmlTree};
use crate::value::{Element, Value};
use crate::{Document, Error, Result};

/// Parse XML text into an [`XmlTree`].
///
/// Comments and processing instructions are dropped; adjacent text and CDATA
/// runs are merged.
pub fn parse_tree(xml: &str) -> Result<XmlTree> {
    let prolog = read_declaration(xml)?.into();
    let document = roxmltree::Document::parse(xml).map_err(|e| Error::Parse(e.to_string()))?;

    Ok(XmlTree {
        prolog,
        root: convert_node(document.root_element()),
    })
}

fn convert_node(node: roxmltree::Node<'_, '_>) -> XmlNode {
    let mut result = XmlNode::new(node.tag_name().name());

    for attr in node.attributes() {
        result
            .attributes
            .push((attr.name().to_string(), attr.value().to_string()));
    }

    for child in node.children() {
        if child.is_element() {
            result.content.push(XmlContent::Element(convert_node(child)));
        } else if child.is_text() {
            if let Some(text) = child.text() {
                result.push_text(text);
            }
        }
    }

    result
}

/// Convert an element to its value.
///
/// Attributes keep their order, children are appended run by run and the
/// element's text is the text before its first child, trimmed. Text after a
/// child element is not part of the model.
pub fn to_value(node: &XmlNode) -> Value {
    let mut element = Element::new();

    for (key, value) in &node.attributes {
        element.set_attribute(key.as_str(), value.as_str());
    }

    for item in &node.content {
        match item {
            XmlContent::Element(child) => element.push_child(child.tag.as_str(), to_value(child)),
            XmlContent::Text(text) if element.child_count() == 0 => element.set_text(Some(text.clone())),
            XmlContent::Text(_) => {}
        }
    }

    element.into_value()
}

/// Convert a parsed tree to a document.
pub fn tree_to_document(tree: &XmlTree) -> Document {
    Document {
        prolog: tree.prolog.clone(),
        root_tag: tree.root.tag.clone(),
        root: to_value(&tree.root),
    }
}

/// Backend built on roxmltree.
#[derive(Debug, Clone, Copy, Default)]
pub struct TreeBackend;

impl Backend for TreeBackend {
    fn name(&self) -> &'static str {
        "tree"
    }

    fn parse_document(&self, xml: &str) -> Result<Document> {
        let tree = parse_tree(xml)?;
        Ok(tree_to_document(&tree))
    }
}
