//! Value to XML node conversion.

use crate::node::{XmlContent, XmlNode, XmlTree};
use crate::value::Value;
use crate::{Document, Error, Result};

/// Convert a value to an element with the given tag.
///
/// Attributes are emitted in map order, the text (if any) before the
/// children, and children run by run in their stored order. Tag and
/// attribute names must be valid XML names.
pub fn to_xml(value: &Value, tag: &str) -> Result<XmlNode> {
    convert(value, tag, tag)
}

/// Convert a document to an XML tree.
pub fn document_to_tree(document: &Document) -> Result<XmlTree> {
    Ok(XmlTree {
        prolog: document.prolog.clone(),
        root: to_xml(&document.root, &document.root_tag)?,
    })
}

fn convert(value: &Value, tag: &str, path: &str) -> Result<XmlNode> {
    check_name(tag, path)?;
    let mut node = XmlNode::new(tag);

    match value {
        Value::Null => {}
        Value::Leaf(text) => node.push_text(text),
        Value::Object(element) => {
            for (name, value) in element.attributes() {
                check_name(name, &format!("{}/@{}", path, name))?;
                node.attributes.push((name.clone(), value.to_string()));
            }

            if let Some(text) = element.text() {
                node.push_text(text);
            }

            for group in element.groups() {
                let child_path = format!("{}/{}", path, group.tag());
                for child in group.slot().iter() {
                    let child_node = convert(child, group.tag(), &child_path)?;
                    node.content.push(XmlContent::Element(child_node));
                }
            }
        }
    }

    Ok(node)
}

fn check_name(name: &str, path: &str) -> Result<()> {
    if is_xml_name(name) {
        Ok(())
    } else {
        Err(Error::Structure(format!("invalid XML name '{}' at {}", name, path)))
    }
}

/// Check whether a string is usable as an element or attribute name.
pub fn is_xml_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if is_name_start(first) => chars.all(is_name_char),
        _ => false,
    }
}

fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == ':'
}

fn is_name_char(c: char) -> bool {
    is_name_start(c) || c.is_numeric() || matches!(c, '-' | '.' | '\u{B7}')
}
