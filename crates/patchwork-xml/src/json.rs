//! JSON rendering of the value model.
//!
//! Conventions, applied the same way in both directions:
//!
//! - `Null` is `null`, `Leaf` is a string
//! - attributes are keys prefixed with `@`, in document order
//! - the element text is stored under `#text`
//! - each child run is a key; a run of several elements is an array
//! - if a tag occurs in more than one run, a keyed object would lose the
//!   sibling order, so the children are written as
//!   `"#children": [{"tag": value}, ...]` instead

use serde::Serialize;
use serde_json::{Map, Number, Value as Json};

use crate::value::{AttributeValue, Element, Slot, Value};
use crate::{Document, Error, Result};

/// Key prefix marking an attribute.
pub const ATTRIBUTE_PREFIX: char = '@';

/// Key holding the element text.
pub const TEXT_KEY: &str = "#text";

/// Key holding explicitly ordered children.
pub const CHILDREN_KEY: &str = "#children";

/// Convert a value to JSON.
pub fn value_to_json(value: &Value) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Leaf(text) => Json::String(text.clone()),
        Value::Object(element) => element_to_json(element),
    }
}

fn element_to_json(element: &Element) -> Json {
    let mut map = Map::new();

    for (name, value) in element.attributes() {
        map.insert(format!("{}{}", ATTRIBUTE_PREFIX, name), attribute_to_json(value));
    }

    if let Some(text) = element.text() {
        map.insert(TEXT_KEY.to_string(), Json::String(text.to_string()));
    }

    if element.has_interleaved_tags() {
        let children = element
            .groups()
            .iter()
            .flat_map(|group| {
                group.slot().iter().map(move |child| {
                    let mut entry = Map::new();
                    entry.insert(group.tag().to_string(), value_to_json(child));
                    Json::Object(entry)
                })
            })
            .collect();
        map.insert(CHILDREN_KEY.to_string(), Json::Array(children));
    } else {
        for group in element.groups() {
            let json = match group.slot() {
                Slot::One(child) => value_to_json(child),
                Slot::Many(children) => Json::Array(children.iter().map(value_to_json).collect()),
            };
            map.insert(group.tag().to_string(), json);
        }
    }

    Json::Object(map)
}

fn attribute_to_json(value: &AttributeValue) -> Json {
    match value {
        AttributeValue::String(s) => Json::String(s.clone()),
        AttributeValue::Integer(i) => Json::Number(Number::from(*i)),
        // NaN and infinities have no JSON number form
        AttributeValue::Float(x) => Number::from_f64(*x).map_or_else(|| Json::String(x.to_string()), Json::Number),
        AttributeValue::Boolean(b) => Json::Bool(*b),
    }
}

/// Convert JSON back to a value. `path` is used in error messages.
pub fn value_from_json(json: &Json, path: &str) -> Result<Value> {
    match json {
        Json::Null => Ok(Value::Null),
        Json::String(text) => Ok(Element::new().with_text(text.as_str()).into_value()),
        Json::Bool(b) => Ok(Value::Leaf(b.to_string())),
        Json::Number(n) => Ok(Value::Leaf(n.to_string())),
        Json::Object(map) => element_from_json(map, path),
        Json::Array(_) => Err(Error::Structure(format!("unexpected nested array at {}", path))),
    }
}

fn element_from_json(map: &Map<String, Json>, path: &str) -> Result<Value> {
    let mut element = Element::new();

    for (key, json) in map {
        if let Some(name) = key.strip_prefix(ATTRIBUTE_PREFIX) {
            let value = attribute_from_json(json)
                .ok_or_else(|| Error::Structure(format!("attribute {}/{} must be a scalar", path, key)))?;
            element.set_attribute(name, value);
        } else if key == TEXT_KEY {
            let text = json
                .as_str()
                .ok_or_else(|| Error::Structure(format!("{}/{} must be a string", path, key)))?;
            element.set_text(Some(text.to_string()));
        } else if key == CHILDREN_KEY {
            let entries = json
                .as_array()
                .ok_or_else(|| Error::Structure(format!("{}/{} must be an array", path, key)))?;
            for entry in entries {
                let (tag, child) = single_entry(entry)
                    .ok_or_else(|| Error::Structure(format!("{}/{} entries must have exactly one key", path, key)))?;
                let child_path = format!("{}/{}", path, tag);
                element.push_child(tag.as_str(), value_from_json(child, &child_path)?);
            }
        } else {
            let child_path = format!("{}/{}", path, key);
            match json {
                Json::Array(items) => {
                    for item in items {
                        element.push_child(key.as_str(), value_from_json(item, &child_path)?);
                    }
                }
                other => element.push_child(key.as_str(), value_from_json(other, &child_path)?),
            }
        }
    }

    Ok(element.into_value())
}

fn single_entry(json: &Json) -> Option<(&String, &Json)> {
    let map = json.as_object()?;
    if map.len() == 1 {
        map.iter().next()
    } else {
        None
    }
}

fn attribute_from_json(json: &Json) -> Option<AttributeValue> {
    match json {
        Json::String(s) => Some(AttributeValue::String(s.clone())),
        Json::Bool(b) => Some(AttributeValue::Boolean(*b)),
        Json::Number(n) => n
            .as_i64()
            .map(AttributeValue::Integer)
            .or_else(|| n.as_f64().map(AttributeValue::Float)),
        Json::Null | Json::Array(_) | Json::Object(_) => None,
    }
}

/// Convert a document to `{ root_tag: value }`.
pub fn document_to_json(document: &Document) -> Json {
    let mut map = Map::new();
    map.insert(document.root_tag.clone(), value_to_json(&document.root));
    Json::Object(map)
}

/// Convert `{ root_tag: value }` back to a document.
///
/// The declaration is not part of the JSON form, so the prolog is
/// [`Prolog::Unspecified`](crate::Prolog::Unspecified) and serialization
/// uses the policy's declaration.
pub fn document_from_json(json: &Json) -> Result<Document> {
    let map = json
        .as_object()
        .ok_or_else(|| Error::Structure("document must be a JSON object".to_string()))?;

    if map.len() != 1 {
        return Err(Error::Structure(format!(
            "document must have exactly one root element, found {}",
            map.len()
        )));
    }

    let (root_tag, root) = map
        .iter()
        .next()
        .ok_or_else(|| Error::Structure("document has no root element".to_string()))?;

    if root.is_array() {
        return Err(Error::Structure(format!("root element '{}' cannot repeat", root_tag)));
    }

    Ok(Document::new(root_tag.as_str(), value_from_json(root, root_tag)?))
}

/// Render a document as indented JSON (four spaces).
pub fn to_json_string(document: &Document) -> Result<String> {
    let mut output = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut output, formatter);
    document_to_json(document).serialize(&mut serializer)?;
    String::from_utf8(output).map_err(|e| Error::Xml(e.to_string()))
}

/// Parse a document from JSON text.
pub fn from_json_str(text: &str) -> Result<Document> {
    let json: Json = serde_json::from_str(text)?;
    document_from_json(&json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_meta_to_json() {
        let meta = Element::new()
            .attr("name", "Kalimba Attempt")
            .attr("category", "Rare Earth\\Percussion")
            .attr("comment", "Based on the \"Drum One\" preset.")
            .attr("author", "Leonard Bowman")
            .into_value();

        assert_eq!(
            value_to_json(&meta),
            json!({
                "@name": "Kalimba Attempt",
                "@category": "Rare Earth\\Percussion",
                "@comment": "Based on the \"Drum One\" preset.",
                "@author": "Leonard Bowman"
            })
        );
    }

    #[test]
    fn test_keyed_children() {
        let root = Element::new()
            .attr("revision", "21")
            .child("osc", Value::Null)
            .child("osc", Value::Leaf("x".into()))
            .child("meta", Value::Null)
            .into_value();

        let json = value_to_json(&root);
        assert_eq!(
            json,
            json!({ "@revision": "21", "osc": [null, "x"], "meta": null })
        );
        let keys: Vec<_> = json.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, ["@revision", "osc", "meta"]);

        assert_eq!(value_from_json(&json, "root").unwrap(), root);
    }

    #[test]
    fn test_interleaved_children_use_ordered_form() {
        let root = Element::new()
            .child("a", Value::Null)
            .child("b", Value::Null)
            .child("a", Value::Leaf("2".into()))
            .into_value();

        let json = value_to_json(&root);
        assert_eq!(json, json!({ "#children": [{"a": null}, {"b": null}, {"a": "2"}] }));
        assert_eq!(value_from_json(&json, "root").unwrap(), root);
    }

    #[test]
    fn test_text_with_attributes() {
        let value = Element::new().attr("k", "v").with_text("body").into_value();
        let json = value_to_json(&value);
        assert_eq!(json, json!({ "@k": "v", "#text": "body" }));
        assert_eq!(value_from_json(&json, "a").unwrap(), value);
    }

    #[test]
    fn test_padded_text_is_trimmed() {
        let doc = document_from_json(&json!({ "p": { "@k": "v", "#text": "  hi  " } })).unwrap();
        let xml = doc.to_xml_string(&crate::SerializationPolicy::default()).unwrap();
        assert!(xml.ends_with(r#"<p k="v">hi</p>"#));
        crate::verify(&xml, crate::BackendKind::Tree.backend(), &crate::SerializationPolicy::default()).unwrap();
    }

    #[test]
    fn test_typed_attributes_from_json() {
        let value = value_from_json(&json!({ "@i": 3, "@f": 0.5, "@b": false }), "a").unwrap();
        let element = value.as_object().unwrap();
        assert_eq!(element.attribute("i"), Some(&AttributeValue::Integer(3)));
        assert_eq!(element.attribute("f"), Some(&AttributeValue::Float(0.5)));
        assert_eq!(element.attribute("b"), Some(&AttributeValue::Boolean(false)));

        let err = value_from_json(&json!({ "@x": null }), "a").unwrap_err();
        assert!(matches!(err, Error::Structure(_)));
    }

    #[test]
    fn test_single_element_array_collapses() {
        let value = value_from_json(&json!({ "x": [{"@i": "1"}] }), "a").unwrap();
        let element = value.as_object().unwrap();
        assert!(matches!(element.groups()[0].slot(), Slot::One(_)));
    }

    #[test]
    fn test_document_root_rules() {
        let doc = document_from_json(&json!({ "patch": { "@revision": "21" } })).unwrap();
        assert_eq!(doc.root_tag, "patch");

        assert!(matches!(document_from_json(&json!({})), Err(Error::Structure(_))));
        assert!(matches!(
            document_from_json(&json!({ "a": null, "b": null })),
            Err(Error::Structure(_))
        ));
        assert!(matches!(document_from_json(&json!({ "a": [null, null] })), Err(Error::Structure(_))));
        assert!(matches!(document_from_json(&json!("a")), Err(Error::Structure(_))));
    }

    #[test]
    fn test_json_string_round_trip() {
        let doc = Document::new(
            "patch",
            Element::new()
                .attr("revision", "21")
                .child("meta", Element::new().attr("name", "Init").into_value())
                .into_value(),
        );

        let text = to_json_string(&doc).unwrap();
        assert!(text.starts_with("{\n    \"patch\": {\n        \"@revision\": \"21\""));
        assert_eq!(from_json_str(&text).unwrap(), doc);
    }
}
