//! The structured value model of an XML document.
//!
//! An element becomes one of three shapes:
//!
//! - [`Value::Null`] - no attributes, no children, no text (`<a />`)
//! - [`Value::Leaf`] - no attributes, no children, non-blank text (`<a>hi</a>`)
//! - [`Value::Object`] - everything else
//!
//! Children are kept as an ordered sequence of runs. A run groups adjacent
//! siblings sharing a tag, and its [`Slot`] records whether the run held one
//! element or several. Sibling order survives even when tags interleave
//! (`<a/><b/><a/>` is three runs), and the single-versus-list distinction is
//! part of the type rather than something inferred from a list length.

use std::fmt;

use crate::node::{Declaration, Prolog, XmlTree};
use crate::policy::SerializationPolicy;
use crate::Result;

/// The value of an attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    /// Text value. Everything parsed from XML is text.
    String(String),
    /// Integer value.
    Integer(i64),
    /// Floating point value.
    Float(f64),
    /// Boolean value, rendered as `true` / `false`.
    Boolean(bool),
}

impl AttributeValue {
    /// Borrow the value if it is text.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => f.write_str(s),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Float(x) => write!(f, "{}", x),
            Self::Boolean(b) => f.write_str(if *b { "true" } else { "false" }),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

/// The structured representation of one element.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Element with no attributes, no children and no text.
    Null,
    /// Element with only non-blank text.
    Leaf(String),
    /// Element with attributes and/or children.
    Object(Element),
}

impl Value {
    /// Check for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Get the text of a [`Value::Leaf`].
    pub fn as_leaf(&self) -> Option<&str> {
        match self {
            Self::Leaf(text) => Some(text),
            _ => None,
        }
    }

    /// Get the element of a [`Value::Object`].
    pub fn as_object(&self) -> Option<&Element> {
        match self {
            Self::Object(element) => Some(element),
            _ => None,
        }
    }
}

/// The instances held by one run of same-tagged siblings.
#[derive(Debug, Clone, PartialEq)]
pub enum Slot {
    /// Exactly one element.
    One(Value),
    /// Two or more adjacent elements.
    Many(Vec<Value>),
}

impl Slot {
    /// The instances as a slice.
    pub fn as_slice(&self) -> &[Value] {
        match self {
            Self::One(value) => std::slice::from_ref(value),
            Self::Many(values) => values,
        }
    }

    /// Iterate over the instances.
    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.as_slice().iter()
    }

    /// Number of instances.
    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    /// Always false: a slot holds at least one value.
    pub fn is_empty(&self) -> bool {
        false
    }

    fn push(&mut self, value: Value) {
        match self {
            Self::Many(values) => values.push(value),
            Self::One(_) => {
                if let Self::One(first) = std::mem::replace(self, Self::Many(Vec::new())) {
                    *self = Self::Many(vec![first, value]);
                }
            }
        }
    }
}

/// A run of adjacent siblings sharing a tag.
#[derive(Debug, Clone, PartialEq)]
pub struct ChildGroup {
    tag: String,
    slot: Slot,
}

impl ChildGroup {
    /// The tag shared by the run.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// The instances of the run.
    pub fn slot(&self) -> &Slot {
        &self.slot
    }
}

/// Attributes, text and children of an [`Value::Object`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Element {
    attributes: Vec<(String, AttributeValue)>,
    text: Option<String>,
    children: Vec<ChildGroup>,
}

impl Element {
    /// Create an empty element.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attributes in document order.
    pub fn attributes(&self) -> &[(String, AttributeValue)] {
        &self.attributes
    }

    /// Look up an attribute by name.
    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    /// Set an attribute, replacing an existing one of the same name in place.
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<AttributeValue>) {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(key, _)| *key == name) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((name, value)),
        }
    }

    /// Text content, already trimmed.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Set the text content, trimmed. Blank text is treated as absent.
    pub fn set_text(&mut self, text: Option<String>) {
        self.text = text
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
    }

    /// Child runs in document order.
    pub fn groups(&self) -> &[ChildGroup] {
        &self.children
    }

    /// Append a child, extending the last run when the tag matches.
    pub fn push_child(&mut self, tag: impl Into<String>, value: Value) {
        let tag = tag.into();
        if let Some(last) = self.children.last_mut() {
            if last.tag == tag {
                last.slot.push(value);
                return;
            }
        }
        self.children.push(ChildGroup {
            tag,
            slot: Slot::One(value),
        });
    }

    /// All children with the given tag, across runs, in document order.
    pub fn children<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Value> + 'a {
        self.children
            .iter()
            .filter(move |group| group.tag == tag)
            .flat_map(|group| group.slot.iter())
    }

    /// The tag of every child element in document order.
    pub fn child_tags(&self) -> impl Iterator<Item = &str> {
        self.children
            .iter()
            .flat_map(|group| std::iter::repeat(group.tag.as_str()).take(group.slot.len()))
    }

    /// Total number of child elements.
    pub fn child_count(&self) -> usize {
        self.children.iter().map(|group| group.slot.len()).sum()
    }

    /// Whether some tag occurs in more than one run.
    pub fn has_interleaved_tags(&self) -> bool {
        self.children
            .iter()
            .enumerate()
            .any(|(i, group)| self.children[..i].iter().any(|g| g.tag == group.tag))
    }

    /// Builder-style [`Element::set_attribute`].
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.set_attribute(name, value);
        self
    }

    /// Builder-style [`Element::push_child`].
    pub fn child(mut self, tag: impl Into<String>, value: Value) -> Self {
        self.push_child(tag, value);
        self
    }

    /// Builder-style [`Element::set_text`].
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.set_text(Some(text.into()));
        self
    }

    /// Collapse into the narrowest value shape.
    ///
    /// Without attributes and children the element becomes [`Value::Leaf`] or
    /// [`Value::Null`]; with any attribute it always stays an object.
    pub fn into_value(self) -> Value {
        if self.attributes.is_empty() && self.children.is_empty() {
            match self.text {
                Some(text) => Value::Leaf(text),
                None => Value::Null,
            }
        } else {
            Value::Object(self)
        }
    }
}

/// A whole document: one root element plus its declaration state.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Whether the source declared itself, and how.
    pub prolog: Prolog,
    /// Tag of the root element.
    pub root_tag: String,
    /// Value of the root element.
    pub root: Value,
}

impl Document {
    /// Create a document whose declaration is left to the serialization policy.
    pub fn new(root_tag: impl Into<String>, root: Value) -> Self {
        Self {
            prolog: Prolog::Unspecified,
            root_tag: root_tag.into(),
            root,
        }
    }

    /// Attach a declaration.
    pub fn with_declaration(mut self, declaration: Declaration) -> Self {
        self.prolog = Prolog::Declared(declaration);
        self
    }

    /// Convert to an XML node tree.
    pub fn to_tree(&self) -> Result<XmlTree> {
        crate::to_xml::document_to_tree(self)
    }

    /// Serialize to XML text under the given policy.
    pub fn to_xml_string(&self, policy: &SerializationPolicy) -> Result<String> {
        crate::policy::render(&self.to_tree()?, policy)
    }
}
