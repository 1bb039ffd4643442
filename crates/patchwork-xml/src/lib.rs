//! Lossless conversion between XML text and a structured value model.
//!
//! Preset documents are parsed into a [`Document`]: a root tag plus a tree of
//! [`Value`]s in which attributes, text, children, sibling order and
//! single-versus-list multiplicity all survive. Serializing a document back
//! with the default [`SerializationPolicy`] reproduces the dense dialect the
//! documents are stored in, byte for byte.
//!
//! Two interchangeable parse [`Backend`]s are provided, one walking a
//! roxmltree node tree and one driven by the quick-xml event stream, so the
//! conversion can be cross-checked against itself.
//!
//! # Example
//!
//! ```
//! use patchwork_xml::{verify, BackendKind, SerializationPolicy};
//!
//! let xml = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes" ?><patch revision="21"><meta name="Init" /></patch>"#;
//!
//! let document = verify(xml, BackendKind::Tree.backend(), &SerializationPolicy::default())?;
//! assert_eq!(document.root_tag, "patch");
//! # Ok::<(), patchwork_xml::Error>(())
//! ```

mod error;
mod node;
mod value;
mod backend;
mod tree;
mod event;
mod to_xml;
mod policy;
mod verify;
#[cfg(feature = "json")]
pub mod json;

pub use error::{Error, Result};
pub use node::{read_declaration, Declaration, Prolog, XmlContent, XmlNode, XmlTree};
pub use value::{AttributeValue, ChildGroup, Document, Element, Slot, Value};
pub use backend::{Backend, BackendKind};
pub use tree::{parse_tree, to_value, tree_to_document, TreeBackend};
pub use event::{parse_events, EventBackend};
pub use to_xml::{document_to_tree, is_xml_name, to_xml};
pub use policy::{
    collapse_whitespace, escape_attribute, escape_text, hex_line_entities, normalize_input, normalize_quotes,
    render, space_before_close, SerializationPolicy,
};
pub use verify::{cross_validate, first_difference, round_trip, verify, RoundTrip};
