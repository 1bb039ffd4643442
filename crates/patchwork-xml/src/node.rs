//! Generic XML node tree shared by the parse adapters and the XML writer.

use quick_xml::events::{BytesDecl, Event};
use quick_xml::Reader;

use crate::{Error, Result};

/// The `<?xml ... ?>` declaration of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    /// XML version, usually `1.0`.
    pub version: String,
    /// Declared encoding name, if any.
    pub encoding: Option<String>,
    /// Standalone flag (`yes` / `no`), if any.
    pub standalone: Option<String>,
}

impl Declaration {
    /// Create a declaration with only a version.
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            encoding: None,
            standalone: None,
        }
    }

    /// The declaration used by preset documents:
    /// `<?xml version="1.0" encoding="UTF-8" standalone="yes" ?>`.
    pub fn standard() -> Self {
        Self::new("1.0").with_encoding("UTF-8").with_standalone("yes")
    }

    /// Set the encoding name.
    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = Some(encoding.into());
        self
    }

    /// Set the standalone flag.
    pub fn with_standalone(mut self, standalone: impl Into<String>) -> Self {
        self.standalone = Some(standalone.into());
        self
    }

    pub(crate) fn from_event(decl: &BytesDecl<'_>) -> Result<Self> {
        let version = decl
            .version()
            .map_err(|e| Error::Parse(format!("invalid XML declaration: {}", e)))?;
        let mut declaration = Self::new(String::from_utf8_lossy(&version).into_owned());

        if let Some(encoding) = decl.encoding() {
            let encoding = encoding.map_err(|e| Error::Parse(format!("invalid XML declaration: {}", e)))?;
            declaration.encoding = Some(String::from_utf8_lossy(&encoding).into_owned());
        }
        if let Some(standalone) = decl.standalone() {
            let standalone =
                standalone.map_err(|e| Error::Parse(format!("invalid XML declaration: {}", e)))?;
            declaration.standalone = Some(String::from_utf8_lossy(&standalone).into_owned());
        }

        Ok(declaration)
    }
}

/// What a document says about its `<?xml ... ?>` declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Prolog {
    /// The source carried this declaration.
    Declared(Declaration),
    /// The source had no declaration; none is emitted.
    Absent,
    /// Built in code or from JSON; the serialization policy decides.
    #[default]
    Unspecified,
}

impl Prolog {
    /// The declaration, if the source had one.
    pub fn declaration(&self) -> Option<&Declaration> {
        match self {
            Self::Declared(declaration) => Some(declaration),
            Self::Absent | Self::Unspecified => None,
        }
    }

    /// The declaration to emit, using `fallback` only when unspecified.
    pub fn resolve<'a>(&'a self, fallback: Option<&'a Declaration>) -> Option<&'a Declaration> {
        match self {
            Self::Declared(declaration) => Some(declaration),
            Self::Absent => None,
            Self::Unspecified => fallback,
        }
    }
}

impl From<Option<Declaration>> for Prolog {
    fn from(declaration: Option<Declaration>) -> Self {
        declaration.map_or(Self::Absent, Self::Declared)
    }
}

/// Read the XML declaration from the document prolog.
///
/// Stops at the first element, so the cost does not depend on document size.
/// Used by backends whose parser does not expose the prolog.
pub fn read_declaration(xml: &str) -> Result<Option<Declaration>> {
    let mut reader = Reader::from_str(xml);

    loop {
        match reader.read_event() {
            Ok(Event::Decl(decl)) => return Declaration::from_event(&decl).map(Some),
            Ok(Event::Start(_)) | Ok(Event::Empty(_)) | Ok(Event::Eof) => return Ok(None),
            Ok(_) => {}
            Err(e) => {
                return Err(Error::Parse(format!(
                    "at position {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
        }
    }
}

/// One item of element content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlContent {
    /// A child element.
    Element(XmlNode),
    /// A run of character data (adjacent text and CDATA merged).
    Text(String),
}

/// An XML element with ordered attributes and mixed content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlNode {
    /// Tag name.
    pub tag: String,
    /// Attributes in document order.
    pub attributes: Vec<(String, String)>,
    /// Child elements and text runs in document order.
    pub content: Vec<XmlContent>,
}

impl XmlNode {
    /// Create an empty element.
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: Vec::new(),
            content: Vec::new(),
        }
    }

    /// Add an attribute.
    pub fn attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }

    /// Append a child element.
    pub fn child(mut self, child: XmlNode) -> Self {
        self.content.push(XmlContent::Element(child));
        self
    }

    /// Append a text run.
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.push_text(&text.into());
        self
    }

    /// Append character data, merging with a preceding text run.
    pub fn push_text(&mut self, text: &str) {
        if let Some(XmlContent::Text(last)) = self.content.last_mut() {
            last.push_str(text);
        } else {
            self.content.push(XmlContent::Text(text.to_string()));
        }
    }

    /// Iterate over child elements.
    pub fn elements(&self) -> impl Iterator<Item = &XmlNode> {
        self.content.iter().filter_map(|item| match item {
            XmlContent::Element(node) => Some(node),
            XmlContent::Text(_) => None,
        })
    }

    /// Iterate over text runs.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.content.iter().filter_map(|item| match item {
            XmlContent::Text(text) => Some(text.as_str()),
            XmlContent::Element(_) => None,
        })
    }

    /// Whether the element has neither attributes nor content.
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty() && self.content.is_empty()
    }
}

/// A parsed document: prolog plus the root element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlTree {
    /// The declaration state of the prolog.
    pub prolog: Prolog,
    /// The root element.
    pub root: XmlNode,
}
