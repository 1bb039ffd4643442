//! Event backend: builds values straight from a quick-xml event stream.

use std::borrow::Cow;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::backend::Backend;
use crate::node::Declaration;
use crate::value::{Element, Value};
use crate::{Document, Error, Result};

/// An element that has started but not yet ended.
struct OpenElement {
    tag: String,
    element: Element,
    /// Character data seen since the last markup boundary.
    pending: String,
}

impl OpenElement {
    /// Close the current text run. Only text before the first child is kept.
    fn flush_text(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        if self.element.child_count() == 0 {
            self.element.set_text(Some(std::mem::take(&mut self.pending)));
        }
        self.pending.clear();
    }
}

/// Conversion state for one document. Created per call and never shared.
#[derive(Default)]
struct EventContext {
    declaration: Option<Declaration>,
    stack: Vec<OpenElement>,
    root: Option<(String, Value)>,
}

impl EventContext {
    fn start(&mut self, start: &BytesStart<'_>) -> Result<()> {
        if self.root.is_some() {
            return Err(Error::Parse("content after the root element".to_string()));
        }
        if let Some(parent) = self.stack.last_mut() {
            parent.flush_text();
        }

        let tag = std::str::from_utf8(start.name().as_ref())
            .map_err(|e| Error::Parse(e.to_string()))?
            .to_string();
        let mut element = Element::new();

        for attr in start.attributes() {
            let attr = attr.map_err(|e| Error::Parse(e.to_string()))?;
            let key = std::str::from_utf8(attr.key.as_ref()).map_err(|e| Error::Parse(e.to_string()))?;
            let raw = std::str::from_utf8(&attr.value).map_err(|e| Error::Parse(e.to_string()))?;
            element.set_attribute(key, unescape(&normalize_attribute(raw))?.into_owned());
        }

        self.stack.push(OpenElement {
            tag,
            element,
            pending: String::new(),
        });
        Ok(())
    }

    fn text(&mut self, text: &str) -> Result<()> {
        match self.stack.last_mut() {
            Some(open) => open.pending.push_str(text),
            None if text.trim().is_empty() => {}
            None => return Err(Error::Parse("text outside the root element".to_string())),
        }
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        let mut open = self
            .stack
            .pop()
            .ok_or_else(|| Error::Parse("unexpected end tag".to_string()))?;
        open.flush_text();

        let value = open.element.into_value();
        match self.stack.last_mut() {
            Some(parent) => parent.element.push_child(open.tag, value),
            None => self.root = Some((open.tag, value)),
        }
        Ok(())
    }

    fn finish(self) -> Result<Document> {
        if let Some(open) = self.stack.last() {
            return Err(Error::Parse(format!("unclosed element <{}>", open.tag)));
        }
        let (root_tag, root) = self
            .root
            .ok_or_else(|| Error::Parse("no root element found".to_string()))?;

        Ok(Document {
            prolog: self.declaration.into(),
            root_tag,
            root,
        })
    }
}

/// Line-end normalization applied to character data (`\r\n` and `\r` become `\n`).
fn normalize_line_ends(raw: &str) -> Cow<'_, str> {
    if raw.contains('\r') {
        Cow::Owned(raw.replace("\r\n", "\n").replace('\r', "\n"))
    } else {
        Cow::Borrowed(raw)
    }
}

/// Attribute-value normalization: literal whitespace characters become spaces.
/// Character references are untouched, so `&#x0A;` still yields a newline.
fn normalize_attribute(raw: &str) -> Cow<'_, str> {
    if raw.contains(['\t', '\n', '\r']) {
        Cow::Owned(raw.replace("\r\n", " ").replace(['\t', '\n', '\r'], " "))
    } else {
        Cow::Borrowed(raw)
    }
}

fn unescape(raw: &str) -> Result<Cow<'_, str>> {
    quick_xml::escape::unescape(raw).map_err(|e| Error::Parse(e.to_string()))
}

/// Convert XML text to a document by walking quick-xml events.
pub fn parse_events(xml: &str) -> Result<Document> {
    let mut reader = Reader::from_str(xml);
    let mut context = EventContext::default();

    loop {
        let event = reader.read_event().map_err(|e| {
            Error::Parse(format!("at position {}: {}", reader.buffer_position(), e))
        })?;

        match event {
            Event::Decl(decl) => context.declaration = Some(Declaration::from_event(&decl)?),
            Event::Start(start) => context.start(&start)?,
            Event::Empty(start) => {
                context.start(&start)?;
                context.end()?;
            }
            Event::End(_) => context.end()?,
            Event::Text(text) => {
                let raw = std::str::from_utf8(&text).map_err(|e| Error::Parse(e.to_string()))?;
                context.text(&unescape(&normalize_line_ends(raw))?)?;
            }
            Event::CData(cdata) => {
                let raw = std::str::from_utf8(&cdata).map_err(|e| Error::Parse(e.to_string()))?;
                context.text(&normalize_line_ends(raw))?;
            }
            Event::Eof => break,
            // Comments, processing instructions and DOCTYPE are not modelled
            _ => {}
        }
    }

    context.finish()
}

/// Backend built on quick-xml's pull parser.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventBackend;

impl Backend for EventBackend {
    fn name(&self) -> &'static str {
        "event"
    }

    fn parse_document(&self, xml: &str) -> Result<Document> {
        parse_events(xml)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Prolog;
    use crate::value::AttributeValue;

    #[test]
    fn test_parse_events_simple() {
        let doc = parse_events(r#"<?xml version="1.0" encoding="UTF-8"?><Root version="1.0"/>"#).unwrap();
        assert_eq!(doc.root_tag, "Root");
        assert_eq!(doc.prolog.declaration().unwrap().encoding.as_deref(), Some("UTF-8"));

        let root = doc.root.as_object().unwrap();
        assert_eq!(root.attribute("version"), Some(&AttributeValue::from("1.0")));
    }

    #[test]
    fn test_parse_events_nested() {
        let xml = r#"<A>
            <B attr="1">
                <C/>
                <D attr="2"/>
            </B>
            <E>text</E>
        </A>"#;

        let doc = parse_events(xml).unwrap();
        let root = doc.root.as_object().unwrap();
        assert_eq!(root.text(), None);
        assert_eq!(root.child_tags().collect::<Vec<_>>(), ["B", "E"]);

        let b = root.children("B").next().unwrap().as_object().unwrap();
        assert_eq!(b.child_tags().collect::<Vec<_>>(), ["C", "D"]);
        assert_eq!(root.children("E").next().unwrap().as_leaf(), Some("text"));
    }

    #[test]
    fn test_parse_events_entities() {
        let doc = parse_events(r#"<a c='say &quot;hi&quot; &amp; go&#x0D;&#x0A;'>x &gt; y</a>"#).unwrap();
        let root = doc.root.as_object().unwrap();
        assert_eq!(
            root.attribute("c").and_then(AttributeValue::as_str),
            Some("say \"hi\" & go\r\n")
        );
        assert_eq!(root.text(), Some("x > y"));
    }

    #[test]
    fn test_parse_events_cdata_merges_with_text() {
        let doc = parse_events("<a>one <![CDATA[<two>]]> three</a>").unwrap();
        assert_eq!(doc.root.as_leaf(), Some("one <two> three"));
    }

    #[test]
    fn test_parse_events_drops_text_after_children() {
        let doc = parse_events(r#"<patch x="1"> head <b />tail<c /> more </patch>"#).unwrap();
        let root = doc.root.as_object().unwrap();
        assert_eq!(root.text(), Some("head"));
        assert_eq!(root.child_tags().collect::<Vec<_>>(), ["b", "c"]);

        let doc = parse_events(r#"<patch x="1"><b />tail</patch>"#).unwrap();
        assert_eq!(doc.root.as_object().unwrap().text(), None);
        assert_eq!(doc.prolog, Prolog::Absent);
    }

    #[test]
    fn test_parse_events_errors() {
        assert!(matches!(parse_events(""), Err(Error::Parse(_))));
        assert!(matches!(parse_events("<a><b></a>"), Err(Error::Parse(_))));
        assert!(matches!(parse_events("<a>"), Err(Error::Parse(_))));
        assert!(matches!(parse_events("<a/><b/>"), Err(Error::Parse(_))));
        assert!(matches!(parse_events("<a/>junk"), Err(Error::Parse(_))));
    }
}
