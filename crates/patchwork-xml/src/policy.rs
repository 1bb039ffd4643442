//! XML text emission and the fixed post-processing dialect.
//!
//! Preset documents use a dense, single-line dialect: double-quoted
//! attributes, hexadecimal CR/LF character references, a space before the
//! closing `/>` and `?>`, and an upper-case encoding name. Emission is done in
//! two phases:
//!
//! 1. Raw emission through quick-xml's [`Writer`] with policy-controlled escaping.
//! 2. A fixed pipeline of text rules, applied in this order:
//!    [`normalize_quotes`] → [`hex_line_entities`] → [`space_before_close`] →
//!    [`collapse_whitespace`].
//!
//! Each rule is a standalone function so it can be tested and reused on
//! hand-authored input.

use std::borrow::Cow;
use std::io::Write;

use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::name::QName;
use quick_xml::Writer;

use crate::node::{Declaration, XmlContent, XmlNode, XmlTree};
use crate::{Error, Result};

/// Rules governing XML text emission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializationPolicy {
    /// Declaration emitted for documents whose prolog is unspecified.
    pub declaration: Option<Declaration>,
    /// Rewrite single-quoted attribute and declaration values to double quotes.
    pub normalize_quotes: bool,
    /// Rewrite `&#13;` / `&#10;` to `&#x0D;` / `&#x0A;`.
    pub hex_line_entities: bool,
    /// Render `<a />` and `<?xml ... ?>` with a space before the closer.
    pub space_before_close: bool,
    /// Remove newline-bearing whitespace between tags.
    pub collapse_whitespace: bool,
}

impl Default for SerializationPolicy {
    fn default() -> Self {
        Self {
            declaration: Some(Declaration::standard()),
            normalize_quotes: true,
            hex_line_entities: true,
            space_before_close: true,
            collapse_whitespace: true,
        }
    }
}

impl SerializationPolicy {
    /// A policy that emits quick-xml output unchanged (post-processing disabled).
    pub fn raw() -> Self {
        Self {
            declaration: Some(Declaration::standard()),
            normalize_quotes: false,
            hex_line_entities: false,
            space_before_close: false,
            collapse_whitespace: false,
        }
    }

    /// Replace the fallback declaration.
    pub fn with_declaration(mut self, declaration: Option<Declaration>) -> Self {
        self.declaration = declaration;
        self
    }

    /// Run the post-processing pipeline over raw emitted text.
    pub fn post_process(&self, xml: String) -> String {
        let mut xml = xml;
        if self.normalize_quotes {
            xml = normalize_quotes(&xml);
        }
        if self.hex_line_entities {
            xml = hex_line_entities(&xml);
        }
        if self.space_before_close {
            xml = space_before_close(&xml);
        }
        if self.collapse_whitespace {
            xml = collapse_whitespace(&xml);
        }
        xml
    }
}

/// Render an XML tree to text.
///
/// A declared prolog is emitted as is and an absent one not at all; the
/// policy's declaration only fills in an unspecified prolog. The encoding
/// name is always rendered upper-case.
pub fn render(tree: &XmlTree, policy: &SerializationPolicy) -> Result<String> {
    let raw = emit_raw(tree, policy)?;
    Ok(policy.post_process(raw))
}

fn emit_raw(tree: &XmlTree, policy: &SerializationPolicy) -> Result<String> {
    let mut writer = Writer::new(Vec::new());

    if let Some(decl) = tree.prolog.resolve(policy.declaration.as_ref()) {
        let encoding = decl.encoding.as_ref().map(|e| e.to_ascii_uppercase());
        writer
            .write_event(Event::Decl(BytesDecl::new(
                &decl.version,
                encoding.as_deref(),
                decl.standalone.as_deref(),
            )))
            .map_err(|e| Error::Xml(e.to_string()))?;
    }

    write_node(&mut writer, &tree.root)?;

    String::from_utf8(writer.into_inner()).map_err(|e| Error::Xml(e.to_string()))
}

fn write_node<W: Write>(writer: &mut Writer<W>, node: &XmlNode) -> Result<()> {
    let mut start = BytesStart::new(node.tag.as_str());
    for (key, value) in &node.attributes {
        // Values are escaped here, so quick-xml must write them verbatim
        start.push_attribute(Attribute {
            key: QName(key.as_bytes()),
            value: Cow::Owned(escape_attribute(value).into_bytes()),
        });
    }

    let has_content = node
        .content
        .iter()
        .any(|item| !matches!(item, XmlContent::Text(text) if text.is_empty()));

    if !has_content {
        return writer
            .write_event(Event::Empty(start))
            .map_err(|e| Error::Xml(e.to_string()));
    }

    writer
        .write_event(Event::Start(start))
        .map_err(|e| Error::Xml(e.to_string()))?;

    for item in &node.content {
        match item {
            XmlContent::Element(child) => write_node(writer, child)?,
            XmlContent::Text(text) if text.is_empty() => {}
            XmlContent::Text(text) => writer
                .write_event(Event::Text(BytesText::from_escaped(escape_text(text))))
                .map_err(|e| Error::Xml(e.to_string()))?,
        }
    }

    writer
        .write_event(Event::End(BytesEnd::new(node.tag.as_str())))
        .map_err(|e| Error::Xml(e.to_string()))
}

/// Escape an attribute value for a double-quoted attribute.
///
/// Apostrophes stay literal; CR, LF and TAB become decimal references.
pub fn escape_attribute(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\r' => out.push_str("&#13;"),
            '\n' => out.push_str("&#10;"),
            '\t' => out.push_str("&#9;"),
            c => out.push(c),
        }
    }
    out
}

/// Escape character data.
///
/// CR and LF become decimal references so the output stays on one line.
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\r' => out.push_str("&#13;"),
            '\n' => out.push_str("&#10;"),
            c => out.push(c),
        }
    }
    out
}

/// A slice of XML text, classified for the markup-aware rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment<'a> {
    /// Character data between tags.
    Text(&'a str),
    /// A start tag, end tag, empty-element tag, declaration or PI.
    Tag(&'a str),
    /// Comments and CDATA sections, passed through untouched.
    Opaque(&'a str),
}

fn split_markup(xml: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut rest = xml;

    while !rest.is_empty() {
        let (segment, len) = if rest.starts_with("<!--") {
            let len = rest.find("-->").map_or(rest.len(), |i| i + 3);
            (Segment::Opaque(&rest[..len]), len)
        } else if rest.starts_with("<![CDATA[") {
            let len = rest.find("]]>").map_or(rest.len(), |i| i + 3);
            (Segment::Opaque(&rest[..len]), len)
        } else if rest.starts_with('<') {
            let len = tag_len(rest);
            (Segment::Tag(&rest[..len]), len)
        } else {
            let len = rest.find('<').unwrap_or(rest.len());
            (Segment::Text(&rest[..len]), len)
        };

        segments.push(segment);
        rest = &rest[len..];
    }

    segments
}

/// Length of the tag at the start of `rest`, honouring quoted values.
fn tag_len(rest: &str) -> usize {
    let mut quote = None;
    for (i, b) in rest.bytes().enumerate().skip(1) {
        match quote {
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None if b == b'"' || b == b'\'' => quote = Some(b),
            None if b == b'>' => return i + 1,
            None => {}
        }
    }
    rest.len()
}

/// Rewrite single-quoted attribute and declaration values to double quotes.
///
/// Only quotes inside markup are touched. A `"` inside a formerly
/// single-quoted value becomes `&quot;`.
pub fn normalize_quotes(xml: &str) -> String {
    let mut out = String::with_capacity(xml.len());
    for segment in split_markup(xml) {
        match segment {
            Segment::Tag(tag) if tag.contains('\'') => requote_tag(tag, &mut out),
            Segment::Tag(s) | Segment::Text(s) | Segment::Opaque(s) => out.push_str(s),
        }
    }
    out
}

fn requote_tag(tag: &str, out: &mut String) {
    let mut quote: Option<char> = None;
    for c in tag.chars() {
        match (quote, c) {
            (None, '"') | (None, '\'') => {
                quote = Some(c);
                out.push('"');
            }
            (Some(q), c) if c == q => {
                quote = None;
                out.push('"');
            }
            (Some('\''), '"') => out.push_str("&quot;"),
            (_, c) => out.push(c),
        }
    }
}

/// Rewrite decimal CR/LF character references to their hexadecimal form.
pub fn hex_line_entities(xml: &str) -> String {
    xml.replace("&#13;", "&#x0D;").replace("&#10;", "&#x0A;")
}

/// Put a space before `/>` and `?>` closers that lack one.
pub fn space_before_close(xml: &str) -> String {
    let mut out = String::with_capacity(xml.len() + xml.len() / 16);
    for segment in split_markup(xml) {
        match segment {
            Segment::Tag(tag) if tag.ends_with("/>") || tag.ends_with("?>") => {
                let (body, closer) = tag.split_at(tag.len() - 2);
                out.push_str(body);
                if !body.ends_with(|c: char| c.is_ascii_whitespace()) {
                    out.push(' ');
                }
                out.push_str(closer);
            }
            Segment::Tag(s) | Segment::Text(s) | Segment::Opaque(s) => out.push_str(s),
        }
    }
    out
}

/// Drop whitespace-only runs containing a newline, leaving one unbroken line.
pub fn collapse_whitespace(xml: &str) -> String {
    let mut out = String::with_capacity(xml.len());
    for segment in split_markup(xml) {
        match segment {
            Segment::Text(text) if text.contains('\n') && text.trim().is_empty() => {}
            Segment::Tag(s) | Segment::Text(s) | Segment::Opaque(s) => out.push_str(s),
        }
    }
    out
}

/// Normalize hand-authored XML the way emission would render it.
///
/// Single-quoted values become double-quoted and `&apos;` becomes a literal
/// apostrophe. The result is what a faithful round trip must reproduce.
pub fn normalize_input(original: &str) -> String {
    normalize_quotes(original).replace("&apos;", "'")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Prolog;

    fn tree(root: XmlNode) -> XmlTree {
        XmlTree {
            prolog: Prolog::Unspecified,
            root,
        }
    }

    #[test]
    fn test_render_standard_dialect() {
        let root = XmlNode::new("patch")
            .attr("revision", "21")
            .child(XmlNode::new("meta").attr("name", "Init"))
            .child(XmlNode::new("empty"))
            .child(XmlNode::new("leaf").text("hi"));

        let xml = render(&tree(root), &SerializationPolicy::default()).unwrap();
        assert_eq!(
            xml,
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes" ?><patch revision="21"><meta name="Init" /><empty /><leaf>hi</leaf></patch>"#
        );
    }

    #[test]
    fn test_render_raw_policy() {
        let xml = render(&tree(XmlNode::new("a").attr("x", "1")), &SerializationPolicy::raw()).unwrap();
        assert_eq!(xml, r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><a x="1"/>"#);
    }

    #[test]
    fn test_render_without_declaration() {
        let policy = SerializationPolicy::default().with_declaration(None);
        let xml = render(&tree(XmlNode::new("a")), &policy).unwrap();
        assert_eq!(xml, "<a />");
    }

    #[test]
    fn test_render_absent_prolog_ignores_policy() {
        let tree = XmlTree {
            prolog: Prolog::Absent,
            root: XmlNode::new("a"),
        };
        assert_eq!(render(&tree, &SerializationPolicy::default()).unwrap(), "<a />");
    }

    #[test]
    fn test_render_uppercases_encoding() {
        let tree = XmlTree {
            prolog: Prolog::Declared(Declaration::new("1.0").with_encoding("utf-8")),
            root: XmlNode::new("a"),
        };
        let xml = render(&tree, &SerializationPolicy::default()).unwrap();
        assert_eq!(xml, r#"<?xml version="1.0" encoding="UTF-8" ?><a />"#);
    }

    #[test]
    fn test_render_escaping() {
        let root = XmlNode::new("meta")
            .attr("comment", "Based on the \"Drum One\" preset.\r\nIt's <great> & fun\t!")
            .text("a < b & c's\r\nx");

        let xml = render(&tree(root), &SerializationPolicy::default().with_declaration(None)).unwrap();
        assert_eq!(
            xml,
            "<meta comment=\"Based on the &quot;Drum One&quot; preset.&#x0D;&#x0A;It's &lt;great&gt; &amp; fun&#9;!\">a &lt; b &amp; c's&#x0D;&#x0A;x</meta>"
        );
    }

    #[test]
    fn test_normalize_quotes() {
        assert_eq!(
            normalize_quotes("<?xml version='1.0' encoding='UTF-8'?>"),
            r#"<?xml version="1.0" encoding="UTF-8"?>"#
        );
        assert_eq!(
            normalize_quotes(r#"<meta category='Rare Earth\Percussion' comment='say "hi"' name="it's" />"#),
            r#"<meta category="Rare Earth\Percussion" comment="say &quot;hi&quot;" name="it's" />"#
        );
        // text and comments are left alone
        assert_eq!(
            normalize_quotes("<a>it's</a><!-- 'x' -->"),
            "<a>it's</a><!-- 'x' -->"
        );
    }

    #[test]
    fn test_hex_line_entities() {
        assert_eq!(hex_line_entities("a&#13;&#10;b&#9;"), "a&#x0D;&#x0A;b&#9;");
        assert_eq!(hex_line_entities("&amp;#13;"), "&amp;#13;");
    }

    #[test]
    fn test_space_before_close() {
        assert_eq!(
            space_before_close(r#"<?xml version="1.0"?><a x="/>"/><b /></a>"#),
            r#"<?xml version="1.0" ?><a x="/>" /><b /></a>"#
        );
        let once = space_before_close("<a/>");
        assert_eq!(space_before_close(&once), once);
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(
            collapse_whitespace("<?xml version=\"1.0\"?>\n<a>\n  <b>keep me</b>\n  <c> </c>\n</a>\n"),
            "<?xml version=\"1.0\"?><a><b>keep me</b><c> </c></a>"
        );
    }

    #[test]
    fn test_normalize_input() {
        let original = r#"<meta name="SY 80&apos;s Future Key WT" category='Emu/Synth' />"#;
        assert_eq!(
            normalize_input(original),
            r#"<meta name="SY 80's Future Key WT" category="Emu/Synth" />"#
        );
    }

    #[test]
    fn test_split_markup() {
        let segments = split_markup(r#"<a x='>'>t<!--c--><![CDATA[<d>]]></a>"#);
        assert_eq!(
            segments,
            vec![
                Segment::Tag("<a x='>'>"),
                Segment::Text("t"),
                Segment::Opaque("<!--c-->"),
                Segment::Opaque("<![CDATA[<d>]]>"),
                Segment::Tag("</a>"),
            ]
        );
    }
}
