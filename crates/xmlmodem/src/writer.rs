//! The append-only emitter mirroring the reader's token vocabulary.
//!
//! A scope stack tracks one [`XmlScope`] per nesting depth; the transitions
//! decide when a pending `>` has to be closed and whether an element can
//! collapse to a self-closing `/>`. Values and text are escaped on the way
//! out, so whatever the writer produces re-parses to the same decoded
//! strings.

use std::io::{self, Write};

use crate::{
    entities::{escape_attribute, escape_text},
    error::{Error, ErrorKind, Result},
    namespace::Namespace,
    scope::{self, XmlScope},
    token::TokenWrite,
};

/// An incremental writer for a single XML document.
///
/// ```
/// use xmlmodem::XmlWriter;
///
/// let mut out = Vec::new();
/// let mut writer = XmlWriter::new(&mut out);
/// writer.begin_tag("greeting").unwrap();
/// writer.attribute("lang", "en").unwrap();
/// writer.text("hello").unwrap();
/// writer.end_tag().unwrap();
/// writer.close().unwrap();
/// assert_eq!(out, b"<greeting lang=\"en\">hello</greeting>");
/// ```
pub struct XmlWriter<W: Write> {
    sink: W,
    /// One scope per depth; emptied by `close()`.
    stack: Vec<XmlScope>,
    /// Element (or pending attribute) name per depth.
    path_names: Vec<Option<String>>,
}

impl<W: Write> XmlWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            sink,
            stack: vec![XmlScope::EmptyDocument],
            path_names: vec![None],
        }
    }

    /// Opens `<name`, leaving the tag open so attributes can follow. Closes
    /// a previously pending `>` first.
    pub fn begin_tag(&mut self, name: &str) -> Result<()> {
        match self.peek_scope()? {
            XmlScope::EmptyDocument => {
                self.replace_top(XmlScope::NonEmptyDocument);
                self.push(XmlScope::ElementOpening, Some(name));
                self.write_all(b"<")?;
                self.write_str(name)
            }
            XmlScope::ElementContent => {
                self.push(XmlScope::ElementOpening, Some(name));
                self.write_all(b"<")?;
                self.write_str(name)
            }
            XmlScope::ElementOpening => {
                self.replace_top(XmlScope::ElementContent);
                self.push(XmlScope::ElementOpening, Some(name));
                self.write_all(b"><")?;
                self.write_str(name)
            }
            XmlScope::NonEmptyDocument => Err(self.state_error(
                "a second root element",
                XmlScope::NonEmptyDocument,
            )),
            scope => Err(self.state_error("an opening tag", scope)),
        }
    }

    /// Opens `<alias:name` when the namespace carries an alias, `<name`
    /// otherwise.
    pub fn begin_tag_ns(&mut self, namespace: &Namespace, name: &str) -> Result<()> {
        match namespace.alias.as_deref() {
            Some(alias) if !alias.is_empty() => self.begin_tag(&format!("{alias}:{name}")),
            _ => self.begin_tag(name),
        }
    }

    /// Emits ` name`; the value must follow via
    /// [`attribute_value`](Self::attribute_value).
    pub fn attribute_name(&mut self, name: &str) -> Result<()> {
        match self.peek_scope()? {
            XmlScope::ElementOpening => {
                self.push(XmlScope::ElementAttribute, Some(name));
                self.write_all(b" ")?;
                self.write_str(name)
            }
            scope => Err(self.state_error("an attribute", scope)),
        }
    }

    /// Emits ` alias:name` when the namespace carries an alias.
    pub fn attribute_name_ns(&mut self, namespace: &Namespace, name: &str) -> Result<()> {
        match namespace.alias.as_deref() {
            Some(alias) if !alias.is_empty() => self.attribute_name(&format!("{alias}:{name}")),
            _ => self.attribute_name(name),
        }
    }

    /// Emits `="escaped-value"` for the attribute name written last.
    pub fn attribute_value(&mut self, value: &str) -> Result<()> {
        match self.peek_scope()? {
            XmlScope::ElementAttribute => {
                self.write_all(b"=\"")?;
                let escaped = escape_attribute(value);
                self.write_str(&escaped)?;
                self.write_all(b"\"")?;
                self.pop();
                Ok(())
            }
            scope => Err(self.state_error("an attribute value", scope)),
        }
    }

    /// Writes `name="value"` in one call.
    pub fn attribute(&mut self, name: &str, value: &str) -> Result<()> {
        self.attribute_name(name)?;
        self.attribute_value(value)
    }

    /// Emits an `xmlns:alias="uri"` (or default `xmlns="uri"`) declaration
    /// on the currently open tag.
    pub fn declare_namespace(&mut self, namespace: &Namespace) -> Result<()> {
        let Some(uri) = namespace.uri.as_deref() else {
            let scope = self.peek_scope()?;
            return Err(self.state_error("a namespace declaration without a uri", scope));
        };
        match namespace.alias.as_deref() {
            Some(alias) if !alias.is_empty() => {
                self.attribute(&format!("xmlns:{alias}"), uri)
            }
            _ => self.attribute("xmlns", uri),
        }
    }

    /// Writes escaped element text content, closing a pending `>` first.
    pub fn text(&mut self, value: &str) -> Result<()> {
        match self.peek_scope()? {
            XmlScope::ElementOpening => {
                self.replace_top(XmlScope::ElementContent);
                self.write_all(b">")?;
                let escaped = escape_text(value);
                self.write_str(&escaped)
            }
            XmlScope::ElementContent => {
                let escaped = escape_text(value);
                self.write_str(&escaped)
            }
            scope => Err(self.state_error("text content", scope)),
        }
    }

    /// Closes the innermost open element: `</name>`, or `/>` when the
    /// element is still provably content-free.
    pub fn end_tag(&mut self) -> Result<()> {
        match self.peek_scope()? {
            XmlScope::ElementOpening => {
                self.write_all(b"/>")?;
                self.pop();
                Ok(())
            }
            XmlScope::ElementContent => {
                let name = self
                    .path_names
                    .last()
                    .and_then(Option::as_deref)
                    .unwrap_or_default()
                    .to_string();
                self.write_all(b"</")?;
                self.write_str(&name)?;
                self.write_all(b">")?;
                self.pop();
                Ok(())
            }
            scope => Err(self.state_error("a closing tag", scope)),
        }
    }

    /// Flushes the sink and verifies the document is complete: exactly one
    /// root element, everything closed. The writer is unusable afterwards.
    pub fn close(&mut self) -> Result<()> {
        let Some(&top) = self.stack.last() else {
            return Err(self.make_error(ErrorKind::Closed("writer")));
        };
        self.sink.flush().map_err(|e| self.io_error(e))?;
        if self.stack.len() > 1 || top != XmlScope::NonEmptyDocument {
            return Err(self.make_error(ErrorKind::IncompleteDocument(top)));
        }
        self.stack.clear();
        self.path_names.clear();
        Ok(())
    }

    /// Consumes the writer and returns the underlying sink.
    pub fn into_inner(self) -> W {
        self.sink
    }

    /// The diagnostic path of the current position, e.g. `/feed/entry[@id]`.
    #[must_use]
    pub fn current_path(&self) -> String {
        scope::render_path(&self.stack, &self.path_names)
    }

    // ------------------------------------------------------------ plumbing

    fn push(&mut self, scope: XmlScope, name: Option<&str>) {
        self.stack.push(scope);
        self.path_names.push(name.map(str::to_string));
    }

    fn pop(&mut self) {
        self.stack.pop();
        self.path_names.pop();
    }

    fn replace_top(&mut self, scope: XmlScope) {
        if let Some(top) = self.stack.last_mut() {
            *top = scope;
        }
    }

    fn peek_scope(&self) -> Result<XmlScope> {
        self.stack
            .last()
            .copied()
            .ok_or_else(|| self.make_error(ErrorKind::Closed("writer")))
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        self.sink.write_all(bytes).map_err(|e| self.io_error(e))
    }

    fn write_str(&mut self, s: &str) -> Result<()> {
        self.sink
            .write_all(s.as_bytes())
            .map_err(|e| self.io_error(e))
    }

    fn make_error(&self, kind: ErrorKind) -> Error {
        Error::new(kind, self.current_path())
    }

    fn state_error(&self, what: &'static str, scope: XmlScope) -> Error {
        self.make_error(ErrorKind::UnexpectedWrite { what, scope })
    }

    fn io_error(&self, e: io::Error) -> Error {
        self.make_error(ErrorKind::Io(e))
    }
}

impl<W: Write> TokenWrite for XmlWriter<W> {
    fn begin_tag(&mut self, name: &str) -> Result<()> {
        XmlWriter::begin_tag(self, name)
    }

    fn begin_tag_ns(&mut self, namespace: &Namespace, name: &str) -> Result<()> {
        XmlWriter::begin_tag_ns(self, namespace, name)
    }

    fn attribute_name(&mut self, name: &str) -> Result<()> {
        XmlWriter::attribute_name(self, name)
    }

    fn attribute_name_ns(&mut self, namespace: &Namespace, name: &str) -> Result<()> {
        XmlWriter::attribute_name_ns(self, namespace, name)
    }

    fn attribute_value(&mut self, value: &str) -> Result<()> {
        XmlWriter::attribute_value(self, value)
    }

    fn declare_namespace(&mut self, namespace: &Namespace) -> Result<()> {
        XmlWriter::declare_namespace(self, namespace)
    }

    fn text(&mut self, value: &str) -> Result<()> {
        XmlWriter::text(self, value)
    }

    fn end_tag(&mut self) -> Result<()> {
        XmlWriter::end_tag(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn written(f: impl FnOnce(&mut XmlWriter<&mut Vec<u8>>)) -> String {
        let mut out = Vec::new();
        let mut writer = XmlWriter::new(&mut out);
        f(&mut writer);
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn writes_attributes_and_text() {
        let doc = written(|w| {
            w.begin_tag("entry").unwrap();
            w.attribute("id", "42").unwrap();
            w.text("body").unwrap();
            w.end_tag().unwrap();
            w.close().unwrap();
        });
        assert_eq!(doc, r#"<entry id="42">body</entry>"#);
    }

    #[test]
    fn content_free_element_collapses_to_self_closing() {
        let doc = written(|w| {
            w.begin_tag("a").unwrap();
            w.attribute("x", "1").unwrap();
            w.end_tag().unwrap();
            w.close().unwrap();
        });
        assert_eq!(doc, r#"<a x="1"/>"#);
    }

    #[test]
    fn element_with_empty_text_stays_expanded() {
        let doc = written(|w| {
            w.begin_tag("a").unwrap();
            w.text("").unwrap();
            w.end_tag().unwrap();
        });
        assert_eq!(doc, "<a></a>");
    }

    #[test]
    fn nested_elements_close_in_order() {
        let doc = written(|w| {
            w.begin_tag("a").unwrap();
            w.begin_tag("b").unwrap();
            w.text("t").unwrap();
            w.end_tag().unwrap();
            w.begin_tag("c").unwrap();
            w.end_tag().unwrap();
            w.end_tag().unwrap();
        });
        assert_eq!(doc, "<a><b>t</b><c/></a>");
    }

    #[test]
    fn escapes_text_and_attribute_values() {
        let doc = written(|w| {
            w.begin_tag("m").unwrap();
            w.attribute("q", r#"a"b<c&d"#).unwrap();
            w.text("1<2&3>4").unwrap();
            w.end_tag().unwrap();
        });
        assert_eq!(doc, r#"<m q="a&quot;b&lt;c&amp;d">1&lt;2&amp;3&gt;4</m>"#);
    }

    #[test]
    fn split_attribute_name_value_calls_compose() {
        let doc = written(|w| {
            w.begin_tag("a").unwrap();
            w.attribute_name("k").unwrap();
            w.attribute_value("v").unwrap();
            w.end_tag().unwrap();
        });
        assert_eq!(doc, r#"<a k="v"/>"#);
    }

    #[test]
    fn declares_prefixed_and_default_namespaces() {
        let doc = written(|w| {
            let ns = Namespace::new("n", "urn:example");
            w.begin_tag_ns(&ns, "root").unwrap();
            w.declare_namespace(&ns).unwrap();
            w.declare_namespace(&Namespace::default_uri("urn:default"))
                .unwrap();
            w.end_tag().unwrap();
        });
        assert_eq!(
            doc,
            r#"<n:root xmlns:n="urn:example" xmlns="urn:default"/>"#
        );
    }

    #[test]
    fn attribute_after_content_is_rejected() {
        let mut out = Vec::new();
        let mut writer = XmlWriter::new(&mut out);
        writer.begin_tag("a").unwrap();
        writer.text("t").unwrap();
        let err = writer.attribute("x", "1").unwrap_err();
        assert!(matches!(
            err.kind(),
            ErrorKind::UnexpectedWrite {
                scope: XmlScope::ElementContent,
                ..
            }
        ));
    }

    #[test]
    fn end_tag_with_nothing_open_is_rejected() {
        let mut out = Vec::new();
        let mut writer = XmlWriter::new(&mut out);
        let err = writer.end_tag().unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::UnexpectedWrite { .. }));
    }

    #[test]
    fn second_root_element_is_rejected() {
        let mut out = Vec::new();
        let mut writer = XmlWriter::new(&mut out);
        writer.begin_tag("a").unwrap();
        writer.end_tag().unwrap();
        let err = writer.begin_tag("b").unwrap_err();
        assert!(matches!(
            err.kind(),
            ErrorKind::UnexpectedWrite {
                scope: XmlScope::NonEmptyDocument,
                ..
            }
        ));
    }

    #[test]
    fn text_at_document_level_is_rejected() {
        let mut out = Vec::new();
        let mut writer = XmlWriter::new(&mut out);
        let err = writer.text("stray").unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::UnexpectedWrite { .. }));
    }

    #[test]
    fn close_with_open_elements_is_incomplete() {
        let mut out = Vec::new();
        let mut writer = XmlWriter::new(&mut out);
        writer.begin_tag("a").unwrap();
        let err = writer.close().unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::IncompleteDocument(_)));
    }

    #[test]
    fn close_on_empty_document_is_incomplete() {
        let mut out = Vec::new();
        let mut writer = XmlWriter::new(&mut out);
        let err = writer.close().unwrap_err();
        assert!(matches!(
            err.kind(),
            ErrorKind::IncompleteDocument(XmlScope::EmptyDocument)
        ));
    }

    #[test]
    fn writes_fail_after_close() {
        let mut out = Vec::new();
        let mut writer = XmlWriter::new(&mut out);
        writer.begin_tag("a").unwrap();
        writer.end_tag().unwrap();
        writer.close().unwrap();
        let err = writer.begin_tag("b").unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Closed("writer")));
    }

    #[test]
    fn attribute_path_shows_at_notation() {
        let mut out = Vec::new();
        let mut writer = XmlWriter::new(&mut out);
        writer.begin_tag("entry").unwrap();
        writer.attribute_name("id").unwrap();
        assert_eq!(writer.current_path(), "/entry[@id]");
    }
}
