//! The pull tokenizer.
//!
//! `XmlReader` is a cursor over a single document with one-token lookahead.
//! Dispatch is keyed by a flat `state` field plus the pending-token slot; the
//! path stack exists only for end-tag validation, namespace depth, and
//! diagnostics. Whitespace, comments, processing instructions, a doctype
//! declaration, the XML declaration, a leading byte-order mark, and `xmlns`
//! attributes are consumed wherever non-whitespace content is expected and
//! never surfaced as tokens.
//!
//! Attribute names have to be scanned eagerly: whether the next attribute is
//! surfaced at all depends on whether it turns out to be an `xmlns`
//! declaration, so `do_peek` reads the name (and, for declarations, the
//! value) before reporting what is pending. The scanned name is stashed in
//! `pending_attribute` until the caller consumes it.
//!
//! Values returned to callers are always owned copies; nothing borrows the
//! reader's buffers.

use std::io::{self, Read};

use crate::{
    error::{Error, ErrorKind, Result, SyntaxError},
    namespace::{Namespace, NamespaceStack},
    source::{ByteSet, ByteSource},
    token::{Token, TokenRead},
};


const TAG_NAME_TERMINALS: ByteSet = ByteSet::new(b">/ \n\t\r\x0c");
const TAG_OR_PREFIX_TERMINALS: ByteSet = ByteSet::new(b":>/ \n\t\r\x0c");
const ATTRIBUTE_NAME_TERMINALS: ByteSet = ByteSet::new(b"= \n\t\r/>");
const ATTRIBUTE_OR_PREFIX_TERMINALS: ByteSet = ByteSet::new(b":= \n\t\r/>");
const TEXT_TERMINALS: ByteSet = ByteSet::new(b"&<");
const SINGLE_QUOTE_OR_AMP: ByteSet = ByteSet::new(b"'&");
const DOUBLE_QUOTE_OR_AMP: ByteSet = ByteSet::new(b"\"&");

const CDATA_OPEN: &[u8] = b"<![CDATA[";
const DOCTYPE_OPEN: &[u8] = b"<!DOCTYPE";
const UTF8_BOM: &[u8] = b"\xef\xbb\xbf";

/// The pending lexical unit, one step finer-grained than [`Token`]: quote
/// styles and self-closing tags matter internally but not to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Peeked {
    BeginTag,
    Attribute,
    SingleQuotedValue,
    DoubleQuotedValue,
    EmptyTag,
    EndTag,
    Text,
    Cdata,
    Eof,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReaderState {
    BeforeDocument,
    Document,
    Tag,
    Attribute,
    Closed,
}

/// A streaming pull tokenizer over a single XML document.
///
/// ```
/// use xmlmodem::{Namespace, Token, XmlReader};
///
/// let mut reader = XmlReader::new(&b"<greeting lang=\"en\">hello</greeting>"[..]);
/// let mut ns = Namespace::default();
/// assert_eq!(reader.begin_tag(&mut ns).unwrap(), "greeting");
/// assert_eq!(reader.peek().unwrap(), Token::AttributeName);
/// assert_eq!(reader.next_attribute(&mut ns).unwrap(), "lang");
/// assert_eq!(reader.next_attribute_value().unwrap(), "en");
/// assert_eq!(reader.next_text().unwrap(), "hello");
/// reader.end_tag().unwrap();
/// assert_eq!(reader.peek().unwrap(), Token::EndDocument);
/// ```
pub struct XmlReader<R: Read> {
    source: ByteSource<R>,
    peeked: Option<Peeked>,
    state: ReaderState,
    /// Open element names, prefixed form (`alias:name`) when applicable.
    path: Vec<String>,
    namespaces: NamespaceStack,
    /// (name, resolved uri) pairs seen on the current element.
    attribute_names: Vec<String>,
    attribute_uris: Vec<Option<String>>,
    /// Name stashed by the eager attribute scan, not yet handed out.
    pending_attribute: Option<String>,
    /// Namespace that goes with `pending_attribute`.
    pending_namespace: Namespace,
}

impl<R: Read> XmlReader<R> {
    pub fn new(input: R) -> Self {
        Self {
            source: ByteSource::new(input),
            peeked: None,
            state: ReaderState::BeforeDocument,
            path: Vec::new(),
            namespaces: NamespaceStack::new(),
            attribute_names: Vec::new(),
            attribute_uris: Vec::new(),
            pending_attribute: None,
            pending_namespace: Namespace::default(),
        }
    }

    /// Classifies the next token without consuming it.
    pub fn peek(&mut self) -> Result<Token> {
        Ok(Self::token_of(self.peek_kind()?))
    }

    /// Consumes a pending [`Token::BeginTag`]. Returns the element's local
    /// name and fills `namespace` with the alias and the uri it resolved to
    /// under the declarations seen so far.
    pub fn begin_tag(&mut self, namespace: &mut Namespace) -> Result<String> {
        let p = self.peek_kind()?;
        if p != Peeked::BeginTag {
            return Err(self.unexpected(Token::BeginTag, p));
        }
        self.namespaces.push_scope();
        self.attribute_names.clear();
        self.attribute_uris.clear();
        let tag = self.next_tag_name(namespace)?;
        let entry = match &namespace.alias {
            Some(alias) => format!("{alias}:{tag}"),
            None => tag.clone(),
        };
        self.path.push(entry);
        self.peeked = None;
        Ok(tag)
    }

    /// Consumes a pending [`Token::EndTag`], validating the closing name
    /// against the matching opening tag.
    pub fn end_tag(&mut self) -> Result<()> {
        let p = self.peek_kind()?;
        if p == Peeked::EndTag {
            self.validate_end_tag()?;
        }
        if p == Peeked::EndTag || p == Peeked::EmptyTag {
            self.path.pop();
            self.namespaces.pop_scope();
            self.state = ReaderState::Document;
            self.attribute_names.clear();
            self.attribute_uris.clear();
            self.peeked = None;
            Ok(())
        } else {
            Err(self.unexpected(Token::EndTag, p))
        }
    }

    /// Consumes a pending [`Token::AttributeName`]. `xmlns` declarations have
    /// already been swallowed by the eager scan and are never returned here.
    pub fn next_attribute(&mut self, namespace: &mut Namespace) -> Result<String> {
        let p = self.peek_kind()?;
        if p != Peeked::Attribute {
            return Err(self.unexpected(Token::AttributeName, p));
        }
        let name = match self.pending_attribute.take() {
            Some(name) => {
                namespace.clone_from(&self.pending_namespace);
                name
            }
            None => loop {
                // xmlns attributes come back as None; keep scanning.
                if let Some(name) = self.read_next_attribute(Some(namespace))? {
                    break name;
                }
            },
        };
        for (i, seen) in self.attribute_names.iter().enumerate() {
            if *seen != name {
                continue;
            }
            match (&namespace.uri, &self.attribute_uris[i]) {
                (None, None) => {
                    return Err(self.error(ErrorKind::DuplicateAttribute(name)));
                }
                (Some(uri), Some(seen_uri)) if uri == seen_uri => {
                    let qualified = format!("{{{uri}}}{name}");
                    return Err(self.error(ErrorKind::DuplicateAttribute(qualified)));
                }
                _ => {}
            }
        }
        self.attribute_names.push(name.clone());
        self.attribute_uris.push(namespace.uri.clone());
        self.peeked = None;
        Ok(name)
    }

    /// Consumes a pending [`Token::AttributeValue`], decoding entities.
    pub fn next_attribute_value(&mut self) -> Result<String> {
        let p = self.peek_kind()?;
        let terminals = match p {
            Peeked::SingleQuotedValue => &SINGLE_QUOTE_OR_AMP,
            Peeked::DoubleQuotedValue => &DOUBLE_QUOTE_OR_AMP,
            other => return Err(self.unexpected(Token::AttributeValue, other)),
        };
        let mut value = String::new();
        self.next_terminated_string(terminals, &mut value)?;
        self.skip_bytes(1)?; // closing quote
        self.peeked = None;
        Ok(value)
    }

    /// Consumes consecutive text and CDATA runs, concatenating them. Entities
    /// are decoded in plain text and left alone inside CDATA. A pending end
    /// tag yields `""` without being consumed.
    pub fn next_text(&mut self) -> Result<String> {
        let mut p = self.peek_kind()?;
        match p {
            Peeked::Text | Peeked::Cdata => {}
            Peeked::EndTag | Peeked::EmptyTag => return Ok(String::new()),
            other => return Err(self.unexpected(Token::Text, other)),
        }
        let mut text = String::new();
        while matches!(p, Peeked::Text | Peeked::Cdata) {
            if p == Peeked::Text {
                self.next_terminated_string(&TEXT_TERMINALS, &mut text)?;
            } else {
                self.next_cdata_string(&mut text)?;
            }
            self.peeked = None;
            p = self.peek_kind()?;
        }
        Ok(text)
    }

    /// Discards whatever token is pending, advancing exactly one token.
    pub fn skip(&mut self) -> Result<()> {
        let mut scratch = Namespace::default();
        match self.peek_kind()? {
            Peeked::BeginTag => {
                self.begin_tag(&mut scratch)?;
            }
            Peeked::EmptyTag | Peeked::EndTag => self.end_tag()?,
            Peeked::Attribute => {
                self.next_attribute(&mut scratch)?;
            }
            Peeked::SingleQuotedValue => self.skip_quoted(b'\'')?,
            Peeked::DoubleQuotedValue => self.skip_quoted(b'"')?,
            Peeked::Text | Peeked::Cdata => self.skip_text()?,
            Peeked::Eof => return Err(self.eof_error()),
        }
        Ok(())
    }

    /// Discards the rest of the subtree rooted at the tag last opened with
    /// [`begin_tag`](Self::begin_tag), up to and including its end tag.
    pub fn skip_current_tag(&mut self) -> Result<()> {
        let mut scratch = Namespace::default();
        let mut depth = 1usize;
        loop {
            match self.peek_kind()? {
                Peeked::EndTag | Peeked::EmptyTag => {
                    self.end_tag()?;
                    depth -= 1;
                    if depth == 0 {
                        return Ok(());
                    }
                }
                Peeked::BeginTag => {
                    self.begin_tag(&mut scratch)?;
                    depth += 1;
                }
                Peeked::Eof => return Ok(()),
                _ => self.skip()?,
            }
        }
    }

    /// The `/`-joined stack of open element names, e.g. `/feed/entry`.
    #[must_use]
    pub fn current_path(&self) -> String {
        let mut out = String::from("/");
        for (i, name) in self.path.iter().enumerate() {
            if i > 0 {
                out.push('/');
            }
            out.push_str(name);
        }
        out
    }

    /// Releases the reader; any further operation fails.
    pub fn close(&mut self) {
        self.peeked = None;
        self.state = ReaderState::Closed;
        self.path.clear();
        self.pending_attribute = None;
    }

    /// Consumes the reader and returns the underlying input.
    pub fn into_inner(self) -> R {
        self.source.into_inner()
    }

    // ---------------------------------------------------------------- peek

    fn peek_kind(&mut self) -> Result<Peeked> {
        match self.peeked {
            Some(p) => Ok(p),
            None => self.do_peek(),
        }
    }

    fn set_peeked(&mut self, p: Peeked) -> Peeked {
        self.peeked = Some(p);
        p
    }

    /// Computes the next pending token, consuming everything that is never
    /// surfaced (whitespace, comments, PIs, doctype, xmlns attributes).
    fn do_peek(&mut self) -> Result<Peeked> {
        if self.pending_attribute.is_some() {
            return Ok(self.set_peeked(Peeked::Attribute));
        }
        match self.state {
            ReaderState::Tag => {
                // Loops rather than recursing: each xmlns declaration is
                // swallowed here, and a tag may carry arbitrarily many.
                loop {
                    match self.next_non_whitespace_required()? {
                        b'/' => {
                            self.skip_bytes(1)?;
                            self.fill_required(1)?;
                            let next = self.source.byte_at(0);
                            if next != b'>' {
                                return Err(self.syntax(SyntaxError::Expected {
                                    expected: "'>'",
                                    found: next as char,
                                }));
                            }
                            self.skip_bytes(1)?;
                            return Ok(self.set_peeked(Peeked::EmptyTag));
                        }
                        b'>' => {
                            self.skip_bytes(1)?;
                            self.state = ReaderState::Document;
                            break;
                        }
                        _ => {
                            let mut ns = std::mem::take(&mut self.pending_namespace);
                            let scanned = self.read_next_attribute(Some(&mut ns));
                            self.pending_namespace = ns;
                            if let Some(name) = scanned? {
                                self.pending_attribute = Some(name);
                                self.state = ReaderState::Attribute;
                                return Ok(self.set_peeked(Peeked::Attribute));
                            }
                        }
                    }
                }
            }
            ReaderState::Attribute => {
                self.state = ReaderState::Tag;
                let c = self.next_non_whitespace_required()?;
                if c != b'=' {
                    return Err(self.syntax(SyntaxError::Expected {
                        expected: "'='",
                        found: c as char,
                    }));
                }
                self.skip_bytes(1)?;
                let c = self.next_non_whitespace_required()?;
                return match c {
                    b'\'' => {
                        self.skip_bytes(1)?;
                        Ok(self.set_peeked(Peeked::SingleQuotedValue))
                    }
                    b'"' => {
                        self.skip_bytes(1)?;
                        Ok(self.set_peeked(Peeked::DoubleQuotedValue))
                    }
                    other => Err(self.syntax(SyntaxError::Expected {
                        expected: "a single or double quote",
                        found: other as char,
                    })),
                };
            }
            ReaderState::BeforeDocument => {
                if self.starts_with(UTF8_BOM)? {
                    self.skip_bytes(UTF8_BOM.len())?;
                }
                // The XML declaration is handled by the generic
                // processing-instruction skip below.
                self.state = ReaderState::Document;
            }
            ReaderState::Document => {}
            ReaderState::Closed => {
                return Err(self.error(ErrorKind::Closed("reader")));
            }
        }

        let Some(mut c) = self.next_non_whitespace()? else {
            return Ok(self.set_peeked(Peeked::Eof));
        };
        while c == b'<' {
            self.fill_required(2)?;
            match self.source.byte_at(1) {
                b'!' => {
                    self.fill_required(4)?;
                    match self.source.byte_at(2) {
                        b'-' => {
                            let dash = self.source.byte_at(3);
                            if dash != b'-' {
                                return Err(self.syntax(SyntaxError::Expected {
                                    expected: "'-'",
                                    found: dash as char,
                                }));
                            }
                            let Some(close) = self.find(b"-->", 0)? else {
                                return Err(self.syntax(SyntaxError::UnterminatedComment));
                            };
                            self.skip_bytes(close + 3)?;
                        }
                        b'[' => {
                            self.fill_required(CDATA_OPEN.len())?;
                            for (i, &expected) in CDATA_OPEN.iter().enumerate().skip(3) {
                                let found = self.source.byte_at(i);
                                if found != expected {
                                    return Err(self.syntax(SyntaxError::Expected {
                                        expected: "'<![CDATA['",
                                        found: found as char,
                                    }));
                                }
                            }
                            self.skip_bytes(CDATA_OPEN.len())?;
                            return Ok(self.set_peeked(Peeked::Cdata));
                        }
                        b'D' | b'd' => self.skip_doctype()?,
                        other => {
                            return Err(self.syntax(SyntaxError::Expected {
                                expected: "'-' or '['",
                                found: other as char,
                            }));
                        }
                    }
                }
                b'/' => {
                    self.skip_bytes(2)?;
                    return Ok(self.set_peeked(Peeked::EndTag));
                }
                b'?' => {
                    let Some(close) = self.find(b"?>", 0)? else {
                        return Err(self.syntax(SyntaxError::UnterminatedProcessingInstruction));
                    };
                    self.skip_bytes(close + 2)?;
                }
                _ => {
                    self.skip_bytes(1)?;
                    self.state = ReaderState::Tag;
                    return Ok(self.set_peeked(Peeked::BeginTag));
                }
            }
            match self.next_non_whitespace()? {
                Some(next) => c = next,
                None => return Ok(self.set_peeked(Peeked::Eof)),
            }
        }
        Ok(self.set_peeked(Peeked::Text))
    }

    // ------------------------------------------------------------- helpers

    /// Reads a tag name, resolving its prefix (or the default namespace)
    /// into `namespace`.
    fn next_tag_name(&mut self, namespace: &mut Namespace) -> Result<String> {
        // There may be space between the '<' and the name.
        self.next_non_whitespace_required()?;
        let Some(end) = self.index_of_element(&TAG_OR_PREFIX_TERMINALS)? else {
            return Err(self.eof_error());
        };
        let tag_or_prefix = self.read_utf8(end)?;
        self.fill_required(1)?;
        if self.source.byte_at(0) == b':' {
            self.skip_bytes(1)?;
            namespace.uri = self.namespaces.resolve(&tag_or_prefix).map(str::to_owned);
            namespace.alias = Some(tag_or_prefix);
            let Some(end) = self.index_of_element(&TAG_NAME_TERMINALS)? else {
                return Err(self.eof_error());
            };
            self.read_utf8(end)
        } else {
            namespace.alias = None;
            namespace.uri = self.namespaces.default_uri().map(str::to_owned);
            Ok(tag_or_prefix)
        }
    }

    /// Reads the next attribute name and resolves its namespace. Returns
    /// `None` for an `xmlns`/`xmlns:prefix` declaration, which is applied to
    /// the namespace table (or the default-namespace slot) instead of being
    /// surfaced.
    fn read_next_attribute(&mut self, namespace: Option<&mut Namespace>) -> Result<Option<String>> {
        let Some(end) = self.index_of_element(&ATTRIBUTE_OR_PREFIX_TERMINALS)? else {
            return Err(self.eof_error());
        };
        let attr_or_prefix = self.read_utf8(end)?;
        self.fill_required(1)?;
        if self.source.byte_at(0) == b':' {
            self.skip_bytes(1)?;
            if attr_or_prefix == "xmlns" {
                let prefix = self.read_next_attribute_name()?;
                self.state = ReaderState::Attribute;
                self.peeked = None;
                let uri = self.next_attribute_value()?;
                self.namespaces.insert(&prefix, uri);
                Ok(None)
            } else {
                if let Some(ns) = namespace {
                    ns.uri = self.namespaces.resolve(&attr_or_prefix).map(str::to_owned);
                    ns.alias = Some(attr_or_prefix);
                }
                Ok(Some(self.read_next_attribute_name()?))
            }
        } else if attr_or_prefix == "xmlns" {
            self.state = ReaderState::Attribute;
            self.peeked = None;
            let uri = self.next_attribute_value()?;
            self.namespaces.set_default(uri);
            Ok(None)
        } else {
            if let Some(ns) = namespace {
                ns.alias = None;
                ns.uri = self.namespaces.default_uri().map(str::to_owned);
            }
            Ok(Some(attr_or_prefix))
        }
    }

    fn read_next_attribute_name(&mut self) -> Result<String> {
        let Some(end) = self.index_of_element(&ATTRIBUTE_NAME_TERMINALS)? else {
            return Err(self.eof_error());
        };
        self.read_utf8(end)
    }

    /// Reads the closing tag's name from the stream and checks it against
    /// the opening name recorded at this depth, byte for byte.
    fn validate_end_tag(&mut self) -> Result<()> {
        let Some(expected) = self.path.last().cloned() else {
            return Err(self.syntax(SyntaxError::Other("closing tag with no open element")));
        };
        self.fill_required(expected.len() + 1)?;
        let found = self.read_utf8(expected.len())?;
        if found != expected {
            return Err(self.error(ErrorKind::MismatchedTag { expected, found }));
        }
        self.consume_tag_close()
    }

    /// Consumes up to and including the next `>`, requiring everything
    /// before it to be whitespace.
    fn consume_tag_close(&mut self) -> Result<()> {
        let Some(index) = self.index_of(b'>', 0)? else {
            if self.source.available() > 0 {
                let found = self.source.byte_at(0) as char;
                return Err(self.syntax(SyntaxError::Expected {
                    expected: "'>'",
                    found,
                }));
            }
            return Err(self.eof_error());
        };
        for i in 0..index {
            let c = self.source.byte_at(i);
            if !matches!(c, b'\n' | b' ' | b'\r' | b'\t') {
                return Err(self.syntax(SyntaxError::Expected {
                    expected: "'>'",
                    found: c as char,
                }));
            }
        }
        self.skip_bytes(index + 1)
    }

    /// Skips whitespace and returns the next byte without consuming it;
    /// `None` at end of input.
    fn next_non_whitespace(&mut self) -> Result<Option<u8>> {
        loop {
            if !self.fill(1)? {
                return Ok(None);
            }
            let c = self.source.byte_at(0);
            if matches!(c, b'\n' | b' ' | b'\r' | b'\t') {
                self.skip_bytes(1)?;
                continue;
            }
            return Ok(Some(c));
        }
    }

    fn next_non_whitespace_required(&mut self) -> Result<u8> {
        match self.next_non_whitespace()? {
            Some(c) => Ok(c),
            None => Err(self.eof_error()),
        }
    }

    /// Reads up to (not including) the first terminator byte into `out`,
    /// expanding entities along the way. `&` must be in the terminal set.
    fn next_terminated_string(&mut self, terminals: &ByteSet, out: &mut String) -> Result<()> {
        loop {
            let Some(index) = self.index_of_element(terminals)? else {
                return Err(self.syntax(SyntaxError::UnterminatedString));
            };
            if self.source.byte_at(index) == b'&' {
                out.push_str(&self.read_utf8(index)?);
                self.skip_bytes(1)?; // '&'
                self.read_entity(out)?;
                continue;
            }
            out.push_str(&self.read_utf8(index)?);
            return Ok(());
        }
    }

    /// Reads a CDATA body verbatim up to `]]>`, consuming the close marker.
    fn next_cdata_string(&mut self, out: &mut String) -> Result<()> {
        let mut start = 0;
        loop {
            let Some(index) = self.index_of(b']', start)? else {
                return Err(self.syntax(SyntaxError::UnterminatedCdata));
            };
            if !self.fill(index + 3)? {
                return Err(self.syntax(SyntaxError::UnterminatedCdata));
            }
            if self.source.byte_at(index + 1) != b']' || self.source.byte_at(index + 2) != b'>' {
                start = index + 1;
                continue;
            }
            out.push_str(&self.read_utf8(index)?);
            self.skip_bytes(3)?; // ]]>
            return Ok(());
        }
    }

    /// Reads an entity body (the `&` is already consumed) and appends its
    /// expansion to `out`.
    fn read_entity(&mut self, out: &mut String) -> Result<()> {
        let Some(end) = self.index_of(b';', 0)? else {
            return Err(self.syntax(SyntaxError::UnterminatedEntity));
        };
        let entity = self.read_utf8(end)?;
        self.skip_bytes(1)?; // ';'
        crate::entities::decode_entity(&entity, out).map_err(|e| self.syntax(e))
    }

    /// Skips one `<!DOCTYPE ...>` declaration, with or without an internal
    /// `[...]` subset.
    fn skip_doctype(&mut self) -> Result<()> {
        self.fill_required(DOCTYPE_OPEN.len())?;
        for (i, &expected) in DOCTYPE_OPEN.iter().enumerate() {
            let found = self.source.byte_at(i);
            if !found.eq_ignore_ascii_case(&expected) {
                return Err(self.syntax(SyntaxError::Expected {
                    expected: "'<!DOCTYPE'",
                    found: found as char,
                }));
            }
        }
        let Some(close) = self.index_of(b'>', DOCTYPE_OPEN.len())? else {
            return Err(self.syntax(SyntaxError::UnterminatedDoctype));
        };
        if let Some(bracket) = self
            .source
            .index_of_buffered(b'[', DOCTYPE_OPEN.len(), close)
        {
            // The first '>' may sit inside the subset; scan for the "]>"
            // that closes it instead.
            let mut from = bracket;
            loop {
                let Some(end) = self.index_of(b']', from)? else {
                    return Err(self.syntax(SyntaxError::UnterminatedDoctype));
                };
                if !self.fill(end + 2)? {
                    return Err(self.syntax(SyntaxError::UnterminatedDoctype));
                }
                if self.source.byte_at(end + 1) == b'>' {
                    return self.skip_bytes(end + 2);
                }
                from = end + 1;
            }
        }
        self.skip_bytes(close + 1)
    }

    fn skip_quoted(&mut self, quote: u8) -> Result<()> {
        let Some(index) = self.index_of(quote, 0)? else {
            return Err(self.syntax(SyntaxError::UnterminatedString));
        };
        self.skip_bytes(index + 1)?;
        self.peeked = None;
        Ok(())
    }

    fn skip_text(&mut self) -> Result<()> {
        let mut p = self.peek_kind()?;
        while matches!(p, Peeked::Text | Peeked::Cdata) {
            if p == Peeked::Text {
                let Some(index) = self.index_of(b'<', 0)? else {
                    return Err(self.syntax(SyntaxError::UnterminatedString));
                };
                self.skip_bytes(index)?;
            } else {
                self.skip_cdata()?;
            }
            self.peeked = None;
            p = self.peek_kind()?;
        }
        Ok(())
    }

    fn skip_cdata(&mut self) -> Result<()> {
        let mut start = 0;
        loop {
            let Some(index) = self.index_of(b']', start)? else {
                return Err(self.syntax(SyntaxError::UnterminatedCdata));
            };
            if !self.fill(index + 3)? {
                return Err(self.syntax(SyntaxError::UnterminatedCdata));
            }
            if self.source.byte_at(index + 1) != b']' || self.source.byte_at(index + 2) != b'>' {
                start = index + 1;
                continue;
            }
            return self.skip_bytes(index + 3);
        }
    }

    // ------------------------------------------------- source plumbing

    fn fill(&mut self, n: usize) -> Result<bool> {
        self.source.request(n).map_err(|e| self.io_error(e))
    }

    fn fill_required(&mut self, n: usize) -> Result<()> {
        if self.fill(n)? { Ok(()) } else { Err(self.eof_error()) }
    }

    fn skip_bytes(&mut self, n: usize) -> Result<()> {
        self.source.skip(n).map_err(|e| self.io_error(e))
    }

    fn index_of(&mut self, byte: u8, from: usize) -> Result<Option<usize>> {
        self.source.index_of(byte, from).map_err(|e| self.io_error(e))
    }

    fn index_of_element(&mut self, set: &ByteSet) -> Result<Option<usize>> {
        self.source.index_of_element(set, 0).map_err(|e| self.io_error(e))
    }

    fn find(&mut self, pattern: &[u8], from: usize) -> Result<Option<usize>> {
        self.source.find(pattern, from).map_err(|e| self.io_error(e))
    }

    fn read_utf8(&mut self, n: usize) -> Result<String> {
        self.source.read_utf8(n).map_err(|e| self.io_error(e))
    }

    fn starts_with(&mut self, pattern: &[u8]) -> Result<bool> {
        self.source.starts_with(pattern).map_err(|e| self.io_error(e))
    }

    // --------------------------------------------------------- errors

    fn error(&self, kind: ErrorKind) -> Error {
        Error::new(kind, self.current_path())
    }

    fn syntax(&self, e: SyntaxError) -> Error {
        self.error(ErrorKind::Syntax(e))
    }

    fn eof_error(&self) -> Error {
        self.error(ErrorKind::UnexpectedEndOfDocument)
    }

    fn io_error(&self, e: io::Error) -> Error {
        match e.kind() {
            io::ErrorKind::UnexpectedEof => self.eof_error(),
            io::ErrorKind::InvalidData => self.syntax(SyntaxError::InvalidUtf8),
            _ => self.error(ErrorKind::Io(e)),
        }
    }

    fn unexpected(&self, expected: Token, found: Peeked) -> Error {
        if found == Peeked::Eof {
            return self.eof_error();
        }
        self.error(ErrorKind::UnexpectedToken {
            expected,
            found: Self::token_of(found),
        })
    }

    fn token_of(p: Peeked) -> Token {
        match p {
            Peeked::BeginTag => Token::BeginTag,
            Peeked::Attribute => Token::AttributeName,
            Peeked::SingleQuotedValue | Peeked::DoubleQuotedValue => Token::AttributeValue,
            Peeked::Text | Peeked::Cdata => Token::Text,
            Peeked::EndTag | Peeked::EmptyTag => Token::EndTag,
            Peeked::Eof => Token::EndDocument,
        }
    }
}

impl<R: Read> TokenRead for XmlReader<R> {
    fn peek(&mut self) -> Result<Token> {
        XmlReader::peek(self)
    }

    fn begin_tag(&mut self, namespace: &mut Namespace) -> Result<String> {
        XmlReader::begin_tag(self, namespace)
    }

    fn end_tag(&mut self) -> Result<()> {
        XmlReader::end_tag(self)
    }

    fn next_attribute(&mut self, namespace: &mut Namespace) -> Result<String> {
        XmlReader::next_attribute(self, namespace)
    }

    fn next_attribute_value(&mut self) -> Result<String> {
        XmlReader::next_attribute_value(self)
    }

    fn next_text(&mut self) -> Result<String> {
        XmlReader::next_text(self)
    }

    fn skip(&mut self) -> Result<()> {
        XmlReader::skip(self)
    }

    fn skip_current_tag(&mut self) -> Result<()> {
        XmlReader::skip_current_tag(self)
    }

    fn current_path(&self) -> String {
        XmlReader::current_path(self)
    }
}
