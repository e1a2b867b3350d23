//! The token vocabulary and the pull contract shared by the reader, the
//! writer, and everything built on top of them.

use core::fmt;

use crate::{error::Result, namespace::Namespace};

/// Classification of the next lexical unit of a document.
///
/// Exactly one token is pending (peeked but not consumed) at a time;
/// [`TokenRead::peek`] is idempotent until the next consuming call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Token {
    /// An opening tag, `<name`.
    BeginTag,
    /// The name of an attribute inside an opening tag.
    AttributeName,
    /// A single- or double-quoted attribute value.
    AttributeValue,
    /// Element text content, including CDATA sections.
    Text,
    /// A closing tag, `</name>` or the `/>` of a self-closing tag.
    EndTag,
    /// The end of the document.
    EndDocument,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Token::BeginTag => "BEGIN_TAG",
            Token::AttributeName => "ATTRIBUTE_NAME",
            Token::AttributeValue => "ATTRIBUTE_VALUE",
            Token::Text => "TEXT",
            Token::EndTag => "END_TAG",
            Token::EndDocument => "END_DOCUMENT",
        };
        f.write_str(name)
    }
}

/// The pull side of the token contract.
///
/// This is the sole boundary a consumer such as the binding layer may cross;
/// implementations never hand out references into their internal buffers,
/// only owned copies of decoded values.
pub trait TokenRead {
    /// Returns the classification of the next lexical unit without consuming
    /// it. Whitespace, comments, processing instructions, doctype
    /// declarations, and `xmlns` attributes may be consumed in the process
    /// but are never surfaced.
    fn peek(&mut self) -> Result<Token>;

    /// Consumes a pending [`Token::BeginTag`], returning the element's local
    /// name and filling `namespace` with its resolved alias and uri.
    fn begin_tag(&mut self, namespace: &mut Namespace) -> Result<String>;

    /// Consumes a pending [`Token::EndTag`], validating that the closing name
    /// matches the opening name at this depth.
    fn end_tag(&mut self) -> Result<()>;

    /// Consumes a pending [`Token::AttributeName`], returning the attribute's
    /// local name and filling `namespace` with its resolved alias and uri.
    fn next_attribute(&mut self, namespace: &mut Namespace) -> Result<String>;

    /// Consumes a pending [`Token::AttributeValue`], decoding entities.
    fn next_attribute_value(&mut self) -> Result<String>;

    /// Consumes consecutive [`Token::Text`] runs (text and CDATA,
    /// interleaved), concatenating them. A pending end tag yields the empty
    /// string without being consumed.
    fn next_text(&mut self) -> Result<String>;

    /// Discards whatever token is pending, advancing exactly one token.
    fn skip(&mut self) -> Result<()>;

    /// Discards the entire subtree of the tag last opened with
    /// [`begin_tag`](TokenRead::begin_tag), up to and including its end tag.
    fn skip_current_tag(&mut self) -> Result<()>;

    /// The `/`-joined stack of open element names, for diagnostics.
    fn current_path(&self) -> String;
}

/// The push side of the token contract, mirroring [`TokenRead`].
pub trait TokenWrite {
    /// Opens `<name`, leaving the tag open for attributes. Closes a
    /// previously pending `>` first.
    fn begin_tag(&mut self, name: &str) -> Result<()>;

    /// Opens `<alias:name` when the namespace carries an alias.
    fn begin_tag_ns(&mut self, namespace: &Namespace, name: &str) -> Result<()>;

    /// Emits ` name`; must be followed by
    /// [`attribute_value`](TokenWrite::attribute_value).
    fn attribute_name(&mut self, name: &str) -> Result<()>;

    /// Emits ` alias:name` when the namespace carries an alias.
    fn attribute_name_ns(&mut self, namespace: &Namespace, name: &str) -> Result<()>;

    /// Emits `="escaped-value"` for the attribute name written last.
    fn attribute_value(&mut self, value: &str) -> Result<()>;

    /// Emits an `xmlns:alias="uri"` (or default `xmlns="uri"`) declaration;
    /// only valid while the tag is still open.
    fn declare_namespace(&mut self, namespace: &Namespace) -> Result<()>;

    /// Emits escaped element text content, closing a pending `>` first.
    fn text(&mut self, value: &str) -> Result<()>;

    /// Closes the innermost open element, collapsing to `/>` when no content
    /// was ever written.
    fn end_tag(&mut self) -> Result<()>;
}
