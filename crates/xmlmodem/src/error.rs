//! Error taxonomy for the reader, the writer, and the binding layer.
//!
//! Every failure carries the element path at which it occurred. Nothing is
//! retried or recovered internally; a reader that has returned an error is in
//! an undefined state past the failure point.

use std::io;

use thiserror::Error;

use crate::{scope::XmlScope, token::Token};

/// An error produced while reading or writing a document, annotated with the
/// `/`-joined element path at which it occurred.
#[derive(Error, Debug)]
#[error("{kind} at path {path}")]
pub struct Error {
    kind: ErrorKind,
    path: String,
}

impl Error {
    pub(crate) fn new(kind: ErrorKind, path: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }

    /// The failure classification.
    #[must_use]
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// The element path at the point of failure, e.g. `/feed/entry/title`.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }
}

/// Classification of a failure.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Malformed document structure.
    #[error("syntax error: {0}")]
    Syntax(#[from] SyntaxError),

    /// The input ended where more document was required, or a token was
    /// requested after the end of the document.
    #[error("unexpected end of document")]
    UnexpectedEndOfDocument,

    /// A closing tag did not match the opening tag at the same depth.
    #[error("mismatched tags: expected '{expected}' but was '{found}'")]
    MismatchedTag { expected: String, found: String },

    /// The same (name, namespace uri) attribute pair appeared twice on one
    /// element.
    #[error("duplicate attribute '{0}'")]
    DuplicateAttribute(String),

    /// The caller invoked an operation that is not valid for the pending
    /// token.
    #[error("expected {expected} but was {found}")]
    UnexpectedToken { expected: Token, found: Token },

    /// A writer operation that is not valid in the current scope.
    #[error("cannot write {what} in scope {scope}")]
    UnexpectedWrite {
        what: &'static str,
        scope: XmlScope,
    },

    /// The writer was closed while elements were still open, or before any
    /// root element was written.
    #[error("incomplete document, abrupt end in scope {0}")]
    IncompleteDocument(XmlScope),

    /// The reader or writer was used after `close()`.
    #[error("{0} is closed")]
    Closed(&'static str),

    /// Structurally valid XML contained an attribute with no descriptor
    /// entry, under the binding layer's fail-on-unknown policy.
    #[error("unmapped attribute '{0}'")]
    UnmappedAttribute(String),

    /// Structurally valid XML contained an element (or stray text) with no
    /// descriptor entry, under `UnknownEntryPolicy::Fail`.
    #[error("unmapped element '{0}'")]
    UnmappedElement(String),

    /// A bound field rejected its text value.
    #[error("invalid value for '{field}': {message}")]
    Convert { field: String, message: String },

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Malformed-structure details carried by [`ErrorKind::Syntax`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SyntaxError {
    #[error("unterminated string")]
    UnterminatedString,
    #[error("unterminated CDATA")]
    UnterminatedCdata,
    #[error("unterminated comment")]
    UnterminatedComment,
    #[error("unterminated <!DOCTYPE>")]
    UnterminatedDoctype,
    #[error("unterminated entity reference")]
    UnterminatedEntity,
    #[error("unterminated processing instruction")]
    UnterminatedProcessingInstruction,
    #[error("expected {expected} but was '{found}'")]
    Expected { expected: &'static str, found: char },
    #[error("malformed character reference '&{0};'")]
    InvalidCharacterReference(String),
    #[error("entity '&{0};' is not supported")]
    UnsupportedEntity(String),
    #[error("invalid UTF-8 in document")]
    InvalidUtf8,
    #[error("{0}")]
    Other(&'static str),
}

pub type Result<T, E = Error> = core::result::Result<T, E>;
