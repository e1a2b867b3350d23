//! A streaming XML pull parser and writer.
//!
//! The reader is a hand-rolled, allocation-conscious scanner over a buffered
//! byte stream: it tracks nested-element state, resolves namespace prefixes,
//! decodes the predefined entities and character references, skips
//! comments/PIs/doctype framing, and exposes the document as a lazy sequence
//! of tokens with one-token lookahead. The writer mirrors the same token
//! vocabulary and produces documents that re-parse to identical decoded
//! values.
//!
//! The optional [`bind`] module layers a descriptor-driven mapping between
//! documents and typed values on top of the token contract.

mod entities;
mod error;
mod namespace;
mod reader;
mod scope;
mod source;
mod token;
mod writer;

#[cfg(feature = "bind")]
pub mod bind;

pub use error::{Error, ErrorKind, Result, SyntaxError};
pub use namespace::Namespace;
pub use reader::XmlReader;
pub use scope::XmlScope;
pub use token::{Token, TokenRead, TokenWrite};
pub use writer::XmlWriter;
