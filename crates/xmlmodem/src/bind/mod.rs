//! Descriptor-driven binding between documents and typed values.
//!
//! Instead of reflecting over a type at read time, a consumer builds an
//! [`ElementSchema`] once — an immutable table of which attributes, child
//! elements, and text content map to which accessors — and reuses it for
//! every document. Schemas are `Arc`-shared and drive the reader and writer
//! exclusively through the [`TokenRead`]/[`TokenWrite`] contract.
//!
//! ```
//! use std::sync::Arc;
//! use xmlmodem::bind::ElementSchema;
//! use xmlmodem::XmlReader;
//!
//! #[derive(Default)]
//! struct Entry {
//!     id: u32,
//!     title: String,
//! }
//!
//! let schema: Arc<ElementSchema<Entry>> = ElementSchema::builder("entry")
//!     .attribute("id", |e: &Entry| Some(e.id), |e, v| e.id = v)
//!     .child_text("title", |e: &Entry| Some(e.title.clone()), |e, v| e.title = v)
//!     .build();
//!
//! let doc = br#"<entry id="7"><title>hello</title></entry>"#;
//! let entry = schema.read(&mut XmlReader::new(&doc[..])).unwrap();
//! assert_eq!(entry.id, 7);
//! assert_eq!(entry.title, "hello");
//! ```

mod codec;

use std::sync::Arc;

use crate::{
    error::{Error, ErrorKind, Result},
    namespace::Namespace,
    token::{Token, TokenRead, TokenWrite},
};

pub use codec::XmlText;

/// What to do when a structurally valid document contains an attribute or
/// element with no schema entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum UnknownEntryPolicy {
    /// Fail with `UnmappedAttribute`/`UnmappedElement`.
    Fail,
    /// Silently discard the unmapped data.
    #[default]
    Skip,
}

type Getter<T> = Box<dyn Fn(&T) -> Option<String> + Send + Sync>;
type Setter<T> = Box<dyn Fn(&mut T, &str) -> Result<(), String> + Send + Sync>;

struct AttributeField<T> {
    name: String,
    uri: Option<String>,
    get: Getter<T>,
    set: Setter<T>,
}

struct ChildField<T> {
    name: String,
    uri: Option<String>,
    node: Box<dyn ChildNode<T> + Send + Sync>,
}

struct TextBinding<T> {
    get: Getter<T>,
    set: Setter<T>,
}

/// One bound child element kind. `read` is entered with the child's
/// `begin_tag` already consumed and must consume through its end tag;
/// `write` emits zero or more complete elements.
trait ChildNode<T> {
    fn read(&self, target: &mut T, reader: &mut dyn TokenRead) -> Result<()>;
    fn write(&self, source: &T, name: &str, writer: &mut dyn TokenWrite) -> Result<()>;
}

/// An immutable read/write descriptor for one element type.
///
/// Build once at startup with [`ElementSchema::builder`], share via `Arc`.
pub struct ElementSchema<T> {
    name: String,
    namespace: Option<Namespace>,
    attributes: Vec<AttributeField<T>>,
    children: Vec<ChildField<T>>,
    text: Option<TextBinding<T>>,
    unknown_entries: UnknownEntryPolicy,
}

impl<T: 'static> ElementSchema<T> {
    /// Starts a schema for elements named `name`.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> ElementSchemaBuilder<T> {
        ElementSchemaBuilder {
            schema: ElementSchema {
                name: name.into(),
                namespace: None,
                attributes: Vec::new(),
                children: Vec::new(),
                text: None,
                unknown_entries: UnknownEntryPolicy::default(),
            },
        }
    }

    /// The element name this schema binds.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Reads one complete element (opening tag through closing tag) into a
    /// default-constructed value.
    pub fn read(&self, reader: &mut dyn TokenRead) -> Result<T>
    where
        T: Default,
    {
        let mut ns = Namespace::default();
        let name = reader.begin_tag(&mut ns)?;
        if name != self.name {
            return Err(Error::new(
                ErrorKind::UnmappedElement(name),
                reader.current_path(),
            ));
        }
        let mut value = T::default();
        self.read_content(&mut value, reader)?;
        Ok(value)
    }

    /// Reads attributes, children, and text up to and including the end tag.
    fn read_content(&self, value: &mut T, reader: &mut dyn TokenRead) -> Result<()> {
        let mut ns = Namespace::default();
        loop {
            match reader.peek()? {
                Token::AttributeName => {
                    let name = reader.next_attribute(&mut ns)?;
                    match self.find_attribute(&name, ns.uri.as_deref()) {
                        Some(field) => {
                            let raw = reader.next_attribute_value()?;
                            (field.set)(value, &raw).map_err(|message| {
                                Error::new(
                                    ErrorKind::Convert {
                                        field: field.name.clone(),
                                        message,
                                    },
                                    reader.current_path(),
                                )
                            })?;
                        }
                        None => match self.unknown_entries {
                            UnknownEntryPolicy::Fail => {
                                return Err(Error::new(
                                    ErrorKind::UnmappedAttribute(name),
                                    reader.current_path(),
                                ));
                            }
                            UnknownEntryPolicy::Skip => reader.skip()?,
                        },
                    }
                }
                Token::Text => {
                    let text = reader.next_text()?;
                    if let Some(binding) = &self.text {
                        (binding.set)(value, &text).map_err(|message| {
                            Error::new(
                                ErrorKind::Convert {
                                    field: "#text".to_string(),
                                    message,
                                },
                                reader.current_path(),
                            )
                        })?;
                    } else if !text.trim().is_empty()
                        && self.unknown_entries == UnknownEntryPolicy::Fail
                    {
                        return Err(Error::new(
                            ErrorKind::UnmappedElement("#text".to_string()),
                            reader.current_path(),
                        ));
                    }
                }
                Token::BeginTag => {
                    let name = reader.begin_tag(&mut ns)?;
                    match self.find_child(&name, ns.uri.as_deref()) {
                        Some(field) => field.node.read(value, reader)?,
                        None => match self.unknown_entries {
                            UnknownEntryPolicy::Fail => {
                                return Err(Error::new(
                                    ErrorKind::UnmappedElement(name),
                                    reader.current_path(),
                                ));
                            }
                            UnknownEntryPolicy::Skip => reader.skip_current_tag()?,
                        },
                    }
                }
                Token::EndTag => {
                    reader.end_tag()?;
                    return Ok(());
                }
                Token::EndDocument => {
                    return Err(Error::new(
                        ErrorKind::UnexpectedEndOfDocument,
                        reader.current_path(),
                    ));
                }
                // A value whose name was consumed by someone else; discard.
                Token::AttributeValue => reader.skip()?,
            }
        }
    }

    /// Writes one complete element for `value`.
    pub fn write(&self, value: &T, writer: &mut dyn TokenWrite) -> Result<()> {
        match &self.namespace {
            Some(ns) => writer.begin_tag_ns(ns, &self.name)?,
            None => writer.begin_tag(&self.name)?,
        }
        if let Some(ns) = &self.namespace {
            if ns.uri.is_some() {
                writer.declare_namespace(ns)?;
            }
        }
        self.write_content(value, writer)
    }

    /// Writes attributes, children, and text, then the end tag.
    fn write_content(&self, value: &T, writer: &mut dyn TokenWrite) -> Result<()> {
        for field in &self.attributes {
            if let Some(text) = (field.get)(value) {
                writer.attribute_name(&field.name)?;
                writer.attribute_value(&text)?;
            }
        }
        for field in &self.children {
            field.node.write(value, &field.name, writer)?;
        }
        if let Some(binding) = &self.text {
            if let Some(text) = (binding.get)(value) {
                writer.text(&text)?;
            }
        }
        writer.end_tag()
    }

    /// An attribute field declared without a uri matches any namespace; one
    /// declared with a uri requires an exact match.
    fn find_attribute(&self, name: &str, uri: Option<&str>) -> Option<&AttributeField<T>> {
        self.attributes.iter().find(|f| {
            f.name == name && (f.uri.is_none() || f.uri.as_deref() == uri)
        })
    }

    fn find_child(&self, name: &str, uri: Option<&str>) -> Option<&ChildField<T>> {
        self.children.iter().find(|f| {
            f.name == name && (f.uri.is_none() || f.uri.as_deref() == uri)
        })
    }
}

/// Builder for [`ElementSchema`]; every method takes and returns `self`.
pub struct ElementSchemaBuilder<T> {
    schema: ElementSchema<T>,
}

impl<T: 'static> ElementSchemaBuilder<T> {
    /// Namespace the element is written in (alias + uri); read-side matching
    /// stays name-based unless fields declare uris of their own.
    #[must_use]
    pub fn namespace(mut self, namespace: Namespace) -> Self {
        self.schema.namespace = Some(namespace);
        self
    }

    /// Policy for attributes/elements with no schema entry.
    #[must_use]
    pub fn unknown_entries(mut self, policy: UnknownEntryPolicy) -> Self {
        self.schema.unknown_entries = policy;
        self
    }

    /// Binds an attribute. `get` returning `None` omits the attribute when
    /// writing.
    #[must_use]
    pub fn attribute<V, G, S>(self, name: impl Into<String>, get: G, set: S) -> Self
    where
        V: XmlText + 'static,
        G: Fn(&T) -> Option<V> + Send + Sync + 'static,
        S: Fn(&mut T, V) + Send + Sync + 'static,
    {
        self.attribute_impl(name.into(), None, get, set)
    }

    /// Binds an attribute in a specific namespace uri.
    #[must_use]
    pub fn attribute_ns<V, G, S>(
        self,
        name: impl Into<String>,
        uri: impl Into<String>,
        get: G,
        set: S,
    ) -> Self
    where
        V: XmlText + 'static,
        G: Fn(&T) -> Option<V> + Send + Sync + 'static,
        S: Fn(&mut T, V) + Send + Sync + 'static,
    {
        self.attribute_impl(name.into(), Some(uri.into()), get, set)
    }

    fn attribute_impl<V, G, S>(mut self, name: String, uri: Option<String>, get: G, set: S) -> Self
    where
        V: XmlText + 'static,
        G: Fn(&T) -> Option<V> + Send + Sync + 'static,
        S: Fn(&mut T, V) + Send + Sync + 'static,
    {
        self.schema.attributes.push(AttributeField {
            name,
            uri,
            get: Box::new(move |t| get(t).map(|v| v.to_xml_text())),
            set: Box::new(move |t, raw| {
                let v = V::from_xml_text(raw)?;
                set(t, v);
                Ok(())
            }),
        });
        self
    }

    /// Binds the element's own text content.
    #[must_use]
    pub fn text<V, G, S>(mut self, get: G, set: S) -> Self
    where
        V: XmlText + 'static,
        G: Fn(&T) -> Option<V> + Send + Sync + 'static,
        S: Fn(&mut T, V) + Send + Sync + 'static,
    {
        self.schema.text = Some(TextBinding {
            get: Box::new(move |t| get(t).map(|v| v.to_xml_text())),
            set: Box::new(move |t, raw| {
                let v = V::from_xml_text(raw)?;
                set(t, v);
                Ok(())
            }),
        });
        self
    }

    /// Binds a child element whose entire content is scalar text, like
    /// `<title>hello</title>`.
    #[must_use]
    pub fn child_text<V, G, S>(self, name: impl Into<String>, get: G, set: S) -> Self
    where
        V: XmlText + 'static,
        G: Fn(&T) -> Option<V> + Send + Sync + 'static,
        S: Fn(&mut T, V) + Send + Sync + 'static,
    {
        self.child_text_impl(name.into(), None, get, set)
    }

    /// Binds a scalar text child that must resolve to a namespace uri.
    #[must_use]
    pub fn child_text_ns<V, G, S>(
        self,
        name: impl Into<String>,
        uri: impl Into<String>,
        get: G,
        set: S,
    ) -> Self
    where
        V: XmlText + 'static,
        G: Fn(&T) -> Option<V> + Send + Sync + 'static,
        S: Fn(&mut T, V) + Send + Sync + 'static,
    {
        self.child_text_impl(name.into(), Some(uri.into()), get, set)
    }

    fn child_text_impl<V, G, S>(mut self, name: String, uri: Option<String>, get: G, set: S) -> Self
    where
        V: XmlText + 'static,
        G: Fn(&T) -> Option<V> + Send + Sync + 'static,
        S: Fn(&mut T, V) + Send + Sync + 'static,
    {
        self.schema.children.push(ChildField {
            name: name.clone(),
            uri,
            node: Box::new(TextChild {
                field: name,
                get: Box::new(get),
                set: Box::new(set),
            }),
        });
        self
    }

    /// Binds a single nested element described by its own schema.
    #[must_use]
    pub fn child<C, G, S>(
        mut self,
        name: impl Into<String>,
        schema: &Arc<ElementSchema<C>>,
        get: G,
        set: S,
    ) -> Self
    where
        C: Default + 'static,
        G: for<'a> Fn(&'a T) -> Option<&'a C> + Send + Sync + 'static,
        S: Fn(&mut T, C) + Send + Sync + 'static,
    {
        self.schema.children.push(ChildField {
            name: name.into(),
            uri: None,
            node: Box::new(NestedChild {
                schema: Arc::clone(schema),
                get: Box::new(get),
                set: Box::new(set),
            }),
        });
        self
    }

    /// Binds a repeated nested element collected into a slice-backed field.
    #[must_use]
    pub fn children<C, I, P>(
        mut self,
        name: impl Into<String>,
        schema: &Arc<ElementSchema<C>>,
        iter: I,
        push: P,
    ) -> Self
    where
        C: Default + 'static,
        I: for<'a> Fn(&'a T) -> &'a [C] + Send + Sync + 'static,
        P: Fn(&mut T, C) + Send + Sync + 'static,
    {
        self.schema.children.push(ChildField {
            name: name.into(),
            uri: None,
            node: Box::new(VecChild {
                schema: Arc::clone(schema),
                iter: Box::new(iter),
                push: Box::new(push),
            }),
        });
        self
    }

    /// Finishes the schema, ready for process-wide sharing.
    #[must_use]
    pub fn build(self) -> Arc<ElementSchema<T>> {
        Arc::new(self.schema)
    }
}

struct TextChild<T, V: XmlText> {
    field: String,
    get: Box<dyn Fn(&T) -> Option<V> + Send + Sync>,
    set: Box<dyn Fn(&mut T, V) + Send + Sync>,
}

impl<T, V: XmlText> ChildNode<T> for TextChild<T, V> {
    fn read(&self, target: &mut T, reader: &mut dyn TokenRead) -> Result<()> {
        let text = reader.next_text()?;
        let value = V::from_xml_text(&text).map_err(|message| {
            Error::new(
                ErrorKind::Convert {
                    field: self.field.clone(),
                    message,
                },
                reader.current_path(),
            )
        })?;
        (self.set)(target, value);
        reader.end_tag()
    }

    fn write(&self, source: &T, name: &str, writer: &mut dyn TokenWrite) -> Result<()> {
        if let Some(value) = (self.get)(source) {
            writer.begin_tag(name)?;
            writer.text(&value.to_xml_text())?;
            writer.end_tag()?;
        }
        Ok(())
    }
}

struct NestedChild<T, C> {
    schema: Arc<ElementSchema<C>>,
    get: Box<dyn for<'a> Fn(&'a T) -> Option<&'a C> + Send + Sync>,
    set: Box<dyn Fn(&mut T, C) + Send + Sync>,
}

impl<T: 'static, C: Default + 'static> ChildNode<T> for NestedChild<T, C> {
    fn read(&self, target: &mut T, reader: &mut dyn TokenRead) -> Result<()> {
        let mut child = C::default();
        self.schema.read_content(&mut child, reader)?;
        (self.set)(target, child);
        Ok(())
    }

    fn write(&self, source: &T, name: &str, writer: &mut dyn TokenWrite) -> Result<()> {
        if let Some(child) = (self.get)(source) {
            writer.begin_tag(name)?;
            self.schema.write_content(child, writer)?;
        }
        Ok(())
    }
}

struct VecChild<T, C> {
    schema: Arc<ElementSchema<C>>,
    iter: Box<dyn for<'a> Fn(&'a T) -> &'a [C] + Send + Sync>,
    push: Box<dyn Fn(&mut T, C) + Send + Sync>,
}

impl<T: 'static, C: Default + 'static> ChildNode<T> for VecChild<T, C> {
    fn read(&self, target: &mut T, reader: &mut dyn TokenRead) -> Result<()> {
        let mut child = C::default();
        self.schema.read_content(&mut child, reader)?;
        (self.push)(target, child);
        Ok(())
    }

    fn write(&self, source: &T, name: &str, writer: &mut dyn TokenWrite) -> Result<()> {
        for child in (self.iter)(source) {
            writer.begin_tag(name)?;
            self.schema.write_content(child, writer)?;
        }
        Ok(())
    }
}
