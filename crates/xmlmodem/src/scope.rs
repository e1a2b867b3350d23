//! Lexical scopes of a document, one stack entry per nesting depth.

use core::fmt;

/// Where in a document a reader or writer currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XmlScope {
    /// No root element has been started.
    EmptyDocument,
    /// The document has (or had) a root element.
    NonEmptyDocument,
    /// Inside an opening tag, `<element` — attributes may still follow.
    ElementOpening,
    /// An attribute name has been emitted and its value is pending.
    ElementAttribute,
    /// Between an element's opening and closing tags.
    ElementContent,
    /// Closed; no further access is possible.
    Closed,
}

impl fmt::Display for XmlScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            XmlScope::EmptyDocument => "EMPTY_DOCUMENT",
            XmlScope::NonEmptyDocument => "NONEMPTY_DOCUMENT",
            XmlScope::ElementOpening => "ELEMENT_OPENING",
            XmlScope::ElementAttribute => "ELEMENT_ATTRIBUTE",
            XmlScope::ElementContent => "ELEMENT_CONTENT",
            XmlScope::Closed => "CLOSED",
        };
        f.write_str(name)
    }
}

/// Renders a diagnostic path from a scope stack and its per-depth names.
///
/// Element depths render as `/name`, a pending attribute as `[@name]`, and a
/// final content scope as `/name/text()`.
pub(crate) fn render_path(stack: &[XmlScope], names: &[Option<String>]) -> String {
    let mut out = String::new();
    for (i, scope) in stack.iter().enumerate() {
        let name = names.get(i).and_then(Option::as_deref);
        match scope {
            XmlScope::ElementOpening => {
                out.push('/');
                if let Some(name) = name {
                    out.push_str(name);
                }
            }
            XmlScope::ElementContent => {
                out.push('/');
                if let Some(name) = name {
                    out.push_str(name);
                    if i == stack.len() - 1 {
                        out.push_str("/text()");
                    }
                }
            }
            XmlScope::ElementAttribute => {
                if let Some(name) = name {
                    out.push_str("[@");
                    out.push_str(name);
                    out.push(']');
                }
            }
            XmlScope::EmptyDocument | XmlScope::NonEmptyDocument | XmlScope::Closed => {}
        }
    }
    if out.is_empty() { "/".to_string() } else { out }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_stack_renders_root() {
        assert_eq!(render_path(&[XmlScope::EmptyDocument], &[None]), "/");
    }

    #[test]
    fn nested_elements_render_slash_joined() {
        let stack = [
            XmlScope::NonEmptyDocument,
            XmlScope::ElementContent,
            XmlScope::ElementOpening,
        ];
        let names = [None, Some("feed".to_string()), Some("entry".to_string())];
        assert_eq!(render_path(&stack, &names), "/feed/entry");
    }

    #[test]
    fn pending_attribute_renders_at_notation() {
        let stack = [
            XmlScope::NonEmptyDocument,
            XmlScope::ElementOpening,
            XmlScope::ElementAttribute,
        ];
        let names = [None, Some("entry".to_string()), Some("id".to_string())];
        assert_eq!(render_path(&stack, &names), "/entry[@id]");
    }

    #[test]
    fn trailing_content_scope_renders_text() {
        let stack = [XmlScope::NonEmptyDocument, XmlScope::ElementContent];
        let names = [None, Some("title".to_string())];
        assert_eq!(render_path(&stack, &names), "/title/text()");
    }
}
