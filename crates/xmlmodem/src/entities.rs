//! Entity decoding and the mirror escapers used by the writer.
//!
//! Only the five predefined entities and decimal/hexadecimal character
//! references are supported; anything else is an error rather than being
//! passed through.

use std::borrow::Cow;

use memchr::memchr3;

use crate::error::SyntaxError;

/// Decodes one entity body (the text between `&` and `;`) into `out`.
pub(crate) fn decode_entity(entity: &str, out: &mut String) -> Result<(), SyntaxError> {
    if let Some(reference) = entity.strip_prefix('#') {
        let code = if let Some(hex) = reference.strip_prefix('x') {
            parse_reference(entity, hex, 16)?
        } else {
            parse_reference(entity, reference, 10)?
        };
        let Some(ch) = char::from_u32(code) else {
            return Err(SyntaxError::InvalidCharacterReference(entity.to_string()));
        };
        out.push(ch);
        return Ok(());
    }
    match entity {
        "quot" => out.push('"'),
        "apos" => out.push('\''),
        "lt" => out.push('<'),
        "gt" => out.push('>'),
        "amp" => out.push('&'),
        _ => return Err(SyntaxError::UnsupportedEntity(entity.to_string())),
    }
    Ok(())
}

fn parse_reference(entity: &str, digits: &str, radix: u32) -> Result<u32, SyntaxError> {
    if digits.is_empty() {
        return Err(SyntaxError::InvalidCharacterReference(entity.to_string()));
    }
    let mut code: u32 = 0;
    for ch in digits.chars() {
        let digit = ch
            .to_digit(radix)
            .ok_or_else(|| SyntaxError::InvalidCharacterReference(entity.to_string()))?;
        code = code
            .checked_mul(radix)
            .and_then(|c| c.checked_add(digit))
            .ok_or_else(|| SyntaxError::InvalidCharacterReference(entity.to_string()))?;
    }
    Ok(code)
}

/// Escapes element text content: `&`, `<`, `>`, and C0 controls other than
/// tab/newline/carriage return. Borrows when nothing needs escaping.
pub(crate) fn escape_text(value: &str) -> Cow<'_, str> {
    if memchr3(b'&', b'<', b'>', value.as_bytes()).is_none()
        && !value.bytes().any(needs_control_escape)
    {
        return Cow::Borrowed(value);
    }
    let mut out = String::with_capacity(value.len() + 8);
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            c if (c as u32) < 0x20 && !matches!(c, '\t' | '\n' | '\r') => {
                push_char_reference(&mut out, c);
            }
            c => out.push(c),
        }
    }
    Cow::Owned(out)
}

/// Escapes a double-quoted attribute value: `&`, `<`, `"`, and all C0
/// controls (whitespace controls included, so values survive a round trip
/// byte-for-byte).
pub(crate) fn escape_attribute(value: &str) -> Cow<'_, str> {
    if memchr3(b'&', b'<', b'"', value.as_bytes()).is_none()
        && !value.bytes().any(|b| b < 0x20)
    {
        return Cow::Borrowed(value);
    }
    let mut out = String::with_capacity(value.len() + 8);
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '"' => out.push_str("&quot;"),
            c if (c as u32) < 0x20 => push_char_reference(&mut out, c),
            c => out.push(c),
        }
    }
    Cow::Owned(out)
}

fn push_char_reference(out: &mut String, ch: char) {
    out.push_str("&#");
    out.push_str(&(ch as u32).to_string());
    out.push(';');
}

fn needs_control_escape(byte: u8) -> bool {
    byte < 0x20 && !matches!(byte, b'\t' | b'\n' | b'\r')
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("amp", "&")]
    #[case("lt", "<")]
    #[case("gt", ">")]
    #[case("quot", "\"")]
    #[case("apos", "'")]
    #[case("#65", "A")]
    #[case("#x41", "A")]
    #[case("#x1F600", "\u{1F600}")]
    #[case("#10", "\n")]
    fn decodes_supported_entities(#[case] entity: &str, #[case] expected: &str) {
        let mut out = String::new();
        decode_entity(entity, &mut out).unwrap();
        assert_eq!(out, expected);
    }

    #[rstest]
    #[case("#xZZ")]
    #[case("#")]
    #[case("#x")]
    #[case("#12a")]
    #[case("#xD800")]
    #[case("#99999999999")]
    fn rejects_malformed_references(#[case] entity: &str) {
        let mut out = String::new();
        assert!(matches!(
            decode_entity(entity, &mut out),
            Err(SyntaxError::InvalidCharacterReference(_))
        ));
    }

    #[test]
    fn rejects_user_defined_entities() {
        let mut out = String::new();
        assert!(matches!(
            decode_entity("nbsp", &mut out),
            Err(SyntaxError::UnsupportedEntity(_))
        ));
    }

    #[test]
    fn text_escape_borrows_clean_input() {
        assert!(matches!(escape_text("plain text"), Cow::Borrowed(_)));
    }

    #[test]
    fn text_escape_covers_markup_bytes() {
        assert_eq!(escape_text("a<b&c>d"), "a&lt;b&amp;c&gt;d");
        assert_eq!(escape_text("\u{1}x"), "&#1;x");
        assert_eq!(escape_text("line1\nline2"), "line1\nline2");
    }

    #[test]
    fn attribute_escape_covers_quotes_and_controls() {
        assert_eq!(escape_attribute(r#"say "hi" & <go>"#), "say &quot;hi&quot; &amp; &lt;go>");
        assert_eq!(escape_attribute("a\tb\n"), "a&#9;b&#10;");
        assert!(matches!(escape_attribute("simple"), Cow::Borrowed(_)));
    }
}
