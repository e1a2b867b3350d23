//! Scalar text codec used by schema fields.

/// Conversion between a field value and its XML text form.
///
/// Implemented for the standard scalar types; implement it for your own
/// newtypes to bind them directly.
pub trait XmlText: Sized {
    /// Parses the decoded XML text. The error message ends up in
    /// [`ErrorKind::Convert`](crate::ErrorKind::Convert).
    fn from_xml_text(text: &str) -> Result<Self, String>;

    /// Renders the value as XML text (escaping happens later, in the
    /// writer).
    fn to_xml_text(&self) -> String;
}

impl XmlText for String {
    fn from_xml_text(text: &str) -> Result<Self, String> {
        Ok(text.to_string())
    }

    fn to_xml_text(&self) -> String {
        self.clone()
    }
}

impl XmlText for bool {
    fn from_xml_text(text: &str) -> Result<Self, String> {
        match text.trim() {
            "true" | "1" => Ok(true),
            "false" | "0" => Ok(false),
            other => Err(format!("expected a boolean, got '{other}'")),
        }
    }

    fn to_xml_text(&self) -> String {
        self.to_string()
    }
}

impl XmlText for char {
    fn from_xml_text(text: &str) -> Result<Self, String> {
        let mut chars = text.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(c),
            _ => Err(format!("expected a single character, got '{text}'")),
        }
    }

    fn to_xml_text(&self) -> String {
        self.to_string()
    }
}

macro_rules! impl_xml_text_for_numbers {
    ($($ty:ty),* $(,)?) => {
        $(
            impl XmlText for $ty {
                fn from_xml_text(text: &str) -> Result<Self, String> {
                    text.trim()
                        .parse()
                        .map_err(|e| format!("expected {}: {e}", stringify!($ty)))
                }

                fn to_xml_text(&self) -> String {
                    self.to_string()
                }
            }
        )*
    };
}

impl_xml_text_for_numbers!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_parse_with_surrounding_whitespace() {
        assert_eq!(u32::from_xml_text(" 42 ").unwrap(), 42);
        assert_eq!(f64::from_xml_text("2.5").unwrap(), 2.5);
        assert!(i8::from_xml_text("1000").is_err());
    }

    #[test]
    fn booleans_accept_numeric_forms() {
        assert!(bool::from_xml_text("true").unwrap());
        assert!(bool::from_xml_text("1").unwrap());
        assert!(!bool::from_xml_text("0").unwrap());
        assert!(bool::from_xml_text("yes").is_err());
    }

    #[test]
    fn strings_round_trip_untrimmed() {
        assert_eq!(String::from_xml_text(" padded ").unwrap(), " padded ");
    }

    #[test]
    fn chars_require_exactly_one() {
        assert_eq!(char::from_xml_text("x").unwrap(), 'x');
        assert!(char::from_xml_text("xy").is_err());
        assert!(char::from_xml_text("").is_err());
    }
}
