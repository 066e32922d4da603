//! One-dimensional array codec built over an element codec.
//!
//! Text format: `{a,b,NULL,"quoted, element"}`. Multi-dimensional arrays are
//! arrays whose element codec is itself an array codec; inner arrays are
//! emitted as quoted elements.

use std::sync::Arc;

use super::codec::Codec;
use super::quote::{parse_delimited, quote_delimited};
use super::types::{TypeTag, Value};
use crate::error::{CodecError, Result};

/// Codec for an array type.
#[derive(Debug, Clone)]
pub struct ArrayCodec {
    tag: TypeTag,
    element: Arc<dyn Codec>,
    delimiter: char,
    unsafe_chars: String,
}

/// Build the codec for array type `tag` whose elements use `element`.
pub fn array_codec_of(tag: TypeTag, element: Arc<dyn Codec>, delimiter: char) -> ArrayCodec {
    ArrayCodec::new(tag, element, delimiter)
}

impl ArrayCodec {
    pub fn new(tag: TypeTag, element: Arc<dyn Codec>, delimiter: char) -> Self {
        Self {
            tag,
            element,
            delimiter,
            unsafe_chars: format!("{{}}\"\\{}", delimiter),
        }
    }

    pub fn element(&self) -> &Arc<dyn Codec> {
        &self.element
    }

    pub fn delimiter(&self) -> char {
        self.delimiter
    }

    fn invalid(&self, text: &str, reason: impl Into<String>) -> CodecError {
        CodecError::decode(&self.tag, text, reason)
    }

    /// Parse elements after the opening brace, returning them and the input
    /// that follows the closing brace.
    fn parse_items<'a>(&self, text: &str, mut rest: &'a str) -> Result<(Vec<Option<Value>>, &'a str)> {
        let mut items = Vec::new();
        rest = rest.trim_start();
        if let Some(after) = rest.strip_prefix('}') {
            return Ok((items, after));
        }

        loop {
            rest = rest.trim_start();
            if rest.starts_with('{') {
                // Unquoted sub-array, handed whole to the element codec
                let end = balanced_end(rest)
                    .ok_or_else(|| self.invalid(text, "unterminated sub-array"))?;
                items.push(Some(self.element.decode_text(&rest[..end])?));
                rest = &rest[end..];
            } else {
                let (token, after) = parse_delimited(&self.unsafe_chars, rest)
                    .map_err(|reason| self.invalid(text, reason))?;
                if token.quoted {
                    items.push(Some(self.element.decode_text(&token.text)?));
                } else {
                    let bare = token.text.trim();
                    if bare.is_empty() {
                        return Err(self.invalid(text, "empty array element"));
                    }
                    if bare.eq_ignore_ascii_case("null") {
                        items.push(None);
                    } else {
                        items.push(Some(self.element.decode_text(bare)?));
                    }
                }
                rest = after;
            }

            rest = rest.trim_start();
            match rest.chars().next() {
                Some('}') => return Ok((items, &rest[1..])),
                Some(c) if c == self.delimiter => rest = &rest[c.len_utf8()..],
                Some(c) => {
                    return Err(self.invalid(text, format!("unexpected '{}' in array", c)))
                }
                None => return Err(self.invalid(text, "missing '}'")),
            }
        }
    }
}

/// Index just past the brace that closes the `{` at the start of `text`.
fn balanced_end(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_quotes = false;
    let mut escaped = false;
    for (i, c) in text.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '"' => in_quotes = !in_quotes,
            '{' if !in_quotes => depth += 1,
            '}' if !in_quotes => {
                depth -= 1;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }
    None
}

/// Skip an explicit `[lo:hi]=` dimension decoration.
fn strip_dimensions(text: &str) -> Option<&str> {
    if text.starts_with('[') {
        let eq = text.find('=')?;
        Some(&text[eq + 1..])
    } else {
        Some(text)
    }
}

impl Codec for ArrayCodec {
    fn tag(&self) -> &TypeTag {
        &self.tag
    }

    fn encode_text(&self, value: &Value) -> Result<String> {
        let items = match value {
            Value::Array(items) => items,
            other => return Err(CodecError::unsupported(&self.tag, other.kind())),
        };

        let mut out = String::from("{");
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                out.push(self.delimiter);
            }
            match item {
                None => out.push_str("NULL"),
                Some(v) => {
                    let text = self.element.encode_text(v)?;
                    out.push_str(&quote_delimited(&self.unsafe_chars, &text));
                }
            }
        }
        out.push('}');
        Ok(out)
    }

    fn decode_text(&self, text: &str) -> Result<Value> {
        let body = strip_dimensions(text.trim())
            .ok_or_else(|| self.invalid(text, "malformed dimension decoration"))?;
        let inner = body
            .strip_prefix('{')
            .ok_or_else(|| self.invalid(text, "array must start with '{'"))?;

        let (items, rest) = self.parse_items(text, inner)?;
        if !rest.trim().is_empty() {
            return Err(self.invalid(text, "junk after closing '}'"));
        }
        Ok(Value::Array(items))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pg::scalar::{ScalarCodec, ScalarKind};
    use pretty_assertions::assert_eq;

    fn int_array() -> ArrayCodec {
        array_codec_of(
            TypeTag::new("_int4"),
            Arc::new(ScalarCodec::new(TypeTag::INT4, ScalarKind::Int4)),
            ',',
        )
    }

    fn text_array() -> ArrayCodec {
        array_codec_of(
            TypeTag::new("_text"),
            Arc::new(ScalarCodec::new(TypeTag::TEXT, ScalarKind::Text)),
            ',',
        )
    }

    fn texts(items: &[Option<&str>]) -> Value {
        Value::Array(items.iter().map(|i| i.map(Value::from)).collect())
    }

    #[test]
    fn test_encode_ints_with_null() {
        let v = Value::Array(vec![Some(Value::Int4(1)), None, Some(Value::Int4(-3))]);
        assert_eq!(int_array().encode_text(&v).unwrap(), "{1,NULL,-3}");
    }

    #[test]
    fn test_empty_array() {
        let codec = int_array();
        assert_eq!(codec.encode_text(&Value::Array(vec![])).unwrap(), "{}");
        assert_eq!(codec.decode_text("{}").unwrap(), Value::Array(vec![]));
        assert_eq!(codec.decode_text("{ }").unwrap(), Value::Array(vec![]));
    }

    #[test]
    fn test_quoting_keeps_null_strings_apart() {
        let codec = text_array();
        let v = texts(&[Some("NULL"), None, Some(""), Some("a,b"), Some("say \"hi\"")]);
        let text = codec.encode_text(&v).unwrap();
        assert_eq!(text, r#"{"NULL",NULL,"","a,b","say \"hi\""}"#);
        assert_eq!(codec.decode_text(&text).unwrap(), v);
    }

    #[test]
    fn test_decode_whitespace_and_case() {
        let v = int_array().decode_text("{ 1 , null ,3 }").unwrap();
        assert_eq!(
            v,
            Value::Array(vec![Some(Value::Int4(1)), None, Some(Value::Int4(3))])
        );
    }

    #[test]
    fn test_decode_dimension_prefix() {
        let v = int_array().decode_text("[0:1]={7,8}").unwrap();
        assert_eq!(v, Value::array([7i32, 8]));
    }

    #[test]
    fn test_malformed() {
        let codec = int_array();
        for bad in ["{1,2", "1,2}", "{1,,2}", "{1,2}x", "{1;2}", "{\"1}", "{a}"] {
            assert!(codec.decode_text(bad).unwrap_err().is_decode(), "{}", bad);
        }
    }

    #[test]
    fn test_nested_arrays() {
        let inner: Arc<dyn Codec> = Arc::new(int_array());
        let outer = array_codec_of(TypeTag::new("_int4"), inner, ',');
        let v = Value::Array(vec![
            Some(Value::array([1i32, 2])),
            Some(Value::Array(vec![])),
            None,
        ]);
        let text = outer.encode_text(&v).unwrap();
        assert_eq!(text, "{\"{1,2}\",\"{}\",NULL}");
        assert_eq!(outer.decode_text(&text).unwrap(), v);

        // Server-style unquoted sub-arrays decode too
        let native = outer.decode_text("{{1,2},{3,4}}").unwrap();
        assert_eq!(
            native,
            Value::Array(vec![
                Some(Value::array([1i32, 2])),
                Some(Value::array([3i32, 4])),
            ])
        );
    }

    #[test]
    fn test_custom_delimiter() {
        let codec = array_codec_of(
            TypeTag::new("_label"),
            Arc::new(ScalarCodec::new(TypeTag::TEXT, ScalarKind::Text)),
            ';',
        );
        let v = texts(&[Some("a,b"), Some("c;d")]);
        let text = codec.encode_text(&v).unwrap();
        assert_eq!(text, "{a,b;\"c;d\"}");
        assert_eq!(codec.decode_text(&text).unwrap(), v);
    }

    #[test]
    fn test_element_kind_mismatch() {
        let v = Value::Array(vec![Some(Value::Text("x".into()))]);
        assert!(matches!(
            int_array().encode_text(&v),
            Err(CodecError::UnsupportedType { .. })
        ));
        assert!(int_array().encode_text(&Value::Int4(1)).is_err());
    }
}
