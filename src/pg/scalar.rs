//! Codecs for the fixed-size and textual built-in types.
//!
//! Binary formats follow the server's `send`/`recv` functions: integers and
//! floats are big-endian, text is raw UTF-8, `jsonb` carries a version byte.

use uuid::Uuid;

use super::codec::Codec;
use super::quote::quote_literal;
use super::types::{TypeTag, Value};
use crate::error::{CodecError, Result};

/// Which built-in scalar a [`ScalarCodec`] speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    Bool,
    Char,
    Int2,
    Int4,
    Int8,
    Oid,
    Float4,
    Float8,
    Text,
    Bytea,
    Uuid,
    Json,
    Jsonb,
}

/// Codec for one scalar type.
#[derive(Debug, Clone)]
pub struct ScalarCodec {
    tag: TypeTag,
    kind: ScalarKind,
}

impl ScalarCodec {
    pub fn new(tag: TypeTag, kind: ScalarKind) -> Self {
        Self { tag, kind }
    }

    pub fn kind(&self) -> ScalarKind {
        self.kind
    }

    /// All built-in scalar codecs handled by this module.
    pub fn builtins() -> Vec<ScalarCodec> {
        [
            (TypeTag::BOOL, ScalarKind::Bool),
            (TypeTag::CHAR, ScalarKind::Char),
            (TypeTag::INT2, ScalarKind::Int2),
            (TypeTag::INT4, ScalarKind::Int4),
            (TypeTag::INT8, ScalarKind::Int8),
            (TypeTag::OID, ScalarKind::Oid),
            (TypeTag::FLOAT4, ScalarKind::Float4),
            (TypeTag::FLOAT8, ScalarKind::Float8),
            (TypeTag::TEXT, ScalarKind::Text),
            (TypeTag::VARCHAR, ScalarKind::Text),
            (TypeTag::BPCHAR, ScalarKind::Text),
            (TypeTag::NAME, ScalarKind::Text),
            (TypeTag::BYTEA, ScalarKind::Bytea),
            (TypeTag::UUID, ScalarKind::Uuid),
            (TypeTag::JSON, ScalarKind::Json),
            (TypeTag::JSONB, ScalarKind::Jsonb),
        ]
        .into_iter()
        .map(|(tag, kind)| ScalarCodec::new(tag, kind))
        .collect()
    }

    fn mismatch(&self, value: &Value) -> CodecError {
        CodecError::unsupported(&self.tag, value.kind())
    }

    fn invalid(&self, raw: impl AsRef<[u8]>, reason: impl Into<String>) -> CodecError {
        CodecError::decode(&self.tag, raw, reason)
    }

    /// Read exactly `N` bytes of binary input.
    fn fixed<const N: usize>(&self, data: &[u8]) -> Result<[u8; N]> {
        <[u8; N]>::try_from(data).map_err(|_| {
            self.invalid(
                data,
                format!("expected {} bytes, got {}", N, data.len()),
            )
        })
    }

    /// Integer values, widened losslessly to the codec's width.
    fn integer(&self, value: &Value) -> Result<i64> {
        let ok = match (self.kind, value) {
            (ScalarKind::Int2, Value::Int2(_)) => true,
            (ScalarKind::Int4, Value::Int2(_) | Value::Int4(_)) => true,
            (ScalarKind::Int8, Value::Int2(_) | Value::Int4(_) | Value::Int8(_)) => true,
            (ScalarKind::Oid, Value::Oid(_)) => true,
            _ => false,
        };
        match value.as_i64() {
            Some(v) if ok => Ok(v),
            _ => Err(self.mismatch(value)),
        }
    }

    fn float(&self, value: &Value) -> Result<f64> {
        match (self.kind, value) {
            (ScalarKind::Float4, Value::Float4(v)) => Ok(*v as f64),
            (ScalarKind::Float8, Value::Float4(v)) => Ok(*v as f64),
            (ScalarKind::Float8, Value::Float8(v)) => Ok(*v),
            _ => Err(self.mismatch(value)),
        }
    }

    fn parse_text<T: std::str::FromStr>(&self, text: &str) -> Result<T>
    where
        T::Err: std::fmt::Display,
    {
        text.parse::<T>()
            .map_err(|e| self.invalid(text, e.to_string()))
    }
}

impl Codec for ScalarCodec {
    fn tag(&self) -> &TypeTag {
        &self.tag
    }

    fn encode_text(&self, value: &Value) -> Result<String> {
        match self.kind {
            ScalarKind::Bool => match value {
                Value::Bool(b) => Ok(if *b { "t" } else { "f" }.to_string()),
                _ => Err(self.mismatch(value)),
            },
            ScalarKind::Char => match value {
                Value::Char(c) => Ok(encode_char(*c)),
                _ => Err(self.mismatch(value)),
            },
            ScalarKind::Int2 | ScalarKind::Int4 | ScalarKind::Int8 | ScalarKind::Oid => {
                Ok(self.integer(value)?.to_string())
            }
            ScalarKind::Float4 => match value {
                Value::Float4(v) => Ok(format_float(*v)),
                _ => Err(self.mismatch(value)),
            },
            ScalarKind::Float8 => Ok(format_float(self.float(value)?)),
            ScalarKind::Text => match value {
                Value::Text(s) => Ok(s.clone()),
                _ => Err(self.mismatch(value)),
            },
            ScalarKind::Bytea => match value {
                Value::Bytea(b) => Ok(encode_bytea(b)),
                _ => Err(self.mismatch(value)),
            },
            ScalarKind::Uuid => match value {
                Value::Uuid(u) => Ok(u.hyphenated().to_string()),
                _ => Err(self.mismatch(value)),
            },
            ScalarKind::Json | ScalarKind::Jsonb => match value {
                Value::Json(j) => Ok(j.to_string()),
                _ => Err(self.mismatch(value)),
            },
        }
    }

    fn decode_text(&self, text: &str) -> Result<Value> {
        match self.kind {
            // Only the first character matters: the server sends `t`/`f`
            ScalarKind::Bool => match text.as_bytes().first() {
                Some(b't') => Ok(Value::Bool(true)),
                Some(b'f') => Ok(Value::Bool(false)),
                _ => Err(self.invalid(text, "expected 't' or 'f'")),
            },
            ScalarKind::Char => decode_char(text)
                .map(Value::Char)
                .ok_or_else(|| self.invalid(text, "expected a single byte")),
            ScalarKind::Int2 => self.parse_text(text).map(Value::Int2),
            ScalarKind::Int4 => self.parse_text(text).map(Value::Int4),
            ScalarKind::Int8 => self.parse_text(text).map(Value::Int8),
            ScalarKind::Oid => self.parse_text(text).map(Value::Oid),
            ScalarKind::Float4 => parse_float(text)
                .map(Value::Float4)
                .ok_or_else(|| self.invalid(text, "invalid floating point value")),
            ScalarKind::Float8 => parse_float(text)
                .map(Value::Float8)
                .ok_or_else(|| self.invalid(text, "invalid floating point value")),
            ScalarKind::Text => Ok(Value::Text(text.to_string())),
            ScalarKind::Bytea => decode_bytea(text)
                .map(Value::Bytea)
                .map_err(|reason| self.invalid(text, reason)),
            ScalarKind::Uuid => Uuid::parse_str(text)
                .map(Value::Uuid)
                .map_err(|e| self.invalid(text, e.to_string())),
            ScalarKind::Json | ScalarKind::Jsonb => serde_json::from_str(text)
                .map(Value::Json)
                .map_err(|e| self.invalid(text, e.to_string())),
        }
    }

    fn supports_binary(&self) -> bool {
        true
    }

    fn encode_binary(&self, value: &Value) -> Result<Vec<u8>> {
        match self.kind {
            ScalarKind::Bool => match value {
                Value::Bool(v) => Ok(vec![if *v { 1 } else { 0 }]),
                _ => Err(self.mismatch(value)),
            },
            ScalarKind::Char => match value {
                Value::Char(c) => Ok(vec![*c]),
                _ => Err(self.mismatch(value)),
            },
            // Widening already checked, so the narrowing casts are lossless
            ScalarKind::Int2 => Ok((self.integer(value)? as i16).to_be_bytes().to_vec()),
            ScalarKind::Int4 => Ok((self.integer(value)? as i32).to_be_bytes().to_vec()),
            ScalarKind::Int8 => Ok(self.integer(value)?.to_be_bytes().to_vec()),
            ScalarKind::Oid => Ok((self.integer(value)? as u32).to_be_bytes().to_vec()),
            ScalarKind::Float4 => match value {
                Value::Float4(v) => Ok(v.to_be_bytes().to_vec()),
                _ => Err(self.mismatch(value)),
            },
            ScalarKind::Float8 => Ok(self.float(value)?.to_be_bytes().to_vec()),
            ScalarKind::Text => match value {
                Value::Text(s) => Ok(s.as_bytes().to_vec()),
                _ => Err(self.mismatch(value)),
            },
            ScalarKind::Bytea => match value {
                Value::Bytea(b) => Ok(b.clone()),
                _ => Err(self.mismatch(value)),
            },
            ScalarKind::Uuid => match value {
                Value::Uuid(u) => Ok(u.as_bytes().to_vec()),
                _ => Err(self.mismatch(value)),
            },
            ScalarKind::Json => match value {
                Value::Json(j) => Ok(j.to_string().into_bytes()),
                _ => Err(self.mismatch(value)),
            },
            ScalarKind::Jsonb => match value {
                Value::Json(j) => {
                    let text = j.to_string();
                    let mut buf = Vec::with_capacity(1 + text.len());
                    buf.push(JSONB_VERSION);
                    buf.extend_from_slice(text.as_bytes());
                    Ok(buf)
                }
                _ => Err(self.mismatch(value)),
            },
        }
    }

    fn decode_binary(&self, data: &[u8]) -> Result<Value> {
        match self.kind {
            ScalarKind::Bool => {
                let [b] = self.fixed::<1>(data)?;
                Ok(Value::Bool(b != 0))
            }
            ScalarKind::Char => Ok(Value::Char(self.fixed::<1>(data)?[0])),
            ScalarKind::Int2 => Ok(Value::Int2(i16::from_be_bytes(self.fixed(data)?))),
            ScalarKind::Int4 => Ok(Value::Int4(i32::from_be_bytes(self.fixed(data)?))),
            ScalarKind::Int8 => Ok(Value::Int8(i64::from_be_bytes(self.fixed(data)?))),
            ScalarKind::Oid => Ok(Value::Oid(u32::from_be_bytes(self.fixed(data)?))),
            ScalarKind::Float4 => Ok(Value::Float4(f32::from_be_bytes(self.fixed(data)?))),
            ScalarKind::Float8 => Ok(Value::Float8(f64::from_be_bytes(self.fixed(data)?))),
            ScalarKind::Text => std::str::from_utf8(data)
                .map(|s| Value::Text(s.to_string()))
                .map_err(|e| self.invalid(data, format!("invalid UTF-8: {}", e))),
            ScalarKind::Bytea => Ok(Value::Bytea(data.to_vec())),
            ScalarKind::Uuid => Ok(Value::Uuid(Uuid::from_bytes(self.fixed(data)?))),
            ScalarKind::Json => serde_json::from_slice(data)
                .map(Value::Json)
                .map_err(|e| self.invalid(data, e.to_string())),
            ScalarKind::Jsonb => match data.split_first() {
                Some((&JSONB_VERSION, body)) => serde_json::from_slice(body)
                    .map(Value::Json)
                    .map_err(|e| self.invalid(data, e.to_string())),
                _ => Err(self.invalid(data, "unsupported jsonb version")),
            },
        }
    }

    fn to_literal(&self, value: &Value) -> Result<String> {
        match self.kind {
            ScalarKind::Bool => match value {
                Value::Bool(b) => Ok(if *b { "true" } else { "false" }.to_string()),
                _ => Err(self.mismatch(value)),
            },
            ScalarKind::Int2 | ScalarKind::Int4 | ScalarKind::Int8 | ScalarKind::Oid => {
                Ok(bare_number(self.integer(value)?.to_string()))
            }
            ScalarKind::Float4 | ScalarKind::Float8 => {
                let text = self.encode_text(value)?;
                if text.parse::<f64>().map(f64::is_finite).unwrap_or(false) {
                    Ok(bare_number(text))
                } else {
                    Ok(quote_literal(&text))
                }
            }
            _ => Ok(quote_literal(&self.encode_text(value)?)),
        }
    }
}

const JSONB_VERSION: u8 = 1;

/// Numbers are safe bare, but a leading minus is parenthesized so a literal
/// placed after `-` can never start a `--` comment.
pub(crate) fn bare_number(text: String) -> String {
    if text.starts_with('-') {
        format!("({})", text)
    } else {
        text
    }
}

/// Shortest round-trip decimal, with the server's spelling of the
/// non-finite values.
fn format_float<F>(v: F) -> String
where
    F: num_traits::Float + std::fmt::Display,
{
    if v.is_nan() {
        "NaN".to_string()
    } else if v.is_infinite() {
        let text = if v.is_sign_negative() { "-Infinity" } else { "Infinity" };
        text.to_string()
    } else {
        v.to_string()
    }
}

fn parse_float<F>(text: &str) -> Option<F>
where
    F: num_traits::Float + std::str::FromStr,
{
    match text {
        "NaN" => Some(F::nan()),
        "Infinity" => Some(F::infinity()),
        "-Infinity" => Some(F::neg_infinity()),
        _ => {
            // Rust also accepts "inf"/"nan" spellings the server never sends
            if text.bytes().any(|b| b.is_ascii_alphabetic() && b != b'e' && b != b'E') {
                return None;
            }
            text.parse().ok()
        }
    }
}

/// `"char"` output: the byte itself, empty for NUL, octal for non-ASCII.
fn encode_char(c: u8) -> String {
    match c {
        0 => String::new(),
        1..=0x7f => (c as char).to_string(),
        _ => format!("\\{:03o}", c),
    }
}

fn decode_char(text: &str) -> Option<u8> {
    let bytes = text.as_bytes();
    match bytes {
        [] => Some(0),
        [b] if b.is_ascii() => Some(*b),
        [b'\\', d @ ..] if d.len() == 3 => {
            let octal = std::str::from_utf8(d).ok()?;
            u8::from_str_radix(octal, 8).ok()
        }
        _ => None,
    }
}

/// `bytea` hex output: `\x` followed by two lowercase hex digits per byte.
pub fn encode_bytea(data: &[u8]) -> String {
    let mut out = String::with_capacity(2 + data.len() * 2);
    out.push_str("\\x");
    out.push_str(&hex::encode(data));
    out
}

pub fn decode_bytea(text: &str) -> std::result::Result<Vec<u8>, String> {
    let digits = text
        .strip_prefix("\\x")
        .ok_or_else(|| "missing \\x prefix".to_string())?;
    hex::decode(digits).map_err(|e| e.to_string())
}
