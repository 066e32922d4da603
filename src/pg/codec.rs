//! The capability record every codec provides.

use std::fmt;
use std::sync::Arc;

use super::quote::quote_literal;
use super::types::{TypeTag, Value, WireValue};
use crate::error::{CodecError, Result};

/// Encode/decode rules for one wire type.
///
/// Text encoding and decoding are mandatory. Binary support is optional; the
/// default binary methods fail with [`CodecError::BinaryUnsupported`].
pub trait Codec: fmt::Debug + Send + Sync {
    /// The wire type this codec handles.
    fn tag(&self) -> &TypeTag;

    /// Encode a value into its text representation.
    fn encode_text(&self, value: &Value) -> Result<String>;

    /// Decode a text representation.
    fn decode_text(&self, text: &str) -> Result<Value>;

    /// Whether `encode_binary` is implemented. Encoders fall back to text
    /// when it is not.
    fn supports_binary(&self) -> bool {
        false
    }

    fn encode_binary(&self, value: &Value) -> Result<Vec<u8>> {
        let _ = value;
        Err(CodecError::binary_unsupported(self.tag()))
    }

    fn decode_binary(&self, data: &[u8]) -> Result<Value> {
        let _ = data;
        Err(CodecError::binary_unsupported(self.tag()))
    }

    /// Render a value as an SQL literal (without a type cast).
    ///
    /// Defaults to single-quoting the text encoding.
    fn to_literal(&self, value: &Value) -> Result<String> {
        Ok(quote_literal(&self.encode_text(value)?))
    }
}

impl<C: Codec + ?Sized> Codec for Arc<C> {
    fn tag(&self) -> &TypeTag {
        (**self).tag()
    }

    fn encode_text(&self, value: &Value) -> Result<String> {
        (**self).encode_text(value)
    }

    fn decode_text(&self, text: &str) -> Result<Value> {
        (**self).decode_text(text)
    }

    fn supports_binary(&self) -> bool {
        (**self).supports_binary()
    }

    fn encode_binary(&self, value: &Value) -> Result<Vec<u8>> {
        (**self).encode_binary(value)
    }

    fn decode_binary(&self, data: &[u8]) -> Result<Value> {
        (**self).decode_binary(data)
    }

    fn to_literal(&self, value: &Value) -> Result<String> {
        (**self).to_literal(value)
    }
}

impl<C: Codec + ?Sized> Codec for &C {
    fn tag(&self) -> &TypeTag {
        (**self).tag()
    }

    fn encode_text(&self, value: &Value) -> Result<String> {
        (**self).encode_text(value)
    }

    fn decode_text(&self, text: &str) -> Result<Value> {
        (**self).decode_text(text)
    }

    fn supports_binary(&self) -> bool {
        (**self).supports_binary()
    }

    fn encode_binary(&self, value: &Value) -> Result<Vec<u8>> {
        (**self).encode_binary(value)
    }

    fn decode_binary(&self, data: &[u8]) -> Result<Value> {
        (**self).decode_binary(data)
    }

    fn to_literal(&self, value: &Value) -> Result<String> {
        (**self).to_literal(value)
    }
}

/// Encode a non-null value, using binary when asked for and available.
pub fn encode_wire<C: Codec + ?Sized>(
    codec: &C,
    value: &Value,
    prefer_binary: bool,
) -> Result<WireValue> {
    if prefer_binary && codec.supports_binary() {
        Ok(WireValue::binary(codec.encode_binary(value)?))
    } else {
        Ok(WireValue::text(codec.encode_text(value)?))
    }
}

/// Decode a non-null wire value, validating text as UTF-8 first.
pub fn decode_wire<C: Codec + ?Sized>(codec: &C, wire: &WireValue) -> Result<Value> {
    let result = match wire {
        WireValue::Null => Err(CodecError::null_not_allowed(codec.tag())),
        WireValue::Text(bytes) => match std::str::from_utf8(bytes) {
            Ok(text) => codec.decode_text(text),
            Err(e) => Err(CodecError::decode(
                codec.tag(),
                bytes,
                format!("invalid UTF-8: {}", e),
            )),
        },
        WireValue::Binary(bytes) => codec.decode_binary(bytes),
    };

    if let Err(e) = &result {
        if e.is_decode() {
            tracing::debug!(tag = %codec.tag(), error = %e, "failed to decode wire value");
        }
    }
    result
}
