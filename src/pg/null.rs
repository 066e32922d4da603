//! Explicit NULL handling around a codec.
//!
//! Plain codecs reject NULL. Wrap one in [`Nullable`] to map NULL to
//! `None`, or in [`NotNull`] to make the rejection part of the type.

use super::codec::{decode_wire, encode_wire, Codec};
use super::types::{TypeTag, Value, WireValue};
use crate::error::Result;

/// A codec whose values may be NULL.
#[derive(Debug, Clone)]
pub struct Nullable<C> {
    inner: C,
}

impl<C: Codec> Nullable<C> {
    pub fn new(inner: C) -> Self {
        Self { inner }
    }

    pub fn tag(&self) -> &TypeTag {
        self.inner.tag()
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    pub fn encode(&self, value: Option<&Value>, prefer_binary: bool) -> Result<WireValue> {
        match value {
            None => Ok(WireValue::Null),
            Some(v) => encode_wire(&self.inner, v, prefer_binary),
        }
    }

    pub fn decode(&self, wire: &WireValue) -> Result<Option<Value>> {
        if wire.is_null() {
            return Ok(None);
        }
        decode_wire(&self.inner, wire).map(Some)
    }

    /// SQL literal, `NULL` for a missing value.
    pub fn to_literal(&self, value: Option<&Value>) -> Result<String> {
        match value {
            None => Ok("NULL".to_string()),
            Some(v) => self.inner.to_literal(v),
        }
    }
}

/// A codec that fails with [`NullNotAllowed`](crate::error::CodecError::NullNotAllowed)
/// on NULL input.
#[derive(Debug, Clone)]
pub struct NotNull<C> {
    inner: C,
}

impl<C: Codec> NotNull<C> {
    pub fn new(inner: C) -> Self {
        Self { inner }
    }

    pub fn tag(&self) -> &TypeTag {
        self.inner.tag()
    }

    pub fn encode(&self, value: &Value, prefer_binary: bool) -> Result<WireValue> {
        encode_wire(&self.inner, value, prefer_binary)
    }

    pub fn decode(&self, wire: &WireValue) -> Result<Value> {
        decode_wire(&self.inner, wire)
    }

    /// Relax into the nullable form.
    pub fn nullable(self) -> Nullable<C> {
        Nullable::new(self.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CodecError;
    use crate::pg::scalar::{ScalarCodec, ScalarKind};

    fn int4() -> ScalarCodec {
        ScalarCodec::new(TypeTag::INT4, ScalarKind::Int4)
    }

    #[test]
    fn test_nullable_roundtrip() {
        let codec = Nullable::new(int4());
        assert_eq!(codec.encode(None, false).unwrap(), WireValue::Null);
        assert_eq!(codec.decode(&WireValue::Null).unwrap(), None);

        let wire = codec.encode(Some(&Value::Int4(5)), false).unwrap();
        assert_eq!(wire, WireValue::text("5"));
        assert_eq!(codec.decode(&wire).unwrap(), Some(Value::Int4(5)));
    }

    #[test]
    fn test_nullable_binary() {
        let codec = Nullable::new(int4());
        let wire = codec.encode(Some(&Value::Int4(5)), true).unwrap();
        assert_eq!(wire, WireValue::binary(5i32.to_be_bytes().to_vec()));
        assert_eq!(codec.decode(&wire).unwrap(), Some(Value::Int4(5)));
    }

    #[test]
    fn test_nullable_literal() {
        let codec = Nullable::new(int4());
        assert_eq!(codec.to_literal(None).unwrap(), "NULL");
        assert_eq!(codec.to_literal(Some(&Value::Int4(-1))).unwrap(), "(-1)");
    }

    #[test]
    fn test_not_null_rejects() {
        let codec = NotNull::new(int4());
        let err = codec.decode(&WireValue::Null).unwrap_err();
        assert_eq!(err, CodecError::null_not_allowed(&TypeTag::INT4));
        assert_eq!(err.to_string(), "NULL in int4 column");
        assert_eq!(codec.nullable().decode(&WireValue::Null).unwrap(), None);
    }

    #[test]
    fn test_malformed_payload_still_fails() {
        let codec = Nullable::new(int4());
        let err = codec.decode(&WireValue::text("x")).unwrap_err();
        assert!(err.is_decode());
    }
}
