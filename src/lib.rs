//! pgcodec - PostgreSQL value encoding, decoding and literal rendering.
//!
//! The crate-level functions use a shared registry of the built-in codecs.
//! Build a [`CodecRegistry`] directly for custom settings or custom types.
//!
//! ```
//! use pgcodec::{TypeTag, Value, WireValue};
//!
//! let wire = pgcodec::encode(&TypeTag::INT4, &Value::Int4(42), false).unwrap();
//! assert_eq!(wire, WireValue::text("42"));
//! assert_eq!(pgcodec::decode(&TypeTag::INT4, &wire).unwrap(), Value::Int4(42));
//! ```

pub mod config;
pub mod error;
pub mod pg;

use bytes::Bytes;

pub use config::CodecConfig;
pub use error::{CodecError, Result};
pub use pg::{
    Bound, Codec, CodecRegistry, Evaluated, Evaluator, Format, Range, TypeTag, Value, WireValue,
};

/// Encode a non-null value with the codec for `tag`.
pub fn encode(tag: &TypeTag, value: &Value, prefer_binary: bool) -> Result<WireValue> {
    pg::default_registry().encode(tag, value, prefer_binary)
}

/// Encode a value that may be NULL.
pub fn encode_nullable(
    tag: &TypeTag,
    value: Option<&Value>,
    prefer_binary: bool,
) -> Result<WireValue> {
    pg::default_registry().encode_nullable(tag, value, prefer_binary)
}

/// Decode a wire value that must not be NULL.
pub fn decode(tag: &TypeTag, wire: &WireValue) -> Result<Value> {
    pg::default_registry().decode(tag, wire)
}

/// Decode a wire value, mapping NULL to `None`.
pub fn decode_nullable(tag: &TypeTag, wire: &WireValue) -> Result<Option<Value>> {
    pg::default_registry().decode_nullable(tag, wire)
}

/// Render an SQL literal; `None` renders `NULL`.
pub fn to_literal(tag: &TypeTag, value: Option<&Value>) -> Result<String> {
    pg::default_registry().to_literal(tag, value)
}

/// Replace each `${expr}` in `template` with a cast literal.
pub fn substitute_literals<E: Evaluator>(template: &str, evaluator: E) -> Result<Bytes> {
    pg::default_registry().substitute_literals(template, evaluator)
}
