//! PostgreSQL type tags, wire representations and native values.
//!
//! Reference: https://www.postgresql.org/docs/current/protocol-overview.html#PROTOCOL-FORMAT-CODES

use std::borrow::Cow;
use std::fmt;

use bytes::Bytes;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Utc};
use num_rational::BigRational;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::range::Range;

// ============================================================================
// Type Tags
// ============================================================================

/// Name of a PostgreSQL value type, e.g. `int4`, `_numeric` or `numrange`.
///
/// Two tags are equal iff their names are equal (exact, case-sensitive).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeTag(Cow<'static, str>);

impl TypeTag {
    // Boolean types
    pub const BOOL: TypeTag = TypeTag::from_static("bool");

    // Binary data
    pub const BYTEA: TypeTag = TypeTag::from_static("bytea");

    // Character types
    pub const CHAR: TypeTag = TypeTag::from_static("char");
    pub const NAME: TypeTag = TypeTag::from_static("name");
    pub const TEXT: TypeTag = TypeTag::from_static("text");
    pub const VARCHAR: TypeTag = TypeTag::from_static("varchar");
    pub const BPCHAR: TypeTag = TypeTag::from_static("bpchar");

    // Integer types
    pub const INT2: TypeTag = TypeTag::from_static("int2");
    pub const INT4: TypeTag = TypeTag::from_static("int4");
    pub const INT8: TypeTag = TypeTag::from_static("int8");
    pub const OID: TypeTag = TypeTag::from_static("oid");

    // Floating point types
    pub const FLOAT4: TypeTag = TypeTag::from_static("float4");
    pub const FLOAT8: TypeTag = TypeTag::from_static("float8");

    // Arbitrary precision
    pub const NUMERIC: TypeTag = TypeTag::from_static("numeric");

    // Date/time types
    pub const DATE: TypeTag = TypeTag::from_static("date");
    pub const TIME: TypeTag = TypeTag::from_static("time");
    pub const TIMESTAMP: TypeTag = TypeTag::from_static("timestamp");
    pub const TIMESTAMPTZ: TypeTag = TypeTag::from_static("timestamptz");
    pub const INTERVAL: TypeTag = TypeTag::from_static("interval");

    // UUID
    pub const UUID: TypeTag = TypeTag::from_static("uuid");

    // JSON types
    pub const JSON: TypeTag = TypeTag::from_static("json");
    pub const JSONB: TypeTag = TypeTag::from_static("jsonb");

    // Range types
    pub const INT4RANGE: TypeTag = TypeTag::from_static("int4range");
    pub const INT8RANGE: TypeTag = TypeTag::from_static("int8range");
    pub const NUMRANGE: TypeTag = TypeTag::from_static("numrange");
    pub const DATERANGE: TypeTag = TypeTag::from_static("daterange");
    pub const TSRANGE: TypeTag = TypeTag::from_static("tsrange");
    pub const TSTZRANGE: TypeTag = TypeTag::from_static("tstzrange");

    /// Create a tag from a static name without allocating.
    pub const fn from_static(name: &'static str) -> Self {
        TypeTag(Cow::Borrowed(name))
    }

    /// Create a tag from any name.
    pub fn new(name: impl Into<String>) -> Self {
        TypeTag(Cow::Owned(name.into()))
    }

    /// Get the type name
    #[inline]
    pub fn name(&self) -> &str {
        &self.0
    }

    /// Array types are named after their element with a leading underscore
    pub fn is_array(&self) -> bool {
        self.0.starts_with('_')
    }

    /// Check if this is a text-like type
    pub fn is_text_like(&self) -> bool {
        matches!(
            self.name(),
            "text" | "varchar" | "bpchar" | "char" | "name"
        )
    }

    /// Check if this is an integer type
    pub fn is_integer(&self) -> bool {
        matches!(self.name(), "int2" | "int4" | "int8")
    }

    /// Check if this is a floating point type
    pub fn is_float(&self) -> bool {
        matches!(self.name(), "float4" | "float8")
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TypeTag {
    fn from(name: &str) -> Self {
        TypeTag::new(name)
    }
}

impl From<String> for TypeTag {
    fn from(name: String) -> Self {
        TypeTag::new(name)
    }
}

// ============================================================================
// Wire Representation
// ============================================================================

/// Protocol format code of a non-null value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i16)]
pub enum Format {
    Text = 0,
    Binary = 1,
}

/// A value as it travels over the wire.
///
/// Text and binary payloads are never mixed for a single value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireValue {
    Null,
    Text(Bytes),
    Binary(Bytes),
}

impl WireValue {
    /// Check if this value is NULL
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, WireValue::Null)
    }

    /// Build a text value from an encoded string.
    pub fn text(s: impl Into<String>) -> Self {
        WireValue::Text(Bytes::from(s.into()))
    }

    pub fn binary(data: impl Into<Vec<u8>>) -> Self {
        WireValue::Binary(Bytes::from(data.into()))
    }

    /// Format code, or `None` for NULL.
    pub fn format(&self) -> Option<Format> {
        match self {
            WireValue::Null => None,
            WireValue::Text(_) => Some(Format::Text),
            WireValue::Binary(_) => Some(Format::Binary),
        }
    }

    /// Raw payload, or `None` for NULL.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            WireValue::Null => None,
            WireValue::Text(b) | WireValue::Binary(b) => Some(b),
        }
    }
}

// ============================================================================
// Native Values
// ============================================================================

/// A native value that some codec can marshal.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    /// The single-byte `"char"` type
    Char(u8),
    Int2(i16),
    Int4(i32),
    Int8(i64),
    Oid(u32),
    Float4(f32),
    Float8(f64),
    Text(String),
    Bytea(Vec<u8>),
    Uuid(Uuid),
    Json(serde_json::Value),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<FixedOffset>),
    Interval(TimeDelta),
    /// A zero denominator stands for NaN
    Numeric(BigRational),
    Array(Vec<Option<Value>>),
    Range(Box<Range<Value>>),
}

impl Value {
    /// Short name of the native kind, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Char(_) => "char",
            Value::Int2(_) => "i16",
            Value::Int4(_) => "i32",
            Value::Int8(_) => "i64",
            Value::Oid(_) => "oid",
            Value::Float4(_) => "f32",
            Value::Float8(_) => "f64",
            Value::Text(_) => "string",
            Value::Bytea(_) => "bytes",
            Value::Uuid(_) => "uuid",
            Value::Json(_) => "json",
            Value::Date(_) => "date",
            Value::Time(_) => "time",
            Value::Timestamp(_) => "timestamp",
            Value::TimestampTz(_) => "timestamptz",
            Value::Interval(_) => "duration",
            Value::Numeric(_) => "rational",
            Value::Array(_) => "array",
            Value::Range(_) => "range",
        }
    }

    /// Wrap a range.
    pub fn range(range: Range<Value>) -> Self {
        Value::Range(Box::new(range))
    }

    /// Build an array with no NULL elements.
    pub fn array<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Value::Array(items.into_iter().map(|v| Some(v.into())).collect())
    }

    /// Try to get as i64 (any integer width).
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int2(i) => Some(*i as i64),
            Value::Int4(i) => Some(*i as i64),
            Value::Int8(i) => Some(*i),
            Value::Oid(i) => Some(*i as i64),
            _ => None,
        }
    }

    /// Try to get as string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get the elements of an array.
    pub fn as_array(&self) -> Option<&[Option<Value>]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }
}

macro_rules! impl_from_native {
    ($($native:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$native> for Value {
                fn from(v: $native) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

impl_from_native! {
    bool => Bool,
    i16 => Int2,
    i32 => Int4,
    i64 => Int8,
    f32 => Float4,
    f64 => Float8,
    String => Text,
    Vec<u8> => Bytea,
    Uuid => Uuid,
    serde_json::Value => Json,
    NaiveDate => Date,
    NaiveTime => Time,
    NaiveDateTime => Timestamp,
    DateTime<FixedOffset> => TimestampTz,
    TimeDelta => Interval,
    BigRational => Numeric,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Bytea(v.to_vec())
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::TimestampTz(v.fixed_offset())
    }
}

impl From<Range<Value>> for Value {
    fn from(v: Range<Value>) -> Self {
        Value::range(v)
    }
}
