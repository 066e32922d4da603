//! Range values and the range codec.
//!
//! Text format: `empty`, or `[lo,hi)` style where either bound may be
//! omitted for infinity. Bounds are emitted bare when safe and
//! double-quoted otherwise.

use std::sync::Arc;

use super::codec::Codec;
use super::quote::{parse_delimited, quote_delimited, quote_literal};
use super::types::{TypeTag, Value};
use crate::error::{CodecError, Result};

/// Characters that force a range bound to be quoted.
const UNSAFE: &str = "\"\\,()[]";

/// One end of a range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Bound<T> {
    Unbounded,
    /// Inclusive
    Closed(T),
    /// Exclusive
    Open(T),
}

impl<T> Bound<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            Bound::Unbounded => None,
            Bound::Closed(v) | Bound::Open(v) => Some(v),
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, Bound::Closed(_))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Bound<U> {
        match self {
            Bound::Unbounded => Bound::Unbounded,
            Bound::Closed(v) => Bound::Closed(f(v)),
            Bound::Open(v) => Bound::Open(f(v)),
        }
    }

    fn try_map<U, E>(self, f: impl FnOnce(T) -> std::result::Result<U, E>) -> std::result::Result<Bound<U>, E> {
        Ok(match self {
            Bound::Unbounded => Bound::Unbounded,
            Bound::Closed(v) => Bound::Closed(f(v)?),
            Bound::Open(v) => Bound::Open(f(v)?),
        })
    }
}

/// A range of values. Bound order is not validated: `[5,1]` is kept as is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Range<T> {
    Empty,
    Bounded { lower: Bound<T>, upper: Bound<T> },
}

impl<T> Range<T> {
    pub fn new(lower: Bound<T>, upper: Bound<T>) -> Self {
        Range::Bounded { lower, upper }
    }

    /// The range with no bounds at all.
    pub fn full() -> Self {
        Range::new(Bound::Unbounded, Bound::Unbounded)
    }

    /// `[lower, upper)`, the canonical form of discrete ranges.
    pub fn closed_open(lower: T, upper: T) -> Self {
        Range::new(Bound::Closed(lower), Bound::Open(upper))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Range::Empty)
    }

    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> Range<U> {
        match self {
            Range::Empty => Range::Empty,
            Range::Bounded { lower, upper } => Range::Bounded {
                lower: lower.map(&mut f),
                upper: upper.map(&mut f),
            },
        }
    }
}

impl<T: PartialOrd> Range<T> {
    pub fn contains(&self, item: &T) -> bool {
        match self {
            Range::Empty => false,
            Range::Bounded { lower, upper } => {
                let above = match lower {
                    Bound::Unbounded => true,
                    Bound::Closed(lo) => lo <= item,
                    Bound::Open(lo) => lo < item,
                };
                let below = match upper {
                    Bound::Unbounded => true,
                    Bound::Closed(hi) => item <= hi,
                    Bound::Open(hi) => item < hi,
                };
                above && below
            }
        }
    }
}

/// Codec for a range type over some element codec.
#[derive(Debug, Clone)]
pub struct RangeCodec {
    tag: TypeTag,
    element: Arc<dyn Codec>,
}

/// Build the codec for range type `tag` over `element`.
pub fn range_codec_of(tag: TypeTag, element: Arc<dyn Codec>) -> RangeCodec {
    RangeCodec::new(tag, element)
}

impl RangeCodec {
    pub fn new(tag: TypeTag, element: Arc<dyn Codec>) -> Self {
        Self { tag, element }
    }

    pub fn element(&self) -> &Arc<dyn Codec> {
        &self.element
    }

    fn invalid(&self, text: &str, reason: impl Into<String>) -> CodecError {
        CodecError::decode(&self.tag, text, reason)
    }

    fn range_of<'v>(&self, value: &'v Value) -> Result<&'v Range<Value>> {
        match value {
            Value::Range(r) => Ok(r),
            other => Err(CodecError::unsupported(&self.tag, other.kind())),
        }
    }

    fn decode_bound(&self, text: &str, rest: &str, closed: bool) -> Result<(Bound<Value>, usize)> {
        let (token, after) =
            parse_delimited(UNSAFE, rest).map_err(|reason| self.invalid(text, reason))?;
        let consumed = rest.len() - after.len();
        // An empty bare token is an infinite bound
        if !token.quoted && token.text.is_empty() {
            return Ok((Bound::Unbounded, consumed));
        }
        let value = self.element.decode_text(&token.text)?;
        let bound = if closed {
            Bound::Closed(value)
        } else {
            Bound::Open(value)
        };
        Ok((bound, consumed))
    }
}

impl Codec for RangeCodec {
    fn tag(&self) -> &TypeTag {
        &self.tag
    }

    fn encode_text(&self, value: &Value) -> Result<String> {
        let (lower, upper) = match self.range_of(value)? {
            Range::Empty => return Ok("empty".to_string()),
            Range::Bounded { lower, upper } => (lower, upper),
        };

        let mut out = String::new();
        out.push(if matches!(lower, Bound::Open(_)) { '(' } else { '[' });
        if let Some(v) = lower.value() {
            out.push_str(&quote_delimited(UNSAFE, &self.element.encode_text(v)?));
        }
        out.push(',');
        if let Some(v) = upper.value() {
            out.push_str(&quote_delimited(UNSAFE, &self.element.encode_text(v)?));
        }
        out.push(if matches!(upper, Bound::Open(_)) { ')' } else { ']' });
        Ok(out)
    }

    fn decode_text(&self, text: &str) -> Result<Value> {
        let trimmed = text.trim();
        if trimmed.eq_ignore_ascii_case("empty") {
            return Ok(Value::range(Range::Empty));
        }

        let lower_closed = match trimmed.as_bytes().first() {
            Some(b'[') => true,
            Some(b'(') => false,
            _ => return Err(self.invalid(text, "expected '[', '(' or 'empty'")),
        };
        let rest = &trimmed[1..];
        let (lower, used) = self.decode_bound(text, rest, lower_closed)?;
        let rest = rest[used..]
            .strip_prefix(',')
            .ok_or_else(|| self.invalid(text, "expected ',' between range bounds"))?;

        let upper_closed = match rest.as_bytes().last() {
            Some(b']') => true,
            Some(b')') => false,
            _ => return Err(self.invalid(text, "expected ']' or ')'")),
        };
        let (upper, used) = self.decode_bound(text, rest, upper_closed)?;
        if used != rest.len() - 1 {
            return Err(self.invalid(text, "junk after upper bound"));
        }

        Ok(Value::range(Range::new(lower, upper)))
    }

    fn to_literal(&self, value: &Value) -> Result<String> {
        // Validate the value kind before rendering
        self.range_of(value)?;
        Ok(quote_literal(&self.encode_text(value)?))
    }
}

/// Convert a range of native values into a range of [`Value`]s.
pub fn range_from<T: Into<Value>>(range: Range<T>) -> Value {
    Value::range(range.map(Into::into))
}

/// Convert a decoded range back into natives, failing on the first element
/// `f` rejects.
pub fn range_into<T, E>(
    range: Range<Value>,
    mut f: impl FnMut(Value) -> std::result::Result<T, E>,
) -> std::result::Result<Range<T>, E> {
    match range {
        Range::Empty => Ok(Range::Empty),
        Range::Bounded { lower, upper } => Ok(Range::Bounded {
            lower: lower.try_map(&mut f)?,
            upper: upper.try_map(&mut f)?,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pg::scalar::{ScalarCodec, ScalarKind};
    use pretty_assertions::assert_eq;

    fn int4range() -> RangeCodec {
        range_codec_of(
            TypeTag::INT4RANGE,
            Arc::new(ScalarCodec::new(TypeTag::INT4, ScalarKind::Int4)),
        )
    }

    fn text_range() -> RangeCodec {
        range_codec_of(
            TypeTag::new("textrange"),
            Arc::new(ScalarCodec::new(TypeTag::TEXT, ScalarKind::Text)),
        )
    }

    #[test]
    fn test_encode_closed_open() {
        let v = range_from(Range::closed_open(1i32, 10));
        assert_eq!(int4range().encode_text(&v).unwrap(), "[1,10)");
    }

    #[test]
    fn test_encode_unbounded() {
        let v = range_from(Range::new(Bound::Unbounded, Bound::Open(5i32)));
        assert_eq!(int4range().encode_text(&v).unwrap(), "[,5)");
        let v = range_from(Range::<i32>::full());
        assert_eq!(int4range().encode_text(&v).unwrap(), "[,]");
    }

    #[test]
    fn test_empty() {
        let codec = int4range();
        assert_eq!(codec.encode_text(&Value::range(Range::Empty)).unwrap(), "empty");
        assert_eq!(codec.decode_text("EMPTY").unwrap(), Value::range(Range::Empty));
    }

    #[test]
    fn test_decode_bounds() {
        let codec = int4range();
        assert_eq!(
            codec.decode_text("(1,5]").unwrap(),
            range_from(Range::new(Bound::Open(1i32), Bound::Closed(5)))
        );
        assert_eq!(
            codec.decode_text("(,)").unwrap(),
            range_from(Range::<i32>::new(Bound::Unbounded, Bound::Unbounded))
        );
    }

    #[test]
    fn test_inverted_bounds_are_kept() {
        let v = int4range().decode_text("[5,1]").unwrap();
        assert_eq!(v, range_from(Range::new(Bound::Closed(5i32), Bound::Closed(1))));
    }

    #[test]
    fn test_quoted_bounds() {
        let codec = text_range();
        let v = range_from(Range::new(
            Bound::Closed("a,b".to_string()),
            Bound::Open(String::new()),
        ));
        let text = codec.encode_text(&v).unwrap();
        assert_eq!(text, "[\"a,b\",\"\")");
        assert_eq!(codec.decode_text(&text).unwrap(), v);
    }

    #[test]
    fn test_malformed() {
        let codec = int4range();
        assert!(codec.decode_text("1,5").unwrap_err().is_decode());
        assert!(codec.decode_text("[1;5)").unwrap_err().is_decode());
        assert!(codec.decode_text("[1,5").unwrap_err().is_decode());
        assert!(codec.decode_text("[1,5)x").unwrap_err().is_decode());
        assert!(codec.decode_text("[a,5)").unwrap_err().is_decode());
    }

    #[test]
    fn test_contains() {
        let r = Range::closed_open(1, 10);
        assert!(r.contains(&1));
        assert!(!r.contains(&10));
        assert!(Range::<i32>::full().contains(&i32::MIN));
        assert!(!Range::<i32>::Empty.contains(&0));
    }

    #[test]
    fn test_range_into() {
        let v = int4range().decode_text("[1,3)").unwrap();
        let Value::Range(r) = v else {
            panic!("Expected range");
        };
        let native: std::result::Result<Range<i64>, ()> =
            range_into(*r, |v| v.as_i64().ok_or(()));
        assert_eq!(native, Ok(Range::closed_open(1, 3)));
    }

    #[test]
    fn test_literal() {
        let v = range_from(Range::closed_open(1i32, 2));
        assert_eq!(int4range().to_literal(&v).unwrap(), "'[1,2)'");
        assert!(int4range().to_literal(&Value::Int4(1)).is_err());
    }
}
