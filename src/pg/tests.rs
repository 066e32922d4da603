//! Cross-module tests for the codec registry.
//!
//! Each section drives values through the default registry the way a
//! driver would: by tag, in both wire formats.

use std::sync::Arc;

use chrono::{FixedOffset, NaiveDate, TimeZone};
use super::array::array_codec_of;
use super::codec::Codec;
use super::numeric::ratio;
use super::range::{range_from, Bound, Range};
use super::registry::{default_registry, CodecRegistry};
use super::substitute::Evaluated;
use super::types::*;
use crate::error::CodecError;

fn registry() -> &'static CodecRegistry {
    default_registry()
}

fn roundtrip_text(tag: &TypeTag, value: &Value) -> Value {
    let wire = registry().encode(tag, value, false).unwrap();
    assert_eq!(wire.format(), Some(Format::Text));
    registry().decode(tag, &wire).unwrap()
}

fn roundtrip_binary(tag: &TypeTag, value: &Value) -> Value {
    let wire = registry().encode(tag, value, true).unwrap();
    assert_eq!(wire.format(), Some(Format::Binary), "{} should encode binary", tag);
    registry().decode(tag, &wire).unwrap()
}

fn sample_values() -> Vec<(TypeTag, Value)> {
    let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
    let ts = date.and_hms_micro_opt(23, 59, 58, 999_999).unwrap();
    let tz = FixedOffset::east_opt(-7 * 3600)
        .unwrap()
        .with_ymd_and_hms(2023, 11, 5, 1, 30, 0)
        .unwrap();
    vec![
        (TypeTag::BOOL, Value::Bool(true)),
        (TypeTag::CHAR, Value::Char(b'x')),
        (TypeTag::INT2, Value::Int2(i16::MIN)),
        (TypeTag::INT4, Value::Int4(-42)),
        (TypeTag::INT8, Value::Int8(i64::MAX)),
        (TypeTag::OID, Value::Oid(u32::MAX)),
        (TypeTag::FLOAT4, Value::Float4(0.1)),
        (TypeTag::FLOAT8, Value::Float8(-1.0e-300)),
        (TypeTag::TEXT, Value::from("héllo, \"world\"\n")),
        (TypeTag::VARCHAR, Value::from("")),
        (TypeTag::BYTEA, Value::Bytea(vec![0, 1, 0xff])),
        (TypeTag::UUID, Value::Uuid(uuid::Uuid::new_v4())),
        (TypeTag::JSONB, Value::Json(serde_json::json!({"a": [1, null, "x"]}))),
        (TypeTag::DATE, Value::Date(date)),
        (TypeTag::TIME, Value::Time(ts.time())),
        (TypeTag::TIMESTAMP, Value::Timestamp(ts)),
        (TypeTag::TIMESTAMPTZ, Value::TimestampTz(tz)),
    ]
}

// ============================================================================
// Scalar Round-Trip Tests
// ============================================================================

mod scalar_roundtrip {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_text_roundtrip_all_scalars() {
        for (tag, value) in sample_values() {
            assert_eq!(roundtrip_text(&tag, &value), value, "{}", tag);
        }
    }

    #[test]
    fn test_binary_roundtrip_all_scalars() {
        for (tag, value) in sample_values() {
            assert_eq!(roundtrip_binary(&tag, &value), value, "{}", tag);
        }
    }

    #[test]
    fn test_numeric_text_roundtrip() {
        let v = Value::Numeric(ratio(-314_159, 100_000));
        assert_eq!(roundtrip_text(&TypeTag::NUMERIC, &v), v);
    }

    #[test]
    fn test_numeric_extreme_exponent_is_decode_error() {
        for text in ["1e-9223372036854775808", "1e9223372036854775807", "1e150001"] {
            let err = registry()
                .decode(&TypeTag::NUMERIC, &WireValue::text(text))
                .unwrap_err();
            assert!(err.is_decode(), "{}", text);
        }
    }

    #[test]
    fn test_interval_text_is_asymmetric() {
        let wire = registry()
            .encode(&TypeTag::INTERVAL, &Value::Interval(chrono::TimeDelta::hours(1)), false)
            .unwrap();
        assert_eq!(wire, WireValue::text("3600s"));
        // Generic seconds are output only; input must be ISO-8601
        assert!(registry().decode(&TypeTag::INTERVAL, &wire).unwrap_err().is_decode());
        assert_eq!(
            registry()
                .decode(&TypeTag::INTERVAL, &WireValue::text("PT1H"))
                .unwrap(),
            Value::Interval(chrono::TimeDelta::hours(1))
        );
    }

    #[test]
    fn test_invalid_utf8_text_is_decode_error() {
        let wire = WireValue::Text(bytes::Bytes::from_static(&[0xff, 0xfe]));
        let err = registry().decode(&TypeTag::TEXT, &wire).unwrap_err();
        assert!(err.is_decode());
    }
}

// ============================================================================
// Array Tests
// ============================================================================

mod arrays {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_builtin_arrays_roundtrip() {
        for (tag, value) in sample_values() {
            let array_tag = TypeTag::new(format!("_{}", tag));
            let array = Value::Array(vec![Some(value.clone()), None, Some(value)]);
            assert_eq!(roundtrip_text(&array_tag, &array), array, "{}", array_tag);
        }
    }

    #[test]
    fn test_array_of_ranges() {
        let tag = TypeTag::new("_int4range");
        let v = Value::Array(vec![
            Some(range_from(Range::closed_open(1i32, 5))),
            Some(Value::range(Range::Empty)),
            None,
        ]);
        let wire = registry().encode(&tag, &v, false).unwrap();
        assert_eq!(wire, WireValue::text("{\"[1,5)\",empty,NULL}"));
        assert_eq!(registry().decode(&tag, &wire).unwrap(), v);
    }

    #[test]
    fn test_nested_to_depth_three() {
        let int_array: Arc<dyn Codec> = registry().get(&TypeTag::new("_int4")).unwrap().clone();
        let depth2: Arc<dyn Codec> =
            Arc::new(array_codec_of(TypeTag::new("_int4"), int_array, ','));
        let depth3 = array_codec_of(TypeTag::new("_int4"), depth2, ',');

        let leaf = |xs: &[i32]| Some(Value::array(xs.iter().copied()));
        let v = Value::Array(vec![
            Some(Value::Array(vec![leaf(&[1, 2]), leaf(&[]), None])),
            Some(Value::Array(vec![])),
            Some(Value::Array(vec![leaf(&[3])])),
        ]);
        let text = depth3.encode_text(&v).unwrap();
        assert_eq!(depth3.decode_text(&text).unwrap(), v);
    }

    #[test]
    fn test_nested_text_to_depth_three() {
        let text_array: Arc<dyn Codec> = registry().get(&TypeTag::new("_text")).unwrap().clone();
        let depth2: Arc<dyn Codec> =
            Arc::new(array_codec_of(TypeTag::new("_text"), text_array, ','));
        let depth3 = array_codec_of(TypeTag::new("_text"), depth2, ',');

        let leaf = |xs: &[Option<&str>]| {
            Some(Value::Array(xs.iter().map(|x| x.map(Value::from)).collect()))
        };
        let v = Value::Array(vec![
            Some(Value::Array(vec![
                leaf(&[Some("{a,\"b\\}"), Some("NULL"), None]),
                None,
                leaf(&[Some(""), Some(" padded ")]),
            ])),
            Some(Value::Array(vec![leaf(&[Some("null"), Some("}{")])])),
        ]);
        let text = depth3.encode_text(&v).unwrap();
        assert_eq!(depth3.decode_text(&text).unwrap(), v);
    }

    #[test]
    fn test_unterminated_array() {
        let err = registry()
            .decode(&TypeTag::new("_int4"), &WireValue::text("{1,2"))
            .unwrap_err();
        assert!(err.is_decode());
        assert!(err.to_string().contains("_int4"));
    }

    #[test]
    fn test_arrays_have_no_binary_form() {
        let tag = TypeTag::new("_int4");
        let v = Value::array([1i32]);
        // Falls back to text when binary is preferred
        let wire = registry().encode(&tag, &v, true).unwrap();
        assert_eq!(wire.format(), Some(Format::Text));
        let err = registry()
            .decode(&tag, &WireValue::binary(vec![0, 0, 0, 1]))
            .unwrap_err();
        assert_eq!(err, CodecError::BinaryUnsupported { tag: "_int4".to_string() });
    }
}

// ============================================================================
// Range Tests
// ============================================================================

mod ranges {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_builtin_ranges_roundtrip() {
        let day = |d| Value::Date(NaiveDate::from_ymd_opt(2024, 1, d).unwrap());
        let cases = [
            (TypeTag::INT4RANGE, range_from(Range::closed_open(1i32, 10))),
            (TypeTag::INT8RANGE, range_from(Range::new(Bound::Unbounded, Bound::Closed(5i64)))),
            (
                TypeTag::NUMRANGE,
                range_from(Range::new(Bound::Open(ratio(1, 2)), Bound::Unbounded)),
            ),
            (
                TypeTag::DATERANGE,
                Value::range(Range::new(Bound::Closed(day(1)), Bound::Open(day(31)))),
            ),
            (TypeTag::TSRANGE, Value::range(Range::full())),
            (TypeTag::TSTZRANGE, Value::range(Range::Empty)),
        ];
        for (tag, value) in cases {
            assert_eq!(roundtrip_text(&tag, &value), value, "{}", tag);
        }
    }

    #[test]
    fn test_timestamp_bounds_are_quoted() {
        let ts = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        let v = Value::range(Range::closed_open(Value::Timestamp(ts), Value::Timestamp(ts)));
        let wire = registry().encode(&TypeTag::TSRANGE, &v, false).unwrap();
        assert_eq!(
            wire,
            WireValue::text("[\"2024-01-01 08:00:00\",\"2024-01-01 08:00:00\")")
        );
        assert_eq!(registry().decode(&TypeTag::TSRANGE, &wire).unwrap(), v);
    }
}

// ============================================================================
// NULL Handling Tests
// ============================================================================

mod null_handling {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_nullable_paths() {
        let tag = TypeTag::UUID;
        assert_eq!(registry().encode_nullable(&tag, None, true).unwrap(), WireValue::Null);
        assert_eq!(registry().decode_nullable(&tag, &WireValue::Null).unwrap(), None);
    }

    #[test]
    fn test_plain_decode_rejects_null() {
        let err = registry().decode(&TypeTag::INT8, &WireValue::Null).unwrap_err();
        assert_eq!(err.to_string(), "NULL in int8 column");
    }

    #[test]
    fn test_null_is_absent_for_every_tag() {
        for tag in registry().tags() {
            assert_eq!(
                registry().decode_nullable(tag, &WireValue::Null).unwrap(),
                None,
                "{}",
                tag
            );
            assert_eq!(
                registry().decode(tag, &WireValue::Null).unwrap_err(),
                CodecError::NullNotAllowed { tag: tag.to_string() },
            );
        }
    }

    #[test]
    fn test_unknown_tag_even_for_null() {
        let err = registry()
            .decode_nullable(&TypeTag::from("widget"), &WireValue::Null)
            .unwrap_err();
        assert!(matches!(err, CodecError::UnsupportedType { .. }));
    }
}

// ============================================================================
// Literal Safety Tests
// ============================================================================

mod literal_safety {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_literals_by_tag() {
        let cases = [
            (TypeTag::INT4, Some(Value::Int4(-5)), "(-5)"),
            (TypeTag::BOOL, Some(Value::Bool(false)), "false"),
            (TypeTag::TEXT, Some(Value::from("'; drop table x; --")), "'''; drop table x; --'"),
            (TypeTag::NUMERIC, Some(Value::Numeric(ratio(1, 3))), "(1/3::numeric)"),
            (TypeTag::new("_text"), Some(Value::array(["a'b"])), "'{a''b}'"),
            (TypeTag::TEXT, None, "NULL"),
        ];
        for (tag, value, expected) in cases {
            assert_eq!(registry().to_literal(&tag, value.as_ref()).unwrap(), expected);
        }
    }

    #[test]
    fn test_negative_literal_after_minus() {
        let lit = registry()
            .to_literal(&TypeTag::INT8, Some(&Value::Int8(-1)))
            .unwrap();
        let sql = format!("select 1 -{}", lit);
        assert!(!sql.contains("--"));
    }

    #[test]
    fn test_backslashes_are_not_escapes() {
        let lit = registry()
            .to_literal(&TypeTag::BYTEA, Some(&Value::Bytea(vec![0xab])))
            .unwrap();
        assert_eq!(lit, "'\\xab'");
    }
}

// ============================================================================
// Substitution Tests
// ============================================================================

mod substitution {
    use super::*;
    use pretty_assertions::assert_eq;

    fn int4_evaluator(expr: &str) -> std::result::Result<Evaluated, String> {
        expr.trim()
            .parse::<i32>()
            .map(|v| Evaluated::new(TypeTag::INT4, v))
            .map_err(|e| e.to_string())
    }

    #[test]
    fn test_substitute_integer() {
        let out = crate::substitute_literals("x ${42}", int4_evaluator).unwrap();
        assert_eq!(&out[..], b"x 42::int4");
    }

    #[test]
    fn test_substitute_several() {
        let out = registry()
            .substitute_literals("select ${1} - ${-2}, '$${}'", int4_evaluator)
            .unwrap();
        assert_eq!(&out[..], b"select 1::int4 - (-2)::int4, '${}'");
    }

    #[test]
    fn test_substitute_keeps_trailing_cast() {
        let mut seen = Vec::new();
        let out = crate::substitute_literals("a = ${1+1}::text", |expr: &str| {
            seen.push(expr.to_string());
            let sum = expr
                .split('+')
                .map(|term| term.trim().parse::<i32>().map_err(|e| e.to_string()))
                .sum::<std::result::Result<i32, String>>()?;
            Ok(Evaluated::new(TypeTag::INT4, sum))
        })
        .unwrap();
        assert_eq!(&out[..], b"a = 2::int4::text");
        assert_eq!(seen, vec!["1+1".to_string()]);
    }

    #[test]
    fn test_substitute_char_cast_is_quoted() {
        let out = crate::substitute_literals("${c}", |_: &str| {
            Ok::<_, String>(Evaluated::new(TypeTag::CHAR, Value::Char(b'a')))
        })
        .unwrap();
        assert_eq!(&out[..], b"'a'::\"char\"");
    }

    #[test]
    fn test_substitute_errors() {
        let err = crate::substitute_literals("${nope}", int4_evaluator).unwrap_err();
        assert!(matches!(err, CodecError::Expression { ref text, .. } if text == "nope"));

        let err = crate::substitute_literals("a ${1", int4_evaluator).unwrap_err();
        assert!(matches!(err, CodecError::Parse { position: 2, .. }));
    }
}

// ============================================================================
// Property Tests
// ============================================================================

mod properties {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_int8_text_roundtrip(v in any::<i64>()) {
            let value = Value::Int8(v);
            prop_assert_eq!(roundtrip_text(&TypeTag::INT8, &value), value);
        }

        #[test]
        fn prop_float8_text_roundtrip(v in any::<f64>().prop_filter("NaN never compares equal", |v| !v.is_nan())) {
            let value = Value::Float8(v);
            prop_assert_eq!(roundtrip_text(&TypeTag::FLOAT8, &value), value);
        }

        #[test]
        fn prop_text_array_roundtrip(items in proptest::collection::vec(proptest::option::of(".*"), 0..8)) {
            let tag = TypeTag::new("_text");
            let value = Value::Array(items.into_iter().map(|i| i.map(Value::Text)).collect());
            prop_assert_eq!(roundtrip_text(&tag, &value), value);
        }

        #[test]
        fn prop_numeric_exact_decimals_roundtrip(n in -1_000_000_000i64..1_000_000_000, scale in 0u32..8) {
            let value = Value::Numeric(ratio(n, 10i64.pow(scale)));
            prop_assert_eq!(roundtrip_text(&TypeTag::NUMERIC, &value), value);
        }

        #[test]
        fn prop_text_literal_never_escapes_quotes(s in ".*") {
            let lit = registry().to_literal(&TypeTag::TEXT, Some(&Value::Text(s.clone()))).unwrap();
            let body = &lit[1..lit.len() - 1];
            prop_assert_eq!(body.replace("''", "'"), s);
        }
    }
}
