//! `${expr}` placeholder substitution.
//!
//! Each placeholder's expression is handed verbatim to an [`Evaluator`];
//! the typed value it returns is rendered as a literal with an explicit
//! cast, e.g. `42::int4` or `'it''s'::text`.
//!
//! Braces nest inside a placeholder and double-quoted strings are skipped,
//! so `${ {"a": "}"} }` is a single placeholder. `$${` writes a literal
//! `${`.

use std::borrow::Cow;

use bytes::{BufMut, Bytes, BytesMut};
use smallvec::SmallVec;

use super::quote::quote_identifier;
use super::registry::CodecRegistry;
use super::types::{TypeTag, Value};
use crate::error::{CodecError, Result};

/// A typed value produced by evaluating a placeholder.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluated {
    pub tag: TypeTag,
    /// `None` renders as `NULL`
    pub value: Option<Value>,
}

impl Evaluated {
    pub fn new(tag: TypeTag, value: impl Into<Value>) -> Self {
        Self {
            tag,
            value: Some(value.into()),
        }
    }

    pub fn null(tag: TypeTag) -> Self {
        Self { tag, value: None }
    }
}

/// Turns placeholder expression text into a typed value.
pub trait Evaluator {
    fn evaluate(&mut self, expr: &str) -> std::result::Result<Evaluated, String>;
}

impl<F> Evaluator for F
where
    F: FnMut(&str) -> std::result::Result<Evaluated, String>,
{
    fn evaluate(&mut self, expr: &str) -> std::result::Result<Evaluated, String> {
        self(expr)
    }
}

/// A piece of a split template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<'a> {
    Literal(&'a str),
    /// Expression text and the byte offset of its `${`
    Placeholder { expr: &'a str, position: usize },
}

/// Split `template` into literal spans and placeholders.
pub fn split_template(template: &str) -> Result<SmallVec<[Segment<'_>; 8]>> {
    let bytes = template.as_bytes();
    let mut segments = SmallVec::new();
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'$' {
            i += 1;
            continue;
        }
        let rest = &template[i..];
        if rest.starts_with("$${") {
            // Keep one `$`; the `{` starts the next literal span
            segments.push(Segment::Literal(&template[start..=i]));
            i += 2;
            start = i;
        } else if rest.starts_with("${") {
            if start < i {
                segments.push(Segment::Literal(&template[start..i]));
            }
            let body = i + 2;
            let end = closing_brace(template, body)
                .ok_or_else(|| CodecError::parse(i, "unterminated placeholder"))?;
            segments.push(Segment::Placeholder {
                expr: &template[body..end],
                position: i,
            });
            i = end + 1;
            start = i;
        } else {
            i += 1;
        }
    }

    if start < template.len() {
        segments.push(Segment::Literal(&template[start..]));
    }
    Ok(segments)
}

/// Byte offset of the `}` closing a placeholder whose body starts at `from`.
fn closing_brace(template: &str, from: usize) -> Option<usize> {
    let mut depth = 1usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &b) in template.as_bytes()[from..].iter().enumerate() {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(from + offset);
                }
            }
            _ => {}
        }
    }
    None
}

/// The cast target for `tag`: bare when it is a plain lowercase identifier,
/// double-quoted otherwise. `"char"` is always quoted since bare `char`
/// means `bpchar`.
pub fn cast_name(tag: &TypeTag) -> Cow<'_, str> {
    let name = tag.name();
    let simple = name
        .bytes()
        .next()
        .is_some_and(|b| b.is_ascii_lowercase() || b == b'_')
        && name
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_');
    if simple && name != "char" {
        Cow::Borrowed(name)
    } else {
        Cow::Owned(quote_identifier(name))
    }
}

/// Replace every placeholder in `template` with `literal::cast`.
pub fn substitute_literals<E: Evaluator>(
    registry: &CodecRegistry,
    template: &str,
    mut evaluator: E,
) -> Result<Bytes> {
    let segments = split_template(template)?;
    let mut out = BytesMut::with_capacity(template.len() + 16 * segments.len());

    for segment in segments {
        match segment {
            Segment::Literal(text) => out.put_slice(text.as_bytes()),
            Segment::Placeholder { expr, position } => {
                let Evaluated { tag, value } =
                    evaluator
                        .evaluate(expr)
                        .map_err(|reason| CodecError::Expression {
                            text: expr.to_string(),
                            reason,
                        })?;
                let literal = registry.to_literal(&tag, value.as_ref())?;
                tracing::trace!(position, tag = %tag, "substituted placeholder");

                out.put_slice(literal.as_bytes());
                out.put_slice(b"::");
                out.put_slice(cast_name(&tag).as_bytes());
            }
        }
    }
    Ok(out.freeze())
}
