//! Runtime table from type tag to codec.
//!
//! The built-in registry knows every scalar, every range type and the array
//! of each. Custom codecs can be added with [`CodecRegistry::register`].

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use once_cell::sync::Lazy;

use super::array::ArrayCodec;
use super::codec::{decode_wire, encode_wire, Codec};
use super::null::{NotNull, Nullable};
use super::numeric::NumericCodec;
use super::range::RangeCodec;
use super::scalar::ScalarCodec;
use super::substitute::{self, Evaluator};
use super::temporal::TemporalCodec;
use super::types::{TypeTag, Value, WireValue};
use crate::config::CodecConfig;
use crate::error::{CodecError, Result};

// ============================================================================
// Element Relations
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositeKind {
    Array,
    Range,
}

/// How a composite type is built from its element type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementRelation {
    pub composite: TypeTag,
    pub element: TypeTag,
    /// Array element separator; ranges always use `,`
    pub delimiter: char,
    pub kind: CompositeKind,
}

/// Element types whose array is `_<name>` with a comma delimiter.
const ARRAY_ELEMENTS: &[&str] = &[
    "bool",
    "char",
    "int2",
    "int4",
    "int8",
    "oid",
    "float4",
    "float8",
    "text",
    "varchar",
    "bpchar",
    "name",
    "bytea",
    "uuid",
    "json",
    "jsonb",
    "date",
    "time",
    "timestamp",
    "timestamptz",
    "interval",
    "numeric",
    "int4range",
    "int8range",
    "numrange",
    "daterange",
    "tsrange",
    "tstzrange",
];

/// Range types and their subtype.
const RANGE_ELEMENTS: &[(&str, &str)] = &[
    ("int4range", "int4"),
    ("int8range", "int8"),
    ("numrange", "numeric"),
    ("daterange", "date"),
    ("tsrange", "timestamp"),
    ("tstzrange", "timestamptz"),
];

/// Arrays whose delimiter is not a comma.
const SPECIAL_ARRAYS: &[(&str, &str, char)] = &[("_box", "box", ';')];

/// Look up the element relation of a composite tag.
pub fn element_relation(tag: &TypeTag) -> Option<ElementRelation> {
    let name = tag.name();
    if let Some(&(_, element)) = RANGE_ELEMENTS.iter().find(|(r, _)| *r == name) {
        return Some(ElementRelation {
            composite: tag.clone(),
            element: TypeTag::from_static(element),
            delimiter: ',',
            kind: CompositeKind::Range,
        });
    }
    if let Some(&(_, element, delimiter)) = SPECIAL_ARRAYS.iter().find(|(a, _, _)| *a == name) {
        return Some(ElementRelation {
            composite: tag.clone(),
            element: TypeTag::from_static(element),
            delimiter,
            kind: CompositeKind::Array,
        });
    }

    let element_name = name.strip_prefix('_')?;
    let &element = ARRAY_ELEMENTS.iter().find(|e| **e == element_name)?;
    Some(ElementRelation {
        composite: tag.clone(),
        element: TypeTag::from_static(element),
        delimiter: ',',
        kind: CompositeKind::Array,
    })
}

/// Every composite relation known at build time, ranges first.
pub fn element_relations() -> Vec<ElementRelation> {
    let ranges = RANGE_ELEMENTS
        .iter()
        .map(|&(range, _)| TypeTag::from_static(range));
    let arrays = ARRAY_ELEMENTS
        .iter()
        .map(|element| TypeTag::new(format!("_{}", element)));
    let special = SPECIAL_ARRAYS
        .iter()
        .map(|&(array, _, _)| TypeTag::from_static(array));

    ranges
        .chain(arrays)
        .chain(special)
        .filter_map(|tag| element_relation(&tag))
        .collect()
}

// ============================================================================
// Registry
// ============================================================================

/// Tag → codec table plus the settings the codecs were built with.
#[derive(Debug, Clone)]
pub struct CodecRegistry {
    codecs: HashMap<TypeTag, Arc<dyn Codec>>,
    config: CodecConfig,
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl CodecRegistry {
    /// A registry with no codecs at all.
    pub fn empty(config: CodecConfig) -> Self {
        Self {
            codecs: HashMap::new(),
            config,
        }
    }

    /// All built-in codecs with default settings.
    pub fn builtin() -> Self {
        Self::with_config(CodecConfig::default())
    }

    /// All built-in codecs, configured by `config`.
    pub fn with_config(config: CodecConfig) -> Self {
        let mut registry = Self::empty(config);

        for codec in ScalarCodec::builtins() {
            registry.insert(Arc::new(codec));
        }
        for codec in TemporalCodec::builtins() {
            registry.insert(Arc::new(codec));
        }
        registry.insert(Arc::new(NumericCodec::with_precision(
            registry.config.numeric_precision,
        )));

        // Ranges come first: range types have arrays of their own
        for relation in element_relations() {
            registry.add_composite(relation);
        }

        tracing::debug!(codecs = registry.codecs.len(), "built codec registry");
        registry
    }

    fn insert(&mut self, codec: Arc<dyn Codec>) -> Option<Arc<dyn Codec>> {
        self.codecs.insert(codec.tag().clone(), codec)
    }

    /// Build the composite codec for `relation` over its registered element.
    fn add_composite(&mut self, relation: ElementRelation) -> bool {
        let element = match self.codecs.get(&relation.element) {
            Some(codec) => codec.clone(),
            None => {
                tracing::debug!(
                    composite = %relation.composite,
                    element = %relation.element,
                    "no element codec, skipping composite"
                );
                return false;
            }
        };
        let tag = relation.composite;
        let codec: Arc<dyn Codec> = match relation.kind {
            CompositeKind::Array => Arc::new(ArrayCodec::new(tag, element, relation.delimiter)),
            CompositeKind::Range => Arc::new(RangeCodec::new(tag, element)),
        };
        self.insert(codec);
        true
    }

    /// Add or replace a codec, returning the one it replaced.
    ///
    /// Composites built earlier keep the element codec they were built with.
    pub fn register<C: Codec + 'static>(&mut self, codec: C) -> Option<Arc<dyn Codec>> {
        self.insert(Arc::new(codec))
    }

    /// Register an array of an already registered element type.
    pub fn register_array(
        &mut self,
        tag: impl Into<TypeTag>,
        element: &TypeTag,
        delimiter: char,
    ) -> Result<()> {
        let element = self.get(element)?.clone();
        self.insert(Arc::new(ArrayCodec::new(tag.into(), element, delimiter)));
        Ok(())
    }

    /// Register a range over an already registered subtype.
    pub fn register_range(&mut self, tag: impl Into<TypeTag>, element: &TypeTag) -> Result<()> {
        let element = self.get(element)?.clone();
        self.insert(Arc::new(RangeCodec::new(tag.into(), element)));
        Ok(())
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.codecs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codecs.is_empty()
    }

    pub fn contains(&self, tag: &TypeTag) -> bool {
        self.codecs.contains_key(tag)
    }

    /// Registered tags in name order.
    pub fn tags(&self) -> Vec<&TypeTag> {
        let mut tags: Vec<_> = self.codecs.keys().collect();
        tags.sort();
        tags
    }

    /// The codec for `tag`.
    pub fn get(&self, tag: &TypeTag) -> Result<&Arc<dyn Codec>> {
        self.codecs.get(tag).ok_or_else(|| {
            tracing::debug!(tag = %tag, "no codec registered");
            CodecError::unsupported(tag, "any")
        })
    }

    pub fn element_relation(&self, tag: &TypeTag) -> Option<ElementRelation> {
        element_relation(tag)
    }

    /// `tag`'s codec wrapped to map NULL to `None`.
    pub fn nullable(&self, tag: &TypeTag) -> Result<Nullable<Arc<dyn Codec>>> {
        Ok(Nullable::new(self.get(tag)?.clone()))
    }

    /// `tag`'s codec wrapped to reject NULL.
    pub fn not_null(&self, tag: &TypeTag) -> Result<NotNull<Arc<dyn Codec>>> {
        Ok(NotNull::new(self.get(tag)?.clone()))
    }

    pub fn encode(&self, tag: &TypeTag, value: &Value, prefer_binary: bool) -> Result<WireValue> {
        encode_wire(self.get(tag)?, value, prefer_binary)
    }

    pub fn encode_nullable(
        &self,
        tag: &TypeTag,
        value: Option<&Value>,
        prefer_binary: bool,
    ) -> Result<WireValue> {
        self.nullable(tag)?.encode(value, prefer_binary)
    }

    /// Encode a statement parameter using the configured format preference.
    pub fn encode_param(&self, tag: &TypeTag, value: Option<&Value>) -> Result<WireValue> {
        self.encode_nullable(tag, value, self.config.prefer_binary)
    }

    /// Decode a value that must not be NULL.
    pub fn decode(&self, tag: &TypeTag, wire: &WireValue) -> Result<Value> {
        decode_wire(self.get(tag)?, wire)
    }

    pub fn decode_nullable(&self, tag: &TypeTag, wire: &WireValue) -> Result<Option<Value>> {
        self.nullable(tag)?.decode(wire)
    }

    /// SQL literal for `value`, `NULL` for `None`. The tag must be known
    /// even for NULL.
    pub fn to_literal(&self, tag: &TypeTag, value: Option<&Value>) -> Result<String> {
        self.nullable(tag)?.to_literal(value)
    }

    /// Replace each `${expr}` in `template` with a cast literal of the
    /// value `evaluator` produces for it.
    pub fn substitute_literals<E: Evaluator>(&self, template: &str, evaluator: E) -> Result<Bytes> {
        substitute::substitute_literals(self, template, evaluator)
    }
}

static DEFAULT_REGISTRY: Lazy<CodecRegistry> = Lazy::new(CodecRegistry::builtin);

/// The shared built-in registry, created on first use.
pub fn default_registry() -> &'static CodecRegistry {
    &DEFAULT_REGISTRY
}
