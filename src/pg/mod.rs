//! PostgreSQL value codecs.
//!
//! Converts between native values and the text/binary wire representations
//! of PostgreSQL types, and renders values as SQL literals.
//!
//! Architecture:
//! - `types`: Type tags, wire values and native values
//! - `quote`: Literal quoting and delimited-token parsing
//! - `codec`: The `Codec` trait and wire-level encode/decode
//! - `scalar`, `numeric`, `temporal`: Built-in scalar codecs
//! - `array`, `range`: Composite codecs over an element codec
//! - `null`: Explicit NULL adapters
//! - `registry`: Tag → codec table and element relations
//! - `substitute`: `${expr}` literal substitution

pub mod array;
pub mod codec;
pub mod null;
pub mod numeric;
pub mod quote;
pub mod range;
pub mod registry;
pub mod scalar;
pub mod substitute;
pub mod temporal;
pub mod types;

#[cfg(test)]
mod tests;

// Public API re-exports for library consumers
pub use array::{array_codec_of, ArrayCodec};
pub use codec::{decode_wire, encode_wire, Codec};
pub use null::{NotNull, Nullable};
pub use numeric::NumericCodec;
pub use quote::{parse_delimited, quote_delimited, quote_identifier, quote_literal, Token};
pub use range::{range_codec_of, Bound, Range, RangeCodec};
pub use registry::{default_registry, CodecRegistry, CompositeKind, ElementRelation};
pub use scalar::{ScalarCodec, ScalarKind};
pub use substitute::{Evaluated, Evaluator};
pub use temporal::{TemporalCodec, TemporalKind};
pub use types::{Format, TypeTag, Value, WireValue};
