//! Error types for pgcodec.
//!
//! Every failure is reported synchronously to the caller; nothing is retried.

use thiserror::Error;

use crate::pg::types::TypeTag;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CodecError {
    /// No codec is registered for the tag, or the codec does not accept
    /// the native value it was handed.
    #[error("Unsupported type: no {tag} codec for {native} values")]
    UnsupportedType { tag: String, native: &'static str },

    /// Malformed wire bytes for an otherwise supported type.
    #[error("Decode error for {tag} ({raw_text:?}): {reason}", raw_text = String::from_utf8_lossy(.raw))]
    Decode {
        tag: String,
        raw: Vec<u8>,
        reason: String,
    },

    #[error("NULL in {tag} column")]
    NullNotAllowed { tag: String },

    /// Binary representation requested from a codec that only speaks text.
    #[error("Type error: {tag} has no binary representation")]
    BinaryUnsupported { tag: String },

    /// A template placeholder failed evaluation.
    #[error("Expression error in ${{{text}}}: {reason}")]
    Expression { text: String, reason: String },

    #[error("Parse error at position {position}: {message}")]
    Parse { position: usize, message: String },
}

impl CodecError {
    /// Create a decode error for `tag` carrying the offending bytes.
    pub fn decode(tag: &TypeTag, raw: impl AsRef<[u8]>, reason: impl Into<String>) -> Self {
        Self::Decode {
            tag: tag.to_string(),
            raw: raw.as_ref().to_vec(),
            reason: reason.into(),
        }
    }

    pub fn unsupported(tag: &TypeTag, native: &'static str) -> Self {
        Self::UnsupportedType {
            tag: tag.to_string(),
            native,
        }
    }

    pub fn null_not_allowed(tag: &TypeTag) -> Self {
        Self::NullNotAllowed {
            tag: tag.to_string(),
        }
    }

    pub fn binary_unsupported(tag: &TypeTag) -> Self {
        Self::BinaryUnsupported {
            tag: tag.to_string(),
        }
    }

    /// Create a parse error at the given byte offset.
    pub fn parse(position: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            position,
            message: message.into(),
        }
    }

    /// Whether this error came from malformed wire input.
    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Decode { .. })
    }
}

pub type Result<T> = std::result::Result<T, CodecError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_message() {
        let err = CodecError::null_not_allowed(&TypeTag::INT4);
        assert_eq!(err.to_string(), "NULL in int4 column");
    }

    #[test]
    fn test_decode_message_carries_raw_text() {
        let err = CodecError::decode(&TypeTag::BYTEA, b"\\xZZ", "invalid hex");
        assert!(err.is_decode());
        let msg = err.to_string();
        assert!(msg.contains("bytea"));
        assert!(msg.contains("xZZ"));
        assert!(msg.contains("invalid hex"));
    }

    #[test]
    fn test_expression_message() {
        let err = CodecError::Expression {
            text: "x +".to_string(),
            reason: "unexpected end".to_string(),
        };
        assert_eq!(err.to_string(), "Expression error in ${x +}: unexpected end");
    }
}
