//! Codec configuration.

use serde::{Deserialize, Serialize};

use crate::pg::numeric::{DEFAULT_PRECISION, MIN_PRECISION};

/// Settings shared by every codec in a registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Characters of scientific notation kept when encoding `numeric`
    pub numeric_precision: usize,
    /// Encode parameters in binary when the codec supports it
    pub prefer_binary: bool,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            numeric_precision: DEFAULT_PRECISION,
            prefer_binary: false,
        }
    }
}

impl CodecConfig {
    /// Create a configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the numeric output precision (raised to at least 3).
    pub fn numeric_precision(mut self, precision: usize) -> Self {
        self.numeric_precision = precision.max(MIN_PRECISION);
        self
    }

    /// Prefer binary parameter encoding.
    pub fn prefer_binary(mut self, prefer: bool) -> Self {
        self.prefer_binary = prefer;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let config = CodecConfig::new().numeric_precision(12).prefer_binary(true);
        assert_eq!(config.numeric_precision, 12);
        assert!(config.prefer_binary);
        assert_eq!(CodecConfig::new().numeric_precision(1).numeric_precision, 3);
    }

    #[test]
    fn test_deserialize_partial() {
        let config: CodecConfig = serde_json::from_str(r#"{"prefer_binary": true}"#).unwrap();
        assert_eq!(config.numeric_precision, DEFAULT_PRECISION);
        assert!(config.prefer_binary);

        let config: CodecConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, CodecConfig::default());
    }
}
