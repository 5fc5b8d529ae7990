//! # Codec Configuration
//!
//! Resource limits applied while decoding untrusted input. Every length
//! prefix (string, binary, sequence count, dynamic group size) is checked
//! against these limits before any backing storage is allocated, and group
//! nesting is capped so hostile input cannot exhaust the stack.
//!
//! Configuration can come from code, a TOML document, or a TOML file with
//! `GROUPWIRE_` prefixed environment overrides (for example
//! `GROUPWIRE_MAX_STRING_SIZE=4096`).

use anyhow::{Context, Result};
use config_crate::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Environment variable prefix for configuration overrides
pub const ENV_PREFIX: &str = "GROUPWIRE";

/// Decode-time resource limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Largest string accepted, in bytes
    pub max_string_size: usize,

    /// Largest binary blob accepted, in bytes
    pub max_binary_size: usize,

    /// Largest sequence element count accepted
    pub max_sequence_len: usize,

    /// Largest dynamic group (size prefix) accepted, in bytes
    pub max_frame_size: usize,

    /// Deepest group nesting accepted; the outermost group is depth 1
    pub max_depth: usize,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            max_string_size: 1 << 20,   // 1MB
            max_binary_size: 16 << 20,  // 16MB
            max_sequence_len: 1 << 20,  // 1M elements
            max_frame_size: 64 << 20,   // 64MB
            max_depth: 64,
        }
    }
}

impl CodecConfig {
    /// Parse a TOML document; missing keys keep their defaults
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).context("Failed to parse codec configuration")
    }

    /// Load from an optional TOML file, then apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_prefix(path, ENV_PREFIX)
    }

    /// [`CodecConfig::load`] with a custom environment prefix
    pub fn load_with_prefix(path: Option<&Path>, prefix: &str) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            debug!("Loading codec config: {:?}", path);
            builder = builder.add_source(File::from(path).required(true));
        }

        builder = builder.add_source(Environment::with_prefix(prefix).try_parsing(true));

        let config = builder
            .build()
            .context("Failed to build codec configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize codec configuration")
    }

    /// Limit for a string field, narrowed by the schema's declared maximum
    pub fn string_limit(&self, declared: Option<u32>) -> usize {
        narrow(self.max_string_size, declared)
    }

    /// Limit for a binary field, narrowed by the schema's declared maximum
    pub fn binary_limit(&self, declared: Option<u32>) -> usize {
        narrow(self.max_binary_size, declared)
    }
}

fn narrow(configured: usize, declared: Option<u32>) -> usize {
    match declared {
        Some(max) => configured.min(max as usize),
        None => configured,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CodecConfig::default();
        assert_eq!(config.max_string_size, 1_048_576);
        assert_eq!(config.max_sequence_len, 1_048_576);
        assert!(config.max_frame_size > config.max_binary_size);
        assert_eq!(config.max_depth, 64);
    }

    #[test]
    fn test_depth_limit_from_toml() {
        let config = CodecConfig::from_toml_str("max_depth = 8\n").unwrap();
        assert_eq!(config.max_depth, 8);
        assert_eq!(config.max_frame_size, CodecConfig::default().max_frame_size);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = CodecConfig::from_toml_str("max_string_size = 64\n").unwrap();
        assert_eq!(config.max_string_size, 64);
        assert_eq!(config.max_binary_size, CodecConfig::default().max_binary_size);
    }

    #[test]
    fn test_invalid_toml_is_error() {
        let err = CodecConfig::from_toml_str("max_string_size = \"big\"").unwrap_err();
        assert!(err.to_string().contains("Failed to parse codec configuration"));
    }

    #[test]
    fn test_declared_limits_narrow() {
        let config = CodecConfig::default();
        assert_eq!(config.string_limit(Some(16)), 16);
        assert_eq!(config.string_limit(None), config.max_string_size);
        assert_eq!(config.binary_limit(Some(u32::MAX)), config.max_binary_size);
    }
}
