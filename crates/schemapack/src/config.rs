// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Serializer and framing settings.
//!
//! # Example YAML
//!
//! ```yaml
//! serializer:
//!   conversion: strict
//!   message_id_mask: 0x10000
//!   max_depth: 32
//! framing:
//!   max_message_bytes: 1048576
//! ```

use crate::error::ConfigError;
use crate::wire::ConversionPolicy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Default upper bound for one framed payload (16 MiB).
pub const DEFAULT_MAX_MESSAGE_BYTES: usize = 16 * 1024 * 1024;

/// Default nesting limit for decoded composite values.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Default count limit for lists whose elements may occupy no wire bytes.
pub const DEFAULT_MAX_ZERO_SIZE_ELEMENTS: usize = 65_536;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerializerConfig {
    /// Behaviour of numeric conversions between native and wire types.
    pub conversion: ConversionPolicy,

    /// OR'd into every schema message id, so several schemas can share a wire.
    pub message_id_mask: i32,

    /// Deepest struct/union/list nesting accepted on decode and skip.
    pub max_depth: usize,

    /// Largest count accepted for a list of elements with no minimum wire size
    /// (empty structs), which the input length cannot bound.
    pub max_zero_size_elements: usize,
}

impl Default for SerializerConfig {
    fn default() -> Self {
        Self {
            conversion: ConversionPolicy::default(),
            message_id_mask: 0,
            max_depth: DEFAULT_MAX_DEPTH,
            max_zero_size_elements: DEFAULT_MAX_ZERO_SIZE_ELEMENTS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FramingConfig {
    /// Largest accepted payload, excluding the 8-byte record header.
    pub max_message_bytes: usize,
}

impl Default for FramingConfig {
    fn default() -> Self {
        Self {
            max_message_bytes: DEFAULT_MAX_MESSAGE_BYTES,
        }
    }
}

/// Root configuration document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub serializer: SerializerConfig,
    pub framing: FramingConfig,
}

impl Config {
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    #[cfg(feature = "yaml")]
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Load from a `.json`, `.yaml` or `.yml` file.
    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&text),
            #[cfg(feature = "yaml")]
            Some("yaml" | "yml") => Self::from_yaml_str(&text),
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }
}
